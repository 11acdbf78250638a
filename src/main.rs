// minipas: compiler front-end for a miniature Pascal dialect

use std::fs;
use std::path::Path;
use std::process;

use minipas::ir::Ir;
use minipas::parser::parse::{ParseError, Parser};

struct Options {
    path: String,
    show_ast: bool,
    show_tac: bool,
    optimize: bool,
    debug: bool,
}

fn parse_args() -> Option<Options> {
    let mut path = None;
    let mut show_ast = false;
    let mut show_tac = false;
    let mut optimize = true;
    let mut debug = false;

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--ast" => show_ast = true,
            "--tac" => show_tac = true,
            "--no-opt" => optimize = false,
            "--debug" => debug = true,
            _ => {
                if path.is_some() {
                    return None;
                }
                path = Some(arg);
            }
        }
    }

    // Without an explicit selection, print the optimized TAC.
    if !show_ast && !show_tac {
        show_tac = true;
    }

    path.map(|path| Options {
        path,
        show_ast,
        show_tac,
        optimize,
        debug,
    })
}

fn report(path: &str, err: &ParseError) -> ! {
    eprintln!(
        "{}:{}:{}: {}",
        path, err.location.line, err.location.column, err.message
    );
    process::exit(1);
}

fn main() {
    let options = match parse_args() {
        Some(options) => options,
        None => {
            eprintln!("Error: No input file provided");
            eprintln!();
            eprintln!("Usage: minipas <file.pas> [--ast] [--tac] [--no-opt] [--debug]");
            eprintln!();
            eprintln!("  --ast     print the syntax tree as s-expressions");
            eprintln!("  --tac     print the three-address-code listing (default)");
            eprintln!("  --no-opt  skip the constant-fold/dead-store pass");
            eprintln!("  --debug   also print the pre-optimization listing and");
            eprintln!("            the variable table");
            process::exit(1);
        }
    };

    if !Path::new(&options.path).exists() {
        eprintln!("Error: File '{}' not found", options.path);
        process::exit(1);
    }

    let source = match fs::read_to_string(&options.path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Error: Failed to read '{}': {}", options.path, err);
            process::exit(1);
        }
    };

    let mut parser = match Parser::new(&source) {
        Ok(parser) => parser,
        Err(err) => report(&options.path, &err),
    };
    let program = match parser.parse_program() {
        Ok(program) => program,
        Err(err) => report(&options.path, &err),
    };

    if options.show_ast {
        print!("{}", program);
    }

    let mut ir = Ir::lower(&program);

    if options.debug {
        eprintln!(";; IR before optimization.");
        eprint!("{}", ir.dump_variables());
        eprint!("{}", ir);
    }

    if options.optimize {
        ir.optimize();
    }

    if options.show_tac {
        print!("{}", ir);
    }

    if options.debug {
        eprint!("{}", ir.dump_variables());
    }
}
