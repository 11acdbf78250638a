// Integration tests for the full parse → lower → optimize pipeline

use minipas::ir::tac::{ArithOp, Instruction, Operand, Value};
use minipas::ir::Ir;
use minipas::parser::ast::AstNode;
use minipas::parser::parse::{ErrorKind, Parser};

fn compile(source: &str) -> Ir {
    let mut parser = Parser::new(source).expect("Lexing failed");
    let program = parser.parse_program().expect("Parsing failed");
    let mut ir = Ir::lower(&program);
    ir.optimize();
    ir
}

#[test]
fn test_simple_program_folds_to_final_store() {
    let source = r"
        program demo;
        var x : integer;
        begin
            x := 1 + 2;
            writeln(x);
        end.
    ";

    let ir = compile(source);

    assert!(ir.ops.contains(&Instruction::Assign {
        dest: "x".to_string(),
        value: Operand::ConstInt(3),
    }));
    assert!(ir.ops.contains(&Instruction::Declare {
        name: "x".to_string(),
        kind: minipas::ir::tac::ValueKind::Int,
    }));
    assert_eq!(ir.variables["x"].static_value, Some(Value::Int(3)));
}

#[test]
fn test_temp_variables_fold_away() {
    let source = r"
        var x : integer;
        begin
            x := (1 + 2) * 3;
            writeln(x);
        end.
    ";

    let ir = compile(source);

    assert!(ir.ops.contains(&Instruction::Assign {
        dest: "x".to_string(),
        value: Operand::ConstInt(9),
    }));
    // The temporary for (1 + 2) was created, folded, and then removed.
    assert!(ir.variables.contains_key("t0"));
    assert!(!ir
        .ops
        .iter()
        .any(|i| matches!(i.dest(), Some(d) if d.starts_with('t'))));
}

#[test]
fn test_unreferenced_variable_is_stripped() {
    let source = r"
        var x : integer;
        var unused : integer;
        begin
            x := 1;
            unused := 2;
            writeln(x);
        end.
    ";

    let ir = compile(source);

    assert_eq!(ir.variables["unused"].usage, 0);
    assert!(!ir
        .ops
        .iter()
        .any(|i| matches!(i.dest(), Some(d) if d == "unused")));
    // The declaration itself survives.
    assert!(ir.ops.iter().any(
        |i| matches!(i, Instruction::Declare { name, .. } if name == "unused")
    ));
}

#[test]
fn test_intermediate_stores_are_superseded() {
    let source = r"
        var counter : integer;
        begin
            counter := 1;
            counter := counter + 1;
            counter := counter * 10;
            writeln(counter);
        end.
    ";

    let ir = compile(source);

    let stores: Vec<&Instruction> = ir.ops.iter().filter(|i| i.is_assignment()).collect();
    assert_eq!(
        stores,
        vec![&Instruction::Assign {
            dest: "counter".to_string(),
            value: Operand::ConstInt(20),
        }]
    );
}

#[test]
fn test_conditional_program_end_to_end() {
    let source = r"
        program branchy;
        var flag : boolean;
        var y : integer;
        begin
            flag := true;
            if flag then
                y := 1;
            else
                y := 2;
            writeln(y);
        end.
    ";

    let ir = compile(source);

    // Straight-line optimization: the else-branch store wins as the final
    // textual assignment.
    let if_count = ir
        .ops
        .iter()
        .filter(|i| matches!(i, Instruction::If { .. }))
        .count();
    assert_eq!(if_count, 1);
    assert!(ir.ops.iter().any(|i| matches!(i, Instruction::Jump { .. })));
    assert_eq!(ir.variables["y"].static_value, Some(Value::Int(2)));
}

#[test]
fn test_while_program_lowers_without_back_edge() {
    let source = r"
        var run : boolean;
        var n : integer;
        begin
            run := true;
            while run do
                n := n + 1;
            writeln(n);
        end.
    ";

    let ir = compile(source);

    assert!(ir.ops.iter().any(|i| matches!(i, Instruction::If { .. })));
    assert!(!ir.ops.iter().any(|i| matches!(i, Instruction::Jump { .. })));
}

#[test]
fn test_string_program() {
    let source = r"
        var greeting : string;
        begin
            greeting := 'hello';
            writeln(greeting, 'world');
        end.
    ";

    let ir = compile(source);

    assert!(ir.ops.contains(&Instruction::Assign {
        dest: "greeting".to_string(),
        value: Operand::ConstString("hello".to_string()),
    }));
    assert!(ir.ops.contains(&Instruction::PushArg {
        value: Operand::ConstString("world".to_string()),
    }));
    assert!(ir.ops.contains(&Instruction::Call {
        function: "writeln".to_string(),
    }));
}

#[test]
fn test_division_stays_when_divisor_is_zero() {
    let source = r"
        var x : integer;
        begin
            x := 10 / 0;
            writeln(x);
        end.
    ";

    let ir = compile(source);

    assert!(ir.ops.contains(&Instruction::AssignArith {
        op: ArithOp::Div,
        dest: "x".to_string(),
        left: Operand::ConstInt(10),
        right: Operand::ConstInt(0),
    }));
}

#[test]
fn test_ast_dump_shape() {
    let source = "var x : integer; begin x := 1 + 2 * 3; end.";
    let mut parser = Parser::new(source).expect("Lexing failed");
    let program = parser.parse_program().expect("Parsing failed");

    let main = program
        .nodes
        .iter()
        .find(|n| matches!(n, AstNode::MainBlock { .. }))
        .expect("no main block");
    assert_eq!(main.to_string(), "(main (:= x (+ 1 (* 2 3))))");
}

#[test]
fn test_tac_dump_shape() {
    let source = "var x : integer; begin x := 1 + 2; writeln(x); end.";
    let ir = compile(source);
    let dump = ir.to_string();

    assert!(dump.contains("int x"));
    assert!(dump.contains("_start:"));
    assert!(dump.contains("x = 3"));
    assert!(dump.contains("push_arg x"));
    assert!(dump.contains("call writeln"));
}

#[test]
fn test_first_error_aborts() {
    let source = r"
        var x : integer;
        begin
            y := 1;
            z := 2;
        end.
    ";

    let mut parser = Parser::new(source).expect("Lexing failed");
    let err = parser.parse_program().unwrap_err();

    assert_eq!(err.kind, ErrorKind::Semantic);
    assert!(err.message.contains("Unknown identifier \"y\""));
    assert_eq!(err.location.line, 4);
}

#[test]
fn test_missing_terminal_dot() {
    let source = "var x : integer; begin x := 1; end";
    let mut parser = Parser::new(source).expect("Lexing failed");
    let err = parser.parse_program().unwrap_err();

    assert_eq!(err.kind, ErrorKind::Semantic);
    assert!(err.message.contains("Cannot find entry point."));
}

#[test]
fn test_unmatched_end_is_semantic_error() {
    let source = "begin end. end.";
    let mut parser = Parser::new(source).expect("Lexing failed");
    let err = parser.parse_program().unwrap_err();

    assert_eq!(err.kind, ErrorKind::Semantic);
    assert!(err.message.contains("'end'"));
}
