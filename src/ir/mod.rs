//! Intermediate representation of a parsed program
//!
//! This module lowers the AST into linear three-address code and optimizes
//! it:
//! - [`tac`]: TAC instruction, operand, and variable-table definitions
//! - [`lower`]: single-pass AST → TAC lowering
//! - [`optimize`]: constant propagation/folding and dead-store elimination
//!
//! The IR is intentionally scope-free: the optimizer treats the instruction
//! list as straight-line code and does not reason about control flow. That
//! is sound only while lowering emits no backward jumps.

pub mod lower;
pub mod optimize;
pub mod tac;

use rustc_hash::FxHashMap;
use std::fmt;

use self::tac::{Instruction, VarEntry};

/// A lowered program: the ordered instruction list plus the variable table.
#[derive(Debug, Clone, Default)]
pub struct Ir {
    pub ops: Vec<Instruction>,
    pub variables: FxHashMap<String, VarEntry>,
    pub(crate) tempvar_count: u32,
    pub(crate) block_count: u32,
}

/// Line-oriented instruction listing, diagnostic only.
impl fmt::Display for Ir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instr in &self.ops {
            match instr {
                Instruction::Label { .. } => writeln!(f, "\n{}", instr)?,
                _ => writeln!(f, "  {}", instr)?,
            }
        }
        Ok(())
    }
}

impl Ir {
    /// Variable-table listing: kind, name, whether the value is known at
    /// compile time, and the usage count. Diagnostic only.
    pub fn dump_variables(&self) -> String {
        let mut names: Vec<&String> = self.variables.keys().collect();
        names.sort();

        let mut out = String::from(";; --------------------\n");
        for name in names {
            let entry = &self.variables[name];
            let is_static = if entry.static_value.is_some() {
                "yes"
            } else {
                "no"
            };
            out.push_str(&format!(
                ";; {}\t{}\t{}\t{}\n",
                entry.kind, name, is_static, entry.usage
            ));
        }
        out.push_str(";; --------------------\n");
        out
    }
}
