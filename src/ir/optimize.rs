//! Constant folding and dead-store elimination
//!
//! Two linear passes over the instruction list. Pass 1 propagates values
//! already known at compile time into operands and folds assignments whose
//! operands are all literals. Pass 2 deletes stores to variables that are
//! never pushed as a call argument, and literal stores superseded by a later
//! store — after pass 1 only the instruction establishing each known
//! variable's final value survives.
//!
//! Both passes are control-flow-insensitive: a store inside a conditional
//! region counts like any other store. That is sound only while lowering
//! emits no backward jumps.

use crate::ir::tac::*;
use crate::ir::Ir;
use rustc_hash::FxHashMap;

impl Ir {
    /// Run both optimizer passes in place.
    pub fn optimize(&mut self) {
        self.fold_constants();
        self.remove_dead_stores();
    }

    /// Pass 1: copy-propagate known values into operands, then fold.
    fn fold_constants(&mut self) {
        let Ir {
            ops, variables, ..
        } = self;

        for instr in ops.iter_mut() {
            let replacement = match instr {
                Instruction::Assign { dest, value } => {
                    resolve_known(variables, value);
                    if let Some(known) = value.to_value() {
                        if let Some(entry) = variables.get_mut(dest.as_str()) {
                            entry.static_value = Some(known);
                        }
                    }
                    None
                }
                Instruction::AssignNot { dest, operand } => {
                    resolve_known(variables, operand);
                    if let Operand::ConstBool(value) = *operand {
                        let negated = !value;
                        if let Some(entry) = variables.get_mut(dest.as_str()) {
                            entry.static_value = Some(Value::Bool(negated));
                        }
                        Some(Instruction::Assign {
                            dest: dest.clone(),
                            value: Operand::ConstBool(negated),
                        })
                    } else {
                        None
                    }
                }
                Instruction::AssignArith {
                    op,
                    dest,
                    left,
                    right,
                } => {
                    resolve_known(variables, left);
                    resolve_known(variables, right);

                    let kind = variables.get(dest.as_str()).map(|entry| entry.kind);
                    let folded = match (kind, &*left, &*right) {
                        (
                            Some(ValueKind::Int),
                            Operand::ConstInt(a),
                            Operand::ConstInt(b),
                        ) => eval_int(*op, *a, *b).map(Value::Int),
                        (
                            Some(ValueKind::Float),
                            Operand::ConstFloat(a),
                            Operand::ConstFloat(b),
                        ) => Some(Value::Float(eval_float(*op, *a, *b))),
                        _ => None,
                    };

                    folded.map(|value| {
                        if let Some(entry) = variables.get_mut(dest.as_str()) {
                            entry.static_value = Some(value.clone());
                        }
                        Instruction::Assign {
                            dest: dest.clone(),
                            value: Operand::from(value),
                        }
                    })
                }
                _ => None,
            };

            if let Some(folded) = replacement {
                *instr = folded;
            }
        }
    }

    /// Pass 2: drop assignments to never-used variables and superseded
    /// literal stores.
    fn remove_dead_stores(&mut self) {
        let variables = &self.variables;

        self.ops.retain(|instr| {
            let dest = match instr.dest() {
                Some(dest) => dest,
                None => return true,
            };
            let entry = match variables.get(dest) {
                Some(entry) => entry,
                None => return true,
            };

            if entry.usage < 1 {
                return false;
            }

            if let Instruction::Assign { value, .. } = instr {
                if let (Some(stored), Some(known)) =
                    (value.to_value(), entry.static_value.as_ref())
                {
                    if stored != *known {
                        return false;
                    }
                }
            }

            true
        });
    }
}

/// Substitute a variable operand whose value is already known with the
/// matching literal.
fn resolve_known(variables: &FxHashMap<String, VarEntry>, operand: &mut Operand) {
    if let Operand::Variable(name) = operand {
        if let Some(known) = variables.get(name.as_str()).and_then(|entry| {
            entry.static_value.clone()
        }) {
            *operand = Operand::from(known);
        }
    }
}

/// Integer arithmetic, wrapping like the target machine would. Division is
/// folded only when it is defined; a zero divisor leaves the instruction
/// alone.
fn eval_int(op: ArithOp, a: i64, b: i64) -> Option<i64> {
    match op {
        ArithOp::Add => Some(a.wrapping_add(b)),
        ArithOp::Sub => Some(a.wrapping_sub(b)),
        ArithOp::Mul => Some(a.wrapping_mul(b)),
        ArithOp::Div => a.checked_div(b),
    }
}

fn eval_float(op: ArithOp, a: f64, b: f64) -> f64 {
    match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div => a / b,
    }
}
