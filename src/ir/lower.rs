//! AST → TAC lowering
//!
//! A single forward walk over the root node list, no backtracking. Compound
//! sub-expressions are materialized through synthesized temporaries
//! (`t0`, `t1`, … — monotonically numbered, never reused) so that every
//! instruction operand is a variable or a constant. Block regions are
//! bracketed by generated labels (`b0`, `b1`, …).
//!
//! A node kind this pass has no rule for is a programmer error, not a user
//! error, and aborts the process.

use crate::ir::tac::*;
use crate::ir::Ir;
use crate::parser::ast::{AstNode, BinOp, ElseBranch, Program};
use rustc_hash::FxHashMap;

impl Ir {
    /// Lower a parsed program into a fresh instruction list and variable
    /// table.
    pub fn lower(program: &Program) -> Ir {
        let mut ir = Ir {
            ops: Vec::new(),
            variables: FxHashMap::default(),
            tempvar_count: 0,
            block_count: 0,
        };
        ir.lower_nodes(&program.nodes);
        ir
    }

    /// Allocate a fresh block label (`b0`, `b1`, …), monotonically numbered.
    fn fresh_block(&mut self) -> String {
        let name = format!("b{}", self.block_count);
        self.block_count += 1;
        name
    }

    fn lower_nodes(&mut self, nodes: &[AstNode]) {
        for node in nodes {
            self.lower_node(node);
        }
    }

    fn lower_node(&mut self, node: &AstNode) {
        match node {
            AstNode::ProgramName { .. } => {}
            AstNode::MainBlock { statements, .. } => {
                // The outermost block: entry label only, no exit label.
                self.ops.push(Instruction::Label {
                    name: "_start".to_string(),
                });
                self.lower_nodes(statements);
            }
            AstNode::Block { statements, .. } => {
                self.lower_block(statements, true);
            }
            AstNode::VarDeclare { name, datatype, .. } => {
                let kind = ValueKind::from(*datatype);
                self.ops.push(Instruction::Declare {
                    name: name.clone(),
                    kind,
                });
                self.variables.insert(name.clone(), VarEntry::new(kind));
            }
            AstNode::VarAssign { name, value, .. } => self.lower_assign(name, value),
            AstNode::FunctionCall { name, args, .. } => self.lower_call(name, args),
            AstNode::Conditional {
                condition, yes, no, ..
            } => self.lower_cond(condition, yes, no),
            AstNode::WhileLoop {
                condition, body, ..
            } => self.lower_while(condition, body),
            other => panic!("cannot lower {} as a statement", other),
        }
    }

    fn lower_assign(&mut self, name: &str, value: &AstNode) {
        let instr = match value {
            AstNode::BinaryOp {
                op, left, right, ..
            } => Instruction::AssignArith {
                op: Self::arith_op(*op),
                dest: name.to_string(),
                left: self.operand_or_temp(left),
                right: self.operand_or_temp(right),
            },
            AstNode::UnaryNot { operand, .. } => Instruction::AssignNot {
                dest: name.to_string(),
                operand: self.operand_or_temp(operand),
            },
            simple => Instruction::Assign {
                dest: name.to_string(),
                value: self.operand(simple),
            },
        };
        self.ops.push(instr);
    }

    /// One `PushArg` per argument in source order, then the `Call`.
    /// Pushing a variable counts as a usage.
    fn lower_call(&mut self, name: &str, args: &[AstNode]) {
        for arg in args {
            let value = self.operand_or_temp(arg);
            if let Operand::Variable(var) = &value {
                if let Some(entry) = self.variables.get_mut(var) {
                    entry.usage += 1;
                }
            }
            self.ops.push(Instruction::PushArg { value });
        }
        self.ops.push(Instruction::Call {
            function: name.to_string(),
        });
    }

    /// Entry label, statements, and (for statement-level blocks) a matching
    /// exit label. Branch regions skip the exit label. Returns the entry
    /// label name.
    fn lower_block(&mut self, statements: &[AstNode], labeled_exit: bool) -> String {
        let entry = self.fresh_block();
        self.ops.push(Instruction::Label {
            name: entry.clone(),
        });
        self.lower_nodes(statements);
        if labeled_exit {
            let exit = self.fresh_block();
            self.ops.push(Instruction::Label { name: exit });
        }
        entry
    }

    fn lower_cond(&mut self, condition: &AstNode, yes: &AstNode, no: &ElseBranch) {
        let condition = self.operand_or_temp(condition);
        let if_index = self.ops.len();
        self.ops.push(Instruction::If {
            condition,
            then_label: String::new(),
            else_label: String::new(),
        });

        let then_label = self.lower_branch(yes);

        let after_label = self.fresh_block();
        let no = match no {
            ElseBranch::Present(no) => Some(no),
            _ => None,
        };
        if no.is_some() {
            // Skip the else region once the then region ran.
            self.ops.push(Instruction::Jump {
                target: after_label.clone(),
            });
        }

        let else_label = match no {
            Some(no) => self.lower_branch(no),
            None => after_label.clone(),
        };

        if let Instruction::If {
            then_label: then_slot,
            else_label: else_slot,
            ..
        } = &mut self.ops[if_index]
        {
            *then_slot = then_label;
            *else_slot = else_label;
        }

        self.ops.push(Instruction::Label { name: after_label });
    }

    /// A while loop lowers like a conditional without an else branch: no
    /// loop-back jump is emitted, so the body runs at most once downstream.
    /// The optimizer's straight-line store model depends on this.
    fn lower_while(&mut self, condition: &AstNode, body: &AstNode) {
        let condition = self.operand_or_temp(condition);
        let if_index = self.ops.len();
        self.ops.push(Instruction::If {
            condition,
            then_label: String::new(),
            else_label: String::new(),
        });

        let body_label = self.lower_branch(body);
        let after_label = self.fresh_block();

        if let Instruction::If {
            then_label: then_slot,
            else_label: else_slot,
            ..
        } = &mut self.ops[if_index]
        {
            *then_slot = body_label;
            *else_slot = after_label.clone();
        }

        self.ops.push(Instruction::Label { name: after_label });
    }

    /// Lower a branch (single statement or block) as a labeled region;
    /// returns the region's entry label.
    fn lower_branch(&mut self, branch: &AstNode) -> String {
        match branch {
            AstNode::Block { statements, .. } => self.lower_block(statements, false),
            single => {
                let label = self.fresh_block();
                self.ops.push(Instruction::Label {
                    name: label.clone(),
                });
                self.lower_node(single);
                label
            }
        }
    }

    /// Lower an expression node to an operand, synthesizing a temporary for
    /// compound subtrees.
    fn operand_or_temp(&mut self, node: &AstNode) -> Operand {
        match node {
            AstNode::BinaryOp { .. } | AstNode::UnaryNot { .. } => {
                Operand::Variable(self.temp_var(node))
            }
            simple => self.operand(simple),
        }
    }

    /// Materialize a compound subtree into a fresh temporary, children
    /// before parent, and return the temporary's name. Temporaries are
    /// registered in the variable table but emit no `Declare` instruction.
    fn temp_var(&mut self, node: &AstNode) -> String {
        let name = format!("t{}", self.tempvar_count);
        self.tempvar_count += 1;

        let instr = match node {
            AstNode::BinaryOp {
                op, left, right, ..
            } => Instruction::AssignArith {
                op: Self::arith_op(*op),
                dest: name.clone(),
                left: self.operand_or_temp(left),
                right: self.operand_or_temp(right),
            },
            AstNode::UnaryNot { operand, .. } => Instruction::AssignNot {
                dest: name.clone(),
                operand: self.operand_or_temp(operand),
            },
            other => panic!("temporary requested for non-compound {}", other),
        };

        let kind = match &instr {
            Instruction::AssignArith { left, .. } => self.operand_kind(left),
            _ => ValueKind::Bool,
        };
        self.variables.insert(name.clone(), VarEntry::new(kind));
        self.ops.push(instr);
        name
    }

    /// Lower a leaf expression node to an operand.
    fn operand(&mut self, node: &AstNode) -> Operand {
        match node {
            AstNode::IntLiteral(value, _) => Operand::ConstInt(*value),
            AstNode::FloatLiteral(value, _) => Operand::ConstFloat(*value),
            AstNode::StringLiteral(value, _) => Operand::ConstString(value.clone()),
            AstNode::BoolLiteral(value, _) => Operand::ConstBool(*value),
            AstNode::Variable(name, _) => Operand::Variable(name.clone()),
            other => panic!("cannot lower {} as an operand", other),
        }
    }

    /// The scalar kind an operand evaluates to; variables report their
    /// declared kind.
    fn operand_kind(&self, operand: &Operand) -> ValueKind {
        match operand {
            Operand::Variable(name) => self
                .variables
                .get(name)
                .map(|entry| entry.kind)
                .expect("variable in expression was never declared"),
            Operand::ConstInt(_) => ValueKind::Int,
            Operand::ConstFloat(_) => ValueKind::Float,
            Operand::ConstString(_) => ValueKind::Str,
            Operand::ConstBool(_) => ValueKind::Bool,
        }
    }

    /// Only the four arithmetic operators have assignment instructions; any
    /// other operator reaching lowering aborts.
    fn arith_op(op: BinOp) -> ArithOp {
        match op {
            BinOp::Add => ArithOp::Add,
            BinOp::Sub => ArithOp::Sub,
            BinOp::Mul => ArithOp::Mul,
            BinOp::Div => ArithOp::Div,
            other => panic!("operator '{}' has no assignment instruction", other),
        }
    }
}
