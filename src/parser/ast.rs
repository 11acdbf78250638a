// AST (Abstract Syntax Tree) definitions for the Pascal front-end

use rustc_hash::FxHashMap;
use std::fmt;

/// Source location information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Datatypes a variable can be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Integer,
    Real,
    Str,
    Boolean,
}

impl DataType {
    /// Resolve a datatype name as written in a `var` declaration.
    pub fn from_name(name: &str) -> Option<DataType> {
        match name {
            "integer" => Some(DataType::Integer),
            "real" => Some(DataType::Real),
            "string" => Some(DataType::Str),
            "boolean" => Some(DataType::Boolean),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Integer => write!(f, "integer"),
            DataType::Real => write!(f, "real"),
            DataType::Str => write!(f, "string"),
            DataType::Boolean => write!(f, "boolean"),
        }
    }
}

/// Binary operators accepted by the expression parser.
///
/// Only the arithmetic group carries a precedence; comparison operators are
/// parsed with precedence 0 and survive into the AST, but IR lowering has no
/// instruction for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Gt,
    Lt,
    Ge,
    Le,
    Ne,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinOp::Add => write!(f, "+"),
            BinOp::Sub => write!(f, "-"),
            BinOp::Mul => write!(f, "*"),
            BinOp::Div => write!(f, "/"),
            BinOp::Mod => write!(f, "%"),
            BinOp::Gt => write!(f, ">"),
            BinOp::Lt => write!(f, "<"),
            BinOp::Ge => write!(f, ">="),
            BinOp::Le => write!(f, "<="),
            BinOp::Ne => write!(f, "<>"),
        }
    }
}

/// The `else` slot of a conditional.
///
/// `Pending` exists only while parsing, between the `else` keyword and its
/// body; a finished tree only ever holds `Absent` or `Present`.
#[derive(Debug, Clone)]
pub enum ElseBranch {
    Absent,
    Pending,
    Present(Box<AstNode>),
}

/// AST nodes representing statements and expressions.
///
/// Every node owns its children, with one deliberate exception: a reference
/// to a declared variable ([`AstNode::Variable`]) holds only the variable
/// name and is resolved through the symbol table, never a second owning
/// handle to the declaration.
#[derive(Debug, Clone)]
pub enum AstNode {
    // Statements
    ProgramName {
        name: String,
        location: SourceLocation,
    },
    MainBlock {
        statements: Vec<AstNode>,
        location: SourceLocation,
    },
    Block {
        statements: Vec<AstNode>,
        location: SourceLocation,
    },
    VarDeclare {
        name: String,
        datatype: DataType,
        array_size: Option<u32>,
        location: SourceLocation,
    },
    VarAssign {
        name: String,
        value: Box<AstNode>,
        location: SourceLocation,
    },
    FunctionCall {
        name: String,
        args: Vec<AstNode>,
        location: SourceLocation,
    },
    Conditional {
        condition: Box<AstNode>,
        yes: Box<AstNode>,
        no: ElseBranch,
        location: SourceLocation,
    },
    WhileLoop {
        condition: Box<AstNode>,
        body: Box<AstNode>,
        location: SourceLocation,
    },

    // Expressions
    BinaryOp {
        op: BinOp,
        left: Box<AstNode>,
        right: Box<AstNode>,
        location: SourceLocation,
    },
    UnaryNot {
        operand: Box<AstNode>,
        location: SourceLocation,
    },
    IntLiteral(i64, SourceLocation),
    FloatLiteral(f64, SourceLocation),
    StringLiteral(String, SourceLocation),
    BoolLiteral(bool, SourceLocation),
    Variable(String, SourceLocation),
}

impl AstNode {
    /// Get the source location of this node
    pub fn location(&self) -> &SourceLocation {
        match self {
            AstNode::ProgramName { location, .. } => location,
            AstNode::MainBlock { location, .. } => location,
            AstNode::Block { location, .. } => location,
            AstNode::VarDeclare { location, .. } => location,
            AstNode::VarAssign { location, .. } => location,
            AstNode::FunctionCall { location, .. } => location,
            AstNode::Conditional { location, .. } => location,
            AstNode::WhileLoop { location, .. } => location,
            AstNode::BinaryOp { location, .. } => location,
            AstNode::UnaryNot { location, .. } => location,
            AstNode::IntLiteral(_, loc) => loc,
            AstNode::FloatLiteral(_, loc) => loc,
            AstNode::StringLiteral(_, loc) => loc,
            AstNode::BoolLiteral(_, loc) => loc,
            AstNode::Variable(_, loc) => loc,
        }
    }
}

/// S-expression rendering of a subtree, diagnostic only.
impl fmt::Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AstNode::ProgramName { name, .. } => write!(f, "(program {})", name),
            AstNode::MainBlock { statements, .. } => {
                write!(f, "(main")?;
                for stmt in statements {
                    write!(f, " {}", stmt)?;
                }
                write!(f, ")")
            }
            AstNode::Block { statements, .. } => {
                write!(f, "(block")?;
                for stmt in statements {
                    write!(f, " {}", stmt)?;
                }
                write!(f, ")")
            }
            AstNode::VarDeclare {
                name,
                datatype,
                array_size,
                ..
            } => match array_size {
                Some(size) => write!(f, "(var {} {}[{}])", name, datatype, size),
                None => write!(f, "(var {} {})", name, datatype),
            },
            AstNode::VarAssign { name, value, .. } => {
                write!(f, "(:= {} {})", name, value)
            }
            AstNode::FunctionCall { name, args, .. } => {
                write!(f, "(call {}", name)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                write!(f, ")")
            }
            AstNode::Conditional {
                condition, yes, no, ..
            } => {
                write!(f, "(if {} {}", condition, yes)?;
                if let ElseBranch::Present(no) = no {
                    write!(f, " {}", no)?;
                }
                write!(f, ")")
            }
            AstNode::WhileLoop {
                condition, body, ..
            } => write!(f, "(while {} {})", condition, body),
            AstNode::BinaryOp {
                op, left, right, ..
            } => write!(f, "({} {} {})", op, left, right),
            AstNode::UnaryNot { operand, .. } => write!(f, "(! {})", operand),
            AstNode::IntLiteral(value, _) => write!(f, "{}", value),
            AstNode::FloatLiteral(value, _) => write!(f, "{}", value),
            AstNode::StringLiteral(value, _) => write!(f, "'{}'", value),
            AstNode::BoolLiteral(value, _) => write!(f, "{}", value),
            AstNode::Variable(name, _) => write!(f, "{}", name),
        }
    }
}

/// A declared variable as recorded in the symbol table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub datatype: DataType,
    pub array_size: Option<u32>,
}

/// Maps declared-variable name to its declaration.
///
/// Redeclaring a name silently overwrites the existing binding.
pub type SymbolTable = FxHashMap<String, Symbol>;

/// Top-level program structure: the root node list plus the symbol table
/// built while parsing it.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub nodes: Vec<AstNode>,
    pub symbols: SymbolTable,
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            writeln!(f, "{}", node)?;
        }
        Ok(())
    }
}
