use crate::error::Span;
use crate::value::{Value, ValueKind};
use std::fmt;
use std::rc::Rc;

/// A loaded program: function definitions followed by top-level calls.
#[derive(Debug, Clone)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    FunctionDef(Rc<FunctionDef>),
    VarDecl {
        declared_type: ValueKind,
        name: String,
        init: Expr,
        span: Span,
    },
    /// `reset`: re-assign an existing binding in an enclosing frame.
    VarReset {
        declared_type: ValueKind,
        name: String,
        value: Expr,
        span: Span,
    },
    If {
        condition: Expr,
        then_body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
        span: Span,
    },
    Loop {
        variable: String,
        from: Expr,
        to: Expr,
        body: Vec<Stmt>,
        span: Span,
    },
    Display {
        expr: Expr,
        span: Span,
    },
    Return {
        expr: Expr,
        span: Span,
    },
    Call {
        call: CallExpr,
        span: Span,
    },
}

impl Stmt {
    pub fn span(&self) -> &Span {
        match self {
            Stmt::FunctionDef(def) => &def.span,
            Stmt::VarDecl { span, .. } => span,
            Stmt::VarReset { span, .. } => span,
            Stmt::If { span, .. } => span,
            Stmt::Loop { span, .. } => span,
            Stmt::Display { span, .. } => span,
            Stmt::Return { span, .. } => span,
            Stmt::Call { span, .. } => span,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal {
        value: Value,
        span: Span,
    },
    Identifier {
        name: String,
        span: Span,
    },
    Binary {
        left: Box<Expr>,
        operator: BinaryOp,
        right: Box<Expr>,
        span: Span,
    },
    Call(CallExpr),
}

impl Expr {
    pub fn span(&self) -> &Span {
        match self {
            Expr::Literal { span, .. } => span,
            Expr::Identifier { span, .. } => span,
            Expr::Binary { span, .. } => span,
            Expr::Call(call) => &call.span,
        }
    }
}

/// `callee[name=value,...]`; arguments are bound to parameters by keyword.
#[derive(Debug, Clone)]
pub struct CallExpr {
    pub callee: String,
    pub args: Vec<KeywordArg>,
    pub span: Span,
}

/// A keyword argument in a call: `name=value`
#[derive(Debug, Clone)]
pub struct KeywordArg {
    pub name: String,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Is,
    And,
    Or,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let symbol = match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Is => "is",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        };
        f.write_str(symbol)
    }
}
