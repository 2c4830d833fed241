// Ram Language Interpreter Library
//
// Core of the Ram language: lexer, parser, value model, scoped environment
// and a tree-walking evaluator with keyword-argument calls.

// Public modules
pub mod ast;
pub mod builtins;
pub mod config;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod runner;
pub mod value;

// Re-export commonly used items
pub use ast::{Expr, Program, Stmt};
pub use config::Config;
pub use environment::Environment;
pub use error::{ErrorKind, RamError, Span};
pub use evaluator::{Evaluator, ExecutionResult};
pub use lexer::{Lexer, Token, TokenType};
pub use parser::Parser;
pub use value::{Value, ValueKind};

// Re-export main functions
pub use runner::{load, run, run_captured, RunOutcome};
