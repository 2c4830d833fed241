use crate::ast::Program;
use crate::config::Config;
use crate::error::RamError;
use crate::evaluator::Evaluator;
use crate::lexer::Lexer;
use crate::parser::Parser;
use log::trace;
use std::io;

/// Lexes and parses `source`. Nothing runs if this fails.
pub fn load(source: &str) -> Result<Program, RamError> {
    trace!("Lexing {} bytes", source.len());
    let mut lexer = Lexer::new(source.to_string());
    let tokens = lexer.scan_tokens()?;

    trace!("Parsing {} tokens", tokens.len());
    let mut parser = Parser::new(tokens);
    parser.parse()
}

/// Runs a program against stdin/stdout, reporting any error to stderr.
/// Returns the process exit status.
pub fn run(source: &str, filename: Option<&str>, config: &Config) -> i32 {
    let program = match load(source) {
        Ok(program) => program,
        Err(error) => {
            error.report(source, filename);
            return 1;
        }
    };

    trace!("Evaluating {} top-level statements", program.statements.len());
    let mut evaluator = Evaluator::with_config(io::stdin().lock(), io::stdout(), config.clone());
    match evaluator.execute(&program) {
        Ok(()) => 0,
        Err(error) => {
            error.report(source, filename);
            1
        }
    }
}

/// Output lines of a run plus how it ended; lines written before a failure are kept.
#[derive(Debug)]
pub struct RunOutcome {
    pub output: Vec<String>,
    pub result: Result<(), RamError>,
}

impl RunOutcome {
    pub fn exit_status(&self) -> i32 {
        if self.result.is_ok() {
            0
        } else {
            1
        }
    }
}

/// Runs `source` with `input` as the console and captures everything it prints.
pub fn run_captured(source: &str, input: &str, config: &Config) -> RunOutcome {
    let program = match load(source) {
        Ok(program) => program,
        Err(error) => {
            return RunOutcome {
                output: Vec::new(),
                result: Err(error),
            }
        }
    };

    let mut buffer = Vec::new();
    let result = {
        let mut evaluator = Evaluator::with_config(input.as_bytes(), &mut buffer, config.clone());
        evaluator.execute(&program)
    };

    RunOutcome {
        output: String::from_utf8_lossy(&buffer)
            .lines()
            .map(str::to_string)
            .collect(),
        result,
    }
}
