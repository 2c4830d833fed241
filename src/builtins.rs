use crate::error::{RamError, ResourceFault, Span, TypeFault};
use crate::value::Value;
use std::io::{BufRead, Write};

/// Host-provided functions, called with the same `NAME[param=value]` syntax
/// as user functions. Each takes exactly one keyword argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    GetText,
    GetNumber,
    ConvertNumber,
}

impl Builtin {
    pub const ALL: [Builtin; 3] = [Builtin::GetText, Builtin::GetNumber, Builtin::ConvertNumber];

    pub fn lookup(name: &str) -> Option<Builtin> {
        Self::ALL.into_iter().find(|builtin| builtin.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::GetText => "GET_TEXT",
            Builtin::GetNumber => "GET_NUMBER",
            Builtin::ConvertNumber => "CONVERT_NUMBER",
        }
    }

    pub fn parameter(&self) -> &'static str {
        match self {
            Builtin::GetText | Builtin::GetNumber => "m",
            Builtin::ConvertNumber => "arg",
        }
    }

    pub fn call(
        &self,
        argument: Value,
        input: &mut dyn BufRead,
        output: &mut dyn Write,
        span: &Span,
    ) -> Result<Value, RamError> {
        match self {
            Builtin::GetText => {
                prompt(output, &argument, span)?;
                read_line(input, span).map(Value::Text)
            }
            Builtin::GetNumber => {
                prompt(output, &argument, span)?;
                let line = read_line(input, span)?;
                parse_number(&line, span).map(Value::Integer)
            }
            Builtin::ConvertNumber => match argument {
                Value::Text(text) => parse_number(&text, span).map(Value::Integer),
                other => Err(RamError::type_error(
                    TypeFault::ExpectedText,
                    span.clone(),
                    format!("CONVERT_NUMBER expects text, got {}", other.type_name()),
                )),
            },
        }
    }
}

fn prompt(output: &mut dyn Write, message: &Value, span: &Span) -> Result<(), RamError> {
    write!(output, "{}", message)
        .and_then(|_| output.flush())
        .map_err(|error| io_error(error, span))
}

fn read_line(input: &mut dyn BufRead, span: &Span) -> Result<String, RamError> {
    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(0) => Err(RamError::resource_error(
            ResourceFault::InputExhausted,
            span.clone(),
            "Input ended while waiting for a line".to_string(),
        )),
        Ok(_) => {
            let trimmed = line.trim_end_matches(['\n', '\r']).len();
            line.truncate(trimmed);
            Ok(line)
        }
        Err(error) => Err(io_error(error, span)),
    }
}

fn parse_number(text: &str, span: &Span) -> Result<i64, RamError> {
    text.trim().parse::<i64>().map_err(|_| {
        RamError::type_error(
            TypeFault::NotANumber,
            span.clone(),
            format!("'{}' is not a number", text),
        )
        .with_help("Numbers are written as whole decimal integers, e.g. 42 or -7.")
    })
}

fn io_error(error: std::io::Error, span: &Span) -> RamError {
    RamError::resource_error(ResourceFault::Io, span.clone(), format!("I/O error: {}", error))
}
