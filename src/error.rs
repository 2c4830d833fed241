use ariadne::{Color, Fmt, Label, Report, ReportKind, Source};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn single(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos + 1,
        }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(&self, other: &Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LexFault {
    #[error("unterminated string")]
    UnterminatedString,
    #[error("unexpected character")]
    UnexpectedChar,
    #[error("invalid integer literal")]
    InvalidInteger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NameFault {
    #[error("name already declared in this scope")]
    AlreadyDeclaredInScope,
    #[error("undeclared name")]
    Undeclared,
    #[error("duplicate function")]
    DuplicateFunction,
    #[error("unknown function")]
    UnknownFunction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TypeFault {
    #[error("incompatible operands")]
    IncompatibleOperands,
    #[error("expected a boolean")]
    ExpectedBoolean,
    #[error("expected an integer")]
    ExpectedInteger,
    #[error("expected text")]
    ExpectedText,
    #[error("no return value")]
    NoReturnValue,
    #[error("not a number")]
    NotANumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentFault {
    #[error("missing parameter")]
    MissingParameter,
    #[error("unknown parameter")]
    UnknownParameter,
    #[error("duplicate argument")]
    DuplicateArgument,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ArithmeticFault {
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    Overflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ResourceFault {
    #[error("stack exhausted")]
    StackExhausted,
    #[error("input exhausted")]
    InputExhausted,
    #[error("i/o failure")]
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    #[error("LexError({0})")]
    Lex(#[from] LexFault),
    #[error("ParseError")]
    Parse,
    #[error("NameError({0})")]
    Name(#[from] NameFault),
    #[error("TypeError({0})")]
    Type(#[from] TypeFault),
    #[error("ArgumentError({0})")]
    Argument(#[from] ArgumentFault),
    #[error("ArithmeticError({0})")]
    Arithmetic(#[from] ArithmeticFault),
    #[error("ResourceError({0})")]
    Resource(#[from] ResourceFault),
}

impl ErrorKind {
    /// Load-time errors stop the program before anything runs.
    pub fn is_load_error(&self) -> bool {
        matches!(self, ErrorKind::Lex(_) | ErrorKind::Parse)
    }

    fn title(&self) -> &'static str {
        match self {
            ErrorKind::Lex(_) => "Lexical Error",
            ErrorKind::Parse => "Parse Error",
            ErrorKind::Name(_) => "Name Error",
            ErrorKind::Type(_) => "Type Error",
            ErrorKind::Argument(_) => "Argument Error",
            ErrorKind::Arithmetic(_) => "Arithmetic Error",
            ErrorKind::Resource(_) => "Resource Error",
        }
    }

    fn color(&self) -> Color {
        match self {
            ErrorKind::Lex(_) => Color::Red,
            ErrorKind::Parse => Color::Yellow,
            ErrorKind::Resource(_) => Color::Red,
            _ => Color::Magenta,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RamError {
    pub kind: ErrorKind,
    pub span: Span,
    pub message: String,
    pub help: Option<String>,
}

impl RamError {
    pub fn new(kind: impl Into<ErrorKind>, span: Span, message: String) -> Self {
        Self {
            kind: kind.into(),
            span,
            message,
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn lex_error(fault: LexFault, span: Span, message: String) -> Self {
        Self::new(fault, span, message)
    }

    pub fn parse_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::Parse, span, message)
    }

    pub fn parse_error_with_help(span: Span, message: String, help: String) -> Self {
        Self::new(ErrorKind::Parse, span, message).with_help(help)
    }

    pub fn name_error(fault: NameFault, span: Span, message: String) -> Self {
        Self::new(fault, span, message)
    }

    pub fn type_error(fault: TypeFault, span: Span, message: String) -> Self {
        Self::new(fault, span, message)
    }

    pub fn argument_error(fault: ArgumentFault, span: Span, message: String) -> Self {
        Self::new(fault, span, message)
    }

    pub fn resource_error(fault: ResourceFault, span: Span, message: String) -> Self {
        Self::new(fault, span, message)
    }

    /// 1-based line and column of the error start within `source`.
    pub fn position(&self, source: &str) -> (usize, usize) {
        let prefix = source.get(..self.span.start).unwrap_or(source);
        let line = prefix.matches('\n').count() + 1;
        let column = prefix
            .rsplit('\n')
            .next()
            .map(|tail| tail.chars().count() + 1)
            .unwrap_or(1);
        (line, column)
    }

    pub fn report(&self, source: &str, filename: Option<&str>) {
        let filename = filename.unwrap_or("<source>");
        let color = self.kind.color();

        // ariadne counts characters, spans count bytes
        let to_chars = |offset: usize| {
            source
                .get(..offset.min(source.len()))
                .map(|prefix| prefix.chars().count())
                .unwrap_or(offset)
        };
        let start = to_chars(self.span.start);
        let end = to_chars(self.span.end).max(start + 1);

        let mut report_builder = Report::build(ReportKind::Error, filename, start)
            .with_message(format!("{}: {}", self.kind.title().fg(color), self.message))
            .with_label(
                Label::new((filename, start..end))
                    .with_message(self.kind.to_string())
                    .with_color(color),
            );

        if let Some(ref help_text) = self.help {
            report_builder =
                report_builder.with_note(format!("{}: {}", "help".fg(Color::Cyan), help_text));
        }

        if let Err(error) = report_builder
            .finish()
            .eprint((filename, Source::from(source)))
        {
            let (line, column) = self.position(source);
            eprintln!(
                "{}:{}:{}: {}: {} ({})",
                filename,
                line,
                column,
                self.kind.title(),
                self.message,
                error
            );
        }
    }
}

impl fmt::Display for RamError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}
