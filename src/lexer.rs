use crate::error::{LexFault, RamError, Span};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    // Single-character tokens
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Equal,
    Minus,
    Plus,
    Slash,
    Star,

    // Literals
    Identifier,
    Text,
    Integer,

    // Keywords
    And,
    Back,
    Call,
    Display,
    Else,
    False,
    From,
    Function,
    If,
    Is,
    Loop,
    New,
    Or,
    Reset,
    Send,
    Set,
    Takes,
    To,
    True,
    With,

    // Type names
    IntegerType,
    TextType,
    BooleanType,

    // Special
    Eof,
}

impl TokenType {
    pub fn is_keyword(&self) -> bool {
        !matches!(
            self,
            TokenType::LeftParen
                | TokenType::RightParen
                | TokenType::LeftBrace
                | TokenType::RightBrace
                | TokenType::LeftBracket
                | TokenType::RightBracket
                | TokenType::Comma
                | TokenType::Equal
                | TokenType::Minus
                | TokenType::Plus
                | TokenType::Slash
                | TokenType::Star
                | TokenType::Identifier
                | TokenType::Text
                | TokenType::Integer
                | TokenType::Eof
        )
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub span: Span,
    /// 1-based source line the token starts on.
    pub line: usize,
}

impl Token {
    pub fn new(token_type: TokenType, lexeme: String, span: Span, line: usize) -> Self {
        Self {
            token_type,
            lexeme,
            span,
            line,
        }
    }
}

pub struct Lexer {
    source: String,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: usize,
    keywords: HashMap<&'static str, TokenType>,
}

impl Lexer {
    pub fn new(source: String) -> Self {
        let mut keywords = HashMap::new();
        keywords.insert("and", TokenType::And);
        keywords.insert("back", TokenType::Back);
        keywords.insert("call", TokenType::Call);
        keywords.insert("display", TokenType::Display);
        keywords.insert("else", TokenType::Else);
        keywords.insert("false", TokenType::False);
        keywords.insert("from", TokenType::From);
        keywords.insert("function", TokenType::Function);
        keywords.insert("if", TokenType::If);
        keywords.insert("is", TokenType::Is);
        keywords.insert("loop", TokenType::Loop);
        keywords.insert("new", TokenType::New);
        keywords.insert("or", TokenType::Or);
        keywords.insert("reset", TokenType::Reset);
        keywords.insert("send", TokenType::Send);
        keywords.insert("set", TokenType::Set);
        keywords.insert("takes", TokenType::Takes);
        keywords.insert("to", TokenType::To);
        keywords.insert("true", TokenType::True);
        keywords.insert("with", TokenType::With);
        keywords.insert("integer", TokenType::IntegerType);
        keywords.insert("text", TokenType::TextType);
        keywords.insert("boolean", TokenType::BooleanType);

        Self {
            source,
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
            keywords,
        }
    }

    pub fn scan_tokens(&mut self) -> Result<Vec<Token>, RamError> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token()?;
        }

        self.tokens.push(Token::new(
            TokenType::Eof,
            "".to_string(),
            Span::single(self.current),
            self.line,
        ));

        Ok(std::mem::take(&mut self.tokens))
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn scan_token(&mut self) -> Result<(), RamError> {
        let c = self.advance();

        match c {
            '(' => self.add_token(TokenType::LeftParen),
            ')' => self.add_token(TokenType::RightParen),
            '{' => self.add_token(TokenType::LeftBrace),
            '}' => self.add_token(TokenType::RightBrace),
            '[' => self.add_token(TokenType::LeftBracket),
            ']' => self.add_token(TokenType::RightBracket),
            ',' => self.add_token(TokenType::Comma),
            '=' => self.add_token(TokenType::Equal),
            '-' => self.add_token(TokenType::Minus),
            '+' => self.add_token(TokenType::Plus),
            '*' => self.add_token(TokenType::Star),
            '/' => self.add_token(TokenType::Slash),
            '%' => {
                // Comment goes until end of line
                while self.peek() != '\n' && !self.is_at_end() {
                    self.advance();
                }
            }
            ' ' | '\r' | '\t' => {}
            '\n' => self.line += 1,
            '"' => self.text()?,
            '\'' => {
                return Err(RamError::lex_error(
                    LexFault::UnterminatedString,
                    Span::single(self.start),
                    "Text literals must be enclosed in double quotes".to_string(),
                )
                .with_help("Write \"hello\" instead of 'hello'."));
            }
            c if c.is_ascii_digit() => self.integer()?,
            c if c.is_alphabetic() || c == '_' => self.identifier(),
            _ => {
                return Err(RamError::lex_error(
                    LexFault::UnexpectedChar,
                    Span::new(self.start, self.current),
                    format!("Unexpected character: '{}'", c),
                ));
            }
        }

        Ok(())
    }

    fn advance(&mut self) -> char {
        match self.source[self.current..].chars().next() {
            Some(c) => {
                self.current += c.len_utf8();
                c
            }
            None => '\0',
        }
    }

    fn peek(&self) -> char {
        self.source[self.current..].chars().next().unwrap_or('\0')
    }

    fn text(&mut self) -> Result<(), RamError> {
        while self.peek() != '"' && self.peek() != '\n' && !self.is_at_end() {
            self.advance();
        }

        if self.peek() != '"' {
            return Err(RamError::lex_error(
                LexFault::UnterminatedString,
                Span::new(self.start, self.current.max(self.start + 1)),
                "Unterminated text literal".to_string(),
            )
            .with_help("Close the text with '\"' before the end of the line."));
        }

        // Consume the closing "
        self.advance();

        let content = self.source[self.start + 1..self.current - 1].to_string();
        self.add_token_with_content(TokenType::Text, content);
        Ok(())
    }

    fn integer(&mut self) -> Result<(), RamError> {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        let number_slice = &self.source[self.start..self.current];
        if number_slice.parse::<i64>().is_err() {
            return Err(RamError::lex_error(
                LexFault::InvalidInteger,
                Span::new(self.start, self.current),
                format!("Integer literal out of range: {}", number_slice),
            ));
        }

        let lexeme = number_slice.to_string();
        self.add_token_with_content(TokenType::Integer, lexeme);
        Ok(())
    }

    fn identifier(&mut self) {
        while self.peek().is_alphanumeric() || self.peek() == '_' {
            self.advance();
        }

        let text = &self.source[self.start..self.current];
        let token_type = self
            .keywords
            .get(text)
            .copied()
            .unwrap_or(TokenType::Identifier);

        self.add_token(token_type);
    }

    fn add_token(&mut self, token_type: TokenType) {
        let text = self.source[self.start..self.current].to_string();
        self.add_token_with_content(token_type, text);
    }

    fn add_token_with_content(&mut self, token_type: TokenType, lexeme: String) {
        self.tokens.push(Token::new(
            token_type,
            lexeme,
            Span::new(self.start, self.current),
            self.line,
        ));
    }
}
