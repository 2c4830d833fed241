use crate::ast::{BinaryOp, CallExpr, Expr, FunctionDef, KeywordArg, Param, Program, Stmt};
use crate::error::{ArgumentFault, RamError, Span};
use crate::lexer::{Token, TokenType};
use crate::value::{Value, ValueKind};
use std::rc::Rc;

/// Deepest nesting of blocks and sub-expressions the parser accepts.
pub const MAX_NESTING: usize = 128;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    depth: usize,
}

impl Parser {
    /// Parses `tokens` as produced by [`Lexer::scan_tokens`](crate::lexer::Lexer::scan_tokens).
    /// A missing trailing `Eof` token is supplied.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|token| token.token_type) != Some(TokenType::Eof) {
            let end = tokens.last().map(|token| token.span.end).unwrap_or(0);
            let line = tokens.last().map(|token| token.line).unwrap_or(1);
            tokens.push(Token::new(TokenType::Eof, String::new(), Span::single(end), line));
        }
        Self {
            tokens,
            current: 0,
            depth: 0,
        }
    }

    pub fn parse(&mut self) -> Result<Program, RamError> {
        let mut statements = Vec::new();
        let mut seen_call = false;

        while !self.is_at_end() {
            if self.check(&TokenType::New) {
                if seen_call {
                    return Err(RamError::parse_error_with_help(
                        self.peek().span.clone(),
                        "Function definitions must come before top-level calls".to_string(),
                        "Move this 'new function' above the first top-level call.".to_string(),
                    ));
                }
                statements.push(self.function_definition()?);
            } else if self.check(&TokenType::Call) || self.at_bare_call() {
                seen_call = true;
                statements.push(self.call_statement()?);
            } else {
                return Err(RamError::parse_error_with_help(
                    self.peek().span.clone(),
                    format!(
                        "Expected function definition or call, found '{}'",
                        describe(self.peek())
                    ),
                    "Top-level code may only define functions with 'new function' and call them, e.g. 'call main[none=0]'.".to_string(),
                ));
            }
            self.end_of_line("top-level statement")?;
        }

        Ok(Program { statements })
    }

    fn function_definition(&mut self) -> Result<Stmt, RamError> {
        let start = self.advance().span.clone();
        self.consume(TokenType::Function, "Expected 'function' after 'new'")?;
        let name = self
            .consume_with_help(
                TokenType::Identifier,
                "Expected function name",
                "Function headers look like: new function name takes (a, b) {".to_string(),
            )?
            .lexeme
            .clone();
        self.consume(TokenType::Takes, "Expected 'takes' after function name")?;
        self.consume_with_help(
            TokenType::LeftParen,
            "Expected '(' after 'takes'",
            "List the parameters in parentheses, or write (none) for a function without inputs.".to_string(),
        )?;

        let mut params: Vec<Param> = Vec::new();
        loop {
            let token = self
                .consume_with_help(
                    TokenType::Identifier,
                    "Expected parameter name",
                    "Parameters are comma-separated names, or 'none'.".to_string(),
                )?
                .clone();
            if params.iter().any(|param| param.name == token.lexeme) {
                return Err(RamError::parse_error(
                    token.span,
                    format!("Duplicate parameter '{}'", token.lexeme),
                ));
            }
            params.push(Param {
                name: token.lexeme,
                span: token.span,
            });
            if !self.match_types(&[TokenType::Comma]) {
                break;
            }
        }
        self.consume(TokenType::RightParen, "Expected ')' after parameters")?;

        let body = self.block("function body")?;
        let end = self.previous().span.clone();

        Ok(Stmt::FunctionDef(Rc::new(FunctionDef {
            name,
            params,
            body,
            span: start.to(&end),
        })))
    }

    fn statement(&mut self) -> Result<Stmt, RamError> {
        if self.match_types(&[TokenType::Set]) {
            self.var_declaration()
        } else if self.match_types(&[TokenType::Reset]) {
            self.var_reset()
        } else if self.match_types(&[TokenType::If]) {
            self.if_statement()
        } else if self.match_types(&[TokenType::Loop]) {
            self.loop_statement()
        } else if self.match_types(&[TokenType::Display]) {
            self.display_statement()
        } else if self.match_types(&[TokenType::Send]) {
            self.return_statement()
        } else if self.check(&TokenType::Call) || self.at_bare_call() {
            self.call_statement()
        } else {
            let token = self.peek();
            let help = match token.token_type {
                TokenType::New => "Functions can only be defined at the top level.",
                TokenType::Else => "'else' must follow the closing '}' of an if body on the same line: } else {",
                TokenType::Eof => "Reached end of input inside a block; a closing '}' is missing.",
                _ => "Statements start with set, reset, if, loop, display, send back or call.",
            };
            Err(RamError::parse_error_with_help(
                token.span.clone(),
                format!("Expected statement, found '{}'", describe(token)),
                help.to_string(),
            ))
        }
    }

    /// Parses `{`, newline-framed statements, then `}`.
    fn block(&mut self, context: &str) -> Result<Vec<Stmt>, RamError> {
        self.consume_with_help(
            TokenType::LeftBrace,
            &format!("Expected '{{' to open {}", context),
            "Blocks open with '{' at the end of the header line.".to_string(),
        )?;
        self.end_of_line("'{'")?;
        self.enter()?;

        let mut statements: Vec<Stmt> = Vec::new();
        while !self.check(&TokenType::RightBrace) && !self.is_at_end() {
            if let Some(Stmt::Return { .. }) = statements.last() {
                return Err(RamError::parse_error_with_help(
                    self.peek().span.clone(),
                    format!("Expected '}}' after 'send back', found '{}'", describe(self.peek())),
                    "'send back' must be the last statement of its block.".to_string(),
                ));
            }
            statements.push(self.statement()?);
            self.end_of_line("statement")?;
        }

        self.consume_with_help(
            TokenType::RightBrace,
            &format!("Expected '}}' to close {}", context),
            "Every '{' needs a matching '}' on its own line.".to_string(),
        )?;
        self.depth -= 1;
        Ok(statements)
    }

    fn declared_type(&mut self, keyword: &str) -> Result<ValueKind, RamError> {
        let kind = match self.peek().token_type {
            TokenType::IntegerType => ValueKind::Integer,
            TokenType::TextType => ValueKind::Text,
            TokenType::BooleanType => ValueKind::Boolean,
            _ => {
                return Err(RamError::parse_error_with_help(
                    self.error_span(),
                    format!("Expected type name after '{}', found '{}'", keyword, describe(self.peek())),
                    "Types are integer, text and boolean.".to_string(),
                ));
            }
        };
        self.advance();
        Ok(kind)
    }

    fn variable_name(&mut self) -> Result<Token, RamError> {
        if self.peek().token_type.is_keyword() {
            return Err(RamError::parse_error_with_help(
                self.peek().span.clone(),
                format!("Expected variable name, found '{}'", self.peek().lexeme),
                format!("'{}' is a reserved word and cannot name a variable.", self.peek().lexeme),
            ));
        }
        Ok(self
            .consume(TokenType::Identifier, "Expected variable name")?
            .clone())
    }

    fn var_declaration(&mut self) -> Result<Stmt, RamError> {
        let start = self.previous().span.clone();
        let declared_type = self.declared_type("set")?;
        let name = self.variable_name()?;
        self.consume(TokenType::To, "Expected 'to' after variable name")?;
        let init = self.expression()?;
        let span = start.to(init.span());

        Ok(Stmt::VarDecl {
            declared_type,
            name: name.lexeme,
            init,
            span,
        })
    }

    fn var_reset(&mut self) -> Result<Stmt, RamError> {
        let start = self.previous().span.clone();
        let declared_type = self.declared_type("reset")?;
        let name = self.variable_name()?;
        self.consume(TokenType::To, "Expected 'to' after variable name")?;
        let value = self.expression()?;
        let span = start.to(value.span());

        Ok(Stmt::VarReset {
            declared_type,
            name: name.lexeme,
            value,
            span,
        })
    }

    fn if_statement(&mut self) -> Result<Stmt, RamError> {
        let start = self.previous().span.clone();
        let condition = self.expression()?;
        let then_body = self.block("if body")?;

        let else_body = if self.check(&TokenType::Else) && self.peek().line == self.previous().line
        {
            self.advance();
            if self.match_types(&[TokenType::If]) {
                // else if: the nested if is the whole else body
                Some(vec![self.if_statement()?])
            } else {
                Some(self.block("else body")?)
            }
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_body,
            else_body,
            span: start.to(&self.previous().span),
        })
    }

    fn loop_statement(&mut self) -> Result<Stmt, RamError> {
        let start = self.previous().span.clone();
        self.consume_with_help(
            TokenType::With,
            "Expected 'with' after 'loop'",
            "Loops look like: loop with i from 1 to 10 {".to_string(),
        )?;
        let variable = self.variable_name()?;
        self.consume(TokenType::From, "Expected 'from' after loop variable")?;
        let from = self.expression()?;
        self.consume(TokenType::To, "Expected 'to' after loop start")?;
        let to = self.expression()?;
        let body = self.block("loop body")?;

        Ok(Stmt::Loop {
            variable: variable.lexeme,
            from,
            to,
            body,
            span: start.to(&self.previous().span),
        })
    }

    fn display_statement(&mut self) -> Result<Stmt, RamError> {
        let start = self.previous().span.clone();
        let expr = self.expression()?;
        let span = start.to(expr.span());
        Ok(Stmt::Display { expr, span })
    }

    fn return_statement(&mut self) -> Result<Stmt, RamError> {
        let start = self.previous().span.clone();
        self.consume(TokenType::Back, "Expected 'back' after 'send'")?;
        let expr = self.expression()?;
        let span = start.to(expr.span());
        Ok(Stmt::Return { expr, span })
    }

    fn call_statement(&mut self) -> Result<Stmt, RamError> {
        let start = self.peek().span.clone();
        let explicit = self.match_types(&[TokenType::Call]);
        let expr = self.expression()?;

        match expr {
            Expr::Call(call) => {
                let span = start.to(&call.span);
                Ok(Stmt::Call { call, span })
            }
            other if explicit => Err(RamError::parse_error_with_help(
                other.span().clone(),
                "Expected a function call after 'call'".to_string(),
                "Write the call as name[param=value], e.g. call main[none=0]".to_string(),
            )),
            other => Err(RamError::parse_error(
                other.span().clone(),
                "Expected a function call".to_string(),
            )),
        }
    }

    fn expression(&mut self) -> Result<Expr, RamError> {
        self.enter()?;
        let expr = self.or();
        self.depth -= 1;
        expr
    }

    fn or(&mut self) -> Result<Expr, RamError> {
        let mut expr = self.and()?;

        while self.match_types(&[TokenType::Or]) {
            let right = self.operand(Self::and)?;
            expr = binary(expr, BinaryOp::Or, right);
        }

        Ok(expr)
    }

    fn and(&mut self) -> Result<Expr, RamError> {
        let mut expr = self.equality()?;

        while self.match_types(&[TokenType::And]) {
            let right = self.operand(Self::equality)?;
            expr = binary(expr, BinaryOp::And, right);
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr, RamError> {
        let mut expr = self.term()?;

        while self.match_types(&[TokenType::Is]) {
            let right = self.operand(Self::term)?;
            expr = binary(expr, BinaryOp::Is, right);
        }

        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr, RamError> {
        let mut expr = self.factor()?;

        while self.match_types(&[TokenType::Minus, TokenType::Plus]) {
            let operator = match self.previous().token_type {
                TokenType::Minus => BinaryOp::Subtract,
                TokenType::Plus => BinaryOp::Add,
                other => unreachable!("term matched {:?}", other),
            };
            let right = self.operand(Self::factor)?;
            expr = binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr, RamError> {
        let mut expr = self.primary()?;

        while self.match_types(&[TokenType::Slash, TokenType::Star]) {
            let operator = match self.previous().token_type {
                TokenType::Slash => BinaryOp::Divide,
                TokenType::Star => BinaryOp::Multiply,
                other => unreachable!("factor matched {:?}", other),
            };
            let right = self.operand(Self::primary)?;
            expr = binary(expr, operator, right);
        }

        Ok(expr)
    }

    /// Right-hand operand of the operator just consumed.
    fn operand(
        &mut self,
        next: fn(&mut Self) -> Result<Expr, RamError>,
    ) -> Result<Expr, RamError> {
        let operator_token = self.previous().clone();
        next(self).map_err(|error| match error.message.strip_prefix("Expected expression,") {
            Some(found) => RamError::parse_error_with_help(
                error.span,
                format!("Expected expression after '{}',{}", operator_token.lexeme, found),
                "Binary operators need an expression on both sides.".to_string(),
            ),
            None => error,
        })
    }

    fn primary(&mut self) -> Result<Expr, RamError> {
        if self.is_at_end() {
            return Err(RamError::parse_error_with_help(
                self.error_span(),
                "Expected expression, found 'end of input'".to_string(),
                "Check for an incomplete statement or an unmatched '('.".to_string(),
            ));
        }

        let token = self.advance().clone();

        match token.token_type {
            TokenType::False => Ok(Expr::Literal {
                value: Value::Boolean(false),
                span: token.span,
            }),
            TokenType::True => Ok(Expr::Literal {
                value: Value::Boolean(true),
                span: token.span,
            }),
            TokenType::Integer => {
                let value = token.lexeme.parse::<i64>().map_err(|_| {
                    RamError::parse_error(token.span.clone(), "Invalid integer".to_string())
                })?;
                Ok(Expr::Literal {
                    value: Value::Integer(value),
                    span: token.span,
                })
            }
            TokenType::Text => Ok(Expr::Literal {
                value: Value::Text(token.lexeme),
                span: token.span,
            }),
            TokenType::Identifier => {
                if self.check(&TokenType::LeftBracket) {
                    self.finish_call(token)
                } else {
                    Ok(Expr::Identifier {
                        name: token.lexeme,
                        span: token.span,
                    })
                }
            }
            TokenType::LeftParen => {
                if self.check(&TokenType::RightParen) {
                    return Err(RamError::parse_error_with_help(
                        token.span.to(&self.peek().span),
                        "Empty parentheses are not allowed".to_string(),
                        "Parentheses must contain an expression, e.g. (x + 1)".to_string(),
                    ));
                }
                let expr = self.expression()?;
                self.consume_with_help(
                    TokenType::RightParen,
                    "Expected ')' after expression",
                    "Every opening parenthesis '(' must have a matching closing parenthesis ')'.".to_string(),
                )?;
                Ok(expr)
            }
            _ => {
                let help_msg = match token.token_type {
                    TokenType::RightParen => "Found ')' without matching '('. Check for unbalanced parentheses.",
                    TokenType::RightBrace => "Found '}' without matching '{'. Check for unbalanced braces.",
                    TokenType::RightBracket => "Found ']' outside of a call.",
                    TokenType::LeftBracket => "'[' must directly follow a function name, e.g. name[x=1]",
                    _ => "Expected a literal value, variable, call or parenthesized expression here.",
                };

                Err(RamError::parse_error_with_help(
                    token.span.clone(),
                    format!("Expected expression, found '{}'", describe(&token)),
                    help_msg.to_string(),
                ))
            }
        }
    }

    /// Parses `[name=value,...]` after the callee name.
    fn finish_call(&mut self, callee: Token) -> Result<Expr, RamError> {
        let first_index = self.current - 1;
        self.advance(); // consume '['

        let mut args: Vec<KeywordArg> = Vec::new();
        if !self.check(&TokenType::RightBracket) {
            loop {
                let name = self
                    .consume_with_help(
                        TokenType::Identifier,
                        "Expected parameter name in call",
                        "Call arguments are passed by keyword: name[param=value]".to_string(),
                    )?
                    .clone();
                self.consume_with_help(
                    TokenType::Equal,
                    "Expected '=' after parameter name",
                    "Call arguments are passed by keyword: name[param=value]".to_string(),
                )?;
                let value = self.expression()?;

                if args.iter().any(|arg| arg.name == name.lexeme) {
                    return Err(RamError::argument_error(
                        ArgumentFault::DuplicateArgument,
                        name.span,
                        format!(
                            "Argument '{}' is passed more than once to '{}'",
                            name.lexeme, callee.lexeme
                        ),
                    ));
                }

                let span = name.span.to(value.span());
                args.push(KeywordArg {
                    name: name.lexeme,
                    value,
                    span,
                });

                if !self.match_types(&[TokenType::Comma]) {
                    break;
                }
            }
        }

        let close = self
            .consume_with_help(
                TokenType::RightBracket,
                "Expected ']' after arguments",
                "Calls are closed with ']', e.g. name[a=1,b=2]".to_string(),
            )?
            .clone();

        // name[...] is written without any whitespace
        for pair in self.tokens[first_index..self.current].windows(2) {
            if pair[1].span.start != pair[0].span.end {
                return Err(RamError::parse_error_with_help(
                    Span::new(pair[0].span.end, pair[1].span.start),
                    format!("Expected no whitespace in call to '{}', found a gap", callee.lexeme),
                    format!(
                        "Write calls without spaces, e.g. {}[x=1,y=2]",
                        callee.lexeme
                    ),
                ));
            }
        }

        Ok(Expr::Call(CallExpr {
            callee: callee.lexeme,
            args,
            span: callee.span.to(&close.span),
        }))
    }

    fn enter(&mut self) -> Result<(), RamError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(RamError::parse_error_with_help(
                self.peek().span.clone(),
                "Expected shallower code, found nesting too deep to parse".to_string(),
                format!("Blocks and expressions may nest at most {} levels.", MAX_NESTING),
            ));
        }
        Ok(())
    }

    /// A statement must be the last thing on its line.
    fn end_of_line(&self, after: &str) -> Result<(), RamError> {
        if self.is_at_end() || self.peek().line > self.previous().line {
            return Ok(());
        }
        Err(RamError::parse_error_with_help(
            self.peek().span.clone(),
            format!("Expected end of line after {}, found '{}'", after, describe(self.peek())),
            "Each statement, and each closing '}', goes on its own line.".to_string(),
        ))
    }

    fn at_bare_call(&self) -> bool {
        self.check(&TokenType::Identifier)
            && self
                .tokens
                .get(self.current + 1)
                .map(|next| next.token_type == TokenType::LeftBracket)
                .unwrap_or(false)
    }

    fn match_types(&mut self, types: &[TokenType]) -> bool {
        for token_type in types {
            if self.check(token_type) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn check(&self, token_type: &TokenType) -> bool {
        if self.is_at_end() {
            false
        } else {
            &self.peek().token_type == token_type
        }
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    /// Span to blame for an unexpected token; at EOF, just past the last real token.
    fn error_span(&self) -> Span {
        if self.is_at_end() && self.current > 0 {
            Span::single(self.tokens[self.current - 1].span.end)
        } else {
            self.peek().span.clone()
        }
    }

    fn consume(&mut self, token_type: TokenType, message: &str) -> Result<&Token, RamError> {
        if self.check(&token_type) {
            Ok(self.advance())
        } else {
            Err(RamError::parse_error(
                self.error_span(),
                format!("{}, found '{}'", message, describe(self.peek())),
            ))
        }
    }

    fn consume_with_help(
        &mut self,
        token_type: TokenType,
        message: &str,
        help: String,
    ) -> Result<&Token, RamError> {
        if self.check(&token_type) {
            Ok(self.advance())
        } else {
            Err(RamError::parse_error_with_help(
                self.error_span(),
                format!("{}, found '{}'", message, describe(self.peek())),
                help,
            ))
        }
    }
}

fn binary(left: Expr, operator: BinaryOp, right: Expr) -> Expr {
    let span = left.span().to(right.span());
    Expr::Binary {
        left: Box::new(left),
        operator,
        right: Box::new(right),
        span,
    }
}

fn describe(token: &Token) -> String {
    match token.token_type {
        TokenType::Eof => "end of input".to_string(),
        TokenType::Text => format!("\"{}\"", token.lexeme),
        _ => token.lexeme.clone(),
    }
}
