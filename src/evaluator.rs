use crate::ast::{BinaryOp, CallExpr, Expr, FunctionDef, KeywordArg, Program, Stmt};
use crate::builtins::Builtin;
use crate::config::Config;
use crate::environment::Environment;
use crate::error::{ArgumentFault, NameFault, RamError, ResourceFault, Span, TypeFault};
use crate::value::{Value, ValueKind};
use log::{debug, trace};
use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::mem;
use std::rc::Rc;

pub type ExecutionResult = Result<(), RamError>;

/// Remaining native stack below which evaluation switches to a fresh segment.
const STACK_RED_ZONE: usize = 128 * 1024;
/// Size of each extra stack segment.
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

/// How control leaves a statement.
enum Flow {
    Normal,
    Return(Value),
}

enum Callable {
    User(Rc<FunctionDef>),
    Builtin(Builtin),
}

pub struct Evaluator<'io> {
    environment: Environment,
    functions: HashMap<String, Rc<FunctionDef>>,
    input: Box<dyn BufRead + 'io>,
    output: Box<dyn Write + 'io>,
    config: Config,
    call_depth: usize,
}

impl<'io> Evaluator<'io> {
    pub fn new(input: impl BufRead + 'io, output: impl Write + 'io) -> Self {
        Self::with_config(input, output, Config::default())
    }

    pub fn with_config(
        input: impl BufRead + 'io,
        output: impl Write + 'io,
        config: Config,
    ) -> Self {
        Self {
            environment: Environment::new(),
            functions: HashMap::new(),
            input: Box::new(input),
            output: Box::new(output),
            config,
            call_depth: 0,
        }
    }

    /// Registers every function definition, then runs the top-level calls in order.
    pub fn execute(&mut self, program: &Program) -> ExecutionResult {
        self.environment = Environment::new();
        self.functions.clear();
        self.call_depth = 0;

        for statement in &program.statements {
            if let Stmt::FunctionDef(def) = statement {
                self.define(def)?;
            }
        }
        trace!("Registered {} functions", self.functions.len());

        for statement in &program.statements {
            if !matches!(statement, Stmt::FunctionDef(_)) {
                self.execute_statement(statement)?;
            }
        }
        Ok(())
    }

    fn define(&mut self, def: &Rc<FunctionDef>) -> Result<(), RamError> {
        if Builtin::lookup(&def.name).is_some() || self.functions.contains_key(&def.name) {
            return Err(RamError::name_error(
                NameFault::DuplicateFunction,
                def.span.clone(),
                format!("Function '{}' is already defined", def.name),
            )
            .with_help("Function names must be unique and may not reuse a built-in name."));
        }
        self.functions.insert(def.name.clone(), Rc::clone(def));
        Ok(())
    }

    fn execute_statement(&mut self, stmt: &Stmt) -> Result<Flow, RamError> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            self.execute_statement_inner(stmt)
        })
    }

    fn execute_statement_inner(&mut self, stmt: &Stmt) -> Result<Flow, RamError> {
        match stmt {
            // nested definitions are rejected by the parser; top-level ones are registered
            Stmt::FunctionDef(_) => Ok(Flow::Normal),
            Stmt::VarDecl {
                declared_type,
                name,
                init,
                span,
            } => {
                let value = self.evaluate_expression(init)?;
                self.environment
                    .declare(name, *declared_type, value)
                    .map_err(|fault| {
                        RamError::name_error(
                            fault,
                            span.clone(),
                            format!("'{}' is already declared in this scope", name),
                        )
                        .with_help("Use 'reset' to change an existing variable.")
                    })?;
                Ok(Flow::Normal)
            }
            Stmt::VarReset {
                name, value, span, ..
            } => {
                let value = self.evaluate_expression(value)?;
                self.environment.assign(name, value).map_err(|fault| {
                    RamError::name_error(
                        fault,
                        span.clone(),
                        format!("Cannot reset '{}': it was never declared", name),
                    )
                    .with_help("Declare the variable first with 'set'.")
                })?;
                Ok(Flow::Normal)
            }
            Stmt::If {
                condition,
                then_body,
                else_body,
                ..
            } => {
                let condition_value = self.evaluate_expression(condition)?;
                let truth = condition_value
                    .as_condition()
                    .map_err(|error| error.at(condition.span()))?;
                if truth {
                    self.execute_block(then_body)
                } else if let Some(else_body) = else_body {
                    self.execute_block(else_body)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::Loop {
                variable,
                from,
                to,
                body,
                span,
            } => {
                let start = self
                    .evaluate_expression(from)?
                    .as_integer()
                    .map_err(|error| error.at(from.span()))?;
                let end = self
                    .evaluate_expression(to)?
                    .as_integer()
                    .map_err(|error| error.at(to.span()))?;

                for i in start..=end {
                    if let Flow::Return(value) = self.execute_iteration(variable, i, body, span)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Display { expr, span } => {
                let value = self.evaluate_expression(expr)?;
                writeln!(self.output, "{}", value)
                    .and_then(|_| self.output.flush())
                    .map_err(|error| {
                        RamError::resource_error(
                            ResourceFault::Io,
                            span.clone(),
                            format!("Could not write output: {}", error),
                        )
                    })?;
                Ok(Flow::Normal)
            }
            Stmt::Return { expr, .. } => Ok(Flow::Return(self.evaluate_expression(expr)?)),
            Stmt::Call { call, .. } => {
                self.call(call)?;
                Ok(Flow::Normal)
            }
        }
    }

    fn execute_statements(&mut self, statements: &[Stmt]) -> Result<Flow, RamError> {
        for statement in statements {
            if let Flow::Return(value) = self.execute_statement(statement)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn execute_block(&mut self, statements: &[Stmt]) -> Result<Flow, RamError> {
        self.environment.push_frame();
        let result = self.execute_statements(statements);
        self.environment.pop_frame();
        result
    }

    /// One loop pass in a fresh frame holding only the loop variable.
    fn execute_iteration(
        &mut self,
        variable: &str,
        counter: i64,
        body: &[Stmt],
        span: &Span,
    ) -> Result<Flow, RamError> {
        self.environment.push_frame();
        let result = self
            .environment
            .declare(variable, ValueKind::Integer, Value::Integer(counter))
            .map_err(|fault| {
                RamError::name_error(
                    fault,
                    span.clone(),
                    format!("Loop variable '{}' could not be bound", variable),
                )
            })
            .and_then(|_| self.execute_statements(body));
        self.environment.pop_frame();
        result
    }

    /// Evaluates `expr`, growing the native stack when deep recursion needs it.
    fn evaluate_expression(&mut self, expr: &Expr) -> Result<Value, RamError> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            self.evaluate_expression_inner(expr)
        })
    }

    fn evaluate_expression_inner(&mut self, expr: &Expr) -> Result<Value, RamError> {
        match expr {
            Expr::Literal { value, .. } => Ok(value.clone()),
            Expr::Identifier { name, span } => {
                self.environment.lookup(name).cloned().map_err(|fault| {
                    RamError::name_error(
                        fault,
                        span.clone(),
                        format!("Undeclared variable '{}'", name),
                    )
                })
            }
            Expr::Binary {
                left,
                operator,
                right,
                span,
            } => {
                if let BinaryOp::And | BinaryOp::Or = operator {
                    return self.evaluate_logical(left, *operator, right);
                }
                let left_val = self.evaluate_expression(left)?;
                let right_val = self.evaluate_expression(right)?;
                let result = match operator {
                    BinaryOp::Add => left_val.add(right_val),
                    BinaryOp::Subtract => left_val.subtract(right_val),
                    BinaryOp::Multiply => left_val.multiply(right_val),
                    BinaryOp::Divide => left_val.divide(right_val),
                    BinaryOp::Is => left_val.equals(&right_val),
                    BinaryOp::And | BinaryOp::Or => unreachable!("logical operators short-circuit above"),
                };
                result.map_err(|error| error.at(span))
            }
            Expr::Call(call) => self.call(call)?.ok_or_else(|| {
                RamError::type_error(
                    TypeFault::NoReturnValue,
                    call.span.clone(),
                    format!("'{}' did not send back a value", call.callee),
                )
                .with_help("Only calls that finish with 'send back' can be used as values.")
            }),
        }
    }

    /// `and`/`or` on booleans; the right side runs only when it decides the result.
    fn evaluate_logical(
        &mut self,
        left: &Expr,
        operator: BinaryOp,
        right: &Expr,
    ) -> Result<Value, RamError> {
        let left_val = self.logical_operand(left, operator)?;
        let decided = match operator {
            BinaryOp::Or => left_val,
            _ => !left_val,
        };
        if decided {
            return Ok(Value::Boolean(left_val));
        }
        Ok(Value::Boolean(self.logical_operand(right, operator)?))
    }

    fn logical_operand(&mut self, expr: &Expr, operator: BinaryOp) -> Result<bool, RamError> {
        match self.evaluate_expression(expr)? {
            Value::Boolean(b) => Ok(b),
            other => Err(RamError::type_error(
                TypeFault::ExpectedBoolean,
                expr.span().clone(),
                format!("'{}' needs boolean operands, got {}", operator, other.type_name()),
            )),
        }
    }

    /// Runs a call; `None` is the no-value result of a function that never sent back.
    fn call(&mut self, call: &CallExpr) -> Result<Option<Value>, RamError> {
        let callee = self.resolve(call)?;

        let mut arguments = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            let value = self.evaluate_expression(&arg.value)?;
            arguments.push((arg, value));
        }

        match callee {
            Callable::Builtin(builtin) => {
                debug!("Calling built-in {}", builtin.name());
                let mut bound = bind_arguments(call, &[builtin.parameter()], arguments)?;
                let argument = bound.remove(builtin.parameter()).ok_or_else(|| {
                    missing_parameter(call, builtin.parameter())
                })?;
                builtin
                    .call(argument, &mut *self.input, &mut *self.output, &call.span)
                    .map(Some)
            }
            Callable::User(def) => {
                let params: Vec<&str> = def.params.iter().map(|p| p.name.as_str()).collect();
                let bound = bind_arguments(call, &params, arguments)?;
                self.invoke(&def, bound, &call.span)
            }
        }
    }

    fn resolve(&self, call: &CallExpr) -> Result<Callable, RamError> {
        if let Some(def) = self.functions.get(&call.callee) {
            return Ok(Callable::User(Rc::clone(def)));
        }
        Builtin::lookup(&call.callee)
            .map(Callable::Builtin)
            .ok_or_else(|| {
                RamError::name_error(
                    NameFault::UnknownFunction,
                    call.span.clone(),
                    format!("Unknown function '{}'", call.callee),
                )
                .with_help("Define it with 'new function' or call a built-in such as GET_TEXT.")
            })
    }

    fn invoke(
        &mut self,
        def: &FunctionDef,
        arguments: HashMap<String, Value>,
        span: &Span,
    ) -> Result<Option<Value>, RamError> {
        if self.call_depth >= self.config.max_call_depth {
            return Err(RamError::resource_error(
                ResourceFault::StackExhausted,
                span.clone(),
                format!(
                    "Stack exhausted calling '{}': more than {} nested calls",
                    def.name, self.config.max_call_depth
                ),
            )
            .with_help("Check that recursive calls move toward a case that sends back without recursing."));
        }

        let mut frame = Environment::new();
        for param in &def.params {
            if let Some(value) = arguments.get(&param.name) {
                let kind = value.kind();
                frame
                    .declare(&param.name, kind, value.clone())
                    .map_err(|fault| {
                        RamError::name_error(
                            fault,
                            param.span.clone(),
                            format!("Parameter '{}' is bound twice", param.name),
                        )
                    })?;
            }
        }

        self.call_depth += 1;
        debug!("Entering '{}' at depth {}", def.name, self.call_depth);
        let caller = mem::replace(&mut self.environment, frame);
        let result = self.execute_statements(&def.body);
        self.environment = caller;
        debug!("Leaving '{}' at depth {}", def.name, self.call_depth);
        self.call_depth -= 1;

        match result? {
            Flow::Return(value) => Ok(Some(value)),
            Flow::Normal => Ok(None),
        }
    }
}

/// Matches keyword arguments against the declared parameters, ignoring order.
fn bind_arguments(
    call: &CallExpr,
    params: &[&str],
    arguments: Vec<(&KeywordArg, Value)>,
) -> Result<HashMap<String, Value>, RamError> {
    for param in params {
        if !arguments.iter().any(|(arg, _)| arg.name == *param) {
            return Err(missing_parameter(call, param));
        }
    }

    let mut bound = HashMap::with_capacity(arguments.len());
    for (arg, value) in arguments {
        if !params.contains(&arg.name.as_str()) {
            return Err(RamError::argument_error(
                ArgumentFault::UnknownParameter,
                arg.span.clone(),
                format!("'{}' has no parameter named '{}'", call.callee, arg.name),
            )
            .with_help(format!("Parameters of '{}': {}", call.callee, params.join(", "))));
        }
        bound.insert(arg.name.clone(), value);
    }
    Ok(bound)
}

fn missing_parameter(call: &CallExpr, param: &str) -> RamError {
    RamError::argument_error(
        ArgumentFault::MissingParameter,
        call.span.clone(),
        format!("Call to '{}' is missing argument '{}'", call.callee, param),
    )
    .with_help(format!("Pass it by keyword, e.g. {}[{}=...]", call.callee, param))
}
