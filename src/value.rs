use crate::error::{ArithmeticFault, RamError, Span, TypeFault};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Integer(i64),
    Text(String),
    Boolean(bool),
}

/// The runtime kind of a [`Value`]; also used as the declared type of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Integer,
    Text,
    Boolean,
}

impl ValueKind {
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Integer => "integer",
            ValueKind::Text => "text",
            ValueKind::Boolean => "boolean",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Failure of a value-level operation, before it is tied to a source span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    Type(TypeFault, String),
    Arithmetic(ArithmeticFault, String),
}

impl OperationError {
    pub fn at(self, span: &Span) -> RamError {
        match self {
            OperationError::Type(fault, message) => RamError::type_error(fault, span.clone(), message),
            OperationError::Arithmetic(fault, message) => RamError::new(fault, span.clone(), message),
        }
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Integer(_) => ValueKind::Integer,
            Value::Text(_) => ValueKind::Text,
            Value::Boolean(_) => ValueKind::Boolean,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.kind().name()
    }

    /// Condition contexts accept only booleans.
    pub fn as_condition(&self) -> Result<bool, OperationError> {
        match self {
            Value::Boolean(b) => Ok(*b),
            other => Err(OperationError::Type(
                TypeFault::ExpectedBoolean,
                format!("Condition must be a boolean, got {}", other.type_name()),
            )),
        }
    }

    pub fn as_integer(&self) -> Result<i64, OperationError> {
        match self {
            Value::Integer(n) => Ok(*n),
            other => Err(OperationError::Type(
                TypeFault::ExpectedInteger,
                format!("Expected an integer, got {}", other.type_name()),
            )),
        }
    }

    pub fn add(self, right: Value) -> Result<Value, OperationError> {
        match (self, right) {
            (Value::Integer(l), Value::Integer(r)) => l
                .checked_add(r)
                .map(Value::Integer)
                .ok_or_else(|| overflow(l, "+", r)),
            (Value::Text(l), Value::Text(r)) => Ok(Value::Text(l + &r)),
            (l, r) => Err(incompatible("+", &l, &r)),
        }
    }

    pub fn subtract(self, right: Value) -> Result<Value, OperationError> {
        match (self, right) {
            (Value::Integer(l), Value::Integer(r)) => l
                .checked_sub(r)
                .map(Value::Integer)
                .ok_or_else(|| overflow(l, "-", r)),
            (l, r) => Err(incompatible("-", &l, &r)),
        }
    }

    pub fn multiply(self, right: Value) -> Result<Value, OperationError> {
        match (self, right) {
            (Value::Integer(l), Value::Integer(r)) => l
                .checked_mul(r)
                .map(Value::Integer)
                .ok_or_else(|| overflow(l, "*", r)),
            (l, r) => Err(incompatible("*", &l, &r)),
        }
    }

    pub fn divide(self, right: Value) -> Result<Value, OperationError> {
        match (self, right) {
            (Value::Integer(_), Value::Integer(0)) => Err(OperationError::Arithmetic(
                ArithmeticFault::DivisionByZero,
                "Division by zero".to_string(),
            )),
            (Value::Integer(l), Value::Integer(r)) => l
                .checked_div(r)
                .map(Value::Integer)
                .ok_or_else(|| overflow(l, "/", r)),
            (l, r) => Err(incompatible("/", &l, &r)),
        }
    }

    /// `is`: structural equality between values of the same kind.
    pub fn equals(&self, right: &Value) -> Result<Value, OperationError> {
        if self.kind() != right.kind() {
            return Err(incompatible("is", self, right));
        }
        Ok(Value::Boolean(self == right))
    }
}

fn incompatible(op: &str, left: &Value, right: &Value) -> OperationError {
    OperationError::Type(
        TypeFault::IncompatibleOperands,
        format!(
            "Cannot apply '{}' to {} and {}",
            op,
            left.type_name(),
            right.type_name()
        ),
    )
}

fn overflow(left: i64, op: &str, right: i64) -> OperationError {
    OperationError::Arithmetic(
        ArithmeticFault::Overflow,
        format!("Integer overflow in {} {} {}", left, op, right),
    )
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}
