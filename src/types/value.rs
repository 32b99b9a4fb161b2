//! The dynamic value model carried through the deferred-value chain.
//!
//! The system under interception is dynamically typed: fulfillment values,
//! rejection reasons, and task payloads are all "any value". [`Value`] is a
//! small closed enum covering the shapes the core needs, including a
//! deferred-value handle so that resolving one promise with another (and
//! flattening the result) stays first-class.
//!
//! `Display` is the string coercion used by the uncaught-rejection report
//! format, so it prints bare contents rather than Rust debug syntax.

use crate::promise::Promise;
use core::fmt;

/// A dynamically typed value flowing through zones, tasks, and promises.
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// The absent value.
    #[default]
    Unit,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating-point number.
    Float(f64),
    /// A string.
    Str(String),
    /// An ordered list of values.
    List(Vec<Value>),
    /// A thrown error or rejection reason with an optional stack.
    Error(ErrorValue),
    /// A handle to a deferred value (a thenable).
    Promise(Promise),
}

impl Value {
    /// Creates a string value.
    #[must_use]
    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    /// Returns the string contents if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the list contents if this is a list value.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the error contents if this is an error value.
    #[must_use]
    pub fn as_error(&self) -> Option<&ErrorValue> {
        match self {
            Self::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Returns true if this value is a deferred-value handle.
    #[must_use]
    pub const fn is_promise(&self) -> bool {
        matches!(self, Self::Promise(_))
    }
}

#[allow(clippy::float_cmp)]
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Unit, Self::Unit) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Error(a), Self::Error(b)) => a == b,
            (Self::Promise(a), Self::Promise(b)) => Promise::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => write!(f, "()"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Error(e) => write!(f, "{e}"),
            Self::Promise(_) => write!(f, "<promise>"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<ErrorValue> for Value {
    fn from(e: ErrorValue) -> Self {
        Self::Error(e)
    }
}

impl From<Promise> for Value {
    fn from(p: Promise) -> Self {
        Self::Promise(p)
    }
}

/// A thrown error carried as a value: a message plus an optional stack.
///
/// The stack is an opaque string attached by whoever raised the error;
/// when present it is appended to the uncaught-rejection report message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorValue {
    message: String,
    stack: Option<String>,
}

impl ErrorValue {
    /// Creates an error value with the given message and no stack.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
        }
    }

    /// Attaches a stack string to this error value.
    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the stack string, if one was attached.
    #[must_use]
    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_string_coercion() {
        assert_eq!(Value::str("hello").to_string(), "hello");
        assert_eq!(Value::Int(3).to_string(), "3");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Unit.to_string(), "()");
        let list = Value::List(vec![Value::Int(1), Value::str("a")]);
        assert_eq!(list.to_string(), "[1, a]");
    }

    #[test]
    fn error_value_display_is_message_only() {
        let e = ErrorValue::new("boom").with_stack("at <anonymous>");
        assert_eq!(e.to_string(), "boom");
        assert_eq!(e.stack(), Some("at <anonymous>"));
    }

    #[test]
    fn from_conversions() {
        assert_eq!(Value::from("x"), Value::str("x"));
        assert_eq!(Value::from(7i64), Value::Int(7));
        assert_eq!(
            Value::from(vec![Value::Unit]),
            Value::List(vec![Value::Unit])
        );
    }

    #[test]
    fn unit_is_distinct_from_other_values() {
        assert_ne!(Value::Unit, Value::Int(0));
        assert_ne!(Value::Unit, Value::Str(String::new()));
    }
}
