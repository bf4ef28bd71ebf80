use std::fmt;
use std::rc::Rc;

use crate::types::JsValue;

/// §6.2.4 The Completion Record Specification Type.
///
/// `Normal` carries the operation's result. Every other variant is abrupt and
/// travels unchanged to the nearest site that intercepts it. Statement
/// evaluation uses `Completion<Option<JsValue>>`, where `None` is the
/// ~empty~ value.
#[derive(Clone)]
pub enum Completion<T = JsValue> {
    Normal(T),
    Return(JsValue),
    Throw(JsValue),
    Break {
        target: Option<Rc<str>>,
        value: Option<JsValue>,
    },
    Continue {
        target: Option<Rc<str>>,
        value: Option<JsValue>,
    },
}

pub type StatementCompletion = Completion<Option<JsValue>>;

impl<T> Completion<T> {
    pub fn is_abrupt(&self) -> bool {
        !matches!(self, Completion::Normal(_))
    }

    pub fn is_throw(&self) -> bool {
        matches!(self, Completion::Throw(_))
    }

    /// Re-type an abrupt completion. Calling this on a normal completion is an
    /// engine bug.
    pub fn into_abrupt<U>(self) -> Completion<U> {
        match self {
            Completion::Normal(_) => unreachable!("into_abrupt on a normal completion"),
            Completion::Return(v) => Completion::Return(v),
            Completion::Throw(v) => Completion::Throw(v),
            Completion::Break { target, value } => Completion::Break { target, value },
            Completion::Continue { target, value } => Completion::Continue { target, value },
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Completion<U> {
        match self {
            Completion::Normal(v) => Completion::Normal(f(v)),
            other => other.into_abrupt(),
        }
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> Completion<U>) -> Completion<U> {
        match self {
            Completion::Normal(v) => f(v),
            other => other.into_abrupt(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Completion::Normal(_) => "normal",
            Completion::Return(_) => "return",
            Completion::Throw(_) => "throw",
            Completion::Break { .. } => "break",
            Completion::Continue { .. } => "continue",
        }
    }

    /// Unwrap a normal completion, panicking on an abrupt one.
    pub fn unwrap_normal(self) -> T {
        match self {
            Completion::Normal(v) => v,
            other => panic!("expected a normal completion, got {}", other.kind()),
        }
    }
}

impl Completion<Option<JsValue>> {
    /// §6.2.4.7 UpdateEmpty(completionRecord, value)
    pub fn update_empty(self, fallback: Option<JsValue>) -> Self {
        match self {
            Completion::Normal(None) => Completion::Normal(fallback),
            Completion::Break { target, value: None } => Completion::Break {
                target,
                value: fallback,
            },
            Completion::Continue { target, value: None } => Completion::Continue {
                target,
                value: fallback,
            },
            other => other,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completion::Normal(v) => write!(f, "Normal({v:?})"),
            Completion::Return(v) => write!(f, "Return({v:?})"),
            Completion::Throw(v) => write!(f, "Throw({v:?})"),
            Completion::Break { target, value } => write!(f, "Break({target:?}, {value:?})"),
            Completion::Continue { target, value } => {
                write!(f, "Continue({target:?}, {value:?})")
            }
        }
    }
}

/// ReturnIfAbrupt: unwrap a normal completion, or return the abrupt one from
/// the enclosing function (or async block).
#[macro_export]
macro_rules! q {
    ($e:expr) => {
        match $e {
            $crate::completion::Completion::Normal(v) => v,
            other => return other.into_abrupt(),
        }
    };
}

/// Unwrap a completion that cannot be abrupt. An abrupt completion here is an
/// engine bug and aborts.
#[macro_export]
macro_rules! x {
    ($e:expr) => {
        match $e {
            $crate::completion::Completion::Normal(v) => v,
            other => panic!(
                "operation that cannot fail completed abruptly ({})",
                other.kind()
            ),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn through(c: Completion<f64>) -> Completion<f64> {
        let v = q!(c);
        Completion::Normal(v + 1.0)
    }

    fn through_twice(c: Completion<f64>) -> Completion<f64> {
        let v = q!(q!(Completion::<Completion<f64>>::Normal(c)));
        Completion::Normal(v + 1.0)
    }

    #[test]
    fn nested_q_matches_single_q() {
        let inputs = vec![
            Completion::Normal(1.0),
            Completion::Throw(JsValue::from_str("boom")),
            Completion::Return(JsValue::Number(3.0)),
            Completion::Break {
                target: Some("outer".into()),
                value: None,
            },
        ];
        for input in inputs {
            let a = format!("{:?}", through(input.clone()));
            let b = format!("{:?}", through_twice(input));
            assert_eq!(a, b);
        }
    }

    #[test]
    fn update_empty_fills_only_empty_values() {
        let c: StatementCompletion = Completion::Break {
            target: None,
            value: None,
        };
        match c.update_empty(Some(JsValue::Number(7.0))) {
            Completion::Break { value: Some(JsValue::Number(n)), .. } => assert_eq!(n, 7.0),
            other => panic!("unexpected {other:?}"),
        }
        let c: StatementCompletion = Completion::Normal(Some(JsValue::Number(1.0)));
        match c.update_empty(Some(JsValue::Number(7.0))) {
            Completion::Normal(Some(JsValue::Number(n))) => assert_eq!(n, 1.0),
            other => panic!("unexpected {other:?}"),
        }
        let c: StatementCompletion = Completion::Throw(JsValue::Null);
        assert!(c.update_empty(None).is_throw());
    }

    #[test]
    #[should_panic]
    fn x_panics_on_abrupt() {
        let c: Completion<f64> = Completion::Throw(JsValue::Undefined);
        let _ = x!(c);
    }
}
