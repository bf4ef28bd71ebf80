//! Error message table. Each variant carries its arguments already rendered
//! for display; `Display` produces the text stored in the error's `message`.

use std::fmt;

use crate::engine::IntrinsicId;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ErrorKind {
    Error,
    Eval,
    Range,
    Reference,
    Syntax,
    Type,
    Uri,
}

impl ErrorKind {
    pub fn constructor(self) -> IntrinsicId {
        match self {
            ErrorKind::Error => IntrinsicId::Error,
            ErrorKind::Eval => IntrinsicId::EvalError,
            ErrorKind::Range => IntrinsicId::RangeError,
            ErrorKind::Reference => IntrinsicId::ReferenceError,
            ErrorKind::Syntax => IntrinsicId::SyntaxError,
            ErrorKind::Type => IntrinsicId::TypeError,
            ErrorKind::Uri => IntrinsicId::UriError,
        }
    }

    pub fn prototype(self) -> IntrinsicId {
        match self {
            ErrorKind::Error => IntrinsicId::ErrorPrototype,
            ErrorKind::Eval => IntrinsicId::EvalErrorPrototype,
            ErrorKind::Range => IntrinsicId::RangeErrorPrototype,
            ErrorKind::Reference => IntrinsicId::ReferenceErrorPrototype,
            ErrorKind::Syntax => IntrinsicId::SyntaxErrorPrototype,
            ErrorKind::Type => IntrinsicId::TypeErrorPrototype,
            ErrorKind::Uri => IntrinsicId::UriErrorPrototype,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::Eval => "EvalError",
            ErrorKind::Range => "RangeError",
            ErrorKind::Reference => "ReferenceError",
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::Type => "TypeError",
            ErrorKind::Uri => "URIError",
        }
    }
}

#[derive(Clone, Debug)]
pub enum Message {
    AlreadyDeclared(String),
    AssignToConstant(String),
    BigIntMixing,
    BigIntSerialize,
    BigIntToNumber,
    BigIntUnsignedShift,
    CannotConvertSymbol(&'static str),
    CannotConvertToBigInt(String),
    CannotConvertToObject(String),
    CannotDefineProperty(String),
    CannotPreventExtensions(String),
    CannotSetProperty(String),
    CannotSetPrototype(String),
    ClassConstructorCall(String),
    ConstructorRequiresNew(String),
    CouldNotResolveModule(String),
    DerivedConstructorReturn,
    DivisionByZero,
    GeneratorRunning,
    InvalidArrayLength,
    InvalidAssignmentTarget,
    InvalidCodePoint(String),
    InvalidDescriptor,
    InvalidHint(String),
    InvalidRegExp(String),
    InvalidRegExpFlags(String),
    RegExpExecution(String),
    InvalidRadix,
    JsonCircular,
    JsonParse(String),
    NegativeIndex(String),
    NotAConstructor(String),
    NotAFunction(String),
    NotAnObject(String),
    NotATypeObject(String, &'static str),
    NotDefined(String),
    NotInitialized(String),
    NotAnInteger(String),
    NotIterable(String),
    ObjectToPrimitive,
    OutOfRange(String),
    PromiseCycle,
    PromiseExecutorInvoked,
    PromiseRejectFunction,
    PromiseResolveFunction,
    PrototypeNotObject(String),
    ProxyInvariant(&'static str),
    ProxyRevoked(&'static str),
    ReduceEmpty,
    RegExpArgumentNotAllowed(String),
    ResolutionAmbiguous(String, String),
    ResolutionNull(String, String),
    RestrictedProperty,
    StackOverflow,
    StrictModeDelete(String),
    StringRepeatCount(String),
    SuperCalledTwice,
    Syntax(String),
    ThisBeforeSuper,
    UnsupportedWith,
    WritableAndAccessor,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::AlreadyDeclared(n) => write!(f, "{n} is already declared"),
            Message::AssignToConstant(n) => write!(f, "Assignment to constant variable '{n}'"),
            Message::BigIntMixing => f.write_str("Cannot mix BigInt and other types, use explicit conversions"),
            Message::BigIntSerialize => f.write_str("Do not know how to serialize a BigInt"),
            Message::BigIntToNumber => f.write_str("Cannot convert a BigInt value to a number"),
            Message::BigIntUnsignedShift => f.write_str("BigInts have no unsigned right shift, use >> instead"),
            Message::CannotConvertSymbol(t) => write!(f, "Cannot convert a Symbol value to a {t}"),
            Message::CannotConvertToBigInt(v) => write!(f, "Cannot convert {v} to a BigInt"),
            Message::CannotConvertToObject(t) => write!(f, "Cannot convert {t} to object"),
            Message::CannotDefineProperty(n) => write!(f, "Cannot define property {n}"),
            Message::CannotPreventExtensions(v) => write!(f, "Cannot prevent extensions of {v}"),
            Message::CannotSetProperty(n) => write!(f, "Cannot set property {n}"),
            Message::CannotSetPrototype(v) => write!(f, "Cannot set prototype of {v}"),
            Message::ClassConstructorCall(n) => {
                write!(f, "Class constructor {n} cannot be invoked without 'new'")
            }
            Message::ConstructorRequiresNew(n) => write!(f, "{n} constructor requires new"),
            Message::CouldNotResolveModule(s) => write!(f, "Could not resolve module '{s}'"),
            Message::DerivedConstructorReturn => {
                f.write_str("Derived constructors may only return object or undefined")
            }
            Message::DivisionByZero => f.write_str("Division by zero"),
            Message::GeneratorRunning => f.write_str("Cannot manipulate a generator that is running"),
            Message::InvalidArrayLength => f.write_str("Invalid array length"),
            Message::InvalidAssignmentTarget => f.write_str("Invalid left-hand side in assignment"),
            Message::InvalidDescriptor => {
                f.write_str("Invalid property descriptor. Cannot both specify accessors and a value or writable attribute")
            }
            Message::InvalidCodePoint(v) => write!(f, "Invalid code point {v}"),
            Message::InvalidHint(h) => write!(f, "Invalid hint: {h}"),
            Message::InvalidRegExp(e) => write!(f, "Invalid regular expression: {e}"),
            Message::InvalidRegExpFlags(fl) => write!(f, "Invalid RegExp flags: {fl}"),
            Message::RegExpExecution(e) => write!(f, "Regular expression matching failed: {e}"),
            Message::InvalidRadix => f.write_str("toString() radix must be between 2 and 36"),
            Message::JsonCircular => f.write_str("Converting circular structure to JSON"),
            Message::JsonParse(e) => write!(f, "Unexpected token in JSON: {e}"),
            Message::NegativeIndex(n) => write!(f, "{n} cannot be negative"),
            Message::NotAConstructor(v) => write!(f, "{v} is not a constructor"),
            Message::NotAFunction(v) => write!(f, "{v} is not a function"),
            Message::NotAnObject(v) => write!(f, "{v} is not an object"),
            Message::NotATypeObject(v, t) => write!(f, "{v} is not a {t} object"),
            Message::NotDefined(n) => write!(f, "{n} is not defined"),
            Message::NotInitialized(n) => write!(f, "Cannot access '{n}' before initialization"),
            Message::NotAnInteger(v) => write!(f, "The number {v} cannot be converted to a BigInt because it is not an integer"),
            Message::NotIterable(v) => write!(f, "{v} is not iterable"),
            Message::ObjectToPrimitive => f.write_str("Cannot convert object to primitive value"),
            Message::OutOfRange(n) => write!(f, "{n} is out of range"),
            Message::PromiseCycle => f.write_str("Chaining cycle detected for promise"),
            Message::PromiseExecutorInvoked => f.write_str("Promise executor has already been invoked with non-undefined arguments"),
            Message::PromiseRejectFunction => f.write_str("Promise reject function is not callable"),
            Message::PromiseResolveFunction => f.write_str("Promise resolve function is not callable"),
            Message::PrototypeNotObject(v) => write!(f, "Object prototype may only be an Object or null: {v}"),
            Message::ProxyInvariant(trap) => write!(f, "'{trap}' on proxy: trap result violates an invariant"),
            Message::ProxyRevoked(op) => write!(f, "Cannot perform '{op}' on a proxy that has been revoked"),
            Message::ReduceEmpty => f.write_str("Reduce of empty array with no initial value"),
            Message::RegExpArgumentNotAllowed(m) => {
                write!(f, "First argument to {m} must not be a regular expression")
            }
            Message::ResolutionAmbiguous(n, s) => write!(f, "Star export {n} from {s} is ambiguous"),
            Message::ResolutionNull(n, s) => write!(f, "Could not resolve import {n} from {s}"),
            Message::RestrictedProperty => f.write_str(
                "'caller', 'callee', and 'arguments' properties may not be accessed on strict mode functions or the arguments objects for calls to them",
            ),
            Message::StackOverflow => f.write_str("Maximum call stack size exceeded"),
            Message::StrictModeDelete(n) => write!(f, "Cannot delete property {n}"),
            Message::StringRepeatCount(v) => write!(f, "Count {v} is invalid"),
            Message::SuperCalledTwice => f.write_str("Super constructor may only be called once"),
            Message::Syntax(m) => f.write_str(m),
            Message::ThisBeforeSuper => {
                f.write_str("Must call super constructor in derived class before accessing 'this'")
            }
            Message::UnsupportedWith => f.write_str("'with' statements are not supported"),
            Message::WritableAndAccessor => f.write_str("Accessor property cannot be writable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_interpolate_their_arguments() {
        assert_eq!(Message::NotDefined("x".into()).to_string(), "x is not defined");
        assert_eq!(
            Message::ResolutionNull("a".into(), "./m.js".into()).to_string(),
            "Could not resolve import a from ./m.js"
        );
        assert_eq!(
            Message::ProxyRevoked("get").to_string(),
            "Cannot perform 'get' on a proxy that has been revoked"
        );
    }
}
