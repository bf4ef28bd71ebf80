//! §7.1 Type Conversion.

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

use crate::abstract_ops::{call, get, get_method};
use crate::completion::Completion;
use crate::engine::{Agent, ErrorKind, IntrinsicId, Message};
use crate::object::string::string_create;
use crate::object::{JsObject, ObjectKind, PropertyKey};
use crate::types::{JsBigInt, JsString, JsValue, WellKnownSymbol, number_ops};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PreferredType {
    Default,
    String,
    Number,
}

/// Result of ToNumeric.
#[derive(Clone, Debug)]
pub enum Numeric {
    Number(f64),
    BigInt(JsBigInt),
}

/// WhiteSpace and LineTerminator code points, as trimmed by StringToNumber
/// and String.prototype.trim.
pub fn is_js_whitespace(c: char) -> bool {
    matches!(
        c,
        '\u{9}'
            | '\u{a}'
            | '\u{b}'
            | '\u{c}'
            | '\u{d}'
            | ' '
            | '\u{a0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200a}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202f}'
            | '\u{205f}'
            | '\u{3000}'
            | '\u{feff}'
    )
}

// §7.1.1 ToPrimitive
pub fn to_primitive(agent: &Agent, input: &JsValue, hint: PreferredType) -> Completion {
    let JsValue::Object(o) = input else {
        return Completion::Normal(input.clone());
    };
    let exotic = q!(get_method(
        agent,
        input,
        &PropertyKey::symbol(WellKnownSymbol::ToPrimitive)
    ));
    if let Some(exotic) = exotic {
        let hint_name = match hint {
            PreferredType::Default => "default",
            PreferredType::String => "string",
            PreferredType::Number => "number",
        };
        let result = q!(call(
            agent,
            &JsValue::Object(exotic),
            input,
            &[JsValue::from_str(hint_name)]
        ));
        if result.is_object() {
            return agent.throw(ErrorKind::Type, Message::ObjectToPrimitive);
        }
        return Completion::Normal(result);
    }
    let hint = if hint == PreferredType::Default {
        PreferredType::Number
    } else {
        hint
    };
    ordinary_to_primitive(agent, o, hint)
}

// §7.1.1.1 OrdinaryToPrimitive
pub fn ordinary_to_primitive(agent: &Agent, o: &JsObject, hint: PreferredType) -> Completion {
    let order = if hint == PreferredType::String {
        ["toString", "valueOf"]
    } else {
        ["valueOf", "toString"]
    };
    for name in order {
        let method = q!(get(agent, o, &PropertyKey::from(name)));
        if method.is_callable() {
            let result = q!(call(agent, &method, &JsValue::Object(o.clone()), &[]));
            if !result.is_object() {
                return Completion::Normal(result);
            }
        }
    }
    agent.throw(ErrorKind::Type, Message::ObjectToPrimitive)
}

// §7.1.2 ToBoolean
pub fn to_boolean(value: &JsValue) -> bool {
    match value {
        JsValue::Undefined | JsValue::Null => false,
        JsValue::Boolean(b) => *b,
        JsValue::Number(n) => *n != 0.0 && !n.is_nan(),
        JsValue::String(s) => !s.is_empty(),
        JsValue::BigInt(b) => !b.value.is_zero(),
        JsValue::Symbol(_) | JsValue::Object(_) => true,
    }
}

// §7.1.3 ToNumeric
pub fn to_numeric(agent: &Agent, value: &JsValue) -> Completion<Numeric> {
    let prim = q!(to_primitive(agent, value, PreferredType::Number));
    if let JsValue::BigInt(b) = prim {
        return Completion::Normal(Numeric::BigInt(b));
    }
    to_number(agent, &prim).map(Numeric::Number)
}

// §7.1.4 ToNumber
pub fn to_number(agent: &Agent, value: &JsValue) -> Completion<f64> {
    match value {
        JsValue::Undefined => Completion::Normal(f64::NAN),
        JsValue::Null => Completion::Normal(0.0),
        JsValue::Boolean(b) => Completion::Normal(if *b { 1.0 } else { 0.0 }),
        JsValue::Number(n) => Completion::Normal(*n),
        JsValue::String(s) => Completion::Normal(string_to_number(s)),
        JsValue::Symbol(_) => agent.throw(ErrorKind::Type, Message::CannotConvertSymbol("number")),
        JsValue::BigInt(_) => agent.throw(ErrorKind::Type, Message::BigIntToNumber),
        JsValue::Object(_) => {
            let prim = q!(to_primitive(agent, value, PreferredType::Number));
            to_number(agent, &prim)
        }
    }
}

fn is_decimal_literal(s: &str) -> bool {
    let body = s.strip_prefix(['+', '-']).unwrap_or(s);
    if body == "Infinity" {
        return true;
    }
    let bytes = body.as_bytes();
    let mut i = 0;
    let mut digits = 0;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
        digits += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
            digits += 1;
        }
    }
    if digits == 0 {
        return false;
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == start {
            return false;
        }
    }
    i == bytes.len()
}

fn parse_radix(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    let mut value = 0f64;
    for c in digits.chars() {
        match c.to_digit(radix) {
            Some(d) => value = value * f64::from(radix) + f64::from(d),
            None => return f64::NAN,
        }
    }
    value
}

// §7.1.4.1.1 StringToNumber
pub fn string_to_number(s: &JsString) -> f64 {
    let text = s.to_rust_string();
    let trimmed = text.trim_matches(is_js_whitespace);
    if trimmed.is_empty() {
        return 0.0;
    }
    if trimmed.len() > 2 && trimmed.as_bytes()[0] == b'0' {
        let radix = match trimmed.as_bytes()[1] {
            b'x' | b'X' => Some(16),
            b'o' | b'O' => Some(8),
            b'b' | b'B' => Some(2),
            _ => None,
        };
        if let Some(radix) = radix {
            return parse_radix(&trimmed[2..], radix);
        }
    }
    if !is_decimal_literal(trimmed) {
        return f64::NAN;
    }
    match trimmed {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ => trimmed.parse::<f64>().unwrap_or(f64::NAN),
    }
}

// §7.1.5 ToIntegerOrInfinity
pub fn to_integer_or_infinity(agent: &Agent, value: &JsValue) -> Completion<f64> {
    let n = q!(to_number(agent, value));
    Completion::Normal(integer_part(n))
}

/// The mathematical truncation step of ToIntegerOrInfinity.
pub fn integer_part(n: f64) -> f64 {
    if n.is_nan() || n == 0.0 {
        0.0
    } else if n.is_infinite() {
        n
    } else {
        n.trunc() + 0.0
    }
}

// §7.1.6 ToInt32
pub fn to_int32(agent: &Agent, value: &JsValue) -> Completion<i32> {
    to_number(agent, value).map(number_ops::to_int32)
}

// §7.1.7 ToUint32
pub fn to_uint32(agent: &Agent, value: &JsValue) -> Completion<u32> {
    to_number(agent, value).map(number_ops::to_uint32)
}

// §7.1.8 ToUint16
pub fn to_uint16(agent: &Agent, value: &JsValue) -> Completion<u16> {
    to_number(agent, value).map(number_ops::to_uint16)
}

// §7.1.13 ToBigInt
pub fn to_big_int(agent: &Agent, value: &JsValue) -> Completion<JsBigInt> {
    let prim = q!(to_primitive(agent, value, PreferredType::Number));
    match prim {
        JsValue::Undefined | JsValue::Null => agent.throw(
            ErrorKind::Type,
            Message::CannotConvertToBigInt(agent.inspect(&prim)),
        ),
        JsValue::Boolean(b) => Completion::Normal(JsBigInt::new(BigInt::from(u8::from(b)))),
        JsValue::BigInt(b) => Completion::Normal(b),
        JsValue::Number(_) => agent.throw(
            ErrorKind::Type,
            Message::CannotConvertToBigInt(agent.inspect(&prim)),
        ),
        JsValue::String(ref s) => match string_to_big_int(s) {
            Some(b) => Completion::Normal(JsBigInt::new(b)),
            None => agent.throw(
                ErrorKind::Syntax,
                Message::CannotConvertToBigInt(agent.inspect(&prim)),
            ),
        },
        JsValue::Symbol(_) => agent.throw(ErrorKind::Type, Message::CannotConvertSymbol("bigint")),
        JsValue::Object(_) => unreachable!("ToPrimitive returned an object"),
    }
}

// §7.1.14 StringToBigInt
pub fn string_to_big_int(s: &JsString) -> Option<BigInt> {
    let text = s.to_rust_string();
    let trimmed = text.trim_matches(is_js_whitespace);
    if trimmed.is_empty() {
        return Some(BigInt::zero());
    }
    let (radix, digits) = match trimmed.get(..2) {
        Some("0x" | "0X") => (16, &trimmed[2..]),
        Some("0o" | "0O") => (8, &trimmed[2..]),
        Some("0b" | "0B") => (2, &trimmed[2..]),
        _ => (10, trimmed),
    };
    let unsigned = digits.strip_prefix(['+', '-']).unwrap_or(digits);
    if unsigned.is_empty() || (radix != 10 && unsigned.len() != digits.len()) {
        return None;
    }
    if !unsigned.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    BigInt::parse_bytes(digits.as_bytes(), radix)
}

// §7.1.17 ToString
pub fn to_string(agent: &Agent, value: &JsValue) -> Completion<JsString> {
    match value {
        JsValue::Undefined => Completion::Normal(JsString::from_str("undefined")),
        JsValue::Null => Completion::Normal(JsString::from_str("null")),
        JsValue::Boolean(b) => Completion::Normal(JsString::from_str(if *b { "true" } else { "false" })),
        JsValue::Number(n) => Completion::Normal(JsString::from(number_ops::to_string(*n))),
        JsValue::String(s) => Completion::Normal(s.clone()),
        JsValue::Symbol(_) => agent.throw(ErrorKind::Type, Message::CannotConvertSymbol("string")),
        JsValue::BigInt(b) => Completion::Normal(JsString::from(b.value.to_str_radix(10))),
        JsValue::Object(_) => {
            let prim = q!(to_primitive(agent, value, PreferredType::String));
            to_string(agent, &prim)
        }
    }
}

// §7.1.18 ToObject
pub fn to_object(agent: &Agent, value: &JsValue) -> Completion<JsObject> {
    let (proto, kind) = match value {
        JsValue::Undefined | JsValue::Null => {
            return agent.throw(
                ErrorKind::Type,
                Message::CannotConvertToObject(agent.inspect(value)),
            );
        }
        JsValue::Object(o) => return Completion::Normal(o.clone()),
        JsValue::String(s) => {
            return Completion::Normal(string_create(
                s.clone(),
                agent.intrinsic(IntrinsicId::StringPrototype),
            ));
        }
        JsValue::Boolean(b) => (IntrinsicId::BooleanPrototype, ObjectKind::Boolean(*b)),
        JsValue::Number(n) => (IntrinsicId::NumberPrototype, ObjectKind::Number(*n)),
        JsValue::Symbol(s) => (IntrinsicId::SymbolPrototype, ObjectKind::Symbol(s.clone())),
        JsValue::BigInt(b) => (IntrinsicId::BigIntPrototype, ObjectKind::BigInt(b.clone())),
    };
    Completion::Normal(JsObject::new(Some(agent.intrinsic(proto)), kind))
}

// §7.1.19 ToPropertyKey
pub fn to_property_key(agent: &Agent, value: &JsValue) -> Completion<PropertyKey> {
    match value {
        JsValue::String(s) => return Completion::Normal(PropertyKey::String(s.clone())),
        JsValue::Symbol(s) => return Completion::Normal(PropertyKey::Symbol(s.clone())),
        _ => {}
    }
    let key = q!(to_primitive(agent, value, PreferredType::String));
    match key {
        JsValue::Symbol(s) => Completion::Normal(PropertyKey::Symbol(s)),
        other => to_string(agent, &other).map(PropertyKey::String),
    }
}

// §7.1.20 ToLength
pub fn to_length(agent: &Agent, value: &JsValue) -> Completion<u64> {
    let len = q!(to_integer_or_infinity(agent, value));
    if len <= 0.0 {
        return Completion::Normal(0);
    }
    Completion::Normal(len.min(9_007_199_254_740_991.0) as u64)
}

// §7.1.22 ToIndex
pub fn to_index(agent: &Agent, value: &JsValue) -> Completion<u64> {
    if value.is_undefined() {
        return Completion::Normal(0);
    }
    let integer = q!(to_integer_or_infinity(agent, value));
    if !(0.0..=9_007_199_254_740_991.0).contains(&integer) {
        return agent.throw(ErrorKind::Range, Message::OutOfRange("Index".into()));
    }
    Completion::Normal(integer as u64)
}

/// Relative index clamping shared by slice-like methods: negative values
/// count from `len`, the result lies in `0..=len`.
pub fn relative_index(relative: f64, len: u64) -> u64 {
    let len_f = len as f64;
    if relative < 0.0 {
        (len_f + relative).max(0.0) as u64
    } else {
        relative.min(len_f) as u64
    }
}

/// Exact conversion of a BigInt to f64 where representable, rounding
/// otherwise.
pub fn big_int_to_number(b: &JsBigInt) -> f64 {
    b.value.to_f64().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(s: &str) -> f64 {
        string_to_number(&JsString::from_str(s))
    }

    #[test]
    fn string_to_number_grammar() {
        assert_eq!(num(""), 0.0);
        assert_eq!(num("  12  "), 12.0);
        assert_eq!(num("0x1F"), 31.0);
        assert_eq!(num("0b101"), 5.0);
        assert_eq!(num("-Infinity"), f64::NEG_INFINITY);
        assert_eq!(num(".5"), 0.5);
        assert_eq!(num("5."), 5.0);
        assert_eq!(num("1e3"), 1000.0);
        assert!(num("inf").is_nan());
        assert!(num("1e").is_nan());
        assert!(num("-0x10").is_nan());
        assert!(num("12px").is_nan());
    }

    #[test]
    fn string_to_big_int_rejects_signed_hex() {
        assert_eq!(string_to_big_int(&"-12".into()), Some(BigInt::from(-12)));
        assert_eq!(string_to_big_int(&"0xff".into()), Some(BigInt::from(255)));
        assert_eq!(string_to_big_int(&"0x-1".into()), None);
        assert_eq!(string_to_big_int(&"1.5".into()), None);
    }

    #[test]
    fn relative_indices_clamp() {
        assert_eq!(relative_index(-2.0, 5), 3);
        assert_eq!(relative_index(-10.0, 5), 0);
        assert_eq!(relative_index(7.0, 5), 5);
    }
}
