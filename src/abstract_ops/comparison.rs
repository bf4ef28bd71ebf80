//! §7.2.10 – §7.2.14 equality and relational comparison.

use std::cmp::Ordering;

use num_bigint::BigInt;
use num_traits::{FromPrimitive, ToPrimitive, Zero};

use crate::abstract_ops::conversion::{
    PreferredType, string_to_big_int, string_to_number, to_number, to_primitive,
};
use crate::completion::Completion;
use crate::engine::Agent;
use crate::types::{JsBigInt, JsValue, JsValue as V, number_ops};

// §7.2.10 SameValue
pub fn same_value(x: &JsValue, y: &JsValue) -> bool {
    match (x, y) {
        (JsValue::Number(a), JsValue::Number(b)) => number_ops::same_value(*a, *b),
        _ => same_value_non_number(x, y),
    }
}

// §7.2.11 SameValueZero
pub fn same_value_zero(x: &JsValue, y: &JsValue) -> bool {
    match (x, y) {
        (JsValue::Number(a), JsValue::Number(b)) => number_ops::same_value_zero(*a, *b),
        _ => same_value_non_number(x, y),
    }
}

// §7.2.12 SameValueNonNumber
fn same_value_non_number(x: &JsValue, y: &JsValue) -> bool {
    match (x, y) {
        (JsValue::Undefined, JsValue::Undefined) | (JsValue::Null, JsValue::Null) => true,
        (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
        (JsValue::String(a), JsValue::String(b)) => a == b,
        (JsValue::Symbol(a), JsValue::Symbol(b)) => a == b,
        (JsValue::BigInt(a), JsValue::BigInt(b)) => a.value == b.value,
        (JsValue::Object(a), JsValue::Object(b)) => a.ptr_eq(b),
        _ => false,
    }
}

// §7.2.16 IsStrictlyEqual
pub fn is_strictly_equal(x: &JsValue, y: &JsValue) -> bool {
    match (x, y) {
        (JsValue::Number(a), JsValue::Number(b)) => a == b,
        _ => same_value_non_number(x, y),
    }
}

fn big_int_equals_number(b: &JsBigInt, n: f64) -> bool {
    if !n.is_finite() || n.trunc() != n {
        return false;
    }
    compare_big_int_number(&b.value, n) == Some(Ordering::Equal)
}

/// Exact ordering of a BigInt against a Number; `None` when `n` is NaN.
fn compare_big_int_number(b: &BigInt, n: f64) -> Option<Ordering> {
    if n.is_nan() {
        return None;
    }
    if n == f64::INFINITY {
        return Some(Ordering::Less);
    }
    if n == f64::NEG_INFINITY {
        return Some(Ordering::Greater);
    }
    let floor = n.floor();
    let Some(whole) = BigInt::from_f64(floor) else {
        return b.to_f64().and_then(|f| f.partial_cmp(&n));
    };
    match b.cmp(&whole) {
        Ordering::Equal if floor < n => Some(Ordering::Less),
        other => Some(other),
    }
}

// §7.2.15 IsLooselyEqual
pub fn is_loosely_equal(agent: &Agent, x: &JsValue, y: &JsValue) -> Completion<bool> {
    let result = match (x, y) {
        (V::Undefined | V::Null, V::Undefined | V::Null) => true,
        (V::Number(a), V::String(b)) => *a == string_to_number(b),
        (V::String(a), V::Number(b)) => string_to_number(a) == *b,
        (V::BigInt(a), V::String(b)) => match string_to_big_int(b) {
            Some(n) => *a.value == n,
            None => false,
        },
        (V::String(_), V::BigInt(_)) => return is_loosely_equal(agent, y, x),
        (V::Boolean(b), _) => {
            let n = V::Number(if *b { 1.0 } else { 0.0 });
            return is_loosely_equal(agent, &n, y);
        }
        (_, V::Boolean(b)) => {
            let n = V::Number(if *b { 1.0 } else { 0.0 });
            return is_loosely_equal(agent, x, &n);
        }
        (V::Number(_) | V::String(_) | V::BigInt(_) | V::Symbol(_), V::Object(_)) => {
            let prim = q!(to_primitive(agent, y, PreferredType::Default));
            return is_loosely_equal(agent, x, &prim);
        }
        (V::Object(_), V::Number(_) | V::String(_) | V::BigInt(_) | V::Symbol(_)) => {
            let prim = q!(to_primitive(agent, x, PreferredType::Default));
            return is_loosely_equal(agent, &prim, y);
        }
        (V::BigInt(a), V::Number(b)) => big_int_equals_number(a, *b),
        (V::Number(a), V::BigInt(b)) => big_int_equals_number(b, *a),
        _ if std::mem::discriminant(x) == std::mem::discriminant(y) => is_strictly_equal(x, y),
        _ => false,
    };
    Completion::Normal(result)
}

// §7.2.13 IsLessThan. `None` stands for undefined (a NaN was involved).
pub fn is_less_than(
    agent: &Agent,
    x: &JsValue,
    y: &JsValue,
    left_first: bool,
) -> Completion<Option<bool>> {
    let (px, py) = if left_first {
        let px = q!(to_primitive(agent, x, PreferredType::Number));
        let py = q!(to_primitive(agent, y, PreferredType::Number));
        (px, py)
    } else {
        let py = q!(to_primitive(agent, y, PreferredType::Number));
        let px = q!(to_primitive(agent, x, PreferredType::Number));
        (px, py)
    };
    if let (JsValue::String(a), JsValue::String(b)) = (&px, &py) {
        return Completion::Normal(Some(a.units() < b.units()));
    }
    match (&px, &py) {
        (JsValue::BigInt(a), JsValue::String(b)) => {
            return Completion::Normal(string_to_big_int(b).map(|b| *a.value < b));
        }
        (JsValue::String(a), JsValue::BigInt(b)) => {
            return Completion::Normal(string_to_big_int(a).map(|a| a < *b.value));
        }
        _ => {}
    }
    let nx = match &px {
        JsValue::BigInt(b) => Numeric::Big(b.clone()),
        other => Numeric::Num(q!(to_number(agent, other))),
    };
    let ny = match &py {
        JsValue::BigInt(b) => Numeric::Big(b.clone()),
        other => Numeric::Num(q!(to_number(agent, other))),
    };
    let result = match (nx, ny) {
        (Numeric::Num(a), Numeric::Num(b)) => {
            if a.is_nan() || b.is_nan() {
                None
            } else {
                Some(a < b)
            }
        }
        (Numeric::Big(a), Numeric::Big(b)) => Some(a.value < b.value),
        (Numeric::Big(a), Numeric::Num(b)) => {
            compare_big_int_number(&a.value, b).map(|o| o == Ordering::Less)
        }
        (Numeric::Num(a), Numeric::Big(b)) => {
            compare_big_int_number(&b.value, a).map(|o| o == Ordering::Greater)
        }
    };
    Completion::Normal(result)
}

enum Numeric {
    Num(f64),
    Big(JsBigInt),
}

/// `0n` and `-0n` are one value, so `is_zero` covers both.
pub fn big_int_is_zero(b: &JsBigInt) -> bool {
    b.value.is_zero()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_agent;
    use crate::types::JsString;

    #[test]
    fn same_value_distinguishes_signed_zero_and_nan() {
        let nan = JsValue::Number(f64::NAN);
        assert!(same_value(&nan, &nan));
        assert!(!is_strictly_equal(&nan, &nan));
        assert!(!same_value(&JsValue::Number(0.0), &JsValue::Number(-0.0)));
        assert!(same_value_zero(&JsValue::Number(0.0), &JsValue::Number(-0.0)));
    }

    #[test]
    fn loose_equality_coerces() {
        let agent = test_agent();
        let s = JsValue::String(JsString::from_str("1"));
        assert!(x!(is_loosely_equal(&agent, &s, &JsValue::Number(1.0))));
        assert!(x!(is_loosely_equal(&agent, &JsValue::Null, &JsValue::Undefined)));
        assert!(!x!(is_loosely_equal(&agent, &JsValue::Null, &JsValue::Number(0.0))));
        assert!(x!(is_loosely_equal(&agent, &JsValue::Boolean(true), &s)));
        let big = JsValue::BigInt(JsBigInt::new(BigInt::from(2)));
        assert!(x!(is_loosely_equal(&agent, &big, &JsValue::Number(2.0))));
        assert!(!x!(is_loosely_equal(&agent, &big, &JsValue::Number(2.5))));
    }

    #[test]
    fn less_than_handles_mixed_bigint_and_nan() {
        let agent = test_agent();
        let big = JsValue::BigInt(JsBigInt::new(BigInt::from(2)));
        assert_eq!(x!(is_less_than(&agent, &big, &JsValue::Number(2.5), true)), Some(true));
        assert_eq!(x!(is_less_than(&agent, &JsValue::Number(2.5), &big, true)), Some(false));
        assert_eq!(x!(is_less_than(&agent, &big, &JsValue::Number(f64::NAN), true)), None);
        let a = JsValue::from_str("a");
        let b = JsValue::from_str("b");
        assert_eq!(x!(is_less_than(&agent, &a, &b, true)), Some(true));
    }
}
