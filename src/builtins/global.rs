//! §19.2 Function properties of the global object.

use crate::abstract_ops::conversion::{is_js_whitespace, to_int32, to_number, to_string};
use crate::builtins::{arg, method_in_realm};
use crate::completion::Completion;
use crate::engine::{Agent, IntrinsicId, Realm};
use crate::evaluator::eval::perform_eval;
use crate::types::JsValue;

pub(super) fn init(realm: &Realm) {
    let eval = method_in_realm(realm, "eval", 1, |agent, _this, args| perform_eval(agent, &arg(args, 0)));
    realm.set_intrinsic(IntrinsicId::Eval, eval);
    realm.set_intrinsic(IntrinsicId::IsFinite, method_in_realm(realm, "isFinite", 1, is_finite));
    realm.set_intrinsic(IntrinsicId::IsNaN, method_in_realm(realm, "isNaN", 1, is_nan));
    realm.set_intrinsic(IntrinsicId::ParseFloat, method_in_realm(realm, "parseFloat", 1, parse_float));
    realm.set_intrinsic(IntrinsicId::ParseInt, method_in_realm(realm, "parseInt", 2, parse_int));
}

// §19.2.2 isFinite ( number )
fn is_finite(agent: &Agent, _this: &JsValue, args: &[JsValue]) -> Completion {
    let n = q!(to_number(agent, &arg(args, 0)));
    Completion::Normal(JsValue::Boolean(n.is_finite()))
}

// §19.2.3 isNaN ( number )
fn is_nan(agent: &Agent, _this: &JsValue, args: &[JsValue]) -> Completion {
    let n = q!(to_number(agent, &arg(args, 0)));
    Completion::Normal(JsValue::Boolean(n.is_nan()))
}

// §19.2.4 parseFloat ( string )
fn parse_float(agent: &Agent, _this: &JsValue, args: &[JsValue]) -> Completion {
    let input = q!(to_string(agent, &arg(args, 0))).to_rust_string();
    Completion::Normal(JsValue::Number(str_decimal_prefix(input.trim_start_matches(is_js_whitespace))))
}

/// Value of the longest prefix of `s` that is a StrDecimalLiteral, or NaN.
pub(crate) fn str_decimal_prefix(s: &str) -> f64 {
    let (sign, unsigned) = match s.as_bytes().first() {
        Some(b'-') => (-1.0, &s[1..]),
        Some(b'+') => (1.0, &s[1..]),
        _ => (1.0, s),
    };
    if unsigned.starts_with("Infinity") {
        return sign * f64::INFINITY;
    }
    let bytes = unsigned.as_bytes();
    let digits = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };
    let int_end = digits(0);
    let mut end = int_end;
    let mut mantissa_digits = int_end;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_end = digits(end + 1);
        mantissa_digits += frac_end - end - 1;
        end = frac_end;
    }
    if mantissa_digits == 0 {
        return f64::NAN;
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp = end + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        let exp_end = digits(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }
    let literal = unsigned[..end].trim_end_matches('.');
    let literal = if literal.starts_with('.') { format!("0{literal}") } else { literal.to_owned() };
    literal.parse::<f64>().map_or(f64::NAN, |n| sign * n)
}

// §19.2.5 parseInt ( string, radix )
fn parse_int(agent: &Agent, _this: &JsValue, args: &[JsValue]) -> Completion {
    let input = q!(to_string(agent, &arg(args, 0))).to_rust_string();
    let radix = q!(to_int32(agent, &arg(args, 1)));
    let s = input.trim_start_matches(is_js_whitespace);
    let (sign, s) = match s.as_bytes().first() {
        Some(b'-') => (-1.0, &s[1..]),
        Some(b'+') => (1.0, &s[1..]),
        _ => (1.0, s),
    };
    let mut strip_prefix = true;
    let mut radix = radix as u32;
    if radix != 0 {
        if !(2..=36).contains(&radix) {
            return Completion::Normal(JsValue::Number(f64::NAN));
        }
        strip_prefix = radix == 16;
    } else {
        radix = 10;
    }
    let s = match s.get(..2) {
        Some("0x" | "0X") if strip_prefix => {
            radix = 16;
            &s[2..]
        }
        _ => s,
    };
    let end = s.find(|c: char| !c.is_digit(radix)).unwrap_or(s.len());
    let digits = &s[..end];
    if digits.is_empty() {
        return Completion::Normal(JsValue::Number(f64::NAN));
    }
    let magnitude = if radix == 10 {
        digits.parse::<f64>().unwrap_or(f64::NAN)
    } else {
        digits
            .chars()
            .filter_map(|c| c.to_digit(radix))
            .fold(0.0, |acc, d| acc * f64::from(radix) + f64::from(d))
    };
    Completion::Normal(JsValue::Number(sign * magnitude))
}

#[cfg(test)]
mod tests {
    use crate::evaluator::test_support::eval_to_string;

    use super::str_decimal_prefix;

    #[test]
    fn parse_int_honours_radix_and_prefixes() {
        assert_eq!(eval_to_string("parseInt('  42px')"), "42");
        assert_eq!(eval_to_string("parseInt('-0x1F')"), "-31");
        assert_eq!(eval_to_string("parseInt('ff', 16) + parseInt('0x10', 16)"), "271");
        assert_eq!(eval_to_string("parseInt('101', 2)"), "5");
        assert_eq!(eval_to_string("parseInt('0x10', 10)"), "0");
        assert_eq!(eval_to_string("parseInt('12', 1)"), "NaN");
        assert_eq!(eval_to_string("parseInt('')"), "NaN");
    }

    #[test]
    fn parse_float_takes_the_longest_decimal_prefix() {
        assert_eq!(str_decimal_prefix("3.14abc"), 3.14);
        assert_eq!(str_decimal_prefix(".5"), 0.5);
        assert_eq!(str_decimal_prefix("5."), 5.0);
        assert_eq!(str_decimal_prefix("1e3x"), 1000.0);
        assert_eq!(str_decimal_prefix("1e"), 1.0);
        assert_eq!(str_decimal_prefix("-Infinityx"), f64::NEG_INFINITY);
        assert!(str_decimal_prefix(".").is_nan());
        assert!(str_decimal_prefix("x1").is_nan());
        assert_eq!(eval_to_string("parseFloat('\\n 2.5e-1 ')"), "0.25");
    }

    #[test]
    fn nan_and_finite_checks_coerce() {
        assert_eq!(eval_to_string("isNaN('abc') + ',' + isNaN('12')"), "true,false");
        assert_eq!(eval_to_string("isFinite('1e3') + ',' + isFinite(Infinity)"), "true,false");
    }

    #[test]
    fn indirect_eval_runs_in_global_scope() {
        assert_eq!(eval_to_string("var x = 'global'; function f() { var x = 'local'; return (0, eval)('x'); } f()"), "global");
        assert_eq!(eval_to_string("eval(42)"), "42");
    }
}
