//! §21.1 Number objects and §20.3 Boolean objects.

use crate::abstract_ops::conversion::{Numeric, big_int_to_number, to_boolean, to_integer_or_infinity, to_numeric};
use crate::abstract_ops::ordinary_create_from_constructor;
use crate::builtins::{arg, define_constant, define_constructor, define_method, define_value};
use crate::completion::Completion;
use crate::engine::{Agent, ErrorKind, IntrinsicId, Message, Realm};
use crate::object::{JsObject, ObjectKind};
use crate::types::{JsValue, number_ops};

pub const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

pub(super) fn init(realm: &Realm) {
    init_number(realm);
    init_boolean(realm);
}

fn init_number(realm: &Realm) {
    let proto = JsObject::new(Some(realm.intrinsic(IntrinsicId::ObjectPrototype)), ObjectKind::Number(0.0));
    define_method(realm, &proto, "toFixed", 1, number_to_fixed);
    define_method(realm, &proto, "toLocaleString", 0, |agent, this, _| {
        let x = q!(this_number_value(agent, this));
        Completion::Normal(JsValue::from_str(&number_ops::to_string(x)))
    });
    define_method(realm, &proto, "toString", 1, number_to_string);
    define_method(realm, &proto, "valueOf", 0, |agent, this, _| this_number_value(agent, this).map(JsValue::Number));

    let ctor = define_constructor(realm, "Number", 1, number_constructor, &proto);
    define_constant(&ctor, "EPSILON", JsValue::Number(f64::EPSILON));
    define_constant(&ctor, "MAX_SAFE_INTEGER", JsValue::Number(MAX_SAFE_INTEGER));
    define_constant(&ctor, "MAX_VALUE", JsValue::Number(f64::MAX));
    define_constant(&ctor, "MIN_SAFE_INTEGER", JsValue::Number(-MAX_SAFE_INTEGER));
    define_constant(&ctor, "MIN_VALUE", JsValue::Number(5e-324));
    define_constant(&ctor, "NaN", JsValue::Number(f64::NAN));
    define_constant(&ctor, "NEGATIVE_INFINITY", JsValue::Number(f64::NEG_INFINITY));
    define_constant(&ctor, "POSITIVE_INFINITY", JsValue::Number(f64::INFINITY));
    define_method(realm, &ctor, "isFinite", 1, |_, _, args| {
        Completion::Normal(JsValue::Boolean(matches!(arg(args, 0), JsValue::Number(n) if n.is_finite())))
    });
    define_method(realm, &ctor, "isInteger", 1, |_, _, args| {
        Completion::Normal(JsValue::Boolean(matches!(arg(args, 0), JsValue::Number(n) if is_integral(n))))
    });
    define_method(realm, &ctor, "isNaN", 1, |_, _, args| {
        Completion::Normal(JsValue::Boolean(matches!(arg(args, 0), JsValue::Number(n) if n.is_nan())))
    });
    define_method(realm, &ctor, "isSafeInteger", 1, |_, _, args| {
        let safe = matches!(arg(args, 0), JsValue::Number(n) if is_integral(n) && n.abs() <= MAX_SAFE_INTEGER);
        Completion::Normal(JsValue::Boolean(safe))
    });
    // §21.1.2.12, §21.1.2.13 share the global functions.
    define_value(&ctor, "parseFloat", JsValue::Object(realm.intrinsic(IntrinsicId::ParseFloat)));
    define_value(&ctor, "parseInt", JsValue::Object(realm.intrinsic(IntrinsicId::ParseInt)));
    realm.set_intrinsic(IntrinsicId::NumberPrototype, proto);
    realm.set_intrinsic(IntrinsicId::Number, ctor);
}

// §21.1.2.3 IsIntegralNumber
fn is_integral(n: f64) -> bool {
    n.is_finite() && n.trunc() == n
}

// §21.1.1.1 Number ( value )
fn number_constructor(agent: &Agent, _this: &JsValue, args: &[JsValue], new_target: Option<&JsObject>) -> Completion {
    let n = if args.is_empty() {
        0.0
    } else {
        match q!(to_numeric(agent, &args[0])) {
            Numeric::Number(n) => n,
            Numeric::BigInt(b) => big_int_to_number(&b),
        }
    };
    let Some(new_target) = new_target else {
        return Completion::Normal(JsValue::Number(n));
    };
    ordinary_create_from_constructor(agent, new_target, IntrinsicId::NumberPrototype, ObjectKind::Number(n))
        .map(JsValue::Object)
}

// §21.1.3.7.1 ThisNumberValue
fn this_number_value(agent: &Agent, value: &JsValue) -> Completion<f64> {
    match value {
        JsValue::Number(n) => return Completion::Normal(*n),
        JsValue::Object(o) => {
            if let ObjectKind::Number(n) = o.borrow().kind {
                return Completion::Normal(n);
            }
        }
        _ => {}
    }
    agent.throw(ErrorKind::Type, Message::NotATypeObject(agent.inspect(value), "Number"))
}

// §21.1.3.6 Number.prototype.toString ( [ radix ] )
fn number_to_string(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let x = q!(this_number_value(agent, this));
    let radix = match arg(args, 0) {
        JsValue::Undefined => 10.0,
        r => q!(to_integer_or_infinity(agent, &r)),
    };
    if !(2.0..=36.0).contains(&radix) {
        return agent.throw(ErrorKind::Range, Message::InvalidRadix);
    }
    let text = if radix == 10.0 {
        number_ops::to_string(x)
    } else {
        number_ops::to_string_radix(x, radix as u32)
    };
    Completion::Normal(JsValue::from_str(&text))
}

// §21.1.3.3 Number.prototype.toFixed ( fractionDigits )
fn number_to_fixed(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let x = q!(this_number_value(agent, this));
    let f = q!(to_integer_or_infinity(agent, &arg(args, 0)));
    if !f.is_finite() || !(0.0..=100.0).contains(&f) {
        return agent.throw(ErrorKind::Range, Message::OutOfRange(format!("toFixed() digits argument {f}")));
    }
    if !x.is_finite() || x.abs() >= 1e21 {
        return Completion::Normal(JsValue::from_str(&number_ops::to_string(x)));
    }
    let digits = fixed_digits(x.abs(), f as usize);
    let text = if x < 0.0 { format!("-{digits}") } else { digits };
    Completion::Normal(JsValue::from_str(&text))
}

/// `x` (non-negative, below 1e21) with `places` fraction digits. Ties round
/// up: the expansion of a double is exact at this precision, so the first
/// dropped digit decides.
fn fixed_digits(x: f64, places: usize) -> String {
    let exact = format!("{x:.1100}");
    let Some(point) = exact.find('.') else {
        return exact;
    };
    let mut kept: Vec<u8> = exact.as_bytes()[..point + 1 + places].to_vec();
    let round_up = exact.as_bytes()[point + 1 + places] >= b'5';
    if places == 0 {
        kept.pop();
    }
    if round_up {
        let mut i = kept.len();
        loop {
            if i == 0 {
                kept.insert(0, b'1');
                break;
            }
            i -= 1;
            match kept[i] {
                b'.' => continue,
                b'9' => kept[i] = b'0',
                d => {
                    kept[i] = d + 1;
                    break;
                }
            }
        }
    }
    kept.into_iter().map(char::from).collect()
}

fn init_boolean(realm: &Realm) {
    let proto = JsObject::new(Some(realm.intrinsic(IntrinsicId::ObjectPrototype)), ObjectKind::Boolean(false));
    define_method(realm, &proto, "toString", 0, |agent, this, _| {
        let b = q!(this_boolean_value(agent, this));
        Completion::Normal(JsValue::from_str(if b { "true" } else { "false" }))
    });
    define_method(realm, &proto, "valueOf", 0, |agent, this, _| this_boolean_value(agent, this).map(JsValue::Boolean));
    let ctor = define_constructor(realm, "Boolean", 1, boolean_constructor, &proto);
    realm.set_intrinsic(IntrinsicId::BooleanPrototype, proto);
    realm.set_intrinsic(IntrinsicId::Boolean, ctor);
}

// §20.3.1.1 Boolean ( value )
fn boolean_constructor(agent: &Agent, _this: &JsValue, args: &[JsValue], new_target: Option<&JsObject>) -> Completion {
    let b = to_boolean(&arg(args, 0));
    let Some(new_target) = new_target else {
        return Completion::Normal(JsValue::Boolean(b));
    };
    ordinary_create_from_constructor(agent, new_target, IntrinsicId::BooleanPrototype, ObjectKind::Boolean(b))
        .map(JsValue::Object)
}

// §20.3.3.3.1 ThisBooleanValue
fn this_boolean_value(agent: &Agent, value: &JsValue) -> Completion<bool> {
    match value {
        JsValue::Boolean(b) => return Completion::Normal(*b),
        JsValue::Object(o) => {
            if let ObjectKind::Boolean(b) = o.borrow().kind {
                return Completion::Normal(b);
            }
        }
        _ => {}
    }
    agent.throw(ErrorKind::Type, Message::NotATypeObject(agent.inspect(value), "Boolean"))
}

#[cfg(test)]
mod tests {
    use crate::evaluator::test_support::eval_to_string;

    use super::fixed_digits;

    #[test]
    fn constructor_converts_and_wraps() {
        assert_eq!(eval_to_string("Number('  12 ') + Number(true) + Number()"), "13");
        assert_eq!(eval_to_string("Number(10n)"), "10");
        assert_eq!(eval_to_string("typeof new Number(1) + ',' + (new Number(5) + 1)"), "object,6");
        assert_eq!(eval_to_string("Object.prototype.toString.call(Number.prototype)"), "[object Number]");
    }

    #[test]
    fn static_predicates_do_not_coerce() {
        assert_eq!(eval_to_string("Number.isNaN('abc') + ',' + Number.isNaN(NaN)"), "false,true");
        assert_eq!(eval_to_string("Number.isInteger(5.0) + ',' + Number.isInteger(5.5)"), "true,false");
        assert_eq!(
            eval_to_string("Number.isSafeInteger(Number.MAX_SAFE_INTEGER) + ',' + Number.isSafeInteger(2 ** 53)"),
            "true,false"
        );
        assert_eq!(eval_to_string("Number.parseInt === parseInt"), "true");
    }

    #[test]
    fn to_string_takes_a_radix() {
        assert_eq!(eval_to_string("(255).toString(16) + ',' + (5).toString(2)"), "ff,101");
        assert_eq!(eval_to_string("(0.5).toString(2)"), "0.1");
        assert!(eval_to_string("(1).toString(1)").starts_with("Throw: RangeError"));
        assert!(eval_to_string("Number.prototype.toString.call('1')").starts_with("Throw: TypeError"));
    }

    #[test]
    fn to_fixed_rounds_half_up() {
        assert_eq!(fixed_digits(0.5, 0), "1");
        assert_eq!(fixed_digits(2.5, 0), "3");
        assert_eq!(fixed_digits(9.995, 2), "9.99");
        assert_eq!(fixed_digits(99.5, 0), "100");
        assert_eq!(eval_to_string("(1.005).toFixed(2) + ',' + (-1.5).toFixed(0) + ',' + (3).toFixed(2)"), "1.00,-2,3.00");
        assert_eq!(eval_to_string("(-0.0001).toFixed(2) + ',' + (-0).toFixed(1)"), "-0.00,0.0");
        assert_eq!(eval_to_string("(1e21).toFixed(2)"), "1e+21");
        assert!(eval_to_string("(1).toFixed(101)").starts_with("Throw: RangeError"));
    }

    #[test]
    fn booleans_wrap_and_unwrap() {
        assert_eq!(eval_to_string("Boolean('') + ',' + Boolean('x') + ',' + Boolean({})"), "false,true,true");
        assert_eq!(eval_to_string("new Boolean(false) ? 'truthy' : 'falsy'"), "truthy");
        assert_eq!(eval_to_string("new Boolean(false).valueOf().toString()"), "false");
        assert!(eval_to_string("Boolean.prototype.valueOf.call(1)").starts_with("Throw: TypeError"));
    }
}
