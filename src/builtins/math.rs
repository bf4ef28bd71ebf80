//! §21.3 The Math object.

use std::rc::Rc;

use crate::abstract_ops::conversion::{to_number, to_uint32};
use crate::builtins::{arg, builtin_in_realm, define_constant, define_method, define_tag, define_value, plain_object};
use crate::completion::Completion;
use crate::engine::{Agent, IntrinsicId, Realm};
use crate::object::{JsObject, PropertyKey};
use crate::types::{JsValue, number_ops};

const CONSTANTS: &[(&str, f64)] = &[
    ("E", std::f64::consts::E),
    ("LN10", std::f64::consts::LN_10),
    ("LN2", std::f64::consts::LN_2),
    ("LOG10E", std::f64::consts::LOG10_E),
    ("LOG2E", std::f64::consts::LOG2_E),
    ("PI", std::f64::consts::PI),
    ("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2),
    ("SQRT2", std::f64::consts::SQRT_2),
];

/// One-argument functions: ToNumber the argument, then apply.
const UNARY: &[(&str, fn(f64) -> f64)] = &[
    ("abs", f64::abs),
    ("acos", f64::acos),
    ("acosh", f64::acosh),
    ("asin", f64::asin),
    ("asinh", f64::asinh),
    ("atan", f64::atan),
    ("atanh", f64::atanh),
    ("cbrt", f64::cbrt),
    ("ceil", f64::ceil),
    ("cos", f64::cos),
    ("cosh", f64::cosh),
    ("exp", f64::exp),
    ("expm1", f64::exp_m1),
    ("floor", f64::floor),
    ("fround", fround),
    ("log", f64::ln),
    ("log10", f64::log10),
    ("log1p", f64::ln_1p),
    ("log2", f64::log2),
    ("round", round),
    ("sign", sign),
    ("sin", f64::sin),
    ("sinh", f64::sinh),
    ("sqrt", f64::sqrt),
    ("tan", f64::tan),
    ("tanh", f64::tanh),
    ("trunc", f64::trunc),
];

pub(super) fn init(realm: &Realm) {
    let math = plain_object(realm);
    for &(name, value) in CONSTANTS {
        define_constant(&math, name, JsValue::Number(value));
    }
    for &(name, op) in UNARY {
        let key = PropertyKey::from(name);
        let f = builtin_in_realm(
            realm,
            Rc::new(move |agent: &Agent, _this: &JsValue, args: &[JsValue], _new_target: Option<&JsObject>| {
                let x = q!(to_number(agent, &arg(args, 0)));
                Completion::Normal(JsValue::Number(op(x)))
            }),
            1,
            &key,
            None,
            None,
            false,
        );
        define_value(&math, key, JsValue::Object(f));
    }
    define_method(realm, &math, "atan2", 2, |agent, _, args| {
        let y = q!(to_number(agent, &arg(args, 0)));
        let x = q!(to_number(agent, &arg(args, 1)));
        Completion::Normal(JsValue::Number(y.atan2(x)))
    });
    define_method(realm, &math, "clz32", 1, |agent, _, args| {
        let n = q!(to_uint32(agent, &arg(args, 0)));
        Completion::Normal(JsValue::Number(f64::from(n.leading_zeros())))
    });
    define_method(realm, &math, "hypot", 2, math_hypot);
    define_method(realm, &math, "imul", 2, |agent, _, args| {
        let a = q!(to_uint32(agent, &arg(args, 0)));
        let b = q!(to_uint32(agent, &arg(args, 1)));
        Completion::Normal(JsValue::Number(f64::from(a.wrapping_mul(b) as i32)))
    });
    define_method(realm, &math, "max", 2, |agent, _, args| extremum(agent, args, true));
    define_method(realm, &math, "min", 2, |agent, _, args| extremum(agent, args, false));
    define_method(realm, &math, "pow", 2, |agent, _, args| {
        let base = q!(to_number(agent, &arg(args, 0)));
        let exponent = q!(to_number(agent, &arg(args, 1)));
        Completion::Normal(JsValue::Number(number_ops::exponentiate(base, exponent)))
    });
    define_method(realm, &math, "random", 0, |_, _, _| Completion::Normal(JsValue::Number(random())));
    define_tag(&math, "Math");
    realm.set_intrinsic(IntrinsicId::Math, math);
}

fn fround(x: f64) -> f64 {
    f64::from(x as f32)
}

// §21.3.2.28 Math.round: ties toward +∞, -0 preserved.
fn round(x: f64) -> f64 {
    if !x.is_finite() || x == 0.0 {
        return x;
    }
    if (-0.5..0.0).contains(&x) {
        return -0.0;
    }
    let floor = x.floor();
    if x - floor >= 0.5 { floor + 1.0 } else { floor }
}

fn sign(x: f64) -> f64 {
    if x.is_nan() || x == 0.0 { x } else { x.signum() }
}

// §21.3.2.18 Math.hypot: every argument is coerced before any is inspected.
fn math_hypot(agent: &Agent, _this: &JsValue, args: &[JsValue]) -> Completion {
    let mut coerced = Vec::with_capacity(args.len());
    for a in args {
        coerced.push(q!(to_number(agent, a)));
    }
    if coerced.iter().any(|n| n.is_infinite()) {
        return Completion::Normal(JsValue::Number(f64::INFINITY));
    }
    if coerced.iter().any(|n| n.is_nan()) {
        return Completion::Normal(JsValue::Number(f64::NAN));
    }
    let largest = coerced.iter().fold(0.0_f64, |m, n| m.max(n.abs()));
    if largest == 0.0 {
        return Completion::Normal(JsValue::Number(0.0));
    }
    let sum: f64 = coerced.iter().map(|n| (n / largest) * (n / largest)).sum();
    Completion::Normal(JsValue::Number(largest * sum.sqrt()))
}

// §21.3.2.24 Math.max, §21.3.2.25 Math.min
fn extremum(agent: &Agent, args: &[JsValue], max: bool) -> Completion {
    let mut coerced = Vec::with_capacity(args.len());
    for a in args {
        coerced.push(q!(to_number(agent, a)));
    }
    let mut best = if max { f64::NEG_INFINITY } else { f64::INFINITY };
    for n in coerced {
        if n.is_nan() {
            return Completion::Normal(JsValue::Number(f64::NAN));
        }
        let better = if n == best && n == 0.0 {
            // +0 beats -0 for max, -0 beats +0 for min
            n.is_sign_negative() != max
        } else if max {
            n > best
        } else {
            n < best
        };
        if better {
            best = n;
        }
    }
    Completion::Normal(JsValue::Number(best))
}

/// A uniformly distributed value in [0, 1) from the thread-local generator.
fn random() -> f64 {
    rand::random::<f64>()
}

#[cfg(test)]
mod tests {
    use crate::evaluator::test_support::eval_to_string;

    use super::{random, round};

    #[test]
    fn rounding_ties_go_up() {
        assert_eq!(round(2.5), 3.0);
        assert_eq!(round(-2.5), -2.0);
        assert_eq!(round(0.49999999999999994), 0.0);
        assert!(round(-0.2).is_sign_negative());
        assert_eq!(eval_to_string("Math.round(-4.6) + ',' + Math.round(1.5)"), "-5,2");
    }

    #[test]
    fn max_and_min_coerce_and_order_zeros() {
        assert_eq!(eval_to_string("Math.max() + ',' + Math.min()"), "-Infinity,Infinity");
        assert_eq!(eval_to_string("Math.max(1, '3', 2)"), "3");
        assert_eq!(eval_to_string("Math.max(1, NaN, 2)"), "NaN");
        assert_eq!(eval_to_string("1 / Math.max(-0, 0) + ',' + 1 / Math.min(0, -0)"), "Infinity,-Infinity");
        assert_eq!(
            eval_to_string("var n = 0; Math.max(NaN, { valueOf() { n++; return 1; } }); n"),
            "1"
        );
    }

    #[test]
    fn unary_functions_coerce_their_argument() {
        assert_eq!(eval_to_string("Math.abs('-3') + Math.sqrt(16) + Math.trunc(-1.7)"), "6");
        assert_eq!(eval_to_string("Math.sign(-7) + ',' + Math.cbrt(27)"), "-1,3");
        assert_eq!(eval_to_string("Math.floor.length + ',' + Math.floor.name"), "1,floor");
    }

    #[test]
    fn integer_helpers() {
        assert_eq!(eval_to_string("Math.clz32(1) + ',' + Math.imul(0xffffffff, 5)"), "31,-5");
        assert_eq!(eval_to_string("Math.hypot(3, 4) + ',' + Math.hypot(NaN, Infinity)"), "5,Infinity");
        assert_eq!(eval_to_string("Math.pow(2, 10) + ',' + Math.pow(1, Infinity)"), "1024,NaN");
    }

    #[test]
    fn random_stays_in_the_unit_interval() {
        for _ in 0..1000 {
            let r = random();
            assert!((0.0..1.0).contains(&r));
        }
        assert_eq!(eval_to_string("Object.prototype.toString.call(Math)"), "[object Math]");
    }
}
