//! §21.2 BigInt objects.

use num_bigint::BigInt;
use num_traits::{FromPrimitive, Signed, Zero};

use crate::abstract_ops::conversion::{PreferredType, to_big_int, to_index, to_integer_or_infinity, to_primitive};
use crate::builtins::{arg, define_constructor, define_method, define_tag};
use crate::completion::Completion;
use crate::engine::{Agent, ErrorKind, IntrinsicId, Message, Realm};
use crate::object::{JsObject, ObjectKind};
use crate::types::{JsBigInt, JsValue};

pub(super) fn init(realm: &Realm) {
    let proto = JsObject::ordinary(Some(realm.intrinsic(IntrinsicId::ObjectPrototype)));
    define_method(realm, &proto, "toLocaleString", 0, |agent, this, _| {
        let b = q!(this_big_int_value(agent, this));
        Completion::Normal(JsValue::from_str(&b.value.to_string()))
    });
    define_method(realm, &proto, "toString", 0, big_int_to_string);
    define_method(realm, &proto, "valueOf", 0, |agent, this, _| this_big_int_value(agent, this).map(JsValue::BigInt));
    define_tag(&proto, "BigInt");

    let ctor = define_constructor(realm, "BigInt", 1, big_int_constructor, &proto);
    define_method(realm, &ctor, "asIntN", 2, |agent, _, args| as_n_bits(agent, args, true));
    define_method(realm, &ctor, "asUintN", 2, |agent, _, args| as_n_bits(agent, args, false));
    realm.set_intrinsic(IntrinsicId::BigIntPrototype, proto);
    realm.set_intrinsic(IntrinsicId::BigInt, ctor);
}

// §21.2.1.1 BigInt ( value )
fn big_int_constructor(agent: &Agent, _this: &JsValue, args: &[JsValue], new_target: Option<&JsObject>) -> Completion {
    if new_target.is_some() {
        return agent.throw(ErrorKind::Type, Message::NotAConstructor("BigInt".into()));
    }
    let prim = q!(to_primitive(agent, &arg(args, 0), PreferredType::Number));
    if let JsValue::Number(n) = prim {
        return number_to_big_int(agent, n).map(JsValue::BigInt);
    }
    to_big_int(agent, &prim).map(JsValue::BigInt)
}

// §21.2.1.1.1 NumberToBigInt
fn number_to_big_int(agent: &Agent, n: f64) -> Completion<JsBigInt> {
    if !n.is_finite() || n.trunc() != n {
        return agent.throw(ErrorKind::Range, Message::NotAnInteger(crate::types::number_ops::to_string(n)));
    }
    match BigInt::from_f64(n) {
        Some(b) => Completion::Normal(JsBigInt::new(b)),
        None => agent.throw(ErrorKind::Range, Message::NotAnInteger(crate::types::number_ops::to_string(n))),
    }
}

// §21.2.3.4.1 ThisBigIntValue
fn this_big_int_value(agent: &Agent, value: &JsValue) -> Completion<JsBigInt> {
    match value {
        JsValue::BigInt(b) => return Completion::Normal(b.clone()),
        JsValue::Object(o) => {
            if let ObjectKind::BigInt(b) = &o.borrow().kind {
                return Completion::Normal(b.clone());
            }
        }
        _ => {}
    }
    agent.throw(ErrorKind::Type, Message::NotATypeObject(agent.inspect(value), "BigInt"))
}

// §21.2.3.3 BigInt.prototype.toString ( [ radix ] )
fn big_int_to_string(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let x = q!(this_big_int_value(agent, this));
    let radix = match arg(args, 0) {
        JsValue::Undefined => 10.0,
        r => q!(to_integer_or_infinity(agent, &r)),
    };
    if !(2.0..=36.0).contains(&radix) {
        return agent.throw(ErrorKind::Range, Message::InvalidRadix);
    }
    Completion::Normal(JsValue::from_str(&x.value.to_str_radix(radix as u32)))
}

// §21.2.2.1 BigInt.asIntN, §21.2.2.2 BigInt.asUintN
fn as_n_bits(agent: &Agent, args: &[JsValue], signed: bool) -> Completion {
    let bits = q!(to_index(agent, &arg(args, 0)));
    let big = q!(to_big_int(agent, &arg(args, 1)));
    let Ok(bits) = u32::try_from(bits) else {
        return agent.throw(ErrorKind::Range, Message::OutOfRange(bits.to_string()));
    };
    if bits == 0 {
        return Completion::Normal(JsValue::BigInt(JsBigInt::new(BigInt::zero())));
    }
    let magnitude_bits = big.value.bits();
    // The value already fits: no modulus needed.
    let fits = if signed {
        magnitude_bits < u64::from(bits)
    } else {
        !big.value.is_negative() && magnitude_bits <= u64::from(bits)
    };
    if fits {
        return Completion::Normal(JsValue::BigInt(big));
    }
    let modulus = BigInt::from(1u8) << bits;
    let mut m = &*big.value % &modulus;
    if m.is_negative() {
        m += &modulus;
    }
    if signed && m >= (BigInt::from(1u8) << (bits - 1)) {
        m -= &modulus;
    }
    Completion::Normal(JsValue::BigInt(JsBigInt::new(m)))
}

#[cfg(test)]
mod tests {
    use crate::evaluator::test_support::eval_to_string;

    #[test]
    fn conversion_from_numbers_and_strings() {
        assert_eq!(eval_to_string("BigInt(42) === 42n"), "true");
        assert_eq!(eval_to_string("BigInt('0x10') + BigInt(true)"), "17");
        assert_eq!(eval_to_string("typeof BigInt('  9007199254740993  ')"), "bigint");
        assert!(eval_to_string("BigInt(1.5)").starts_with("Throw: RangeError"));
        assert!(eval_to_string("BigInt('1.5')").starts_with("Throw: SyntaxError"));
        assert!(eval_to_string("BigInt(undefined)").starts_with("Throw: TypeError"));
    }

    #[test]
    fn cannot_be_constructed_with_new() {
        assert!(eval_to_string("new BigInt(1)").starts_with("Throw: TypeError"));
    }

    #[test]
    fn to_string_takes_a_radix() {
        assert_eq!(eval_to_string("(255n).toString(16) + ',' + (-8n).toString(2)"), "ff,-1000");
        assert_eq!(eval_to_string("Object.prototype.toString.call(1n)"), "[object BigInt]");
        assert!(eval_to_string("(1n).toString(37)").starts_with("Throw: RangeError"));
    }

    #[test]
    fn as_int_n_wraps() {
        assert_eq!(eval_to_string("BigInt.asUintN(8, 257n)"), "1");
        assert_eq!(eval_to_string("BigInt.asIntN(8, 255n)"), "-1");
        assert_eq!(eval_to_string("BigInt.asUintN(8, -1n)"), "255");
        assert_eq!(eval_to_string("BigInt.asIntN(0, 5n)"), "0");
        assert_eq!(eval_to_string("BigInt.asIntN(8, -128n) + ',' + BigInt.asIntN(8, 128n)"), "-128,-128");
    }

    #[test]
    fn huge_widths_leave_small_values_alone() {
        assert_eq!(eval_to_string("BigInt.asIntN(2 ** 32 - 1, -5n)"), "-5");
        assert_eq!(eval_to_string("BigInt.asUintN(2 ** 32 - 1, 7n)"), "7");
        assert_eq!(eval_to_string("BigInt.asUintN(64, -1n)"), "18446744073709551615");
    }
}
