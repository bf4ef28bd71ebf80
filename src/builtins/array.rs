//! §23.1 Array objects.

use crate::abstract_ops::comparison::{is_strictly_equal, same_value_zero};
use crate::abstract_ops::conversion::{relative_index, to_boolean, to_integer_or_infinity, to_number, to_object, to_string, to_uint32};
use crate::abstract_ops::iterator::{get_iterator_from_method, iterator_close, iterator_step_value};
use crate::abstract_ops::{
    EnumerableKind, array_species_create, call, construct, create_data_property_or_throw, delete_property_or_throw,
    get, get_method, get_prototype_from_constructor, has_property, is_array, length_of_array_like, set,
};
use crate::builtins::iterators::create_array_iterator;
use crate::builtins::object::object_to_string;
use crate::builtins::{arg, define_constructor, define_method, define_species};
use crate::completion::Completion;
use crate::engine::{Agent, ErrorKind, IntrinsicId, Message, Realm};
use crate::object::array::array_create;
use crate::object::{JsObject, ObjectKind, Property, PropertyKey};
use crate::types::{JsString, JsValue, WellKnownSymbol};

/// 2^53 - 1, the largest length an array-like may reach.
const MAX_SAFE_LENGTH: u64 = (1 << 53) - 1;

pub(super) fn init(realm: &Realm) {
    let proto = JsObject::new(Some(realm.intrinsic(IntrinsicId::ObjectPrototype)), ObjectKind::Array);
    proto.insert_property("length", Property::data(JsValue::Number(0.0), true, false, false));
    realm.set_intrinsic(IntrinsicId::ArrayPrototype, proto.clone());

    define_method(realm, &proto, "concat", 1, concat);
    define_method(realm, &proto, "entries", 0, |agent, this, _| iterate(agent, this, EnumerableKind::KeyValue));
    define_method(realm, &proto, "every", 1, every);
    define_method(realm, &proto, "fill", 1, fill);
    define_method(realm, &proto, "filter", 1, filter);
    define_method(realm, &proto, "find", 1, |agent, this, args| find(agent, this, args, false));
    define_method(realm, &proto, "findIndex", 1, |agent, this, args| find(agent, this, args, true));
    define_method(realm, &proto, "forEach", 1, for_each);
    define_method(realm, &proto, "includes", 1, includes);
    define_method(realm, &proto, "indexOf", 1, index_of);
    define_method(realm, &proto, "join", 1, join);
    define_method(realm, &proto, "keys", 0, |agent, this, _| iterate(agent, this, EnumerableKind::Key));
    define_method(realm, &proto, "lastIndexOf", 1, last_index_of);
    define_method(realm, &proto, "map", 1, map);
    define_method(realm, &proto, "pop", 0, pop);
    define_method(realm, &proto, "push", 1, push);
    define_method(realm, &proto, "reduce", 1, |agent, this, args| reduce(agent, this, args, false));
    define_method(realm, &proto, "reduceRight", 1, |agent, this, args| reduce(agent, this, args, true));
    define_method(realm, &proto, "reverse", 0, reverse);
    define_method(realm, &proto, "shift", 0, shift);
    define_method(realm, &proto, "slice", 2, slice);
    define_method(realm, &proto, "some", 1, some);
    define_method(realm, &proto, "sort", 1, sort);
    define_method(realm, &proto, "splice", 2, splice);
    define_method(realm, &proto, "toString", 0, array_to_string);
    define_method(realm, &proto, "unshift", 1, unshift);
    let values = define_method(realm, &proto, "values", 0, |agent, this, _| iterate(agent, this, EnumerableKind::Value));
    proto.insert_property(
        PropertyKey::symbol(WellKnownSymbol::Iterator),
        Property::data(JsValue::Object(values.clone()), true, false, true),
    );
    realm.set_intrinsic(IntrinsicId::ArrayProtoValues, values);

    let ctor = define_constructor(realm, "Array", 1, array_constructor, &proto);
    define_method(realm, &ctor, "from", 1, array_from);
    define_method(realm, &ctor, "isArray", 1, |agent, _this, args| {
        is_array(agent, &arg(args, 0)).map(JsValue::Boolean)
    });
    define_method(realm, &ctor, "of", 0, array_of);
    define_species(realm, &ctor);
    realm.set_intrinsic(IntrinsicId::Array, ctor);
}

fn key(index: u64) -> PropertyKey {
    PropertyKey::from_f64(index as f64)
}

fn set_length(agent: &Agent, o: &JsObject, len: u64) -> Completion<bool> {
    set(agent, o, PropertyKey::from("length"), JsValue::Number(len as f64), true)
}

/// ToObject(this) and LengthOfArrayLike, the prologue of most methods.
fn this_array_like(agent: &Agent, this: &JsValue) -> Completion<(JsObject, u64)> {
    let o = q!(to_object(agent, this));
    let len = q!(length_of_array_like(agent, &o));
    Completion::Normal((o, len))
}

fn callable_arg(agent: &Agent, args: &[JsValue], index: usize) -> Completion<JsValue> {
    let f = arg(args, index);
    if !f.is_callable() {
        return agent.throw(ErrorKind::Type, Message::NotAFunction(agent.inspect(&f)));
    }
    Completion::Normal(f)
}

fn too_long<T>(agent: &Agent) -> Completion<T> {
    agent.throw(ErrorKind::Type, Message::InvalidArrayLength)
}

/// The second-argument `fromIndex`/`start` shared by slice-like methods.
fn relative_arg(agent: &Agent, value: &JsValue, len: u64, default: u64) -> Completion<u64> {
    if value.is_undefined() {
        return Completion::Normal(default);
    }
    let relative = q!(to_integer_or_infinity(agent, value));
    Completion::Normal(relative_index(relative, len))
}

// §23.1.1.1 Array ( ...values )
fn array_constructor(agent: &Agent, _this: &JsValue, args: &[JsValue], new_target: Option<&JsObject>) -> Completion {
    let new_target = match new_target {
        Some(nt) => nt.clone(),
        None => agent
            .active_function_object()
            .unwrap_or_else(|| agent.intrinsic(IntrinsicId::Array)),
    };
    let proto = q!(get_prototype_from_constructor(agent, &new_target, IntrinsicId::ArrayPrototype));
    match args {
        [] => array_create(agent, 0, Some(proto)).map(JsValue::Object),
        [len] => {
            let array = q!(array_create(agent, 0, Some(proto)));
            let int_len = match len {
                JsValue::Number(n) => {
                    let int_len = q!(to_uint32(agent, len));
                    if f64::from(int_len) != *n {
                        return agent.throw(ErrorKind::Range, Message::InvalidArrayLength);
                    }
                    u64::from(int_len)
                }
                other => {
                    q!(create_data_property_or_throw(agent, &array, key(0), other.clone()));
                    1
                }
            };
            q!(set_length(agent, &array, int_len));
            Completion::Normal(JsValue::Object(array))
        }
        values => {
            let array = q!(array_create(agent, values.len() as u64, Some(proto)));
            for (k, value) in values.iter().enumerate() {
                q!(create_data_property_or_throw(agent, &array, key(k as u64), value.clone()));
            }
            Completion::Normal(JsValue::Object(array))
        }
    }
}

/// `new C(...args)` when `this` is a constructor, else a fresh array.
fn construct_or_array(agent: &Agent, c: &JsValue, args: &[JsValue], len: u64) -> Completion<JsObject> {
    match c {
        JsValue::Object(ctor) if ctor.is_constructor() => construct(agent, ctor, args, None),
        _ => array_create(agent, len, None),
    }
}

// §23.1.2.1 Array.from ( items [ , mapfn [ , thisArg ] ] )
fn array_from(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let items = arg(args, 0);
    let mapfn = arg(args, 1);
    let this_arg = arg(args, 2);
    let mapping = !mapfn.is_undefined();
    if mapping && !mapfn.is_callable() {
        return agent.throw(ErrorKind::Type, Message::NotAFunction(agent.inspect(&mapfn)));
    }
    let using_iterator = q!(get_method(agent, &items, &PropertyKey::symbol(WellKnownSymbol::Iterator)));
    if let Some(method) = using_iterator {
        let a = q!(construct_or_array(agent, this, &[], 0));
        let record = q!(get_iterator_from_method(agent, &items, &JsValue::Object(method)));
        let mut k: u64 = 0;
        loop {
            if k >= MAX_SAFE_LENGTH {
                let error = agent.throw(ErrorKind::Type, Message::InvalidArrayLength);
                return iterator_close(agent, &record, error);
            }
            let Some(next) = q!(iterator_step_value(agent, &record)) else {
                q!(set_length(agent, &a, k));
                return Completion::Normal(JsValue::Object(a));
            };
            let value = if mapping {
                match call(agent, &mapfn, &this_arg, &[next, JsValue::Number(k as f64)]) {
                    Completion::Normal(v) => v,
                    abrupt => return iterator_close(agent, &record, abrupt),
                }
            } else {
                next
            };
            if let abrupt @ Completion::Throw(_) = create_data_property_or_throw(agent, &a, key(k), value) {
                return iterator_close(agent, &record, abrupt.into_abrupt());
            }
            k += 1;
        }
    }
    let array_like = q!(to_object(agent, &items));
    let len = q!(length_of_array_like(agent, &array_like));
    let a = q!(construct_or_array(agent, this, &[JsValue::Number(len as f64)], len));
    for k in 0..len {
        let k_value = q!(get(agent, &array_like, &key(k)));
        let value = if mapping {
            q!(call(agent, &mapfn, &this_arg, &[k_value, JsValue::Number(k as f64)]))
        } else {
            k_value
        };
        q!(create_data_property_or_throw(agent, &a, key(k), value));
    }
    q!(set_length(agent, &a, len));
    Completion::Normal(JsValue::Object(a))
}

// §23.1.2.3 Array.of ( ...items )
fn array_of(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let len = args.len() as u64;
    let a = q!(construct_or_array(agent, this, &[JsValue::Number(len as f64)], len));
    for (k, item) in args.iter().enumerate() {
        q!(create_data_property_or_throw(agent, &a, key(k as u64), item.clone()));
    }
    q!(set_length(agent, &a, len));
    Completion::Normal(JsValue::Object(a))
}

fn iterate(agent: &Agent, this: &JsValue, kind: EnumerableKind) -> Completion {
    let o = q!(to_object(agent, this));
    Completion::Normal(JsValue::Object(create_array_iterator(agent, o, kind)))
}

// §23.1.3.2.1 IsConcatSpreadable
fn is_concat_spreadable(agent: &Agent, value: &JsValue) -> Completion<bool> {
    let JsValue::Object(o) = value else {
        return Completion::Normal(false);
    };
    let spreadable = q!(get(agent, o, &PropertyKey::symbol(WellKnownSymbol::IsConcatSpreadable)));
    if !spreadable.is_undefined() {
        return Completion::Normal(to_boolean(&spreadable));
    }
    is_array(agent, value)
}

// §23.1.3.2 Array.prototype.concat
fn concat(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let o = q!(to_object(agent, this));
    let a = q!(array_species_create(agent, &o, 0));
    let mut n: u64 = 0;
    let items = std::iter::once(JsValue::Object(o)).chain(args.iter().cloned());
    for e in items {
        if q!(is_concat_spreadable(agent, &e)) {
            let JsValue::Object(e) = &e else {
                unreachable!("spreadable value is an object");
            };
            let len = q!(length_of_array_like(agent, e));
            if n + len > MAX_SAFE_LENGTH {
                return too_long(agent);
            }
            for k in 0..len {
                let p = key(k);
                if q!(has_property(agent, e, &p)) {
                    let sub = q!(get(agent, e, &p));
                    q!(create_data_property_or_throw(agent, &a, key(n), sub));
                }
                n += 1;
            }
        } else {
            if n >= MAX_SAFE_LENGTH {
                return too_long(agent);
            }
            q!(create_data_property_or_throw(agent, &a, key(n), e));
            n += 1;
        }
    }
    q!(set_length(agent, &a, n));
    Completion::Normal(JsValue::Object(a))
}

// §23.1.3.6 Array.prototype.every
fn every(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let (o, len) = q!(this_array_like(agent, this));
    let callback = q!(callable_arg(agent, args, 0));
    let this_arg = arg(args, 1);
    for k in 0..len {
        let p = key(k);
        if q!(has_property(agent, &o, &p)) {
            let value = q!(get(agent, &o, &p));
            let result = q!(call(agent, &callback, &this_arg, &[value, JsValue::Number(k as f64), JsValue::Object(o.clone())]));
            if !to_boolean(&result) {
                return Completion::Normal(JsValue::Boolean(false));
            }
        }
    }
    Completion::Normal(JsValue::Boolean(true))
}

// §23.1.3.26 Array.prototype.some
fn some(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let (o, len) = q!(this_array_like(agent, this));
    let callback = q!(callable_arg(agent, args, 0));
    let this_arg = arg(args, 1);
    for k in 0..len {
        let p = key(k);
        if q!(has_property(agent, &o, &p)) {
            let value = q!(get(agent, &o, &p));
            let result = q!(call(agent, &callback, &this_arg, &[value, JsValue::Number(k as f64), JsValue::Object(o.clone())]));
            if to_boolean(&result) {
                return Completion::Normal(JsValue::Boolean(true));
            }
        }
    }
    Completion::Normal(JsValue::Boolean(false))
}

// §23.1.3.7 Array.prototype.fill
fn fill(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let (o, len) = q!(this_array_like(agent, this));
    let value = arg(args, 0);
    let start = q!(relative_arg(agent, &arg(args, 1), len, 0));
    let end = q!(relative_arg(agent, &arg(args, 2), len, len));
    for k in start..end {
        q!(set(agent, &o, key(k), value.clone(), true));
    }
    Completion::Normal(JsValue::Object(o))
}

// §23.1.3.8 Array.prototype.filter
fn filter(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let (o, len) = q!(this_array_like(agent, this));
    let callback = q!(callable_arg(agent, args, 0));
    let this_arg = arg(args, 1);
    let a = q!(array_species_create(agent, &o, 0));
    let mut to: u64 = 0;
    for k in 0..len {
        let p = key(k);
        if q!(has_property(agent, &o, &p)) {
            let value = q!(get(agent, &o, &p));
            let selected = q!(call(
                agent,
                &callback,
                &this_arg,
                &[value.clone(), JsValue::Number(k as f64), JsValue::Object(o.clone())]
            ));
            if to_boolean(&selected) {
                q!(create_data_property_or_throw(agent, &a, key(to), value));
                to += 1;
            }
        }
    }
    Completion::Normal(JsValue::Object(a))
}

// §23.1.3.9 Array.prototype.find and §23.1.3.10 findIndex
fn find(agent: &Agent, this: &JsValue, args: &[JsValue], want_index: bool) -> Completion {
    let (o, len) = q!(this_array_like(agent, this));
    let predicate = q!(callable_arg(agent, args, 0));
    let this_arg = arg(args, 1);
    for k in 0..len {
        let value = q!(get(agent, &o, &key(k)));
        let index = JsValue::Number(k as f64);
        let found = q!(call(agent, &predicate, &this_arg, &[value.clone(), index.clone(), JsValue::Object(o.clone())]));
        if to_boolean(&found) {
            return Completion::Normal(if want_index { index } else { value });
        }
    }
    Completion::Normal(if want_index { JsValue::Number(-1.0) } else { JsValue::Undefined })
}

// §23.1.3.15 Array.prototype.forEach
fn for_each(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let (o, len) = q!(this_array_like(agent, this));
    let callback = q!(callable_arg(agent, args, 0));
    let this_arg = arg(args, 1);
    for k in 0..len {
        let p = key(k);
        if q!(has_property(agent, &o, &p)) {
            let value = q!(get(agent, &o, &p));
            q!(call(agent, &callback, &this_arg, &[value, JsValue::Number(k as f64), JsValue::Object(o.clone())]));
        }
    }
    Completion::Normal(JsValue::Undefined)
}

/// Start index for indexOf/includes: `None` when the search cannot match.
fn search_start(agent: &Agent, from: &JsValue, len: u64) -> Completion<Option<u64>> {
    let n = q!(to_integer_or_infinity(agent, from));
    if n == f64::INFINITY {
        return Completion::Normal(None);
    }
    Completion::Normal(Some(relative_index(n, len)))
}

// §23.1.3.16 Array.prototype.includes
fn includes(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let (o, len) = q!(this_array_like(agent, this));
    if len == 0 {
        return Completion::Normal(JsValue::Boolean(false));
    }
    let Some(start) = q!(search_start(agent, &arg(args, 1), len)) else {
        return Completion::Normal(JsValue::Boolean(false));
    };
    let target = arg(args, 0);
    for k in start..len {
        let element = q!(get(agent, &o, &key(k)));
        if same_value_zero(&target, &element) {
            return Completion::Normal(JsValue::Boolean(true));
        }
    }
    Completion::Normal(JsValue::Boolean(false))
}

// §23.1.3.17 Array.prototype.indexOf
fn index_of(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let (o, len) = q!(this_array_like(agent, this));
    if len == 0 {
        return Completion::Normal(JsValue::Number(-1.0));
    }
    let Some(start) = q!(search_start(agent, &arg(args, 1), len)) else {
        return Completion::Normal(JsValue::Number(-1.0));
    };
    let target = arg(args, 0);
    for k in start..len {
        let p = key(k);
        if q!(has_property(agent, &o, &p)) {
            let element = q!(get(agent, &o, &p));
            if is_strictly_equal(&target, &element) {
                return Completion::Normal(JsValue::Number(k as f64));
            }
        }
    }
    Completion::Normal(JsValue::Number(-1.0))
}

// §23.1.3.20 Array.prototype.lastIndexOf
fn last_index_of(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let (o, len) = q!(this_array_like(agent, this));
    if len == 0 {
        return Completion::Normal(JsValue::Number(-1.0));
    }
    let n = if args.len() > 1 {
        q!(to_integer_or_infinity(agent, &args[1]))
    } else {
        len as f64 - 1.0
    };
    if n == f64::NEG_INFINITY {
        return Completion::Normal(JsValue::Number(-1.0));
    }
    let start = if n >= 0.0 { n.min(len as f64 - 1.0) } else { len as f64 + n };
    if start < 0.0 {
        return Completion::Normal(JsValue::Number(-1.0));
    }
    let target = arg(args, 0);
    for k in (0..=start as u64).rev() {
        let p = key(k);
        if q!(has_property(agent, &o, &p)) {
            let element = q!(get(agent, &o, &p));
            if is_strictly_equal(&target, &element) {
                return Completion::Normal(JsValue::Number(k as f64));
            }
        }
    }
    Completion::Normal(JsValue::Number(-1.0))
}

// §23.1.3.18 Array.prototype.join
fn join(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let (o, len) = q!(this_array_like(agent, this));
    let separator = match arg(args, 0) {
        JsValue::Undefined => JsString::from_str(","),
        other => q!(to_string(agent, &other)),
    };
    let mut units: Vec<u16> = Vec::new();
    for k in 0..len {
        if k > 0 {
            units.extend_from_slice(separator.units());
        }
        let element = q!(get(agent, &o, &key(k)));
        if !element.is_nullish() {
            let s = q!(to_string(agent, &element));
            units.extend_from_slice(s.units());
        }
    }
    Completion::Normal(JsValue::String(JsString::from_units(units)))
}

// §23.1.3.21 Array.prototype.map
fn map(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let (o, len) = q!(this_array_like(agent, this));
    let callback = q!(callable_arg(agent, args, 0));
    let this_arg = arg(args, 1);
    let a = q!(array_species_create(agent, &o, len));
    for k in 0..len {
        let p = key(k);
        if q!(has_property(agent, &o, &p)) {
            let value = q!(get(agent, &o, &p));
            let mapped = q!(call(agent, &callback, &this_arg, &[value, JsValue::Number(k as f64), JsValue::Object(o.clone())]));
            q!(create_data_property_or_throw(agent, &a, p, mapped));
        }
    }
    Completion::Normal(JsValue::Object(a))
}

// §23.1.3.22 Array.prototype.pop
fn pop(agent: &Agent, this: &JsValue, _args: &[JsValue]) -> Completion {
    let (o, len) = q!(this_array_like(agent, this));
    if len == 0 {
        q!(set_length(agent, &o, 0));
        return Completion::Normal(JsValue::Undefined);
    }
    let index = key(len - 1);
    let element = q!(get(agent, &o, &index));
    q!(delete_property_or_throw(agent, &o, &index));
    q!(set_length(agent, &o, len - 1));
    Completion::Normal(element)
}

// §23.1.3.23 Array.prototype.push
fn push(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let (o, len) = q!(this_array_like(agent, this));
    let new_len = len + args.len() as u64;
    if new_len > MAX_SAFE_LENGTH {
        return too_long(agent);
    }
    for (i, item) in args.iter().enumerate() {
        q!(set(agent, &o, key(len + i as u64), item.clone(), true));
    }
    q!(set_length(agent, &o, new_len));
    Completion::Normal(JsValue::Number(new_len as f64))
}

// §23.1.3.24 Array.prototype.reduce and §23.1.3.25 reduceRight
fn reduce(agent: &Agent, this: &JsValue, args: &[JsValue], from_right: bool) -> Completion {
    let (o, len) = q!(this_array_like(agent, this));
    let callback = q!(callable_arg(agent, args, 0));
    let mut indices: Box<dyn Iterator<Item = u64>> = if from_right {
        Box::new((0..len).rev())
    } else {
        Box::new(0..len)
    };
    let mut accumulator = match args.get(1) {
        Some(initial) => initial.clone(),
        None => loop {
            let Some(k) = indices.next() else {
                return agent.throw(ErrorKind::Type, Message::ReduceEmpty);
            };
            let p = key(k);
            if q!(has_property(agent, &o, &p)) {
                break q!(get(agent, &o, &p));
            }
        },
    };
    for k in indices.by_ref() {
        let p = key(k);
        if q!(has_property(agent, &o, &p)) {
            let value = q!(get(agent, &o, &p));
            accumulator = q!(call(
                agent,
                &callback,
                &JsValue::Undefined,
                &[accumulator, value, JsValue::Number(k as f64), JsValue::Object(o.clone())]
            ));
        }
    }
    Completion::Normal(accumulator)
}

/// Moves element `from` to `to`, deleting `to` when `from` is a hole.
fn move_element(agent: &Agent, o: &JsObject, from: u64, to: u64) -> Completion<()> {
    let from = key(from);
    let to = key(to);
    if q!(has_property(agent, o, &from)) {
        let value = q!(get(agent, o, &from));
        q!(set(agent, o, to, value, true));
    } else {
        q!(delete_property_or_throw(agent, o, &to));
    }
    Completion::Normal(())
}

// §23.1.3.26 Array.prototype.reverse
fn reverse(agent: &Agent, this: &JsValue, _args: &[JsValue]) -> Completion {
    let (o, len) = q!(this_array_like(agent, this));
    let middle = len / 2;
    let mut lower = 0;
    while lower != middle {
        let upper = len - lower - 1;
        let (lower_p, upper_p) = (key(lower), key(upper));
        let lower_exists = q!(has_property(agent, &o, &lower_p));
        let lower_value = if lower_exists { q!(get(agent, &o, &lower_p)) } else { JsValue::Undefined };
        let upper_exists = q!(has_property(agent, &o, &upper_p));
        let upper_value = if upper_exists { q!(get(agent, &o, &upper_p)) } else { JsValue::Undefined };
        match (lower_exists, upper_exists) {
            (true, true) => {
                q!(set(agent, &o, lower_p, upper_value, true));
                q!(set(agent, &o, upper_p, lower_value, true));
            }
            (false, true) => {
                q!(set(agent, &o, lower_p, upper_value, true));
                q!(delete_property_or_throw(agent, &o, &upper_p));
            }
            (true, false) => {
                q!(delete_property_or_throw(agent, &o, &lower_p));
                q!(set(agent, &o, upper_p, lower_value, true));
            }
            (false, false) => {}
        }
        lower += 1;
    }
    Completion::Normal(JsValue::Object(o))
}

// §23.1.3.27 Array.prototype.shift
fn shift(agent: &Agent, this: &JsValue, _args: &[JsValue]) -> Completion {
    let (o, len) = q!(this_array_like(agent, this));
    if len == 0 {
        q!(set_length(agent, &o, 0));
        return Completion::Normal(JsValue::Undefined);
    }
    let first = q!(get(agent, &o, &key(0)));
    for k in 1..len {
        q!(move_element(agent, &o, k, k - 1));
    }
    q!(delete_property_or_throw(agent, &o, &key(len - 1)));
    q!(set_length(agent, &o, len - 1));
    Completion::Normal(first)
}

// §23.1.3.28 Array.prototype.slice
fn slice(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let (o, len) = q!(this_array_like(agent, this));
    let start = q!(relative_arg(agent, &arg(args, 0), len, 0));
    let end = q!(relative_arg(agent, &arg(args, 1), len, len));
    let count = end.saturating_sub(start);
    let a = q!(array_species_create(agent, &o, count));
    let mut n: u64 = 0;
    for k in start..end {
        let p = key(k);
        if q!(has_property(agent, &o, &p)) {
            let value = q!(get(agent, &o, &p));
            q!(create_data_property_or_throw(agent, &a, key(n), value));
        }
        n += 1;
    }
    q!(set_length(agent, &a, n));
    Completion::Normal(JsValue::Object(a))
}

// §23.1.3.30.2 CompareArrayElements
fn compare_array_elements(agent: &Agent, x: &JsValue, y: &JsValue, comparefn: &JsValue) -> Completion<f64> {
    match (x, y) {
        (JsValue::Undefined, JsValue::Undefined) => return Completion::Normal(0.0),
        (JsValue::Undefined, _) => return Completion::Normal(1.0),
        (_, JsValue::Undefined) => return Completion::Normal(-1.0),
        _ => {}
    }
    if !comparefn.is_undefined() {
        let v = q!(call(agent, comparefn, &JsValue::Undefined, &[x.clone(), y.clone()]));
        let v = q!(to_number(agent, &v));
        return Completion::Normal(if v.is_nan() { 0.0 } else { v });
    }
    let xs = q!(to_string(agent, x));
    let ys = q!(to_string(agent, y));
    Completion::Normal(match xs.cmp(&ys) {
        std::cmp::Ordering::Less => -1.0,
        std::cmp::Ordering::Equal => 0.0,
        std::cmp::Ordering::Greater => 1.0,
    })
}

/// Stable merge sort over a fallible comparator. The first abrupt comparison
/// ends the sort; no further comparisons are made.
fn merge_sort(
    items: Vec<JsValue>,
    compare: &mut dyn FnMut(&JsValue, &JsValue) -> Completion<f64>,
) -> Completion<Vec<JsValue>> {
    if items.len() <= 1 {
        return Completion::Normal(items);
    }
    let mut left = items;
    let right = left.split_off(left.len() / 2);
    let left = q!(merge_sort(left, compare));
    let right = q!(merge_sort(right, compare));
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(l), Some(r)) = (left.peek(), right.peek()) {
        if q!(compare(r, l)) < 0.0 {
            merged.extend(right.next());
        } else {
            merged.extend(left.next());
        }
    }
    merged.extend(left);
    merged.extend(right);
    Completion::Normal(merged)
}

// §23.1.3.30 Array.prototype.sort
fn sort(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let comparefn = arg(args, 0);
    if !comparefn.is_undefined() && !comparefn.is_callable() {
        return agent.throw(ErrorKind::Type, Message::NotAFunction(agent.inspect(&comparefn)));
    }
    let (o, len) = q!(this_array_like(agent, this));
    // SortIndexedProperties with holes skipped
    let mut items = Vec::new();
    for k in 0..len {
        let p = key(k);
        if q!(has_property(agent, &o, &p)) {
            items.push(q!(get(agent, &o, &p)));
        }
    }
    let sorted = q!(merge_sort(items, &mut |x, y| compare_array_elements(agent, x, y, &comparefn)));
    let count = sorted.len() as u64;
    for (j, value) in sorted.into_iter().enumerate() {
        q!(set(agent, &o, key(j as u64), value, true));
    }
    for j in count..len {
        q!(delete_property_or_throw(agent, &o, &key(j)));
    }
    Completion::Normal(JsValue::Object(o))
}

// §23.1.3.31 Array.prototype.splice
fn splice(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let (o, len) = q!(this_array_like(agent, this));
    let start = q!(relative_arg(agent, &arg(args, 0), len, 0));
    let items = args.get(2..).unwrap_or_default();
    let item_count = items.len() as u64;
    let delete_count = match args.len() {
        0 => 0,
        1 => len - start,
        _ => {
            let dc = q!(to_integer_or_infinity(agent, &args[1]));
            dc.clamp(0.0, (len - start) as f64) as u64
        }
    };
    if len + item_count - delete_count > MAX_SAFE_LENGTH {
        return too_long(agent);
    }
    let a = q!(array_species_create(agent, &o, delete_count));
    for k in 0..delete_count {
        let from = key(start + k);
        if q!(has_property(agent, &o, &from)) {
            let value = q!(get(agent, &o, &from));
            q!(create_data_property_or_throw(agent, &a, key(k), value));
        }
    }
    q!(set_length(agent, &a, delete_count));

    if item_count < delete_count {
        for k in start..len - delete_count {
            q!(move_element(agent, &o, k + delete_count, k + item_count));
        }
        for k in (len - delete_count + item_count..len).rev() {
            q!(delete_property_or_throw(agent, &o, &key(k)));
        }
    } else if item_count > delete_count {
        for k in (start..len - delete_count).rev() {
            q!(move_element(agent, &o, k + delete_count, k + item_count));
        }
    }
    for (i, item) in items.iter().enumerate() {
        q!(set(agent, &o, key(start + i as u64), item.clone(), true));
    }
    q!(set_length(agent, &o, len - delete_count + item_count));
    Completion::Normal(JsValue::Object(a))
}

// §23.1.3.36 Array.prototype.toString
fn array_to_string(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let array = q!(to_object(agent, this));
    let func = q!(get(agent, &array, &PropertyKey::from("join")));
    if func.is_callable() {
        return call(agent, &func, &JsValue::Object(array), &[]);
    }
    object_to_string(agent, &JsValue::Object(array), args)
}

// §23.1.3.37 Array.prototype.unshift
fn unshift(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let (o, len) = q!(this_array_like(agent, this));
    let arg_count = args.len() as u64;
    if arg_count > 0 {
        if len + arg_count > MAX_SAFE_LENGTH {
            return too_long(agent);
        }
        for k in (0..len).rev() {
            q!(move_element(agent, &o, k, k + arg_count));
        }
        for (j, item) in args.iter().enumerate() {
            q!(set(agent, &o, key(j as u64), item.clone(), true));
        }
    }
    q!(set_length(agent, &o, len + arg_count));
    Completion::Normal(JsValue::Number((len + arg_count) as f64))
}

#[cfg(test)]
mod tests {
    use crate::evaluator::test_support::eval_to_string;

    #[test]
    fn constructor_handles_lengths_and_elements() {
        assert_eq!(eval_to_string("new Array(3).length"), "3");
        assert_eq!(eval_to_string("Array(1, 2, 3).join('-')"), "1-2-3");
        assert_eq!(eval_to_string("new Array('3')[0]"), "3");
        assert!(eval_to_string("new Array(1.5)").starts_with("Throw: RangeError"));
        assert_eq!(eval_to_string("Array.isArray([]) && !Array.isArray({ length: 0 })"), "true");
        assert_eq!(eval_to_string("Array.of(7).length + ',' + Array.of(1, 2)[1]"), "1,2");
    }

    #[test]
    fn from_accepts_iterables_and_array_likes() {
        assert_eq!(eval_to_string("Array.from('abc').join()"), "a,b,c");
        assert_eq!(eval_to_string("Array.from({ length: 2, 0: 'x', 1: 'y' }).join()"), "x,y");
        assert_eq!(eval_to_string("Array.from([1, 2], (v, i) => v * 10 + i).join()"), "10,21");
        assert_eq!(
            eval_to_string(
                "var closed = false;
                 var it = { [Symbol.iterator]() { return { next() { return { value: 1, done: false }; }, return() { closed = true; return {}; } }; } };
                 try { Array.from(it, () => { throw 'stop'; }); } catch (e) {}
                 closed"
            ),
            "true"
        );
    }

    #[test]
    fn stack_and_queue_methods() {
        assert_eq!(eval_to_string("var a = [1]; a.push(2, 3) + ':' + a.join()"), "3:1,2,3");
        assert_eq!(eval_to_string("var a = [1, 2]; a.pop() + ':' + a.length"), "2:1");
        assert_eq!(eval_to_string("var a = [1, 2, 3]; a.shift() + ':' + a.join()"), "1:2,3");
        assert_eq!(eval_to_string("var a = [3]; a.unshift(1, 2) + ':' + a.join()"), "3:1,2,3");
        assert_eq!(eval_to_string("[].pop()"), "undefined");
    }

    #[test]
    fn slice_splice_and_concat() {
        assert_eq!(eval_to_string("[1, 2, 3, 4].slice(1, -1).join()"), "2,3");
        assert_eq!(eval_to_string("var a = [1, 2, 3, 4]; var d = a.splice(1, 2, 'x'); d.join() + '|' + a.join()"), "2,3|1,x,4");
        assert_eq!(eval_to_string("var a = [1, 2]; a.splice(1, 0, 'a', 'b'); a.join()"), "1,a,b,2");
        assert_eq!(eval_to_string("var a = [1, 2, 3]; a.splice(1); a.join()"), "1");
        assert_eq!(eval_to_string("[1].concat([2, [3]], 4).length"), "4");
        assert_eq!(
            eval_to_string("var o = { length: 1, 0: 'z', [Symbol.isConcatSpreadable]: true }; [].concat(o).join()"),
            "z"
        );
    }

    #[test]
    fn searching() {
        assert_eq!(eval_to_string("[1, 2, 1].indexOf(1, 1)"), "2");
        assert_eq!(eval_to_string("[1, 2, 1].lastIndexOf(1)"), "2");
        assert_eq!(eval_to_string("[1, 2, 1].lastIndexOf(1, -2)"), "0");
        assert_eq!(eval_to_string("[NaN].indexOf(NaN) + ',' + [NaN].includes(NaN)"), "-1,true");
        assert_eq!(eval_to_string("[5, 12, 8].find(x => x > 6) + ',' + [5, 12].findIndex(x => x > 20)"), "12,-1");
    }

    #[test]
    fn callbacks_skip_holes() {
        assert_eq!(eval_to_string("var n = 0; [1, , 3].forEach(() => n++); n"), "2");
        assert_eq!(eval_to_string("[1, 2, 3, 4].filter(x => x % 2).join()"), "1,3");
        assert_eq!(eval_to_string("var m = [1, , 3].map(x => x * 2); m.length + ':' + (1 in m)"), "3:false");
        assert_eq!(eval_to_string("[1, 2, 3].every(x => x > 0) + ',' + [1, 2].some(x => x > 1)"), "true,true");
    }

    #[test]
    fn reduce_both_directions() {
        assert_eq!(eval_to_string("[1, 2, 3].reduce((a, b) => a + b)"), "6");
        assert_eq!(eval_to_string("['a', 'b', 'c'].reduceRight((a, b) => a + b, '>')"), ">cba");
        assert_eq!(eval_to_string("try { [].reduce((a, b) => a); } catch (e) { e.message }"), "Reduce of empty array with no initial value");
    }

    #[test]
    fn sort_is_stable_and_orders_undefined_last() {
        assert_eq!(eval_to_string("[3, 1, undefined, 10, 2].sort().join()"), "1,10,2,3,");
        assert_eq!(eval_to_string("[3, 1, 10, 2].sort((a, b) => a - b).join()"), "1,2,3,10");
        assert_eq!(
            eval_to_string("[{k: 1, v: 'a'}, {k: 0, v: 'b'}, {k: 1, v: 'c'}, {k: 0, v: 'd'}].sort((x, y) => x.k - y.k).map(x => x.v).join('')"),
            "bdac"
        );
        assert_eq!(eval_to_string("var a = [2, , 1]; a.sort(); a.length + ':' + (2 in a) + ':' + a[0]"), "3:false:1");
    }

    #[test]
    fn sort_stops_at_the_first_throwing_comparison() {
        assert_eq!(
            eval_to_string(
                "var calls = 0;
                 try { [5, 4, 3, 2, 1].sort(() => { if (++calls === 3) throw 'x'; return 1; }); } catch (e) {}
                 calls"
            ),
            "3"
        );
    }

    #[test]
    fn reverse_fill_and_join() {
        assert_eq!(eval_to_string("[1, 2, 3].reverse().join()"), "3,2,1");
        assert_eq!(eval_to_string("var a = [1, , 3]; a.reverse(); (1 in a) + ':' + a[0]"), "false:3");
        assert_eq!(eval_to_string("new Array(3).fill(0, 1).join()"), ",0,0");
        assert_eq!(eval_to_string("[null, undefined, 1].join('-')"), "--1");
        assert_eq!(eval_to_string("String([1, [2, 3]])"), "1,2,3");
        assert_eq!(eval_to_string("Array.prototype.toString.call({})"), "[object Object]");
    }

    #[test]
    fn species_controls_derived_results() {
        assert_eq!(
            eval_to_string("class MyArray extends Array {} var m = new MyArray(1, 2, 3).map(x => x); m instanceof MyArray"),
            "true"
        );
        assert_eq!(eval_to_string("Array[Symbol.species] === Array"), "true");
    }

    #[test]
    fn array_iterator_is_the_values_function() {
        assert_eq!(eval_to_string("Array.prototype[Symbol.iterator] === Array.prototype.values"), "true");
        assert_eq!(eval_to_string("(function () { return [...arguments].join(); })(1, 2)"), "1,2");
    }

    #[test]
    fn push_on_array_likes_updates_length() {
        assert_eq!(eval_to_string("var o = { length: 1 }; Array.prototype.push.call(o, 'x'); o.length + o[1]"), "2x");
    }
}
