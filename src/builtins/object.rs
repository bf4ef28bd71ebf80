//! §20.1 Object objects.

use crate::abstract_ops::comparison::same_value;
use crate::abstract_ops::conversion::{to_object, to_property_key};
use crate::abstract_ops::iterator::{IteratorHint, get_iterator, iterator_close, iterator_step_value};
use crate::abstract_ops::{
    EnumerableKind, IntegrityLevel, create_array_from_list, create_data_property_or_throw, define_property_or_throw,
    enumerable_own_properties, from_property_descriptor, get, get_v, is_array, make_basic_object,
    ordinary_create_from_constructor, set, set_integrity_level, test_integrity_level, to_property_descriptor,
};
use crate::builtins::{arg, define_constructor, define_method};
use crate::completion::Completion;
use crate::engine::{Agent, ErrorKind, IntrinsicId, Message, Realm};
use crate::object::{JsObject, ObjectKind, PropertyDescriptor, PropertyKey};
use crate::types::{JsValue, WellKnownSymbol};

pub(super) fn init(realm: &Realm) {
    let proto = realm.intrinsic(IntrinsicId::ObjectPrototype);
    define_method(realm, &proto, "hasOwnProperty", 1, has_own_property);
    define_method(realm, &proto, "isPrototypeOf", 1, is_prototype_of);
    define_method(realm, &proto, "propertyIsEnumerable", 1, property_is_enumerable);
    define_method(realm, &proto, "toLocaleString", 0, to_locale_string);
    define_method(realm, &proto, "toString", 0, object_to_string);
    define_method(realm, &proto, "valueOf", 0, value_of);

    let ctor = define_constructor(realm, "Object", 1, object_constructor, &proto);
    define_method(realm, &ctor, "assign", 2, assign);
    define_method(realm, &ctor, "create", 2, create);
    define_method(realm, &ctor, "defineProperties", 2, define_properties);
    define_method(realm, &ctor, "defineProperty", 3, define_property);
    define_method(realm, &ctor, "entries", 1, |agent, _, args| {
        own_properties(agent, &arg(args, 0), EnumerableKind::KeyValue)
    });
    define_method(realm, &ctor, "freeze", 1, |agent, _, args| {
        integrity(agent, &arg(args, 0), IntegrityLevel::Frozen)
    });
    define_method(realm, &ctor, "fromEntries", 1, from_entries);
    define_method(realm, &ctor, "getOwnPropertyDescriptor", 2, get_own_property_descriptor);
    define_method(realm, &ctor, "getOwnPropertyDescriptors", 1, get_own_property_descriptors);
    define_method(realm, &ctor, "getOwnPropertyNames", 1, |agent, _, args| {
        own_keys(agent, &arg(args, 0), false)
    });
    define_method(realm, &ctor, "getOwnPropertySymbols", 1, |agent, _, args| {
        own_keys(agent, &arg(args, 0), true)
    });
    define_method(realm, &ctor, "getPrototypeOf", 1, get_prototype_of);
    define_method(realm, &ctor, "is", 2, |_, _, args| {
        Completion::Normal(JsValue::Boolean(same_value(&arg(args, 0), &arg(args, 1))))
    });
    define_method(realm, &ctor, "isExtensible", 1, |agent, _, args| match arg(args, 0) {
        JsValue::Object(o) => o.is_extensible(agent).map(JsValue::Boolean),
        _ => Completion::Normal(JsValue::Boolean(false)),
    });
    define_method(realm, &ctor, "isFrozen", 1, |agent, _, args| {
        test_integrity(agent, &arg(args, 0), IntegrityLevel::Frozen)
    });
    define_method(realm, &ctor, "isSealed", 1, |agent, _, args| {
        test_integrity(agent, &arg(args, 0), IntegrityLevel::Sealed)
    });
    define_method(realm, &ctor, "keys", 1, |agent, _, args| {
        own_properties(agent, &arg(args, 0), EnumerableKind::Key)
    });
    define_method(realm, &ctor, "preventExtensions", 1, prevent_extensions);
    define_method(realm, &ctor, "seal", 1, |agent, _, args| {
        integrity(agent, &arg(args, 0), IntegrityLevel::Sealed)
    });
    define_method(realm, &ctor, "setPrototypeOf", 2, set_prototype_of);
    define_method(realm, &ctor, "values", 1, |agent, _, args| {
        own_properties(agent, &arg(args, 0), EnumerableKind::Value)
    });
    realm.set_intrinsic(IntrinsicId::Object, ctor);
}

// §20.1.1.1 Object ( [ value ] )
fn object_constructor(agent: &Agent, _this: &JsValue, args: &[JsValue], new_target: Option<&JsObject>) -> Completion {
    if let Some(nt) = new_target {
        let active = agent.active_function_object();
        if !active.is_some_and(|f| f.ptr_eq(nt)) {
            return ordinary_create_from_constructor(agent, nt, IntrinsicId::ObjectPrototype, ObjectKind::Ordinary)
                .map(JsValue::Object);
        }
    }
    let value = arg(args, 0);
    if value.is_nullish() {
        return Completion::Normal(JsValue::Object(make_basic_object(agent)));
    }
    to_object(agent, &value).map(JsValue::Object)
}

fn require_object<'v>(agent: &Agent, value: &'v JsValue) -> Completion<&'v JsObject> {
    match value {
        JsValue::Object(o) => Completion::Normal(o),
        other => agent.throw(ErrorKind::Type, Message::NotAnObject(agent.inspect(other))),
    }
}

// §20.1.2.1 Object.assign
fn assign(agent: &Agent, _this: &JsValue, args: &[JsValue]) -> Completion {
    let to = q!(to_object(agent, &arg(args, 0)));
    for source in args.iter().skip(1) {
        if source.is_nullish() {
            continue;
        }
        let from = x!(to_object(agent, source));
        for key in q!(from.own_property_keys(agent)) {
            let Some(desc) = q!(from.get_own_property(agent, &key)) else {
                continue;
            };
            if desc.enumerable() {
                let value = q!(get(agent, &from, &key));
                q!(set(agent, &to, key, value, true));
            }
        }
    }
    Completion::Normal(JsValue::Object(to))
}

// §20.1.2.2 Object.create
fn create(agent: &Agent, _this: &JsValue, args: &[JsValue]) -> Completion {
    let proto = match arg(args, 0) {
        JsValue::Object(o) => Some(o),
        JsValue::Null => None,
        other => return agent.throw(ErrorKind::Type, Message::PrototypeNotObject(agent.inspect(&other))),
    };
    let obj = JsObject::ordinary(proto);
    let properties = arg(args, 1);
    if !properties.is_undefined() {
        q!(object_define_properties(agent, &obj, &properties));
    }
    Completion::Normal(JsValue::Object(obj))
}

// §20.1.2.3.1 ObjectDefineProperties
fn object_define_properties(agent: &Agent, o: &JsObject, properties: &JsValue) -> Completion<()> {
    let props = q!(to_object(agent, properties));
    let mut descriptors = Vec::new();
    for key in q!(props.own_property_keys(agent)) {
        let Some(prop_desc) = q!(props.get_own_property(agent, &key)) else {
            continue;
        };
        if prop_desc.enumerable() {
            let desc_obj = q!(get(agent, &props, &key));
            descriptors.push((key, q!(to_property_descriptor(agent, &desc_obj))));
        }
    }
    for (key, desc) in descriptors {
        q!(define_property_or_throw(agent, o, key, desc));
    }
    Completion::Normal(())
}

// §20.1.2.3 Object.defineProperties
fn define_properties(agent: &Agent, _this: &JsValue, args: &[JsValue]) -> Completion {
    let target = arg(args, 0);
    let o = q!(require_object(agent, &target));
    q!(object_define_properties(agent, o, &arg(args, 1)));
    Completion::Normal(target.clone())
}

// §20.1.2.4 Object.defineProperty
fn define_property(agent: &Agent, _this: &JsValue, args: &[JsValue]) -> Completion {
    let target = arg(args, 0);
    let o = q!(require_object(agent, &target));
    let key = q!(to_property_key(agent, &arg(args, 1)));
    let desc = q!(to_property_descriptor(agent, &arg(args, 2)));
    q!(define_property_or_throw(agent, o, key, desc));
    Completion::Normal(target.clone())
}

fn own_properties(agent: &Agent, value: &JsValue, kind: EnumerableKind) -> Completion {
    let o = q!(to_object(agent, value));
    let list = q!(enumerable_own_properties(agent, &o, kind));
    Completion::Normal(JsValue::Object(create_array_from_list(agent, &list)))
}

fn integrity(agent: &Agent, value: &JsValue, level: IntegrityLevel) -> Completion {
    let JsValue::Object(o) = value else {
        return Completion::Normal(value.clone());
    };
    if !q!(set_integrity_level(agent, o, level)) {
        return agent.throw(ErrorKind::Type, Message::CannotPreventExtensions(agent.inspect(value)));
    }
    Completion::Normal(value.clone())
}

fn test_integrity(agent: &Agent, value: &JsValue, level: IntegrityLevel) -> Completion {
    match value {
        JsValue::Object(o) => test_integrity_level(agent, o, level).map(JsValue::Boolean),
        _ => Completion::Normal(JsValue::Boolean(true)),
    }
}

// §20.1.2.7 Object.fromEntries
fn from_entries(agent: &Agent, _this: &JsValue, args: &[JsValue]) -> Completion {
    let iterable = arg(args, 0);
    if iterable.is_nullish() {
        return agent.throw(ErrorKind::Type, Message::NotIterable(agent.inspect(&iterable)));
    }
    let obj = make_basic_object(agent);
    let record = q!(get_iterator(agent, &iterable, IteratorHint::Sync));
    while let Some(entry) = q!(iterator_step_value(agent, &record)) {
        let step = (|| -> Completion<()> {
            if !entry.is_object() {
                return agent.throw(ErrorKind::Type, Message::NotAnObject(agent.inspect(&entry)));
            }
            let k = q!(get_v(agent, &entry, &PropertyKey::from_index(0)));
            let v = q!(get_v(agent, &entry, &PropertyKey::from_index(1)));
            let key = q!(to_property_key(agent, &k));
            q!(create_data_property_or_throw(agent, &obj, key, v));
            Completion::Normal(())
        })();
        if step.is_abrupt() {
            return iterator_close(agent, &record, step).map(|_| JsValue::Undefined);
        }
    }
    Completion::Normal(JsValue::Object(obj))
}

// §20.1.2.8 Object.getOwnPropertyDescriptor
fn get_own_property_descriptor(agent: &Agent, _this: &JsValue, args: &[JsValue]) -> Completion {
    let o = q!(to_object(agent, &arg(args, 0)));
    let key = q!(to_property_key(agent, &arg(args, 1)));
    let desc = q!(o.get_own_property(agent, &key));
    Completion::Normal(from_property_descriptor(agent, desc.as_ref()))
}

// §20.1.2.9 Object.getOwnPropertyDescriptors
fn get_own_property_descriptors(agent: &Agent, _this: &JsValue, args: &[JsValue]) -> Completion {
    let o = q!(to_object(agent, &arg(args, 0)));
    let descriptors = make_basic_object(agent);
    for key in q!(o.own_property_keys(agent)) {
        let desc = q!(o.get_own_property(agent, &key));
        let desc = from_property_descriptor(agent, desc.as_ref());
        if !desc.is_undefined() {
            x!(create_data_property_or_throw(agent, &descriptors, key, desc));
        }
    }
    Completion::Normal(JsValue::Object(descriptors))
}

// §20.1.2.11.1 GetOwnPropertyKeys
fn own_keys(agent: &Agent, value: &JsValue, symbols: bool) -> Completion {
    let o = q!(to_object(agent, value));
    let keys: Vec<JsValue> = q!(o.own_property_keys(agent))
        .into_iter()
        .filter(|k| k.is_symbol() == symbols)
        .map(|k| k.to_value())
        .collect();
    Completion::Normal(JsValue::Object(create_array_from_list(agent, &keys)))
}

// §20.1.2.12 Object.getPrototypeOf
fn get_prototype_of(agent: &Agent, _this: &JsValue, args: &[JsValue]) -> Completion {
    let o = q!(to_object(agent, &arg(args, 0)));
    o.get_prototype_of(agent).map(JsValue::from)
}

// §20.1.2.19 Object.preventExtensions
fn prevent_extensions(agent: &Agent, _this: &JsValue, args: &[JsValue]) -> Completion {
    let value = arg(args, 0);
    if let JsValue::Object(o) = &value {
        if !q!(o.prevent_extensions(agent)) {
            return agent.throw(ErrorKind::Type, Message::CannotPreventExtensions(agent.inspect(&value)));
        }
    }
    Completion::Normal(value)
}

// §20.1.2.22 Object.setPrototypeOf
fn set_prototype_of(agent: &Agent, _this: &JsValue, args: &[JsValue]) -> Completion {
    let value = arg(args, 0);
    if value.is_nullish() {
        return agent.throw(ErrorKind::Type, Message::CannotConvertToObject(agent.inspect(&value)));
    }
    let proto = match arg(args, 1) {
        JsValue::Object(p) => Some(p),
        JsValue::Null => None,
        other => return agent.throw(ErrorKind::Type, Message::PrototypeNotObject(agent.inspect(&other))),
    };
    let JsValue::Object(o) = &value else {
        return Completion::Normal(value);
    };
    if !q!(o.set_prototype_of(agent, proto)) {
        return agent.throw(ErrorKind::Type, Message::CannotSetPrototype(agent.inspect(&value)));
    }
    Completion::Normal(value)
}

// §20.1.3.2 Object.prototype.hasOwnProperty
fn has_own_property(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let key = q!(to_property_key(agent, &arg(args, 0)));
    let o = q!(to_object(agent, this));
    crate::abstract_ops::has_own_property(agent, &o, &key).map(JsValue::Boolean)
}

// §20.1.3.3 Object.prototype.isPrototypeOf
fn is_prototype_of(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let JsValue::Object(mut v) = arg(args, 0) else {
        return Completion::Normal(JsValue::Boolean(false));
    };
    let o = q!(to_object(agent, this));
    loop {
        match q!(v.get_prototype_of(agent)) {
            None => return Completion::Normal(JsValue::Boolean(false)),
            Some(p) if p.ptr_eq(&o) => return Completion::Normal(JsValue::Boolean(true)),
            Some(p) => v = p,
        }
    }
}

// §20.1.3.4 Object.prototype.propertyIsEnumerable
fn property_is_enumerable(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let key = q!(to_property_key(agent, &arg(args, 0)));
    let o = q!(to_object(agent, this));
    let desc = q!(o.get_own_property(agent, &key));
    Completion::Normal(JsValue::Boolean(desc.as_ref().is_some_and(PropertyDescriptor::enumerable)))
}

// §20.1.3.5 Object.prototype.toLocaleString
fn to_locale_string(agent: &Agent, this: &JsValue, _args: &[JsValue]) -> Completion {
    crate::abstract_ops::invoke(agent, this, &PropertyKey::from("toString"), &[])
}

// §20.1.3.6 Object.prototype.toString
pub(crate) fn object_to_string(agent: &Agent, this: &JsValue, _args: &[JsValue]) -> Completion {
    match this {
        JsValue::Undefined => return Completion::Normal(JsValue::from_str("[object Undefined]")),
        JsValue::Null => return Completion::Normal(JsValue::from_str("[object Null]")),
        _ => {}
    }
    let o = x!(to_object(agent, this));
    let builtin_tag = if q!(is_array(agent, this)) {
        "Array"
    } else {
        match &o.borrow().kind {
            ObjectKind::Arguments(_) => "Arguments",
            ObjectKind::Function(_) | ObjectKind::Builtin(_) | ObjectKind::BoundFunction(_) => "Function",
            ObjectKind::Proxy(p) if p.callable => "Function",
            ObjectKind::Error => "Error",
            ObjectKind::Boolean(_) => "Boolean",
            ObjectKind::Number(_) => "Number",
            ObjectKind::String(_) => "String",
            ObjectKind::RegExp(_) => "RegExp",
            _ => "Object",
        }
    };
    let tag = q!(get(agent, &o, &PropertyKey::symbol(WellKnownSymbol::ToStringTag)));
    let tag = match tag {
        JsValue::String(s) => s.to_rust_string(),
        _ => builtin_tag.to_owned(),
    };
    Completion::Normal(JsValue::from_str(&format!("[object {tag}]")))
}

// §20.1.3.7 Object.prototype.valueOf
fn value_of(agent: &Agent, this: &JsValue, _args: &[JsValue]) -> Completion {
    to_object(agent, this).map(JsValue::Object)
}

#[cfg(test)]
mod tests {
    use crate::evaluator::test_support::eval_to_string;

    #[test]
    fn keys_follow_integer_then_insertion_order() {
        assert_eq!(eval_to_string("Object.keys({ 2: 0, a: 0, 0: 0, b: 0, 1: 0 }).join()"), "0,1,2,a,b");
        assert_eq!(eval_to_string("JSON.stringify(Object.entries({ x: 1, y: 'z' }))"), "[[\"x\",1],[\"y\",\"z\"]]");
        assert_eq!(eval_to_string("Object.values('ab').join()"), "a,b");
    }

    #[test]
    fn define_property_and_descriptors() {
        assert_eq!(
            eval_to_string(
                "var o = {}; Object.defineProperty(o, 'x', { value: 1 });
                 var d = Object.getOwnPropertyDescriptor(o, 'x');
                 [d.value, d.writable, d.enumerable, d.configurable].join()"
            ),
            "1,false,false,false"
        );
        assert!(
            eval_to_string("var o = Object.freeze({}); Object.defineProperty(o, 'x', { value: 1 })")
                .starts_with("Throw: TypeError")
        );
        assert_eq!(
            eval_to_string("Object.keys(Object.getOwnPropertyDescriptors({ a: 1, get b() { return 2; } })).join()"),
            "a,b"
        );
    }

    #[test]
    fn create_and_prototype_links() {
        assert_eq!(eval_to_string("var p = { x: 1 }; var o = Object.create(p, { y: { value: 2, enumerable: true } }); o.x + o.y"), "3");
        assert_eq!(eval_to_string("Object.getPrototypeOf(Object.create(null))"), "null");
        assert_eq!(eval_to_string("var o = {}; Object.setPrototypeOf(o, Array.prototype); o instanceof Array"), "true");
        assert!(eval_to_string("var a = {}; var b = Object.create(a); Object.setPrototypeOf(a, b)").starts_with("Throw: TypeError"));
        assert_eq!(eval_to_string("Object.prototype.isPrototypeOf.call(Array.prototype, [])"), "true");
    }

    #[test]
    fn integrity_levels() {
        assert_eq!(eval_to_string("var o = Object.seal({ a: 1 }); o.a = 2; delete o.a; [o.a, Object.isSealed(o), Object.isFrozen(o)].join()"), "2,true,false");
        assert_eq!(eval_to_string("Object.isFrozen(Object.freeze({ a: 1 }))"), "true");
        assert_eq!(eval_to_string("Object.isFrozen(1)"), "true");
        assert_eq!(eval_to_string("var o = Object.preventExtensions({}); o.x = 1; [Object.isExtensible(o), o.x].join()"), "false,");
    }

    #[test]
    fn assign_and_from_entries() {
        assert_eq!(eval_to_string("var t = Object.assign({ a: 1 }, null, { b: 2 }, 'c'); [t.a, t.b, t[0]].join()"), "1,2,c");
        assert_eq!(eval_to_string("var o = Object.fromEntries([['a', 1], ['b', 2]]); o.a + o.b"), "3");
        assert_eq!(eval_to_string("Object.fromEntries(new Map([['k', 'v']])).k"), "v");
    }

    #[test]
    fn to_string_uses_builtin_tags_and_to_string_tag() {
        assert_eq!(eval_to_string("Object.prototype.toString.call([])"), "[object Array]");
        assert_eq!(eval_to_string("Object.prototype.toString.call(null)"), "[object Null]");
        assert_eq!(eval_to_string("Object.prototype.toString.call(function () {})"), "[object Function]");
        assert_eq!(eval_to_string("Object.prototype.toString.call(new Map())"), "[object Map]");
        assert_eq!(eval_to_string("String({ [Symbol.toStringTag]: 'Custom' })"), "[object Custom]");
        assert_eq!(eval_to_string("(function () { return Object.prototype.toString.call(arguments); })()"), "[object Arguments]");
    }

    #[test]
    fn own_property_predicates() {
        assert_eq!(eval_to_string("({ a: 1 }).hasOwnProperty('a') + ',' + ({}).hasOwnProperty('toString')"), "true,false");
        assert_eq!(eval_to_string("[1].propertyIsEnumerable(0) + ',' + [1].propertyIsEnumerable('length')"), "true,false");
        assert_eq!(eval_to_string("Object.is(NaN, NaN) + ',' + Object.is(0, -0)"), "true,false");
        assert_eq!(eval_to_string("Object.getOwnPropertySymbols({ [Symbol.iterator]: 1, a: 2 }).length"), "1");
    }
}
