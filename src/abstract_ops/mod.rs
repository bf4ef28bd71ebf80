//! §7.2 – §7.3 testing and object operations shared by the evaluator and the
//! built-ins.

pub mod comparison;
pub mod conversion;
pub mod iterator;

use crate::completion::Completion;
use crate::engine::{Agent, ErrorKind, IntrinsicId, Message, Realm};
use crate::object::array::array_create;
use crate::object::function::{call_object, construct_object};
use crate::object::{JsObject, ObjectKind, PropertyDescriptor, PropertyKey};
use crate::types::{JsValue, WellKnownSymbol};

use conversion::{to_boolean, to_length, to_object, to_property_key};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum IntegrityLevel {
    Sealed,
    Frozen,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EnumerableKind {
    Key,
    Value,
    KeyValue,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ListElementTypes {
    All,
    PropertyKeys,
}

// §7.2.1 RequireObjectCoercible
pub fn require_object_coercible(agent: &Agent, value: &JsValue) -> Completion<()> {
    if value.is_nullish() {
        return agent.throw(
            ErrorKind::Type,
            Message::CannotConvertToObject(agent.inspect(value)),
        );
    }
    Completion::Normal(())
}

// §7.2.2 IsArray
pub fn is_array(agent: &Agent, value: &JsValue) -> Completion<bool> {
    let JsValue::Object(o) = value else {
        return Completion::Normal(false);
    };
    let target = match &o.borrow().kind {
        ObjectKind::Array => return Completion::Normal(true),
        ObjectKind::Proxy(p) => match &p.handler {
            Some(_) => p.target.clone(),
            None => return agent.throw(ErrorKind::Type, Message::ProxyRevoked("IsArray")),
        },
        _ => return Completion::Normal(false),
    };
    is_array(agent, &JsValue::Object(target))
}

// §7.2.8 IsRegExp
pub fn is_regexp(agent: &Agent, value: &JsValue) -> Completion<bool> {
    let JsValue::Object(o) = value else {
        return Completion::Normal(false);
    };
    let matcher = q!(get(agent, o, &PropertyKey::symbol(WellKnownSymbol::Match)));
    if !matcher.is_undefined() {
        return Completion::Normal(to_boolean(&matcher));
    }
    Completion::Normal(matches!(o.borrow().kind, ObjectKind::RegExp(_)))
}

// §7.3.1 MakeBasicObject, with the ordinary prototype
pub fn make_basic_object(agent: &Agent) -> JsObject {
    JsObject::ordinary(Some(agent.intrinsic(IntrinsicId::ObjectPrototype)))
}

// §7.3.2 Get
pub fn get(agent: &Agent, o: &JsObject, key: &PropertyKey) -> Completion {
    o.get(agent, key, &JsValue::Object(o.clone()))
}

// §7.3.3 GetV
pub fn get_v(agent: &Agent, value: &JsValue, key: &PropertyKey) -> Completion {
    let o = q!(to_object(agent, value));
    o.get(agent, key, value)
}

// §7.3.4 Set
pub fn set(
    agent: &Agent,
    o: &JsObject,
    key: PropertyKey,
    value: JsValue,
    throw: bool,
) -> Completion<bool> {
    let ok = q!(o.set(agent, key.clone(), value, &JsValue::Object(o.clone())));
    if !ok && throw {
        return agent.throw(ErrorKind::Type, Message::CannotSetProperty(key.to_string()));
    }
    Completion::Normal(ok)
}

// §7.3.5 CreateDataProperty
pub fn create_data_property(
    agent: &Agent,
    o: &JsObject,
    key: PropertyKey,
    value: JsValue,
) -> Completion<bool> {
    o.define_own_property(agent, key, PropertyDescriptor::data(value, true, true, true))
}

// §7.3.7 CreateDataPropertyOrThrow
pub fn create_data_property_or_throw(
    agent: &Agent,
    o: &JsObject,
    key: PropertyKey,
    value: JsValue,
) -> Completion<bool> {
    let ok = q!(create_data_property(agent, o, key.clone(), value));
    if !ok {
        return agent.throw(ErrorKind::Type, Message::CannotDefineProperty(key.to_string()));
    }
    Completion::Normal(true)
}

/// CreateMethodProperty: a non-enumerable writable configurable data property.
pub fn create_method_property(o: &JsObject, key: PropertyKey, value: JsValue) {
    o.insert_property(key, crate::object::Property::data(value, true, false, true));
}

// §7.3.8 DefinePropertyOrThrow
pub fn define_property_or_throw(
    agent: &Agent,
    o: &JsObject,
    key: PropertyKey,
    desc: PropertyDescriptor,
) -> Completion<bool> {
    let ok = q!(o.define_own_property(agent, key.clone(), desc));
    if !ok {
        return agent.throw(ErrorKind::Type, Message::CannotDefineProperty(key.to_string()));
    }
    Completion::Normal(true)
}

// §7.3.9 DeletePropertyOrThrow
pub fn delete_property_or_throw(agent: &Agent, o: &JsObject, key: &PropertyKey) -> Completion<bool> {
    let ok = q!(o.delete(agent, key));
    if !ok {
        return agent.throw(ErrorKind::Type, Message::StrictModeDelete(key.to_string()));
    }
    Completion::Normal(true)
}

// §7.3.10 GetMethod
pub fn get_method(agent: &Agent, value: &JsValue, key: &PropertyKey) -> Completion<Option<JsObject>> {
    let func = q!(get_v(agent, value, key));
    match func {
        JsValue::Undefined | JsValue::Null => Completion::Normal(None),
        JsValue::Object(f) if f.is_callable() => Completion::Normal(Some(f)),
        other => agent.throw(ErrorKind::Type, Message::NotAFunction(agent.inspect(&other))),
    }
}

// §7.3.11 HasProperty
pub fn has_property(agent: &Agent, o: &JsObject, key: &PropertyKey) -> Completion<bool> {
    o.has_property(agent, key)
}

// §7.3.12 HasOwnProperty
pub fn has_own_property(agent: &Agent, o: &JsObject, key: &PropertyKey) -> Completion<bool> {
    o.get_own_property(agent, key).map(|d| d.is_some())
}

// §7.3.13 Call
pub fn call(agent: &Agent, f: &JsValue, this: &JsValue, args: &[JsValue]) -> Completion {
    match f {
        JsValue::Object(o) if o.is_callable() => call_object(agent, o, this, args),
        other => agent.throw(ErrorKind::Type, Message::NotAFunction(agent.inspect(other))),
    }
}

// §7.3.14 Construct
pub fn construct(
    agent: &Agent,
    f: &JsObject,
    args: &[JsValue],
    new_target: Option<&JsObject>,
) -> Completion<JsObject> {
    let new_target = new_target.unwrap_or(f);
    construct_object(agent, f, args, new_target)
}

// §7.3.15 SetIntegrityLevel
pub fn set_integrity_level(agent: &Agent, o: &JsObject, level: IntegrityLevel) -> Completion<bool> {
    if !q!(o.prevent_extensions(agent)) {
        return Completion::Normal(false);
    }
    let keys = q!(o.own_property_keys(agent));
    for key in keys {
        let desc = match level {
            IntegrityLevel::Sealed => PropertyDescriptor {
                configurable: Some(false),
                ..Default::default()
            },
            IntegrityLevel::Frozen => {
                let Some(current) = q!(o.get_own_property(agent, &key)) else {
                    continue;
                };
                if current.is_accessor_descriptor() {
                    PropertyDescriptor {
                        configurable: Some(false),
                        ..Default::default()
                    }
                } else {
                    PropertyDescriptor {
                        configurable: Some(false),
                        writable: Some(false),
                        ..Default::default()
                    }
                }
            }
        };
        q!(define_property_or_throw(agent, o, key, desc));
    }
    Completion::Normal(true)
}

// §7.3.16 TestIntegrityLevel
pub fn test_integrity_level(agent: &Agent, o: &JsObject, level: IntegrityLevel) -> Completion<bool> {
    if q!(o.is_extensible(agent)) {
        return Completion::Normal(false);
    }
    for key in q!(o.own_property_keys(agent)) {
        if let Some(current) = q!(o.get_own_property(agent, &key)) {
            if current.configurable() {
                return Completion::Normal(false);
            }
            if level == IntegrityLevel::Frozen && current.is_data_descriptor() && current.writable() {
                return Completion::Normal(false);
            }
        }
    }
    Completion::Normal(true)
}

// §7.3.17 CreateArrayFromList
pub fn create_array_from_list(agent: &Agent, elements: &[JsValue]) -> JsObject {
    let array = x!(array_create(agent, 0, None));
    for (index, value) in elements.iter().enumerate() {
        x!(create_data_property_or_throw(
            agent,
            &array,
            PropertyKey::from_index(index as u32),
            value.clone(),
        ));
    }
    array
}

// §7.3.18 LengthOfArrayLike
pub fn length_of_array_like(agent: &Agent, o: &JsObject) -> Completion<u64> {
    let len = q!(get(agent, o, &PropertyKey::from("length")));
    to_length(agent, &len)
}

// §7.3.19 CreateListFromArrayLike
pub fn create_list_from_array_like(
    agent: &Agent,
    value: &JsValue,
    types: ListElementTypes,
) -> Completion<Vec<JsValue>> {
    let JsValue::Object(o) = value else {
        return agent.throw(ErrorKind::Type, Message::NotAnObject(agent.inspect(value)));
    };
    let len = q!(length_of_array_like(agent, o));
    let mut list = Vec::with_capacity(len.min(1 << 16) as usize);
    for index in 0..len {
        let next = q!(get(agent, o, &PropertyKey::from_f64(index as f64)));
        if types == ListElementTypes::PropertyKeys
            && !matches!(next, JsValue::String(_) | JsValue::Symbol(_))
        {
            return agent.throw(
                ErrorKind::Type,
                Message::NotATypeObject(agent.inspect(&next), "property key"),
            );
        }
        list.push(next);
    }
    Completion::Normal(list)
}

// §7.3.20 Invoke
pub fn invoke(agent: &Agent, value: &JsValue, key: &PropertyKey, args: &[JsValue]) -> Completion {
    let func = q!(get_v(agent, value, key));
    call(agent, &func, value, args)
}

// §7.3.21 OrdinaryHasInstance
pub fn ordinary_has_instance(agent: &Agent, c: &JsValue, o: &JsValue) -> Completion<bool> {
    let JsValue::Object(c) = c else {
        return Completion::Normal(false);
    };
    if !c.is_callable() {
        return Completion::Normal(false);
    }
    let bound_target = match &c.borrow().kind {
        ObjectKind::BoundFunction(b) => Some(b.target.clone()),
        _ => None,
    };
    if let Some(target) = bound_target {
        return instance_of_operator(agent, o, &JsValue::Object(target));
    }
    let JsValue::Object(mut o) = o.clone() else {
        return Completion::Normal(false);
    };
    let p = q!(get(agent, c, &PropertyKey::from("prototype")));
    let JsValue::Object(p) = p else {
        return agent.throw(ErrorKind::Type, Message::NotAnObject(agent.inspect(&p)));
    };
    loop {
        match q!(o.get_prototype_of(agent)) {
            None => return Completion::Normal(false),
            Some(proto) if proto.ptr_eq(&p) => return Completion::Normal(true),
            Some(proto) => o = proto,
        }
    }
}

// §13.10.2 InstanceofOperator
pub fn instance_of_operator(agent: &Agent, value: &JsValue, target: &JsValue) -> Completion<bool> {
    if !target.is_object() {
        return agent.throw(ErrorKind::Type, Message::NotAnObject(agent.inspect(target)));
    }
    let handler = q!(get_method(
        agent,
        target,
        &PropertyKey::symbol(WellKnownSymbol::HasInstance)
    ));
    if let Some(handler) = handler {
        let result = q!(call(agent, &JsValue::Object(handler), target, &[value.clone()]));
        return Completion::Normal(to_boolean(&result));
    }
    if !target.is_callable() {
        return agent.throw(ErrorKind::Type, Message::NotAFunction(agent.inspect(target)));
    }
    ordinary_has_instance(agent, target, value)
}

// §7.3.22 SpeciesConstructor
pub fn species_constructor(agent: &Agent, o: &JsObject, default: IntrinsicId) -> Completion<JsObject> {
    let c = q!(get(agent, o, &PropertyKey::from("constructor")));
    if c.is_undefined() {
        return Completion::Normal(agent.intrinsic(default));
    }
    let JsValue::Object(c) = c else {
        return agent.throw(ErrorKind::Type, Message::NotAnObject(agent.inspect(&c)));
    };
    let s = q!(get(agent, &c, &PropertyKey::symbol(WellKnownSymbol::Species)));
    match s {
        JsValue::Undefined | JsValue::Null => Completion::Normal(agent.intrinsic(default)),
        JsValue::Object(s) if s.is_constructor() => Completion::Normal(s),
        other => agent.throw(ErrorKind::Type, Message::NotAConstructor(agent.inspect(&other))),
    }
}

// §7.3.23 EnumerableOwnProperties
pub fn enumerable_own_properties(
    agent: &Agent,
    o: &JsObject,
    kind: EnumerableKind,
) -> Completion<Vec<JsValue>> {
    let keys = q!(o.own_property_keys(agent));
    let mut properties = Vec::new();
    for key in keys {
        if key.is_symbol() {
            continue;
        }
        let Some(desc) = q!(o.get_own_property(agent, &key)) else {
            continue;
        };
        if !desc.enumerable() {
            continue;
        }
        match kind {
            EnumerableKind::Key => properties.push(key.to_value()),
            EnumerableKind::Value => properties.push(q!(get(agent, o, &key))),
            EnumerableKind::KeyValue => {
                let value = q!(get(agent, o, &key));
                let entry = create_array_from_list(agent, &[key.to_value(), value]);
                properties.push(JsValue::Object(entry));
            }
        }
    }
    Completion::Normal(properties)
}

// §7.3.24 GetFunctionRealm
pub fn get_function_realm(agent: &Agent, f: &JsObject) -> Completion<Realm> {
    enum Next {
        Done(Realm),
        Follow(JsObject),
        Revoked,
    }
    let next = match &f.borrow().kind {
        ObjectKind::Function(data) => Next::Done(data.realm.clone()),
        ObjectKind::Builtin(b) => Next::Done(b.realm.clone()),
        ObjectKind::BoundFunction(b) => Next::Follow(b.target.clone()),
        ObjectKind::Proxy(p) => match &p.handler {
            Some(_) => Next::Follow(p.target.clone()),
            None => Next::Revoked,
        },
        _ => Next::Done(agent.current_realm()),
    };
    match next {
        Next::Done(realm) => Completion::Normal(realm),
        Next::Follow(target) => get_function_realm(agent, &target),
        Next::Revoked => agent.throw(ErrorKind::Type, Message::ProxyRevoked("GetFunctionRealm")),
    }
}

// §7.3.25 CopyDataProperties
pub fn copy_data_properties(
    agent: &Agent,
    target: &JsObject,
    source: &JsValue,
    excluded: &[PropertyKey],
) -> Completion<()> {
    if source.is_nullish() {
        return Completion::Normal(());
    }
    let from = x!(to_object(agent, source));
    for key in q!(from.own_property_keys(agent)) {
        if excluded.contains(&key) {
            continue;
        }
        if let Some(desc) = q!(from.get_own_property(agent, &key)) {
            if desc.enumerable() {
                let value = q!(get(agent, &from, &key));
                x!(create_data_property_or_throw(agent, target, key, value));
            }
        }
    }
    Completion::Normal(())
}

// §10.1.14 GetPrototypeFromConstructor
pub fn get_prototype_from_constructor(
    agent: &Agent,
    constructor: &JsObject,
    default: IntrinsicId,
) -> Completion<JsObject> {
    let proto = q!(get(agent, constructor, &PropertyKey::from("prototype")));
    if let JsValue::Object(proto) = proto {
        return Completion::Normal(proto);
    }
    let realm = q!(get_function_realm(agent, constructor));
    Completion::Normal(realm.intrinsic(default))
}

// §10.1.13 OrdinaryCreateFromConstructor
pub fn ordinary_create_from_constructor(
    agent: &Agent,
    constructor: &JsObject,
    default: IntrinsicId,
    kind: ObjectKind,
) -> Completion<JsObject> {
    let proto = q!(get_prototype_from_constructor(agent, constructor, default));
    Completion::Normal(JsObject::new(Some(proto), kind))
}

// §10.4.2.3 ArraySpeciesCreate
pub fn array_species_create(agent: &Agent, original: &JsObject, length: u64) -> Completion<JsObject> {
    if !q!(is_array(agent, &JsValue::Object(original.clone()))) {
        return array_create(agent, length, None);
    }
    let mut c = q!(get(agent, original, &PropertyKey::from("constructor")));
    if let JsValue::Object(ctor) = &c {
        if ctor.is_constructor() {
            let this_realm = agent.current_realm();
            let realm_c = q!(get_function_realm(agent, ctor));
            if !this_realm.ptr_eq(&realm_c) && ctor.ptr_eq(&realm_c.intrinsic(IntrinsicId::Array)) {
                c = JsValue::Undefined;
            }
        }
    }
    if let JsValue::Object(ctor) = &c {
        c = q!(get(agent, ctor, &PropertyKey::symbol(WellKnownSymbol::Species)));
        if c.is_null() {
            c = JsValue::Undefined;
        }
    }
    match c {
        JsValue::Undefined => array_create(agent, length, None),
        JsValue::Object(ctor) if ctor.is_constructor() => {
            construct(agent, &ctor, &[JsValue::Number(length as f64)], None)
        }
        other => agent.throw(ErrorKind::Type, Message::NotAConstructor(agent.inspect(&other))),
    }
}

// §6.2.6.4 FromPropertyDescriptor
pub fn from_property_descriptor(agent: &Agent, desc: Option<&PropertyDescriptor>) -> JsValue {
    let Some(desc) = desc else {
        return JsValue::Undefined;
    };
    let obj = make_basic_object(agent);
    let mut put = |name: &str, value: JsValue| {
        x!(create_data_property_or_throw(agent, &obj, PropertyKey::from(name), value));
    };
    if let Some(value) = &desc.value {
        put("value", value.clone());
    }
    if let Some(writable) = desc.writable {
        put("writable", JsValue::Boolean(writable));
    }
    if let Some(get) = &desc.get {
        put("get", get.clone());
    }
    if let Some(set) = &desc.set {
        put("set", set.clone());
    }
    if let Some(enumerable) = desc.enumerable {
        put("enumerable", JsValue::Boolean(enumerable));
    }
    if let Some(configurable) = desc.configurable {
        put("configurable", JsValue::Boolean(configurable));
    }
    JsValue::Object(obj)
}

// §6.2.6.5 ToPropertyDescriptor
pub fn to_property_descriptor(agent: &Agent, value: &JsValue) -> Completion<PropertyDescriptor> {
    let JsValue::Object(o) = value else {
        return agent.throw(ErrorKind::Type, Message::NotAnObject(agent.inspect(value)));
    };
    let mut desc = PropertyDescriptor::default();
    let field = |name: &str| -> Completion<Option<JsValue>> {
        let key = PropertyKey::from(name);
        if !q!(has_property(agent, o, &key)) {
            return Completion::Normal(None);
        }
        get(agent, o, &key).map(Some)
    };
    if let Some(v) = q!(field("enumerable")) {
        desc.enumerable = Some(to_boolean(&v));
    }
    if let Some(v) = q!(field("configurable")) {
        desc.configurable = Some(to_boolean(&v));
    }
    if let Some(v) = q!(field("value")) {
        desc.value = Some(v);
    }
    if let Some(v) = q!(field("writable")) {
        desc.writable = Some(to_boolean(&v));
    }
    if let Some(getter) = q!(field("get")) {
        if !getter.is_undefined() && !getter.is_callable() {
            return agent.throw(ErrorKind::Type, Message::NotAFunction(agent.inspect(&getter)));
        }
        desc.get = Some(getter);
    }
    if let Some(setter) = q!(field("set")) {
        if !setter.is_undefined() && !setter.is_callable() {
            return agent.throw(ErrorKind::Type, Message::NotAFunction(agent.inspect(&setter)));
        }
        desc.set = Some(setter);
    }
    if (desc.get.is_some() || desc.set.is_some()) && (desc.value.is_some() || desc.writable.is_some())
    {
        return agent.throw(ErrorKind::Type, Message::InvalidDescriptor);
    }
    Completion::Normal(desc)
}

/// `key in object` and computed member keys share this.
pub fn property_key_of(agent: &Agent, value: &JsValue) -> Completion<PropertyKey> {
    to_property_key(agent, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_agent;

    #[test]
    fn own_keys_put_indices_first_then_insertion_order() {
        let agent = test_agent();
        let o = make_basic_object(&agent);
        for k in ["2", "a", "0", "b", "1"] {
            x!(create_data_property_or_throw(&agent, &o, PropertyKey::from(k), JsValue::Null));
        }
        let keys: Vec<String> = x!(o.own_property_keys(&agent))
            .iter()
            .map(|k| k.to_string())
            .collect();
        assert_eq!(keys, ["0", "1", "2", "a", "b"]);
    }

    #[test]
    fn frozen_objects_reject_writes() {
        let agent = test_agent();
        let o = make_basic_object(&agent);
        x!(create_data_property_or_throw(&agent, &o, "x".into(), JsValue::Number(1.0)));
        assert!(x!(set_integrity_level(&agent, &o, IntegrityLevel::Frozen)));
        assert!(x!(test_integrity_level(&agent, &o, IntegrityLevel::Frozen)));
        assert!(!x!(set(&agent, &o, "x".into(), JsValue::Number(2.0), false)));
        assert!(set(&agent, &o, "x".into(), JsValue::Number(2.0), true).is_throw());
    }

    #[test]
    fn descriptor_objects_round_trip_through_abstract_ops() {
        let agent = test_agent();
        let desc = PropertyDescriptor::data(JsValue::Number(3.0), false, true, false);
        let obj = from_property_descriptor(&agent, Some(&desc));
        let back = x!(to_property_descriptor(&agent, &obj));
        assert_eq!(back.writable, Some(false));
        assert_eq!(back.enumerable, Some(true));
        assert!(back.is_data_descriptor());
    }

    #[test]
    fn calling_a_non_callable_throws_type_error() {
        let agent = test_agent();
        let result = call(&agent, &JsValue::Number(1.0), &JsValue::Undefined, &[]);
        assert!(result.is_throw());
    }
}
