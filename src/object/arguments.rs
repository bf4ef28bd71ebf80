//! §10.4.4 Arguments Exotic Objects.

use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::abstract_ops::create_data_property_or_throw;
use crate::completion::Completion;
use crate::engine::{Agent, IntrinsicId};
use crate::environment::Environment;
use crate::object::ordinary::{
    ordinary_define_own_property, ordinary_delete, ordinary_get, ordinary_get_own_property,
    ordinary_set,
};
use crate::object::{JsObject, ObjectKind, Property, PropertyDescriptor, PropertyKey};
use crate::types::{JsValue, WellKnownSymbol};

/// [[ParameterMap]]: index to the parameter binding it aliases. Unmapped
/// arguments objects have no environment.
pub struct ArgumentsMap {
    env: Option<Environment>,
    mapped: FxHashMap<u32, Rc<str>>,
}

fn mapped_name(args: &JsObject, key: &PropertyKey) -> Option<(Environment, Rc<str>)> {
    let index = key.as_array_index()?;
    let data = args.borrow();
    let ObjectKind::Arguments(map) = &data.kind else {
        return None;
    };
    let env = map.env.clone()?;
    map.mapped.get(&index).map(|name| (env, name.clone()))
}

fn unmap(args: &JsObject, key: &PropertyKey) {
    if let Some(index) = key.as_array_index()
        && let ObjectKind::Arguments(map) = &mut args.borrow_mut().kind
    {
        map.mapped.remove(&index);
    }
}

// §10.4.4.1 [[GetOwnProperty]]
pub fn get_own_property(
    agent: &Agent,
    args: &JsObject,
    key: &PropertyKey,
) -> Option<PropertyDescriptor> {
    let mut desc = ordinary_get_own_property(args, key)?;
    if let Some((env, name)) = mapped_name(args, key) {
        desc.value = Some(x!(env.get_binding_value(agent, &name, false)));
    }
    Some(desc)
}

// §10.4.4.2 [[DefineOwnProperty]]
pub fn define_own_property(
    agent: &Agent,
    args: &JsObject,
    key: PropertyKey,
    desc: PropertyDescriptor,
) -> Completion<bool> {
    let mapping = mapped_name(args, &key);
    let mut new_desc = desc.clone();
    if let Some((env, name)) = &mapping
        && desc.is_data_descriptor()
        && desc.value.is_none()
        && desc.writable == Some(false)
    {
        new_desc.value = Some(x!(env.get_binding_value(agent, name, false)));
    }
    if !q!(ordinary_define_own_property(agent, args, key.clone(), new_desc)) {
        return Completion::Normal(false);
    }
    if let Some((env, name)) = mapping {
        if desc.is_accessor_descriptor() {
            unmap(args, &key);
        } else {
            if let Some(v) = desc.value {
                x!(env.set_mutable_binding(agent, &name, v, false));
            }
            if desc.writable == Some(false) {
                unmap(args, &key);
            }
        }
    }
    Completion::Normal(true)
}

// §10.4.4.3 [[Get]]
pub fn get(agent: &Agent, args: &JsObject, key: &PropertyKey, receiver: &JsValue) -> Completion {
    match mapped_name(args, key) {
        Some((env, name)) => env.get_binding_value(agent, &name, false),
        None => ordinary_get(agent, args, key, receiver),
    }
}

// §10.4.4.4 [[Set]]
pub fn set(
    agent: &Agent,
    args: &JsObject,
    key: PropertyKey,
    value: JsValue,
    receiver: &JsValue,
) -> Completion<bool> {
    let same_receiver = matches!(receiver, JsValue::Object(r) if r.ptr_eq(args));
    if same_receiver && let Some((env, name)) = mapped_name(args, &key) {
        x!(env.set_mutable_binding(agent, &name, value.clone(), false));
    }
    ordinary_set(agent, args, key, value, receiver)
}

// §10.4.4.5 [[Delete]]
pub fn delete(agent: &Agent, args: &JsObject, key: &PropertyKey) -> Completion<bool> {
    let result = q!(ordinary_delete(agent, args, key));
    if result {
        unmap(args, key);
    }
    Completion::Normal(result)
}

fn install_common(agent: &Agent, obj: &JsObject, args: &[JsValue]) -> Completion<()> {
    obj.insert_property(
        "length",
        Property::data(JsValue::Number(args.len() as f64), true, false, true),
    );
    for (index, value) in args.iter().enumerate() {
        q!(create_data_property_or_throw(
            agent,
            obj,
            PropertyKey::from_index(index as u32),
            value.clone(),
        ));
    }
    obj.insert_property(
        PropertyKey::symbol(WellKnownSymbol::Iterator),
        Property::data(
            JsValue::Object(agent.intrinsic(IntrinsicId::ArrayProtoValues)),
            true,
            false,
            true,
        ),
    );
    Completion::Normal(())
}

// §10.4.4.6 CreateUnmappedArgumentsObject
pub fn create_unmapped_arguments_object(agent: &Agent, args: &[JsValue]) -> Completion<JsObject> {
    let obj = JsObject::new(
        Some(agent.intrinsic(IntrinsicId::ObjectPrototype)),
        ObjectKind::Arguments(ArgumentsMap {
            env: None,
            mapped: FxHashMap::default(),
        }),
    );
    q!(install_common(agent, &obj, args));
    let thrower = agent.intrinsic(IntrinsicId::ThrowTypeError);
    obj.insert_property(
        "callee",
        PropertyDescriptor::accessor(Some(thrower.clone()), Some(thrower), false, false)
            .into_property(),
    );
    Completion::Normal(obj)
}

// §10.4.4.7 CreateMappedArgumentsObject
pub fn create_mapped_arguments_object(
    agent: &Agent,
    func: &JsObject,
    parameter_names: &[Rc<str>],
    args: &[JsValue],
    env: &Environment,
) -> Completion<JsObject> {
    let mut mapped = FxHashMap::default();
    let mut seen: FxHashSet<Rc<str>> = FxHashSet::default();
    for (index, name) in parameter_names.iter().enumerate().rev() {
        if seen.insert(name.clone()) && index < args.len() {
            mapped.insert(index as u32, name.clone());
        }
    }
    let obj = JsObject::new(
        Some(agent.intrinsic(IntrinsicId::ObjectPrototype)),
        ObjectKind::Arguments(ArgumentsMap {
            env: None,
            mapped: FxHashMap::default(),
        }),
    );
    q!(install_common(agent, &obj, args));
    if let ObjectKind::Arguments(map) = &mut obj.borrow_mut().kind {
        map.env = Some(env.clone());
        map.mapped = mapped;
    }
    obj.insert_property(
        "callee",
        Property::data(JsValue::Object(func.clone()), true, false, true),
    );
    Completion::Normal(obj)
}
