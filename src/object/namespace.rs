//! §10.4.6 Module Namespace Exotic Objects.

use crate::completion::Completion;
use crate::engine::{Agent, ErrorKind, Message};
use crate::modules::{ModuleId, ResolvedBinding, get_module_namespace, resolve_export};
use crate::object::ordinary::{ordinary_define_own_property, ordinary_get_own_property};
use crate::object::{JsObject, ObjectKind, Property, PropertyDescriptor, PropertyKey};
use crate::types::{JsString, JsValue, WellKnownSymbol};

pub struct NamespaceData {
    pub module: ModuleId,
    /// Export names, sorted by code unit order.
    pub exports: Vec<JsString>,
}

// §10.4.6.12 ModuleNamespaceCreate
pub fn module_namespace_create(module: ModuleId, mut exports: Vec<JsString>) -> JsObject {
    exports.sort();
    exports.dedup();
    let ns = JsObject::new(None, ObjectKind::Namespace(NamespaceData { module, exports }));
    ns.insert_property(
        PropertyKey::symbol(WellKnownSymbol::ToStringTag),
        Property::data(JsValue::from_str("Module"), false, false, false),
    );
    ns.borrow_mut().extensible = false;
    ns
}

fn export_name(o: &JsObject, key: &PropertyKey) -> Option<(ModuleId, JsString)> {
    let PropertyKey::String(name) = key else {
        return None;
    };
    match &o.borrow().kind {
        ObjectKind::Namespace(ns) if ns.exports.binary_search(name).is_ok() => {
            Some((ns.module, name.clone()))
        }
        _ => None,
    }
}

// §10.4.6.5 [[GetOwnProperty]]
pub fn get_own_property(
    agent: &Agent,
    o: &JsObject,
    key: &PropertyKey,
) -> Completion<Option<PropertyDescriptor>> {
    if key.is_symbol() {
        return Completion::Normal(ordinary_get_own_property(o, key));
    }
    if export_name(o, key).is_none() {
        return Completion::Normal(None);
    }
    let value = q!(get(agent, o, key));
    Completion::Normal(Some(PropertyDescriptor::data(value, true, true, false)))
}

// §10.4.6.6 [[DefineOwnProperty]]
pub fn define_own_property(
    agent: &Agent,
    o: &JsObject,
    key: PropertyKey,
    desc: PropertyDescriptor,
) -> Completion<bool> {
    if key.is_symbol() {
        return ordinary_define_own_property(agent, o, key, desc);
    }
    let Some(current) = q!(get_own_property(agent, o, &key)) else {
        return Completion::Normal(false);
    };
    if desc.configurable == Some(true)
        || desc.enumerable == Some(false)
        || desc.is_accessor_descriptor()
        || desc.writable == Some(false)
    {
        return Completion::Normal(false);
    }
    match (&desc.value, &current.value) {
        (Some(new), Some(old)) => Completion::Normal(crate::abstract_ops::comparison::same_value(new, old)),
        _ => Completion::Normal(true),
    }
}

// §10.4.6.7 [[HasProperty]]
pub fn has_property(o: &JsObject, key: &PropertyKey) -> bool {
    if key.is_symbol() {
        return o.borrow().properties.contains_key(key);
    }
    export_name(o, key).is_some()
}

// §10.4.6.8 [[Get]]
pub fn get(agent: &Agent, o: &JsObject, key: &PropertyKey) -> Completion {
    if key.is_symbol() {
        return Completion::Normal(o.own_data_value(key).unwrap_or(JsValue::Undefined));
    }
    let Some((module, name)) = export_name(o, key) else {
        return Completion::Normal(JsValue::Undefined);
    };
    let name = name.to_rust_string();
    match resolve_export(agent, module, &name, &mut Vec::new()) {
        ResolvedBinding::Namespace { module } => {
            Completion::Normal(JsValue::Object(get_module_namespace(agent, module)))
        }
        ResolvedBinding::Resolved { module, binding } => {
            let Some(env) = agent.module(module).environment() else {
                return agent.throw(ErrorKind::Reference, Message::NotDefined(name));
            };
            env.get_binding_value(agent, &binding, true)
        }
        ResolvedBinding::NotFound | ResolvedBinding::Ambiguous => {
            unreachable!("namespace export {name} no longer resolves")
        }
    }
}

// §10.4.6.11 [[OwnPropertyKeys]]
pub fn own_property_keys(o: &JsObject, ns: &NamespaceData) -> Vec<PropertyKey> {
    let mut keys: Vec<PropertyKey> = ns.exports.iter().cloned().map(PropertyKey::String).collect();
    keys.extend(
        o.borrow()
            .properties
            .ordered_keys()
            .into_iter()
            .filter(PropertyKey::is_symbol),
    );
    keys
}
