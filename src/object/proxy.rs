//! §10.5 Proxy Object Internal Methods and Internal Slots.
//!
//! Every trap follows the same shape: look the trap up on the handler, fall
//! back to the target when it is absent, otherwise call it and check the
//! result against the target's observable state.

use crate::abstract_ops::{
    call, construct, create_array_from_list, create_list_from_array_like,
    from_property_descriptor, get_method, to_property_descriptor, ListElementTypes,
    comparison::same_value, conversion::to_boolean,
};
use crate::completion::Completion;
use crate::engine::{Agent, ErrorKind, Message};
use crate::object::ordinary::is_compatible_property_descriptor;
use crate::object::{JsObject, ObjectKind, PropertyDescriptor, PropertyKey};
use crate::types::JsValue;

/// [[ProxyTarget]] and [[ProxyHandler]]. A revoked proxy has no handler.
#[derive(Clone)]
pub struct ProxyData {
    pub target: JsObject,
    pub handler: Option<JsObject>,
    pub callable: bool,
    pub constructor: bool,
}

// §10.5.14 ProxyCreate
pub fn proxy_create(agent: &Agent, target: &JsValue, handler: &JsValue) -> Completion<JsObject> {
    let (JsValue::Object(target), JsValue::Object(handler)) = (target, handler) else {
        let culprit = if target.is_object() { handler } else { target };
        return agent.throw(ErrorKind::Type, Message::NotAnObject(agent.inspect(culprit)));
    };
    Completion::Normal(JsObject::new(
        None,
        ObjectKind::Proxy(ProxyData {
            target: target.clone(),
            handler: Some(handler.clone()),
            callable: target.is_callable(),
            constructor: target.is_constructor(),
        }),
    ))
}

/// Clears [[ProxyHandler]]; subsequent traps throw.
pub fn revoke(proxy: &JsObject) {
    if let ObjectKind::Proxy(p) = &mut proxy.borrow_mut().kind {
        p.handler = None;
    }
}

/// The handler and trap for `name`, or `None` when the handler lacks it.
fn trap(
    agent: &Agent,
    p: &ProxyData,
    name: &'static str,
) -> Completion<Option<(JsObject, JsObject)>> {
    let Some(handler) = &p.handler else {
        return agent.throw(ErrorKind::Type, Message::ProxyRevoked(name));
    };
    let method = q!(get_method(agent, &JsValue::Object(handler.clone()), &PropertyKey::from(name)));
    Completion::Normal(method.map(|m| (handler.clone(), m)))
}

fn invoke(agent: &Agent, handler: &JsObject, trap: &JsObject, args: &[JsValue]) -> Completion {
    call(
        agent,
        &JsValue::Object(trap.clone()),
        &JsValue::Object(handler.clone()),
        args,
    )
}

fn violation<T>(agent: &Agent, name: &'static str) -> Completion<T> {
    agent.throw(ErrorKind::Type, Message::ProxyInvariant(name))
}

fn same_proto(a: &Option<JsObject>, b: &Option<JsObject>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.ptr_eq(b),
        _ => false,
    }
}

// §10.5.1 [[GetPrototypeOf]]
pub fn get_prototype_of(agent: &Agent, p: &ProxyData) -> Completion<Option<JsObject>> {
    let Some((handler, method)) = q!(trap(agent, p, "getPrototypeOf")) else {
        return p.target.get_prototype_of(agent);
    };
    let result = q!(invoke(agent, &handler, &method, &[JsValue::Object(p.target.clone())]));
    let proto = match result {
        JsValue::Object(o) => Some(o),
        JsValue::Null => None,
        _ => return violation(agent, "getPrototypeOf"),
    };
    if q!(p.target.is_extensible(agent)) {
        return Completion::Normal(proto);
    }
    let target_proto = q!(p.target.get_prototype_of(agent));
    if !same_proto(&proto, &target_proto) {
        return violation(agent, "getPrototypeOf");
    }
    Completion::Normal(proto)
}

// §10.5.2 [[SetPrototypeOf]]
pub fn set_prototype_of(agent: &Agent, p: &ProxyData, proto: Option<JsObject>) -> Completion<bool> {
    let Some((handler, method)) = q!(trap(agent, p, "setPrototypeOf")) else {
        return p.target.set_prototype_of(agent, proto);
    };
    let args = [JsValue::Object(p.target.clone()), JsValue::from(proto.clone())];
    if !to_boolean(&q!(invoke(agent, &handler, &method, &args))) {
        return Completion::Normal(false);
    }
    if q!(p.target.is_extensible(agent)) {
        return Completion::Normal(true);
    }
    let target_proto = q!(p.target.get_prototype_of(agent));
    if !same_proto(&proto, &target_proto) {
        return violation(agent, "setPrototypeOf");
    }
    Completion::Normal(true)
}

// §10.5.3 [[IsExtensible]]
pub fn is_extensible(agent: &Agent, p: &ProxyData) -> Completion<bool> {
    let Some((handler, method)) = q!(trap(agent, p, "isExtensible")) else {
        return p.target.is_extensible(agent);
    };
    let result = to_boolean(&q!(invoke(
        agent,
        &handler,
        &method,
        &[JsValue::Object(p.target.clone())]
    )));
    if result != q!(p.target.is_extensible(agent)) {
        return violation(agent, "isExtensible");
    }
    Completion::Normal(result)
}

// §10.5.4 [[PreventExtensions]]
pub fn prevent_extensions(agent: &Agent, p: &ProxyData) -> Completion<bool> {
    let Some((handler, method)) = q!(trap(agent, p, "preventExtensions")) else {
        return p.target.prevent_extensions(agent);
    };
    let result = to_boolean(&q!(invoke(
        agent,
        &handler,
        &method,
        &[JsValue::Object(p.target.clone())]
    )));
    if result && q!(p.target.is_extensible(agent)) {
        return violation(agent, "preventExtensions");
    }
    Completion::Normal(result)
}

// §10.5.5 [[GetOwnProperty]]
pub fn get_own_property(
    agent: &Agent,
    p: &ProxyData,
    key: &PropertyKey,
) -> Completion<Option<PropertyDescriptor>> {
    const NAME: &str = "getOwnPropertyDescriptor";
    let Some((handler, method)) = q!(trap(agent, p, NAME)) else {
        return p.target.get_own_property(agent, key);
    };
    let result = q!(invoke(
        agent,
        &handler,
        &method,
        &[JsValue::Object(p.target.clone()), key.to_value()]
    ));
    if !result.is_object() && !result.is_undefined() {
        return violation(agent, NAME);
    }
    let target_desc = q!(p.target.get_own_property(agent, key));
    if result.is_undefined() {
        let Some(target_desc) = target_desc else {
            return Completion::Normal(None);
        };
        if !target_desc.configurable() || !q!(p.target.is_extensible(agent)) {
            return violation(agent, NAME);
        }
        return Completion::Normal(None);
    }
    let extensible = q!(p.target.is_extensible(agent));
    let mut desc = q!(to_property_descriptor(agent, &result));
    complete_property_descriptor(&mut desc);
    if !is_compatible_property_descriptor(extensible, desc.clone(), target_desc.clone()) {
        return violation(agent, NAME);
    }
    if desc.configurable == Some(false) {
        match &target_desc {
            None => return violation(agent, NAME),
            Some(t) if t.configurable() => return violation(agent, NAME),
            Some(t) => {
                if desc.writable == Some(false) && t.writable() {
                    return violation(agent, NAME);
                }
            }
        }
    }
    Completion::Normal(Some(desc))
}

// §6.2.6.6 CompletePropertyDescriptor
pub fn complete_property_descriptor(desc: &mut PropertyDescriptor) {
    if desc.is_generic_descriptor() || desc.is_data_descriptor() {
        desc.value.get_or_insert(JsValue::Undefined);
        desc.writable.get_or_insert(false);
    } else {
        desc.get.get_or_insert(JsValue::Undefined);
        desc.set.get_or_insert(JsValue::Undefined);
    }
    desc.enumerable.get_or_insert(false);
    desc.configurable.get_or_insert(false);
}

// §10.5.6 [[DefineOwnProperty]]
pub fn define_own_property(
    agent: &Agent,
    p: &ProxyData,
    key: PropertyKey,
    desc: PropertyDescriptor,
) -> Completion<bool> {
    let Some((handler, method)) = q!(trap(agent, p, "defineProperty")) else {
        return p.target.define_own_property(agent, key, desc);
    };
    let desc_obj = from_property_descriptor(agent, Some(&desc));
    let args = [JsValue::Object(p.target.clone()), key.to_value(), desc_obj];
    if !to_boolean(&q!(invoke(agent, &handler, &method, &args))) {
        return Completion::Normal(false);
    }
    let target_desc = q!(p.target.get_own_property(agent, &key));
    let extensible = q!(p.target.is_extensible(agent));
    let setting_config_false = desc.configurable == Some(false);
    match target_desc {
        None => {
            if !extensible || setting_config_false {
                return violation(agent, "defineProperty");
            }
        }
        Some(t) => {
            if !is_compatible_property_descriptor(extensible, desc.clone(), Some(t.clone())) {
                return violation(agent, "defineProperty");
            }
            if setting_config_false && t.configurable() {
                return violation(agent, "defineProperty");
            }
            if t.is_data_descriptor()
                && !t.configurable()
                && t.writable()
                && desc.writable == Some(false)
            {
                return violation(agent, "defineProperty");
            }
        }
    }
    Completion::Normal(true)
}

// §10.5.7 [[HasProperty]]
pub fn has_property(agent: &Agent, p: &ProxyData, key: &PropertyKey) -> Completion<bool> {
    let Some((handler, method)) = q!(trap(agent, p, "has")) else {
        return p.target.has_property(agent, key);
    };
    let args = [JsValue::Object(p.target.clone()), key.to_value()];
    let result = to_boolean(&q!(invoke(agent, &handler, &method, &args)));
    if !result && let Some(t) = q!(p.target.get_own_property(agent, key)) {
        if !t.configurable() || !q!(p.target.is_extensible(agent)) {
            return violation(agent, "has");
        }
    }
    Completion::Normal(result)
}

// §10.5.8 [[Get]]
pub fn get(agent: &Agent, p: &ProxyData, key: &PropertyKey, receiver: &JsValue) -> Completion {
    let Some((handler, method)) = q!(trap(agent, p, "get")) else {
        return p.target.get(agent, key, receiver);
    };
    let args = [JsValue::Object(p.target.clone()), key.to_value(), receiver.clone()];
    let result = q!(invoke(agent, &handler, &method, &args));
    if let Some(t) = q!(p.target.get_own_property(agent, key))
        && !t.configurable()
    {
        if t.is_data_descriptor()
            && !t.writable()
            && !same_value(&result, t.value.as_ref().unwrap_or(&JsValue::Undefined))
        {
            return violation(agent, "get");
        }
        if t.is_accessor_descriptor() && t.getter().is_none() && !result.is_undefined() {
            return violation(agent, "get");
        }
    }
    Completion::Normal(result)
}

// §10.5.9 [[Set]]
pub fn set(
    agent: &Agent,
    p: &ProxyData,
    key: PropertyKey,
    value: JsValue,
    receiver: &JsValue,
) -> Completion<bool> {
    let Some((handler, method)) = q!(trap(agent, p, "set")) else {
        return p.target.set(agent, key, value, receiver);
    };
    let args = [
        JsValue::Object(p.target.clone()),
        key.to_value(),
        value.clone(),
        receiver.clone(),
    ];
    if !to_boolean(&q!(invoke(agent, &handler, &method, &args))) {
        return Completion::Normal(false);
    }
    if let Some(t) = q!(p.target.get_own_property(agent, &key))
        && !t.configurable()
    {
        if t.is_data_descriptor()
            && !t.writable()
            && !same_value(&value, t.value.as_ref().unwrap_or(&JsValue::Undefined))
        {
            return violation(agent, "set");
        }
        if t.is_accessor_descriptor() && t.setter().is_none() {
            return violation(agent, "set");
        }
    }
    Completion::Normal(true)
}

// §10.5.10 [[Delete]]
pub fn delete(agent: &Agent, p: &ProxyData, key: &PropertyKey) -> Completion<bool> {
    let Some((handler, method)) = q!(trap(agent, p, "deleteProperty")) else {
        return p.target.delete(agent, key);
    };
    let args = [JsValue::Object(p.target.clone()), key.to_value()];
    if !to_boolean(&q!(invoke(agent, &handler, &method, &args))) {
        return Completion::Normal(false);
    }
    let Some(t) = q!(p.target.get_own_property(agent, key)) else {
        return Completion::Normal(true);
    };
    if !t.configurable() || !q!(p.target.is_extensible(agent)) {
        return violation(agent, "deleteProperty");
    }
    Completion::Normal(true)
}

// §10.5.11 [[OwnPropertyKeys]]
pub fn own_property_keys(agent: &Agent, p: &ProxyData) -> Completion<Vec<PropertyKey>> {
    let Some((handler, method)) = q!(trap(agent, p, "ownKeys")) else {
        return p.target.own_property_keys(agent);
    };
    let array = q!(invoke(agent, &handler, &method, &[JsValue::Object(p.target.clone())]));
    let list = q!(create_list_from_array_like(
        agent,
        &array,
        ListElementTypes::PropertyKeys
    ));
    let mut trap_result: Vec<PropertyKey> = Vec::with_capacity(list.len());
    for value in list {
        let key = match value {
            JsValue::String(s) => PropertyKey::String(s),
            JsValue::Symbol(s) => PropertyKey::Symbol(s),
            _ => unreachable!("filtered by CreateListFromArrayLike"),
        };
        if trap_result.contains(&key) {
            return violation(agent, "ownKeys");
        }
        trap_result.push(key);
    }

    let extensible = q!(p.target.is_extensible(agent));
    let target_keys = q!(p.target.own_property_keys(agent));
    let mut configurable = Vec::new();
    let mut nonconfigurable = Vec::new();
    for key in target_keys {
        match q!(p.target.get_own_property(agent, &key)) {
            Some(d) if !d.configurable() => nonconfigurable.push(key),
            _ => configurable.push(key),
        }
    }
    if extensible && nonconfigurable.is_empty() {
        return Completion::Normal(trap_result);
    }
    let mut unchecked: Vec<Option<&PropertyKey>> = trap_result.iter().map(Some).collect();
    let mut claim = |key: &PropertyKey| -> bool {
        match unchecked.iter_mut().find(|k| k.is_some_and(|k| k == key)) {
            Some(slot) => {
                *slot = None;
                true
            }
            None => false,
        }
    };
    for key in &nonconfigurable {
        if !claim(key) {
            return violation(agent, "ownKeys");
        }
    }
    if extensible {
        return Completion::Normal(trap_result);
    }
    for key in &configurable {
        if !claim(key) {
            return violation(agent, "ownKeys");
        }
    }
    if unchecked.iter().any(Option::is_some) {
        return violation(agent, "ownKeys");
    }
    Completion::Normal(trap_result)
}

// §10.5.12 [[Call]]
pub fn call_proxy(agent: &Agent, p: &ProxyData, this: &JsValue, args: &[JsValue]) -> Completion {
    let Some((handler, method)) = q!(trap(agent, p, "apply")) else {
        return call(agent, &JsValue::Object(p.target.clone()), this, args);
    };
    let array = create_array_from_list(agent, args);
    invoke(
        agent,
        &handler,
        &method,
        &[JsValue::Object(p.target.clone()), this.clone(), JsValue::Object(array)],
    )
}

// §10.5.13 [[Construct]]
pub fn construct_proxy(
    agent: &Agent,
    p: &ProxyData,
    args: &[JsValue],
    new_target: &JsObject,
) -> Completion<JsObject> {
    let Some((handler, method)) = q!(trap(agent, p, "construct")) else {
        return construct(agent, &p.target, args, Some(new_target));
    };
    let array = create_array_from_list(agent, args);
    let result = q!(invoke(
        agent,
        &handler,
        &method,
        &[
            JsValue::Object(p.target.clone()),
            JsValue::Object(array),
            JsValue::Object(new_target.clone()),
        ],
    ));
    match result {
        JsValue::Object(o) => Completion::Normal(o),
        _ => violation(agent, "construct"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abstract_ops::{create_data_property_or_throw, get};
    use crate::engine::{IntrinsicId, test_agent};
    use crate::object::NativeFn;
    use std::rc::Rc;

    fn handler_with(agent: &Agent, name: &str, f: NativeFn) -> JsObject {
        let handler = JsObject::ordinary(Some(agent.intrinsic(IntrinsicId::ObjectPrototype)));
        let trap = crate::builtins::create_builtin_function(agent, f, 0, name.into(), None);
        x!(create_data_property_or_throw(agent, &handler, name.into(), JsValue::Object(trap)));
        handler
    }

    #[test]
    fn get_trap_result_is_returned() {
        let agent = test_agent();
        let target = JsObject::ordinary(None);
        let handler = handler_with(
            &agent,
            "get",
            Rc::new(|_, _, _, _| Completion::Normal(JsValue::Number(7.0))),
        );
        let proxy = x!(proxy_create(
            &agent,
            &JsValue::Object(target),
            &JsValue::Object(handler)
        ));
        let v = x!(get(&agent, &proxy, &PropertyKey::from("anything")));
        assert!(matches!(v, JsValue::Number(n) if n == 7.0));
    }

    #[test]
    fn non_configurable_value_must_be_reported_faithfully() {
        let agent = test_agent();
        let target = JsObject::ordinary(None);
        target.insert_property(
            "fixed",
            crate::object::Property::data(JsValue::Number(1.0), false, true, false),
        );
        let handler = handler_with(
            &agent,
            "get",
            Rc::new(|_, _, _, _| Completion::Normal(JsValue::Number(2.0))),
        );
        let proxy = x!(proxy_create(
            &agent,
            &JsValue::Object(target),
            &JsValue::Object(handler)
        ));
        assert!(get(&agent, &proxy, &PropertyKey::from("fixed")).is_throw());
    }

    #[test]
    fn revoked_proxy_throws_on_every_trap() {
        let agent = test_agent();
        let proxy = x!(proxy_create(
            &agent,
            &JsValue::Object(JsObject::ordinary(None)),
            &JsValue::Object(JsObject::ordinary(None)),
        ));
        revoke(&proxy);
        assert!(proxy.get_prototype_of(&agent).is_throw());
        assert!(proxy.own_property_keys(&agent).is_throw());
    }

    #[test]
    fn missing_traps_forward_to_target() {
        let agent = test_agent();
        let target = JsObject::ordinary(None);
        target.insert_property("a", crate::object::Property::data(JsValue::Null, true, true, true));
        let proxy = x!(proxy_create(
            &agent,
            &JsValue::Object(target),
            &JsValue::Object(JsObject::ordinary(None)),
        ));
        let keys = x!(proxy.own_property_keys(&agent));
        assert_eq!(keys, vec![PropertyKey::from("a")]);
    }
}
