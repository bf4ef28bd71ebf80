//! §10.1 Ordinary Object Internal Methods.

use crate::abstract_ops::{call, comparison::same_value, create_data_property};
use crate::completion::Completion;
use crate::engine::Agent;
use crate::object::{JsObject, ObjectKind, Property, PropertyDescriptor, PropertyKey, PropertySlot};
use crate::types::JsValue;

// §10.1.2.1 OrdinarySetPrototypeOf
pub fn ordinary_set_prototype_of(o: &JsObject, v: Option<JsObject>) -> bool {
    let (current, extensible) = {
        let data = o.borrow();
        (data.prototype.clone(), data.extensible)
    };
    let same = match (&v, &current) {
        (None, None) => true,
        (Some(a), Some(b)) => a.ptr_eq(b),
        _ => false,
    };
    if same {
        return true;
    }
    if !extensible {
        return false;
    }
    let mut p = v.clone();
    while let Some(obj) = p {
        if obj.ptr_eq(o) {
            return false;
        }
        if matches!(obj.borrow().kind, ObjectKind::Proxy(_)) {
            break;
        }
        p = obj.borrow().prototype.clone();
    }
    o.borrow_mut().prototype = v;
    true
}

// §10.1.5.1 OrdinaryGetOwnProperty
pub fn ordinary_get_own_property(o: &JsObject, key: &PropertyKey) -> Option<PropertyDescriptor> {
    o.borrow().properties.get(key).map(Property::to_descriptor)
}

// §10.1.6.1 OrdinaryDefineOwnProperty
pub fn ordinary_define_own_property(
    agent: &Agent,
    o: &JsObject,
    key: PropertyKey,
    desc: PropertyDescriptor,
) -> Completion<bool> {
    let current = q!(o.get_own_property(agent, &key));
    let extensible = q!(o.is_extensible(agent));
    Completion::Normal(validate_and_apply_property_descriptor(
        Some(o),
        key,
        extensible,
        desc,
        current,
    ))
}

// §10.1.6.2 IsCompatiblePropertyDescriptor
pub fn is_compatible_property_descriptor(
    extensible: bool,
    desc: PropertyDescriptor,
    current: Option<PropertyDescriptor>,
) -> bool {
    validate_and_apply_property_descriptor(None, PropertyKey::from(""), extensible, desc, current)
}

// §10.1.6.3 ValidateAndApplyPropertyDescriptor
pub fn validate_and_apply_property_descriptor(
    o: Option<&JsObject>,
    key: PropertyKey,
    extensible: bool,
    desc: PropertyDescriptor,
    current: Option<PropertyDescriptor>,
) -> bool {
    let Some(current) = current else {
        if !extensible {
            return false;
        }
        if let Some(o) = o {
            o.borrow_mut().properties.insert(key, desc.into_property());
        }
        return true;
    };

    if desc.value.is_none()
        && desc.writable.is_none()
        && desc.get.is_none()
        && desc.set.is_none()
        && desc.enumerable.is_none()
        && desc.configurable.is_none()
    {
        return true;
    }

    if current.configurable == Some(false) {
        if desc.configurable == Some(true) {
            return false;
        }
        if let Some(e) = desc.enumerable
            && Some(e) != current.enumerable
        {
            return false;
        }
    }

    if desc.is_generic_descriptor() {
        // only enumerable/configurable change
    } else if current.is_data_descriptor() != desc.is_data_descriptor() {
        if current.configurable == Some(false) {
            return false;
        }
        if let Some(o) = o {
            let mut data = o.borrow_mut();
            if let Some(prop) = data.properties.get_mut(&key) {
                prop.slot = if current.is_data_descriptor() {
                    PropertySlot::Accessor {
                        get: None,
                        set: None,
                    }
                } else {
                    PropertySlot::Data {
                        value: JsValue::Undefined,
                        writable: false,
                    }
                };
            }
        }
    } else if current.is_data_descriptor() && desc.is_data_descriptor() {
        if current.configurable == Some(false) && current.writable == Some(false) {
            if desc.writable == Some(true) {
                return false;
            }
            if let (Some(new), Some(old)) = (&desc.value, &current.value)
                && !same_value(new, old)
            {
                return false;
            }
            return true;
        }
    } else if current.configurable == Some(false) {
        if let (Some(new), Some(old)) = (&desc.set, &current.set)
            && !same_value(new, old)
        {
            return false;
        }
        if let (Some(new), Some(old)) = (&desc.get, &current.get)
            && !same_value(new, old)
        {
            return false;
        }
        return true;
    }

    if let Some(o) = o {
        let mut data = o.borrow_mut();
        if let Some(prop) = data.properties.get_mut(&key) {
            apply_fields(prop, desc);
        } else {
            // Exotic objects report some properties they do not store; the
            // only mutable case is a fresh stored copy.
            let mut merged = current;
            merge_descriptor(&mut merged, desc);
            data.properties.insert(key, merged.into_property());
        }
    }
    true
}

fn apply_fields(prop: &mut Property, desc: PropertyDescriptor) {
    if let Some(e) = desc.enumerable {
        prop.enumerable = e;
    }
    if let Some(c) = desc.configurable {
        prop.configurable = c;
    }
    match &mut prop.slot {
        PropertySlot::Data { value, writable } => {
            if let Some(v) = desc.value {
                *value = v;
            }
            if let Some(w) = desc.writable {
                *writable = w;
            }
        }
        PropertySlot::Accessor { get, set } => {
            if let Some(g) = desc.get {
                *get = g.as_object().cloned();
            }
            if let Some(s) = desc.set {
                *set = s.as_object().cloned();
            }
        }
    }
}

fn merge_descriptor(target: &mut PropertyDescriptor, desc: PropertyDescriptor) {
    if desc.value.is_some() {
        target.value = desc.value;
    }
    if desc.writable.is_some() {
        target.writable = desc.writable;
    }
    if desc.get.is_some() {
        target.get = desc.get;
    }
    if desc.set.is_some() {
        target.set = desc.set;
    }
    if desc.enumerable.is_some() {
        target.enumerable = desc.enumerable;
    }
    if desc.configurable.is_some() {
        target.configurable = desc.configurable;
    }
}

// §10.1.7.1 OrdinaryHasProperty
pub fn ordinary_has_property(agent: &Agent, o: &JsObject, key: &PropertyKey) -> Completion<bool> {
    if q!(o.get_own_property(agent, key)).is_some() {
        return Completion::Normal(true);
    }
    match q!(o.get_prototype_of(agent)) {
        Some(parent) => parent.has_property(agent, key),
        None => Completion::Normal(false),
    }
}

// §10.1.8.1 OrdinaryGet
pub fn ordinary_get(agent: &Agent, o: &JsObject, key: &PropertyKey, receiver: &JsValue) -> Completion {
    let Some(desc) = q!(o.get_own_property(agent, key)) else {
        return match q!(o.get_prototype_of(agent)) {
            Some(parent) => parent.get(agent, key, receiver),
            None => Completion::Normal(JsValue::Undefined),
        };
    };
    if desc.is_data_descriptor() {
        return Completion::Normal(desc.value.unwrap_or(JsValue::Undefined));
    }
    match desc.getter() {
        Some(getter) => call(agent, &JsValue::Object(getter), receiver, &[]),
        None => Completion::Normal(JsValue::Undefined),
    }
}

// §10.1.9.1 OrdinarySet
pub fn ordinary_set(
    agent: &Agent,
    o: &JsObject,
    key: PropertyKey,
    value: JsValue,
    receiver: &JsValue,
) -> Completion<bool> {
    let own = q!(o.get_own_property(agent, &key));
    ordinary_set_with_own_descriptor(agent, o, key, value, receiver, own)
}

// §10.1.9.2 OrdinarySetWithOwnDescriptor
pub fn ordinary_set_with_own_descriptor(
    agent: &Agent,
    o: &JsObject,
    key: PropertyKey,
    value: JsValue,
    receiver: &JsValue,
    own: Option<PropertyDescriptor>,
) -> Completion<bool> {
    let own = match own {
        Some(desc) => desc,
        None => match q!(o.get_prototype_of(agent)) {
            Some(parent) => return parent.set(agent, key, value, receiver),
            None => PropertyDescriptor::data(JsValue::Undefined, true, true, true),
        },
    };
    if own.is_data_descriptor() {
        if !own.writable() {
            return Completion::Normal(false);
        }
        let JsValue::Object(receiver) = receiver else {
            return Completion::Normal(false);
        };
        return match q!(receiver.get_own_property(agent, &key)) {
            Some(existing) => {
                if existing.is_accessor_descriptor() || !existing.writable() {
                    return Completion::Normal(false);
                }
                receiver.define_own_property(agent, key, PropertyDescriptor::value_only(value))
            }
            None => create_data_property(agent, receiver, key, value),
        };
    }
    match own.setter() {
        Some(setter) => {
            q!(call(agent, &JsValue::Object(setter), receiver, &[value]));
            Completion::Normal(true)
        }
        None => Completion::Normal(false),
    }
}

// §10.1.10.1 OrdinaryDelete
pub fn ordinary_delete(agent: &Agent, o: &JsObject, key: &PropertyKey) -> Completion<bool> {
    let Some(desc) = q!(o.get_own_property(agent, key)) else {
        return Completion::Normal(true);
    };
    if desc.configurable() {
        o.borrow_mut().properties.remove(key);
        return Completion::Normal(true);
    }
    Completion::Normal(false)
}
