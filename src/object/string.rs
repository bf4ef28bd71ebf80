//! §10.4.3 String Exotic Objects.

use crate::completion::Completion;
use crate::engine::Agent;
use crate::object::ordinary::{
    is_compatible_property_descriptor, ordinary_define_own_property, ordinary_get_own_property,
};
use crate::object::{JsObject, ObjectKind, Property, PropertyDescriptor, PropertyKey};
use crate::types::{JsString, JsValue};

// §10.4.3.4 StringCreate
pub fn string_create(value: JsString, prototype: JsObject) -> JsObject {
    let len = value.len();
    let s = JsObject::new(Some(prototype), ObjectKind::String(value));
    s.insert_property(
        "length",
        Property::data(JsValue::Number(len as f64), false, false, false),
    );
    s
}

// §10.4.3.5 StringGetOwnProperty
fn string_get_own_property(s: &JsObject, key: &PropertyKey) -> Option<PropertyDescriptor> {
    let index = key.as_array_index()? as usize;
    let data = s.borrow();
    let ObjectKind::String(value) = &data.kind else {
        return None;
    };
    if index >= value.len() {
        return None;
    }
    let unit = JsString::from_units(vec![value.units()[index]]);
    Some(PropertyDescriptor::data(JsValue::String(unit), false, true, false))
}

// §10.4.3.1 [[GetOwnProperty]]
pub fn get_own_property(s: &JsObject, key: &PropertyKey) -> Option<PropertyDescriptor> {
    ordinary_get_own_property(s, key).or_else(|| string_get_own_property(s, key))
}

// §10.4.3.2 [[DefineOwnProperty]]
pub fn define_own_property(
    agent: &Agent,
    s: &JsObject,
    key: PropertyKey,
    desc: PropertyDescriptor,
) -> Completion<bool> {
    if let Some(string_desc) = string_get_own_property(s, &key) {
        let extensible = s.borrow().extensible;
        return Completion::Normal(is_compatible_property_descriptor(
            extensible,
            desc,
            Some(string_desc),
        ));
    }
    ordinary_define_own_property(agent, s, key, desc)
}

// §10.4.3.3 [[OwnPropertyKeys]]
pub fn own_property_keys(s: &JsObject, len: usize) -> Vec<PropertyKey> {
    let mut keys: Vec<PropertyKey> = (0..len as u32).map(PropertyKey::from_index).collect();
    for key in s.borrow().properties.ordered_keys() {
        if key.as_array_index().is_some_and(|i| (i as usize) < len) {
            continue;
        }
        keys.push(key);
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{IntrinsicId, test_agent};

    #[test]
    fn index_properties_are_read_only() {
        let agent = test_agent();
        let s = string_create(
            JsString::from_str("hi"),
            agent.intrinsic(IntrinsicId::StringPrototype),
        );
        let d = x!(s.get_own_property(&agent, &PropertyKey::from_index(1))).unwrap_or_default();
        assert!(matches!(d.value, Some(JsValue::String(ref v)) if v.to_rust_string() == "i"));
        assert_eq!(d.writable, Some(false));
        let ok = x!(s.define_own_property(
            &agent,
            PropertyKey::from_index(0),
            PropertyDescriptor::value_only(JsValue::from_str("x")),
        ));
        assert!(!ok);
        let keys = x!(s.own_property_keys(&agent));
        let rendered: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        assert_eq!(rendered, ["0", "1", "length"]);
    }
}
