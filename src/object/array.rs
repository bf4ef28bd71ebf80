//! §10.4.2 Array Exotic Objects.

use crate::abstract_ops::conversion::to_number;
use crate::completion::Completion;
use crate::engine::{Agent, ErrorKind, IntrinsicId, Message};
use crate::object::ordinary::{ordinary_define_own_property, ordinary_get_own_property};
use crate::object::{JsObject, ObjectKind, Property, PropertyDescriptor, PropertyKey};
use crate::types::{JsValue, number_ops};

fn length_key() -> PropertyKey {
    PropertyKey::from("length")
}

// §10.4.2.2 ArrayCreate
pub fn array_create(agent: &Agent, length: u64, proto: Option<JsObject>) -> Completion<JsObject> {
    if length > u64::from(u32::MAX) {
        return agent.throw(ErrorKind::Range, Message::InvalidArrayLength);
    }
    let proto = proto.unwrap_or_else(|| agent.intrinsic(IntrinsicId::ArrayPrototype));
    let a = JsObject::new(Some(proto), ObjectKind::Array);
    a.insert_property(
        length_key(),
        Property::data(JsValue::Number(length as f64), true, false, false),
    );
    Completion::Normal(a)
}

/// Current value of an array's own `length`.
pub fn array_length(a: &JsObject) -> u32 {
    match a.own_data_value(&length_key()) {
        Some(JsValue::Number(n)) => n as u32,
        _ => 0,
    }
}

// §10.4.2.1 [[DefineOwnProperty]]
pub fn define_own_property(
    agent: &Agent,
    a: &JsObject,
    key: PropertyKey,
    desc: PropertyDescriptor,
) -> Completion<bool> {
    if key == length_key() {
        return array_set_length(agent, a, desc);
    }
    if let Some(index) = key.as_array_index() {
        let Some(old_len_desc) = ordinary_get_own_property(a, &length_key()) else {
            unreachable!("array without a length property");
        };
        let old_len = match &old_len_desc.value {
            Some(JsValue::Number(n)) => *n as u32,
            _ => 0,
        };
        if index >= old_len && !old_len_desc.writable() {
            return Completion::Normal(false);
        }
        if !q!(ordinary_define_own_property(agent, a, key, desc)) {
            return Completion::Normal(false);
        }
        if index >= old_len {
            let mut data = a.borrow_mut();
            if let Some(Property {
                slot: crate::object::PropertySlot::Data { value, .. },
                ..
            }) = data.properties.get_mut(&length_key())
            {
                *value = JsValue::Number(f64::from(index) + 1.0);
            }
        }
        return Completion::Normal(true);
    }
    ordinary_define_own_property(agent, a, key, desc)
}

// §10.4.2.4 ArraySetLength
pub fn array_set_length(agent: &Agent, a: &JsObject, desc: PropertyDescriptor) -> Completion<bool> {
    let Some(value) = desc.value.clone() else {
        return ordinary_define_own_property(agent, a, length_key(), desc);
    };
    let mut new_len_desc = desc;
    let number_len = q!(to_number(agent, &value));
    let new_len = number_ops::to_uint32(number_len);
    if f64::from(new_len) != number_len {
        return agent.throw(ErrorKind::Range, Message::InvalidArrayLength);
    }
    new_len_desc.value = Some(JsValue::Number(f64::from(new_len)));

    let Some(old_len_desc) = ordinary_get_own_property(a, &length_key()) else {
        unreachable!("array without a length property");
    };
    let old_len = match &old_len_desc.value {
        Some(JsValue::Number(n)) => *n as u32,
        _ => 0,
    };
    if new_len >= old_len {
        return ordinary_define_own_property(agent, a, length_key(), new_len_desc);
    }
    if !old_len_desc.writable() {
        return Completion::Normal(false);
    }
    let new_writable = match new_len_desc.writable {
        None | Some(true) => true,
        Some(false) => {
            new_len_desc.writable = Some(true);
            false
        }
    };
    if !q!(ordinary_define_own_property(agent, a, length_key(), new_len_desc.clone())) {
        return Completion::Normal(false);
    }

    let doomed = a.borrow().properties.index_keys_from(new_len);
    for index in doomed {
        if !q!(a.delete(agent, &PropertyKey::from_index(index))) {
            new_len_desc.value = Some(JsValue::Number(f64::from(index) + 1.0));
            if !new_writable {
                new_len_desc.writable = Some(false);
            }
            q!(ordinary_define_own_property(agent, a, length_key(), new_len_desc));
            return Completion::Normal(false);
        }
    }

    if !new_writable {
        let freeze = PropertyDescriptor {
            writable: Some(false),
            ..Default::default()
        };
        q!(ordinary_define_own_property(agent, a, length_key(), freeze));
    }
    Completion::Normal(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abstract_ops::{define_property_or_throw, get, set};
    use crate::engine::test_agent;

    #[test]
    fn shrinking_past_non_configurable_element_stops_there() {
        let agent = test_agent();
        let a = x!(array_create(&agent, 0, None));
        for i in 0..10u32 {
            x!(define_property_or_throw(
                &agent,
                &a,
                PropertyKey::from_index(i),
                PropertyDescriptor::data(JsValue::Number(f64::from(i)), true, true, i != 5),
            ));
        }
        assert_eq!(array_length(&a), 10);

        let ok = x!(a.set(
            &agent,
            PropertyKey::from("length"),
            JsValue::Number(0.0),
            &JsValue::Object(a.clone()),
        ));
        assert!(!ok);
        assert_eq!(array_length(&a), 6);
        for i in 6..10 {
            assert!(a.borrow().properties.get(&PropertyKey::from_index(i)).is_none());
        }
        assert!(a.borrow().properties.get(&PropertyKey::from_index(5)).is_some());
        assert!(a.borrow().properties.get(&PropertyKey::from_index(0)).is_some());
    }

    #[test]
    fn strict_set_of_length_throws_on_partial_failure() {
        let agent = test_agent();
        let a = x!(array_create(&agent, 0, None));
        x!(define_property_or_throw(
            &agent,
            &a,
            PropertyKey::from_index(2),
            PropertyDescriptor::data(JsValue::Null, false, true, false),
        ));
        let result = set(&agent, &a, PropertyKey::from("length"), JsValue::Number(0.0), true);
        assert!(result.is_throw());
        assert_eq!(array_length(&a), 3);
    }

    #[test]
    fn writing_past_the_end_grows_length() {
        let agent = test_agent();
        let a = x!(array_create(&agent, 0, None));
        x!(set(&agent, &a, PropertyKey::from_index(4), JsValue::Boolean(true), true));
        assert_eq!(array_length(&a), 5);
        let len = x!(get(&agent, &a, &PropertyKey::from("length")));
        assert!(matches!(len, JsValue::Number(n) if n == 5.0));
    }

    #[test]
    fn invalid_length_is_a_range_error() {
        let agent = test_agent();
        let a = x!(array_create(&agent, 0, None));
        let r = a.define_own_property(
            &agent,
            PropertyKey::from("length"),
            PropertyDescriptor::value_only(JsValue::Number(1.5)),
        );
        assert!(r.is_throw());
    }
}
