use std::fmt;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

use crate::object::JsObject;
use crate::types::{JsString, JsSymbol, JsValue, WellKnownSymbol, number_ops};

#[derive(Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    String(JsString),
    Symbol(JsSymbol),
}

impl PropertyKey {
    pub fn from_index(index: u32) -> Self {
        PropertyKey::String(JsString::from_str(&index.to_string()))
    }

    pub fn from_f64(n: f64) -> Self {
        PropertyKey::String(JsString::from_str(&number_ops::to_string(n)))
    }

    pub fn symbol(which: WellKnownSymbol) -> Self {
        PropertyKey::Symbol(JsSymbol::well_known(which))
    }

    /// The numeric value if this key is an array index (§6.1.7): a canonical
    /// numeric string for an integer in `0..2^32 - 1`.
    pub fn as_array_index(&self) -> Option<u32> {
        let PropertyKey::String(s) = self else {
            return None;
        };
        let units = s.units();
        if units.is_empty() || units.len() > 10 {
            return None;
        }
        if units.len() > 1 && units[0] == u16::from(b'0') {
            return None;
        }
        let mut n: u64 = 0;
        for &u in units {
            if !(u16::from(b'0')..=u16::from(b'9')).contains(&u) {
                return None;
            }
            n = n * 10 + u64::from(u - u16::from(b'0'));
        }
        if n < u64::from(u32::MAX) {
            Some(n as u32)
        } else {
            None
        }
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self, PropertyKey::Symbol(_))
    }

    pub fn as_string(&self) -> Option<&JsString> {
        match self {
            PropertyKey::String(s) => Some(s),
            PropertyKey::Symbol(_) => None,
        }
    }

    pub fn to_value(&self) -> JsValue {
        match self {
            PropertyKey::String(s) => JsValue::String(s.clone()),
            PropertyKey::Symbol(s) => JsValue::Symbol(s.clone()),
        }
    }

    /// Function name derived from a key, per SetFunctionName.
    pub fn to_function_name(&self) -> JsString {
        match self {
            PropertyKey::String(s) => s.clone(),
            PropertyKey::Symbol(sym) => match sym.description() {
                Some(d) => JsString::from_str("[").concat(d).concat(&JsString::from_str("]")),
                None => JsString::empty(),
            },
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        PropertyKey::String(JsString::from_str(s))
    }
}

impl From<JsString> for PropertyKey {
    fn from(s: JsString) -> Self {
        PropertyKey::String(s)
    }
}

impl From<JsSymbol> for PropertyKey {
    fn from(s: JsSymbol) -> Self {
        PropertyKey::Symbol(s)
    }
}

impl fmt::Debug for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::String(s) => write!(f, "{s:?}"),
            PropertyKey::Symbol(s) => write!(f, "{s:?}"),
        }
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::String(s) => write!(f, "{s}"),
            PropertyKey::Symbol(s) => write!(f, "{s:?}"),
        }
    }
}

/// A stored own property. Both shapes always carry every field.
#[derive(Clone, Debug)]
pub struct Property {
    pub slot: PropertySlot,
    pub enumerable: bool,
    pub configurable: bool,
}

#[derive(Clone, Debug)]
pub enum PropertySlot {
    Data { value: JsValue, writable: bool },
    Accessor {
        get: Option<JsObject>,
        set: Option<JsObject>,
    },
}

impl Property {
    pub fn data(value: JsValue, writable: bool, enumerable: bool, configurable: bool) -> Self {
        Property {
            slot: PropertySlot::Data { value, writable },
            enumerable,
            configurable,
        }
    }

    pub fn to_descriptor(&self) -> PropertyDescriptor {
        match &self.slot {
            PropertySlot::Data { value, writable } => PropertyDescriptor {
                value: Some(value.clone()),
                writable: Some(*writable),
                get: None,
                set: None,
                enumerable: Some(self.enumerable),
                configurable: Some(self.configurable),
            },
            PropertySlot::Accessor { get, set } => PropertyDescriptor {
                value: None,
                writable: None,
                get: Some(get.clone().into_undefined()),
                set: Some(set.clone().into_undefined()),
                enumerable: Some(self.enumerable),
                configurable: Some(self.configurable),
            },
        }
    }
}

/// §6.2.6 The Property Descriptor Specification Type. Absent fields are `None`.
/// `get`/`set` hold either a callable object or `undefined`.
#[derive(Clone, Debug, Default)]
pub struct PropertyDescriptor {
    pub value: Option<JsValue>,
    pub writable: Option<bool>,
    pub get: Option<JsValue>,
    pub set: Option<JsValue>,
    pub enumerable: Option<bool>,
    pub configurable: Option<bool>,
}

impl PropertyDescriptor {
    pub fn data(value: JsValue, writable: bool, enumerable: bool, configurable: bool) -> Self {
        PropertyDescriptor {
            value: Some(value),
            writable: Some(writable),
            get: None,
            set: None,
            enumerable: Some(enumerable),
            configurable: Some(configurable),
        }
    }

    pub fn accessor(
        get: Option<JsObject>,
        set: Option<JsObject>,
        enumerable: bool,
        configurable: bool,
    ) -> Self {
        PropertyDescriptor {
            value: None,
            writable: None,
            get: Some(get.into_undefined()),
            set: Some(set.into_undefined()),
            enumerable: Some(enumerable),
            configurable: Some(configurable),
        }
    }

    /// `{ [[Value]]: v }` only, as used by ArraySetLength and Set.
    pub fn value_only(value: JsValue) -> Self {
        PropertyDescriptor {
            value: Some(value),
            ..Default::default()
        }
    }

    // §6.2.6.1 IsAccessorDescriptor
    pub fn is_accessor_descriptor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }

    // §6.2.6.2 IsDataDescriptor
    pub fn is_data_descriptor(&self) -> bool {
        self.value.is_some() || self.writable.is_some()
    }

    // §6.2.6.3 IsGenericDescriptor
    pub fn is_generic_descriptor(&self) -> bool {
        !self.is_accessor_descriptor() && !self.is_data_descriptor()
    }

    pub fn enumerable(&self) -> bool {
        self.enumerable.unwrap_or(false)
    }

    pub fn configurable(&self) -> bool {
        self.configurable.unwrap_or(false)
    }

    pub fn writable(&self) -> bool {
        self.writable.unwrap_or(false)
    }

    pub fn getter(&self) -> Option<JsObject> {
        self.get.as_ref().and_then(|g| g.as_object().cloned())
    }

    pub fn setter(&self) -> Option<JsObject> {
        self.set.as_ref().and_then(|s| s.as_object().cloned())
    }

    /// §6.2.6.6 CompletePropertyDescriptor, producing the stored form.
    pub fn into_property(self) -> Property {
        let slot = if self.is_accessor_descriptor() {
            PropertySlot::Accessor {
                get: self.getter(),
                set: self.setter(),
            }
        } else {
            PropertySlot::Data {
                value: self.value.unwrap_or(JsValue::Undefined),
                writable: self.writable.unwrap_or(false),
            }
        };
        Property {
            slot,
            enumerable: self.enumerable.unwrap_or(false),
            configurable: self.configurable.unwrap_or(false),
        }
    }
}

trait IntoUndefined {
    fn into_undefined(self) -> JsValue;
}

impl IntoUndefined for Option<JsObject> {
    fn into_undefined(self) -> JsValue {
        match self {
            Some(o) => JsValue::Object(o),
            None => JsValue::Undefined,
        }
    }
}

/// Own-property storage. Insertion order is preserved; enumeration order is
/// derived in [`PropertyMap::ordered_keys`].
#[derive(Default)]
pub struct PropertyMap {
    entries: IndexMap<PropertyKey, Property, FxBuildHasher>,
}

impl PropertyMap {
    pub fn get(&self, key: &PropertyKey) -> Option<&Property> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &PropertyKey) -> Option<&mut Property> {
        self.entries.get_mut(key)
    }

    pub fn contains_key(&self, key: &PropertyKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Replacing an existing key keeps its original position.
    pub fn insert(&mut self, key: PropertyKey, property: Property) {
        self.entries.insert(key, property);
    }

    pub fn remove(&mut self, key: &PropertyKey) -> Option<Property> {
        self.entries.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PropertyKey, &Property)> {
        self.entries.iter()
    }

    /// Array-index keys ascending, then other strings in creation order, then
    /// symbols in creation order.
    pub fn ordered_keys(&self) -> Vec<PropertyKey> {
        let mut indices: Vec<(u32, &PropertyKey)> = Vec::new();
        let mut strings = Vec::new();
        let mut symbols = Vec::new();
        for key in self.entries.keys() {
            match key {
                PropertyKey::Symbol(_) => symbols.push(key.clone()),
                PropertyKey::String(_) => match key.as_array_index() {
                    Some(i) => indices.push((i, key)),
                    None => strings.push(key.clone()),
                },
            }
        }
        indices.sort_by_key(|(i, _)| *i);
        let mut keys: Vec<PropertyKey> = indices.into_iter().map(|(_, k)| k.clone()).collect();
        keys.extend(strings);
        keys.extend(symbols);
        keys
    }

    /// Array-index keys at or above `from`, highest first.
    pub fn index_keys_from(&self, from: u32) -> Vec<u32> {
        let mut found: Vec<u32> = self
            .entries
            .keys()
            .filter_map(PropertyKey::as_array_index)
            .filter(|i| *i >= from)
            .collect();
        found.sort_unstable_by(|a, b| b.cmp(a));
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_index_detection() {
        assert_eq!(PropertyKey::from("0").as_array_index(), Some(0));
        assert_eq!(PropertyKey::from("42").as_array_index(), Some(42));
        assert_eq!(PropertyKey::from("01").as_array_index(), None);
        assert_eq!(PropertyKey::from("-1").as_array_index(), None);
        assert_eq!(PropertyKey::from("4294967294").as_array_index(), Some(4_294_967_294));
        assert_eq!(PropertyKey::from("4294967295").as_array_index(), None);
        assert_eq!(PropertyKey::from("1.5").as_array_index(), None);
    }

    #[test]
    fn keys_partition_indices_first() {
        let mut map = PropertyMap::default();
        let sym = JsSymbol::new(None);
        map.insert(PropertyKey::Symbol(sym.clone()), Property::data(JsValue::Null, true, true, true));
        for k in ["2", "a", "0", "b", "1"] {
            map.insert(k.into(), Property::data(JsValue::Null, true, true, true));
        }
        let keys = map.ordered_keys();
        let rendered: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        assert_eq!(rendered[..5], ["0", "1", "2", "a", "b"]);
        assert_eq!(keys[5], PropertyKey::Symbol(sym));
    }

    #[test]
    fn removal_keeps_relative_order() {
        let mut map = PropertyMap::default();
        for k in ["x", "y", "z"] {
            map.insert(k.into(), Property::data(JsValue::Null, true, true, true));
        }
        map.remove(&"y".into());
        map.insert("y".into(), Property::data(JsValue::Null, true, true, true));
        let rendered: Vec<String> = map.ordered_keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(rendered, ["x", "z", "y"]);
    }

    #[test]
    fn descriptor_classification() {
        let d = PropertyDescriptor::data(JsValue::Null, true, false, false);
        assert!(d.is_data_descriptor());
        assert!(!d.is_accessor_descriptor());
        let g = PropertyDescriptor::default();
        assert!(g.is_generic_descriptor());
        let a = PropertyDescriptor::accessor(None, None, false, true);
        assert!(a.is_accessor_descriptor());
    }
}
