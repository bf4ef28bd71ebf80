//! Objects and their internal methods.
//!
//! Every object is a shared `JsObject` handle over an `ObjectData` record. The
//! `kind` tag selects which internal methods are overridden: ordinary objects
//! use the default algorithms in [`ordinary`], exotic kinds (Array, String,
//! Arguments, Proxy, module namespaces) route specific methods to their own
//! modules.

pub mod arguments;
pub mod array;
pub mod bound;
pub mod function;
pub mod namespace;
pub mod ordinary;
pub mod property;
pub mod proxy;
pub mod string;

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

pub use function::{BuiltinFunction, FunctionData, NativeFn};
pub use property::{Property, PropertyDescriptor, PropertyKey, PropertyMap, PropertySlot};

use crate::builtins::collections::{CollectionIteratorState, MapData, SetData};
use crate::builtins::iterators::{ArrayIteratorState, ForInIteratorState, StringIteratorState};
use crate::builtins::promise::PromiseData;
use crate::builtins::regexp::RegExpData;
use crate::completion::Completion;
use crate::engine::Agent;
use crate::evaluator::coroutine::{AsyncGeneratorData, GeneratorData};
use crate::abstract_ops::iterator::IteratorRecord;
use crate::types::{JsBigInt, JsString, JsSymbol, JsValue};

use arguments::ArgumentsMap;
use bound::BoundFunctionData;
use namespace::NamespaceData;
use proxy::ProxyData;

pub struct ObjectData {
    pub prototype: Option<JsObject>,
    pub extensible: bool,
    pub properties: PropertyMap,
    pub kind: ObjectKind,
}

pub enum ObjectKind {
    Ordinary,
    Array,
    String(JsString),
    Arguments(ArgumentsMap),
    Proxy(ProxyData),
    BoundFunction(BoundFunctionData),
    Namespace(NamespaceData),
    Function(Rc<FunctionData>),
    Builtin(BuiltinFunction),
    Error,
    Boolean(bool),
    Number(f64),
    Symbol(JsSymbol),
    BigInt(JsBigInt),
    Promise(PromiseData),
    Map(MapData),
    Set(SetData),
    Generator(GeneratorData),
    AsyncGenerator(AsyncGeneratorData),
    ArrayIterator(ArrayIteratorState),
    StringIterator(StringIteratorState),
    MapIterator(CollectionIteratorState),
    SetIterator(CollectionIteratorState),
    ForInIterator(ForInIteratorState),
    AsyncFromSyncIterator(IteratorRecord),
    RegExp(RegExpData),
}

#[derive(Clone)]
pub struct JsObject(Rc<RefCell<ObjectData>>);

impl JsObject {
    pub fn new(prototype: Option<JsObject>, kind: ObjectKind) -> Self {
        JsObject(Rc::new(RefCell::new(ObjectData {
            prototype,
            extensible: true,
            properties: PropertyMap::default(),
            kind,
        })))
    }

    // §10.1.12 OrdinaryObjectCreate
    pub fn ordinary(prototype: Option<JsObject>) -> Self {
        JsObject::new(prototype, ObjectKind::Ordinary)
    }

    pub fn borrow(&self) -> Ref<'_, ObjectData> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, ObjectData> {
        self.0.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &JsObject) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Stable identity, usable as a map key while the object is alive.
    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub fn is_callable(&self) -> bool {
        match &self.borrow().kind {
            ObjectKind::Function(_) | ObjectKind::Builtin(_) | ObjectKind::BoundFunction(_) => true,
            ObjectKind::Proxy(p) => p.callable,
            _ => false,
        }
    }

    pub fn is_constructor(&self) -> bool {
        match &self.borrow().kind {
            ObjectKind::Function(f) => f.is_constructor(),
            ObjectKind::Builtin(b) => b.constructor,
            ObjectKind::BoundFunction(b) => b.target.is_constructor(),
            ObjectKind::Proxy(p) => p.constructor,
            _ => false,
        }
    }

    pub fn is_array_exotic(&self) -> bool {
        matches!(self.borrow().kind, ObjectKind::Array)
    }

    pub fn is_proxy(&self) -> bool {
        matches!(self.borrow().kind, ObjectKind::Proxy(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self.borrow().kind, ObjectKind::Error)
    }

    pub fn function_data(&self) -> Option<Rc<FunctionData>> {
        match &self.borrow().kind {
            ObjectKind::Function(f) => Some(f.clone()),
            _ => None,
        }
    }

    fn proxy_data(&self) -> Option<ProxyData> {
        match &self.borrow().kind {
            ObjectKind::Proxy(p) => Some(p.clone()),
            _ => None,
        }
    }

    /// Own data property lookup without invoking any exotic behaviour. Used by
    /// intrinsic setup and host inspection.
    pub fn own_data_value(&self, key: &PropertyKey) -> Option<JsValue> {
        match self.borrow().properties.get(key) {
            Some(Property {
                slot: PropertySlot::Data { value, .. },
                ..
            }) => Some(value.clone()),
            _ => None,
        }
    }

    /// Direct definition used while building fresh objects whose shape is
    /// known to accept it.
    pub fn insert_property(&self, key: impl Into<PropertyKey>, property: Property) {
        self.borrow_mut().properties.insert(key.into(), property);
    }

    // §10.1.1 [[GetPrototypeOf]]
    pub fn get_prototype_of(&self, agent: &Agent) -> Completion<Option<JsObject>> {
        if let Some(p) = self.proxy_data() {
            return proxy::get_prototype_of(agent, &p);
        }
        Completion::Normal(self.borrow().prototype.clone())
    }

    // §10.1.2 [[SetPrototypeOf]]
    pub fn set_prototype_of(&self, agent: &Agent, proto: Option<JsObject>) -> Completion<bool> {
        if let Some(p) = self.proxy_data() {
            return proxy::set_prototype_of(agent, &p, proto);
        }
        if matches!(self.borrow().kind, ObjectKind::Namespace(_)) {
            return Completion::Normal(proto.is_none());
        }
        Completion::Normal(ordinary::ordinary_set_prototype_of(self, proto))
    }

    // §10.1.3 [[IsExtensible]]
    pub fn is_extensible(&self, agent: &Agent) -> Completion<bool> {
        if let Some(p) = self.proxy_data() {
            return proxy::is_extensible(agent, &p);
        }
        Completion::Normal(self.borrow().extensible)
    }

    // §10.1.4 [[PreventExtensions]]
    pub fn prevent_extensions(&self, agent: &Agent) -> Completion<bool> {
        if let Some(p) = self.proxy_data() {
            return proxy::prevent_extensions(agent, &p);
        }
        self.borrow_mut().extensible = false;
        Completion::Normal(true)
    }

    // §10.1.5 [[GetOwnProperty]]
    pub fn get_own_property(
        &self,
        agent: &Agent,
        key: &PropertyKey,
    ) -> Completion<Option<PropertyDescriptor>> {
        enum Route {
            Ordinary,
            String,
            Arguments,
            Namespace,
            Proxy(ProxyData),
        }
        let route = match &self.borrow().kind {
            ObjectKind::String(_) => Route::String,
            ObjectKind::Arguments(_) => Route::Arguments,
            ObjectKind::Namespace(_) => Route::Namespace,
            ObjectKind::Proxy(p) => Route::Proxy(p.clone()),
            _ => Route::Ordinary,
        };
        match route {
            Route::Ordinary => Completion::Normal(ordinary::ordinary_get_own_property(self, key)),
            Route::String => Completion::Normal(string::get_own_property(self, key)),
            Route::Arguments => Completion::Normal(arguments::get_own_property(agent, self, key)),
            Route::Namespace => namespace::get_own_property(agent, self, key),
            Route::Proxy(p) => proxy::get_own_property(agent, &p, key),
        }
    }

    // §10.1.6 [[DefineOwnProperty]]
    pub fn define_own_property(
        &self,
        agent: &Agent,
        key: PropertyKey,
        desc: PropertyDescriptor,
    ) -> Completion<bool> {
        enum Route {
            Ordinary,
            Array,
            String,
            Arguments,
            Namespace,
            Proxy(ProxyData),
        }
        let route = match &self.borrow().kind {
            ObjectKind::Array => Route::Array,
            ObjectKind::String(_) => Route::String,
            ObjectKind::Arguments(_) => Route::Arguments,
            ObjectKind::Namespace(_) => Route::Namespace,
            ObjectKind::Proxy(p) => Route::Proxy(p.clone()),
            _ => Route::Ordinary,
        };
        match route {
            Route::Ordinary => ordinary::ordinary_define_own_property(agent, self, key, desc),
            Route::Array => array::define_own_property(agent, self, key, desc),
            Route::String => string::define_own_property(agent, self, key, desc),
            Route::Arguments => arguments::define_own_property(agent, self, key, desc),
            Route::Namespace => namespace::define_own_property(agent, self, key, desc),
            Route::Proxy(p) => proxy::define_own_property(agent, &p, key, desc),
        }
    }

    // §10.1.7 [[HasProperty]]
    pub fn has_property(&self, agent: &Agent, key: &PropertyKey) -> Completion<bool> {
        if let Some(p) = self.proxy_data() {
            return proxy::has_property(agent, &p, key);
        }
        if matches!(self.borrow().kind, ObjectKind::Namespace(_)) {
            return Completion::Normal(namespace::has_property(self, key));
        }
        ordinary::ordinary_has_property(agent, self, key)
    }

    // §10.1.8 [[Get]]
    pub fn get(&self, agent: &Agent, key: &PropertyKey, receiver: &JsValue) -> Completion {
        enum Route {
            Ordinary,
            Arguments,
            Namespace,
            Proxy(ProxyData),
        }
        let route = match &self.borrow().kind {
            ObjectKind::Arguments(_) => Route::Arguments,
            ObjectKind::Namespace(_) => Route::Namespace,
            ObjectKind::Proxy(p) => Route::Proxy(p.clone()),
            _ => Route::Ordinary,
        };
        match route {
            Route::Ordinary => ordinary::ordinary_get(agent, self, key, receiver),
            Route::Arguments => arguments::get(agent, self, key, receiver),
            Route::Namespace => namespace::get(agent, self, key),
            Route::Proxy(p) => proxy::get(agent, &p, key, receiver),
        }
    }

    // §10.1.9 [[Set]]
    pub fn set(
        &self,
        agent: &Agent,
        key: PropertyKey,
        value: JsValue,
        receiver: &JsValue,
    ) -> Completion<bool> {
        enum Route {
            Ordinary,
            Arguments,
            Namespace,
            Proxy(ProxyData),
        }
        let route = match &self.borrow().kind {
            ObjectKind::Arguments(_) => Route::Arguments,
            ObjectKind::Namespace(_) => Route::Namespace,
            ObjectKind::Proxy(p) => Route::Proxy(p.clone()),
            _ => Route::Ordinary,
        };
        match route {
            Route::Ordinary => ordinary::ordinary_set(agent, self, key, value, receiver),
            Route::Arguments => arguments::set(agent, self, key, value, receiver),
            Route::Namespace => Completion::Normal(false),
            Route::Proxy(p) => proxy::set(agent, &p, key, value, receiver),
        }
    }

    // §10.1.10 [[Delete]]
    pub fn delete(&self, agent: &Agent, key: &PropertyKey) -> Completion<bool> {
        enum Route {
            Ordinary,
            Arguments,
            Namespace,
            Proxy(ProxyData),
        }
        let route = match &self.borrow().kind {
            ObjectKind::Arguments(_) => Route::Arguments,
            ObjectKind::Namespace(_) => Route::Namespace,
            ObjectKind::Proxy(p) => Route::Proxy(p.clone()),
            _ => Route::Ordinary,
        };
        match route {
            Route::Ordinary => ordinary::ordinary_delete(agent, self, key),
            Route::Arguments => arguments::delete(agent, self, key),
            Route::Namespace => Completion::Normal(!namespace::has_property(self, key)),
            Route::Proxy(p) => proxy::delete(agent, &p, key),
        }
    }

    // §10.1.11 [[OwnPropertyKeys]]
    pub fn own_property_keys(&self, agent: &Agent) -> Completion<Vec<PropertyKey>> {
        if let Some(p) = self.proxy_data() {
            return proxy::own_property_keys(agent, &p);
        }
        if let ObjectKind::String(s) = &self.borrow().kind {
            return Completion::Normal(string::own_property_keys(self, s.len()));
        }
        if let ObjectKind::Namespace(ns) = &self.borrow().kind {
            return Completion::Normal(namespace::own_property_keys(self, ns));
        }
        Completion::Normal(self.borrow().properties.ordered_keys())
    }

    /// Short name of the object's class, for diagnostics only.
    pub fn class_name(&self) -> &'static str {
        match &self.borrow().kind {
            ObjectKind::Ordinary => "Object",
            ObjectKind::Array => "Array",
            ObjectKind::String(_) => "String",
            ObjectKind::Arguments(_) => "Arguments",
            ObjectKind::Proxy(_) => "Proxy",
            ObjectKind::BoundFunction(_) | ObjectKind::Function(_) | ObjectKind::Builtin(_) => {
                "Function"
            }
            ObjectKind::Namespace(_) => "Module",
            ObjectKind::Error => "Error",
            ObjectKind::Boolean(_) => "Boolean",
            ObjectKind::Number(_) => "Number",
            ObjectKind::Symbol(_) => "Symbol",
            ObjectKind::BigInt(_) => "BigInt",
            ObjectKind::Promise(_) => "Promise",
            ObjectKind::Map(_) => "Map",
            ObjectKind::Set(_) => "Set",
            ObjectKind::Generator(_) => "Generator",
            ObjectKind::AsyncGenerator(_) => "AsyncGenerator",
            ObjectKind::ArrayIterator(_) => "Array Iterator",
            ObjectKind::StringIterator(_) => "String Iterator",
            ObjectKind::MapIterator(_) => "Map Iterator",
            ObjectKind::SetIterator(_) => "Set Iterator",
            ObjectKind::ForInIterator(_) => "Object",
            ObjectKind::AsyncFromSyncIterator(_) => "Async-from-Sync Iterator",
            ObjectKind::RegExp(_) => "RegExp",
        }
    }
}

impl fmt::Debug for JsObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(_) => write!(f, "[object {}]", self.class_name()),
            Err(_) => write!(f, "[object]"),
        }
    }
}

impl PartialEq for JsObject {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for JsObject {}
