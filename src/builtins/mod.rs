//! The built-in objects of a realm.
//!
//! Each submodule builds one family of intrinsics into a realm during
//! CreateIntrinsics. SetDefaultGlobalBindings then exposes them as
//! properties of the global object. Built-ins are plain functions wrapped in
//! `NativeFn` closures; the realm they are created in is captured explicitly
//! because intrinsics are built before any execution context exists.

pub mod array;
pub mod bigint;
pub mod collections;
pub mod error;
pub mod function;
pub mod global;
pub mod iterators;
pub mod json;
pub mod math;
pub mod number;
pub mod object;
pub mod promise;
pub mod reflect;
pub mod regexp;
pub mod string;
pub mod symbol;

use std::rc::Rc;

use tracing::debug;

use crate::abstract_ops::define_property_or_throw;
use crate::completion::Completion;
use crate::engine::{Agent, Feature, IntrinsicId, Realm};
use crate::environment::new_global_environment;
use crate::object::function::{set_function_length, set_function_name};
use crate::object::{BuiltinFunction, JsObject, NativeFn, ObjectKind, Property, PropertyDescriptor, PropertyKey};
use crate::types::{JsValue, WellKnownSymbol};

/// Body of a built-in method: `(agent, this, arguments)`.
pub type Method = fn(&Agent, &JsValue, &[JsValue]) -> Completion;

/// Body of a built-in constructor. `new_target` is `None` for [[Call]].
pub type Constructor = fn(&Agent, &JsValue, &[JsValue], Option<&JsObject>) -> Completion;

/// The argument at `index`, or `undefined` when fewer were passed.
pub fn arg(args: &[JsValue], index: usize) -> JsValue {
    args.get(index).cloned().unwrap_or(JsValue::Undefined)
}

// §10.3.4 CreateBuiltinFunction
pub fn create_builtin_function(
    agent: &Agent,
    behaviour: NativeFn,
    length: u32,
    name: PropertyKey,
    prototype: Option<JsObject>,
) -> JsObject {
    builtin_in_realm(&agent.current_realm(), behaviour, length, &name, None, prototype, false)
}

/// CreateBuiltinFunction over a closure, in the current realm.
pub fn builtin_function(
    agent: &Agent,
    name: &str,
    length: u32,
    behaviour: impl Fn(&Agent, &JsValue, &[JsValue], Option<&JsObject>) -> Completion + 'static,
) -> JsObject {
    create_builtin_function(agent, Rc::new(behaviour), length, PropertyKey::from(name), None)
}

pub(crate) fn builtin_in_realm(
    realm: &Realm,
    behaviour: NativeFn,
    length: u32,
    name: &PropertyKey,
    prefix: Option<&str>,
    prototype: Option<JsObject>,
    constructor: bool,
) -> JsObject {
    let prototype = prototype.unwrap_or_else(|| realm.intrinsic(IntrinsicId::FunctionPrototype));
    let f = JsObject::new(
        Some(prototype),
        ObjectKind::Builtin(BuiltinFunction {
            behaviour,
            realm: realm.clone(),
            constructor,
            awaiting: None,
        }),
    );
    set_function_length(&f, length);
    set_function_name(&f, name, prefix);
    f
}

/// A method-shaped built-in in `realm`.
pub(crate) fn method_in_realm(realm: &Realm, name: impl Into<PropertyKey>, length: u32, body: Method) -> JsObject {
    let behaviour: NativeFn = Rc::new(move |agent, this, args, _new_target| body(agent, this, args));
    builtin_in_realm(realm, behaviour, length, &name.into(), None, None, false)
}

/// Installs a writable, non-enumerable, configurable method on `target`.
pub(crate) fn define_method(
    realm: &Realm,
    target: &JsObject,
    name: impl Into<PropertyKey>,
    length: u32,
    body: Method,
) -> JsObject {
    let key = name.into();
    let f = method_in_realm(realm, key.clone(), length, body);
    target.insert_property(key, Property::data(JsValue::Object(f.clone()), true, false, true));
    f
}

/// Installs a configurable accessor with only a getter.
pub(crate) fn define_getter(realm: &Realm, target: &JsObject, name: impl Into<PropertyKey>, body: Method) {
    let key = name.into();
    let behaviour: NativeFn = Rc::new(move |agent, this, args, _new_target| body(agent, this, args));
    let getter = builtin_in_realm(realm, behaviour, 0, &key, Some("get"), None, false);
    target.insert_property(
        key,
        PropertyDescriptor::accessor(Some(getter), None, false, true).into_property(),
    );
}

/// A non-writable, non-enumerable, non-configurable value.
pub(crate) fn define_constant(target: &JsObject, name: impl Into<PropertyKey>, value: JsValue) {
    target.insert_property(name, Property::data(value, false, false, false));
}

/// A writable, non-enumerable, configurable value.
pub(crate) fn define_value(target: &JsObject, name: impl Into<PropertyKey>, value: JsValue) {
    target.insert_property(name, Property::data(value, true, false, true));
}

/// `@@toStringTag`, configurable only.
pub(crate) fn define_tag(target: &JsObject, tag: &str) {
    target.insert_property(
        PropertyKey::symbol(WellKnownSymbol::ToStringTag),
        Property::data(JsValue::from_str(tag), false, false, true),
    );
}

/// `get [Symbol.species]() { return this; }`
pub(crate) fn define_species(realm: &Realm, constructor: &JsObject) {
    define_getter(realm, constructor, PropertyKey::symbol(WellKnownSymbol::Species), |_, this, _| {
        Completion::Normal(this.clone())
    });
}

/// A constructor linked both ways with its prototype object.
pub(crate) fn define_constructor(
    realm: &Realm,
    name: &str,
    length: u32,
    body: Constructor,
    prototype: &JsObject,
) -> JsObject {
    let behaviour: NativeFn = Rc::new(body);
    let ctor = builtin_in_realm(realm, behaviour, length, &PropertyKey::from(name), None, None, true);
    define_constant(&ctor, "prototype", JsValue::Object(prototype.clone()));
    define_value(prototype, "constructor", JsValue::Object(ctor.clone()));
    ctor
}

/// An ordinary object inheriting from `%Object.prototype%` of `realm`.
pub(crate) fn plain_object(realm: &Realm) -> JsObject {
    JsObject::ordinary(Some(realm.intrinsic(IntrinsicId::ObjectPrototype)))
}

// §9.3.2 CreateIntrinsics
pub fn create_intrinsics(agent: &Agent, realm: &Realm) {
    let object_prototype = JsObject::ordinary(None);
    realm.set_intrinsic(IntrinsicId::ObjectPrototype, object_prototype.clone());
    let function_prototype = JsObject::new(
        Some(object_prototype),
        ObjectKind::Builtin(BuiltinFunction {
            behaviour: Rc::new(|_, _, _, _| Completion::Normal(JsValue::Undefined)),
            realm: realm.clone(),
            constructor: false,
            awaiting: None,
        }),
    );
    set_function_length(&function_prototype, 0);
    set_function_name(&function_prototype, &PropertyKey::from(""), None);
    realm.set_intrinsic(IntrinsicId::FunctionPrototype, function_prototype);

    function::init(realm);
    object::init(realm);
    error::init(realm);
    symbol::init(realm);
    iterators::init(realm);
    array::init(realm);
    string::init(realm);
    global::init(realm);
    number::init(realm);
    bigint::init(realm);
    math::init(realm);
    json::init(realm);
    promise::init(realm);
    if agent.feature(Feature::PromiseAllSettled) {
        promise::init_all_settled(realm);
    }
    reflect::init(realm);
    collections::init(realm);
    regexp::init(realm);
    function::init_generator_functions(realm);
}

// §9.3.3 SetRealmGlobalObject
pub fn set_realm_global_object(
    _agent: &Agent,
    realm: &Realm,
    global: Option<JsObject>,
    this_value: Option<JsObject>,
) {
    let global = global.unwrap_or_else(|| plain_object(realm));
    let this_value = this_value.unwrap_or_else(|| global.clone());
    let env = new_global_environment(global.clone(), this_value);
    realm.set_global(global, env);
}

// §9.3.4 SetDefaultGlobalBindings
pub fn set_default_global_bindings(agent: &Agent, realm: &Realm) {
    let global = realm.global_object();
    let mut install = |name: &str, value: JsValue, writable: bool, configurable: bool| {
        let desc = PropertyDescriptor::data(value, writable, false, configurable);
        x!(define_property_or_throw(agent, &global, PropertyKey::from(name), desc));
    };

    if agent.feature(Feature::GlobalThis) {
        let this_value = x!(realm.global_env().get_this_binding(agent));
        install("globalThis", this_value, true, true);
    }
    install("Infinity", JsValue::Number(f64::INFINITY), false, false);
    install("NaN", JsValue::Number(f64::NAN), false, false);
    install("undefined", JsValue::Undefined, false, false);

    const BINDINGS: &[(&str, IntrinsicId)] = &[
        ("eval", IntrinsicId::Eval),
        ("isFinite", IntrinsicId::IsFinite),
        ("isNaN", IntrinsicId::IsNaN),
        ("parseFloat", IntrinsicId::ParseFloat),
        ("parseInt", IntrinsicId::ParseInt),
        ("Array", IntrinsicId::Array),
        ("BigInt", IntrinsicId::BigInt),
        ("Boolean", IntrinsicId::Boolean),
        ("Error", IntrinsicId::Error),
        ("EvalError", IntrinsicId::EvalError),
        ("Function", IntrinsicId::Function),
        ("Map", IntrinsicId::Map),
        ("Number", IntrinsicId::Number),
        ("Object", IntrinsicId::Object),
        ("Promise", IntrinsicId::Promise),
        ("Proxy", IntrinsicId::Proxy),
        ("RangeError", IntrinsicId::RangeError),
        ("ReferenceError", IntrinsicId::ReferenceError),
        ("RegExp", IntrinsicId::RegExp),
        ("Set", IntrinsicId::Set),
        ("String", IntrinsicId::String),
        ("Symbol", IntrinsicId::Symbol),
        ("SyntaxError", IntrinsicId::SyntaxError),
        ("TypeError", IntrinsicId::TypeError),
        ("URIError", IntrinsicId::UriError),
        ("JSON", IntrinsicId::Json),
        ("Math", IntrinsicId::Math),
        ("Reflect", IntrinsicId::Reflect),
    ];
    for (name, id) in BINDINGS {
        install(name, JsValue::Object(realm.intrinsic(*id)), true, true);
    }
    debug!(bindings = BINDINGS.len(), "global bindings installed");
}

#[cfg(test)]
mod tests {
    use crate::engine::{Agent, Feature, HostDefinedOptions};
    use crate::evaluator::evaluate_script;
    use crate::evaluator::test_support::eval_to_string;

    #[test]
    fn global_value_properties_are_locked() {
        assert_eq!(
            eval_to_string("var d = Object.getOwnPropertyDescriptor(this, 'NaN'); [d.writable, d.enumerable, d.configurable].join()"),
            "false,false,false"
        );
        assert_eq!(eval_to_string("undefined = 1; typeof undefined"), "undefined");
    }

    #[test]
    fn global_this_is_feature_gated() {
        assert_eq!(eval_to_string("typeof globalThis"), "undefined");
        let agent = Agent::new(HostDefinedOptions::default().with_feature(Feature::GlobalThis));
        agent.initialize_host_defined_realm();
        let result = evaluate_script(&agent, "globalThis === this && globalThis.Array === Array", None);
        assert!(matches!(result.unwrap_normal(), crate::types::JsValue::Boolean(true)));
    }

    #[test]
    fn built_in_functions_carry_length_then_name() {
        assert_eq!(eval_to_string("Object.getOwnPropertyNames(Array.prototype.push).join()"), "length,name");
        assert_eq!(eval_to_string("Array.prototype.push.length + ':' + Array.prototype.push.name"), "1:push");
        assert_eq!(
            eval_to_string("Object.getOwnPropertyDescriptor(Map.prototype, 'size').get.name"),
            "get size"
        );
    }
}
