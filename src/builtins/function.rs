//! §20.2 Function objects, %ThrowTypeError% and the constructors of the
//! generator and async function kinds (§27.3, §27.4, §27.7).

use std::rc::Rc;

use crate::abstract_ops::conversion::to_integer_or_infinity;
use crate::abstract_ops::{ListElementTypes, call, create_list_from_array_like, get, has_own_property, ordinary_has_instance};
use crate::builtins::{Constructor, arg, builtin_in_realm, define_constant, define_method, define_tag, method_in_realm};
use crate::completion::Completion;
use crate::engine::{Agent, ErrorKind, IntrinsicId, Message, Realm, host_has_source_text_available};
use crate::evaluator::eval::{DynamicFunctionKind, create_dynamic_function};
use crate::object::bound::bound_function_create;
use crate::object::function::set_function_name;
use crate::object::{JsObject, NativeFn, ObjectKind, Property, PropertyDescriptor, PropertyKey};
use crate::types::{JsValue, WellKnownSymbol};

pub(super) fn init(realm: &Realm) {
    let thrower = method_in_realm(realm, "", 0, |agent, _, _| {
        agent.throw(ErrorKind::Type, Message::RestrictedProperty)
    });
    define_constant(&thrower, "length", JsValue::Number(0.0));
    define_constant(&thrower, "name", JsValue::from_str(""));
    thrower.borrow_mut().extensible = false;
    realm.set_intrinsic(IntrinsicId::ThrowTypeError, thrower.clone());

    let proto = realm.intrinsic(IntrinsicId::FunctionPrototype);
    define_method(realm, &proto, "apply", 2, function_apply);
    define_method(realm, &proto, "bind", 1, function_bind);
    define_method(realm, &proto, "call", 1, function_call);
    define_method(realm, &proto, "toString", 0, function_to_string);
    let has_instance = method_in_realm(
        realm,
        PropertyKey::symbol(WellKnownSymbol::HasInstance),
        1,
        |agent, this, args| ordinary_has_instance(agent, this, &arg(args, 0)).map(JsValue::Boolean),
    );
    define_constant(&proto, PropertyKey::symbol(WellKnownSymbol::HasInstance), JsValue::Object(has_instance));
    // §10.2.4 AddRestrictedFunctionProperties
    for name in ["caller", "arguments"] {
        proto.insert_property(
            name,
            PropertyDescriptor::accessor(Some(thrower.clone()), Some(thrower.clone()), false, true).into_property(),
        );
    }

    let ctor = dynamic_constructor(realm, "Function", function_constructor, &proto, None);
    realm.set_intrinsic(IntrinsicId::Function, ctor);
}

/// GeneratorFunction, AsyncGeneratorFunction and AsyncFunction with their
/// prototype objects. Runs after the iterator prototypes exist.
pub(super) fn init_generator_functions(realm: &Realm) {
    let function = realm.intrinsic(IntrinsicId::Function);
    let function_proto = realm.intrinsic(IntrinsicId::FunctionPrototype);

    let kinds: [(&str, Constructor, IntrinsicId, IntrinsicId, Option<IntrinsicId>, &str); 3] = [
        (
            "GeneratorFunction",
            generator_function_constructor,
            IntrinsicId::GeneratorFunction,
            IntrinsicId::Generator,
            Some(IntrinsicId::GeneratorPrototype),
            "GeneratorFunction",
        ),
        (
            "AsyncGeneratorFunction",
            async_generator_function_constructor,
            IntrinsicId::AsyncGeneratorFunction,
            IntrinsicId::AsyncGenerator,
            Some(IntrinsicId::AsyncGeneratorPrototype),
            "AsyncGeneratorFunction",
        ),
        (
            "AsyncFunction",
            async_function_constructor,
            IntrinsicId::AsyncFunction,
            IntrinsicId::AsyncFunctionPrototype,
            None,
            "AsyncFunction",
        ),
    ];
    for (name, body, ctor_id, proto_id, instance_proto, tag) in kinds {
        let proto = JsObject::ordinary(Some(function_proto.clone()));
        define_tag(&proto, tag);
        if let Some(instance_proto) = instance_proto {
            let instance_proto = realm.intrinsic(instance_proto);
            proto.insert_property(
                "prototype",
                Property::data(JsValue::Object(instance_proto.clone()), false, false, true),
            );
            instance_proto.insert_property(
                "constructor",
                Property::data(JsValue::Object(proto.clone()), false, false, true),
            );
        }
        let ctor = dynamic_constructor(realm, name, body, &proto, Some(function.clone()));
        realm.set_intrinsic(proto_id, proto);
        realm.set_intrinsic(ctor_id, ctor);
    }
}

/// A CreateDynamicFunction-backed constructor whose `prototype` link is
/// non-writable and non-configurable in both directions.
fn dynamic_constructor(
    realm: &Realm,
    name: &str,
    body: Constructor,
    prototype: &JsObject,
    parent: Option<JsObject>,
) -> JsObject {
    let behaviour: NativeFn = Rc::new(body);
    let ctor = builtin_in_realm(realm, behaviour, 1, &PropertyKey::from(name), None, parent, true);
    define_constant(&ctor, "prototype", JsValue::Object(prototype.clone()));
    let writable = name == "Function";
    prototype.insert_property(
        "constructor",
        Property::data(JsValue::Object(ctor.clone()), writable, false, true),
    );
    ctor
}

fn dynamic(
    agent: &Agent,
    args: &[JsValue],
    new_target: Option<&JsObject>,
    fallback: IntrinsicId,
    kind: DynamicFunctionKind,
) -> Completion {
    let constructor = agent.active_function_object().unwrap_or_else(|| agent.intrinsic(fallback));
    create_dynamic_function(agent, &constructor, new_target, kind, args).map(JsValue::Object)
}

// §20.2.1.1 Function ( ...parameterArgs, bodyArg )
fn function_constructor(agent: &Agent, _this: &JsValue, args: &[JsValue], new_target: Option<&JsObject>) -> Completion {
    dynamic(agent, args, new_target, IntrinsicId::Function, DynamicFunctionKind::Normal)
}

fn generator_function_constructor(
    agent: &Agent,
    _this: &JsValue,
    args: &[JsValue],
    new_target: Option<&JsObject>,
) -> Completion {
    dynamic(agent, args, new_target, IntrinsicId::GeneratorFunction, DynamicFunctionKind::Generator)
}

fn async_generator_function_constructor(
    agent: &Agent,
    _this: &JsValue,
    args: &[JsValue],
    new_target: Option<&JsObject>,
) -> Completion {
    dynamic(
        agent,
        args,
        new_target,
        IntrinsicId::AsyncGeneratorFunction,
        DynamicFunctionKind::AsyncGenerator,
    )
}

fn async_function_constructor(
    agent: &Agent,
    _this: &JsValue,
    args: &[JsValue],
    new_target: Option<&JsObject>,
) -> Completion {
    dynamic(agent, args, new_target, IntrinsicId::AsyncFunction, DynamicFunctionKind::Async)
}

fn require_callable(agent: &Agent, this: &JsValue) -> Completion<()> {
    if !this.is_callable() {
        return agent.throw(ErrorKind::Type, Message::NotAFunction(agent.inspect(this)));
    }
    Completion::Normal(())
}

// §20.2.3.1 Function.prototype.apply
fn function_apply(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    q!(require_callable(agent, this));
    let arg_array = arg(args, 1);
    if arg_array.is_nullish() {
        return call(agent, this, &arg(args, 0), &[]);
    }
    let list = q!(create_list_from_array_like(agent, &arg_array, ListElementTypes::All));
    call(agent, this, &arg(args, 0), &list)
}

// §20.2.3.2 Function.prototype.bind
fn function_bind(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let JsValue::Object(target) = this else {
        return agent.throw(ErrorKind::Type, Message::NotAFunction(agent.inspect(this)));
    };
    q!(require_callable(agent, this));
    let bound_args = args.get(1..).unwrap_or_default().to_vec();
    let arg_count = bound_args.len() as f64;
    let f = q!(bound_function_create(agent, target, arg(args, 0), bound_args));

    let mut length = 0.0;
    if q!(has_own_property(agent, target, &PropertyKey::from("length"))) {
        if let JsValue::Number(target_len) = q!(get(agent, target, &PropertyKey::from("length"))) {
            length = if target_len == f64::INFINITY {
                f64::INFINITY
            } else if target_len == f64::NEG_INFINITY {
                0.0
            } else {
                let target_len = q!(to_integer_or_infinity(agent, &JsValue::Number(target_len)));
                (target_len - arg_count).max(0.0)
            };
        }
    }
    f.insert_property("length", Property::data(JsValue::Number(length), false, false, true));

    let target_name = match q!(get(agent, target, &PropertyKey::from("name"))) {
        JsValue::String(s) => s,
        _ => crate::types::JsString::empty(),
    };
    set_function_name(&f, &PropertyKey::from(target_name), Some("bound"));
    Completion::Normal(JsValue::Object(f))
}

// §20.2.3.3 Function.prototype.call
fn function_call(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    q!(require_callable(agent, this));
    call(agent, this, &arg(args, 0), args.get(1..).unwrap_or_default())
}

// §20.2.3.5 Function.prototype.toString
fn function_to_string(agent: &Agent, this: &JsValue, _args: &[JsValue]) -> Completion {
    let JsValue::Object(f) = this else {
        return agent.throw(ErrorKind::Type, Message::NotATypeObject(agent.inspect(this), "Function"));
    };
    if let Some(data) = f.function_data() {
        if host_has_source_text_available(agent, f) {
            return Completion::Normal(JsValue::from_str(&data.node.source_text));
        }
    }
    if !f.is_callable() {
        return agent.throw(ErrorKind::Type, Message::NotATypeObject(agent.inspect(this), "Function"));
    }
    let name = match &f.borrow().kind {
        ObjectKind::Builtin(_) | ObjectKind::Function(_) => match f.own_data_value(&PropertyKey::from("name")) {
            Some(JsValue::String(s)) => s.to_rust_string(),
            _ => String::new(),
        },
        _ => String::new(),
    };
    Completion::Normal(JsValue::from_str(&format!("function {name}() {{ [native code] }}")))
}

#[cfg(test)]
mod tests {
    use crate::evaluator::test_support::{eval_after_jobs, eval_to_string};

    #[test]
    fn call_apply_and_bind_forward_this_and_arguments() {
        assert_eq!(eval_to_string("function f(a, b) { return this.x + a + b; } f.call({ x: 1 }, 2, 3)"), "6");
        assert_eq!(eval_to_string("function f(a, b) { return this.x + a + b; } f.apply({ x: 1 }, [2, 3])"), "6");
        assert_eq!(eval_to_string("Math.max.apply(null, null)"), "-Infinity");
        assert_eq!(
            eval_to_string("function f(a, b, c) { return [this.x, a, b, c].join(); } var g = f.bind({ x: 0 }, 1); g(2, 3)"),
            "0,1,2,3"
        );
    }

    #[test]
    fn bound_functions_derive_name_and_length() {
        assert_eq!(eval_to_string("function add(a, b, c) {} var b = add.bind(null, 1); b.name + b.length"), "bound add2");
        assert_eq!(eval_to_string("function P(x) { this.x = x; } var B = P.bind(null, 5); new B().x"), "5");
        assert_eq!(eval_to_string("function P() {} var B = P.bind(); new B() instanceof P"), "true");
    }

    #[test]
    fn to_string_returns_source_text_or_native_code() {
        assert_eq!(eval_to_string("(function foo(a) { return a; }).toString()"), "function foo(a) { return a; }");
        assert_eq!(eval_to_string("Array.prototype.push.toString()"), "function push() { [native code] }");
        assert!(eval_to_string("Function.prototype.toString.call({})").starts_with("Throw: TypeError"));
    }

    #[test]
    fn restricted_properties_throw() {
        assert!(eval_to_string("(function () {}).caller").starts_with("Throw: TypeError"));
        assert_eq!(
            eval_to_string("var d = Object.getOwnPropertyDescriptor(Function.prototype, 'caller'); d.get === d.set"),
            "true"
        );
    }

    #[test]
    fn generator_and_async_function_constructors() {
        assert_eq!(eval_to_string("var G = Object.getPrototypeOf(function* () {}).constructor; G('yield 1; yield 2')().next().value"), "1");
        assert_eq!(
            eval_to_string("Object.getPrototypeOf(function* () {}) === Object.getPrototypeOf(function* () {}).constructor.prototype"),
            "true"
        );
        assert_eq!(
            eval_after_jobs(
                "var out; var A = Object.getPrototypeOf(async function () {}).constructor; A('a', 'return await a')(4).then(v => out = v);",
                "out"
            ),
            "4"
        );
    }

    #[test]
    fn has_instance_is_not_writable() {
        assert_eq!(
            eval_to_string("Object.getOwnPropertyDescriptor(Function.prototype, Symbol.hasInstance).writable"),
            "false"
        );
        assert_eq!(eval_to_string("Function.prototype[Symbol.hasInstance].call(Array, [])"), "true");
    }
}
