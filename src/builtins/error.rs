//! §20.5 Error objects and the NativeError constructors.

use std::rc::Rc;

use crate::abstract_ops::conversion::to_string;
use crate::abstract_ops::{get, has_property, ordinary_create_from_constructor};
use crate::builtins::{arg, builtin_in_realm, define_constant, define_method, define_value, plain_object};
use crate::completion::Completion;
use crate::engine::{Agent, ErrorKind, IntrinsicId, Message, Realm};
use crate::evaluator::coroutine::capture_stack;
use crate::object::{JsObject, NativeFn, ObjectKind, PropertyKey};
use crate::types::{JsString, JsValue};

const NATIVE_ERRORS: [ErrorKind; 6] = [
    ErrorKind::Eval,
    ErrorKind::Range,
    ErrorKind::Reference,
    ErrorKind::Syntax,
    ErrorKind::Type,
    ErrorKind::Uri,
];

pub(super) fn init(realm: &Realm) {
    let proto = plain_object(realm);
    define_method(realm, &proto, "toString", 0, error_to_string);
    let error = install(realm, ErrorKind::Error, proto, None);

    for kind in NATIVE_ERRORS {
        let proto = JsObject::ordinary(Some(realm.intrinsic(IntrinsicId::ErrorPrototype)));
        install(realm, kind, proto, Some(error.clone()));
    }
}

fn install(realm: &Realm, kind: ErrorKind, proto: JsObject, parent: Option<JsObject>) -> JsObject {
    define_value(&proto, "message", JsValue::from_str(""));
    define_value(&proto, "name", JsValue::from_str(kind.name()));
    let behaviour: NativeFn = Rc::new(move |agent, _this, args, new_target| construct_error(agent, kind, args, new_target));
    let ctor = builtin_in_realm(realm, behaviour, 1, &PropertyKey::from(kind.name()), None, parent, true);
    define_constant(&ctor, "prototype", JsValue::Object(proto.clone()));
    define_value(&proto, "constructor", JsValue::Object(ctor.clone()));
    realm.set_intrinsic(kind.prototype(), proto);
    realm.set_intrinsic(kind.constructor(), ctor.clone());
    ctor
}

// §20.5.1.1 Error ( message [ , options ] ) and §20.5.6.1.1 NativeError
fn construct_error(agent: &Agent, kind: ErrorKind, args: &[JsValue], new_target: Option<&JsObject>) -> Completion {
    let new_target = match new_target {
        Some(nt) => nt.clone(),
        None => agent
            .active_function_object()
            .unwrap_or_else(|| agent.intrinsic(kind.constructor())),
    };
    let o = q!(ordinary_create_from_constructor(agent, &new_target, kind.prototype(), ObjectKind::Error));
    let message = arg(args, 0);
    if !message.is_undefined() {
        let msg = q!(to_string(agent, &message));
        define_value(&o, "message", JsValue::String(msg));
    }
    q!(install_error_cause(agent, &o, &arg(args, 1)));
    capture_stack(agent, &o);
    Completion::Normal(JsValue::Object(o))
}

// §20.5.8.1 InstallErrorCause
fn install_error_cause(agent: &Agent, o: &JsObject, options: &JsValue) -> Completion<()> {
    let JsValue::Object(options) = options else {
        return Completion::Normal(());
    };
    let key = PropertyKey::from("cause");
    if q!(has_property(agent, options, &key)) {
        let cause = q!(get(agent, options, &key));
        define_value(o, "cause", cause);
    }
    Completion::Normal(())
}

// §20.5.3.4 Error.prototype.toString
fn error_to_string(agent: &Agent, this: &JsValue, _args: &[JsValue]) -> Completion {
    let JsValue::Object(o) = this else {
        return agent.throw(ErrorKind::Type, Message::NotAnObject(agent.inspect(this)));
    };
    let name = match q!(get(agent, o, &PropertyKey::from("name"))) {
        JsValue::Undefined => JsString::from_str("Error"),
        other => q!(to_string(agent, &other)),
    };
    let msg = match q!(get(agent, o, &PropertyKey::from("message"))) {
        JsValue::Undefined => JsString::empty(),
        other => q!(to_string(agent, &other)),
    };
    if name.is_empty() {
        return Completion::Normal(JsValue::String(msg));
    }
    if msg.is_empty() {
        return Completion::Normal(JsValue::String(name));
    }
    Completion::Normal(JsValue::String(name.concat(&JsString::from_str(": ")).concat(&msg)))
}

#[cfg(test)]
mod tests {
    use crate::evaluator::test_support::eval_to_string;

    #[test]
    fn errors_render_name_and_message() {
        assert_eq!(eval_to_string("String(new Error('boom'))"), "Error: boom");
        assert_eq!(eval_to_string("String(new TypeError())"), "TypeError");
        assert_eq!(eval_to_string("var e = new RangeError('r'); e.name = ''; String(e)"), "r");
        assert_eq!(eval_to_string("String(URIError('u'))"), "URIError: u");
    }

    #[test]
    fn native_errors_inherit_from_error() {
        assert_eq!(eval_to_string("new SyntaxError('s') instanceof Error"), "true");
        assert_eq!(eval_to_string("Object.getPrototypeOf(EvalError) === Error"), "true");
        assert_eq!(eval_to_string("Object.prototype.hasOwnProperty.call(new Error(), 'message')"), "false");
        assert_eq!(eval_to_string("Object.prototype.toString.call(new TypeError())"), "[object Error]");
    }

    #[test]
    fn errors_carry_cause_and_stack() {
        assert_eq!(eval_to_string("new Error('x', { cause: 42 }).cause"), "42");
        assert_eq!(eval_to_string("'cause' in new Error('x', {})"), "false");
        assert_eq!(eval_to_string("typeof new Error('x').stack"), "string");
        assert_eq!(eval_to_string("new Error('x').propertyIsEnumerable('stack')"), "false");
    }

    #[test]
    fn engine_errors_are_instances_of_the_realm_constructors() {
        assert_eq!(eval_to_string("try { null.x; } catch (e) { e instanceof TypeError }"), "true");
        assert_eq!(eval_to_string("try { undefinedName; } catch (e) { e.name + ':' + e.message }"), "ReferenceError:undefinedName is not defined");
    }

    #[test]
    fn subclassing_error_keeps_the_subclass_prototype() {
        assert_eq!(
            eval_to_string("class MyError extends Error { constructor(m) { super(m); this.name = 'MyError'; } } String(new MyError('mine'))"),
            "MyError: mine"
        );
    }
}
