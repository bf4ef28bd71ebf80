//! §28.1 The Reflect object and §28.2 Proxy objects.

use std::cell::RefCell;
use std::rc::Rc;

use crate::abstract_ops::conversion::to_property_key;
use crate::abstract_ops::{
    ListElementTypes, call, construct, create_array_from_list, create_data_property_or_throw,
    create_list_from_array_like, from_property_descriptor, make_basic_object, to_property_descriptor,
};
use crate::builtins::{arg, builtin_function, builtin_in_realm, define_method, define_tag, plain_object};
use crate::completion::Completion;
use crate::engine::{Agent, ErrorKind, IntrinsicId, Message, Realm};
use crate::object::proxy::{proxy_create, revoke};
use crate::object::{JsObject, PropertyKey};
use crate::types::JsValue;

pub(super) fn init(realm: &Realm) {
    let reflect = plain_object(realm);
    define_method(realm, &reflect, "apply", 3, reflect_apply);
    define_method(realm, &reflect, "construct", 2, reflect_construct);
    define_method(realm, &reflect, "defineProperty", 3, |agent, _, args| {
        let target = q!(require_target(agent, args));
        let key = q!(to_property_key(agent, &arg(args, 1)));
        let desc = q!(to_property_descriptor(agent, &arg(args, 2)));
        target.define_own_property(agent, key, desc).map(JsValue::Boolean)
    });
    define_method(realm, &reflect, "deleteProperty", 2, |agent, _, args| {
        let target = q!(require_target(agent, args));
        let key = q!(to_property_key(agent, &arg(args, 1)));
        target.delete(agent, &key).map(JsValue::Boolean)
    });
    define_method(realm, &reflect, "get", 2, |agent, _, args| {
        let target = q!(require_target(agent, args));
        let key = q!(to_property_key(agent, &arg(args, 1)));
        let receiver = if args.len() > 2 { args[2].clone() } else { JsValue::Object(target.clone()) };
        target.get(agent, &key, &receiver)
    });
    define_method(realm, &reflect, "getOwnPropertyDescriptor", 2, |agent, _, args| {
        let target = q!(require_target(agent, args));
        let key = q!(to_property_key(agent, &arg(args, 1)));
        let desc = q!(target.get_own_property(agent, &key));
        Completion::Normal(from_property_descriptor(agent, desc.as_ref()))
    });
    define_method(realm, &reflect, "getPrototypeOf", 1, |agent, _, args| {
        let target = q!(require_target(agent, args));
        let proto = q!(target.get_prototype_of(agent));
        Completion::Normal(proto.map_or(JsValue::Null, JsValue::Object))
    });
    define_method(realm, &reflect, "has", 2, |agent, _, args| {
        let target = q!(require_target(agent, args));
        let key = q!(to_property_key(agent, &arg(args, 1)));
        target.has_property(agent, &key).map(JsValue::Boolean)
    });
    define_method(realm, &reflect, "isExtensible", 1, |agent, _, args| {
        let target = q!(require_target(agent, args));
        target.is_extensible(agent).map(JsValue::Boolean)
    });
    define_method(realm, &reflect, "ownKeys", 1, |agent, _, args| {
        let target = q!(require_target(agent, args));
        let keys = q!(target.own_property_keys(agent));
        let keys: Vec<JsValue> = keys.iter().map(PropertyKey::to_value).collect();
        Completion::Normal(JsValue::Object(create_array_from_list(agent, &keys)))
    });
    define_method(realm, &reflect, "preventExtensions", 1, |agent, _, args| {
        let target = q!(require_target(agent, args));
        target.prevent_extensions(agent).map(JsValue::Boolean)
    });
    define_method(realm, &reflect, "set", 3, |agent, _, args| {
        let target = q!(require_target(agent, args));
        let key = q!(to_property_key(agent, &arg(args, 1)));
        let receiver = if args.len() > 3 { args[3].clone() } else { JsValue::Object(target.clone()) };
        target.set(agent, key, arg(args, 2), &receiver).map(JsValue::Boolean)
    });
    define_method(realm, &reflect, "setPrototypeOf", 2, |agent, _, args| {
        let target = q!(require_target(agent, args));
        let proto = match arg(args, 1) {
            JsValue::Object(o) => Some(o),
            JsValue::Null => None,
            other => return agent.throw(ErrorKind::Type, Message::PrototypeNotObject(agent.inspect(&other))),
        };
        target.set_prototype_of(agent, proto).map(JsValue::Boolean)
    });
    define_tag(&reflect, "Reflect");
    realm.set_intrinsic(IntrinsicId::Reflect, reflect);

    let proxy = builtin_in_realm(
        realm,
        Rc::new(proxy_constructor),
        2,
        &PropertyKey::from("Proxy"),
        None,
        None,
        true,
    );
    define_method(realm, &proxy, "revocable", 2, proxy_revocable);
    realm.set_intrinsic(IntrinsicId::Proxy, proxy);
}

/// The first argument, which every Reflect function requires to be an object.
fn require_target(agent: &Agent, args: &[JsValue]) -> Completion<JsObject> {
    match arg(args, 0) {
        JsValue::Object(o) => Completion::Normal(o),
        other => agent.throw(ErrorKind::Type, Message::NotAnObject(agent.inspect(&other))),
    }
}

// §28.1.1 Reflect.apply ( target, thisArgument, argumentsList )
fn reflect_apply(agent: &Agent, _this: &JsValue, args: &[JsValue]) -> Completion {
    let target = arg(args, 0);
    if !target.is_callable() {
        return agent.throw(ErrorKind::Type, Message::NotAFunction(agent.inspect(&target)));
    }
    let list = q!(create_list_from_array_like(agent, &arg(args, 2), ListElementTypes::All));
    call(agent, &target, &arg(args, 1), &list)
}

// §28.1.2 Reflect.construct ( target, argumentsList [ , newTarget ] )
fn reflect_construct(agent: &Agent, _this: &JsValue, args: &[JsValue]) -> Completion {
    let target = match arg(args, 0) {
        JsValue::Object(o) if o.is_constructor() => o,
        other => return agent.throw(ErrorKind::Type, Message::NotAConstructor(agent.inspect(&other))),
    };
    let new_target = match args.get(2) {
        None => target.clone(),
        Some(JsValue::Object(o)) if o.is_constructor() => o.clone(),
        Some(other) => return agent.throw(ErrorKind::Type, Message::NotAConstructor(agent.inspect(other))),
    };
    let list = q!(create_list_from_array_like(agent, &arg(args, 1), ListElementTypes::All));
    construct(agent, &target, &list, Some(&new_target)).map(JsValue::Object)
}

// §28.2.1.1 Proxy ( target, handler )
fn proxy_constructor(agent: &Agent, _this: &JsValue, args: &[JsValue], new_target: Option<&JsObject>) -> Completion {
    if new_target.is_none() {
        return agent.throw(ErrorKind::Type, Message::ConstructorRequiresNew("Proxy".into()));
    }
    proxy_create(agent, &arg(args, 0), &arg(args, 1)).map(JsValue::Object)
}

// §28.2.2.1 Proxy.revocable ( target, handler )
fn proxy_revocable(agent: &Agent, _this: &JsValue, args: &[JsValue]) -> Completion {
    let proxy = q!(proxy_create(agent, &arg(args, 0), &arg(args, 1)));
    let revocable = Rc::new(RefCell::new(Some(proxy.clone())));
    let revoker = builtin_function(agent, "", 0, move |_, _, _, _| {
        if let Some(p) = revocable.borrow_mut().take() {
            revoke(&p);
        }
        Completion::Normal(JsValue::Undefined)
    });
    let result = make_basic_object(agent);
    x!(create_data_property_or_throw(agent, &result, PropertyKey::from("proxy"), JsValue::Object(proxy)));
    x!(create_data_property_or_throw(agent, &result, PropertyKey::from("revoke"), JsValue::Object(revoker)));
    Completion::Normal(JsValue::Object(result))
}

#[cfg(test)]
mod tests {
    use crate::evaluator::test_support::eval_to_string;

    #[test]
    fn reflect_mirrors_internal_methods() {
        assert_eq!(eval_to_string("var o = {}; Reflect.defineProperty(o, 'x', { value: 1 }) + ',' + o.x"), "true,1");
        assert_eq!(
            eval_to_string("var o = Object.freeze({ x: 1 }); Reflect.set(o, 'x', 2) + ',' + Reflect.deleteProperty(o, 'x')"),
            "false,false"
        );
        assert_eq!(eval_to_string("Reflect.has({ a: 1 }, 'a') + ',' + Reflect.has({}, 'toString')"), "true,true");
        assert_eq!(eval_to_string("Reflect.ownKeys({ b: 1, 2: 0, a: 1, [Symbol.iterator]: 0 }).length"), "4");
        assert_eq!(eval_to_string("Reflect.ownKeys({ b: 1, 2: 0, a: 1 }).join()"), "2,b,a");
        assert_eq!(eval_to_string("Reflect.getPrototypeOf(Reflect.setPrototypeOf({}, null) && Object.create(null))"), "null");
        assert!(eval_to_string("Reflect.get(1, 'x')").starts_with("Throw: TypeError"));
    }

    #[test]
    fn reflect_get_and_set_pass_the_receiver() {
        let src = "var o = { get x() { return this.tag; }, set y(v) { this.seen = v; } }; \
                   var r = { tag: 'receiver' }; Reflect.set(o, 'y', 5, r); \
                   Reflect.get(o, 'x', r) + ',' + r.seen";
        assert_eq!(eval_to_string(src), "receiver,5");
    }

    #[test]
    fn reflect_apply_and_construct() {
        assert_eq!(eval_to_string("Reflect.apply(Math.max, null, [1, 5, 3])"), "5");
        assert_eq!(
            eval_to_string("class A { constructor() { this.t = new.target.name; } } class B {} Reflect.construct(A, [], B).t"),
            "B"
        );
        assert!(eval_to_string("Reflect.construct(() => 1, [])").starts_with("Throw: TypeError"));
    }

    #[test]
    fn proxies_route_through_traps() {
        let src = "var log = []; \
                   var p = new Proxy({ a: 1 }, { get(t, k, r) { log.push(k); return Reflect.get(t, k, r); } }); \
                   p.a + ',' + log.join()";
        assert_eq!(eval_to_string(src), "1,a");
        assert!(eval_to_string("Proxy({}, {})").starts_with("Throw: TypeError"));
        assert_eq!(eval_to_string("Proxy.prototype === undefined"), "true");
    }

    #[test]
    fn revocable_proxies_stop_working() {
        let src = "var r = Proxy.revocable({ a: 1 }, {}); var before = r.proxy.a; r.revoke(); r.revoke(); \
                   try { r.proxy.a; 'no' } catch (e) { before + ',' + (e instanceof TypeError) }";
        assert_eq!(eval_to_string(src), "1,true");
    }
}
