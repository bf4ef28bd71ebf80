//! §20.4 Symbol objects.

use crate::abstract_ops::conversion::to_string;
use crate::builtins::{arg, define_constant, define_constructor, define_getter, define_method, define_tag, method_in_realm, plain_object};
use crate::completion::Completion;
use crate::engine::{Agent, ErrorKind, IntrinsicId, Message, Realm};
use crate::object::{JsObject, ObjectKind, Property, PropertyKey};
use crate::types::{JsSymbol, JsValue, WellKnownSymbol};

pub(super) fn init(realm: &Realm) {
    let proto = plain_object(realm);
    define_getter(realm, &proto, "description", |agent, this, _| {
        let sym = q!(this_symbol_value(agent, this));
        Completion::Normal(sym.description().cloned().map_or(JsValue::Undefined, JsValue::String))
    });
    define_method(realm, &proto, "toString", 0, |agent, this, _| {
        let sym = q!(this_symbol_value(agent, this));
        Completion::Normal(JsValue::String(sym.descriptive_string()))
    });
    define_method(realm, &proto, "valueOf", 0, |agent, this, _| {
        this_symbol_value(agent, this).map(JsValue::Symbol)
    });
    let to_primitive = method_in_realm(realm, PropertyKey::symbol(WellKnownSymbol::ToPrimitive), 1, |agent, this, _| {
        this_symbol_value(agent, this).map(JsValue::Symbol)
    });
    proto.insert_property(
        PropertyKey::symbol(WellKnownSymbol::ToPrimitive),
        Property::data(JsValue::Object(to_primitive), false, false, true),
    );
    define_tag(&proto, "Symbol");

    let ctor = define_constructor(realm, "Symbol", 0, symbol_constructor, &proto);
    define_method(realm, &ctor, "for", 1, symbol_for);
    define_method(realm, &ctor, "keyFor", 1, symbol_key_for);
    for which in WellKnownSymbol::ALL {
        define_constant(&ctor, which.property_name(), JsValue::Symbol(JsSymbol::well_known(which)));
    }
    realm.set_intrinsic(IntrinsicId::SymbolPrototype, proto);
    realm.set_intrinsic(IntrinsicId::Symbol, ctor);
}

// §20.4.3 thisSymbolValue
fn this_symbol_value(agent: &Agent, value: &JsValue) -> Completion<JsSymbol> {
    match value {
        JsValue::Symbol(s) => return Completion::Normal(s.clone()),
        JsValue::Object(o) => {
            if let ObjectKind::Symbol(s) = &o.borrow().kind {
                return Completion::Normal(s.clone());
            }
        }
        _ => {}
    }
    agent.throw(ErrorKind::Type, Message::NotATypeObject(agent.inspect(value), "Symbol"))
}

// §20.4.1.1 Symbol ( [ description ] )
fn symbol_constructor(agent: &Agent, _this: &JsValue, args: &[JsValue], new_target: Option<&JsObject>) -> Completion {
    if new_target.is_some() {
        return agent.throw(ErrorKind::Type, Message::NotAConstructor("Symbol".into()));
    }
    let description = match arg(args, 0) {
        JsValue::Undefined => None,
        other => Some(q!(to_string(agent, &other))),
    };
    Completion::Normal(JsValue::Symbol(JsSymbol::new(description)))
}

// §20.4.2.2 Symbol.for
fn symbol_for(agent: &Agent, _this: &JsValue, args: &[JsValue]) -> Completion {
    let key = q!(to_string(agent, &arg(args, 0)));
    Completion::Normal(JsValue::Symbol(agent.symbol_for(key)))
}

// §20.4.2.6 Symbol.keyFor
fn symbol_key_for(agent: &Agent, _this: &JsValue, args: &[JsValue]) -> Completion {
    let JsValue::Symbol(sym) = arg(args, 0) else {
        return agent.throw(ErrorKind::Type, Message::NotATypeObject(agent.inspect(&arg(args, 0)), "Symbol"));
    };
    Completion::Normal(agent.symbol_key_for(&sym).map_or(JsValue::Undefined, JsValue::String))
}

#[cfg(test)]
mod tests {
    use crate::evaluator::test_support::eval_to_string;

    #[test]
    fn symbols_are_unique_and_described() {
        assert_eq!(eval_to_string("Symbol('a') === Symbol('a')"), "false");
        assert_eq!(eval_to_string("Symbol('a').toString()"), "Symbol(a)");
        assert_eq!(eval_to_string("String(Symbol('d').description) + ',' + Symbol().description"), "d,undefined");
        assert!(eval_to_string("new Symbol()").starts_with("Throw: TypeError"));
    }

    #[test]
    fn registry_round_trips_keys() {
        assert_eq!(eval_to_string("Symbol.for('k') === Symbol.for('k')"), "true");
        assert_eq!(eval_to_string("Symbol.keyFor(Symbol.for('k'))"), "k");
        assert_eq!(eval_to_string("Symbol.keyFor(Symbol('k'))"), "undefined");
        assert_eq!(eval_to_string("Symbol.keyFor(Symbol.iterator)"), "undefined");
    }

    #[test]
    fn well_known_symbols_are_shared_constants() {
        assert_eq!(eval_to_string("Symbol.iterator.toString()"), "Symbol(Symbol.iterator)");
        assert_eq!(eval_to_string("Object.getOwnPropertyDescriptor(Symbol, 'iterator').writable"), "false");
        assert_eq!(eval_to_string("typeof Object(Symbol.iterator)"), "object");
        assert_eq!(eval_to_string("Object(Symbol.iterator).valueOf() === Symbol.iterator"), "true");
    }
}
