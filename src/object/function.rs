//! §10.2 ECMAScript function objects and §10.3 built-in function objects.
//!
//! Both kinds share the [[Call]]/[[Construct]] entry points in this module;
//! bound functions and callable proxies are routed to their own modules.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::ast::FunctionNode;
use crate::completion::Completion;
use crate::engine::{Agent, ErrorKind, ExecutionContext, Message, Realm, ScriptOrModule};
use crate::environment::Environment;
use crate::evaluator::coroutine::Coroutine;
use crate::evaluator::functions::{call_ecmascript_function, construct_ecmascript_function};
use crate::object::{JsObject, ObjectKind, PropertyKey, bound, proxy};
use crate::types::JsValue;

/// Behaviour of a built-in: `(agent, this, arguments, new_target)`.
/// `new_target` is `None` for [[Call]].
pub type NativeFn = Rc<dyn Fn(&Agent, &JsValue, &[JsValue], Option<&JsObject>) -> Completion>;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ThisMode {
    Lexical,
    Strict,
    Global,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ConstructorKind {
    Base,
    Derived,
}

/// A public class field recorded on a constructor by ClassDefinitionEvaluation.
#[derive(Clone)]
pub struct ClassFieldDefinition {
    pub name: PropertyKey,
    pub initializer: Option<JsObject>,
}

/// Internal slots of an ECMAScript function object (Table 30).
pub struct FunctionData {
    pub environment: Environment,
    pub node: Rc<FunctionNode>,
    pub realm: Realm,
    pub script_or_module: Option<ScriptOrModule>,
    pub this_mode: ThisMode,
    pub strict: bool,
    pub constructor_kind: Cell<ConstructorKind>,
    pub is_class_constructor: Cell<bool>,
    pub home_object: RefCell<Option<JsObject>>,
    pub fields: RefCell<Vec<ClassFieldDefinition>>,
    constructor: Cell<bool>,
}

impl FunctionData {
    pub fn new(
        environment: Environment,
        node: Rc<FunctionNode>,
        realm: Realm,
        script_or_module: Option<ScriptOrModule>,
    ) -> Self {
        let strict = node.strict;
        let this_mode = if node.is_arrow() {
            ThisMode::Lexical
        } else if strict {
            ThisMode::Strict
        } else {
            ThisMode::Global
        };
        FunctionData {
            environment,
            node,
            realm,
            script_or_module,
            this_mode,
            strict,
            constructor_kind: Cell::new(ConstructorKind::Base),
            is_class_constructor: Cell::new(false),
            home_object: RefCell::new(None),
            fields: RefCell::new(Vec::new()),
            constructor: Cell::new(false),
        }
    }

    pub fn is_constructor(&self) -> bool {
        self.constructor.get()
    }

    /// The [[Construct]] half of MakeConstructor.
    pub fn make_constructor(&self) {
        self.constructor.set(true);
    }
}

/// Internal slots of a built-in function object.
pub struct BuiltinFunction {
    pub behaviour: NativeFn,
    pub realm: Realm,
    pub constructor: bool,
    /// Set on the reaction functions that resume an awaiting coroutine, so
    /// stack capture can follow them to the suspended caller.
    pub awaiting: Option<Weak<Coroutine>>,
}

// §10.3.1 [[Call]] for built-ins
fn call_builtin(agent: &Agent, f: &JsObject, this: &JsValue, args: &[JsValue]) -> Completion {
    let (behaviour, realm) = match &f.borrow().kind {
        ObjectKind::Builtin(b) => (b.behaviour.clone(), b.realm.clone()),
        _ => unreachable!("call_builtin on a non-builtin"),
    };
    q!(agent.check_call_depth());
    let callee = ExecutionContext::native(realm, f.clone());
    agent.push_context(callee.clone());
    let result = behaviour(agent, this, args, None);
    agent.pop_context(Some(&callee));
    result
}

// §10.3.2 [[Construct]] for built-ins
fn construct_builtin(
    agent: &Agent,
    f: &JsObject,
    args: &[JsValue],
    new_target: &JsObject,
) -> Completion<JsObject> {
    let (behaviour, realm) = match &f.borrow().kind {
        ObjectKind::Builtin(b) => (b.behaviour.clone(), b.realm.clone()),
        _ => unreachable!("construct_builtin on a non-builtin"),
    };
    q!(agent.check_call_depth());
    let callee = ExecutionContext::native(realm, f.clone());
    callee.call_site_mut().is_constructor = true;
    agent.push_context(callee.clone());
    let result = behaviour(agent, &JsValue::Undefined, args, Some(new_target));
    agent.pop_context(Some(&callee));
    match q!(result) {
        JsValue::Object(o) => Completion::Normal(o),
        other => agent.throw(ErrorKind::Type, Message::NotAnObject(agent.inspect(&other))),
    }
}

/// [[Call]] dispatch over every callable kind.
pub fn call_object(agent: &Agent, f: &JsObject, this: &JsValue, args: &[JsValue]) -> Completion {
    enum Route {
        Ecma(Rc<FunctionData>),
        Builtin,
        Bound,
        Proxy(proxy::ProxyData),
    }
    let route = match &f.borrow().kind {
        ObjectKind::Function(data) => Route::Ecma(data.clone()),
        ObjectKind::Builtin(_) => Route::Builtin,
        ObjectKind::BoundFunction(_) => Route::Bound,
        ObjectKind::Proxy(p) if p.callable => Route::Proxy(p.clone()),
        _ => {
            return agent.throw(
                ErrorKind::Type,
                Message::NotAFunction(agent.inspect(&JsValue::Object(f.clone()))),
            );
        }
    };
    match route {
        Route::Ecma(data) => call_ecmascript_function(agent, f, &data, this, args),
        Route::Builtin => call_builtin(agent, f, this, args),
        Route::Bound => bound::call_bound(agent, f, args),
        Route::Proxy(p) => proxy::call_proxy(agent, &p, this, args),
    }
}

/// [[Construct]] dispatch over every constructor kind.
pub fn construct_object(
    agent: &Agent,
    f: &JsObject,
    args: &[JsValue],
    new_target: &JsObject,
) -> Completion<JsObject> {
    enum Route {
        Ecma(Rc<FunctionData>),
        Builtin,
        Bound,
        Proxy(proxy::ProxyData),
    }
    let route = match &f.borrow().kind {
        ObjectKind::Function(data) if data.is_constructor() => Route::Ecma(data.clone()),
        ObjectKind::Builtin(b) if b.constructor => Route::Builtin,
        ObjectKind::BoundFunction(b) if b.target.is_constructor() => Route::Bound,
        ObjectKind::Proxy(p) if p.constructor => Route::Proxy(p.clone()),
        _ => {
            return agent.throw(
                ErrorKind::Type,
                Message::NotAConstructor(agent.inspect(&JsValue::Object(f.clone()))),
            );
        }
    };
    match route {
        Route::Ecma(data) => construct_ecmascript_function(agent, f, &data, args, new_target),
        Route::Builtin => construct_builtin(agent, f, args, new_target),
        Route::Bound => bound::construct_bound(agent, f, args, new_target),
        Route::Proxy(p) => proxy::construct_proxy(agent, &p, args, new_target),
    }
}

/// §10.2.9 SetFunctionName
pub fn set_function_name(f: &JsObject, name: &PropertyKey, prefix: Option<&str>) {
    let mut name = name.to_function_name();
    if let Some(prefix) = prefix {
        name = crate::types::JsString::from_str(&format!("{prefix} ")).concat(&name);
    }
    f.insert_property(
        "name",
        crate::object::Property::data(JsValue::String(name), false, false, true),
    );
}

/// §10.2.10 SetFunctionLength
pub fn set_function_length(f: &JsObject, length: u32) {
    f.insert_property(
        "length",
        crate::object::Property::data(JsValue::Number(f64::from(length)), false, false, true),
    );
}
