//! §9.4 Execution Contexts, and the call-site record each one carries for
//! stack traces.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::ast::{Position, Script};
use crate::engine::Realm;
use crate::environment::Environment;
use crate::evaluator::coroutine::Coroutine;
use crate::modules::ModuleId;
use crate::object::{JsObject, ObjectKind, PropertyKey};
use crate::types::JsValue;

/// §16.1.4 Script Records.
pub struct ScriptRecord {
    pub realm: Realm,
    pub code: Rc<Script>,
    pub specifier: Option<String>,
}

#[derive(Clone)]
pub enum ScriptOrModule {
    Script(Rc<ScriptRecord>),
    Module(ModuleId),
}

/// Where an activation is and how it was entered.
#[derive(Clone, Default)]
pub struct CallSite {
    pub is_toplevel: bool,
    pub is_constructor: bool,
    pub position: Option<Position>,
    /// Source text of the callee of the last call made from this frame.
    pub method_name: Option<String>,
    /// Call site of the direct caller when this frame runs eval code.
    pub eval_origin: Option<Box<CallSite>>,
    pub specifier: Option<String>,
}

impl CallSite {
    /// Records the node being evaluated. Calls also record the callee text
    /// that names the next frame.
    pub fn set_location(&mut self, position: Position, callee_text: Option<&str>) {
        self.position = Some(position);
        if let Some(text) = callee_text {
            self.method_name = Some(text.to_owned());
        }
    }

    fn write_position(&self, out: &mut String) {
        if let Some(p) = self.position {
            out.push_str(&format!(":{}:{}", p.line, p.column + 1));
        }
    }
}

pub struct ContextRecord {
    pub function: Option<JsObject>,
    pub realm: Realm,
    pub script_or_module: Option<ScriptOrModule>,
    lexical_environment: RefCell<Option<Environment>>,
    variable_environment: RefCell<Option<Environment>>,
    call_site: RefCell<CallSite>,
    coroutine: RefCell<Option<Weak<Coroutine>>>,
}

#[derive(Clone)]
pub struct ExecutionContext(Rc<ContextRecord>);

impl ExecutionContext {
    pub fn new(
        realm: Realm,
        function: Option<JsObject>,
        script_or_module: Option<ScriptOrModule>,
    ) -> Self {
        ExecutionContext(Rc::new(ContextRecord {
            function,
            realm,
            script_or_module,
            lexical_environment: RefCell::new(None),
            variable_environment: RefCell::new(None),
            call_site: RefCell::new(CallSite::default()),
            coroutine: RefCell::new(None),
        }))
    }

    /// A context for top-level code: scripts, modules, jobs.
    pub fn toplevel(realm: Realm, script_or_module: Option<ScriptOrModule>) -> Self {
        let ctx = ExecutionContext::new(realm, None, script_or_module);
        ctx.call_site_mut().is_toplevel = true;
        ctx
    }

    /// The callee context of a built-in function.
    pub fn native(realm: Realm, function: JsObject) -> Self {
        ExecutionContext::new(realm, Some(function), None)
    }

    pub fn ptr_eq(&self, other: &ExecutionContext) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn function(&self) -> Option<&JsObject> {
        self.0.function.as_ref()
    }

    pub fn realm(&self) -> &Realm {
        &self.0.realm
    }

    pub fn script_or_module(&self) -> Option<&ScriptOrModule> {
        self.0.script_or_module.as_ref()
    }

    /// Panics if the context was never given an environment; built-in
    /// contexts have none.
    pub fn lexical_environment(&self) -> Environment {
        match &*self.0.lexical_environment.borrow() {
            Some(env) => env.clone(),
            None => panic!("execution context has no LexicalEnvironment"),
        }
    }

    pub fn try_lexical_environment(&self) -> Option<Environment> {
        self.0.lexical_environment.borrow().clone()
    }

    pub fn set_lexical_environment(&self, env: Environment) {
        *self.0.lexical_environment.borrow_mut() = Some(env);
    }

    pub fn variable_environment(&self) -> Environment {
        match &*self.0.variable_environment.borrow() {
            Some(env) => env.clone(),
            None => panic!("execution context has no VariableEnvironment"),
        }
    }

    pub fn set_variable_environment(&self, env: Environment) {
        *self.0.variable_environment.borrow_mut() = Some(env);
    }

    pub fn call_site(&self) -> Ref<'_, CallSite> {
        self.0.call_site.borrow()
    }

    pub fn call_site_mut(&self) -> RefMut<'_, CallSite> {
        self.0.call_site.borrow_mut()
    }

    pub fn coroutine(&self) -> Option<Rc<Coroutine>> {
        self.0.coroutine.borrow().as_ref().and_then(Weak::upgrade)
    }

    pub fn set_coroutine(&self, coroutine: &Rc<Coroutine>) {
        *self.0.coroutine.borrow_mut() = Some(Rc::downgrade(coroutine));
    }

    fn is_native(&self) -> bool {
        self.function()
            .is_some_and(|f| matches!(f.borrow().kind, ObjectKind::Builtin(_)))
    }

    fn is_async(&self) -> bool {
        self.function()
            .and_then(JsObject::function_data)
            .is_some_and(|d| d.node.is_async)
    }

    fn function_name(&self) -> Option<String> {
        let f = self.function()?;
        match f.own_data_value(&PropertyKey::from("name")) {
            Some(JsValue::String(s)) if !s.is_empty() => Some(s.to_rust_string()),
            _ => None,
        }
    }

    fn specifier(&self) -> Option<String> {
        let site = self.call_site();
        if site.specifier.is_some() {
            return site.specifier.clone();
        }
        match self.script_or_module() {
            Some(ScriptOrModule::Script(s)) => s.specifier.clone(),
            _ => None,
        }
    }

    fn loc(&self) -> String {
        if self.is_native() {
            return "native".to_owned();
        }
        let site = self.call_site();
        let mut out = String::new();
        let specifier = self.specifier();
        if specifier.is_none()
            && let Some(origin) = &site.eval_origin
        {
            match &origin.specifier {
                Some(s) => out.push_str(s),
                None => {
                    out.push_str("eval at ");
                    out.push_str(self.function_name().as_deref().unwrap_or("<anonymous>"));
                    origin.write_position(&mut out);
                    out.push_str(", ");
                }
            }
        }
        out.push_str(specifier.as_deref().unwrap_or("<anonymous>"));
        site.write_position(&mut out);
        out.trim().to_owned()
    }

    /// One line of a stack trace. `method_name` is the callee text recorded by
    /// the calling frame.
    pub fn describe(&self, method_name: Option<&str>) -> String {
        let resumed = self.coroutine().is_some_and(|co| co.has_resumed());
        self.describe_frame(method_name, self.is_async() && resumed)
    }

    /// The line for an async function suspended at an `await`.
    pub fn describe_awaiting(&self) -> String {
        self.describe_frame(None, self.is_async())
    }

    fn describe_frame(&self, method_name: Option<&str>, asynchronous: bool) -> String {
        let (is_toplevel, is_constructor) = {
            let site = self.call_site();
            (site.is_toplevel, site.is_constructor)
        };
        let function_name = self.function_name();
        let mut out = if asynchronous { "async ".to_owned() } else { String::new() };
        if !(is_toplevel || is_constructor) {
            match (&function_name, method_name) {
                (Some(name), Some(method)) => {
                    out.push_str(name);
                    if name != method && !method.ends_with(name.as_str()) {
                        out.push_str(&format!(" [as {method}]"));
                    }
                }
                (Some(name), None) => out.push_str(name),
                (None, Some(method)) => out.push_str(method),
                (None, None) => out.push_str("<anonymous>"),
            }
        } else if is_constructor {
            out.push_str("new ");
            out.push_str(function_name.as_deref().unwrap_or("<anonymous>"));
        } else if let Some(name) = &function_name {
            out.push_str(name);
        } else {
            out.push_str(&self.loc());
            return out;
        }
        format!("{out} ({})", self.loc())
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExecutionContext({})", self.describe(None))
    }
}
