//! §9.7 Agents.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::abstract_ops::construct;
use crate::completion::Completion;
use crate::engine::jobs::PendingJob;
use crate::engine::{
    ErrorKind, ExecutionContext, Feature, HostDefinedOptions, IntrinsicId, Message, Realm,
    ScriptOrModule, create_realm,
};
use crate::modules::{ModuleId, SourceTextModule};
use crate::object::{JsObject, ObjectKind, PropertyKey};
use crate::types::{JsString, JsSymbol, JsValue, number_ops};

/// Nesting bound for [[Call]]/[[Construct]] before a RangeError is thrown.
pub const MAX_CALL_DEPTH: usize = 1000;

static NEXT_SIGNIFIER: AtomicU32 = AtomicU32::new(0);

pub struct AgentRecord {
    pub little_endian: bool,
    pub can_block: bool,
    pub signifier: u32,
    pub is_lock_free1: bool,
    pub is_lock_free2: bool,
    pub is_lock_free8: bool,
    stack: RefCell<Vec<ExecutionContext>>,
    pub(super) jobs: RefCell<VecDeque<PendingJob>>,
    modules: RefCell<Vec<Rc<SourceTextModule>>>,
    symbol_registry: RefCell<FxHashMap<JsString, JsSymbol>>,
    pub(super) options: HostDefinedOptions,
}

/// Handle to the surrounding agent. Every engine operation takes one
/// explicitly; clones share the same record.
#[derive(Clone)]
pub struct Agent(Rc<AgentRecord>);

impl Agent {
    pub fn new(options: HostDefinedOptions) -> Self {
        let signifier = NEXT_SIGNIFIER.fetch_add(1, Ordering::Relaxed);
        debug!(signifier, "creating agent");
        Agent(Rc::new(AgentRecord {
            little_endian: cfg!(target_endian = "little"),
            can_block: true,
            signifier,
            is_lock_free1: true,
            is_lock_free2: true,
            is_lock_free8: true,
            stack: RefCell::new(Vec::new()),
            jobs: RefCell::new(VecDeque::new()),
            modules: RefCell::new(Vec::new()),
            symbol_registry: RefCell::new(FxHashMap::default()),
            options,
        }))
    }

    pub fn record(&self) -> &AgentRecord {
        &self.0
    }

    pub fn options(&self) -> &HostDefinedOptions {
        &self.0.options
    }

    pub fn feature(&self, feature: Feature) -> bool {
        self.0.options.features.contains(&feature)
    }

    // §9.6 InitializeHostDefinedRealm
    pub fn initialize_host_defined_realm(&self) -> Realm {
        let realm = create_realm(self);
        let ctx = ExecutionContext::toplevel(realm.clone(), None);
        self.push_context(ctx);
        crate::builtins::set_realm_global_object(self, &realm, None, None);
        crate::builtins::set_default_global_bindings(self, &realm);
        debug!("host-defined realm initialized");
        realm
    }

    pub fn push_context(&self, ctx: ExecutionContext) {
        self.0.stack.borrow_mut().push(ctx);
    }

    /// Pops the running context. When `expected` is given the popped context
    /// must be that exact context.
    pub fn pop_context(&self, expected: Option<&ExecutionContext>) {
        let popped = self.0.stack.borrow_mut().pop();
        match (popped, expected) {
            (None, _) => panic!("pop from an empty execution context stack"),
            (Some(popped), Some(expected)) => {
                assert!(
                    popped.ptr_eq(expected),
                    "popped {popped:?} while expecting {expected:?}"
                );
            }
            (Some(_), None) => {}
        }
    }

    pub fn running_execution_context(&self) -> ExecutionContext {
        match self.0.stack.borrow().last() {
            Some(ctx) => ctx.clone(),
            None => panic!("no running execution context"),
        }
    }

    pub fn stack_depth(&self) -> usize {
        self.0.stack.borrow().len()
    }

    /// The stack from the bottom up.
    pub fn stack_snapshot(&self) -> Vec<ExecutionContext> {
        self.0.stack.borrow().clone()
    }

    pub fn check_call_depth(&self) -> Completion<()> {
        if self.stack_depth() >= MAX_CALL_DEPTH {
            return self.throw(ErrorKind::Range, Message::StackOverflow);
        }
        Completion::Normal(())
    }

    pub fn current_realm(&self) -> Realm {
        self.running_execution_context().realm().clone()
    }

    pub fn active_function_object(&self) -> Option<JsObject> {
        self.running_execution_context().function().cloned()
    }

    // §9.4.1 GetActiveScriptOrModule
    pub fn get_active_script_or_module(&self) -> Option<ScriptOrModule> {
        self.0
            .stack
            .borrow()
            .iter()
            .rev()
            .find_map(|ctx| ctx.script_or_module().cloned())
    }

    /// A well-known intrinsic of the current realm.
    pub fn intrinsic(&self, id: IntrinsicId) -> JsObject {
        self.current_realm().intrinsic(id)
    }

    /// Builds a native error of `kind` in the current realm.
    pub fn new_error(&self, kind: ErrorKind, message: Message) -> JsObject {
        let ctor = self.intrinsic(kind.constructor());
        let text = JsValue::from(JsString::from(message.to_string()));
        x!(construct(self, &ctor, &[text], None))
    }

    pub fn throw<T>(&self, kind: ErrorKind, message: Message) -> Completion<T> {
        Completion::Throw(JsValue::Object(self.new_error(kind, message)))
    }

    pub fn add_module(&self, module: SourceTextModule) -> ModuleId {
        let mut modules = self.0.modules.borrow_mut();
        modules.push(Rc::new(module));
        ModuleId(modules.len() - 1)
    }

    pub fn module(&self, id: ModuleId) -> Rc<SourceTextModule> {
        match self.0.modules.borrow().get(id.0) {
            Some(m) => m.clone(),
            None => panic!("unknown module {id:?}"),
        }
    }

    // GlobalSymbolRegistry lookups for Symbol.for / Symbol.keyFor
    pub fn symbol_for(&self, key: JsString) -> JsSymbol {
        self.0
            .symbol_registry
            .borrow_mut()
            .entry(key.clone())
            .or_insert_with(|| JsSymbol::new(Some(key)))
            .clone()
    }

    pub fn symbol_key_for(&self, sym: &JsSymbol) -> Option<JsString> {
        self.0
            .symbol_registry
            .borrow()
            .iter()
            .find(|(_, s)| s == &sym)
            .map(|(k, _)| k.clone())
    }

    /// Short human-readable rendering used in error messages.
    pub fn inspect(&self, value: &JsValue) -> String {
        match value {
            JsValue::Undefined => "undefined".to_owned(),
            JsValue::Null => "null".to_owned(),
            JsValue::Boolean(b) => b.to_string(),
            JsValue::Number(n) => number_ops::to_string(*n),
            JsValue::BigInt(b) => format!("{}n", b.value),
            JsValue::String(s) => format!("'{s}'"),
            JsValue::Symbol(s) => s.descriptive_string().to_rust_string(),
            JsValue::Object(o) => {
                if o.is_callable() {
                    return match o.own_data_value(&PropertyKey::from("name")) {
                        Some(JsValue::String(n)) if !n.is_empty() => format!("[Function: {n}]"),
                        _ => "[Function]".to_owned(),
                    };
                }
                if matches!(o.borrow().kind, ObjectKind::Error) {
                    let name = inherited_string(o, "name").unwrap_or_else(|| "Error".to_owned());
                    return match inherited_string(o, "message") {
                        Some(message) if !message.is_empty() => format!("{name}: {message}"),
                        _ => name,
                    };
                }
                format!("[object {}]", o.class_name())
            }
        }
    }
}

/// A string data property found along the prototype chain without running
/// accessors or proxy traps.
fn inherited_string(o: &JsObject, key: &str) -> Option<String> {
    let key = PropertyKey::from(key);
    let mut current = Some(o.clone());
    while let Some(object) = current {
        if object.is_proxy() {
            return None;
        }
        if let Some(value) = object.own_data_value(&key) {
            return match value {
                JsValue::String(s) => Some(s.to_rust_string()),
                _ => None,
            };
        }
        current = object.borrow().prototype.clone();
    }
    None
}
