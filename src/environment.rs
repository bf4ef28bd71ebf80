//! §9.1 Environment Records.
//!
//! An [`Environment`] is a shared handle; closures, execution contexts and
//! inner scopes all hold clones of the same record, so binding mutation is
//! visible to every holder. Each record references its outer record.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::abstract_ops::{define_property_or_throw, get, has_own_property, set};
use crate::completion::Completion;
use crate::engine::{Agent, ErrorKind, Message};
use crate::evaluator::reference::{Reference, ReferenceBase};
use crate::modules::ModuleId;
use crate::object::function::ThisMode;
use crate::object::{JsObject, PropertyDescriptor, PropertyKey};
use crate::types::JsValue;

#[derive(Clone)]
enum Binding {
    Direct {
        /// `None` until initialized.
        value: Option<JsValue>,
        mutable: bool,
        strict: bool,
        deletable: bool,
    },
    /// An import binding in a module environment, resolved through the
    /// target module's environment on every read.
    Indirect { module: ModuleId, name: Rc<str> },
}

#[derive(Default)]
pub struct DeclarativeRecord {
    bindings: RefCell<FxHashMap<Rc<str>, Binding>>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ThisBindingStatus {
    Lexical,
    Initialized,
    Uninitialized,
}

pub struct FunctionRecord {
    declarative: DeclarativeRecord,
    this_value: RefCell<JsValue>,
    this_status: Cell<ThisBindingStatus>,
    pub function_object: JsObject,
    pub new_target: Option<JsObject>,
}

pub struct ObjectRecord {
    pub binding_object: JsObject,
}

pub struct GlobalRecord {
    object: ObjectRecord,
    declarative: DeclarativeRecord,
    this_value: JsObject,
    var_names: RefCell<FxHashSet<Rc<str>>>,
}

pub enum EnvironmentKind {
    Declarative(DeclarativeRecord),
    Function(FunctionRecord),
    Object(ObjectRecord),
    Global(GlobalRecord),
    Module(DeclarativeRecord),
}

pub struct EnvironmentRecord {
    pub outer: Option<Environment>,
    pub kind: EnvironmentKind,
}

#[derive(Clone)]
pub struct Environment(Rc<EnvironmentRecord>);

impl DeclarativeRecord {
    fn has_binding(&self, name: &str) -> bool {
        self.bindings.borrow().contains_key(name)
    }

    fn create_binding(&self, name: &str, mutable: bool, strict: bool, deletable: bool) {
        self.bindings.borrow_mut().insert(
            name.into(),
            Binding::Direct {
                value: None,
                mutable,
                strict,
                deletable,
            },
        );
    }

    fn initialize_binding(&self, name: &str, v: JsValue) {
        if let Some(Binding::Direct { value, .. }) = self.bindings.borrow_mut().get_mut(name) {
            *value = Some(v);
        }
    }

    // §9.1.1.1.5 SetMutableBinding
    fn set_mutable_binding(
        &self,
        agent: &Agent,
        name: &str,
        v: JsValue,
        strict: bool,
    ) -> Completion<()> {
        let mut bindings = self.bindings.borrow_mut();
        let Some(binding) = bindings.get_mut(name) else {
            drop(bindings);
            if strict {
                return agent.throw(ErrorKind::Reference, Message::NotDefined(name.to_owned()));
            }
            self.create_binding(name, true, false, true);
            self.initialize_binding(name, v);
            return Completion::Normal(());
        };
        match binding {
            Binding::Direct {
                value,
                mutable,
                strict: binding_strict,
                ..
            } => {
                let strict = strict || *binding_strict;
                if value.is_none() {
                    drop(bindings);
                    return agent.throw(
                        ErrorKind::Reference,
                        Message::NotInitialized(name.to_owned()),
                    );
                }
                if *mutable {
                    *value = Some(v);
                } else if strict {
                    drop(bindings);
                    return agent.throw(ErrorKind::Type, Message::AssignToConstant(name.to_owned()));
                }
                Completion::Normal(())
            }
            Binding::Indirect { .. } => {
                drop(bindings);
                agent.throw(ErrorKind::Type, Message::AssignToConstant(name.to_owned()))
            }
        }
    }

    // §9.1.1.1.6 GetBindingValue, §9.1.1.5.1 for indirect bindings
    fn get_binding_value(&self, agent: &Agent, name: &str) -> Completion {
        let binding = self.bindings.borrow().get(name).cloned();
        match binding {
            Some(Binding::Direct {
                value: Some(value), ..
            }) => Completion::Normal(value),
            Some(Binding::Direct { value: None, .. }) => {
                agent.throw(ErrorKind::Reference, Message::NotInitialized(name.to_owned()))
            }
            Some(Binding::Indirect { module, name: target }) => {
                match agent.module(module).environment() {
                    Some(env) => env.get_binding_value(agent, &target, true),
                    None => agent.throw(ErrorKind::Reference, Message::NotDefined(name.to_owned())),
                }
            }
            None => agent.throw(ErrorKind::Reference, Message::NotDefined(name.to_owned())),
        }
    }

    // §9.1.1.1.7 DeleteBinding
    fn delete_binding(&self, name: &str) -> bool {
        let mut bindings = self.bindings.borrow_mut();
        match bindings.get(name) {
            Some(Binding::Direct {
                deletable: true, ..
            }) => {
                bindings.remove(name);
                true
            }
            Some(_) => false,
            None => true,
        }
    }
}

impl ObjectRecord {
    fn key(name: &str) -> PropertyKey {
        PropertyKey::from(name)
    }

    // §9.1.1.2.1 HasBinding
    fn has_binding(&self, agent: &Agent, name: &str) -> Completion<bool> {
        self.binding_object.has_property(agent, &Self::key(name))
    }

    // §9.1.1.2.2 CreateMutableBinding
    fn create_mutable_binding(&self, agent: &Agent, name: &str, deletable: bool) -> Completion<()> {
        q!(define_property_or_throw(
            agent,
            &self.binding_object,
            Self::key(name),
            PropertyDescriptor::data(JsValue::Undefined, true, true, deletable),
        ));
        Completion::Normal(())
    }

    // §9.1.1.2.5 SetMutableBinding
    fn set_mutable_binding(
        &self,
        agent: &Agent,
        name: &str,
        value: JsValue,
        strict: bool,
    ) -> Completion<()> {
        let still_exists = q!(self.binding_object.has_property(agent, &Self::key(name)));
        if !still_exists && strict {
            return agent.throw(ErrorKind::Reference, Message::NotDefined(name.to_owned()));
        }
        q!(set(agent, &self.binding_object, Self::key(name), value, strict));
        Completion::Normal(())
    }

    // §9.1.1.2.6 GetBindingValue
    fn get_binding_value(&self, agent: &Agent, name: &str, strict: bool) -> Completion {
        let key = Self::key(name);
        if !q!(self.binding_object.has_property(agent, &key)) {
            if strict {
                return agent.throw(ErrorKind::Reference, Message::NotDefined(name.to_owned()));
            }
            return Completion::Normal(JsValue::Undefined);
        }
        get(agent, &self.binding_object, &key)
    }
}

impl Environment {
    fn new(outer: Option<Environment>, kind: EnvironmentKind) -> Self {
        Environment(Rc::new(EnvironmentRecord { outer, kind }))
    }

    pub fn outer(&self) -> Option<Environment> {
        self.0.outer.clone()
    }

    pub fn kind(&self) -> &EnvironmentKind {
        &self.0.kind
    }

    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// The declarative part of the record, if any.
    fn declarative(&self) -> Option<&DeclarativeRecord> {
        match &self.0.kind {
            EnvironmentKind::Declarative(d) | EnvironmentKind::Module(d) => Some(d),
            EnvironmentKind::Function(f) => Some(&f.declarative),
            EnvironmentKind::Global(_) | EnvironmentKind::Object(_) => None,
        }
    }

    // HasBinding(N)
    pub fn has_binding(&self, agent: &Agent, name: &str) -> Completion<bool> {
        match &self.0.kind {
            EnvironmentKind::Object(o) => o.has_binding(agent, name),
            EnvironmentKind::Global(g) => {
                if g.declarative.has_binding(name) {
                    return Completion::Normal(true);
                }
                g.object.has_binding(agent, name)
            }
            _ => Completion::Normal(self.declarative().is_some_and(|d| d.has_binding(name))),
        }
    }

    // CreateMutableBinding(N, D)
    pub fn create_mutable_binding(&self, agent: &Agent, name: &str, deletable: bool) -> Completion<()> {
        match &self.0.kind {
            EnvironmentKind::Object(o) => o.create_mutable_binding(agent, name, deletable),
            EnvironmentKind::Global(g) => {
                if g.declarative.has_binding(name) {
                    return agent.throw(ErrorKind::Type, Message::AlreadyDeclared(name.to_owned()));
                }
                g.declarative.create_binding(name, true, false, deletable);
                Completion::Normal(())
            }
            _ => {
                if let Some(d) = self.declarative() {
                    d.create_binding(name, true, false, deletable);
                }
                Completion::Normal(())
            }
        }
    }

    // CreateImmutableBinding(N, S)
    pub fn create_immutable_binding(&self, agent: &Agent, name: &str, strict: bool) -> Completion<()> {
        match &self.0.kind {
            EnvironmentKind::Object(_) => unreachable!("object environments have no immutable bindings"),
            EnvironmentKind::Global(g) => {
                if g.declarative.has_binding(name) {
                    return agent.throw(ErrorKind::Type, Message::AlreadyDeclared(name.to_owned()));
                }
                g.declarative.create_binding(name, false, strict, false);
                Completion::Normal(())
            }
            _ => {
                if let Some(d) = self.declarative() {
                    d.create_binding(name, false, strict, false);
                }
                Completion::Normal(())
            }
        }
    }

    // InitializeBinding(N, V)
    pub fn initialize_binding(&self, agent: &Agent, name: &str, value: JsValue) -> Completion<()> {
        match &self.0.kind {
            EnvironmentKind::Object(o) => o.set_mutable_binding(agent, name, value, false),
            EnvironmentKind::Global(g) => {
                if g.declarative.has_binding(name) {
                    g.declarative.initialize_binding(name, value);
                    return Completion::Normal(());
                }
                g.object.set_mutable_binding(agent, name, value, false)
            }
            _ => {
                if let Some(d) = self.declarative() {
                    d.initialize_binding(name, value);
                }
                Completion::Normal(())
            }
        }
    }

    // SetMutableBinding(N, V, S)
    pub fn set_mutable_binding(
        &self,
        agent: &Agent,
        name: &str,
        value: JsValue,
        strict: bool,
    ) -> Completion<()> {
        match &self.0.kind {
            EnvironmentKind::Object(o) => o.set_mutable_binding(agent, name, value, strict),
            EnvironmentKind::Global(g) => {
                if g.declarative.has_binding(name) {
                    return g.declarative.set_mutable_binding(agent, name, value, strict);
                }
                g.object.set_mutable_binding(agent, name, value, strict)
            }
            _ => match self.declarative() {
                Some(d) => d.set_mutable_binding(agent, name, value, strict),
                None => Completion::Normal(()),
            },
        }
    }

    // GetBindingValue(N, S)
    pub fn get_binding_value(&self, agent: &Agent, name: &str, strict: bool) -> Completion {
        match &self.0.kind {
            EnvironmentKind::Object(o) => o.get_binding_value(agent, name, strict),
            EnvironmentKind::Global(g) => {
                if g.declarative.has_binding(name) {
                    return g.declarative.get_binding_value(agent, name);
                }
                g.object.get_binding_value(agent, name, strict)
            }
            _ => match self.declarative() {
                Some(d) => d.get_binding_value(agent, name),
                None => Completion::Normal(JsValue::Undefined),
            },
        }
    }

    // DeleteBinding(N)
    pub fn delete_binding(&self, agent: &Agent, name: &str) -> Completion<bool> {
        match &self.0.kind {
            EnvironmentKind::Object(o) => o.binding_object.delete(agent, &PropertyKey::from(name)),
            EnvironmentKind::Global(g) => {
                if g.declarative.has_binding(name) {
                    return Completion::Normal(g.declarative.delete_binding(name));
                }
                let key = PropertyKey::from(name);
                if q!(has_own_property(agent, &g.object.binding_object, &key)) {
                    let status = q!(g.object.binding_object.delete(agent, &key));
                    if status {
                        g.var_names.borrow_mut().remove(name);
                    }
                    return Completion::Normal(status);
                }
                Completion::Normal(true)
            }
            _ => Completion::Normal(self.declarative().is_none_or(|d| d.delete_binding(name))),
        }
    }

    // HasThisBinding()
    pub fn has_this_binding(&self) -> bool {
        match &self.0.kind {
            EnvironmentKind::Function(f) => f.this_status.get() != ThisBindingStatus::Lexical,
            EnvironmentKind::Global(_) | EnvironmentKind::Module(_) => true,
            _ => false,
        }
    }

    // HasSuperBinding()
    pub fn has_super_binding(&self) -> bool {
        match &self.0.kind {
            EnvironmentKind::Function(f) => {
                f.this_status.get() != ThisBindingStatus::Lexical
                    && f.function_object
                        .function_data()
                        .is_some_and(|d| d.home_object.borrow().is_some())
            }
            _ => false,
        }
    }

    // §9.1.1.3.1 BindThisValue
    pub fn bind_this_value(&self, agent: &Agent, value: JsValue) -> Completion<()> {
        let EnvironmentKind::Function(f) = &self.0.kind else {
            unreachable!("BindThisValue on a non-function environment");
        };
        debug_assert_ne!(f.this_status.get(), ThisBindingStatus::Lexical);
        if f.this_status.get() == ThisBindingStatus::Initialized {
            return agent.throw(ErrorKind::Reference, Message::SuperCalledTwice);
        }
        *f.this_value.borrow_mut() = value;
        f.this_status.set(ThisBindingStatus::Initialized);
        Completion::Normal(())
    }

    // GetThisBinding()
    pub fn get_this_binding(&self, agent: &Agent) -> Completion {
        match &self.0.kind {
            EnvironmentKind::Function(f) => {
                if f.this_status.get() == ThisBindingStatus::Uninitialized {
                    return agent.throw(ErrorKind::Reference, Message::ThisBeforeSuper);
                }
                Completion::Normal(f.this_value.borrow().clone())
            }
            EnvironmentKind::Global(g) => Completion::Normal(JsValue::Object(g.this_value.clone())),
            EnvironmentKind::Module(_) => Completion::Normal(JsValue::Undefined),
            _ => unreachable!("GetThisBinding on an environment without one"),
        }
    }

    // §9.1.1.3.5 GetSuperBase
    pub fn get_super_base(&self, agent: &Agent) -> Completion {
        let EnvironmentKind::Function(f) = &self.0.kind else {
            return Completion::Normal(JsValue::Undefined);
        };
        let home = f
            .function_object
            .function_data()
            .and_then(|d| d.home_object.borrow().clone());
        match home {
            Some(home) => home.get_prototype_of(agent).map(JsValue::from),
            None => Completion::Normal(JsValue::Undefined),
        }
    }

    pub fn function_record(&self) -> Option<&FunctionRecord> {
        match &self.0.kind {
            EnvironmentKind::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn this_binding_status(&self) -> Option<ThisBindingStatus> {
        self.function_record().map(|f| f.this_status.get())
    }

    // §9.1.1.5.5 CreateImportBinding
    pub fn create_import_binding(&self, name: &str, module: ModuleId, binding_name: Rc<str>) {
        let EnvironmentKind::Module(d) = &self.0.kind else {
            unreachable!("import binding outside a module environment");
        };
        d.bindings.borrow_mut().insert(
            name.into(),
            Binding::Indirect {
                module,
                name: binding_name,
            },
        );
    }

    fn global(&self) -> &GlobalRecord {
        match &self.0.kind {
            EnvironmentKind::Global(g) => g,
            _ => unreachable!("global environment operation on a non-global environment"),
        }
    }

    pub fn global_object(&self) -> JsObject {
        self.global().object.binding_object.clone()
    }

    // §9.1.1.4.12 HasVarDeclaration
    pub fn has_var_declaration(&self, name: &str) -> bool {
        self.global().var_names.borrow().contains(name)
    }

    // §9.1.1.4.13 HasLexicalDeclaration
    pub fn has_lexical_declaration(&self, name: &str) -> bool {
        self.global().declarative.has_binding(name)
    }

    // §9.1.1.4.14 HasRestrictedGlobalProperty
    pub fn has_restricted_global_property(&self, agent: &Agent, name: &str) -> Completion<bool> {
        let global = self.global_object();
        let existing = q!(global.get_own_property(agent, &PropertyKey::from(name)));
        Completion::Normal(existing.is_some_and(|d| !d.configurable()))
    }

    // §9.1.1.4.15 CanDeclareGlobalVar
    pub fn can_declare_global_var(&self, agent: &Agent, name: &str) -> Completion<bool> {
        let global = self.global_object();
        if q!(has_own_property(agent, &global, &PropertyKey::from(name))) {
            return Completion::Normal(true);
        }
        global.is_extensible(agent)
    }

    // §9.1.1.4.16 CanDeclareGlobalFunction
    pub fn can_declare_global_function(&self, agent: &Agent, name: &str) -> Completion<bool> {
        let global = self.global_object();
        let Some(existing) = q!(global.get_own_property(agent, &PropertyKey::from(name))) else {
            return global.is_extensible(agent);
        };
        if existing.configurable() {
            return Completion::Normal(true);
        }
        Completion::Normal(existing.is_data_descriptor() && existing.writable() && existing.enumerable())
    }

    // §9.1.1.4.17 CreateGlobalVarBinding
    pub fn create_global_var_binding(&self, agent: &Agent, name: &str, deletable: bool) -> Completion<()> {
        let g = self.global();
        let global = &g.object.binding_object;
        let has_property = q!(has_own_property(agent, global, &PropertyKey::from(name)));
        let extensible = q!(global.is_extensible(agent));
        if !has_property && extensible {
            q!(g.object.create_mutable_binding(agent, name, deletable));
            q!(g.object.set_mutable_binding(agent, name, JsValue::Undefined, false));
        }
        g.var_names.borrow_mut().insert(name.into());
        Completion::Normal(())
    }

    // §9.1.1.4.18 CreateGlobalFunctionBinding
    pub fn create_global_function_binding(
        &self,
        agent: &Agent,
        name: &str,
        value: JsValue,
        deletable: bool,
    ) -> Completion<()> {
        let g = self.global();
        let global = &g.object.binding_object;
        let key = PropertyKey::from(name);
        let existing = q!(global.get_own_property(agent, &key));
        let desc = match existing {
            None => PropertyDescriptor::data(value.clone(), true, true, deletable),
            Some(d) if d.configurable() => PropertyDescriptor::data(value.clone(), true, true, deletable),
            Some(_) => PropertyDescriptor::value_only(value.clone()),
        };
        q!(define_property_or_throw(agent, global, key.clone(), desc));
        q!(set(agent, global, key, value, false));
        g.var_names.borrow_mut().insert(name.into());
        Completion::Normal(())
    }
}

// §9.1.2.2 NewDeclarativeEnvironment
pub fn new_declarative_environment(outer: Option<Environment>) -> Environment {
    Environment::new(outer, EnvironmentKind::Declarative(DeclarativeRecord::default()))
}

// §9.1.2.3 NewObjectEnvironment
pub fn new_object_environment(object: JsObject, outer: Option<Environment>) -> Environment {
    Environment::new(
        outer,
        EnvironmentKind::Object(ObjectRecord {
            binding_object: object,
        }),
    )
}

// §9.1.2.4 NewFunctionEnvironment
pub fn new_function_environment(f: &JsObject, new_target: Option<JsObject>) -> Environment {
    let Some(data) = f.function_data() else {
        unreachable!("function environment for a non-ECMAScript function");
    };
    let this_status = if data.this_mode == ThisMode::Lexical {
        ThisBindingStatus::Lexical
    } else {
        ThisBindingStatus::Uninitialized
    };
    Environment::new(
        Some(data.environment.clone()),
        EnvironmentKind::Function(FunctionRecord {
            declarative: DeclarativeRecord::default(),
            this_value: RefCell::new(JsValue::Undefined),
            this_status: Cell::new(this_status),
            function_object: f.clone(),
            new_target,
        }),
    )
}

// §9.1.2.5 NewGlobalEnvironment
pub fn new_global_environment(global: JsObject, this_value: JsObject) -> Environment {
    Environment::new(
        None,
        EnvironmentKind::Global(GlobalRecord {
            object: ObjectRecord {
                binding_object: global,
            },
            declarative: DeclarativeRecord::default(),
            this_value,
            var_names: RefCell::new(FxHashSet::default()),
        }),
    )
}

// §9.1.2.6 NewModuleEnvironment
pub fn new_module_environment(outer: Environment) -> Environment {
    Environment::new(Some(outer), EnvironmentKind::Module(DeclarativeRecord::default()))
}

// §9.1.2.1 GetIdentifierReference
pub fn get_identifier_reference(
    agent: &Agent,
    env: Option<&Environment>,
    name: &Rc<str>,
    strict: bool,
) -> Completion<Reference> {
    let mut current = env.cloned();
    while let Some(env) = current {
        if q!(env.has_binding(agent, name)) {
            return Completion::Normal(Reference {
                base: ReferenceBase::Environment(env),
                name: PropertyKey::from(&**name),
                strict,
                this_value: None,
            });
        }
        current = env.outer();
    }
    Completion::Normal(Reference {
        base: ReferenceBase::Unresolvable,
        name: PropertyKey::from(&**name),
        strict,
        this_value: None,
    })
}

// §9.4.3 GetThisEnvironment
pub fn get_this_environment(agent: &Agent) -> Environment {
    let mut env = agent.running_execution_context().lexical_environment();
    loop {
        if env.has_this_binding() {
            return env;
        }
        match env.outer() {
            Some(outer) => env = outer,
            None => unreachable!("no environment with a this binding"),
        }
    }
}

// §9.4.4 ResolveThisBinding
pub fn resolve_this_binding(agent: &Agent) -> Completion {
    get_this_environment(agent).get_this_binding(agent)
}

// §9.4.5 GetNewTarget
pub fn get_new_target(agent: &Agent) -> JsValue {
    let env = get_this_environment(agent);
    match env.function_record() {
        Some(f) => match &f.new_target {
            Some(target) => JsValue::Object(target.clone()),
            None => JsValue::Undefined,
        },
        None => JsValue::Undefined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_agent;

    #[test]
    fn uninitialized_binding_is_in_tdz() {
        let agent = test_agent();
        let env = new_declarative_environment(None);
        x!(env.create_immutable_binding(&agent, "x", true));
        assert!(env.get_binding_value(&agent, "x", true).is_throw());
        x!(env.initialize_binding(&agent, "x", JsValue::Number(1.0)));
        let v = x!(env.get_binding_value(&agent, "x", true));
        assert!(matches!(v, JsValue::Number(n) if n == 1.0));
        assert!(env.set_mutable_binding(&agent, "x", JsValue::Null, true).is_throw());
    }

    #[test]
    fn mutation_is_shared_by_all_holders() {
        let agent = test_agent();
        let outer = new_declarative_environment(None);
        let inner = new_declarative_environment(Some(outer.clone()));
        x!(outer.create_mutable_binding(&agent, "n", false));
        x!(outer.initialize_binding(&agent, "n", JsValue::Number(0.0)));
        let name: Rc<str> = "n".into();
        let reference = x!(get_identifier_reference(&agent, Some(&inner), &name, true));
        assert!(matches!(reference.base, ReferenceBase::Environment(ref e) if e.ptr_eq(&outer)));
        x!(outer.set_mutable_binding(&agent, "n", JsValue::Number(5.0), true));
        let seen = x!(inner.outer().map_or(Completion::Normal(JsValue::Undefined), |e| {
            e.get_binding_value(&agent, "n", true)
        }));
        assert!(matches!(seen, JsValue::Number(n) if n == 5.0));
    }

    #[test]
    fn global_lexical_redeclaration_is_rejected() {
        let agent = test_agent();
        let env = agent.current_realm().global_env();
        x!(env.create_mutable_binding(&agent, "dup", false));
        assert!(env.create_mutable_binding(&agent, "dup", false).is_throw());
    }
}
