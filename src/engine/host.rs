//! Host-defined options and the host hooks (§16.1, §9.5, §27.2.1.9).

use std::fmt;
use std::rc::Rc;

use clap::ValueEnum;
use rustc_hash::FxHashSet;
use tracing::warn;

use crate::completion::Completion;
use crate::engine::{Agent, ErrorKind, Message, Realm};
use crate::modules::ModuleId;
use crate::object::JsObject;
use crate::types::JsValue;

/// Opt-in language features. The set is fixed when the agent is created.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, ValueEnum)]
pub enum Feature {
    #[value(name = "globalThis")]
    GlobalThis,
    #[value(name = "Promise.allSettled")]
    PromiseAllSettled,
}

impl std::str::FromStr for Feature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Feature as ValueEnum>::from_str(s, false).map_err(|_| format!("unknown feature '{s}'"))
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RejectionOperation {
    Reject,
    Handle,
}

pub type ReportErrorHook = Rc<dyn Fn(&Agent, &JsValue)>;
pub type CompileStringsHook = Rc<dyn Fn(&Agent, &Realm, &Realm) -> Completion<()>>;
pub type RejectionTrackerHook = Rc<dyn Fn(&Agent, &JsObject, RejectionOperation)>;
pub type SourceTextHook = Rc<dyn Fn(&Agent, &JsObject) -> bool>;
/// `(agent, referrer specifier, requested specifier)`; the hook parses and
/// registers the module (see `modules::parse_module`).
pub type ResolveModuleHook = Rc<dyn Fn(&Agent, Option<&str>, &str) -> Completion<ModuleId>>;

/// Hooks an embedder may supply. Every hook is optional; absent hooks take
/// the default behaviour described on each `host_*` function.
#[derive(Clone, Default)]
pub struct HostDefinedOptions {
    pub features: FxHashSet<Feature>,
    pub report_error: Option<ReportErrorHook>,
    pub ensure_can_compile_strings: Option<CompileStringsHook>,
    pub promise_rejection_tracker: Option<RejectionTrackerHook>,
    pub has_source_text_available: Option<SourceTextHook>,
    pub resolve_imported_module: Option<ResolveModuleHook>,
}

impl HostDefinedOptions {
    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.features.insert(feature);
        self
    }

    pub fn on_report_error(mut self, hook: impl Fn(&Agent, &JsValue) + 'static) -> Self {
        self.report_error = Some(Rc::new(hook));
        self
    }

    pub fn on_ensure_can_compile_strings(
        mut self,
        hook: impl Fn(&Agent, &Realm, &Realm) -> Completion<()> + 'static,
    ) -> Self {
        self.ensure_can_compile_strings = Some(Rc::new(hook));
        self
    }

    pub fn on_promise_rejection(
        mut self,
        hook: impl Fn(&Agent, &JsObject, RejectionOperation) + 'static,
    ) -> Self {
        self.promise_rejection_tracker = Some(Rc::new(hook));
        self
    }

    pub fn on_has_source_text_available(
        mut self,
        hook: impl Fn(&Agent, &JsObject) -> bool + 'static,
    ) -> Self {
        self.has_source_text_available = Some(Rc::new(hook));
        self
    }

    pub fn on_resolve_imported_module(
        mut self,
        hook: impl Fn(&Agent, Option<&str>, &str) -> Completion<ModuleId> + 'static,
    ) -> Self {
        self.resolve_imported_module = Some(Rc::new(hook));
        self
    }
}

impl fmt::Debug for HostDefinedOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostDefinedOptions")
            .field("features", &self.features)
            .field("report_error", &self.report_error.is_some())
            .field("resolve_imported_module", &self.resolve_imported_module.is_some())
            .finish_non_exhaustive()
    }
}

// §16.1 HostReportErrors
pub fn host_report_error(agent: &Agent, error: &JsValue) {
    match &agent.options().report_error {
        Some(hook) => hook(agent, error),
        None => warn!(error = %agent.inspect(error), "uncaught exception"),
    }
}

// §19.2.1.2 HostEnsureCanCompileStrings
pub fn host_ensure_can_compile_strings(
    agent: &Agent,
    caller_realm: &Realm,
    callee_realm: &Realm,
) -> Completion<()> {
    match &agent.options().ensure_can_compile_strings {
        Some(hook) => hook(agent, caller_realm, callee_realm),
        None => Completion::Normal(()),
    }
}

// §27.2.1.9 HostPromiseRejectionTracker
pub fn host_promise_rejection_tracker(agent: &Agent, promise: &JsObject, operation: RejectionOperation) {
    if let Some(hook) = &agent.options().promise_rejection_tracker {
        hook(agent, promise, operation);
    }
}

// §20.2.3.5 HostHasSourceTextAvailable
pub fn host_has_source_text_available(agent: &Agent, function: &JsObject) -> bool {
    match &agent.options().has_source_text_available {
        Some(hook) => hook(agent, function),
        None => true,
    }
}

// §16.2.1.7 HostResolveImportedModule, with the per-realm module map as the
// resolution cache.
pub fn host_resolve_imported_module(
    agent: &Agent,
    referrer: ModuleId,
    specifier: &str,
) -> Completion<ModuleId> {
    let module = agent.module(referrer);
    let Some(hook) = agent.options().resolve_imported_module.clone() else {
        return agent.throw(
            ErrorKind::Error,
            Message::CouldNotResolveModule(specifier.to_owned()),
        );
    };
    let referrer_specifier = module.specifier.clone();
    let key = format!(
        "{}\u{0}{specifier}",
        referrer_specifier.as_deref().unwrap_or("")
    );
    if let Some(found) = module.realm.cached_module(&key) {
        return Completion::Normal(found);
    }
    let resolved = q!(hook(agent, referrer_specifier.as_deref(), specifier));
    module.realm.cache_module(key, resolved);
    Completion::Normal(resolved)
}
