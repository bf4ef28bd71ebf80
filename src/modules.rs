//! §16.2 Source Text Module Records: parsing into import/export entries,
//! linking (§16.2.1.5.1) and evaluation (§16.2.1.5.2) over the module graph.
//!
//! Records live in an arena on the agent and refer to each other by
//! [`ModuleId`]. Link and Evaluate are Tarjan depth-first searches: every
//! strongly connected component changes state together once its root is
//! reached.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::ast::{
    Declaration, ExportDeclaration, ImportSpecifier, Module, ModuleItem, Statement,
    top_level_lexically_scoped_declarations, top_level_var_scoped_declarations,
};
use crate::completion::Completion;
use crate::engine::{
    Agent, ErrorKind, ExecutionContext, Message, Realm, ScriptOrModule, host_resolve_imported_module,
};
use crate::environment::{Environment, new_module_environment};
use crate::evaluator::classes::class_definition_evaluation;
use crate::evaluator::expressions::{evaluate_expression, named_evaluation};
use crate::evaluator::functions::instantiate_function_object;
use crate::evaluator::run_to_completion;
use crate::evaluator::statements::evaluate_statement;
use crate::object::namespace::module_namespace_create;
use crate::object::{JsObject, PropertyKey};
use crate::types::{JsString, JsValue};

/// Index of a module record in the agent's module arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ModuleId(pub usize);

/// The local name of an anonymous default export.
const DEFAULT_BINDING: &str = "*default*";

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ModuleStatus {
    Unlinked,
    Linking,
    Linked,
    Evaluating,
    Evaluated,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ImportName {
    Name(Rc<str>),
    /// `import * as ns` and `export * as ns`.
    NamespaceObject,
}

// Table 59 ImportEntry Record
#[derive(Clone, Debug)]
pub struct ImportEntry {
    pub module_request: Rc<str>,
    pub import_name: ImportName,
    pub local_name: Rc<str>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ExportImportName {
    Name(Rc<str>),
    All,
    AllButDefault,
}

// Table 61 ExportEntry Record
#[derive(Clone, Debug)]
pub struct ExportEntry {
    pub export_name: Option<Rc<str>>,
    pub module_request: Option<Rc<str>>,
    pub import_name: Option<ExportImportName>,
    pub local_name: Option<Rc<str>>,
}

/// Result of ResolveExport.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ResolvedBinding {
    Resolved { module: ModuleId, binding: Rc<str> },
    Namespace { module: ModuleId },
    NotFound,
    Ambiguous,
}

impl ResolvedBinding {
    fn is_found(&self) -> bool {
        matches!(self, ResolvedBinding::Resolved { .. } | ResolvedBinding::Namespace { .. })
    }
}

pub struct SourceTextModule {
    pub realm: Realm,
    pub specifier: Option<String>,
    pub code: Module,
    pub requested_modules: Vec<Rc<str>>,
    pub import_entries: Vec<ImportEntry>,
    pub local_export_entries: Vec<ExportEntry>,
    pub indirect_export_entries: Vec<ExportEntry>,
    pub star_export_entries: Vec<ExportEntry>,
    status: Cell<ModuleStatus>,
    dfs_index: Cell<Option<usize>>,
    dfs_ancestor_index: Cell<Option<usize>>,
    evaluation_error: RefCell<Option<JsValue>>,
    environment: RefCell<Option<Environment>>,
    namespace: RefCell<Option<JsObject>>,
    /// Modules each request resolved to while linking.
    loaded_modules: RefCell<FxHashMap<Rc<str>, ModuleId>>,
}

impl SourceTextModule {
    pub fn status(&self) -> ModuleStatus {
        self.status.get()
    }

    pub fn environment(&self) -> Option<Environment> {
        self.environment.borrow().clone()
    }

    pub fn evaluation_error(&self) -> Option<JsValue> {
        self.evaluation_error.borrow().clone()
    }

    fn name(&self) -> String {
        self.specifier.clone().unwrap_or_else(|| "<anonymous>".to_owned())
    }

    fn set_status(&self, status: ModuleStatus) {
        trace!(module = %self.name(), from = ?self.status.get(), to = ?status, "module status");
        self.status.set(status);
    }

    /// GetImportedModule: the module a request was linked to.
    fn imported_module(&self, request: &str) -> ModuleId {
        match self.loaded_modules.borrow().get(request) {
            Some(id) => *id,
            None => panic!("module request '{request}' of {} was never loaded", self.name()),
        }
    }
}

/// Names a declaration exported with `export <declaration>` binds.
fn declaration_names(stmt: &Statement) -> Vec<Rc<str>> {
    let mut names = Vec::new();
    match stmt {
        Statement::Variable(decl) => {
            for d in &decl.declarations {
                d.target.bound_names(&mut names);
            }
        }
        Statement::FunctionDeclaration(f) => names.extend(f.name.iter().cloned()),
        Statement::ClassDeclaration(c) => names.extend(c.name.iter().cloned()),
        _ => {}
    }
    names
}

fn export_entries(decl: &ExportDeclaration) -> Vec<ExportEntry> {
    let local = |export: Rc<str>, local: Rc<str>| ExportEntry {
        export_name: Some(export),
        module_request: None,
        import_name: None,
        local_name: Some(local),
    };
    let default_local = |name: &Option<Rc<str>>| name.clone().unwrap_or_else(|| Rc::from(DEFAULT_BINDING));
    match decl {
        ExportDeclaration::Named { specifiers, source: None } => specifiers
            .iter()
            .map(|s| local(s.exported.clone(), s.local.clone()))
            .collect(),
        ExportDeclaration::Named {
            specifiers,
            source: Some(source),
        } => specifiers
            .iter()
            .map(|s| ExportEntry {
                export_name: Some(s.exported.clone()),
                module_request: Some(source.clone()),
                import_name: Some(ExportImportName::Name(s.local.clone())),
                local_name: None,
            })
            .collect(),
        ExportDeclaration::Declaration(stmt) => declaration_names(stmt)
            .into_iter()
            .map(|name| local(name.clone(), name))
            .collect(),
        ExportDeclaration::DefaultExpression(_) => vec![local(Rc::from("default"), Rc::from(DEFAULT_BINDING))],
        ExportDeclaration::DefaultFunction(f) => vec![local(Rc::from("default"), default_local(&f.name))],
        ExportDeclaration::DefaultClass(c) => vec![local(Rc::from("default"), default_local(&c.name))],
        ExportDeclaration::All { exported, source } => vec![ExportEntry {
            export_name: exported.clone(),
            module_request: Some(source.clone()),
            import_name: Some(if exported.is_some() {
                ExportImportName::All
            } else {
                ExportImportName::AllButDefault
            }),
            local_name: None,
        }],
    }
}

// §16.2.1.6.1 ParseModule
pub fn parse_module(agent: &Agent, source: &str, realm: Realm, specifier: Option<String>) -> Completion<ModuleId> {
    let code = match crate::parser::parse_module(source) {
        Ok(code) => code,
        Err(e) => {
            debug!(specifier = ?specifier, position = ?e.position, "module failed to parse");
            return agent.throw(ErrorKind::Syntax, Message::Syntax(e.to_string()));
        }
    };

    let mut requested_modules: Vec<Rc<str>> = Vec::new();
    let mut import_entries = Vec::new();
    let mut exports = Vec::new();
    for item in &code.items {
        let request = match item {
            ModuleItem::Import(import) => {
                for spec in &import.specifiers {
                    let (import_name, local_name) = match spec {
                        ImportSpecifier::Named { imported, local } => (ImportName::Name(imported.clone()), local.clone()),
                        ImportSpecifier::Default(local) => (ImportName::Name(Rc::from("default")), local.clone()),
                        ImportSpecifier::Namespace(local) => (ImportName::NamespaceObject, local.clone()),
                    };
                    import_entries.push(ImportEntry {
                        module_request: import.source.clone(),
                        import_name,
                        local_name,
                    });
                }
                Some(import.source.clone())
            }
            ModuleItem::Export(export) => {
                exports.extend(export_entries(export));
                match export {
                    ExportDeclaration::Named { source, .. } => source.clone(),
                    ExportDeclaration::All { source, .. } => Some(source.clone()),
                    _ => None,
                }
            }
            ModuleItem::Statement(_) => None,
        };
        if let Some(request) = request
            && !requested_modules.contains(&request)
        {
            requested_modules.push(request);
        }
    }

    let mut local_export_entries = Vec::new();
    let mut indirect_export_entries = Vec::new();
    let mut star_export_entries = Vec::new();
    for entry in exports {
        match (&entry.module_request, &entry.import_name) {
            (None, _) => {
                let local = entry.local_name.as_deref().unwrap_or_default();
                match import_entries.iter().find(|ie| &*ie.local_name == local) {
                    Some(ImportEntry {
                        import_name: ImportName::Name(name),
                        module_request,
                        ..
                    }) => indirect_export_entries.push(ExportEntry {
                        export_name: entry.export_name,
                        module_request: Some(module_request.clone()),
                        import_name: Some(ExportImportName::Name(name.clone())),
                        local_name: None,
                    }),
                    _ => local_export_entries.push(entry),
                }
            }
            (Some(_), Some(ExportImportName::AllButDefault)) => star_export_entries.push(entry),
            (Some(_), _) => indirect_export_entries.push(entry),
        }
    }

    debug!(
        specifier = ?specifier,
        requested = requested_modules.len(),
        imports = import_entries.len(),
        "module parsed"
    );
    Completion::Normal(agent.add_module(SourceTextModule {
        realm,
        specifier,
        code,
        requested_modules,
        import_entries,
        local_export_entries,
        indirect_export_entries,
        star_export_entries,
        status: Cell::new(ModuleStatus::Unlinked),
        dfs_index: Cell::new(None),
        dfs_ancestor_index: Cell::new(None),
        evaluation_error: RefCell::new(None),
        environment: RefCell::new(None),
        namespace: RefCell::new(None),
        loaded_modules: RefCell::new(FxHashMap::default()),
    }))
}

// §16.2.1.6.2 GetExportedNames
pub fn get_exported_names(agent: &Agent, module: ModuleId, export_star_set: &mut Vec<ModuleId>) -> Vec<Rc<str>> {
    if export_star_set.contains(&module) {
        return Vec::new();
    }
    export_star_set.push(module);
    let record = agent.module(module);
    let mut names: Vec<Rc<str>> = record
        .local_export_entries
        .iter()
        .chain(&record.indirect_export_entries)
        .filter_map(|e| e.export_name.clone())
        .collect();
    for entry in &record.star_export_entries {
        let request = entry.module_request.as_deref().unwrap_or_default();
        let requested = record.imported_module(request);
        for name in get_exported_names(agent, requested, export_star_set) {
            if &*name != "default" && !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

// §16.2.1.6.3 ResolveExport
pub fn resolve_export(
    agent: &Agent,
    module: ModuleId,
    export_name: &str,
    resolve_set: &mut Vec<(ModuleId, Rc<str>)>,
) -> ResolvedBinding {
    if resolve_set.iter().any(|(m, n)| *m == module && &**n == export_name) {
        // circular import request
        return ResolvedBinding::NotFound;
    }
    resolve_set.push((module, Rc::from(export_name)));
    let record = agent.module(module);

    for entry in &record.local_export_entries {
        if entry.export_name.as_deref() == Some(export_name) {
            return ResolvedBinding::Resolved {
                module,
                binding: entry.local_name.clone().unwrap_or_else(|| Rc::from(DEFAULT_BINDING)),
            };
        }
    }
    for entry in &record.indirect_export_entries {
        if entry.export_name.as_deref() != Some(export_name) {
            continue;
        }
        let imported = record.imported_module(entry.module_request.as_deref().unwrap_or_default());
        return match &entry.import_name {
            Some(ExportImportName::Name(name)) => resolve_export(agent, imported, name, resolve_set),
            _ => ResolvedBinding::Namespace { module: imported },
        };
    }
    if export_name == "default" {
        // A default export cannot be provided by export *.
        return ResolvedBinding::NotFound;
    }

    let mut star_resolution = ResolvedBinding::NotFound;
    for entry in &record.star_export_entries {
        let imported = record.imported_module(entry.module_request.as_deref().unwrap_or_default());
        let resolution = resolve_export(agent, imported, export_name, resolve_set);
        match resolution {
            ResolvedBinding::Ambiguous => return ResolvedBinding::Ambiguous,
            ResolvedBinding::NotFound => {}
            found if !star_resolution.is_found() => star_resolution = found,
            found if found != star_resolution => return ResolvedBinding::Ambiguous,
            _ => {}
        }
    }
    star_resolution
}

// §16.2.1.10 GetModuleNamespace
pub fn get_module_namespace(agent: &Agent, module: ModuleId) -> JsObject {
    let record = agent.module(module);
    if let Some(ns) = record.namespace.borrow().clone() {
        return ns;
    }
    let exported = get_exported_names(agent, module, &mut Vec::new());
    let unambiguous: Vec<JsString> = exported
        .into_iter()
        .filter(|name| resolve_export(agent, module, name, &mut Vec::new()).is_found())
        .map(|name| JsString::from(&*name))
        .collect();
    let ns = module_namespace_create(module, unambiguous);
    *record.namespace.borrow_mut() = Some(ns.clone());
    ns
}

fn resolution_error<T>(agent: &Agent, resolution: &ResolvedBinding, name: &str, request: &str) -> Completion<T> {
    let message = match resolution {
        ResolvedBinding::Ambiguous => Message::ResolutionAmbiguous(name.to_owned(), request.to_owned()),
        _ => Message::ResolutionNull(name.to_owned(), request.to_owned()),
    };
    agent.throw(ErrorKind::Syntax, message)
}

fn module_context(record: &SourceTextModule, module: ModuleId, env: &Environment) -> ExecutionContext {
    let ctx = ExecutionContext::new(record.realm.clone(), None, Some(ScriptOrModule::Module(module)));
    ctx.set_lexical_environment(env.clone());
    ctx.set_variable_environment(env.clone());
    ctx.call_site_mut().specifier = record.specifier.clone();
    ctx
}

/// Statements of the module body in source order, including exported
/// declarations.
fn body_statements(code: &Module) -> impl Iterator<Item = &Statement> {
    code.items.iter().filter_map(|item| match item {
        ModuleItem::Statement(s) | ModuleItem::Export(ExportDeclaration::Declaration(s)) => Some(s),
        _ => None,
    })
}

// §16.2.1.6.4 InitializeEnvironment
fn initialize_environment(agent: &Agent, module: ModuleId) -> Completion<()> {
    let record = agent.module(module);
    for entry in &record.indirect_export_entries {
        let name = entry.export_name.as_deref().unwrap_or_default();
        let resolution = resolve_export(agent, module, name, &mut Vec::new());
        if !resolution.is_found() {
            return resolution_error(agent, &resolution, name, entry.module_request.as_deref().unwrap_or_default());
        }
    }

    let env = new_module_environment(record.realm.global_env());
    *record.environment.borrow_mut() = Some(env.clone());

    for entry in &record.import_entries {
        let imported = record.imported_module(&entry.module_request);
        let resolution = match &entry.import_name {
            ImportName::NamespaceObject => ResolvedBinding::Namespace { module: imported },
            ImportName::Name(name) => {
                let resolution = resolve_export(agent, imported, name, &mut Vec::new());
                if !resolution.is_found() {
                    return resolution_error(agent, &resolution, name, &entry.module_request);
                }
                resolution
            }
        };
        match resolution {
            ResolvedBinding::Resolved { module, binding } => env.create_import_binding(&entry.local_name, module, binding),
            ResolvedBinding::Namespace { module } => {
                let ns = get_module_namespace(agent, module);
                x!(env.create_immutable_binding(agent, &entry.local_name, true));
                x!(env.initialize_binding(agent, &entry.local_name, JsValue::Object(ns)));
            }
            ResolvedBinding::NotFound | ResolvedBinding::Ambiguous => unreachable!("checked above"),
        }
    }

    let ctx = module_context(&record, module, &env);
    agent.push_context(ctx.clone());

    let mut declared_var_names: Vec<Rc<str>> = Vec::new();
    let mut functions = Vec::new();
    for stmt in body_statements(&record.code) {
        let stmt = std::slice::from_ref(stmt);
        for d in top_level_var_scoped_declarations(stmt) {
            match d {
                Declaration::Function(f) => functions.push(f.clone()),
                other => {
                    for name in other.bound_names() {
                        if !declared_var_names.contains(&name) {
                            x!(env.create_mutable_binding(agent, &name, false));
                            x!(env.initialize_binding(agent, &name, JsValue::Undefined));
                            declared_var_names.push(name);
                        }
                    }
                }
            }
        }
        for d in top_level_lexically_scoped_declarations(stmt) {
            for name in d.bound_names() {
                if d.is_constant() {
                    x!(env.create_immutable_binding(agent, &name, true));
                } else {
                    x!(env.create_mutable_binding(agent, &name, false));
                }
            }
        }
    }
    for item in &record.code.items {
        match item {
            ModuleItem::Export(ExportDeclaration::DefaultFunction(f)) => functions.push(f.clone()),
            ModuleItem::Export(ExportDeclaration::DefaultClass(c)) => {
                let name = c.name.as_deref().unwrap_or(DEFAULT_BINDING);
                x!(env.create_mutable_binding(agent, name, false));
            }
            ModuleItem::Export(ExportDeclaration::DefaultExpression(_)) => {
                x!(env.create_mutable_binding(agent, DEFAULT_BINDING, false));
            }
            _ => {}
        }
    }
    for f in functions {
        let name = f.name.as_deref().unwrap_or(DEFAULT_BINDING);
        let fo = instantiate_function_object(agent, &f, &env);
        if !x!(env.has_binding(agent, name)) {
            x!(env.create_mutable_binding(agent, name, false));
        }
        x!(env.initialize_binding(agent, name, JsValue::Object(fo)));
    }

    agent.pop_context(Some(&ctx));
    Completion::Normal(())
}

// §16.2.1.5.1 Link
pub fn link(agent: &Agent, module: ModuleId) -> Completion<()> {
    let mut stack = Vec::new();
    let result = inner_module_linking(agent, module, &mut stack, 0);
    if let Completion::Throw(error) = result {
        for m in stack {
            let record = agent.module(m);
            record.set_status(ModuleStatus::Unlinked);
            *record.environment.borrow_mut() = None;
            record.dfs_index.set(None);
            record.dfs_ancestor_index.set(None);
        }
        debug!(module = %agent.module(module).name(), "link failed, graph rolled back");
        return Completion::Throw(error);
    }
    Completion::Normal(())
}

// §16.2.1.5.1.1 InnerModuleLinking
fn inner_module_linking(agent: &Agent, module: ModuleId, stack: &mut Vec<ModuleId>, mut index: usize) -> Completion<usize> {
    let record = agent.module(module);
    match record.status() {
        ModuleStatus::Linking | ModuleStatus::Linked | ModuleStatus::Evaluating | ModuleStatus::Evaluated => {
            return Completion::Normal(index);
        }
        ModuleStatus::Unlinked => {}
    }
    record.set_status(ModuleStatus::Linking);
    record.dfs_index.set(Some(index));
    record.dfs_ancestor_index.set(Some(index));
    index += 1;
    stack.push(module);

    for request in &record.requested_modules {
        let required = q!(host_resolve_imported_module(agent, module, request));
        record.loaded_modules.borrow_mut().insert(request.clone(), required);
        index = q!(inner_module_linking(agent, required, stack, index));
        let required = agent.module(required);
        if required.status() == ModuleStatus::Linking {
            let ancestor = record.dfs_ancestor_index.get().min(required.dfs_ancestor_index.get());
            record.dfs_ancestor_index.set(ancestor);
        }
    }
    q!(initialize_environment(agent, module));

    if record.dfs_ancestor_index.get() == record.dfs_index.get() {
        while let Some(member) = stack.pop() {
            agent.module(member).set_status(ModuleStatus::Linked);
            if member == module {
                break;
            }
        }
    }
    Completion::Normal(index)
}

// §16.2.1.5.2 Evaluate. Without top-level await the whole graph finishes
// synchronously; a failure is recorded on every module still on the stack.
pub fn evaluate(agent: &Agent, module: ModuleId) -> Completion<()> {
    let mut stack = Vec::new();
    match inner_module_evaluation(agent, module, &mut stack, 0) {
        Completion::Throw(error) => {
            for m in stack {
                let record = agent.module(m);
                record.set_status(ModuleStatus::Evaluated);
                *record.evaluation_error.borrow_mut() = Some(error.clone());
            }
            Completion::Throw(error)
        }
        other => other.map(|_| ()),
    }
}

// §16.2.1.5.2.1 InnerModuleEvaluation
fn inner_module_evaluation(agent: &Agent, module: ModuleId, stack: &mut Vec<ModuleId>, mut index: usize) -> Completion<usize> {
    let record = agent.module(module);
    match record.status() {
        ModuleStatus::Evaluated => {
            return match record.evaluation_error() {
                Some(error) => Completion::Throw(error),
                None => Completion::Normal(index),
            };
        }
        ModuleStatus::Evaluating => return Completion::Normal(index),
        ModuleStatus::Linked => {}
        status => panic!("evaluating module {} in state {status:?}", record.name()),
    }
    record.set_status(ModuleStatus::Evaluating);
    record.dfs_index.set(Some(index));
    record.dfs_ancestor_index.set(Some(index));
    index += 1;
    stack.push(module);

    for request in &record.requested_modules {
        let required = record.imported_module(request);
        index = q!(inner_module_evaluation(agent, required, stack, index));
        let required = agent.module(required);
        if required.status() == ModuleStatus::Evaluating {
            let ancestor = record.dfs_ancestor_index.get().min(required.dfs_ancestor_index.get());
            record.dfs_ancestor_index.set(ancestor);
        }
    }
    q!(execute_module(agent, module));

    if record.dfs_ancestor_index.get() == record.dfs_index.get() {
        while let Some(member) = stack.pop() {
            agent.module(member).set_status(ModuleStatus::Evaluated);
            if member == module {
                break;
            }
        }
    }
    Completion::Normal(index)
}

// §16.2.1.6.5 ExecuteModule
fn execute_module(agent: &Agent, module: ModuleId) -> Completion<()> {
    let record = agent.module(module);
    let Some(env) = record.environment() else {
        panic!("module {} executed before linking", record.name());
    };
    debug!(module = %record.name(), "executing module");
    let ctx = module_context(&record, module, &env);
    q!(agent.check_call_depth());
    agent.push_context(ctx.clone());
    let result = run_to_completion(async {
        for item in &record.code.items {
            match item {
                ModuleItem::Statement(s) | ModuleItem::Export(ExportDeclaration::Declaration(s)) => {
                    q!(evaluate_statement(agent, s).await);
                }
                ModuleItem::Export(ExportDeclaration::DefaultExpression(e)) => {
                    let value = if e.is_anonymous_function_definition() {
                        q!(named_evaluation(agent, e, &PropertyKey::from("default")).await)
                    } else {
                        q!(evaluate_expression(agent, e).await)
                    };
                    q!(env.initialize_binding(agent, DEFAULT_BINDING, value));
                }
                ModuleItem::Export(ExportDeclaration::DefaultClass(c)) => {
                    let name = match &c.name {
                        Some(n) => PropertyKey::from(&**n),
                        None => PropertyKey::from("default"),
                    };
                    let class = q!(class_definition_evaluation(agent, c, c.name.clone(), name).await);
                    let binding = c.name.as_deref().unwrap_or(DEFAULT_BINDING);
                    q!(env.initialize_binding(agent, binding, JsValue::Object(class)));
                }
                _ => {}
            }
        }
        Completion::Normal(())
    });
    agent.pop_context(Some(&ctx));
    result
}

/// TopLevelModuleEvaluationJob: enqueues parsing, linking and evaluation of
/// a root module in the current realm.
pub fn top_level_module_evaluation_job(agent: &Agent, source: String, specifier: Option<String>) {
    agent.enqueue_job("ScriptJobs", move |agent| {
        let realm = agent.current_realm();
        let module = q!(parse_module(agent, &source, realm, specifier));
        q!(link(agent, module));
        evaluate(agent, module).map(|()| JsValue::Undefined)
    });
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use rustc_hash::FxHashMap;

    use super::*;
    use crate::abstract_ops::conversion::to_string;
    use crate::engine::{Feature, HostDefinedOptions};
    use crate::evaluator::evaluate_script;

    /// An agent whose host resolves specifiers against an in-memory table,
    /// loading each specifier once.
    fn host(sources: &[(&'static str, &'static str)]) -> Agent {
        let table: FxHashMap<&'static str, &'static str> = sources.iter().copied().collect();
        let loaded: RefCell<FxHashMap<String, ModuleId>> = RefCell::default();
        let options = HostDefinedOptions::default()
            .with_feature(Feature::GlobalThis)
            .on_resolve_imported_module(move |agent, _referrer, specifier| {
                if let Some(id) = loaded.borrow().get(specifier) {
                    return Completion::Normal(*id);
                }
                let Some(source) = table.get(specifier) else {
                    return agent.throw(ErrorKind::Error, Message::CouldNotResolveModule(specifier.to_owned()));
                };
                let id = q!(parse_module(agent, source, agent.current_realm(), Some(specifier.to_owned())));
                loaded.borrow_mut().insert(specifier.to_owned(), id);
                Completion::Normal(id)
            });
        let agent = Agent::new(options);
        agent.initialize_host_defined_realm();
        agent
    }

    fn load(agent: &Agent, specifier: &str) -> ModuleId {
        let Some(hook) = agent.options().resolve_imported_module.clone() else {
            unreachable!("test host always resolves");
        };
        x!(hook(agent, None, specifier))
    }

    fn global(agent: &Agent, name: &str) -> String {
        match evaluate_script(agent, name, None) {
            Completion::Normal(v) => x!(to_string(agent, &v)).to_rust_string(),
            Completion::Throw(e) => format!("Throw: {}", agent.inspect(&e)),
            other => panic!("unexpected {}", other.kind()),
        }
    }

    #[test]
    fn cyclic_imports_link_and_see_each_others_bindings() {
        let agent = host(&[
            (
                "a",
                "import { b, readA } from 'b'; export const a = 'A'; globalThis.result = b + readA();",
            ),
            ("b", "import { a } from 'a'; export const b = 'B'; export function readA() { return a; }"),
        ]);
        let a = load(&agent, "a");
        assert!(!link(&agent, a).is_abrupt());
        assert_eq!(agent.module(a).status(), ModuleStatus::Linked);
        assert!(!evaluate(&agent, a).is_abrupt());
        assert_eq!(global(&agent, "result"), "BA");
        let b = agent.module(a).imported_module("b");
        assert_eq!(agent.module(b).status(), ModuleStatus::Evaluated);
    }

    #[test]
    fn each_module_body_runs_once_in_dependency_order() {
        let agent = host(&[
            ("root", "import 'left'; import 'right'; globalThis.log.push('root');"),
            ("left", "import 'shared'; globalThis.log.push('left');"),
            ("right", "import 'shared'; globalThis.log.push('right');"),
            ("shared", "globalThis.log = globalThis.log || []; globalThis.log.push('shared');"),
        ]);
        let root = load(&agent, "root");
        assert!(!link(&agent, root).is_abrupt());
        assert!(!evaluate(&agent, root).is_abrupt());
        assert!(!evaluate(&agent, root).is_abrupt());
        assert_eq!(global(&agent, "log.join()"), "shared,left,right,root");
    }

    #[test]
    fn unresolvable_imports_roll_the_graph_back() {
        let agent = host(&[("main", "import { missing } from 'dep';"), ("dep", "export const present = 1;")]);
        let main = load(&agent, "main");
        let Completion::Throw(error) = link(&agent, main) else {
            panic!("link succeeded");
        };
        assert_eq!(agent.inspect(&error), "SyntaxError: Could not resolve import missing from dep");
        assert_eq!(agent.module(main).status(), ModuleStatus::Unlinked);
        assert!(agent.module(main).environment().is_none());
    }

    #[test]
    fn evaluation_errors_are_sticky() {
        let agent = host(&[
            ("main", "import 'bad';"),
            ("bad", "globalThis.runs = (globalThis.runs || 0) + 1; throw new RangeError('boom');"),
        ]);
        let main = load(&agent, "main");
        assert!(!link(&agent, main).is_abrupt());
        let Completion::Throw(first) = evaluate(&agent, main) else {
            panic!("evaluation succeeded");
        };
        let Completion::Throw(second) = evaluate(&agent, main) else {
            panic!("second evaluation succeeded");
        };
        assert!(crate::abstract_ops::comparison::same_value(&first, &second));
        assert_eq!(global(&agent, "runs"), "1");
        assert_eq!(agent.module(main).status(), ModuleStatus::Evaluated);
    }

    #[test]
    fn star_exports_resolve_and_detect_ambiguity() {
        let agent = host(&[
            ("main", "export * from 'x'; export * from 'y'; export const own = 0;"),
            ("x", "export const shared = 1; export const onlyX = 2; export default 9;"),
            ("y", "export const shared = 3;"),
        ]);
        let main = load(&agent, "main");
        assert!(!link(&agent, main).is_abrupt());
        assert_eq!(resolve_export(&agent, main, "shared", &mut Vec::new()), ResolvedBinding::Ambiguous);
        assert!(matches!(
            resolve_export(&agent, main, "onlyX", &mut Vec::new()),
            ResolvedBinding::Resolved { binding, .. } if &*binding == "onlyX"
        ));
        assert_eq!(resolve_export(&agent, main, "default", &mut Vec::new()), ResolvedBinding::NotFound);
        let names = get_exported_names(&agent, main, &mut Vec::new());
        assert_eq!(names.iter().map(|n| &**n).collect::<Vec<_>>(), ["own", "shared", "onlyX"]);
    }

    #[test]
    fn circular_star_exports_terminate() {
        let agent = host(&[("p", "export * from 'q'; export const p = 1;"), ("q", "export * from 'p';")]);
        let p = load(&agent, "p");
        assert!(!link(&agent, p).is_abrupt());
        assert_eq!(resolve_export(&agent, p, "nothing", &mut Vec::new()), ResolvedBinding::NotFound);
    }

    #[test]
    fn namespaces_are_sorted_and_live() {
        let agent = host(&[
            (
                "main",
                "import * as ns from 'counter'; globalThis.keys = Object.keys(ns).join(); ns.bump(); globalThis.count = ns.count;",
            ),
            ("counter", "export let count = 0; export function bump() { count++; } export const alpha = 1;"),
        ]);
        let main = load(&agent, "main");
        assert!(!link(&agent, main).is_abrupt());
        assert!(!evaluate(&agent, main).is_abrupt());
        assert_eq!(global(&agent, "keys"), "alpha,bump,count");
        assert_eq!(global(&agent, "count"), "1");
    }

    #[test]
    fn default_exports_in_every_form() {
        let agent = host(&[
            (
                "main",
                "import f from 'fn'; import C from 'cls'; import v from 'expr'; import * as re from 'reexport';
                 globalThis.out = [f(), f.name, new C().k, C.name, v, re.ns.value].join();",
            ),
            ("fn", "export default function () { return 'f'; }"),
            ("cls", "export default class { constructor() { this.k = 'c'; } }"),
            ("expr", "export default 6 * 7;"),
            ("reexport", "export * as ns from 'plain';"),
            ("plain", "export const value = 'v';"),
        ]);
        let main = load(&agent, "main");
        assert!(!link(&agent, main).is_abrupt());
        let result = evaluate(&agent, main);
        assert!(!result.is_abrupt());
        assert_eq!(global(&agent, "out"), "f,default,c,default,42,v");
    }

    #[test]
    fn imported_bindings_are_read_only_and_tdz_checked() {
        let agent = host(&[
            ("main", "import { x } from 'dep'; try { x = 2; } catch (e) { globalThis.err = e.name; }"),
            ("dep", "export let x = 1;"),
        ]);
        let main = load(&agent, "main");
        assert!(!link(&agent, main).is_abrupt());
        assert!(!evaluate(&agent, main).is_abrupt());
        assert_eq!(global(&agent, "err"), "TypeError");

        let agent = host(&[
            ("early", "import { late } from 'later'; globalThis.seen = late;"),
            ("later", "import 'early'; export let late = 1;"),
        ]);
        let later = load(&agent, "later");
        assert!(!link(&agent, later).is_abrupt());
        let Completion::Throw(error) = evaluate(&agent, later) else {
            panic!("read of an uninitialized import succeeded");
        };
        assert!(agent.inspect(&error).starts_with("ReferenceError"));
    }
}
