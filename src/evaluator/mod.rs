//! Runtime semantics: evaluation of scripts, statements and expressions.
//!
//! Evaluation functions are futures producing a [`Completion`]. Ordinary code
//! never suspends, so its futures are polled once by [`run_to_completion`].
//! Generator and async function bodies are stored in a
//! [`coroutine::Coroutine`] and polled again each time they are resumed.

pub mod classes;
pub mod coroutine;
pub mod eval;
pub mod expressions;
pub mod functions;
pub mod iteration;
pub mod patterns;
pub mod reference;
pub mod statements;

use std::future::Future;
use std::pin::pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::future::LocalBoxFuture;
use futures::task::noop_waker_ref;
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::ast::{Declaration, Script, top_level_lexically_scoped_declarations, top_level_var_scoped_declarations};
use crate::completion::Completion;
use crate::engine::{Agent, ErrorKind, ExecutionContext, Message, Realm, ScriptOrModule, ScriptRecord};
use crate::environment::Environment;
use crate::parser::parse_script;
use crate::types::JsValue;

use functions::instantiate_function_object;

/// A boxed evaluation step. Recursive evaluation goes through this type.
pub type Eval<'a, T = JsValue> = LocalBoxFuture<'a, Completion<T>>;

/// Polls allowed before a synchronous evaluation must have finished.
const STEP_BOUND: usize = 1;

/// Remaining native stack below which a poll switches to a fresh segment.
pub(crate) const STACK_RED_ZONE: usize = 256 * 1024;
/// Size of each stack segment allocated for deep evaluation.
pub(crate) const STACK_SEGMENT: usize = 16 * 1024 * 1024;

/// Drives a future that cannot suspend to its result.
///
/// Every function body, script and module body passes through here, so the
/// native stack is grown at this point; the agent's call-depth limit then
/// fires before the host stack runs out.
///
/// Panics if the future is still pending after [`STEP_BOUND`] polls: only
/// coroutine bodies may suspend, and those are never driven here.
pub fn run_to_completion<F: Future>(future: F) -> F::Output {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, move || {
        let mut future = pin!(future);
        let mut cx = Context::from_waker(noop_waker_ref());
        for _ in 0..STEP_BOUND {
            if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
                return output;
            }
        }
        panic!("synchronous evaluation suspended (step bound {STEP_BOUND} exceeded)");
    })
}

// §16.1.5 ParseScript
pub fn parse_script_record(
    agent: &Agent,
    source: &str,
    realm: Realm,
    specifier: Option<String>,
) -> Completion<Rc<ScriptRecord>> {
    match parse_script(source) {
        Ok(code) => Completion::Normal(Rc::new(ScriptRecord {
            realm,
            code: Rc::new(code),
            specifier,
        })),
        Err(e) => {
            debug!(position = ?e.position, "script failed to parse");
            agent.throw(ErrorKind::Syntax, Message::Syntax(e.to_string()))
        }
    }
}

// §16.1.6 ScriptEvaluation
pub fn script_evaluation(agent: &Agent, script: &Rc<ScriptRecord>) -> Completion {
    let global_env = script.realm.global_env();
    let ctx = ExecutionContext::toplevel(
        script.realm.clone(),
        Some(ScriptOrModule::Script(script.clone())),
    );
    ctx.set_lexical_environment(global_env.clone());
    ctx.set_variable_environment(global_env.clone());
    q!(agent.check_call_depth());
    agent.push_context(ctx.clone());
    let mut result = global_declaration_instantiation(agent, &script.code, &global_env).map(|()| None);
    if !result.is_abrupt() {
        result = run_to_completion(statements::evaluate_statement_list(agent, &script.code.body));
    }
    agent.pop_context(Some(&ctx));
    match result {
        Completion::Normal(value) => Completion::Normal(value.unwrap_or(JsValue::Undefined)),
        other => other.into_abrupt(),
    }
}

/// ScriptEvaluationJob: enqueues parsing and evaluation of `source` in the
/// current realm.
pub fn script_evaluation_job(agent: &Agent, source: String, specifier: Option<String>) {
    agent.enqueue_job("ScriptJobs", move |agent| {
        let realm = agent.current_realm();
        let script = q!(parse_script_record(agent, &source, realm, specifier));
        script_evaluation(agent, &script)
    });
}

/// Parses and evaluates a script synchronously in the current realm.
pub fn evaluate_script(agent: &Agent, source: &str, specifier: Option<String>) -> Completion {
    let realm = agent.current_realm();
    let script = q!(parse_script_record(agent, source, realm, specifier));
    script_evaluation(agent, &script)
}

fn syntax_error<T>(agent: &Agent, text: String) -> Completion<T> {
    agent.throw(ErrorKind::Syntax, Message::Syntax(text))
}

/// Function declarations to instantiate, last declaration of each name
/// winning, in source order of those winners.
pub(crate) fn functions_to_initialize<'a>(var_declarations: &[Declaration<'a>]) -> Vec<&'a Rc<crate::ast::FunctionNode>> {
    let mut seen: FxHashSet<Rc<str>> = FxHashSet::default();
    let mut out = Vec::new();
    for d in var_declarations.iter().rev() {
        if let Declaration::Function(f) = d
            && let Some(name) = &f.name
            && seen.insert(name.clone())
        {
            out.push(*f);
        }
    }
    out.reverse();
    out
}

// §16.1.7 GlobalDeclarationInstantiation
pub fn global_declaration_instantiation(agent: &Agent, script: &Script, env: &Environment) -> Completion<()> {
    let lexical = top_level_lexically_scoped_declarations(&script.body);
    let var_declarations = top_level_var_scoped_declarations(&script.body);
    let lex_names: Vec<Rc<str>> = lexical.iter().flat_map(Declaration::bound_names).collect();
    let var_names: Vec<Rc<str>> = var_declarations.iter().flat_map(Declaration::bound_names).collect();

    for name in &lex_names {
        if env.has_var_declaration(name) || env.has_lexical_declaration(name) {
            return syntax_error(agent, format!("Identifier '{name}' has already been declared"));
        }
        if q!(env.has_restricted_global_property(agent, name)) {
            return syntax_error(agent, format!("Cannot redefine restricted global '{name}'"));
        }
    }
    for name in &var_names {
        if env.has_lexical_declaration(name) {
            return syntax_error(agent, format!("Identifier '{name}' has already been declared"));
        }
    }

    let functions = functions_to_initialize(&var_declarations);
    let function_names: FxHashSet<Rc<str>> = functions.iter().filter_map(|f| f.name.clone()).collect();
    for f in functions.iter().rev() {
        let name = f.name.as_deref().unwrap_or_default();
        if !q!(env.can_declare_global_function(agent, name)) {
            return agent.throw(ErrorKind::Type, Message::CannotDefineProperty(name.to_owned()));
        }
    }

    let mut declared_var_names: Vec<Rc<str>> = Vec::new();
    for d in &var_declarations {
        if !matches!(d, Declaration::Var(_)) {
            continue;
        }
        for name in d.bound_names() {
            if function_names.contains(&name) {
                continue;
            }
            if !q!(env.can_declare_global_var(agent, &name)) {
                return agent.throw(ErrorKind::Type, Message::CannotDefineProperty(name.to_string()));
            }
            if !declared_var_names.contains(&name) {
                declared_var_names.push(name);
            }
        }
    }

    for d in &lexical {
        for name in d.bound_names() {
            if d.is_constant() {
                q!(env.create_immutable_binding(agent, &name, true));
            } else {
                q!(env.create_mutable_binding(agent, &name, false));
            }
        }
    }
    for f in functions {
        let name = f.name.as_deref().unwrap_or_default();
        let fo = instantiate_function_object(agent, f, env);
        q!(env.create_global_function_binding(agent, name, JsValue::Object(fo), false));
    }
    for name in declared_var_names {
        q!(env.create_global_var_binding(agent, &name, false));
    }
    Completion::Normal(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::abstract_ops::conversion::to_string;

    /// Evaluates `source` as a script in a fresh agent and drains the job
    /// queue. Returns the agent for further inspection.
    pub fn run(source: &str) -> (Agent, Completion) {
        let agent = crate::engine::test_agent();
        let result = evaluate_script(&agent, source, None);
        agent.run_jobs();
        (agent, result)
    }

    /// The script's completion value rendered with ToString, or the thrown
    /// error's rendering prefixed with `Throw: `.
    pub fn eval_to_string(source: &str) -> String {
        let (agent, result) = run(source);
        match result {
            Completion::Normal(v) => x!(to_string(&agent, &v)).to_rust_string(),
            Completion::Throw(e) => format!("Throw: {}", agent.inspect(&e)),
            other => panic!("unexpected completion {}", other.kind()),
        }
    }

    /// Evaluates `setup`, drains the job queue, then evaluates `query` and
    /// renders its value.
    pub fn eval_after_jobs(setup: &str, query: &str) -> String {
        let (agent, result) = run(setup);
        if let Completion::Throw(e) = result {
            panic!("setup threw {}", agent.inspect(&e));
        }
        eval_in(&agent, query)
    }

    /// Evaluates `source` in an existing agent (one built with custom host
    /// options, say), drains the job queue, and renders the result.
    pub fn eval_in(agent: &Agent, source: &str) -> String {
        let result = evaluate_script(agent, source, None);
        agent.run_jobs();
        match result {
            Completion::Normal(v) => x!(to_string(agent, &v)).to_rust_string(),
            Completion::Throw(e) => format!("Throw: {}", agent.inspect(&e)),
            other => panic!("unexpected completion {}", other.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::eval_to_string;

    #[test]
    fn completion_value_of_a_script_is_its_last_value() {
        assert_eq!(eval_to_string("1; 2; if (true) { 3; }"), "3");
        assert_eq!(eval_to_string("var x = 1;"), "undefined");
    }

    #[test]
    fn global_lexical_and_var_conflicts_are_syntax_errors() {
        let (agent, _) = super::test_support::run("let a = 1;");
        let again = super::evaluate_script(&agent, "var a;", None);
        assert!(again.is_throw());
        let again = super::evaluate_script(&agent, "let a;", None);
        assert!(again.is_throw());
    }

    #[test]
    fn function_declarations_are_hoisted() {
        assert_eq!(eval_to_string("f(); function f() { return 'hoisted'; } f()"), "hoisted");
    }

    #[test]
    #[should_panic]
    fn suspending_in_synchronous_evaluation_panics() {
        struct Never;
        impl std::future::Future for Never {
            type Output = ();
            fn poll(self: std::pin::Pin<&mut Self>, _: &mut std::task::Context<'_>) -> std::task::Poll<()> {
                std::task::Poll::Pending
            }
        }
        super::run_to_completion(Never);
    }
}
