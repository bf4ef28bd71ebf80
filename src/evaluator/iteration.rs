//! §14.7 Iteration statements.

use std::rc::Rc;

use crate::abstract_ops::conversion::{to_boolean, to_object};
use crate::abstract_ops::iterator::{
    IteratorHint, IteratorRecord, get_iterator, iterator_close, iterator_complete, iterator_value,
};
use crate::abstract_ops::{call, get};
use crate::ast::{ForBinding, ForInOfStatement, ForInit, ForStatement, Pattern, Statement, VarKind, WhileStatement};
use crate::builtins::iterators::create_for_in_iterator;
use crate::completion::{Completion, StatementCompletion};
use crate::engine::{Agent, ErrorKind, Message};
use crate::environment::{Environment, new_declarative_environment};
use crate::evaluator::coroutine::{async_iterator_close, await_value};
use crate::evaluator::expressions::evaluate_expression;
use crate::evaluator::patterns::bind_pattern;
use crate::evaluator::statements::{evaluate_statement, loop_continues, variable_declaration_evaluation};
use crate::object::PropertyKey;
use crate::types::JsValue;

#[derive(Clone, Copy, PartialEq, Eq)]
enum IterationKind {
    Enumerate,
    Iterate,
    AsyncIterate,
}

// §14.7.1.1 LoopEvaluation
pub async fn loop_evaluation(agent: &Agent, stmt: &Statement, labels: &[Rc<str>]) -> StatementCompletion {
    match stmt {
        Statement::DoWhile(s) => do_while_evaluation(agent, s, labels).await,
        Statement::While(s) => while_evaluation(agent, s, labels).await,
        Statement::For(s) => for_evaluation(agent, s, labels).await,
        Statement::ForIn(s) => for_in_evaluation(agent, s, labels).await,
        Statement::ForOf(s) => for_of_evaluation(agent, s, labels).await,
        _ => unreachable!("loop evaluation of a non-iteration statement"),
    }
}

// §14.7.2.2 DoWhileLoopEvaluation
async fn do_while_evaluation(agent: &Agent, s: &WhileStatement, labels: &[Rc<str>]) -> StatementCompletion {
    let mut v = JsValue::Undefined;
    loop {
        let result = evaluate_statement(agent, &s.body).await;
        if !loop_continues(&result, labels) {
            return result.update_empty(Some(v));
        }
        if let Some(value) = completion_value(&result) {
            v = value;
        }
        let test = q!(evaluate_expression(agent, &s.test).await);
        if !to_boolean(&test) {
            return Completion::Normal(Some(v));
        }
    }
}

// §14.7.3.2 WhileLoopEvaluation
async fn while_evaluation(agent: &Agent, s: &WhileStatement, labels: &[Rc<str>]) -> StatementCompletion {
    let mut v = JsValue::Undefined;
    loop {
        let test = q!(evaluate_expression(agent, &s.test).await);
        if !to_boolean(&test) {
            return Completion::Normal(Some(v));
        }
        let result = evaluate_statement(agent, &s.body).await;
        if !loop_continues(&result, labels) {
            return result.update_empty(Some(v));
        }
        if let Some(value) = completion_value(&result) {
            v = value;
        }
    }
}

fn completion_value(result: &StatementCompletion) -> Option<JsValue> {
    match result {
        Completion::Normal(v) | Completion::Continue { value: v, .. } | Completion::Break { value: v, .. } => v.clone(),
        _ => None,
    }
}

// §14.7.4.2 ForLoopEvaluation
async fn for_evaluation(agent: &Agent, s: &ForStatement, labels: &[Rc<str>]) -> StatementCompletion {
    match &s.init {
        Some(ForInit::Variable(decl)) if decl.kind != VarKind::Var => {
            let ctx = agent.running_execution_context();
            let old_env = ctx.lexical_environment();
            let loop_env = new_declarative_environment(Some(old_env.clone()));
            let is_const = decl.kind == VarKind::Const;
            let mut names = Vec::new();
            for d in &decl.declarations {
                d.target.bound_names(&mut names);
            }
            for name in &names {
                if is_const {
                    x!(loop_env.create_immutable_binding(agent, name, true));
                } else {
                    x!(loop_env.create_mutable_binding(agent, name, false));
                }
            }
            ctx.set_lexical_environment(loop_env);
            let declared = variable_declaration_evaluation(agent, decl).await;
            if declared.is_abrupt() {
                ctx.set_lexical_environment(old_env);
                return declared.into_abrupt();
            }
            let per_iteration = if is_const { Vec::new() } else { names };
            let result = for_body_evaluation(agent, s, &per_iteration, labels).await;
            ctx.set_lexical_environment(old_env);
            result
        }
        Some(ForInit::Variable(decl)) => {
            q!(variable_declaration_evaluation(agent, decl).await);
            for_body_evaluation(agent, s, &[], labels).await
        }
        Some(ForInit::Expression(e)) => {
            q!(evaluate_expression(agent, e).await);
            for_body_evaluation(agent, s, &[], labels).await
        }
        None => for_body_evaluation(agent, s, &[], labels).await,
    }
}

// §14.7.4.3 ForBodyEvaluation
async fn for_body_evaluation(
    agent: &Agent,
    s: &ForStatement,
    per_iteration: &[Rc<str>],
    labels: &[Rc<str>],
) -> StatementCompletion {
    let mut v = JsValue::Undefined;
    q!(create_per_iteration_environment(agent, per_iteration));
    loop {
        if let Some(test) = &s.test {
            let test = q!(evaluate_expression(agent, test).await);
            if !to_boolean(&test) {
                return Completion::Normal(Some(v));
            }
        }
        let result = evaluate_statement(agent, &s.body).await;
        if !loop_continues(&result, labels) {
            return result.update_empty(Some(v));
        }
        if let Some(value) = completion_value(&result) {
            v = value;
        }
        q!(create_per_iteration_environment(agent, per_iteration));
        if let Some(update) = &s.update {
            q!(evaluate_expression(agent, update).await);
        }
    }
}

// §14.7.4.4 CreatePerIterationEnvironment
fn create_per_iteration_environment(agent: &Agent, bindings: &[Rc<str>]) -> Completion<()> {
    if bindings.is_empty() {
        return Completion::Normal(());
    }
    let ctx = agent.running_execution_context();
    let last = ctx.lexical_environment();
    let this_iteration = new_declarative_environment(last.outer());
    for name in bindings {
        x!(this_iteration.create_mutable_binding(agent, name, false));
        let value = q!(last.get_binding_value(agent, name, true));
        x!(this_iteration.initialize_binding(agent, name, value));
    }
    ctx.set_lexical_environment(this_iteration);
    Completion::Normal(())
}

// §14.7.5.6 ForIn/OfHeadEvaluation
async fn head_evaluation(agent: &Agent, s: &ForInOfStatement) -> Completion {
    let tdz_names = match &s.left {
        ForBinding::Lexical(_, pattern) => {
            let mut names = Vec::new();
            pattern.bound_names(&mut names);
            names
        }
        _ => Vec::new(),
    };
    if tdz_names.is_empty() {
        return evaluate_expression(agent, &s.right).await;
    }
    let ctx = agent.running_execution_context();
    let old_env = ctx.lexical_environment();
    let tdz = new_declarative_environment(Some(old_env.clone()));
    for name in &tdz_names {
        x!(tdz.create_mutable_binding(agent, name, false));
    }
    ctx.set_lexical_environment(tdz);
    let value = evaluate_expression(agent, &s.right).await;
    ctx.set_lexical_environment(old_env);
    value
}

async fn for_in_evaluation(agent: &Agent, s: &ForInOfStatement, labels: &[Rc<str>]) -> StatementCompletion {
    let value = q!(head_evaluation(agent, s).await);
    if value.is_nullish() {
        return Completion::Break {
            target: None,
            value: None,
        };
    }
    let object = x!(to_object(agent, &value));
    let iterator = create_for_in_iterator(agent, object);
    let next_method = q!(get(agent, &iterator, &PropertyKey::from("next")));
    let record = IteratorRecord {
        iterator,
        next_method,
        done: Default::default(),
    };
    for_in_of_body_evaluation(agent, s, &record, IterationKind::Enumerate, labels).await
}

async fn for_of_evaluation(agent: &Agent, s: &ForInOfStatement, labels: &[Rc<str>]) -> StatementCompletion {
    let value = q!(head_evaluation(agent, s).await);
    let (hint, kind) = if s.is_await {
        (IteratorHint::Async, IterationKind::AsyncIterate)
    } else {
        (IteratorHint::Sync, IterationKind::Iterate)
    };
    let record = q!(get_iterator(agent, &value, hint));
    for_in_of_body_evaluation(agent, s, &record, kind, labels).await
}

async fn close(agent: &Agent, record: &IteratorRecord, kind: IterationKind, status: StatementCompletion) -> StatementCompletion {
    match kind {
        IterationKind::Enumerate => status,
        IterationKind::Iterate => iterator_close(agent, record, status),
        IterationKind::AsyncIterate => async_iterator_close(agent, record, status).await,
    }
}

// §14.7.5.7 ForIn/OfBodyEvaluation
async fn for_in_of_body_evaluation(
    agent: &Agent,
    s: &ForInOfStatement,
    record: &IteratorRecord,
    kind: IterationKind,
    labels: &[Rc<str>],
) -> StatementCompletion {
    let ctx = agent.running_execution_context();
    let old_env = ctx.lexical_environment();
    let mut v = JsValue::Undefined;
    loop {
        let mut next = q!(call(agent, &record.next_method, &JsValue::Object(record.iterator.clone()), &[]));
        if kind == IterationKind::AsyncIterate {
            next = q!(await_value(agent, next).await);
        }
        let JsValue::Object(next) = next else {
            return agent.throw(ErrorKind::Type, Message::NotAnObject(agent.inspect(&next)));
        };
        if q!(iterator_complete(agent, &next)) {
            return Completion::Normal(Some(v));
        }
        let next_value = q!(iterator_value(agent, &next));

        let status = match &s.left {
            ForBinding::Assignment(pattern) | ForBinding::Var(pattern) => {
                bind_pattern(agent, pattern, next_value, None).await
            }
            ForBinding::Lexical(var_kind, pattern) => {
                let iteration_env = new_declarative_environment(Some(old_env.clone()));
                for_declaration_binding_instantiation(agent, *var_kind, pattern, &iteration_env);
                ctx.set_lexical_environment(iteration_env.clone());
                bind_pattern(agent, pattern, next_value, Some(&iteration_env)).await
            }
        };
        if status.is_abrupt() {
            ctx.set_lexical_environment(old_env);
            return close(agent, record, kind, status.into_abrupt()).await;
        }

        let result = evaluate_statement(agent, &s.body).await;
        ctx.set_lexical_environment(old_env.clone());
        if !loop_continues(&result, labels) {
            let status = result.update_empty(Some(v));
            return close(agent, record, kind, status).await;
        }
        if let Some(value) = completion_value(&result) {
            v = value;
        }
    }
}

// §14.7.5.4 ForDeclarationBindingInstantiation
fn for_declaration_binding_instantiation(agent: &Agent, kind: VarKind, pattern: &Pattern, env: &Environment) {
    let mut names = Vec::new();
    pattern.bound_names(&mut names);
    for name in &names {
        if kind == VarKind::Const {
            x!(env.create_immutable_binding(agent, name, true));
        } else {
            x!(env.create_mutable_binding(agent, name, false));
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::evaluator::test_support::{eval_after_jobs, eval_to_string};

    #[test]
    fn while_and_do_while() {
        assert_eq!(eval_to_string("var i = 0; while (i < 5) i++; i"), "5");
        assert_eq!(eval_to_string("var i = 10; do { i++; } while (i < 5); i"), "11");
        assert_eq!(eval_to_string("var i = 0; while (true) { if (++i > 3) break; 'body'; }"), "undefined");
    }

    #[test]
    fn let_bindings_are_copied_per_iteration() {
        assert_eq!(
            eval_to_string("var fs = []; for (let i = 0; i < 3; i++) fs.push(() => i); fs.map(f => f()).join()"),
            "0,1,2"
        );
        assert_eq!(
            eval_to_string("var fs = []; for (var i = 0; i < 3; i++) fs.push(() => i); fs.map(f => f()).join()"),
            "3,3,3"
        );
    }

    #[test]
    fn for_in_visits_enumerable_string_keys_along_the_chain() {
        assert_eq!(
            eval_to_string(
                "var p = { inherited: 1 }; var o = Object.create(p); o.b = 1; o.a = 2; o[1] = 0; var ks = []; for (var k in o) ks.push(k); ks.join()"
            ),
            "1,b,a,inherited"
        );
        assert_eq!(eval_to_string("var n = 0; for (var k in null) n++; n"), "0");
    }

    #[test]
    fn for_in_skips_keys_deleted_during_iteration() {
        assert_eq!(
            eval_to_string("var o = { a: 1, b: 2, c: 3 }; var ks = []; for (var k in o) { ks.push(k); delete o.b; } ks.join()"),
            "a,c"
        );
    }

    #[test]
    fn for_of_closes_iterator_on_break() {
        assert_eq!(
            eval_to_string(
                "var closed = false; var it = { [Symbol.iterator]() { return { next() { return { value: 1, done: false }; }, return() { closed = true; return {}; } }; } };
                 for (var x of it) break; closed"
            ),
            "true"
        );
    }

    #[test]
    fn for_of_closes_iterator_on_return_and_throw() {
        let iterable = "var closed = 0; var it = { [Symbol.iterator]() { return { next() { return { value: 1, done: false }; }, return() { closed++; return {}; } }; } };";
        assert_eq!(
            eval_to_string(&format!("{iterable} function f() {{ for (var x of it) return 'early'; }} f() + ',' + closed")),
            "early,1"
        );
        assert_eq!(
            eval_to_string(&format!("{iterable} try {{ for (var x of it) throw new Error('inside'); }} catch (e) {{ e.message + ',' + closed }}")),
            "inside,1"
        );
    }

    #[test]
    fn throw_in_body_wins_over_throwing_return() {
        assert_eq!(
            eval_to_string(
                "var it = { [Symbol.iterator]() { return { next() { return { value: 1, done: false }; }, return() { throw new Error('from return'); } }; } };
                 try { for (var x of it) throw new Error('from body'); } catch (e) { e.message }"
            ),
            "from body"
        );
    }

    #[test]
    fn for_of_with_destructuring_and_const() {
        assert_eq!(
            eval_to_string("var s = 0; for (const [a, b] of [[1, 2], [3, 4]]) s += a * b; s"),
            "14"
        );
        assert!(eval_to_string("for (const x of [1]) { x = 2; }").starts_with("Throw: "));
    }

    #[test]
    fn for_of_tdz_covers_the_iterated_expression() {
        assert!(eval_to_string("let x = [1]; for (let x of x) {}").starts_with("Throw: "));
    }

    #[test]
    fn for_await_over_sync_iterable_of_promises() {
        assert_eq!(
            eval_after_jobs(
                "var out = []; (async function () { for await (const v of [Promise.resolve(1), 2]) out.push(v); })();",
                "out.join()"
            ),
            "1,2"
        );
    }
}
