//! §14 Statements and declarations.

use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::abstract_ops::comparison::is_strictly_equal;
use crate::abstract_ops::conversion::to_boolean;
use crate::ast::{
    CatchClause, Declaration, Pattern, Statement, SwitchStatement, TryStatement, VarKind, VariableDeclaration,
    lexically_scoped_declarations,
};
use crate::completion::{Completion, StatementCompletion};
use crate::engine::Agent;
use crate::environment::{Environment, new_declarative_environment};
use crate::evaluator::classes::class_definition_evaluation;
use crate::evaluator::coroutine::{await_value, in_async_generator};
use crate::evaluator::expressions::{evaluate_expression, named_evaluation, resolve_binding};
use crate::evaluator::functions::instantiate_function_object;
use crate::evaluator::patterns::bind_pattern;
use crate::evaluator::{Eval, iteration};
use crate::object::PropertyKey;
use crate::types::JsValue;

// §14.2.2 StatementList evaluation
pub async fn evaluate_statement_list(agent: &Agent, stmts: &[Statement]) -> StatementCompletion {
    let mut last = None;
    for stmt in stmts {
        match evaluate_statement(agent, stmt).await {
            Completion::Normal(value) => {
                if value.is_some() {
                    last = value;
                }
            }
            abrupt => return abrupt.update_empty(last),
        }
    }
    Completion::Normal(last)
}

pub fn evaluate_statement<'a>(agent: &'a Agent, stmt: &'a Statement) -> Eval<'a, Option<JsValue>> {
    Box::pin(async move {
        match stmt {
            Statement::Empty | Statement::Debugger | Statement::FunctionDeclaration(_) => Completion::Normal(None),
            Statement::Expression(e) => evaluate_expression(agent, e).await.map(Some),
            Statement::Block(stmts) => block_evaluation(agent, stmts).await,
            Statement::Variable(decl) => {
                q!(variable_declaration_evaluation(agent, decl).await);
                Completion::Normal(None)
            }
            Statement::ClassDeclaration(class) => {
                // §15.7.16 BindingClassDeclarationEvaluation
                let Some(name) = &class.name else {
                    unreachable!("class declaration without a name");
                };
                let value = q!(class_definition_evaluation(agent, class, Some(name.clone()), PropertyKey::from(&**name)).await);
                let env = agent.running_execution_context().lexical_environment();
                q!(env.initialize_binding(agent, name, JsValue::Object(value)));
                Completion::Normal(None)
            }
            Statement::If(s) => {
                let test = q!(evaluate_expression(agent, &s.test).await);
                let result = if to_boolean(&test) {
                    evaluate_statement(agent, &s.consequent).await
                } else {
                    match &s.alternate {
                        Some(alternate) => evaluate_statement(agent, alternate).await,
                        None => Completion::Normal(None),
                    }
                };
                result.update_empty(Some(JsValue::Undefined))
            }
            Statement::DoWhile(_)
            | Statement::While(_)
            | Statement::For(_)
            | Statement::ForIn(_)
            | Statement::ForOf(_)
            | Statement::Switch(_)
            | Statement::Labeled(..) => labelled_evaluation(agent, stmt, Vec::new()).await,
            Statement::Continue(label) => Completion::Continue {
                target: label.clone(),
                value: None,
            },
            Statement::Break(label) => Completion::Break {
                target: label.clone(),
                value: None,
            },
            Statement::Return(argument) => {
                let Some(argument) = argument else {
                    return Completion::Return(JsValue::Undefined);
                };
                let mut value = q!(evaluate_expression(agent, argument).await);
                if in_async_generator(agent) {
                    value = q!(await_value(agent, value).await);
                }
                Completion::Return(value)
            }
            Statement::Throw(argument, position) => {
                let value = q!(evaluate_expression(agent, argument).await);
                agent
                    .running_execution_context()
                    .call_site_mut()
                    .set_location(*position, None);
                Completion::Throw(value)
            }
            Statement::Try(t) => try_evaluation(agent, t).await,
        }
    })
}

// §14.13.4 LabelledEvaluation
fn labelled_evaluation<'a>(agent: &'a Agent, stmt: &'a Statement, mut labels: Vec<Rc<str>>) -> Eval<'a, Option<JsValue>> {
    Box::pin(async move {
        let result = match stmt {
            Statement::Labeled(label, body) => {
                labels.push(label.clone());
                let result = labelled_evaluation(agent, body, labels).await;
                return match result {
                    Completion::Break { target: Some(target), value } if target == *label => Completion::Normal(value),
                    other => other,
                };
            }
            Statement::DoWhile(_)
            | Statement::While(_)
            | Statement::For(_)
            | Statement::ForIn(_)
            | Statement::ForOf(_) => iteration::loop_evaluation(agent, stmt, &labels).await,
            Statement::Switch(s) => switch_evaluation(agent, s).await,
            other => return evaluate_statement(agent, other).await,
        };
        // a breakable statement consumes an unlabelled break
        match result {
            Completion::Break { target: None, value } => Completion::Normal(Some(value.unwrap_or(JsValue::Undefined))),
            other => other,
        }
    })
}

/// §14.7.1.2 LoopContinues
pub(crate) fn loop_continues(completion: &StatementCompletion, labels: &[Rc<str>]) -> bool {
    match completion {
        Completion::Normal(_) => true,
        Completion::Continue { target: None, .. } => true,
        Completion::Continue { target: Some(t), .. } => labels.contains(t),
        _ => false,
    }
}

// §14.2.2 Block evaluation
pub async fn block_evaluation(agent: &Agent, stmts: &[Statement]) -> StatementCompletion {
    let declarations = lexically_scoped_declarations(stmts);
    if declarations.is_empty() {
        return evaluate_statement_list(agent, stmts).await;
    }
    let ctx = agent.running_execution_context();
    let old_env = ctx.lexical_environment();
    let block_env = new_declarative_environment(Some(old_env.clone()));
    block_declaration_instantiation(agent, &declarations, &block_env);
    ctx.set_lexical_environment(block_env);
    let result = evaluate_statement_list(agent, stmts).await;
    ctx.set_lexical_environment(old_env);
    result
}

// §14.2.3 BlockDeclarationInstantiation
pub(crate) fn block_declaration_instantiation(agent: &Agent, declarations: &[Declaration<'_>], env: &Environment) {
    let mut initialized: FxHashSet<Rc<str>> = FxHashSet::default();
    for d in declarations {
        for name in d.bound_names() {
            if d.is_constant() {
                x!(env.create_immutable_binding(agent, &name, true));
            } else if !x!(env.has_binding(agent, &name)) {
                x!(env.create_mutable_binding(agent, &name, false));
            }
        }
        if let Declaration::Function(f) = d {
            let Some(name) = &f.name else {
                continue;
            };
            let fo = JsValue::Object(instantiate_function_object(agent, f, env));
            if initialized.insert(name.clone()) {
                x!(env.initialize_binding(agent, name, fo));
            } else {
                x!(env.set_mutable_binding(agent, name, fo, false));
            }
        }
    }
}

// §14.3.1.2 / §14.3.2.1 evaluation of let, const and var declarations
pub(crate) async fn variable_declaration_evaluation(agent: &Agent, decl: &VariableDeclaration) -> Completion<()> {
    for d in &decl.declarations {
        match (&d.target, &d.init) {
            (Pattern::Identifier(_), None) if decl.kind == VarKind::Var => {}
            (Pattern::Identifier(name), None) => {
                let reference = q!(resolve_binding(agent, name, None));
                q!(reference.initialize_referenced_binding(agent, JsValue::Undefined));
            }
            (Pattern::Identifier(name), Some(init)) => {
                let reference = q!(resolve_binding(agent, name, None));
                let value = q!(named_evaluation(agent, init, &PropertyKey::from(&**name)).await);
                if decl.kind == VarKind::Var {
                    q!(reference.put_value(agent, value));
                } else {
                    q!(reference.initialize_referenced_binding(agent, value));
                }
            }
            (pattern, init) => {
                let Some(init) = init else {
                    unreachable!("destructuring declaration without an initializer");
                };
                let value = q!(evaluate_expression(agent, init).await);
                let env = match decl.kind {
                    VarKind::Var => None,
                    _ => Some(agent.running_execution_context().lexical_environment()),
                };
                q!(bind_pattern(agent, pattern, value, env.as_ref()).await);
            }
        }
    }
    Completion::Normal(())
}

// §14.12.4 SwitchStatement evaluation
async fn switch_evaluation(agent: &Agent, s: &SwitchStatement) -> StatementCompletion {
    let input = q!(evaluate_expression(agent, &s.discriminant).await);
    let ctx = agent.running_execution_context();
    let old_env = ctx.lexical_environment();
    let block_env = new_declarative_environment(Some(old_env.clone()));
    for case in &s.cases {
        block_declaration_instantiation(agent, &lexically_scoped_declarations(&case.consequent), &block_env);
    }
    ctx.set_lexical_environment(block_env);
    let result = case_block_evaluation(agent, s, &input).await;
    ctx.set_lexical_environment(old_env);
    result
}

// §14.12.2 CaseBlockEvaluation
async fn case_block_evaluation(agent: &Agent, s: &SwitchStatement, input: &JsValue) -> StatementCompletion {
    let mut value: Option<JsValue> = None;
    let default_index = s.cases.iter().position(|c| c.test.is_none());
    let (before, after) = match default_index {
        Some(i) => (&s.cases[..i], &s.cases[i + 1..]),
        None => (&s.cases[..], &s.cases[s.cases.len()..]),
    };

    macro_rules! run_case {
        ($case:expr) => {
            match evaluate_statement_list(agent, &$case.consequent).await {
                Completion::Normal(v) => {
                    if v.is_some() {
                        value = v;
                    }
                }
                abrupt => return abrupt.update_empty(value),
            }
        };
    }

    let mut found = false;
    for case in before {
        if !found {
            found = q!(case_clause_is_selected(agent, case, input).await);
        }
        if found {
            run_case!(case);
        }
    }
    let Some(default_index) = default_index else {
        return Completion::Normal(value);
    };
    let mut found_in_after = false;
    if !found {
        for case in after {
            if !found_in_after {
                found_in_after = q!(case_clause_is_selected(agent, case, input).await);
            }
            if found_in_after {
                run_case!(case);
            }
        }
    }
    if found_in_after {
        return Completion::Normal(value);
    }
    run_case!(s.cases[default_index]);
    for case in after {
        run_case!(case);
    }
    Completion::Normal(value)
}

// §14.12.3 CaseClauseIsSelected
async fn case_clause_is_selected(agent: &Agent, case: &crate::ast::SwitchCase, input: &JsValue) -> Completion<bool> {
    let Some(test) = &case.test else {
        unreachable!("default clause tested as a case");
    };
    let selector = q!(evaluate_expression(agent, test).await);
    Completion::Normal(is_strictly_equal(input, &selector))
}

// §14.15.3 TryStatement evaluation
async fn try_evaluation(agent: &Agent, t: &TryStatement) -> StatementCompletion {
    let block = block_evaluation(agent, &t.block).await;
    let result = match (&t.handler, block) {
        (Some(handler), Completion::Throw(thrown)) => catch_clause_evaluation(agent, handler, thrown).await,
        (_, other) => other,
    };
    let result = match &t.finalizer {
        Some(finalizer) => match block_evaluation(agent, finalizer).await {
            Completion::Normal(_) => result,
            abrupt => abrupt,
        },
        None => result,
    };
    result.update_empty(Some(JsValue::Undefined))
}

// §14.15.2 CatchClauseEvaluation
async fn catch_clause_evaluation(agent: &Agent, handler: &CatchClause, thrown: JsValue) -> StatementCompletion {
    let Some(param) = &handler.param else {
        return block_evaluation(agent, &handler.body).await;
    };
    let ctx = agent.running_execution_context();
    let old_env = ctx.lexical_environment();
    let catch_env = new_declarative_environment(Some(old_env.clone()));
    let mut names = Vec::new();
    param.bound_names(&mut names);
    for name in &names {
        x!(catch_env.create_mutable_binding(agent, name, false));
    }
    ctx.set_lexical_environment(catch_env.clone());
    let status = bind_pattern(agent, param, thrown, Some(&catch_env)).await;
    if status.is_abrupt() {
        ctx.set_lexical_environment(old_env);
        return status.into_abrupt();
    }
    let result = block_evaluation(agent, &handler.body).await;
    ctx.set_lexical_environment(old_env);
    result
}

#[cfg(test)]
mod tests {
    use crate::evaluator::test_support::eval_to_string;

    #[test]
    fn block_scoping_and_tdz() {
        assert_eq!(eval_to_string("let x = 1; { let x = 2; } x"), "1");
        assert!(eval_to_string("{ x; let x = 1; }").starts_with("Throw: "));
        assert!(eval_to_string("const c = 1; c = 2;").starts_with("Throw: "));
    }

    #[test]
    fn switch_falls_through_and_finds_default_anywhere() {
        assert_eq!(
            eval_to_string("var r = []; switch (3) { case 1: r.push(1); default: r.push('d'); case 2: r.push(2); break; case 4: r.push(4); } r.join()"),
            "d,2"
        );
        assert_eq!(
            eval_to_string("var r = []; switch (2) { case 1: r.push(1); default: r.push('d'); case 2: r.push(2); } r.join()"),
            "2"
        );
        assert_eq!(eval_to_string("switch (1) { case 1: 'one'; break; case 2: 'two'; }"), "one");
    }

    #[test]
    fn try_catch_finally_completions() {
        assert_eq!(eval_to_string("try { throw 1; } catch (e) { e + 1 }"), "2");
        assert_eq!(eval_to_string("function f() { try { return 'try'; } finally { 'ignored'; } } f()"), "try");
        assert_eq!(eval_to_string("function f() { try { return 'try'; } finally { return 'fin'; } } f()"), "fin");
        assert_eq!(eval_to_string("try { throw { a: 5 }; } catch ({ a }) { a }"), "5");
        assert_eq!(eval_to_string("try { null.x } catch { 'caught' }"), "caught");
    }

    #[test]
    fn labelled_break_and_continue() {
        assert_eq!(
            eval_to_string(
                "var n = 0; outer: for (var i = 0; i < 3; i++) { for (var j = 0; j < 3; j++) { if (j == 1) continue outer; if (i == 2) break outer; n++; } } n"
            ),
            "2"
        );
        assert_eq!(eval_to_string("block: { 'a'; break block; 'b'; }"), "a");
    }

    #[test]
    fn if_completion_values() {
        assert_eq!(eval_to_string("1; if (false) 2;"), "undefined");
        assert_eq!(eval_to_string("if (true) { 'yes' } else { 'no' }"), "yes");
    }

    #[test]
    fn throw_statement_records_its_position() {
        let stack = eval_to_string("function f() {\n  throw new Error('here');\n}\ntry { f() } catch (e) { e.stack }");
        assert!(stack.contains("Error: here"));
    }
}
