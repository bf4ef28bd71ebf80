//! Code from strings: indirect `eval` (§19.2.1.1 PerformEval) and the
//! `Function` family of constructors (§20.2.1.1.1 CreateDynamicFunction).
//!
//! Every call to `eval` is treated as indirect, so eval code always runs as
//! global code of the eval function's realm.

use std::rc::Rc;

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::abstract_ops::conversion::to_string;
use crate::abstract_ops::get_prototype_from_constructor;
use crate::ast::{Declaration, Script, top_level_lexically_scoped_declarations, top_level_var_scoped_declarations};
use crate::completion::Completion;
use crate::engine::{
    Agent, ErrorKind, ExecutionContext, IntrinsicId, Message, Realm, ScriptOrModule, ScriptRecord,
    host_ensure_can_compile_strings,
};
use crate::environment::{Environment, new_declarative_environment};
use crate::evaluator::functions::{instantiate_function_object, make_constructor, ordinary_function_create};
use crate::evaluator::{functions_to_initialize, run_to_completion, statements};
use crate::object::function::set_function_name;
use crate::object::{JsObject, Property, PropertyKey};
use crate::parser::{ParseOptions, parse_dynamic_function, parse_script_with};
use crate::types::JsValue;

/// The realm of the code that called the running built-in.
fn caller_realm(agent: &Agent) -> Realm {
    let stack = agent.stack_snapshot();
    match stack.len() {
        0 | 1 => agent.current_realm(),
        n => stack[n - 2].realm().clone(),
    }
}

// §19.2.1.1 PerformEval, indirect form
pub fn perform_eval(agent: &Agent, x: &JsValue) -> Completion {
    let JsValue::String(source) = x else {
        return Completion::Normal(x.clone());
    };
    let eval_realm = agent.current_realm();
    q!(host_ensure_can_compile_strings(agent, &caller_realm(agent), &eval_realm));

    let text = source.to_rust_string();
    let script = match parse_script_with(&text, ParseOptions::default()) {
        Ok(script) => Rc::new(script),
        Err(e) => {
            debug!(position = ?e.position, "eval code failed to parse");
            return agent.throw(ErrorKind::Syntax, Message::Syntax(e.to_string()));
        }
    };
    if script.body.is_empty() {
        return Completion::Normal(JsValue::Undefined);
    }

    let global_env = eval_realm.global_env();
    let lex_env = new_declarative_environment(Some(global_env.clone()));
    let var_env = if script.strict { lex_env.clone() } else { global_env };

    let record = Rc::new(ScriptRecord {
        realm: eval_realm.clone(),
        code: script.clone(),
        specifier: None,
    });
    let caller_site = agent.running_execution_context().call_site().clone();
    let ctx = ExecutionContext::new(eval_realm, None, Some(ScriptOrModule::Script(record)));
    ctx.set_lexical_environment(lex_env.clone());
    ctx.set_variable_environment(var_env.clone());
    ctx.call_site_mut().eval_origin = Some(Box::new(caller_site));

    q!(agent.check_call_depth());
    agent.push_context(ctx.clone());
    let mut result = eval_declaration_instantiation(agent, &script, &var_env, &lex_env).map(|()| None);
    if !result.is_abrupt() {
        result = run_to_completion(statements::evaluate_statement_list(agent, &script.body));
    }
    agent.pop_context(Some(&ctx));
    match result {
        Completion::Normal(value) => Completion::Normal(value.unwrap_or(JsValue::Undefined)),
        other => other.into_abrupt(),
    }
}

// §19.2.1.3 EvalDeclarationInstantiation. Without direct eval the variable
// environment is either the global environment or, for strict code, the
// fresh lexical environment.
fn eval_declaration_instantiation(agent: &Agent, script: &Script, var_env: &Environment, lex_env: &Environment) -> Completion<()> {
    let var_declarations = top_level_var_scoped_declarations(&script.body);
    let global_var_env = !script.strict;
    if global_var_env {
        for name in var_declarations.iter().flat_map(Declaration::bound_names) {
            if var_env.has_lexical_declaration(&name) {
                return agent.throw(
                    ErrorKind::Syntax,
                    Message::Syntax(format!("Identifier '{name}' has already been declared")),
                );
            }
        }
    }

    let functions = functions_to_initialize(&var_declarations);
    let function_names: FxHashSet<Rc<str>> = functions.iter().filter_map(|f| f.name.clone()).collect();
    if global_var_env {
        for f in &functions {
            let name = f.name.as_deref().unwrap_or_default();
            if !q!(var_env.can_declare_global_function(agent, name)) {
                return agent.throw(ErrorKind::Type, Message::CannotDefineProperty(name.to_owned()));
            }
        }
    }
    let mut declared_var_names: Vec<Rc<str>> = Vec::new();
    for d in var_declarations.iter().filter(|d| matches!(d, Declaration::Var(_))) {
        for name in d.bound_names() {
            if function_names.contains(&name) || declared_var_names.contains(&name) {
                continue;
            }
            if global_var_env && !q!(var_env.can_declare_global_var(agent, &name)) {
                return agent.throw(ErrorKind::Type, Message::CannotDefineProperty(name.to_string()));
            }
            declared_var_names.push(name);
        }
    }

    for d in &top_level_lexically_scoped_declarations(&script.body) {
        for name in d.bound_names() {
            if d.is_constant() {
                q!(lex_env.create_immutable_binding(agent, &name, true));
            } else {
                q!(lex_env.create_mutable_binding(agent, &name, false));
            }
        }
    }
    for f in functions {
        let name = f.name.as_deref().unwrap_or_default();
        let fo = JsValue::Object(instantiate_function_object(agent, f, lex_env));
        if global_var_env {
            q!(var_env.create_global_function_binding(agent, name, fo, true));
        } else if !q!(var_env.has_binding(agent, name)) {
            q!(var_env.create_mutable_binding(agent, name, true));
            q!(var_env.initialize_binding(agent, name, fo));
        } else {
            q!(var_env.set_mutable_binding(agent, name, fo, false));
        }
    }
    for name in declared_var_names {
        if global_var_env {
            q!(var_env.create_global_var_binding(agent, &name, true));
        } else if !q!(var_env.has_binding(agent, &name)) {
            q!(var_env.create_mutable_binding(agent, &name, true));
            q!(var_env.initialize_binding(agent, &name, JsValue::Undefined));
        }
    }
    Completion::Normal(())
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DynamicFunctionKind {
    Normal,
    Generator,
    Async,
    AsyncGenerator,
}

impl DynamicFunctionKind {
    fn prefix(self) -> &'static str {
        match self {
            DynamicFunctionKind::Normal => "function",
            DynamicFunctionKind::Generator => "function*",
            DynamicFunctionKind::Async => "async function",
            DynamicFunctionKind::AsyncGenerator => "async function*",
        }
    }

    fn fallback_prototype(self) -> IntrinsicId {
        match self {
            DynamicFunctionKind::Normal => IntrinsicId::FunctionPrototype,
            DynamicFunctionKind::Generator => IntrinsicId::Generator,
            DynamicFunctionKind::Async => IntrinsicId::AsyncFunctionPrototype,
            DynamicFunctionKind::AsyncGenerator => IntrinsicId::AsyncGenerator,
        }
    }
}

// §20.2.1.1.1 CreateDynamicFunction
pub fn create_dynamic_function(
    agent: &Agent,
    constructor: &JsObject,
    new_target: Option<&JsObject>,
    kind: DynamicFunctionKind,
    args: &[JsValue],
) -> Completion<JsObject> {
    let callee_realm = agent.current_realm();
    q!(host_ensure_can_compile_strings(agent, &caller_realm(agent), &callee_realm));
    let new_target = new_target.unwrap_or(constructor);

    let (params, body) = match args.split_last() {
        None => (&[][..], None),
        Some((body, params)) => (params, Some(body)),
    };
    let mut parameters = Vec::with_capacity(params.len());
    for p in params {
        parameters.push(q!(to_string(agent, p)).to_rust_string());
    }
    let body = match body {
        Some(b) => q!(to_string(agent, b)).to_rust_string(),
        None => String::new(),
    };
    let source = format!("{} anonymous({}\n) {{\n{}\n}}", kind.prefix(), parameters.join(","), body);

    let is_async = matches!(kind, DynamicFunctionKind::Async | DynamicFunctionKind::AsyncGenerator);
    let is_generator = matches!(kind, DynamicFunctionKind::Generator | DynamicFunctionKind::AsyncGenerator);
    let node = match parse_dynamic_function(&source, is_async, is_generator) {
        Ok(node) => node,
        Err(e) => return agent.throw(ErrorKind::Syntax, Message::Syntax(e.to_string())),
    };

    let proto = q!(get_prototype_from_constructor(agent, new_target, kind.fallback_prototype()));
    let env = callee_realm.global_env();
    let f = ordinary_function_create(agent, proto, &node, &env);
    set_function_name(&f, &PropertyKey::from("anonymous"), None);
    match kind {
        DynamicFunctionKind::Normal => make_constructor(agent, &f, true, None),
        DynamicFunctionKind::Generator | DynamicFunctionKind::AsyncGenerator => {
            let instance_proto = if is_async {
                IntrinsicId::AsyncGeneratorPrototype
            } else {
                IntrinsicId::GeneratorPrototype
            };
            let prototype = JsObject::ordinary(Some(agent.intrinsic(instance_proto)));
            f.insert_property("prototype", Property::data(JsValue::Object(prototype), true, false, false));
        }
        DynamicFunctionKind::Async => {}
    }
    Completion::Normal(f)
}

#[cfg(test)]
mod tests {
    use crate::completion::Completion;
    use crate::engine::{Agent, ErrorKind, HostDefinedOptions, Message};
    use crate::evaluator::evaluate_script;
    use crate::evaluator::test_support::eval_to_string;

    #[test]
    fn eval_runs_global_code_and_returns_its_completion_value() {
        assert_eq!(eval_to_string("eval('1 + 2')"), "3");
        assert_eq!(eval_to_string("eval(42)"), "42");
        assert_eq!(eval_to_string("eval('')"), "undefined");
        assert_eq!(eval_to_string("eval('if (true) { 5; }')"), "5");
    }

    #[test]
    fn eval_is_indirect_and_sees_only_globals() {
        assert_eq!(eval_to_string("var x = 'global'; function f() { var x = 'local'; return eval('x'); } f()"), "global");
        assert_eq!(eval_to_string("eval('var fromEval = 7'); fromEval"), "7");
        assert_eq!(eval_to_string("eval('let scoped = 1'); typeof scoped"), "undefined");
        assert_eq!(eval_to_string("eval('\"use strict\"; var hidden = 1'); typeof hidden"), "undefined");
    }

    #[test]
    fn eval_vars_are_deletable() {
        assert_eq!(eval_to_string("eval('var d = 1'); delete this.d"), "true");
    }

    #[test]
    fn eval_syntax_errors_are_thrown() {
        assert!(eval_to_string("eval('1 +')").starts_with("Throw: SyntaxError"));
        assert!(eval_to_string("let clash; eval('var clash')").starts_with("Throw: SyntaxError"));
    }

    #[test]
    fn host_can_refuse_string_compilation() {
        let agent = Agent::new(
            HostDefinedOptions::default()
                .on_ensure_can_compile_strings(|agent, _, _| agent.throw(ErrorKind::Eval, Message::Syntax("refused".into()))),
        );
        agent.initialize_host_defined_realm();
        for source in ["eval('1')", "Function('return 1')"] {
            let Completion::Throw(e) = evaluate_script(&agent, source, None) else {
                panic!("{source} compiled");
            };
            assert_eq!(agent.inspect(&e), "EvalError: refused");
        }
        assert!(!evaluate_script(&agent, "eval(1)", None).is_abrupt());
    }

    #[test]
    fn function_constructor_builds_global_functions() {
        assert_eq!(eval_to_string("Function('a', 'b', 'return a + b')(2, 3)"), "5");
        assert_eq!(eval_to_string("new Function('return 1').name"), "anonymous");
        assert_eq!(eval_to_string("var y = 1; function f() { var y = 2; return Function('return y')(); } f()"), "1");
        assert_eq!(eval_to_string("Function('a,b', 'return b')(1, 2)"), "2");
        assert!(eval_to_string("Function('}, function() {')").starts_with("Throw: SyntaxError"));
        assert_eq!(
            eval_to_string("Function('a', 'return a').toString()"),
            "function anonymous(a\n) {\nreturn a\n}"
        );
    }
}
