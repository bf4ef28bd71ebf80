//! §10.2 ECMAScript function objects: creation, [[Call]], [[Construct]] and
//! FunctionDeclarationInstantiation.

use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::abstract_ops::{call, create_data_property_or_throw, ordinary_create_from_constructor};
use crate::abstract_ops::conversion::to_object;
use crate::ast::{
    Declaration, FunctionBody, FunctionKind, FunctionNode, Pattern, PropertyName, function_references_arguments,
    top_level_lexically_scoped_declarations, top_level_var_scoped_declarations,
};
use crate::builtins::promise::new_promise_capability;
use crate::completion::Completion;
use crate::engine::{Agent, ErrorKind, ExecutionContext, IntrinsicId, Message, ScriptOrModule};
use crate::environment::{Environment, new_declarative_environment, new_function_environment};
use crate::evaluator::coroutine::{self, AsyncGeneratorData, Coroutine, CoroutineKind, GeneratorData};
use crate::evaluator::{expressions, functions_to_initialize, patterns, run_to_completion, statements};
use crate::object::arguments::{create_mapped_arguments_object, create_unmapped_arguments_object};
use crate::object::function::{ConstructorKind, ThisMode, set_function_length, set_function_name};
use crate::object::{FunctionData, JsObject, ObjectKind, Property, PropertyKey};
use crate::types::JsValue;

pub(crate) fn function_name(f: &JsObject) -> String {
    match f.own_data_value(&PropertyKey::from("name")) {
        Some(JsValue::String(s)) if !s.is_empty() => s.to_rust_string(),
        _ => "anonymous".to_owned(),
    }
}

// §10.2.3 OrdinaryFunctionCreate
pub fn ordinary_function_create(
    agent: &Agent,
    prototype: JsObject,
    node: &Rc<FunctionNode>,
    env: &Environment,
) -> JsObject {
    let data = FunctionData::new(
        env.clone(),
        node.clone(),
        agent.current_realm(),
        agent.get_active_script_or_module(),
    );
    let f = JsObject::new(Some(prototype), ObjectKind::Function(Rc::new(data)));
    set_function_length(&f, node.expected_argument_count());
    f
}

// §10.2.5 MakeConstructor
pub fn make_constructor(agent: &Agent, f: &JsObject, writable_prototype: bool, prototype: Option<JsObject>) {
    if let Some(data) = f.function_data() {
        data.make_constructor();
    }
    let prototype = prototype.unwrap_or_else(|| {
        let p = JsObject::ordinary(Some(agent.intrinsic(IntrinsicId::ObjectPrototype)));
        p.insert_property(
            "constructor",
            Property::data(JsValue::Object(f.clone()), writable_prototype, false, true),
        );
        p
    });
    f.insert_property(
        "prototype",
        Property::data(JsValue::Object(prototype), writable_prototype, false, false),
    );
}

// §10.2.7 MakeMethod
pub fn make_method(f: &JsObject, home_object: &JsObject) {
    if let Some(data) = f.function_data() {
        *data.home_object.borrow_mut() = Some(home_object.clone());
    }
}

fn function_prototype_for(node: &FunctionNode) -> IntrinsicId {
    match (node.is_generator, node.is_async) {
        (false, false) => IntrinsicId::FunctionPrototype,
        (true, false) => IntrinsicId::Generator,
        (false, true) => IntrinsicId::AsyncFunctionPrototype,
        (true, true) => IntrinsicId::AsyncGenerator,
    }
}

/// Creates the function object for any of the four function kinds, naming it
/// and giving it the `prototype` property its kind calls for.
pub(crate) fn instantiate_named(agent: &Agent, node: &Rc<FunctionNode>, env: &Environment, name: &PropertyKey) -> JsObject {
    let f = ordinary_function_create(agent, agent.intrinsic(function_prototype_for(node)), node, env);
    set_function_name(&f, name, None);
    if node.is_generator {
        let instance_proto = if node.is_async {
            IntrinsicId::AsyncGeneratorPrototype
        } else {
            IntrinsicId::GeneratorPrototype
        };
        let prototype = JsObject::ordinary(Some(agent.intrinsic(instance_proto)));
        f.insert_property("prototype", Property::data(JsValue::Object(prototype), true, false, false));
    } else if !node.is_async && node.kind == FunctionKind::Normal {
        make_constructor(agent, &f, true, None);
    }
    f
}

// §15.2.4 InstantiateOrdinaryFunctionObject and the generator/async forms
pub fn instantiate_function_object(agent: &Agent, node: &Rc<FunctionNode>, env: &Environment) -> JsObject {
    let name = match &node.name {
        Some(name) => PropertyKey::from(&**name),
        None => PropertyKey::from("default"),
    };
    instantiate_named(agent, node, env, &name)
}

// §15.2.5 InstantiateOrdinaryFunctionExpression and the generator/async forms
pub fn instantiate_function_expression(agent: &Agent, node: &Rc<FunctionNode>, name: Option<PropertyKey>) -> JsObject {
    let env = agent.running_execution_context().lexical_environment();
    match &node.name {
        Some(own) => {
            let func_env = new_declarative_environment(Some(env));
            x!(func_env.create_immutable_binding(agent, own, false));
            let f = instantiate_named(agent, node, &func_env, &PropertyKey::from(&**own));
            x!(func_env.initialize_binding(agent, own, JsValue::Object(f.clone())));
            f
        }
        None => {
            let name = name.unwrap_or_else(|| PropertyKey::from(""));
            instantiate_named(agent, node, &env, &name)
        }
    }
}

// §15.3.4 InstantiateArrowFunctionExpression
pub fn instantiate_arrow_function(agent: &Agent, node: &Rc<FunctionNode>, name: Option<PropertyKey>) -> JsObject {
    let env = agent.running_execution_context().lexical_environment();
    let name = name.unwrap_or_else(|| PropertyKey::from(""));
    instantiate_named(agent, node, &env, &name)
}

// §10.2.1.1 PrepareForOrdinaryCall
fn prepare_for_ordinary_call(agent: &Agent, f: &JsObject, data: &FunctionData, new_target: Option<JsObject>) -> ExecutionContext {
    let callee = ExecutionContext::new(data.realm.clone(), Some(f.clone()), data.script_or_module.clone());
    if let Some(ScriptOrModule::Module(id)) = &data.script_or_module {
        callee.call_site_mut().specifier = agent.module(*id).specifier.clone();
    }
    let env = new_function_environment(f, new_target);
    callee.set_lexical_environment(env.clone());
    callee.set_variable_environment(env);
    agent.push_context(callee.clone());
    callee
}

// §10.2.1.2 OrdinaryCallBindThis
fn ordinary_call_bind_this(agent: &Agent, data: &FunctionData, callee: &ExecutionContext, this: &JsValue) {
    let this_value = match data.this_mode {
        ThisMode::Lexical => return,
        ThisMode::Strict => this.clone(),
        ThisMode::Global if this.is_nullish() => x!(data.realm.global_env().get_this_binding(agent)),
        ThisMode::Global => JsValue::Object(x!(to_object(agent, this))),
    };
    x!(callee.lexical_environment().bind_this_value(agent, this_value));
}

// §10.2.1 [[Call]]
pub fn call_ecmascript_function(
    agent: &Agent,
    f: &JsObject,
    data: &Rc<FunctionData>,
    this: &JsValue,
    args: &[JsValue],
) -> Completion {
    q!(agent.check_call_depth());
    let callee = prepare_for_ordinary_call(agent, f, data, None);
    if data.is_class_constructor.get() {
        let error = agent.throw(ErrorKind::Type, Message::ClassConstructorCall(function_name(f)));
        agent.pop_context(Some(&callee));
        return error;
    }
    ordinary_call_bind_this(agent, data, &callee, this);
    let result = ordinary_call_evaluate_body(agent, f, data, args);
    agent.pop_context(Some(&callee));
    match result {
        Completion::Return(v) => Completion::Normal(v),
        Completion::Normal(_) => Completion::Normal(JsValue::Undefined),
        other => other,
    }
}

// §10.2.2 [[Construct]]
pub fn construct_ecmascript_function(
    agent: &Agent,
    f: &JsObject,
    data: &Rc<FunctionData>,
    args: &[JsValue],
    new_target: &JsObject,
) -> Completion<JsObject> {
    q!(agent.check_call_depth());
    let kind = data.constructor_kind.get();
    let this_argument = match kind {
        ConstructorKind::Base => Some(q!(ordinary_create_from_constructor(
            agent,
            new_target,
            IntrinsicId::ObjectPrototype,
            ObjectKind::Ordinary,
        ))),
        ConstructorKind::Derived => None,
    };
    let callee = prepare_for_ordinary_call(agent, f, data, Some(new_target.clone()));
    callee.call_site_mut().is_constructor = true;
    if let Some(this) = &this_argument {
        ordinary_call_bind_this(agent, data, &callee, &JsValue::Object(this.clone()));
        if let Completion::Throw(e) = initialize_instance_elements(agent, this, f) {
            agent.pop_context(Some(&callee));
            return Completion::Throw(e);
        }
    }
    let constructor_env = callee.lexical_environment();
    let result = ordinary_call_evaluate_body(agent, f, data, args);
    agent.pop_context(Some(&callee));
    match result {
        Completion::Return(JsValue::Object(o)) => return Completion::Normal(o),
        Completion::Return(v) => {
            if let Some(this) = this_argument {
                return Completion::Normal(this);
            }
            if !v.is_undefined() {
                return agent.throw(ErrorKind::Type, Message::DerivedConstructorReturn);
            }
        }
        Completion::Normal(_) => {}
        other => return other.into_abrupt(),
    }
    if let Some(this) = this_argument {
        return Completion::Normal(this);
    }
    match q!(constructor_env.get_this_binding(agent)) {
        JsValue::Object(o) => Completion::Normal(o),
        other => agent.throw(ErrorKind::Type, Message::NotAnObject(agent.inspect(&other))),
    }
}

// §10.2.1.4 OrdinaryCallEvaluateBody, dispatching on the function kind
fn ordinary_call_evaluate_body(agent: &Agent, f: &JsObject, data: &FunctionData, args: &[JsValue]) -> Completion {
    let node = data.node.clone();
    match (node.is_generator, node.is_async) {
        (false, false) => {
            q!(function_declaration_instantiation(agent, f, data, args));
            run_to_completion(evaluate_function_body(agent, &node))
        }
        (true, false) => {
            q!(function_declaration_instantiation(agent, f, data, args));
            let co = Coroutine::new(agent, CoroutineKind::Generator, node);
            let generator = q!(ordinary_create_from_constructor(
                agent,
                f,
                IntrinsicId::GeneratorPrototype,
                ObjectKind::Generator(GeneratorData { coroutine: co }),
            ));
            Completion::Return(JsValue::Object(generator))
        }
        (false, true) => {
            let capability = x!(new_promise_capability(
                agent,
                &JsValue::Object(agent.intrinsic(IntrinsicId::Promise))
            ));
            match function_declaration_instantiation(agent, f, data, args) {
                Completion::Throw(e) => {
                    x!(call(agent, &capability.reject, &JsValue::Undefined, &[e]));
                }
                _ => coroutine::async_function_start(agent, capability.clone(), node),
            }
            Completion::Return(JsValue::Object(capability.promise))
        }
        (true, true) => {
            q!(function_declaration_instantiation(agent, f, data, args));
            let co = Coroutine::new(agent, CoroutineKind::async_generator(), node);
            let generator = q!(ordinary_create_from_constructor(
                agent,
                f,
                IntrinsicId::AsyncGeneratorPrototype,
                ObjectKind::AsyncGenerator(AsyncGeneratorData { coroutine: co }),
            ));
            Completion::Return(JsValue::Object(generator))
        }
    }
}

/// FunctionBody evaluation. Completes with `Return(v)` for an explicit or
/// concise-body return, otherwise `Normal(undefined)`.
pub async fn evaluate_function_body(agent: &Agent, node: &FunctionNode) -> Completion {
    match &node.body {
        FunctionBody::Expression(e) => {
            let value = q!(expressions::evaluate_expression(agent, e).await);
            Completion::Return(value)
        }
        FunctionBody::Block(stmts) => match statements::evaluate_statement_list(agent, stmts).await {
            Completion::Normal(_) => Completion::Normal(JsValue::Undefined),
            other => other.into_abrupt(),
        },
    }
}

fn pattern_has_expressions(p: &Pattern) -> bool {
    match p {
        Pattern::Identifier(_) | Pattern::Member(_) => false,
        Pattern::Default(..) => true,
        Pattern::Object { properties, rest } => {
            properties
                .iter()
                .any(|prop| matches!(prop.key, PropertyName::Computed(_)) || pattern_has_expressions(&prop.value))
                || rest.as_deref().is_some_and(pattern_has_expressions)
        }
        Pattern::Array { elements, rest } => {
            elements.iter().flatten().any(pattern_has_expressions) || rest.as_deref().is_some_and(pattern_has_expressions)
        }
    }
}

// §10.2.11 FunctionDeclarationInstantiation
pub fn function_declaration_instantiation(
    agent: &Agent,
    f: &JsObject,
    data: &FunctionData,
    args: &[JsValue],
) -> Completion<()> {
    let callee = agent.running_execution_context();
    let node = &data.node;
    let strict = data.strict;
    let parameter_names = node.parameter_names();
    let has_duplicates = {
        let mut seen = FxHashSet::default();
        !parameter_names.iter().all(|n| seen.insert(n.clone()))
    };
    let simple = node.has_simple_parameter_list();
    let has_parameter_expressions = node.params.iter().chain(node.rest.iter()).any(pattern_has_expressions);

    let var_declarations = top_level_var_scoped_declarations(node.statements());
    let var_names: Vec<Rc<str>> = var_declarations.iter().flat_map(Declaration::bound_names).collect();
    let functions = functions_to_initialize(&var_declarations);
    let function_names: FxHashSet<Rc<str>> = functions.iter().filter_map(|f| f.name.clone()).collect();
    let lexical = top_level_lexically_scoped_declarations(node.statements());
    let lexical_names: FxHashSet<Rc<str>> = lexical.iter().flat_map(Declaration::bound_names).collect();

    let arguments: Rc<str> = "arguments".into();
    let mut arguments_object_needed = data.this_mode != ThisMode::Lexical;
    if parameter_names.contains(&arguments) {
        arguments_object_needed = false;
    } else if !has_parameter_expressions
        && (function_names.contains(&arguments) || lexical_names.contains(&arguments))
    {
        arguments_object_needed = false;
    }
    if arguments_object_needed && !function_references_arguments(node) {
        arguments_object_needed = false;
    }

    let env = if strict || !has_parameter_expressions {
        callee.lexical_environment()
    } else {
        let env = new_declarative_environment(Some(callee.lexical_environment()));
        callee.set_lexical_environment(env.clone());
        env
    };

    for name in &parameter_names {
        if !x!(env.has_binding(agent, name)) {
            x!(env.create_mutable_binding(agent, name, false));
            if has_duplicates {
                x!(env.initialize_binding(agent, name, JsValue::Undefined));
            }
        }
    }

    let mut parameter_bindings = parameter_names.clone();
    if arguments_object_needed {
        let ao = if strict || !simple {
            q!(create_unmapped_arguments_object(agent, args))
        } else {
            q!(create_mapped_arguments_object(agent, f, &parameter_names, args, &env))
        };
        if strict {
            x!(env.create_immutable_binding(agent, &arguments, false));
        } else {
            x!(env.create_mutable_binding(agent, &arguments, false));
        }
        x!(env.initialize_binding(agent, &arguments, JsValue::Object(ao)));
        parameter_bindings.push(arguments.clone());
    }

    let binding_env = if has_duplicates { None } else { Some(&env) };
    q!(run_to_completion(patterns::bind_parameters(agent, node, args, binding_env)));

    let mut instantiated: FxHashSet<Rc<str>> = parameter_bindings.iter().cloned().collect();
    let var_env = if !has_parameter_expressions {
        for name in &var_names {
            if instantiated.insert(name.clone()) {
                x!(env.create_mutable_binding(agent, name, false));
                x!(env.initialize_binding(agent, name, JsValue::Undefined));
            }
        }
        env.clone()
    } else {
        let var_env = new_declarative_environment(Some(env.clone()));
        callee.set_variable_environment(var_env.clone());
        for name in &var_names {
            if instantiated.insert(name.clone()) {
                x!(var_env.create_mutable_binding(agent, name, false));
                let initial = if !parameter_bindings.contains(name) || function_names.contains(name) {
                    JsValue::Undefined
                } else {
                    q!(env.get_binding_value(agent, name, false))
                };
                x!(var_env.initialize_binding(agent, name, initial));
            }
        }
        var_env
    };
    callee.set_variable_environment(var_env.clone());

    let lex_env = if strict {
        var_env.clone()
    } else {
        new_declarative_environment(Some(var_env.clone()))
    };
    callee.set_lexical_environment(lex_env.clone());
    for d in &lexical {
        for name in d.bound_names() {
            if d.is_constant() {
                x!(lex_env.create_immutable_binding(agent, &name, true));
            } else {
                x!(lex_env.create_mutable_binding(agent, &name, false));
            }
        }
    }
    for func in functions {
        let fo = instantiate_function_object(agent, func, &lex_env);
        let name = func.name.as_deref().unwrap_or_default();
        x!(var_env.set_mutable_binding(agent, name, JsValue::Object(fo), false));
    }
    Completion::Normal(())
}

// §7.3.34 InitializeInstanceElements
pub fn initialize_instance_elements(agent: &Agent, o: &JsObject, constructor: &JsObject) -> Completion<()> {
    let Some(data) = constructor.function_data() else {
        return Completion::Normal(());
    };
    let fields = data.fields.borrow().clone();
    for field in fields {
        // §7.3.33 DefineField
        let value = match &field.initializer {
            Some(init) => q!(call(agent, &JsValue::Object(init.clone()), &JsValue::Object(o.clone()), &[])),
            None => JsValue::Undefined,
        };
        q!(create_data_property_or_throw(agent, o, field.name.clone(), value));
    }
    Completion::Normal(())
}

#[cfg(test)]
mod tests {
    use crate::evaluator::test_support::eval_to_string;

    #[test]
    fn unbounded_recursion_throws_range_error() {
        assert_eq!(eval_to_string("function r(n) { return r(n + 1); } try { r(0) } catch (e) { e.name }"), "RangeError");
        assert_eq!(
            eval_to_string("function d(n) { return n === 0 ? 0 : 1 + d(n - 1); } d(900)"),
            "900"
        );
        assert_eq!(
            eval_to_string("class C { constructor() { new C(); } } try { new C() } catch (e) { e instanceof RangeError }"),
            "true"
        );
    }

    #[test]
    fn calls_bind_this_by_mode() {
        assert_eq!(eval_to_string("function f() { return typeof this; } f()"), "object");
        assert_eq!(eval_to_string("function f() { 'use strict'; return typeof this; } f()"), "undefined");
        assert_eq!(eval_to_string("var o = { m() { return () => this; } }; o.m()() === o"), "true");
    }

    #[test]
    fn parameters_defaults_rest_and_arguments() {
        assert_eq!(eval_to_string("function f(a, b = a + 1, ...r) { return [a, b, r.length]; } f(1).join()"), "1,2,0");
        assert_eq!(eval_to_string("function f(a) { a = 5; return arguments[0]; } f(1)"), "5");
        assert_eq!(eval_to_string("function f(a) { 'use strict'; a = 5; return arguments[0]; } f(1)"), "1");
        assert_eq!(eval_to_string("function f(a, b) {} f.length"), "2");
        assert_eq!(eval_to_string("function f(a, b = 1, c) {} f.length"), "1");
    }

    #[test]
    fn parameter_expressions_get_their_own_scope() {
        assert_eq!(
            eval_to_string("var x = 'outer'; function f(a = () => x) { var x = 'inner'; return a(); } f()"),
            "outer"
        );
    }

    #[test]
    fn constructors_and_prototypes() {
        assert_eq!(eval_to_string("function P(x) { this.x = x; } new P(3).x"), "3");
        assert_eq!(eval_to_string("function P() { return { y: 1 }; } new P().y"), "1");
        assert_eq!(eval_to_string("function P() {} P.prototype.constructor === P"), "true");
        assert_eq!(eval_to_string("function P() { return new.target === P; } new P() instanceof P"), "true");
        assert_eq!(eval_to_string("var a = () => 1; 'prototype' in a"), "false");
    }

    #[test]
    fn class_constructors_require_new() {
        assert!(eval_to_string("class C {} C()").starts_with("Throw: "));
    }

    #[test]
    fn named_function_expressions_bind_their_own_name() {
        assert_eq!(eval_to_string("var f = function g(n) { return n ? g(n - 1) + 1 : 0; }; f(3)"), "3");
        assert_eq!(eval_to_string("var f = function () {}; f.name"), "f");
    }
}
