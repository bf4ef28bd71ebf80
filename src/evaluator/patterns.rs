//! §8.6.2 BindingInitialization and §13.15.5 destructuring assignment.
//!
//! Binding and assignment patterns share one walk. With an environment the
//! targets are initialized in it; without one they are resolved in the
//! running context and assigned with PutValue.

use crate::abstract_ops::iterator::{IteratorHint, IteratorRecord, get_iterator, iterator_close, iterator_step_value};
use crate::abstract_ops::{copy_data_properties, create_array_from_list, get_v, require_object_coercible};
use crate::ast::{FunctionNode, Pattern};
use crate::completion::Completion;
use crate::engine::{Agent, IntrinsicId};
use crate::environment::Environment;
use crate::evaluator::Eval;
use crate::evaluator::expressions::{evaluate_expression, evaluate_property_name, evaluate_reference, named_evaluation, resolve_binding};
use crate::evaluator::reference::Reference;
use crate::object::{JsObject, PropertyKey};
use crate::types::JsValue;

/// Binds `value` to every name in `pattern`.
pub fn bind_pattern<'a>(
    agent: &'a Agent,
    pattern: &'a Pattern,
    value: JsValue,
    env: Option<&'a Environment>,
) -> Eval<'a, ()> {
    Box::pin(async move {
        match pattern {
            Pattern::Object { .. } | Pattern::Array { .. } => {}
            _ => return bind_element(agent, pattern, move || Completion::Normal(value), env).await,
        }
        if let Pattern::Object { properties, rest } = pattern {
            q!(require_object_coercible(agent, &value));
            let mut excluded = Vec::with_capacity(properties.len());
            for property in properties {
                let key = q!(evaluate_property_name(agent, &property.key).await);
                excluded.push(key.clone());
                let source = value.clone();
                q!(bind_element(agent, &property.value, move || get_v(agent, &source, &key), env).await);
            }
            if let Some(rest) = rest {
                let reference = q!(target_reference(agent, rest, env).await);
                let rest_object = JsObject::ordinary(Some(agent.intrinsic(IntrinsicId::ObjectPrototype)));
                q!(copy_data_properties(agent, &rest_object, &value, &excluded));
                q!(finish(agent, rest, reference, JsValue::Object(rest_object), env).await);
            }
            return Completion::Normal(());
        }
        let record = q!(get_iterator(agent, &value, IteratorHint::Sync));
        let result = iterator_binding_initialization(agent, pattern, &record, env).await;
        if record.done.get() {
            return result;
        }
        iterator_close(agent, &record, result)
    })
}

// §8.6.3 IteratorBindingInitialization
async fn iterator_binding_initialization(
    agent: &Agent,
    pattern: &Pattern,
    record: &IteratorRecord,
    env: Option<&Environment>,
) -> Completion<()> {
    let Pattern::Array { elements, rest } = pattern else {
        unreachable!("iterator binding of a non-array pattern");
    };
    for element in elements {
        let step = || {
            if record.done.get() {
                return Completion::Normal(JsValue::Undefined);
            }
            iterator_step_value(agent, record).map(|v| v.unwrap_or(JsValue::Undefined))
        };
        match element {
            None => {
                q!(step());
            }
            Some(target) => q!(bind_element(agent, target, step, env).await),
        }
    }
    if let Some(rest) = rest {
        let reference = q!(target_reference(agent, rest, env).await);
        let mut values = Vec::new();
        while !record.done.get() {
            if let Some(v) = q!(iterator_step_value(agent, record)) {
                values.push(v);
            }
        }
        let array = create_array_from_list(agent, &values);
        q!(finish(agent, rest, reference, JsValue::Object(array), env).await);
    }
    Completion::Normal(())
}

/// Evaluates the reference of a simple target ahead of reading its value.
async fn target_reference(agent: &Agent, target: &Pattern, env: Option<&Environment>) -> Completion<Option<Reference>> {
    match target {
        Pattern::Identifier(name) => resolve_binding(agent, name, env).map(Some),
        Pattern::Member(expr) => evaluate_reference(agent, expr).await.map(Some),
        _ => Completion::Normal(None),
    }
}

async fn finish(
    agent: &Agent,
    target: &Pattern,
    reference: Option<Reference>,
    value: JsValue,
    env: Option<&Environment>,
) -> Completion<()> {
    match reference {
        Some(reference) if env.is_some() => reference.initialize_referenced_binding(agent, value),
        Some(reference) => reference.put_value(agent, value),
        None => bind_pattern(agent, target, value, env).await,
    }
}

/// SingleNameBinding and the element forms of the destructuring grammars:
/// resolve the target, read its value, apply the default, then bind.
async fn bind_element(
    agent: &Agent,
    element: &Pattern,
    value: impl FnOnce() -> Completion,
    env: Option<&Environment>,
) -> Completion<()> {
    let (target, default) = match element {
        Pattern::Default(target, default) => (&**target, Some(&**default)),
        other => (other, None),
    };
    let reference = q!(target_reference(agent, target, env).await);
    let mut v = q!(value());
    if let Some(default) = default
        && v.is_undefined()
    {
        v = match target {
            Pattern::Identifier(name) => q!(named_evaluation(agent, default, &PropertyKey::from(&**name)).await),
            _ => q!(evaluate_expression(agent, default).await),
        };
    }
    finish(agent, target, reference, v, env).await
}

/// IteratorBindingInitialization of a formal parameter list over the
/// argument values.
pub async fn bind_parameters(
    agent: &Agent,
    node: &FunctionNode,
    args: &[JsValue],
    env: Option<&Environment>,
) -> Completion<()> {
    for (i, param) in node.params.iter().enumerate() {
        let arg = args.get(i).cloned().unwrap_or(JsValue::Undefined);
        q!(bind_element(agent, param, move || Completion::Normal(arg), env).await);
    }
    if let Some(rest) = &node.rest {
        let reference = q!(target_reference(agent, rest, env).await);
        let remaining = args.get(node.params.len()..).unwrap_or_default();
        let array = create_array_from_list(agent, remaining);
        q!(finish(agent, rest, reference, JsValue::Object(array), env).await);
    }
    Completion::Normal(())
}

/// Whether an assignment target is a destructuring pattern rather than a
/// simple reference.
pub fn is_destructuring(pattern: &Pattern) -> bool {
    matches!(pattern, Pattern::Object { .. } | Pattern::Array { .. })
}

#[cfg(test)]
mod tests {
    use crate::evaluator::test_support::eval_to_string;

    #[test]
    fn object_patterns_with_defaults_and_rest() {
        assert_eq!(
            eval_to_string("var { a, b: { c } = { c: 3 }, ...rest } = { a: 1, x: 2, y: 4 }; [a, c, Object.keys(rest)].join()"),
            "1,3,x,y"
        );
        assert!(eval_to_string("var { a } = null;").starts_with("Throw: "));
    }

    #[test]
    fn array_patterns_with_holes_and_rest() {
        assert_eq!(eval_to_string("var [a, , b = 5, ...r] = [1, 2, undefined, 4, 6]; [a, b, r.join('-')].join()"), "1,5,4-6");
        assert_eq!(eval_to_string("var [x, y] = 'hi'; x + y"), "hi");
    }

    #[test]
    fn array_pattern_closes_unfinished_iterators() {
        assert_eq!(
            eval_to_string(
                "var closed = 0; var it = { [Symbol.iterator]() { return { next() { return { value: 1, done: false }; }, return() { closed++; return {}; } }; } };
                 var [a] = it; closed"
            ),
            "1"
        );
    }

    #[test]
    fn assignment_patterns_write_through_members() {
        assert_eq!(eval_to_string("var o = {}; [o.a, o['b']] = [1, 2]; ({ x: o.c } = { x: 3 }); o.a + o.b + o.c"), "6");
        assert_eq!(eval_to_string("var a = 1, b = 2; [a, b] = [b, a]; a * 10 + b"), "21");
    }

    #[test]
    fn defaults_name_anonymous_functions() {
        assert_eq!(eval_to_string("var { f = function () {} } = {}; f.name"), "f");
        assert_eq!(eval_to_string("function g(h = () => 1) { return h.name; } g()"), "h");
    }

    #[test]
    fn rest_parameters_collect_remaining_arguments() {
        assert_eq!(eval_to_string("function f(a, ...r) { return r.length; } f(1, 2, 3)"), "2");
        assert_eq!(eval_to_string("function f(a, b = a + 1) { return b; } f(1)"), "2");
    }
}
