//! §13 ECMAScript language: expressions.

use std::rc::Rc;

use num_bigint::BigInt;

use crate::abstract_ops::comparison::{is_less_than, is_loosely_equal, is_strictly_equal};
use crate::abstract_ops::conversion::{
    Numeric, PreferredType, to_boolean, to_number, to_numeric, to_primitive, to_property_key, to_string,
};
use crate::abstract_ops::iterator::{IteratorHint, get_iterator, iterator_step_value};
use crate::abstract_ops::{
    IntegrityLevel, call, construct, create_array_from_list, create_data_property_or_throw, define_property_or_throw,
    instance_of_operator, set, set_integrity_level,
};
use crate::ast::{
    AssignOp, BinaryOp, CallExpression, Expression, Literal, LogicalOp, MemberProperty, Pattern, Position,
    PropertyName, TemplateLiteral, UnaryOp, UpdateOp,
};
use crate::builtins::regexp::regexp_create;
use crate::completion::Completion;
use crate::engine::{Agent, ErrorKind, Message, ScriptOrModule};
use crate::environment::{Environment, get_identifier_reference, get_new_target, get_this_environment, resolve_this_binding};
use crate::evaluator::classes::{class_definition_evaluation, object_literal_evaluation};
use crate::evaluator::coroutine::{await_value, yield_delegate, yield_value};
use crate::evaluator::functions::{initialize_instance_elements, instantiate_arrow_function, instantiate_function_expression};
use crate::evaluator::patterns::{bind_pattern, is_destructuring};
use crate::evaluator::reference::{Reference, ReferenceBase};
use crate::evaluator::Eval;
use crate::object::array::array_create;
use crate::object::{JsObject, PropertyDescriptor, PropertyKey};
use crate::types::{JsBigInt, JsString, JsValue, bigint_ops, number_ops};

/// Whether the running code is strict mode code.
pub fn is_strict(agent: &Agent) -> bool {
    let ctx = agent.running_execution_context();
    if let Some(data) = ctx.function().and_then(|f| f.function_data()) {
        return data.strict;
    }
    match ctx.script_or_module() {
        Some(ScriptOrModule::Script(script)) => script.code.strict,
        Some(ScriptOrModule::Module(_)) => true,
        None => false,
    }
}

// §9.4.2 ResolveBinding
pub fn resolve_binding(agent: &Agent, name: &Rc<str>, env: Option<&Environment>) -> Completion<Reference> {
    let env = match env {
        Some(env) => env.clone(),
        None => agent.running_execution_context().lexical_environment(),
    };
    get_identifier_reference(agent, Some(&env), name, is_strict(agent))
}

/// Either a plain value or a reference still to be read, as produced by the
/// left-hand side of calls and assignments.
enum Operand {
    Value(JsValue),
    Reference(Reference),
}

impl Operand {
    fn get_value(&self, agent: &Agent) -> Completion {
        match self {
            Operand::Value(v) => Completion::Normal(v.clone()),
            Operand::Reference(r) => r.get_value(agent),
        }
    }
}

/// Evaluates an expression to its value.
pub fn evaluate_expression<'a>(agent: &'a Agent, expr: &'a Expression) -> Eval<'a> {
    Box::pin(async move {
        match expr {
            Expression::Literal(literal) => literal_evaluation(agent, literal),
            Expression::Identifier(name) => q!(resolve_binding(agent, name, None)).get_value(agent),
            Expression::This => resolve_this_binding(agent),
            Expression::Parenthesized(inner) => evaluate_expression(agent, inner).await,
            Expression::Array(elements) => array_literal_evaluation(agent, elements).await,
            Expression::Object(properties) => object_literal_evaluation(agent, properties).await.map(JsValue::Object),
            Expression::Function(node) => {
                Completion::Normal(JsValue::Object(instantiate_function_expression(agent, node, None)))
            }
            Expression::Arrow(node) => Completion::Normal(JsValue::Object(instantiate_arrow_function(agent, node, None))),
            Expression::Class(class) => {
                let name = class.name.as_deref().map_or_else(|| PropertyKey::from(""), PropertyKey::from);
                class_definition_evaluation(agent, class, class.name.clone(), name)
                    .await
                    .map(JsValue::Object)
            }
            Expression::Template(template) => template_literal_evaluation(agent, template).await,
            Expression::TaggedTemplate { tag, quasi, position } => {
                tagged_template_evaluation(agent, tag, quasi, *position).await
            }
            Expression::Unary(op, operand) => unary_evaluation(agent, *op, operand).await,
            Expression::Update { op, prefix, target } => update_evaluation(agent, *op, *prefix, target).await,
            Expression::Binary(op, left, right) => {
                let l = q!(evaluate_expression(agent, left).await);
                let r = q!(evaluate_expression(agent, right).await);
                apply_binary_operator(agent, *op, &l, &r)
            }
            Expression::Logical(op, left, right) => {
                let l = q!(evaluate_expression(agent, left).await);
                if !logical_continues(*op, &l) {
                    return Completion::Normal(l);
                }
                evaluate_expression(agent, right).await
            }
            Expression::Assign(op, target, value) => assignment_evaluation(agent, *op, target, value).await,
            Expression::Conditional(test, consequent, alternate) => {
                let test = q!(evaluate_expression(agent, test).await);
                if to_boolean(&test) {
                    evaluate_expression(agent, consequent).await
                } else {
                    evaluate_expression(agent, alternate).await
                }
            }
            Expression::Call(call) => evaluate_call(agent, call)
                .await
                .map(|v| v.unwrap_or(JsValue::Undefined)),
            Expression::New(call) => new_evaluation(agent, call).await,
            Expression::SuperCall(arguments, position) => super_call_evaluation(agent, arguments, *position).await,
            Expression::Member { .. } | Expression::SuperMember(_) => {
                match q!(evaluate_operand(agent, expr).await) {
                    Some(operand) => operand.get_value(agent),
                    None => Completion::Normal(JsValue::Undefined),
                }
            }
            Expression::OptionalChain(inner) => match q!(evaluate_operand(agent, inner).await) {
                Some(operand) => operand.get_value(agent),
                None => Completion::Normal(JsValue::Undefined),
            },
            Expression::NewTarget => Completion::Normal(get_new_target(agent)),
            Expression::Spread(_) => unreachable!("spread element evaluated outside a list"),
            Expression::Yield { argument, delegate } => {
                let value = match argument {
                    Some(argument) => q!(evaluate_expression(agent, argument).await),
                    None => JsValue::Undefined,
                };
                if *delegate {
                    yield_delegate(agent, value).await
                } else {
                    yield_value(agent, value).await
                }
            }
            Expression::Await(argument) => {
                let value = q!(evaluate_expression(agent, argument).await);
                await_value(agent, value).await
            }
            Expression::Sequence(items) => {
                let mut last = JsValue::Undefined;
                for item in items {
                    last = q!(evaluate_expression(agent, item).await);
                }
                Completion::Normal(last)
            }
        }
    })
}

/// Evaluates an expression that must denote a reference: an assignment,
/// update or destructuring target.
pub fn evaluate_reference<'a>(agent: &'a Agent, expr: &'a Expression) -> Eval<'a, Reference> {
    Box::pin(async move {
        match q!(evaluate_operand(agent, expr).await) {
            Some(Operand::Reference(reference)) => Completion::Normal(reference),
            _ => agent.throw(ErrorKind::Reference, Message::InvalidAssignmentTarget),
        }
    })
}

/// Evaluates the left-hand side of a call or member access. `None` means an
/// optional chain short-circuited.
fn evaluate_operand<'a>(agent: &'a Agent, expr: &'a Expression) -> Eval<'a, Option<Operand>> {
    Box::pin(async move {
        match expr {
            Expression::Identifier(name) => resolve_binding(agent, name, None).map(|r| Some(Operand::Reference(r))),
            Expression::Parenthesized(inner) => evaluate_operand(agent, inner).await,
            Expression::Member {
                object,
                property,
                optional,
            } => {
                let Some(base) = q!(evaluate_operand(agent, object).await) else {
                    return Completion::Normal(None);
                };
                let base = q!(base.get_value(agent));
                if *optional && base.is_nullish() {
                    return Completion::Normal(None);
                }
                let key = q!(evaluate_member_property(agent, property).await);
                Completion::Normal(Some(Operand::Reference(Reference::property(base, key, is_strict(agent)))))
            }
            Expression::SuperMember(property) => {
                // §13.3.7.3 MakeSuperPropertyReference
                let key = q!(evaluate_member_property(agent, property).await);
                let env = get_this_environment(agent);
                let this = q!(env.get_this_binding(agent));
                let base = q!(env.get_super_base(agent));
                Completion::Normal(Some(Operand::Reference(Reference {
                    base: ReferenceBase::Value(base),
                    name: key,
                    strict: true,
                    this_value: Some(this),
                })))
            }
            Expression::Call(call) => evaluate_call(agent, call).await.map(|v| v.map(Operand::Value)),
            Expression::OptionalChain(inner) => match q!(evaluate_operand(agent, inner).await) {
                Some(operand) => Completion::Normal(Some(operand)),
                None => Completion::Normal(Some(Operand::Value(JsValue::Undefined))),
            },
            other => evaluate_expression(agent, other).await.map(|v| Some(Operand::Value(v))),
        }
    })
}

async fn evaluate_member_property(agent: &Agent, property: &MemberProperty) -> Completion<PropertyKey> {
    match property {
        MemberProperty::Dot(name) => Completion::Normal(PropertyKey::from(&**name)),
        MemberProperty::Computed(expr) => {
            let value = q!(evaluate_expression(agent, expr).await);
            to_property_key(agent, &value)
        }
    }
}

/// The key of a property definition or pattern property.
pub async fn evaluate_property_name(agent: &Agent, name: &PropertyName) -> Completion<PropertyKey> {
    match name {
        PropertyName::Literal(s) => Completion::Normal(PropertyKey::from(s.clone())),
        PropertyName::Computed(expr) => {
            let value = q!(evaluate_expression(agent, expr).await);
            to_property_key(agent, &value)
        }
    }
}

// §8.4.5 NamedEvaluation, falling back to plain evaluation for expressions
// that are not anonymous function definitions.
pub fn named_evaluation<'a>(agent: &'a Agent, expr: &'a Expression, name: &'a PropertyKey) -> Eval<'a> {
    Box::pin(async move {
        match expr {
            Expression::Function(node) if node.name.is_none() => Completion::Normal(JsValue::Object(
                instantiate_function_expression(agent, node, Some(name.clone())),
            )),
            Expression::Arrow(node) => {
                Completion::Normal(JsValue::Object(instantiate_arrow_function(agent, node, Some(name.clone()))))
            }
            Expression::Class(class) if class.name.is_none() => {
                class_definition_evaluation(agent, class, None, name.clone())
                    .await
                    .map(JsValue::Object)
            }
            Expression::Parenthesized(inner) if inner.is_anonymous_function_definition() => {
                named_evaluation(agent, inner, name).await
            }
            other => evaluate_expression(agent, other).await,
        }
    })
}

fn literal_evaluation(agent: &Agent, literal: &Literal) -> Completion {
    Completion::Normal(match literal {
        Literal::Undefined => JsValue::Undefined,
        Literal::Null => JsValue::Null,
        Literal::Boolean(b) => JsValue::Boolean(*b),
        Literal::Number(n) => JsValue::Number(*n),
        Literal::String(s) => JsValue::String(s.clone()),
        Literal::BigInt(b) => JsValue::BigInt(JsBigInt { value: b.clone() }),
        Literal::RegExp { pattern, flags } => JsValue::Object(q!(regexp_create(agent, pattern, flags))),
    })
}

// §13.2.4.2 ArrayAccumulation
async fn array_literal_evaluation(agent: &Agent, elements: &[Option<Expression>]) -> Completion {
    let array = q!(array_create(agent, 0, None));
    let mut index: u32 = 0;
    for element in elements {
        match element {
            None => index += 1,
            Some(Expression::Spread(inner)) => {
                let spread = q!(evaluate_expression(agent, inner).await);
                let record = q!(get_iterator(agent, &spread, IteratorHint::Sync));
                while let Some(value) = q!(iterator_step_value(agent, &record)) {
                    x!(create_data_property_or_throw(agent, &array, PropertyKey::from_index(index), value));
                    index += 1;
                }
            }
            Some(expr) => {
                let value = q!(evaluate_expression(agent, expr).await);
                x!(create_data_property_or_throw(agent, &array, PropertyKey::from_index(index), value));
                index += 1;
            }
        }
    }
    q!(set(agent, &array, PropertyKey::from("length"), JsValue::Number(f64::from(index)), true));
    Completion::Normal(JsValue::Object(array))
}

// §13.2.8.6 template literal evaluation
async fn template_literal_evaluation(agent: &Agent, template: &TemplateLiteral) -> Completion {
    let cooked = |i: usize| template.cooked.get(i).cloned().flatten().unwrap_or_else(JsString::empty);
    let mut out = cooked(0);
    for (i, expr) in template.expressions.iter().enumerate() {
        let value = q!(evaluate_expression(agent, expr).await);
        out = out.concat(&q!(to_string(agent, &value)));
        out = out.concat(&cooked(i + 1));
    }
    Completion::Normal(JsValue::String(out))
}

// §13.2.8.4 GetTemplateObject
fn get_template_object(agent: &Agent, template: &Rc<TemplateLiteral>) -> JsObject {
    let realm = agent.current_realm();
    let site = Rc::as_ptr(template) as usize;
    if let Some(cached) = realm.template(site) {
        return cached;
    }
    let strings: Vec<JsValue> = template
        .cooked
        .iter()
        .map(|c| c.clone().map_or(JsValue::Undefined, JsValue::String))
        .collect();
    let raw: Vec<JsValue> = template.raw.iter().cloned().map(JsValue::String).collect();
    let template_object = create_array_from_list(agent, &strings);
    let raw_object = create_array_from_list(agent, &raw);
    x!(set_integrity_level(agent, &raw_object, IntegrityLevel::Frozen));
    x!(define_property_or_throw(
        agent,
        &template_object,
        PropertyKey::from("raw"),
        PropertyDescriptor::data(JsValue::Object(raw_object), false, false, false),
    ));
    x!(set_integrity_level(agent, &template_object, IntegrityLevel::Frozen));
    realm.remember_template(site, template_object.clone());
    template_object
}

// §13.3.11 Tagged templates
async fn tagged_template_evaluation(
    agent: &Agent,
    tag: &Expression,
    quasi: &Rc<TemplateLiteral>,
    position: Position,
) -> Completion {
    let Some(callee) = q!(evaluate_operand(agent, tag).await) else {
        return Completion::Normal(JsValue::Undefined);
    };
    let (func, this) = q!(callee_and_this(agent, callee));
    let mut args = vec![JsValue::Object(get_template_object(agent, quasi))];
    for expr in &quasi.expressions {
        args.push(q!(evaluate_expression(agent, expr).await));
    }
    if !func.is_callable() {
        return agent.throw(ErrorKind::Type, Message::NotAFunction(agent.inspect(&func)));
    }
    agent
        .running_execution_context()
        .call_site_mut()
        .set_location(position, None);
    call(agent, &func, &this, &args)
}

fn callee_and_this(agent: &Agent, callee: Operand) -> Completion<(JsValue, JsValue)> {
    match callee {
        Operand::Reference(reference) => {
            let func = q!(reference.get_value(agent));
            let this = if reference.is_property_reference() {
                reference.get_this_value()
            } else {
                JsValue::Undefined
            };
            Completion::Normal((func, this))
        }
        Operand::Value(func) => Completion::Normal((func, JsValue::Undefined)),
    }
}

// §13.3.8.1 ArgumentListEvaluation
pub async fn argument_list_evaluation(agent: &Agent, arguments: &[Expression]) -> Completion<Vec<JsValue>> {
    let mut values = Vec::with_capacity(arguments.len());
    for argument in arguments {
        if let Expression::Spread(inner) = argument {
            let spread = q!(evaluate_expression(agent, inner).await);
            let record = q!(get_iterator(agent, &spread, IteratorHint::Sync));
            while let Some(value) = q!(iterator_step_value(agent, &record)) {
                values.push(value);
            }
        } else {
            values.push(q!(evaluate_expression(agent, argument).await));
        }
    }
    Completion::Normal(values)
}

// §13.3.6.1 function calls. `None` when an optional call short-circuits.
async fn evaluate_call(agent: &Agent, expr: &CallExpression) -> Completion<Option<JsValue>> {
    let Some(callee) = q!(evaluate_operand(agent, &expr.callee).await) else {
        return Completion::Normal(None);
    };
    let (func, this) = q!(callee_and_this(agent, callee));
    if expr.optional && func.is_nullish() {
        return Completion::Normal(None);
    }
    let args = q!(argument_list_evaluation(agent, &expr.arguments).await);
    if !func.is_callable() {
        return agent.throw(ErrorKind::Type, Message::NotAFunction(expr.callee_text.to_string()));
    }
    agent
        .running_execution_context()
        .call_site_mut()
        .set_location(expr.position, Some(&expr.callee_text));
    call(agent, &func, &this, &args).map(Some)
}

// §13.3.5.1.1 EvaluateNew
async fn new_evaluation(agent: &Agent, expr: &CallExpression) -> Completion {
    let constructor = q!(evaluate_expression(agent, &expr.callee).await);
    let args = q!(argument_list_evaluation(agent, &expr.arguments).await);
    let JsValue::Object(constructor) = constructor else {
        return agent.throw(ErrorKind::Type, Message::NotAConstructor(expr.callee_text.to_string()));
    };
    if !constructor.is_constructor() {
        return agent.throw(ErrorKind::Type, Message::NotAConstructor(expr.callee_text.to_string()));
    }
    agent
        .running_execution_context()
        .call_site_mut()
        .set_location(expr.position, Some(&expr.callee_text));
    construct(agent, &constructor, &args, None).map(JsValue::Object)
}

// §13.3.7.1 SuperCall evaluation
async fn super_call_evaluation(agent: &Agent, arguments: &[Expression], position: Position) -> Completion {
    let env = get_this_environment(agent);
    let Some(record) = env.function_record() else {
        return agent.throw(ErrorKind::Syntax, Message::Syntax("'super' keyword unexpected here".to_owned()));
    };
    let active = record.function_object.clone();
    let new_target = record.new_target.clone();
    // §13.3.7.2 GetSuperConstructor
    let super_constructor = q!(active.get_prototype_of(agent));
    let args = q!(argument_list_evaluation(agent, arguments).await);
    let Some(super_constructor) = super_constructor.filter(|c| c.is_constructor()) else {
        return agent.throw(ErrorKind::Type, Message::NotAConstructor("Super constructor".to_owned()));
    };
    let Some(new_target) = new_target else {
        return agent.throw(ErrorKind::Syntax, Message::Syntax("'super' keyword unexpected here".to_owned()));
    };
    agent
        .running_execution_context()
        .call_site_mut()
        .set_location(position, Some("super"));
    let result = q!(construct(agent, &super_constructor, &args, Some(&new_target)));
    q!(env.bind_this_value(agent, JsValue::Object(result.clone())));
    q!(initialize_instance_elements(agent, &result, &active));
    Completion::Normal(JsValue::Object(result))
}

// §13.5 unary operators
async fn unary_evaluation(agent: &Agent, op: UnaryOp, operand: &Expression) -> Completion {
    match op {
        UnaryOp::Delete => {
            let deleted = match q!(evaluate_operand(agent, operand).await) {
                Some(Operand::Reference(reference)) => q!(reference.delete(agent)),
                _ => true,
            };
            Completion::Normal(JsValue::Boolean(deleted))
        }
        UnaryOp::Typeof => {
            let value = if let Expression::Identifier(name) = operand {
                let reference = q!(resolve_binding(agent, name, None));
                if reference.is_unresolvable() {
                    return Completion::Normal(JsValue::from_str("undefined"));
                }
                q!(reference.get_value(agent))
            } else {
                q!(evaluate_expression(agent, operand).await)
            };
            Completion::Normal(JsValue::from_str(value.type_of()))
        }
        UnaryOp::Void => {
            q!(evaluate_expression(agent, operand).await);
            Completion::Normal(JsValue::Undefined)
        }
        UnaryOp::Not => {
            let value = q!(evaluate_expression(agent, operand).await);
            Completion::Normal(JsValue::Boolean(!to_boolean(&value)))
        }
        UnaryOp::Plus => {
            let value = q!(evaluate_expression(agent, operand).await);
            to_number(agent, &value).map(JsValue::Number)
        }
        UnaryOp::Minus => {
            let value = q!(evaluate_expression(agent, operand).await);
            Completion::Normal(match q!(to_numeric(agent, &value)) {
                Numeric::Number(n) => JsValue::Number(-n),
                Numeric::BigInt(b) => JsValue::BigInt(JsBigInt::new(-&*b.value)),
            })
        }
        UnaryOp::BitNot => {
            let value = q!(evaluate_expression(agent, operand).await);
            Completion::Normal(match q!(to_numeric(agent, &value)) {
                Numeric::Number(n) => JsValue::Number(f64::from(!number_ops::to_int32(n))),
                Numeric::BigInt(b) => JsValue::BigInt(JsBigInt::new(bigint_ops::bitwise_not(&b.value))),
            })
        }
    }
}

// §13.4 update expressions
async fn update_evaluation(agent: &Agent, op: UpdateOp, prefix: bool, target: &Expression) -> Completion {
    let reference = q!(evaluate_reference(agent, target).await);
    let old = q!(reference.get_value(agent));
    let old = q!(to_numeric(agent, &old));
    let (old, new) = match old {
        Numeric::Number(n) => {
            let delta = if op == UpdateOp::Increment { 1.0 } else { -1.0 };
            (JsValue::Number(n), JsValue::Number(n + delta))
        }
        Numeric::BigInt(b) => {
            let delta = BigInt::from(if op == UpdateOp::Increment { 1 } else { -1 });
            let new = JsBigInt::new(&*b.value + delta);
            (JsValue::BigInt(b), JsValue::BigInt(new))
        }
    };
    q!(reference.put_value(agent, new.clone()));
    Completion::Normal(if prefix { new } else { old })
}

fn logical_continues(op: LogicalOp, left: &JsValue) -> bool {
    match op {
        LogicalOp::And => to_boolean(left),
        LogicalOp::Or => !to_boolean(left),
        LogicalOp::Nullish => left.is_nullish(),
    }
}

// §13.15.2 assignment operators
async fn assignment_evaluation(agent: &Agent, op: AssignOp, target: &Pattern, value: &Expression) -> Completion {
    if op == AssignOp::Assign && is_destructuring(target) {
        let rval = q!(evaluate_expression(agent, value).await);
        q!(bind_pattern(agent, target, rval.clone(), None).await);
        return Completion::Normal(rval);
    }
    let reference = match target {
        Pattern::Identifier(name) => q!(resolve_binding(agent, name, None)),
        Pattern::Member(expr) => q!(evaluate_reference(agent, expr).await),
        _ => return agent.throw(ErrorKind::Syntax, Message::InvalidAssignmentTarget),
    };
    let evaluate_rhs = move || async move {
        match target {
            Pattern::Identifier(name) => named_evaluation(agent, value, &PropertyKey::from(&**name)).await,
            _ => evaluate_expression(agent, value).await,
        }
    };
    let result = match op {
        AssignOp::Assign => q!(evaluate_rhs().await),
        AssignOp::Compound(binary) => {
            let lval = q!(reference.get_value(agent));
            let rval = q!(evaluate_expression(agent, value).await);
            q!(apply_binary_operator(agent, binary, &lval, &rval))
        }
        AssignOp::Logical(logical) => {
            let lval = q!(reference.get_value(agent));
            if !logical_continues(logical, &lval) {
                return Completion::Normal(lval);
            }
            q!(evaluate_rhs().await)
        }
    };
    q!(reference.put_value(agent, result.clone()));
    Completion::Normal(result)
}

// §13.15.3 ApplyStringOrNumericBinaryOperator, plus the relational and
// equality operators.
pub fn apply_binary_operator(agent: &Agent, op: BinaryOp, l: &JsValue, r: &JsValue) -> Completion {
    let boolean = |b: bool| Completion::Normal(JsValue::Boolean(b));
    match op {
        BinaryOp::Eq => is_loosely_equal(agent, l, r).map(JsValue::Boolean),
        BinaryOp::NotEq => is_loosely_equal(agent, l, r).map(|b| JsValue::Boolean(!b)),
        BinaryOp::StrictEq => boolean(is_strictly_equal(l, r)),
        BinaryOp::StrictNotEq => boolean(!is_strictly_equal(l, r)),
        BinaryOp::Lt => boolean(q!(is_less_than(agent, l, r, true)).unwrap_or(false)),
        BinaryOp::Gt => boolean(q!(is_less_than(agent, r, l, false)).unwrap_or(false)),
        BinaryOp::LtEq => boolean(q!(is_less_than(agent, r, l, false)) == Some(false)),
        BinaryOp::GtEq => boolean(q!(is_less_than(agent, l, r, true)) == Some(false)),
        BinaryOp::In => {
            let JsValue::Object(o) = r else {
                return agent.throw(ErrorKind::Type, Message::NotAnObject(agent.inspect(r)));
            };
            let key = q!(to_property_key(agent, l));
            o.has_property(agent, &key).map(JsValue::Boolean)
        }
        BinaryOp::Instanceof => instance_of_operator(agent, l, r).map(JsValue::Boolean),
        BinaryOp::Add => {
            let lprim = q!(to_primitive(agent, l, PreferredType::Default));
            let rprim = q!(to_primitive(agent, r, PreferredType::Default));
            if matches!(lprim, JsValue::String(_)) || matches!(rprim, JsValue::String(_)) {
                let ls = q!(to_string(agent, &lprim));
                let rs = q!(to_string(agent, &rprim));
                return Completion::Normal(JsValue::String(ls.concat(&rs)));
            }
            numeric_operator(agent, op, &lprim, &rprim)
        }
        _ => numeric_operator(agent, op, l, r),
    }
}

fn numeric_operator(agent: &Agent, op: BinaryOp, l: &JsValue, r: &JsValue) -> Completion {
    let lnum = q!(to_numeric(agent, l));
    let rnum = q!(to_numeric(agent, r));
    match (lnum, rnum) {
        (Numeric::Number(x), Numeric::Number(y)) => Completion::Normal(JsValue::Number(number_operator(op, x, y))),
        (Numeric::BigInt(x), Numeric::BigInt(y)) => big_int_operator(agent, op, &x.value, &y.value),
        _ => agent.throw(ErrorKind::Type, Message::BigIntMixing),
    }
}

fn number_operator(op: BinaryOp, x: f64, y: f64) -> f64 {
    match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div => x / y,
        BinaryOp::Mod => number_ops::remainder(x, y),
        BinaryOp::Exp => number_ops::exponentiate(x, y),
        BinaryOp::LShift => number_ops::left_shift(x, y),
        BinaryOp::RShift => number_ops::signed_right_shift(x, y),
        BinaryOp::URShift => number_ops::unsigned_right_shift(x, y),
        BinaryOp::BitAnd => f64::from(number_ops::to_int32(x) & number_ops::to_int32(y)),
        BinaryOp::BitOr => f64::from(number_ops::to_int32(x) | number_ops::to_int32(y)),
        BinaryOp::BitXor => f64::from(number_ops::to_int32(x) ^ number_ops::to_int32(y)),
        _ => unreachable!("{op:?} is not a numeric operator"),
    }
}

fn big_int_operator(agent: &Agent, op: BinaryOp, x: &BigInt, y: &BigInt) -> Completion {
    let result = match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div => match bigint_ops::divide(x, y) {
            Some(q) => q,
            None => return agent.throw(ErrorKind::Range, Message::DivisionByZero),
        },
        BinaryOp::Mod => match bigint_ops::remainder(x, y) {
            Some(r) => r,
            None => return agent.throw(ErrorKind::Range, Message::DivisionByZero),
        },
        BinaryOp::Exp => match bigint_ops::exponentiate(x, y) {
            Some(p) => p,
            None => return agent.throw(ErrorKind::Range, Message::OutOfRange("Exponent".to_owned())),
        },
        BinaryOp::LShift => bigint_ops::left_shift(x, y),
        BinaryOp::RShift => bigint_ops::signed_right_shift(x, y),
        BinaryOp::URShift => return agent.throw(ErrorKind::Type, Message::BigIntUnsignedShift),
        BinaryOp::BitAnd => x & y,
        BinaryOp::BitOr => x | y,
        BinaryOp::BitXor => x ^ y,
        _ => unreachable!("{op:?} is not a numeric operator"),
    };
    Completion::Normal(JsValue::BigInt(JsBigInt::new(result)))
}

#[cfg(test)]
mod tests {
    use crate::evaluator::test_support::eval_to_string;

    #[test]
    fn arithmetic_and_string_concatenation() {
        assert_eq!(eval_to_string("1 + 2 * 3 - 4 / 2"), "5");
        assert_eq!(eval_to_string("'a' + 1 + 2"), "a12");
        assert_eq!(eval_to_string("2 ** 10"), "1024");
        assert_eq!(eval_to_string("-7 % 3"), "-1");
        assert_eq!(eval_to_string("1 << 31"), "-2147483648");
        assert_eq!(eval_to_string("-1 >>> 28"), "15");
    }

    #[test]
    fn bigint_arithmetic_rejects_mixing() {
        assert_eq!(eval_to_string("(2n ** 64n).toString()"), "18446744073709551616");
        assert!(eval_to_string("1n + 1").starts_with("Throw: TypeError"));
        assert!(eval_to_string("1n / 0n").starts_with("Throw: RangeError"));
    }

    #[test]
    fn bigint_bitwise_not() {
        assert_eq!(eval_to_string("[~5n, ~-1n, ~0n].join()"), "-6,0,-1");
    }

    #[test]
    fn comparison_and_equality() {
        assert_eq!(eval_to_string("[1 < 2, 'b' > 'a', NaN <= NaN, null == undefined, '1' === 1].join()"), "true,true,false,true,false");
    }

    #[test]
    fn logical_and_nullish_assignment() {
        assert_eq!(eval_to_string("var a = null; a ??= 5; var b = 1; b &&= 2; var c = 0; c ||= 3; [a, b, c].join()"), "5,2,3");
        assert_eq!(eval_to_string("(0 || null) ?? 'd'"), "d");
        assert!(eval_to_string("0 || null ?? 'd'").starts_with("Throw: SyntaxError"));
    }

    #[test]
    fn typeof_unresolvable_and_delete() {
        assert_eq!(eval_to_string("typeof notDeclared"), "undefined");
        assert_eq!(eval_to_string("typeof function () {}"), "function");
        assert_eq!(eval_to_string("var o = { a: 1 }; delete o.a; 'a' in o"), "false");
    }

    #[test]
    fn optional_chains_short_circuit() {
        assert_eq!(eval_to_string("var o = null; o?.a.b.c"), "undefined");
        assert_eq!(eval_to_string("var o = { f() { return this.v; }, v: 7 }; o.f?.()"), "7");
        assert_eq!(eval_to_string("var o = {}; o.missing?.()"), "undefined");
        assert!(eval_to_string("var o = null; (o?.a).b").starts_with("Throw: TypeError"));
    }

    #[test]
    fn calls_pass_the_member_base_as_this() {
        assert_eq!(eval_to_string("var o = { v: 1, get() { return this.v; } }; (o.get)()"), "1");
        assert!(eval_to_string("var o = {}; o.nothing()").contains("o.nothing is not a function"));
    }

    #[test]
    fn spread_in_arrays_and_calls() {
        assert_eq!(eval_to_string("[0, ...[1, 2], , 3].length"), "5");
        assert_eq!(eval_to_string("Math.max(...[1, 5, 3])"), "5");
    }

    #[test]
    fn template_literals_and_tags() {
        assert_eq!(eval_to_string("var x = 2; `a${x}b${x * 2}`"), "a2b4");
        assert_eq!(
            eval_to_string("function tag(s, ...v) { return s.raw.join('|') + v.join(); } tag`x\\n${1}y`"),
            "x\\n|y1"
        );
        assert_eq!(
            eval_to_string("function t(s) { return s; } function f() { return t`a`; } f() === f()"),
            "true"
        );
    }

    #[test]
    fn update_expressions_return_old_or_new() {
        assert_eq!(eval_to_string("var i = 1; var a = i++; var b = ++i; [a, b, i].join()"), "1,3,3");
        assert_eq!(eval_to_string("var n = 1n; n++; n.toString()"), "2");
    }

    #[test]
    fn assignment_names_anonymous_functions() {
        assert_eq!(eval_to_string("var f; f = () => 1; f.name"), "f");
        assert_eq!(eval_to_string("var c = class {}; c.name"), "c");
    }
}
