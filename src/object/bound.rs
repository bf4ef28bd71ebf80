//! §10.4.1 Bound Function Exotic Objects.

use crate::abstract_ops::{call, construct};
use crate::completion::Completion;
use crate::engine::Agent;
use crate::object::{JsObject, ObjectKind};
use crate::types::JsValue;

pub struct BoundFunctionData {
    pub target: JsObject,
    pub bound_this: JsValue,
    pub bound_args: Vec<JsValue>,
}

// §10.4.1.3 BoundFunctionCreate
pub fn bound_function_create(
    agent: &Agent,
    target: &JsObject,
    bound_this: JsValue,
    bound_args: Vec<JsValue>,
) -> Completion<JsObject> {
    let proto = q!(target.get_prototype_of(agent));
    Completion::Normal(JsObject::new(
        proto,
        ObjectKind::BoundFunction(BoundFunctionData {
            target: target.clone(),
            bound_this,
            bound_args,
        }),
    ))
}

fn parts(f: &JsObject) -> (JsObject, JsValue, Vec<JsValue>) {
    match &f.borrow().kind {
        ObjectKind::BoundFunction(b) => (b.target.clone(), b.bound_this.clone(), b.bound_args.clone()),
        _ => unreachable!("bound function without [[BoundTargetFunction]]"),
    }
}

// §10.4.1.1 [[Call]]
pub fn call_bound(agent: &Agent, f: &JsObject, args: &[JsValue]) -> Completion {
    let (target, bound_this, mut all_args) = parts(f);
    all_args.extend_from_slice(args);
    call(agent, &JsValue::Object(target), &bound_this, &all_args)
}

// §10.4.1.2 [[Construct]]
pub fn construct_bound(
    agent: &Agent,
    f: &JsObject,
    args: &[JsValue],
    new_target: &JsObject,
) -> Completion<JsObject> {
    let (target, _, mut all_args) = parts(f);
    all_args.extend_from_slice(args);
    let new_target = if new_target.ptr_eq(f) { &target } else { new_target };
    construct(agent, &target, &all_args, Some(new_target))
}
