//! §27.2 Promise objects: the promise state machine, reaction jobs, the
//! capability plumbing shared with async functions, and the Promise
//! constructor and prototype.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::trace;

use crate::abstract_ops::comparison::same_value;
use crate::abstract_ops::iterator::{IteratorHint, IteratorRecord, get_iterator, iterator_close, iterator_step_value};
use crate::abstract_ops::{
    call, construct, create_array_from_list, create_data_property_or_throw, get, invoke, make_basic_object,
    ordinary_create_from_constructor, species_constructor,
};
use crate::builtins::{arg, builtin_function, define_constructor, define_method, define_species, define_tag, plain_object};
use crate::completion::Completion;
use crate::engine::{
    Agent, ErrorKind, IntrinsicId, Message, Realm, RejectionOperation, host_promise_rejection_tracker,
};
use crate::object::{JsObject, ObjectKind, PropertyKey};
use crate::types::JsValue;

/// IfAbruptRejectPromise: unwraps a normal completion; on a throw, rejects
/// `capability` with the thrown value and returns its promise from the
/// enclosing function.
macro_rules! if_abrupt_reject_promise {
    ($agent:expr, $value:expr, $capability:expr) => {
        match $value {
            $crate::completion::Completion::Normal(v) => v,
            $crate::completion::Completion::Throw(e) => {
                let capability = &$capability;
                $crate::q!($crate::abstract_ops::call(
                    $agent,
                    &capability.reject,
                    &$crate::types::JsValue::Undefined,
                    &[e]
                ));
                return $crate::completion::Completion::Normal($crate::types::JsValue::Object(
                    capability.promise.clone(),
                ));
            }
            other => return other.into_abrupt(),
        }
    };
}
pub(crate) use if_abrupt_reject_promise;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PromiseState {
    Pending,
    Fulfilled,
    Rejected,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ReactionType {
    Fulfill,
    Reject,
}

/// The internal slots of a promise instance.
pub struct PromiseData {
    pub state: PromiseState,
    pub result: JsValue,
    pub fulfill_reactions: Vec<PromiseReaction>,
    pub reject_reactions: Vec<PromiseReaction>,
    pub is_handled: bool,
}

impl PromiseData {
    fn pending() -> Self {
        PromiseData {
            state: PromiseState::Pending,
            result: JsValue::Undefined,
            fulfill_reactions: Vec::new(),
            reject_reactions: Vec::new(),
            is_handled: false,
        }
    }
}

// §27.2.1.1 PromiseCapability Records
#[derive(Clone, Debug)]
pub struct PromiseCapability {
    pub promise: JsObject,
    pub resolve: JsValue,
    pub reject: JsValue,
}

// §27.2.1.2 PromiseReaction Records
#[derive(Clone)]
pub struct PromiseReaction {
    pub capability: Option<PromiseCapability>,
    pub kind: ReactionType,
    pub handler: Option<JsObject>,
}

pub(super) fn init(realm: &Realm) {
    let proto = plain_object(realm);
    define_method(realm, &proto, "then", 2, promise_then);
    define_method(realm, &proto, "catch", 1, promise_catch);
    define_method(realm, &proto, "finally", 1, promise_finally);
    define_tag(&proto, "Promise");

    let ctor = define_constructor(realm, "Promise", 1, promise_constructor, &proto);
    define_method(realm, &ctor, "all", 1, |agent, this, args| combinator(agent, this, &arg(args, 0), Combinator::All));
    define_method(realm, &ctor, "race", 1, |agent, this, args| combinator(agent, this, &arg(args, 0), Combinator::Race));
    define_method(realm, &ctor, "reject", 1, promise_reject_static);
    define_method(realm, &ctor, "resolve", 1, promise_resolve_static);
    define_species(realm, &ctor);
    realm.set_intrinsic(IntrinsicId::PromisePrototype, proto);
    realm.set_intrinsic(IntrinsicId::Promise, ctor);
}

/// `Promise.allSettled`, installed only when the host enables it.
pub(super) fn init_all_settled(realm: &Realm) {
    define_method(realm, &realm.intrinsic(IntrinsicId::Promise), "allSettled", 1, |agent, this, args| {
        combinator(agent, this, &arg(args, 0), Combinator::AllSettled)
    });
}

// §27.2.1.6 IsPromise
pub fn is_promise(value: &JsValue) -> bool {
    match value {
        JsValue::Object(o) => matches!(o.borrow().kind, ObjectKind::Promise(_)),
        _ => false,
    }
}

/// The state of a promise object, or `None` for anything else.
pub fn promise_state(promise: &JsObject) -> Option<(PromiseState, JsValue)> {
    match &promise.borrow().kind {
        ObjectKind::Promise(p) => Some((p.state, p.result.clone())),
        _ => None,
    }
}

// §27.2.1.3 CreateResolvingFunctions
fn create_resolving_functions(agent: &Agent, promise: &JsObject) -> (JsObject, JsObject) {
    let already_resolved = Rc::new(Cell::new(false));

    let target = promise.clone();
    let resolved = already_resolved.clone();
    let resolve = builtin_function(agent, "", 1, move |agent, _this, args, _new_target| {
        if resolved.replace(true) {
            return Completion::Normal(JsValue::Undefined);
        }
        resolve_promise(agent, &target, arg(args, 0))
    });

    let target = promise.clone();
    let resolved = already_resolved;
    let reject = builtin_function(agent, "", 1, move |agent, _this, args, _new_target| {
        if resolved.replace(true) {
            return Completion::Normal(JsValue::Undefined);
        }
        reject_promise(agent, &target, arg(args, 0));
        Completion::Normal(JsValue::Undefined)
    });
    (resolve, reject)
}

// §27.2.1.3.2 Promise Resolve Functions, steps 7 onwards
fn resolve_promise(agent: &Agent, promise: &JsObject, resolution: JsValue) -> Completion {
    let JsValue::Object(thenable) = &resolution else {
        fulfill_promise(agent, promise, resolution);
        return Completion::Normal(JsValue::Undefined);
    };
    if thenable.ptr_eq(promise) {
        let error = agent.new_error(ErrorKind::Type, Message::PromiseCycle);
        reject_promise(agent, promise, JsValue::Object(error));
        return Completion::Normal(JsValue::Undefined);
    }
    let then = match get(agent, thenable, &PropertyKey::from("then")) {
        Completion::Normal(then) => then,
        Completion::Throw(error) => {
            reject_promise(agent, promise, error);
            return Completion::Normal(JsValue::Undefined);
        }
        other => return other,
    };
    if !then.is_callable() {
        fulfill_promise(agent, promise, resolution);
        return Completion::Normal(JsValue::Undefined);
    }
    enqueue_resolve_thenable_job(agent, promise.clone(), thenable.clone(), then);
    Completion::Normal(JsValue::Undefined)
}

// §27.2.1.4 FulfillPromise
fn fulfill_promise(agent: &Agent, promise: &JsObject, value: JsValue) {
    let reactions = settle(promise, PromiseState::Fulfilled, value.clone());
    trigger_promise_reactions(agent, reactions, value);
}

// §27.2.1.7 RejectPromise
fn reject_promise(agent: &Agent, promise: &JsObject, reason: JsValue) {
    let reactions = settle(promise, PromiseState::Rejected, reason.clone());
    let handled = matches!(&promise.borrow().kind, ObjectKind::Promise(p) if p.is_handled);
    if !handled {
        host_promise_rejection_tracker(agent, promise, RejectionOperation::Reject);
    }
    trigger_promise_reactions(agent, reactions, reason);
}

/// Moves a pending promise to `state`, handing back the reactions to run.
fn settle(promise: &JsObject, state: PromiseState, result: JsValue) -> Vec<PromiseReaction> {
    let mut data = promise.borrow_mut();
    let ObjectKind::Promise(p) = &mut data.kind else {
        unreachable!("settling a non-promise");
    };
    debug_assert_eq!(p.state, PromiseState::Pending);
    let fulfill = std::mem::take(&mut p.fulfill_reactions);
    let reject = std::mem::take(&mut p.reject_reactions);
    p.state = state;
    p.result = result;
    match state {
        PromiseState::Fulfilled => fulfill,
        _ => reject,
    }
}

// §27.2.1.8 TriggerPromiseReactions
fn trigger_promise_reactions(agent: &Agent, reactions: Vec<PromiseReaction>, argument: JsValue) {
    trace!(count = reactions.len(), "triggering promise reactions");
    for reaction in reactions {
        enqueue_reaction_job(agent, reaction, argument.clone());
    }
}

// §27.2.2.1 NewPromiseReactionJob
fn enqueue_reaction_job(agent: &Agent, reaction: PromiseReaction, argument: JsValue) {
    agent.enqueue_job("PromiseJobs", move |agent| {
        let handler_result = match &reaction.handler {
            None => match reaction.kind {
                ReactionType::Fulfill => Completion::Normal(argument),
                ReactionType::Reject => Completion::Throw(argument),
            },
            Some(handler) => call(agent, &JsValue::Object(handler.clone()), &JsValue::Undefined, &[argument]),
        };
        let Some(capability) = &reaction.capability else {
            return handler_result.map(|_| JsValue::Undefined);
        };
        match handler_result {
            Completion::Normal(value) => call(agent, &capability.resolve, &JsValue::Undefined, &[value]),
            Completion::Throw(reason) => call(agent, &capability.reject, &JsValue::Undefined, &[reason]),
            other => other,
        }
    });
}

// §27.2.2.2 NewPromiseResolveThenableJob
fn enqueue_resolve_thenable_job(agent: &Agent, promise: JsObject, thenable: JsObject, then: JsValue) {
    agent.enqueue_job("PromiseJobs", move |agent| {
        let (resolve, reject) = create_resolving_functions(agent, &promise);
        let reject = JsValue::Object(reject);
        let result = call(
            agent,
            &then,
            &JsValue::Object(thenable),
            &[JsValue::Object(resolve), reject.clone()],
        );
        match result {
            Completion::Throw(error) => call(agent, &reject, &JsValue::Undefined, &[error]),
            other => other,
        }
    });
}

// §27.2.1.5 NewPromiseCapability
pub fn new_promise_capability(agent: &Agent, c: &JsValue) -> Completion<PromiseCapability> {
    let JsValue::Object(ctor) = c else {
        return agent.throw(ErrorKind::Type, Message::NotAConstructor(agent.inspect(c)));
    };
    if !ctor.is_constructor() {
        return agent.throw(ErrorKind::Type, Message::NotAConstructor(agent.inspect(c)));
    }
    let slots: Rc<RefCell<(JsValue, JsValue)>> = Rc::new(RefCell::new((JsValue::Undefined, JsValue::Undefined)));
    let captured = slots.clone();
    let executor = builtin_function(agent, "", 2, move |agent, _this, args, _new_target| {
        let mut slots = captured.borrow_mut();
        if !slots.0.is_undefined() || !slots.1.is_undefined() {
            return agent.throw(ErrorKind::Type, Message::PromiseExecutorInvoked);
        }
        *slots = (arg(args, 0), arg(args, 1));
        Completion::Normal(JsValue::Undefined)
    });
    let promise = q!(construct(agent, ctor, &[JsValue::Object(executor)], None));
    let (resolve, reject) = slots.borrow().clone();
    if !resolve.is_callable() {
        return agent.throw(ErrorKind::Type, Message::PromiseResolveFunction);
    }
    if !reject.is_callable() {
        return agent.throw(ErrorKind::Type, Message::PromiseRejectFunction);
    }
    Completion::Normal(PromiseCapability { promise, resolve, reject })
}

// §27.2.4.7.1 PromiseResolve
pub fn promise_resolve(agent: &Agent, c: &JsObject, x: JsValue) -> Completion<JsObject> {
    if let JsValue::Object(promise) = &x
        && is_promise(&x)
    {
        let ctor = q!(get(agent, promise, &PropertyKey::from("constructor")));
        if same_value(&ctor, &JsValue::Object(c.clone())) {
            return Completion::Normal(promise.clone());
        }
    }
    let capability = q!(new_promise_capability(agent, &JsValue::Object(c.clone())));
    q!(call(agent, &capability.resolve, &JsValue::Undefined, &[x]));
    Completion::Normal(capability.promise)
}

// §27.2.5.4.1 PerformPromiseThen
pub fn perform_promise_then(
    agent: &Agent,
    promise: &JsObject,
    on_fulfilled: JsValue,
    on_rejected: JsValue,
    capability: Option<PromiseCapability>,
) -> JsValue {
    let handler = |v: JsValue| match v {
        JsValue::Object(o) if o.is_callable() => Some(o),
        _ => None,
    };
    let fulfill = PromiseReaction {
        capability: capability.clone(),
        kind: ReactionType::Fulfill,
        handler: handler(on_fulfilled),
    };
    let reject = PromiseReaction {
        capability: capability.clone(),
        kind: ReactionType::Reject,
        handler: handler(on_rejected),
    };
    let settled = {
        let mut data = promise.borrow_mut();
        let ObjectKind::Promise(p) = &mut data.kind else {
            unreachable!("PerformPromiseThen on a non-promise");
        };
        let was_handled = std::mem::replace(&mut p.is_handled, true);
        match p.state {
            PromiseState::Pending => {
                p.fulfill_reactions.push(fulfill);
                p.reject_reactions.push(reject);
                None
            }
            PromiseState::Fulfilled => Some((fulfill, p.result.clone(), true)),
            PromiseState::Rejected => Some((reject, p.result.clone(), was_handled)),
        }
    };
    if let Some((reaction, argument, handled)) = settled {
        if !handled {
            host_promise_rejection_tracker(agent, promise, RejectionOperation::Handle);
        }
        enqueue_reaction_job(agent, reaction, argument);
    }
    match capability {
        Some(capability) => JsValue::Object(capability.promise),
        None => JsValue::Undefined,
    }
}

// §27.2.3.1 Promise ( executor )
fn promise_constructor(agent: &Agent, _this: &JsValue, args: &[JsValue], new_target: Option<&JsObject>) -> Completion {
    let Some(new_target) = new_target else {
        return agent.throw(ErrorKind::Type, Message::ConstructorRequiresNew("Promise".into()));
    };
    let executor = arg(args, 0);
    if !executor.is_callable() {
        return agent.throw(ErrorKind::Type, Message::NotAFunction(agent.inspect(&executor)));
    }
    let promise = q!(ordinary_create_from_constructor(
        agent,
        new_target,
        IntrinsicId::PromisePrototype,
        ObjectKind::Promise(PromiseData::pending())
    ));
    let (resolve, reject) = create_resolving_functions(agent, &promise);
    let reject = JsValue::Object(reject);
    let completion = call(agent, &executor, &JsValue::Undefined, &[JsValue::Object(resolve), reject.clone()]);
    if let Completion::Throw(error) = completion {
        q!(call(agent, &reject, &JsValue::Undefined, &[error]));
    }
    Completion::Normal(JsValue::Object(promise))
}

fn this_promise(agent: &Agent, this: &JsValue) -> Completion<JsObject> {
    match this {
        JsValue::Object(o) if is_promise(this) => Completion::Normal(o.clone()),
        _ => agent.throw(ErrorKind::Type, Message::NotATypeObject(agent.inspect(this), "Promise")),
    }
}

// §27.2.5.4 Promise.prototype.then
fn promise_then(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let promise = q!(this_promise(agent, this));
    let c = q!(species_constructor(agent, &promise, IntrinsicId::Promise));
    let capability = q!(new_promise_capability(agent, &JsValue::Object(c)));
    Completion::Normal(perform_promise_then(agent, &promise, arg(args, 0), arg(args, 1), Some(capability)))
}

// §27.2.5.1 Promise.prototype.catch
fn promise_catch(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    invoke(agent, this, &PropertyKey::from("then"), &[JsValue::Undefined, arg(args, 0)])
}

// §27.2.5.3 Promise.prototype.finally
fn promise_finally(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let JsValue::Object(promise) = this else {
        return agent.throw(ErrorKind::Type, Message::NotAnObject(agent.inspect(this)));
    };
    let c = q!(species_constructor(agent, promise, IntrinsicId::Promise));
    let on_finally = arg(args, 0);
    if !on_finally.is_callable() {
        return invoke(agent, this, &PropertyKey::from("then"), &[on_finally.clone(), on_finally]);
    }
    let then_finally = finally_reaction(agent, &c, &on_finally, false);
    let catch_finally = finally_reaction(agent, &c, &on_finally, true);
    invoke(
        agent,
        this,
        &PropertyKey::from("then"),
        &[JsValue::Object(then_finally), JsValue::Object(catch_finally)],
    )
}

/// Then Finally Functions and Catch Finally Functions: run `on_finally`, wait
/// for its result, then pass the original outcome through.
fn finally_reaction(agent: &Agent, c: &JsObject, on_finally: &JsValue, rethrow: bool) -> JsObject {
    let c = c.clone();
    let on_finally = on_finally.clone();
    builtin_function(agent, "", 1, move |agent, _this, args, _new_target| {
        let outcome = arg(args, 0);
        let result = q!(call(agent, &on_finally, &JsValue::Undefined, &[]));
        let promise = q!(promise_resolve(agent, &c, result));
        let pass_through = builtin_function(agent, "", 0, move |_, _, _, _| {
            if rethrow {
                Completion::Throw(outcome.clone())
            } else {
                Completion::Normal(outcome.clone())
            }
        });
        invoke(
            agent,
            &JsValue::Object(promise),
            &PropertyKey::from("then"),
            &[JsValue::Object(pass_through)],
        )
    })
}

// §27.2.4.7 Promise.resolve
fn promise_resolve_static(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let JsValue::Object(c) = this else {
        return agent.throw(ErrorKind::Type, Message::NotAnObject(agent.inspect(this)));
    };
    promise_resolve(agent, c, arg(args, 0)).map(JsValue::Object)
}

// §27.2.4.6 Promise.reject
fn promise_reject_static(agent: &Agent, this: &JsValue, args: &[JsValue]) -> Completion {
    let capability = q!(new_promise_capability(agent, this));
    q!(call(agent, &capability.reject, &JsValue::Undefined, &[arg(args, 0)]));
    Completion::Normal(JsValue::Object(capability.promise))
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Combinator {
    All,
    AllSettled,
    Race,
}

/// Shared by the element functions of one `Promise.all`/`allSettled` call.
struct Aggregate {
    values: RefCell<Vec<JsValue>>,
    remaining: Cell<usize>,
    capability: PromiseCapability,
}

impl Aggregate {
    /// Decrements the remaining count, resolving with the values array once
    /// every element has reported.
    fn element_done(&self, agent: &Agent) -> Completion {
        let remaining = self.remaining.get() - 1;
        self.remaining.set(remaining);
        if remaining > 0 {
            return Completion::Normal(JsValue::Undefined);
        }
        let values = create_array_from_list(agent, &self.values.borrow());
        call(agent, &self.capability.resolve, &JsValue::Undefined, &[JsValue::Object(values)])
    }
}

// §27.2.4.1 Promise.all, §27.2.4.2 Promise.allSettled, §27.2.4.5 Promise.race
fn combinator(agent: &Agent, this: &JsValue, iterable: &JsValue, which: Combinator) -> Completion {
    let capability = q!(new_promise_capability(agent, this));
    let JsValue::Object(c) = this else {
        unreachable!("NewPromiseCapability accepted a non-object");
    };
    let resolve = if_abrupt_reject_promise!(agent, get_promise_resolve(agent, c), capability);
    let record = if_abrupt_reject_promise!(agent, get_iterator(agent, iterable, IteratorHint::Sync), capability);
    let mut result = match which {
        Combinator::Race => perform_race(agent, &record, c, &capability, &resolve),
        _ => perform_all(agent, &record, c, &capability, &resolve, which),
    };
    if result.is_abrupt() && !record.done.get() {
        result = iterator_close(agent, &record, result);
    }
    let result = if_abrupt_reject_promise!(agent, result, capability);
    Completion::Normal(result)
}

// §27.2.4.1.1 GetPromiseResolve
fn get_promise_resolve(agent: &Agent, c: &JsObject) -> Completion {
    let resolve = q!(get(agent, c, &PropertyKey::from("resolve")));
    if !resolve.is_callable() {
        return agent.throw(ErrorKind::Type, Message::NotAFunction(agent.inspect(&resolve)));
    }
    Completion::Normal(resolve)
}

// §27.2.4.1.2 PerformPromiseAll and §27.2.4.2.1 PerformPromiseAllSettled
fn perform_all(
    agent: &Agent,
    record: &IteratorRecord,
    c: &JsObject,
    capability: &PromiseCapability,
    resolve: &JsValue,
    which: Combinator,
) -> Completion {
    let aggregate = Rc::new(Aggregate {
        values: RefCell::new(Vec::new()),
        remaining: Cell::new(1),
        capability: capability.clone(),
    });
    let mut index = 0;
    loop {
        let Some(next) = q!(iterator_step_value(agent, record)) else {
            q!(aggregate.element_done(agent));
            return Completion::Normal(JsValue::Object(capability.promise.clone()));
        };
        aggregate.values.borrow_mut().push(JsValue::Undefined);
        let next_promise = q!(call(agent, resolve, &JsValue::Object(c.clone()), &[next]));
        let already_called = Rc::new(Cell::new(false));
        let (on_fulfilled, on_rejected) = match which {
            Combinator::All => (
                element_function(agent, &aggregate, &already_called, index, None),
                capability.reject.clone(),
            ),
            _ => (
                element_function(agent, &aggregate, &already_called, index, Some(ReactionType::Fulfill)),
                element_function(agent, &aggregate, &already_called, index, Some(ReactionType::Reject)),
            ),
        };
        aggregate.remaining.set(aggregate.remaining.get() + 1);
        q!(invoke(agent, &next_promise, &PropertyKey::from("then"), &[on_fulfilled, on_rejected]));
        index += 1;
    }
}

/// A `Promise.all` resolve element function (`settled` is `None`) or a
/// `Promise.allSettled` resolve/reject element function.
fn element_function(
    agent: &Agent,
    aggregate: &Rc<Aggregate>,
    already_called: &Rc<Cell<bool>>,
    index: usize,
    settled: Option<ReactionType>,
) -> JsValue {
    let aggregate = aggregate.clone();
    let already_called = already_called.clone();
    let f = builtin_function(agent, "", 1, move |agent, _this, args, _new_target| {
        if already_called.replace(true) {
            return Completion::Normal(JsValue::Undefined);
        }
        let x = arg(args, 0);
        let element = match settled {
            None => x,
            Some(kind) => {
                let obj = make_basic_object(agent);
                let (status, key) = match kind {
                    ReactionType::Fulfill => ("fulfilled", "value"),
                    ReactionType::Reject => ("rejected", "reason"),
                };
                x!(create_data_property_or_throw(agent, &obj, PropertyKey::from("status"), JsValue::from_str(status)));
                x!(create_data_property_or_throw(agent, &obj, PropertyKey::from(key), x));
                JsValue::Object(obj)
            }
        };
        aggregate.values.borrow_mut()[index] = element;
        aggregate.element_done(agent)
    });
    JsValue::Object(f)
}

// §27.2.4.5.1 PerformPromiseRace
fn perform_race(
    agent: &Agent,
    record: &IteratorRecord,
    c: &JsObject,
    capability: &PromiseCapability,
    resolve: &JsValue,
) -> Completion {
    loop {
        let Some(next) = q!(iterator_step_value(agent, record)) else {
            return Completion::Normal(JsValue::Object(capability.promise.clone()));
        };
        let next_promise = q!(call(agent, resolve, &JsValue::Object(c.clone()), &[next]));
        q!(invoke(
            agent,
            &next_promise,
            &PropertyKey::from("then"),
            &[capability.resolve.clone(), capability.reject.clone()]
        ));
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::engine::{Agent, Feature, HostDefinedOptions, RejectionOperation};
    use crate::evaluator::test_support::{eval_after_jobs, eval_in, eval_to_string};

    #[test]
    fn reactions_run_as_jobs_in_registration_order() {
        assert_eq!(
            eval_after_jobs(
                "var log = [];
                 var p = Promise.resolve(1);
                 p.then(() => log.push('a'));
                 p.then(() => log.push('b'));
                 log.push('sync');",
                "log.join()"
            ),
            "sync,a,b"
        );
    }

    #[test]
    fn executor_throw_rejects_and_later_calls_are_ignored() {
        assert_eq!(
            eval_after_jobs(
                "var out;
                 new Promise((resolve, reject) => { resolve('first'); reject('second'); throw 'third'; })
                   .then(v => out = v, e => out = 'rejected ' + e);",
                "out"
            ),
            "first"
        );
        assert_eq!(
            eval_after_jobs("var out; new Promise(() => { throw 'bad'; }).catch(e => out = e);", "out"),
            "bad"
        );
    }

    #[test]
    fn thenables_are_adopted_and_cycles_rejected() {
        assert_eq!(
            eval_after_jobs(
                "var out; Promise.resolve({ then(r) { r(42); } }).then(v => out = v);",
                "out"
            ),
            "42"
        );
        assert_eq!(
            eval_after_jobs(
                "var out; var p = new Promise(r => setTimeoutless = r); var q = p.then(() => q); q.catch(e => out = e.constructor.name); setTimeoutless();",
                "out"
            ),
            "TypeError"
        );
    }

    #[test]
    fn promise_resolve_returns_same_promise_for_matching_constructor() {
        assert_eq!(eval_to_string("var p = Promise.resolve(1); Promise.resolve(p) === p"), "true");
        assert_eq!(eval_to_string("typeof Promise.reject(1).then"), "function");
        assert!(eval_to_string("Promise(() => {})").starts_with("Throw: TypeError"));
        assert!(eval_to_string("new Promise(1)").starts_with("Throw: TypeError"));
    }

    #[test]
    fn finally_passes_outcomes_through() {
        assert_eq!(
            eval_after_jobs(
                "var log = [];
                 Promise.resolve(1).finally(() => log.push('f1')).then(v => log.push(v));
                 Promise.reject(2).finally(() => log.push('f2')).catch(e => log.push('e' + e));",
                "log.join()"
            ),
            "f1,f2,1,e2"
        );
    }

    #[test]
    fn all_and_race_combine_in_input_order() {
        assert_eq!(
            eval_after_jobs(
                "var out; Promise.all([Promise.resolve(1), 2, { then(r) { r(3); } }]).then(v => out = v.join());",
                "out"
            ),
            "1,2,3"
        );
        assert_eq!(
            eval_after_jobs("var out; Promise.all([]).then(v => out = Array.isArray(v) && v.length);", "out"),
            "0"
        );
        assert_eq!(
            eval_after_jobs(
                "var out; Promise.all([Promise.resolve(1), Promise.reject('no')]).catch(e => out = e);",
                "out"
            ),
            "no"
        );
        assert_eq!(
            eval_after_jobs(
                "var out; Promise.race([new Promise(() => {}), Promise.resolve('fast')]).then(v => out = v);",
                "out"
            ),
            "fast"
        );
        assert_eq!(
            eval_after_jobs("var out; Promise.all(5).catch(e => out = e instanceof TypeError);", "out"),
            "true"
        );
    }

    #[test]
    fn all_settled_is_feature_gated() {
        assert_eq!(eval_to_string("typeof Promise.allSettled"), "undefined");
        let agent = Agent::new(HostDefinedOptions::default().with_feature(Feature::PromiseAllSettled));
        agent.initialize_host_defined_realm();
        eval_in(
            &agent,
            "var out; Promise.allSettled([Promise.resolve(1), Promise.reject(2)])
               .then(r => out = r.map(x => x.status + ':' + (x.value ?? x.reason)).join());",
        );
        assert_eq!(eval_in(&agent, "out"), "fulfilled:1,rejected:2");
    }

    #[test]
    fn rejection_tracker_sees_reject_then_handle() {
        let seen: Rc<RefCell<Vec<RejectionOperation>>> = Rc::default();
        let log = seen.clone();
        let agent = Agent::new(
            HostDefinedOptions::default().on_promise_rejection(move |_, _, op| log.borrow_mut().push(op)),
        );
        agent.initialize_host_defined_realm();
        eval_in(&agent, "var p = Promise.reject(1); p.catch(() => {});");
        assert_eq!(*seen.borrow(), [RejectionOperation::Reject, RejectionOperation::Handle]);
    }
}
