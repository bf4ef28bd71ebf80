//! Suspendable activations: generators, async functions and async generators.
//!
//! A [`Coroutine`] owns the boxed future evaluating a function body. `yield`
//! and `await` write a [`Signal`] into the coroutine's slot and return
//! `Pending`; whoever stepped the coroutine reads the signal, and later
//! writes the resumption completion into the same slot and polls again.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll};

use futures::future::LocalBoxFuture;
use futures::task::noop_waker_ref;
use tracing::trace;

use crate::abstract_ops::conversion::to_string;
use crate::abstract_ops::iterator::{
    IteratorHint, IteratorRecord, create_iter_result_object, get_iterator, iterator_close, iterator_complete,
    iterator_value,
};
use crate::abstract_ops::{call, get_method};
use crate::ast::FunctionNode;
use crate::builtins::builtin_function;
use crate::builtins::promise::{PromiseCapability, new_promise_capability, perform_promise_then, promise_resolve};
use crate::completion::Completion;
use crate::engine::{Agent, ErrorKind, ExecutionContext, IntrinsicId, Message};
use crate::evaluator::functions::evaluate_function_body;
use crate::evaluator::{STACK_RED_ZONE, STACK_SEGMENT};
use crate::object::{JsObject, ObjectKind, Property, PropertyKey};
use crate::types::JsValue;

/// Async-frame lines appended to a captured stack.
const MAX_ASYNC_FRAMES: usize = 8;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CoroutineState {
    SuspendedStart,
    SuspendedYield,
    Executing,
    /// Async generators only: a `return` request is awaiting its operand.
    AwaitingReturn,
    Completed,
}

pub enum Signal {
    Yield(JsValue),
    Await(JsValue),
}

enum Slot {
    Empty,
    Signal(Signal),
    Resume(Completion),
}

pub(crate) enum Step {
    Yielded(JsValue),
    Awaiting(JsValue),
    Done(Completion),
}

pub struct AsyncGeneratorRequest {
    completion: Completion,
    capability: PromiseCapability,
}

pub enum CoroutineKind {
    Generator,
    AsyncFunction {
        capability: PromiseCapability,
    },
    AsyncGenerator {
        queue: RefCell<VecDeque<AsyncGeneratorRequest>>,
    },
}

impl CoroutineKind {
    pub fn async_generator() -> Self {
        CoroutineKind::AsyncGenerator {
            queue: RefCell::new(VecDeque::new()),
        }
    }
}

pub struct Coroutine {
    context: ExecutionContext,
    kind: CoroutineKind,
    state: Cell<CoroutineState>,
    slot: RefCell<Slot>,
    body: RefCell<Option<LocalBoxFuture<'static, Completion>>>,
    /// Set once a promise reaction has resumed the body after an `await`.
    resumed: Cell<bool>,
}

/// [[GeneratorState]] and friends of a generator object.
pub struct GeneratorData {
    pub coroutine: Rc<Coroutine>,
}

pub struct AsyncGeneratorData {
    pub coroutine: Rc<Coroutine>,
}

impl Coroutine {
    /// Captures the running context, which must be the function's callee
    /// context, and the body to evaluate in it.
    pub fn new(agent: &Agent, kind: CoroutineKind, node: Rc<FunctionNode>) -> Rc<Self> {
        let context = agent.running_execution_context();
        let body_agent = agent.clone();
        let body: LocalBoxFuture<'static, Completion> = Box::pin(async move {
            let agent = body_agent;
            let node = node;
            evaluate_function_body(&agent, &node).await
        });
        let co = Rc::new(Coroutine {
            context: context.clone(),
            kind,
            state: Cell::new(CoroutineState::SuspendedStart),
            slot: RefCell::new(Slot::Empty),
            body: RefCell::new(Some(body)),
            resumed: Cell::new(false),
        });
        context.set_coroutine(&co);
        co
    }

    pub fn state(&self) -> CoroutineState {
        self.state.get()
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn has_resumed(&self) -> bool {
        self.resumed.get()
    }

    fn finish(&self) {
        self.state.set(CoroutineState::Completed);
        self.body.borrow_mut().take();
    }

    /// Polls the body once, with `resume` as the value of the pending
    /// `yield`/`await`.
    pub(crate) fn step(&self, agent: &Agent, resume: Option<Completion>) -> Step {
        if let Some(completion) = resume {
            *self.slot.borrow_mut() = Slot::Resume(completion);
        }
        let Some(mut body) = self.body.borrow_mut().take() else {
            unreachable!("stepping a coroutine that has no body");
        };
        self.state.set(CoroutineState::Executing);
        let pushed = !agent.running_execution_context().ptr_eq(&self.context);
        if pushed {
            agent.push_context(self.context.clone());
        }
        trace!(context = ?self.context, "coroutine resumed");
        let mut cx = Context::from_waker(noop_waker_ref());
        let poll = stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || body.as_mut().poll(&mut cx));
        if pushed {
            agent.pop_context(Some(&self.context));
        }
        match poll {
            Poll::Ready(completion) => {
                self.state.set(CoroutineState::Completed);
                Step::Done(completion)
            }
            Poll::Pending => {
                *self.body.borrow_mut() = Some(body);
                match std::mem::replace(&mut *self.slot.borrow_mut(), Slot::Empty) {
                    Slot::Signal(Signal::Yield(value)) => {
                        self.state.set(CoroutineState::SuspendedYield);
                        Step::Yielded(value)
                    }
                    Slot::Signal(Signal::Await(value)) => Step::Awaiting(value),
                    _ => unreachable!("coroutine suspended without a signal"),
                }
            }
        }
    }

    fn enqueue(&self, completion: Completion, capability: PromiseCapability) {
        if let CoroutineKind::AsyncGenerator { queue } = &self.kind {
            queue.borrow_mut().push_back(AsyncGeneratorRequest { completion, capability });
        }
    }

    fn queue_front(&self) -> Option<Completion> {
        match &self.kind {
            CoroutineKind::AsyncGenerator { queue } => queue.borrow().front().map(|r| r.completion.clone()),
            _ => None,
        }
    }

    fn dequeue(&self) -> Option<AsyncGeneratorRequest> {
        match &self.kind {
            CoroutineKind::AsyncGenerator { queue } => queue.borrow_mut().pop_front(),
            _ => None,
        }
    }
}

/// The pending `yield`/`await`. Holds the coroutine weakly: the coroutine
/// owns the future this lives in.
struct Suspend {
    coroutine: Weak<Coroutine>,
    signal: Option<Signal>,
}

impl Future for Suspend {
    type Output = Completion;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Completion> {
        let Some(co) = self.coroutine.upgrade() else {
            unreachable!("suspension point outlived its coroutine");
        };
        if let Some(signal) = self.signal.take() {
            *co.slot.borrow_mut() = Slot::Signal(signal);
            return Poll::Pending;
        }
        let mut slot = co.slot.borrow_mut();
        match std::mem::replace(&mut *slot, Slot::Empty) {
            Slot::Resume(completion) => Poll::Ready(completion),
            other => {
                *slot = other;
                Poll::Pending
            }
        }
    }
}

fn running_coroutine(agent: &Agent) -> Rc<Coroutine> {
    match agent.running_execution_context().coroutine() {
        Some(co) => co,
        None => unreachable!("yield or await outside of a coroutine"),
    }
}

fn suspend(co: &Rc<Coroutine>, signal: Signal) -> Suspend {
    Suspend {
        coroutine: Rc::downgrade(co),
        signal: Some(signal),
    }
}

// §27.7.5.3 Await
pub async fn await_value(agent: &Agent, value: JsValue) -> Completion {
    let pending = suspend(&running_coroutine(agent), Signal::Await(value));
    pending.await
}

fn is_async_generator(agent: &Agent) -> bool {
    matches!(running_coroutine(agent).kind, CoroutineKind::AsyncGenerator { .. })
}

/// Whether the running code is the body of an async generator.
pub(crate) fn in_async_generator(agent: &Agent) -> bool {
    agent
        .running_execution_context()
        .coroutine()
        .is_some_and(|co| matches!(co.kind, CoroutineKind::AsyncGenerator { .. }))
}

// §15.5.5 YieldExpression evaluation
pub async fn yield_value(agent: &Agent, value: JsValue) -> Completion {
    if is_async_generator(agent) {
        let value = q!(await_value(agent, value).await);
        return async_generator_yield(agent, value).await;
    }
    let result = create_iter_result_object(agent, value, false);
    let pending = suspend(&running_coroutine(agent), Signal::Yield(result));
    pending.await
}

// §27.6.3.8 AsyncGeneratorYield
async fn async_generator_yield(agent: &Agent, value: JsValue) -> Completion {
    let pending = {
        let co = running_coroutine(agent);
        async_generator_complete_step(agent, &co, Completion::Normal(value), false);
        match co.queue_front() {
            Some(resumption) => Ok(resumption),
            None => Err(suspend(&co, Signal::Yield(JsValue::Undefined))),
        }
    };
    let resumption = match pending {
        Ok(resumption) => resumption,
        Err(suspension) => suspension.await,
    };
    // §27.6.3.7 AsyncGeneratorUnwrapYieldResumption
    match resumption {
        Completion::Return(value) => match await_value(agent, value).await {
            Completion::Normal(awaited) => Completion::Return(awaited),
            other => other,
        },
        other => other,
    }
}

fn inner_result_object(agent: &Agent, value: JsValue) -> Completion<JsObject> {
    match value {
        JsValue::Object(o) => Completion::Normal(o),
        other => agent.throw(ErrorKind::Type, Message::NotAnObject(agent.inspect(&other))),
    }
}

// §15.5.5 `yield* expr`
pub async fn yield_delegate(agent: &Agent, value: JsValue) -> Completion {
    let is_async = is_async_generator(agent);
    let hint = if is_async { IteratorHint::Async } else { IteratorHint::Sync };
    let record = q!(get_iterator(agent, &value, hint));
    let iterator = JsValue::Object(record.iterator.clone());
    let mut received = Completion::Normal(JsValue::Undefined);
    loop {
        let inner = match received {
            Completion::Normal(v) => q!(call(agent, &record.next_method, &iterator, &[v])),
            Completion::Throw(e) => match q!(get_method(agent, &iterator, &PropertyKey::from("throw"))) {
                Some(throw) => q!(call(agent, &JsValue::Object(throw), &iterator, &[e])),
                None => {
                    if is_async {
                        q!(async_iterator_close(agent, &record, Completion::Normal(JsValue::Undefined)).await);
                    } else {
                        q!(iterator_close(agent, &record, Completion::Normal(JsValue::Undefined)));
                    }
                    return agent.throw(
                        ErrorKind::Type,
                        Message::Syntax("The iterator does not provide a 'throw' method".to_owned()),
                    );
                }
            },
            Completion::Return(v) => match q!(get_method(agent, &iterator, &PropertyKey::from("return"))) {
                Some(ret) => {
                    let mut inner = q!(call(agent, &JsValue::Object(ret), &iterator, &[v]));
                    if is_async {
                        inner = q!(await_value(agent, inner).await);
                    }
                    let inner = q!(inner_result_object(agent, inner));
                    if q!(iterator_complete(agent, &inner)) {
                        return Completion::Return(q!(iterator_value(agent, &inner)));
                    }
                    received = if is_async {
                        async_generator_yield(agent, q!(iterator_value(agent, &inner))).await
                    } else {
                        suspend(&running_coroutine(agent), Signal::Yield(JsValue::Object(inner))).await
                    };
                    continue;
                }
                None => {
                    let v = if is_async { q!(await_value(agent, v).await) } else { v };
                    return Completion::Return(v);
                }
            },
            _ => unreachable!("generator resumed with a break or continue"),
        };
        let inner = if is_async { q!(await_value(agent, inner).await) } else { inner };
        let inner = q!(inner_result_object(agent, inner));
        if q!(iterator_complete(agent, &inner)) {
            return iterator_value(agent, &inner);
        }
        received = if is_async {
            async_generator_yield(agent, q!(iterator_value(agent, &inner))).await
        } else {
            suspend(&running_coroutine(agent), Signal::Yield(JsValue::Object(inner))).await
        };
    }
}

// §7.4.12 AsyncIteratorClose
pub async fn async_iterator_close<T>(agent: &Agent, record: &IteratorRecord, completion: Completion<T>) -> Completion<T> {
    let iterator = JsValue::Object(record.iterator.clone());
    let inner = match get_method(agent, &iterator, &PropertyKey::from("return")) {
        Completion::Normal(None) => return completion,
        Completion::Normal(Some(ret)) => match call(agent, &JsValue::Object(ret), &iterator, &[]) {
            Completion::Normal(v) => await_value(agent, v).await,
            other => other,
        },
        other => other.into_abrupt(),
    };
    if completion.is_throw() {
        return completion;
    }
    match inner {
        Completion::Normal(JsValue::Object(_)) => completion,
        Completion::Normal(other) => agent.throw(ErrorKind::Type, Message::NotAnObject(agent.inspect(&other))),
        other => other.into_abrupt(),
    }
}

// §27.5.3.2 GeneratorValidate
fn generator_validate(agent: &Agent, generator: &JsValue) -> Completion<Rc<Coroutine>> {
    let co = match generator {
        JsValue::Object(o) => match &o.borrow().kind {
            ObjectKind::Generator(g) => Some(g.coroutine.clone()),
            _ => None,
        },
        _ => None,
    };
    let Some(co) = co else {
        return agent.throw(
            ErrorKind::Type,
            Message::NotATypeObject(agent.inspect(generator), "Generator"),
        );
    };
    if co.state() == CoroutineState::Executing {
        return agent.throw(ErrorKind::Type, Message::GeneratorRunning);
    }
    Completion::Normal(co)
}

// §27.5.3.3 GeneratorResume and §27.5.3.4 GeneratorResumeAbrupt
pub fn generator_resume(agent: &Agent, generator: &JsValue, completion: Completion) -> Completion {
    let co = q!(generator_validate(agent, generator));
    if co.state() == CoroutineState::SuspendedStart && completion.is_abrupt() {
        co.finish();
    }
    if co.state() == CoroutineState::Completed {
        return match completion {
            Completion::Normal(_) => Completion::Normal(create_iter_result_object(agent, JsValue::Undefined, true)),
            Completion::Return(v) => Completion::Normal(create_iter_result_object(agent, v, true)),
            other => other,
        };
    }
    let resume = match co.state() {
        CoroutineState::SuspendedStart => None,
        _ => Some(completion),
    };
    match co.step(agent, resume) {
        Step::Yielded(result) => Completion::Normal(result),
        Step::Done(done) => {
            co.finish();
            match done {
                Completion::Normal(_) => Completion::Normal(create_iter_result_object(agent, JsValue::Undefined, true)),
                Completion::Return(v) => Completion::Normal(create_iter_result_object(agent, v, true)),
                other => other,
            }
        }
        Step::Awaiting(_) => unreachable!("await in a synchronous generator"),
    }
}

/// Steps an async coroutine until it yields or completes, wiring each `await`
/// it reaches to promise reactions. `None` means it is now awaiting.
fn drive(agent: &Agent, co: &Rc<Coroutine>, mut resume: Option<Completion>) -> Option<Step> {
    loop {
        match co.step(agent, resume.take()) {
            Step::Awaiting(value) => match schedule_await(agent, co, value) {
                Completion::Throw(e) => resume = Some(Completion::Throw(e)),
                _ => return None,
            },
            other => return Some(other),
        }
    }
}

fn schedule_await(agent: &Agent, co: &Rc<Coroutine>, value: JsValue) -> Completion<()> {
    let promise = q!(promise_resolve(agent, &agent.intrinsic(IntrinsicId::Promise), value));
    let on_fulfilled = await_reaction(agent, co, false);
    let on_rejected = await_reaction(agent, co, true);
    perform_promise_then(
        agent,
        &promise,
        JsValue::Object(on_fulfilled),
        JsValue::Object(on_rejected),
        None,
    );
    Completion::Normal(())
}

fn await_reaction(agent: &Agent, co: &Rc<Coroutine>, rejected: bool) -> JsObject {
    let target = co.clone();
    let f = builtin_function(agent, "", 1, move |agent, _this, args, _new_target| {
        let value = args.first().cloned().unwrap_or(JsValue::Undefined);
        let completion = if rejected {
            Completion::Throw(value)
        } else {
            Completion::Normal(value)
        };
        resume_async(agent, &target, completion);
        Completion::Normal(JsValue::Undefined)
    });
    if let ObjectKind::Builtin(b) = &mut f.borrow_mut().kind {
        b.awaiting = Some(Rc::downgrade(co));
    }
    f
}

fn resume_async(agent: &Agent, co: &Rc<Coroutine>, completion: Completion) {
    co.resumed.set(true);
    match &co.kind {
        CoroutineKind::AsyncFunction { capability } => {
            if let Some(Step::Done(result)) = drive(agent, co, Some(completion)) {
                co.finish();
                settle_async_function(agent, capability, result);
            }
        }
        CoroutineKind::AsyncGenerator { .. } => run_async_generator(agent, co, Some(completion)),
        CoroutineKind::Generator => unreachable!("await in a synchronous generator"),
    }
}

fn settle_async_function(agent: &Agent, capability: &PromiseCapability, result: Completion) {
    let (f, value) = match result {
        Completion::Normal(v) | Completion::Return(v) => (&capability.resolve, v),
        Completion::Throw(e) => (&capability.reject, e),
        _ => unreachable!("async function body completed with a break or continue"),
    };
    x!(call(agent, f, &JsValue::Undefined, &[value]));
}

// §27.7.5.1 AsyncFunctionStart
pub fn async_function_start(agent: &Agent, capability: PromiseCapability, node: Rc<FunctionNode>) {
    let co = Coroutine::new(
        agent,
        CoroutineKind::AsyncFunction {
            capability: capability.clone(),
        },
        node,
    );
    if let Some(Step::Done(result)) = drive(agent, &co, None) {
        co.finish();
        settle_async_function(agent, &capability, result);
    }
}

fn run_async_generator(agent: &Agent, co: &Rc<Coroutine>, resume: Option<Completion>) {
    if let Some(Step::Done(result)) = drive(agent, co, resume) {
        co.finish();
        let result = match result {
            Completion::Normal(_) => Completion::Normal(JsValue::Undefined),
            Completion::Return(v) => Completion::Normal(v),
            other => other,
        };
        async_generator_complete_step(agent, co, result, true);
        async_generator_drain_queue(agent, co);
    }
}

// §27.6.3.4 AsyncGeneratorCompleteStep
fn async_generator_complete_step(agent: &Agent, co: &Coroutine, completion: Completion, done: bool) {
    let Some(next) = co.dequeue() else {
        return;
    };
    let (f, value) = match completion {
        Completion::Throw(e) => (next.capability.reject, e),
        Completion::Normal(v) => (next.capability.resolve, create_iter_result_object(agent, v, done)),
        _ => unreachable!("async generator step completed with a non-value completion"),
    };
    x!(call(agent, &f, &JsValue::Undefined, &[value]));
}

// §27.6.3.9 AsyncGeneratorAwaitReturn
fn async_generator_await_return(agent: &Agent, co: &Rc<Coroutine>) {
    let Some(Completion::Return(value)) = co.queue_front() else {
        unreachable!("awaiting return without a return request");
    };
    let promise = match promise_resolve(agent, &agent.intrinsic(IntrinsicId::Promise), value) {
        Completion::Normal(p) => p,
        other => {
            co.state.set(CoroutineState::Completed);
            async_generator_complete_step(agent, co, other.into_abrupt(), true);
            async_generator_drain_queue(agent, co);
            return;
        }
    };
    let settle = |rejected: bool| {
        let target = co.clone();
        builtin_function(agent, "", 1, move |agent, _this, args, _new_target| {
            let value = args.first().cloned().unwrap_or(JsValue::Undefined);
            target.state.set(CoroutineState::Completed);
            let completion = if rejected {
                Completion::Throw(value)
            } else {
                Completion::Normal(value)
            };
            async_generator_complete_step(agent, &target, completion, true);
            async_generator_drain_queue(agent, &target);
            Completion::Normal(JsValue::Undefined)
        })
    };
    let on_fulfilled = settle(false);
    let on_rejected = settle(true);
    perform_promise_then(
        agent,
        &promise,
        JsValue::Object(on_fulfilled),
        JsValue::Object(on_rejected),
        None,
    );
}

// §27.6.3.10 AsyncGeneratorDrainQueue
fn async_generator_drain_queue(agent: &Agent, co: &Rc<Coroutine>) {
    while let Some(completion) = co.queue_front() {
        match completion {
            Completion::Return(_) => {
                co.state.set(CoroutineState::AwaitingReturn);
                async_generator_await_return(agent, co);
                return;
            }
            Completion::Normal(_) => {
                async_generator_complete_step(agent, co, Completion::Normal(JsValue::Undefined), true)
            }
            other => async_generator_complete_step(agent, co, other, true),
        }
    }
}

/// AsyncGenerator.prototype.next / return / throw: validates, enqueues the
/// request and resumes the generator when it is suspended. Returns the
/// request's promise.
pub fn async_generator_enqueue(agent: &Agent, generator: &JsValue, completion: Completion) -> Completion {
    let capability = x!(new_promise_capability(
        agent,
        &JsValue::Object(agent.intrinsic(IntrinsicId::Promise))
    ));
    let promise = JsValue::Object(capability.promise.clone());
    let co = match generator {
        JsValue::Object(o) => match &o.borrow().kind {
            ObjectKind::AsyncGenerator(g) => Some(g.coroutine.clone()),
            _ => None,
        },
        _ => None,
    };
    let Some(co) = co else {
        let error = agent.new_error(
            ErrorKind::Type,
            Message::NotATypeObject(agent.inspect(generator), "AsyncGenerator"),
        );
        x!(call(agent, &capability.reject, &JsValue::Undefined, &[JsValue::Object(error)]));
        return Completion::Normal(promise);
    };

    let state = co.state();
    match completion {
        Completion::Normal(_) => {
            if state == CoroutineState::Completed {
                let result = create_iter_result_object(agent, JsValue::Undefined, true);
                x!(call(agent, &capability.resolve, &JsValue::Undefined, &[result]));
                return Completion::Normal(promise);
            }
            co.enqueue(completion.clone(), capability);
            match state {
                CoroutineState::SuspendedStart => run_async_generator(agent, &co, None),
                CoroutineState::SuspendedYield => run_async_generator(agent, &co, Some(completion)),
                _ => {}
            }
        }
        Completion::Return(_) => {
            co.enqueue(completion.clone(), capability);
            match state {
                CoroutineState::SuspendedStart | CoroutineState::Completed => {
                    co.finish();
                    co.state.set(CoroutineState::AwaitingReturn);
                    async_generator_await_return(agent, &co);
                }
                CoroutineState::SuspendedYield => run_async_generator(agent, &co, Some(completion)),
                _ => {}
            }
        }
        Completion::Throw(e) => {
            let mut state = state;
            if state == CoroutineState::SuspendedStart {
                co.finish();
                state = CoroutineState::Completed;
            }
            if state == CoroutineState::Completed {
                x!(call(agent, &capability.reject, &JsValue::Undefined, &[e]));
                return Completion::Normal(promise);
            }
            co.enqueue(Completion::Throw(e.clone()), capability);
            if state == CoroutineState::SuspendedYield {
                run_async_generator(agent, &co, Some(Completion::Throw(e)));
            }
        }
        _ => unreachable!("async generator request with a break or continue"),
    }
    Completion::Normal(promise)
}

/// The suspended async function a promise reaction would resume, if any.
fn awaiting_coroutine(handler: &JsObject) -> Option<Rc<Coroutine>> {
    match &handler.borrow().kind {
        ObjectKind::Builtin(b) => b.awaiting.as_ref().and_then(Weak::upgrade),
        _ => None,
    }
}

/// Follows the fulfill reactions of an async function's result promise to the
/// async functions awaiting it, describing each.
fn async_frames(mut promise: JsObject, lines: &mut Vec<String>) {
    for _ in 0..MAX_ASYNC_FRAMES {
        let reaction = match &promise.borrow().kind {
            ObjectKind::Promise(p) if p.fulfill_reactions.len() == 1 => p.fulfill_reactions[0].clone(),
            _ => return,
        };
        match reaction.handler.as_ref().and_then(awaiting_coroutine) {
            Some(co) => {
                lines.push(co.context.describe_awaiting());
                match &co.kind {
                    CoroutineKind::AsyncFunction { capability } => promise = capability.promise.clone(),
                    _ => return,
                }
            }
            None => match reaction.capability {
                Some(capability) => promise = capability.promise,
                None => return,
            },
        }
    }
}

/// Installs the `stack` property on a freshly constructed error. The running
/// context is the error constructor's own frame and is not reported.
pub fn capture_stack(agent: &Agent, error: &JsObject) {
    let stack = agent.stack_snapshot();
    let frames = &stack[..stack.len().saturating_sub(1)];
    let mut lines = Vec::new();
    let mut outermost = None;
    let mut reached_top = false;
    for (i, ctx) in frames.iter().enumerate().rev() {
        let method_name = match i {
            0 => None,
            _ => frames[i - 1].call_site().method_name.clone(),
        };
        if ctx.call_site().is_toplevel {
            lines.push(ctx.describe(method_name.as_deref()));
            reached_top = true;
            break;
        }
        // reaction functions resuming an await are not user frames
        if ctx.function().and_then(awaiting_coroutine).is_some() {
            continue;
        }
        lines.push(ctx.describe(method_name.as_deref()));
        outermost = Some(ctx);
    }
    let origin = outermost.and_then(ExecutionContext::coroutine);
    if let Some(co) = origin
        && co.has_resumed()
        && let CoroutineKind::AsyncFunction { capability } = &co.kind
    {
        if reached_top {
            lines.pop();
        }
        async_frames(capability.promise.clone(), &mut lines);
    }

    let head = match to_string(agent, &JsValue::Object(error.clone())) {
        Completion::Normal(s) => s.to_rust_string(),
        _ => "Error".to_owned(),
    };
    let mut text = head;
    for line in lines {
        text.push_str("\n  at ");
        text.push_str(&line);
    }
    error.insert_property(
        "stack",
        Property::data(JsValue::from_str(&text), true, false, false),
    );
}

#[cfg(test)]
mod tests {
    use crate::evaluator::test_support::{eval_after_jobs, eval_to_string};

    #[test]
    fn generators_yield_and_complete() {
        assert_eq!(
            eval_to_string(
                "function* g() { var x = yield 1; yield x * 2; return 'end'; }
                 var it = g(); var out = [];
                 out.push(it.next('ignored').value);
                 out.push(it.next(21).value);
                 var last = it.next();
                 out.push(last.value, last.done, it.next().done);
                 out.join()"
            ),
            "1,42,end,true,true"
        );
    }

    #[test]
    fn generator_return_runs_finally_blocks() {
        assert_eq!(
            eval_to_string(
                "var log = [];
                 function* g() { try { yield 1; yield 2; } finally { log.push('cleanup'); } }
                 var it = g(); it.next();
                 var r = it.return(7);
                 log.push(r.value, r.done); log.join()"
            ),
            "cleanup,7,true"
        );
    }

    #[test]
    fn throw_into_a_fresh_generator_completes_it() {
        assert_eq!(
            eval_to_string(
                "function* g() { yield 1; }
                 var it = g();
                 try { it.throw(new Error('boom')); } catch (e) { e.message + ',' + it.next().done }"
            ),
            "boom,true"
        );
    }

    #[test]
    fn reentering_a_running_generator_throws() {
        assert_eq!(
            eval_to_string(
                "var it; function* g() { try { it.next(); } catch (e) { yield e instanceof TypeError; } }
                 it = g(); it.next().value"
            ),
            "true"
        );
    }

    #[test]
    fn yield_star_delegates_including_return_values() {
        assert_eq!(
            eval_to_string(
                "function* inner() { yield 'a'; yield 'b'; return 'r'; }
                 function* outer() { var r = yield* inner(); yield r; }
                 [...outer()].join()"
            ),
            "a,b,r"
        );
    }

    #[test]
    fn async_functions_resume_from_promise_jobs() {
        assert_eq!(
            eval_after_jobs(
                "var log = [];
                 async function f() { log.push('start'); var v = await 1; log.push('resumed ' + v); return v + 1; }
                 f().then(v => log.push('result ' + v));
                 log.push('sync');",
                "log.join()"
            ),
            "start,sync,resumed 1,result 2"
        );
    }

    #[test]
    fn await_of_a_rejection_throws_into_the_body() {
        assert_eq!(
            eval_after_jobs(
                "var out;
                 async function f() { try { await Promise.reject(new Error('no')); } catch (e) { out = e.message; } }
                 f();",
                "out"
            ),
            "no"
        );
    }

    #[test]
    fn async_generator_requests_settle_in_order() {
        assert_eq!(
            eval_after_jobs(
                "var log = [];
                 async function* g() { yield 1; yield await Promise.resolve(2); }
                 var it = g();
                 it.next().then(r => log.push(r.value));
                 it.next().then(r => log.push(r.value));
                 it.next().then(r => log.push(r.done));
                 it.return(9).then(r => log.push(r.value));",
                "log.join()"
            ),
            "1,2,true,9"
        );
    }

    #[test]
    fn for_await_over_an_async_generator() {
        assert_eq!(
            eval_after_jobs(
                "var sum = 0;
                 async function* g() { yield 1; yield 2; yield 3; }
                 (async () => { for await (const v of g()) sum += v; })();",
                "sum"
            ),
            "6"
        );
    }

    #[test]
    fn error_stacks_name_the_frames() {
        let stack = eval_to_string(
            "function inner() { return new Error('x').stack; }
             function outer() { return inner(); }
             outer()",
        );
        let lines: Vec<&str> = stack.lines().collect();
        assert_eq!(lines[0], "Error: x");
        assert!(lines[1].trim_start().starts_with("at inner"));
        assert!(lines[2].trim_start().starts_with("at outer"));
    }

    #[test]
    fn async_stacks_follow_awaiting_callers() {
        let stack = eval_after_jobs(
            "var stack;
             async function leaf() { await null; stack = new Error('deep').stack; }
             async function caller() { await leaf(); }
             caller();",
            "stack",
        );
        assert!(stack.contains("at async leaf"));
        assert!(stack.contains("at async caller"));
    }

    #[test]
    fn async_functions_run_synchronously_until_their_first_await() {
        let stack = eval_after_jobs(
            "var stack;\nasync function early() { stack = new Error('sync').stack; await null; }\nearly();",
            "stack",
        );
        let lines: Vec<&str> = stack.lines().collect();
        assert_eq!(lines[1].trim_start(), "at early (<anonymous>:2:34)");
        assert!(lines[2].trim_start().starts_with("at <anonymous>:3:1"));
        assert!(!stack.contains("async"));
    }
}
