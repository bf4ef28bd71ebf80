//! §9.5 Jobs and host operations to enqueue them, plus the host's job loop.

use tracing::{debug, trace};

use crate::completion::Completion;
use crate::engine::{Agent, ExecutionContext, Realm, ScriptOrModule, host_report_error};

pub type Job = Box<dyn FnOnce(&Agent) -> Completion>;

/// A queued job with the realm and script-or-module of the context that
/// enqueued it.
pub struct PendingJob {
    job: Job,
    realm: Realm,
    script_or_module: Option<ScriptOrModule>,
}

impl Agent {
    /// EnqueueJob: captures the running context's realm and script-or-module
    /// now, so the job later runs as if called from there.
    pub fn enqueue_job(&self, queue: &'static str, job: impl FnOnce(&Agent) -> Completion + 'static) {
        let caller = self.running_execution_context();
        let pending = PendingJob {
            job: Box::new(job),
            realm: caller.realm().clone(),
            script_or_module: caller.script_or_module().cloned(),
        };
        let mut jobs = self.record().jobs.borrow_mut();
        jobs.push_back(pending);
        trace!(queue, pending = jobs.len(), "job enqueued");
    }

    pub fn has_pending_jobs(&self) -> bool {
        !self.record().jobs.borrow().is_empty()
    }

    /// Drains the queue in FIFO order. Each job runs to completion on a fresh
    /// top-level context; an abrupt result is handed to the host's error
    /// reporter and the loop continues.
    pub fn run_jobs(&self) {
        let mut ran = 0usize;
        loop {
            let next = self.record().jobs.borrow_mut().pop_front();
            let Some(pending) = next else {
                break;
            };
            let ctx = ExecutionContext::toplevel(pending.realm, pending.script_or_module);
            self.push_context(ctx.clone());
            let result = (pending.job)(self);
            self.pop_context(Some(&ctx));
            ran += 1;
            match result {
                Completion::Throw(error) => host_report_error(self, &error),
                Completion::Normal(_) => {}
                other => debug!(kind = other.kind(), "job completed abruptly"),
            }
        }
        debug!(ran, "job queue drained");
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::engine::{ErrorKind, HostDefinedOptions, Message};
    use crate::types::JsValue;

    use super::*;

    #[test]
    fn jobs_run_in_fifo_order_including_jobs_enqueued_while_running() {
        let agent = crate::engine::test_agent();
        let log: Rc<RefCell<Vec<&'static str>>> = Rc::default();

        let l = log.clone();
        agent.enqueue_job("PromiseJobs", move |agent| {
            l.borrow_mut().push("J1");
            let l2 = l.clone();
            agent.enqueue_job("PromiseJobs", move |_| {
                l2.borrow_mut().push("J3");
                Completion::Normal(JsValue::Undefined)
            });
            let l4 = l.clone();
            agent.enqueue_job("PromiseJobs", move |_| {
                l4.borrow_mut().push("J4");
                Completion::Normal(JsValue::Undefined)
            });
            Completion::Normal(JsValue::Undefined)
        });
        let l = log.clone();
        agent.enqueue_job("PromiseJobs", move |_| {
            l.borrow_mut().push("J2");
            Completion::Normal(JsValue::Undefined)
        });

        agent.run_jobs();
        assert_eq!(*log.borrow(), ["J1", "J2", "J3", "J4"]);
    }

    #[test]
    fn abrupt_jobs_are_reported_and_the_queue_continues() {
        let reported: Rc<RefCell<usize>> = Rc::default();
        let r = reported.clone();
        let agent = Agent::new(HostDefinedOptions::default().on_report_error(move |_, _| {
            *r.borrow_mut() += 1;
        }));
        agent.initialize_host_defined_realm();
        let ran_after = Rc::new(RefCell::new(false));
        agent.enqueue_job("ScriptJobs", |agent| {
            agent.throw(ErrorKind::Type, Message::NotAFunction("x".into()))
        });
        let flag = ran_after.clone();
        agent.enqueue_job("ScriptJobs", move |_| {
            *flag.borrow_mut() = true;
            Completion::Normal(JsValue::Undefined)
        });
        let depth = agent.stack_depth();
        agent.run_jobs();
        assert_eq!(*reported.borrow(), 1);
        assert!(*ran_after.borrow());
        assert_eq!(agent.stack_depth(), depth);
    }
}
