//! The agent, its realms and execution-context stack, the job queue and the
//! host hooks.

mod agent;
mod context;
mod host;
mod jobs;
mod messages;
mod realm;

pub use agent::{Agent, MAX_CALL_DEPTH};
pub use context::{CallSite, ExecutionContext, ScriptOrModule, ScriptRecord};
pub use host::{
    Feature, HostDefinedOptions, RejectionOperation, host_ensure_can_compile_strings,
    host_has_source_text_available, host_promise_rejection_tracker, host_report_error,
    host_resolve_imported_module,
};
pub use jobs::PendingJob;
pub use messages::{ErrorKind, Message};
pub use realm::{IntrinsicId, Realm, create_realm};

/// An agent with an initialized realm and its top-level context pushed, for
/// unit tests.
#[cfg(test)]
pub fn test_agent() -> Agent {
    let agent = Agent::new(HostDefinedOptions::default());
    agent.initialize_host_defined_realm();
    agent
}
