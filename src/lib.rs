//! ecmarun: an ECMAScript interpreter core.
//!
//! Source text is parsed into the tree in [`ast`], then executed by the
//! [`evaluator`] on top of the agent, realm and execution-context machinery in
//! [`engine`]. Every operation returns a [`completion::Completion`].

#[macro_use]
pub mod completion;

pub mod abstract_ops;
pub mod ast;
pub mod builtins;
pub mod engine;
pub mod environment;
pub mod evaluator;
pub mod lexer;
pub mod modules;
pub mod object;
pub mod parser;
pub mod types;

pub use completion::Completion;
pub use engine::{Agent, ExecutionContext, Feature, HostDefinedOptions, Realm};
pub use object::JsObject;
pub use types::{JsString, JsSymbol, JsValue};
