//! Graph construction and execution.

mod compile_error;
mod compiled;
mod conditional;
mod interrupt;
mod next;
mod node;
mod state_graph;

pub use compile_error::CompilationError;
pub use compiled::CompiledStateGraph;
pub use conditional::{ConditionalRouter, ConditionalRouterFn, NextEntry};
pub use interrupt::{GraphInterrupt, Interrupt};
pub use next::Next;
pub use node::{FnNode, Node};
pub use state_graph::{StateGraph, END, START};
