// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node graph execution engine for `EventGraph`.
//!
//! Graphs are built from typed nodes whose sockets are joined by links.
//! Two traversals drive a run:
//! - Execution links push control flow from one impure node to the next
//! - Value links are pulled lazily, and only when a node reads an input
//!
//! ## Architecture
//!
//! The engine is built on:
//! - Node type descriptors collected in a [`NodeRegistry`]
//! - Per-run instance scratch in a [`VariableStore`]
//! - A [`Host`] trait standing in for the surrounding application
//! - A [`Scheduler`] for continuations deferred to a later tick
//!
//! The [`ops`] module holds the standard operation catalogue.

pub mod value;
pub mod socket;
pub mod link;
pub mod node;
pub mod graph;
pub mod store;
pub mod instance;
pub mod config;
pub mod host;
pub mod workspace;
pub mod scheduler;
pub mod evaluation;
pub mod trigger;
pub mod ops;

pub use config::{EngineConfig, ExecFanout};
pub use evaluation::{Engine, EvaluationContext, NodeError, RunSummary};
pub use graph::{Graph, GraphError};
pub use host::{Host, MemoryHost};
pub use link::{Link, LinkId};
pub use node::{Node, NodeCategory, NodeId, NodeRegistry, NodeType};
pub use scheduler::Scheduler;
pub use socket::{Socket, SocketId, SocketType};
pub use store::VariableStore;
pub use trigger::{ExecuteMain, Report};
pub use value::Value;
pub use workspace::Workspace;
