//! # Declarative
//!
//! Desired-state reconciliation for host resources.
//!
//! This crate provides the contract between declared state and the code that
//! converges a host towards it, without knowing any concrete resource kind.
//!
//! ## Core Concepts
//!
//! - **ResourceDescriptor**: declared target state for one entity, with an
//!   immutable identity and an ordered attribute map
//! - **ChangeSet**: attribute-level deviations; empty means converged
//! - **Handler**: a reconciler speaking either the CRUD or the diff-apply
//!   protocol, unified behind `reconcile(desired)`
//! - **HandlerRegistry**: ordered candidates per kind, selected by
//!   availability probes once per pass
//! - **execute**: reconciles a plan with parallel workers
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{ExecuteOptions, HandlerRegistry, NoReport, Plan, execute};
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register(ResourceKind::File, Handler::crud(FileHandler::new(store)));
//!
//! let selection = registry.resolve(&io);
//! let plan = Plan::from_json(&json)?;
//! let result = execute(&plan, &selection, &io, &ExecuteOptions::default(), &NoReport)?;
//! ```
//!
//! ## Provider Traits
//!
//! - [`HostIo`]: command execution and filesystem primitives
//! - [`OutcomeReporter`]: receives per-resource reports
//!
//! [`MockIo`] implements [`HostIo`] in memory for tests.

pub mod context;
pub mod descriptor;
pub mod diff;
pub mod error;
pub mod executor;
pub mod handler;
pub mod io;
pub mod mock;
pub mod planner;
pub mod registry;
pub mod sync;
pub mod types;

pub use context::{HandlerContext, NoReport, OutcomeReporter, Report};
pub use descriptor::{Attributes, ResourceDescriptor, parse_descriptors};
pub use diff::{Change, ChangeSet};
pub use error::{Error, ErrorCategory, Result, command_line};
pub use executor::{PassResult, execute, reconcile_one};
pub use handler::{CrudHandler, CurrentState, DiffHandler, Handler, managed_attributes};
pub use io::{FileKind, FileStat, HostIo};
pub use mock::MockIo;
pub use planner::Plan;
pub use registry::{HandlerRegistry, Probe, Selection};
pub use sync::KeyedLocks;
pub use types::{
    CommandOutput, Deferred, ExecuteOptions, ExecuteSummary, Outcome, ResourceKind, Value,
    mode_from_digits, mode_to_digits,
};
