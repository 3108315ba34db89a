//! # initkit
//!
//! Rust model of the two init systems a service can live under.
//!
//! This crate provides:
//! - Availability detection for systemd (`systemctl`) and SysV (`service` + `chkconfig`)
//! - Argument building for status queries and start/stop/enable/disable/reload
//! - Output markers: unknown services, boot enablement, failure prefixes
//!
//! Detection takes an existence predicate instead of touching the
//! filesystem, so callers can probe through any IO layer.
//!
//! ## Example
//!
//! ```
//! use initkit::{Action, Systemctl, Sysv};
//!
//! let present = ["/usr/bin/systemctl", "/sbin/chkconfig", "/sbin/service"];
//! let exists = |p: &str| present.contains(&p);
//!
//! // systemd wins when both are installed
//! assert!(Systemctl::detect(exists).is_some());
//! assert!(Sysv::detect(exists).is_none());
//!
//! let unit = Systemctl::unit("nginx");
//! assert_eq!(Systemctl::action_args(Action::Start, &unit), ["start", "nginx.service"]);
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod systemd;
pub mod sysv;
mod types;

pub use error::{Error, Result};
pub use systemd::Systemctl;
pub use sysv::Sysv;
pub use types::{Action, ServiceState, ServiceStatus, is_failure};
