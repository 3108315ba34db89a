//! # pkgkit
//!
//! Pure Rust model of the yum/dnf package tools.
//!
//! This crate provides functionality for:
//! - Selecting the package tool present on a host (dnf preferred over yum)
//! - Building command arguments for info, check-update, install, update, remove
//! - Parsing `info` and `check-update` output into structured types
//! - Classifying tool failures from their output
//!
//! It never runs a command itself; callers execute the arguments it builds
//! and hand the output back to the parsers.
//!
//! ## Example
//!
//! ```
//! use pkgkit::{Action, PackageState, PackageTool, parse_info};
//!
//! let tool = PackageTool::detect(|p| p == "/usr/bin/rpm" || p == "/usr/bin/yum").unwrap();
//! assert_eq!(tool.args(Action::Info, "httpd")[5], "info");
//!
//! let info = parse_info("Installed Packages\nName : httpd\nRepo : installed\n");
//! assert_eq!(info.state, PackageState::Installed);
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod parser;
pub mod tool;
pub mod types;

pub use error::{Error, ErrorCategory, Result};
pub use parser::{parse_check_update, parse_info, parse_info_fields};
pub use tool::{Action, PackageTool};
pub use types::{DesiredState, PackageInfo, PackageState, Version};
