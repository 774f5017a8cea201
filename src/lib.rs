//! segrecover - segment recovery orchestration for primary/mirror clusters
//!
//! When a segment instance fails, its replacement has to be prepared before
//! the recovery tool runs, and after a mirror is promoted the coordinator has
//! to confirm that writes are served again. This crate does both.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use segrecover::{deserialize_list, run_setup, SetupContext, SetupOptions};
//!
//! let descriptors = deserialize_list(&confinfo)?;
//! let ctx = Arc::new(SetupContext::new(connector));
//! let report = run_setup(descriptors, SetupOptions::default(), ctx);
//! if let Some(errors) = report.errors_json() {
//!     eprint!("{}", errors);
//! }
//! ```
//!
//! # Architecture
//!
//! - `segrecover-core`: descriptors, results, error records
//! - `segrecover-engine`: strategies, worker pool, reconfigurer, progress parser
//!
//! The database driver is not part of the library; callers provide a
//! [`Connector`].

pub use segrecover_core::*;
pub use segrecover_engine::*;
