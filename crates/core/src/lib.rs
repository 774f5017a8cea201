//! Core types for segment recovery
//!
//! This crate defines the value types shared by every recovery component:
//! - RecoveryDescriptor: identity and endpoints of one failed segment
//! - RecoveryKind: full / incremental / differential
//! - CommandResult: outcome of one unit of work
//! - ErrorRecord: structured, machine-parseable failure description
//! - Error: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod descriptor;
pub mod error;
pub mod result;

pub use descriptor::{deserialize_list, serialize_list, Dbid, RecoveryDescriptor, RecoveryKind};
pub use error::{Error, ErrorKind, Result};
pub use result::{CommandResult, ErrorRecord, RecoveryErrorType};
