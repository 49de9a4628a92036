//! Remote license registry client for Tollgate.
//!
//! The registry is the authoritative directory of license records. It is
//! usually backed by a spreadsheet, so rows are loosely typed: numbers may be
//! strings, columns may be missing, and hardware columns may be spelled in
//! several historical ways.
//!
//! # Components
//!
//! - [`RegistryClient`]: the async interface the license engine consumes
//! - [`RemoteLicenseRow`]: a raw row, tolerant of missing and extra fields
//! - [`RemoteSnapshot`]: a row mapped onto the shared vocabulary
//! - [`HttpRegistry`]: the HTTP implementation
//! - [`MemoryRegistry`]: an in-process registry for tests and demos

mod client;
mod error;
mod http;
mod memory;
mod row;

pub use client::{BindingUpdate, RegistryClient};
pub use error::{RegistryError, RegistryResult};
pub use http::{HttpRegistry, RegistryConfig};
pub use memory::MemoryRegistry;
pub use row::{HardwareMapping, RemoteLicenseRow, RemoteSnapshot};
