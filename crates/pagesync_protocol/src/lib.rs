//! # pagesync protocol
//!
//! Wire model and shared types for the pagesync client.
//!
//! This crate provides:
//! - `PageId` identifier newtype with "positive-integer-like" validation
//! - `LabelName` / `LabelSet` with the server's normalization rules
//! - `ScaffoldData` sidecar form records
//! - JSON wire DTOs for page resources and write payloads
//! - The `HttpClient` transport abstraction
//! - The `ClientError` taxonomy
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod http;
mod id;
mod label;
mod scaffold;
pub mod wire;

pub use error::{ClientError, ClientResult};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use id::PageId;
pub use label::{LabelName, LabelSet, LABEL_PREFIX};
pub use scaffold::{ScaffoldData, ScaffoldField};
