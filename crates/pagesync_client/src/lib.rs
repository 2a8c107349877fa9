//! # pagesync client
//!
//! Change-tracking sync client for CMS page resources.
//!
//! This crate provides:
//! - [`PageEntity`]: a mutable local projection of one remote page with
//!   per-field-group dirty flags
//! - [`SyncClient`]: paginated search and listing, fetch, create, update,
//!   soft delete, sidecar form data, and label-set reconciliation
//! - [`ScriptedHttp`]: a scripted transport for tests
//!
//! ## Architecture
//!
//! The client mediates every network exchange through the injected
//! [`HttpClient`](pagesync_protocol::HttpClient) and decodes responses into
//! entities that remember which client created them. Writes serialize only
//! the fields the endpoint accepts and reconcile the authoritative version
//! number the server returns.
//!
//! ## Key invariants
//!
//! - Page ids are set once and immutable
//! - Every accepted server write advances the version by exactly one, or
//!   the server's returned value replaces the local one wholesale
//! - A clear dirty flag guarantees the field matches the last confirmed
//!   server state; a set flag only means it might differ
//! - A trashed entity is never deleted twice
//! - Caller bugs raise errors; remote failures return sentinels plus a
//!   retrievable last-error message

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod entity;
mod mock;

pub use client::SyncClient;
pub use config::ClientConfig;
pub use entity::{DirtyFlags, PageEntity, PageStatus, UserRef};
pub use mock::ScriptedHttp;

pub use pagesync_protocol::{
    ClientError, ClientResult, HttpClient, HttpMethod, HttpRequest, HttpResponse, LabelName,
    LabelSet, PageId, ScaffoldData, ScaffoldField,
};
