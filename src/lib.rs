//! The core of a protocol-translation layer inside a user-mode-filesystem
//! driver: it receives native, Windows-style filesystem requests and
//! drives an arbitrary sequence of FUSE-wire-format protocol exchanges
//! with a user-mode server to answer them.
//!
//! `transact` is the sole entry point. Everything else — the per-request
//! `Context`, the `IoQueue`, the operation handlers under `ops` — exists
//! to let one native request span many protocol round trips without
//! parking an OS thread between them.

#![forbid(unsafe_code)]

pub use crate::collab::{
    AccessMask, CleanupRequest, CloseRequest, CreateRequest, CreateResponseBody, Disposition,
    IoStatus, NativeRequest, NativeRequestKind, NativeResponse, NativeTransport, PathTranslator,
    ResponseBody, TokenHandle, TokenResolver,
};
pub use crate::config::Config;
pub use crate::error::{CoreError, CoreResult};
pub use crate::ops::Translator;
pub use crate::status::{status_from_errno, NtStatus};

mod access;
mod collab;
mod config;
mod context;
mod error;
mod ioqueue;
mod ops;
mod proto;
mod status;
