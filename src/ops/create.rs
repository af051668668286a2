//! The `create` operation handler: the only native-request kind this crate
//! fully implements, sharing `lookup_path` with every create disposition.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::AtomicU32;
use std::sync::Arc;

use crate::collab::{CreateRequest, Disposition, NativeResponse, PathTranslator, TokenResolver};
use crate::context::{HandlerOutcome, SharedChannel};
use crate::status::NtStatus;

use super::lookup::{lookup_path, LookupCaller};

struct PreparedCreate {
    posix_path: Vec<u8>,
    orig_uid: u32,
    orig_gid: u32,
    orig_pid: u32,
}

/// Translates the native path and, if the request carries an access token,
/// resolves the caller's uid/gid/pid. Pure and non-suspending; failures
/// short-circuit before any protocol exchange is attempted.
fn prepare_context<P: PathTranslator, R: TokenResolver>(
    req: &CreateRequest,
    paths: &P,
    tokens: &R,
) -> Result<PreparedCreate, NtStatus> {
    let posix_path = paths.to_posix(&req.path).map_err(NtStatus::from)?;

    let (orig_uid, orig_gid, orig_pid) = match req.access_token {
        Some(token) => tokens.resolve(token).map_err(NtStatus::from)?,
        None => (0, 0, 0),
    };

    Ok(PreparedCreate {
        posix_path,
        orig_uid,
        orig_gid,
        orig_pid,
    })
}

/// Builds the coroutine that implements the create handler. Synchronous
/// rejections (named stream, `prepare_context` failure) resolve on the
/// very first poll; nothing here ever suspends for those cases.
pub(crate) fn build<P, R>(
    channel: SharedChannel,
    identity: u64,
    depth: Arc<AtomicU32>,
    max_depth: u32,
    req: CreateRequest,
    paths: Arc<P>,
    tokens: Arc<R>,
) -> Pin<Box<dyn Future<Output = HandlerOutcome> + Send>>
where
    P: PathTranslator + Send + Sync + 'static,
    R: TokenResolver + Send + Sync + 'static,
{
    if req.named_stream {
        return Box::pin(std::future::ready(HandlerOutcome::Done(
            NativeResponse::status_only(NtStatus::ObjectNameInvalid),
        )));
    }

    let prepared = match prepare_context(&req, paths.as_ref(), tokens.as_ref()) {
        Ok(prepared) => prepared,
        Err(status) => {
            return Box::pin(std::future::ready(HandlerOutcome::Done(
                NativeResponse::status_only(status),
            )));
        }
    };

    let disposition = if req.open_target_directory {
        None
    } else {
        Disposition::from_create_options(req.create_options)
    };

    Box::pin(async move {
        let outcome = if req.open_target_directory {
            open_target_directory(&channel, identity, &prepared, &req).await
        } else {
            match disposition {
                Some(Disposition::Open) => {
                    file_open(&channel, identity, &depth, max_depth, &prepared, &req).await
                }
                Some(_) => Err(NtStatus::NotImplemented),
                None => Err(NtStatus::InvalidParameter),
            }
        };

        match outcome {
            Ok(response) => HandlerOutcome::Done(response),
            Err(status) => HandlerOutcome::Done(NativeResponse::status_only(status)),
        }
    })
}

/// `FILE_OPEN`: the only disposition specified in full.
async fn file_open(
    channel: &SharedChannel,
    identity: u64,
    depth: &Arc<AtomicU32>,
    max_depth: u32,
    prepared: &PreparedCreate,
    req: &CreateRequest,
) -> Result<NativeResponse, NtStatus> {
    let caller = LookupCaller {
        user_mode: req.user_mode,
        has_traverse_privilege: req.has_traverse_privilege,
        orig_uid: prepared.orig_uid,
        orig_gid: prepared.orig_gid,
        orig_pid: prepared.orig_pid,
        desired_access: req.desired_access,
    };

    let outcome = lookup_path(channel, identity, depth, max_depth, &prepared.posix_path, &caller)
        .await?;

    log::debug!(
        "file_open: resolved ino={} granted_access={:?}",
        outcome.ino,
        outcome.granted_access
    );

    Ok(NativeResponse::create_ok(outcome.granted_access))
}

/// Stub: the dispatcher and the split exist, but `OpenTargetDirectory` is
/// not specified here.
async fn open_target_directory(
    _channel: &SharedChannel,
    _identity: u64,
    _prepared: &PreparedCreate,
    _req: &CreateRequest,
) -> Result<NativeResponse, NtStatus> {
    Err(NtStatus::NotImplemented)
}
