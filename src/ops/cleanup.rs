//! Cleanup and close handlers: populated in the dispatch table so the kind
//! is recognized, but neither completes with anything but
//! `INVALID_DEVICE_REQUEST` at this stage.

use std::future::Future;
use std::pin::Pin;

use crate::collab::{CleanupRequest, CloseRequest, NativeResponse};
use crate::context::HandlerOutcome;
use crate::status::NtStatus;

pub(crate) fn build_cleanup(
    _req: CleanupRequest,
) -> Pin<Box<dyn Future<Output = HandlerOutcome> + Send>> {
    Box::pin(std::future::ready(HandlerOutcome::Done(
        NativeResponse::status_only(NtStatus::InvalidDeviceRequest),
    )))
}

pub(crate) fn build_close(
    _req: CloseRequest,
) -> Pin<Box<dyn Future<Output = HandlerOutcome> + Send>> {
    Box::pin(std::future::ready(HandlerOutcome::Done(
        NativeResponse::status_only(NtStatus::InvalidDeviceRequest),
    )))
}
