//! Operation handlers and the `transact` entry point.

mod cleanup;
mod create;
mod lookup;
#[cfg(test)]
mod scenario_tests;

use std::sync::Arc;

use crate::collab::{
    NativeRequest, NativeRequestKind, NativeResponse, NativeTransport, PathTranslator,
    TokenResolver,
};
use crate::config::Config;
use crate::context::{self, Context, HandlerOutcome, PollOutcome};
use crate::error::{CoreError, CoreResult};
use crate::ioqueue::IoQueue;
use crate::proto;
use crate::status::NtStatus;

/// The translator core: owns the I/O queue and the external collaborators,
/// and exposes `transact` as the sole entry point.
pub struct Translator<T, P, R> {
    transport: T,
    paths: Arc<P>,
    tokens: Arc<R>,
    queue: IoQueue,
    max_depth: u32,
}

impl<T, P, R> Translator<T, P, R>
where
    T: NativeTransport,
    P: PathTranslator + Send + Sync + 'static,
    R: TokenResolver + Send + Sync + 'static,
{
    pub fn new(transport: T, paths: P, tokens: R, config: Config) -> Self {
        Translator {
            transport,
            paths: Arc::new(paths),
            tokens: Arc::new(tokens),
            queue: IoQueue::new(config.bucket_count),
            max_depth: config.coro_depth,
        }
    }

    /// Consumes at most one protocol response (Phase A), then tries to
    /// produce at most one protocol request (Phase B), over the same
    /// shared `outbound` buffer.
    pub fn transact(&self, inbound: Option<&[u8]>, outbound: &mut [u8]) -> CoreResult<usize> {
        log::trace!(
            "transact: inbound={} outbound_cap={}",
            inbound.map_or(0, <[u8]>::len),
            outbound.len()
        );

        if let Some(buf) = inbound {
            if buf.len() < proto::RSP_HEADER_SIZE {
                log::error!("transact: inbound buffer shorter than response header");
                return Err(CoreError::InvalidParameter("inbound shorter than header"));
            }
        }

        if !outbound.is_empty() && outbound.len() < proto::Q_MIN {
            log::error!("transact: outbound buffer below Q_MIN");
            return Err(CoreError::BufferTooSmall);
        }

        if self.transport.is_cancelled() {
            log::debug!("transact: volume is cancelled, refusing to drive further rounds");
            return Err(CoreError::Cancelled);
        }

        if let Some(buf) = inbound {
            self.consume_response(buf)?;
        }

        if outbound.is_empty() {
            return Ok(0);
        }

        self.produce_request(outbound)
    }

    fn consume_response(&self, buf: &[u8]) -> CoreResult<()> {
        let (header, payload) = proto::parse_response(buf)?;

        match self.queue.end_processing(header.unique) {
            Some(context) => {
                context.deliver_response(header.error, payload.to_vec());
                self.resume_phase_a(context);
            }
            None => {
                log::warn!(
                    "transact: response unique={} matches no in-flight context (stale or bogus)",
                    header.unique
                );
            }
        }

        Ok(())
    }

    /// Phase A never writes an outbound request: a context that keeps
    /// running here is always reposted to `pending`, carrying any request
    /// it already staged for Phase B to pick up without polling the
    /// future a second time.
    fn resume_phase_a(&self, mut context: Box<Context>) {
        let (outcome, staged) = context.poll_once();
        match outcome {
            PollOutcome::Done(response) => {
                self.transport.complete(context.hint, response);
            }
            PollOutcome::Pending => {
                context.staged_request = staged;
                self.queue.post_pending(context);
            }
        }
    }

    fn produce_request(&self, outbound: &mut [u8]) -> CoreResult<usize> {
        for byte in outbound.iter_mut() {
            *byte = 0;
        }

        let context = match self.queue.next_pending() {
            Some(context) => context,
            None => match self.transport.next_request() {
                Some(request) => self.build_context(request)?,
                None => return Ok(0),
            },
        };

        Ok(self.drive_outbound(context, outbound))
    }

    fn drive_outbound(&self, mut context: Box<Context>, outbound: &mut [u8]) -> usize {
        if let Some(request) = context.staged_request.take() {
            let len = request.len().min(outbound.len());
            outbound[..len].copy_from_slice(&request[..len]);
            self.queue.start_processing(context);
            return len;
        }

        let (outcome, staged) = context.poll_once();
        match outcome {
            PollOutcome::Done(response) => {
                self.transport.complete(context.hint, response);
                0
            }
            PollOutcome::Pending => match staged {
                Some(request) => {
                    let len = request.len().min(outbound.len());
                    outbound[..len].copy_from_slice(&request[..len]);
                    self.queue.start_processing(context);
                    len
                }
                None => {
                    self.queue.post_pending(context);
                    0
                }
            },
        }
    }

    /// Dispatches by native-request kind. An unregistered kind synthesizes
    /// a status-only `InvalidDeviceRequest` completion rather than failing
    /// `transact` itself.
    fn build_context(&self, request: NativeRequest) -> CoreResult<Box<Context>> {
        let parts = context::allocate();
        let identity = parts.identity;
        let channel = parts.channel.clone();

        let future = match request.kind {
            NativeRequestKind::Create(req) => create::build(
                channel,
                identity,
                parts.depth.clone(),
                self.max_depth,
                req,
                self.paths.clone(),
                self.tokens.clone(),
            ),
            NativeRequestKind::Cleanup(req) => cleanup::build_cleanup(req),
            NativeRequestKind::Close(req) => cleanup::build_close(req),
            NativeRequestKind::Other => {
                log::warn!("build_context: unregistered native request kind, hint={}", request.hint);
                Box::pin(std::future::ready(HandlerOutcome::Done(
                    NativeResponse::status_only(NtStatus::InvalidDeviceRequest),
                )))
            }
        };

        Ok(Box::new(Context::new(request.hint, parts, future)))
    }
}

/// Volume teardown: any context still pending or in-flight is dropped
/// without a native response; the external collaborator treats this as
/// cancellation.
impl<T, P, R> Drop for Translator<T, P, R> {
    fn drop(&mut self) {
        log::debug!("Translator::drop: tearing down IOQ, finalizing all live contexts");
        self.queue.drain();
    }
}
