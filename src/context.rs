//! The per-native-request context and the coroutine discipline it drives.
//!
//! Suspension points are realized as native `async`/`await`: the handler is
//! an ordinary Rust future, and `enter`/`yield` become `poll`/`Poll::Pending`.
//! Nothing here spawns a task or parks an OS thread — `transact` is the only
//! thing that ever calls `poll`, so it is also the only scheduler this
//! coroutine discipline needs. Channel and depth state are `Arc`-shared
//! rather than `Rc`-shared so that a `Context` may be handed between the OS
//! threads that take turns calling `transact`, since many translations may
//! be in flight concurrently.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context as TaskContext, Poll, Waker};

use crate::collab::NativeResponse;

/// The queue a context currently belongs to, tracked explicitly so that
/// membership in `pending` vs. `in_flight` is an assertable invariant
/// rather than something left to convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Place {
    Pending,
    InFlight,
    Detached,
}

/// What a handler coroutine produces when polled.
pub enum HandlerOutcome {
    Done(NativeResponse),
}

/// The mailbox a suspended coroutine and `transact` use to hand a protocol
/// request/response pair back and forth. Bytes are owned (not borrowed)
/// specifically so the coroutine never retains a pointer into the shared
/// protocol buffer across a suspension.
#[derive(Default)]
pub(crate) struct StepChannel {
    request_out: Option<Vec<u8>>,
    response_in: Option<(i32, Vec<u8>)>,
}

pub(crate) type SharedChannel = Arc<Mutex<StepChannel>>;

/// Awaiting this suspends the coroutine until `transact` has delivered a
/// matching protocol response.
pub(crate) struct Exchange {
    channel: SharedChannel,
}

impl Future for Exchange {
    type Output = (i32, Vec<u8>);

    fn poll(self: Pin<&mut Self>, _cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        match self.channel.lock().unwrap().response_in.take() {
            Some(response) => Poll::Ready(response),
            None => Poll::Pending,
        }
    }
}

/// `await`s a single protocol round trip: stages `request` for pickup by
/// `transact`'s outbound phase, then suspends until the matching response
/// arrives. This is the suspension point `lookup_one_component` awaits on.
pub(crate) async fn exchange(channel: &SharedChannel, request: Vec<u8>) -> (i32, Vec<u8>) {
    channel.lock().unwrap().request_out = Some(request);
    Exchange {
        channel: channel.clone(),
    }
    .await
}

/// RAII bookkeeping for the coroutine-nesting depth bound: depth only ever
/// increases across a nested sub-coroutine entry and decreases on return,
/// so it never exceeds the configured maximum.
pub(crate) struct DepthGuard(Arc<AtomicU32>);

impl DepthGuard {
    pub(crate) fn enter(depth: &Arc<AtomicU32>, max: u32) -> Result<Self, ()> {
        let current = depth.fetch_add(1, Ordering::SeqCst);
        if current >= max {
            depth.fetch_sub(1, Ordering::SeqCst);
            return Err(());
        }

        Ok(DepthGuard(depth.clone()))
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The per-translation context: created on first sight of a native
/// request, destroyed after its native response is delivered.
pub struct Context {
    pub(crate) hint: u64,
    pub(crate) place: Place,
    pub(crate) channel: SharedChannel,
    /// Kept alongside the context for depth assertions in tests; not
    /// consulted by production control flow.
    #[allow(dead_code)]
    pub(crate) depth: Arc<AtomicU32>,
    pub(crate) polls: u32,
    future: Pin<Box<dyn Future<Output = HandlerOutcome> + Send>>,
    /// A request the coroutine already computed but that hasn't been
    /// copied into a real outbound buffer yet. Phase A never writes output;
    /// a context resumed there that keeps running is always reposted to
    /// `pending`, and its next Phase B turn picks this up without polling
    /// the future again.
    pub(crate) staged_request: Option<Vec<u8>>,
}

/// A freshly allocated channel and the depth counter that will back a new
/// `Context`, handed out before the context's coroutine future is built so
/// that the future can be constructed already knowing the context's wire
/// identity — needed by the coroutine itself when it fills in a `LOOKUP`
/// request's `unique` field.
pub(crate) struct NewContext {
    pub channel: SharedChannel,
    pub depth: Arc<AtomicU32>,
    pub identity: u64,
}

pub(crate) fn allocate() -> NewContext {
    let channel: SharedChannel = Arc::new(Mutex::new(StepChannel::default()));
    let identity = Arc::as_ptr(&channel) as u64;

    NewContext {
        channel,
        depth: Arc::new(AtomicU32::new(0)),
        identity,
    }
}

impl Context {
    pub(crate) fn new(
        hint: u64,
        parts: NewContext,
        future: Pin<Box<dyn Future<Output = HandlerOutcome> + Send>>,
    ) -> Self {
        Context {
            hint,
            place: Place::Detached,
            channel: parts.channel,
            depth: parts.depth,
            polls: 0,
            future,
            staged_request: None,
        }
    }

    /// Context identity, used as the wire `unique` correlator. Backed by
    /// the channel's allocation rather than the `Context`'s own address so
    /// that it is known before the context (and its future, which embeds
    /// this same value) is fully constructed.
    pub fn identity(&self) -> u64 {
        Arc::as_ptr(&self.channel) as u64
    }

    /// Current coroutine-nesting depth: never decreases between consecutive
    /// resumptions of the same frame.
    #[allow(dead_code)]
    pub fn depth(&self) -> u32 {
        self.depth.load(Ordering::SeqCst)
    }

    pub(crate) fn deliver_response(&self, errno: i32, payload: Vec<u8>) {
        self.channel.lock().unwrap().response_in = Some((errno, payload));
    }

    /// Resumes the coroutine once. Returns the handler's outcome, plus any
    /// request it staged while running.
    pub(crate) fn poll_once(&mut self) -> (PollOutcome, Option<Vec<u8>>) {
        self.polls += 1;

        let waker = Waker::noop();
        let mut cx = TaskContext::from_waker(waker);

        match self.future.as_mut().poll(&mut cx) {
            Poll::Ready(HandlerOutcome::Done(response)) => (PollOutcome::Done(response), None),
            Poll::Pending => {
                let staged = self.channel.lock().unwrap().request_out.take();
                (PollOutcome::Pending, staged)
            }
        }
    }
}

pub(crate) enum PollOutcome {
    Done(NativeResponse),
    Pending,
}
