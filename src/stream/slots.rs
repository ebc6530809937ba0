use std::fmt;
use std::future::Future;
use std::io::Write;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::chunk::render::render_to_vec;
use crate::config::StreamOpts;
use crate::foundation::context::RenderContext;
use crate::foundation::error::{SluiceError, SluiceResult};
use crate::stream::transport::Transport;
use crate::stream::writer::StreamWriter;
use crate::tree::element::{Element, el};
use crate::tree::node::{Node, component};

/// Attribute carrying the correlation id on delivered slot content.
pub const SLOT_ATTR: &str = "slot";

type ErrorFn = dyn Fn(&SluiceError) -> Element + Send + Sync;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Correlation id pairing a placeholder with its delivered content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotId(Uuid);

impl SlotId {
    fn mint() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Lifecycle of one async slot.
///
/// The first three states only move forward. `Delivered`, `Aborted` and `Failed` are terminal
/// and set by the drain step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SlotState {
    /// Producer spawned, placeholder not rendered yet.
    Registered,
    /// The placeholder went into the main document.
    PlaceholderEmitted,
    /// The producer started running.
    Producing,
    /// Content written, tagged with the slot id.
    Delivered,
    /// Canceled; nothing was written for this slot.
    Aborted,
    /// The producer errored, panicked or timed out; the error rendering was written instead.
    Failed,
}

impl SlotState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => SlotState::Registered,
            1 => SlotState::PlaceholderEmitted,
            2 => SlotState::Producing,
            3 => SlotState::Delivered,
            4 => SlotState::Aborted,
            _ => SlotState::Failed,
        }
    }
}

#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn new() -> Self {
        Self(AtomicU8::new(SlotState::Registered as u8))
    }

    fn get(&self) -> SlotState {
        SlotState::from_u8(self.0.load(Ordering::Acquire))
    }

    // Non-terminal states race between the render thread and the producer task.
    fn advance(&self, to: SlotState) {
        self.0.fetch_max(to as u8, Ordering::AcqRel);
    }

    fn finish(&self, to: SlotState) {
        self.0.store(to as u8, Ordering::Release);
    }
}

struct SlotEntry {
    id: SlotId,
    state: Arc<StateCell>,
    token: CancellationToken,
    handle: Option<JoinHandle<SluiceResult<Vec<u8>>>>,
    on_error: Option<Arc<ErrorFn>>,
}

/// A registered async slot.
///
/// Put [`Slot::placeholder`] (or the slot itself, via `Into<Node>`) where the content belongs in
/// the document.
#[derive(Clone, Debug)]
pub struct Slot {
    id: SlotId,
    token: CancellationToken,
    placeholder: Node,
}

impl Slot {
    /// Correlation id of this slot.
    pub fn id(&self) -> SlotId {
        self.id
    }

    /// Placeholder node: `<slot name="{id}">fallback</slot>`.
    pub fn placeholder(&self) -> Node {
        self.placeholder.clone()
    }

    /// Cancel this slot only. The producer stops and nothing is written for it.
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

impl From<Slot> for Node {
    fn from(slot: Slot) -> Self {
        slot.placeholder
    }
}

impl From<&Slot> for Node {
    fn from(slot: &Slot) -> Self {
        slot.placeholder()
    }
}

/// Outcome counts of one drain step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Slots whose content was written.
    pub delivered: usize,
    /// Slots canceled before delivery; nothing was written for them.
    pub aborted: usize,
    /// Slots whose producer failed; their error rendering was written.
    pub failed: usize,
}

impl DrainReport {
    /// Total number of slots drained.
    pub fn total(&self) -> usize {
        self.delivered + self.aborted + self.failed
    }
}

/// Registry of the async slots of one request.
///
/// Each registered producer starts right away on the tokio runtime that was current when the
/// registry was created, concurrently with the main render and with the other producers. After
/// the main document has been flushed, [`AsyncSlots::drain`] awaits the producers in
/// registration order and writes each result tagged with its slot id.
///
/// Cloning shares the registry, so components rendered during the main pass can register
/// slots of their own.
#[derive(Clone)]
pub struct AsyncSlots {
    ctx: RenderContext,
    runtime: Handle,
    timeout: Option<Duration>,
    entries: Arc<Mutex<Vec<SlotEntry>>>,
}

impl fmt::Debug for AsyncSlots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncSlots")
            .field("slots", &self.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl AsyncSlots {
    /// Registry bound to `ctx`, spawning onto the current tokio runtime.
    ///
    /// Fails with a response error when called outside a runtime.
    pub fn new(ctx: &RenderContext, opts: &StreamOpts) -> SluiceResult<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| SluiceError::response(format!("async slots need a tokio runtime: {e}")))?;
        Ok(Self::with_runtime(ctx, opts, runtime))
    }

    /// Registry bound to `ctx`, spawning onto `runtime`.
    pub fn with_runtime(ctx: &RenderContext, opts: &StreamOpts, runtime: Handle) -> Self {
        Self {
            ctx: ctx.clone(),
            runtime,
            timeout: opts.slot_timeout(),
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Register a producer and start it.
    ///
    /// `fallback` is shown inside the placeholder until the real content arrives. When the
    /// producer fails, an empty `<template slot="{id}" data-slot-error>` is delivered so the
    /// client can tell the slot is done.
    pub fn register<F, Fut>(&self, fallback: impl Into<Node>, produce: F) -> Slot
    where
        F: FnOnce(RenderContext) -> Fut + Send + 'static,
        Fut: Future<Output = SluiceResult<Element>> + Send + 'static,
    {
        self.spawn_slot(fallback.into(), None, produce)
    }

    /// Like [`AsyncSlots::register`], with a custom rendering for producer failures.
    pub fn register_with_error<F, Fut>(
        &self,
        fallback: impl Into<Node>,
        on_error: impl Fn(&SluiceError) -> Element + Send + Sync + 'static,
        produce: F,
    ) -> Slot
    where
        F: FnOnce(RenderContext) -> Fut + Send + 'static,
        Fut: Future<Output = SluiceResult<Element>> + Send + 'static,
    {
        self.spawn_slot(fallback.into(), Some(Arc::new(on_error)), produce)
    }

    fn spawn_slot<F, Fut>(&self, fallback: Node, on_error: Option<Arc<ErrorFn>>, produce: F) -> Slot
    where
        F: FnOnce(RenderContext) -> Fut + Send + 'static,
        Fut: Future<Output = SluiceResult<Element>> + Send + 'static,
    {
        let id = SlotId::mint();
        let state = Arc::new(StateCell::new());
        let slot_ctx = self.ctx.child();
        let token = slot_ctx.token().clone();

        let handle = {
            let state = Arc::clone(&state);
            let token = token.clone();
            let deadline = self.timeout;
            self.runtime.spawn(async move {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(SluiceError::Canceled),
                    res = produce_slot(id, slot_ctx, state, deadline, produce) => res,
                }
            })
        };

        let placeholder = {
            let state = Arc::clone(&state);
            let name = id.to_string();
            component(move |_| {
                state.advance(SlotState::PlaceholderEmitted);
                Ok(el("slot").attr("name", name.clone()).child(fallback.clone()).into())
            })
        };

        debug!(slot = %id, "registered async slot");
        lock(&self.entries).push(SlotEntry {
            id,
            state,
            token: token.clone(),
            handle: Some(handle),
            on_error,
        });
        Slot {
            id,
            token,
            placeholder,
        }
    }

    /// Number of registered slots, drained or not.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// `true` when no slot was registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current state of one slot.
    pub fn state(&self, id: SlotId) -> Option<SlotState> {
        lock(&self.entries)
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.state.get())
    }

    /// States of every slot in registration order.
    pub fn states(&self) -> Vec<(SlotId, SlotState)> {
        lock(&self.entries)
            .iter()
            .map(|e| (e.id, e.state.get()))
            .collect()
    }

    /// Cancel every undrained slot without writing anything for them.
    pub fn abort_all(&self) -> usize {
        let mut aborted = 0;
        for entry in lock(&self.entries).iter_mut() {
            if let Some(handle) = entry.handle.take() {
                entry.token.cancel();
                handle.abort();
                entry.state.finish(SlotState::Aborted);
                aborted += 1;
            }
        }
        if aborted > 0 {
            warn!(aborted, "aborted async slots");
        }
        aborted
    }

    fn next_pending(&self) -> Option<PendingSlot> {
        let mut entries = lock(&self.entries);
        let entry = entries.iter_mut().find(|e| e.handle.is_some())?;
        Some(PendingSlot {
            id: entry.id,
            state: Arc::clone(&entry.state),
            token: entry.token.clone(),
            handle: entry.handle.take()?,
            on_error: entry.on_error.clone(),
        })
    }

    /// Await every undrained producer in registration order and write its result.
    ///
    /// Each delivered or failed slot is followed by a checkpoint flush. Canceled slots are
    /// aborted without writing. Slots registered while draining are drained too. Only writer
    /// failures end the drain early.
    #[tracing::instrument(skip(self, writer), fields(slots = self.len()))]
    pub async fn drain<T: Transport>(&self, writer: &mut StreamWriter<T>) -> SluiceResult<DrainReport> {
        let mut report = DrainReport::default();
        while let Some(slot) = self.next_pending() {
            let PendingSlot {
                id,
                state,
                token,
                handle,
                on_error,
            } = slot;

            if token.is_cancelled() {
                handle.abort();
                state.finish(SlotState::Aborted);
                warn!(slot = %id, "async slot canceled before delivery");
                report.aborted += 1;
                continue;
            }

            let outcome = match handle.await {
                Ok(res) => res,
                Err(join) if join.is_panic() => Err(SluiceError::render("slot producer panicked")),
                Err(_) => Err(SluiceError::Canceled),
            };

            // A producer may finish in the same instant its slot is canceled.
            if token.is_cancelled() {
                state.finish(SlotState::Aborted);
                warn!(slot = %id, "async slot canceled before delivery");
                report.aborted += 1;
                continue;
            }

            match outcome {
                Ok(bytes) => {
                    self.deliver(writer, &state, &bytes)?;
                    state.finish(SlotState::Delivered);
                    debug!(slot = %id, bytes = bytes.len(), "delivered async slot");
                    report.delivered += 1;
                }
                Err(err) if err.is_canceled() => {
                    state.finish(SlotState::Aborted);
                    report.aborted += 1;
                }
                Err(err) => {
                    warn!(slot = %id, error = %err, "async slot producer failed");
                    let fallback = match &on_error {
                        Some(f) => f(&err),
                        None => el("template").bool_attr("data-slot-error"),
                    };
                    match render_tagged(fallback, id, &self.ctx) {
                        Ok(bytes) => self.deliver(writer, &state, &bytes)?,
                        Err(render_err) => {
                            warn!(slot = %id, error = %render_err, "slot error rendering failed");
                        }
                    }
                    state.finish(SlotState::Failed);
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    /// Write one slot's bytes and flush them. A writer failure aborts every remaining slot.
    fn deliver<T: Transport>(
        &self,
        writer: &mut StreamWriter<T>,
        state: &StateCell,
        bytes: &[u8],
    ) -> SluiceResult<()> {
        let written = writer
            .write_all(bytes)
            .map_err(SluiceError::from)
            .and_then(|()| writer.checkpoint());
        if let Err(err) = written {
            state.finish(SlotState::Aborted);
            warn!(error = %err, "slot delivery failed; aborting remaining slots");
            self.abort_all();
            return Err(err);
        }
        Ok(())
    }
}

struct PendingSlot {
    id: SlotId,
    state: Arc<StateCell>,
    token: CancellationToken,
    handle: JoinHandle<SluiceResult<Vec<u8>>>,
    on_error: Option<Arc<ErrorFn>>,
}

async fn produce_slot<F, Fut>(
    id: SlotId,
    ctx: RenderContext,
    state: Arc<StateCell>,
    deadline: Option<Duration>,
    produce: F,
) -> SluiceResult<Vec<u8>>
where
    F: FnOnce(RenderContext) -> Fut,
    Fut: Future<Output = SluiceResult<Element>>,
{
    state.advance(SlotState::Producing);
    let element = match deadline {
        Some(limit) => tokio::time::timeout(limit, produce(ctx.clone()))
            .await
            .map_err(|_| {
                SluiceError::render(format!(
                    "slot producer timed out after {} ms",
                    limit.as_millis()
                ))
            })??,
        None => produce(ctx.clone()).await?,
    };
    // Rendered inside the task so the drain only ever writes complete elements.
    render_tagged(element, id, &ctx)
}

fn render_tagged(element: Element, id: SlotId, ctx: &RenderContext) -> SluiceResult<Vec<u8>> {
    let node: Node = element.unique_attr(SLOT_ATTR, id.to_string()).into();
    render_to_vec(&node, ctx)
}

#[cfg(test)]
#[path = "../../tests/unit/stream/slots.rs"]
mod tests;
