use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace, warn};
use xlink_frame::{
    encode_into, frame_size, Frame, FrameDecoder, FrameView, Outcome, RxState, MAX_PAYLOAD,
    START_MARKER,
};
use xlink_transport::Transport;

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::handler::HandlerRef;
use crate::registry::HandlerRegistry;
use crate::stats::LinkStats;

/// What one fed byte produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RxEvent {
    /// More bytes are needed.
    Incomplete,
    /// A frame passed verification; this is its copy.
    FrameReady(Frame),
    /// A complete frame failed verification and was discarded.
    ChecksumMismatch { computed: u16, received: u16 },
}

impl RxEvent {
    fn from_outcome(decoder: &FrameDecoder, outcome: Outcome) -> Self {
        match outcome {
            Outcome::Incomplete => Self::Incomplete,
            Outcome::FrameReady => match decoder.frame() {
                Some(view) => Self::FrameReady(view.to_frame()),
                None => Self::Incomplete,
            },
            Outcome::ChecksumMismatch { computed, received } => {
                Self::ChecksumMismatch { computed, received }
            }
        }
    }
}

/// Totals from one [`LinkContext::receive`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiveSummary {
    /// Frames that passed verification.
    pub frames: usize,
    /// Frames dropped for a bad checksum.
    pub checksum_mismatches: usize,
    /// Handler invocations across all frames.
    pub handlers_invoked: usize,
}

/// One end of an xlink link.
///
/// The registry and the receive session sit behind separate locks, so a
/// byte producer (an interrupt bottom half, a DMA completion, a reader
/// thread) never waits on registration work and vice versa. Neither lock
/// is held while handlers run or while the transport is called.
pub struct LinkContext<T> {
    registry: Mutex<HandlerRegistry>,
    rx: Mutex<FrameDecoder>,
    transport: T,
    stats: LinkStats,
}

fn lock<G>(mutex: &Mutex<G>) -> MutexGuard<'_, G> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: Transport> LinkContext<T> {
    /// Create a link over `transport` with an unbounded registry.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, LinkConfig::default())
    }

    /// Create a link over `transport` with explicit registry bounds.
    pub fn with_config(transport: T, config: LinkConfig) -> Self {
        debug!(
            transport = transport.name(),
            max_components = ?config.max_components,
            max_handlers_per_component = ?config.max_handlers_per_component,
            "link context created"
        );
        Self {
            registry: Mutex::new(HandlerRegistry::with_config(config)),
            rx: Mutex::new(FrameDecoder::new()),
            transport,
            stats: LinkStats::new(),
        }
    }

    /// Register `handler` for `(component, message)`.
    ///
    /// See [`HandlerRegistry::register`] for the failure modes.
    pub fn register(&self, component: u8, message: u8, handler: HandlerRef) -> Result<()> {
        lock(&self.registry).register(component, message, handler)
    }

    /// Remove one registration of exactly `handler` for `(component, message)`.
    pub fn unregister(&self, component: u8, message: u8, handler: &HandlerRef) -> Result<()> {
        lock(&self.registry).unregister(component, message, handler)
    }

    /// Handlers currently registered for `(component, message)`, in registration order.
    pub fn lookup(&self, component: u8, message: u8) -> Vec<HandlerRef> {
        lock(&self.registry).lookup(component, message)
    }

    /// Whether `handler` is still registered under any `(component, message)`.
    pub fn is_registered(&self, handler: &HandlerRef) -> bool {
        lock(&self.registry).contains(handler)
    }

    /// Advance the receive session by one byte.
    ///
    /// Never invokes handlers; pass a ready frame to [`dispatch`](Self::dispatch).
    /// A ready frame is copied out; use [`feed_with`](Self::feed_with) on
    /// paths that must not allocate.
    pub fn feed(&self, byte: u8) -> RxEvent {
        match self.feed_with(byte, |view| view.to_frame()) {
            (_, Some(frame)) => RxEvent::FrameReady(frame),
            (Outcome::ChecksumMismatch { computed, received }, None) => {
                RxEvent::ChecksumMismatch { computed, received }
            }
            _ => RxEvent::Incomplete,
        }
    }

    /// Advance the receive session by one byte without allocating.
    ///
    /// When the byte completes a valid frame, `on_frame` runs on the
    /// borrowed view while the receive lock is held and its result is
    /// returned alongside the outcome. Keep `on_frame` short: the next
    /// byte cannot be fed until it returns.
    pub fn feed_with<R>(
        &self,
        byte: u8,
        on_frame: impl FnOnce(FrameView<'_>) -> R,
    ) -> (Outcome, Option<R>) {
        let (outcome, header, value) = {
            let mut rx = lock(&self.rx);
            if rx.state() == RxState::AwaitingStart && byte != START_MARKER {
                self.stats.record_noise(1);
            }
            let outcome = rx.feed(byte);
            match rx.frame() {
                Some(view) if outcome == Outcome::FrameReady => {
                    let header = (view.component, view.message, view.payload.len());
                    (outcome, Some(header), Some(on_frame(view)))
                }
                _ => (outcome, None, None),
            }
        };
        self.stats.record_bytes(1);
        match (header, outcome) {
            (Some((component, message, len)), _) => self.record_frame(component, message, len),
            (None, Outcome::ChecksumMismatch { computed, received }) => {
                self.record_mismatch(computed, received)
            }
            _ => {}
        }
        (outcome, value)
    }

    /// Feed a block of bytes until one completes a frame (valid or not).
    ///
    /// Returns how many bytes were consumed and the event of the last one.
    /// The receive lock is taken once for the whole block.
    pub fn feed_slice(&self, data: &[u8]) -> (usize, RxEvent) {
        let (used, noise, event) = {
            let mut rx = lock(&self.rx);
            let mut noise = 0u64;
            let mut used = 0usize;
            let mut outcome = Outcome::Incomplete;
            for byte in data {
                if rx.state() == RxState::AwaitingStart && *byte != START_MARKER {
                    noise += 1;
                }
                used += 1;
                outcome = rx.feed(*byte);
                if outcome != Outcome::Incomplete {
                    break;
                }
            }
            (used, noise, RxEvent::from_outcome(&rx, outcome))
        };
        self.stats.record_bytes(used as u64);
        self.stats.record_noise(noise);
        match &event {
            RxEvent::Incomplete => {}
            RxEvent::FrameReady(frame) => {
                self.record_frame(frame.component, frame.message, frame.payload.len())
            }
            RxEvent::ChecksumMismatch { computed, received } => {
                self.record_mismatch(*computed, *received)
            }
        }
        (used, event)
    }

    /// Invoke every handler registered for the frame's identifiers.
    ///
    /// The handler list is copied under the registry lock and invoked
    /// after it is released, in registration order. Handlers may therefore
    /// register, unregister or send on this same link. Returns how many
    /// handlers ran.
    pub fn dispatch(&self, frame: &Frame) -> usize {
        let handlers = self.lookup(frame.component, frame.message);
        if handlers.is_empty() {
            trace!(
                component = frame.component,
                message = frame.message,
                "no handler for frame"
            );
            return 0;
        }

        for handler in &handlers {
            handler.handle(frame);
        }
        self.stats.record_dispatch();
        handlers.len()
    }

    /// Feed `data` and dispatch every valid frame it completes.
    pub fn receive(&self, mut data: &[u8]) -> ReceiveSummary {
        let mut summary = ReceiveSummary::default();
        while !data.is_empty() {
            let (used, event) = self.feed_slice(data);
            data = &data[used..];

            match event {
                RxEvent::Incomplete => {}
                RxEvent::FrameReady(frame) => {
                    summary.frames += 1;
                    summary.handlers_invoked += self.dispatch(&frame);
                }
                RxEvent::ChecksumMismatch { .. } => summary.checksum_mismatches += 1,
            }
        }
        summary
    }

    /// Drop any partially received frame.
    pub fn reset_rx(&self) {
        lock(&self.rx).reset();
    }

    /// Encode a frame and hand it to the transport's send queue.
    ///
    /// Returns once the frame is queued, not once it is on the wire.
    pub fn send(&self, component: u8, message: u8, payload: &[u8]) -> Result<()> {
        if payload.len() > MAX_PAYLOAD {
            return Err(LinkError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD,
            });
        }

        let mut buf = self
            .transport
            .alloc(frame_size(payload.len()))
            .map_err(|err| {
                self.stats.record_send_failure();
                warn!(component, message, error = %err, "no transmit buffer");
                LinkError::TransportUnavailable(err)
            })?;

        encode_into(component, message, payload, &mut buf)?;

        self.transport.enqueue(buf).map_err(|err| {
            self.stats.record_send_failure();
            warn!(component, message, error = %err, "transport refused frame");
            LinkError::Transport(err)
        })?;

        self.stats.record_sent();
        trace!(component, message, len = payload.len(), "frame queued");
        Ok(())
    }

    /// Link counters.
    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    /// The transport this link sends on.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Current registry bounds.
    pub fn config(&self) -> LinkConfig {
        *lock(&self.registry).config()
    }

    fn record_frame(&self, component: u8, message: u8, len: usize) {
        self.stats.record_frame();
        trace!(component, message, len, "frame received");
    }

    fn record_mismatch(&self, computed: u16, received: u16) {
        self.stats.record_mismatch();
        warn!(computed, received, "checksum mismatch, frame discarded");
    }
}

impl<T> std::fmt::Debug for LinkContext<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkContext")
            .field("registry", &*lock(&self.registry))
            .field("rx_state", &lock(&self.rx).state())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}
