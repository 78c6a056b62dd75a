use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Running counters for one link.
///
/// Counters only ever grow; they are updated with relaxed atomics and may
/// be read from any thread while the link is in use.
#[derive(Debug, Default)]
pub struct LinkStats {
    bytes_received: AtomicU64,
    noise_bytes: AtomicU64,
    frames_received: AtomicU64,
    checksum_mismatches: AtomicU64,
    frames_dispatched: AtomicU64,
    frames_sent: AtomicU64,
    send_failures: AtomicU64,
}

/// Point-in-time copy of [`LinkStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub bytes_received: u64,
    pub noise_bytes: u64,
    pub frames_received: u64,
    pub checksum_mismatches: u64,
    pub frames_dispatched: u64,
    pub frames_sent: u64,
    pub send_failures: u64,
}

impl LinkStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy the current counter values.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            noise_bytes: self.noise_bytes.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            checksum_mismatches: self.checksum_mismatches.load(Ordering::Relaxed),
            frames_dispatched: self.frames_dispatched.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_bytes(&self, count: u64) {
        self.bytes_received.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_noise(&self, count: u64) {
        if count > 0 {
            self.noise_bytes.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_frame(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_mismatch(&self) {
        self.checksum_mismatches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dispatch(&self) {
        self.frames_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }
}
