//! Shared controller state: the worker is the sole writer, API threads read
//! relaxed-consistency snapshots through atomics.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};

use crate::status::{SliderStatus, StatusSnapshot};

/// Lock-free f64 slots (position, progress) are stored as bit patterns; the
/// error string is the one field behind a mutex since it is written rarely
/// and never on the pulse path.
#[derive(Debug)]
pub(crate) struct SharedState {
    pos_mm_bits: AtomicU64,
    progress_bits: AtomicU64,
    status: AtomicU8,
    homed: AtomicBool,
    error: Mutex<Option<String>>,
}

impl SharedState {
    pub(crate) fn new() -> Self {
        Self {
            pos_mm_bits: AtomicU64::new(0.0_f64.to_bits()),
            progress_bits: AtomicU64::new(0.0_f64.to_bits()),
            status: AtomicU8::new(SliderStatus::Idle.as_u8()),
            homed: AtomicBool::new(false),
            error: Mutex::new(None),
        }
    }

    pub(crate) fn pos_mm(&self) -> f64 {
        f64::from_bits(self.pos_mm_bits.load(Ordering::Acquire))
    }

    pub(crate) fn set_pos_mm(&self, mm: f64) {
        self.pos_mm_bits.store(mm.to_bits(), Ordering::Release);
    }

    pub(crate) fn progress(&self) -> f64 {
        f64::from_bits(self.progress_bits.load(Ordering::Acquire))
    }

    pub(crate) fn set_progress(&self, p: f64) {
        self.progress_bits.store(p.to_bits(), Ordering::Release);
    }

    pub(crate) fn status(&self) -> SliderStatus {
        SliderStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub(crate) fn set_status(&self, s: SliderStatus) {
        self.status.store(s.as_u8(), Ordering::Release);
    }

    pub(crate) fn homed(&self) -> bool {
        self.homed.load(Ordering::Acquire)
    }

    pub(crate) fn set_homed(&self, homed: bool) {
        self.homed.store(homed, Ordering::Release);
    }

    pub(crate) fn set_error(&self, e: Option<String>) {
        if let Ok(mut slot) = self.error.lock() {
            *slot = e;
        }
    }

    pub(crate) fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            status: self.status(),
            pos_mm: round_mils(self.pos_mm()),
            homed: self.homed(),
            progress: round_mils(self.progress()),
            error: self.error.lock().map(|g| g.clone()).unwrap_or(None),
        }
    }
}

/// Round to 0.001 for reporting; internal state keeps full precision.
fn round_mils(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}
