//! Transfer progress shared with the host thread.

use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

/// Coarse phase of a sender or receiver run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    Idle = 0,
    PickingFile = 1,
    ScanningForMetadata = 2,
    Transferring = 3,
    Reconstructing = 4,
    Complete = 5,
    Aborted = 6,
    Cancelled = 7,
    Failed = 8,
}

impl Phase {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::PickingFile,
            2 => Self::ScanningForMetadata,
            3 => Self::Transferring,
            4 => Self::Reconstructing,
            5 => Self::Complete,
            6 => Self::Aborted,
            7 => Self::Cancelled,
            8 => Self::Failed,
            _ => Self::Idle,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Complete | Self::Aborted | Self::Cancelled | Self::Failed
        )
    }
}

/// Progress tracking, readable from any thread while a run is going.
pub struct TransferProgress {
    phase: AtomicU8,
    pub chunks_complete: AtomicU64,
    pub chunks_total: AtomicU64,
    pub last_error: Mutex<Option<String>>,
}

impl TransferProgress {
    pub fn new() -> Self {
        Self {
            phase: AtomicU8::new(Phase::Idle as u8),
            chunks_complete: AtomicU64::new(0),
            chunks_total: AtomicU64::new(0),
            last_error: Mutex::new(None),
        }
    }

    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Relaxed))
    }

    pub fn set_phase(&self, phase: Phase) {
        self.phase.store(phase as u8, Ordering::Relaxed);
    }

    pub fn set_error(&self, message: String) {
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(message);
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Completed data chunks as a percentage; 100 when there are none.
    pub fn percent(&self) -> f64 {
        let total = self.chunks_total.load(Ordering::Relaxed);
        if total == 0 {
            return 100.0;
        }
        self.chunks_complete.load(Ordering::Relaxed) as f64 * 100.0 / total as f64
    }
}

impl Default for TransferProgress {
    fn default() -> Self {
        Self::new()
    }
}
