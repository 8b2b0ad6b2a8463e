//! The visual link: collaborator traits for screen, camera and files, plus
//! the polling handle both state machines drive.
//!
//! Camera capture, QR decoding, QR rendering and file dialogs live outside
//! this crate. Hosts plug them in through `Scanner`, `Display`,
//! `FileSource` and `FileSink`; the state machines only ever see text.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::TransferError;

/// Default delay between two scans.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Longest single sleep inside `ThreadPacer`, so cancellation is noticed
/// promptly even with long intervals.
const PAUSE_SLICE: Duration = Duration::from_millis(20);

/// Camera side: decoded text of the QR code currently in view.
///
/// Must return promptly with `None` when nothing is decodable; pacing is
/// the caller's job.
pub trait Scanner {
    fn scan(&mut self) -> Option<String>;
}

/// Screen side: named surfaces showing one QR code each.
pub trait Display {
    fn show(&mut self, text: &str, label: &str) -> io::Result<()>;
    fn clear(&mut self, label: &str) -> io::Result<()>;
    fn clear_all(&mut self) -> io::Result<()>;
}

/// A file picked for sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

pub trait FileSource {
    /// `Ok(None)` when the user picked nothing.
    fn pick_input(&mut self) -> io::Result<Option<InputFile>>;
}

pub trait FileSink {
    fn pick_output_dir(&mut self) -> io::Result<PathBuf>;
    /// Write `bytes` as `name` inside `dir`, returning the final path.
    fn write(&mut self, dir: &Path, name: &str, bytes: &[u8]) -> io::Result<PathBuf>;
}

impl<T: Scanner + ?Sized> Scanner for &mut T {
    fn scan(&mut self) -> Option<String> {
        (**self).scan()
    }
}

impl<T: Scanner + ?Sized> Scanner for Box<T> {
    fn scan(&mut self) -> Option<String> {
        (**self).scan()
    }
}

impl<T: Display + ?Sized> Display for &mut T {
    fn show(&mut self, text: &str, label: &str) -> io::Result<()> {
        (**self).show(text, label)
    }
    fn clear(&mut self, label: &str) -> io::Result<()> {
        (**self).clear(label)
    }
    fn clear_all(&mut self) -> io::Result<()> {
        (**self).clear_all()
    }
}

impl<T: Display + ?Sized> Display for Box<T> {
    fn show(&mut self, text: &str, label: &str) -> io::Result<()> {
        (**self).show(text, label)
    }
    fn clear(&mut self, label: &str) -> io::Result<()> {
        (**self).clear(label)
    }
    fn clear_all(&mut self) -> io::Result<()> {
        (**self).clear_all()
    }
}

/// Shared cancellation flag, checked at every scan and every pause.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Delay between polls.
pub trait Pacer {
    /// Wait up to `interval`, returning early once `cancel` fires.
    fn pause(&mut self, interval: Duration, cancel: &CancelToken);
}

impl<T: Pacer + ?Sized> Pacer for &mut T {
    fn pause(&mut self, interval: Duration, cancel: &CancelToken) {
        (**self).pause(interval, cancel)
    }
}

/// Real-time pacer backed by `thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn pause(&mut self, interval: Duration, cancel: &CancelToken) {
        let deadline = Instant::now() + interval;
        loop {
            if cancel.is_cancelled() {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            std::thread::sleep((deadline - now).min(PAUSE_SLICE));
        }
    }
}

/// Pacer that returns immediately and counts how often it was asked to wait.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDelay {
    pub pauses: usize,
}

impl Pacer for NoDelay {
    fn pause(&mut self, _interval: Duration, _cancel: &CancelToken) {
        self.pauses += 1;
    }
}

/// One role's end of the visual channel: its camera, its screen, the delay
/// between polls and the cancellation token.
pub struct VisualLink<S, D, P = ThreadPacer> {
    scanner: S,
    display: D,
    pacer: P,
    cancel: CancelToken,
    poll_interval: Duration,
}

impl<S: Scanner, D: Display, P: Pacer> VisualLink<S, D, P> {
    pub fn new(scanner: S, display: D, pacer: P, cancel: CancelToken) -> Self {
        Self {
            scanner,
            display,
            pacer,
            cancel,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Block until the scanner yields a frame, pausing between empty scans.
    pub fn next_frame(&mut self) -> Result<String, TransferError> {
        loop {
            self.check_cancelled()?;
            if let Some(text) = self.scanner.scan() {
                return Ok(text);
            }
            self.pause()?;
        }
    }

    /// Wait one poll interval.
    pub fn pause(&mut self) -> Result<(), TransferError> {
        self.pause_for(self.poll_interval)
    }

    pub fn pause_for(&mut self, interval: Duration) -> Result<(), TransferError> {
        self.pacer.pause(interval, &self.cancel);
        self.check_cancelled()
    }

    pub fn show(&mut self, text: &str, label: &str) -> Result<(), TransferError> {
        self.display.show(text, label).map_err(TransferError::Display)
    }

    pub fn clear(&mut self, label: &str) -> Result<(), TransferError> {
        self.display.clear(label).map_err(TransferError::Display)
    }

    pub fn clear_all(&mut self) -> Result<(), TransferError> {
        self.display.clear_all().map_err(TransferError::Display)
    }

    /// Clear every surface, then show `text`. Leaves exactly one surface up.
    pub fn replace(&mut self, text: &str, label: &str) -> Result<(), TransferError> {
        self.clear_all()?;
        self.show(text, label)
    }

    pub fn into_parts(self) -> (S, D, P) {
        (self.scanner, self.display, self.pacer)
    }

    fn check_cancelled(&self) -> Result<(), TransferError> {
        if self.cancel.is_cancelled() {
            Err(TransferError::Cancelled)
        } else {
            Ok(())
        }
    }
}
