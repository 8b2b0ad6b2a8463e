//! In-memory collaborators: scripted cameras, recording screens and a
//! shared screen for running a sender and a receiver in one process.

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::link::{CancelToken, Display, FileSink, FileSource, InputFile, Scanner};

/// Camera that plays back a fixed list of scan results, then sees nothing.
#[derive(Debug, Default)]
pub struct ScriptedScanner {
    frames: VecDeque<Option<String>>,
    scans: usize,
    on_exhausted: Option<CancelToken>,
}

impl ScriptedScanner {
    pub fn new(frames: impl IntoIterator<Item = Option<String>>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            scans: 0,
            on_exhausted: None,
        }
    }

    /// Script made only of successful reads.
    pub fn from_texts<T: Into<String>>(texts: impl IntoIterator<Item = T>) -> Self {
        Self::new(texts.into_iter().map(|t| Some(t.into())))
    }

    /// Fire `cancel` once the script runs out, so a run that would otherwise
    /// wait forever ends with `Cancelled`.
    pub fn cancel_when_exhausted(mut self, cancel: CancelToken) -> Self {
        self.on_exhausted = Some(cancel);
        self
    }

    pub fn scans(&self) -> usize {
        self.scans
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl Scanner for ScriptedScanner {
    fn scan(&mut self) -> Option<String> {
        self.scans += 1;
        match self.frames.pop_front() {
            Some(frame) => frame,
            None => {
                if let Some(cancel) = &self.on_exhausted {
                    cancel.cancel();
                }
                None
            }
        }
    }
}

/// Screen that remembers everything it was asked to show.
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    visible: Vec<(String, String)>,
    shown: Vec<(String, String)>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently visible `(label, text)` pairs, oldest first.
    pub fn visible(&self) -> Vec<(String, String)> {
        self.visible.clone()
    }

    /// Every `(label, text)` ever shown, in order.
    pub fn shown(&self) -> &[(String, String)] {
        &self.shown
    }
}

impl Display for RecordingDisplay {
    fn show(&mut self, text: &str, label: &str) -> io::Result<()> {
        self.visible.retain(|(l, _)| l != label);
        self.visible.push((label.to_string(), text.to_string()));
        self.shown.push((label.to_string(), text.to_string()));
        Ok(())
    }

    fn clear(&mut self, label: &str) -> io::Result<()> {
        self.visible.retain(|(l, _)| l != label);
        Ok(())
    }

    fn clear_all(&mut self) -> io::Result<()> {
        self.visible.clear();
        Ok(())
    }
}

/// A screen one side draws on and the other side's camera reads. Clones
/// share the same surfaces; the camera sees the most recently shown one.
#[derive(Debug, Clone, Default)]
pub struct SharedScreen {
    surfaces: Arc<Mutex<Vec<(String, String)>>>,
}

impl SharedScreen {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(String, String)>> {
        self.surfaces.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Display for SharedScreen {
    fn show(&mut self, text: &str, label: &str) -> io::Result<()> {
        let mut surfaces = self.lock();
        surfaces.retain(|(l, _)| l != label);
        surfaces.push((label.to_string(), text.to_string()));
        Ok(())
    }

    fn clear(&mut self, label: &str) -> io::Result<()> {
        self.lock().retain(|(l, _)| l != label);
        Ok(())
    }

    fn clear_all(&mut self) -> io::Result<()> {
        self.lock().clear();
        Ok(())
    }
}

impl Scanner for SharedScreen {
    fn scan(&mut self) -> Option<String> {
        self.lock().last().map(|(_, text)| text.clone())
    }
}

/// File source holding at most one pre-picked file.
#[derive(Debug, Default)]
pub struct MemorySource(Option<InputFile>);

impl MemorySource {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self(Some(InputFile {
            name: name.into(),
            bytes: bytes.into(),
        }))
    }

    /// A source where the user cancels the picker.
    pub fn empty() -> Self {
        Self(None)
    }
}

impl FileSource for MemorySource {
    fn pick_input(&mut self) -> io::Result<Option<InputFile>> {
        Ok(self.0.take())
    }
}

/// A file handed to `MemorySink::write`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

/// File sink that keeps written files in memory.
#[derive(Debug)]
pub struct MemorySink {
    dir: PathBuf,
    fail_writes: bool,
    saved: Vec<SavedFile>,
}

impl MemorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            fail_writes: false,
            saved: Vec::new(),
        }
    }

    /// Every write fails with a permission error.
    pub fn failing(dir: impl Into<PathBuf>) -> Self {
        Self {
            fail_writes: true,
            ..Self::new(dir)
        }
    }

    pub fn saved(&self) -> &[SavedFile] {
        &self.saved
    }
}

impl FileSink for MemorySink {
    fn pick_output_dir(&mut self) -> io::Result<PathBuf> {
        Ok(self.dir.clone())
    }

    fn write(&mut self, dir: &Path, name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only sink"));
        }
        let path = dir.join(name);
        self.saved.push(SavedFile {
            path: path.clone(),
            bytes: bytes.to_vec(),
        });
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_screen_shows_latest_surface() {
        let mut screen = SharedScreen::new();
        let mut camera = screen.clone();
        assert_eq!(camera.scan(), None);
        screen.show("first", "a").unwrap();
        screen.show("second", "b").unwrap();
        assert_eq!(camera.scan().as_deref(), Some("second"));
        screen.clear("b").unwrap();
        assert_eq!(camera.scan().as_deref(), Some("first"));
        screen.clear_all().unwrap();
        assert_eq!(camera.scan(), None);
    }

    #[test]
    fn scripted_scanner_counts_and_cancels() {
        let cancel = CancelToken::new();
        let mut scanner = ScriptedScanner::from_texts(["x"]).cancel_when_exhausted(cancel.clone());
        assert_eq!(scanner.scan().as_deref(), Some("x"));
        assert!(!cancel.is_cancelled());
        assert_eq!(scanner.scan(), None);
        assert!(cancel.is_cancelled());
        assert_eq!(scanner.scans(), 2);
    }
}
