//! Directory-backed screen and camera.
//!
//! A displayed surface is a `<label>.qr` file holding the QR text. The
//! scanner on the other side reads the most recently written one, which
//! lets two processes (or two machines sharing a directory) run the real
//! protocol without QR hardware.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use camlink_protocol::{Display, Scanner};
use tracing::trace;

const SURFACE_EXT: &str = "qr";

fn surface_file(dir: &Path, label: &str) -> PathBuf {
    let slug: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    dir.join(format!("{slug}.{SURFACE_EXT}"))
}

fn is_surface(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == SURFACE_EXT)
}

pub struct SpoolDisplay {
    dir: PathBuf,
}

impl SpoolDisplay {
    /// Creates the directory and removes surfaces left by an earlier run.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let mut display = Self { dir };
        display.clear_all()?;
        Ok(display)
    }
}

impl Display for SpoolDisplay {
    fn show(&mut self, text: &str, label: &str) -> io::Result<()> {
        let path = surface_file(&self.dir, label);
        // Write then rename so the scanner never sees half a code.
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &path)?;
        trace!("showing {} ({} chars)", path.display(), text.len());
        Ok(())
    }

    fn clear(&mut self, label: &str) -> io::Result<()> {
        match fs::remove_file(surface_file(&self.dir, label)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    fn clear_all(&mut self) -> io::Result<()> {
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if is_surface(&path) {
                match fs::remove_file(&path) {
                    Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

pub struct SpoolScanner {
    dir: PathBuf,
}

impl SpoolScanner {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn newest_surface(&self) -> io::Result<Option<PathBuf>> {
        let mut newest: Option<(SystemTime, PathBuf)> = None;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if !is_surface(&path) {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            if newest.as_ref().is_none_or(|(t, p)| (modified, &path) > (*t, p)) {
                newest = Some((modified, path));
            }
        }
        Ok(newest.map(|(_, path)| path))
    }
}

impl Scanner for SpoolScanner {
    fn scan(&mut self) -> Option<String> {
        // Anything unreadable counts as "no code in view"; the peer may
        // not have created its directory yet or may be mid-clear.
        let path = match self.newest_surface() {
            Ok(path) => path?,
            Err(e) => {
                trace!("scan of {} failed: {}", self.dir.display(), e);
                return None;
            }
        };
        match fs::read_to_string(&path) {
            Ok(text) if !text.is_empty() => Some(text),
            Ok(_) => None,
            Err(e) => {
                trace!("read of {} failed: {}", path.display(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("camlink-spool-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn shown_text_is_scanned_and_cleared() {
        let dir = temp_dir("show");
        let mut display = SpoolDisplay::open(&dir).unwrap();
        let mut scanner = SpoolScanner::new(&dir);

        assert_eq!(scanner.scan(), None);
        display.show("{\"id\":1}", "chunk 1").unwrap();
        assert!(dir.join("chunk-1.qr").exists());
        assert_eq!(scanner.scan().as_deref(), Some("{\"id\":1}"));

        display.clear("chunk 1").unwrap();
        assert_eq!(scanner.scan(), None);
        // Clearing twice is fine.
        display.clear("chunk 1").unwrap();

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn open_wipes_stale_surfaces() {
        let dir = temp_dir("stale");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("ack-4.qr"), "old").unwrap();
        fs::write(dir.join("notes.txt"), "keep").unwrap();

        let mut display = SpoolDisplay::open(&dir).unwrap();
        assert!(!dir.join("ack-4.qr").exists());
        assert!(dir.join("notes.txt").exists());

        display.show("a", "x").unwrap();
        display.show("b", "y").unwrap();
        display.clear_all().unwrap();
        assert_eq!(SpoolScanner::new(&dir).scan(), None);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_directory_scans_nothing() {
        let mut scanner = SpoolScanner::new(temp_dir("absent"));
        assert_eq!(scanner.scan(), None);
    }
}
