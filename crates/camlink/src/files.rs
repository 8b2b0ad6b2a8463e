//! Filesystem stand-ins for the file picker and the folder picker.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use camlink_protocol::{FileSink, FileSource, InputFile};

/// Reads the file named on the command line (or in the environment).
pub struct PathSource {
    path: Option<PathBuf>,
}

impl PathSource {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

impl FileSource for PathSource {
    fn pick_input(&mut self) -> io::Result<Option<InputFile>> {
        let Some(path) = &self.path else {
            return Ok(None);
        };
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Ok(Some(InputFile { name, bytes }))
    }
}

/// Writes into a fixed directory, creating it when needed.
pub struct DirSink {
    dir: PathBuf,
}

impl DirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl FileSink for DirSink {
    fn pick_output_dir(&mut self) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        Ok(self.dir.clone())
    }

    fn write(&mut self, dir: &Path, name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = dir.join(name);
        fs::write(&path, bytes)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_without_path_picks_nothing() {
        assert!(PathSource::new(None).pick_input().unwrap().is_none());
    }

    #[test]
    fn source_and_sink_on_disk() {
        let root = std::env::temp_dir().join(format!("camlink-files-{}", std::process::id()));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(&root).unwrap();
        let input = root.join("hi.txt");
        fs::write(&input, b"hello world!").unwrap();

        let picked = PathSource::new(Some(input)).pick_input().unwrap().unwrap();
        assert_eq!(picked.name, "hi.txt");
        assert_eq!(picked.bytes, b"hello world!");

        let mut sink = DirSink::new(root.join("out"));
        let dir = sink.pick_output_dir().unwrap();
        let path = sink.write(&dir, &picked.name, &picked.bytes).unwrap();
        assert_eq!(path, root.join("out").join("hi.txt"));
        assert_eq!(fs::read(&path).unwrap(), b"hello world!");

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn missing_input_is_an_error() {
        let mut source = PathSource::new(Some(PathBuf::from("/nonexistent/camlink/input.bin")));
        assert!(source.pick_input().is_err());
    }
}
