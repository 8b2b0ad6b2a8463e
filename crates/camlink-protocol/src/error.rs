use std::io;
use std::path::PathBuf;

use crate::codec::CodecError;

/// Errors that end a sender or receiver run.
///
/// Channel noise never shows up here: undecodable frames, stray
/// acknowledgments and duplicate chunks are absorbed by the polling loops.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("transfer cancelled")]
    Cancelled,
    #[error("no input file selected")]
    NoInputSelected,
    #[error("cannot read input: {0}")]
    Read(#[source] io::Error),
    #[error("cannot choose output directory: {0}")]
    OutputDir(#[source] io::Error),
    #[error("cannot encode chunk {id}: {source}")]
    Encode {
        id: u64,
        #[source]
        source: CodecError,
    },
    #[error("display failed: {0}")]
    Display(#[source] io::Error),
    #[error("cannot save {}: {source}", path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl TransferError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
