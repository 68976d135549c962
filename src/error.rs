use std::{io, path::PathBuf};

use thiserror::Error;



///
/// Errors which may occur while gathering the inputs of the analysis.
///
/// Malformed lines inside otherwise readable inputs are never errors; they
/// are skipped where they are parsed.
///
#[derive(Error, Debug)]
pub enum Error
{
        #[error("could not read {path:?}: {source}")]
        Io
        {
            path:   PathBuf,
            #[source]
            source: io::Error,
        },

        #[error("not a valid ELF: {0}")]
        NotElf(String),

        #[error("unknown architecture signature ({0}); please use -cross")]
        UnknownArchitecture(String),

        #[error("could not run `{tool}`: {source}")]
        Spawn
        {
            tool:   String,
            #[source]
            source: io::Error,
        },

        #[error("`{tool}` exited with {status}: {stderr}")]
        Tool
        {
            tool:   String,
            status: String,
            stderr: String,
        },

        #[error("walking the stack usage directory failed: {0}")]
        Walk(#[from] walkdir::Error),
}

impl Error
{
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self
    {
        Error::Io { path: path.into(), source }
    }
}
