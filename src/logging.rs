//! Diagnostics for a process that owns the terminal.
//!
//! Nothing may be written to stdout or stderr while the table is on
//! screen, so records go to a file or nowhere.

use log::LevelFilter;
use simplelog::{ConfigBuilder, WriteLogger};
use std::fs::OpenOptions;
use std::io;
use std::path::Path;

/// Append log records at `level` and above to `path`.
///
/// Without a call to this function the `log` macros stay no-ops.
pub fn init_file_logger(path: &Path, level: LevelFilter) -> io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let config = ConfigBuilder::new()
        .set_target_level(LevelFilter::Error)
        .set_thread_level(LevelFilter::Debug)
        .build();

    WriteLogger::init(level, config, file).map_err(|e| io::Error::new(io::ErrorKind::Other, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("lazyjson.log");

        assert!(init_file_logger(&path, LevelFilter::Info).is_err());
    }
}
