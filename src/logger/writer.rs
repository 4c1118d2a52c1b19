//! Access log writer module
//!
//! Access log lines go to a file (append mode) or stdout. Diagnostics are
//! handled by `tracing` and never pass through here.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, OnceLock, PoisonError};

/// Global access log writer
static ACCESS_WRITER: OnceLock<AccessWriter> = OnceLock::new();

/// Access log output target
enum LogTarget {
    Stdout,
    File(Mutex<File>),
}

/// Thread-safe access log writer
pub struct AccessWriter {
    target: LogTarget,
}

impl AccessWriter {
    fn new(access_log_file: Option<&str>) -> io::Result<Self> {
        let target = match access_log_file {
            Some(path) => LogTarget::File(Mutex::new(open_log_file(path)?)),
            None => LogTarget::Stdout,
        };
        Ok(Self { target })
    }

    pub fn write(&self, line: &str) {
        match &self.target {
            LogTarget::Stdout => {
                println!("{line}");
            }
            LogTarget::File(file) => {
                // A poisoned lock still guards a usable file
                let mut f = file.lock().unwrap_or_else(PoisonError::into_inner);
                if let Err(e) = writeln!(f, "{line}") {
                    tracing::warn!(error = %e, "failed to write access log line");
                }
            }
        }
    }
}

/// Open or create a log file for appending, creating parent directories
fn open_log_file(path: &str) -> io::Result<File> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}

/// Initialize the global access log writer
///
/// Returns an error if the log file cannot be opened or the writer was
/// already initialized.
pub fn init(access_log_file: Option<&str>) -> io::Result<()> {
    let writer = AccessWriter::new(access_log_file)?;
    ACCESS_WRITER.set(writer).map_err(|_| {
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            "access log writer already initialized",
        )
    })
}

/// Get the global writer, if initialized
pub fn get() -> Option<&'static AccessWriter> {
    ACCESS_WRITER.get()
}
