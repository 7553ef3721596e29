use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use stat_arb_core::backtest::{NullReporter, RunReporter};

/// Writes the run narrative to a log file, optionally echoing each line to
/// stderr. The file is flushed and closed when the reporter is dropped.
pub struct LogFileReporter {
    path: PathBuf,
    writer: BufWriter<File>,
    echo: bool,
}

impl LogFileReporter {
    pub fn create(path: &str, echo: bool) -> Result<Self, Box<dyn std::error::Error>> {
        let path = PathBuf::from(path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create '{}': {}", parent.display(), e))?;
        }
        let file = File::create(&path)
            .map_err(|e| format!("Failed to open log file '{}': {}", path.display(), e))?;
        tracing::debug!(path = %path.display(), "opened log file");
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            echo,
        })
    }
}

impl RunReporter for LogFileReporter {
    fn record(&mut self, line: &str) {
        if self.echo {
            eprintln!("{line}");
        }
        if let Err(e) = writeln!(self.writer, "{line}") {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to write log line");
        }
    }
}

impl Drop for LogFileReporter {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to flush log file");
        }
    }
}

/// Echoes the narrative to stderr without keeping a file.
pub struct ConsoleReporter;

impl RunReporter for ConsoleReporter {
    fn record(&mut self, line: &str) {
        eprintln!("{line}");
    }
}

pub fn open_reporter(
    log_file: Option<&str>,
    echo: bool,
) -> Result<Box<dyn RunReporter>, Box<dyn std::error::Error>> {
    Ok(match (log_file, echo) {
        (Some(path), echo) => Box::new(LogFileReporter::create(path, echo)?),
        (None, true) => Box::new(ConsoleReporter),
        (None, false) => Box::new(NullReporter),
    })
}
