/// Receives the human-readable narrative of a run, one line at a time.
///
/// A reporter is handed to a run explicitly and owned by the caller, so it
/// is opened before the run starts and closed (dropped) after it returns.
pub trait RunReporter {
    fn record(&mut self, line: &str);
}

/// Discards every line.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl RunReporter for NullReporter {
    fn record(&mut self, _line: &str) {}
}

/// In-memory capture.
impl RunReporter for Vec<String> {
    fn record(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

impl<R: RunReporter + ?Sized> RunReporter for &mut R {
    fn record(&mut self, line: &str) {
        (**self).record(line)
    }
}
