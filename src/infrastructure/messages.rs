/// Collects the human-readable warnings emitted for skipped rows, for the
/// caller to inspect once an import run finishes.
#[derive(Debug, Default)]
pub struct MessageAggregator {
    warnings: Vec<String>,
}

impl MessageAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Drains the collected warnings, leaving the aggregator empty.
    pub fn consume_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }
}
