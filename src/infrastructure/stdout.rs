use crate::domain::log::LogRecord;
use crate::domain::ports::LogAdapter;
use anyhow::Result;
use async_trait::async_trait;
use std::io::Write;

/// Dry-run log destination: one JSON object per record on stdout
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutLogAdapter;

impl StdoutLogAdapter {
    pub fn new() -> Self {
        Self
    }

    fn render(log: &LogRecord) -> Result<String> {
        Ok(serde_json::to_string(log)?)
    }
}

#[async_trait]
impl LogAdapter for StdoutLogAdapter {
    async fn post_log(&self, log: LogRecord) -> Result<()> {
        let line = Self::render(&log)?;
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", line)?;
        Ok(())
    }
}
