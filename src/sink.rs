//! Result Sink
//!
//! Delivery contract for the finished text: a sink receives the final string
//! unmodified plus minimal run metadata. Formatting beyond the report header
//! is a presentation concern left to implementations.

use crate::error::SinkError;
use chrono::Local;
use std::path::PathBuf;
use tracing::info;

/// Final text plus the minimal metadata a sink may surface.
#[derive(Debug, Clone)]
pub struct DeliveryRecord<'a> {
    pub text: &'a str,
    pub target: &'a str,
    pub ticket_count: usize,
}

/// Persists or displays the final text. Implementations must pass
/// `record.text` through byte-for-byte.
pub trait ResultSink: Send + Sync {
    /// Deliver the record; returns a short description of where it went.
    fn deliver(&self, record: &DeliveryRecord<'_>) -> Result<String, SinkError>;
}

/// Writes each result as a report file under a directory.
pub struct FileSink {
    directory: PathBuf,
    filename: Option<String>,
}

impl FileSink {
    pub fn new(directory: PathBuf) -> Self {
        Self {
            directory,
            filename: None,
        }
    }

    pub fn with_filename(directory: PathBuf, filename: String) -> Self {
        Self {
            directory,
            filename: Some(filename),
        }
    }

    fn resolve_filename(&self, target: &str) -> String {
        match &self.filename {
            Some(name) => name.clone(),
            None => format!("phishing_email_{}.txt", sanitize_target(target)),
        }
    }
}

impl ResultSink for FileSink {
    fn deliver(&self, record: &DeliveryRecord<'_>) -> Result<String, SinkError> {
        let path = self.directory.join(self.resolve_filename(record.target));

        let mut report = String::new();
        report.push_str("PHISHING EMAIL GENERATOR RESULTS\n");
        report.push_str(&"=".repeat(50));
        report.push_str("\n\n");
        report.push_str(&format!("Target Email: {}\n", record.target));
        report.push_str(&format!(
            "Generated on: {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ));
        report.push_str(&format!("JIRA Tickets Used: {}\n", record.ticket_count));
        report.push_str(&"=".repeat(50));
        report.push_str("\n\n");
        report.push_str("GENERATED PHISHING EMAIL:\n");
        report.push_str(&"-".repeat(30));
        report.push('\n');
        report.push_str(record.text);
        report.push('\n');

        std::fs::write(&path, report).map_err(|e| SinkError::Write {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "Result saved");
        Ok(format!("saved to {}", path.display()))
    }
}

/// Make a target identity safe for use in a filename.
fn sanitize_target(target: &str) -> String {
    target
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_target() {
        assert_eq!(sanitize_target("d.mau@example.com"), "d_mau_example_com");
    }

    #[test]
    fn test_file_sink_writes_body_unmodified() {
        let temp = TempDir::new().unwrap();
        let sink = FileSink::new(temp.path().to_path_buf());
        let body = "Subject: Review needed\n\nClick https://x.ly/abc today.";

        let record = DeliveryRecord {
            text: body,
            target: "d.mau@example.com",
            ticket_count: 3,
        };
        let description = sink.deliver(&record).unwrap();
        assert!(description.contains("phishing_email_d_mau_example_com.txt"));

        let written =
            std::fs::read_to_string(temp.path().join("phishing_email_d_mau_example_com.txt"))
                .unwrap();
        assert!(written.contains(body));
        assert!(written.contains("Target Email: d.mau@example.com"));
        assert!(written.contains("JIRA Tickets Used: 3"));
    }

    #[test]
    fn test_file_sink_honors_filename_override() {
        let temp = TempDir::new().unwrap();
        let sink = FileSink::with_filename(temp.path().to_path_buf(), "out.txt".to_string());

        let record = DeliveryRecord {
            text: "body",
            target: "t@example.com",
            ticket_count: 0,
        };
        sink.deliver(&record).unwrap();
        assert!(temp.path().join("out.txt").exists());
    }

    #[test]
    fn test_file_sink_missing_directory_errors() {
        let temp = TempDir::new().unwrap();
        let sink = FileSink::new(temp.path().join("absent"));

        let record = DeliveryRecord {
            text: "body",
            target: "t@example.com",
            ticket_count: 0,
        };
        assert!(matches!(
            sink.deliver(&record),
            Err(SinkError::Write { .. })
        ));
    }
}
