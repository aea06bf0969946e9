//! Append-only trace file for RPC-level debugging.
//!
//! Independent of both the `log` facade and fake mode: operators point the
//! client at a file and get one timestamped line per protocol event,
//! whatever logger the host application wired up. Sink failures degrade to
//! a warning; they never abort the operation being traced.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use log::warn;

/// Shared handle to a trace file.
#[derive(Debug, Clone)]
pub struct TraceLog {
    path: Arc<PathBuf>,
}

impl TraceLog {
    /// Trace to the given file, created on first event.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
        }
    }

    /// Append one timestamped event line, best-effort.
    pub fn record(&self, event: &str) {
        let line = format!(
            "{} {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            event
        );
        if let Err(e) = append(&self.path, &line) {
            warn!("trace file {}: {}", self.path.display(), e);
        }
    }

    /// Path this handle traces to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn append(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_appends_timestamped_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.log");
        let trace = TraceLog::new(&path);

        trace.record("netconf connect fw0.example.net:830");
        trace.record("candidate lock acquired");

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("netconf connect fw0.example.net:830"));
        assert!(lines[1].ends_with("candidate lock acquired"));
        // Lines lead with a date: "2026-01-01 ..."
        assert_eq!(lines[0].as_bytes()[4], b'-');
    }

    #[test]
    fn test_record_to_unwritable_path_does_not_panic() {
        let trace = TraceLog::new("/nonexistent-dir/trace.log");
        trace.record("dropped on the floor");
    }
}
