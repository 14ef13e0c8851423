//! Ingest progress reporting.
//!
//! `ragbox ingest` reports which phase it is in and how many files are left.
//! Progress goes to **stderr** so the `[created]` / `[updated]` lines and the
//! summary on stdout stay parseable.

use std::io::Write;

/// One progress event from the ingest pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IngestProgressEvent {
    /// Walking the source directory. Total unknown.
    Scanning { dir: String },
    /// `n` of `total` files pushed through the coordinator.
    Uploading { n: u64, total: u64 },
    /// Sending the keep-set to the server.
    Reconciling { keep: u64 },
}

pub trait IngestProgressReporter: Send + Sync {
    fn report(&self, event: IngestProgressEvent);
}

/// Human progress on stderr: `ingest  uploading  1,234 / 5,000 files`.
pub struct StderrProgress;

impl IngestProgressReporter for StderrProgress {
    fn report(&self, event: IngestProgressEvent) {
        let line = match &event {
            IngestProgressEvent::Scanning { dir } => format!("ingest  scanning {}...\n", dir),
            IngestProgressEvent::Uploading { n, total } => format!(
                "ingest  uploading  {} / {} files\n",
                format_number(*n),
                format_number(*total)
            ),
            IngestProgressEvent::Reconciling { keep } => format!(
                "ingest  reconciling  keeping {} documents\n",
                format_number(*keep)
            ),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// One JSON object per line on stderr.
pub struct JsonProgress;

impl JsonProgress {
    fn to_json(event: &IngestProgressEvent) -> serde_json::Value {
        match event {
            IngestProgressEvent::Scanning { dir } => serde_json::json!({
                "event": "progress",
                "phase": "scanning",
                "dir": dir
            }),
            IngestProgressEvent::Uploading { n, total } => serde_json::json!({
                "event": "progress",
                "phase": "uploading",
                "n": n,
                "total": total
            }),
            IngestProgressEvent::Reconciling { keep } => serde_json::json!({
                "event": "progress",
                "phase": "reconciling",
                "keep": keep
            }),
        }
    }
}

impl IngestProgressReporter for JsonProgress {
    fn report(&self, event: IngestProgressEvent) {
        if let Ok(line) = serde_json::to_string(&Self::to_json(&event)) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

pub struct NoProgress;

impl IngestProgressReporter for NoProgress {
    fn report(&self, _event: IngestProgressEvent) {}
}

pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `--progress` value.
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn IngestProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_groups_thousands() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(12_345), "12,345");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn json_events_carry_phase() {
        let v = JsonProgress::to_json(&IngestProgressEvent::Uploading { n: 3, total: 10 });
        assert_eq!(v["phase"], "uploading");
        assert_eq!(v["n"], 3);
        assert_eq!(v["total"], 10);

        let v = JsonProgress::to_json(&IngestProgressEvent::Reconciling { keep: 7 });
        assert_eq!(v["phase"], "reconciling");
        assert_eq!(v["keep"], 7);
    }
}
