use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportState {
    #[default]
    Running,
    Done,
    Failed,
}

impl ImportState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "done" => Self::Done,
            "failed" => Self::Failed,
            _ => Self::Running,
        }
    }
}

/// One run of the registry import with its counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportLog {
    #[serde(default)]
    pub id: i64,
    /// Tag of the imported data set, usually the export date (`YYYYMMDD`).
    pub name: String,
    pub state: ImportState,
    pub start_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    pub files: u32,
    pub file_count: u32,
    pub rows: u64,
    pub towns: u64,
    pub streets: u64,
    pub numbers: u64,
    pub warnings: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ImportLog {
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            state: ImportState::Running,
            start_date: Utc::now(),
            end_date: None,
            files: 0,
            file_count: 0,
            rows: 0,
            towns: 0,
            streets: 0,
            numbers: 0,
            warnings: 0,
            error_message: None,
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        self.end_date.map(|end| end - self.start_date)
    }

    /// `"files / file_count (NN%)"`.
    pub fn progress(&self) -> String {
        let percentage = if self.file_count > 0 {
            f64::from(self.files) / f64::from(self.file_count) * 100.0
        } else {
            0.0
        };
        format!("{} / {} ({percentage:.0}%)", self.files, self.file_count)
    }

    /// Remaining time extrapolated from processed files. Empty unless running.
    pub fn eta(&self, now: DateTime<Utc>) -> String {
        if self.state != ImportState::Running || self.end_date.is_some() {
            return String::new();
        }
        if self.file_count == 0 || self.files == 0 || self.files > self.file_count {
            return "Estimating...".to_string();
        }

        let elapsed = (now - self.start_date).num_seconds().max(0) as f64;
        let progress = f64::from(self.files) / f64::from(self.file_count);
        let remaining = elapsed / progress - elapsed;
        if remaining <= 0.0 {
            return "About to complete".to_string();
        }

        let remaining = remaining as u64;
        format!("{}h {}m", remaining / 3600, (remaining % 3600) / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress() {
        let mut log = ImportLog::start("20250131");
        assert_eq!(log.progress(), "0 / 0 (0%)");
        log.files = 1;
        log.file_count = 4;
        assert_eq!(log.progress(), "1 / 4 (25%)");
    }

    #[test]
    fn test_eta() {
        let mut log = ImportLog::start("20250131");
        let now = log.start_date + Duration::minutes(30);
        assert_eq!(log.eta(now), "Estimating...");

        log.file_count = 4;
        log.files = 1;
        // 30 minutes for a quarter leaves 90 minutes.
        assert_eq!(log.eta(now), "1h 30m");

        log.files = 4;
        assert_eq!(log.eta(now), "About to complete");

        log.state = ImportState::Done;
        assert_eq!(log.eta(now), "");
    }

    #[test]
    fn test_duration() {
        let mut log = ImportLog::start("x");
        assert!(log.duration().is_none());
        log.end_date = Some(log.start_date + Duration::seconds(90));
        assert_eq!(log.duration().map(|d| d.num_seconds()), Some(90));
    }
}
