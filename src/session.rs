use crate::input::InputLog;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A finished race, kept so it can be raced against later
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecordedSession {
    pub distance: f64,
    pub date: DateTime<Local>,
    #[serde(with = "crate::util::serde_millis")]
    pub duration: Duration,
    pub input: InputLog,
}

impl RecordedSession {
    pub fn new(distance: f64, duration: Duration, date: DateTime<Local>, input: InputLog) -> Self {
        Self {
            distance,
            date,
            duration,
            input,
        }
    }
}
