use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// One of the two contact sensors on the rowing machine flywheel
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
pub enum Button {
    A,
    B,
}

impl FromStr for Button {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" => Ok(Button::A),
            "B" => Ok(Button::B),
            other => Err(Error::InvalidSymbol(other.to_string())),
        }
    }
}

/// A sensor trigger together with the time elapsed since the previous trigger
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InputEvent {
    pub button: Button,
    #[serde(with = "crate::util::serde_secs")]
    pub delay: Duration,
}

impl InputEvent {
    pub fn new(button: Button, delay: Duration) -> Self {
        Self { button, delay }
    }
}

/// Ordered record of every input a player produced during a race
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputLog {
    events: Vec<InputEvent>,
}

impl InputLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, button: Button, delay: Duration) {
        self.events.push(InputEvent { button, delay });
    }

    pub fn events(&self) -> &[InputEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Wall time covered by the log, from the first input to the last; saturates at `Duration::MAX`
    pub fn total_delay(&self) -> Duration {
        self.events
            .iter()
            .fold(Duration::ZERO, |total, e| total.saturating_add(e.delay))
    }
}

impl From<Vec<InputEvent>> for InputLog {
    fn from(events: Vec<InputEvent>) -> Self {
        Self { events }
    }
}

impl FromIterator<InputEvent> for InputLog {
    fn from_iter<I: IntoIterator<Item = InputEvent>>(iter: I) -> Self {
        Self {
            events: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a InputLog {
    type Item = &'a InputEvent;
    type IntoIter = std::slice::Iter<'a, InputEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
