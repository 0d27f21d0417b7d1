//! Timed playback of recorded input.
//!
//! A [`Replay`] is a scheduled task over one [`InputLog`]. It never sleeps on
//! its own: whoever drives the race asks [`Replay::next_due`] how long it may
//! wait, then calls [`Replay::advance`] with the current session time. Every
//! entry is handed to the target decoder stamped with its scheduled time, so
//! the replayed decoder sees exactly the recorded delays no matter how late the
//! poll happened.

use crate::config::DecoderConfig;
use crate::decoder::{Role, StrokeDecoder, Transition};
use crate::input::InputLog;
use crate::listener::RowListener;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayStatus {
    Pending,
    Running,
    Finished,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct Replay {
    log: InputLog,
    cursor: usize,
    /// session time at which the entry under `cursor` fires
    next_at: Duration,
    status: ReplayStatus,
}

impl Replay {
    pub fn new(log: InputLog) -> Self {
        Self {
            log,
            cursor: 0,
            next_at: Duration::ZERO,
            status: ReplayStatus::Pending,
        }
    }

    pub fn status(&self) -> ReplayStatus {
        self.status
    }

    pub fn log(&self) -> &InputLog {
        &self.log
    }

    /// Entries still waiting to be played
    pub fn remaining(&self) -> usize {
        self.log.len() - self.cursor
    }

    pub fn is_done(&self) -> bool {
        matches!(self.status, ReplayStatus::Finished | ReplayStatus::Cancelled)
    }

    /// Schedules the log against the session clock, beginning at `now`
    pub fn start(&mut self, now: Duration) {
        if self.status != ReplayStatus::Pending {
            return;
        }
        match self.log.events().first() {
            Some(first) => match now.checked_add(first.delay) {
                Some(due) => {
                    self.next_at = due;
                    self.status = ReplayStatus::Running;
                }
                None => self.finish_unreachable(),
            },
            None => self.status = ReplayStatus::Finished,
        }
    }

    /// Abandons whatever has not been played yet
    pub fn cancel(&mut self) {
        if !self.is_done() {
            tracing::debug!(remaining = self.remaining(), "replay cancelled");
            self.status = ReplayStatus::Cancelled;
        }
    }

    /// Session time of the next entry, if the replay is running
    pub fn next_due(&self) -> Option<Duration> {
        (self.status == ReplayStatus::Running).then_some(self.next_at)
    }

    /// Plays every entry due at or before `now` into `target`
    pub fn advance<L: RowListener>(
        &mut self,
        now: Duration,
        target: &mut StrokeDecoder<L>,
    ) -> Vec<Transition> {
        let mut played = Vec::new();
        while self.status == ReplayStatus::Running && self.next_at <= now {
            let event = self.log.events()[self.cursor];
            played.push(target.process_input(event.button, self.next_at, true));
            self.cursor += 1;

            match self.log.events().get(self.cursor) {
                Some(next) => match self.next_at.checked_add(next.delay) {
                    Some(due) => self.next_at = due,
                    None => self.finish_unreachable(),
                },
                None => self.status = ReplayStatus::Finished,
            }
        }
        played
    }

    /// The next entry lies past the end of representable time; nothing more will play
    fn finish_unreachable(&mut self) {
        tracing::warn!(remaining = self.remaining(), "replay delay overflows the clock");
        self.status = ReplayStatus::Finished;
    }
}

/// Plays a whole log into `target` without waiting, starting at session time zero
pub fn replay_all<L: RowListener>(log: &InputLog, target: &mut StrokeDecoder<L>) -> Vec<Transition> {
    let mut replay = Replay::new(log.clone());
    replay.start(Duration::ZERO);
    let end = log.total_delay();
    replay.advance(end, target)
}

/// A past session racing alongside the local player
#[derive(Debug)]
pub struct Ghost<L: RowListener = ()> {
    pub name: String,
    pub color: String,
    replay: Replay,
    decoder: StrokeDecoder<L>,
}

impl Ghost<()> {
    pub fn new(name: impl Into<String>, color: impl Into<String>, log: InputLog, config: DecoderConfig) -> Self {
        Self::with_listener(name, color, log, config, ())
    }
}

impl<L: RowListener> Ghost<L> {
    pub fn with_listener(
        name: impl Into<String>,
        color: impl Into<String>,
        log: InputLog,
        config: DecoderConfig,
        listener: L,
    ) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
            replay: Replay::new(log),
            decoder: StrokeDecoder::new(config, Role::Ghost, listener),
        }
    }

    pub fn replay(&self) -> &Replay {
        &self.replay
    }

    pub fn decoder(&self) -> &StrokeDecoder<L> {
        &self.decoder
    }

    pub fn start(&mut self, now: Duration) {
        tracing::info!(ghost = %self.name, inputs = self.replay.log().len(), "ghost starting");
        self.replay.start(now);
    }

    pub fn cancel(&mut self) {
        self.replay.cancel();
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.replay.next_due()
    }

    pub fn advance(&mut self, now: Duration) -> Vec<Transition> {
        self.replay.advance(now, &mut self.decoder)
    }
}
