use crate::config::{Config, DecoderConfig};
use crate::decoder::{Role, StrokeDecoder, Transition};
use crate::error::Result;
use crate::listener::RowListener;
use crate::replay::Ghost;
use crate::session::RecordedSession;
use chrono::{DateTime, Local};
use std::time::Duration;

/// Slack for the finish check; ten 0.1 increments sum to just under 1.0
const FINISH_EPSILON: f64 = 1e-9;

/// One race: the local rower, any ghosts, and the race clock.
///
/// All times are session times, i.e. durations since an arbitrary epoch picked
/// by the caller (usually the moment the program started listening).
#[derive(Debug)]
pub struct Race<L: RowListener> {
    finish_distance: f64,
    decoder_config: DecoderConfig,
    local: StrokeDecoder<L>,
    ghosts: Vec<Ghost>,
    started_at: Option<Duration>,
    finished_at: Option<Duration>,
}

impl<L: RowListener> Race<L> {
    pub fn new(config: &Config, listener: L) -> Self {
        let decoder_config = DecoderConfig::from(config);
        Self {
            finish_distance: config.finish_distance,
            decoder_config,
            local: StrokeDecoder::new(decoder_config, Role::Local, listener),
            ghosts: Vec::new(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Adds a competitor replaying `session`; it starts with the local rower's first input
    pub fn add_ghost(&mut self, name: &str, color: &str, session: &RecordedSession) {
        self.ghosts.push(Ghost::new(
            name,
            color,
            session.input.clone(),
            self.decoder_config,
        ));
    }

    pub fn local(&self) -> &StrokeDecoder<L> {
        &self.local
    }

    pub fn local_mut(&mut self) -> &mut StrokeDecoder<L> {
        &mut self.local
    }

    pub fn ghosts(&self) -> &[Ghost] {
        &self.ghosts
    }

    pub fn finish_distance(&self) -> f64 {
        self.finish_distance
    }

    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    /// Race clock; stops once the local rower crosses the line
    pub fn elapsed(&self, now: Duration) -> Duration {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => end.saturating_sub(start),
            (Some(start), None) => now.saturating_sub(start),
            _ => Duration::ZERO,
        }
    }

    /// Handles one symbol from the machine; input after the finish is ignored
    pub fn on_symbol(&mut self, symbol: &str, now: Duration) -> Result<Option<Transition>> {
        if self.is_finished() {
            return Ok(None);
        }

        let transition = self.local.process_symbol(symbol, now, false)?;

        if transition.race_started {
            tracing::info!(ghosts = self.ghosts.len(), "race started");
            self.started_at = Some(now);
            for ghost in &mut self.ghosts {
                ghost.start(now);
            }
        }

        self.advance_ghosts(now);

        if self.local.state().distance + FINISH_EPSILON >= self.finish_distance {
            tracing::info!(
                strokes = self.local.state().stroke_count,
                "crossed the finish line"
            );
            self.finished_at = Some(now);
            for ghost in &mut self.ghosts {
                ghost.cancel();
            }
        }

        Ok(Some(transition))
    }

    /// Lets the ghosts catch up with the clock
    pub fn on_tick(&mut self, now: Duration) {
        if self.is_started() && !self.is_finished() {
            self.advance_ghosts(now);
        }
    }

    /// Earliest session time at which a ghost wants to be polled
    pub fn next_wake(&self) -> Option<Duration> {
        self.ghosts.iter().filter_map(Ghost::next_due).min()
    }

    /// Distances covered so far, local rower first
    pub fn standings(&self) -> Vec<(&str, f64)> {
        std::iter::once(("you", self.local.state().distance))
            .chain(
                self.ghosts
                    .iter()
                    .map(|g| (g.name.as_str(), g.decoder().state().distance)),
            )
            .collect()
    }

    /// The session to keep, if the race was completed
    pub fn recorded_session(&self, date: DateTime<Local>) -> Option<RecordedSession> {
        let duration = self.finished_at?.saturating_sub(self.started_at?);
        Some(RecordedSession::new(
            self.finish_distance,
            duration,
            date,
            self.local.input_log().clone(),
        ))
    }

    /// Stops every ghost; used when the race is thrown away before the finish
    pub fn abandon(&mut self) {
        for ghost in &mut self.ghosts {
            ghost.cancel();
        }
    }

    fn advance_ghosts(&mut self, now: Duration) {
        for ghost in &mut self.ghosts {
            ghost.advance(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::input::{Button, InputEvent, InputLog};
    use crate::listener::RowSignal;
    use crate::replay::ReplayStatus;
    use assert_matches::assert_matches;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn short_race() -> Race<Vec<RowSignal>> {
        let config = Config {
            finish_distance: 0.3,
            ..Config::default()
        };
        Race::new(&config, Vec::new())
    }

    fn alternating(n: usize, gap_ms: u64) -> InputLog {
        (0..n)
            .map(|i| {
                let button = if i % 2 == 0 { Button::A } else { Button::B };
                let delay = if i == 0 { Duration::ZERO } else { ms(gap_ms) };
                InputEvent::new(button, delay)
            })
            .collect()
    }

    fn ghost_session(log: InputLog) -> RecordedSession {
        RecordedSession::new(0.3, log.total_delay(), Local::now(), log)
    }

    #[test]
    fn test_race_starts_on_first_input() {
        let mut race = short_race();
        assert!(!race.is_started());
        assert_eq!(race.elapsed(ms(500)), Duration::ZERO);

        race.on_symbol("A", ms(2_000)).unwrap();
        assert!(race.is_started());
        assert_eq!(race.elapsed(ms(2_750)), ms(750));
        assert_eq!(race.local().listener()[0], RowSignal::RaceStart);
    }

    #[test]
    fn test_invalid_symbol_is_reported_and_dropped() {
        let mut race = short_race();
        assert_matches!(race.on_symbol("X", ms(0)), Err(Error::InvalidSymbol(_)));
        assert!(!race.is_started());
        assert!(race.local().input_log().is_empty());
    }

    #[test]
    fn test_finish_produces_session() {
        let mut race = short_race();
        for (i, s) in ["A", "B", "A", "B", "A"].iter().enumerate() {
            race.on_symbol(s, ms(1_000 + i as u64 * 400)).unwrap();
        }

        assert!(race.is_finished());
        assert!(race.on_symbol("B", ms(9_000)).unwrap().is_none());
        assert_eq!(race.elapsed(ms(60_000)), ms(1_600));

        let session = race.recorded_session(Local::now()).unwrap();
        assert_eq!(session.distance, 0.3);
        assert_eq!(session.duration, ms(1_600));
        assert_eq!(session.input.len(), 5);
        assert_eq!(session.input.events()[0].delay, Duration::ZERO);
        assert_eq!(session.input.events()[4].delay, ms(400));
    }

    #[test]
    fn test_ten_pulls_reach_default_finish() {
        let mut race = Race::new(&Config::default(), ());
        let mut i = 0;
        while !race.is_finished() {
            race.on_symbol(if i % 2 == 0 { "A" } else { "B" }, ms(i * 300)).unwrap();
            i += 1;
        }
        // ten A triggers: indices 0, 2, .., 18
        assert_eq!(i, 19);
    }

    #[test]
    fn test_unfinished_race_has_no_session() {
        let mut race = short_race();
        race.on_symbol("A", ms(0)).unwrap();
        assert!(race.recorded_session(Local::now()).is_none());
    }

    #[test]
    fn test_ghost_waits_for_race_start() {
        let mut race = short_race();
        race.add_ghost("green", "#32CD32", &ghost_session(alternating(5, 300)));
        assert_eq!(race.next_wake(), None);

        race.on_tick(ms(10_000));
        assert!(!race.ghosts()[0].decoder().has_started());

        race.on_symbol("A", ms(10_000)).unwrap();
        // the ghost's first input fires together with ours
        assert!(race.ghosts()[0].decoder().has_started());
        assert_eq!(race.next_wake(), Some(ms(10_300)));

        race.on_tick(ms(10_650));
        assert_eq!(race.ghosts()[0].decoder().state().rotation_count, 3);
        assert_eq!(race.next_wake(), Some(ms(10_900)));
    }

    #[test]
    fn test_finish_cancels_ghosts() {
        let mut race = short_race();
        race.add_ghost("pink", "#FF69B4", &ghost_session(alternating(40, 1_000)));

        for (i, s) in ["A", "B", "A", "B", "A"].iter().enumerate() {
            race.on_symbol(s, ms(i as u64 * 100)).unwrap();
        }

        assert!(race.is_finished());
        assert_eq!(race.ghosts()[0].replay().status(), ReplayStatus::Cancelled);
        assert_eq!(race.next_wake(), None);
    }

    #[test]
    fn test_abandon_cancels_running_ghosts() {
        let mut race = short_race();
        race.add_ghost("blue", "#1E90FF", &ghost_session(alternating(10, 500)));
        race.on_symbol("B", ms(0)).unwrap();
        race.abandon();

        assert_eq!(race.ghosts()[0].replay().status(), ReplayStatus::Cancelled);
        race.on_tick(ms(60_000));
        assert_eq!(race.ghosts()[0].decoder().state().rotation_count, 1);
    }

    #[test]
    fn test_standings_lists_local_first() {
        let mut race = short_race();
        race.add_ghost("green", "#32CD32", &ghost_session(alternating(3, 100)));
        race.on_symbol("A", ms(0)).unwrap();
        race.on_tick(ms(200));

        let standings = race.standings();
        assert_eq!(standings[0].0, "you");
        assert_eq!(standings[1].0, "green");
        assert!((standings[1].1 - 0.2).abs() < 1e-9);
    }
}
