use crate::config::DecoderConfig;
use crate::error::Result;
use crate::input::{Button, InputLog};
use crate::listener::RowListener;
use crate::util::mean;
use std::collections::VecDeque;
use std::time::Duration;

/// Who is driving a decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The human on the machine; records input and starts the race
    Local,
    /// A replayed past session
    Ghost,
}

/// Non-fatal irregularities noticed while decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// Not enough delays collected yet to smooth the speed
    InsufficientHistory { samples: usize },
    /// The rower started a new stroke before the return was fully counted
    AnomalousStrokePattern { outstanding_rotations: i32 },
}

/// What a single input did to the decoder
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transition {
    pub delay: Duration,
    pub rotation_count: i32,
    pub race_started: bool,
    pub stroke_completed: bool,
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecoderState {
    pub first_button: Option<Button>,
    pub last_button: Option<Button>,
    pub forward: bool,
    pub rotation_count: i32,
    pub stroke_count: u32,
    pub distance: f64,
    pub speed: f64,
    /// delays preceding `first_button` inputs, newest last
    pub recent_delays: VecDeque<Duration>,
    /// every delay ever pushed into `recent_delays`
    pub delay_samples: usize,
    pub last_event_at: Option<Duration>,
}

impl DecoderState {
    fn new(config: &DecoderConfig) -> Self {
        Self {
            first_button: None,
            last_button: None,
            forward: true,
            // the first input counts as rotation one
            rotation_count: 1,
            stroke_count: 0,
            distance: 0.0,
            speed: config.initial_speed,
            recent_delays: VecDeque::with_capacity(config.speed_window),
            delay_samples: 0,
            last_event_at: None,
        }
    }
}

/// Turns the alternating A/B sensor stream of one rower into rowing metrics
#[derive(Debug)]
pub struct StrokeDecoder<L: RowListener> {
    config: DecoderConfig,
    role: Role,
    state: DecoderState,
    log: InputLog,
    listener: L,
}

impl<L: RowListener> StrokeDecoder<L> {
    pub fn new(config: DecoderConfig, role: Role, listener: L) -> Self {
        Self {
            state: DecoderState::new(&config),
            config,
            role,
            log: InputLog::new(),
            listener,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn state(&self) -> &DecoderState {
        &self.state
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    pub fn into_listener(self) -> L {
        self.listener
    }

    pub fn input_log(&self) -> &InputLog {
        &self.log
    }

    pub fn take_input_log(&mut self) -> InputLog {
        std::mem::take(&mut self.log)
    }

    pub fn has_started(&self) -> bool {
        self.state.first_button.is_some()
    }

    /// Paddle position within the current stroke, 0 at the catch and 1 at the finish
    pub fn phase(&self) -> f64 {
        let raw = self.state.rotation_count as f64 / self.config.max_rotations as f64;
        raw.clamp(0.0, 1.0)
    }

    /// Distance along the course in world units, measured from the start line
    pub fn target_position(&self) -> f64 {
        self.state.distance * self.config.rotation_scale
    }

    /// Parses a raw sensor symbol and processes it; rejected symbols leave the decoder untouched
    pub fn process_symbol(&mut self, symbol: &str, at: Duration, skip_record: bool) -> Result<Transition> {
        let button = symbol.parse::<Button>().inspect_err(|e| {
            tracing::warn!(role = ?self.role, "dropping input: {}", e);
        })?;
        Ok(self.process_input(button, at, skip_record))
    }

    /// Feeds one sensor trigger observed at session time `at`
    pub fn process_input(&mut self, button: Button, at: Duration, skip_record: bool) -> Transition {
        let delay = match self.state.last_event_at {
            Some(prev) => at.saturating_sub(prev),
            None => Duration::ZERO,
        };
        self.state.last_event_at = Some(at);

        if !skip_record {
            self.log.record(button, delay);
        }

        let mut transition = Transition {
            delay,
            ..Transition::default()
        };

        let Some(first_button) = self.state.first_button else {
            // the very first input tells us which sensor leads the pull
            if self.role == Role::Local {
                self.listener.on_race_start();
                transition.race_started = true;
            }
            self.advance_distance(&mut transition);
            tracing::debug!(role = ?self.role, "first input {}", button);
            self.state.first_button = Some(button);
            self.state.last_button = Some(button);
            transition.rotation_count = self.state.rotation_count;
            return transition;
        };

        let is_first = button == first_button;
        if is_first {
            self.push_delay(delay);
        }

        if self.state.last_button == Some(button) {
            self.state.forward = !self.state.forward;
            if self.state.forward {
                tracing::debug!(role = ?self.role, "forward (rot={})", self.state.rotation_count);
                if self.state.rotation_count > 0 {
                    // the return never reached zero; count the stroke now
                    let outstanding_rotations = self.state.rotation_count;
                    tracing::warn!(
                        role = ?self.role,
                        outstanding_rotations,
                        "stroke finished before the return was counted"
                    );
                    transition
                        .conditions
                        .push(Condition::AnomalousStrokePattern { outstanding_rotations });
                    self.complete_stroke(&mut transition);
                    self.state.rotation_count = 0;
                }
            } else {
                tracing::debug!(role = ?self.role, "reverse");
            }
        }

        if self.state.forward {
            self.state.rotation_count += 1;
            if is_first {
                self.advance_distance(&mut transition);
            }
        } else {
            self.state.rotation_count -= 1;
        }

        if self.state.rotation_count == 0 {
            self.complete_stroke(&mut transition);
        }

        self.state.last_button = Some(button);
        transition.rotation_count = self.state.rotation_count;
        transition
    }

    fn push_delay(&mut self, delay: Duration) {
        if self.state.recent_delays.len() == self.config.speed_window {
            self.state.recent_delays.pop_front();
        }
        self.state.recent_delays.push_back(delay);
        self.state.delay_samples += 1;
    }

    fn complete_stroke(&mut self, transition: &mut Transition) {
        self.state.stroke_count += 1;
        transition.stroke_completed = true;
        tracing::debug!(role = ?self.role, strokes = self.state.stroke_count, "stroke");
        self.listener.on_stroke_completed(self.state.stroke_count);
    }

    fn advance_distance(&mut self, transition: &mut Transition) {
        self.state.distance += self.config.rotation_increment;
        self.listener.on_rotation_changed(self.state.distance);

        if self.state.delay_samples > self.config.speed_window {
            let delays: Vec<f64> = self
                .state
                .recent_delays
                .iter()
                .map(Duration::as_secs_f64)
                .collect();
            let mut average = mean(&delays).unwrap_or(1.0);
            if average == 0.0 {
                average = 1.0;
            }
            self.state.speed = average / self.config.speed_multiplier;
            self.listener.on_speed_changed(self.state.speed);
        } else {
            let samples = self.state.delay_samples;
            tracing::debug!(role = ?self.role, samples, "not enough past inputs to average");
            transition
                .conditions
                .push(Condition::InsufficientHistory { samples });
        }
    }
}
