use crate::util::format_elapsed;
use std::io::{self, Write};
use std::time::Duration;

/// Receives the metrics a stroke decoder derives from its input
pub trait RowListener {
    /// Fired once, when the local player produces their first input
    fn on_race_start(&mut self);
    fn on_rotation_changed(&mut self, distance: f64);
    fn on_stroke_completed(&mut self, strokes: u32);
    fn on_speed_changed(&mut self, speed: f64);
}

/// Ghost decoders have nobody to report to
impl RowListener for () {
    fn on_race_start(&mut self) {}
    fn on_rotation_changed(&mut self, _distance: f64) {}
    fn on_stroke_completed(&mut self, _strokes: u32) {}
    fn on_speed_changed(&mut self, _speed: f64) {}
}

/// A single listener notification, useful for capturing a metric trajectory
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RowSignal {
    RaceStart,
    Rotation(f64),
    Stroke(u32),
    Speed(f64),
}

impl RowListener for Vec<RowSignal> {
    fn on_race_start(&mut self) {
        self.push(RowSignal::RaceStart);
    }

    fn on_rotation_changed(&mut self, distance: f64) {
        self.push(RowSignal::Rotation(distance));
    }

    fn on_stroke_completed(&mut self, strokes: u32) {
        self.push(RowSignal::Stroke(strokes));
    }

    fn on_speed_changed(&mut self, speed: f64) {
        self.push(RowSignal::Speed(speed));
    }
}

/// Stats row for the local player: strokes, speed, distance and race clock
#[derive(Debug)]
pub struct Scoreboard<W: Write> {
    out: W,
    finish_distance: f64,
    pub strokes: u32,
    pub speed: f64,
    pub distance: f64,
    pub started: bool,
}

impl<W: Write> Scoreboard<W> {
    pub fn new(out: W, finish_distance: f64) -> Self {
        Self {
            out,
            finish_distance,
            strokes: 0,
            speed: 0.0,
            distance: 0.0,
            started: false,
        }
    }

    /// Distance as shown to the rower, capped at the finish line
    pub fn distance_label(&self) -> String {
        if self.distance >= self.finish_distance {
            return format!("{}", self.finish_distance);
        }
        format!("{}", (self.distance * 100.0).round() / 100.0)
    }

    pub fn render(&mut self, elapsed: Duration) -> io::Result<()> {
        writeln!(
            self.out,
            "time {} | strokes {} | speed {:.2} | distance {}",
            format_elapsed(elapsed),
            self.strokes,
            self.speed,
            self.distance_label()
        )
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RowListener for Scoreboard<W> {
    fn on_race_start(&mut self) {
        self.started = true;
        let _ = writeln!(self.out, "go!");
    }

    fn on_rotation_changed(&mut self, distance: f64) {
        self.distance = distance;
    }

    fn on_stroke_completed(&mut self, strokes: u32) {
        self.strokes = strokes;
    }

    fn on_speed_changed(&mut self, speed: f64) {
        self.speed = speed;
    }
}
