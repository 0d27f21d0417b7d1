use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

/// Unified event type consumed by the race loop
#[derive(Clone, Debug, PartialEq)]
pub enum RowEvent {
    /// One raw line from the machine, expected to be "A" or "B", with the moment it was read
    Symbol(String, Instant),
    Tick,
    /// The input source went away
    Closed,
}

/// Source of machine events
pub trait RowEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<RowEvent, RecvTimeoutError>;
}

/// Production event source reading one symbol per line, e.g. from a serial bridge on stdin
pub struct LineEventSource {
    rx: Receiver<RowEvent>,
}

impl LineEventSource {
    pub fn new<R: BufRead + Send + 'static>(reader: R) -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || {
            for line in reader.lines() {
                let Ok(line) = line else { break };
                let arrived = Instant::now();
                let symbol = line.trim();
                if symbol.is_empty() {
                    continue;
                }
                if tx.send(RowEvent::Symbol(symbol.to_string(), arrived)).is_err() {
                    return;
                }
            }
            let _ = tx.send(RowEvent::Closed);
        });

        Self { rx }
    }

    pub fn stdin() -> Self {
        Self::new(std::io::BufReader::new(std::io::stdin()))
    }
}

impl RowEventSource for LineEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<RowEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<RowEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<RowEvent>) -> Self {
        Self { rx }
    }
}

impl RowEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<RowEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the race one event/tick at a time
pub struct Runner<E: RowEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: RowEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> RowEvent {
        self.step_within(None)
    }

    /// Like `step`, but never waits longer than `max_wait` (e.g. until a ghost's next input is due)
    pub fn step_within(&self, max_wait: Option<Duration>) -> RowEvent {
        let timeout = match max_wait {
            Some(wait) => wait.min(self.ticker.interval()),
            None => self.ticker.interval(),
        };
        match self.event_source.recv_timeout(timeout) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) => RowEvent::Tick,
            Err(RecvTimeoutError::Disconnected) => RowEvent::Closed,
        }
    }
}
