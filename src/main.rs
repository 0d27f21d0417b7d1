use chrono::Local;
use clap::Parser;
use itertools::Itertools;
use rownin::{
    config::{Config, ConfigStore, FileConfigStore},
    listener::Scoreboard,
    profile::{FileProfileStore, ProfileColor, ProfileStore, Profiles},
    race::Race,
    runtime::{FixedTicker, LineEventSource, RowEvent, RowEventSource, Runner, Ticker},
    util::format_elapsed,
};
use std::{
    error::Error,
    io::{self, Write},
    path::PathBuf,
    time::Instant,
};

/// row against the ghosts of your best sessions
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Reads rowing machine sensor triggers (one \"A\" or \"B\" per line) from stdin, turns them into strokes, speed and distance, and races you against replays of every profile's best session."
)]
pub struct Cli {
    /// profile to row as
    #[clap(short = 'p', long, value_enum, default_value_t = ProfileColor::Orange)]
    profile: ProfileColor,

    /// race alone, without ghosts of past sessions
    #[clap(long)]
    no_ghosts: bool,

    /// distance at which the race ends
    #[clap(short = 'd', long)]
    finish_distance: Option<f64>,

    /// sensor triggers per full stroke
    #[clap(long)]
    max_rotations: Option<u32>,

    /// divisor applied to the averaged delay when computing speed
    #[clap(long)]
    speed_multiplier: Option<f64>,

    /// profiles file to read and update
    #[clap(long)]
    profiles: Option<PathBuf>,

    /// config file to read settings from
    #[clap(long)]
    config: Option<PathBuf>,

    /// store the effective settings in the config file
    #[clap(long)]
    save_config: bool,

    /// list profiles and their best times, then exit
    #[clap(long)]
    list: bool,

    /// delete every profile and recorded session, then exit
    #[clap(long)]
    reset: bool,
}

impl Cli {
    /// Stored settings overridden by whatever was passed on the command line
    fn apply(&self, mut config: Config) -> Config {
        if let Some(d) = self.finish_distance {
            config.finish_distance = d;
        }
        if let Some(m) = self.max_rotations {
            config.max_rotations = m;
        }
        if let Some(s) = self.speed_multiplier {
            config.speed_multiplier = s;
        }
        if self.no_ghosts {
            config.ghosts_enabled = false;
        }
        config
    }

    fn config_store(&self) -> FileConfigStore {
        match &self.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        }
    }

    fn profile_store(&self) -> FileProfileStore {
        match &self.profiles {
            Some(path) => FileProfileStore::with_path(path),
            None => FileProfileStore::new(),
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config_store = cli.config_store();
    let config = cli.apply(config_store.load());
    if cli.save_config {
        config_store.save(&config)?;
    }

    if cli.reset {
        Profiles::empty(cli.profile_store()).reset()?;
        return Ok(());
    }

    let mut profiles = Profiles::load(cli.profile_store())?;

    let mut stdout = io::stdout().lock();

    if cli.list {
        list_profiles(&profiles, &mut stdout)?;
        return Ok(());
    }

    profiles.select(&cli.profile.to_string())?;

    let mut race = Race::new(&config, Scoreboard::new(stdout, config.finish_distance));
    if config.ghosts_enabled {
        for (name, color, session) in profiles.ghosts() {
            race.add_ghost(name, color, session);
        }
    }

    let runner = Runner::new(LineEventSource::stdin(), FixedTicker::new(config.tick_rate()));
    let clock = Instant::now();
    run_race(&runner, &mut race, &clock)?;

    match race.recorded_session(Local::now()) {
        Some(session) => {
            let board = race.local_mut().listener_mut();
            board.render(session.duration)?;
            let standings = race
                .standings()
                .into_iter()
                .map(|(name, distance)| format!("{} {:.2}", name, distance))
                .join(", ");
            println!("finished in {} ({})", format_elapsed(session.duration), standings);
            profiles.record_session(session)?;
        }
        None => {
            race.abandon();
            println!("race abandoned before the finish");
        }
    }

    Ok(())
}

/// Drives the race until the rower finishes or the input source closes
fn run_race<E: RowEventSource, T: Ticker, W: Write>(
    runner: &Runner<E, T>,
    race: &mut Race<Scoreboard<W>>,
    clock: &Instant,
) -> io::Result<()> {
    loop {
        let wait = race
            .next_wake()
            .map(|due| due.saturating_sub(clock.elapsed()));

        match runner.step_within(wait) {
            RowEvent::Symbol(symbol, arrived) => {
                let at = arrived.saturating_duration_since(*clock);
                match race.on_symbol(&symbol, at) {
                    Ok(Some(transition)) if transition.stroke_completed => {
                        let elapsed = race.elapsed(clock.elapsed());
                        race.local_mut().listener_mut().render(elapsed)?;
                    }
                    Ok(_) => {}
                    Err(e) => tracing::error!("unexpected message: {}", e),
                }
            }
            RowEvent::Tick => race.on_tick(clock.elapsed()),
            RowEvent::Closed => {
                tracing::info!("input closed");
                return Ok(());
            }
        }

        if race.is_finished() {
            return Ok(());
        }
    }
}

fn list_profiles<S: ProfileStore, W: Write>(profiles: &Profiles<S>, out: &mut W) -> io::Result<()> {
    if profiles.all().is_empty() {
        writeln!(out, "no profiles yet")?;
        return Ok(());
    }

    // fastest first, profiles without a finished race last
    let rows = profiles.all().iter().sorted_by_key(|p| {
        let best = p.best_session().map(|s| s.duration);
        (best.is_none(), best)
    });

    for profile in rows {
        match profile.best_session() {
            Some(best) => writeln!(
                out,
                "{:<8} {} best {} on {} ({} races)",
                profile.name,
                profile.color,
                format_elapsed(best.duration),
                best.date.format("%Y-%m-%d"),
                profile.sessions.len()
            )?,
            None => writeln!(out, "{:<8} {} no races", profile.name, profile.color)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rownin::runtime::TestEventSource;
    use rownin::session::RecordedSession;
    use std::sync::mpsc;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["rownin"]);

        assert_eq!(cli.profile, ProfileColor::Orange);
        assert!(!cli.no_ghosts);
        assert_eq!(cli.finish_distance, None);
        assert_eq!(cli.profiles, None);
        assert!(!cli.list);
        assert!(!cli.reset);
    }

    #[test]
    fn test_cli_profile() {
        let cli = Cli::parse_from(["rownin", "-p", "green"]);
        assert_eq!(cli.profile, ProfileColor::Green);

        let cli = Cli::parse_from(["rownin", "--profile", "pink"]);
        assert_eq!(cli.profile, ProfileColor::Pink);

        assert!(Cli::try_parse_from(["rownin", "--profile", "purple"]).is_err());
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "rownin",
            "-d",
            "2.5",
            "--max-rotations",
            "9",
            "--speed-multiplier",
            "3",
            "--no-ghosts",
        ]);
        let config = cli.apply(Config::default());

        assert_eq!(config.finish_distance, 2.5);
        assert_eq!(config.max_rotations, 9);
        assert_eq!(config.speed_multiplier, 3.0);
        assert!(!config.ghosts_enabled);
        assert_eq!(config.rotation_increment, 0.1);
    }

    #[test]
    fn test_cli_without_flags_keeps_config() {
        let stored = Config {
            finish_distance: 4.0,
            ghosts_enabled: true,
            ..Config::default()
        };
        let config = Cli::parse_from(["rownin"]).apply(stored.clone());
        assert_eq!(config, stored);
    }

    fn test_runner(rx: mpsc::Receiver<RowEvent>) -> Runner<TestEventSource, FixedTicker> {
        Runner::new(TestEventSource::new(rx), FixedTicker::new(Duration::from_millis(5)))
    }

    #[test]
    fn test_run_race_stops_at_finish() {
        let config = Config {
            finish_distance: 0.3,
            ..Config::default()
        };
        let mut race = Race::new(&config, Scoreboard::new(Vec::new(), config.finish_distance));

        let (tx, rx) = mpsc::channel();
        for s in ["A", "B", "nope", "A", "B", "A", "B", "A"] {
            tx.send(RowEvent::Symbol(s.to_string(), Instant::now())).unwrap();
        }

        run_race(&test_runner(rx), &mut race, &Instant::now()).unwrap();

        assert!(race.is_finished());
        // the bad line is dropped and nothing after the finish is taken
        assert_eq!(race.local().input_log().len(), 5);
    }

    #[test]
    fn test_run_race_returns_when_input_closes() {
        let config = Config::default();
        let mut race = Race::new(&config, Scoreboard::new(Vec::new(), config.finish_distance));

        let (tx, rx) = mpsc::channel();
        tx.send(RowEvent::Symbol("A".to_string(), Instant::now())).unwrap();
        tx.send(RowEvent::Closed).unwrap();

        run_race(&test_runner(rx), &mut race, &Instant::now()).unwrap();

        assert!(race.is_started());
        assert!(!race.is_finished());
    }

    #[test]
    fn test_run_race_replays_ghost_while_waiting() {
        let config = Config::default();
        let mut race = Race::new(&config, Scoreboard::new(Vec::new(), config.finish_distance));
        let ghost_log = (0..4)
            .map(|i| {
                let button = if i % 2 == 0 { rownin::Button::A } else { rownin::Button::B };
                rownin::InputEvent::new(button, Duration::from_millis(if i == 0 { 0 } else { 10 }))
            })
            .collect();
        let session = RecordedSession::new(1.0, Duration::from_millis(30), Local::now(), ghost_log);
        race.add_ghost("green", "#32CD32", &session);

        let clock = Instant::now();
        let (tx, rx) = mpsc::channel();
        tx.send(RowEvent::Symbol("A".to_string(), clock)).unwrap();
        let producer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(200));
            let _ = tx.send(RowEvent::Closed);
        });

        run_race(&test_runner(rx), &mut race, &clock).unwrap();
        producer.join().unwrap();

        let ghost = &race.ghosts()[0];
        assert_eq!(ghost.decoder().state().rotation_count, 4);
        assert!(ghost.replay().is_done());
    }

    #[test]
    fn test_run_race_records_arrival_times() {
        let config = Config {
            finish_distance: 0.2,
            ..Config::default()
        };
        let mut race = Race::new(&config, Scoreboard::new(Vec::new(), config.finish_distance));

        let clock = Instant::now();
        let (tx, rx) = mpsc::channel();
        for (i, s) in ["A", "B", "A"].iter().enumerate() {
            let arrived = clock + Duration::from_millis(1_000 + i as u64 * 450);
            tx.send(RowEvent::Symbol(s.to_string(), arrived)).unwrap();
        }

        run_race(&test_runner(rx), &mut race, &clock).unwrap();

        // delays come from when the lines were read, however long the loop took
        let delays: Vec<Duration> = race
            .local()
            .input_log()
            .events()
            .iter()
            .map(|e| e.delay)
            .collect();
        let step = Duration::from_millis(450);
        assert_eq!(delays, vec![Duration::ZERO, step, step]);
        assert_eq!(race.elapsed(Duration::MAX), Duration::from_millis(900));
    }

    #[test]
    fn test_list_profiles_orders_by_best_time() {
        let dir = tempdir().unwrap();
        let mut profiles = Profiles::load(FileProfileStore::with_path(dir.path().join("p.json"))).unwrap();
        let input = rownin::InputLog::new();

        profiles.select("blue").unwrap();
        profiles
            .record_session(RecordedSession::new(1.0, Duration::from_secs(90), Local::now(), input.clone()))
            .unwrap();
        profiles.select("pink").unwrap();
        profiles.select("green").unwrap();
        profiles
            .record_session(RecordedSession::new(1.0, Duration::from_secs(61), Local::now(), input))
            .unwrap();

        let mut out = Vec::new();
        list_profiles(&profiles, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("green") && lines[0].contains("best 01:01"));
        assert!(lines[1].starts_with("blue") && lines[1].contains("best 01:30"));
        assert!(lines[2].starts_with("pink") && lines[2].contains("no races"));
    }

    #[test]
    fn test_list_profiles_empty() {
        let dir = tempdir().unwrap();
        let profiles = Profiles::load(FileProfileStore::with_path(dir.path().join("p.json"))).unwrap();
        let mut out = Vec::new();
        list_profiles(&profiles, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "no profiles yet\n");
    }
}
