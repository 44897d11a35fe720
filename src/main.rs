//! Pastel Arcade entry point
//!
//! Native builds run a headless demo: the autopilot plays every game on the
//! fixed-step runner, bests land in the on-disk cache, new personal bests
//! go to the configured leaderboard and the standings are printed.
//! The web build is driven by the page through `web::WebArcade`.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Pastel Arcade (native) starting...");

    if let Err(e) = demo::run() {
        log::error!("Demo failed: {e}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is web::start, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use std::path::PathBuf;
    use std::rc::Rc;
    use std::time::{Duration, Instant};

    use glam::Vec2;
    use pastel_arcade::autopilot::Autopilot;
    use pastel_arcade::leaderboard::{
        HttpLeaderboard, LeaderboardBackend, LeaderboardQuery, LocalLeaderboard, Notice,
        SubmitDecision,
    };
    use pastel_arcade::sim::Sandbox;
    use pastel_arcade::storage::{FileStore, KeyValueStore};
    use pastel_arcade::{
        FrameOutcome, GameId, GameSession, HighScoreCache, LeaderboardClient, SessionEvent,
        SessionRunner, Settings, StorageError,
    };

    /// Host frame interval fed to the runner
    const FRAME_MS: f64 = 1000.0 / 60.0;
    /// Abandon a run after this much session time
    const RUN_LIMIT_MS: f64 = 180_000.0;
    /// How long to wait for outstanding submissions
    const SUBMIT_WAIT: Duration = Duration::from_secs(15);
    const DEMO_PLAYER: &str = "autopilot";
    const STORE_FILE: &str = "pastel-arcade.json";
    const SANDBOX_SIZE: Vec2 = Vec2::new(800.0, 600.0);
    const SANDBOX_BALLS: usize = 8;
    const SANDBOX_TICKS: u32 = 600;

    fn unit(game: GameId) -> &'static str {
        match game {
            GameId::FlappyBird => "pipes",
            GameId::Snake | GameId::Memory => "pts",
            GameId::Reaction => "ms",
            GameId::Typing => "wpm",
        }
    }

    pub fn run() -> Result<(), StorageError> {
        let data_dir = std::env::var_os("ARCADE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        std::fs::create_dir_all(&data_dir)?;
        let store: Rc<dyn KeyValueStore> = Rc::new(FileStore::open(data_dir.join(STORE_FILE))?);

        let mut settings = Settings::load(store.as_ref());
        settings.apply_env();
        if settings.player.is_none() {
            settings.player = Some(DEMO_PLAYER.to_string());
        }

        let mut leaderboard = build_leaderboard(&settings, &store);
        let cache = HighScoreCache::new(store.clone());
        let seed = settings.seed_or_entropy();

        println!(
            "Pastel Arcade demo: seed {seed}, leaderboard {}, data in {}",
            leaderboard.backend_name(),
            data_dir.display()
        );

        for (i, game) in GameId::ALL.into_iter().enumerate() {
            let session = GameSession::new(
                game,
                settings.core_options(),
                seed.wrapping_add(i as u64),
            )
            .with_cache(cache.clone())
            .with_player(settings.player.clone());

            for event in play(session, seed.wrapping_add(i as u64)) {
                report(game, &event);
                if let SessionEvent::GameOver {
                    submission: Some(submission),
                    ..
                } = event
                {
                    if !settings.submit_scores {
                        continue;
                    }
                    match leaderboard.submit(&submission) {
                        SubmitDecision::Sent => {}
                        SubmitDecision::NotImproved { best } => {
                            println!("  personal best {best} {} stands", unit(game))
                        }
                        SubmitDecision::NotSignedIn => println!("  not signed in, not submitted"),
                    }
                }
            }
        }

        run_sandbox(seed);
        await_submissions(&mut leaderboard);
        print_standings(&leaderboard, settings.leaderboard_limit);
        Ok(())
    }

    fn build_leaderboard(settings: &Settings, store: &Rc<dyn KeyValueStore>) -> LeaderboardClient {
        let backend: Box<dyn LeaderboardBackend> = match &settings.leaderboard_url {
            Some(url) => Box::new(HttpLeaderboard::new(url)),
            None => Box::new(LocalLeaderboard::load(store.clone())),
        };
        let mut client = LeaderboardClient::new(backend);
        // The hosted service wants a token; the on-device board only a name
        client.set_identity(match settings.leaderboard_url {
            Some(_) => settings.identity(),
            None => settings.local_identity(),
        });
        client
    }

    /// Drive one session to a terminal phase, returning everything it emitted
    fn play(session: GameSession, seed: u64) -> Vec<SessionEvent> {
        let game = session.game();
        let mut runner = SessionRunner::new();
        let mut pilot = Autopilot::new(seed);
        let token = runner.start(session);
        let mut events = Vec::new();
        let mut host_now = 0.0;

        loop {
            let Some(session) = runner.session() else {
                break;
            };
            if session.phase().is_terminal() {
                break;
            }
            let now = runner.session_time(host_now);
            if now > RUN_LIMIT_MS {
                log::warn!("{game}: run took too long, abandoning");
                break;
            }
            if let Some(intent) = pilot.next_intent(session.core(), now) {
                runner.push_intent(intent, host_now);
            }
            match runner.frame(token, host_now) {
                FrameOutcome::Ran { events: new, .. } => events.extend(new),
                FrameOutcome::Cancelled => break,
            }
            host_now += FRAME_MS;
        }

        runner.stop();
        events
    }

    /// Drop a handful of balls into the unscored physics sandbox
    fn run_sandbox(seed: u64) {
        let mut sandbox = Sandbox::new(SANDBOX_SIZE.x, SANDBOX_SIZE.y, seed);
        for i in 0..SANDBOX_BALLS {
            let x = SANDBOX_SIZE.x * (i as f32 + 1.0) / (SANDBOX_BALLS as f32 + 1.0);
            sandbox.spawn(Vec2::new(x, SANDBOX_SIZE.y / 4.0));
        }
        for _ in 0..SANDBOX_TICKS {
            sandbox.step();
        }
        let resting = sandbox
            .balls
            .iter()
            .filter(|b| b.vel.length() < 0.5)
            .count();
        println!(
            "{:<12} {} balls, {resting} at rest after {} ticks",
            "sandbox",
            sandbox.balls.len(),
            sandbox.time_ticks
        );
    }

    fn report(game: GameId, event: &SessionEvent) {
        match event {
            SessionEvent::PhaseChanged { from, to } => {
                log::debug!("{game}: {from:?} -> {to:?}");
            }
            SessionEvent::NewLocalBest { key, value } => {
                println!("  new local best {key} = {value}");
            }
            SessionEvent::Fouled => println!("{game:<12} too early!"),
            SessionEvent::Aborted { reason } => println!("{game:<12} aborted: {reason}"),
            SessionEvent::GameOver { score, .. } => match score {
                Some(score) => println!("{game:<12} {} {}", score.value, unit(game)),
                None => println!("{game:<12} no score"),
            },
        }
    }

    fn await_submissions(leaderboard: &mut LeaderboardClient) {
        let deadline = Instant::now() + SUBMIT_WAIT;
        while leaderboard.in_flight() > 0 && Instant::now() < deadline {
            for notice in leaderboard.poll() {
                match notice {
                    Notice::Submitted {
                        game,
                        score,
                        new_best,
                    } => println!(
                        "submitted {game} {score}{}",
                        if new_best { " (new personal best)" } else { "" }
                    ),
                    Notice::Failed { game, score, error } => {
                        println!("could not submit {game} {score}: {error}")
                    }
                }
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        if leaderboard.in_flight() > 0 {
            log::warn!("{} submissions still pending", leaderboard.in_flight());
        }
    }

    fn print_standings(leaderboard: &LeaderboardClient, limit: usize) {
        for game in GameId::ALL {
            println!("\n== {game} ==");
            match leaderboard
                .fetch(&LeaderboardQuery::game(game).with_limit(limit))
                .wait()
            {
                Ok(rows) if rows.is_empty() => println!("  (no scores yet)"),
                Ok(rows) => {
                    for row in rows {
                        println!(
                            "  {:>3}. {:<16} {:>7} {}  {}",
                            row.rank,
                            row.username,
                            row.score,
                            unit(game),
                            row.date
                        );
                    }
                }
                Err(e) => println!("  unavailable: {e}"),
            }
        }
    }
}
