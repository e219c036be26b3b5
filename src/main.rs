use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use guideline_audio::config::file::config_file_path;
use guideline_audio::sound::{ChannelRole, CpalMixer, MixingEngine};
use guideline_audio::speech::{EspeakSink, QueueMode, Speech, SpeechSink};
use guideline_audio::{Config, GuidanceControl};

/// Rate at which the simulated pipeline delivers frames
const FRAME_RATE_HZ: u64 = 30;

/// Guideline - audio feedback for hands-free line following
#[derive(Parser)]
#[command(name = "guideline", version, about)]
struct Cli {
    /// Config file (defaults to ~/.config/guideline/config.toml)
    #[arg(short, long, env = "GUIDELINE_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Drive the audio with a synthetic weaving line
    Simulate {
        /// Duration in seconds
        #[arg(short, long, default_value = "60")]
        seconds: u64,
        /// Directory holding the sound files
        #[arg(long, env = "GUIDELINE_SOUNDS")]
        sounds: Option<PathBuf>,
        /// Skip spoken announcements
        #[arg(long)]
        no_speech: bool,
    },
    /// Sweep the steering sound from left to right
    TestSpeaker {
        /// Directory holding the sound files
        #[arg(long, env = "GUIDELINE_SOUNDS")]
        sounds: Option<PathBuf>,
    },
    /// Speak a phrase through the speech synthesizer
    TestTts {
        /// Text to speak; defaults to the straight-path phrase
        text: Option<String>,
    },
    /// Print the config file location
    ConfigPath,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,guideline_audio=info",
        1 => "info,guideline_audio=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Command::ConfigPath = cli.command {
        match config_file_path() {
            Some(path) => println!("{}", path.display()),
            None => println!("no home directory, config file unavailable"),
        }
        return Ok(());
    }

    let mut config = Config::load(cli.config.as_deref())?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Command::Simulate {
            seconds,
            sounds,
            no_speech,
        } => {
            with_sounds(&mut config, sounds.as_deref());
            simulate(config, seconds, no_speech).await
        }
        Command::TestSpeaker { sounds } => {
            with_sounds(&mut config, sounds.as_deref());
            test_speaker(config).await
        }
        Command::TestTts { text } => {
            let text = text.unwrap_or_else(|| config.speech.straight.clone());
            test_tts(&config.speech.locale, &text).await
        }
        Command::ConfigPath => Ok(()),
    }
}

fn with_sounds(config: &mut Config, dir: Option<&Path>) {
    if let Some(dir) = dir {
        config.sounds = config.sounds.clone().in_dir(dir);
    }
}

fn open_speech(locale: &str) -> Speech {
    match EspeakSink::spawn(locale) {
        Ok((sink, init)) => Speech::new(Box::new(sink), init),
        Err(e) => {
            tracing::warn!(error = %e, "speech unavailable");
            Speech::disabled()
        }
    }
}

/// Wait until the loops have started, or give up after `timeout`
async fn wait_started(control: &GuidanceControl, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while !control.channels().is_started() {
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    true
}

/// Feed the facade a weaving line with periodic curves and a lost-line gap
async fn simulate(config: Config, seconds: u64, no_speech: bool) -> anyhow::Result<()> {
    let engine: Arc<dyn MixingEngine> = Arc::new(CpalMixer::new()?);
    let speech = if no_speech {
        Speech::disabled()
    } else {
        open_speech(&config.speech.locale)
    };
    let mut control = GuidanceControl::new(config, engine, speech)?;

    if !wait_started(&control, Duration::from_secs(5)).await {
        tracing::warn!("sounds did not finish loading, continuing anyway");
    }
    for role in ChannelRole::ALL {
        tracing::info!(%role, state = ?control.channels().channel_state(role), "channel");
    }
    tracing::info!(seconds, "simulating, press ctrl-c to stop early");

    let mut ticker = tokio::time::interval(Duration::from_millis(1000 / FRAME_RATE_HZ));
    let start = Instant::now();
    let total = Duration::from_secs(seconds);
    let mut battery_warned = false;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
        }
        let elapsed = start.elapsed();
        if elapsed >= total {
            break;
        }
        let t = elapsed.as_secs_f32();

        // Lose the line for a second and a half every quarter minute
        if t % 15.0 > 13.5 {
            control.set_no_line_found();
            continue;
        }

        let position = 0.6 * (std::f32::consts::TAU * t / 8.0).sin();
        let angle = 25.0 * (std::f32::consts::TAU * t / 20.0).sin();
        control.set_position(position);
        if let Some(announcement) = control.set_turning(angle) {
            tracing::info!(?announcement, angle, "announced");
        }
        if let Some(announcement) = control.check_straight_path(angle.abs(), 150.0) {
            tracing::info!(?announcement, "announced");
        }

        if !battery_warned && elapsed >= total / 2 {
            control.warn_low_battery();
            battery_warned = true;
        }
        if let Some(steering) = control.channels().last_steering() {
            tracing::trace!(position, ?steering, "frame");
        }
    }

    control.stop();
    println!("Simulation finished after {:.1}s", start.elapsed().as_secs_f32());
    Ok(())
}

/// Sweep the steering position across the stereo field
async fn test_speaker(config: Config) -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("The steering sound should move from the left ear to the right\n");

    let engine: Arc<dyn MixingEngine> = Arc::new(CpalMixer::new()?);
    let mut control = GuidanceControl::new(config, engine, Speech::disabled())?;
    if !wait_started(&control, Duration::from_secs(5)).await {
        anyhow::bail!("sounds did not finish loading, check --sounds");
    }

    let steps = 120_u16;
    for i in 0..=steps {
        let position = f32::from(i) / f32::from(steps) * 2.0 - 1.0;
        control.set_position(position);
        tokio::time::sleep(Duration::from_millis(1000 / FRAME_RATE_HZ)).await;
    }

    println!("Line lost, you should hear the stop alert");
    control.set_no_line_found();
    tokio::time::sleep(Duration::from_secs(1)).await;
    control.alert_notification();
    tokio::time::sleep(Duration::from_secs(1)).await;
    control.stop();

    println!("\n---");
    println!("If you heard the sweep, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Run: pactl list sinks short");
    println!("  3. Check the sound files exist in the --sounds directory");
    Ok(())
}

/// Speak `text` through espeak-ng
async fn test_tts(locale: &str, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\" (locale {locale})\n");

    let (mut sink, init) = EspeakSink::spawn(locale)?;
    init.await
        .map_err(|_| anyhow::anyhow!("speech worker exited during startup"))??;

    sink.speak(text, QueueMode::Flush);
    tokio::time::sleep(Duration::from_secs(4)).await;
    sink.shutdown();

    println!("\n---");
    println!("If you heard the speech, TTS is working!");
    Ok(())
}
