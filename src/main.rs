mod audio;
mod cli;
mod config;
mod detect;
mod error;
mod metrics;
mod pacer;
mod producer;
mod report;
mod spectrum;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use audio::source::{AudioSource, FileSource, ToneSource};
use cli::Cli;
use config::Config;
use metrics::{MetricsChannel, ProducerStats};
use pacer::Pacer;
use producer::Producer;
use report::{ReportFormat, Reporter};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    // Explicit --config, then ./tonewatch.toml, then the user config dirs
    let config_path = cli.config.clone().or_else(|| {
        let local = PathBuf::from("tonewatch.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("tonewatch").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("tonewatch").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    });

    let mut cfg = match config_path {
        Some(ref path) => {
            let cfg = config::load_config(path)?;
            log::info!("Loaded config from {}", path.display());
            cfg
        }
        None => Config::default(),
    };

    if let Some(target) = cli.target_hz {
        cfg.detector.target_hz = target;
    }
    if let Some(tolerance) = cli.tolerance_hz {
        cfg.detector.tolerance_hz = tolerance;
    }
    if let Some(period) = cli.period_ms {
        cfg.audio.period_ms = period;
    }

    let source: Box<dyn AudioSource> = match cli.input {
        Some(ref input) => {
            let file = FileSource::open(input, cli.loop_input)
                .with_context(|| format!("Cannot use {} as audio input", input.display()))?;
            if file.sample_rate() != cfg.audio.sample_rate {
                log::info!(
                    "Analysing at the input's {} Hz instead of {} Hz",
                    file.sample_rate(),
                    cfg.audio.sample_rate
                );
                cfg.audio.sample_rate = file.sample_rate();
            }
            Box::new(file)
        }
        None => {
            let tone_hz = cli.tone_hz.unwrap_or(cfg.detector.target_hz);
            log::info!(
                "No input given, generating a {:.1} Hz tone at amplitude {:.2}",
                tone_hz,
                cli.tone_amplitude
            );
            Box::new(
                ToneSource::new(cfg.audio.sample_rate, tone_hz, cli.tone_amplitude).keyed(
                    Duration::from_millis(cli.tone_on_ms),
                    Duration::from_millis(cli.tone_off_ms),
                ),
            )
        }
    };

    cfg.validate().context("Invalid configuration")?;

    log::info!(
        "Watching for {:.1} Hz (+/- {:.1} Hz) at {} Hz, windows {}/{}",
        cfg.detector.target_hz,
        cfg.detector.tolerance_hz,
        cfg.audio.sample_rate,
        cfg.short.window,
        cfg.long.window
    );

    let channel = MetricsChannel::new();
    let stats = Arc::new(ProducerStats::default());

    let producer = Producer::new(source, &cfg, channel.clone(), stats.clone());
    let pacer = Pacer::new(cfg.audio.period());
    thread::Builder::new()
        .name("producer".into())
        .spawn(move || producer.run(pacer))
        .context("Failed to start producer thread")?;

    let format = if cli.json { ReportFormat::Json } else { ReportFormat::Log };
    let limit = cli
        .duration_secs
        .map(Duration::try_from_secs_f64)
        .transpose()
        .context("Invalid --duration-secs")?;

    Reporter::new(channel, stats, format).run(Duration::from_millis(cli.report_ms.max(1)), limit)
}
