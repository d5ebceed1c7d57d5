use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::metrics::{MetricsChannel, MetricsSnapshot, ProducerStats, StatsSnapshot};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportFormat {
    Log,
    Json,
}

#[derive(Serialize)]
struct ReportLine {
    t_ms: u64,
    metrics: Option<MetricsSnapshot>,
    stats: StatsSnapshot,
}

/// Reader side: periodically peeks the latest snapshot and reports it.
pub struct Reporter {
    channel: MetricsChannel,
    stats: Arc<ProducerStats>,
    format: ReportFormat,
    last_overall: Option<bool>,
}

impl Reporter {
    pub fn new(channel: MetricsChannel, stats: Arc<ProducerStats>, format: ReportFormat) -> Self {
        Self {
            channel,
            stats,
            format,
            last_overall: None,
        }
    }

    pub fn latest(&self) -> Option<MetricsSnapshot> {
        self.channel.peek_latest()
    }

    fn render(&self, elapsed: Duration, metrics: Option<MetricsSnapshot>) -> Result<String> {
        let stats = self.stats.snapshot();
        Ok(match self.format {
            ReportFormat::Json => serde_json::to_string(&ReportLine {
                t_ms: elapsed.as_millis() as u64,
                metrics,
                stats,
            })?,
            ReportFormat::Log => match metrics {
                Some(m) => format!(
                    "short {:7.1} Hz {} | long {:7.1} Hz {} | tone {} | cycles={} skipped={} faults={}",
                    m.peak_hz_short,
                    mark(m.fire_short),
                    m.peak_hz_long,
                    mark(m.fire_long),
                    if m.fire_overall { "PRESENT" } else { "absent" },
                    stats.cycles,
                    stats.skipped_reads,
                    stats.faults
                ),
                None => format!(
                    "no data yet | skipped={} faults={}",
                    stats.skipped_reads, stats.faults
                ),
            },
        })
    }

    /// Emits one report; logs when the overall decision flips.
    pub fn report(&mut self, elapsed: Duration) -> Result<()> {
        let metrics = self.latest();
        if let Some(m) = metrics {
            if self.last_overall != Some(m.fire_overall) {
                if m.fire_overall {
                    log::info!("Tone detected ({:.1} Hz / {:.1} Hz)", m.peak_hz_short, m.peak_hz_long);
                } else if self.last_overall.is_some() {
                    log::info!("Tone lost");
                }
                self.last_overall = Some(m.fire_overall);
            }
        }

        let line = self.render(elapsed, metrics)?;
        match self.format {
            ReportFormat::Json => println!("{}", line),
            ReportFormat::Log => log::info!("{}", line),
        }
        Ok(())
    }

    /// Reports every `interval`, forever or until `limit` has elapsed.
    pub fn run(mut self, interval: Duration, limit: Option<Duration>) -> Result<()> {
        let started = Instant::now();
        loop {
            thread::sleep(interval);
            let elapsed = started.elapsed();
            self.report(elapsed)?;
            if limit.is_some_and(|limit| elapsed >= limit) {
                return Ok(());
            }
        }
    }
}

fn mark(fired: bool) -> &'static str {
    if fired {
        "[x]"
    } else {
        "[ ]"
    }
}
