use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tonewatch", about = "Real-time detector for a single target tone")]
pub struct Cli {
    /// Audio file to analyse (WAV, MP3, FLAC, OGG). Without it a synthetic tone is used.
    pub input: Option<PathBuf>,

    /// Config file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Restart the input file when it ends
    #[arg(long)]
    pub loop_input: bool,

    /// Frequency of the synthetic tone (defaults to the target frequency)
    #[arg(long)]
    pub tone_hz: Option<f32>,

    /// Amplitude of the synthetic tone (0.0-1.0)
    #[arg(long, default_value_t = 0.5)]
    pub tone_amplitude: f32,

    /// Key the synthetic tone on for this long...
    #[arg(long, default_value_t = 0)]
    pub tone_on_ms: u64,

    /// ...then off for this long
    #[arg(long, default_value_t = 0)]
    pub tone_off_ms: u64,

    /// Frequency to detect, in Hz
    #[arg(long)]
    pub target_hz: Option<f32>,

    /// Allowed deviation from the target, in Hz
    #[arg(long)]
    pub tolerance_hz: Option<f32>,

    /// Producer cycle period in milliseconds
    #[arg(long)]
    pub period_ms: Option<u64>,

    /// How often the latest result is reported, in milliseconds
    #[arg(long, default_value_t = 500)]
    pub report_ms: u64,

    /// Stop after this many seconds (runs forever when omitted)
    #[arg(long)]
    pub duration_secs: Option<f64>,

    /// Print one JSON object per report on stdout
    #[arg(long)]
    pub json: bool,
}
