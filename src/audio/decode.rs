use anyhow::{Context, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Mono samples in [-1, 1] and the rate they were recorded at.
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

pub fn decode_file(path: &Path) -> Result<DecodedAudio> {
    let mut reader = open_reader(path)?;
    let track = reader
        .default_track()
        .filter(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .or_else(|| reader.tracks().iter().find(|t| t.codec_params.codec != CODEC_TYPE_NULL))
        .with_context(|| format!("{} carries no decodable track", path.display()))?;
    let track_id = track.id;
    let channels = track.codec_params.channels.map_or(1, |c| c.count());
    let sample_rate = track
        .codec_params
        .sample_rate
        .with_context(|| format!("{} does not declare a sample rate", path.display()))?;
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .with_context(|| format!("Unsupported codec in {}", path.display()))?;

    let mut mono = Vec::new();
    let mut skipped = 0usize;
    while let Some(packet) = next_packet(reader.as_mut())? {
        if packet.track_id() != track_id {
            continue;
        }
        match decoder.decode(&packet) {
            Ok(buf) => {
                let mut interleaved = SampleBuffer::<f32>::new(buf.frames() as u64, *buf.spec());
                interleaved.copy_interleaved_ref(buf);
                downmix_into(interleaved.samples(), channels, &mut mono);
            }
            Err(SymphoniaError::DecodeError(msg)) => {
                skipped += 1;
                log::debug!("Dropping corrupt packet in {}: {}", path.display(), msg);
            }
            Err(e) => return Err(e.into()),
        }
    }

    if skipped > 0 {
        log::warn!("{}: {} packets could not be decoded", path.display(), skipped);
    }
    log::info!(
        "Loaded {} ({} Hz, {} ch): {:.1}s of audio",
        path.display(),
        sample_rate,
        channels,
        mono.len() as f32 / sample_rate as f32
    );

    Ok(DecodedAudio {
        samples: mono,
        sample_rate,
    })
}

fn open_reader(path: &Path) -> Result<Box<dyn FormatReader>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Cannot open {}", path.display()))?;
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }
    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            MediaSourceStream::new(Box::new(file), Default::default()),
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .with_context(|| format!("{} is not a recognised audio container", path.display()))?;
    Ok(probed.format)
}

/// `None` once the container is exhausted.
fn next_packet(reader: &mut dyn FormatReader) -> Result<Option<Packet>> {
    match reader.next_packet() {
        Ok(packet) => Ok(Some(packet)),
        Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
        Err(SymphoniaError::ResetRequired) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Averages interleaved frames down to one channel.
fn downmix_into(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels <= 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    out.extend(
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
    );
}
