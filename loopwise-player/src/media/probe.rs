//! Container probing using symphonia
//!
//! Only duration and audio-track metadata are read; no packets are decoded.
//! Both functions block on file I/O and are meant to run under
//! `tokio::task::spawn_blocking`.

use super::AudioTrack;
use crate::error::{Error, Result};
use std::fs::File;
use std::path::Path;
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

fn open_format(path: &Path) -> Result<Box<dyn FormatReader>> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Create hint from file extension
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| Error::Probe(format!("{}: {}", path.display(), e)))?;

    Ok(probed.format)
}

/// Read the default track's duration in seconds
///
/// Fails when the container does not report a frame count.
pub fn probe_duration(path: &Path) -> Result<f64> {
    let format = open_format(path)?;

    let track = format
        .default_track()
        .ok_or_else(|| Error::Probe(format!("{}: no default track", path.display())))?;
    let params = &track.codec_params;

    match (params.n_frames, params.time_base, params.sample_rate) {
        (Some(n_frames), Some(time_base), _) => {
            let time = time_base.calc_time(n_frames);
            Ok(time.seconds as f64 + time.frac)
        }
        (Some(n_frames), None, Some(sample_rate)) if sample_rate > 0 => {
            Ok(n_frames as f64 / sample_rate as f64)
        }
        _ => Err(Error::Probe(format!(
            "{}: container does not report duration",
            path.display()
        ))),
    }
}

/// Find the first track with a known codec
pub fn probe_audio_track(path: &Path) -> Result<Option<AudioTrack>> {
    let format = open_format(path)?;

    Ok(format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .map(|t| AudioTrack {
            id: t.id,
            channels: t.codec_params.channels.map(|c| c.count()),
            sample_rate: t.codec_params.sample_rate,
        }))
}
