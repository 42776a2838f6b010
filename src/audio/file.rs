use anyhow::{bail, Context, Result};
use std::io::Cursor;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

/// Decoded shape of an uploaded audio payload.
///
/// Duration comes from the decoded sample-frame count and sample rate, never
/// from the payload size.
pub struct AudioFile {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub frames: u64,
}

impl AudioFile {
    /// Decode an in-memory audio payload far enough to count sample frames.
    ///
    /// `extension` is a container hint taken from the uploaded filename
    /// (e.g. "wav", "mp3"); the probe falls back to content sniffing
    /// without it.
    pub fn from_bytes(bytes: &[u8], extension: Option<&str>) -> Result<Self> {
        let source = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = extension {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                source,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .context("Unrecognized audio container")?;

        let mut format = probed.format;
        let track = format
            .default_track()
            .context("Audio container has no default track")?;
        let track_id = track.id;

        let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
        let mut channels = track
            .codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(0);

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .context("Unsupported audio codec")?;

        let mut frames: u64 = 0;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                // End of stream surfaces as an UnexpectedEof I/O error.
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(e).context("Failed to read audio packet"),
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = decoded.spec();
                    if sample_rate == 0 {
                        sample_rate = spec.rate;
                    }
                    if channels == 0 {
                        channels = spec.channels.count() as u16;
                    }
                    frames += decoded.frames() as u64;
                }
                // A corrupt packet is skippable; a hard decoder error is not.
                Err(SymphoniaError::DecodeError(_)) => continue,
                Err(e) => return Err(e).context("Failed to decode audio packet"),
            }
        }

        if frames == 0 || sample_rate == 0 {
            bail!("Audio payload contains no decodable samples");
        }

        let duration_seconds = frames as f64 / sample_rate as f64;

        debug!(
            "Decoded audio payload: {:.1}s, {}Hz, {} channels, {} frames",
            duration_seconds, sample_rate, channels, frames
        );

        Ok(Self {
            duration_seconds,
            sample_rate,
            channels,
            frames,
        })
    }
}
