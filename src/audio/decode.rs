// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
//! Decodes encoded audio bytes (WAV, MP3, FLAC, OGG and anything else symphonia can probe) into
//! a [DecodedBuffer].
use std::{fs, io::Cursor, path::Path};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, warn};

use super::{buffer::DecodedBuffer, error::DecodeError};

/// Decodes the given bytes. The extension hint (e.g. "wav") helps the probe pick a format, but
/// the content decides.
pub fn decode_bytes(bytes: Vec<u8>, extension: Option<&str>) -> Result<DecodedBuffer, DecodeError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = extension {
        hint.with_extension(extension);
    }

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();
    let probed = get_probe().format(&hint, mss, &fmt_opts, &meta_opts)?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoAudioTrack)?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(DecodeError::UnknownSampleRate)?;

    let decoder_opts: DecoderOptions = Default::default();
    let mut decoder = get_codecs().make(&track.codec_params, &decoder_opts)?;

    let mut channels: Vec<Vec<f32>> = Vec::new();
    let mut sample_buffer: Option<SampleBuffer<f32>> = None;
    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                warn!(err = e, "Skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        let channel_count = spec.channels.count();
        if channel_count == 0 {
            continue;
        }
        if channels.is_empty() {
            channels = vec![Vec::new(); channel_count];
        }

        // Packets can grow; rebuild the scratch buffer when one doesn't fit.
        let capacity = decoded.capacity() as u64;
        let needs_new = sample_buffer
            .as_ref()
            .map_or(true, |buf| buf.capacity() < decoded.capacity() * channel_count);
        if needs_new {
            sample_buffer = Some(SampleBuffer::<f32>::new(capacity, spec));
        }
        let Some(buf) = sample_buffer.as_mut() else {
            continue;
        };
        buf.copy_interleaved_ref(decoded);

        for frame in buf.samples().chunks_exact(channel_count) {
            for (channel, sample) in channels.iter_mut().zip(frame) {
                channel.push(*sample);
            }
        }
    }

    if channels.first().map_or(true, |channel| channel.is_empty()) {
        return Err(DecodeError::Empty);
    }

    let buffer = DecodedBuffer::new(channels, sample_rate)?;
    debug!(
        channels = buffer.channel_count(),
        frames = buffer.frames(),
        sample_rate,
        "Decoded audio"
    );
    Ok(buffer)
}

/// Decodes the given bytes on the blocking thread pool.
pub async fn decode(bytes: Vec<u8>, extension: Option<String>) -> Result<DecodedBuffer, DecodeError> {
    tokio::task::spawn_blocking(move || decode_bytes(bytes, extension.as_deref())).await?
}

/// Reads and decodes the audio file at the given path.
pub fn decode_file(path: &Path) -> Result<DecodedBuffer, DecodeError> {
    let bytes = fs::read(path).map_err(|e| {
        DecodeError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })?;
    decode_bytes(bytes, path.extension().and_then(|ext| ext.to_str()))
}
