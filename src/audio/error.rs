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
/// Errors raised while opening or driving an audio output device. Device creation failures are
/// fatal: they are surfaced to the caller and never retried.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("no output device found with name {0}")]
    DeviceNotFound(String),
    #[error("unable to list audio devices: {0}")]
    Devices(#[from] cpal::DevicesError),
    #[error("unable to read device name: {0}")]
    DeviceName(#[from] cpal::DeviceNameError),
    #[error("audio host unavailable: {0}")]
    HostUnavailable(#[from] cpal::HostUnavailable),
    #[error("unable to read supported output configs: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),
    #[error("no default output config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),
    #[error("unsupported sample format {0}")]
    UnsupportedSampleFormat(String),
    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),
    #[error("failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
    #[error("audio output thread is no longer running")]
    OutputThreadGone,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while turning encoded audio bytes into a decoded buffer.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unable to decode audio: {0}")]
    Symphonia(#[from] symphonia::core::errors::Error),
    #[error("no decodable audio track found")]
    NoAudioTrack,
    #[error("audio track does not declare a sample rate")]
    UnknownSampleRate,
    #[error("decoded audio contains no frames")]
    Empty,
    #[error("invalid buffer: {0}")]
    InvalidBuffer(String),
    #[error("unable to read audio file: {0}")]
    Io(#[from] std::io::Error),
    #[error("decode task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
