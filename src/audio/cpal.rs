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
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Sender;
use tracing::{debug, error, info, span, Level};

use crate::config;

use super::{
    error::AudioError,
    mixer::{VoiceMixer, VoiceSender},
    thread_priority, Clock,
};

/// Commands handled by the output thread, which owns the (non-Send) cpal stream.
enum StreamCommand {
    /// Starts the stream and reports the result.
    Play(Sender<Result<(), AudioError>>),
}

/// Describes an output device known to cpal.
#[derive(Clone, Debug)]
pub struct DeviceInfo {
    /// The name of the device.
    name: String,
    /// The maximum number of channels the device supports.
    max_channels: u16,
    /// The host ID of the device.
    host_id: cpal::HostId,
}

impl DeviceInfo {
    /// The name of the device.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The maximum number of output channels.
    pub fn max_channels(&self) -> u16 {
        self.max_channels
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.max_channels,
            self.host_id.name()
        )
    }
}

/// A cpal output device driving a voice mixer. The stream is built paused; the clock starts
/// moving once the device is resumed.
pub struct Device {
    /// What cpal told us about the device.
    info: DeviceInfo,
    /// The mixer the stream callback renders from.
    mixer: Arc<VoiceMixer>,
    /// Set once the stream is playing.
    running: AtomicBool,
    /// Talks to the output thread. Dropping it stops the thread.
    command_tx: Option<Sender<StreamCommand>>,
    /// Handle to the output thread.
    output_thread: Option<thread::JoinHandle<()>>,
}

/// Lists cpal output devices.
pub fn list_devices() -> Result<Vec<DeviceInfo>, AudioError> {
    Ok(list_cpal_devices()?
        .into_iter()
        .map(|(info, _)| info)
        .collect())
}

/// Lists cpal output devices along with the devices themselves.
fn list_cpal_devices() -> Result<Vec<(DeviceInfo, cpal::Device)>, AudioError> {
    // Suppress noisy output here.
    let _shh_stdout = shh::stdout()?;
    let _shh_stderr = shh::stderr()?;

    let mut devices = Vec::new();
    for host_id in cpal::available_hosts() {
        let host_devices = match cpal::host_from_id(host_id)?.devices() {
            Ok(host_devices) => host_devices,
            Err(e) => {
                error!(
                    err = e.to_string(),
                    host = host_id.name(),
                    "Unable to list devices for host"
                );
                continue;
            }
        };

        for device in host_devices {
            let max_channels = max_output_channels(&device);
            if max_channels > 0 {
                devices.push((
                    DeviceInfo {
                        name: device.name()?,
                        max_channels,
                        host_id,
                    },
                    device,
                ))
            }
        }
    }

    devices.sort_by_key(|(info, _)| info.name.to_string());
    Ok(devices)
}

/// The largest channel count among the device's output configs, or 0 if it has none.
fn max_output_channels(device: &cpal::Device) -> u16 {
    match device.supported_output_configs() {
        Ok(configs) => configs.map(|config| config.channels()).max().unwrap_or(0),
        Err(_) => 0,
    }
}

/// Finds the device with the given name. "default" is the default host's default output.
fn find_device(name: &str) -> Result<(DeviceInfo, cpal::Device), AudioError> {
    if name == "default" {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| AudioError::DeviceNotFound(name.to_string()))?;
        let info = DeviceInfo {
            name: device.name()?,
            max_channels: max_output_channels(&device),
            host_id: host.id(),
        };
        return Ok((info, device));
    }

    list_cpal_devices()?
        .into_iter()
        .find(|(info, _)| info.name.trim() == name)
        .ok_or_else(|| AudioError::DeviceNotFound(name.to_string()))
}

impl Device {
    /// Opens the given cpal device and builds its output stream, paused.
    pub fn get(config: &config::Audio) -> Result<Device, AudioError> {
        let span = span!(Level::INFO, "open device (cpal)");
        let _enter = span.enter();

        let (info, device) = find_device(config.device())?;
        let default_config = device.default_output_config()?;
        let sample_format = default_config.sample_format();
        let num_channels = default_config.channels();
        let sample_rate = config
            .sample_rate()
            .unwrap_or(default_config.sample_rate().0);

        let stream_config = cpal::StreamConfig {
            channels: num_channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: match config.buffer_size() {
                Some(frames) => cpal::BufferSize::Fixed(frames),
                None => cpal::BufferSize::Default,
            },
        };

        let mixer = Arc::new(VoiceMixer::new(
            num_channels,
            sample_rate,
            config.master_gain(),
        ));

        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), AudioError>>(1);
        let (command_tx, command_rx) = crossbeam_channel::unbounded::<StreamCommand>();
        let output_thread = {
            let mixer = mixer.clone();
            thread::Builder::new()
                .name("padseq-cpal-output".into())
                .spawn(move || {
                    let stream = match build_stream(&device, &stream_config, sample_format, mixer)
                    {
                        Ok(stream) => stream,
                        Err(e) => {
                            let _ = ready_tx.send(Err(e));
                            return;
                        }
                    };
                    // Some hosts start streams as soon as they're built.
                    if let Err(e) = stream.pause() {
                        debug!(err = %e, "Unable to pause new output stream");
                    }
                    let _ = ready_tx.send(Ok(()));

                    for command in command_rx.iter() {
                        match command {
                            StreamCommand::Play(reply) => {
                                let _ = reply.send(stream.play().map_err(AudioError::from));
                            }
                        }
                    }
                    debug!("Output thread stopping");
                })?
        };
        ready_rx.recv().map_err(|_| AudioError::OutputThreadGone)??;

        info!(
            device = info.name,
            channels = num_channels,
            sample_rate,
            sample_format = ?sample_format,
            "Output stream ready"
        );

        Ok(Device {
            info,
            mixer,
            running: AtomicBool::new(false),
            command_tx: Some(command_tx),
            output_thread: Some(output_thread),
        })
    }
}

/// Builds the output stream for the device's native sample format.
fn build_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    mixer: Arc<VoiceMixer>,
) -> Result<cpal::Stream, AudioError> {
    match sample_format {
        cpal::SampleFormat::F32 => build_typed_stream::<f32>(device, config, mixer),
        cpal::SampleFormat::I16 => build_typed_stream::<i16>(device, config, mixer),
        cpal::SampleFormat::U16 => build_typed_stream::<u16>(device, config, mixer),
        cpal::SampleFormat::I32 => build_typed_stream::<i32>(device, config, mixer),
        other => Err(AudioError::UnsupportedSampleFormat(format!("{:?}", other))),
    }
}

/// Builds a stream whose callback mixes into an f32 scratch buffer and converts to `T`.
fn build_typed_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mixer: Arc<VoiceMixer>,
) -> Result<cpal::Stream, AudioError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let priority = thread_priority::callback_thread_priority();
    let rt_audio = thread_priority::rt_audio_enabled();
    let mut priority_set = false;
    let mut scratch: Vec<f32> = Vec::new();

    Ok(device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            thread_priority::configure_audio_thread_priority(
                priority,
                rt_audio,
                &mut priority_set,
            );
            scratch.resize(data.len(), 0.0);
            mixer.process_into_output(&mut scratch);
            for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
                *dst = T::from_sample(src);
            }
        },
        |err| error!("CPAL output stream error: {}", err),
        None,
    )?)
}

impl Clock for Device {
    fn current_time(&self) -> f64 {
        self.mixer.current_time()
    }
}

impl super::Device for Device {
    fn resume(&self) -> Result<(), AudioError> {
        if self.running.load(Ordering::Acquire) {
            return Ok(());
        }

        let command_tx = self
            .command_tx
            .as_ref()
            .ok_or(AudioError::OutputThreadGone)?;
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        command_tx
            .send(StreamCommand::Play(reply_tx))
            .map_err(|_| AudioError::OutputThreadGone)?;
        reply_rx.recv().map_err(|_| AudioError::OutputThreadGone)??;

        self.running.store(true, Ordering::Release);
        info!(device = self.info.name, "Output stream running");
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn voices(&self) -> VoiceSender {
        self.mixer.sender()
    }

    fn sample_rate(&self) -> u32 {
        self.mixer.sample_rate()
    }

    fn set_master_gain(&self, gain: f32) {
        self.mixer.set_master_gain(gain);
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        // Closing the command channel ends the output thread, which drops the stream.
        self.command_tx.take();
        if let Some(thread) = self.output_thread.take() {
            let _ = thread.join();
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.info, f)
    }
}
