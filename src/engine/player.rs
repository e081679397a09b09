//! Real-time audio playback using cpal

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, SampleFormat, Stream, StreamConfig, SupportedBufferSize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

use super::GraphRenderer;
use crate::error::{KeyboardError, Result};

/// Scratch samples allocated up front for the mono mix
const SCRATCH_FRAMES: usize = 4096;

/// Somewhere rendered audio can be sent
pub trait AudioOutput {
    /// Start pulling samples from `renderer`
    fn start(&mut self, renderer: GraphRenderer) -> Result<()>;

    /// Stop output; the renderer is dropped
    fn stop(&mut self);
}

/// Real-time audio player
pub struct Player {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    stream: Option<Stream>,
    running: Arc<AtomicBool>,
}

/// Fixed callback size for `requested` frames within the device's range
fn stream_buffer_size(requested: usize, supported: &SupportedBufferSize) -> BufferSize {
    let requested = u32::try_from(requested).unwrap_or(u32::MAX);
    match *supported {
        SupportedBufferSize::Range { min, max } => BufferSize::Fixed(requested.clamp(min, max)),
        SupportedBufferSize::Unknown => BufferSize::Fixed(requested),
    }
}

impl Player {
    /// Open the named output device, or the default one.
    ///
    /// `buffer_size` is the requested callback size in frames, clamped to
    /// what the device supports.
    pub fn open(device_name: Option<&str>, buffer_size: usize) -> Result<Self> {
        let host = cpal::default_host();
        let device = match device_name {
            Some(name) => find_output_device(&host, name)?,
            None => host
                .default_output_device()
                .ok_or_else(|| KeyboardError::AudioDevice("no output device available".into()))?,
        };

        let supported = device
            .default_output_config()
            .map_err(|e| KeyboardError::AudioDevice(e.to_string()))?;
        let sample_format = supported.sample_format();
        let buffer = stream_buffer_size(buffer_size, supported.buffer_size());
        let mut config: StreamConfig = supported.into();
        config.buffer_size = buffer;

        info!(
            device = %device.name().unwrap_or_default(),
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            buffer = ?config.buffer_size,
            "opened audio output"
        );

        Ok(Self {
            device,
            config,
            sample_format,
            stream: None,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Sample rate the device will be driven at
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// Check if currently playing
    pub fn is_playing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn build_stream<T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32>>(
        &self,
        mut renderer: GraphRenderer,
    ) -> Result<Stream> {
        let channels = self.config.channels as usize;
        let running = self.running.clone();
        let frames = match self.config.buffer_size {
            BufferSize::Fixed(n) => n as usize,
            BufferSize::Default => 0,
        };
        let mut scratch = vec![0.0f32; SCRATCH_FRAMES.max(frames)];

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    if !running.load(Ordering::SeqCst) {
                        // Fill with silence when stopped
                        for sample in data.iter_mut() {
                            *sample = T::from_sample(0.0f32);
                        }
                        return;
                    }

                    let frames = data.len() / channels;
                    if scratch.len() < frames {
                        scratch.resize(frames, 0.0);
                    }
                    let mono = &mut scratch[..frames];
                    renderer.fill_buffer(mono);

                    for (frame, &sample) in data.chunks_mut(channels).zip(mono.iter()) {
                        for channel_sample in frame.iter_mut() {
                            *channel_sample = T::from_sample(sample);
                        }
                    }
                },
                |err| {
                    error!("audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| KeyboardError::AudioStream(e.to_string()))?;

        Ok(stream)
    }
}

impl AudioOutput for Player {
    fn start(&mut self, renderer: GraphRenderer) -> Result<()> {
        self.running.store(true, Ordering::SeqCst);

        let stream = match self.sample_format {
            SampleFormat::F32 => self.build_stream::<f32>(renderer)?,
            SampleFormat::I16 => self.build_stream::<i16>(renderer)?,
            SampleFormat::U16 => self.build_stream::<u16>(renderer)?,
            other => {
                return Err(KeyboardError::AudioStream(format!(
                    "unsupported sample format {:?}",
                    other
                )))
            }
        };

        stream
            .play()
            .map_err(|e| KeyboardError::AudioStream(e.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.stream = None;
    }
}

fn find_output_device(host: &cpal::Host, name: &str) -> Result<Device> {
    let devices = host
        .output_devices()
        .map_err(|e| KeyboardError::AudioDevice(e.to_string()))?;
    for device in devices {
        if device.name().map(|n| n == name).unwrap_or(false) {
            return Ok(device);
        }
    }
    Err(KeyboardError::AudioDevice(format!("no output device named '{}'", name)))
}

/// Get the default output device name
pub fn default_device_name() -> Option<String> {
    let host = cpal::default_host();
    host.default_output_device().and_then(|d| d.name().ok())
}

/// List all available output devices
pub fn list_output_devices() -> Vec<(String, StreamConfig)> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    if let Ok(output_devices) = host.output_devices() {
        for device in output_devices {
            if let (Ok(name), Ok(config)) = (device.name(), device.default_output_config()) {
                devices.push((name, config.into()));
            }
        }
    }

    devices
}
