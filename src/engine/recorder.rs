//! WAV file recorder
//!
//! Renders the mixing graph offline into a mono float WAV file.

use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use super::GraphRenderer;

/// Samples rendered per block when pulling from a renderer
const BLOCK: usize = 512;

/// WAV file recorder
pub struct Recorder {
    writer: WavWriter<BufWriter<File>>,
    sample_rate: u32,
    samples_written: u64,
    peak: f32,
    block: Vec<f32>,
}

impl Recorder {
    /// Create a new recorder
    ///
    /// # Arguments
    /// * `path` - Output file path
    /// * `sample_rate` - Sample rate in Hz
    pub fn new(path: &Path, sample_rate: u32) -> Result<Self> {
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };

        let writer = WavWriter::create(path, spec)
            .with_context(|| format!("failed to create WAV file: {:?}", path))?;

        Ok(Self {
            writer,
            sample_rate,
            samples_written: 0,
            peak: 0.0,
            block: vec![0.0; BLOCK],
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }

    /// Get the duration recorded in seconds
    pub fn duration_secs(&self) -> f64 {
        self.samples_written as f64 / self.sample_rate as f64
    }

    /// Largest absolute sample written so far
    pub fn peak(&self) -> f32 {
        self.peak
    }

    /// Write a buffer of samples
    pub fn write_buffer(&mut self, buffer: &[f32]) -> Result<()> {
        for &sample in buffer {
            self.writer
                .write_sample(sample)
                .context("failed to write sample")?;
            self.peak = self.peak.max(sample.abs());
        }
        self.samples_written += buffer.len() as u64;
        Ok(())
    }

    /// Render `samples` samples from `renderer` and write them
    pub fn write_from(&mut self, renderer: &mut GraphRenderer, samples: usize) -> Result<()> {
        let mut block = std::mem::take(&mut self.block);
        let mut left = samples;
        let result = loop {
            if left == 0 {
                break Ok(());
            }
            let n = left.min(block.len());
            renderer.fill_buffer(&mut block[..n]);
            if let Err(e) = self.write_buffer(&block[..n]) {
                break Err(e);
            }
            left -= n;
        };
        self.block = block;
        result
    }

    /// Finalize the WAV file
    ///
    /// This must be called to properly close the file and write the header.
    pub fn finalize(self) -> Result<()> {
        self.writer.finalize().context("failed to finalize WAV file")
    }
}
