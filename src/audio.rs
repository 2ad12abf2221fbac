//! Sidetone driver.
//!
//! A continuous 800 Hz sine runs for the life of the output stream; START
//! and STOP only toggle its gain between two fixed levels, the oscillator is
//! never stopped or restarted. The oscillator state lives on the audio
//! thread, the gain cell is shared with the panel thread.

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use anyhow::{anyhow, Context};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{info, warn};

use crate::ws::SoundCommand;

/// Sidetone frequency in Hz.
pub const TONE_HZ: f32 = 800.0;
/// Gain while keyed.
pub const GAIN_AUDIBLE: f32 = 0.2;
/// Gain while idle.
pub const GAIN_SILENT: f32 = 0.0;

/// Gain level shared between the panel thread and the audio callback.
#[derive(Clone)]
struct GainCell(Arc<AtomicU32>);

impl GainCell {
    fn new(level: f32) -> Self {
        Self(Arc::new(AtomicU32::new(level.to_bits())))
    }

    fn set(&self, level: f32) {
        self.0.store(level.to_bits(), Ordering::Relaxed);
    }

    fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

/// Phase accumulator sine source, gated by a [`GainCell`].
struct SineSource {
    /// Phase in cycles, wraps at 1.0
    phase: f32,
    step: f32,
    gain: GainCell,
}

impl SineSource {
    fn new(freq_hz: f32, sample_rate: f32, gain: GainCell) -> Self {
        Self {
            phase: 0.0,
            step: freq_hz / sample_rate,
            gain,
        }
    }

    fn next_sample(&mut self) -> f32 {
        let sample = (self.phase * std::f32::consts::TAU).sin() * self.gain.get();
        self.phase += self.step;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        sample
    }
}

/// Tone driver state machine: uninitialized until [`ToneDriver::arm`] runs,
/// armed for the rest of the panel's life.
#[derive(Default)]
pub struct ToneDriver {
    armed: Option<Armed>,
}

struct Armed {
    gain: GainCell,
    // stream stops when dropped
    _stream: Option<cpal::Stream>,
}

impl ToneDriver {
    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Current gain level, if armed.
    pub fn gain(&self) -> Option<f32> {
        self.armed.as_ref().map(|armed| armed.gain.get())
    }

    /// Build the oscillator and start it muted. No-op when already armed.
    pub fn arm(&mut self) -> anyhow::Result<()> {
        if self.armed.is_some() {
            return Ok(());
        }

        let gain = GainCell::new(GAIN_SILENT);
        let stream = build_output_stream(gain.clone())?;
        self.armed = Some(Armed {
            gain,
            _stream: Some(stream),
        });
        info!("audio armed: {} Hz sine, muted", TONE_HZ);
        Ok(())
    }

    /// Arm without an output device, for the state machine tests.
    #[cfg(test)]
    fn arm_detached(&mut self) {
        if self.armed.is_none() {
            self.armed = Some(Armed {
                gain: GainCell::new(GAIN_SILENT),
                _stream: None,
            });
        }
    }

    /// Apply a sound-channel command.
    ///
    /// Commands before arming are logged and dropped: the device may key
    /// before the operator has armed audio, and there is nothing useful to
    /// do with the command then.
    pub fn apply(&mut self, command: SoundCommand) {
        let Some(armed) = &self.armed else {
            info!("audio not armed yet, dropping {:?}", command);
            return;
        };

        match command {
            SoundCommand::Start => armed.gain.set(GAIN_AUDIBLE),
            SoundCommand::Stop => armed.gain.set(GAIN_SILENT),
            SoundCommand::Unknown(raw) => warn!("unknown sound message: {}", raw),
        }
    }
}

fn build_output_stream(gain: GainCell) -> anyhow::Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| anyhow!("no audio output device"))?;
    let config = device
        .default_output_config()
        .context("querying output config")?;
    if config.sample_format() != cpal::SampleFormat::F32 {
        return Err(anyhow!(
            "unsupported sample format {:?}",
            config.sample_format()
        ));
    }

    let channels = config.channels() as usize;
    let mut source = SineSource::new(TONE_HZ, config.sample_rate().0 as f32, gain);
    let stream = device.build_output_stream(
        &config.into(),
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            for frame in data.chunks_mut(channels) {
                let sample = source.next_sample();
                for out in frame {
                    *out = sample;
                }
            }
        },
        |err| warn!("audio stream error: {}", err),
        None,
    )?;
    stream.play().context("starting output stream")?;
    Ok(stream)
}
