use crate::error::{ModalSonicError, Result};
use crate::math::Vec3;
use std::time::Duration;

/// Configuration descriptor for a ModalSonic world
#[derive(Debug, Clone)]
pub struct ModalSonicWorldDesc {
    /// Audio sample rate; the modal filter bank steps at `1 / sample_rate`
    pub sample_rate: u32,
    /// Number of interleaved output channels (typically 2 for stereo)
    pub channels: u16,
    /// Frames per output stream callback requested from the device
    pub block_size: usize,
    /// Amount of audio the sample queue tries to keep buffered ahead of the device
    pub buffer_pad: Duration,
    /// Scale from summed modal amplitude to output sample value
    pub output_gain: f32,
    /// Upper clamp on the frame delta time fed to the integrator, in seconds
    pub max_time_step: f32,
    /// Gravitational acceleration in m/s²
    pub gravity: Vec3,
    /// Coefficient of restitution for wall impacts
    pub restitution: f32,
    /// Bound on collision-resolution passes per body per tick
    pub max_collision_iterations: usize,
    /// Magnitude under which a trailing output sample counts as silence
    pub silence_threshold: f32,
}

impl Default for ModalSonicWorldDesc {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            block_size: 256,
            buffer_pad: Duration::from_millis(50),
            output_gain: 0.02,
            max_time_step: 0.01,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            restitution: 0.5,
            max_collision_iterations: 64,
            silence_threshold: 1e-6,
        }
    }
}

impl ModalSonicWorldDesc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = rate;
        self
    }

    pub fn channels(mut self, channels: u16) -> Self {
        self.channels = channels;
        self
    }

    pub fn block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }

    pub fn buffer_pad(mut self, pad: Duration) -> Self {
        self.buffer_pad = pad;
        self
    }

    pub fn output_gain(mut self, gain: f32) -> Self {
        self.output_gain = gain;
        self
    }

    pub fn max_time_step(mut self, dt: f32) -> Self {
        self.max_time_step = dt;
        self
    }

    pub fn gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn max_collision_iterations(mut self, iterations: usize) -> Self {
        self.max_collision_iterations = iterations;
        self
    }

    /// Audio sample interval `h` in seconds.
    pub fn sample_interval(&self) -> f32 {
        1.0 / self.sample_rate as f32
    }

    /// Capacity of the sample queue: one second of interleaved audio.
    pub fn queue_capacity(&self) -> usize {
        self.sample_rate as usize * self.channels as usize
    }

    /// Target queue fill in interleaved samples, rounded down to whole frames.
    pub fn pad_samples(&self) -> usize {
        let frames = self.buffer_pad.as_micros() * self.sample_rate as u128 / 1_000_000;
        frames as usize * self.channels as usize
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(ModalSonicError::Configuration(
                "sample_rate must be greater than 0".into(),
            ));
        }
        if self.channels == 0 {
            return Err(ModalSonicError::Configuration(
                "channels must be greater than 0".into(),
            ));
        }
        if !(self.max_time_step > 0.0 && self.max_time_step.is_finite()) {
            return Err(ModalSonicError::Configuration(format!(
                "max_time_step must be positive, got {}",
                self.max_time_step
            )));
        }
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(ModalSonicError::Configuration(format!(
                "restitution must lie in [0, 1], got {}",
                self.restitution
            )));
        }
        if self.max_collision_iterations == 0 {
            return Err(ModalSonicError::Configuration(
                "max_collision_iterations must be at least 1".into(),
            ));
        }
        if self.pad_samples() > self.queue_capacity() {
            return Err(ModalSonicError::Configuration(format!(
                "buffer_pad {:?} exceeds the one-second sample queue",
                self.buffer_pad
            )));
        }
        Ok(())
    }
}
