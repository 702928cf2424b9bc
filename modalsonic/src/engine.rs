use crate::config::ModalSonicWorldDesc;
use crate::error::{ModalSonicError, Result};
use crate::events::ModalSonicEvent;
use crate::handoff::SampleQueue;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use crossbeam_channel::Sender;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Counters shared between the engine and its output callback.
#[derive(Default)]
struct StreamCounters {
    frames_processed: AtomicUsize,
    underrun_samples: AtomicUsize,
}

/// Audio output that plays whatever the simulation pushed to a [`SampleQueue`]
pub struct ModalSonicEngine {
    desc: ModalSonicWorldDesc,
    queue: Arc<SampleQueue>,
    stream: Option<cpal::Stream>,
    is_running: Arc<AtomicBool>,
    counters: Arc<StreamCounters>,
    event_sender: Option<Sender<ModalSonicEvent>>,
}

impl ModalSonicEngine {
    /// Create a new audio engine draining `queue`
    pub fn new(desc: ModalSonicWorldDesc, queue: Arc<SampleQueue>) -> Result<Self> {
        desc.validate()?;
        Ok(Self {
            desc,
            queue,
            stream: None,
            is_running: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(StreamCounters::default()),
            event_sender: None,
        })
    }

    /// Report engine start/stop and stream errors on this channel
    pub fn with_event_sender(mut self, sender: Sender<ModalSonicEvent>) -> Self {
        self.event_sender = Some(sender);
        self
    }

    /// Open the default output device and start pulling samples
    pub fn start(&mut self) -> Result<()> {
        if self.is_running.load(Ordering::Relaxed) {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host.default_output_device().ok_or_else(|| {
            ModalSonicError::AudioDevice("No default output device available".into())
        })?;

        let config = cpal::StreamConfig {
            channels: self.desc.channels,
            sample_rate: cpal::SampleRate(self.desc.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(self.desc.block_size as u32),
        };

        let default_config = device.default_output_config().map_err(|e| {
            ModalSonicError::AudioDevice(format!("Failed to get default config: {}", e))
        })?;

        let stream = match default_config.sample_format() {
            cpal::SampleFormat::F32 => self.create_stream::<f32>(&device, &config)?,
            cpal::SampleFormat::I16 => self.create_stream::<i16>(&device, &config)?,
            cpal::SampleFormat::U16 => self.create_stream::<u16>(&device, &config)?,
            format => {
                return Err(ModalSonicError::AudioFormat(format!(
                    "Unsupported sample format {:?}",
                    format
                )));
            }
        };

        stream
            .play()
            .map_err(|e| ModalSonicError::AudioDevice(format!("Failed to start stream: {}", e)))?;

        self.stream = Some(stream);
        self.is_running.store(true, Ordering::Relaxed);

        log::info!(
            "Audio engine started on {}: {} Hz, {} channels, {} frames per block",
            device.name().unwrap_or_else(|_| "unknown device".into()),
            self.desc.sample_rate,
            self.desc.channels,
            self.desc.block_size
        );
        self.emit(ModalSonicEvent::EngineStarted);

        Ok(())
    }

    /// Stop the audio engine
    pub fn stop(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            self.is_running.store(false, Ordering::Relaxed);
            drop(stream);
            log::info!(
                "Audio engine stopped after {} frames",
                self.frames_processed()
            );
            self.emit(ModalSonicEvent::EngineStopped);
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }

    /// Number of audio frames played since start
    pub fn frames_processed(&self) -> usize {
        self.counters.frames_processed.load(Ordering::Relaxed)
    }

    /// Number of samples that had to be played as silence because the queue
    /// was short
    pub fn underrun_samples(&self) -> usize {
        self.counters.underrun_samples.load(Ordering::Relaxed)
    }

    pub fn config(&self) -> &ModalSonicWorldDesc {
        &self.desc
    }

    fn emit(&self, event: ModalSonicEvent) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event) {
                log::warn!("Failed to send engine event: {}", e);
            }
        }
    }

    /// Create a typed audio stream
    fn create_stream<T>(
        &self,
        device: &cpal::Device,
        config: &cpal::StreamConfig,
    ) -> Result<cpal::Stream>
    where
        T: SizedSample + FromSample<f32>,
    {
        let channels = self.desc.channels as usize;
        let queue = self.queue.clone();
        let is_running = self.is_running.clone();
        let counters = self.counters.clone();
        let error_sender = self.event_sender.clone();
        let mut scratch: Vec<f32> = Vec::new();

        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    if !is_running.load(Ordering::Relaxed) {
                        for sample in data.iter_mut() {
                            *sample = T::from_sample(0.0f32);
                        }
                        return;
                    }

                    scratch.resize(data.len(), 0.0);
                    let popped = queue.pop(&mut scratch);

                    for (out, &value) in data.iter_mut().zip(scratch.iter()) {
                        *out = T::from_sample(value);
                    }

                    counters
                        .frames_processed
                        .fetch_add(data.len() / channels, Ordering::Relaxed);
                    counters
                        .underrun_samples
                        .fetch_add(data.len() - popped, Ordering::Relaxed);
                },
                move |err| {
                    log::error!("Audio stream error: {}", err);
                    if let Some(sender) = &error_sender {
                        let _ = sender.send(ModalSonicEvent::EngineError {
                            error: err.to_string(),
                        });
                    }
                },
                None,
            )
            .map_err(|e| ModalSonicError::AudioDevice(format!("Failed to build stream: {}", e)))?;

        Ok(stream)
    }
}

impl Drop for ModalSonicEngine {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
