//! Sample queue between the simulation thread and the audio output thread.

use ringbuf::HeapRb;
use ringbuf::traits::{Consumer, Observer, Producer};
use std::sync::{Mutex, PoisonError};

/// What a single [`SampleQueue::push`] did to keep the queue near its target
/// fill level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PushReport {
    /// Samples written to the queue, padding included
    pub pushed: usize,
    /// Zeros appended to bring the queue up to the target
    pub padded: usize,
    /// Trailing silent samples left out to bring the queue down to the target
    pub trimmed: usize,
    /// Samples that did not fit
    pub dropped: usize,
}

/// Bounded, interleaved `f32` queue guarded by a single lock.
///
/// The lock is held only for one push or one pop. The consumer side never
/// waits for it: if the producer holds it, the consumer gets silence.
pub struct SampleQueue {
    buffer: Mutex<HeapRb<f32>>,
    channels: usize,
    silence_threshold: f32,
}

impl SampleQueue {
    /// Creates a queue holding `capacity` samples, pre-filled with
    /// `initial_pad` zeros.
    pub fn new(capacity: usize, channels: u16, initial_pad: usize, silence_threshold: f32) -> Self {
        let mut rb = HeapRb::<f32>::new(capacity.max(1));
        let padded = rb.push_iter(std::iter::repeat_n(0.0, initial_pad));

        log::debug!(
            "Sample queue: capacity {} samples, {} channels, {} samples of initial padding",
            capacity,
            channels,
            padded
        );

        Self {
            buffer: Mutex::new(rb),
            channels: channels.max(1) as usize,
            silence_threshold,
        }
    }

    /// Number of queued samples.
    pub fn len(&self) -> usize {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Publishes a batch of interleaved samples, steering the queue toward
    /// `pad_target` queued samples.
    ///
    /// Only a batch ending in silence is adjusted: when the queue would end up
    /// below the target, zeros are appended; when above, up to the whole
    /// trailing silent run is left out. Adjustments are made in whole frames.
    pub fn push(&self, samples: &[f32], pad_target: usize) -> PushReport {
        let silent = self.trailing_silence(samples);

        let mut rb = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut report = PushReport::default();
        let mut to_push = samples.len();

        if silent > 0 {
            let after_push = rb.occupied_len() + samples.len();
            if after_push < pad_target {
                report.padded = self.whole_frames(pad_target - after_push);
            } else if after_push > pad_target {
                report.trimmed = self.whole_frames((after_push - pad_target).min(silent));
                to_push -= report.trimmed;
            }
        }

        let written = rb.push_slice(&samples[..to_push]);
        let padded = rb.push_iter(std::iter::repeat_n(0.0, report.padded));
        drop(rb);

        report.dropped = (to_push - written) + (report.padded - padded);
        report.padded = padded;
        report.pushed = written + padded;

        if report.dropped > 0 {
            log::warn!(
                "Sample queue full: dropped {} of {} samples",
                report.dropped,
                samples.len()
            );
        }

        report
    }

    /// Fills `out` from the queue without waiting.
    ///
    /// Whatever the queue cannot supply is zero-filled. Returns the number of
    /// queued samples copied.
    pub fn pop(&self, out: &mut [f32]) -> usize {
        let popped = match self.buffer.try_lock() {
            Ok(mut rb) => rb.pop_slice(out),
            Err(_) => 0,
        };
        out[popped..].fill(0.0);
        popped
    }

    fn trailing_silence(&self, samples: &[f32]) -> usize {
        let silent = samples
            .iter()
            .rev()
            .take_while(|s| s.abs() < self.silence_threshold)
            .count();
        self.whole_frames(silent)
    }

    fn whole_frames(&self, samples: usize) -> usize {
        samples - samples % self.channels
    }
}

impl std::fmt::Debug for SampleQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleQueue")
            .field("len", &self.len())
            .field("channels", &self.channels)
            .finish()
    }
}
