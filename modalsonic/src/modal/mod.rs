//! Linear modal sound synthesis.
//!
//! A [`ModalBasis`] holds the natural frequencies and per-vertex displacement
//! shapes of a body's vibration modes, rescaled to the body's material and
//! size. A [`ModalSynthesizer`] drives one second-order recursive filter per
//! mode from the impulses a body receives, producing audio-rate samples.

mod basis;
mod synthesizer;

pub use basis::{ModalBasis, ModalBasisDesc};
pub use synthesizer::{ModalSynthesizer, samples_per_tick};
