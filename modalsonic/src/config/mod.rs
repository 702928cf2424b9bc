//! Configuration for ModalSonic

mod synth_config;
mod world_desc;

pub use synth_config::{ModalBasisOptions, ModeSelection, SynthesizerConfig};
pub use world_desc::ModalSonicWorldDesc;
