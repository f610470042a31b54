//! Module d'entrée micro
//!
//! Relie une source de capture au callback audio de l'hôte.

mod renderer;
mod stream_input;

pub use renderer::{BlockRenderer, PlaybackControl, PlaybackState, Pull};
pub use stream_input::{
    AdapterConfig, AdapterEvent, CaptureState, MicrophoneStreamAdapter, CAPTURE_SAMPLE_RATE,
    DEFAULT_BLOCK_SIZE,
};
