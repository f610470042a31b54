//! Module de capture audio
//!
//! Définit la source de capture et son implémentation micro cpal.

mod microphone;
mod source;

pub use microphone::{CpalMicrophone, MicrophoneConfig};
pub use source::{CaptureError, CaptureEvent, CaptureSender, CaptureSource};

#[cfg(test)]
pub use source::MockCaptureSource;
