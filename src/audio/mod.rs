//! Module audio
//!
//! Buffer d'échantillons et sortie vers le périphérique audio.

mod buffer;
mod output;

pub use buffer::{OverflowPolicy, SampleBuffer, MAX_BUFFERED_SAMPLES};
pub use output::{render_interleaved, CpalOutput, OutputError};
