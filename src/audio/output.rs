//! Sortie audio cpal qui tire les blocs du renderer

use crate::input::BlockRenderer;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};
use thiserror::Error;

/// Erreurs liées à la sortie audio
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Aucun périphérique de sortie trouvé")]
    NoDevice,

    #[error("Erreur de configuration: {0}")]
    ConfigError(String),

    #[error("Erreur de stream: {0}")]
    StreamError(String),
}

/// Stream de sortie vers le périphérique par défaut
pub struct CpalOutput {
    stream: Stream,
    channels: u16,
    sample_rate: u32,
}

impl CpalOutput {
    /// Ouvre la sortie par défaut et y branche le renderer
    ///
    /// Le buffer cpal est fixé à `block_size` trames.
    pub fn start(mut renderer: BlockRenderer, sample_rate: u32) -> Result<Self, OutputError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(OutputError::NoDevice)?;
        let supported = device
            .default_output_config()
            .map_err(|e| OutputError::ConfigError(e.to_string()))?;

        let channels = supported.channels().max(1);
        let block_size = renderer.block_size().max(1);
        let config = StreamConfig {
            channels,
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Fixed(block_size as u32),
        };

        tracing::info!(
            device = device.name().unwrap_or_default().as_str(),
            channels,
            sample_rate,
            block_size,
            "Sortie audio ouverte"
        );

        let mut block = vec![0.0f32; block_size];
        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    render_interleaved(&mut renderer, &mut block, data, channels as usize);
                },
                |err| {
                    tracing::error!("Erreur stream de sortie: {}", err);
                },
                None,
            )
            .map_err(|e| OutputError::StreamError(e.to_string()))?;

        stream
            .play()
            .map_err(|e| OutputError::StreamError(e.to_string()))?;

        Ok(Self {
            stream,
            channels,
            sample_rate,
        })
    }

    /// Met la sortie en pause
    pub fn pause(&self) -> Result<(), OutputError> {
        self.stream
            .pause()
            .map_err(|e| OutputError::StreamError(e.to_string()))
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Remplit un buffer entrelacé bloc par bloc depuis le renderer mono
///
/// Chaque bloc est remis à zéro avant le tirage, puis recopié sur tous les
/// canaux.
///
/// Un bloc vide produit du silence. Une trame incomplète en fin de `data` est
/// remise à zéro.
pub fn render_interleaved(
    renderer: &mut BlockRenderer,
    block: &mut [f32],
    data: &mut [f32],
    channels: usize,
) {
    if block.is_empty() {
        data.fill(0.0);
        return;
    }

    let channels = channels.max(1);
    for frames in data.chunks_mut(block.len() * channels) {
        let frame_count = frames.len() / channels;
        let mono = &mut block[..frame_count];
        mono.fill(0.0);
        renderer.process(mono);
        for (frame, &sample) in frames.chunks_exact_mut(channels).zip(mono.iter()) {
            frame.fill(sample);
        }
        frames[frame_count * channels..].fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::OverflowPolicy;
    use crate::input::PlaybackControl;
    use tokio::sync::mpsc;

    fn make_renderer(
        block_size: usize,
    ) -> (BlockRenderer, PlaybackControl, mpsc::Sender<Vec<f32>>) {
        let control = PlaybackControl::new();
        let (tx, rx) = mpsc::channel(8);
        let renderer = BlockRenderer::new(
            block_size,
            4096,
            OverflowPolicy::TruncateThenAppend,
            control.clone(),
            rx,
        );
        (renderer, control, tx)
    }

    #[test]
    fn duplicates_mono_block_on_every_channel() {
        let (mut renderer, control, tx) = make_renderer(2);
        tx.try_send(vec![0.1, 0.2, 0.3, 0.4]).unwrap();
        control.play(0);

        let mut block = vec![0.0f32; 2];
        let mut data = [9.0f32; 8];
        render_interleaved(&mut renderer, &mut block, &mut data, 2);

        assert_eq!(data, [0.1, 0.1, 0.2, 0.2, 0.3, 0.3, 0.4, 0.4]);
    }

    #[test]
    fn stopped_renderer_outputs_silence() {
        let (mut renderer, _control, tx) = make_renderer(4);
        tx.try_send(vec![0.5; 4]).unwrap();

        let mut block = vec![1.0f32; 4];
        let mut data = [9.0f32; 4];
        render_interleaved(&mut renderer, &mut block, &mut data, 1);

        assert_eq!(data, [0.0; 4]);
        assert_eq!(renderer.buffered_len(), 4);
    }

    #[test]
    fn underrun_tail_is_silent() {
        let (mut renderer, control, tx) = make_renderer(4);
        tx.try_send(vec![0.5]).unwrap();
        control.play(0);

        let mut block = vec![0.0f32; 4];
        let mut data = [9.0f32; 4];
        render_interleaved(&mut renderer, &mut block, &mut data, 1);

        assert_eq!(data, [0.5, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn empty_block_outputs_silence() {
        let (mut renderer, control, tx) = make_renderer(4);
        tx.try_send(vec![0.5; 4]).unwrap();
        control.play(0);

        let mut block: Vec<f32> = Vec::new();
        let mut data = [9.0f32; 4];
        render_interleaved(&mut renderer, &mut block, &mut data, 2);

        assert_eq!(data, [0.0; 4]);
        assert_eq!(renderer.buffered_len(), 4);
    }

    #[test]
    fn trailing_partial_frame_is_zeroed() {
        let (mut renderer, control, tx) = make_renderer(4);
        tx.try_send(vec![0.1, 0.2, 0.3]).unwrap();
        control.play(0);

        let mut block = vec![0.0f32; 4];
        let mut data = [9.0f32; 5];
        render_interleaved(&mut renderer, &mut block, &mut data, 2);

        assert_eq!(data, [0.1, 0.1, 0.2, 0.2, 0.0]);
        assert_eq!(renderer.buffered_samples(), vec![0.3]);
    }
}
