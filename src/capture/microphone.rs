//! Capture audio depuis le microphone
//!
//! Utilise cpal pour la capture cross-platform et ringbuf pour le buffering.
//! Le callback cpal écrit dans le ring buffer; une task tokio le vide à
//! intervalle fixe et publie des `CaptureEvent::Samples`.

use super::source::{CaptureError, CaptureEvent, CaptureSender, CaptureSource};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};
use ringbuf::{traits::*, HeapCons, HeapRb};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};

/// Configuration de la capture micro
#[derive(Debug, Clone)]
pub struct MicrophoneConfig {
    /// Taux d'échantillonnage demandé au périphérique
    pub sample_rate: u32,
    /// Capacité du ring buffer en échantillons
    pub ring_capacity: usize,
    /// Intervalle de transfert vers l'adaptateur (ms)
    pub forward_interval_ms: u64,
}

impl Default for MicrophoneConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            ring_capacity: 16384,
            forward_interval_ms: 10,
        }
    }
}

/// Microphone par défaut du système, via cpal
pub struct CpalMicrophone {
    config: MicrophoneConfig,
    device: Option<Device>,
    events: Option<CaptureSender>,
    stream: Option<Stream>,
    forwarder: Option<JoinHandle<()>>,
}

impl CpalMicrophone {
    pub fn new() -> Self {
        Self::with_config(MicrophoneConfig::default())
    }

    pub fn with_config(config: MicrophoneConfig) -> Self {
        Self {
            config,
            device: None,
            events: None,
            stream: None,
            forwarder: None,
        }
    }

    /// Liste les périphériques d'entrée disponibles
    pub fn list_devices() -> Vec<String> {
        let host = cpal::default_host();
        host.input_devices()
            .map(|devices| devices.filter_map(|d| d.name().ok()).collect())
            .unwrap_or_default()
    }

    fn build_stream(
        &self,
        device: &Device,
        mut producer: ringbuf::HeapProd<f32>,
        events: CaptureSender,
    ) -> Result<Stream, CaptureError> {
        let stream_config = StreamConfig {
            channels: 1,
            sample_rate: SampleRate(self.config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let written = producer.push_slice(data);
                    if written < data.len() {
                        tracing::warn!(
                            "Ring buffer plein: {} échantillons perdus",
                            data.len() - written
                        );
                    }
                },
                move |err| {
                    tracing::error!("Erreur stream audio: {}", err);
                    notify_failure(&events, err.to_string());
                },
                None,
            )
            .map_err(|e| CaptureError::StreamError(e.to_string()))
    }
}

impl Default for CpalMicrophone {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSource for CpalMicrophone {
    fn open(&mut self, events: CaptureSender) -> Result<(), CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;

        tracing::info!(
            device = device.name().unwrap_or_default().as_str(),
            "Microphone ouvert"
        );

        events
            .try_send(CaptureEvent::Loaded)
            .map_err(|e| CaptureError::StreamError(e.to_string()))?;

        self.device = Some(device);
        self.events = Some(events);
        Ok(())
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        let device = self.device.as_ref().ok_or(CaptureError::NotInitialized)?;
        let events = self.events.clone().ok_or(CaptureError::NotInitialized)?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| CaptureError::ConfigError(e.to_string()))?;

        let rb = HeapRb::<f32>::new(self.config.ring_capacity);
        let (producer, consumer) = rb.split();

        let stream = self.build_stream(device, producer, events.clone())?;
        stream
            .play()
            .map_err(|e| CaptureError::StreamError(e.to_string()))?;

        let period = Duration::from_millis(self.config.forward_interval_ms.max(1));
        let forwarder = runtime.spawn(forward_samples(
            consumer,
            events,
            period,
            self.config.ring_capacity,
        ));

        self.stream = Some(stream);
        self.forwarder = Some(forwarder);
        tracing::info!(sample_rate = self.config.sample_rate, "Capture audio démarrée");
        Ok(())
    }

    fn set_sample_rate(&mut self, sample_rate: u32) {
        if self.stream.is_some() && sample_rate != self.config.sample_rate {
            tracing::warn!(
                "Taux d'échantillonnage {} appliqué au prochain démarrage",
                sample_rate
            );
        }
        self.config.sample_rate = sample_rate;
    }

    fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    fn close(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                tracing::warn!("Impossible de mettre le stream en pause: {}", e);
            }
            tracing::info!("Capture audio arrêtée");
        }
        self.events = None;
        self.device = None;
    }
}

impl Drop for CpalMicrophone {
    fn drop(&mut self) {
        self.close();
    }
}

/// Publie un échec de stream; retourne `false` si l'adaptateur ne peut pas le recevoir
fn notify_failure(events: &CaptureSender, reason: String) -> bool {
    match events.try_send(CaptureEvent::Failed(reason)) {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("Échec de capture non transmis: {}", e);
            false
        }
    }
}

/// Vide le ring buffer à chaque `period` et publie des lots mono
///
/// S'arrête quand le canal d'événements est fermé.
async fn forward_samples(
    mut consumer: HeapCons<f32>,
    events: CaptureSender,
    period: Duration,
    chunk: usize,
) {
    let mut ticker = interval(period);
    let mut scratch = vec![0.0f32; chunk.max(1)];
    loop {
        ticker.tick().await;
        let count = consumer.pop_slice(&mut scratch);
        if count == 0 {
            continue;
        }
        let batch = CaptureEvent::Samples {
            data: scratch[..count].to_vec(),
            channels: 1,
        };
        if events.send(batch).await.is_err() {
            tracing::debug!("Canal de capture fermé, transfert arrêté");
            break;
        }
    }
}
