//! Entrée micro branchée sur un callback audio pull
//!
//! L'adaptateur pilote la source de capture via une machine à états et
//! transmet les lots d'échantillons au `BlockRenderer`, qui répond aux
//! tirages de l'hôte audio.

use super::renderer::{BlockRenderer, PlaybackControl, PlaybackState};
use crate::audio::{OverflowPolicy, MAX_BUFFERED_SAMPLES};
use crate::capture::{CaptureEvent, CaptureSender, CaptureSource};
use tokio::sync::{broadcast, mpsc};

/// Taille de bloc par défaut du nœud de rendu
pub const DEFAULT_BLOCK_SIZE: usize = 1024;

/// Taux d'échantillonnage imposé à la capture une fois prête
pub const CAPTURE_SAMPLE_RATE: u32 = 44100;

/// Configuration de l'adaptateur
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Taille du bloc tiré par l'hôte (échantillons)
    pub block_size: usize,
    /// Seuil de troncature du buffer
    pub max_buffered: usize,
    /// Taux d'échantillonnage fixé à la réception de `Loaded`
    pub capture_sample_rate: u32,
    /// Politique de débordement du buffer
    pub overflow: OverflowPolicy,
    /// Capacité des canaux d'événements
    pub event_capacity: usize,
    /// Lots en attente au-delà desquels les nouveaux lots sont jetés
    pub pending_batches: usize,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            max_buffered: MAX_BUFFERED_SAMPLES,
            capture_sample_rate: CAPTURE_SAMPLE_RATE,
            overflow: OverflowPolicy::TruncateThenAppend,
            event_capacity: 16,
            pending_batches: 32,
        }
    }
}

/// État de la session de capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Source pas encore ouverte
    Uninitialized,
    /// Source ouverte, en attente de `Loaded`
    Starting,
    /// Source prête, démarrage en cours
    Ready,
    /// Les échantillons sont acceptés
    Capturing,
    /// Session terminée (état final)
    Stopped,
}

/// Événements émis par l'adaptateur
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterEvent {
    /// La capture est prête
    Loaded,
    /// La capture a échoué
    CaptureFailed(String),
}

/// Adaptateur entre une source de capture et un nœud de rendu pull
pub struct MicrophoneStreamAdapter<S: CaptureSource> {
    config: AdapterConfig,
    source: S,
    state: CaptureState,
    playback: PlaybackControl,
    capture_rx: mpsc::Receiver<CaptureEvent>,
    batch_tx: mpsc::Sender<Vec<f32>>,
    event_tx: broadcast::Sender<AdapterEvent>,
    last_error: Option<String>,
    dropped_batches: u64,
}

impl<S: CaptureSource> MicrophoneStreamAdapter<S> {
    /// Crée l'adaptateur et son nœud de rendu, puis ouvre la capture
    ///
    /// Aucune erreur n'est retournée: un échec d'ouverture est journalisé,
    /// l'adaptateur passe à `Stopped` et l'erreur reste lisible via
    /// `last_error`.
    pub fn new(source: S, config: AdapterConfig) -> (Self, BlockRenderer) {
        let capacity = config.event_capacity.max(1);
        let (capture_tx, capture_rx) = mpsc::channel(capacity);
        let (batch_tx, batch_rx) = mpsc::channel(config.pending_batches.max(1));
        let (event_tx, _) = broadcast::channel(capacity);
        let playback = PlaybackControl::new();

        let renderer = BlockRenderer::new(
            config.block_size,
            config.max_buffered,
            config.overflow,
            playback.clone(),
            batch_rx,
        );

        let mut adapter = Self {
            config,
            source,
            state: CaptureState::Uninitialized,
            playback,
            capture_rx,
            batch_tx,
            event_tx,
            last_error: None,
            dropped_batches: 0,
        };
        adapter.open(capture_tx);

        (adapter, renderer)
    }

    fn open(&mut self, capture_tx: CaptureSender) {
        match self.source.open(capture_tx) {
            Ok(()) => {
                self.state = CaptureState::Starting;
                tracing::debug!("Capture en cours d'ouverture");
            }
            Err(e) => {
                tracing::error!("Ouverture de la capture impossible: {}", e);
                self.last_error = Some(e.to_string());
                self.shutdown();
            }
        }
    }

    /// Traite un événement de la source de capture
    pub fn handle_capture_event(&mut self, event: CaptureEvent) {
        match event {
            CaptureEvent::Loaded => self.on_loaded(),
            CaptureEvent::Samples { data, channels } => self.on_samples(data, channels),
            CaptureEvent::Failed(reason) => self.fail(reason),
        }
    }

    /// Traite tous les événements en attente sans bloquer
    ///
    /// Retourne le nombre d'événements traités.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.capture_rx.try_recv() {
            self.handle_capture_event(event);
            handled += 1;
        }
        handled
    }

    /// Traite les événements jusqu'à la fermeture du canal de capture
    pub async fn run(&mut self) {
        while let Some(event) = self.capture_rx.recv().await {
            self.handle_capture_event(event);
        }
        tracing::debug!("Canal de capture fermé");
    }

    fn on_loaded(&mut self) {
        if self.state != CaptureState::Starting {
            tracing::warn!(state = ?self.state, "Notification loaded ignorée");
            return;
        }

        self.state = CaptureState::Ready;
        self.source.set_sample_rate(self.config.capture_sample_rate);
        tracing::info!(
            sample_rate = self.config.capture_sample_rate,
            "Capture prête"
        );
        let _ = self.event_tx.send(AdapterEvent::Loaded);

        match self.source.start() {
            Ok(()) => self.state = CaptureState::Capturing,
            Err(e) => self.fail(e.to_string()),
        }
    }

    fn on_samples(&mut self, data: Vec<f32>, channels: u16) {
        if self.state != CaptureState::Capturing {
            tracing::debug!(
                state = ?self.state,
                len = data.len(),
                "Lot d'échantillons ignoré"
            );
            return;
        }

        tracing::trace!(len = data.len(), channels, "Lot d'échantillons reçu");
        match self.batch_tx.try_send(data) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(batch)) => {
                self.dropped_batches += 1;
                tracing::warn!(
                    len = batch.len(),
                    dropped = self.dropped_batches,
                    "Renderer en retard: lot d'échantillons perdu"
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("Renderer détaché, lot perdu");
            }
        }
    }

    fn fail(&mut self, reason: String) {
        if self.state == CaptureState::Stopped {
            return;
        }
        tracing::error!("Échec de la capture: {}", reason);
        self.last_error = Some(reason.clone());
        self.shutdown();
        let _ = self.event_tx.send(AdapterEvent::CaptureFailed(reason));
    }

    fn shutdown(&mut self) {
        if self.state != CaptureState::Stopped {
            self.source.close();
            self.state = CaptureState::Stopped;
        }
    }

    /// Libère la session de capture
    pub fn close(&mut self) {
        if self.state == CaptureState::Stopped {
            return;
        }
        self.shutdown();
        tracing::info!("Entrée micro fermée");
    }

    /// Démarre la lecture (voir `PlaybackControl::play`)
    pub fn play(&self, time_ms: u64) {
        self.playback.play(time_ms);
    }

    /// Arrête la lecture (voir `PlaybackControl::stop`)
    pub fn stop(&self, time_ms: u64) {
        self.playback.stop(time_ms);
    }

    /// S'abonne aux événements de l'adaptateur
    pub fn subscribe(&self) -> broadcast::Receiver<AdapterEvent> {
        self.event_tx.subscribe()
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.playback.state()
    }

    pub fn capture_state(&self) -> CaptureState {
        self.state
    }

    pub fn block_size(&self) -> usize {
        self.config.block_size
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Lots jetés faute de tirage par le renderer
    pub fn dropped_batches(&self) -> u64 {
        self.dropped_batches
    }

    /// Retourne la configuration de l'adaptateur
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }
}

impl<S: CaptureSource> Drop for MicrophoneStreamAdapter<S> {
    fn drop(&mut self) {
        self.close();
    }
}
