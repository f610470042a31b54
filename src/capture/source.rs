//! Trait principal pour les sources de capture micro

use thiserror::Error;
use tokio::sync::mpsc;

/// Événements émis par une source de capture
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    /// La source est prête (notification unique)
    Loaded,
    /// Un lot d'échantillons est disponible
    Samples {
        /// Échantillons PCM float32
        data: Vec<f32>,
        /// Nombre de canaux annoncé par la source
        channels: u16,
    },
    /// La capture a échoué après l'ouverture
    Failed(String),
}

/// Canal par lequel une source publie ses événements
pub type CaptureSender = mpsc::Sender<CaptureEvent>;

/// Erreurs liées à la capture microphone
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Aucun périphérique audio trouvé")]
    NoDevice,

    #[error("Erreur de configuration: {0}")]
    ConfigError(String),

    #[error("Erreur de stream: {0}")]
    StreamError(String),

    #[error("Microphone non initialisé")]
    NotInitialized,
}

/// Source de capture externe
///
/// `open` est asynchrone du point de vue de l'appelant: la source signale
/// qu'elle est prête plus tard via `CaptureEvent::Loaded`.
#[cfg_attr(test, mockall::automock)]
pub trait CaptureSource {
    /// Ouvre la session de capture et conserve le canal d'événements
    fn open(&mut self, events: CaptureSender) -> Result<(), CaptureError>;

    /// Démarre l'envoi des échantillons
    fn start(&mut self) -> Result<(), CaptureError>;

    /// Fixe le taux d'échantillonnage de la capture
    fn set_sample_rate(&mut self, sample_rate: u32);

    /// Retourne le taux d'échantillonnage actuel
    fn sample_rate(&self) -> u32;

    /// Libère la session de capture
    fn close(&mut self);
}
