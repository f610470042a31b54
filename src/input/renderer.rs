//! Nœud de rendu tiré par l'hôte audio
//!
//! Le `BlockRenderer` est `Send`: il peut être déplacé dans le callback de
//! sortie. Il ne bloque jamais et ne prend aucun verrou.

use crate::audio::{OverflowPolicy, SampleBuffer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// État de lecture de l'entrée
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Stopped,
}

/// Drapeau play/stop partagé entre l'adaptateur et le renderer
#[derive(Debug, Clone, Default)]
pub struct PlaybackControl {
    playing: Arc<AtomicBool>,
}

impl PlaybackControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Passe en lecture
    ///
    /// `time_ms` est accepté mais pas planifié: l'effet est immédiat.
    pub fn play(&self, time_ms: u64) {
        if time_ms > 0 {
            tracing::debug!(time_ms, "Délai de lecture ignoré");
        }
        self.playing.store(true, Ordering::Release);
    }

    /// Arrête la lecture, avec la même limite sur `time_ms`
    pub fn stop(&self, time_ms: u64) {
        if time_ms > 0 {
            tracing::debug!(time_ms, "Délai d'arrêt ignoré");
        }
        self.playing.store(false, Ordering::Release);
    }

    pub fn state(&self) -> PlaybackState {
        if self.playing.load(Ordering::Acquire) {
            PlaybackState::Playing
        } else {
            PlaybackState::Stopped
        }
    }
}

/// Résultat d'un tirage de bloc
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pull {
    /// Taille du bloc demandé
    pub requested: usize,
    /// Échantillons effectivement copiés
    pub filled: usize,
    /// L'entrée était en lecture au moment du tirage
    pub playing: bool,
}

impl Pull {
    /// Moins d'échantillons que demandé alors que l'entrée jouait
    pub fn is_underrun(&self) -> bool {
        self.playing && self.filled < self.requested
    }
}

/// Nœud pull à une sortie mono, de taille de bloc fixe
pub struct BlockRenderer {
    buffer: SampleBuffer,
    block_size: usize,
    playback: PlaybackControl,
    batches: mpsc::Receiver<Vec<f32>>,
}

impl BlockRenderer {
    pub(crate) fn new(
        block_size: usize,
        max_buffered: usize,
        overflow: OverflowPolicy,
        playback: PlaybackControl,
        batches: mpsc::Receiver<Vec<f32>>,
    ) -> Self {
        Self {
            buffer: SampleBuffer::with_policy(max_buffered, overflow),
            block_size,
            playback,
            batches,
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Nombre de canaux de sortie du nœud
    pub fn output_channels(&self) -> u16 {
        1
    }

    /// Ajoute au buffer tous les lots reçus depuis le dernier appel
    ///
    /// Retourne le nombre de lots ajoutés.
    pub fn absorb_pending(&mut self) -> usize {
        let mut absorbed = 0;
        while let Ok(batch) = self.batches.try_recv() {
            self.buffer.push_batch(&batch);
            absorbed += 1;
        }
        absorbed
    }

    /// Callback audio: remplit `output` depuis le buffer si l'entrée joue
    ///
    /// L'hôte passe un bloc de `block_size` échantillons. En lecture, les
    /// premiers `output.len()` échantillons sont retirés du buffer; s'il en
    /// manque, la fin de `output` n'est pas modifiée. À l'arrêt, ni `output`
    /// ni le buffer ne sont modifiés.
    pub fn process(&mut self, output: &mut [f32]) -> Pull {
        self.absorb_pending();

        let requested = output.len();
        if self.playback.state() == PlaybackState::Stopped {
            return Pull {
                requested,
                filled: 0,
                playing: false,
            };
        }

        let filled = self.buffer.drain_into(output);
        let pull = Pull {
            requested,
            filled,
            playing: true,
        };
        if pull.is_underrun() {
            tracing::trace!(requested, filled, "Sous-alimentation du buffer");
        }
        pull
    }

    /// Nombre d'échantillons en attente, lots reçus compris
    pub fn buffered_len(&mut self) -> usize {
        self.absorb_pending();
        self.buffer.len()
    }

    /// Copie des échantillons en attente, lots reçus compris
    pub fn buffered_samples(&mut self) -> Vec<f32> {
        self.absorb_pending();
        self.buffer.to_vec()
    }
}
