//! Buffer d'échantillons partagé entre la capture et le callback audio
//!
//! Le buffer appartient à une seule instance d'adaptateur. Il n'est jamais
//! global.

use std::collections::VecDeque;

/// Nombre maximal d'échantillons conservés avant l'ajout d'un nouveau lot
pub const MAX_BUFFERED_SAMPLES: usize = 4096;

/// Politique appliquée quand le buffer dépasse sa capacité
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Tronque aux `max` premiers échantillons, puis ajoute le lot.
    ///
    /// La longueur peut dépasser `max` après l'ajout.
    #[default]
    TruncateThenAppend,
    /// Ajoute le lot puis jette les plus anciens au-delà de `max`.
    DropOldest,
}

/// File ordonnée d'échantillons audio f32
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: VecDeque<f32>,
    max: usize,
    policy: OverflowPolicy,
}

impl SampleBuffer {
    /// Crée un buffer vide avec la capacité et la politique par défaut
    pub fn new() -> Self {
        Self::with_policy(MAX_BUFFERED_SAMPLES, OverflowPolicy::default())
    }

    pub fn with_policy(max: usize, policy: OverflowPolicy) -> Self {
        Self {
            samples: VecDeque::with_capacity(max * 2),
            max,
            policy,
        }
    }

    /// Ajoute un lot d'échantillons en fin de file
    pub fn push_batch(&mut self, batch: &[f32]) {
        match self.policy {
            OverflowPolicy::TruncateThenAppend => {
                if self.samples.len() > self.max {
                    self.samples.truncate(self.max);
                }
                self.samples.extend(batch.iter().copied());
            }
            OverflowPolicy::DropOldest => {
                self.samples.extend(batch.iter().copied());
                let excess = self.samples.len().saturating_sub(self.max);
                if excess > 0 {
                    self.samples.drain(..excess);
                }
            }
        }
    }

    /// Retire les premiers échantillons et les copie dans `output`
    ///
    /// Retourne le nombre d'échantillons copiés. Les positions de `output`
    /// au-delà de ce nombre ne sont pas modifiées.
    pub fn drain_into(&mut self, output: &mut [f32]) -> usize {
        let count = output.len().min(self.samples.len());
        for (slot, sample) in output.iter_mut().zip(self.samples.drain(..count)) {
            *slot = sample;
        }
        count
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Copie le contenu actuel du buffer
    pub fn to_vec(&self) -> Vec<f32> {
        self.samples.iter().copied().collect()
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(start: usize, len: usize) -> Vec<f32> {
        (start..start + len).map(|i| i as f32).collect()
    }

    #[test]
    fn truncates_before_appending_when_over_cap() {
        let mut buffer = SampleBuffer::new();
        let seed = ramp(0, 5000);
        buffer.push_batch(&seed);
        assert_eq!(buffer.len(), 5000);

        let batch = ramp(100_000, 10);
        buffer.push_batch(&batch);

        let mut expected = seed[..4096].to_vec();
        expected.extend_from_slice(&batch);
        assert_eq!(buffer.len(), 4106);
        assert_eq!(buffer.to_vec(), expected);
    }

    #[test]
    fn exactly_at_cap_is_not_truncated() {
        let mut buffer = SampleBuffer::new();
        buffer.push_batch(&ramp(0, MAX_BUFFERED_SAMPLES));
        buffer.push_batch(&[1.0, 2.0]);
        assert_eq!(buffer.len(), MAX_BUFFERED_SAMPLES + 2);
    }

    #[test]
    fn batches_keep_arrival_order() {
        let mut buffer = SampleBuffer::new();
        let first = ramp(0, 10);
        let second = ramp(10, 20);
        let third = ramp(30, 30);
        buffer.push_batch(&first);
        buffer.push_batch(&second);
        buffer.push_batch(&third);

        assert_eq!(buffer.len(), 60);
        assert_eq!(buffer.to_vec(), ramp(0, 60));
    }

    #[test]
    fn drain_short_read_leaves_tail_untouched() {
        let mut buffer = SampleBuffer::new();
        buffer.push_batch(&[0.5, -0.5, 0.25]);

        let mut output = [9.0f32; 8];
        let copied = buffer.drain_into(&mut output);

        assert_eq!(copied, 3);
        assert!(buffer.is_empty());
        assert_eq!(&output[..3], &[0.5, -0.5, 0.25]);
        assert!(output[3..].iter().all(|&s| s == 9.0));
    }

    #[test]
    fn drop_oldest_keeps_newest_samples() {
        let mut buffer = SampleBuffer::with_policy(8, OverflowPolicy::DropOldest);
        buffer.push_batch(&ramp(0, 6));
        buffer.push_batch(&ramp(6, 6));

        assert_eq!(buffer.len(), 8);
        assert_eq!(buffer.to_vec(), ramp(4, 8));
    }
}
