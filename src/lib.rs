//! Micstream - entrée micro pour graphe audio
//!
//! Capture le microphone, bufferise les échantillons et les restitue bloc
//! par bloc au callback de sortie.

pub mod audio;
pub mod capture;
pub mod input;
