//! Micstream - relaie le microphone vers la sortie audio
//!
//! Branche le micro par défaut sur l'adaptateur, puis le renderer sur la
//! sortie par défaut, jusqu'à Ctrl+C.

use micstream::audio::CpalOutput;
use micstream::capture::{CpalMicrophone, MicrophoneConfig};
use micstream::input::{AdapterConfig, AdapterEvent, MicrophoneStreamAdapter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialiser le logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "micstream=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Micstream v{}", env!("CARGO_PKG_VERSION"));

    let devices = CpalMicrophone::list_devices();
    tracing::info!("Périphériques d'entrée détectés: {:?}", devices);

    let config = AdapterConfig::default();
    let microphone = CpalMicrophone::with_config(MicrophoneConfig {
        sample_rate: config.capture_sample_rate,
        ..Default::default()
    });

    let (mut adapter, renderer) = MicrophoneStreamAdapter::new(microphone, config);
    if let Some(err) = adapter.last_error() {
        anyhow::bail!("capture indisponible: {err}");
    }

    let mut events = adapter.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                AdapterEvent::Loaded => tracing::info!("Entrée micro chargée"),
                AdapterEvent::CaptureFailed(reason) => {
                    tracing::error!("Entrée micro en échec: {}", reason)
                }
            }
        }
    });

    let output = CpalOutput::start(renderer, adapter.config().capture_sample_rate)?;
    tracing::info!(
        channels = output.channels(),
        sample_rate = output.sample_rate(),
        "Relais démarré, Ctrl+C pour quitter"
    );
    adapter.play(0);

    tokio::select! {
        _ = adapter.run() => tracing::warn!("Capture terminée"),
        res = tokio::signal::ctrl_c() => res?,
    }

    adapter.stop(0);
    output.pause()?;
    adapter.close();
    Ok(())
}
