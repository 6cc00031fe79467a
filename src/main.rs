//! Application entry point: a terminal hands-free assistant loop.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (defaults on first run).
//! 3. Create the tokio runtime.
//! 4. Build the transcription and synthesis clients from config.
//! 5. Open the audio output and create the shared [`SpeechCoordinator`].
//! 6. Enable [`HandsFreeMode`] on the configured microphone.
//! 7. Print detected commands on stdout; speak every stdin line as the reply.
//! 8. Ctrl-C switches hands-free mode off and exits.

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};

use handsfree_voice::{
    audio::MicrophoneDevice,
    config::AppConfig,
    handsfree::{HandsFreeEvent, HandsFreeMode},
    speech::{synthesizer_from_config, RodioPlayer, SpeechCoordinator},
    stt::transcriber_from_config,
};

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("handsfree-voice starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(run(config))
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    // 4. Service clients
    let transcriber = transcriber_from_config(&config.stt);
    let synthesizer = synthesizer_from_config(&config.tts);

    // 5. Speech output
    let player = RodioPlayer::new().context("could not open the audio output")?;
    let speech = SpeechCoordinator::new(synthesizer, Arc::new(player));

    // 6. Hands-free mode
    let device = Arc::new(MicrophoneDevice::from_config(&config));
    let (mut mode, mut events) =
        HandsFreeMode::new(&config, device, transcriber, speech.clone());
    mode.toggle(true)
        .await
        .context("could not start hands-free mode")?;
    log::info!(
        "Say one of {:?} followed by a command; type a reply and press Enter to speak it",
        config.wake.wake_words
    );

    // 7. Commands out, replies in
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                HandsFreeEvent::CommandDetected(command) => println!("{command}"),
                HandsFreeEvent::StateChanged { to, .. } => log::debug!("{}", to.status_label()),
                HandsFreeEvent::WakeAcknowledged => log::info!("Wake word heard, waiting for a command"),
                HandsFreeEvent::TranscriptionFailed { message } => log::warn!("{message}"),
                HandsFreeEvent::UtteranceIgnored { .. } | HandsFreeEvent::Deactivated => {}
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line.context("failed to read stdin")? {
                Some(line) => speech.speak(line),
                None => {
                    log::info!("stdin closed; press Ctrl-C to exit");
                    stdin_open = false;
                }
            },
            // 8. Shutdown
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                log::info!("Ctrl-C received");
                break;
            }
        }
    }

    speech.stop();
    mode.toggle(false).await?;
    log::info!("handsfree-voice stopped");
    Ok(())
}
