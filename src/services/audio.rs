use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{AudioContext, AudioContextOptions, AudioContextState};

use crate::error::GatewayError;
use crate::models::Mode;
use crate::services::llm::AiGateway;

/// Sample rate of the synthesized speech payload.
pub const SAMPLE_RATE: f32 = 24_000.0;

/// Decodes base64 little-endian 16-bit mono PCM into samples in [-1, 1).
pub fn decode_pcm16(payload: &str) -> Result<Vec<f32>, GatewayError> {
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| GatewayError::Decode(e.to_string()))?;
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect())
}

fn js_err(e: JsValue) -> anyhow::Error {
    anyhow!("web audio: {:?}", e)
}

/// Plays mono samples through a fresh `AudioContext`. The context is closed
/// when playback ends, or right away if playback could not start. Nothing is
/// opened for an empty payload.
pub async fn play_samples(samples: Vec<f32>) -> Result<()> {
    if samples.is_empty() {
        return Ok(());
    }
    let options = AudioContextOptions::new();
    options.set_sample_rate(SAMPLE_RATE);
    let ctx = AudioContext::new_with_context_options(&options).map_err(js_err)?;

    let result = start_playback(&ctx, samples).await;
    if result.is_err() {
        close_context(&ctx);
    }
    result
}

fn close_context(ctx: &AudioContext) {
    if let Err(e) = ctx.close() {
        tracing::warn!(error = ?e, "failed to close audio context");
    }
}

async fn start_playback(ctx: &AudioContext, mut samples: Vec<f32>) -> Result<()> {
    if ctx.state() == AudioContextState::Suspended {
        JsFuture::from(ctx.resume().map_err(js_err)?)
            .await
            .map_err(js_err)?;
    }

    let buffer = ctx
        .create_buffer(1, samples.len() as u32, SAMPLE_RATE)
        .map_err(js_err)?;
    buffer.copy_to_channel(&mut samples, 0).map_err(js_err)?;

    let source = ctx.create_buffer_source().map_err(js_err)?;
    source.set_buffer(Some(&buffer));
    source
        .connect_with_audio_node(&ctx.destination())
        .map_err(js_err)?;

    let owned = ctx.clone();
    let on_ended = Closure::once_into_js(move || close_context(&owned));
    source.set_onended(Some(on_ended.unchecked_ref()));
    source.start().map_err(js_err)?;
    Ok(())
}

async fn try_speak<G: AiGateway + ?Sized>(gateway: &G, text: &str, mode: Mode) -> Result<bool> {
    let Some(payload) = gateway.synthesize_speech(text, mode).await? else {
        return Ok(false);
    };
    let samples = decode_pcm16(&payload)?;
    tracing::debug!(samples = samples.len(), voice = mode.voice(), "playing speech");
    play_samples(samples).await?;
    Ok(true)
}

/// Synthesizes and plays `text`. Errors are logged, never returned.
pub async fn speak<G: AiGateway + ?Sized>(gateway: &G, text: &str, mode: Mode) {
    match try_speak(gateway, text, mode).await {
        Ok(true) => {}
        Ok(false) => tracing::warn!("speech synthesis returned no audio"),
        Err(e) => tracing::error!(error = %e, "TTS node error"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::llm::testing::MockGateway;

    #[test]
    fn decodes_little_endian_pcm() {
        // 0x0000, 0x4000 (16384), 0x8000 (-32768), trailing odd byte dropped
        let payload = STANDARD.encode([0x00u8, 0x00, 0x00, 0x40, 0x00, 0x80, 0x7f]);
        let samples = decode_pcm16(&payload).unwrap();
        assert_eq!(samples, vec![0.0, 0.5, -1.0]);
    }

    #[tokio::test]
    async fn empty_payload_opens_no_audio_context() {
        let samples = decode_pcm16("").unwrap();
        assert!(samples.is_empty());
        assert!(play_samples(samples).await.is_ok());
    }

    #[test]
    fn rejects_invalid_base64() {
        assert!(matches!(decode_pcm16("%%%"), Err(GatewayError::Decode(_))));
    }

    #[tokio::test]
    async fn speak_swallows_failures() {
        let gateway = MockGateway::default();
        gateway.speech.borrow_mut().push_back(Err(anyhow!("network down")));
        gateway.speech.borrow_mut().push_back(Ok(Some("%%%".into())));
        gateway.speech.borrow_mut().push_back(Ok(None));

        speak(&gateway, "hello", Mode::Standard).await;
        speak(&gateway, "hello", Mode::Standard).await;
        speak(&gateway, "hello", Mode::Story).await;
        assert!(gateway.speech.borrow().is_empty());
    }
}
