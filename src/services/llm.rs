use async_trait::async_trait;
use reqwest::Client;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::models::{
    AppSettings, Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    ImageAttachment, ImageConfig, Message, Mode, Part, PrebuiltVoiceConfig, Role, SpeechConfig,
    VoiceConfig,
};
use crate::utils::truncate_chars;

/// Phrases that route a prompt to image generation.
pub const IMAGE_TRIGGERS: &[&str] = &[
    "нарисуй",
    "картинка",
    "фото",
    "draw",
    "generate image",
    "image",
    "picture",
    "создай фото",
    "иллюстрация",
];

/// Substring heuristic deciding whether a prompt asks for an image.
#[derive(Clone, Debug)]
pub struct TriggerClassifier {
    triggers: Vec<String>,
}

impl TriggerClassifier {
    pub fn new<I, T>(triggers: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            triggers: triggers.into_iter().map(|t| t.into().to_lowercase()).collect(),
        }
    }

    pub fn is_image_request(&self, prompt: &str) -> bool {
        let prompt = prompt.to_lowercase();
        self.triggers.iter().any(|t| prompt.contains(t.as_str()))
    }
}

impl Default for TriggerClassifier {
    fn default() -> Self {
        Self::new(IMAGE_TRIGGERS.iter().copied())
    }
}

pub fn is_image_request(prompt: &str) -> bool {
    TriggerClassifier::default().is_image_request(prompt)
}

/// Everything the reply capability needs for one call.
#[derive(Clone, Copy, Debug)]
pub struct ReplyRequest<'a> {
    pub prompt: &'a str,
    /// Transcript preceding the prompt; windowed by mode before sending.
    pub history: &'a [Message],
    pub username: &'a str,
    pub is_admin: bool,
    pub mode: Mode,
    pub image: Option<&'a ImageAttachment>,
    pub settings: &'a AppSettings,
}

/// Boundary to the generative service.
///
/// Implementations are expected to turn service failures into displayable
/// results themselves; an `Err` is treated by callers as an unexpected fault.
#[async_trait(?Send)]
pub trait AiGateway {
    async fn generate_reply(&self, request: ReplyRequest<'_>) -> anyhow::Result<String>;

    /// A `data:` URL, or `None` when nothing was produced.
    async fn generate_image(&self, prompt: &str, mode: Mode) -> anyhow::Result<Option<String>>;

    /// Base64 PCM audio (16-bit mono, 24 kHz), or `None` when nothing was produced.
    async fn synthesize_speech(&self, text: &str, mode: Mode) -> anyhow::Result<Option<String>>;
}

pub fn build_system_instruction(
    settings: &AppSettings,
    username: &str,
    is_admin: bool,
    mode: Mode,
) -> String {
    let mut lines = vec![mode
        .instruction_override()
        .unwrap_or(settings.system_rule.as_str())
        .to_string()];
    if !settings.global_knowledge.trim().is_empty() {
        lines.push(format!("[Knowledge Base]\n{}", settings.global_knowledge.trim()));
    }
    lines.push(format!("Active User: {}", username));
    lines.push(format!(
        "Access Level: {}",
        if is_admin { "ADMIN/ROOT" } else { "STANDARD" }
    ));
    if is_admin {
        lines.push("Status: Administrator verified. Extended creative latitude granted.".to_string());
    }
    lines.join("\n")
}

/// Last `mode.context_window()` messages followed by the new user turn.
pub fn build_contents(
    history: &[Message],
    prompt: &str,
    image: Option<&ImageAttachment>,
    mode: Mode,
) -> Vec<Content> {
    let start = history.len().saturating_sub(mode.context_window());
    let mut contents: Vec<Content> = history[start..]
        .iter()
        .map(|msg| Content::text(Some(msg.role.as_str()), msg.content.clone()))
        .collect();

    let mut parts = Vec::new();
    if !prompt.is_empty() || image.is_none() {
        parts.push(Part::text(prompt));
    }
    if let Some(image) = image {
        parts.push(Part::inline(image.mime_type.clone(), image.data.clone()));
    }
    contents.push(Content {
        role: Some(Role::User.as_str().to_string()),
        parts,
    });
    contents
}

pub fn reply_request(request: &ReplyRequest<'_>) -> GenerateContentRequest {
    let temperature = request
        .mode
        .temperature_override()
        .unwrap_or(request.settings.temperature);
    GenerateContentRequest {
        contents: build_contents(request.history, request.prompt, request.image, request.mode),
        system_instruction: Some(Content::text(
            None,
            build_system_instruction(request.settings, request.username, request.is_admin, request.mode),
        )),
        generation_config: Some(GenerationConfig {
            temperature: Some(temperature),
            top_p: Some(request.settings.creative_level.top_p()),
            ..Default::default()
        }),
    }
}

pub fn image_request(prompt: &str, mode: Mode) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content::text(None, format!("{}: {}", mode.image_style(), prompt))],
        system_instruction: None,
        generation_config: Some(GenerationConfig {
            image_config: Some(ImageConfig {
                aspect_ratio: mode.aspect_ratio().to_string(),
            }),
            ..Default::default()
        }),
    }
}

pub fn speech_request(text: &str, mode: Mode) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content::text(None, mode.speech_prompt(text))],
        system_instruction: None,
        generation_config: Some(GenerationConfig {
            response_modalities: Some(vec!["AUDIO".to_string()]),
            speech_config: Some(SpeechConfig {
                voice_config: VoiceConfig {
                    prebuilt_voice_config: PrebuiltVoiceConfig {
                        voice_name: mode.voice().to_string(),
                    },
                },
            }),
            ..Default::default()
        }),
    }
}

/// Gemini REST client.
pub struct GeminiGateway {
    client: Client,
    config: GatewayConfig,
}

impl GeminiGateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn has_credential(&self) -> bool {
        self.config.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str, GatewayError> {
        self.config
            .api_key
            .as_deref()
            .ok_or(GatewayError::MissingCredential)
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        )
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GatewayError> {
        let key = self.api_key()?;
        let resp = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", key)
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(model, status = status.as_u16(), body = %truncate_chars(&body, 500), "gemini request failed");
            return Err(status_error(status.as_u16(), &body));
        }
        Ok(resp.json::<GenerateContentResponse>().await?)
    }

    pub async fn ask(&self, request: &ReplyRequest<'_>) -> Result<String, GatewayError> {
        let body = reply_request(request);
        tracing::debug!(
            mode = ?request.mode,
            history = body.contents.len() - 1,
            image = request.image.is_some(),
            "sending reply request"
        );
        let resp = self.generate_content(&self.config.text_model, &body).await?;
        reply_text(&resp)
    }

    pub async fn render_image(&self, prompt: &str, mode: Mode) -> Result<Option<String>, GatewayError> {
        let resp = self
            .generate_content(&self.config.image_model, &image_request(prompt, mode))
            .await?;
        Ok(resp
            .inline_data()
            .map(|d| format!("data:{};base64,{}", d.mime_type, d.data)))
    }

    pub async fn speech(&self, text: &str, mode: Mode) -> Result<Option<String>, GatewayError> {
        let resp = self
            .generate_content(&self.config.tts_model, &speech_request(text, mode))
            .await?;
        Ok(resp.inline_data().map(|d| d.data.clone()))
    }
}

/// Error for a non-success HTTP response.
fn status_error(status: u16, body: &str) -> GatewayError {
    GatewayError::from_status(status, truncate_chars(body, 200))
}

fn reply_text(resp: &GenerateContentResponse) -> Result<String, GatewayError> {
    resp.text().ok_or(GatewayError::EmptyPayload)
}

/// What the user sees for a reply call: the model text or the error's fixed message.
fn normalize_reply(result: Result<String, GatewayError>) -> String {
    result.unwrap_or_else(|e| {
        tracing::warn!(error = ?e, "reply failed");
        e.to_string()
    })
}

#[async_trait(?Send)]
impl AiGateway for GeminiGateway {
    async fn generate_reply(&self, request: ReplyRequest<'_>) -> anyhow::Result<String> {
        Ok(normalize_reply(self.ask(&request).await))
    }

    async fn generate_image(&self, prompt: &str, mode: Mode) -> anyhow::Result<Option<String>> {
        Ok(self.render_image(prompt, mode).await.unwrap_or_else(|e| {
            tracing::warn!(error = ?e, "image generation failed");
            None
        }))
    }

    async fn synthesize_speech(&self, text: &str, mode: Mode) -> anyhow::Result<Option<String>> {
        Ok(self.speech(text, mode).await?)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn history(n: usize) -> Vec<Message> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user(format!("q{}", i), None)
                } else {
                    Message::model(format!("a{}", i), None)
                }
            })
            .collect()
    }

    #[test]
    fn classifier_matches_multilingual_triggers() {
        assert!(is_image_request("нарисуй кота"));
        assert!(is_image_request("draw a cat"));
        assert!(is_image_request("generate image of a cat"));
        assert!(is_image_request("Show me a PICTURE of Mars"));
        assert!(!is_image_request("tell me a joke"));
    }

    #[test]
    fn classifier_list_is_configurable() {
        let classifier = TriggerClassifier::new(["Sketch"]);
        assert!(classifier.is_image_request("sketch a bridge"));
        assert!(!classifier.is_image_request("draw a bridge"));
    }

    #[test]
    fn system_instruction_standard_user() {
        let settings = AppSettings::default();
        let text = build_system_instruction(&settings, "alice", false, Mode::Standard);
        assert!(text.starts_with(&settings.system_rule));
        assert!(text.contains("Active User: alice"));
        assert!(text.contains("Access Level: STANDARD"));
        assert!(!text.contains("Administrator verified"));
        assert!(!text.contains("[Knowledge Base]"));
    }

    #[test]
    fn system_instruction_story_admin_with_knowledge() {
        let settings = AppSettings {
            global_knowledge: "The city is called Vey.".into(),
            ..AppSettings::default()
        };
        let text = build_system_instruction(&settings, "root", true, Mode::Story);
        assert!(text.starts_with("[STORY FORGE MODE ACTIVE]"));
        assert!(!text.contains(&settings.system_rule));
        assert!(text.contains("[Knowledge Base]\nThe city is called Vey."));
        assert!(text.contains("Access Level: ADMIN/ROOT"));
        assert!(text.contains("Administrator verified"));
    }

    #[test]
    fn contents_are_windowed_by_mode() {
        let history = history(20);

        let standard = build_contents(&history, "next", None, Mode::Standard);
        assert_eq!(standard.len(), 9);
        assert_eq!(standard[0].parts[0].text.as_deref(), Some("q12"));
        assert_eq!(standard[8].role.as_deref(), Some("user"));
        assert_eq!(standard[8].parts[0].text.as_deref(), Some("next"));

        let story = build_contents(&history, "next", None, Mode::Story);
        assert_eq!(story.len(), 16);
        assert_eq!(story[0].role.as_deref(), Some("model"));

        let short = build_contents(&history[..3], "next", None, Mode::Standard);
        assert_eq!(short.len(), 4);
    }

    #[test]
    fn attached_image_is_sent_inline() {
        let image = ImageAttachment {
            mime_type: "image/jpeg".into(),
            data: "AAA".into(),
        };
        let contents = build_contents(&[], "what is this?", Some(&image), Mode::Standard);
        let parts = &contents[0].parts;
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1].inline_data.as_ref().unwrap().mime_type, "image/jpeg");
    }

    #[test]
    fn reply_request_sampling_follows_mode_and_settings() {
        let settings = AppSettings {
            temperature: 0.4,
            ..AppSettings::default()
        };
        let history = history(2);
        let mut request = ReplyRequest {
            prompt: "hi",
            history: &history,
            username: "alice",
            is_admin: false,
            mode: Mode::Standard,
            image: None,
            settings: &settings,
        };

        let json = serde_json::to_value(reply_request(&request)).unwrap();
        assert!((json["generationConfig"]["temperature"].as_f64().unwrap() - 0.4).abs() < 1e-6);
        assert!((json["generationConfig"]["topP"].as_f64().unwrap() - 0.9).abs() < 1e-6);
        assert!(json["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Active User: alice"));

        request.mode = Mode::Story;
        let json = serde_json::to_value(reply_request(&request)).unwrap();
        assert!((json["generationConfig"]["temperature"].as_f64().unwrap() - 0.95).abs() < 1e-6);
    }

    #[test]
    fn image_and_speech_requests_carry_mode_profile() {
        let json = serde_json::to_value(image_request("a castle", Mode::Story)).unwrap();
        assert_eq!(json["generationConfig"]["imageConfig"]["aspectRatio"], "16:9");
        assert!(json["contents"][0]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .starts_with("Cinematic concept art"));

        let long = "x".repeat(1000);
        let json = serde_json::to_value(speech_request(&long, Mode::Standard)).unwrap();
        let config = &json["generationConfig"];
        assert_eq!(config["responseModalities"][0], "AUDIO");
        assert_eq!(config["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"], "Kore");
        let text = json["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert_eq!(text.len(), "Read clearly: ".len() + 400);
    }

    #[test]
    fn failed_responses_normalize_to_fixed_replies() {
        let limited = normalize_reply(Err(status_error(429, "{\"error\":\"quota\"}")));
        assert_eq!(limited, "SYSTEM RESTING: Too many requests. Wait a bit.");

        let upstream = normalize_reply(Err(status_error(503, "unavailable")));
        assert_eq!(upstream, "UPLINK ERROR: Connection lost.");

        let long_body = "x".repeat(1000);
        match status_error(500, &long_body) {
            GatewayError::Upstream { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message.len(), 200);
            }
            other => panic!("unexpected error {:?}", other),
        }

        let empty: GenerateContentResponse = serde_json::from_str("{\"candidates\":[]}").unwrap();
        assert_eq!(normalize_reply(reply_text(&empty)), "Protocol Timeout: Empty response.");

        let ok: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hi there"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(normalize_reply(reply_text(&ok)), "Hi there");
    }

    #[tokio::test]
    async fn missing_credential_is_normalized() {
        let gateway = GeminiGateway::new(GatewayConfig::default());
        assert!(!gateway.has_credential());
        let settings = AppSettings::default();
        let request = ReplyRequest {
            prompt: "hi",
            history: &[],
            username: "alice",
            is_admin: false,
            mode: Mode::Standard,
            image: None,
            settings: &settings,
        };

        let reply = gateway.generate_reply(request).await.unwrap();
        assert_eq!(reply, "CRITICAL: API_KEY missing.");
        assert_eq!(gateway.generate_image("draw", Mode::Standard).await.unwrap(), None);
        assert!(gateway.synthesize_speech("hi", Mode::Standard).await.is_err());
    }
}
