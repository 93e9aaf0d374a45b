use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::{now_ms, truncate_chars};

pub const DEFAULT_SYSTEM_RULE: &str = "You are NexusAI, a fast and precise assistant running inside the Nexus chat client.
PRIMARY DIRECTIVES:
1. IDENTITY: You are built on the Nexus engine. Do not claim to be any other product.
2. CAPABILITIES: You can describe and simulate sounds, generate visuals, and speak using TTS.
3. PRIVACY: User data is stored only in the local browser vault.
4. LANGUAGE: Respond in the language the user uses. Be professional, slightly futuristic, and efficient.";

/// Content stored for a user message that only carried an image.
pub const IMAGE_ONLY_PLACEHOLDER: &str = "[Image attached]";

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub is_admin: bool,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.into(),
            is_admin: false,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub timestamp: i64,
}

impl Message {
    fn with_role(role: Role, content: String, image_url: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            image_url,
            timestamp: now_ms(),
        }
    }

    pub fn user(content: impl Into<String>, image_url: Option<String>) -> Self {
        Self::with_role(Role::User, content.into(), image_url)
    }

    pub fn model(content: impl Into<String>, image_url: Option<String>) -> Self {
        Self::with_role(Role::Model, content.into(), image_url)
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: i64,
}

impl ChatSession {
    /// Max characters of the first input kept as the session title.
    pub const TITLE_LEN: usize = 20;

    pub fn new(user_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            title: title.into(),
            messages: Vec::new(),
            created_at: now_ms(),
        }
    }

    /// Title derived from the first input, falling back to the mode default.
    pub fn title_for(input: &str, mode: Mode) -> String {
        let title = truncate_chars(input, Self::TITLE_LEN);
        if title.is_empty() {
            mode.default_title().to_string()
        } else {
            title
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum CreativeLevel {
    Stable,
    #[default]
    Balanced,
    Chaos,
}

impl CreativeLevel {
    pub const ALL: [CreativeLevel; 3] = [Self::Stable, Self::Balanced, Self::Chaos];

    /// Temperature the admin panel applies when this level is picked.
    pub fn preset_temperature(&self) -> f32 {
        match self {
            Self::Stable => 0.3,
            Self::Balanced => 0.7,
            Self::Chaos => 0.95,
        }
    }

    pub fn top_p(&self) -> f32 {
        match self {
            Self::Stable => 0.8,
            Self::Balanced => 0.9,
            Self::Chaos => 1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stable => "Stable",
            Self::Balanced => "Balanced",
            Self::Chaos => "Chaos",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub system_rule: String,
    pub global_knowledge: String,
    pub temperature: f32,
    pub creative_level: CreativeLevel,
}

impl AppSettings {
    pub fn with_creative_level(mut self, level: CreativeLevel) -> Self {
        self.creative_level = level;
        self.temperature = level.preset_temperature();
        self
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            system_rule: DEFAULT_SYSTEM_RULE.to_string(),
            global_knowledge: String::new(),
            temperature: 0.7,
            creative_level: CreativeLevel::Balanced,
        }
    }
}

/// Behavior profile selected per conversation.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Mode {
    #[default]
    Standard,
    Story,
}

const STORY_INSTRUCTION: &str = "[STORY FORGE MODE ACTIVE]
You are a master storyteller and world-builder.
- Use rich, descriptive prose and immersive atmosphere.
- Maintain consistent character development and logical plot progression.
- If this is a roleplay, react dynamically to the user's actions.
- Language: Follow the user's language.";

impl Mode {
    pub fn toggled(self) -> Self {
        match self {
            Mode::Standard => Mode::Story,
            Mode::Story => Mode::Standard,
        }
    }

    pub fn is_story(&self) -> bool {
        matches!(self, Mode::Story)
    }

    /// Number of trailing history messages sent with a prompt.
    pub fn context_window(&self) -> usize {
        match self {
            Mode::Standard => 8,
            Mode::Story => 15,
        }
    }

    /// Story mode replaces the stored system rule.
    pub fn instruction_override(&self) -> Option<&'static str> {
        match self {
            Mode::Standard => None,
            Mode::Story => Some(STORY_INSTRUCTION),
        }
    }

    pub fn temperature_override(&self) -> Option<f32> {
        match self {
            Mode::Standard => None,
            Mode::Story => Some(0.95),
        }
    }

    pub fn image_style(&self) -> &'static str {
        match self {
            Mode::Standard => "High-detail digital art, Nexus Protocol Style",
            Mode::Story => {
                "Cinematic concept art, moody lighting, detailed textures, book illustration style"
            }
        }
    }

    pub fn aspect_ratio(&self) -> &'static str {
        match self {
            Mode::Standard => "1:1",
            Mode::Story => "16:9",
        }
    }

    pub fn voice(&self) -> &'static str {
        match self {
            Mode::Standard => "Kore",
            Mode::Story => "Puck",
        }
    }

    pub fn speech_prompt(&self, text: &str) -> String {
        match self {
            Mode::Standard => format!("Read clearly: {}", truncate_chars(text, 400)),
            Mode::Story => format!(
                "Read this story segment with deep emotion and narrative pacing: {}",
                truncate_chars(text, 600)
            ),
        }
    }

    pub fn default_title(&self) -> &'static str {
        match self {
            Mode::Standard => "Nexus Dialogue",
            Mode::Story => "New Legend",
        }
    }

    pub fn model_label(&self) -> &'static str {
        match self {
            Mode::Standard => "NXS",
            Mode::Story => "BARD",
        }
    }

    pub fn starter_prompts(&self) -> &'static [&'static str] {
        match self {
            Mode::Standard => &[
                "Analyze the current limits",
                "What is new in 5.2.1?",
                "Draw your own portrait",
                "Describe the sound of deep space",
            ],
            Mode::Story => &[
                "Write the opening of a dark fantasy",
                "Invent a cyborg character",
                "Describe an abandoned city in 2099",
                "Create a plot twist",
            ],
        }
    }

    pub fn continue_prompt(&self) -> &'static str {
        "Continue the story"
    }
}

/// An image the user attached to a turn, as read from a file input.
#[derive(Clone, PartialEq, Debug)]
pub struct ImageAttachment {
    pub mime_type: String,
    /// Base64 payload without the `data:` prefix.
    pub data: String,
}

impl ImageAttachment {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// Splits a `data:<mime>;base64,<payload>` URL as produced by `FileReader`.
    pub fn from_data_url(url: &str) -> Option<Self> {
        let rest = url.strip_prefix("data:")?;
        let (meta, data) = rest.split_once(',')?;
        let mime_type = meta.strip_suffix(";base64")?;
        Some(Self {
            mime_type: mime_type.to_string(),
            data: data.to_string(),
        })
    }
}

// Gemini API DTOs

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn text(role: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part::text(text)],
        }
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.into(),
                data: data.into(),
            }),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Serialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_config: Option<SpeechConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_config: Option<ImageConfig>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    pub aspect_ratio: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    fn first_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or(&[])
    }

    /// Concatenated text of the first candidate.
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .first_parts()
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// First inline payload of the first candidate.
    pub fn inline_data(&self) -> Option<&InlineData> {
        self.first_parts().iter().find_map(|p| p.inline_data.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_json_uses_camel_case_and_skips_missing_image() {
        let mut session = ChatSession::new("u1", "Hello");
        session.messages.push(Message::user("Hello", None));

        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["userId"], "u1");
        assert!(json["createdAt"].is_i64());
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json["messages"][0].get("imageUrl").is_none());
    }

    #[test]
    fn settings_parse_from_stored_shape() {
        let raw = r#"{"systemRule":"be brief","globalKnowledge":"","temperature":0.3,"creativeLevel":"Stable"}"#;
        let settings: AppSettings = serde_json::from_str(raw).unwrap();
        assert_eq!(settings.system_rule, "be brief");
        assert_eq!(settings.creative_level, CreativeLevel::Stable);
    }

    #[test]
    fn creative_level_preset_sets_temperature() {
        let settings = AppSettings::default().with_creative_level(CreativeLevel::Chaos);
        assert_eq!(settings.creative_level, CreativeLevel::Chaos);
        assert!((settings.temperature - 0.95).abs() < f32::EPSILON);
    }

    #[test]
    fn title_truncates_or_falls_back_to_mode_default() {
        assert_eq!(ChatSession::title_for("Hello", Mode::Standard), "Hello");
        assert_eq!(
            ChatSession::title_for("Tell me everything about Rust lifetimes", Mode::Standard),
            "Tell me everything a"
        );
        assert_eq!(ChatSession::title_for("", Mode::Story), "New Legend");
    }

    #[test]
    fn mode_profiles_differ() {
        assert_eq!(Mode::Standard.context_window(), 8);
        assert_eq!(Mode::Story.context_window(), 15);
        assert_eq!(Mode::Story.aspect_ratio(), "16:9");
        assert_eq!(Mode::Standard.voice(), "Kore");
        assert_eq!(Mode::Standard.toggled(), Mode::Story);
        assert!(Mode::Story.instruction_override().is_some());
    }

    #[test]
    fn attachment_data_url_round_trips() {
        let att = ImageAttachment::from_data_url("data:image/png;base64,AAAA").unwrap();
        assert_eq!(att.mime_type, "image/png");
        assert_eq!(att.data, "AAAA");
        assert_eq!(att.data_url(), "data:image/png;base64,AAAA");
        assert!(ImageAttachment::from_data_url("not a data url").is_none());
    }

    #[test]
    fn response_text_and_inline_data() {
        let raw = r#"{"candidates":[{"content":{"role":"model","parts":[
            {"text":"Hi "},{"text":"there"},{"inlineData":{"mimeType":"image/png","data":"QUJD"}}]}}]}"#;
        let resp: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.text().as_deref(), Some("Hi there"));
        assert_eq!(resp.inline_data().unwrap().data, "QUJD");

        let empty: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.text().is_none());
        assert!(empty.inline_data().is_none());
    }
}
