//! Generation endpoint
//!
//! Accepts a chat-shaped payload, normalizes it into a [`GenerationRequest`]
//! and answers with WAV audio or a chat-completion envelope.

use application::{GenerationOutcome, VoiceCatalog};
use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderName, HeaderValue, header},
    response::{IntoResponse, Response},
};
use domain::{
    AudioFormat, DEFAULT_SEED, GenerationRequest, PipelineResult, RequestId, SpeechInput,
    VoiceDescriptor,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use validator::Validate;

use crate::{error::ApiError, middleware::ValidatedJson, state::AppState};

pub const CACHE_HEADER: HeaderName = HeaderName::from_static("x-cache");

/// Voice strings longer than this that are not catalog names are audio
const MAX_PRESET_NAME_LEN: usize = 64;

/// Request body for `POST /generate`
#[derive(Debug, Deserialize, Validate)]
pub struct GeneratePayload {
    #[serde(default)]
    #[validate(length(min = 1, message = "Missing or invalid 'messages' in payload."))]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<MessageContent>,
    /// Preset name or base64 WAV, only read on system messages
    #[serde(default)]
    pub voice: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text {
        #[serde(default)]
        text: String,
    },
    SpeechAudio {
        audio: AudioPayload,
    },
    Voice {
        voice: VoicePayload,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AudioPayload {
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VoicePayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
}

/// Fields collected while walking the messages; later values win
#[derive(Debug, Default)]
struct Draft {
    text: Option<String>,
    system: Option<String>,
    system_voice: Option<VoiceDescriptor>,
    user_voice: Option<VoiceDescriptor>,
    speech: Option<SpeechInput>,
    saw_user: bool,
}

/// Turn the wire payload into a domain request
///
/// The catalog is only consulted to tell preset names from inline audio in
/// the system `voice` string; whether the voice is usable is decided later.
pub fn normalize(
    payload: GeneratePayload,
    request_id: RequestId,
    catalog: &VoiceCatalog,
) -> Result<GenerationRequest, ApiError> {
    let mut draft = Draft::default();

    for message in payload.messages {
        match message.role.as_str() {
            "system" => read_system(&mut draft, message, catalog),
            "user" => read_user(&mut draft, message)?,
            _ => {},
        }
    }

    if !draft.saw_user {
        return Err(missing_content());
    }

    let text = draft.text.ok_or_else(missing_text)?;
    let voice = match (draft.system_voice, draft.user_voice) {
        (Some(system), Some(user)) if system != user => {
            return Err(ApiError::BadRequest(
                "Invalid voice: system and user messages name different voices.".to_string(),
            ));
        },
        (_, Some(voice)) | (Some(voice), None) => voice,
        (None, None) => VoiceDescriptor::default(),
    };

    let mut request = GenerationRequest::new(text)
        .map_err(|_| missing_text())?
        .with_id(request_id)
        .with_system_instruction(draft.system)
        .with_voice(voice)
        .with_seed(payload.seed.unwrap_or(DEFAULT_SEED));
    if let Some(speech) = draft.speech {
        request = request.with_speech_input(speech);
    }

    Ok(request)
}

fn read_system(draft: &mut Draft, message: ChatMessage, catalog: &VoiceCatalog) {
    if let Some(voice) = message.voice.as_deref().map(str::trim) {
        if !voice.is_empty() {
            draft.system_voice = Some(voice_from_string(voice, catalog));
        }
    }

    match message.content {
        Some(MessageContent::Text(text)) => draft.system = Some(text),
        Some(MessageContent::Parts(parts)) => {
            for part in parts {
                if let ContentPart::Text { text } = part {
                    draft.system = Some(text);
                }
            }
        },
        None => {},
    }
}

fn read_user(draft: &mut Draft, message: ChatMessage) -> Result<(), ApiError> {
    draft.saw_user = true;
    let parts = match message.content {
        Some(MessageContent::Parts(parts)) if !parts.is_empty() => parts,
        _ => return Err(missing_content()),
    };

    for part in parts {
        match part {
            ContentPart::Text { text } => draft.text = Some(text),
            ContentPart::SpeechAudio { audio } => draft.speech = Some(speech_input(audio)?),
            ContentPart::Voice { voice } => draft.user_voice = Some(voice_part(voice)?),
            ContentPart::Other => {},
        }
    }
    Ok(())
}

fn voice_from_string(raw: &str, catalog: &VoiceCatalog) -> VoiceDescriptor {
    if catalog.contains(raw) {
        return VoiceDescriptor::preset(raw);
    }
    if raw.starts_with("data:") || raw.len() > MAX_PRESET_NAME_LEN {
        VoiceDescriptor::inline(raw)
    } else {
        VoiceDescriptor::preset(raw)
    }
}

fn voice_part(voice: VoicePayload) -> Result<VoiceDescriptor, ApiError> {
    if let Some(name) = voice.name.as_deref().map(str::trim) {
        if !name.is_empty() {
            return Ok(VoiceDescriptor::preset(name));
        }
    }

    let data = voice.data.unwrap_or_default();
    if data.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Invalid voice: a voice part needs a 'name' or 'data' field.".to_string(),
        ));
    }
    let format = parse_format(voice.format.as_deref())
        .map_err(|label| ApiError::BadRequest(format!("Invalid voice: unsupported format '{label}'.")))?;
    if format != AudioFormat::Wav {
        return Err(ApiError::BadRequest(
            "Invalid voice: reference audio must be WAV.".to_string(),
        ));
    }
    Ok(VoiceDescriptor::inline(data))
}

fn speech_input(audio: AudioPayload) -> Result<SpeechInput, ApiError> {
    if audio.data.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Invalid speech_audio: missing 'data'.".to_string(),
        ));
    }
    let format = parse_format(audio.format.as_deref()).map_err(|label| {
        ApiError::BadRequest(format!("Invalid speech_audio: unsupported format '{label}'."))
    })?;
    Ok(SpeechInput::new(audio.data, format))
}

/// `None` means WAV; an unknown label comes back as the error
fn parse_format(label: Option<&str>) -> Result<AudioFormat, String> {
    match label {
        None => Ok(AudioFormat::Wav),
        Some(label) => AudioFormat::from_label(label).ok_or_else(|| label.to_string()),
    }
}

fn missing_content() -> ApiError {
    ApiError::BadRequest("Missing or invalid 'content' in user message.".to_string())
}

fn missing_text() -> ApiError {
    ApiError::BadRequest("Missing required 'text' in user content.".to_string())
}

/// Chat-completion envelope for text results
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatCompletion {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompletionChoice {
    pub index: u32,
    pub message: AssistantMessage,
    pub finish_reason: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssistantMessage {
    pub role: String,
    pub content: String,
}

impl ChatCompletion {
    pub fn new(request_id: RequestId, content: String) -> Self {
        Self {
            id: format!("chatcmpl-{}", request_id.short()),
            object: "chat.completion".to_string(),
            created: chrono::Utc::now().timestamp(),
            choices: vec![CompletionChoice {
                index: 0,
                message: AssistantMessage {
                    role: "assistant".to_string(),
                    content,
                },
                finish_reason: "stop".to_string(),
            }],
        }
    }
}

/// Handle `POST /generate` and its `/audio` alias
#[instrument(skip(state, payload), fields(request_id = %request_id, messages = payload.messages.len()))]
pub async fn generate(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    ValidatedJson(payload): ValidatedJson<GeneratePayload>,
) -> Result<Response, ApiError> {
    let request = normalize(payload, request_id, &state.voices)?;
    let outcome = state.orchestrator.handle(request).await?;

    info!(
        cache_key = %outcome.cache_key,
        from_cache = outcome.from_cache,
        pipeline = ?outcome.selection,
        "Generation finished"
    );

    Ok(into_response(outcome))
}

fn into_response(outcome: GenerationOutcome) -> Response {
    let cache_status = HeaderValue::from_static(if outcome.from_cache { "HIT" } else { "MISS" });

    let mut response = match outcome.result {
        PipelineResult::Audio { wav, .. } => {
            let disposition = format!("inline; filename={}", outcome.cache_key.file_name("wav"));
            let length = HeaderValue::from(wav.len());
            let mut response = wav.into_response();
            let headers = response.headers_mut();
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("audio/wav"));
            headers.insert(header::CONTENT_LENGTH, length);
            if let Ok(value) = HeaderValue::from_str(&disposition) {
                headers.insert(header::CONTENT_DISPOSITION, value);
            }
            response
        },
        PipelineResult::Text(text) => {
            Json(ChatCompletion::new(outcome.request_id, text)).into_response()
        },
    };

    response.headers_mut().insert(CACHE_HEADER, cache_status);
    response
}
