use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Tool the assistant calls to put structured content on the slide canvas
pub const CANVAS_TOOL_NAME: &str = "provideCanvasMarkdown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Modality {
    Audio,
    Text,
}

/// Empty object enabling a transcription channel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioTranscriptionConfig {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlidingWindow {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextWindowCompression {
    pub sliding_window: SlidingWindow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResumption {
    pub handle: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveConnectConfig {
    pub response_modalities: Vec<Modality>,
    pub input_audio_transcription: AudioTranscriptionConfig,
    pub output_audio_transcription: AudioTranscriptionConfig,
    pub speech_config: SpeechConfig,
    pub tools: Vec<Tool>,
    /// Bounds context growth so sessions can run indefinitely
    pub context_window_compression: ContextWindowCompression,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_resumption: Option<SessionResumption>,
    pub system_instruction: String,
}

/// Everything sent when a streaming session opens or reopens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSetup {
    pub model: String,
    pub config: LiveConnectConfig,
}

impl SessionSetup {
    pub fn is_resuming(&self) -> bool {
        self.config.session_resumption.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SetupParams<'a> {
    pub model: &'a str,
    pub voice: &'a str,
    pub language: &'a str,
    pub general_info: &'a str,
    pub custom_prompt: Option<&'a str>,
    /// Handle from a previous connection; continues its context when present
    pub resumption_handle: Option<&'a str>,
}

pub fn build_session_setup(params: &SetupParams<'_>) -> SessionSetup {
    let session_resumption = params
        .resumption_handle
        .filter(|h| !h.is_empty())
        .map(|handle| SessionResumption {
            handle: handle.to_string(),
        });

    SessionSetup {
        model: params.model.to_string(),
        config: LiveConnectConfig {
            response_modalities: vec![Modality::Audio],
            input_audio_transcription: AudioTranscriptionConfig::default(),
            output_audio_transcription: AudioTranscriptionConfig::default(),
            speech_config: SpeechConfig {
                voice_config: VoiceConfig {
                    prebuilt_voice_config: PrebuiltVoiceConfig {
                        voice_name: params.voice.to_string(),
                    },
                },
            },
            tools: vec![Tool {
                function_declarations: vec![canvas_tool_declaration()],
            }],
            context_window_compression: ContextWindowCompression::default(),
            session_resumption,
            system_instruction: system_instruction(
                params.language,
                params.general_info,
                params.custom_prompt,
            ),
        },
    }
}

pub fn canvas_tool_declaration() -> FunctionDeclaration {
    FunctionDeclaration {
        name: CANVAS_TOOL_NAME.to_string(),
        description: "Show structured content on the slide canvas: math in markdown with $...$, \
                      mermaid diagrams, ASCII sketches, or tables. Use it whenever a spoken \
                      explanation benefits from something visual."
            .to_string(),
        parameters: json!({
            "type": "OBJECT",
            "properties": {
                "blocks": {
                    "type": "ARRAY",
                    "description": "Content blocks rendered in order.",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "type": {
                                "type": "STRING",
                                "enum": ["markdown", "diagram", "ascii", "table"]
                            },
                            "content": { "type": "STRING" }
                        },
                        "required": ["type", "content"]
                    }
                },
                "slideNumber": {
                    "type": "INTEGER",
                    "description": "1-based slide to attach the content to. Defaults to the active slide."
                }
            },
            "required": ["blocks"]
        }),
    }
}

pub fn system_instruction(language: &str, general_info: &str, custom_prompt: Option<&str>) -> String {
    let preferences = custom_prompt
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| format!("\n- User Preferences: {}", p))
        .unwrap_or_default();

    format!(
        "You are an AI lecturer explaining slide-by-slide in {language}.

**Context:**
- Presentation info: {general_info}{preferences}
- You will receive slide summaries, images, and canvas context.

**Rules:**
- **Language:** Speak ONLY in {language}. Never answer in any other language, even if addressed in one.
- **Style:** Be concise and direct. 1-2 sentence explanations per point. Avoid meta-commentary (e.g., \"in this slide\", \"let's look at\").
- **Navigation:** You CANNOT change slides. To move, ask the user to use the UI controls (buttons or thumbnails).
- **Workflow:** Explain the active slide using the provided image, summary, and canvas. When finished, ask the user to proceed.
- **Active Slide:** When you see `ACTIVE SLIDE: N`, immediately switch focus to slide N. Wait for the image/summary before explaining.
- **Canvas:** Use '{tool}' proactively for math ($ $), diagrams (```mermaid), or complex data. After calling it, tell the user to check the canvas.
- **Interaction:** Answer questions concisely using slide context. If a question is about another slide, tease it and ask the user to navigate there.",
        tool = CANVAS_TOOL_NAME,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params<'a>(handle: Option<&'a str>) -> SetupParams<'a> {
        SetupParams {
            model: "live-model",
            voice: "Kore",
            language: "German",
            general_info: "Thermodynamics primer",
            custom_prompt: Some("Focus on exam topics"),
            resumption_handle: handle,
        }
    }

    #[test]
    fn test_fresh_setup_omits_resumption() {
        let setup = build_session_setup(&params(None));
        assert!(!setup.is_resuming());

        let value = serde_json::to_value(&setup).unwrap();
        assert!(value["config"].get("sessionResumption").is_none());
        assert_eq!(value["config"]["responseModalities"], json!(["AUDIO"]));
        assert_eq!(value["config"]["inputAudioTranscription"], json!({}));
        assert_eq!(value["config"]["outputAudioTranscription"], json!({}));
        assert_eq!(value["config"]["contextWindowCompression"], json!({"slidingWindow": {}}));
        assert_eq!(
            value["config"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
            "Kore"
        );
        assert_eq!(
            value["config"]["tools"][0]["functionDeclarations"][0]["name"],
            CANVAS_TOOL_NAME
        );
    }

    #[test]
    fn test_resumption_handle_is_forwarded() {
        let setup = build_session_setup(&params(Some("handle-123")));
        assert_eq!(
            setup.config.session_resumption,
            Some(SessionResumption {
                handle: "handle-123".to_string()
            })
        );

        // Empty handle means start fresh
        assert!(!build_session_setup(&params(Some(""))).is_resuming());
    }

    #[test]
    fn test_system_instruction_contents() {
        let setup = build_session_setup(&params(None));
        let prompt = &setup.config.system_instruction;
        assert!(prompt.contains("Speak ONLY in German"));
        assert!(prompt.contains("Presentation info: Thermodynamics primer"));
        assert!(prompt.contains("User Preferences: Focus on exam topics"));
        assert!(prompt.contains("You CANNOT change slides"));
        assert!(prompt.contains("ACTIVE SLIDE: N"));
    }

    #[test]
    fn test_system_instruction_without_preferences() {
        let prompt = system_instruction("English", "Intro", Some("   "));
        assert!(!prompt.contains("User Preferences"));
    }
}
