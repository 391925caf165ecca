//! Voice presets per coaching language.

use crate::types::Language;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceConfig {
    pub default_voice: &'static str,
    /// Display name -> voice id
    pub available: &'static [(&'static str, &'static str)],
    pub model: &'static str,
}

const ENGLISH: VoiceConfig = VoiceConfig {
    default_voice: "21m00Tcm4TlvDq8ikWAM",
    available: &[
        ("Rachel", "21m00Tcm4TlvDq8ikWAM"),
        ("Drew", "29vD33N1CtxCmqQRPOHJ"),
        ("Clyde", "2EiwWnXFnvU5JabPnv8n"),
        ("Paul", "5Q0t7uMcjvnagumLfvZi"),
        ("Domi", "AZnzlk1XvdvUeBnXmlld"),
    ],
    model: "eleven_turbo_v2",
};

const SPANISH: VoiceConfig = VoiceConfig {
    default_voice: "XrExE9yKIg1WjnnlVkGX",
    available: &[("Laura", "XrExE9yKIg1WjnnlVkGX")],
    model: "eleven_multilingual_v2",
};

// Antoni handles both German and Russian
const MULTILINGUAL: VoiceConfig = VoiceConfig {
    default_voice: "ErXwobaYiN019PkySvjV",
    available: &[("Antoni", "ErXwobaYiN019PkySvjV")],
    model: "eleven_multilingual_v2",
};

pub fn voice_config(language: Language) -> &'static VoiceConfig {
    match language {
        Language::En => &ENGLISH,
        Language::Es => &SPANISH,
        Language::De | Language::Ru => &MULTILINGUAL,
    }
}

/// Resolve a requested voice (id or display name) for a language.
///
/// Empty requests get the language default, known names map to their id and
/// anything else is assumed to already be a voice id.
pub fn resolve_voice(language: Language, requested: Option<&str>) -> String {
    let config = voice_config(language);
    match requested.map(str::trim) {
        None | Some("") => config.default_voice.to_string(),
        Some(name) => config
            .available
            .iter()
            .find(|(display, _)| *display == name)
            .map(|(_, id)| id.to_string())
            .unwrap_or_else(|| name.to_string()),
    }
}
