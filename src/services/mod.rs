pub mod backend;
pub mod voices;

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::types::Language;

pub use backend::BackendClient;

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Maximum number of words in a spoken coaching tip.
pub const MAX_COACHING_TIP_WORDS: usize = 15;
/// Maximum number of words in a spoken performance review.
pub const MAX_PERFORMANCE_REVIEW_WORDS: usize = 100;
/// Longest text accepted for speech synthesis.
pub const MAX_TTS_TEXT_CHARS: usize = 5000;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachingTipRequest {
    pub score: f64,
    #[serde(rename = "weakPoints")]
    pub weak_body_parts: Vec<String>,
    #[serde(rename = "strongPoints")]
    pub strong_body_parts: Vec<String>,
    pub language: Language,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachingTip {
    pub tip: String,
    pub target_body_part: String,
}

/// How well the pose detector kept up during a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageSummary {
    pub attempted_joints: u32,
    pub skipped_joints: u32,
    pub skip_fraction: f64,
    pub top_skipped_joints: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReviewRequest {
    pub song_title: String,
    pub song_artist: String,
    pub final_score: f64,
    pub previous_best: Option<f64>,
    pub strongest_part: String,
    pub weakest_part: String,
    pub total_frames: usize,
    pub language: Language,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage: Option<CoverageSummary>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReview {
    pub review: String,
    pub improvement_tip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechRequest {
    pub text: String,
    pub voice_id: String,
    pub language: Language,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedSpeech {
    pub audio: Vec<u8>,
    pub format: String,
    pub duration_ms: u64,
}

/// Service trait for coaching text generation
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    /// Short tip targeting the weakest body part
    async fn generate_coaching_tip(&self, request: CoachingTipRequest)
        -> ServiceResult<CoachingTip>;

    /// End-of-session review
    async fn generate_performance_review(
        &self,
        request: PerformanceReviewRequest,
    ) -> ServiceResult<PerformanceReview>;
}

/// Service trait for text-to-speech
#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn text_to_speech(&self, request: SpeechRequest) -> ServiceResult<SynthesizedSpeech>;
}

/// Reports whether the device is running low on battery.
#[async_trait::async_trait]
pub trait BatteryStateProvider: Send + Sync {
    async fn is_low_battery(&self) -> ServiceResult<bool>;
}

/// Truncate to `max_words` words, preferring to end on a sentence boundary
/// in the second half of the truncated text.
pub fn truncate_to_word_limit(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return text.to_string();
    }

    let truncated = words[..max_words].join(" ");
    // Character offsets, not bytes, so non-Latin text is cut the same way
    let half = truncated.chars().count() / 2;
    for punct in ['.', '!', '?'] {
        if let Some(position) = truncated.rfind(punct) {
            if truncated[..position].chars().count() > half {
                return truncated[..=position].to_string();
            }
        }
    }

    format!("{}...", truncated)
}

/// Reject texts the synthesis service would refuse anyway.
pub fn validate_speech_text(text: &str) -> ServiceResult<()> {
    if text.trim().is_empty() {
        return Err(ServiceError::InvalidRequest(
            "text cannot be empty or whitespace only".to_string(),
        ));
    }
    if text.chars().count() > MAX_TTS_TEXT_CHARS {
        return Err(ServiceError::InvalidRequest(format!(
            "text exceeds maximum length of {} characters",
            MAX_TTS_TEXT_CHARS
        )));
    }
    Ok(())
}

pub(crate) fn validate_score(name: &str, score: f64) -> ServiceResult<()> {
    if !(0.0..=100.0).contains(&score) {
        return Err(ServiceError::InvalidRequest(format!(
            "{} must be between 0 and 100, got {}",
            name, score
        )));
    }
    Ok(())
}
