use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::sync::Arc;
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::error::{CoachError, Result};

/// Body part label used when no specific part can be named.
pub const OVERALL_BODY_PART: &str = "overall";

/// One analyzed video frame as reported by the pose-comparison pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoseObservation {
    /// Match score in the range 0-100
    pub score: f64,
    /// Weak body parts, most significant first
    #[serde(default)]
    pub weak_body_parts: Vec<String>,
    #[serde(default)]
    pub strong_body_parts: Vec<String>,
    pub timestamp_ms: u64,
}

impl PoseObservation {
    pub fn new(score: f64, timestamp_ms: u64) -> Self {
        Self {
            score,
            weak_body_parts: Vec::new(),
            strong_body_parts: Vec::new(),
            timestamp_ms,
        }
    }

    pub fn with_weak_parts<I, S>(mut self, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.weak_body_parts = parts.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_strong_parts<I, S>(mut self, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.strong_body_parts = parts.into_iter().map(Into::into).collect();
        self
    }

    /// The body part to focus coaching on: the first weak part, or "overall".
    pub fn weakest_body_part(&self) -> &str {
        self.weak_body_parts
            .first()
            .map(String::as_str)
            .unwrap_or(OVERALL_BODY_PART)
    }

    /// Read observations from JSON lines, skipping blank lines.
    pub fn read_jsonl<R: BufRead>(reader: R) -> Result<Vec<PoseObservation>> {
        let mut observations = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let observation = serde_json::from_str(&line).map_err(|e| {
                CoachError::InvalidInput(format!("line {}: {}", index + 1, e))
            })?;
            observations.push(observation);
        }
        Ok(observations)
    }
}

/// Scheduling tier of a queued speech clip.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PriorityTier {
    Low,
    Normal,
    High,
}

/// A unit of speech owned by the playback queue once enqueued.
///
/// Empty `audio` marks a text-only clip: it is announced to listeners but
/// nothing is decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechClip {
    pub id: String,
    pub audio: Arc<[u8]>,
    pub priority: PriorityTier,
    pub transcript: String,
}

impl SpeechClip {
    pub fn new(audio: Vec<u8>, priority: PriorityTier, transcript: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            audio: audio.into(),
            priority,
            transcript: transcript.into(),
        }
    }

    pub fn text_only(priority: PriorityTier, transcript: impl Into<String>) -> Self {
        Self::new(Vec::new(), priority, transcript)
    }

    pub fn is_text_only(&self) -> bool {
        self.audio.is_empty()
    }
}

/// Languages the coach can speak.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Language {
    #[default]
    En,
    Es,
    De,
    Ru,
}

impl Language {
    pub fn code(&self) -> &str {
        self.as_ref()
    }
}

/// What kind of spoken feedback a score calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum FeedbackType {
    CoachingTip,
    Encouragement,
    None,
}

impl FeedbackType {
    /// Below 70 needs a tip, above 90 earns encouragement; 70 and 90 themselves stay quiet.
    pub fn classify(score: f64) -> Self {
        if score < 70.0 {
            FeedbackType::CoachingTip
        } else if score > 90.0 {
            FeedbackType::Encouragement
        } else {
            FeedbackType::None
        }
    }
}
