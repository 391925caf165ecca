//! End-of-session performance review.

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::gateway::ServiceGateway;
use crate::config::CoachConfig;
use crate::playback::AudioPlaybackQueue;
use crate::services::voices::resolve_voice;
use crate::services::{CoverageSummary, PerformanceReviewRequest};
use crate::types::{Language, PriorityTier, SpeechClip, OVERALL_BODY_PART};

/// Whether one body part matched the reference pose in a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyPartMatch {
    pub part: String,
    pub matched: bool,
}

/// Per-frame score record kept during a session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameScore {
    pub timestamp_ms: u64,
    pub score: f64,
    pub body_parts: Vec<BodyPartMatch>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSummary {
    pub song_title: String,
    pub song_artist: String,
    pub final_score: f64,
    pub previous_best: Option<f64>,
    /// Overrides the strongest part computed from `frames`
    pub strongest_part: Option<String>,
    /// Overrides the weakest part computed from `frames`
    pub weakest_part: Option<String>,
    pub frames: Vec<FrameScore>,
    pub coverage: Option<CoverageSummary>,
}

/// Spoken review text. Empty when reviews are off or anything failed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionReview {
    pub review: String,
    pub improvement_tip: String,
}

impl SessionReview {
    pub fn is_empty(&self) -> bool {
        self.review.is_empty() && self.improvement_tip.is_empty()
    }
}

/// Strongest and weakest body part by match ratio across all frames.
///
/// Ties keep the part encountered first; without any body part data both are "overall".
pub fn body_part_extremes(frames: &[FrameScore]) -> (String, String) {
    // (part, matched, seen) in first-seen order
    let mut stats: Vec<(&str, u32, u32)> = Vec::new();
    for body_part in frames.iter().flat_map(|frame| frame.body_parts.iter()) {
        match stats.iter_mut().find(|(part, _, _)| *part == body_part.part) {
            Some(entry) => {
                entry.1 += u32::from(body_part.matched);
                entry.2 += 1;
            }
            None => stats.push((&body_part.part, u32::from(body_part.matched), 1)),
        }
    }

    let ratio = |&(_, matched, seen): &(&str, u32, u32)| f64::from(matched) / f64::from(seen);

    let mut strongest: Option<(&str, f64)> = None;
    let mut weakest: Option<(&str, f64)> = None;
    for entry in &stats {
        let value = ratio(entry);
        if strongest.map_or(true, |(_, best)| value > best) {
            strongest = Some((entry.0, value));
        }
        if weakest.map_or(true, |(_, worst)| value < worst) {
            weakest = Some((entry.0, value));
        }
    }

    let name = |found: Option<(&str, f64)>| {
        found
            .map(|(part, _)| part.to_string())
            .unwrap_or_else(|| OVERALL_BODY_PART.to_string())
    };
    (name(strongest), name(weakest))
}

struct ReviewSettings {
    language: Language,
    voice_id: Option<String>,
    enabled: bool,
    autoplay: bool,
}

/// One-shot reviewer invoked when a session ends. Not cooldown gated.
pub struct SessionReviewer {
    services: ServiceGateway,
    queue: AudioPlaybackQueue,
    settings: Mutex<ReviewSettings>,
}

impl SessionReviewer {
    pub fn new(config: &CoachConfig, services: ServiceGateway, queue: AudioPlaybackQueue) -> Self {
        Self {
            services,
            queue,
            settings: Mutex::new(ReviewSettings {
                language: config.language,
                voice_id: config.voice_id.clone(),
                enabled: config.enabled,
                autoplay: config.autoplay,
            }),
        }
    }

    fn settings(&self) -> MutexGuard<'_, ReviewSettings> {
        self.settings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.settings().enabled = enabled;
    }

    pub fn set_language(&self, language: Language) {
        self.settings().language = language;
    }

    pub fn set_voice(&self, voice_id: Option<String>) {
        self.settings().voice_id = voice_id;
    }

    /// Generate, voice and queue a review of the finished session.
    ///
    /// The review clip is high priority and evicts queued coaching tips. Any
    /// failure yields an empty review; there is no fallback phrasing.
    pub async fn review_session(&self, session: &SessionSummary) -> SessionReview {
        let (enabled, language, voice, autoplay) = {
            let settings = self.settings();
            (
                settings.enabled,
                settings.language,
                resolve_voice(settings.language, settings.voice_id.as_deref()),
                settings.autoplay,
            )
        };
        if !enabled {
            return SessionReview::default();
        }
        if !self.services.tracker().is_available() {
            log::debug!("Voice services disabled, skipping session review");
            return SessionReview::default();
        }

        let (computed_strongest, computed_weakest) = body_part_extremes(&session.frames);
        let request = PerformanceReviewRequest {
            song_title: session.song_title.clone(),
            song_artist: session.song_artist.clone(),
            final_score: session.final_score,
            previous_best: session.previous_best,
            strongest_part: session.strongest_part.clone().unwrap_or(computed_strongest),
            weakest_part: session.weakest_part.clone().unwrap_or(computed_weakest),
            total_frames: session.frames.len(),
            language,
            coverage: session.coverage.clone(),
        };

        let generated = match self.services.performance_review(request).await {
            Ok(review) => review,
            Err(e) => {
                log::warn!("⚠️ Performance review failed: {}", e);
                return SessionReview::default();
            }
        };

        let transcript = format!(
            "{} {}",
            generated.review.trim(),
            generated.improvement_tip.trim()
        )
        .trim()
        .to_string();

        match self.services.synthesize(&transcript, &voice, language).await {
            Ok(audio) => {
                log::info!("🗣️ Review: {}", transcript);
                self.queue
                    .enqueue(SpeechClip::new(audio, PriorityTier::High, transcript), autoplay);
                SessionReview {
                    review: generated.review,
                    improvement_tip: generated.improvement_tip,
                }
            }
            Err(e) => {
                log::warn!("⚠️ Review synthesis failed: {}", e);
                SessionReview::default()
            }
        }
    }
}
