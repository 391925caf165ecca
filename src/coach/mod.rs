//! Real-time feedback decisions.
//!
//! `CoachingEngine` turns the stream of pose observations into queued speech:
//! it gates on the enabled flag and a cooldown, classifies the score, asks the
//! AI services for a tip and degrades to pre-written phrases or text-only clips
//! when they fail. Nothing in here ever returns an error to the caller.

pub mod gateway;
pub mod phrases;
pub mod review;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::CoachConfig;
use crate::playback::AudioPlaybackQueue;
use crate::services::voices::resolve_voice;
use crate::services::{BatteryStateProvider, CoachingTipRequest};
use crate::types::{FeedbackType, Language, PoseObservation, PriorityTier, SpeechClip};

pub use gateway::ServiceGateway;
pub use review::{BodyPartMatch, FrameScore, SessionReview, SessionReviewer, SessionSummary};

/// What `on_pose_observation` did with an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackOutcome {
    Disabled,
    /// The tracker has switched the services off
    Unavailable,
    CoolingDown,
    NothingToSay,
    Dispatched(FeedbackType),
    /// Feedback was due but every attempt failed
    Dropped(FeedbackType),
}

#[derive(Debug, Clone)]
struct CoachingSession {
    last_feedback_timestamp_ms: u64,
    cooldown_ms: u64,
    language: Language,
    voice_id: Option<String>,
    enabled: bool,
    battery_adaptation: bool,
    autoplay: bool,
    /// Generated tip whose synthesis failed on the network
    pending_tip: Option<String>,
}

pub struct CoachingEngine {
    services: ServiceGateway,
    queue: AudioPlaybackQueue,
    battery: Option<Arc<dyn BatteryStateProvider>>,
    session: Mutex<CoachingSession>,
}

impl CoachingEngine {
    pub fn new(config: CoachConfig, services: ServiceGateway, queue: AudioPlaybackQueue) -> Self {
        Self {
            services,
            queue,
            battery: None,
            session: Mutex::new(CoachingSession {
                last_feedback_timestamp_ms: 0,
                cooldown_ms: config.cooldown_ms,
                language: config.language,
                voice_id: config.voice_id,
                enabled: config.enabled,
                battery_adaptation: config.battery_adaptation,
                autoplay: config.autoplay,
                pending_tip: None,
            }),
        }
    }

    pub fn with_battery(mut self, battery: Arc<dyn BatteryStateProvider>) -> Self {
        self.battery = Some(battery);
        self
    }

    fn session(&self) -> MutexGuard<'_, CoachingSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_language(&self, language: Language) {
        self.session().language = language;
    }

    pub fn language(&self) -> Language {
        self.session().language
    }

    /// Voice id or display name; `None` selects the language default.
    pub fn set_voice(&self, voice_id: Option<String>) {
        self.session().voice_id = voice_id;
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.session().enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.session().enabled
    }

    pub fn set_cooldown_ms(&self, cooldown_ms: u64) {
        self.session().cooldown_ms = cooldown_ms;
    }

    pub fn cooldown_ms(&self) -> u64 {
        self.session().cooldown_ms
    }

    pub fn last_feedback_timestamp_ms(&self) -> u64 {
        self.session().last_feedback_timestamp_ms
    }

    pub fn pending_tip(&self) -> Option<String> {
        self.session().pending_tip.clone()
    }

    /// Forget the last dispatch so the next observation is not cooled down.
    pub fn reset(&self) {
        self.session().last_feedback_timestamp_ms = 0;
    }

    /// Cooldown in effect right now, doubled on low battery when adaptation is on.
    pub async fn effective_cooldown_ms(&self) -> u64 {
        let (base, adapt) = {
            let session = self.session();
            (session.cooldown_ms, session.battery_adaptation)
        };

        let battery = match (&self.battery, adapt) {
            (Some(battery), true) => battery,
            _ => return base,
        };

        match battery.is_low_battery().await {
            Ok(true) => base.saturating_mul(2),
            Ok(false) => base,
            Err(e) => {
                log::debug!("Battery state unavailable, using base cooldown: {}", e);
                base
            }
        }
    }

    /// Decide whether and what to speak for one observation.
    pub async fn on_pose_observation(&self, observation: &PoseObservation) -> FeedbackOutcome {
        let (enabled, last_feedback) = {
            let session = self.session();
            (session.enabled, session.last_feedback_timestamp_ms)
        };
        if !enabled {
            return FeedbackOutcome::Disabled;
        }

        let cooldown = self.effective_cooldown_ms().await;
        if observation.timestamp_ms.saturating_sub(last_feedback) < cooldown {
            log::debug!(
                "Feedback suppressed at {}ms, cooling down ({}ms)",
                observation.timestamp_ms,
                cooldown
            );
            return FeedbackOutcome::CoolingDown;
        }

        let feedback = FeedbackType::classify(observation.score);
        if feedback == FeedbackType::None {
            return FeedbackOutcome::NothingToSay;
        }

        if !self.services.tracker().is_available() {
            log::debug!("Voice services disabled, skipping {} feedback", feedback);
            return FeedbackOutcome::Unavailable;
        }

        let dispatched = match feedback {
            FeedbackType::Encouragement => self.encourage().await,
            FeedbackType::CoachingTip => self.coach(observation).await,
            FeedbackType::None => false,
        };

        if dispatched {
            self.session().last_feedback_timestamp_ms = observation.timestamp_ms;
            FeedbackOutcome::Dispatched(feedback)
        } else {
            FeedbackOutcome::Dropped(feedback)
        }
    }

    fn voice(&self) -> (Language, String) {
        let session = self.session();
        let voice = resolve_voice(session.language, session.voice_id.as_deref());
        (session.language, voice)
    }

    fn enqueue(&self, clip: SpeechClip) {
        let autoplay = self.session().autoplay;
        log::info!("🗣️ Coach: {}", clip.transcript);
        self.queue.enqueue(clip, autoplay);
    }

    async fn encourage(&self) -> bool {
        let (language, voice) = self.voice();
        let Some(phrase) = phrases::random_phrase(phrases::encouragement_phrases(language)) else {
            return false;
        };

        match self.services.synthesize(phrase, &voice, language).await {
            Ok(audio) => {
                self.enqueue(SpeechClip::new(audio, PriorityTier::Normal, phrase));
                true
            }
            Err(e) => {
                log::warn!("⚠️ Encouragement synthesis failed: {}", e);
                false
            }
        }
    }

    async fn coach(&self, observation: &PoseObservation) -> bool {
        let (language, voice) = self.voice();
        let request = CoachingTipRequest {
            score: observation.score,
            weak_body_parts: observation.weak_body_parts.clone(),
            strong_body_parts: observation.strong_body_parts.clone(),
            language,
        };

        let tip = match self.services.coaching_tip(request).await {
            Ok(tip) => tip,
            Err(e) if e.is_network() => {
                log::warn!("⚠️ Coaching tip unavailable (network): {}", e);
                return self.speak_pending_tip(&voice, language).await;
            }
            Err(e) => {
                log::warn!("⚠️ Coaching tip failed, using fallback phrase: {}", e);
                return self.speak_fallback(&voice, language).await;
            }
        };

        log::debug!(
            "Generated tip for {} (weakest: {})",
            tip.target_body_part,
            observation.weakest_body_part()
        );

        match self.services.synthesize(&tip.tip, &voice, language).await {
            Ok(audio) => {
                self.session().pending_tip = None;
                self.enqueue(SpeechClip::new(audio, PriorityTier::Normal, tip.tip));
                true
            }
            Err(e) if e.is_network() => {
                log::warn!("⚠️ Tip synthesis failed (network), keeping tip for retry: {}", e);
                self.session().pending_tip = Some(tip.tip);
                false
            }
            Err(e) => {
                log::warn!("⚠️ Tip synthesis failed, showing text only: {}", e);
                self.session().pending_tip = None;
                self.enqueue(SpeechClip::text_only(PriorityTier::Normal, tip.tip));
                self.speak_fallback(&voice, language).await;
                true
            }
        }
    }

    /// Retry a tip kept from an earlier network failure during synthesis.
    async fn speak_pending_tip(&self, voice: &str, language: Language) -> bool {
        let Some(tip) = self.session().pending_tip.take() else {
            return false;
        };

        match self.services.synthesize(&tip, voice, language).await {
            Ok(audio) => {
                self.enqueue(SpeechClip::new(audio, PriorityTier::Normal, tip));
                true
            }
            Err(e) => {
                log::warn!("⚠️ Pending tip synthesis failed: {}", e);
                if e.is_network() {
                    self.session().pending_tip.get_or_insert(tip);
                }
                false
            }
        }
    }

    async fn speak_fallback(&self, voice: &str, language: Language) -> bool {
        let Some(phrase) = phrases::random_phrase(phrases::fallback_phrases(language)) else {
            return false;
        };

        match self.services.synthesize(phrase, voice, language).await {
            Ok(audio) => {
                self.enqueue(SpeechClip::new(audio, PriorityTier::Normal, phrase));
                true
            }
            Err(e) => {
                log::warn!("⚠️ Fallback phrase synthesis failed: {}", e);
                false
            }
        }
    }
}
