//! Test doubles shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use voice_coach::{
    audio_sink::AudioSink,
    config::{CoachConfig, TrackerConfig},
    error::{AudioError, ServiceError},
    playback::{BackgroundMusicChannel, PlaybackListener},
    services::{
        BatteryStateProvider, CoachingTip, CoachingTipRequest, PerformanceReview,
        PerformanceReviewRequest, ServiceResult, SpeechRequest, SpeechSynthesizer,
        SynthesizedSpeech, TextGenerator,
    },
    types::SpeechClip,
    AudioPlaybackQueue, CoachingEngine, FailureTracker, ServiceGateway,
};

pub fn init_logger() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

pub fn network_error() -> ServiceError {
    ServiceError::Network("connection refused".to_string())
}

pub fn server_error() -> ServiceError {
    ServiceError::api(500, "internal error")
}

/// Text generator answering from a script, then with canned defaults.
#[derive(Default)]
pub struct ScriptedText {
    tips: Mutex<VecDeque<ServiceResult<CoachingTip>>>,
    reviews: Mutex<VecDeque<ServiceResult<PerformanceReview>>>,
    tip_requests: Mutex<Vec<CoachingTipRequest>>,
    review_requests: Mutex<Vec<PerformanceReviewRequest>>,
}

pub const DEFAULT_TIP: &str = "Lift your arms higher!";
pub const DEFAULT_REVIEW: &str = "Great session, your arms were on point.";
pub const DEFAULT_IMPROVEMENT: &str = "Work on bending your knees.";

impl ScriptedText {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_tip(&self, result: ServiceResult<CoachingTip>) {
        self.tips.lock().unwrap().push_back(result);
    }

    pub fn push_tip_error(&self, error: ServiceError) {
        self.push_tip(Err(error));
    }

    pub fn push_review(&self, result: ServiceResult<PerformanceReview>) {
        self.reviews.lock().unwrap().push_back(result);
    }

    pub fn tip_calls(&self) -> usize {
        self.tip_requests.lock().unwrap().len()
    }

    pub fn tip_requests(&self) -> Vec<CoachingTipRequest> {
        self.tip_requests.lock().unwrap().clone()
    }

    pub fn review_requests(&self) -> Vec<PerformanceReviewRequest> {
        self.review_requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl TextGenerator for ScriptedText {
    async fn generate_coaching_tip(
        &self,
        request: CoachingTipRequest,
    ) -> ServiceResult<CoachingTip> {
        let target = request
            .weak_body_parts
            .first()
            .cloned()
            .unwrap_or_else(|| "overall".to_string());
        self.tip_requests.lock().unwrap().push(request);
        let scripted = self.tips.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(CoachingTip {
                tip: DEFAULT_TIP.to_string(),
                target_body_part: target,
            })
        })
    }

    async fn generate_performance_review(
        &self,
        request: PerformanceReviewRequest,
    ) -> ServiceResult<PerformanceReview> {
        self.review_requests.lock().unwrap().push(request);
        let scripted = self.reviews.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(PerformanceReview {
                review: DEFAULT_REVIEW.to_string(),
                improvement_tip: DEFAULT_IMPROVEMENT.to_string(),
            })
        })
    }
}

/// Speech synthesizer recording every text it is asked to speak.
#[derive(Default)]
pub struct ScriptedSpeech {
    results: Mutex<VecDeque<ServiceResult<SynthesizedSpeech>>>,
    texts: Mutex<Vec<String>>,
}

impl ScriptedSpeech {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_error(&self, error: ServiceError) {
        self.results.lock().unwrap().push_back(Err(error));
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.texts.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for ScriptedSpeech {
    async fn text_to_speech(&self, request: SpeechRequest) -> ServiceResult<SynthesizedSpeech> {
        self.texts.lock().unwrap().push(request.text);
        let scripted = self.results.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(SynthesizedSpeech {
                audio: vec![0xFF, 0xF3, 0x44, 0xC4],
                format: "mp3".to_string(),
                duration_ms: 500,
            })
        })
    }
}

/// Sink that records play calls and optionally takes time to "play".
#[derive(Default)]
pub struct RecordingSink {
    delay: Duration,
    fail_first: AtomicBool,
    plays: AtomicUsize,
    stops: AtomicUsize,
    stopped: Notify,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Default::default()
        })
    }

    pub fn failing_first() -> Arc<Self> {
        Arc::new(Self {
            fail_first: AtomicBool::new(true),
            ..Default::default()
        })
    }

    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AudioSink for RecordingSink {
    async fn play(&self, _audio_data: &[u8]) -> Result<(), AudioError> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        if self.fail_first.swap(false, Ordering::SeqCst) {
            return Err(AudioError::Decode("not an mp3".to_string()));
        }
        if self.delay.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = tokio::time::sleep(self.delay) => Ok(()),
            _ = self.stopped.notified() => Err(AudioError::Stopped),
        }
    }

    async fn stop(&self) -> Result<(), AudioError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.stopped.notify_waiters();
        Ok(())
    }
}

/// Background music channel keeping every volume it was set to.
pub struct FakeMusic {
    volume: Mutex<f32>,
    history: Mutex<Vec<f32>>,
}

impl FakeMusic {
    pub fn new(volume: f32) -> Arc<Self> {
        Arc::new(Self {
            volume: Mutex::new(volume),
            history: Mutex::new(Vec::new()),
        })
    }

    pub fn history(&self) -> Vec<f32> {
        self.history.lock().unwrap().clone()
    }
}

impl BackgroundMusicChannel for FakeMusic {
    fn volume(&self) -> f32 {
        *self.volume.lock().unwrap()
    }

    fn set_volume(&self, volume: f32) {
        *self.volume.lock().unwrap() = volume;
        self.history.lock().unwrap().push(volume);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    Changed(Vec<String>),
    Started(String),
    Ended(String),
}

#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<QueueEvent>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<QueueEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn started(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                QueueEvent::Started(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn ended(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                QueueEvent::Ended(text) => Some(text),
                _ => None,
            })
            .collect()
    }
}

impl PlaybackListener for RecordingListener {
    fn on_queue_change(&self, queue: &[SpeechClip]) {
        let transcripts = queue.iter().map(|clip| clip.transcript.clone()).collect();
        self.events.lock().unwrap().push(QueueEvent::Changed(transcripts));
    }

    fn on_playback_start(&self, clip: &SpeechClip) {
        self.events
            .lock()
            .unwrap()
            .push(QueueEvent::Started(clip.transcript.clone()));
    }

    fn on_playback_end(&self, clip: &SpeechClip) {
        self.events
            .lock()
            .unwrap()
            .push(QueueEvent::Ended(clip.transcript.clone()));
    }
}

pub struct FakeBattery {
    low: AtomicBool,
    fail: AtomicBool,
}

impl FakeBattery {
    pub fn new(low: bool) -> Arc<Self> {
        Arc::new(Self {
            low: AtomicBool::new(low),
            fail: AtomicBool::new(false),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            low: AtomicBool::new(true),
            fail: AtomicBool::new(true),
        })
    }
}

#[async_trait::async_trait]
impl BatteryStateProvider for FakeBattery {
    async fn is_low_battery(&self) -> ServiceResult<bool> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ServiceError::InvalidRequest("no battery".to_string()));
        }
        Ok(self.low.load(Ordering::SeqCst))
    }
}

/// Engine wired to scripted services and a queue that never starts on its own.
pub struct Harness {
    pub text: Arc<ScriptedText>,
    pub speech: Arc<ScriptedSpeech>,
    pub tracker: Arc<FailureTracker>,
    pub services: ServiceGateway,
    pub queue: AudioPlaybackQueue,
}

impl Harness {
    pub fn new() -> Self {
        let text = ScriptedText::new();
        let speech = ScriptedSpeech::new();
        let tracker = FailureTracker::new(TrackerConfig::default());
        let services = ServiceGateway::new(text.clone(), speech.clone(), tracker.clone());
        let queue = AudioPlaybackQueue::new(RecordingSink::new());
        Self {
            text,
            speech,
            tracker,
            services,
            queue,
        }
    }

    pub fn config(&self) -> CoachConfig {
        CoachConfig {
            autoplay: false,
            ..Default::default()
        }
    }

    pub fn engine(&self) -> CoachingEngine {
        self.engine_with(self.config())
    }

    pub fn engine_with(&self, config: CoachConfig) -> CoachingEngine {
        CoachingEngine::new(config, self.services.clone(), self.queue.clone())
    }

    pub fn transcripts(&self) -> Vec<String> {
        self.queue
            .snapshot()
            .into_iter()
            .map(|clip| clip.transcript)
            .collect()
    }
}
