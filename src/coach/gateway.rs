use std::sync::Arc;

use crate::failure_tracker::FailureTracker;
use crate::services::{
    CoachingTip, CoachingTipRequest, PerformanceReview, PerformanceReviewRequest, ServiceResult,
    SpeechRequest, SpeechSynthesizer, TextGenerator,
};
use crate::types::Language;

/// The two AI services plus the tracker observing them.
///
/// Every call made through the gateway reports its outcome to the shared tracker.
#[derive(Clone)]
pub struct ServiceGateway {
    text: Arc<dyn TextGenerator>,
    speech: Arc<dyn SpeechSynthesizer>,
    tracker: Arc<FailureTracker>,
}

impl ServiceGateway {
    pub fn new(
        text: Arc<dyn TextGenerator>,
        speech: Arc<dyn SpeechSynthesizer>,
        tracker: Arc<FailureTracker>,
    ) -> Self {
        Self {
            text,
            speech,
            tracker,
        }
    }

    pub fn tracker(&self) -> &Arc<FailureTracker> {
        &self.tracker
    }

    pub async fn coaching_tip(&self, request: CoachingTipRequest) -> ServiceResult<CoachingTip> {
        let result = self.text.generate_coaching_tip(request).await;
        self.report(&result);
        result
    }

    pub async fn performance_review(
        &self,
        request: PerformanceReviewRequest,
    ) -> ServiceResult<PerformanceReview> {
        let result = self.text.generate_performance_review(request).await;
        self.report(&result);
        result
    }

    /// Synthesize `text`, returning the encoded audio.
    pub async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        language: Language,
    ) -> ServiceResult<Vec<u8>> {
        let result = self
            .speech
            .text_to_speech(SpeechRequest {
                text: text.to_string(),
                voice_id: voice_id.to_string(),
                language,
            })
            .await
            .map(|speech| speech.audio);
        self.report(&result);
        result
    }

    fn report<T>(&self, result: &ServiceResult<T>) {
        match result {
            Ok(_) => self.tracker.on_success(),
            Err(e) => self.tracker.handle_error(e),
        }
    }
}
