use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use super::{
    truncate_to_word_limit, validate_score, validate_speech_text, CoachingTip, CoachingTipRequest,
    PerformanceReview, PerformanceReviewRequest, ServiceResult, SpeechRequest, SpeechSynthesizer,
    SynthesizedSpeech, TextGenerator, MAX_COACHING_TIP_WORDS, MAX_PERFORMANCE_REVIEW_WORDS,
};
use crate::config::ApiConfig;
use crate::error::ServiceError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TtsResponse {
    audio: String,
    format: String,
    duration_ms: u64,
}

/// HTTP client for the coaching backend, which proxies text generation
/// (`/gemini/*`) and speech synthesis (`/elevenlabs/*`).
pub struct BackendClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ServiceError::InvalidRequest(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_config(config: &ApiConfig) -> ServiceResult<Self> {
        Self::new(
            config.backend_url.as_str(),
            config.api_key().map(str::to_string),
        )
    }

    fn post(&self, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let request = self.client.post(url).header("Accept", "application/json");
        match self.api_key {
            Some(ref key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> ServiceResult<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ServiceError::api(status.as_u16(), error_text));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ServiceError::Decode(format!("Invalid JSON: {}", e)))
    }
}

#[async_trait::async_trait]
impl TextGenerator for BackendClient {
    async fn generate_coaching_tip(
        &self,
        request: CoachingTipRequest,
    ) -> ServiceResult<CoachingTip> {
        validate_score("score", request.score)?;
        log::debug!(
            "Coaching tip request: score={}, weak={:?}, lang={}",
            request.score,
            request.weak_body_parts,
            request.language
        );

        let response = self.post("/gemini/coaching-tip").json(&request).send().await?;
        let mut tip: CoachingTip = Self::read_json(response).await?;
        tip.tip = truncate_to_word_limit(tip.tip.trim(), MAX_COACHING_TIP_WORDS);
        Ok(tip)
    }

    async fn generate_performance_review(
        &self,
        request: PerformanceReviewRequest,
    ) -> ServiceResult<PerformanceReview> {
        validate_score("finalScore", request.final_score)?;
        if request.song_title.trim().is_empty() || request.song_artist.trim().is_empty() {
            return Err(ServiceError::InvalidRequest(
                "song title and artist are required".to_string(),
            ));
        }
        log::debug!(
            "Performance review request: {}, score={}, lang={}",
            request.song_title,
            request.final_score,
            request.language
        );

        let response = self
            .post("/gemini/performance-review")
            .json(&request)
            .send()
            .await?;
        let mut review: PerformanceReview = Self::read_json(response).await?;
        review.review = truncate_to_word_limit(review.review.trim(), MAX_PERFORMANCE_REVIEW_WORDS);
        Ok(review)
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for BackendClient {
    async fn text_to_speech(&self, request: SpeechRequest) -> ServiceResult<SynthesizedSpeech> {
        validate_speech_text(&request.text)?;
        log::debug!(
            "TTS request: {} chars, voice={}, lang={}",
            request.text.len(),
            request.voice_id,
            request.language
        );

        let response = self.post("/elevenlabs/tts").json(&request).send().await?;
        let body: TtsResponse = Self::read_json(response).await?;
        let audio = STANDARD
            .decode(body.audio.as_bytes())
            .map_err(|e| ServiceError::Decode(format!("Invalid base64 audio: {}", e)))?;

        Ok(SynthesizedSpeech {
            audio,
            format: body.format,
            duration_ms: body.duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Language;

    fn client() -> BackendClient {
        // Port 9 (discard) on localhost: nothing should ever be sent in these tests
        BackendClient::new("http://127.0.0.1:9/", None).unwrap()
    }

    #[test]
    fn test_base_url_normalized() {
        assert_eq!(client().base_url, "http://127.0.0.1:9");
    }

    #[tokio::test]
    async fn test_blank_text_rejected_before_sending() {
        let result = client()
            .text_to_speech(SpeechRequest {
                text: "  ".to_string(),
                voice_id: "21m00Tcm4TlvDq8ikWAM".to_string(),
                language: Language::En,
            })
            .await;
        assert!(matches!(result, Err(ServiceError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_out_of_range_score_rejected() {
        let result = client()
            .generate_coaching_tip(CoachingTipRequest {
                score: 140.0,
                weak_body_parts: vec![],
                strong_body_parts: vec![],
                language: Language::En,
            })
            .await;
        assert!(matches!(result, Err(ServiceError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_review_requires_song() {
        let result = client()
            .generate_performance_review(PerformanceReviewRequest {
                song_title: String::new(),
                song_artist: "Artist".to_string(),
                final_score: 80.0,
                previous_best: None,
                strongest_part: "hips".to_string(),
                weakest_part: "arms".to_string(),
                total_frames: 10,
                language: Language::En,
                coverage: None,
            })
            .await;
        assert!(matches!(result, Err(ServiceError::InvalidRequest(_))));
    }

    #[test]
    fn test_tts_response_decoding() {
        let body: TtsResponse =
            serde_json::from_str(r#"{"audio": "AQID", "format": "mp3", "durationMs": 1200}"#)
                .unwrap();
        assert_eq!(STANDARD.decode(body.audio).unwrap(), vec![1, 2, 3]);
        assert_eq!(body.duration_ms, 1200);
    }
}
