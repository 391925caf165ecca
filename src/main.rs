use anyhow::Context;
use clap::Parser;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;
use voice_coach::{
    audio_sink::{AudioSink, NullSink},
    coach::{BodyPartMatch, FrameScore, SessionSummary},
    config::{load_config, CoachConfig, TrackerConfig},
    playback::PlaybackListener,
    services::BackendClient,
    types::{Language, PoseObservation, SpeechClip},
    AudioPlaybackQueue, CoachingEngine, FailureTracker, FeedbackOutcome, ServiceGateway,
    SessionReviewer,
};

/// Replay recorded pose observations through the voice coach
#[derive(Parser, Debug)]
#[command(name = "voice-coach-sim", version, about)]
struct Args {
    /// JSON lines file with one pose observation per line
    #[arg(long)]
    observations: PathBuf,

    /// Feedback language (en, es, de, ru)
    #[arg(long)]
    language: Option<Language>,

    /// Minimum milliseconds between spoken feedback
    #[arg(long)]
    cooldown_ms: Option<u64>,

    /// Decide feedback but play nothing
    #[arg(long)]
    mute: bool,

    /// Song title for an end-of-session review
    #[arg(long, requires = "review_artist")]
    review_song: Option<String>,

    #[arg(long, requires = "review_song")]
    review_artist: Option<String>,
}

struct TranscriptLogger;

impl PlaybackListener for TranscriptLogger {
    fn on_playback_start(&self, clip: &SpeechClip) {
        if clip.is_text_only() {
            println!("💬 {}", clip.transcript);
        } else {
            println!("🔊 [{}] {}", clip.priority, clip.transcript);
        }
    }
}

fn output_sink() -> Arc<dyn AudioSink> {
    #[cfg(feature = "playback")]
    {
        match voice_coach::audio_sink::RodioSink::new() {
            Ok(sink) => return Arc::new(sink),
            Err(e) => log::warn!("⚠️ No audio output ({}), continuing silently", e),
        }
    }
    Arc::new(NullSink)
}

/// Frame records for the reviewer: weak parts count as unmatched, strong parts as matched.
fn frames_from(observations: &[PoseObservation]) -> Vec<FrameScore> {
    observations
        .iter()
        .map(|observation| {
            let weak = observation.weak_body_parts.iter().map(|part| BodyPartMatch {
                part: part.clone(),
                matched: false,
            });
            let strong = observation.strong_body_parts.iter().map(|part| BodyPartMatch {
                part: part.clone(),
                matched: true,
            });
            FrameScore {
                timestamp_ms: observation.timestamp_ms,
                score: observation.score,
                body_parts: weak.chain(strong).collect(),
            }
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    log::info!("🚀 Initializing voice-coach-sim");

    let file = File::open(&args.observations)
        .with_context(|| format!("opening {}", args.observations.display()))?;
    let observations = PoseObservation::read_jsonl(BufReader::new(file))?;
    log::info!("Loaded {} observations", observations.len());

    let mut config = CoachConfig::from_env()?;
    if let Some(language) = args.language {
        config.language = language;
    }
    if let Some(cooldown_ms) = args.cooldown_ms {
        config.cooldown_ms = cooldown_ms;
    }

    let api_config = load_config()?;
    let backend = Arc::new(BackendClient::from_config(&api_config)?);
    let tracker = FailureTracker::new(TrackerConfig::default());
    let services = ServiceGateway::new(backend.clone(), backend, tracker.clone());

    let queue = AudioPlaybackQueue::new(output_sink());
    queue.set_muted(args.mute);
    queue.add_listener(Arc::new(TranscriptLogger));

    let mut tracker_events = tracker.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = tracker_events.recv().await {
            if let voice_coach::failure_tracker::TrackerEvent::Notice(notice) = event {
                println!("ℹ️  {}", notice.message());
            }
        }
    });

    let engine = CoachingEngine::new(config.clone(), services.clone(), queue.clone());
    for observation in &observations {
        let outcome = engine.on_pose_observation(observation).await;
        if let FeedbackOutcome::Dispatched(feedback) | FeedbackOutcome::Dropped(feedback) = outcome
        {
            log::info!(
                "{}ms score {:.1}: {:?} ({})",
                observation.timestamp_ms,
                observation.score,
                outcome,
                feedback
            );
        }
    }

    if let (Some(song_title), Some(song_artist)) = (args.review_song, args.review_artist) {
        let final_score = if observations.is_empty() {
            0.0
        } else {
            observations.iter().map(|o| o.score).sum::<f64>() / observations.len() as f64
        };
        let summary = SessionSummary {
            song_title,
            song_artist,
            final_score,
            frames: frames_from(&observations),
            ..Default::default()
        };
        let reviewer = SessionReviewer::new(&config, services, queue.clone());
        let review = reviewer.review_session(&summary).await;
        if review.is_empty() {
            log::warn!("⚠️ No session review available");
        }
    }

    queue.wait_until_idle().await;
    log::info!("✅ Done");
    Ok(())
}
