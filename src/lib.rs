pub mod audio_sink;
pub mod coach;
pub mod config;
pub mod error;
pub mod failure_tracker;
pub mod playback;
pub mod services;
pub mod types;

pub use coach::{CoachingEngine, FeedbackOutcome, ServiceGateway, SessionReviewer};
pub use error::{CoachError, Result};
pub use failure_tracker::{FailureTracker, ServiceStatus};
pub use playback::AudioPlaybackQueue;
