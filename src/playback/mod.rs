//! Prioritized speech playback.
//!
//! The queue serializes clip playback on a single loop. A high-priority clip
//! evicts every queued clip of a lower tier; equal tiers play in arrival order.
//! The clip currently playing is never interrupted by an enqueue.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tokio::sync::Notify;

use crate::audio_sink::AudioSink;
use crate::config::QueueConfig;
use crate::error::AudioError;
use crate::types::{PriorityTier, SpeechClip};

/// Background music whose volume is lowered while speech plays.
pub trait BackgroundMusicChannel: Send + Sync {
    /// Current volume in 0..=1
    fn volume(&self) -> f32;
    fn set_volume(&self, volume: f32);
}

/// Receives queue notifications. All methods default to no-ops.
pub trait PlaybackListener: Send + Sync {
    /// Ordered snapshot after every queue mutation
    fn on_queue_change(&self, _queue: &[SpeechClip]) {}
    fn on_playback_start(&self, _clip: &SpeechClip) {}
    fn on_playback_end(&self, _clip: &SpeechClip) {}
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<SpeechClip>,
    playing: bool,
    muted: bool,
    /// Volume to restore once the current clip ends
    ducked_from: Option<f32>,
}

struct Inner {
    sink: Arc<dyn AudioSink>,
    config: QueueConfig,
    state: Mutex<QueueState>,
    music: RwLock<Option<Arc<dyn BackgroundMusicChannel>>>,
    listeners: RwLock<Vec<Arc<dyn PlaybackListener>>>,
    idle: Notify,
}

/// Single-consumer speech clip queue. Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct AudioPlaybackQueue {
    inner: Arc<Inner>,
}

impl AudioPlaybackQueue {
    pub fn new(sink: Arc<dyn AudioSink>) -> Self {
        Self::with_config(sink, QueueConfig::default())
    }

    pub fn with_config(sink: Arc<dyn AudioSink>, config: QueueConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                sink,
                config,
                state: Mutex::new(QueueState::default()),
                music: RwLock::new(None),
                listeners: RwLock::new(Vec::new()),
                idle: Notify::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_listener(&self, listener: Arc<dyn PlaybackListener>) {
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    pub fn set_background_channel(&self, channel: Option<Arc<dyn BackgroundMusicChannel>>) {
        *self
            .inner
            .music
            .write()
            .unwrap_or_else(PoisonError::into_inner) = channel;
    }

    /// Queue a clip, optionally starting the playback loop on the current runtime.
    pub fn enqueue(&self, clip: SpeechClip, auto_start: bool) {
        let snapshot = {
            let mut state = self.state();
            if clip.priority == PriorityTier::High {
                let before = state.pending.len();
                state.pending.retain(|queued| queued.priority == PriorityTier::High);
                let evicted = before - state.pending.len();
                if evicted > 0 {
                    log::debug!("High priority clip {} evicted {} queued clips", clip.id, evicted);
                }
            }
            log::debug!("Enqueued {} clip {}", clip.priority, clip.id);
            state.pending.push_back(clip);
            state.pending.iter().cloned().collect::<Vec<_>>()
        };
        self.notify(|listener| listener.on_queue_change(&snapshot));

        if auto_start && !self.is_playing() {
            self.spawn_playback();
        }
    }

    fn spawn_playback(&self) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let queue = self.clone();
                handle.spawn(async move { queue.play().await });
            }
            Err(_) => log::warn!("No async runtime available, clip stays queued until play()"),
        }
    }

    /// Drain the queue, playing clips one at a time. Returns immediately if a
    /// playback loop is already running.
    pub async fn play(&self) {
        {
            let mut state = self.state();
            if state.playing {
                return;
            }
            state.playing = true;
        }
        let mut guard = PlaybackGuard {
            queue: self,
            drained: false,
        };

        loop {
            let (clip, muted, snapshot) = {
                let mut state = self.state();
                match state.pending.pop_front() {
                    Some(clip) => {
                        let snapshot: Vec<SpeechClip> = state.pending.iter().cloned().collect();
                        (clip, state.muted, snapshot)
                    }
                    None => {
                        // Cleared under the lock so a concurrent enqueue restarts the loop
                        state.playing = false;
                        guard.drained = true;
                        break;
                    }
                }
            };
            self.notify(|listener| listener.on_queue_change(&snapshot));

            if muted {
                log::debug!("Muted, skipping clip {}", clip.id);
                self.notify(|listener| listener.on_playback_end(&clip));
                continue;
            }

            self.duck();
            self.notify(|listener| listener.on_playback_start(&clip));

            if !clip.is_text_only() {
                match self.inner.sink.play(&clip.audio).await {
                    Ok(()) => {}
                    Err(AudioError::Stopped) => log::debug!("Clip {} stopped", clip.id),
                    Err(e) => log::warn!("⚠️ Playback of clip {} failed: {}", clip.id, e),
                }
            }

            self.notify(|listener| listener.on_playback_end(&clip));
            self.restore_volume();
        }
    }

    /// Wait until the playback loop has drained the queue.
    pub async fn wait_until_idle(&self) {
        loop {
            let idle = self.inner.idle.notified();
            {
                let state = self.state();
                if !state.playing && state.pending.is_empty() {
                    return;
                }
            }
            idle.await;
        }
    }

    /// Drop every pending clip. A clip already playing keeps playing.
    pub fn clear_queue(&self) {
        {
            let mut state = self.state();
            if state.pending.is_empty() {
                return;
            }
            state.pending.clear();
        }
        self.notify(|listener| listener.on_queue_change(&[]));
    }

    /// Stop the clip in flight, drop pending clips and restore background volume.
    pub async fn cancel_current(&self) {
        if let Err(e) = self.inner.sink.stop().await {
            log::warn!("⚠️ Failed to stop playback: {}", e);
        }
        self.clear_queue();
        self.restore_volume();
    }

    pub fn len(&self) -> usize {
        self.state().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().pending.is_empty()
    }

    pub fn peek_next(&self) -> Option<SpeechClip> {
        self.state().pending.front().cloned()
    }

    pub fn snapshot(&self) -> Vec<SpeechClip> {
        self.state().pending.iter().cloned().collect()
    }

    pub fn is_playing(&self) -> bool {
        self.state().playing
    }

    pub fn is_muted(&self) -> bool {
        self.state().muted
    }

    pub fn set_muted(&self, muted: bool) {
        self.state().muted = muted;
    }

    fn music(&self) -> Option<Arc<dyn BackgroundMusicChannel>> {
        self.inner
            .music
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn duck(&self) {
        if let Some(channel) = self.music() {
            let original = channel.volume();
            self.state().ducked_from = Some(original);
            channel.set_volume(self.inner.config.ducking_volume);
        }
    }

    fn restore_volume(&self) {
        let original = self.state().ducked_from.take();
        if let (Some(volume), Some(channel)) = (original, self.music()) {
            channel.set_volume(volume);
        }
    }

    fn notify<F>(&self, event: F)
    where
        F: Fn(&dyn PlaybackListener),
    {
        let listeners = self
            .inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            event(listener.as_ref());
        }
    }
}

/// Releases the playback loop when `play()` returns, is dropped mid-clip or unwinds.
struct PlaybackGuard<'a> {
    queue: &'a AudioPlaybackQueue,
    /// Set once the loop found the queue empty and cleared `playing` itself
    drained: bool,
}

impl Drop for PlaybackGuard<'_> {
    fn drop(&mut self) {
        if !self.drained {
            log::debug!("Playback loop interrupted, releasing queue");
            self.queue.state().playing = false;
            self.queue.restore_volume();
        }
        self.queue.inner.idle.notify_waiters();
    }
}
