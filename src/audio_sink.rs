use crate::error::AudioError;

/// Playback primitive used by the speech queue
#[async_trait::async_trait]
pub trait AudioSink: Send + Sync {
    /// Decode and play encoded audio (MP3/WAV), resolving once playback has
    /// finished or was stopped.
    async fn play(&self, audio_data: &[u8]) -> Result<(), AudioError>;

    /// Stop audio playback and drop anything still buffered
    async fn stop(&self) -> Result<(), AudioError>;
}

/// Sink that accepts everything and plays nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait::async_trait]
impl AudioSink for NullSink {
    async fn play(&self, audio_data: &[u8]) -> Result<(), AudioError> {
        log::debug!("NullSink: discarding {} bytes", audio_data.len());
        Ok(())
    }

    async fn stop(&self) -> Result<(), AudioError> {
        Ok(())
    }
}

#[cfg(feature = "playback")]
pub use self::device::RodioSink;

#[cfg(feature = "playback")]
mod device {
    use super::AudioSink;
    use crate::error::AudioError;
    use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
    use std::io::Cursor;
    use std::sync::mpsc::{channel, RecvTimeoutError, Sender};
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;
    use tokio::sync::oneshot;

    const POLL_INTERVAL: Duration = Duration::from_millis(20);

    enum AudioCommand {
        Play {
            audio_data: Vec<u8>,
            done: oneshot::Sender<Result<(), AudioError>>,
        },
        Stop,
        Shutdown,
    }

    /// A stopped sink cannot be reused; keep the old one only if a new one fails.
    fn fresh_sink(handle: &OutputStreamHandle, stopped: Sink) -> Sink {
        match Sink::try_new(handle) {
            Ok(fresh) => fresh,
            Err(e) => {
                log::error!("AudioSink: Failed to recreate sink: {}", e);
                stopped
            }
        }
    }

    /// Default output device sink.
    ///
    /// The rodio output stream is not `Send`, so it lives on a dedicated audio
    /// thread driven by commands.
    pub struct RodioSink {
        audio_sender: Sender<AudioCommand>,
        audio_thread: Mutex<Option<thread::JoinHandle<()>>>,
    }

    impl RodioSink {
        pub fn new() -> Result<Self, AudioError> {
            log::debug!("AudioSink: Creating new RodioSink");
            let (audio_sender, audio_receiver) = channel::<AudioCommand>();
            let (ready_tx, ready_rx) = channel::<Result<(), AudioError>>();

            let audio_thread = thread::spawn(move || {
                let (_stream, handle) = match OutputStream::try_default() {
                    Ok(output) => output,
                    Err(e) => {
                        let _ = ready_tx.send(Err(AudioError::Device(e.to_string())));
                        return;
                    }
                };
                let mut sink = match Sink::try_new(&handle) {
                    Ok(sink) => sink,
                    Err(e) => {
                        let _ = ready_tx.send(Err(AudioError::Device(e.to_string())));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                log::debug!("AudioSink: Audio thread started");

                let mut in_flight: Option<oneshot::Sender<Result<(), AudioError>>> = None;

                loop {
                    match audio_receiver.recv_timeout(POLL_INTERVAL) {
                        Ok(AudioCommand::Play { audio_data, done }) => {
                            log::debug!("AudioSink: Received {} bytes of audio", audio_data.len());
                            match rodio::Decoder::new(Cursor::new(audio_data)) {
                                Ok(source) => {
                                    // A new clip replaces whatever is still audible
                                    if let Some(previous) = in_flight.take() {
                                        sink.stop();
                                        sink = fresh_sink(&handle, sink);
                                        let _ = previous.send(Err(AudioError::Stopped));
                                    }
                                    sink.append(source.convert_samples::<f32>());
                                    in_flight = Some(done);
                                }
                                Err(e) => {
                                    let _ = done.send(Err(AudioError::Decode(e.to_string())));
                                }
                            }
                        }
                        Ok(AudioCommand::Stop) => {
                            log::debug!("AudioSink: Received stop command");
                            sink.stop();
                            sink = fresh_sink(&handle, sink);
                            if let Some(done) = in_flight.take() {
                                let _ = done.send(Err(AudioError::Stopped));
                            }
                        }
                        Ok(AudioCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {}
                    }

                    if in_flight.is_some() && sink.empty() {
                        if let Some(done) = in_flight.take() {
                            let _ = done.send(Ok(()));
                        }
                    }
                }

                log::debug!("AudioSink: Audio thread exiting");
            });

            match ready_rx.recv() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    let _ = audio_thread.join();
                    return Err(e);
                }
                Err(e) => return Err(AudioError::Device(e.to_string())),
            }

            log::debug!("AudioSink: Successfully created RodioSink");
            Ok(Self {
                audio_sender,
                audio_thread: Mutex::new(Some(audio_thread)),
            })
        }
    }

    impl Drop for RodioSink {
        fn drop(&mut self) {
            if let Err(e) = self.audio_sender.send(AudioCommand::Shutdown) {
                log::error!("Failed to send shutdown command: {}", e);
            }

            let handle = match self.audio_thread.get_mut() {
                Ok(slot) => slot.take(),
                Err(poisoned) => poisoned.into_inner().take(),
            };
            if let Some(thread) = handle {
                if let Err(e) = thread.join() {
                    log::error!("Failed to join audio thread: {:?}", e);
                }
            }
        }
    }

    #[async_trait::async_trait]
    impl AudioSink for RodioSink {
        async fn play(&self, audio_data: &[u8]) -> Result<(), AudioError> {
            let (done, finished) = oneshot::channel();
            self.audio_sender
                .send(AudioCommand::Play {
                    audio_data: audio_data.to_vec(),
                    done,
                })
                .map_err(|e| AudioError::Device(e.to_string()))?;

            finished
                .await
                .map_err(|_| AudioError::Device("audio thread exited".to_string()))?
        }

        async fn stop(&self) -> Result<(), AudioError> {
            self.audio_sender
                .send(AudioCommand::Stop)
                .map_err(|e| AudioError::Device(e.to_string()))
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_sink_accepts_audio() {
        let sink = NullSink;
        assert!(sink.play(&[1, 2, 3]).await.is_ok());
        assert!(sink.stop().await.is_ok());
    }
}
