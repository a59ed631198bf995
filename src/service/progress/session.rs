use std::time::Duration;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};

use super::WatchedSet;
use crate::api::CourseBackend;
use crate::model::{ContentId, ProgressSample};
use crate::Located;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum PlaybackEvent {
    TimeUpdate(ProgressSample),
    Ended,
}

/// Handle to the task that owns one video's debounce timer.
#[derive(Debug)]
pub(super) struct PlaybackSession {
    content: ContentId,
    tx: UnboundedSender<PlaybackEvent>,
    handle: JoinHandle<()>,
}

impl PlaybackSession {
    pub(super) fn spawn<B>(
        content: ContentId, backend: B, watched: WatchedSet, debounce: Duration,
    ) -> Self
    where
        B: CourseBackend + Clone + 'static,
    {
        let (tx, rx) = unbounded_channel();
        let handle = tokio::spawn(run(content, backend, watched, debounce, rx));
        Self {
            content,
            tx,
            handle,
        }
    }

    pub(super) fn send(&self, event: PlaybackEvent) -> Result<(), PlaybackEvent> {
        self.tx.send(event).map_err(|error| error.0)
    }

    /// Closing the channel ends the loop and with it the armed timer.
    pub(super) fn stop(self) {
        drop(self.tx);
    }

    pub(super) async fn shutdown(self) {
        drop(self.tx);
        if let Err(error) = self.handle.await {
            tracing::warn!(content.id = %self.content, %error, "playback session did not end cleanly");
        }
    }
}

async fn run<B>(
    content: ContentId, backend: B, watched: WatchedSet, debounce: Duration,
    mut events: UnboundedReceiver<PlaybackEvent>,
) where
    B: CourseBackend + Clone + 'static,
{
    let mut pending: Option<ProgressSample> = None;
    let timer = sleep(debounce);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(PlaybackEvent::TimeUpdate(sample)) => {
                    pending = Some(sample);
                    timer.as_mut().reset(Instant::now() + debounce);
                }
                Some(PlaybackEvent::Ended) => {
                    tokio::spawn(complete(content, backend.clone(), watched.clone()));
                }
                None => break,
            },

            () = &mut timer, if pending.is_some() => {
                if let Some(sample) = pending.take() {
                    tokio::spawn(save(content, sample, backend.clone(), watched.clone()));
                }
            }
        }
    }

    if let Some(sample) = pending {
        tracing::debug!(content.id = %content, ?sample, "discarded unsaved progress");
    }
}

async fn save<B: CourseBackend>(
    content: ContentId, sample: ProgressSample, backend: B, watched: WatchedSet,
) {
    tracing::debug!(content.id = %content, ?sample, "saving progress");

    match backend.save_progress(content, sample).await {
        Ok(progress) if progress.is_completed => {
            if watched.insert(content) {
                tracing::info!(content.id = %content, "content reached completion");
            }
        }
        Ok(_) => {}
        Err(error) => {
            tracing::warn!(content.id = %content, %error, location = %error.location(), "could not save progress");
        }
    }
}

async fn complete<B: CourseBackend>(content: ContentId, backend: B, watched: WatchedSet) {
    tracing::debug!(content.id = %content, "video ended, marking completed");

    match backend.mark_completed(content, true).await {
        Ok(_) => {
            watched.insert(content);
        }
        Err(error) => {
            tracing::warn!(content.id = %content, %error, location = %error.location(), "could not mark content completed");
        }
    }
}
