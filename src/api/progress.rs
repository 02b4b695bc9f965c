//! Upload progress as a finite stream of events.
//!
//! An `UploadProgress` yields `Progress(percent)` as the transport reports
//! bytes sent, then exactly one `Finished(result)`, then ends. The upload
//! itself runs while the stream is polled; dropping the stream abandons it.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::channel::mpsc;
use futures::future;
use futures::stream::{self, BoxStream, Stream, StreamExt};

use super::error::ApiError;
use super::transport::ProgressSink;

#[derive(Debug)]
pub enum UploadEvent<T> {
    /// Whole percentage of the body sent so far.
    Progress(u8),
    Finished(Result<T, ApiError>),
}

/// `round(loaded * 100 / total)`, or `None` while the total is unknown.
pub fn percent(loaded: u64, total: u64) -> Option<u8> {
    if total == 0 {
        return None;
    }
    let pct = (loaded as f64 * 100.0 / total as f64).round();
    Some(pct.clamp(0.0, 100.0) as u8)
}

pub struct UploadProgress<T> {
    events: BoxStream<'static, UploadEvent<T>>,
    finished: bool,
}

impl<T: Send + 'static> UploadProgress<T> {
    /// Drive `task`, forwarding whatever it reports through its sink.
    pub(crate) fn spawn<F, Fut>(task: F) -> Self
    where
        F: FnOnce(ProgressSink) -> Fut,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded();

        let progress_tx = tx.clone();
        let sink: ProgressSink = Arc::new(move |loaded, total| {
            if let Some(pct) = percent(loaded, total) {
                let _ = progress_tx.unbounded_send(UploadEvent::Progress(pct));
            }
        });
        let upload = task(sink);

        // The driver yields nothing itself; it pushes the result into the
        // same channel so it always lands after every progress event.
        let driver = stream::once(async move {
            let result = upload.await;
            let _ = tx.unbounded_send(UploadEvent::Finished(result));
        })
        .filter_map(|()| future::ready(None::<UploadEvent<T>>));

        Self {
            events: stream::select(driver, rx).boxed(),
            finished: false,
        }
    }

    /// An already-completed upload (e.g. rejected by local validation).
    pub(crate) fn ready(result: Result<T, ApiError>) -> Self {
        Self {
            events: stream::once(future::ready(UploadEvent::Finished(result))).boxed(),
            finished: false,
        }
    }

    /// Ignore progress and wait for the result.
    pub async fn finish(mut self) -> Result<T, ApiError> {
        while let Some(event) = self.next().await {
            if let UploadEvent::Finished(result) = event {
                return result;
            }
        }
        Err(ApiError::Network("upload ended without a response".into()))
    }
}

impl<T> Stream for UploadProgress<T> {
    type Item = UploadEvent<T>;

    /// Ends right after `Finished`, even if progress senders are still alive.
    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }
        let polled = this.events.poll_next_unpin(cx);
        if let Poll::Ready(Some(UploadEvent::Finished(_))) | Poll::Ready(None) = polled {
            this.finished = true;
        }
        polled
    }
}
