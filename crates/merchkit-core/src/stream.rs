// ── Reactive change stream ──
//
// Stream adapter over the controller's watch channel, for embedders
// that prefer `StreamExt` combinators to polling `subscribe()`.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::controller::ControlSnapshot;

/// `Stream` of [`ControlSnapshot`]s, yielding once per state, draft, or
/// error-list change. The first poll yields the current snapshot.
pub struct ControlChanges {
    inner: WatchStream<ControlSnapshot>,
}

impl ControlChanges {
    pub(crate) fn new(receiver: watch::Receiver<ControlSnapshot>) -> Self {
        Self {
            inner: WatchStream::new(receiver),
        }
    }
}

impl Stream for ControlChanges {
    type Item = ControlSnapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
