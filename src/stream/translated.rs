use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures_util::stream::AbortHandle;
use futures_util::Stream;
use pin_project_lite::pin_project;
use serde::{Deserialize, Serialize};

use crate::protocol::chunk::ParseResult;
use crate::protocol::events::NormalizedEvent;
use crate::stream::transformer::StreamTransformer;

/// What to emit when the upstream ends because the request was aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelPolicy {
    /// Close the text block and emit `Finish` as if the stream ended normally.
    #[default]
    Flush,
    /// End the stream without `TextEnd` or `Finish`.
    SuppressFinish,
}

impl fmt::Display for CancelPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelPolicy::Flush => write!(f, "flush"),
            CancelPolicy::SuppressFinish => write!(f, "suppress_finish"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    NotStarted,
    Streaming,
    Finished,
}

pin_project! {
    /// Adapts a stream of parse results into the normalized event stream.
    ///
    /// Emits `StreamStart` on first poll and the flush events once the
    /// upstream ends. Buffers at most the events derived from one item.
    pub struct TranslatedStream<S> {
        #[pin]
        upstream: S,
        transformer: StreamTransformer,
        pending: VecDeque<NormalizedEvent>,
        scratch: Vec<NormalizedEvent>,
        phase: Phase,
        cancel_policy: CancelPolicy,
        abort_handle: Option<AbortHandle>,
    }
}

impl<S> TranslatedStream<S>
where
    S: Stream<Item = ParseResult>,
{
    #[must_use]
    pub fn new(upstream: S) -> Self {
        Self {
            upstream,
            transformer: StreamTransformer::new(),
            pending: VecDeque::with_capacity(4),
            scratch: Vec::with_capacity(4),
            phase: Phase::NotStarted,
            cancel_policy: CancelPolicy::default(),
            abort_handle: None,
        }
    }

    /// Attach the handle whose abort ends `upstream`, and the policy that
    /// applies when it does.
    #[must_use]
    pub fn with_cancellation(mut self, handle: AbortHandle, policy: CancelPolicy) -> Self {
        self.abort_handle = Some(handle);
        self.cancel_policy = policy;
        self
    }

    fn aborted(abort_handle: Option<&AbortHandle>) -> bool {
        abort_handle.is_some_and(AbortHandle::is_aborted)
    }
}

impl<S> Stream for TranslatedStream<S>
where
    S: Stream<Item = ParseResult>,
{
    type Item = NormalizedEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            if let Some(event) = this.pending.pop_front() {
                return Poll::Ready(Some(event));
            }

            match *this.phase {
                Phase::NotStarted => {
                    this.transformer.start_into(this.scratch);
                    *this.phase = Phase::Streaming;
                }
                Phase::Streaming => match ready!(this.upstream.as_mut().poll_next(cx)) {
                    Some(item) => this.transformer.transform_into(item, this.scratch),
                    None => {
                        *this.phase = Phase::Finished;
                        let aborted = Self::aborted(this.abort_handle.as_ref());
                        if aborted && *this.cancel_policy == CancelPolicy::SuppressFinish {
                            tracing::debug!("agent stream aborted, suppressing finish");
                        } else {
                            if aborted {
                                tracing::debug!("agent stream aborted, flushing");
                            }
                            this.transformer.flush_into(this.scratch);
                        }
                    }
                },
                Phase::Finished => return Poll::Ready(None),
            }

            this.pending.extend(this.scratch.drain(..));
        }
    }
}
