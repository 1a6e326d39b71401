//! Cancellable lazy listings.
//!
//! The governance service pages its list endpoints. A [`Listing`] exposes
//! such an endpoint as a pull-based sequence of `ConnectorResult<T>`: pages
//! are only fetched when the consumer asks for the next item, and the whole
//! sequence can be cancelled through a [`CancellationToken`] or bounded by a
//! deadline. Dropping a listing drops the underlying stream, so no fetch
//! outlives the reconciliation step that created it.

use std::future::Future;
use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{ConnectorError, ConnectorResult};

/// Request for one page of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Opaque cursor returned by the previous page. `None` for the first page.
    pub cursor: Option<String>,
    /// Maximum number of items to return.
    pub limit: usize,
}

impl PageRequest {
    /// Request the first page.
    #[must_use]
    pub fn first(limit: usize) -> Self {
        Self {
            cursor: None,
            limit,
        }
    }

    fn after(&self, cursor: String) -> Self {
        Self {
            cursor: Some(cursor),
            limit: self.limit,
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Cursor for the next page; `None` on the last page.
    pub next_cursor: Option<String>,
}

/// A cancellable, lazily evaluated sequence of remote items.
pub struct Listing<T> {
    stream: BoxStream<'static, ConnectorResult<T>>,
    cancel: CancellationToken,
    deadline: Option<Instant>,
    deadline_ms: u64,
    finished: bool,
}

impl<T: Send + 'static> Listing<T> {
    /// Wrap an arbitrary stream.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: futures::Stream<Item = ConnectorResult<T>> + Send + 'static,
    {
        Self {
            stream: stream.boxed(),
            cancel: CancellationToken::new(),
            deadline: None,
            deadline_ms: 0,
            finished: false,
        }
    }

    /// A listing over already materialized items.
    #[must_use]
    pub fn from_items(items: Vec<T>) -> Self {
        Self::from_stream(stream::iter(items.into_iter().map(Ok)))
    }

    /// A listing replaying a fixed sequence of results, errors included.
    #[must_use]
    pub fn from_results(results: Vec<ConnectorResult<T>>) -> Self {
        Self::from_stream(stream::iter(results))
    }

    /// A listing that fetches pages on demand through `fetch`.
    ///
    /// Fetching stops after the first page without a cursor or the first error.
    pub fn paginated<F, Fut>(page_size: usize, fetch: F) -> Self
    where
        F: FnMut(PageRequest) -> Fut + Send + 'static,
        Fut: Future<Output = ConnectorResult<Page<T>>> + Send + 'static,
    {
        let pages = stream::unfold(
            (fetch, Some(PageRequest::first(page_size))),
            |(mut fetch, request)| async move {
                let Some(request) = request else {
                    return None;
                };
                match fetch(request.clone()).await {
                    Ok(page) => {
                        let next = page.next_cursor.map(|cursor| request.after(cursor));
                        Some((Ok(page.items), (fetch, next)))
                    }
                    Err(e) => Some((Err(e), (fetch, None))),
                }
            },
        );

        let items = pages.flat_map(|page: ConnectorResult<Vec<T>>| match page {
            Ok(items) => stream::iter(items.into_iter().map(Ok::<T, ConnectorError>)).left_stream(),
            Err(e) => stream::once(futures::future::ready(Err(e))).right_stream(),
        });

        Self::from_stream(items)
    }

    /// Bind this listing to an externally owned cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Fail the listing if it is not drained within `timeout` from now.
    #[must_use]
    pub fn with_deadline(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self.deadline_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Token that cancels this listing.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the listing. The next call to [`Listing::next`] yields `Cancelled`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Pull the next item.
    ///
    /// After an error (including cancellation and deadline expiry) the
    /// underlying stream is released and every further call returns `None`.
    pub async fn next(&mut self) -> Option<ConnectorResult<T>> {
        if self.finished {
            return None;
        }

        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        let item = tokio::select! {
            biased;
            () = self.cancel.cancelled() => Some(Err(ConnectorError::Cancelled)),
            () = expired => Some(Err(ConnectorError::DeadlineExceeded {
                deadline_ms: self.deadline_ms,
            })),
            item = self.stream.next() => item,
        };

        if !matches!(item, Some(Ok(_))) {
            self.finish();
        }
        item
    }

    /// Drain the listing, failing on the first error.
    pub async fn collect_all(mut self) -> ConnectorResult<Vec<T>> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await {
            items.push(item?);
        }
        Ok(items)
    }

    fn finish(&mut self) {
        self.finished = true;
        self.stream = stream::empty().boxed();
    }
}

impl<T> std::fmt::Debug for Listing<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listing")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("deadline_ms", &self.deadline_ms)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
