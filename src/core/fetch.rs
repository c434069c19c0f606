//! Cancelable fetch plumbing shared by the thumbnail and detection feeds.
//!
//! Every consumer keeps at most one authoritative request in flight. Issuing a new one
//! aborts the previous, and a generation ticket rejects any response that still arrives.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::future::{abortable, AbortHandle, Abortable, Aborted, BoxFuture};
use futures_util::FutureExt;

use crate::error::FetchError;

/// A fetch in progress that can be cancelled from another owner.
pub struct FetchHandle<T> {
    future: Abortable<BoxFuture<'static, Result<T, FetchError>>>,
    abort: AbortHandle,
}

impl<T: Send + 'static> FetchHandle<T> {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let (future, abort) = abortable(future.boxed());
        Self { future, abort }
    }

    /// A handle that resolves immediately, for sources with nothing to wait on.
    pub fn ready(result: Result<T, FetchError>) -> Self {
        Self::new(async move { result })
    }

    /// Resolve the fetch. A cancelled fetch resolves to [`FetchError::Cancelled`].
    pub async fn join(self) -> Result<T, FetchError> {
        match self.future.await {
            Ok(result) => result,
            Err(Aborted) => Err(FetchError::Cancelled),
        }
    }
}

impl<T> FetchHandle<T> {
    pub fn cancel(&self) {
        self.abort.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.abort.is_aborted()
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }
}

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Identifies one issued request; only the latest ticket may apply its result.
/// Tickets are unique across all slots in the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestTicket(u64);

/// Single-slot tracker for the authoritative in-flight request of one consumer.
#[derive(Debug, Default)]
pub struct LatestRequest {
    in_flight: Option<(u64, AbortHandle)>,
}

impl LatestRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel whatever is in flight and register `handle` as the new authority.
    pub fn issue<T>(&mut self, handle: &FetchHandle<T>) -> RequestTicket {
        self.cancel();
        let generation = NEXT_GENERATION.fetch_add(1, Ordering::Relaxed);
        self.in_flight = Some((generation, handle.abort_handle()));
        RequestTicket(generation)
    }

    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        matches!(self.in_flight, Some((generation, _)) if generation == ticket.0)
    }

    /// Mark `ticket` as resolved. Returns false for stale tickets, whose results must be dropped.
    pub fn finish(&mut self, ticket: RequestTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.in_flight = None;
        true
    }

    pub fn cancel(&mut self) {
        if let Some((generation, abort)) = self.in_flight.take() {
            tracing::debug!(generation, "cancelling in-flight request");
            abort.abort();
        }
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancelled_handle_resolves_to_cancelled() {
        let handle: FetchHandle<u32> = FetchHandle::new(futures_util::future::pending());
        handle.cancel();
        assert!(handle.is_cancelled());
        assert_eq!(handle.join().await, Err(FetchError::Cancelled));
    }

    #[tokio::test]
    async fn test_ready_handle_resolves() {
        let handle = FetchHandle::ready(Ok(7_u32));
        assert_eq!(handle.join().await, Ok(7));
    }

    #[test]
    fn test_issuing_cancels_previous_and_stales_its_ticket() {
        let mut slot = LatestRequest::new();
        let first: FetchHandle<u32> = FetchHandle::new(futures_util::future::pending());
        let ticket_a = slot.issue(&first);
        let second: FetchHandle<u32> = FetchHandle::new(futures_util::future::pending());
        let ticket_b = slot.issue(&second);

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert!(!slot.finish(ticket_a));
        assert!(slot.finish(ticket_b));
        assert!(!slot.in_flight());
    }

    #[test]
    fn test_tickets_do_not_collide_across_slots() {
        let mut old_slot = LatestRequest::new();
        let mut new_slot = LatestRequest::new();
        let old: FetchHandle<u32> = FetchHandle::new(futures_util::future::pending());
        let old_ticket = old_slot.issue(&old);
        let new: FetchHandle<u32> = FetchHandle::new(futures_util::future::pending());
        let new_ticket = new_slot.issue(&new);

        assert_ne!(old_ticket, new_ticket);
        assert!(!new_slot.finish(old_ticket));
        assert!(new_slot.in_flight());
    }

    #[test]
    fn test_cancel_clears_slot() {
        let mut slot = LatestRequest::new();
        let handle: FetchHandle<u32> = FetchHandle::new(futures_util::future::pending());
        let ticket = slot.issue(&handle);
        slot.cancel();
        assert!(handle.is_cancelled());
        assert!(!slot.is_current(ticket));
    }
}
