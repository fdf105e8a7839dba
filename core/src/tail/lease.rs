//! Exclusive ownership of a display sink.
//!
//! A view holds the lease for as long as its task runs; the lease is dropped
//! before the task acknowledges its stop, so a successor can never write while
//! the previous view is still draining.
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Error, Debug)]
#[error("display sink is leased to another view")]
pub struct SinkBusy;

pub struct SinkSlot<W> {
    inner: Arc<Mutex<W>>,
}

impl<W> Clone for SinkSlot<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W> SinkSlot<W> {
    pub fn new(sink: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(sink)),
        }
    }

    /// Waits until the current holder releases the sink.
    pub async fn acquire(&self) -> SinkLease<W> {
        SinkLease {
            guard: Arc::clone(&self.inner).lock_owned().await,
        }
    }

    pub fn try_acquire(&self) -> Result<SinkLease<W>, SinkBusy> {
        Arc::clone(&self.inner)
            .try_lock_owned()
            .map(|guard| SinkLease { guard })
            .map_err(|_| SinkBusy)
    }

    pub fn is_leased(&self) -> bool {
        self.inner.try_lock().is_err()
    }
}

pub struct SinkLease<W> {
    guard: OwnedMutexGuard<W>,
}

impl<W: fmt::Debug> fmt::Debug for SinkLease<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SinkLease").field(&*self.guard).finish()
    }
}

impl<W> Deref for SinkLease<W> {
    type Target = W;

    fn deref(&self) -> &W {
        &self.guard
    }
}

impl<W> DerefMut for SinkLease<W> {
    fn deref_mut(&mut self) -> &mut W {
        &mut self.guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn only_one_lease_at_a_time() {
        let slot = SinkSlot::new(Vec::<u8>::new());
        let mut lease = slot.acquire().await;
        lease.extend_from_slice(b"first");

        assert!(slot.is_leased());
        assert!(slot.try_acquire().is_err());

        drop(lease);
        assert!(!slot.is_leased());
        let lease = slot.try_acquire().unwrap();
        assert_eq!(&lease[..], b"first");
    }

    #[test]
    fn acquire_waits_for_release() {
        let slot = SinkSlot::new(Vec::<u8>::new());
        let lease = tokio_test::block_on(slot.acquire());

        let mut waiter = tokio_test::task::spawn(slot.acquire());
        tokio_test::assert_pending!(waiter.poll());

        drop(lease);
        assert!(waiter.is_woken());
        let mut lease = tokio_test::assert_ready!(waiter.poll());
        lease.extend_from_slice(b"second");
        drop(lease);
        drop(waiter);

        assert!(!slot.is_leased());
        assert_eq!(&tokio_test::block_on(slot.acquire())[..], b"second");
    }
}
