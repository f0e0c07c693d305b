// Replay hooks for inbound handshake nonces.
//
// The base protocol keeps no nonce history, so `NoReplayGuard` is the
// default. `NonceHistory` is an opt-in bounded cache.

use std::collections::{HashSet, VecDeque};
use std::fmt;

use parking_lot::Mutex;

use crate::error::{Result, TetherTrustError};
use crate::freshness::Nonce;

/// Decides whether an authenticated request nonce has been seen before.
pub trait ReplayGuard: Send + Sync + fmt::Debug {
    /// Record `nonce`, failing with [`TetherTrustError::Freshness`] if it is a repeat.
    fn check_and_record(&self, nonce: &Nonce) -> Result<()>;
}

/// Accepts every nonce.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoReplayGuard;

impl ReplayGuard for NoReplayGuard {
    fn check_and_record(&self, _nonce: &Nonce) -> Result<()> {
        Ok(())
    }
}

/// Remembers the last `capacity` nonces, evicting oldest first.
#[derive(Debug)]
pub struct NonceHistory {
    capacity: usize,
    inner: Mutex<HistoryInner>,
}

#[derive(Debug, Default)]
struct HistoryInner {
    seen: HashSet<Nonce>,
    order: VecDeque<Nonce>,
}

impl NonceHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(HistoryInner::default()),
        }
    }

    /// Number of nonces currently remembered.
    pub fn len(&self) -> usize {
        self.inner.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReplayGuard for NonceHistory {
    fn check_and_record(&self, nonce: &Nonce) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.seen.contains(nonce) {
            return Err(TetherTrustError::Freshness("replayed nonce".into()));
        }
        if inner.order.len() == self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.seen.remove(&oldest);
            }
        }
        inner.seen.insert(*nonce);
        inner.order.push_back(*nonce);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nonce(b: u8) -> Nonce {
        Nonce::from_bytes([b; 12])
    }

    #[test]
    fn no_guard_accepts_repeats() {
        let guard = NoReplayGuard;
        guard.check_and_record(&nonce(1)).unwrap();
        guard.check_and_record(&nonce(1)).unwrap();
    }

    #[test]
    fn history_rejects_repeat() {
        let guard = NonceHistory::new(8);
        guard.check_and_record(&nonce(1)).unwrap();
        let err = guard.check_and_record(&nonce(1)).unwrap_err();
        assert!(matches!(err, TetherTrustError::Freshness(_)));
    }

    #[test]
    fn history_evicts_oldest() {
        let guard = NonceHistory::new(2);
        guard.check_and_record(&nonce(1)).unwrap();
        guard.check_and_record(&nonce(2)).unwrap();
        guard.check_and_record(&nonce(3)).unwrap();
        assert_eq!(guard.len(), 2);
        // nonce(1) fell out of the window.
        guard.check_and_record(&nonce(1)).unwrap();
        assert!(guard.check_and_record(&nonce(3)).is_err());
    }
}
