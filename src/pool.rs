//! Fixed set of emulated controllers owned for the life of the process.

use crate::error::BridgeError;
use crate::session::DeviceSession;
use crate::virtual_controller::{self, BackendKind, VirtualController};
use std::sync::{Mutex, MutexGuard, PoisonError};

pub const MIN_CONTROLLERS: usize = 1;
pub const MAX_CONTROLLERS: usize = 4;

pub struct SessionPool {
    sessions: Vec<Mutex<DeviceSession>>,
}

impl SessionPool {
    /// Create `count` (clamped to 1..=4) controllers on the given backend.
    pub fn initialize(count: usize, kind: BackendKind) -> Result<Self, BridgeError> {
        Self::with_backends(count, |index| virtual_controller::connect(kind, index))
    }

    /// Like `initialize`, but every backend comes from `factory`.
    ///
    /// If any controller fails to come up, the ones already created are
    /// dropped (and thereby unplugged) before the error is returned.
    pub fn with_backends<F>(count: usize, mut factory: F) -> Result<Self, BridgeError>
    where
        F: FnMut(usize) -> anyhow::Result<Box<dyn VirtualController>>,
    {
        let count = count.clamp(MIN_CONTROLLERS, MAX_CONTROLLERS);
        let mut sessions = Vec::with_capacity(count);

        for index in 0..count {
            let backend = factory(index).map_err(|e| BridgeError::BackendUnavailable {
                index,
                reason: e.to_string(),
            })?;

            let mut session = DeviceSession::new(index, backend);
            // Publish a neutral report straight away so the OS sees an idle pad
            session.flush().map_err(|e| BridgeError::BackendUnavailable {
                index,
                reason: e.to_string(),
            })?;

            log::info!("Controller {} created", index + 1);
            sessions.push(Mutex::new(session));
        }

        Ok(Self { sessions })
    }

    /// Lock the session at `index`. The guard is the only way to reach a
    /// session, so no caller can keep one past its lookup.
    pub fn get(&self, index: usize) -> Option<MutexGuard<'_, DeviceSession>> {
        self.sessions
            .get(index)
            .map(|session| session.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    /// Neutralise and flush every controller. Keeps going past failures and
    /// returns the indices that could not be flushed.
    pub fn reset_all(&self) -> Vec<usize> {
        let mut failed = Vec::new();
        for index in 0..self.count() {
            let Some(mut session) = self.get(index) else {
                continue;
            };
            session.reset();
            if let Err(e) = session.flush() {
                log::warn!("Failed to reset controller {}: {}", index, e);
                failed.push(index);
            }
        }
        failed
    }

    /// Best-effort neutralise, then release every backend handle.
    /// Never fails; safe to call more than once.
    pub fn teardown(&self) {
        for index in 0..self.count() {
            let Some(mut session) = self.get(index) else {
                continue;
            };
            if session.is_released() {
                continue;
            }
            session.reset();
            if let Err(e) = session.flush() {
                log::warn!("Failed to neutralise controller {} during teardown: {}", index, e);
            }
            session.release();
        }
    }
}

impl Drop for SessionPool {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::virtual_controller::{buttons, LoopbackController, LoopbackProbe, Side};

    /// Pool of loopback controllers plus an observer handle per controller
    pub(crate) fn loopback_pool(count: usize) -> (SessionPool, Vec<LoopbackProbe>) {
        let mut probes = Vec::new();
        let pool = SessionPool::with_backends(count, |index| {
            let (controller, probe) = LoopbackController::with_probe(index);
            probes.push(probe);
            Ok(Box::new(controller) as Box<dyn VirtualController>)
        })
        .unwrap();
        (pool, probes)
    }

    #[test]
    fn test_count_is_clamped() {
        assert_eq!(loopback_pool(0).0.count(), 1);
        assert_eq!(loopback_pool(3).0.count(), 3);
        assert_eq!(loopback_pool(9).0.count(), 4);
    }

    #[test]
    fn test_get_in_and_out_of_range() {
        let (pool, _probes) = loopback_pool(2);
        for index in 0..2 {
            assert_eq!(pool.get(index).map(|s| s.index()), Some(index));
        }
        assert!(pool.get(2).is_none());
        assert!(pool.get(usize::MAX).is_none());
    }

    #[test]
    fn test_sessions_start_flushed_neutral() {
        let (_pool, probes) = loopback_pool(2);
        for probe in &probes {
            assert_eq!(probe.updates(), 1);
            assert!(probe.last_report().is_neutral());
        }
    }

    #[test]
    fn test_initialize_fails_whole_pool() {
        let mut probes = Vec::new();
        let result = SessionPool::with_backends(3, |index| {
            if index == 2 {
                return Err(anyhow::anyhow!("bus refused"));
            }
            let (controller, probe) = LoopbackController::with_probe(index);
            probes.push(probe);
            Ok(Box::new(controller) as Box<dyn VirtualController>)
        });

        match result {
            Err(BridgeError::BackendUnavailable { index, reason }) => {
                assert_eq!(index, 2);
                assert!(reason.contains("bus refused"));
            }
            _ => panic!("expected BackendUnavailable"),
        }
        // Controllers created before the failure were rolled back
        assert!(probes.iter().all(|p| !p.is_connected()));
    }

    #[test]
    fn test_initialize_fails_on_initial_flush() {
        let result = SessionPool::with_backends(1, |index| {
            let (controller, probe) = LoopbackController::with_probe(index);
            probe.set_failing(true);
            Ok(Box::new(controller) as Box<dyn VirtualController>)
        });
        assert!(matches!(result, Err(BridgeError::BackendUnavailable { index: 0, .. })));
    }

    #[test]
    fn test_reset_all_continues_past_failure() {
        let (pool, probes) = loopback_pool(3);
        for index in 0..3 {
            let mut session = pool.get(index).unwrap();
            session.set_button(buttons::A, true);
            session.set_stick(Side::Left, 1.0, 1.0);
            session.set_trigger(Side::Right, 255);
            session.flush().unwrap();
        }

        probes[1].set_failing(true);
        let failed = pool.reset_all();
        assert_eq!(failed, vec![1]);

        // Staged state is neutral everywhere, published state wherever the backend accepted it
        for index in 0..3 {
            assert!(pool.get(index).unwrap().report().is_neutral());
        }
        assert!(probes[0].last_report().is_neutral());
        assert!(probes[2].last_report().is_neutral());
    }

    #[test]
    fn test_teardown_releases_all_despite_failure() {
        let (pool, probes) = loopback_pool(2);
        pool.get(1).unwrap().set_button(buttons::B, true);
        probes[0].set_failing(true);

        pool.teardown();

        assert!(probes.iter().all(|p| !p.is_connected()));
        assert_eq!(pool.count(), 2);
        assert!(pool.get(0).unwrap().is_released());
        // Second teardown is a no-op
        pool.teardown();
    }
}
