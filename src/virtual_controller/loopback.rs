use super::{GamepadReport, VirtualController};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Default)]
struct LoopbackShared {
    last: GamepadReport,
    updates: usize,
    failing: bool,
    connected: bool,
}

/// Virtual controller that keeps its reports in memory instead of
/// publishing them to the OS.
pub struct LoopbackController {
    index: usize,
    shared: Arc<Mutex<LoopbackShared>>,
}

/// Observer side of a `LoopbackController`.
#[cfg(test)]
#[derive(Clone)]
pub struct LoopbackProbe {
    shared: Arc<Mutex<LoopbackShared>>,
}

impl LoopbackController {
    pub fn new(index: usize) -> Self {
        let shared = Arc::new(Mutex::new(LoopbackShared {
            connected: true,
            ..Default::default()
        }));
        log::info!("Loopback controller {} created", index);
        Self { index, shared }
    }

    /// Controller plus a handle for inspecting what it published
    #[cfg(test)]
    pub fn with_probe(index: usize) -> (Self, LoopbackProbe) {
        let controller = Self::new(index);
        let probe = LoopbackProbe {
            shared: Arc::clone(&controller.shared),
        };
        (controller, probe)
    }
}

impl VirtualController for LoopbackController {
    fn update(&mut self, report: &GamepadReport) -> anyhow::Result<()> {
        let mut shared = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        if shared.failing {
            return Err(anyhow::anyhow!("loopback controller {} rejected update", self.index));
        }
        shared.last = *report;
        shared.updates += 1;
        log::debug!(
            "Loopback controller {} update #{}: {:?}",
            self.index, shared.updates, report
        );
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.shared
            .lock()
            .map(|shared| shared.connected)
            .unwrap_or(false)
    }
}

impl Drop for LoopbackController {
    fn drop(&mut self) {
        let mut shared = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        shared.connected = false;
        log::debug!(
            "Loopback controller {} closed after {} update(s), last {:?}",
            self.index, shared.updates, shared.last
        );
    }
}

#[cfg(test)]
impl LoopbackProbe {
    /// Last report successfully published
    pub fn last_report(&self) -> GamepadReport {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner).last
    }

    /// Number of successful updates
    pub fn updates(&self) -> usize {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner).updates
    }

    /// Make every following update fail, as if the device was removed
    pub fn set_failing(&self, failing: bool) {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner).failing = failing;
    }

    /// False once the controller handle has been dropped
    pub fn is_connected(&self) -> bool {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner).connected
    }
}
