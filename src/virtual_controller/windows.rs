use super::{GamepadReport, VirtualController};
use vigem_client::{Client, TargetId, XButtons, XGamepad, Xbox360Wired};

pub struct VirtualXboxController {
    index: usize,
    target: Xbox360Wired<Client>,
}

impl VirtualXboxController {
    pub fn new(index: usize) -> anyhow::Result<Self> {
        let client = Client::connect()
            .map_err(|e| anyhow::anyhow!(
                "Failed to connect to ViGEmBus: {:?}. Make sure ViGEmBus driver is installed from https://github.com/ViGEm/ViGEmBus/releases",
                e
            ))?;

        let mut target = Xbox360Wired::new(client, TargetId::XBOX360_WIRED);

        target.plugin()
            .map_err(|e| anyhow::anyhow!("Failed to plug in virtual controller {}: {:?}", index, e))?;

        target.wait_ready()
            .map_err(|e| anyhow::anyhow!("Controller {} not ready: {:?}", index, e))?;

        log::info!("Virtual Xbox 360 controller {} created via ViGEmBus", index);

        Ok(Self { index, target })
    }
}

impl VirtualController for VirtualXboxController {
    fn update(&mut self, report: &GamepadReport) -> anyhow::Result<()> {
        // Report bits already use the XUSB layout vigem-client expects
        let gamepad = XGamepad {
            buttons: XButtons { raw: report.buttons },
            left_trigger: report.left_trigger,
            right_trigger: report.right_trigger,
            thumb_lx: report.thumb_lx,
            thumb_ly: report.thumb_ly,
            thumb_rx: report.thumb_rx,
            thumb_ry: report.thumb_ry,
        };

        self.target.update(&gamepad)
            .map_err(|e| anyhow::anyhow!("Failed to update controller {}: {:?}", self.index, e))?;

        Ok(())
    }

    /// False once the target has been unplugged from the bus
    fn is_connected(&self) -> bool {
        self.target.is_attached()
    }
}

impl Drop for VirtualXboxController {
    fn drop(&mut self) {
        if let Err(e) = self.target.unplug() {
            log::warn!("Failed to unplug controller {}: {:?}", self.index, e);
        }
    }
}
