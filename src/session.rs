//! A single emulated controller.
//!
//! Setters only stage changes in a local `GamepadReport`; nothing reaches
//! the backend until `flush`, which publishes the whole snapshot at once.

use crate::virtual_controller::{GamepadReport, Side, VirtualController, AXIS_MAX};

pub struct DeviceSession {
    index: usize,
    report: GamepadReport,
    backend: Option<Box<dyn VirtualController>>,
}

/// Map a -1.0..1.0 stick value onto the backend's signed 16-bit range
pub fn quantize_axis(value: f32) -> i16 {
    let value = if value.is_nan() { 0.0 } else { value.clamp(-1.0, 1.0) };
    (value * AXIS_MAX as f32).round() as i16
}

impl DeviceSession {
    pub fn new(index: usize, backend: Box<dyn VirtualController>) -> Self {
        Self {
            index,
            report: GamepadReport::default(),
            backend: Some(backend),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Staged state, including changes not flushed yet
    pub fn report(&self) -> &GamepadReport {
        &self.report
    }

    pub fn set_button(&mut self, button: u16, pressed: bool) {
        if pressed {
            self.report.buttons |= button;
        } else {
            self.report.buttons &= !button;
        }
    }

    pub fn set_stick(&mut self, side: Side, x: f32, y: f32) {
        let (x, y) = (quantize_axis(x), quantize_axis(y));
        match side {
            Side::Left => {
                self.report.thumb_lx = x;
                self.report.thumb_ly = y;
            }
            Side::Right => {
                self.report.thumb_rx = x;
                self.report.thumb_ry = y;
            }
        }
    }

    pub fn set_trigger(&mut self, side: Side, value: u8) {
        match side {
            Side::Left => self.report.left_trigger = value,
            Side::Right => self.report.right_trigger = value,
        }
    }

    /// Back to neutral. Does not flush.
    pub fn reset(&mut self) {
        self.report = GamepadReport::default();
    }

    /// Publish the staged report as one backend update
    pub fn flush(&mut self) -> anyhow::Result<()> {
        match self.backend.as_mut() {
            Some(backend) if !backend.is_connected() => {
                Err(anyhow::anyhow!("controller {} is not connected", self.index))
            }
            Some(backend) => backend.update(&self.report),
            None => Err(anyhow::anyhow!("controller {} has been released", self.index)),
        }
    }

    /// Drop the backend handle, unplugging the virtual device
    pub fn release(&mut self) {
        if self.backend.take().is_some() {
            log::info!("Controller {} released", self.index);
        }
    }

    pub fn is_released(&self) -> bool {
        self.backend.is_none()
    }
}
