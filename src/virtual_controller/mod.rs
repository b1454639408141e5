#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
mod uinput_ffi;
#[cfg(windows)]
mod windows;
mod loopback;

#[cfg(target_os = "linux")]
pub use linux::VirtualXboxController;
#[cfg(windows)]
pub use windows::VirtualXboxController;
pub use loopback::LoopbackController;
#[cfg(test)]
pub use loopback::LoopbackProbe;

use serde::{Deserialize, Serialize};

/// XUSB digital button bits, as the Xbox 360 report carries them
pub mod buttons {
    pub const DPAD_UP: u16 = 0x0001;
    pub const DPAD_DOWN: u16 = 0x0002;
    pub const DPAD_LEFT: u16 = 0x0004;
    pub const DPAD_RIGHT: u16 = 0x0008;
    pub const START: u16 = 0x0010;
    pub const BACK: u16 = 0x0020;
    pub const LEFT_THUMB: u16 = 0x0040;
    pub const RIGHT_THUMB: u16 = 0x0080;
    pub const LEFT_SHOULDER: u16 = 0x0100;
    pub const RIGHT_SHOULDER: u16 = 0x0200;
    pub const A: u16 = 0x1000;
    pub const B: u16 = 0x2000;
    pub const X: u16 = 0x4000;
    pub const Y: u16 = 0x8000;
}

/// Full stick deflection in backend units
pub const AXIS_MAX: i16 = 32767;
/// Full trigger pull in backend units
pub const TRIGGER_MAX: u8 = 255;

/// Which stick or trigger an analog input addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    Left,
    Right,
}

/// One complete controller snapshot, in backend-native units.
///
/// The default value is the neutral state: no buttons, sticks centered,
/// triggers released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GamepadReport {
    /// OR-ed `buttons::*` bits
    pub buttons: u16,
    pub left_trigger: u8,
    pub right_trigger: u8,
    pub thumb_lx: i16,
    pub thumb_ly: i16,
    pub thumb_rx: i16,
    pub thumb_ry: i16,
}

impl GamepadReport {
    pub fn is_neutral(&self) -> bool {
        *self == Self::default()
    }

    pub fn is_pressed(&self, button: u16) -> bool {
        self.buttons & button == button
    }

    pub fn stick(&self, side: Side) -> (i16, i16) {
        match side {
            Side::Left => (self.thumb_lx, self.thumb_ly),
            Side::Right => (self.thumb_rx, self.thumb_ry),
        }
    }

    pub fn trigger(&self, side: Side) -> u8 {
        match side {
            Side::Left => self.left_trigger,
            Side::Right => self.right_trigger,
        }
    }
}

/// Which device backend sessions are created with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// ViGEmBus on Windows, uinput on Linux
    #[default]
    Native,
    /// In-process stand-in that only records reports
    Loopback,
}

impl std::str::FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" => Ok(Self::Native),
            "loopback" => Ok(Self::Loopback),
            other => Err(anyhow::anyhow!("unknown backend '{}'", other)),
        }
    }
}

/// Trait for virtual Xbox controller implementations
pub trait VirtualController: Send {
    /// Publish a full snapshot as one observable update
    fn update(&mut self, report: &GamepadReport) -> anyhow::Result<()>;
    fn is_connected(&self) -> bool;
}

/// Create one virtual controller of the requested kind.
pub fn connect(kind: BackendKind, index: usize) -> anyhow::Result<Box<dyn VirtualController>> {
    match kind {
        BackendKind::Loopback => Ok(Box::new(LoopbackController::new(index))),
        BackendKind::Native => connect_native(index),
    }
}

#[cfg(any(target_os = "linux", windows))]
fn connect_native(index: usize) -> anyhow::Result<Box<dyn VirtualController>> {
    Ok(Box::new(VirtualXboxController::new(index)?))
}

#[cfg(not(any(target_os = "linux", windows)))]
fn connect_native(_index: usize) -> anyhow::Result<Box<dyn VirtualController>> {
    Err(anyhow::anyhow!(
        "no native virtual controller backend on this platform; use PADBRIDGE_BACKEND=loopback"
    ))
}
