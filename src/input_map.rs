//! Symbolic input names accepted from callers.

use crate::error::BridgeError;
use crate::virtual_controller::{buttons, Side};

/// Digital buttons, by the names the command stream uses
pub const BUTTON_MAP: [(&str, u16); 14] = [
    ("XUSB_GAMEPAD_A", buttons::A),
    ("XUSB_GAMEPAD_B", buttons::B),
    ("XUSB_GAMEPAD_X", buttons::X),
    ("XUSB_GAMEPAD_Y", buttons::Y),
    ("XUSB_GAMEPAD_DPAD_UP", buttons::DPAD_UP),
    ("XUSB_GAMEPAD_DPAD_DOWN", buttons::DPAD_DOWN),
    ("XUSB_GAMEPAD_DPAD_LEFT", buttons::DPAD_LEFT),
    ("XUSB_GAMEPAD_DPAD_RIGHT", buttons::DPAD_RIGHT),
    ("XUSB_GAMEPAD_START", buttons::START),
    ("XUSB_GAMEPAD_BACK", buttons::BACK),
    ("XUSB_GAMEPAD_LEFT_THUMB", buttons::LEFT_THUMB),
    ("XUSB_GAMEPAD_RIGHT_THUMB", buttons::RIGHT_THUMB),
    ("XUSB_GAMEPAD_LEFT_SHOULDER", buttons::LEFT_SHOULDER),
    ("XUSB_GAMEPAD_RIGHT_SHOULDER", buttons::RIGHT_SHOULDER),
];

/// Triggers are analog, so these names take the trigger path
pub const TRIGGER_MAP: [(&str, Side); 2] = [
    ("XUSB_GAMEPAD_LEFT_TRIGGER", Side::Left),
    ("XUSB_GAMEPAD_RIGHT_TRIGGER", Side::Right),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputTarget {
    Button(u16),
    Trigger(Side),
}

pub fn resolve(name: &str) -> Result<InputTarget, BridgeError> {
    if let Some((_, side)) = TRIGGER_MAP.iter().find(|(n, _)| *n == name) {
        return Ok(InputTarget::Trigger(*side));
    }
    BUTTON_MAP
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, bit)| InputTarget::Button(*bit))
        .ok_or_else(|| BridgeError::UnknownInputName {
            name: name.to_string(),
            available: available_names(),
        })
}

/// Every accepted name: buttons first, then triggers
pub fn available_names() -> Vec<&'static str> {
    BUTTON_MAP
        .iter()
        .map(|(n, _)| *n)
        .chain(TRIGGER_MAP.iter().map(|(n, _)| *n))
        .collect()
}
