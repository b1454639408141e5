//! API request/response types

use crate::scheduler::DEFAULT_STICK_MS;
use crate::virtual_controller::Side;
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_stick_ms() -> i64 {
    DEFAULT_STICK_MS as i64
}

/// Negative durations are clamped to zero, i.e. released on the next tick
pub fn clamp_duration(duration_ms: i64) -> Duration {
    Duration::from_millis(duration_ms.max(0) as u64)
}

// ============================================================================
// Requests
// ============================================================================

/// `press` and `hold` both keep the button down for `duration_ms`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputAction {
    #[default]
    Press,
    Hold,
}

/// Body of `POST /input`
///
/// `controller` and `duration_ms` are signed so out-of-range values reach
/// the handler instead of failing deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct InputRequest {
    #[serde(default)]
    pub controller: i64,
    /// `XUSB_GAMEPAD_*` name
    pub button: String,
    #[serde(default)]
    pub action: InputAction,
    /// Falls back to the button or trigger default when absent
    #[serde(default)]
    pub duration_ms: Option<i64>,
}

/// Body of `POST /analog`
#[derive(Debug, Clone, Deserialize)]
pub struct AnalogRequest {
    #[serde(default)]
    pub controller: i64,
    #[serde(default)]
    pub stick: Side,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default = "default_stick_ms")]
    pub duration_ms: i64,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub name: String,
    pub controllers: usize,
    pub uptime_ms: u64,
    pub pending_inputs: usize,
    pub failed_reverts: u64,
}

/// Exactly one of `button` / `trigger` is set
#[derive(Debug, Clone, Serialize)]
pub struct InputResponse {
    pub ok: bool,
    pub controller: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<Side>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalogResponse {
    pub ok: bool,
    pub controller: i64,
    pub stick: Side,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResetResponse {
    pub ok: bool,
    pub controllers_reset: usize,
}

/// What the caller could have asked for instead
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Available {
    Controllers(usize),
    Names(Vec<&'static str>),
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<Available>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<Vec<usize>>,
}

impl ApiError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            available: None,
            failed: None,
        }
    }
}
