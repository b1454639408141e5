use thiserror::Error;

/// Errors surfaced by the controller pool and the input scheduler
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Requested index is outside the pool
    #[error("Controller {index} not found")]
    ControllerNotFound { index: i64, available: usize },

    /// Symbolic name is not in the button/trigger table
    #[error("Unknown button: {name}")]
    UnknownInputName {
        name: String,
        available: Vec<&'static str>,
    },

    /// The device backend refused to create a controller
    #[error("Virtual controller {index} unavailable: {reason}")]
    BackendUnavailable { index: usize, reason: String },

    /// A backend call failed while applying an input
    #[error("Controller {index} backend error: {reason}")]
    Backend { index: usize, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = BridgeError::ControllerNotFound { index: 5, available: 2 };
        assert_eq!(err.to_string(), "Controller 5 not found");

        let err = BridgeError::UnknownInputName {
            name: "XUSB_GAMEPAD_Z".to_string(),
            available: vec![],
        };
        assert_eq!(err.to_string(), "Unknown button: XUSB_GAMEPAD_Z");
    }
}
