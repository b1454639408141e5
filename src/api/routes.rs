//! API route definitions

use std::time::Duration;

use axum::{extract::State, http::StatusCode, routing::{get, post}, Json, Router};

use super::types::*;
use super::SharedStateHandle;
use crate::error::BridgeError;
use crate::input_map::InputTarget;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

/// Create the API router with all endpoints
pub fn create_router(state: SharedStateHandle) -> Router {
    Router::new()
        .route("/status", get(status_handler))
        .route("/input", post(input_handler))
        .route("/analog", post(analog_handler))
        .route("/reset", post(reset_handler))
        .with_state(state)
}

fn error_response(err: BridgeError) -> (StatusCode, Json<ApiError>) {
    let mut body = ApiError::new(err.to_string());
    let status = match err {
        BridgeError::ControllerNotFound { available, .. } => {
            body.available = Some(Available::Controllers(available));
            StatusCode::NOT_FOUND
        }
        BridgeError::UnknownInputName { available, .. } => {
            body.available = Some(Available::Names(available));
            StatusCode::BAD_REQUEST
        }
        BridgeError::BackendUnavailable { .. } | BridgeError::Backend { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    };
    (status, Json(body))
}

async fn status_handler(State(state): State<SharedStateHandle>) -> Json<StatusResponse> {
    let scheduler = state.scheduler();
    Json(StatusResponse {
        name: state.name().to_string(),
        controllers: state.pool().count(),
        uptime_ms: state.uptime().as_millis() as u64,
        pending_inputs: scheduler.pending_inputs(),
        failed_reverts: scheduler.failed_reverts(),
    })
}

/// Press or hold a button (or pull a trigger) on a virtual controller
async fn input_handler(
    State(state): State<SharedStateHandle>,
    Json(req): Json<InputRequest>,
) -> ApiResult<InputResponse> {
    log::debug!(
        "{:?} {} on controller {} for {:?}ms",
        req.action, req.button, req.controller, req.duration_ms
    );

    let scheduler = state.scheduler();
    let controller = scheduler
        .resolve_controller(req.controller)
        .map_err(error_response)?;
    let target = scheduler
        .press_named(controller, &req.button, req.duration_ms.map(clamp_duration))
        .map_err(error_response)?;

    let (button, trigger) = match target {
        InputTarget::Button(_) => (Some(req.button), None),
        InputTarget::Trigger(side) => (None, Some(side)),
    };
    Ok(Json(InputResponse {
        ok: true,
        controller: req.controller,
        button,
        trigger,
    }))
}

/// Move an analog stick on a virtual controller
async fn analog_handler(
    State(state): State<SharedStateHandle>,
    Json(req): Json<AnalogRequest>,
) -> ApiResult<AnalogResponse> {
    let scheduler = state.scheduler();
    let result = scheduler.resolve_controller(req.controller).and_then(|controller| {
        scheduler.move_stick(
            controller,
            req.stick,
            req.x,
            req.y,
            clamp_duration(req.duration_ms),
        )
    });

    match result {
        Ok(()) => Ok(Json(AnalogResponse {
            ok: true,
            controller: req.controller,
            stick: req.stick,
            x: req.x,
            y: req.y,
        })),
        // Analog callers only get the message, not the pool size
        Err(err @ BridgeError::ControllerNotFound { .. }) => {
            Err((StatusCode::NOT_FOUND, Json(ApiError::new(err.to_string()))))
        }
        Err(err) => Err(error_response(err)),
    }
}

/// Release everything on every controller
async fn reset_handler(State(state): State<SharedStateHandle>) -> ApiResult<ResetResponse> {
    let pool = state.pool();
    let failed = pool.reset_all();
    if failed.is_empty() {
        return Ok(Json(ResetResponse {
            ok: true,
            controllers_reset: pool.count(),
        }));
    }

    let mut body = ApiError::new(format!("Failed to reset controller(s) {:?}", failed));
    body.failed = Some(failed);
    Err((StatusCode::SERVICE_UNAVAILABLE, Json(body)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::BridgeApp;
    use crate::pool::tests::loopback_pool;
    use crate::virtual_controller::{buttons, LoopbackProbe, Side};
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tokio::time::sleep;
    use tower::ServiceExt;

    fn router(count: usize) -> (Router, SharedStateHandle, Vec<LoopbackProbe>) {
        let (pool, probes) = loopback_pool(count);
        let state = Arc::new(BridgeApp::with_pool("Test Bridge".to_string(), pool));
        (create_router(Arc::clone(&state)), state, probes)
    }

    async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test(start_paused = true)]
    async fn test_status() {
        let (router, _state, _probes) = router(2);
        let (status, body) = send(&router, Method::GET, "/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Test Bridge");
        assert_eq!(body["controllers"], 2);
        assert!(body["uptime_ms"].is_u64());
        assert_eq!(body["pending_inputs"], 0);
        assert_eq!(body["failed_reverts"], 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_press_and_release() {
        let (router, _state, probes) = router(2);

        let (status, body) = send(
            &router,
            Method::POST,
            "/input",
            Some(json!({ "controller": 1, "button": "XUSB_GAMEPAD_A", "duration_ms": 100 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true, "controller": 1, "button": "XUSB_GAMEPAD_A" }));
        assert!(probes[1].last_report().is_pressed(buttons::A));

        sleep(Duration::from_millis(101)).await;
        assert!(!probes[1].last_report().is_pressed(buttons::A));
        assert!(probes[0].last_report().is_neutral());
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_defaults() {
        let (router, _state, probes) = router(1);

        let (status, body) = send(
            &router,
            Method::POST,
            "/input",
            Some(json!({ "button": "XUSB_GAMEPAD_B", "action": "hold" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["controller"], 0);

        sleep(Duration::from_millis(149)).await;
        assert!(probes[0].last_report().is_pressed(buttons::B));
        sleep(Duration::from_millis(2)).await;
        assert!(probes[0].last_report().is_neutral());
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_missing_controller() {
        let (router, state, probes) = router(2);

        let (status, body) = send(
            &router,
            Method::POST,
            "/input",
            Some(json!({ "controller": 5, "button": "XUSB_GAMEPAD_A" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Controller 5 not found", "available": 2 }));
        assert!(probes.iter().all(|p| p.updates() == 1));
        assert_eq!(state.scheduler().pending_inputs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_negative_controller() {
        let (router, state, probes) = router(2);

        let (status, body) = send(
            &router,
            Method::POST,
            "/input",
            Some(json!({ "controller": -1, "button": "XUSB_GAMEPAD_A" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Controller -1 not found", "available": 2 }));
        assert!(probes.iter().all(|p| p.updates() == 1));
        assert_eq!(state.scheduler().pending_inputs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_negative_duration_releases_next_tick() {
        let (router, _state, probes) = router(1);

        let (status, _body) = send(
            &router,
            Method::POST,
            "/input",
            Some(json!({ "button": "XUSB_GAMEPAD_A", "duration_ms": -100 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(probes[0].last_report().is_pressed(buttons::A));

        sleep(Duration::from_millis(1)).await;
        assert!(probes[0].last_report().is_neutral());
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_trigger_default_duration() {
        let (router, _state, probes) = router(1);

        let (status, _body) = send(
            &router,
            Method::POST,
            "/input",
            Some(json!({ "button": "XUSB_GAMEPAD_LEFT_TRIGGER" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        sleep(Duration::from_millis(149)).await;
        assert_eq!(probes[0].last_report().trigger(Side::Left), 255);
        sleep(Duration::from_millis(2)).await;
        assert_eq!(probes[0].last_report().trigger(Side::Left), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_unknown_button() {
        let (router, _state, probes) = router(1);

        let (status, body) = send(
            &router,
            Method::POST,
            "/input",
            Some(json!({ "button": "XUSB_GAMEPAD_TURBO" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Unknown button: XUSB_GAMEPAD_TURBO");
        let names = body["available"].as_array().unwrap();
        assert_eq!(names.len(), 16);
        assert!(names.contains(&json!("XUSB_GAMEPAD_START")));
        assert_eq!(probes[0].updates(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_trigger_name() {
        let (router, _state, probes) = router(1);

        let (status, body) = send(
            &router,
            Method::POST,
            "/input",
            Some(json!({ "button": "XUSB_GAMEPAD_RIGHT_TRIGGER", "duration_ms": 80 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true, "controller": 0, "trigger": "right" }));
        assert_eq!(probes[0].last_report().trigger(Side::Right), 255);

        sleep(Duration::from_millis(81)).await;
        assert_eq!(probes[0].last_report().trigger(Side::Right), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_rejects_unknown_action() {
        let (router, _state, probes) = router(1);

        let (status, _body) = send(
            &router,
            Method::POST,
            "/input",
            Some(json!({ "button": "XUSB_GAMEPAD_A", "action": "mash" })),
        )
        .await;
        assert!(status.is_client_error());
        assert_eq!(probes[0].updates(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_analog_move_and_center() {
        let (router, _state, probes) = router(1);

        let (status, body) = send(
            &router,
            Method::POST,
            "/analog",
            Some(json!({ "controller": 0, "stick": "left", "x": 1.0, "y": -1.0, "duration_ms": 50 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "ok": true, "controller": 0, "stick": "left", "x": 1.0, "y": -1.0 })
        );
        assert_eq!(probes[0].last_report().stick(Side::Left), (32767, -32767));

        sleep(Duration::from_millis(51)).await;
        assert_eq!(probes[0].last_report().stick(Side::Left), (0, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_analog_missing_controller() {
        let (router, _state, _probes) = router(1);

        let (status, body) = send(
            &router,
            Method::POST,
            "/analog",
            Some(json!({ "controller": 3, "stick": "right", "x": 0.5, "y": 0.5 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Controller 3 not found" }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_analog_negative_controller() {
        let (router, state, probes) = router(1);

        let (status, body) = send(
            &router,
            Method::POST,
            "/analog",
            Some(json!({ "controller": -1, "stick": "left", "x": 1.0, "y": 1.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Controller -1 not found" }));
        assert_eq!(probes[0].updates(), 1);
        assert_eq!(state.scheduler().pending_inputs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_analog_negative_duration_recenters_next_tick() {
        let (router, _state, probes) = router(1);

        let (status, _body) = send(
            &router,
            Method::POST,
            "/analog",
            Some(json!({ "stick": "right", "x": 0.0, "y": 1.0, "duration_ms": -1 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(probes[0].last_report().stick(Side::Right), (0, 32767));

        sleep(Duration::from_millis(1)).await;
        assert!(probes[0].last_report().is_neutral());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset() {
        let (router, _state, probes) = router(2);

        send(
            &router,
            Method::POST,
            "/input",
            Some(json!({ "controller": 1, "button": "XUSB_GAMEPAD_Y", "duration_ms": 5000 })),
        )
        .await;
        send(
            &router,
            Method::POST,
            "/analog",
            Some(json!({ "stick": "right", "x": -1.0, "y": 0.0, "duration_ms": 5000 })),
        )
        .await;
        assert!(!probes[0].last_report().is_neutral());
        assert!(!probes[1].last_report().is_neutral());

        let (status, body) = send(&router, Method::POST, "/reset", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true, "controllers_reset": 2 }));
        assert!(probes.iter().all(|p| p.last_report().is_neutral()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_reports_failed_controllers() {
        let (router, _state, probes) = router(3);
        probes[2].set_failing(true);

        let (status, body) = send(&router, Method::POST, "/reset", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["failed"], json!([2]));
    }
}
