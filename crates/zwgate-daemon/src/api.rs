//! REST API handlers

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};
use zwgate_core::{DeviceId, ParameterSelector, QueryError};

use crate::state::AppState;

/// API error response
#[derive(Serialize)]
struct ApiError {
    error: String,
}

impl ApiError {
    fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

fn error_response(err: QueryError) -> Response {
    let status = match err {
        QueryError::NotFound(_) => StatusCode::NOT_FOUND,
        QueryError::MalformedInput(_) => StatusCode::BAD_REQUEST,
    };
    debug!(error = %err, "Request rejected");
    (status, Json(ApiError::new(err.to_string()))).into_response()
}

fn respond<T: Serialize>(result: Result<T, QueryError>) -> Response {
    match result {
        Ok(body) => Json(body).into_response(),
        Err(e) => error_response(e),
    }
}

fn parse_device(id: &str) -> Result<DeviceId, QueryError> {
    id.parse()
        .map_err(|_| QueryError::NotFound(format!("device {}", id)))
}

fn parse_slot(instance: &str, index: &str) -> Result<ParameterSelector, QueryError> {
    match (instance.parse(), index.parse()) {
        (Ok(instance), Ok(index)) => Ok(ParameterSelector::Slot { instance, index }),
        _ => Err(QueryError::NotFound(format!("parameter {}:{}", instance, index))),
    }
}

/// Extract the `value` field of a PUT body, if the body is JSON at all
fn payload_value(body: &Bytes) -> Option<Value> {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| v.get("value").cloned())
}

pub async fn root() -> &'static str {
    "zwgate API endpoint"
}

/// List all known devices
pub async fn list_devices(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.devices().await)
}

/// Get a specific device by ID
pub async fn get_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let result = match parse_device(&id) {
        Ok(id) => state.device(id).await,
        Err(e) => Err(e),
    };
    respond(result)
}

/// Get every parameter group of a device
pub async fn get_classes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let result = match parse_device(&id) {
        Ok(id) => state.classes(id).await,
        Err(e) => Err(e),
    };
    respond(result)
}

/// Get one parameter group by class id or name
pub async fn get_class(
    State(state): State<Arc<AppState>>,
    Path((id, class)): Path<(String, String)>,
) -> Response {
    let result = match parse_device(&id) {
        Ok(id) => state.class(id, &class).await,
        Err(e) => Err(e),
    };
    respond(result)
}

/// Get a parameter by its label
pub async fn get_parameter_by_label(
    State(state): State<Arc<AppState>>,
    Path((id, class, label)): Path<(String, String, String)>,
) -> Response {
    let result = match parse_device(&id) {
        Ok(id) => state.parameter(id, &class, &ParameterSelector::Label(label)).await,
        Err(e) => Err(e),
    };
    respond(result)
}

/// Set a parameter addressed by its label
pub async fn set_parameter_by_label(
    State(state): State<Arc<AppState>>,
    Path((id, class, label)): Path<(String, String, String)>,
    body: Bytes,
) -> Response {
    let result = match parse_device(&id) {
        Ok(id) => {
            info!(device = %id, class = %class, label = %label, "Set parameter requested");
            let payload = payload_value(&body);
            state
                .set_parameter(id, &class, &ParameterSelector::Label(label), payload.as_ref())
                .await
        }
        Err(e) => Err(e),
    };
    respond(result)
}

/// Get a parameter by instance and index
pub async fn get_parameter_by_index(
    State(state): State<Arc<AppState>>,
    Path((id, class, instance, index)): Path<(String, String, String, String)>,
) -> Response {
    let target = parse_device(&id).and_then(|id| Ok((id, parse_slot(&instance, &index)?)));
    let result = match target {
        Ok((id, selector)) => state.parameter(id, &class, &selector).await,
        Err(e) => Err(e),
    };
    respond(result)
}

/// Set a parameter addressed by instance and index
pub async fn set_parameter_by_index(
    State(state): State<Arc<AppState>>,
    Path((id, class, instance, index)): Path<(String, String, String, String)>,
    body: Bytes,
) -> Response {
    let target = parse_device(&id).and_then(|id| Ok((id, parse_slot(&instance, &index)?)));
    let result = match target {
        Ok((id, selector)) => {
            info!(device = %id, class = %class, slot = %selector, "Set parameter requested");
            let payload = payload_value(&body);
            state
                .set_parameter(id, &class, &selector, payload.as_ref())
                .await
        }
        Err(e) => Err(e),
    };
    respond(result)
}

/// Registry counters
pub async fn get_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.stats().await)
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::server::router;
    use crate::state::testing::RecordingController;
    use crate::state::AppState;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;
    use zwgate_core::{DeviceId, DeviceInfo, DriverCommand, HardwareEvent, Parameter};

    async fn app() -> (axum::Router, Arc<RecordingController>) {
        let controller = Arc::new(RecordingController::default());
        let state = AppState::new(Config::default(), controller.clone());
        let node = DeviceId(5);
        for event in [
            HardwareEvent::DeviceAdded { device: node },
            HardwareEvent::ValueAdded {
                device: node,
                class_id: 38,
                value: Parameter::new(1, 0, "Level").with_value(0),
            },
            HardwareEvent::DeviceReady {
                device: node,
                info: DeviceInfo {
                    name: "Hall dimmer".to_string(),
                    ..Default::default()
                },
            },
        ] {
            state.ingest(event).await.unwrap();
        }
        (router(state), controller)
    }

    async fn send(
        app: &axum::Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let body = match body {
            Some(v) => Body::from(v.to_string()),
            None => Body::empty(),
        };
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body)
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_list_and_get_devices() {
        let (app, _) = app().await;

        let (status, body) = send(&app, Method::GET, "/nodes", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["id"], 5);
        assert_eq!(body[0]["name"], "Hall dimmer");

        let (status, body) = send(&app, Method::GET, "/nodes/5/classes", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["38"]["name"], "switch_multilevel");

        let (status, body) = send(&app, Method::GET, "/nodes/7", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());

        let (status, _) = send(&app, Method::GET, "/nodes/lamp", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_class_and_parameters() {
        let (app, _) = app().await;

        let (status, body) =
            send(&app, Method::GET, "/nodes/5/classes/switch_multilevel", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], 38);

        let (status, body) = send(&app, Method::GET, "/nodes/5/classes/38/LEVEL", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["value"], 0);

        let (status, body) = send(&app, Method::GET, "/nodes/5/classes/38/1/0", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["label"], "Level");

        let (status, _) = send(&app, Method::GET, "/nodes/5/classes/38/2/0", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_put_sends_command() {
        let (app, controller) = app().await;

        let (status, body) = send(
            &app,
            Method::PUT,
            "/nodes/5/classes/switch_multilevel/level",
            Some(json!({"value": "60"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["value"], 0);

        let body = Some(json!({"value": 25}));
        let (status, _) = send(&app, Method::PUT, "/nodes/5/classes/38/1/0", body).await;
        assert_eq!(status, StatusCode::OK);

        let sent = controller.sent.lock();
        assert!(sent.contains(&DriverCommand::SetValue {
            device: DeviceId(5),
            class_id: 38,
            instance: 1,
            index: 0,
            value: 60
        }));
        assert_eq!(
            sent.last(),
            Some(&DriverCommand::SetValue {
                device: DeviceId(5),
                class_id: 38,
                instance: 1,
                index: 0,
                value: 25
            })
        );
    }

    #[tokio::test]
    async fn test_put_rejections_send_nothing() {
        let (app, controller) = app().await;
        let before = controller.sent.lock().len();

        let body = Some(json!({"value": 1}));
        let (status, _) = send(&app, Method::PUT, "/nodes/9/classes/38/Level", body).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let body = Some(json!({"level": 1}));
        let (status, _) = send(&app, Method::PUT, "/nodes/5/classes/38/Level", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::PUT, "/nodes/5/classes/38/1/0", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert_eq!(controller.sent.lock().len(), before);
    }

    #[tokio::test]
    async fn test_stats() {
        let (app, _) = app().await;
        let (status, body) = send(&app, Method::GET, "/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["devices"], 1);
        assert_eq!(body["ready"], 1);
        assert_eq!(body["dropped_events"], 0);
    }
}
