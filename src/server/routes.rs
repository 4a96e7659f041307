use std::sync::Arc;

use axum::extract::Query;
use axum::http::{header, Method, StatusCode};
use axum::routing::{get, post};
use axum::{middleware, Extension, Json, Router};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};

use crate::reconcile::ReconcileOperator;
use crate::replay::{compute_snapshot, timeline, Cursor};

use super::dto::{
    HistoryResponse, ResetResponse, SnapshotQuery, SnapshotResponse, SubmitFragmentRequest,
    SubmitFragmentResponse, TimelineResponse,
};
use super::error::ApiError;
use super::logging::log_requests;

#[derive(Clone)]
pub struct ServerContext {
    pub operator: Arc<ReconcileOperator>,
}

/// HTTP front for one reconciliation operator: fragments in, hand state out.
pub struct HandHistoryServer {
    router: Router,
}

impl HandHistoryServer {
    pub fn new(operator: Arc<ReconcileOperator>) -> Self {
        let context = Arc::new(ServerContext { operator });

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE]);

        let router = Router::new()
            .route("/fragments", post(submit_fragment))
            .route("/hand", get(get_hand))
            .route("/hand/reset", post(reset_hand))
            .route("/hand/history", get(get_history))
            .route("/hand/snapshot", get(get_snapshot))
            .route("/hand/timeline", get(get_timeline))
            .layer(middleware::from_fn(log_requests))
            .layer(cors)
            .layer(Extension(context));

        Self { router }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn into_router(self) -> Router {
        self.router
    }
}

async fn submit_fragment(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Json(request): Json<SubmitFragmentRequest>,
) -> Result<(StatusCode, Json<SubmitFragmentResponse>), ApiError> {
    let fragment = request.fragment.trim();
    if fragment.is_empty() {
        return Err(ApiError::bad_request("fragment is empty"));
    }
    let pending = ctx.operator.submit(fragment)?;
    Ok((StatusCode::ACCEPTED, Json(SubmitFragmentResponse { pending })))
}

async fn reset_hand(
    Extension(ctx): Extension<Arc<ServerContext>>,
) -> Result<(StatusCode, Json<ResetResponse>), ApiError> {
    ctx.operator.reset()?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ResetResponse {
            status: "queued".to_owned(),
        }),
    ))
}

async fn get_hand(Extension(ctx): Extension<Arc<ServerContext>>) -> Result<Json<Value>, ApiError> {
    let document = ctx.operator.state().document();
    Ok(Json(document.to_ohh_json()?))
}

async fn get_history(Extension(ctx): Extension<Arc<ServerContext>>) -> Json<HistoryResponse> {
    let current = ctx.operator.state().current();
    Json(HistoryResponse {
        state_hash: current.state_hash,
        fragments: current.log.records().to_vec(),
        in_flight: current.in_flight,
        pending: ctx.operator.pending(),
    })
}

async fn get_snapshot(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Query(query): Query<SnapshotQuery>,
) -> Result<Json<SnapshotResponse>, ApiError> {
    let current = ctx.operator.state().current();
    let requested = match (query.round, query.action) {
        (None, None) => Cursor::end(&current.document),
        (Some(round), action) => Cursor::new(round, action.unwrap_or(-1)),
        (None, Some(_)) => return Err(ApiError::bad_request("action given without round")),
    };
    if requested.action_idx < -1 {
        return Err(ApiError::bad_request("action must be -1 or greater"));
    }

    let snapshot = compute_snapshot(&current.document, requested);
    Ok(Json(SnapshotResponse {
        state_hash: current.state_hash,
        cursor: snapshot.cursor,
        snapshot,
    }))
}

async fn get_timeline(Extension(ctx): Extension<Arc<ServerContext>>) -> Json<TimelineResponse> {
    let current = ctx.operator.state().current();
    Json(TimelineResponse {
        state_hash: current.state_hash,
        cursors: timeline(&current.document),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconcilerConfig;
    use crate::history::HandSettings;
    use crate::reconcile::{ReconcileEvent, Reconciler, ScriptEntry, ScriptedInterpreter};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::json;
    use tokio::sync::broadcast;
    use tower::ServiceExt;

    fn script() -> Vec<ScriptEntry> {
        let patches = serde_json::from_value(json!([
            { "op": "add", "path": "/players/-", "value": { "id": 1, "name": "Ann", "seat": 1, "starting_stack": 100 } },
            { "op": "add", "path": "/players/-", "value": { "id": 2, "name": "Bo", "seat": 2, "starting_stack": 100 } },
            { "op": "add", "path": "/rounds/-", "value": { "id": 0, "street": "Preflop", "actions": [
                { "action_number": 1, "player_id": 1, "action": "Post SB", "amount": 1 },
                { "action_number": 2, "player_id": 2, "action": "Post BB", "amount": 2 }
            ] } }
        ]))
        .unwrap();
        vec![ScriptEntry::ok("Ann and Bo post the blinds", patches)]
    }

    fn setup() -> (Router, Arc<ReconcileOperator>, broadcast::Receiver<ReconcileEvent>) {
        let reconciler = Reconciler::new(
            Arc::new(ScriptedInterpreter::new(script())),
            HandSettings::default(),
            ReconcilerConfig::default(),
        );
        let (operator, worker) = ReconcileOperator::new(reconciler);
        let events = operator.subscribe();
        operator.start(worker);
        let operator = Arc::new(operator);
        let router = HandHistoryServer::new(Arc::clone(&operator)).into_router();
        (router, operator, events)
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn submitted_fragment_shows_up_in_hand_and_history() {
        let (router, operator, mut events) = setup();

        let (status, body) = send(
            &router,
            post_json("/fragments", json!({ "fragment": " Ann and Bo post the blinds " })),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert!(body["pending"].is_u64());
        assert!(matches!(
            events.recv().await.unwrap(),
            ReconcileEvent::Committed { .. }
        ));

        let (status, hand) = send(&router, get("/hand")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(hand["ohh"]["players"][1]["name"], "Bo");

        let (_, history) = send(&router, get("/hand/history")).await;
        assert_eq!(history["fragments"][0]["fragment"], "Ann and Bo post the blinds");
        assert_eq!(history["fragments"][0]["outcome"]["status"], "committed");
        assert_eq!(history["pending"], json!([]));

        let (_, timeline) = send(&router, get("/hand/timeline")).await;
        assert_eq!(timeline["cursors"].as_array().map(Vec::len), Some(3));

        operator.shutdown();
    }

    #[tokio::test]
    async fn snapshot_clamps_and_defaults_to_the_end() {
        let (router, operator, mut events) = setup();
        send(
            &router,
            post_json("/fragments", json!({ "fragment": "Ann and Bo post the blinds" })),
        )
        .await;
        events.recv().await.unwrap();

        let (status, body) = send(&router, get("/hand/snapshot?round=7&action=9")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cursor"], json!({ "roundIdx": 0, "actionIdx": 1 }));
        assert_eq!(body["snapshot"]["players"][1]["wager"], 2);

        let (_, end) = send(&router, get("/hand/snapshot")).await;
        assert_eq!(end["cursor"], body["cursor"]);

        let (_, start) = send(&router, get("/hand/snapshot?round=0")).await;
        assert_eq!(start["cursor"], json!({ "roundIdx": 0, "actionIdx": -1 }));

        let (status, _) = send(&router, get("/hand/snapshot?action=1")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        operator.shutdown();
    }

    #[tokio::test]
    async fn blank_fragments_are_rejected_and_reset_is_queued() {
        let (router, operator, mut events) = setup();

        let (status, _) = send(&router, post_json("/fragments", json!({ "fragment": "   " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&router, post_json("/hand/reset", json!({}))).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "queued");
        assert!(matches!(
            events.recv().await.unwrap(),
            ReconcileEvent::Reset { .. }
        ));

        operator.shutdown();
        let (status, _) = send(
            &router,
            post_json("/fragments", json!({ "fragment": "too late" })),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
