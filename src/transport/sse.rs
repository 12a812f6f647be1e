//! Push transport: a server-sent event stream per client plus a POST endpoint
//! for submissions, correlated by an opaque session id.
//!
//! Routes: `GET /sse` (event stream), `POST /message?sessionId=` (submit),
//! `GET /health` (liveness).

use crate::error::{ProtocolError, ProtocolResult, Result};
use crate::protocol::codec::salvage_id;
use crate::protocol::{JsonRpcError, JsonRpcResponse, McpServer, Message, Session, TransportKind};
use crate::transport::ChannelTransport;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use dashmap::DashMap;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Path clients POST submissions to.
pub const MESSAGE_PATH: &str = "/message";

struct PushSession {
    submit: mpsc::Sender<Message>,
    session: Arc<Session>,
}

/// A freshly opened push session.
pub struct PushConnection {
    pub session: Arc<Session>,
    /// Server side of the session, to be driven by the session loop.
    pub transport: ChannelTransport,
    /// Everything the server sends to this client.
    pub events: mpsc::Receiver<Message>,
}

/// Table of live push sessions, keyed by session id.
pub struct SessionHub {
    sessions: DashMap<String, PushSession>,
    capacity: usize,
}

impl SessionHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            capacity,
        }
    }

    pub fn connect(&self) -> PushConnection {
        let session = Arc::new(Session::with_id(
            Uuid::new_v4().to_string(),
            TransportKind::Push,
        ));
        let (submit_tx, submit_rx) = mpsc::channel(self.capacity);
        let (push_tx, push_rx) = mpsc::channel(self.capacity);

        self.sessions.insert(
            session.id().to_string(),
            PushSession {
                submit: submit_tx,
                session: Arc::clone(&session),
            },
        );
        debug!(session = %session.id(), "Push session connected");

        PushConnection {
            session,
            transport: ChannelTransport::new(submit_rx, push_tx),
            events: push_rx,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions
            .get(id)
            .is_some_and(|entry| !entry.session.is_closed())
    }

    /// Sender feeding the session's loop, for in-process clients.
    pub fn submitter(&self, id: &str) -> Option<mpsc::Sender<Message>> {
        self.sessions
            .get(id)
            .filter(|entry| !entry.session.is_closed())
            .map(|entry| entry.submit.clone())
    }

    /// Queue a message for the session's loop.
    pub async fn submit(&self, id: &str, message: Message) -> ProtocolResult<()> {
        // The sender is cloned out so no map guard is held across the await.
        let sender = self.submitter(id).ok_or(ProtocolError::SessionClosed)?;

        sender.send(message).await.map_err(|_| {
            self.disconnect(id);
            ProtocolError::SessionClosed
        })
    }

    /// Forget a session and mark it closed. Pending results are discarded.
    pub fn disconnect(&self, id: &str) {
        if let Some((_, entry)) = self.sessions.remove(id) {
            entry.session.close();
            debug!(session = %id, "Push session disconnected");
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub server: Arc<McpServer>,
    pub hub: Arc<SessionHub>,
}

impl AppState {
    pub fn new(server: Arc<McpServer>) -> Self {
        let hub = Arc::new(SessionHub::new(server.limits().channel_capacity));
        Self { server, hub }
    }
}

/// Removes the session from the hub when the event stream is dropped.
struct DisconnectGuard {
    hub: Arc<SessionHub>,
    id: String,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        self.hub.disconnect(&self.id);
    }
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/sse", get(open_stream))
        .route(MESSAGE_PATH, post(submit))
        .route("/health", get(health))
        .with_state(state)
}

/// Bind `addr` and serve push sessions until the listener fails.
pub async fn serve(server: Arc<McpServer>, addr: &str) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "SSE transport listening");

    axum::serve(listener, build_router(AppState::new(server))).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn open_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let PushConnection {
        session,
        transport,
        events,
    } = state.hub.connect();
    let id = session.id().to_string();

    let server = Arc::clone(&state.server);
    tokio::spawn(async move { server.serve_session(transport, session).await });

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("{MESSAGE_PATH}?sessionId={id}"));
    let guard = DisconnectGuard {
        hub: Arc::clone(&state.hub),
        id,
    };
    let messages = ReceiverStream::new(events).filter_map(move |message| {
        let _guard = &guard;
        futures::future::ready(message_event(&message))
    });

    Sse::new(stream::once(futures::future::ready(Ok(endpoint))).chain(messages))
        .keep_alive(KeepAlive::default())
}

fn message_event(message: &Message) -> Option<std::result::Result<Event, Infallible>> {
    match serde_json::to_string(message) {
        Ok(data) => Some(Ok(Event::default().event("message").data(data))),
        Err(e) => {
            warn!("Dropping unencodable message: {}", e);
            None
        }
    }
}

async fn submit(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
    body: String,
) -> Response {
    if !state.hub.contains(&query.session_id) {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": format!("unknown session: {}", query.session_id)})),
        )
            .into_response();
    }

    let message = match state.server.codec().decode(&body) {
        Ok(message) => message,
        Err(e) => {
            warn!(session = %query.session_id, "Rejected submission: {}", e);
            let response = JsonRpcResponse::error(salvage_id(&body), JsonRpcError::from(&e));
            return (StatusCode::BAD_REQUEST, Json(response)).into_response();
        }
    };

    match state.hub.submit(&query.session_id, message).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => (StatusCode::NOT_FOUND, Json(json!({"error": e.to_string()}))).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{JsonRpcRequest, McpServerBuilder};
    use crate::server::{McpHandler, ServerStateBuilder};
    use axum::body::{Body, BodyDataStream};
    use axum::http::Request;
    use tower::ServiceExt;

    fn state() -> AppState {
        let handler = McpHandler::new(Arc::new(ServerStateBuilder::new().build().unwrap()));
        let server = McpServerBuilder::new().handler(handler).build().unwrap();
        AppState::new(Arc::new(server))
    }

    fn post(uri: &str, body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), 8192)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    /// Next complete SSE event, skipping keep-alive comments.
    async fn next_event(stream: &mut BodyDataStream, buf: &mut String) -> String {
        loop {
            if let Some(end) = buf.find("\n\n") {
                let event = buf[..end].to_string();
                buf.drain(..end + 2);
                if event.starts_with(':') {
                    continue;
                }
                return event;
            }
            let chunk = stream.next().await.unwrap().unwrap();
            buf.push_str(std::str::from_utf8(&chunk).unwrap());
        }
    }

    fn event_data(event: &str) -> &str {
        event
            .lines()
            .find_map(|line| line.strip_prefix("data: "))
            .unwrap()
    }

    #[tokio::test]
    async fn test_event_stream_round_trip() {
        let state = state();
        let request = Request::builder().uri("/sse").body(Body::empty()).unwrap();
        let response = build_router(state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let mut stream = response.into_body().into_data_stream();
        let mut buf = String::new();

        let first = next_event(&mut stream, &mut buf).await;
        assert!(first.starts_with("event: endpoint\n"));
        let endpoint = event_data(&first).to_string();
        let session_id = endpoint
            .strip_prefix("/message?sessionId=")
            .unwrap()
            .to_string();
        assert!(Uuid::parse_str(&session_id).is_ok());
        assert!(state.hub.contains(&session_id));

        let response = build_router(state.clone())
            .oneshot(post(&endpoint, r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let event = next_event(&mut stream, &mut buf).await;
        assert!(event.starts_with("event: message\n"));
        let envelope: serde_json::Value = serde_json::from_str(event_data(&event)).unwrap();
        assert_eq!(envelope["jsonrpc"], "2.0");
        assert_eq!(envelope["id"], 1);
        assert_eq!(envelope["result"], json!({}));

        // Client goes away: the session is closed and forgotten.
        drop(stream);
        assert!(!state.hub.contains(&session_id));
        assert!(state.hub.submitter(&session_id).is_none());

        let response = build_router(state)
            .oneshot(post(&endpoint, r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = build_router(state()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("ok"));
    }

    #[tokio::test]
    async fn test_submit_to_unknown_session() {
        let response = build_router(state())
            .oneshot(post(
                "/message?sessionId=nope",
                r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_submit_accepted_and_answered_on_stream() {
        let state = state();
        let mut connection = state.hub.connect();
        let uri = format!("/message?sessionId={}", connection.session.id());

        let server = Arc::clone(&state.server);
        let (session, transport) = (Arc::clone(&connection.session), connection.transport);
        tokio::spawn(async move { server.serve_session(transport, session).await });

        let request = Request::builder()
            .method("POST")
            .uri(&uri)
            .body(Body::from(r#"{"jsonrpc":"2.0","id":"p1","method":"ping"}"#))
            .unwrap();
        let response = build_router(state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        match connection.events.recv().await.unwrap() {
            Message::Response(response) => {
                assert_eq!(response.id, Some("p1".into()));
                assert!(!response.is_error());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_submit_garbage_is_bad_request() {
        let state = state();
        let connection = state.hub.connect();
        let uri = format!("/message?sessionId={}", connection.session.id());

        let request = Request::builder()
            .method("POST")
            .uri(&uri)
            .body(Body::from("{oops"))
            .unwrap();
        let response = build_router(state).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("-32700"));
    }

    #[tokio::test]
    async fn test_disconnect_closes_session() {
        let hub = SessionHub::new(4);
        let connection = hub.connect();
        let id = connection.session.id().to_string();
        assert!(hub.contains(&id));

        hub.disconnect(&id);
        assert!(connection.session.is_closed());
        assert!(!hub.contains(&id));
        assert!(hub.is_empty());

        let err = hub
            .submit(&id, JsonRpcRequest::new("ping").with_id(1).into())
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::SessionClosed));
    }
}
