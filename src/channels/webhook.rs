//! HTTP ingress for an external chat adapter.
//!
//! The adapter posts each chat message to `POST /api/command` and receives the
//! bridge's reply in the same HTTP response. `GET /api/health` is always open;
//! the command route requires `Authorization: Bearer <secret>` when a secret
//! is configured.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock, mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
use crate::config::WebhookConfig;
use crate::error::ChannelError;

const CHANNEL_NAME: &str = "webhook";

/// How long a request waits for the bridge before giving up with `504`.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub user_id: String,
    pub content: String,
    /// Adapter routing data, echoed back in the response.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CommandResponse {
    /// `None` when the message was not a command the bridge answers.
    pub reply: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    channel: &'static str,
}

type PendingReplies = HashMap<Uuid, oneshot::Sender<Option<String>>>;

struct WebhookState {
    msg_tx: RwLock<Option<mpsc::Sender<IncomingMessage>>>,
    pending: Mutex<PendingReplies>,
    secret: Option<SecretString>,
    reply_timeout: Duration,
}

/// Webhook channel: one HTTP request per chat message.
pub struct WebhookChannel {
    config: WebhookConfig,
    state: Arc<WebhookState>,
    bound_addr: RwLock<Option<SocketAddr>>,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
}

impl WebhookChannel {
    pub fn new(config: WebhookConfig) -> Self {
        Self::with_reply_timeout(config, DEFAULT_REPLY_TIMEOUT)
    }

    pub fn with_reply_timeout(config: WebhookConfig, reply_timeout: Duration) -> Self {
        let state = Arc::new(WebhookState {
            msg_tx: RwLock::new(None),
            pending: Mutex::new(HashMap::new()),
            secret: config.secret.clone(),
            reply_timeout,
        });
        Self {
            config,
            state,
            bound_addr: RwLock::new(None),
            shutdown_tx: Mutex::new(None),
        }
    }

    /// Address the server is listening on once started.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        *self.bound_addr.read().await
    }

    /// Routes served by this channel.
    pub fn router(&self) -> Router {
        build_router(Arc::clone(&self.state))
    }

    /// Open the inbound message pipeline without binding a listener.
    async fn attach(&self) -> MessageStream {
        let (tx, rx) = mpsc::channel(64);
        *self.state.msg_tx.write().await = Some(tx);
        Box::pin(ReceiverStream::new(rx))
    }

    async fn complete(
        &self,
        msg: &IncomingMessage,
        reply: Option<String>,
    ) -> Result<(), ChannelError> {
        let sender = self.state.pending.lock().await.remove(&msg.id);
        let sender = sender.ok_or_else(|| ChannelError::SendFailed {
            name: CHANNEL_NAME.to_string(),
            reason: format!("no pending request for message {}", msg.id),
        })?;
        sender.send(reply).map_err(|_| ChannelError::SendFailed {
            name: CHANNEL_NAME.to_string(),
            reason: "client went away before the reply was ready".to_string(),
        })
    }
}

fn build_router(state: Arc<WebhookState>) -> Router {
    let public = Router::new().route("/api/health", get(health_handler));

    let protected = Router::new()
        .route("/api/command", post(command_handler))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_secret,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn require_secret(
    State(state): State<Arc<WebhookState>>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(secret) = &state.secret else {
        return Ok(next.run(req).await);
    };

    let presented = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if presented == Some(secret.expose_secret()) {
        Ok(next.run(req).await)
    } else {
        tracing::warn!("Rejected webhook request with missing or wrong secret");
        Err(StatusCode::UNAUTHORIZED)
    }
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        channel: CHANNEL_NAME,
    })
}

async fn command_handler(
    State(state): State<Arc<WebhookState>>,
    Json(req): Json<CommandRequest>,
) -> Result<Json<CommandResponse>, (StatusCode, String)> {
    let user_id = req.user_id.trim();
    if user_id.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "user_id is required".to_string()));
    }

    let msg = IncomingMessage::new(CHANNEL_NAME, user_id, &req.content)
        .with_metadata(req.metadata.clone());
    let msg_id = msg.id;

    let (reply_tx, reply_rx) = oneshot::channel();
    state.pending.lock().await.insert(msg_id, reply_tx);

    let sent = {
        let tx_guard = state.msg_tx.read().await;
        match tx_guard.as_ref() {
            Some(tx) => tx.send(msg).await.map_err(|_| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Channel closed".to_string(),
                )
            }),
            None => Err((
                StatusCode::SERVICE_UNAVAILABLE,
                "Channel not started".to_string(),
            )),
        }
    };
    if let Err(rejection) = sent {
        state.pending.lock().await.remove(&msg_id);
        return Err(rejection);
    }

    let reply = match tokio::time::timeout(state.reply_timeout, reply_rx).await {
        Ok(Ok(reply)) => reply,
        Ok(Err(_)) => {
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Message dropped without a reply".to_string(),
            ));
        }
        Err(_) => {
            state.pending.lock().await.remove(&msg_id);
            tracing::warn!(%msg_id, "No reply within {:?}", state.reply_timeout);
            return Err((
                StatusCode::GATEWAY_TIMEOUT,
                "Timed out waiting for a reply".to_string(),
            ));
        }
    };

    Ok(Json(CommandResponse {
        reply,
        metadata: req.metadata,
    }))
}

#[async_trait]
impl Channel for WebhookChannel {
    fn name(&self) -> &str {
        CHANNEL_NAME
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let host = self.config.host.as_str();
        let port = self.config.port;
        let listener = tokio::net::TcpListener::bind((host, port))
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: CHANNEL_NAME.to_string(),
                reason: format!("Failed to bind to {host}:{port}: {e}"),
            })?;
        let bound = listener
            .local_addr()
            .map_err(|e| ChannelError::StartupFailed {
                name: CHANNEL_NAME.to_string(),
                reason: format!("Failed to get local addr: {e}"),
            })?;

        let stream = self.attach().await;
        let app = self.router();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        *self.shutdown_tx.lock().await = Some(shutdown_tx);
        *self.bound_addr.write().await = Some(bound);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                    tracing::info!("Webhook server shutting down");
                })
                .await
            {
                tracing::error!("Webhook server error: {}", e);
            }
        });

        tracing::info!("Webhook listening on http://{}", bound);
        Ok(stream)
    }

    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        self.complete(msg, Some(response.content)).await
    }

    async fn no_reply(&self, msg: &IncomingMessage) -> Result<(), ChannelError> {
        self.complete(msg, None).await
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        if self.state.msg_tx.read().await.is_some() {
            Ok(())
        } else {
            Err(ChannelError::HealthCheckFailed {
                name: CHANNEL_NAME.to_string(),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        if let Some(tx) = self.shutdown_tx.lock().await.take() {
            let _ = tx.send(());
        }
        *self.state.msg_tx.write().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use futures::StreamExt;
    use http_body_util::BodyExt;
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    fn config(secret: Option<&str>) -> WebhookConfig {
        WebhookConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            secret: secret.map(SecretString::from),
        }
    }

    /// Answers "/ping" with "pong" and stays silent on everything else.
    async fn spawn_responder(channel: Arc<WebhookChannel>) {
        let mut stream = channel.attach().await;
        tokio::spawn(async move {
            while let Some(msg) = stream.next().await {
                if msg.content == "/ping" {
                    let reply = OutgoingResponse::text(format!("pong {}", msg.user_id));
                    channel.respond(&msg, reply).await.unwrap();
                } else {
                    channel.no_reply(&msg).await.unwrap();
                }
            }
        });
    }

    fn command_request(body: serde_json::Value, bearer: Option<&str>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder()
            .method("POST")
            .uri("/api/command")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn read_json(response: Response) -> CommandResponse {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_open() {
        let channel = WebhookChannel::new(config(Some("s3cret")));
        let response = channel
            .router()
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn command_round_trip() {
        let channel = Arc::new(WebhookChannel::new(config(None)));
        spawn_responder(Arc::clone(&channel)).await;

        let body = serde_json::json!({
            "user_id": "10001",
            "content": "/ping",
            "metadata": {"group": "42"}
        });
        let response = channel
            .router()
            .oneshot(command_request(body, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            read_json(response).await,
            CommandResponse {
                reply: Some("pong 10001".to_string()),
                metadata: serde_json::json!({"group": "42"}),
            }
        );
    }

    #[tokio::test]
    async fn unanswered_message_yields_null_reply() {
        let channel = Arc::new(WebhookChannel::new(config(None)));
        spawn_responder(Arc::clone(&channel)).await;

        let body = serde_json::json!({"user_id": "10001", "content": "just chatting"});
        let response = channel
            .router()
            .oneshot(command_request(body, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await.reply, None);
    }

    #[tokio::test]
    async fn secret_is_enforced() {
        let channel = Arc::new(WebhookChannel::new(config(Some("s3cret"))));
        spawn_responder(Arc::clone(&channel)).await;
        let body = serde_json::json!({"user_id": "1", "content": "/ping"});

        let missing = channel
            .router()
            .oneshot(command_request(body.clone(), None))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let wrong = channel
            .router()
            .oneshot(command_request(body.clone(), Some("nope")))
            .await
            .unwrap();
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

        let right = channel
            .router()
            .oneshot(command_request(body, Some("s3cret")))
            .await
            .unwrap();
        assert_eq!(right.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn rejects_blank_user_and_unstarted_channel() {
        let channel = WebhookChannel::new(config(None));
        assert!(channel.health_check().await.is_err());

        let unstarted = channel
            .router()
            .oneshot(command_request(
                serde_json::json!({"user_id": "1", "content": "/ping"}),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(unstarted.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(channel.state.pending.lock().await.is_empty());

        let blank = channel
            .router()
            .oneshot(command_request(
                serde_json::json!({"user_id": "  ", "content": "/ping"}),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(blank.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unanswered_request_times_out_and_forgets_the_message() {
        let channel = Arc::new(WebhookChannel::with_reply_timeout(
            config(None),
            Duration::from_millis(50),
        ));
        // Attached but nobody ever answers.
        let _stream = channel.attach().await;

        let body = serde_json::json!({"user_id": "10001", "content": "/ping"});
        let response = channel
            .router()
            .oneshot(command_request(body, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert!(channel.state.pending.lock().await.is_empty());
    }

    #[tokio::test]
    async fn start_binds_an_ephemeral_port() {
        let channel = WebhookChannel::new(config(None));
        let _stream = channel.start().await.unwrap();
        let addr = channel.local_addr().await.unwrap();
        assert_ne!(addr.port(), 0);
        assert!(channel.health_check().await.is_ok());
        channel.shutdown().await.unwrap();
        assert!(channel.health_check().await.is_err());
    }
}
