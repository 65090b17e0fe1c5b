//! Message pump between a channel and the dispatcher.
//!
//! Each inbound message runs on its own task, so a slow backend call for one
//! user never holds up another.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::{FutureExt, StreamExt};
use tokio::task::JoinSet;

use crate::channels::{Channel, IncomingMessage, OutgoingResponse};
use crate::commands::Dispatcher;
use crate::error::ChannelError;

/// Reply sent when handling a command panicked.
pub const INTERNAL_ERROR_TEXT: &str = "处理指令时出现内部错误，请稍后再试。";

/// Drive `channel` until its stream ends, then shut it down.
pub async fn run(channel: Arc<dyn Channel>, dispatcher: Arc<Dispatcher>) -> Result<(), ChannelError> {
    let mut stream = channel.start().await?;
    if let Err(e) = channel.health_check().await {
        tracing::error!(channel = channel.name(), "Channel unhealthy after start: {}", e);
        channel.shutdown().await?;
        return Err(e);
    }
    tracing::info!(channel = channel.name(), "Bridge started");

    let mut tasks = JoinSet::new();
    while let Some(msg) = stream.next().await {
        let channel = Arc::clone(&channel);
        let dispatcher = Arc::clone(&dispatcher);
        tasks.spawn(async move {
            handle_message(channel.as_ref(), &dispatcher, msg).await;
        });
        // Reap finished tasks so the set does not grow without bound.
        while tasks.try_join_next().is_some() {}
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            tracing::error!("Message task failed: {}", e);
        }
    }

    tracing::info!(channel = channel.name(), "Bridge stopped");
    channel.shutdown().await
}

/// Handle one message and deliver the outcome on `channel`.
///
/// A panic while handling still produces a reply, so a waiting caller is
/// always answered.
pub async fn handle_message(channel: &dyn Channel, dispatcher: &Dispatcher, msg: IncomingMessage) {
    let outcome = AssertUnwindSafe(dispatcher.handle(&msg)).catch_unwind().await;
    let delivered = match outcome {
        Ok(Some(reply)) => channel.respond(&msg, OutgoingResponse::text(reply)).await,
        Ok(None) => channel.no_reply(&msg).await,
        Err(_) => {
            tracing::error!(
                channel = channel.name(),
                user = %msg.user_id,
                "Command handler panicked"
            );
            channel
                .respond(&msg, OutgoingResponse::text(INTERNAL_ERROR_TEXT))
                .await
        }
    };

    if let Err(e) = delivered {
        tracing::warn!(
            channel = channel.name(),
            user = %msg.user_id,
            "Failed to deliver reply: {}",
            e
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use crate::backend::{Backend, BackendRequest, BackendResponse};
    use crate::channels::MessageStream;
    use crate::config::{BackendConfig, BotConfig, Config, StoreConfig, WebhookConfig};
    use crate::db::{CredentialStore, LibSqlBackend};
    use crate::error::BackendError;

    struct ScriptedChannel {
        inbound: Mutex<Vec<IncomingMessage>>,
        replies: Mutex<Vec<(String, String)>>,
        silent: Mutex<Vec<String>>,
        shut_down: Mutex<bool>,
        healthy: bool,
    }

    impl ScriptedChannel {
        fn new(lines: &[(&str, &str)]) -> Self {
            let inbound = lines
                .iter()
                .map(|(user, text)| IncomingMessage::new("scripted", *user, *text))
                .collect();
            Self {
                inbound: Mutex::new(inbound),
                replies: Mutex::new(Vec::new()),
                silent: Mutex::new(Vec::new()),
                shut_down: Mutex::new(false),
                healthy: true,
            }
        }
    }

    #[async_trait]
    impl Channel for ScriptedChannel {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn start(&self) -> Result<MessageStream, ChannelError> {
            let messages = std::mem::take(&mut *self.inbound.lock().unwrap());
            Ok(Box::pin(futures::stream::iter(messages)))
        }

        async fn respond(
            &self,
            msg: &IncomingMessage,
            response: OutgoingResponse,
        ) -> Result<(), ChannelError> {
            self.replies
                .lock()
                .unwrap()
                .push((msg.content.clone(), response.content));
            Ok(())
        }

        async fn no_reply(&self, msg: &IncomingMessage) -> Result<(), ChannelError> {
            self.silent.lock().unwrap().push(msg.content.clone());
            Ok(())
        }

        async fn health_check(&self) -> Result<(), ChannelError> {
            if self.healthy {
                Ok(())
            } else {
                Err(ChannelError::HealthCheckFailed {
                    name: "scripted".to_string(),
                })
            }
        }

        async fn shutdown(&self) -> Result<(), ChannelError> {
            *self.shut_down.lock().unwrap() = true;
            Ok(())
        }
    }

    /// Backend that panics when called.
    struct UnreachableBackend;

    #[async_trait]
    impl Backend for UnreachableBackend {
        async fn call(&self, request: BackendRequest) -> Result<BackendResponse, BackendError> {
            panic!("unexpected backend call to {}", request.path);
        }
    }

    async fn dispatcher(dir: &TempDir) -> Arc<Dispatcher> {
        dispatcher_with(dir, Arc::new(UnreachableBackend)).await
    }

    async fn dispatcher_with(dir: &TempDir, backend: Arc<dyn Backend>) -> Arc<Dispatcher> {
        let config = Config {
            backend: BackendConfig {
                api_base_url: "http://turbo.test".to_string(),
                request_timeout: Duration::from_secs(5),
            },
            store: StoreConfig {
                database_path: dir.path().join("botKey.db"),
            },
            bot: BotConfig {
                bot_name: "测试机".to_string(),
                command_prefix: "/".to_string(),
            },
            webhook: WebhookConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                secret: None,
            },
        };
        let store = LibSqlBackend::new_local(&config.store.database_path)
            .await
            .unwrap();
        store.run_migrations().await.unwrap();
        store.create("10009", "token", "key").await.unwrap();
        Arc::new(Dispatcher::new(Arc::new(config), Arc::new(store), backend))
    }

    #[tokio::test]
    async fn every_message_gets_exactly_one_outcome() {
        let dir = TempDir::new().unwrap();
        let dispatcher = dispatcher(&dir).await;
        let channel = Arc::new(ScriptedChannel::new(&[
            ("10001", "/help"),
            ("10001", "good morning"),
            ("10002", "/showName"),
        ]));

        run(channel.clone(), dispatcher).await.unwrap();

        let mut replies = channel.replies.lock().unwrap().clone();
        replies.sort();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].0, "/help");
        assert!(replies[0].1.contains("/bind"));
        assert_eq!(replies[1].0, "/showName");
        assert_eq!(replies[1].1, "您尚未绑定，请先使用/bind 指令绑定。");

        assert_eq!(*channel.silent.lock().unwrap(), vec!["good morning".to_string()]);
        assert!(*channel.shut_down.lock().unwrap());
    }

    #[tokio::test]
    async fn panicking_handler_still_answers() {
        let dir = TempDir::new().unwrap();
        let dispatcher = dispatcher_with(&dir, Arc::new(UnreachableBackend)).await;
        let channel = Arc::new(ScriptedChannel::new(&[
            ("10009", "/showName"),
            ("10001", "/help"),
        ]));

        run(channel.clone(), dispatcher).await.unwrap();

        let mut replies = channel.replies.lock().unwrap().clone();
        replies.sort();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].0, "/help");
        assert_eq!(
            replies[1],
            ("/showName".to_string(), INTERNAL_ERROR_TEXT.to_string())
        );
        assert!(channel.silent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unhealthy_channel_is_shut_down_without_reading() {
        let dir = TempDir::new().unwrap();
        let dispatcher = dispatcher(&dir).await;
        let mut scripted = ScriptedChannel::new(&[("10001", "/help")]);
        scripted.healthy = false;
        let channel = Arc::new(scripted);

        let err = run(channel.clone(), dispatcher).await.unwrap_err();
        assert!(matches!(err, ChannelError::HealthCheckFailed { .. }));
        assert!(channel.replies.lock().unwrap().is_empty());
        assert!(*channel.shut_down.lock().unwrap());
    }
}
