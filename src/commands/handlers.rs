//! Command handlers.
//!
//! One handler per command family. Each returns the success reply or a
//! [`CommandError`]; [`Dispatcher::handle`] renders errors so nothing
//! escapes a single message.

use std::sync::Arc;

use crate::auth::{self, BotKeyAuth};
use crate::backend::{Backend, BackendRequest, BackendResponse, endpoints};
use crate::channels::IncomingMessage;
use crate::commands::{CommandKind, Route, Router, help_text, render_error};
use crate::config::Config;
use crate::db::CredentialStore;
use crate::error::{CommandError, DatabaseError};
use crate::interpret::{self, expect_ok, friends, metrics, permission, tickets};

const BIND_SUCCESS: &str = "绑定成功！请及时撤回您的botToken信息！";
const UNBIND_SUCCESS: &str = "解绑成功！";

/// Routes chat messages and runs the matching command.
pub struct Dispatcher {
    config: Arc<Config>,
    store: Arc<dyn CredentialStore>,
    backend: Arc<dyn Backend>,
    router: Router,
}

impl Dispatcher {
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn CredentialStore>,
        backend: Arc<dyn Backend>,
    ) -> Self {
        let router = Router::new().with_prefix(config.bot.command_prefix.clone());
        Self {
            config,
            store,
            backend,
            router,
        }
    }

    /// Reply for one message, or `None` when the bot should stay silent.
    pub async fn handle(&self, message: &IncomingMessage) -> Option<String> {
        let prefix = self.router.prefix();
        match self.router.route(&message.content)? {
            Route::Command { kind, argument } => {
                tracing::debug!(
                    channel = %message.channel,
                    command = kind.name(),
                    "Dispatching command"
                );
                let reply = match self.execute(kind, &message.user_id, &argument).await {
                    Ok(reply) => reply,
                    Err(err) => {
                        tracing::debug!(command = kind.name(), error = %err, "Command failed");
                        render_error(kind, &err, prefix)
                    }
                };
                Some(reply)
            }
            Route::Unknown { name, suggestion } => {
                let suggestion = suggestion?;
                Some(format!(
                    "未知指令：{name}。您是不是想使用 {prefix}{suggestion}？发送 {prefix}help 查看全部指令。"
                ))
            }
        }
    }

    /// Run one command for `identity`.
    pub async fn execute(
        &self,
        kind: CommandKind,
        identity: &str,
        argument: &str,
    ) -> Result<String, CommandError> {
        match kind {
            CommandKind::Help => Ok(help_text(self.router.prefix())),
            CommandKind::Bind => self.bind(identity, argument).await,
            _ => {
                // The binding check comes first so an unbound identity never
                // reaches argument validation or the network.
                let auth = auth::resolve(self.store.as_ref(), identity).await?;
                self.run_authorized(kind, identity, &auth, argument).await
            }
        }
    }

    async fn send(&self, request: BackendRequest) -> Result<BackendResponse, CommandError> {
        let response = self.backend.call(request).await.map_err(|e| {
            tracing::warn!("Turbo backend call failed: {}", e);
            CommandError::from(e)
        })?;
        expect_ok(response)
    }

    async fn bind(&self, identity: &str, argument: &str) -> Result<String, CommandError> {
        let token = argument.trim();
        if token.is_empty() {
            return Err(CommandError::MissingArgument);
        }
        auth::ensure_unbound(self.store.as_ref(), identity).await?;

        let response = self
            .send(endpoints::bind(token, &self.config.bot.bot_name))
            .await?;
        let key = interpret::bind_key(&response)?;

        match self.store.create(identity, token, &key).await {
            Ok(()) => {
                tracing::info!(identity, "Bound chat identity to Turbo bot key");
                Ok(BIND_SUCCESS.to_string())
            }
            Err(DatabaseError::DuplicateIdentity(_)) => {
                tracing::warn!(identity, "Concurrent bind lost the race");
                Err(CommandError::AlreadyBound)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn unbind(&self, identity: &str, auth: &BotKeyAuth) -> Result<String, CommandError> {
        let remote = self.send(endpoints::unbind(auth)).await;

        // Local state is cleared whatever the backend said.
        self.store.delete(identity).await?;
        tracing::info!(identity, remote_ok = remote.is_ok(), "Removed local binding");

        match remote {
            Ok(_) => Ok(UNBIND_SUCCESS.to_string()),
            Err(err) => {
                let prefix = self.router.prefix();
                Ok(format!(
                    "{}\n本地绑定记录已删除，可使用{prefix}bind 重新绑定。",
                    render_error(CommandKind::Unbind, &err, prefix)
                ))
            }
        }
    }

    async fn run_authorized(
        &self,
        kind: CommandKind,
        identity: &str,
        auth: &BotKeyAuth,
        argument: &str,
    ) -> Result<String, CommandError> {
        let argument = argument.trim();
        match kind {
            CommandKind::Help => Ok(help_text(self.router.prefix())),
            // A resolved credential means the identity is already bound.
            CommandKind::Bind => Err(CommandError::AlreadyBound),
            CommandKind::Unbind => self.unbind(identity, auth).await,
            CommandKind::SetName => {
                let name = required(argument)?;
                self.send(endpoints::set_name(auth, name)).await?;
                Ok("名称修改成功！".to_string())
            }
            CommandKind::ResetName => {
                self.send(endpoints::reset_name(auth)).await?;
                Ok("名称重置成功！".to_string())
            }
            CommandKind::ShowName => {
                let response = self.send(endpoints::show_name(auth)).await?;
                Ok(format!("您当前的ID为：{}", response.text()))
            }
            CommandKind::SetTicket => {
                let ticket_id =
                    tickets::parse_ticket_id(argument).ok_or(CommandError::MissingArgument)?;
                self.send(endpoints::set_ticket(auth, ticket_id)).await?;
                Ok(format!(
                    "用户功能票成功锁定为：{}",
                    tickets::describe(ticket_id)
                ))
            }
            CommandKind::ResetTicket => {
                self.send(endpoints::reset_ticket(auth)).await?;
                Ok("用户功能票取消锁定成功！".to_string())
            }
            CommandKind::ShowTicket => {
                let response = self.send(endpoints::current_tickets(auth)).await?;
                tickets::show_ticket_reply(&response)
            }
            CommandKind::Network => {
                let response = self.send(endpoints::server_requests(auth)).await?;
                metrics::network_reply(&response)
            }
            CommandKind::ShowPermission => {
                let level = self.send(endpoints::show_permission(auth)).await?;
                let mut reply = permission::level_line(&level);
                let detail = self.backend.call(endpoints::turbo_permission(auth)).await?;
                reply.push_str(&permission::detail_section(&detail));
                Ok(reply)
            }
            CommandKind::ShowFriends => {
                let page = friends::parse_page(argument);
                let response = self.send(endpoints::show_friends(auth, page)).await?;
                friends::friends_reply(&response, page)
            }
            CommandKind::ShowFriendRequests => {
                let response = self.send(endpoints::friend_requests(auth)).await?;
                friends::friend_requests_reply(&response)
            }
            CommandKind::AddFriend => {
                let name = required(argument)?;
                self.send(endpoints::friend_action(endpoints::ADD_FRIEND, auth, name))
                    .await?;
                Ok(format!("好友请求已发送给：{name}"))
            }
            CommandKind::AcceptFriend => {
                let name = required(argument)?;
                self.send(endpoints::friend_action(endpoints::ACCEPT_FRIEND, auth, name))
                    .await?;
                Ok(format!("您已接受 {name} 的好友请求。"))
            }
            CommandKind::DenyFriend => {
                let name = required(argument)?;
                self.send(endpoints::friend_action(endpoints::DENY_FRIEND, auth, name))
                    .await?;
                Ok(format!("您已拒绝 {name} 的好友请求。"))
            }
            CommandKind::RemoveFriend => {
                let name = required(argument)?;
                self.send(endpoints::friend_action(endpoints::REMOVE_FRIEND, auth, name))
                    .await?;
                Ok(format!("您已成功删除好友：{name}"))
            }
            CommandKind::ArcadeInfo => {
                let arcade = required(argument)?;
                let response = self.send(endpoints::arcade_info(auth, arcade)).await?;
                metrics::arcade_reply(&response)
            }
        }
    }
}

fn required(argument: &str) -> Result<&str, CommandError> {
    if argument.is_empty() {
        Err(CommandError::MissingArgument)
    } else {
        Ok(argument)
    }
}
