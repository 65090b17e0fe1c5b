//! Request builders for every Turbo endpoint the bot uses.

use secrecy::ExposeSecret;
use serde_json::json;

use super::BackendRequest;
use crate::auth::BotKeyAuth;

pub const BIND: &str = "/bot/bind";
pub const UNBIND: &str = "/bot/unbind";
pub const SET_NAME: &str = "/web/setMaimaiName";
pub const RESET_NAME: &str = "/web/resetMaimaiName";
pub const SHOW_NAME: &str = "/web/showMaimaiName";
pub const SET_TICKET: &str = "/web/setTickets";
pub const RESET_TICKET: &str = "/web/resetTickets";
pub const CURRENT_TICKETS: &str = "/web/currentTickets";
pub const SERVER_REQUESTS: &str = "/web/showServerRequests";
pub const SHOW_PERMISSION: &str = "/permission/showPermission";
pub const TURBO_PERMISSION: &str = "/web/showTurboPermission";
pub const SHOW_FRIENDS: &str = "/web/showFriends";
pub const FRIEND_REQUESTS: &str = "/web/showFriendRequests";
pub const ADD_FRIEND: &str = "/web/addFriend";
pub const ACCEPT_FRIEND: &str = "/web/acceptFriend";
pub const DENY_FRIEND: &str = "/web/denyFriend";
pub const REMOVE_FRIEND: &str = "/web/removeFriend";
pub const ARCADE_INFO: &str = "/web/arcadeInfoDetail";

/// Exchange a user-supplied token for a bot key. Unauthenticated.
pub fn bind(token: &str, bot_name: &str) -> BackendRequest {
    BackendRequest::post(BIND).json(json!({
        "botToken": token,
        "botName": bot_name,
    }))
}

/// Revoke the bot key. The key travels both in the header and the body.
pub fn unbind(auth: &BotKeyAuth) -> BackendRequest {
    BackendRequest::post(UNBIND)
        .authorized(auth)
        .json(json!({ "botKey": auth.key().expose_secret() }))
}

pub fn set_name(auth: &BotKeyAuth, name: &str) -> BackendRequest {
    BackendRequest::post(SET_NAME)
        .authorized(auth)
        .json(json!({ "maimaiName": name }))
}

pub fn reset_name(auth: &BotKeyAuth) -> BackendRequest {
    BackendRequest::post(RESET_NAME).authorized(auth)
}

pub fn show_name(auth: &BotKeyAuth) -> BackendRequest {
    BackendRequest::get(SHOW_NAME).authorized(auth)
}

pub fn set_ticket(auth: &BotKeyAuth, ticket_id: u32) -> BackendRequest {
    BackendRequest::post(SET_TICKET)
        .authorized(auth)
        .json(json!({ "ticketId": ticket_id }))
}

pub fn reset_ticket(auth: &BotKeyAuth) -> BackendRequest {
    BackendRequest::post(RESET_TICKET).authorized(auth)
}

pub fn current_tickets(auth: &BotKeyAuth) -> BackendRequest {
    BackendRequest::get(CURRENT_TICKETS).authorized(auth)
}

pub fn server_requests(auth: &BotKeyAuth) -> BackendRequest {
    BackendRequest::get(SERVER_REQUESTS).authorized(auth)
}

pub fn show_permission(auth: &BotKeyAuth) -> BackendRequest {
    BackendRequest::get(SHOW_PERMISSION).authorized(auth)
}

pub fn turbo_permission(auth: &BotKeyAuth) -> BackendRequest {
    BackendRequest::get(TURBO_PERMISSION).authorized(auth)
}

pub fn show_friends(auth: &BotKeyAuth, page: u32) -> BackendRequest {
    BackendRequest::get(SHOW_FRIENDS)
        .authorized(auth)
        .query("page", page.to_string())
}

pub fn friend_requests(auth: &BotKeyAuth) -> BackendRequest {
    BackendRequest::get(FRIEND_REQUESTS).authorized(auth)
}

/// Friend mutations share one body shape and differ only in path.
pub fn friend_action(path: &'static str, auth: &BotKeyAuth, turbo_name: &str) -> BackendRequest {
    BackendRequest::post(path)
        .authorized(auth)
        .json(json!({ "turboName": turbo_name }))
}

pub fn arcade_info(auth: &BotKeyAuth, arcade_name: &str) -> BackendRequest {
    BackendRequest::get(ARCADE_INFO)
        .authorized(auth)
        .query("arcadeName", arcade_name)
}
