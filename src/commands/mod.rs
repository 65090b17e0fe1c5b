//! Chat commands.
//!
//! [`router`] turns raw text into a [`CommandKind`] plus argument,
//! [`handlers`] runs it against the store and backend, and
//! [`render_error`] is the one place a [`CommandError`] becomes chat text.

pub mod handlers;
pub mod router;

use crate::error::CommandError;
use crate::interpret::shared_status_text;

pub use self::handlers::Dispatcher;
pub use self::router::{Route, Router};

/// Every command the bot answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Help,
    Bind,
    Unbind,
    SetName,
    ResetName,
    ShowName,
    SetTicket,
    ResetTicket,
    ShowTicket,
    Network,
    ShowPermission,
    ShowFriends,
    ShowFriendRequests,
    AddFriend,
    AcceptFriend,
    DenyFriend,
    RemoveFriend,
    ArcadeInfo,
}

/// Command-specific wording used when rendering failures.
#[derive(Debug, Clone, Copy)]
pub struct CommandTexts {
    /// Verb phrase for "<action>失败" lines.
    pub action: &'static str,
    /// Verb phrase for "<action>过程中出现错误" lines.
    pub transport_action: &'static str,
    pub missing_argument: Option<&'static str>,
    pub bad_request: Option<&'static str>,
    pub forbidden: Option<&'static str>,
}

const BAD_REQUEST: &str = "请求数据不合法，请检查请求。";
const FRIEND_BAD_REQUEST: &str = "请求数据不合法，请检查输入的好友名称。";

impl CommandKind {
    pub const ALL: [CommandKind; 18] = [
        CommandKind::Help,
        CommandKind::Bind,
        CommandKind::Unbind,
        CommandKind::SetName,
        CommandKind::ResetName,
        CommandKind::ShowName,
        CommandKind::SetTicket,
        CommandKind::ResetTicket,
        CommandKind::ShowTicket,
        CommandKind::Network,
        CommandKind::ShowPermission,
        CommandKind::ShowFriends,
        CommandKind::ShowFriendRequests,
        CommandKind::AddFriend,
        CommandKind::AcceptFriend,
        CommandKind::DenyFriend,
        CommandKind::RemoveFriend,
        CommandKind::ArcadeInfo,
    ];

    /// Canonical command name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Bind => "bind",
            Self::Unbind => "unbind",
            Self::SetName => "setName",
            Self::ResetName => "resetName",
            Self::ShowName => "showName",
            Self::SetTicket => "setTicket",
            Self::ResetTicket => "resetTicket",
            Self::ShowTicket => "showTicket",
            Self::Network => "network",
            Self::ShowPermission => "showPermission",
            Self::ShowFriends => "showFriends",
            Self::ShowFriendRequests => "showFriendRequests",
            Self::AddFriend => "addFriend",
            Self::AcceptFriend => "acceptFriend",
            Self::DenyFriend => "denyFriend",
            Self::RemoveFriend => "removeFriend",
            Self::ArcadeInfo => "arcadeInfo",
        }
    }

    /// Alternate names, matched the same way as [`name`](Self::name).
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Help => &["帮助"],
            Self::Bind => &["绑定"],
            Self::Unbind => &["解绑"],
            Self::SetName => &["设置名称", "修改名称"],
            Self::ResetName => &["重置名称", "删除名称"],
            Self::ShowName => &["name", "查询名称", "查看名称"],
            Self::SetTicket => &["设置票", "锁定票"],
            Self::ResetTicket => &["重置票", "取消票"],
            Self::ShowTicket => &["ticket", "查询票", "查看票"],
            Self::Network => &["网络状态", "查询网络"],
            Self::ShowPermission => &["permission", "获取权限", "展示权限", "权限", "权限查询"],
            Self::ShowFriends => &[
                "friends",
                "friendslist",
                "好友",
                "好友列表",
                "查询好友",
                "查看好友",
            ],
            Self::ShowFriendRequests => &["好友请求", "好友请求列表", "查询好友请求"],
            Self::AddFriend => &["add", "加好友", "添加好友", "好友添加"],
            Self::AcceptFriend => &[
                "accept",
                "同意好友",
                "同意好友申请",
                "同意好友请求",
                "接受好友请求",
            ],
            Self::DenyFriend => &["deny", "拒绝好友", "拒绝好友请求", "拒绝好友申请"],
            Self::RemoveFriend => &["remove", "删除好友", "移除好友"],
            Self::ArcadeInfo => &["info", "arcade", "机厅", "查卡", "机厅信息"],
        }
    }

    /// Resolve a name or alias. ASCII names match case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = name.trim();
        if wanted.is_empty() {
            return None;
        }
        Self::ALL.into_iter().find(|kind| {
            std::iter::once(kind.name())
                .chain(kind.aliases().iter().copied())
                .any(|candidate| candidate.eq_ignore_ascii_case(wanted))
        })
    }

    pub fn texts(&self) -> CommandTexts {
        let (action, missing_argument, bad_request, forbidden) = match self {
            Self::Help => ("帮助", None, None, None),
            Self::Bind => ("绑定", Some("绑定命令后需要包含botToken。"), None, None),
            Self::Unbind => ("解绑", None, None, None),
            Self::SetName => (
                "修改名称",
                Some("修改名称命令后需要包含新的名称。"),
                Some("修改名称失败，验证码验证失败或数据不合法。"),
                Some("权限不足，无法修改名称。"),
            ),
            Self::ResetName => (
                "重置名称",
                None,
                Some("重置名称失败，验证码验证失败或数据不合法。"),
                Some("权限不足，无法重置名称。"),
            ),
            Self::ShowName => (
                "获取ID",
                None,
                Some(BAD_REQUEST),
                Some("权限不足，无法获取当前ID。"),
            ),
            Self::SetTicket => (
                "设置票",
                Some("设置票的命令后需要跟一个数字作为ticketId。"),
                Some("设置票失败，验证码验证失败或数据不合法。"),
                Some("权限不足，无法设置票。"),
            ),
            Self::ResetTicket => (
                "取消票",
                None,
                Some("取消票失败，验证码验证失败或数据不合法。"),
                Some("权限不足，无法取消票。"),
            ),
            Self::ShowTicket => (
                "获取功能票信息",
                None,
                Some(BAD_REQUEST),
                Some("权限不足，无法获取功能票信息。"),
            ),
            Self::Network => (
                "获取数据",
                None,
                Some(BAD_REQUEST),
                Some("权限不足，无法获取网络数据。"),
            ),
            Self::ShowPermission => (
                "获取权限信息",
                None,
                Some(BAD_REQUEST),
                Some("权限不足，无法获取权限信息。"),
            ),
            Self::ShowFriends => (
                "获取好友列表",
                None,
                Some(BAD_REQUEST),
                Some("权限不足，无法获取好友列表。"),
            ),
            Self::ShowFriendRequests => (
                "获取好友请求",
                None,
                Some(BAD_REQUEST),
                Some("权限不足，无法获取好友请求。"),
            ),
            Self::AddFriend => (
                "添加好友",
                Some("请提供要添加好友的名称。"),
                Some(FRIEND_BAD_REQUEST),
                Some("权限不足，无法添加好友。"),
            ),
            Self::AcceptFriend => (
                "接受好友请求",
                Some("请提供要接受好友请求的名称。"),
                Some(FRIEND_BAD_REQUEST),
                Some("权限不足，无法接受好友请求。"),
            ),
            Self::DenyFriend => (
                "拒绝好友请求",
                Some("请提供要拒绝的好友请求的名称。"),
                Some(FRIEND_BAD_REQUEST),
                Some("权限不足，无法拒绝好友请求。"),
            ),
            Self::RemoveFriend => (
                "删除好友",
                Some("请提供要删除的好友名称。"),
                Some(FRIEND_BAD_REQUEST),
                Some("权限不足，无法删除好友。"),
            ),
            Self::ArcadeInfo => (
                "获取机厅信息",
                Some("请提供要查询的机厅名称。"),
                Some("请求数据不合法，请检查机厅名称。"),
                Some("权限不足，无法获取机厅信息。"),
            ),
        };
        let transport_action = match self {
            Self::ShowPermission => "获取用户权限",
            _ => action,
        };
        CommandTexts {
            action,
            transport_action,
            missing_argument,
            bad_request,
            forbidden,
        }
    }
}

/// Turn a failed command into the reply the user sees.
pub fn render_error(kind: CommandKind, err: &CommandError, prefix: &str) -> String {
    let texts = kind.texts();
    match err {
        CommandError::NotBound if kind == CommandKind::Unbind => {
            "您还未绑定bot，无法解绑！".to_string()
        }
        CommandError::NotBound => format!("您尚未绑定，请先使用{prefix}bind 指令绑定。"),
        CommandError::AlreadyBound => "您已经绑定过一个bot_token，无需重复绑定。".to_string(),
        CommandError::MissingArgument => texts
            .missing_argument
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}失败，指令参数不正确。", texts.action)),
        CommandError::Validation(reason) => format!("{}失败，{}。", texts.action, reason),
        CommandError::RemoteRejected { status, .. }
            if matches!(kind, CommandKind::Bind | CommandKind::Unbind) =>
        {
            format!("{}失败，HTTP响应状态码为{}。", texts.action, status)
        }
        CommandError::RemoteRejected { status, message } => {
            if let Some(text) = shared_status_text(*status, message.as_deref()) {
                return text;
            }
            match *status {
                400 => texts.bad_request.map(str::to_string),
                403 => texts.forbidden.map(str::to_string),
                _ => None,
            }
            .unwrap_or_else(|| format!("{}失败，HTTP响应状态码为{}。", texts.action, status))
        }
        CommandError::Transport(reason) => {
            format!("{}过程中出现错误：{}", texts.transport_action, reason)
        }
        CommandError::Store(e) => {
            tracing::error!(command = kind.name(), "Credential store failure: {}", e);
            format!("{}过程中出现错误：本地存储不可用，请稍后再试。", texts.transport_action)
        }
    }
}

/// Reply for the `help` command.
pub fn help_text(prefix: &str) -> String {
    let lines = [
        (vec!["setName", "设置名称", "修改名称"], "设置您的名称"),
        (vec!["resetName", "重置名称", "删除名称"], "重置或删除您的名称"),
        (vec!["name", "查询名称", "查看名称"], "查看当前名称"),
        (vec!["setTicket", "设置票", "锁定票"], "锁定功能票"),
        (vec!["resetTicket", "重置票", "取消票"], "重置功能票"),
        (vec!["ticket", "查询票", "查看票"], "查看功能票状态"),
        (vec!["bind", "绑定"], "绑定您的Turbo账号"),
        (vec!["unbind", "解绑"], "解绑您的Turbo账号"),
        (vec!["network", "网络状态", "查询网络"], "查看当前网络状态"),
        (vec!["showPermission", "权限查询"], "显示您的权限信息"),
        (
            vec!["showFriends", "好友", "好友列表", "查询好友", "查看好友"],
            "查看您的好友列表",
        ),
        (
            vec!["showFriendRequests", "好友请求", "查询好友请求"],
            "查看待处理的好友请求",
        ),
        (
            vec!["addFriend", "加好友", "添加好友", "好友添加"],
            "添加好友",
        ),
        (
            vec!["acceptFriend", "同意好友", "接受好友请求"],
            "接受好友请求",
        ),
        (vec!["denyFriend", "拒绝好友请求"], "拒绝好友请求"),
        (vec!["removeFriend", "删除好友", "移除好友"], "删除好友"),
        (vec!["info", "机厅", "查卡"], "查询机厅信息"),
    ];

    let mut text = String::from("指令帮助信息：\n");
    for (index, (names, description)) in lines.iter().enumerate() {
        let joined = names
            .iter()
            .map(|n| format!("{prefix}{n}"))
            .collect::<Vec<_>>()
            .join(" 或 ");
        text.push_str(&format!("{}. {} - {}\n", index + 1, joined, description));
    }
    text
}
