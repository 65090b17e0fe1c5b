//! Friend list and friend request replies.

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::backend::BackendResponse;
use crate::error::CommandError;

const REQUEST_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";
const DISPLAY_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Friend {
    pub turbo_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FriendPage {
    pub content: Vec<Friend>,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl FriendPage {
    pub fn render(&self, page: u32) -> String {
        if self.content.is_empty() {
            return "您目前还没有添加好友。".to_string();
        }

        let names: Vec<&str> = self.content.iter().map(|f| f.turbo_name.as_str()).collect();
        let mut message = format!(
            "好友列表：\n{}\n\n共 {} 位好友，当前 {}/{} 页。",
            names.join("\n"),
            self.total_elements,
            page,
            self.total_pages
        );
        if self.total_pages > 1 {
            message.push_str("\n可以在命令后添加页数查看对应页数的好友。");
        }
        message
    }
}

pub fn friends_reply(response: &BackendResponse, page: u32) -> Result<String, CommandError> {
    let friends: FriendPage = response.json()?;
    Ok(friends.render(page))
}

/// Page argument for `showFriends`: digits only, otherwise the first page.
pub fn parse_page(arg: &str) -> u32 {
    let arg = arg.trim();
    if arg.is_empty() || !arg.chars().all(|c| c.is_ascii_digit()) {
        return 1;
    }
    arg.parse().unwrap_or(1)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    #[serde(default = "unknown_user")]
    pub turbo_name: String,
    #[serde(default)]
    pub request_time: String,
}

fn unknown_user() -> String {
    "未知用户".to_string()
}

/// Reformat a backend timestamp for display, leaving unparseable values as-is.
pub fn display_time(raw: &str) -> String {
    match NaiveDateTime::parse_from_str(raw, REQUEST_TIME_FORMAT) {
        Ok(parsed) => parsed.format(DISPLAY_TIME_FORMAT).to_string(),
        Err(_) => raw.to_string(),
    }
}

pub fn friend_requests_reply(response: &BackendResponse) -> Result<String, CommandError> {
    let requests: Vec<FriendRequest> = response.json()?;
    if requests.is_empty() {
        return Ok("当前没有待处理的好友请求。".to_string());
    }

    let mut message = "好友请求列表：\n".to_string();
    for request in &requests {
        message.push_str(&format!(
            "{} - 请求时间：{}\n",
            request.turbo_name,
            display_time(&request.request_time)
        ));
    }
    Ok(message)
}
