//! Permission levels and the two-part `showPermission` reply.

use serde::Deserialize;

use super::{html_unescape, shared_status_text};
use crate::backend::BackendResponse;
use crate::error::CommandError;

/// Human label for a permission code returned by `/permission/showPermission`.
pub fn level_label(code: &str) -> &'static str {
    match code {
        "ADMIN" => "全权管理员",
        "BUILDER" => "技术实施员",
        "AUTHORIZER" => "许可用户",
        "USER" => "标准用户",
        "BANNED" => "封禁中",
        _ => "未知",
    }
}

/// First line of the reply, from the permission body. The code may arrive
/// as a bare word or as a JSON string.
pub fn level_line(response: &BackendResponse) -> String {
    let code = response.text().trim_matches('"');
    format!("用户权限级别：{}\n", level_label(code))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurboPermission {
    #[serde(default = "unknown_permission")]
    pub permission_description: String,
    #[serde(default)]
    pub is_granted: bool,
}

fn unknown_permission() -> String {
    "未知权限".to_string()
}

/// Text appended for the detail call, whatever its status.
///
/// The detail call never fails the whole reply: non-200 statuses and
/// undecodable bodies each produce one line.
pub fn detail_section(response: &BackendResponse) -> String {
    if !response.is_ok() {
        return detail_status_line(response);
    }

    let permissions: Vec<TurboPermission> = match response.json() {
        Ok(list) => list,
        Err(CommandError::Validation(reason)) => {
            tracing::warn!(%reason, "Undecodable Turbo permission list");
            return "\n无法获取详细权限信息。".to_string();
        }
        Err(_) => return "\n无法获取详细权限信息。".to_string(),
    };
    if permissions.is_empty() {
        return "\n无法获取详细权限信息。".to_string();
    }

    let granted: Vec<String> = permissions
        .iter()
        .filter(|p| p.is_granted)
        .map(|p| html_unescape(&p.permission_description))
        .collect();
    if granted.is_empty() {
        "\n未授予任何详细权限。".to_string()
    } else {
        format!("\n已授予的详细权限：\n{}", granted.join("\n"))
    }
}

fn detail_status_line(response: &BackendResponse) -> String {
    let message = response.message_field();
    if let Some(text) = shared_status_text(response.status, message.as_deref()) {
        return format!("\n{text}");
    }
    match response.status {
        400 => "\n请求数据不合法，请检查请求。".to_string(),
        403 => "\n权限不足，无法获取详细Turbo权限信息。".to_string(),
        code => format!("\n获取详细Turbo权限失败，HTTP响应状态码为 {code}。"),
    }
}
