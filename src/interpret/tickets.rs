//! Ticket codes and the `showTicket` reply.

use serde::Deserialize;

use crate::backend::BackendResponse;
use crate::error::CommandError;

pub const NO_TICKET: &str = "没有票";

const TICKETS: &[(u32, &str)] = &[
    (2, "付费2倍票"),
    (3, "付费3倍票"),
    (4, "付费4倍票"),
    (5, "付费5倍票"),
    (6, "付费6倍票"),
    (10005, "活动5倍票 (类型1)"),
    (10105, "活动5倍票 (类型2)"),
    (10205, "活动5倍票 (类型3)"),
    (11001, "免费1.5倍票"),
    (11002, "免费2倍票"),
    (11003, "免费3倍票"),
    (11005, "免费5倍票"),
    (30001, "特殊2倍票"),
];

/// Display name for a ticket code.
pub fn describe(ticket_id: u32) -> &'static str {
    TICKETS
        .iter()
        .find(|(id, _)| *id == ticket_id)
        .map(|(_, name)| *name)
        .unwrap_or(NO_TICKET)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TurboTicket {
    pub is_enable: bool,
    pub ticket_id: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TicketStock {
    pub ticket_id: u32,
    pub stock: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CurrentTickets {
    pub turbo_ticket: TurboTicket,
    pub maimai_tickets: Vec<TicketStock>,
}

impl CurrentTickets {
    pub fn render(&self) -> String {
        let mut message = if self.turbo_ticket.is_enable {
            format!(
                "已启用功能票锁定，当前锁定功能票为：{}\n",
                describe(self.turbo_ticket.ticket_id)
            )
        } else {
            "未启用功能票锁定\n".to_string()
        };

        let stocked: Vec<String> = self
            .maimai_tickets
            .iter()
            .filter(|t| t.stock > 0)
            .map(|t| format!("{}：{}张", describe(t.ticket_id), t.stock))
            .collect();
        if !stocked.is_empty() {
            message.push_str("\n账号内功能票库存：\n");
            message.push_str(&stocked.join("\n"));
        }
        message
    }
}

pub fn show_ticket_reply(response: &BackendResponse) -> Result<String, CommandError> {
    let tickets: CurrentTickets = response.json()?;
    Ok(tickets.render())
}

/// `setTicket` accepts only an all-digit id.
pub fn parse_ticket_id(arg: &str) -> Option<u32> {
    let arg = arg.trim();
    if arg.is_empty() || !arg.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    arg.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn known_and_unknown_codes() {
        assert_eq!(describe(10005), "活动5倍票 (类型1)");
        assert_eq!(describe(11001), "免费1.5倍票");
        assert_eq!(describe(99999), "没有票");
        assert_eq!(describe(0), "没有票");
    }

    #[test]
    fn renders_lock_and_stock() {
        let body = r#"{"turboTicket":{"isEnable":true,"ticketId":3},"maimaiTickets":[{"ticketId":11002,"stock":2},{"ticketId":5,"stock":0},{"ticketId":30001,"stock":1}]}"#;
        let reply = show_ticket_reply(&BackendResponse::new(200, body)).unwrap();
        assert_eq!(
            reply,
            "已启用功能票锁定，当前锁定功能票为：付费3倍票\n\n账号内功能票库存：\n免费2倍票：2张\n特殊2倍票：1张"
        );
    }

    #[test]
    fn renders_unlocked_without_stock() {
        let body = r#"{"turboTicket":{"isEnable":false},"maimaiTickets":[]}"#;
        let reply = show_ticket_reply(&BackendResponse::new(200, body)).unwrap();
        assert_eq!(reply, "未启用功能票锁定\n");
    }

    #[test]
    fn ticket_id_must_be_digits() {
        assert_eq!(parse_ticket_id(" 10005 "), Some(10005));
        assert_eq!(parse_ticket_id("-1"), None);
        assert_eq!(parse_ticket_id("5x"), None);
        assert_eq!(parse_ticket_id(""), None);
        assert_eq!(parse_ticket_id("99999999999999"), None);
    }
}
