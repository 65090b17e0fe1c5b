//! Derived network and arcade metrics.

use serde::Deserialize;

use super::{Decoded, decode_envelope};
use crate::backend::BackendResponse;
use crate::error::CommandError;

/// Trials used for the lockout estimate.
const BLACK_ROOM_TRIALS: i32 = 10;
/// Recent players listed in an arcade report.
const RECENT_PLAYER_LIMIT: usize = 6;

const NETWORK_FOOTER: &str = "响应数据的「Z-LIB」压缩跳过率与请求重试次数可以反应当前网络情况。\n\
压缩跳过率超过「3%」时，可能会出现网络不稳定现象。\n\
请求重试率和失败率较高时，网络或服务器可能存在问题。\n\
小黑屋率为使用一小时异常率估算的数据，仅供参考。";

pub const NETWORK_EMPTY_TEXT: &str = "获取网络数据失败。";

/// Percentage of exceptional packets, `0` when nothing was sent.
pub fn exception_ratio(retry_exceptions: u64, zlib_skipped: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (retry_exceptions as f64 + zlib_skipped as f64) * 100.0 / total as f64
}

/// Probability (0..=1) of at least one lockout across ten plays at the
/// given exception percentage.
pub fn black_room_probability(exception_ratio: f64) -> f64 {
    let ratio = (exception_ratio / 100.0).clamp(0.0, 1.0);
    1.0 - (1.0 - ratio).powi(BLACK_ROOM_TRIALS)
}

/// Fraction (0..=1) from a server-reported hit-rate percentage.
pub fn cache_hit_rate(cached_hit_rate_percent: f64) -> f64 {
    if cached_hit_rate_percent > 0.0 {
        cached_hit_rate_percent / 100.0
    } else {
        0.0
    }
}

/// Percentage of requests that needed a fix, `0` when nothing was requested.
pub fn error_fix_rate(fixed_requests: u64, requested_requests: u64) -> f64 {
    if requested_requests == 0 {
        return 0.0;
    }
    fixed_requests as f64 * 100.0 / requested_requests as f64
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PacketCounts {
    pub all_packet_nums: u64,
    pub retry_exception_count: u64,
    pub zlib_skipped_count: u64,
    pub panic_count: u64,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct PacketData {
    pub packets: Option<PacketCounts>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerRequests {
    pub requests_count: u64,
    pub exception_requests_count: u64,
    pub zlib_skipped_requests_count: u64,
    pub retry_requests_count: u64,
    pub panic_requests_count: u64,
    pub exception_requests_rate: f64,
}

/// Normalized network counters, whichever shape the server answered with.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkReport {
    pub total: u64,
    pub exceptions: u64,
    pub exception_ratio: f64,
    pub zlib_skipped: u64,
    pub retries: u64,
    pub panics: u64,
}

impl NetworkReport {
    pub fn from_packets(packets: &PacketCounts) -> Self {
        Self {
            total: packets.all_packet_nums,
            exceptions: packets
                .retry_exception_count
                .saturating_add(packets.zlib_skipped_count),
            exception_ratio: exception_ratio(
                packets.retry_exception_count,
                packets.zlib_skipped_count,
                packets.all_packet_nums,
            ),
            zlib_skipped: packets.zlib_skipped_count,
            retries: packets.retry_exception_count,
            panics: packets.panic_count,
        }
    }

    pub fn from_server_requests(stats: &ServerRequests) -> Self {
        Self {
            total: stats.requests_count,
            exceptions: stats.exception_requests_count,
            exception_ratio: stats.exception_requests_rate,
            zlib_skipped: stats.zlib_skipped_requests_count,
            retries: stats.retry_requests_count,
            panics: stats.panic_requests_count,
        }
    }

    pub fn black_room_probability(&self) -> f64 {
        black_room_probability(self.exception_ratio)
    }

    pub fn render(&self) -> String {
        format!(
            "\n一小时内总请求数：{}\n异常请求数：{}\n异常请求占比：{:.2}%\nZ-LIB 跳过数量：{}\n重试请求数：{}\n失败请求数：{}\n\n10pc至少有一次小黑屋的预估概率：{:.2}%\n\n{}",
            self.total,
            self.exceptions,
            self.exception_ratio,
            self.zlib_skipped,
            self.retries,
            self.panics,
            self.black_room_probability() * 100.0,
            NETWORK_FOOTER
        )
    }
}

/// Render the `network` reply from a `200` body.
pub fn network_reply(response: &BackendResponse) -> Result<String, CommandError> {
    let body = response.body.trim();
    if body.is_empty() || body == "{}" || body == "null" {
        return Ok(NETWORK_EMPTY_TEXT.to_string());
    }

    let report = match decode_envelope::<PacketData, ServerRequests>(response)? {
        Decoded::Wrapped(PacketData {
            packets: Some(packets),
        }) => NetworkReport::from_packets(&packets),
        Decoded::Wrapped(PacketData { packets: None }) => {
            return Err(CommandError::Validation(
                "返回的数据中不包含 packets 信息".to_string(),
            ));
        }
        Decoded::Flat(stats) => NetworkReport::from_server_requests(&stats),
    };
    Ok(report.render())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArcadeInfo {
    pub arcade_name: Option<String>,
    pub arcade_requested: u64,
    pub arcade_cached_request: u64,
    pub arcade_fixed_request: u64,
    pub arcade_cached_hit_rate: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArcadePlayer {
    pub maimai_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArcadeDetail {
    pub arcade_info: ArcadeInfo,
    pub thirty_minutes_player: u64,
    pub one_hour_player: u64,
    pub two_hours_player: u64,
    pub thirty_minutes_play_count: u64,
    pub one_hour_play_count: u64,
    pub two_hours_play_count: u64,
    pub player_list: Vec<ArcadePlayer>,
}

impl ArcadeDetail {
    pub fn render(&self) -> String {
        let info = &self.arcade_info;
        let name = info.arcade_name.as_deref().unwrap_or("未知机厅");

        let mut message = format!(
            "{name}\n\n30 分钟内有 {} 名玩家，共 {} pc\n1 小时内有 {} 名玩家，共 {} pc\n2 小时内有 {} 名玩家，共 {} pc\n\n",
            self.thirty_minutes_player,
            self.thirty_minutes_play_count,
            self.one_hour_player,
            self.one_hour_play_count,
            self.two_hours_player,
            self.two_hours_play_count,
        );

        let recent: Vec<&str> = self
            .player_list
            .iter()
            .take(RECENT_PLAYER_LIMIT)
            .map(|p| p.maimai_name.as_deref().unwrap_or("未知玩家"))
            .collect();
        if recent.is_empty() {
            message.push_str("最近游玩的 6 名玩家：无\n\n");
        } else {
            message.push_str("最近游玩的 6 名玩家：\n");
            message.push_str(&recent.join("\n"));
            message.push_str("\n\n");
        }

        message.push_str(&format!(
            "在 {} 次网络请求中，缓存击中 {} 次，修复 {} 次错误，缓存击中率 {:.2}%，缓外错误率 {:.2}%",
            info.arcade_requested,
            info.arcade_cached_request,
            info.arcade_fixed_request,
            cache_hit_rate(info.arcade_cached_hit_rate) * 100.0,
            error_fix_rate(info.arcade_fixed_request, info.arcade_requested),
        ));
        message
    }
}

/// Render the `arcadeInfo` reply from a `200` body.
pub fn arcade_reply(response: &BackendResponse) -> Result<String, CommandError> {
    let detail: ArcadeDetail = response.json()?;
    Ok(detail.render())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn exception_ratio_handles_zero_total() {
        assert_eq!(exception_ratio(5, 5, 0), 0.0);
        assert!((exception_ratio(20, 10, 1000) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn black_room_bounds_and_monotonic() {
        assert_eq!(black_room_probability(0.0), 0.0);
        assert_eq!(black_room_probability(100.0), 1.0);

        let mut previous = 0.0;
        for step in 0..=200 {
            let p = black_room_probability(step as f64 * 0.5);
            assert!(p >= previous, "not monotonic at {step}");
            assert!((0.0..=1.0).contains(&p));
            previous = p;
        }
    }

    #[test]
    fn arcade_rates_guard_zero_denominators() {
        assert_eq!(cache_hit_rate(0.0), 0.0);
        assert_eq!(cache_hit_rate(-3.0), 0.0);
        assert_eq!(cache_hit_rate(85.0), 0.85);
        assert_eq!(error_fix_rate(4, 0), 0.0);
        assert_eq!(error_fix_rate(5, 200), 2.5);
    }

    #[test]
    fn wrapped_packets_compute_ratio() {
        let response = BackendResponse::new(
            200,
            r#"{"isSuccess":true,"data":{"packets":{"allPacketNums":1000,"retryExceptionCount":20,"zlibSkippedCount":10,"panicCount":2}}}"#,
        );
        let reply = network_reply(&response).unwrap();
        assert!(reply.contains("异常请求数：30\n"));
        assert!(reply.contains("异常请求占比：3.00%"));
        assert!(reply.contains("失败请求数：2\n"));
        // 1 - 0.97^10
        assert!(reply.contains("小黑屋的预估概率：26.26%"));
        assert!(reply.ends_with("仅供参考。"));
    }

    #[test]
    fn huge_counters_saturate_instead_of_overflowing() {
        let body = format!(
            r#"{{"isSuccess":true,"data":{{"packets":{{"allPacketNums":10,"retryExceptionCount":{},"zlibSkippedCount":1,"panicCount":0}}}}}}"#,
            u64::MAX
        );
        let reply = network_reply(&BackendResponse::new(200, body)).unwrap();
        assert!(reply.contains(&format!("异常请求数：{}\n", u64::MAX)));
        assert!(reply.contains("小黑屋的预估概率：100.00%"));
        assert!(exception_ratio(u64::MAX, u64::MAX, 1).is_finite());
    }

    #[test]
    fn wrapped_data_that_fails_to_decode_is_rejected() {
        let response = BackendResponse::new(
            200,
            r#"{"isSuccess":true,"data":{"packets":{"allPacketNums":1000,"retryExceptionCount":20,"zlibSkippedCount":10,"panicCount":null}}}"#,
        );
        assert!(matches!(
            network_reply(&response).unwrap_err(),
            CommandError::Validation(_)
        ));
    }

    #[test]
    fn flat_body_uses_server_rate() {
        let response = BackendResponse::new(
            200,
            r#"{"requestsCount":400,"exceptionRequestsCount":8,"zlibSkippedRequestsCount":5,"retryRequestsCount":3,"panicRequestsCount":1,"exceptionRequestsRate":2.0}"#,
        );
        let reply = network_reply(&response).unwrap();
        assert!(reply.starts_with("\n一小时内总请求数：400\n异常请求数：8\n异常请求占比：2.00%\n"));
        assert!(reply.contains("Z-LIB 跳过数量：5\n重试请求数：3\n"));
    }

    #[test]
    fn network_empty_and_failed_envelopes() {
        assert_eq!(
            network_reply(&BackendResponse::new(200, "{}")).unwrap(),
            NETWORK_EMPTY_TEXT
        );
        assert!(matches!(
            network_reply(&BackendResponse::new(200, r#"{"isSuccess":false}"#)).unwrap_err(),
            CommandError::Validation(_)
        ));
        assert!(matches!(
            network_reply(&BackendResponse::new(200, r#"{"isSuccess":true,"data":{}}"#))
                .unwrap_err(),
            CommandError::Validation(_)
        ));
    }

    #[test]
    fn arcade_report_lists_six_players() {
        let body = serde_json::json!({
            "arcadeInfo": {
                "arcadeName": "万达广场",
                "arcadeRequested": 200,
                "arcadeCachedRequest": 170,
                "arcadeFixedRequest": 5,
                "arcadeCachedHitRate": 85.0
            },
            "thirtyMinutesPlayer": 3,
            "oneHourPlayer": 5,
            "twoHoursPlayer": 8,
            "thirtyMinutesPlayCount": 4,
            "oneHourPlayCount": 9,
            "twoHoursPlayCount": 15,
            "playerList": [
                {"maimaiName": "A"}, {"maimaiName": "B"}, {}, {"maimaiName": "D"},
                {"maimaiName": "E"}, {"maimaiName": "F"}, {"maimaiName": "G"}
            ]
        });
        let reply = arcade_reply(&BackendResponse::new(200, body.to_string())).unwrap();
        assert_eq!(
            reply,
            "万达广场\n\n30 分钟内有 3 名玩家，共 4 pc\n1 小时内有 5 名玩家，共 9 pc\n2 小时内有 8 名玩家，共 15 pc\n\n\
最近游玩的 6 名玩家：\nA\nB\n未知玩家\nD\nE\nF\n\n\
在 200 次网络请求中，缓存击中 170 次，修复 5 次错误，缓存击中率 85.00%，缓外错误率 2.50%"
        );
    }

    #[test]
    fn arcade_report_without_players_or_requests() {
        let reply = arcade_reply(&BackendResponse::new(200, "{}")).unwrap();
        assert!(reply.starts_with("未知机厅\n\n"));
        assert!(reply.contains("最近游玩的 6 名玩家：无\n\n"));
        assert!(reply.ends_with("缓存击中率 0.00%，缓外错误率 0.00%"));
    }
}
