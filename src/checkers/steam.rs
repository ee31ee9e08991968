//! Steam/Source-engine A2S_INFO checker (spec.md §4.3): sends the A2S_INFO
//! query datagram and parses player count / map from the reply.

use std::time::Duration;

use crate::crd::monitor::SteamTarget;

use super::transport::{UdpError, UdpTransport};
use super::{CheckResult, Stopwatch};

/// `0xFFFFFFFF` header followed by `'T'` and the null-terminated query
/// string, per the Source-engine A2S_INFO request format.
const A2S_INFO_REQUEST: &[u8] = b"\xff\xff\xff\xffTSource Engine Query\0";

struct ParsedInfo {
    player_count: u8,
    map: String,
}

fn parse_a2s_info(reply: &[u8]) -> Option<ParsedInfo> {
    // header(4) + type(1=0x49) + protocol(1) + name(cstr) + map(cstr) + folder(cstr) + game(cstr) + appid(2)
    if reply.len() < 7 || reply[4] != 0x49 {
        return None;
    }
    let mut cursor = 6;
    let _name = read_cstr(reply, &mut cursor)?;
    let map = read_cstr(reply, &mut cursor)?;
    let _folder = read_cstr(reply, &mut cursor)?;
    let _game = read_cstr(reply, &mut cursor)?;
    cursor += 2; // appid
    let player_count = *reply.get(cursor)?;
    Some(ParsedInfo { player_count, map })
}

fn read_cstr(data: &[u8], cursor: &mut usize) -> Option<String> {
    let start = *cursor;
    let end = data[start..].iter().position(|&b| b == 0)? + start;
    *cursor = end + 1;
    Some(String::from_utf8_lossy(&data[start..end]).to_string())
}

pub async fn check(target: &SteamTarget, timeout: Duration, transport: &dyn UdpTransport, sw: &Stopwatch) -> CheckResult {
    let result = transport.query(&target.host, target.port, A2S_INFO_REQUEST, timeout).await;
    let latency_ms = sw.elapsed_ms();

    let reply = match result {
        Ok(r) => r,
        Err(UdpError::Timeout) => return CheckResult::timeout(latency_ms),
        Err(UdpError::ConnectionError(msg)) => return CheckResult::down("STEAM_QUERY_FAILED", msg, latency_ms),
    };

    let Some(info) = parse_a2s_info(&reply) else {
        return CheckResult::down("STEAM_PARSE_ERROR", "could not parse A2S_INFO reply", latency_ms);
    };

    if let Some(min) = target.min_players {
        if (info.player_count as u32) < min {
            return CheckResult::down(
                "STEAM_PLAYER_COUNT_LOW",
                format!("{} players < minimum {min}", info.player_count),
                latency_ms,
            );
        }
    }
    if let Some(max) = target.max_players {
        if (info.player_count as u32) > max {
            return CheckResult::down(
                "STEAM_PLAYER_COUNT_HIGH",
                format!("{} players > maximum {max}", info.player_count),
                latency_ms,
            );
        }
    }
    if let Some(expected_map) = &target.expected_map {
        if &info.map != expected_map {
            return CheckResult::down(
                "STEAM_MAP_MISMATCH",
                format!("map {:?} != expected {expected_map:?}", info.map),
                latency_ms,
            );
        }
    }

    CheckResult::up("STEAM_OK", format!("{} players on {}", info.player_count, info.map), latency_ms)
}
