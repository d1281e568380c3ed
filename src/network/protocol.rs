//! Network protocol message types
//!
//! Length-prefixed JSON messages over TCP. Every message carries a `type`
//! discriminator string; the set of types is closed and receivers match
//! exhaustively. Unknown types or malformed payloads decode to an error that
//! callers ignore rather than treat as fatal.

use std::io::{self, Read, Write};
use std::net::TcpStream;

/// Roster snapshot entry carried by `join-accepted`, `player-list` and
/// `game-start`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerInfo {
    pub id: u32,
    pub name: String,
    pub ready: bool,
    pub score: u32,
}

/// Messages exchanged between host and guests.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Guest asks to join the room (guest -> host).
    JoinRequest { name: String },
    /// Admission plus the allocated id and initial roster (host -> joiner).
    JoinAccepted {
        player_id: u32,
        room_code: String,
        players: Vec<PlayerInfo>,
    },
    /// Room at capacity; the link is closed after this (host -> rejected guest).
    RoomFull,
    /// Roster snapshot (host -> all guests).
    PlayerList { players: Vec<PlayerInfo> },
    /// Readiness change (guest -> host).
    ReadyToggle { player_id: u32, ready: bool },
    /// Match begins; peers derive the layout from the seed (host -> all).
    GameStart { seed: u32, players: Vec<PlayerInfo> },
    /// Resolved word for a round, not just the round number, so a peer-side
    /// generator mismatch cannot silently diverge (host -> all).
    StartRound { round_number: u32, word: String },
    /// Typed-prefix length update (guest -> host, relayed host -> others).
    Progress { player_id: u32, progress: u32 },
    /// Elapsed seconds to finish (guest -> host, relayed host -> others).
    Complete { player_id: u32, time: f64 },
}

impl Message {
    /// Serialize message to bytes (length-prefixed JSON)
    pub fn to_bytes(&self) -> Vec<u8> {
        let json = self.to_json();
        let len = json.len() as u32;
        let mut bytes = Vec::with_capacity(4 + json.len());
        bytes.extend_from_slice(&len.to_be_bytes());
        bytes.extend_from_slice(json.as_bytes());
        bytes
    }

    /// Deserialize message from bytes (length-prefixed JSON)
    pub fn from_bytes(bytes: &[u8]) -> io::Result<(Self, usize)> {
        if bytes.len() < 4 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "need 4 bytes for length"));
        }
        let len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        if bytes.len() < 4 + len {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "incomplete message"));
        }
        let json = std::str::from_utf8(&bytes[4..4 + len])
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let msg = Self::from_json(json)?;
        Ok((msg, 4 + len))
    }

    fn to_json(&self) -> String {
        match self {
            Message::JoinRequest { name } => {
                format!(r#"{{"type":"join-request","name":"{}"}}"#, escape_json(name))
            }
            Message::JoinAccepted { player_id, room_code, players } => {
                format!(
                    r#"{{"type":"join-accepted","player_id":{},"room_code":"{}","players":{}}}"#,
                    player_id,
                    escape_json(room_code),
                    players_to_json(players)
                )
            }
            Message::RoomFull => r#"{"type":"room-full"}"#.to_string(),
            Message::PlayerList { players } => {
                format!(r#"{{"type":"player-list","players":{}}}"#, players_to_json(players))
            }
            Message::ReadyToggle { player_id, ready } => {
                format!(
                    r#"{{"type":"ready-toggle","player_id":{},"ready":{}}}"#,
                    player_id, ready
                )
            }
            Message::GameStart { seed, players } => {
                format!(
                    r#"{{"type":"game-start","seed":{},"players":{}}}"#,
                    seed,
                    players_to_json(players)
                )
            }
            Message::StartRound { round_number, word } => {
                format!(
                    r#"{{"type":"start-round","round_number":{},"word":"{}"}}"#,
                    round_number,
                    escape_json(word)
                )
            }
            Message::Progress { player_id, progress } => {
                format!(
                    r#"{{"type":"progress","player_id":{},"progress":{}}}"#,
                    player_id, progress
                )
            }
            Message::Complete { player_id, time } => {
                format!(
                    r#"{{"type":"complete","player_id":{},"time":{}}}"#,
                    player_id,
                    format_time(*time)
                )
            }
        }
    }

    fn from_json(json: &str) -> io::Result<Self> {
        // Simple JSON parsing without serde
        let json = json.trim();

        let get_str = |key: &str| -> Option<String> {
            let pattern = format!(r#""{}":""#, key);
            let start = json.find(&pattern)? + pattern.len();
            let rest = &json[start..];
            let end = find_unescaped_quote(rest)?;
            Some(unescape_json(&rest[..end]))
        };

        let get_u32 = |key: &str| -> Option<u32> {
            let pattern = format!(r#""{}":"#, key);
            let start = json.find(&pattern)? + pattern.len();
            let rest = &json[start..];
            let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
            rest[..end].parse().ok()
        };

        let get_f64 = |key: &str| -> Option<f64> {
            let pattern = format!(r#""{}":"#, key);
            let start = json.find(&pattern)? + pattern.len();
            let rest = &json[start..];
            let end = rest
                .find(|c: char| !matches!(c, '0'..='9' | '.' | '-' | '+' | 'e' | 'E'))
                .unwrap_or(rest.len());
            rest[..end].parse().ok()
        };

        let get_bool = |key: &str| -> Option<bool> {
            let pattern = format!(r#""{}":"#, key);
            let start = json.find(&pattern)? + pattern.len();
            let rest = &json[start..].trim_start();
            if rest.starts_with("true") {
                Some(true)
            } else if rest.starts_with("false") {
                Some(false)
            } else {
                None
            }
        };

        let msg_type = get_str("type")
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing type field"))?;

        match msg_type.as_str() {
            "join-request" => {
                let name = get_str("name")
                    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing name"))?;
                Ok(Message::JoinRequest { name })
            }
            "join-accepted" => {
                let player_id = get_u32("player_id")
                    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing player_id"))?;
                let room_code = get_str("room_code")
                    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing room_code"))?;
                let players = parse_players(json)
                    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing or invalid players"))?;
                Ok(Message::JoinAccepted { player_id, room_code, players })
            }
            "room-full" => Ok(Message::RoomFull),
            "player-list" => {
                let players = parse_players(json)
                    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing or invalid players"))?;
                Ok(Message::PlayerList { players })
            }
            "ready-toggle" => {
                let player_id = get_u32("player_id")
                    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing player_id"))?;
                let ready = get_bool("ready")
                    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing ready"))?;
                Ok(Message::ReadyToggle { player_id, ready })
            }
            "game-start" => {
                let seed = get_u32("seed")
                    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing seed"))?;
                let players = parse_players(json)
                    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing or invalid players"))?;
                Ok(Message::GameStart { seed, players })
            }
            "start-round" => {
                let round_number = get_u32("round_number")
                    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing round_number"))?;
                let word = get_str("word")
                    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing word"))?;
                Ok(Message::StartRound { round_number, word })
            }
            "progress" => {
                let player_id = get_u32("player_id")
                    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing player_id"))?;
                let progress = get_u32("progress")
                    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing progress"))?;
                Ok(Message::Progress { player_id, progress })
            }
            "complete" => {
                let player_id = get_u32("player_id")
                    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing player_id"))?;
                let time = get_f64("time")
                    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing time"))?;
                Ok(Message::Complete { player_id, time })
            }
            _ => Err(io::Error::new(io::ErrorKind::InvalidData, format!("unknown message type: {}", msg_type))),
        }
    }

    /// Write message to a TCP stream
    pub fn write_to(&self, stream: &mut TcpStream) -> io::Result<()> {
        let bytes = self.to_bytes();
        stream.write_all(&bytes)?;
        stream.flush()
    }

    /// Read message from a TCP stream.
    ///
    /// The frame is consumed whole before parsing, so a malformed payload
    /// surfaces as `InvalidData` without desynchronizing the stream; callers
    /// skip those and keep reading.
    pub fn read_from(stream: &mut TcpStream) -> io::Result<Self> {
        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf)?;
        let len = u32::from_be_bytes(len_buf) as usize;

        if len > 64 * 1024 {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "message too large"));
        }

        let mut body = vec![0u8; len];
        stream.read_exact(&mut body)?;

        let json = std::str::from_utf8(&body)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Self::from_json(json)
    }
}

/// Serialize a time without trailing noise; integral values still need to be
/// valid JSON numbers.
fn format_time(time: f64) -> String {
    if time.is_finite() {
        format!("{}", time)
    } else {
        "0".to_string()
    }
}

fn players_to_json(players: &[PlayerInfo]) -> String {
    let entries: String = players
        .iter()
        .map(|p| {
            format!(
                r#"{{"id":{},"name":"{}","ready":{},"score":{}}}"#,
                p.id,
                escape_json(&p.name),
                p.ready,
                p.score
            )
        })
        .collect::<Vec<_>>()
        .join(",");
    format!("[{}]", entries)
}

/// Parse a players array: [{id, name, ready, score}, ...]
fn parse_players(json: &str) -> Option<Vec<PlayerInfo>> {
    let pattern = r#""players":["#;
    let start = json.find(pattern)? + pattern.len();
    let rest = &json[start..];

    // Find matching close bracket, respecting string boundaries
    let mut depth = 1;
    let mut end = 0;
    let mut in_string = false;
    let mut prev_char = ' ';
    for (i, c) in rest.char_indices() {
        if c == '"' && prev_char != '\\' {
            in_string = !in_string;
        } else if !in_string {
            match c {
                '[' | '{' => depth += 1,
                ']' | '}' => {
                    depth -= 1;
                    if depth == 0 {
                        end = i;
                        break;
                    }
                }
                _ => {}
            }
        }
        prev_char = c;
    }

    let array = &rest[..end];
    if array.trim().is_empty() {
        return Some(Vec::new());
    }

    let mut result = Vec::new();
    let mut current = array;

    while let Some(obj_start) = current.find('{') {
        let rest = &current[obj_start + 1..];
        // Find the matching close brace, respecting strings
        let mut obj_end = None;
        let mut in_string = false;
        let mut prev_char = ' ';
        for (i, c) in rest.char_indices() {
            if c == '"' && prev_char != '\\' {
                in_string = !in_string;
            } else if !in_string && c == '}' {
                obj_end = Some(i);
                break;
            }
            prev_char = c;
        }
        let obj_end = obj_end?;
        let obj = &rest[..obj_end];

        let get_str = |key: &str| -> Option<String> {
            let pattern = format!(r#""{}":""#, key);
            let s = obj.find(&pattern)? + pattern.len();
            let r = &obj[s..];
            let e = find_unescaped_quote(r)?;
            Some(unescape_json(&r[..e]))
        };

        let get_u32 = |key: &str| -> Option<u32> {
            let pattern = format!(r#""{}":"#, key);
            let s = obj.find(&pattern)? + pattern.len();
            let r = &obj[s..];
            let e = r.find(|c: char| !c.is_ascii_digit()).unwrap_or(r.len());
            r[..e].parse().ok()
        };

        let get_bool = |key: &str| -> Option<bool> {
            let pattern = format!(r#""{}":"#, key);
            let s = obj.find(&pattern)? + pattern.len();
            let r = obj[s..].trim_start();
            if r.starts_with("true") {
                Some(true)
            } else if r.starts_with("false") {
                Some(false)
            } else {
                None
            }
        };

        result.push(PlayerInfo {
            id: get_u32("id")?,
            name: get_str("name")?,
            ready: get_bool("ready")?,
            score: get_u32("score")?,
        });

        if obj_end + 1 < rest.len() {
            current = &rest[obj_end + 1..];
        } else {
            break;
        }
    }

    Some(result)
}

/// Find the position of the first unescaped quote in a string
fn find_unescaped_quote(s: &str) -> Option<usize> {
    let mut i = 0;
    let bytes = s.as_bytes();
    while i < bytes.len() {
        if bytes[i] == b'"' {
            return Some(i);
        } else if bytes[i] == b'\\' && i + 1 < bytes.len() {
            i += 2;
        } else {
            i += 1;
        }
    }
    None
}

fn escape_json(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

fn unescape_json(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('"') => result.push('"'),
                Some('\\') => result.push('\\'),
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(c);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_players() -> Vec<PlayerInfo> {
        vec![
            PlayerInfo { id: 1, name: "Alice".to_string(), ready: true, score: 2 },
            PlayerInfo { id: 2, name: "Bob".to_string(), ready: false, score: 0 },
        ]
    }

    #[test]
    fn test_join_request_roundtrip() {
        let msg = Message::JoinRequest { name: "Alice".to_string() };
        let bytes = msg.to_bytes();
        let (parsed, len) = Message::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, msg);
        assert_eq!(len, bytes.len());
    }

    #[test]
    fn test_join_accepted_roundtrip() {
        let msg = Message::JoinAccepted {
            player_id: 2,
            room_code: "ABC234".to_string(),
            players: sample_players(),
        };
        let bytes = msg.to_bytes();
        let (parsed, len) = Message::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, msg);
        assert_eq!(len, bytes.len());
    }

    #[test]
    fn test_room_full_roundtrip() {
        let bytes = Message::RoomFull.to_bytes();
        let (parsed, _) = Message::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, Message::RoomFull);
    }

    #[test]
    fn test_player_list_roundtrip() {
        let msg = Message::PlayerList { players: sample_players() };
        let (parsed, _) = Message::from_bytes(&msg.to_bytes()).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_player_list_empty_roundtrip() {
        let msg = Message::PlayerList { players: vec![] };
        let (parsed, _) = Message::from_bytes(&msg.to_bytes()).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_ready_toggle_roundtrip() {
        for ready in [true, false] {
            let msg = Message::ReadyToggle { player_id: 3, ready };
            let (parsed, _) = Message::from_bytes(&msg.to_bytes()).unwrap();
            assert_eq!(parsed, msg);
        }
    }

    #[test]
    fn test_game_start_roundtrip() {
        let msg = Message::GameStart {
            seed: 0xDEAD_BEEF,
            players: sample_players(),
        };
        let (parsed, _) = Message::from_bytes(&msg.to_bytes()).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_start_round_roundtrip() {
        let msg = Message::StartRound {
            round_number: 4,
            word: "CRANE".to_string(),
        };
        let (parsed, _) = Message::from_bytes(&msg.to_bytes()).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_progress_roundtrip() {
        let msg = Message::Progress { player_id: 2, progress: 3 };
        let (parsed, _) = Message::from_bytes(&msg.to_bytes()).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_complete_roundtrip_fractional_time() {
        let msg = Message::Complete { player_id: 1, time: 2.53 };
        let (parsed, _) = Message::from_bytes(&msg.to_bytes()).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_complete_roundtrip_integral_time() {
        // An integral f64 serializes without a decimal point and must still
        // parse back.
        let msg = Message::Complete { player_id: 1, time: 3.0 };
        let (parsed, _) = Message::from_bytes(&msg.to_bytes()).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_escape_special_chars_in_name() {
        let msg = Message::JoinRequest { name: "A\"B\\C".to_string() };
        let (parsed, _) = Message::from_bytes(&msg.to_bytes()).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_unknown_type_is_invalid_data() {
        let json = r#"{"type":"teleport","x":1}"#;
        let mut bytes = (json.len() as u32).to_be_bytes().to_vec();
        bytes.extend_from_slice(json.as_bytes());
        let err = Message::from_bytes(&bytes).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_malformed_payload_is_invalid_data() {
        let json = r#"{"type":"progress","player_id":"not-a-number"}"#;
        let mut bytes = (json.len() as u32).to_be_bytes().to_vec();
        bytes.extend_from_slice(json.as_bytes());
        let err = Message::from_bytes(&bytes).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_truncated_frame_is_unexpected_eof() {
        let bytes = Message::RoomFull.to_bytes();
        let err = Message::from_bytes(&bytes[..bytes.len() - 2]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_wire_types_match_protocol_table() {
        // The discriminator strings are the protocol surface; renaming a
        // variant must not rename the wire type.
        let cases: Vec<(Message, &str)> = vec![
            (Message::JoinRequest { name: "x".into() }, "join-request"),
            (
                Message::JoinAccepted { player_id: 1, room_code: "R".into(), players: vec![] },
                "join-accepted",
            ),
            (Message::RoomFull, "room-full"),
            (Message::PlayerList { players: vec![] }, "player-list"),
            (Message::ReadyToggle { player_id: 1, ready: true }, "ready-toggle"),
            (Message::GameStart { seed: 1, players: vec![] }, "game-start"),
            (Message::StartRound { round_number: 1, word: "W".into() }, "start-round"),
            (Message::Progress { player_id: 1, progress: 0 }, "progress"),
            (Message::Complete { player_id: 1, time: 1.0 }, "complete"),
        ];
        for (msg, wire_type) in cases {
            let json = msg.to_json();
            assert!(
                json.contains(&format!(r#""type":"{}""#, wire_type)),
                "{} missing from {}",
                wire_type,
                json
            );
        }
    }
}
