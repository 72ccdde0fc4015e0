//! Live game-server status over Server List Ping
//!
//! One short TCP exchange: handshake, status request, JSON response. The
//! whole exchange shares a single deadline so a wedged server cannot stall
//! API requests.

mod packet;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

#[derive(Debug, Error)]
pub enum PingError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("no response within {0} ms")]
    Timeout(u64),
    #[error("protocol: {0}")]
    Protocol(String),
    #[error("status payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Status as served by the API
#[derive(Debug, Clone, Serialize)]
pub struct ServerStatus {
    pub online: bool,
    pub players: PlayerCount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motd: Option<String>,
    /// Server icon as a base64 data URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PlayerCount {
    pub online: u32,
    pub max: u32,
}

impl ServerStatus {
    /// The shape returned whenever the server cannot be reached
    pub fn offline() -> Self {
        Self {
            online: false,
            players: PlayerCount::default(),
            version: None,
            motd: None,
            favicon: None,
        }
    }
}

/// Raw response payload; unknown fields such as player samples or mod
/// lists are ignored.
#[derive(Debug, Deserialize)]
struct StatusPayload {
    #[serde(default)]
    version: Option<VersionInfo>,
    #[serde(default)]
    players: Option<PlayersInfo>,
    #[serde(default)]
    description: Option<serde_json::Value>,
    #[serde(default)]
    favicon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VersionInfo {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct PlayersInfo {
    #[serde(default)]
    online: u32,
    #[serde(default)]
    max: u32,
}

/// Ping a server and decode its status. The timeout covers connect,
/// request, and response together.
pub async fn ping(host: &str, port: u16, timeout: Duration) -> Result<ServerStatus, PingError> {
    let millis = timeout.as_millis() as u64;
    match tokio::time::timeout(timeout, ping_inner(host, port)).await {
        Ok(result) => result,
        Err(_) => Err(PingError::Timeout(millis)),
    }
}

async fn ping_inner(host: &str, port: u16) -> Result<ServerStatus, PingError> {
    let mut stream = TcpStream::connect((host, port)).await?;

    stream.write_all(&packet::build_handshake(host, port)).await?;
    stream.write_all(&packet::build_status_request()).await?;
    stream.flush().await?;

    let raw = packet::read_status_response(&mut stream).await?;
    let payload: StatusPayload = serde_json::from_str(&raw)?;

    let motd = payload
        .description
        .as_ref()
        .map(motd_text)
        .filter(|text| !text.is_empty());

    Ok(ServerStatus {
        online: true,
        players: payload
            .players
            .map(|p| PlayerCount {
                online: p.online,
                max: p.max,
            })
            .unwrap_or_default(),
        version: payload.version.map(|v| v.name),
        motd,
        favicon: payload.favicon,
    })
}

/// Flatten a chat component into plain text.
///
/// The MOTD may be a bare string or a component tree with `text` nodes
/// and `extra` children. Legacy `\u{a7}` formatting codes are dropped.
fn motd_text(component: &serde_json::Value) -> String {
    let mut out = String::new();
    collect_text(component, &mut out);
    strip_format_codes(&out)
}

fn collect_text(value: &serde_json::Value, out: &mut String) {
    match value {
        serde_json::Value::String(s) => out.push_str(s),
        serde_json::Value::Object(map) => {
            if let Some(serde_json::Value::String(s)) = map.get("text") {
                out.push_str(s);
            }
            if let Some(serde_json::Value::Array(extra)) = map.get("extra") {
                for child in extra {
                    collect_text(child, out);
                }
            }
        }
        serde_json::Value::Array(items) => {
            for child in items {
                collect_text(child, out);
            }
        }
        _ => {}
    }
}

fn strip_format_codes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\u{a7}' {
            chars.next();
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::net::TcpListener;

    #[test]
    fn test_motd_from_plain_string() {
        let value = json!("Welcome to the server");
        assert_eq!(motd_text(&value), "Welcome to the server");
    }

    #[test]
    fn test_motd_from_component_tree() {
        let value = json!({
            "text": "Stonefell ",
            "extra": [
                {"text": "SMP", "color": "gold"},
                {"text": " - season 4"}
            ]
        });
        assert_eq!(motd_text(&value), "Stonefell SMP - season 4");
    }

    #[test]
    fn test_motd_strips_legacy_codes() {
        let value = json!("\u{a7}6Gold\u{a7}r text");
        assert_eq!(motd_text(&value), "Gold text");
    }

    #[test]
    fn test_motd_from_array() {
        let value = json!(["part one", {"text": " and two"}]);
        assert_eq!(motd_text(&value), "part one and two");
    }

    async fn spawn_fake_server(response: serde_json::Value) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let json = response.to_string();

            // JSON length, then the whole payload length-prefixed
            let mut payload = vec![0x00];
            super::packet::write_varint(&mut payload, json.len() as i32);
            payload.extend_from_slice(json.as_bytes());

            let mut packet = Vec::new();
            super::packet::write_varint(&mut packet, payload.len() as i32);
            packet.extend_from_slice(&payload);

            socket.write_all(&packet).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn test_ping_full_exchange() {
        let addr = spawn_fake_server(json!({
            "version": {"name": "Paper 1.21.1", "protocol": 767},
            "players": {"online": 7, "max": 40},
            "description": {"text": "Stonefell SMP"},
            "favicon": "data:image/png;base64,AAAA"
        }))
        .await;

        let status = ping("127.0.0.1", addr.port(), Duration::from_secs(2))
            .await
            .unwrap();

        assert!(status.online);
        assert_eq!(status.players.online, 7);
        assert_eq!(status.players.max, 40);
        assert_eq!(status.version.as_deref(), Some("Paper 1.21.1"));
        assert_eq!(status.motd.as_deref(), Some("Stonefell SMP"));
        assert_eq!(status.favicon.as_deref(), Some("data:image/png;base64,AAAA"));
    }

    #[tokio::test]
    async fn test_ping_minimal_payload() {
        let addr = spawn_fake_server(json!({})).await;

        let status = ping("127.0.0.1", addr.port(), Duration::from_secs(2))
            .await
            .unwrap();

        assert!(status.online);
        assert_eq!(status.players.online, 0);
        assert_eq!(status.version, None);
        assert_eq!(status.motd, None);
    }

    #[tokio::test]
    async fn test_ping_times_out_on_silent_server() {
        // Accept the connection but never answer
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let err = ping("127.0.0.1", addr.port(), Duration::from_millis(150))
            .await
            .unwrap_err();
        assert!(matches!(err, PingError::Timeout(150)));
    }

    #[tokio::test]
    async fn test_ping_refused_connection() {
        // Bind then drop to find a port with nothing listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = ping("127.0.0.1", addr.port(), Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, PingError::Io(_)));
    }
}
