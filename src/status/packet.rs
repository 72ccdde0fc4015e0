//! Server List Ping framing
//!
//! The status handshake uses length-prefixed packets whose integers are
//! VarInt encoded: seven payload bits per byte, low bits first, high bit
//! set on every byte but the last. Five bytes at most.

use tokio::io::{AsyncRead, AsyncReadExt};

use super::PingError;

/// Upper bound on a declared payload length; a status response is a few
/// KiB of JSON plus an optional base64 favicon.
pub const MAX_PACKET_LEN: usize = 1024 * 1024;

const STATUS_PACKET_ID: i32 = 0x00;

pub fn write_varint(buf: &mut Vec<u8>, value: i32) {
    let mut value = value as u32;
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

pub async fn read_varint<R: AsyncRead + Unpin>(reader: &mut R) -> Result<i32, PingError> {
    let mut value: u32 = 0;
    for i in 0..5 {
        let byte = reader.read_u8().await?;
        value |= ((byte & 0x7F) as u32) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value as i32);
        }
    }
    Err(PingError::Protocol("VarInt longer than five bytes".into()))
}

fn write_string(buf: &mut Vec<u8>, s: &str) {
    write_varint(buf, s.len() as i32);
    buf.extend_from_slice(s.as_bytes());
}

/// Length-prefix a packet payload
fn frame(payload: Vec<u8>) -> Vec<u8> {
    let mut packet = Vec::with_capacity(payload.len() + 5);
    write_varint(&mut packet, payload.len() as i32);
    packet.extend_from_slice(&payload);
    packet
}

/// Handshake announcing intent to query status. Protocol version -1 means
/// the client is only probing, not joining.
pub fn build_handshake(host: &str, port: u16) -> Vec<u8> {
    let mut payload = Vec::new();
    write_varint(&mut payload, 0x00);
    write_varint(&mut payload, -1);
    write_string(&mut payload, host);
    payload.extend_from_slice(&port.to_be_bytes());
    write_varint(&mut payload, 1);
    frame(payload)
}

/// The empty status request that follows the handshake
pub fn build_status_request() -> Vec<u8> {
    frame(vec![STATUS_PACKET_ID as u8])
}

/// Read the status response packet and return its JSON payload
pub async fn read_status_response<R: AsyncRead + Unpin>(reader: &mut R) -> Result<String, PingError> {
    let packet_len = read_varint(reader).await?;
    if packet_len <= 0 || packet_len as usize > MAX_PACKET_LEN {
        return Err(PingError::Protocol(format!(
            "bad packet length {}",
            packet_len
        )));
    }

    let packet_id = read_varint(reader).await?;
    if packet_id != STATUS_PACKET_ID {
        return Err(PingError::Protocol(format!(
            "expected status packet, got id {:#04x}",
            packet_id
        )));
    }

    let json_len = read_varint(reader).await?;
    if json_len < 0 || json_len as usize > MAX_PACKET_LEN {
        return Err(PingError::Protocol(format!(
            "bad payload length {}",
            json_len
        )));
    }

    let mut payload = vec![0u8; json_len as usize];
    reader.read_exact(&mut payload).await?;

    String::from_utf8(payload)
        .map_err(|_| PingError::Protocol("status payload is not UTF-8".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn varint(value: i32) -> Vec<u8> {
        let mut buf = Vec::new();
        write_varint(&mut buf, value);
        buf
    }

    #[test]
    fn test_varint_encoding() {
        assert_eq!(varint(0), [0x00]);
        assert_eq!(varint(1), [0x01]);
        assert_eq!(varint(127), [0x7f]);
        assert_eq!(varint(128), [0x80, 0x01]);
        assert_eq!(varint(255), [0xff, 0x01]);
        assert_eq!(varint(2_097_151), [0xff, 0xff, 0x7f]);
        assert_eq!(varint(i32::MAX), [0xff, 0xff, 0xff, 0xff, 0x07]);
        assert_eq!(varint(-1), [0xff, 0xff, 0xff, 0xff, 0x0f]);
    }

    #[tokio::test]
    async fn test_varint_round_trip() {
        for value in [0, 1, 127, 128, 300, 25565, i32::MAX, -1, i32::MIN] {
            let mut cursor = Cursor::new(varint(value));
            assert_eq!(read_varint(&mut cursor).await.unwrap(), value);
        }
    }

    #[tokio::test]
    async fn test_varint_rejects_overlong() {
        let mut cursor = Cursor::new(vec![0x80, 0x80, 0x80, 0x80, 0x80, 0x01]);
        let err = read_varint(&mut cursor).await.unwrap_err();
        assert!(matches!(err, PingError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_handshake_layout() {
        let packet = build_handshake("mc.example.com", 25565);
        let mut cursor = Cursor::new(packet);

        let len = read_varint(&mut cursor).await.unwrap();
        let payload_start = cursor.position();

        assert_eq!(read_varint(&mut cursor).await.unwrap(), 0x00);
        assert_eq!(read_varint(&mut cursor).await.unwrap(), -1);

        let host_len = read_varint(&mut cursor).await.unwrap();
        assert_eq!(host_len, 14);
        let mut host = vec![0u8; host_len as usize];
        cursor.read_exact(&mut host).await.unwrap();
        assert_eq!(host, b"mc.example.com");

        let mut port = [0u8; 2];
        cursor.read_exact(&mut port).await.unwrap();
        assert_eq!(u16::from_be_bytes(port), 25565);

        assert_eq!(read_varint(&mut cursor).await.unwrap(), 1);

        let consumed = cursor.position() - payload_start;
        assert_eq!(consumed, len as u64);
    }

    #[tokio::test]
    async fn test_read_status_response() {
        let json = r#"{"version":{"name":"Paper 1.21"}}"#;
        let mut payload = vec![0x00];
        write_varint(&mut payload, json.len() as i32);
        payload.extend_from_slice(json.as_bytes());
        let packet = frame(payload);

        let mut cursor = Cursor::new(packet);
        let body = read_status_response(&mut cursor).await.unwrap();
        assert_eq!(body, json);
    }

    #[tokio::test]
    async fn test_response_with_wrong_packet_id() {
        let packet = frame(vec![0x7b]);
        let mut cursor = Cursor::new(packet);
        let err = read_status_response(&mut cursor).await.unwrap_err();
        assert!(matches!(err, PingError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_response_with_oversized_length() {
        let mut packet = Vec::new();
        write_varint(&mut packet, (MAX_PACKET_LEN + 1) as i32);
        packet.push(0x00);
        let mut cursor = Cursor::new(packet);
        let err = read_status_response(&mut cursor).await.unwrap_err();
        assert!(matches!(err, PingError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_truncated_response() {
        let mut payload = vec![0x00];
        write_varint(&mut payload, 100);
        payload.extend_from_slice(b"short");
        let packet = frame(payload);

        let mut cursor = Cursor::new(packet);
        let err = read_status_response(&mut cursor).await.unwrap_err();
        assert!(matches!(err, PingError::Io(_)));
    }
}
