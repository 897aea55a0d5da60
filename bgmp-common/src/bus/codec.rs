//! Datagram codec for bus messages
//!
//! Each datagram is one OSC 1.0 message: the address is `/<topic>` and every
//! payload element travels as a blob argument. String arguments, which most
//! OSC senders use for text, are accepted on receipt as their UTF-8 bytes.

use rosc::{OscMessage, OscPacket, OscType};

use super::Message;
use crate::error::{Error, Result};

/// Largest payload a single UDP datagram can carry over IPv4
pub const MAX_DATAGRAM: usize = 65_507;

/// Encode a message into a single datagram
pub fn encode(message: &Message) -> Result<Vec<u8>> {
    if message.topic.is_empty() || message.topic.contains('\0') {
        return Err(Error::Codec(format!("invalid topic {:?}", message.topic)));
    }

    let packet = OscPacket::Message(OscMessage {
        addr: format!("/{}", message.topic),
        args: message.payload.iter().cloned().map(OscType::Blob).collect(),
    });
    let datagram = rosc::encoder::encode(&packet)
        .map_err(|e| Error::Codec(format!("encode failed: {:?}", e)))?;

    if datagram.len() > MAX_DATAGRAM {
        return Err(Error::Codec(format!(
            "encoded message is {} bytes, limit is {}",
            datagram.len(),
            MAX_DATAGRAM
        )));
    }
    Ok(datagram)
}

/// Decode a single datagram into a message
pub fn decode(datagram: &[u8]) -> Result<Message> {
    let (rest, packet) = rosc::decoder::decode_udp(datagram)
        .map_err(|e| Error::Codec(format!("malformed datagram: {:?}", e)))?;
    if !rest.is_empty() {
        return Err(Error::Codec(format!("{} trailing bytes", rest.len())));
    }

    let message = match packet {
        OscPacket::Message(message) => message,
        OscPacket::Bundle(_) => {
            return Err(Error::Codec("OSC bundles are not supported".to_string()))
        }
    };

    let topic = message
        .addr
        .strip_prefix('/')
        .filter(|topic| !topic.is_empty())
        .ok_or_else(|| Error::Codec(format!("bad address {:?}", message.addr)))?
        .to_string();

    let payload = message
        .args
        .into_iter()
        .map(|arg| match arg {
            OscType::Blob(bytes) => Ok(bytes),
            OscType::String(text) => Ok(text.into_bytes()),
            other => Err(Error::Codec(format!("unsupported argument {:?}", other))),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Message { topic, payload })
}
