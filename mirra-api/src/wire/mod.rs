//! Radio frame codec.
//!
//! Every frame starts with a 13 byte header: one flags byte holding the
//! message type and the last flag, then the source and destination MAC.
//! The body layout is implied by the type; there is no length field or
//! version byte. Multi-byte fields are little-endian.

pub mod error;
pub mod frame;

use alloc::vec::Vec;

pub use error::DecodeError;
pub use frame::{FrameFlags, FrameHeader, MAX_MESSAGE_LENGTH};

use crate::message::{
    Message, MessageHeader, MessagePayload, MessageType, SensorData, SensorValue, TimeConfig,
};

/// Encodes a message into its on-air layout.
pub fn encode(message: &Message) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(message.encoded_len());

    FrameHeader {
        message_type: message.message_type(),
        last: message.header.last,
        source: message.header.source,
        dest: message.header.dest,
    }
    .encode(&mut buffer);

    match &message.payload {
        MessagePayload::TimeConfig(config) => {
            for field in [
                config.cur_time,
                config.sample_interval,
                config.sample_rounding,
                config.sample_offset,
                config.comm_interval,
                config.comm_time,
                config.max_messages,
            ] {
                buffer.extend_from_slice(&field.to_le_bytes());
            }
        }
        MessagePayload::SensorData(data) => {
            buffer.extend_from_slice(&data.time.to_le_bytes());
            buffer.push(data.n_values());
            for value in data.values() {
                buffer.extend_from_slice(&value.tag.to_le_bytes());
                buffer.extend_from_slice(&value.value.to_le_bytes());
            }
        }
        _ => {}
    }

    buffer
}

/// Decodes a received frame.
///
/// `SENSOR_DATA` value counts are clamped to what the buffer actually holds,
/// so a corrupt count never reads past the frame.
pub fn decode(data: &[u8]) -> Result<Message, DecodeError> {
    if data.len() > MAX_MESSAGE_LENGTH {
        return Err(DecodeError::Oversized(data.len()));
    }

    let header = FrameHeader::decode(data)?;
    let body = &data[FrameHeader::SIZE..];

    let payload = match header.message_type {
        MessageType::Error => MessagePayload::Error,
        MessageType::Hello => MessagePayload::Hello,
        MessageType::HelloReply => MessagePayload::HelloReply,
        MessageType::AckTime => MessagePayload::AckTime,
        MessageType::AckData => MessagePayload::AckData,
        MessageType::Repeat => MessagePayload::Repeat,
        MessageType::TimeConfig => MessagePayload::TimeConfig(decode_time_config(body)?),
        MessageType::SensorData => MessagePayload::SensorData(decode_sensor_data(body)?),
        MessageType::All => return Err(DecodeError::UnknownType(MessageType::All.as_u8())),
    };

    Ok(Message {
        header: MessageHeader {
            last: header.last,
            source: header.source,
            dest: header.dest,
        },
        payload,
    })
}

fn read_u32(body: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([body[offset], body[offset + 1], body[offset + 2], body[offset + 3]])
}

fn decode_time_config(body: &[u8]) -> Result<TimeConfig, DecodeError> {
    if body.len() < TimeConfig::SIZE {
        return Err(DecodeError::Truncated(MessageType::TimeConfig));
    }

    Ok(TimeConfig {
        cur_time: read_u32(body, 0),
        sample_interval: read_u32(body, 4),
        sample_rounding: read_u32(body, 8),
        sample_offset: read_u32(body, 12),
        comm_interval: read_u32(body, 16),
        comm_time: read_u32(body, 20),
        max_messages: read_u32(body, 24),
    })
}

fn decode_sensor_data(body: &[u8]) -> Result<SensorData, DecodeError> {
    if body.len() < 5 {
        return Err(DecodeError::Truncated(MessageType::SensorData));
    }

    let time = read_u32(body, 0);
    let available = (body.len() - 5) / SensorValue::SIZE;
    let n_values = (body[4] as usize)
        .min(available)
        .min(SensorData::MAX_VALUES);

    let values = body[5..5 + n_values * SensorValue::SIZE]
        .chunks_exact(SensorValue::SIZE)
        .map(|chunk| {
            SensorValue::new(
                u16::from_le_bytes([chunk[0], chunk[1]]),
                f32::from_le_bytes([chunk[2], chunk[3], chunk[4], chunk[5]]),
            )
        })
        .collect();

    Ok(SensorData::new(time, values))
}
