//! Text wire format for landmark packets: `[345, 210, -12, 350, 225, -10]`.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketDecodeError {
    #[error("Packet is not valid UTF-8")]
    NotUtf8,

    #[error("Packet must be enclosed in [ and ]")]
    MissingBrackets,

    #[error("Invalid integer {value:?} at position {position}")]
    InvalidInteger { position: usize, value: String },

    #[error("Packet has {len} values, expected a multiple of 3")]
    IncompleteTriple { len: usize },
}

/// Renders `values` as a bracketed, `", "`-separated list in UTF-8.
pub fn encode_packet(values: &[i32]) -> Vec<u8> {
    let body = values
        .iter()
        .map(i32::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{body}]").into_bytes()
}

/// Parses a packet produced by [`encode_packet`].
///
/// Whitespace around elements is tolerated. The element count must be a
/// multiple of 3 since every landmark contributes `x, y, z`.
pub fn decode_packet(payload: &[u8]) -> Result<Vec<i32>, PacketDecodeError> {
    let text = std::str::from_utf8(payload).map_err(|_| PacketDecodeError::NotUtf8)?;
    let inner = text
        .trim()
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or(PacketDecodeError::MissingBrackets)?;

    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }

    let values = inner
        .split(',')
        .enumerate()
        .map(|(position, item)| {
            let item = item.trim();
            item.parse::<i32>()
                .map_err(|_| PacketDecodeError::InvalidInteger {
                    position,
                    value: item.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if values.len() % 3 != 0 {
        return Err(PacketDecodeError::IncompleteTriple { len: values.len() });
    }
    Ok(values)
}
