//! Wire format of the companion notification: the launch code as ASCII
//! decimal digits, one code per datagram, nothing else.

use crate::{domain::LaunchCode, error::ProtocolError};

pub fn encode(code: LaunchCode) -> Vec<u8> {
    code.to_string().into_bytes()
}

/// Parses a datagram the way the companion does: surrounding whitespace is
/// ignored, anything else must be one of the known codes.
pub fn decode(payload: &[u8]) -> Result<LaunchCode, ProtocolError> {
    let text = String::from_utf8_lossy(payload);
    let text = text.trim();
    if text.is_empty() {
        return Err(ProtocolError::Empty);
    }
    let value: i64 = text
        .parse()
        .map_err(|_| ProtocolError::NotAnInteger(text.to_string()))?;
    LaunchCode::from_code(value).ok_or(ProtocolError::UnknownCode(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_bare_ascii_digits() {
        assert_eq!(encode(LaunchCode::Single), b"1");
        assert_eq!(encode(LaunchCode::Fuse), b"4");
    }

    #[test]
    fn decode_tolerates_whitespace() {
        assert_eq!(decode(b" 3\n"), Ok(LaunchCode::Finale));
    }

    #[test]
    fn decode_rejects_garbage_and_unknown_codes() {
        assert_eq!(decode(b""), Err(ProtocolError::Empty));
        assert_eq!(
            decode(b"boom"),
            Err(ProtocolError::NotAnInteger("boom".into()))
        );
        assert_eq!(decode(b"0"), Err(ProtocolError::UnknownCode(0)));
        assert_eq!(decode(b"5"), Err(ProtocolError::UnknownCode(5)));
    }
}
