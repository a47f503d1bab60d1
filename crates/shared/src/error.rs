use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoundError {
    #[error("round index {0} is past the final round")]
    OutOfRange(u8),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("empty launch payload")]
    Empty,
    #[error("launch payload is not an ASCII integer: {0:?}")]
    NotAnInteger(String),
    #[error("unknown launch code {0}")]
    UnknownCode(i64),
}
