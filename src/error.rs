use core::fmt;

/// Errors returned by the codec and RLC layers.
///
/// None of these are fatal to the process: the codec and RLC layers surface them as return
/// codes and never panic or terminate on a protocol-level failure. Upstream components decide
/// whether a failure is fatal for the session.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RlcError {
    /// A value was out of range, a write ran past the end of the target buffer, or pack
    /// arguments were otherwise invalid.
    EncodeFail(&'static str),

    /// A read ran past the end of the source buffer, an enumerated value was outside its
    /// declared set, a length determinant exceeded its bound, or an open-type's inner decode
    /// failed.
    DecodeFail(&'static str),

    /// The buffer pool has no free buffers left.
    PoolExhausted,

    /// The SDU queue is bounded and full.
    QueueFull,

    /// An incoming PDU violated a protocol invariant: an LI extended past the payload, its SN
    /// duplicated one already in the rx window, or its SN fell outside the reordering window.
    ProtocolViolation(&'static str),
}

impl fmt::Display for RlcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RlcError::EncodeFail(why) => write!(f, "encode failed: {}", why),
            RlcError::DecodeFail(why) => write!(f, "decode failed: {}", why),
            RlcError::PoolExhausted => f.write_str("buffer pool exhausted"),
            RlcError::QueueFull => f.write_str("SDU queue full"),
            RlcError::ProtocolViolation(why) => write!(f, "protocol violation: {}", why),
        }
    }
}

impl std::error::Error for RlcError {}

pub type Result<T> = core::result::Result<T, RlcError>;
