// MIT License - Copyright (c) 2026 ad2-bridge authors

/// All errors that can occur in the ad2-bridge library.
#[derive(Debug, thiserror::Error)]
pub enum AdError {
    /// Bad or unusable configuration (unresolvable host, invalid port,
    /// unknown serial device). Terminal: never retried automatically.
    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    /// Transport-level I/O failure while opening or operating the
    /// connection. Transient: a reconnect is scheduled.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The serial device is already claimed by another process.
    /// Surfaced as offline without an automatic retry.
    #[error("serial port in use: {device}")]
    PortInUse { device: String },

    /// A received line could not be decoded. Local to the reader loop;
    /// the line is logged and dropped.
    #[error("malformed message ({reason}): {line}")]
    MalformedMessage { line: String, reason: String },

    /// A keypad command contains characters outside the allowed set.
    #[error("invalid keypad command: {command}")]
    InvalidCommand { command: String },

    /// Operation requires an open connection but none exists.
    #[error("not connected")]
    Disconnected,

    /// The event channel was closed while waiting on it.
    #[error("channel closed")]
    ChannelClosed,
}

impl AdError {
    /// Whether this error is transient and the connection should be
    /// retried after the configured delay.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AdError::Io(_) | AdError::Disconnected)
    }
}

pub type Result<T> = std::result::Result<T, AdError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(AdError::Io(std::io::Error::other("boom")).is_retryable());
        assert!(AdError::Disconnected.is_retryable());
        assert!(!AdError::Configuration { reason: "x".into() }.is_retryable());
        assert!(!AdError::PortInUse { device: "/dev/ttyUSB0".into() }.is_retryable());
        assert!(!AdError::MalformedMessage { line: "x".into(), reason: "y".into() }
            .is_retryable());
    }
}
