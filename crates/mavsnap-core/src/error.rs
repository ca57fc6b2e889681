use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// All errors produced by mavsnap.
#[derive(Error, Debug)]
pub enum MavsnapError {
    /// The link address string could not be understood.
    #[error("Invalid link address: {0}")]
    InvalidAddress(String),

    /// The telemetry link could not be opened.
    #[error("Failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The link reader stopped; no further messages will arrive.
    #[error("Telemetry link closed")]
    LinkClosed,

    /// A message could not be sent over the link.
    #[error("Failed to send {message}: {reason}")]
    Send { message: String, reason: String },

    /// No heartbeat arrived before the configured deadline.
    #[error("No heartbeat received within {0:?}")]
    HeartbeatTimeout(Duration),

    /// A message type name does not look like a telemetry message name.
    #[error("Invalid message type: {0}")]
    InvalidMessageType(String),

    /// The message type list ended up empty.
    #[error("No message types configured")]
    EmptyMessageTypes,

    /// A received message did not serialize to a JSON object.
    #[error("Message {0} did not serialize to a JSON object")]
    NotAnObject(String),

    /// A snapshot file could not be written.
    #[error("Failed to write snapshot {path}: {source}")]
    SnapshotWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be produced or parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the mavsnap crates.
pub type Result<T> = std::result::Result<T, MavsnapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_connect() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such device");
        let err = MavsnapError::Connect {
            address: "serial:/dev/ttyUSB0:57600".to_string(),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to connect"));
        assert!(msg.contains("/dev/ttyUSB0"));
        assert!(msg.contains("no such device"));
    }

    #[test]
    fn test_error_display_link_closed() {
        assert_eq!(MavsnapError::LinkClosed.to_string(), "Telemetry link closed");
    }

    #[test]
    fn test_error_display_heartbeat_timeout() {
        let err = MavsnapError::HeartbeatTimeout(Duration::from_secs(5));
        assert_eq!(err.to_string(), "No heartbeat received within 5s");
    }

    #[test]
    fn test_error_display_invalid_message_type() {
        let err = MavsnapError::InvalidMessageType("attitude".to_string());
        assert_eq!(err.to_string(), "Invalid message type: attitude");
    }

    #[test]
    fn test_error_display_snapshot_write() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = MavsnapError::SnapshotWrite {
            path: PathBuf::from("/params/ATTITUDE.json"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("/params/ATTITUDE.json"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: MavsnapError = json_err.into();
        assert!(err.to_string().contains("JSON error"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let err: MavsnapError = io_err.into();
        assert!(err.to_string().contains("pipe"));
    }
}
