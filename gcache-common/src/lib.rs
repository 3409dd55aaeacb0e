//! # Shared Types and Wire Protocol
//!
//! Purpose: Define the error type and peer-fetch wire framing shared by
//! the core engine, the peer client, and the peer server, so neither side
//! of the network boundary needs to depend on the other.

pub mod wire;

/// Canonical "not found" message. Exposed as a constant so callers on
/// either side of the wire can compare error strings for the sentinel
/// described by the peer-fetch contract.
pub const NOT_FOUND_MSG: &str = "gcache: key not found";

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds the core produces.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// `Group::get("")` was called.
    #[error("gcache: empty key")]
    EmptyKey,

    /// The loader or a peer reported the key has no authoritative value.
    #[error("gcache: key not found")]
    NotFound,

    /// A peer RPC failed (timeout, connection, decode, or a non-sentinel
    /// error string returned by the peer).
    #[error("gcache: peer transport error: {0}")]
    PeerTransport(String),

    /// The user-supplied loader returned a non-not-found error.
    #[error("gcache: loader error: {0}")]
    Loader(String),
}

impl Error {
    /// True when this error is the not-found sentinel, either produced
    /// locally or decoded off the wire via [`Error::from_wire_message`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }

    /// Renders the error the way it is sent on the wire: the not-found
    /// sentinel renders as the exact [`NOT_FOUND_MSG`] string; everything
    /// else renders as its `Display` text (opaque to the remote side).
    pub fn to_wire_message(&self) -> String {
        match self {
            Error::NotFound => NOT_FOUND_MSG.to_string(),
            other => other.to_string(),
        }
    }

    /// Reconstructs an error from a wire `err` field. `not-found` is
    /// recognized by exact string equality with [`NOT_FOUND_MSG`]; any
    /// other non-empty string becomes an opaque [`Error::PeerTransport`].
    pub fn from_wire_message(message: &str) -> Error {
        if message == NOT_FOUND_MSG {
            Error::NotFound
        } else {
            Error::PeerTransport(message.to_string())
        }
    }
}

/// Display-lossy helper kept off the `Error` type itself: used by logging
/// call sites that want a short tag without matching on variants.
pub fn error_kind(err: &Error) -> &'static str {
    match err {
        Error::EmptyKey => "empty-key",
        Error::NotFound => "not-found",
        Error::PeerTransport(_) => "peer-transport",
        Error::Loader(_) => "loader-error",
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_round_trips_through_wire_message() {
        let wire = Error::NotFound.to_wire_message();
        assert_eq!(wire, NOT_FOUND_MSG);
        assert_eq!(Error::from_wire_message(&wire), Error::NotFound);
    }

    #[test]
    fn opaque_error_round_trips_as_peer_transport() {
        let err = Error::from_wire_message("boom");
        assert_eq!(err, Error::PeerTransport("boom".to_string()));
    }

    #[test]
    fn error_kind_tags_are_stable() {
        assert_eq!(error_kind(&Error::EmptyKey), "empty-key");
        assert_eq!(error_kind(&Error::NotFound), "not-found");
        assert_eq!(error_kind(&Error::PeerTransport("x".into())), "peer-transport");
        assert_eq!(error_kind(&Error::Loader("x".into())), "loader-error");
    }
}
