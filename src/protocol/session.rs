//! Per-connection session state.
//!
//! A session owns the negotiation state of one transport connection. It never
//! holds capability data, so any number of sessions can share one registry.

use crate::error::{ProtocolError, ProtocolResult};
use crate::protocol::types::{ClientCapabilities, ClientInfo, RequestId, methods};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info};
use uuid::Uuid;

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, transport not yet attached.
    Connecting,
    /// Transport attached, waiting for `initialize`.
    Negotiating,
    /// Initialize exchange done; all methods accepted.
    Active,
    /// Close requested; in-flight work is being discarded.
    Closing,
    /// Terminal. Nothing is processed any more.
    Closed,
}

/// Which transport a session is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Stream,
    Push,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream => f.write_str("stream"),
            Self::Push => f.write_str("push"),
        }
    }
}

/// Identity and capabilities announced by the client during `initialize`.
#[derive(Debug, Clone)]
pub struct Negotiated {
    pub client_info: ClientInfo,
    pub capabilities: ClientCapabilities,
    pub protocol_version: String,
}

/// One connected client.
pub struct Session {
    id: String,
    transport: TransportKind,
    state: RwLock<SessionState>,
    negotiated: RwLock<Option<Negotiated>>,
    answered: Mutex<HashSet<RequestId>>,
}

impl Session {
    pub fn new(transport: TransportKind) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), transport)
    }

    pub fn with_id(id: impl Into<String>, transport: TransportKind) -> Self {
        Self {
            id: id.into(),
            transport,
            state: RwLock::new(SessionState::Connecting),
            negotiated: RwLock::new(None),
            answered: Mutex::new(HashSet::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    pub fn is_closed(&self) -> bool {
        self.state() == SessionState::Closed
    }

    pub fn negotiated(&self) -> Option<Negotiated> {
        self.negotiated.read().clone()
    }

    /// Transport attached: start waiting for `initialize`.
    pub fn open(&self) {
        let mut state = self.state.write();
        if *state == SessionState::Connecting {
            *state = SessionState::Negotiating;
            debug!(session = %self.id, transport = %self.transport, "Session negotiating");
        }
    }

    /// Check whether `method` may run in the current state.
    pub fn admit(&self, method: &str) -> ProtocolResult<()> {
        match self.state() {
            SessionState::Closing | SessionState::Closed => Err(ProtocolError::SessionClosed),
            SessionState::Connecting | SessionState::Negotiating => match method {
                methods::INITIALIZE | methods::PING => Ok(()),
                other => Err(ProtocolError::NotInitialized(other.to_string())),
            },
            SessionState::Active => match method {
                methods::INITIALIZE => Err(ProtocolError::AlreadyInitialized),
                _ => Ok(()),
            },
        }
    }

    /// Record a completed initialize exchange.
    pub fn activate(&self, negotiated: Negotiated) {
        let mut state = self.state.write();
        if matches!(
            *state,
            SessionState::Connecting | SessionState::Negotiating
        ) {
            info!(
                session = %self.id,
                client = %negotiated.client_info.name,
                client_version = %negotiated.client_info.version,
                "Session active"
            );
            *self.negotiated.write() = Some(negotiated);
            *state = SessionState::Active;
        }
    }

    /// Reserve a correlation id. Fails if the id was already answered here.
    pub fn claim_id(&self, id: &RequestId) -> ProtocolResult<()> {
        if self.answered.lock().insert(id.clone()) {
            Ok(())
        } else {
            Err(ProtocolError::InvalidRequest(
                format!("request id {id} was already used on this session").into(),
            ))
        }
    }

    pub fn begin_close(&self) {
        let mut state = self.state.write();
        if *state != SessionState::Closed {
            *state = SessionState::Closing;
        }
    }

    pub fn close(&self) {
        let mut state = self.state.write();
        if *state != SessionState::Closed {
            *state = SessionState::Closed;
            info!(session = %self.id, transport = %self.transport, "Session closed");
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("transport", &self.transport)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn negotiated() -> Negotiated {
        Negotiated {
            client_info: ClientInfo {
                name: "test-client".into(),
                version: "1.0".into(),
            },
            capabilities: ClientCapabilities::default(),
            protocol_version: "2024-11-05".into(),
        }
    }

    #[test]
    fn test_lifecycle() {
        let session = Session::new(TransportKind::Stream);
        assert_eq!(session.state(), SessionState::Connecting);

        session.open();
        assert_eq!(session.state(), SessionState::Negotiating);

        session.activate(negotiated());
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(session.negotiated().unwrap().client_info.name, "test-client");

        session.begin_close();
        assert_eq!(session.state(), SessionState::Closing);

        session.close();
        assert!(session.is_closed());
    }

    #[test]
    fn test_admit_before_initialize() {
        let session = Session::new(TransportKind::Push);
        session.open();

        assert!(session.admit("initialize").is_ok());
        assert!(session.admit("ping").is_ok());
        let err = session.admit("tools/list").unwrap_err();
        assert!(matches!(err, ProtocolError::NotInitialized(_)));
    }

    #[test]
    fn test_admit_after_initialize() {
        let session = Session::new(TransportKind::Stream);
        session.open();
        session.activate(negotiated());

        assert!(session.admit("tools/call").is_ok());
        assert!(matches!(
            session.admit("initialize").unwrap_err(),
            ProtocolError::AlreadyInitialized
        ));
    }

    #[test]
    fn test_closed_session_rejects_everything() {
        let session = Session::new(TransportKind::Stream);
        session.open();
        session.close();

        for method in ["initialize", "ping", "tools/list"] {
            assert!(matches!(
                session.admit(method).unwrap_err(),
                ProtocolError::SessionClosed
            ));
        }
    }

    #[test]
    fn test_closed_session_is_not_reopened() {
        let session = Session::new(TransportKind::Stream);
        session.close();
        session.open();
        session.activate(negotiated());
        assert!(session.is_closed());
    }

    #[test]
    fn test_claim_id_rejects_reuse() {
        let session = Session::new(TransportKind::Stream);
        assert!(session.claim_id(&RequestId::Number(1)).is_ok());
        assert!(session.claim_id(&RequestId::String("1".into())).is_ok());
        assert!(session.claim_id(&RequestId::Number(1)).is_err());
    }
}
