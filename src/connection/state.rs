//! Module `state`
//!
//! Tracks which nickname, if any, a connection is logged in as.

use crate::registry::ConnectionId;

/// Protocol phase of one connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Anonymous,
    Authenticated(String),
    Closed,
}

/// State of a single server-side connection.
///
/// Transitions: `Anonymous -> Authenticated` on login, back on logout, and
/// any phase to `Closed` when the transport goes away.
#[derive(Debug)]
pub struct ConnectionState {
    id: ConnectionId,
    phase: SessionPhase,
}

impl ConnectionState {
    pub fn new(id: ConnectionId) -> Self {
        Self {
            id,
            phase: SessionPhase::Anonymous,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    /// Nickname bound by a successful login
    pub fn nickname(&self) -> Option<&str> {
        match &self.phase {
            SessionPhase::Authenticated(nickname) => Some(nickname),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.nickname().is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.phase == SessionPhase::Closed
    }

    pub fn bind(&mut self, nickname: impl Into<String>) {
        if !self.is_closed() {
            self.phase = SessionPhase::Authenticated(nickname.into());
        }
    }

    /// Back to anonymous; returns the nickname that was bound
    pub fn unbind(&mut self) -> Option<String> {
        self.take_nickname(SessionPhase::Anonymous)
    }

    /// Terminal transition; returns the nickname that still needs logging out
    pub fn close(&mut self) -> Option<String> {
        self.take_nickname(SessionPhase::Closed)
    }

    fn take_nickname(&mut self, next: SessionPhase) -> Option<String> {
        if self.is_closed() {
            return None;
        }
        match std::mem::replace(&mut self.phase, next) {
            SessionPhase::Authenticated(nickname) => Some(nickname),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_logout_cycle() {
        let mut state = ConnectionState::new(ConnectionId::new(1));
        assert_eq!(state.phase(), &SessionPhase::Anonymous);

        state.bind("a");
        assert_eq!(state.nickname(), Some("a"));

        assert_eq!(state.unbind(), Some("a".to_string()));
        assert!(!state.is_authenticated());
        assert_eq!(state.unbind(), None);
    }

    #[test]
    fn close_is_terminal() {
        let mut state = ConnectionState::new(ConnectionId::new(1));
        state.bind("a");

        assert_eq!(state.close(), Some("a".to_string()));
        assert!(state.is_closed());
        assert_eq!(state.close(), None);

        state.bind("b");
        assert!(state.is_closed());
        assert_eq!(state.nickname(), None);
    }
}
