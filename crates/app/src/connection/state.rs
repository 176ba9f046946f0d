use crate::wallet::Address;

use super::classify::ConnectFailure;

/// Wallet session lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected {
        address: Address,
    },
    Error(ConnectFailure),
}

/// State transition input for the session lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionTransition {
    Begin,
    Succeed(Address),
    Fail(ConnectFailure),
    Disconnect,
}

/// Rejection reason for illegal session transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionTransitionRejection {
    AlreadyConnected { address: Address },
    NoAttemptInFlight,
}

pub type ConnectionTransitionResult = Result<ConnectionState, ConnectionTransitionRejection>;

/// Flattened view of the session handed to the conversation and the surface.
///
/// Derived from [`ConnectionState`], so `address.is_some() == connected` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    pub connected: bool,
    pub address: Option<Address>,
    pub last_error: Option<String>,
}

impl ConnectionState {
    pub fn session(&self) -> Session {
        match self {
            Self::Connected { address } => Session {
                connected: true,
                address: Some(address.clone()),
                last_error: None,
            },
            Self::Error(failure) => Session {
                connected: false,
                address: None,
                last_error: Some(failure.user_message().to_string()),
            },
            Self::Disconnected | Self::Connecting => Session::default(),
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self, Self::Connecting)
    }

    /// Applies one transition deterministically.
    ///
    /// `Begin` is accepted from `Disconnected` and `Error`, and is idempotent while an
    /// attempt is already in flight. `Succeed`/`Fail` only settle an in-flight attempt.
    /// `Disconnect` is unconditional.
    pub fn apply(&self, transition: ConnectionTransition) -> ConnectionTransitionResult {
        match transition {
            ConnectionTransition::Begin => self.apply_begin(),
            ConnectionTransition::Succeed(address) => self.apply_settle(Self::Connected { address }),
            ConnectionTransition::Fail(failure) => self.apply_settle(Self::Error(failure)),
            ConnectionTransition::Disconnect => Ok(Self::Disconnected),
        }
    }

    fn apply_begin(&self) -> ConnectionTransitionResult {
        match self {
            Self::Connected { address } => Err(ConnectionTransitionRejection::AlreadyConnected {
                address: address.clone(),
            }),
            Self::Disconnected | Self::Connecting | Self::Error(_) => Ok(Self::Connecting),
        }
    }

    fn apply_settle(&self, next: Self) -> ConnectionTransitionResult {
        match self {
            Self::Connecting => Ok(next),
            Self::Disconnected | Self::Connected { .. } | Self::Error(_) => {
                Err(ConnectionTransitionRejection::NoAttemptInFlight)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> Address {
        Address::parse("0x71C7656EC7ab88b098defB751B7401B5f6d8976F").expect("address")
    }

    fn assert_session_invariant(state: &ConnectionState) {
        let session = state.session();
        assert_eq!(session.connected, session.address.is_some(), "{state:?}");
    }

    #[test]
    fn happy_path_and_teardown() {
        let state = ConnectionState::default();
        let state = state.apply(ConnectionTransition::Begin).expect("begin");
        assert_eq!(state, ConnectionState::Connecting);

        let state = state
            .apply(ConnectionTransition::Succeed(address()))
            .expect("succeed");
        assert_eq!(state.session().address, Some(address()));

        let state = state.apply(ConnectionTransition::Disconnect).expect("disconnect");
        assert_eq!(state, ConnectionState::Disconnected);
        assert_eq!(state.session(), Session::default());
    }

    #[test]
    fn error_is_not_terminal() {
        let state = ConnectionState::Connecting
            .apply(ConnectionTransition::Fail(ConnectFailure::UserDeclined))
            .expect("fail");
        assert_eq!(
            state.session().last_error.as_deref(),
            Some("You cancelled the connection")
        );

        let state = state.apply(ConnectionTransition::Begin).expect("retry");
        assert_eq!(state, ConnectionState::Connecting);
        assert_eq!(state.session().last_error, None);
    }

    #[test]
    fn settling_without_an_attempt_is_rejected() {
        for state in [
            ConnectionState::Disconnected,
            ConnectionState::Error(ConnectFailure::ProviderUnavailable),
            ConnectionState::Connected { address: address() },
        ] {
            assert_eq!(
                state.apply(ConnectionTransition::Succeed(address())),
                Err(ConnectionTransitionRejection::NoAttemptInFlight)
            );
            assert_eq!(
                state.apply(ConnectionTransition::Fail(ConnectFailure::UserDeclined)),
                Err(ConnectionTransitionRejection::NoAttemptInFlight)
            );
        }
    }

    #[test]
    fn begin_while_connected_is_rejected() {
        let state = ConnectionState::Connected { address: address() };
        assert_eq!(
            state.apply(ConnectionTransition::Begin),
            Err(ConnectionTransitionRejection::AlreadyConnected { address: address() })
        );
    }

    #[test]
    fn session_invariant_holds_across_every_reachable_state() {
        let transitions = [
            ConnectionTransition::Begin,
            ConnectionTransition::Succeed(address()),
            ConnectionTransition::Fail(ConnectFailure::ProviderUnavailable),
            ConnectionTransition::Disconnect,
        ];

        let mut frontier = vec![ConnectionState::default()];
        let mut seen = Vec::new();
        while let Some(state) = frontier.pop() {
            if seen.contains(&state) {
                continue;
            }
            assert_session_invariant(&state);
            for transition in transitions.iter().cloned() {
                if let Ok(next) = state.apply(transition) {
                    frontier.push(next);
                }
            }
            seen.push(state);
        }

        assert_eq!(seen.len(), 4);
    }
}
