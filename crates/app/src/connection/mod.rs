/// Browser detection for the delayed-handshake quirk.
pub mod browser;
/// Normalization of provider failures into user-facing text.
pub mod classify;
pub mod manager;
/// Deterministic session state boundary.
pub mod state;
/// Polling bridge for wallets without account-change notifications.
pub mod watch;

pub use browser::{BrowserProfile, EDGE_PINNING_HINT};
pub use classify::{ConnectFailure, PROVIDER_UNAVAILABLE_MESSAGE, USER_DECLINED_MESSAGE};
pub use manager::{
    ConnectionCommand, ConnectionError, ConnectionHandle, ConnectionManager, ConnectionOptions,
    ConnectionResult, DEFAULT_COMPENSATION_DELAY,
};
pub use state::{
    ConnectionState, ConnectionTransition, ConnectionTransitionRejection,
    ConnectionTransitionResult, Session,
};
pub use watch::spawn_account_watch;
