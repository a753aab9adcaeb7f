//! Service manager readiness notification
//!
//! Sends `READY=1` once the pty is in place and `STOPPING=1` on shutdown, so
//! units ordered after this service (gpsd) find the device. Outside a
//! service manager `NOTIFY_SOCKET` is unset and nothing is sent.

use sd_notify::NotifyState;
use thiserror::Error;

/// Environment variable naming the notification socket
const NOTIFY_SOCKET_ENV: &str = "NOTIFY_SOCKET";

/// Notification errors
#[derive(Debug, Error)]
#[error("Failed to notify {socket}: {source}")]
pub struct NotifyError {
    socket: String,
    #[source]
    source: std::io::Error,
}

/// Tell the service manager the pty is ready
pub fn ready() -> Result<bool, NotifyError> {
    notify(&[NotifyState::Ready])
}

/// Tell the service manager shutdown has begun
pub fn stopping() -> Result<bool, NotifyError> {
    notify(&[NotifyState::Stopping])
}

/// Send `state` to `$NOTIFY_SOCKET`
///
/// Returns `Ok(false)` when not running under a service manager.
fn notify(state: &[NotifyState<'_>]) -> Result<bool, NotifyError> {
    let socket = match std::env::var(NOTIFY_SOCKET_ENV) {
        Ok(socket) if !socket.is_empty() => socket,
        _ => return Ok(false),
    };
    sd_notify::notify(false, state).map_err(|source| NotifyError {
        socket: socket.clone(),
        source,
    })?;
    log::debug!("notify: sent {} state(s) to {}", state.len(), socket);
    Ok(true)
}
