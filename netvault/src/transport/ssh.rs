//! SSH connection to a device over russh: handshake, host keys, password
//! login and the interactive shell channel.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, warn};
use russh::client::{self, Handle, Msg};
use russh::keys::PublicKey;
use secrecy::ExposeSecret;

use super::config::{HostKeyVerification, SshConfig};
use crate::error::{Result, TransportError};

/// Await `fut`, failing with a transport timeout after `limit`.
async fn bounded<F: std::future::Future>(
    limit: Duration,
    fut: F,
) -> std::result::Result<F::Output, TransportError> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| TransportError::Timeout(limit))
}

/// Interval between SSH keepalives while a session is open.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(10);

/// russh client settings.
///
/// No inactivity cutoff: a device may stay silent for the whole dump
/// timeout while it builds its configuration, and every session read is
/// already bounded. Keepalives detect a dead peer instead.
fn client_config() -> client::Config {
    client::Config {
        inactivity_timeout: None,
        keepalive_interval: Some(KEEPALIVE_INTERVAL),
        keepalive_max: 3,
        ..Default::default()
    }
}

/// Byte stream over an interactive shell channel.
pub type ShellStream = russh::ChannelStream<Msg>;

/// Authenticated SSH connection to one device.
pub struct SshTransport {
    session: Handle<DeviceHandler>,
    config: SshConfig,
}

impl SshTransport {
    /// Connect to a device and log in with the shared credentials.
    ///
    /// Both the handshake and the login are bounded by `config.timeout`.
    pub async fn connect(config: SshConfig) -> Result<Self> {
        let rejection = Arc::new(Mutex::new(None));
        let handler = DeviceHandler {
            policy: HostKeyPolicy {
                host: config.host.clone(),
                port: config.port,
                mode: config.host_key_verification,
                known_hosts_path: config.known_hosts_path.clone(),
            },
            rejection: rejection.clone(),
        };
        let client_config = Arc::new(client_config());

        debug!(
            "connecting to {} as {}",
            config.socket_addr(),
            config.credentials.username
        );

        let addr = (config.host.as_str(), config.port);
        let mut session = bounded(config.timeout, client::connect(client_config, addr, handler))
            .await?
            .map_err(|e| {
                rejection
                    .lock()
                    .ok()
                    .and_then(|mut slot| slot.take())
                    .unwrap_or(TransportError::Ssh(e))
            })?;

        let login = session.authenticate_password(
            &config.credentials.username,
            config.credentials.password.expose_secret(),
        );
        if !bounded(config.timeout, login).await?.map_err(TransportError::Ssh)?.success() {
            return Err(TransportError::AuthenticationFailed {
                user: config.credentials.username.clone(),
            }
            .into());
        }

        Ok(Self { session, config })
    }

    /// Open a PTY channel with an interactive shell and return its byte stream.
    pub async fn open_shell(&self) -> Result<ShellStream> {
        let channel = self
            .session
            .channel_open_session()
            .await
            .map_err(TransportError::Ssh)?;

        channel
            .request_pty(
                true,
                "xterm",
                self.config.terminal_width,
                self.config.terminal_height,
                0,
                0,
                &[],
            )
            .await
            .map_err(TransportError::Ssh)?;

        channel
            .request_shell(true)
            .await
            .map_err(TransportError::Ssh)?;

        Ok(channel.into_stream())
    }

    /// Close the connection.
    pub async fn close(self) -> Result<()> {
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }
}

/// Known-hosts policy for one device address.
struct HostKeyPolicy {
    host: String,
    port: u16,
    mode: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
}

impl HostKeyPolicy {
    /// Decide whether `key` is acceptable, learning it when the mode allows.
    fn verify(&self, key: &PublicKey) -> std::result::Result<(), TransportError> {
        if self.mode == HostKeyVerification::Disabled {
            return Ok(());
        }

        let known = match &self.known_hosts_path {
            Some(path) => russh::keys::check_known_hosts_path(&self.host, self.port, key, path),
            None => russh::keys::check_known_hosts(&self.host, self.port, key),
        }
        .map_err(|e| match e {
            russh::keys::Error::KeyChanged { line } => TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            },
            other => TransportError::KnownHosts(other.to_string()),
        })?;

        match (known, self.mode) {
            (true, _) => Ok(()),
            (false, HostKeyVerification::Strict) => Err(TransportError::HostKeyUnknown {
                host: self.host.clone(),
                port: self.port,
            }),
            (false, _) => {
                let learned = match &self.known_hosts_path {
                    Some(path) => russh::keys::known_hosts::learn_known_hosts_path(
                        &self.host, self.port, key, path,
                    ),
                    None => russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, key),
                };
                if let Err(e) = learned {
                    warn!("{}: could not record host key: {}", self.host, e);
                }
                Ok(())
            }
        }
    }
}

/// russh callback handler; keeps the host-key rejection reason for `connect`.
struct DeviceHandler {
    policy: HostKeyPolicy,
    rejection: Arc<Mutex<Option<TransportError>>>,
}

impl client::Handler for DeviceHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match self.policy.verify(server_public_key) {
            Ok(()) => Ok(true),
            Err(e) => {
                debug!("{}: host key rejected: {}", self.policy.host, e);
                if let Ok(mut slot) = self.rejection.lock() {
                    *slot = Some(e);
                }
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_device_is_not_cut_off() {
        let config = client_config();
        assert_eq!(config.inactivity_timeout, None);
        assert_eq!(config.keepalive_interval, Some(KEEPALIVE_INTERVAL));

        // A dead peer is noticed well within the long dump timeout
        let dump_timeout = crate::session::SessionConfig::default().dump_timeout;
        assert!(KEEPALIVE_INTERVAL * (config.keepalive_max as u32 + 1) < dump_timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_times_out() {
        let err = bounded(Duration::from_secs(15), std::future::pending::<()>())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Timeout(t) if t == Duration::from_secs(15)));
    }
}
