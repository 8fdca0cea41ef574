//! Configuration capture from a single device.
//!
//! [`ConfigCapturer`] is the seam between the backup lifecycle and the
//! network: [`SshCapturer`] opens a session, runs the vendor's command
//! sequence and returns normalized text. The session is closed on every
//! exit path.

use std::future::Future;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::Credentials;
use crate::error::{Error, Result};
use crate::inventory::Device;
use crate::normalize;
use crate::platform::VendorProfile;
use crate::session::{Session, SessionConfig};
use crate::transport::{HostKeyVerification, SshConfig};

/// Something that can fetch a device's current configuration.
pub trait ConfigCapturer: Send + Sync {
    /// Capture and normalize the running configuration of `device`.
    fn capture(&self, device: &Device) -> impl Future<Output = Result<String>> + Send;
}

/// Captures configurations over interactive SSH.
#[derive(Debug, Clone)]
pub struct SshCapturer {
    credentials: Credentials,
    session_config: SessionConfig,
    connect_timeout: Duration,
    host_key_verification: HostKeyVerification,
}

impl SshCapturer {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            session_config: SessionConfig::default(),
            connect_timeout: Duration::from_secs(15),
            host_key_verification: HostKeyVerification::default(),
        }
    }

    /// Set the session timing configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Set the SSH connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the host key verification mode.
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }
}

impl ConfigCapturer for SshCapturer {
    async fn capture(&self, device: &Device) -> Result<String> {
        let address = device
            .address()
            .ok_or_else(|| Error::NoAddressConfigured {
                device: device.name.clone(),
            })?;

        let profile = VendorProfile::for_manufacturer(&device.manufacturer);
        info!(
            "{}: connecting to {} as {} (vendor {})",
            device.name, address, self.credentials.username, profile.vendor
        );

        let ssh_config = SshConfig::new(address, self.credentials.clone())
            .with_timeout(self.connect_timeout)
            .with_host_key_verification(self.host_key_verification);

        let mut session = Session::open(ssh_config, self.session_config.clone()).await?;
        let result = collect_config(&mut session, profile).await;

        if let Err(e) = session.close().await {
            warn!("{}: error closing session: {}", device.name, e);
        }

        let cleaned = normalize::clean(&result?, profile.vendor);
        if cleaned.is_empty() {
            return Err(Error::CaptureFailed {
                device: device.name.clone(),
                reason: "Empty configuration captured".to_string(),
            });
        }
        Ok(cleaned)
    }
}

/// Run a vendor's command sequence on an open session and return the raw dump.
///
/// Setup commands that time out are logged and skipped past; a dump that
/// times out fails the capture, since partial output is never a backup.
pub async fn collect_config<S>(session: &mut Session<S>, profile: &VendorProfile) -> Result<String>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let prompt = &profile.prompt;
    session.wait_for_banner(prompt).await?;

    let command_timeout = session.config().command_timeout;
    for command in profile.setup_commands {
        let response = session.send_command(command, prompt, command_timeout).await?;
        if response.timed_out {
            warn!("'{}' did not return a prompt within {:?}", command, command_timeout);
        }
    }

    let dump_timeout = session.config().dump_timeout;
    let response = session
        .send_command(profile.dump_command, prompt, dump_timeout)
        .await?
        .complete(dump_timeout)?;

    debug!(
        "captured {} bytes via '{}' in {:?}",
        response.result.len(),
        profile.dump_command,
        response.elapsed
    );

    Ok(response.result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Vendor;
    use tokio_test::io::Builder;

    #[tokio::test(start_paused = true)]
    async fn test_cisco_sequence() {
        let stream = Builder::new()
            .read(b"\r\nr1#")
            .write(b"terminal length 0\n")
            .read(b"terminal length 0\r\nr1#")
            .write(b"show running-config\n")
            .read(b"show running-config\r\nBuilding configuration...\r\n\r\n")
            .read(b"Current configuration : 99 bytes\r\nhostname r1\r\nend\r\nr1#")
            .build();

        let profile = VendorProfile::get(Vendor::Cisco);
        let mut session = Session::from_stream(stream, SessionConfig::default());
        let raw = collect_config(&mut session, profile).await.unwrap();
        session.close().await.unwrap();

        assert_eq!(normalize::clean(&raw, Vendor::Cisco), "!\nhostname r1\nend");
    }

    #[tokio::test(start_paused = true)]
    async fn test_huawei_sequence() {
        let stream = Builder::new()
            .read(b"Info: The max number of VTY users is 5\r\n<HW>")
            .write(b"screen-length 0 temporary\n")
            .read(b"screen-length 0 temporary\r\nInfo: The configuration takes effect on the current user terminal interface only.\r\n<HW>")
            .write(b"display current-configuration\n")
            .read(b"display current-configuration\r\n#\r\n sysname HW\r\n#\r\nreturn\r\n<HW>")
            .build();

        let profile = VendorProfile::get(Vendor::Huawei);
        let mut session = Session::from_stream(stream, SessionConfig::default());
        let raw = collect_config(&mut session, profile).await.unwrap();

        assert_eq!(
            normalize::clean(&raw, Vendor::Huawei),
            "#\n sysname HW\n#\nreturn"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dump_timeout_fails_capture() {
        let stream = Builder::new()
            .read(b"r1#")
            .write(b"terminal length 0\n")
            .read(b"terminal length 0\r\nr1#")
            .write(b"show running-config\n")
            .read(b"show running-config\r\nhostname r1\r\n")
            .wait(Duration::from_secs(3600))
            .build();

        let profile = VendorProfile::get(Vendor::Cisco);
        let mut session = Session::from_stream(stream, SessionConfig::default());
        let err = collect_config(&mut session, profile).await.unwrap_err();

        assert!(err.is_prompt_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn test_setup_timeout_is_tolerated() {
        let config = SessionConfig {
            command_timeout: Duration::from_secs(1),
            ..SessionConfig::default()
        };
        let stream = Builder::new()
            .read(b"sw>")
            .write(b"enable\n")
            .read(b"enable\r\nPassword: ")
            .write(b"terminal length 999\n")
            .read(b"terminal length 999\r\nsw#")
            .write(b"show running-config\n")
            .read(b"show running-config\r\n## Generated at 2024\r\nhostname sw\r\nsw#")
            .build();

        let profile = VendorProfile::get(Vendor::Mellanox);
        let mut session = Session::from_stream(stream, config);
        let raw = collect_config(&mut session, profile).await.unwrap();

        assert_eq!(normalize::clean(&raw, Vendor::Mellanox), "hostname sw");
    }

    #[tokio::test]
    async fn test_no_address_is_reported() {
        let capturer = SshCapturer::new(Credentials::new("backup", "secret"));
        let device = Device::new(1, "r1", "Cisco");
        let err = capturer.capture(&device).await.unwrap_err();
        assert!(matches!(err, Error::NoAddressConfigured { .. }));
    }
}
