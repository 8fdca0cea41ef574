//! Prompt-aware interactive session.
//!
//! A [`Session`] owns one shell stream to a single device and offers
//! blocking-style command/response primitives: write a command, then poll
//! the stream until the last non-empty line matches the prompt or the
//! timeout elapses. Every read is bounded; there is no unbounded wait.
//!
//! The session is generic over the byte stream so the same logic drives a
//! real SSH shell channel ([`ShellStream`]) or an in-memory stream in tests.

mod response;

pub use response::Response;

use std::time::Duration;

use log::{debug, trace, warn};
use regex::bytes::Regex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

use crate::channel::PromptBuffer;
use crate::error::{ChannelError, Result};
use crate::transport::{ShellStream, SshConfig, SshTransport};

/// Timing configuration for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Delay after the shell opens before looking for the first prompt.
    pub settle_delay: Duration,

    /// Upper bound on a single read attempt.
    pub poll_interval: Duration,

    /// Timeout for pager, privilege and other short commands.
    pub command_timeout: Duration,

    /// Timeout for the full configuration dump.
    pub dump_timeout: Duration,

    /// Bytes from the end of the buffer searched for the prompt line.
    pub search_depth: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(2),
            poll_interval: Duration::from_millis(200),
            command_timeout: Duration::from_secs(30),
            dump_timeout: Duration::from_secs(120),
            search_depth: 1000,
        }
    }
}

/// Interactive shell session to a single device.
pub struct Session<S> {
    stream: S,
    buffer: PromptBuffer,
    config: SessionConfig,
    transport: Option<SshTransport>,
}

impl Session<ShellStream> {
    /// Connect over SSH and open an interactive shell.
    ///
    /// The connection is closed again if the shell cannot be opened.
    pub async fn open(ssh_config: SshConfig, config: SessionConfig) -> Result<Self> {
        let transport = SshTransport::connect(ssh_config).await?;

        let stream = match transport.open_shell().await {
            Ok(stream) => stream,
            Err(e) => {
                if let Err(close_err) = transport.close().await {
                    debug!("close after failed shell request: {}", close_err);
                }
                return Err(e);
            }
        };

        let mut session = Self::from_stream(stream, config);
        session.transport = Some(transport);
        Ok(session)
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an already-open shell stream.
    pub fn from_stream(stream: S, config: SessionConfig) -> Self {
        Self {
            stream,
            buffer: PromptBuffer::new(config.search_depth),
            config,
            transport: None,
        }
    }

    /// Get the session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Wait out the login banner before anything is sent.
    ///
    /// Devices drop input that arrives before their shell is ready, so this
    /// settles first and then waits (bounded) for the first prompt.
    pub async fn wait_for_banner(&mut self, prompt: &Regex) -> Result<Response> {
        tokio::time::sleep(self.config.settle_delay).await;

        let start = Instant::now();
        let timeout = self.config.command_timeout;
        let (data, matched) = self.read_until_prompt(prompt, timeout).await?;
        if !matched {
            warn!("no prompt seen in login banner within {:?}", timeout);
        }

        Ok(Response::from_output("", &data, matched, start.elapsed()))
    }

    /// Send a command and wait for the prompt.
    ///
    /// A timeout is not an error here: the partial output comes back with
    /// [`Response::timed_out`] set and the caller decides what it means.
    pub async fn send_command(
        &mut self,
        command: &str,
        prompt: &Regex,
        timeout: Duration,
    ) -> Result<Response> {
        let start = Instant::now();

        self.buffer.clear();
        self.write_line(command).await?;

        let (data, matched) = self.read_until_prompt(prompt, timeout).await?;
        let response = Response::from_output(command, &data, matched, start.elapsed());

        debug!(
            "'{}' finished in {:?} ({} bytes, timed_out={})",
            command,
            response.elapsed,
            data.len(),
            response.timed_out
        );

        Ok(response)
    }

    /// Send commands in order, each bounded by `timeout`.
    pub async fn run(
        &mut self,
        commands: &[&str],
        prompt: &Regex,
        timeout: Duration,
    ) -> Result<Vec<Response>> {
        let mut responses = Vec::with_capacity(commands.len());
        for command in commands {
            responses.push(self.send_command(command, prompt, timeout).await?);
        }
        Ok(responses)
    }

    /// Shut down the shell stream and close the SSH connection.
    pub async fn close(mut self) -> Result<()> {
        if let Err(e) = self.stream.shutdown().await {
            debug!("shell shutdown: {}", e);
        }
        if let Some(transport) = self.transport.take() {
            transport.close().await?;
        }
        Ok(())
    }

    async fn write_line(&mut self, command: &str) -> Result<()> {
        trace!("sending: {}", command);
        let line = format!("{command}\n");
        self.stream
            .write_all(line.as_bytes())
            .await
            .map_err(ChannelError::Io)?;
        self.stream.flush().await.map_err(ChannelError::Io)?;
        Ok(())
    }

    /// Poll the stream until the prompt shows up or `timeout` elapses.
    ///
    /// Returns the accumulated bytes and whether the prompt matched.
    async fn read_until_prompt(
        &mut self,
        prompt: &Regex,
        timeout: Duration,
    ) -> Result<(Vec<u8>, bool)> {
        let deadline = Instant::now() + timeout;
        let mut chunk = vec![0u8; 4096];

        loop {
            if self.buffer.prompt_matched(prompt) {
                return Ok((self.buffer.take(), true));
            }

            let now = Instant::now();
            if now >= deadline {
                if let Some(line) = self.buffer.last_line() {
                    debug!("no prompt; last line was {:?}", String::from_utf8_lossy(&line));
                }
                return Ok((self.buffer.take(), false));
            }

            let wait = self.config.poll_interval.min(deadline - now);
            match tokio::time::timeout(wait, self.stream.read(&mut chunk)).await {
                Ok(Ok(0)) => return Err(ChannelError::Closed.into()),
                Ok(Ok(n)) => {
                    trace!("read {} bytes", n);
                    self.buffer.extend(&chunk[..n]);
                }
                Ok(Err(e)) => return Err(ChannelError::Io(e).into()),
                Err(_) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    fn prompt() -> Regex {
        Regex::new(r"[>#]\s*$").unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_banner_then_commands() {
        let stream = Builder::new()
            .read(b"\r\nAuthorized access only\r\nr1#")
            .write(b"terminal length 0\n")
            .read(b"terminal length 0\r\nr1#")
            .write(b"show running-config\n")
            .read(b"show running-config\r\nhostname r1\r\n")
            .read(b"interface Gi0/1\r\n shutdown\r\nr1#")
            .build();

        let mut session = Session::from_stream(stream, SessionConfig::default());
        let banner = session.wait_for_banner(&prompt()).await.unwrap();
        assert!(!banner.timed_out);
        assert_eq!(banner.prompt, "r1#");

        let responses = session
            .run(
                &["terminal length 0", "show running-config"],
                &prompt(),
                Duration::from_secs(30),
            )
            .await
            .unwrap();

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].result, "");
        assert_eq!(
            responses[1].result,
            "hostname r1\ninterface Gi0/1\n shutdown"
        );
        session.close().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_returns_partial_output() {
        let stream = Builder::new()
            .write(b"show running-config\n")
            .read(b"show running-config\r\nhostname r1\r\n")
            .wait(Duration::from_secs(600))
            .build();

        let mut session = Session::from_stream(stream, SessionConfig::default());
        let start = Instant::now();
        let response = session
            .send_command("show running-config", &prompt(), Duration::from_secs(120))
            .await
            .unwrap();

        assert!(response.timed_out);
        assert_eq!(response.result, "hostname r1\n");
        assert!(start.elapsed() >= Duration::from_secs(120));
        assert!(start.elapsed() < Duration::from_secs(121));
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_channel_is_an_error() {
        let stream = Builder::new()
            .write(b"show running-config\n")
            .read(b"show running-config\r\n")
            .build();

        let mut session = Session::from_stream(stream, SessionConfig::default());
        let err = session
            .send_command("show running-config", &prompt(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::Channel(ChannelError::Closed)));
    }
}
