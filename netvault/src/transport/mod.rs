//! SSH transport layer wrapping russh.
//!
//! Handles connection setup, password authentication, host key checks and
//! opening the interactive shell channel a backup session runs on.

pub mod config;
mod ssh;

pub use config::{HostKeyVerification, SshConfig};
pub use ssh::{ShellStream, SshTransport};
