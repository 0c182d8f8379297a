//! Router-side hardware identity and the transport that changes it.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use super::IdentityError;

/// Index of the MAC octet that rotation advances.
const ROTATED_OCTET: usize = 3;

/// Largest value the rotated octet takes before wrapping.
const OCTET_MAX: u8 = 254;

/// Value the rotated octet wraps back to.
const OCTET_MIN: u8 = 1;

/// A router WAN MAC address as reported by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareId {
    octets: [String; 6],
}

impl HardwareId {
    /// Returns the id with octet 4 advanced by one, wrapping from 254 back to 1.
    ///
    /// Only the rotated octet is re-rendered (upper-case hex); the others keep
    /// the device's spelling so a read-back compares equal.
    #[must_use]
    pub fn next(&self) -> Self {
        let current = u8::from_str_radix(&self.octets[ROTATED_OCTET], 16).unwrap_or(0);
        let advanced = match current.checked_add(1) {
            Some(value) if value <= OCTET_MAX => value,
            _ => OCTET_MIN,
        };
        let mut octets = self.octets.clone();
        octets[ROTATED_OCTET] = format!("{advanced:02X}");
        Self { octets }
    }
}

impl FromStr for HardwareId {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parts: Vec<&str> = trimmed.split(':').collect();
        let valid = parts.len() == 6
            && parts
                .iter()
                .all(|part| part.len() == 2 && u8::from_str_radix(part, 16).is_ok());
        if !valid {
            return Err(IdentityError::InvalidHardwareId(trimmed.to_string()));
        }
        Ok(Self {
            octets: [
                parts[0].to_string(),
                parts[1].to_string(),
                parts[2].to_string(),
                parts[3].to_string(),
                parts[4].to_string(),
                parts[5].to_string(),
            ],
        })
    }
}

impl fmt::Display for HardwareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.octets.join(":"))
    }
}

/// Remote administrative session to the network device.
///
/// Any error is an attempt failure to the rotation loop, never fatal on its own.
#[async_trait]
pub trait IdentityTransport: Send + Sync {
    /// Reads the configured hardware id.
    async fn current_hardware_id(&self) -> Result<HardwareId, IdentityError>;

    /// Stages a new hardware id.
    async fn set_hardware_id(&self, id: &HardwareId) -> Result<(), IdentityError>;

    /// Persists staged configuration.
    async fn commit(&self) -> Result<(), IdentityError>;

    /// Restarts networking so the new id takes effect.
    async fn restart_network(&self) -> Result<(), IdentityError>;
}

/// Advances the device's hardware id by one and verifies the change stuck.
///
/// # Errors
///
/// Returns the first transport failure, or
/// [`IdentityError::HardwareIdNotApplied`] when the read-back differs.
#[instrument(skip(transport))]
pub async fn advance_hardware_id(
    transport: &dyn IdentityTransport,
) -> Result<HardwareId, IdentityError> {
    let current = transport.current_hardware_id().await?;
    let next = current.next();
    debug!(from = %current, to = %next, "advancing hardware id");

    transport.set_hardware_id(&next).await?;
    transport.commit().await?;
    transport.restart_network().await?;

    let applied = transport.current_hardware_id().await?;
    if applied != next {
        return Err(IdentityError::HardwareIdNotApplied {
            expected: next.to_string(),
            actual: applied.to_string(),
        });
    }
    Ok(next)
}

/// Connection settings for [`SshUciTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterSettings {
    pub host: String,
    pub username: String,
    /// UCI network section whose `macaddr` is rotated (for example `wan`).
    pub interface: String,
}

/// Drives an OpenWrt-style router through the system `ssh` client and UCI.
///
/// Authentication is whatever the local ssh configuration provides (keys or
/// agent); the session runs in batch mode and never prompts.
#[derive(Debug, Clone)]
pub struct SshUciTransport {
    settings: RouterSettings,
}

impl SshUciTransport {
    #[must_use]
    pub fn new(settings: RouterSettings) -> Self {
        Self { settings }
    }

    async fn run(&self, remote_command: &str) -> Result<String, IdentityError> {
        let destination = format!("{}@{}", self.settings.username, self.settings.host);
        let output = Command::new("ssh")
            .args([
                "-o",
                "BatchMode=yes",
                "-o",
                "ConnectTimeout=10",
                &destination,
                remote_command,
            ])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| IdentityError::transport(format!("failed to run ssh: {e}")))?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(IdentityError::transport(format!(
                "`{remote_command}` exited with {}: {stderr}",
                output.status.code().unwrap_or(-1)
            )));
        }
        if !stderr.is_empty() {
            warn!(command = remote_command, stderr = %stderr, "router command wrote to stderr");
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn macaddr_key(&self) -> String {
        format!("network.{}.macaddr", self.settings.interface)
    }
}

#[async_trait]
impl IdentityTransport for SshUciTransport {
    async fn current_hardware_id(&self) -> Result<HardwareId, IdentityError> {
        self.run(&format!("uci get {}", self.macaddr_key()))
            .await?
            .parse()
    }

    async fn set_hardware_id(&self, id: &HardwareId) -> Result<(), IdentityError> {
        self.run(&format!("uci set {}='{id}'", self.macaddr_key()))
            .await
            .map(|_| ())
    }

    async fn commit(&self) -> Result<(), IdentityError> {
        self.run("uci commit network").await.map(|_| ())
    }

    async fn restart_network(&self) -> Result<(), IdentityError> {
        self.run("/etc/init.d/network restart").await.map(|_| ())
    }
}
