use std::time::Duration;

use serde::Deserialize;
use mockwire_core::error::{MockWireError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    pub version: u32,

    #[serde(default)]
    pub bridge: BridgeSection,

    #[serde(default)]
    pub interception: InterceptionSection,

    #[serde(default)]
    pub store: StoreSection,
}

impl BridgeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(MockWireError::UnsupportedVersion);
        }

        self.bridge.validate()?;   // Verify the scope of value

        Ok(())
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            version: 1,
            bridge: BridgeSection::default(),
            interception: InterceptionSection::default(),
            store: StoreSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// 0 disables the timeout: a lost reply then waits forever.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,

    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            call_timeout_ms: default_call_timeout_ms(),
            ping_interval_ms: default_ping_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            max_frame_bytes: default_max_frame_bytes(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl BridgeSection {
    pub fn validate(&self) -> Result<()> {
        if self.call_timeout_ms != 0 && !(100..=600000).contains(&self.call_timeout_ms) {
            return Err(MockWireError::BadRequest(
                "bridge.call_timeout_ms must be 0 or between 100 and 600000".into(),
            ));
        }
        if !(5000..=120000).contains(&self.ping_interval_ms) {
            return Err(MockWireError::BadRequest(
                "bridge.ping_interval_ms must be between 5000 and 120000".into(),
            ));
        }
        if !(10000..=600000).contains(&self.idle_timeout_ms) {
            return Err(MockWireError::BadRequest(
                "bridge.idle_timeout_ms must be between 10000 and 600000".into(),
            ));
        }
        if self.idle_timeout_ms <= self.ping_interval_ms {
            return Err(MockWireError::BadRequest(
                "bridge.idle_timeout_ms must be greater than ping_interval_ms".into(),
            ));
        }
        if !(1024..=16 * 1024 * 1024).contains(&self.max_frame_bytes) {
            return Err(MockWireError::BadRequest(
                "bridge.max_frame_bytes must be between 1024 and 16777216".into(),
            ));
        }
        if !(1..=65536).contains(&self.channel_capacity) {
            return Err(MockWireError::BadRequest(
                "bridge.channel_capacity must be between 1 and 65536".into(),
            ));
        }
        Ok(())
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        (self.call_timeout_ms > 0).then(|| Duration::from_millis(self.call_timeout_ms))
    }
}

fn default_listen() -> String {
    "127.0.0.1:7878".into()
}
fn default_call_timeout_ms() -> u64 {
    30000
}
fn default_ping_interval_ms() -> u64 {
    20000
}
fn default_idle_timeout_ms() -> u64 {
    60000
}
fn default_max_frame_bytes() -> usize {
    1024 * 1024
}
fn default_channel_capacity() -> usize {
    256
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterceptionSection {
    /// Used for domains that have no stored flag.
    #[serde(default = "default_true")]
    pub default_domain_enabled: bool,
}

impl Default for InterceptionSection {
    fn default() -> Self {
        Self { default_domain_enabled: true }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    /// YAML seed for the in-memory rule store.
    #[serde(default)]
    pub rules_file: Option<String>,
}
