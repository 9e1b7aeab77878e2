// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, net::SocketAddr, path::Path, time::Duration};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

/// Top-level gateway configuration, loaded from a YAML file at startup.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GatewayConfig {
    /// Placement, retry, and network parameters.
    pub cluster: ClusterConfig,
    /// Object cache on/off (the cache's own coherence protocol is out of
    /// scope here; this only gates whether requests are offered to it).
    #[serde(default)]
    pub cache: CacheConfig,
    /// Logging sink and verbosity.
    pub logging: LogConfig,
}

/// Placement and fan-out parameters (the source's `sd_cluster`/
/// `POLL_TIMEOUT`/`MAX_RETRY_COUNT` knobs).
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ClusterConfig {
    /// Replica count `k` passed to the placement resolver.
    #[serde(rename = "ReplicaCount")]
    pub replica_count: usize,

    /// Per-iteration timeout of the completion waiter, in seconds.
    #[serde(rename = "PollTimeoutSecs", with = "serde_secs")]
    pub poll_timeout: Duration,

    /// Retry budget for the completion waiter while the epoch is stable.
    #[serde(rename = "MaxRetryCount")]
    pub max_retry_count: u32,

    /// Address this gateway listens on for client and peer connections.
    #[serde(rename = "ListenAddress")]
    pub listen_address: SocketAddr,

    /// This gateway's own node identity, as it would appear in a placement
    /// set (used by `node_is_local`).
    #[serde(rename = "SelfNode")]
    pub self_node: SocketAddr,
}

/// Object cache toggle.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct CacheConfig {
    #[serde(rename = "Enabled", default)]
    pub enabled: bool,
}

/// Logging sink and format, mirroring the teacher's `LogConfig`.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LogConfig {
    pub level: String,
    pub output: Output,
    #[serde(default)]
    pub is_show_line: bool,
    #[serde(default)]
    pub is_show_module_path: bool,
    #[serde(default)]
    pub is_show_target: bool,
    #[serde(default)]
    pub json: bool,
    pub file: Option<LogFileConfig>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "lowercase")]
pub enum Output {
    Stdout,
    Stderr,
    File,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LogFileConfig {
    pub path: String,
    #[serde(default)]
    pub rotation_frequency: Option<RotationFreq>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "lowercase")]
pub enum RotationFreq {
    Minutely,
    Hourly,
    Daily,
    Never,
}

impl GatewayConfig {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let cfg: GatewayConfig = serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.cluster.replica_count >= 1, "ReplicaCount must be >= 1");
        ensure!(
            self.cluster.max_retry_count >= 1,
            "MaxRetryCount must be >= 1"
        );
        ensure!(
            !self.cluster.poll_timeout.is_zero(),
            "PollTimeoutSecs must be > 0"
        );
        Ok(())
    }
}

/// Serde helper for representing `Duration` as a number of seconds.
mod serde_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}
