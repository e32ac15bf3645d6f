// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// HTTP intake endpoint a push initiator submits PAP requests to.
    pub http: HttpConfig,
    /// The bearerbox (WDP/WSP peer) this gateway talks to.
    pub bearerbox: BearerboxConfig,
    /// Identity fields echoed in PAP responses and the SIA contact point.
    pub identity: IdentityConfig,
    /// Implementation-level limits that do not map to a PAP/OTA field.
    pub runtime: RuntimeConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_http_port")]
    pub port: u16,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct BearerboxConfig {
    /// Address advertised in SIA contact points; `"localhost"` is resolved
    /// to the local hostname at startup.
    pub address: String,
    #[serde(default = "default_connected_port")]
    pub connected_port: u16,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct IdentityConfig {
    /// Human-readable gateway name, e.g. `"Example PPG"`.
    pub official_name: String,
    /// Product name reported in the `WAP/1.3 (<product>/<version>)` tag.
    pub product_name: String,
    pub product_version: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RuntimeConfig {
    /// Upper bound on simultaneously tracked sessions before new
    /// connections are refused.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: u32,
    /// How often the registry's garbage collector sweeps for collectable
    /// sessions, in seconds.
    #[serde(default = "default_gc_interval_secs")]
    pub gc_interval_secs: u64,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_connected_port() -> u16 {
    crate::ota::sia::CONNECTED_PORT
}

fn default_max_sessions() -> u32 {
    10_000
}

fn default_gc_interval_secs() -> u64 {
    60
}

impl Config {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let mut cfg: Config = serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Validates invariants the rest of the gateway relies on.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        ensure!(self.http.port != 0, "http.port must not be 0");
        ensure!(
            !self.bearerbox.address.is_empty(),
            "bearerbox.address must not be empty"
        );
        ensure!(
            !self.identity.official_name.is_empty(),
            "identity.official_name must not be empty"
        );
        ensure!(
            !self.identity.product_name.is_empty(),
            "identity.product_name must not be empty"
        );
        ensure!(self.runtime.max_sessions >= 1, "runtime.max_sessions must be >= 1");
        ensure!(
            self.runtime.gc_interval_secs >= 1,
            "runtime.gc_interval_secs must be >= 1"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            http: HttpConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 8080,
            },
            bearerbox: BearerboxConfig {
                address: "localhost".to_string(),
                connected_port: 2948,
            },
            identity: IdentityConfig {
                official_name: "Example PPG".to_string(),
                product_name: "ppg-rs".to_string(),
                product_version: "0.1.0".to_string(),
            },
            runtime: RuntimeConfig {
                max_sessions: 10_000,
                gc_interval_secs: 60,
            },
        }
    }

    #[test]
    fn valid_config_passes_validation() {
        let mut cfg = sample();
        assert!(cfg.validate_and_normalize().is_ok());
    }

    #[test]
    fn zero_port_is_rejected() {
        let mut cfg = sample();
        cfg.http.port = 0;
        assert!(cfg.validate_and_normalize().is_err());
    }

    #[test]
    fn empty_official_name_is_rejected() {
        let mut cfg = sample();
        cfg.identity.official_name.clear();
        assert!(cfg.validate_and_normalize().is_err());
    }
}
