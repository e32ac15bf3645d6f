// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Mutex-protected binding of the PPG's own bearerbox address.
//!
//! The address is read once per SIA pack (`BearerboxAddress::get`) and
//! written rarely, typically once at startup and again on config reload.
//! `localhost` is resolved to the machine's official IP address; any other
//! string is stored verbatim.

use std::{net::ToSocketAddrs, sync::RwLock};

use anyhow::{Context, Result};

/// Holds the textual IP address advertised in SIA contact points.
pub struct BearerboxAddress {
    inner: RwLock<String>,
}

impl BearerboxAddress {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            inner: RwLock::new(initial.into()),
        }
    }

    /// Sets the bearerbox address, resolving `localhost` to the machine's
    /// official IP the way `ppg_set_bearerbox_address` does.
    pub fn set(&self, addr: &str) -> Result<()> {
        let resolved = if addr.eq_ignore_ascii_case("localhost") {
            resolve_local_ip()?
        } else {
            addr.to_string()
        };
        let mut guard = self
            .inner
            .write()
            .map_err(|_| anyhow::anyhow!("bearerbox address lock poisoned"))?;
        *guard = resolved;
        Ok(())
    }

    pub fn get(&self) -> Result<String> {
        let guard = self
            .inner
            .read()
            .map_err(|_| anyhow::anyhow!("bearerbox address lock poisoned"))?;
        Ok(guard.clone())
    }
}

/// Resolves the local hostname to an actual IP address, the way
/// `ppg_set_bearerbox_address` resolves `localhost` to the machine's
/// official address rather than storing a hostname string.
fn resolve_local_ip() -> Result<String> {
    let hostname = hostname_from_env().context("cannot determine local hostname")?;
    let addr = (hostname.as_str(), 0)
        .to_socket_addrs()
        .with_context(|| format!("cannot resolve hostname {hostname:?} to an address"))?
        .next()
        .with_context(|| format!("hostname {hostname:?} resolved to no addresses"))?;
    Ok(addr.ip().to_string())
}

fn hostname_from_env() -> Result<String> {
    std::env::var("HOSTNAME")
        .or_else(|_| std::fs::read_to_string("/proc/sys/kernel/hostname").map(|s| s.trim().to_string()))
        .context("HOSTNAME not set and /proc/sys/kernel/hostname unavailable")
}
