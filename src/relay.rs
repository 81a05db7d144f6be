//! The credential-relay sentinel convention.
//!
//! In restricted mode the merge writes `pamltsp` into a transferred user's
//! shadow password field instead of a real hash, optionally carrying a
//! base64-encoded literal password (`pamltsp=<base64>`). An external relay
//! agent reads the field back at authentication time; both halves of the
//! convention live here so the format stays pinned.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Marker written in place of a password hash for relay-mode users.
pub const RELAY_SENTINEL: &str = "pamltsp";

/// Parsed form of a relay-tagged shadow password field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayField {
    /// Bare sentinel: authentication is deferred to the relay channel.
    Deferred,
    /// Sentinel carrying a literal password for passwordless local login.
    Embedded(String),
}

/// Build the shadow password field for a relay-mode user.
pub fn relay_field(password: Option<&str>) -> String {
    match password {
        None => RELAY_SENTINEL.to_string(),
        Some(pw) => format!("{}={}", RELAY_SENTINEL, STANDARD.encode(pw)),
    }
}

/// Parse a shadow password field. Returns `None` for ordinary hashes; fails
/// only when the field claims to be a relay sentinel but the payload does
/// not decode.
pub fn parse_relay_field(field: &str) -> Result<Option<RelayField>> {
    if field == RELAY_SENTINEL {
        return Ok(Some(RelayField::Deferred));
    }
    let Some(encoded) = field.strip_prefix(RELAY_SENTINEL).and_then(|rest| rest.strip_prefix('=')) else {
        return Ok(None);
    };
    let bytes = STANDARD
        .decode(encoded)
        .with_context(|| format!("Invalid base64 in relay field '{}'", field))?;
    let password =
        String::from_utf8(bytes).context("Relay field password is not valid UTF-8")?;
    Ok(Some(RelayField::Embedded(password)))
}
