// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Normalisation of the `X-WAP-Application-Id` header per Push Message
//! §6.2.2.1: either strip a `;app-encoding=` URI prefix down to the coded
//! value, or map a WINA registered name to its numeric WSP application-id.

/// Default numeric application-id (`wml.ua`), used when the header value
/// does not match any WINA-registered name.
pub const DEFAULT_APPLICATION_ID: u32 = 2;

/// WINA push-application registry subset used by this gateway, mapping
/// registered name to numeric WSP application-id.
const WINA_TABLE: &[(&str, u32)] = &[("*", 0), ("push.sia", 1), ("wml.ua", 2), ("push.mms", 4)];

/// Normalises a single `X-WAP-Application-Id` header value.
///
/// Returns `None` when the normalised value equals [`DEFAULT_APPLICATION_ID`]
/// — per spec, such a header should not be re-emitted at all.
pub fn normalize_application_id(value: &str) -> Option<String> {
    if let Some(idx) = value.find(";app-encoding=") {
        let coded = &value[idx + ";app-encoding=".len()..];
        return Some(coded.to_string());
    }

    let numeric = WINA_TABLE
        .iter()
        .find(|(name, _)| *name == value)
        .map(|(_, id)| *id)
        .unwrap_or(DEFAULT_APPLICATION_ID);

    if numeric == DEFAULT_APPLICATION_ID {
        None
    } else {
        Some(numeric.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_encoding_prefix_is_stripped() {
        let v = "http://example.com/coded;app-encoding=foo";
        assert_eq!(normalize_application_id(v), Some("foo".to_string()));
    }

    #[test]
    fn known_wina_name_maps_to_number() {
        assert_eq!(normalize_application_id("push.sia"), Some("1".to_string()));
        assert_eq!(normalize_application_id("push.mms"), Some("4".to_string()));
    }

    #[test]
    fn unknown_name_resolves_to_default_and_is_suppressed() {
        assert_eq!(normalize_application_id("unknown.x"), None);
    }

    #[test]
    fn wml_ua_is_the_default_and_is_suppressed() {
        assert_eq!(normalize_application_id("wml.ua"), None);
    }
}
