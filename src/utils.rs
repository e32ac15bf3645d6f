// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Small helpers shared across modules.

/// Generates a `pi_push_id` for a push submitted without one.
///
/// The PAP push-id attribute is optional on submission; when the push
/// initiator omits it the gateway must still be able to report status
/// against a stable identifier. `sequence` should come from a
/// process-wide monotonic counter (see `Registry::next_push_id`).
pub fn generate_pi_push_id(sequence: u64) -> String {
    format!("ppg-rs-{sequence:016x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_stable_and_distinct() {
        let a = generate_pi_push_id(1);
        let b = generate_pi_push_id(2);
        assert_ne!(a, b);
        assert_eq!(generate_pi_push_id(1), a);
    }
}
