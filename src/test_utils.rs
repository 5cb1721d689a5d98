// SPDX-License-Identifier: Apache-2.0

/// Test-only helpers.
///
/// Keep this module lightweight so `cargo test` works out of the box.
pub fn sorted(mut values: Vec<i32>) -> Vec<i32> {
    values.sort_unstable();
    values
}

/// Assert two distinct sets are equal as sets, ignoring order.
pub fn assert_set_eq(actual: Vec<i32>, expected: Vec<i32>) {
    assert_eq!(sorted(actual), sorted(expected));
}
