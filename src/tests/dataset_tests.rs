// SPDX-License-Identifier: Apache-2.0

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::dataset::{distinct_percentage, generate, reference_distinct_count};

    #[test]
    fn test_generate_is_reproducible() {
        let a = generate(1_000, 0, 500, 0x5EED);
        let b = generate(1_000, 0, 500, 0x5EED);
        assert_eq!(a, b, "same (n, bounds, seed) must yield the same dataset");
    }

    #[test]
    fn test_generate_differs_across_seeds() {
        let a = generate(1_000, 0, 1_000_000, 1);
        let b = generate(1_000, 0, 1_000_000, 2);
        assert_ne!(a, b);
    }

    #[test]
    fn test_generate_respects_bounds() {
        let values = generate(10_000, 10, 99, 42);
        assert_eq!(values.len(), 10_000);
        assert!(values.iter().all(|&v| (10..=99).contains(&v)));
    }

    #[test]
    fn test_generate_empty() {
        assert!(generate(0, 0, 100, 7).is_empty());
    }

    #[test]
    fn test_generate_clamps_inverted_bounds() {
        // upper < lower collapses the range to the single value `lower`
        let values = generate(16, 5, 0, 3);
        assert!(values.iter().all(|&v| v == 5));
    }

    #[test]
    fn test_reference_distinct_count() {
        assert_eq!(reference_distinct_count(&[]), 0);
        assert_eq!(reference_distinct_count(&[7]), 1);
        assert_eq!(reference_distinct_count(&[5, 3, 5, 3, 3, 7]), 3);
        assert_eq!(reference_distinct_count(&[-1, 0, 1, -1]), 3);
    }

    #[test]
    fn test_distinct_percentage() {
        assert_eq!(distinct_percentage(&[]), 0.0);
        assert_eq!(distinct_percentage(&[1, 1, 2, 2]), 50.0);
        assert_eq!(distinct_percentage(&[9]), 100.0);
    }
}
