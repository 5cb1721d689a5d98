// SPDX-License-Identifier: Apache-2.0

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::dataset::{generate, reference_distinct_count};
    use crate::partitioned::{
        dedup_partitioned, dedup_partitioned_with_workers, partition_frequency_tables,
        worker_range,
    };
    use crate::sequential::dedup_sort_scan;
    use crate::test_utils::assert_set_eq;

    fn assert_ranges_tile(workers: usize, n: usize) {
        let mut covered = 0usize;
        for t in 0..workers {
            let (start, end) = worker_range(t, workers, n);
            assert_eq!(
                start, covered,
                "worker {} of {} must start where the previous one ended (n={})",
                t, workers, n
            );
            assert!(end >= start);
            covered = end;
        }
        assert_eq!(covered, n, "ranges must cover the whole dataset (n={})", n);
    }

    #[test]
    fn test_worker_ranges_tile_exactly() {
        assert_ranges_tile(10, 100_000);
        assert_ranges_tile(10, 101); // n mod T != 0
        assert_ranges_tile(10, 7); // more workers than elements
        assert_ranges_tile(1, 50);
        assert_ranges_tile(3, 0);
    }

    #[test]
    fn test_last_worker_absorbs_remainder() {
        // 101 / 10 = 10 per worker; the last one must run to 101, not 100
        let (start, end) = worker_range(9, 10, 101);
        assert_eq!((start, end), (90, 101));
    }

    #[test]
    fn test_partition_tables_count_every_element() {
        let values = generate(10_007, 0, 200, 99);
        let tables = partition_frequency_tables(&values, 10);
        assert_eq!(tables.len(), 10);
        let total: u64 = tables.iter().flat_map(|t| t.values()).sum();
        assert_eq!(total as usize, values.len());
    }

    #[test]
    fn test_partitioned_matches_sequential() {
        let values = generate(100_000, 0, 100_000, 0xCAFE);
        let expected = dedup_sort_scan(&values);
        assert_eq!(expected.len(), reference_distinct_count(&values));
        assert_set_eq(dedup_partitioned(&values), expected);
    }

    #[test]
    fn test_worker_count_extremes() {
        let values = generate(1_000, 0, 100, 5);
        let expected = dedup_sort_scan(&values);
        // zero clamps to one worker; a pool larger than the dataset leaves
        // most workers with empty ranges
        assert_set_eq(dedup_partitioned_with_workers(&values, 0), expected.clone());
        assert_set_eq(dedup_partitioned_with_workers(&values, 1), expected.clone());
        assert_set_eq(dedup_partitioned_with_workers(&values, 2_000), expected);
    }

    #[test]
    fn test_empty_dataset() {
        assert!(dedup_partitioned(&[]).is_empty());
    }

    #[test]
    fn test_duplicates_across_partition_boundary() {
        // the same value on both sides of a worker boundary must merge to one
        let mut values = vec![1; 50];
        values.extend(vec![1; 50]);
        values.push(2);
        assert_set_eq(dedup_partitioned_with_workers(&values, 10), vec![1, 2]);
    }
}
