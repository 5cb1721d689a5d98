// SPDX-License-Identifier: Apache-2.0

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::constants::KEEP_NONE_SENTINEL;
    use crate::device::{filter_non_negative, filter_non_sentinel, DeviceKernel};

    #[test]
    fn test_kernel_entry_names_appear_in_ptx() {
        for kernel in [DeviceKernel::Tiled, DeviceKernel::Naive] {
            assert!(
                kernel.ptx().contains(kernel.entry_name()),
                "PTX for {:?} must declare its entry point",
                kernel
            );
        }
    }

    #[test]
    fn test_ptx_targets_sm_70() {
        for kernel in [DeviceKernel::Tiled, DeviceKernel::Naive] {
            assert!(kernel.ptx().contains(".version 7.0"));
            assert!(kernel.ptx().contains(".target sm_70"));
            assert!(kernel.ptx().contains(".address_size 64"));
        }
    }

    #[test]
    fn test_tiled_ptx_uses_shared_memory_and_barriers() {
        let ptx = DeviceKernel::Tiled.ptx();
        assert!(ptx.contains(".shared"));
        assert!(ptx.contains("bar.sync"));
        // the naive kernel needs neither
        let ptx = DeviceKernel::Naive.ptx();
        assert!(!ptx.contains(".shared"));
        assert!(!ptx.contains("bar.sync"));
    }

    #[test]
    fn test_ptx_literals_match_sentinel_constants() {
        use crate::constants::OUT_OF_RANGE_SENTINEL;

        // the kernels spell both sentinels as hex literals; keep them tied
        // to the host-side constants the filters compare against
        let tiled = DeviceKernel::Tiled.ptx();
        assert!(tiled.contains(&format!("0x{:08x}", OUT_OF_RANGE_SENTINEL as u32)));
        assert!(tiled.contains(&format!("0x{:08x}", KEEP_NONE_SENTINEL as u32)));
    }

    #[test]
    fn test_filter_non_sentinel() {
        let slots = vec![5, KEEP_NONE_SENTINEL, 3, KEEP_NONE_SENTINEL, 7];
        assert_eq!(filter_non_sentinel(&slots), vec![5, 3, 7]);
        assert!(filter_non_sentinel(&[]).is_empty());
        assert!(filter_non_sentinel(&[KEEP_NONE_SENTINEL; 4]).is_empty());
    }

    #[test]
    fn test_filter_non_negative() {
        // non-keeper slots carry negated occurrence counts
        let slots = vec![5, -2, 0, -3, 7];
        assert_eq!(filter_non_negative(&slots), vec![5, 0, 7]);
        assert!(filter_non_negative(&[-2, -2, -5]).is_empty());
    }

    #[cfg(not(has_cuda))]
    #[test]
    fn test_device_strategies_unsupported_without_cuda() {
        use crate::dispatch::remove_duplicates;
        use crate::types::{DedupxError, Strategy};

        for strategy in [Strategy::DeviceTiled, Strategy::DeviceNaive] {
            match remove_duplicates(&[1, 2, 2], strategy) {
                Err(DedupxError::Unsupported(_)) => {}
                other => panic!("expected Unsupported, got {:?}", other),
            }
        }
    }

    #[cfg(has_cuda)]
    mod cuda {
        use crate::constants::KEEP_NONE_SENTINEL;
        use crate::dataset::{generate, reference_distinct_count};
        use crate::device::{DeviceDedupPlan, DeviceKernel};
        use crate::test_utils::assert_set_eq;
        use crate::types::DedupxError;

        fn run_both_kernels(values: &[i32]) -> [Vec<i32>; 2] {
            let tiled = DeviceDedupPlan::new(values.len(), DeviceKernel::Tiled)
                .and_then(|p| p.run(values))
                .unwrap();
            let naive = DeviceDedupPlan::new(values.len(), DeviceKernel::Naive)
                .and_then(|p| p.run(values))
                .unwrap();
            [tiled, naive]
        }

        #[test]
        fn test_known_multiset_on_device() {
            for result in run_both_kernels(&[5, 3, 5, 3, 3, 7]) {
                assert_set_eq(result, vec![3, 5, 7]);
            }
        }

        #[test]
        fn test_empty_dataset_on_device() {
            for result in run_both_kernels(&[]) {
                assert!(result.is_empty());
            }
        }

        #[test]
        fn test_all_distinct_on_device() {
            // spans multiple tiles and multiple blocks
            let values: Vec<i32> = (0..1_000).collect();
            for result in run_both_kernels(&values) {
                assert_set_eq(result, values.clone());
            }
        }

        #[test]
        fn test_all_distinct_raw_slots_match_input() {
            // every thread is its own first occurrence, so the raw output
            // must equal the input slot for slot
            let values: Vec<i32> = (0..1_000).collect();
            for kernel in [DeviceKernel::Tiled, DeviceKernel::Naive] {
                let plan = DeviceDedupPlan::new(values.len(), kernel).unwrap();
                assert_eq!(plan.run_raw(&values).unwrap(), values);
            }
        }

        #[test]
        fn test_single_repeated_value_on_device() {
            let values = vec![9; 777]; // not a multiple of the block size
            for result in run_both_kernels(&values) {
                assert_eq!(result, vec![9]);
            }
        }

        #[test]
        fn test_single_repeated_value_keeper_is_lowest_index() {
            let values = vec![9; 777];

            // tiled: slot 0 keeps the value, every sibling holds the
            // keep-none sentinel
            let plan = DeviceDedupPlan::new(values.len(), DeviceKernel::Tiled).unwrap();
            let slots = plan.run_raw(&values).unwrap();
            assert_eq!(slots[0], 9, "keeper must sit at the lowest index");
            assert!(slots[1..].iter().all(|&s| s == KEEP_NONE_SENTINEL));

            // naive: siblings hold the negated occurrence count instead
            let plan = DeviceDedupPlan::new(values.len(), DeviceKernel::Naive).unwrap();
            let slots = plan.run_raw(&values).unwrap();
            assert_eq!(slots[0], 9, "keeper must sit at the lowest index");
            assert!(slots[1..].iter().all(|&s| s == -777));
        }

        #[test]
        fn test_duplicates_across_tile_boundary() {
            // first occurrence in tile 0, duplicates in later tiles
            let mut values: Vec<i32> = (0..512).collect();
            values.extend(0..512);
            for result in run_both_kernels(&values) {
                assert_set_eq(result, (0..512).collect());
            }

            // raw slots: the keeper for each value is the tile-0 occurrence,
            // so the second half must be all sentinels even though those
            // threads see a match inside their own later tile
            let plan = DeviceDedupPlan::new(values.len(), DeviceKernel::Tiled).unwrap();
            let slots = plan.run_raw(&values).unwrap();
            assert_eq!(&slots[..512], &values[..512]);
            assert!(slots[512..].iter().all(|&s| s == KEEP_NONE_SENTINEL));
        }

        #[test]
        fn test_device_matches_reference_on_random_dataset() {
            let values = generate(20_000, 0, 20_000, 0xF00D);
            let expected = reference_distinct_count(&values);
            for result in run_both_kernels(&values) {
                assert_eq!(result.len(), expected);
            }
        }

        #[test]
        fn test_plan_is_reused_across_runs() {
            let plan = DeviceDedupPlan::new(6, DeviceKernel::Tiled).unwrap();
            for _ in 0..3 {
                let result = plan.run(&[5, 3, 5, 3, 3, 7]).unwrap();
                assert_set_eq(result, vec![3, 5, 7]);
            }
        }

        #[test]
        fn test_plan_rejects_mismatched_length() {
            let plan = DeviceDedupPlan::new(8, DeviceKernel::Naive).unwrap();
            match plan.run(&[1, 2, 3]) {
                Err(DedupxError::Internal(_)) => {}
                other => panic!("expected Internal error, got {:?}", other),
            }
        }

        #[test]
        fn test_launch_rejects_indivisible_grid() {
            use crate::gpu::launch_ptx;
            // 300 global threads with a 256-thread block is not a whole grid
            match launch_ptx(DeviceKernel::Naive.ptx(), "dedup_first_index_naive", 300, 256, &[]) {
                Err(DedupxError::LaunchConfig(_)) => {}
                other => panic!("expected LaunchConfig error, got {:?}", other),
            }
        }
    }
}
