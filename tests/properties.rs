use proptest::prelude::*;

use rvu_review::pipeline::refinement::{intensity_ratio, time_ratio};
use rvu_review::pipeline::stats::{median, percentile, sorted_copy};
use rvu_review::pipeline::filter;
use rvu_review::storage::InMemoryStorage;
use rvu_review::types::{AllowableBounds, CodeDescriptors, CodeRecord, SearchWindow, TimeComponents};

fn code(i: usize, global: &str, tt: f64, ist: f64, work: f64) -> CodeRecord {
    CodeRecord {
        hcpcs: format!("{:05}", i),
        description: String::new(),
        global_value: global.to_string(),
        current_work: work,
        current_tt: tt,
        current_ist: ist,
        current_preservice: 0.0,
        current_postservice: 0.0,
        components: TimeComponents::default(),
        descriptors: CodeDescriptors::default(),
    }
}

fn records() -> impl Strategy<Value = Vec<CodeRecord>> {
    prop::collection::vec(
        (
            prop::sample::select(vec!["000", "010", "090"]),
            0u32..120,
            0u32..90,
            1u32..2000,
        ),
        0..60,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (global, tt, ist, work))| code(i, global, tt as f64, ist as f64, work as f64 / 100.0))
            .collect()
    })
}

fn window() -> impl Strategy<Value = SearchWindow> {
    (0u32..120, 0u32..60, 0u32..90, 0u32..45).prop_map(|(tt_lower, tt_width, ist_lower, ist_width)| {
        SearchWindow {
            time_lower: tt_lower as f64,
            time_upper: (tt_lower + tt_width) as f64,
            intraservice_lower: ist_lower as f64,
            intraservice_upper: (ist_lower + ist_width) as f64,
            allowable: AllowableBounds {
                time_min: 0.0,
                time_max: 240.0,
                intraservice_min: 0.0,
                intraservice_max: 180.0,
            },
        }
    })
}

proptest! {
    #[test]
    fn quartile_is_a_subset_under_the_cutoff(rows in records(), window in window()) {
        let storage = InMemoryStorage::new(rows, vec![], vec![], vec![], vec![]);
        let split = filter(&storage, "010", &window);

        for member in &split.quartile {
            prop_assert!(split.population.contains(member));
            prop_assert!(member.current_work <= split.work_percentile.unwrap());
        }
        for member in &split.population {
            prop_assert!(window.contains(member));
            prop_assert_eq!(member.global_value.as_str(), "010");
        }
        prop_assert_eq!(split.population.is_empty(), split.work_percentile.is_none());
        prop_assert_eq!(split.population.is_empty(), split.quartile.is_empty());
    }

    #[test]
    fn filter_is_a_pure_function(rows in records(), window in window()) {
        let storage = InMemoryStorage::new(rows, vec![], vec![], vec![], vec![]);
        prop_assert_eq!(filter(&storage, "090", &window), filter(&storage, "090", &window));
    }

    #[test]
    fn percentile_lies_within_the_data(values in prop::collection::vec(0.0f64..100.0, 1..50), p in 0.0f64..=100.0) {
        let sorted = sorted_copy(&values);
        let q = percentile(&sorted, p).unwrap();
        let (lo, hi) = (sorted[0], sorted[sorted.len() - 1]);
        prop_assert!(q >= lo - 1e-9 && q <= hi + 1e-9);

        let m = median(&values).unwrap();
        prop_assert!(m >= lo - 1e-9 && m <= hi + 1e-9);
    }

    #[test]
    fn zero_current_time_never_divides(proposed in -1000.0f64..1000.0) {
        prop_assert_eq!(time_ratio(proposed, 0.0), 0.0);
        prop_assert_eq!(intensity_ratio(proposed, 0.0), 0.0);
    }
}
