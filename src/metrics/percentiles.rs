use serde::ser::{Serialize, SerializeMap, Serializer};

/// Percentile values in the order they were requested.
///
/// Serializes as a flat map keyed `p50`, `p95`, `p99.9`, ... so it can be
/// flattened straight into the latency block of an endpoint summary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PercentileSet {
    entries: Vec<(f64, f64)>,
}

impl PercentileSet {
    /// Value computed for percentile `p`, if it was requested.
    pub fn get(&self, p: f64) -> Option<f64> {
        self.entries
            .iter()
            .find(|(requested, _)| *requested == p)
            .map(|(_, value)| *value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `p50`, `p99.9`: `f64`'s `Display` drops a trailing `.0`.
    pub fn key(p: f64) -> String {
        format!("p{p}")
    }
}

impl Serialize for PercentileSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (p, value) in &self.entries {
            map.serialize_entry(&Self::key(*p), value)?;
        }
        map.end()
    }
}

/// Sort-and-interpolate percentiles. O(n log n), fine for n ≤ 10 000.
///
/// Sorts a copy, so the caller's slice is left untouched. Empty input maps
/// every requested percentile to 0.
pub fn compute_percentiles(values: &[f64], percentiles: &[f64]) -> PercentileSet {
    if values.is_empty() {
        return PercentileSet {
            entries: percentiles.iter().map(|&p| (p, 0.0)).collect(),
        };
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();

    let entries = percentiles
        .iter()
        .map(|&p| {
            let value = if p <= 0.0 {
                sorted[0]
            } else if p >= 100.0 {
                sorted[n - 1]
            } else {
                let rank = (p / 100.0) * (n - 1) as f64;
                let lower = rank.floor() as usize;
                let upper = rank.ceil() as usize;
                let fraction = rank - lower as f64;
                sorted[lower] + fraction * (sorted[upper] - sorted[lower])
            };
            (p, value)
        })
        .collect();

    PercentileSet { entries }
}

pub fn compute_min(values: &[f64]) -> f64 {
    values.iter().copied().reduce(f64::min).unwrap_or(0.0)
}

pub fn compute_max(values: &[f64]) -> f64 {
    values.iter().copied().reduce(f64::max).unwrap_or(0.0)
}

pub fn compute_avg(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DEFAULT: [f64; 3] = [50.0, 95.0, 99.0];

    fn one_to(n: u32) -> Vec<f64> {
        (1..=n).map(f64::from).collect()
    }

    #[test]
    fn empty_input_is_zero() {
        let set = compute_percentiles(&[], &DEFAULT);
        assert_eq!(set.get(50.0), Some(0.0));
        assert_eq!(set.get(95.0), Some(0.0));
        assert_eq!(set.get(99.0), Some(0.0));
    }

    #[test]
    fn single_value() {
        let set = compute_percentiles(&[42.0], &DEFAULT);
        for p in DEFAULT {
            assert_eq!(set.get(p), Some(42.0));
        }
    }

    #[test]
    fn one_to_hundred() {
        let set = compute_percentiles(&one_to(100), &DEFAULT);
        assert!((set.get(50.0).unwrap() - 50.5).abs() < 0.1);
        let p95 = set.get(95.0).unwrap();
        assert!((94.0..=96.0).contains(&p95));
        let p99 = set.get(99.0).unwrap();
        assert!((98.0..=100.0).contains(&p99));
    }

    #[test]
    fn interpolates_unsorted_input() {
        let values = [50.0, 10.0, 90.0, 30.0, 70.0, 20.0, 80.0, 40.0, 60.0, 100.0];
        let set = compute_percentiles(&values, &[50.0]);
        assert!((set.get(50.0).unwrap() - 55.0).abs() < 1e-9);
    }

    #[test]
    fn bounds_map_to_min_and_max() {
        let set = compute_percentiles(&[5.0, 10.0, 15.0, 20.0, 25.0], &[0.0, 100.0]);
        assert_eq!(set.get(0.0), Some(5.0));
        assert_eq!(set.get(100.0), Some(25.0));
    }

    #[test]
    fn custom_percentiles() {
        let set = compute_percentiles(&one_to(1000), &[25.0, 75.0, 90.0]);
        assert!((240.0..260.0).contains(&set.get(25.0).unwrap()));
        assert!((740.0..760.0).contains(&set.get(75.0).unwrap()));
        assert!((890.0..910.0).contains(&set.get(90.0).unwrap()));
    }

    #[test]
    fn serializes_with_p_keys_in_request_order() {
        let set = compute_percentiles(&[10.0], &[99.9, 50.0]);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"{"p99.9":10.0,"p50":10.0}"#);
    }

    #[test]
    fn min_max_avg() {
        assert_eq!(compute_min(&[]), 0.0);
        assert_eq!(compute_max(&[]), 0.0);
        assert_eq!(compute_avg(&[]), 0.0);

        assert_eq!(compute_min(&[5.0, 3.0, 8.0, 1.0, 9.0]), 1.0);
        assert_eq!(compute_max(&[5.0, 3.0, 8.0, 1.0, 9.0]), 9.0);
        assert_eq!(compute_avg(&[10.0, 20.0, 30.0]), 20.0);
        assert_eq!(compute_avg(&[42.0]), 42.0);
    }

    proptest! {
        #[test]
        fn never_mutates_input(values in prop::collection::vec(0.0f64..1e6, 0..200)) {
            let before = values.clone();
            let _ = compute_percentiles(&values, &DEFAULT);
            prop_assert_eq!(values, before);
        }

        #[test]
        fn stays_within_min_max(values in prop::collection::vec(0.0f64..1e6, 1..200), p in 0.0f64..=100.0) {
            let v = compute_percentiles(&values, &[p]).get(p).unwrap();
            prop_assert!(v >= compute_min(&values) - 1e-9);
            prop_assert!(v <= compute_max(&values) + 1e-9);
        }
    }
}
