use serde::Serialize;

use super::percentiles::{compute_avg, compute_max, compute_min, compute_percentiles, PercentileSet};
use super::{now_ms, Sample};

/// Latency breakdown: min/max/avg plus one `pN` entry per configured percentile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyMetrics {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    #[serde(flatten)]
    pub percentiles: PercentileSet,
}

impl LatencyMetrics {
    pub fn percentile(&self, p: f64) -> Option<f64> {
        self.percentiles.get(p)
    }
}

/// Error fractions over the active window, rounded to 4 decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ErrorRate {
    #[serde(rename = "client4xx")]
    pub client_4xx: f64,
    #[serde(rename = "server5xx")]
    pub server_5xx: f64,
    pub total: f64,
}

/// Summary for one endpoint, recomputed from its samples on every read.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointMetrics {
    pub method: String,
    pub pattern: String,
    pub count: usize,
    pub latency: LatencyMetrics,
    pub error_rate: ErrorRate,
    /// Requests per second since the oldest active sample
    pub throughput: f64,
    pub avg_req_size: u64,
    pub avg_res_size: u64,
    pub last_seen: u64,
}

/// Aggregate against the current wall clock.
pub fn aggregate(samples: &[Sample], percentiles: &[f64], retention_ms: u64) -> Option<EndpointMetrics> {
    aggregate_at(samples, percentiles, retention_ms, now_ms())
}

/// Aggregate the samples that fall inside `[now - retention_ms, ∞)`.
///
/// Returns `None` for empty input or when every sample is stale, which is
/// how idle endpoints drop out of reads before eviction removes them.
/// Throughput divides by the time from the oldest active sample to `now`,
/// so re-reading later without new writes lowers it.
pub fn aggregate_at(
    samples: &[Sample],
    percentiles: &[f64],
    retention_ms: u64,
    now: u64,
) -> Option<EndpointMetrics> {
    if samples.is_empty() {
        return None;
    }

    let cutoff = now.saturating_sub(retention_ms);
    let active: Vec<&Sample> = samples.iter().filter(|s| s.timestamp >= cutoff).collect();
    let first = *active.first()?;

    let durations: Vec<f64> = active.iter().map(|s| s.duration_ms).collect();

    let mut client_4xx = 0usize;
    let mut server_5xx = 0usize;
    let mut total_req = 0u64;
    let mut total_res = 0u64;
    let mut oldest = first.timestamp;
    let mut newest = first.timestamp;

    for s in &active {
        match s.status_code {
            400..=499 => client_4xx += 1,
            500..=u16::MAX => server_5xx += 1,
            _ => {}
        }
        total_req += s.req_size;
        total_res += s.res_size;
        oldest = oldest.min(s.timestamp);
        newest = newest.max(s.timestamp);
    }

    let count = active.len();
    let span_ms = now.saturating_sub(oldest).max(1);
    let throughput = count as f64 / (span_ms as f64 / 1000.0);

    Some(EndpointMetrics {
        method: first.method.clone(),
        pattern: first.pattern.clone(),
        count,
        latency: LatencyMetrics {
            min: compute_min(&durations),
            max: compute_max(&durations),
            avg: round_to(compute_avg(&durations), 2),
            percentiles: compute_percentiles(&durations, percentiles),
        },
        error_rate: ErrorRate {
            client_4xx: fraction(client_4xx, count),
            server_5xx: fraction(server_5xx, count),
            total: fraction(client_4xx + server_5xx, count),
        },
        throughput: round_to(throughput, 2),
        avg_req_size: (total_req as f64 / count as f64).round() as u64,
        avg_res_size: (total_res as f64 / count as f64).round() as u64,
        last_seen: newest,
    })
}

fn fraction(part: usize, count: usize) -> f64 {
    round_to(part as f64 / count as f64, 4)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000_000;
    const WINDOW: u64 = 60_000;
    const DEFAULT: [f64; 3] = [50.0, 95.0, 99.0];

    fn sample(status: u16, duration_ms: f64, timestamp: u64) -> Sample {
        Sample {
            method: "GET".into(),
            pattern: "/test".into(),
            status_code: status,
            duration_ms,
            req_size: 0,
            res_size: 100,
            timestamp,
        }
    }

    #[test]
    fn empty_is_none() {
        assert!(aggregate_at(&[], &DEFAULT, WINDOW, NOW).is_none());
    }

    #[test]
    fn all_stale_is_none() {
        let samples = [sample(200, 50.0, NOW - 120_000), sample(200, 50.0, NOW - 100_000)];
        assert!(aggregate_at(&samples, &DEFAULT, WINDOW, NOW).is_none());
    }

    #[test]
    fn single_sample() {
        let m = aggregate_at(&[sample(200, 42.0, NOW)], &DEFAULT, WINDOW, NOW).unwrap();
        assert_eq!(m.count, 1);
        assert_eq!(m.latency.percentile(50.0), Some(42.0));
        assert_eq!(m.latency.min, 42.0);
        assert_eq!(m.latency.max, 42.0);
        assert_eq!(m.error_rate.total, 0.0);
        assert_eq!(m.last_seen, NOW);
    }

    #[test]
    fn error_fractions() {
        let samples: Vec<_> = [200, 201, 404, 500, 503]
            .into_iter()
            .map(|s| sample(s, 10.0, NOW))
            .collect();
        let m = aggregate_at(&samples, &[50.0], WINDOW, NOW).unwrap();
        assert!((m.error_rate.client_4xx - 0.2).abs() < 0.01);
        assert!((m.error_rate.server_5xx - 0.4).abs() < 0.01);
        assert!((m.error_rate.total - 0.6).abs() < 0.01);
    }

    #[test]
    fn drops_samples_outside_window() {
        let samples = [
            sample(200, 999.0, NOW - 120_000),
            sample(200, 10.0, NOW),
            sample(200, 20.0, NOW),
        ];
        let m = aggregate_at(&samples, &[50.0], WINDOW, NOW).unwrap();
        assert_eq!(m.count, 2);
        assert_eq!(m.latency.max, 20.0);
    }

    #[test]
    fn throughput_uses_time_since_oldest_active() {
        let samples: Vec<_> = (0..10u64).map(|i| sample(200, 5.0, NOW - (10 - i) * 1000)).collect();
        let m = aggregate_at(&samples, &[50.0], WINDOW, NOW).unwrap();
        assert_eq!(m.throughput, 1.0);

        // Reading later with no new writes lowers throughput.
        let later = aggregate_at(&samples, &[50.0], WINDOW, NOW + 10_000).unwrap();
        assert_eq!(later.throughput, 0.5);
    }

    #[test]
    fn zero_span_is_floored_to_one_ms() {
        let m = aggregate_at(&[sample(200, 1.0, NOW)], &[50.0], WINDOW, NOW).unwrap();
        assert_eq!(m.throughput, 1000.0);
    }

    #[test]
    fn average_sizes_and_latency_rounding() {
        let mut a = sample(200, 1.0, NOW);
        a.req_size = 100;
        a.res_size = 500;
        let mut b = sample(200, 2.0, NOW);
        b.req_size = 201;
        b.res_size = 700;
        let c = Sample { duration_ms: 2.0, req_size: 0, res_size: 0, ..sample(200, 0.0, NOW) };

        let m = aggregate_at(&[a, b, c], &[50.0], WINDOW, NOW).unwrap();
        assert_eq!(m.avg_req_size, 100);
        assert_eq!(m.avg_res_size, 400);
        assert_eq!(m.latency.avg, 1.67);
    }

    #[test]
    fn serializes_camel_case_with_flat_percentiles() {
        let m = aggregate_at(&[sample(404, 8.0, NOW)], &[50.0, 99.0], WINDOW, NOW).unwrap();
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["errorRate"]["client4xx"], 1.0);
        assert_eq!(json["latency"]["p50"], 8.0);
        assert_eq!(json["latency"]["p99"], 8.0);
        assert_eq!(json["avgResSize"], 100);
        assert_eq!(json["lastSeen"], NOW);
    }
}
