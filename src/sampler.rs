use std::time::Duration;

/// Mb here is 2^20 bits.
const MEGABIT_BITS: f64 = 1_048_576.0;

/// One interface's cumulative octet counters at a single instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub in_octets: u64,
    pub out_octets: u64,
}

/// Throughput derived from two samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandwidthReading {
    pub in_mbps: u64,
    pub out_mbps: u64,
}

/// Turns successive counter samples into throughput readings.
///
/// A sample where either counter ran backwards (agent restart, counter
/// wrap) is discarded whole: no reading, and the baseline stays at the last
/// good sample. A genuine wrap therefore loses one interval of data; no
/// unwrap arithmetic is attempted. Callers should measure `elapsed` from
/// the last sample the tracker accepted, so a reading after a discard
/// spans the whole gap.
#[derive(Debug, Default)]
pub struct RateTracker {
    prev: Option<Sample>,
}

impl RateTracker {
    pub fn new() -> Self {
        Self { prev: None }
    }

    /// Feed one sample; `elapsed` is the time since the previous accepted
    /// sample. The first sample seeds the baseline and yields nothing.
    pub fn update(&mut self, curr: Sample, elapsed: Duration) -> Option<BandwidthReading> {
        let prev = match self.prev {
            Some(prev) => prev,
            None => {
                self.prev = Some(curr);
                return None;
            }
        };

        if curr.in_octets < prev.in_octets || curr.out_octets < prev.out_octets {
            return None;
        }

        let secs = elapsed.as_secs_f64();
        if secs <= 0.0 {
            return None;
        }

        let reading = BandwidthReading {
            in_mbps: rate_mbps(curr.in_octets - prev.in_octets, secs),
            out_mbps: rate_mbps(curr.out_octets - prev.out_octets, secs),
        };
        self.prev = Some(curr);
        Some(reading)
    }
}

fn rate_mbps(delta_octets: u64, secs: f64) -> u64 {
    (delta_octets as f64 * 8.0 / MEGABIT_BITS / secs).floor() as u64
}
