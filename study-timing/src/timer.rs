use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic clock that drives trial scheduling
pub trait Timer: Clone + Send + Sync {
    /// Nanoseconds since the timer was created
    fn now(&self) -> u64;
    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }
    fn sleep(&self, d: Duration);
    /// Records how late a scheduled onset was actually applied
    fn record_frame(&mut self, d: Duration);
    /// Summary of the onsets recorded since the last `reset_stats`
    fn onset_stats(&self) -> OnsetStats;
    fn reset_stats(&mut self);

    fn now_ms(&self) -> u64 {
        self.now() / 1_000_000
    }
}

/// Summary of recorded onset latencies
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnsetStats {
    pub samples: usize,
    pub mean_latency_ns: f64,
    pub jitter_ns: f64,
    pub min_latency_ns: f64,
    pub max_latency_ns: f64,
}

impl OnsetStats {
    fn from_samples(samples: &VecDeque<Duration>) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let times: Vec<f64> = samples.iter().map(|d| d.as_nanos() as f64).collect();
        let avg = times.iter().sum::<f64>() / times.len() as f64;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / times.len() as f64;
        let min = times.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = times.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        OnsetStats {
            samples: times.len(),
            mean_latency_ns: avg,
            jitter_ns: var.sqrt(),
            min_latency_ns: min,
            max_latency_ns: max,
        }
    }
}

// Ring of the most recent onset latencies
#[derive(Debug, Clone)]
struct LatencyLog {
    samples: VecDeque<Duration>,
    max_samples: usize,
}

impl LatencyLog {
    fn new(max_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples,
        }
    }

    fn push(&mut self, d: Duration) {
        if self.samples.len() >= self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(d);
    }

    fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Wall-clock timer with platform-specific precise sleeping
#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    start: Instant,
    latencies: LatencyLog,
}

impl Timer for HighPrecisionTimer {
    fn now(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }
    fn sleep(&self, d: Duration) {
        self.high_precision_sleep(d)
    }
    fn record_frame(&mut self, d: Duration) {
        self.latencies.push(d);
    }
    fn onset_stats(&self) -> OnsetStats {
        OnsetStats::from_samples(&self.latencies.samples)
    }
    fn reset_stats(&mut self) {
        self.latencies.clear();
    }
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            latencies: LatencyLog::new(1000),
        }
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        #[cfg(target_os = "linux")]
        self.linux_sleep(duration);
        #[cfg(target_os = "macos")]
        self.macos_sleep(duration);
        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        std::thread::sleep(duration);
    }

    #[cfg(target_os = "linux")]
    fn linux_sleep(&self, duration: Duration) {
        use libc::{clock_nanosleep, timespec, CLOCK_MONOTONIC, EINTR};

        let mut req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };
        let mut rem = timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };

        // Resume with the remaining time when a signal interrupts the sleep.
        // SAFETY: both timespecs are valid for the duration of the call.
        while unsafe { clock_nanosleep(CLOCK_MONOTONIC, 0, &req, &mut rem) } == EINTR {
            req = rem;
        }
    }

    #[cfg(target_os = "macos")]
    fn macos_sleep(&self, duration: Duration) {
        use mach2::mach_time::{mach_absolute_time, mach_timebase_info, mach_timebase_info_data_t};

        if duration.as_nanos() < 100_000 {
            // SAFETY: mach_timebase_info only writes into the provided struct.
            unsafe {
                let start = mach_absolute_time();
                let mut timebase = mach_timebase_info_data_t { numer: 0, denom: 0 };
                mach_timebase_info(&mut timebase);

                let target_ticks =
                    duration.as_nanos() as u64 * timebase.denom as u64 / timebase.numer as u64;

                while mach_absolute_time() - start < target_ticks {
                    std::hint::spin_loop();
                }
            }
        } else {
            std::thread::sleep(duration);
        }
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic clock for tests and dry runs: `sleep` advances time instantly
#[derive(Debug, Clone)]
pub struct VirtualTimer {
    now_ns: Arc<AtomicU64>,
    latencies: LatencyLog,
}

impl VirtualTimer {
    pub fn new() -> Self {
        Self {
            now_ns: Arc::new(AtomicU64::new(0)),
            latencies: LatencyLog::new(1000),
        }
    }

    pub fn advance(&self, d: Duration) {
        self.now_ns
            .fetch_add(d.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn set_ms(&self, ms: u64) {
        self.now_ns.store(ms * 1_000_000, Ordering::SeqCst);
    }
}

impl Default for VirtualTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for VirtualTimer {
    fn now(&self) -> u64 {
        self.now_ns.load(Ordering::SeqCst)
    }
    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
    fn record_frame(&mut self, d: Duration) {
        self.latencies.push(d);
    }
    fn onset_stats(&self) -> OnsetStats {
        OnsetStats::from_samples(&self.latencies.samples)
    }
    fn reset_stats(&mut self) {
        self.latencies.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_sleep_advances_exactly() {
        let timer = VirtualTimer::new();
        timer.sleep(Duration::from_millis(250));
        timer.sleep(Duration::from_millis(50));
        assert_eq!(timer.now_ms(), 300);
        assert_eq!(timer.elapsed(100_000_000), Duration::from_millis(200));
    }

    #[test]
    fn virtual_clones_share_time() {
        let a = VirtualTimer::new();
        let b = a.clone();
        a.set_ms(42);
        assert_eq!(b.now_ms(), 42);
    }

    #[test]
    fn onset_stats_summarise_latency() {
        let mut timer = VirtualTimer::new();
        assert_eq!(timer.onset_stats(), OnsetStats::default());
        for ms in [1, 3] {
            timer.record_frame(Duration::from_millis(ms));
        }
        let stats = timer.onset_stats();
        assert_eq!(stats.samples, 2);
        assert_eq!(stats.mean_latency_ns, 2_000_000.0);
        assert_eq!(stats.jitter_ns, 1_000_000.0);
        assert_eq!(stats.min_latency_ns, 1_000_000.0);
        assert_eq!(stats.max_latency_ns, 3_000_000.0);
    }

    #[test]
    fn latency_log_is_bounded() {
        let mut log = LatencyLog::new(2);
        for ms in 0..5 {
            log.push(Duration::from_millis(ms));
        }
        assert_eq!(
            log.samples.iter().copied().collect::<Vec<_>>(),
            vec![Duration::from_millis(3), Duration::from_millis(4)]
        );
    }

    #[test]
    fn reset_starts_a_fresh_summary() {
        let mut timer = VirtualTimer::new();
        timer.record_frame(Duration::from_millis(50));
        timer.reset_stats();
        assert_eq!(timer.onset_stats(), OnsetStats::default());
        timer.record_frame(Duration::ZERO);
        let stats = timer.onset_stats();
        assert_eq!(stats.samples, 1);
        assert_eq!(stats.max_latency_ns, 0.0);
    }

    #[test]
    fn real_timer_sleeps_at_least_requested() {
        let timer = HighPrecisionTimer::new();
        let before = timer.now();
        timer.sleep(Duration::from_millis(2));
        assert!(timer.elapsed(before) >= Duration::from_millis(2));
    }
}
