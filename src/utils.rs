//! Timing and console formatting helpers / 计时与输出工具

use std::time::{Duration, Instant};

/// Logs how long a labelled step took / 计时器
pub struct Stopwatch {
    label: &'static str,
    started: Instant,
}

impl Stopwatch {
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Stop and log elapsed time / 结束并记录耗时
    pub fn finish(self) -> Duration {
        let elapsed = self.elapsed();
        tracing::info!("{}: {}", self.label, format_duration(elapsed));
        elapsed
    }
}

/// Human readable duration, milliseconds below one minute / 格式化耗时
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_secs_f64() * 1000.0;
    if millis < 60_000.0 {
        format!("{:.3}ms", millis)
    } else {
        let secs = duration.as_secs();
        format!("{}:{:02}.{:03} (m:ss.mmm)", secs / 60, secs % 60, duration.subsec_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_micros(1500)), "1.500ms");
        assert_eq!(format_duration(Duration::from_millis(83_250)), "1:23.250 (m:ss.mmm)");
    }
}
