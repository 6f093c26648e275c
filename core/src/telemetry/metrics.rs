use std::sync::Mutex;
use std::time::Duration;

/// Counts processed frames and failures across workflow runs.
pub struct MetricsRecorder {
    inner: Mutex<Metrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub frames: usize,
    pub errors: usize,
    pub busy: Duration,
}

#[derive(Default)]
struct Metrics {
    frames: usize,
    errors: usize,
    busy: Duration,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics::default()),
        }
    }

    pub fn record_frame(&self, elapsed: Duration) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.frames += 1;
            metrics.busy += elapsed;
        }
    }

    pub fn record_error(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.errors += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            MetricsSnapshot {
                frames: metrics.frames,
                errors: metrics.errors,
                busy: metrics.busy,
            }
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_frames_and_errors() {
        let metrics = MetricsRecorder::new();
        metrics.record_frame(Duration::from_millis(3));
        metrics.record_frame(Duration::from_millis(4));
        metrics.record_error();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.frames, 2);
        assert_eq!(snapshot.errors, 1);
        assert_eq!(snapshot.busy, Duration::from_millis(7));
    }
}
