use std::collections::VecDeque;

/// Default window used for smoothing per-frame PDR and latency series.
pub const DEFAULT_ROLLING_WINDOW: usize = 50;

/// Fixed-size sliding window over a series of samples.
///
/// Like a pandas `rolling(window).mean()`, no mean is reported until the window has been filled
/// once.
#[derive(Debug, Clone)]
pub struct RollingMean {
    window: usize,

    /// Most recent samples, oldest at the front.
    buffer: VecDeque<f64>,

    /// Sum of all samples currently in `buffer`.
    sum: f64,
}

impl RollingMean {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        RollingMean { window, buffer: VecDeque::with_capacity(window), sum: 0.0 }
    }

    /// Adds a sample and returns the mean over the current window, if the window is full.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        if self.buffer.len() >= self.window {
            if let Some(oldest) = self.buffer.pop_front() {
                self.sum -= oldest;
            }
        }
        self.buffer.push_back(value);
        self.sum += value;

        if self.buffer.len() < self.window {
            return None;
        }
        Some(self.sum / self.window as f64)
    }

    pub fn window(&self) -> usize {
        self.window
    }
}
