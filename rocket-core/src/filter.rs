// filter.rs

/// Number of altitude samples the landing filter averages over.
pub const LANDING_WINDOW_LEN: usize = 5;

/// Rolling window used to decide whether altitude has settled after landing.
///
/// Despite the name this is a moving average, not a median: each entry
/// overwrites the oldest slot and the mean of the whole window is returned.
/// The window starts zeroed, so its output is meaningless until it has been
/// fed `LANDING_WINDOW_LEN` values.
pub struct LandingFilter {
    window: [f32; LANDING_WINDOW_LEN],
    cursor: usize,
}

impl LandingFilter {
    pub const fn new() -> Self {
        Self {
            window: [0.0; LANDING_WINDOW_LEN],
            cursor: 0,
        }
    }

    /// Stores `value` over the oldest slot and returns the window mean.
    pub fn process_entry(&mut self, value: f32) -> f32 {
        self.window[self.cursor] = value;
        self.cursor = (self.cursor + 1) % LANDING_WINDOW_LEN;

        let sum: f32 = self.window.iter().sum();
        sum / LANDING_WINDOW_LEN as f32
    }
}

impl Default for LandingFilter {
    fn default() -> Self {
        Self::new()
    }
}
