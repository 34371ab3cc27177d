use std::time::Duration;

/// Tunables of the scanner screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannerConfig {
    /// Delay between the end of one autofocus cycle and the next request.
    pub autofocus_interval: Duration,
    /// Minimum change of the two-finger distance, in pixels, for one zoom step.
    pub zoom_threshold: f32,
    /// Length of the vibration cue after a successful decode.
    pub vibration: Duration,
    /// How long the decoded text stays on screen as a toast.
    pub toast_duration: Duration,
    pub camera_index: usize,
    pub preview_width: u32,
    pub preview_height: u32,
    /// Space kept free on each side of the square preview box.
    pub preview_margin: u32,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            autofocus_interval: Duration::from_millis(1000),
            zoom_threshold: 30.0,
            vibration: Duration::from_millis(300),
            toast_duration: Duration::from_millis(2000),
            camera_index: 0,
            preview_width: 1280,
            preview_height: 720,
            preview_margin: 64,
        }
    }
}

impl ScannerConfig {
    /// Side, in physical pixels, of the square preview box on a display
    /// `display_width` physical pixels wide. The margin is in logical
    /// pixels and scales with `scale_factor`.
    pub fn preview_box_side(&self, display_width: u32, scale_factor: f32) -> u32 {
        let margin = (self.preview_margin as f32 * scale_factor.max(0.0)).round() as u32;
        display_width.saturating_sub(margin * 2)
    }
}
