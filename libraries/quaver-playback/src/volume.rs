//! Volume level and mute state
//!
//! Volume range is 0-100. Muting keeps the level so unmuting restores it.

/// Volume controller
#[derive(Debug, Clone)]
pub struct Volume {
    /// Volume level (0-100)
    level: u8,

    /// Mute state (preserves volume level)
    muted: bool,
}

impl Volume {
    /// Create new volume controller
    ///
    /// # Arguments
    /// * `level` - Initial volume (clamped to 0-100)
    pub fn new(level: u8) -> Self {
        Self {
            level: level.min(100),
            muted: false,
        }
    }

    /// Set volume level, clamped to 0-100
    ///
    /// Accepts out-of-range input (including negative) from sliders and
    /// remote controls.
    pub fn set_level(&mut self, level: i32) {
        self.level = level.clamp(0, 100) as u8;
    }

    /// Get current volume level (0-100)
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Mute audio (preserves volume level)
    pub fn mute(&mut self) {
        self.muted = true;
    }

    /// Unmute audio (restores previous volume)
    pub fn unmute(&mut self) {
        self.muted = false;
    }

    /// Toggle mute state
    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
    }

    /// Check if muted
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Level the backend should actually play at
    pub fn effective_level(&self) -> u8 {
        if self.muted {
            0
        } else {
            self.level
        }
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new(80) // Default to 80%
    }
}
