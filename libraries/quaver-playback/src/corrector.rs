//! Time-domain correction between metadata and backend time
//!
//! Some decoders estimate duration (and therefore position) wrongly for
//! variable-bitrate files. Metadata duration is authoritative for the UI,
//! but seeks have to be issued in the backend's own coordinates.
//!
//! All conversions go through the ratio `backend_duration / real_duration`
//! (the scale factor). They are computed as exact integer fractions, so
//! `floor(real * scale)` never picks up floating point error.

use crate::error::{PlaybackError, Result};
use tracing::{debug, warn};

/// Per-track calibration between real (metadata) and backend milliseconds
#[derive(Debug, Clone, Default)]
pub struct TimeDomainCorrector {
    /// Duration from metadata, known at load time
    real_duration: u64,

    /// Duration reported by the backend, unknown until it says so
    backend_duration: Option<u64>,

    /// Last backend position issued through a seek
    last_mapped_position: u64,

    /// Real position that corresponds to `last_mapped_position`
    last_real_position: u64,
}

impl TimeDomainCorrector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset calibration for a freshly loaded track
    pub fn on_track_loaded(&mut self, real_duration: u64) {
        self.real_duration = real_duration;
        self.backend_duration = None;
        self.last_mapped_position = 0;
        self.last_real_position = 0;
    }

    /// Record the backend's own duration and derive the scale factor
    ///
    /// Returns the scale factor, or `None` while it cannot be computed
    /// (metadata duration of zero). Reporting the same duration twice is
    /// harmless.
    pub fn on_backend_duration_reported(&mut self, backend_duration: u64) -> Option<f64> {
        if self.real_duration == 0 || backend_duration == 0 {
            warn!(
                real_duration = self.real_duration,
                backend_duration, "Cannot calibrate track, using identity mapping"
            );
            return None;
        }

        if self.backend_duration == Some(backend_duration) {
            return self.scale_factor();
        }

        self.backend_duration = Some(backend_duration);

        // A new scale invalidates the real anchor of the last seek
        if self.last_mapped_position != 0 {
            self.last_real_position = self.to_real(self.last_mapped_position);
        }

        let scale = self.scale_factor();
        debug!(
            real_duration = self.real_duration,
            backend_duration,
            scale = scale.unwrap_or(1.0),
            "Calibrated time domain"
        );
        scale
    }

    /// Translate a real seek target into backend time
    ///
    /// Returns the position to hand to the backend. Seeking to zero needs no
    /// calibration; any other target does.
    pub fn seek_to(&mut self, real_position: u64) -> Result<u64> {
        let mapped = if real_position == 0 {
            0
        } else {
            if !self.is_calibrated() {
                return Err(PlaybackError::Uncalibrated {
                    position_ms: real_position,
                });
            }
            self.to_backend(real_position)
        };

        self.last_mapped_position = mapped;
        self.last_real_position = real_position;
        Ok(mapped)
    }

    /// Translate a backend position report into real time
    ///
    /// Anchored to the last explicit seek rather than integrating deltas, so
    /// repeated small updates never accumulate rounding error. The result is
    /// clamped to `[0, real_duration]`.
    ///
    /// The anchor is the real target of the last seek, not
    /// `floor(last_mapped / scale)`; the two differ by less than `1 / scale` ms.
    /// It is only recomputed from the mapped position when the scale changes.
    pub fn on_backend_position_reported(&self, backend_position: u64) -> u64 {
        let elapsed = i128::from(backend_position) - i128::from(self.last_mapped_position);
        let last_real = if self.last_mapped_position == 0 {
            0
        } else {
            i128::from(self.last_real_position)
        };

        let upper = if self.real_duration == 0 {
            i128::from(u64::MAX)
        } else {
            i128::from(self.real_duration)
        };

        (last_real + elapsed).clamp(0, upper) as u64
    }

    /// Metadata duration of the loaded track (never the backend's)
    pub fn real_duration(&self) -> u64 {
        self.real_duration
    }

    /// Duration the backend reported, if any
    pub fn backend_duration(&self) -> Option<u64> {
        self.backend_duration
    }

    /// `backend_duration / real_duration`, once known
    pub fn scale_factor(&self) -> Option<f64> {
        match self.backend_duration {
            Some(backend) if self.real_duration > 0 => {
                Some(backend as f64 / self.real_duration as f64)
            }
            _ => None,
        }
    }

    /// Whether the backend duration has been reported for this track
    pub fn is_calibrated(&self) -> bool {
        self.scale_factor().is_some()
    }

    /// Last position sent to the backend through a seek
    pub fn last_mapped_position(&self) -> u64 {
        self.last_mapped_position
    }

    /// `floor(real * scale)`, identity while uncalibrated
    fn to_backend(&self, real: u64) -> u64 {
        match self.backend_duration {
            Some(backend) if self.real_duration > 0 => {
                (u128::from(real) * u128::from(backend) / u128::from(self.real_duration)) as u64
            }
            _ => real,
        }
    }

    /// `floor(mapped / scale)`, identity while uncalibrated
    fn to_real(&self, mapped: u64) -> u64 {
        match self.backend_duration {
            Some(backend) if self.real_duration > 0 => {
                (u128::from(mapped) * u128::from(self.real_duration) / u128::from(backend)) as u64
            }
            _ => mapped,
        }
    }
}
