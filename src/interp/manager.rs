//! Per-instance parameter source for volume and pitch.
//!
//! Each axis has a static base value and, optionally, an attached
//! [`InterpolationData`]. While the interpolation has something to say it
//! wins; once a non-`goto` run is exhausted the base value takes over again.

use rand::Rng;

use super::{InterpolationData, InterpolationType};

#[derive(Debug, Clone)]
pub struct InterpolationManager {
    base_volume: f64,
    base_pitch: f64,
    volume: Option<InterpolationData>,
    pitch: Option<InterpolationData>,
}

impl InterpolationManager {
    pub fn new(base_volume: f64, base_pitch: f64) -> Self {
        Self {
            base_volume,
            base_pitch,
            volume: None,
            pitch: None,
        }
    }

    pub fn with_volume(mut self, data: Option<InterpolationData>) -> Self {
        self.volume = data;
        self
    }

    pub fn with_pitch(mut self, data: Option<InterpolationData>) -> Self {
        self.pitch = data;
        self
    }

    /// Current volume after advancing the volume interpolation by `dt`.
    pub fn volume<R: Rng + ?Sized>(&mut self, dt: f64, rng: &mut R) -> f64 {
        axis_value(&mut self.volume, self.base_volume, dt, rng)
    }

    /// Current pitch after advancing the pitch interpolation by `dt`.
    pub fn pitch<R: Rng + ?Sized>(&mut self, dt: f64, rng: &mut R) -> f64 {
        axis_value(&mut self.pitch, self.base_pitch, dt, rng)
    }

    pub fn set_base_volume(&mut self, volume: f64) {
        self.base_volume = volume;
    }

    pub fn set_base_pitch(&mut self, pitch: f64) {
        self.base_pitch = pitch;
    }

    pub fn has_pitch_interpolation(&self) -> bool {
        self.pitch.is_some()
    }

    /// Start a `goto` volume over from a freshly sampled first value.
    ///
    /// Other interpolations keep their playhead.
    pub fn rewind_goto_volume<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if let Some(data) = self
            .volume
            .as_mut()
            .filter(|d| d.kind() == InterpolationType::Goto)
        {
            data.reset(rng);
        }
    }

    /// The first value a `goto` volume will produce, if one is attached.
    ///
    /// Playback starts there instead of at silence so the ramp has no jump.
    pub fn goto_volume_start(&self) -> Option<f64> {
        self.volume
            .as_ref()
            .filter(|d| d.kind() == InterpolationType::Goto)
            .map(|d| d.min_value())
    }
}

fn axis_value<R: Rng + ?Sized>(
    data: &mut Option<InterpolationData>,
    base: f64,
    dt: f64,
    rng: &mut R,
) -> f64 {
    match data {
        Some(d) if d.kind() == InterpolationType::Goto || d.is_active() => d.value(dt, rng),
        _ => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::Interpolation;
    use crate::value::RangeOrValue;
    use assert_approx_eq::assert_approx_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::sync::Arc;

    fn playhead(kind: InterpolationType, rng: &mut ChaCha8Rng) -> InterpolationData {
        let spec = Interpolation::new(
            kind,
            RangeOrValue::Fixed(0.2),
            RangeOrValue::Fixed(0.8),
            RangeOrValue::Fixed(1.0),
            "linear",
        );
        InterpolationData::new(Arc::new(spec), rng)
    }

    #[test]
    fn base_values_without_interpolation() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut m = InterpolationManager::new(0.7, 1.2);
        assert_eq!(m.volume(0.1, &mut rng), 0.7);
        assert_eq!(m.pitch(0.1, &mut rng), 1.2);
        assert!(m.goto_volume_start().is_none());
    }

    #[test]
    fn active_interpolation_replaces_base_instead_of_scaling_it() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let data = playhead(InterpolationType::Interpolate, &mut rng);
        let mut m = InterpolationManager::new(0.5, 1.0).with_volume(Some(data));
        // 0.5 is the interpolation output alone; 0.5 * 0.5 would be 0.25.
        assert_approx_eq!(m.volume(0.5, &mut rng), 0.5, 1e-9);
        assert_approx_eq!(m.volume(0.25, &mut rng), 0.65, 1e-9);
    }

    #[test]
    fn rewind_restarts_goto_volume_only() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let data = playhead(InterpolationType::Goto, &mut rng);
        let mut m = InterpolationManager::new(1.0, 1.0).with_volume(Some(data));
        assert_eq!(m.volume(2.0, &mut rng), 0.8);
        m.rewind_goto_volume(&mut rng);
        assert_approx_eq!(m.volume(0.0, &mut rng), 0.2, 1e-12);

        let data = playhead(InterpolationType::GoBetween, &mut rng);
        let mut m = InterpolationManager::new(1.0, 1.0).with_volume(Some(data));
        let before = m.volume(0.5, &mut rng);
        m.rewind_goto_volume(&mut rng);
        assert_approx_eq!(m.volume(0.0, &mut rng), before, 1e-12);
    }

    #[test]
    fn exhausted_interpolation_falls_back_to_base() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let data = playhead(InterpolationType::Interpolate, &mut rng);
        let mut m = InterpolationManager::new(0.5, 1.0).with_volume(Some(data));
        assert_eq!(m.volume(1.0, &mut rng), 0.8);
        assert_eq!(m.volume(0.1, &mut rng), 0.5);
    }

    #[test]
    fn finished_goto_keeps_holding_max() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let data = playhead(InterpolationType::Goto, &mut rng);
        let mut m = InterpolationManager::new(0.5, 1.0).with_pitch(Some(data));
        assert_eq!(m.pitch(2.0, &mut rng), 0.8);
        assert_eq!(m.pitch(5.0, &mut rng), 0.8);
    }

    #[test]
    fn goto_volume_start_reports_sampled_min() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let data = playhead(InterpolationType::Goto, &mut rng);
        let m = InterpolationManager::new(1.0, 1.0).with_volume(Some(data));
        assert_eq!(m.goto_volume_start(), Some(0.2));

        let data = playhead(InterpolationType::GoBetween, &mut rng);
        let m = InterpolationManager::new(1.0, 1.0).with_volume(Some(data));
        assert_eq!(m.goto_volume_start(), None);
    }
}
