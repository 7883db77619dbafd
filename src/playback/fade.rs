//! Linear gain ramps for fade in and fade out.

use super::EPSILON;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Ramp {
    from: f64,
    to: f64,
    length: f64,
    elapsed: f64,
}

/// A gain multiplier that can glide linearly to a target level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gain {
    level: f64,
    ramp: Option<Ramp>,
}

impl Gain {
    pub fn unity() -> Self {
        Self {
            level: 1.0,
            ramp: None,
        }
    }

    /// Start silent and rise to 1 over `length` seconds.
    pub fn fade_in(length: f64) -> Self {
        let mut gain = Self {
            level: 0.0,
            ramp: None,
        };
        gain.fade_to(1.0, length);
        gain
    }

    /// Glide from the current level to `target` over `length` seconds.
    pub fn fade_to(&mut self, target: f64, length: f64) {
        self.ramp = Some(Ramp {
            from: self.level,
            to: target,
            length: length.max(0.0),
            elapsed: 0.0,
        });
    }

    /// Advance by `dt` seconds and return the new level.
    pub fn advance(&mut self, dt: f64) -> f64 {
        if let Some(ramp) = &mut self.ramp {
            ramp.elapsed += dt;
            if ramp.length <= 0.0 || ramp.elapsed + EPSILON >= ramp.length {
                self.level = ramp.to;
                self.ramp = None;
            } else {
                let t = ramp.elapsed / ramp.length;
                self.level = ramp.from + (ramp.to - ramp.from) * t;
            }
        }
        self.level
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    /// True once no ramp is in progress.
    pub fn is_settled(&self) -> bool {
        self.ramp.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn unity_holds() {
        let mut g = Gain::unity();
        assert_eq!(g.advance(10.0), 1.0);
        assert!(g.is_settled());
    }

    #[test]
    fn fade_in_rises_linearly() {
        let mut g = Gain::fade_in(2.0);
        assert_eq!(g.level(), 0.0);
        assert_approx_eq!(g.advance(0.5), 0.25, 1e-12);
        assert_approx_eq!(g.advance(0.5), 0.5, 1e-12);
        assert!(!g.is_settled());
        assert_eq!(g.advance(5.0), 1.0);
        assert!(g.is_settled());
    }

    #[test]
    fn fade_out_starts_from_current_level() {
        let mut g = Gain::fade_in(1.0);
        g.advance(0.5);
        g.fade_to(0.0, 1.0);
        assert_approx_eq!(g.advance(0.5), 0.25, 1e-12);
        assert_eq!(g.advance(0.5), 0.0);
        assert!(g.is_settled());
    }

    #[test]
    fn zero_length_fade_is_immediate() {
        let mut g = Gain::unity();
        g.fade_to(0.0, 0.0);
        assert_eq!(g.advance(0.0), 0.0);
        assert!(g.is_settled());
    }
}
