//! Interpolation engine: eased, time-driven animation of a single parameter.
//!
//! An [`Interpolation`] is the parsed description (`goto(0.2 and 1 as
//! InOutSine in 4..6)`); it is immutable and shared between statements.
//! An [`InterpolationData`] is one playhead over that description. Every
//! spawned instance gets its own playhead via [`InterpolationData::new`] or
//! [`InterpolationData::create_copy`], so concurrent instances never share
//! progress.
//!
//! `value(dt)` is a pure function of accumulated time: feeding ten steps of
//! `0.1` or one step of `1.0` lands in the same state (up to the random
//! draws made at cycle boundaries, which happen in the same order either way).

pub mod manager;

pub use manager::InterpolationManager;

use std::sync::Arc;

use rand::Rng;
use serde::Serialize;

use crate::ease::Ease;
use crate::value::RangeOrValue;

/// How time maps onto the `min → max` animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InterpolationType {
    /// One-way `min → max`, repeated `repeat_count` times (or forever).
    Interpolate,
    /// One-way `min → max`, then holds `max` for good.
    Goto,
    /// `min → max → min` round trips, forever unless a count is given.
    GoBetween,
}

impl InterpolationType {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "interpolate" => Some(Self::Interpolate),
            "goto" => Some(Self::Goto),
            "gobetween" => Some(Self::GoBetween),
            _ => None,
        }
    }
}

/// A parsed interpolation: ranges for the endpoints and the cycle length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interpolation {
    pub kind: InterpolationType,
    pub min: RangeOrValue,
    pub max: RangeOrValue,
    pub duration: RangeOrValue,
    /// The ease name as written in the script.
    pub ease_name: String,
    pub ease: Ease,
    pub repeat_count: u32,
    pub forever: bool,
}

impl Interpolation {
    /// Defaults per mode: `gobetween` loops forever, the others run once.
    pub fn new(
        kind: InterpolationType,
        min: RangeOrValue,
        max: RangeOrValue,
        duration: RangeOrValue,
        ease_name: impl Into<String>,
    ) -> Self {
        let ease_name = ease_name.into();
        Self {
            kind,
            min,
            max,
            duration,
            ease: Ease::resolve(&ease_name),
            ease_name,
            repeat_count: 1,
            forever: kind == InterpolationType::GoBetween,
        }
    }

    pub fn with_repeat(mut self, repeat_count: u32) -> Self {
        self.repeat_count = repeat_count.max(1);
        self.forever = false;
        self
    }

    pub fn with_forever(mut self) -> Self {
        self.forever = true;
        self
    }
}

/// A running playhead over an [`Interpolation`].
#[derive(Debug, Clone)]
pub struct InterpolationData {
    spec: Arc<Interpolation>,
    min_value: f64,
    max_value: f64,
    duration: f64,
    current_time: f64,
    current_repeat: u32,
    active: bool,
    returning: bool,
}

impl InterpolationData {
    /// Start a playhead, drawing the first cycle's endpoints and duration.
    pub fn new<R: Rng + ?Sized>(spec: Arc<Interpolation>, rng: &mut R) -> Self {
        let mut data = Self {
            spec,
            min_value: 0.0,
            max_value: 0.0,
            duration: 0.0,
            current_time: 0.0,
            current_repeat: 0,
            active: true,
            returning: false,
        };
        data.resample(rng);
        data
    }

    /// A fresh playhead over the same description, with its own first draw.
    ///
    /// Progress is not copied.
    pub fn create_copy<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        Self::new(Arc::clone(&self.spec), rng)
    }

    /// Rewind to the start and draw new values.
    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.current_time = 0.0;
        self.current_repeat = 0;
        self.active = true;
        self.returning = false;
        self.resample(rng);
    }

    /// Advance by `dt` seconds and return the current value.
    pub fn value<R: Rng + ?Sized>(&mut self, dt: f64, rng: &mut R) -> f64 {
        if !self.active {
            return self.terminal_value();
        }
        self.current_time += dt;

        match self.spec.kind {
            InterpolationType::Interpolate => {
                while self.current_time >= self.duration {
                    if self.duration <= 0.0 {
                        return self.finish(self.max_value);
                    }
                    self.current_time -= self.duration;
                    if !self.spec.forever {
                        self.current_repeat += 1;
                        if self.current_repeat >= self.spec.repeat_count {
                            return self.finish(self.max_value);
                        }
                    }
                    self.resample(rng);
                }
                self.eased(self.min_value, self.max_value, self.current_time / self.duration)
            }
            InterpolationType::Goto => {
                if self.current_time >= self.duration {
                    return self.finish(self.max_value);
                }
                self.eased(self.min_value, self.max_value, self.current_time / self.duration)
            }
            InterpolationType::GoBetween => {
                while self.current_time >= 2.0 * self.duration {
                    if self.duration <= 0.0 {
                        return self.finish(self.min_value);
                    }
                    self.current_time -= 2.0 * self.duration;
                    if !self.spec.forever {
                        self.current_repeat += 1;
                        if self.current_repeat >= self.spec.repeat_count {
                            return self.finish(self.min_value);
                        }
                    }
                    self.resample(rng);
                }
                if self.current_time < self.duration {
                    self.returning = false;
                    self.eased(self.min_value, self.max_value, self.current_time / self.duration)
                } else {
                    self.returning = true;
                    let t = (self.current_time - self.duration) / self.duration;
                    self.eased(self.max_value, self.min_value, t)
                }
            }
        }
    }

    pub fn spec(&self) -> &Arc<Interpolation> {
        &self.spec
    }

    pub fn kind(&self) -> InterpolationType {
        self.spec.kind
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_returning(&self) -> bool {
        self.returning
    }

    pub fn min_value(&self) -> f64 {
        self.min_value
    }

    pub fn max_value(&self) -> f64 {
        self.max_value
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn current_repeat(&self) -> u32 {
        self.current_repeat
    }

    fn terminal_value(&self) -> f64 {
        match self.spec.kind {
            InterpolationType::Goto => self.max_value,
            _ => self.min_value,
        }
    }

    fn finish(&mut self, value: f64) -> f64 {
        self.active = false;
        value
    }

    fn resample<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.min_value = self.spec.min.sample(rng);
        self.max_value = self.spec.max.sample(rng);
        self.duration = self.spec.duration.sample(rng);
    }

    /// Only the eased output is clamped; `t` reaches the curve untouched.
    fn eased(&self, from: f64, to: f64, t: f64) -> f64 {
        let progress = self.spec.ease.apply(t).clamp(0.0, 1.0);
        from + (to - from) * progress
    }
}
