//! The boundary between the scheduler and whatever actually makes sound.
//!
//! The scheduler never touches audio data. It asks an [`AudioBackend`] for
//! handles, sets their volume and pitch every tick, and tells them when to
//! play, stop, and release.

use std::path::PathBuf;

use rand::Rng;
use serde::Serialize;
use thiserror::Error;

use crate::dsl::{Movement, Visual};
use crate::value::RangeOrValue;

/// Opaque identifier for one acquired playback resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HandleId(pub u64);

impl std::fmt::Display for HandleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("clip '{clip}' not found at {}", .path.display())]
    ClipNotFound { clip: String, path: PathBuf },
    #[error("failed to read clip '{clip}': {source}")]
    Decode {
        clip: String,
        #[source]
        source: hound::Error,
    },
    #[error("unknown handle {0}")]
    UnknownHandle(HandleId),
}

/// Audio collaborator driven by the scheduler.
///
/// Calls on a released handle must be ignored; the scheduler never makes
/// them, but a backend should not panic if it does.
pub trait AudioBackend {
    /// Acquire a handle with `clip` loaded. Fails if the clip cannot be found.
    fn acquire(&mut self, clip: &str) -> Result<HandleId, BackendError>;

    /// Swap the clip on an existing handle.
    fn load_clip(&mut self, handle: HandleId, clip: &str) -> Result<(), BackendError>;

    fn set_volume(&mut self, handle: HandleId, volume: f64);

    fn set_pitch(&mut self, handle: HandleId, pitch: f64);

    /// Start playback from the beginning of the clip.
    fn play(&mut self, handle: HandleId, looped: bool);

    fn stop(&mut self, handle: HandleId);

    fn release(&mut self, handle: HandleId);

    /// Natural length of the loaded clip in seconds, at pitch 1.
    fn clip_length(&self, handle: HandleId) -> Option<f64>;

    /// Hand off the spatial and visual description, once per handle.
    fn place(&mut self, _handle: HandleId, _spatial: &SpatialDescriptor) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementMode {
    #[default]
    None,
    Walk,
    Fly,
    Fixed,
}

/// Where an instance lives and what it looks like.
///
/// Walk and fly carry the box the instance wanders in; fixed has
/// `min == max`, the sampled position.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SpatialDescriptor {
    pub mode: MovementMode,
    pub min: [f64; 3],
    pub max: [f64; 3],
    /// Wander frequency for walk and fly, zero otherwise.
    pub frequency: f64,
    pub visuals: Vec<Visual>,
}

impl SpatialDescriptor {
    /// Resolve a movement description for one instance.
    pub fn sample<R: Rng + ?Sized>(movement: &Movement, visuals: &[Visual], rng: &mut R) -> Self {
        let visuals = visuals.to_vec();
        match movement {
            Movement::None => Self {
                visuals,
                ..Self::default()
            },
            Movement::Walk { x, z, speed } => {
                let (x0, x1) = extent(x);
                let (z0, z1) = extent(z);
                Self {
                    mode: MovementMode::Walk,
                    min: [x0, 0.0, z0],
                    max: [x1, 0.0, z1],
                    frequency: speed.sample(rng),
                    visuals,
                }
            }
            Movement::Fly { x, y, z, speed } => {
                let (x0, x1) = extent(x);
                let (y0, y1) = extent(y);
                let (z0, z1) = extent(z);
                Self {
                    mode: MovementMode::Fly,
                    min: [x0, y0, z0],
                    max: [x1, y1, z1],
                    frequency: speed.sample(rng),
                    visuals,
                }
            }
            Movement::Fixed { x, y, z } => {
                let pos = [x.sample(rng), y.sample(rng), z.sample(rng)];
                Self {
                    mode: MovementMode::Fixed,
                    min: pos,
                    max: pos,
                    frequency: 0.0,
                    visuals,
                }
            }
        }
    }
}

/// A range is taken as written; a single value `v` spans `-v..v`.
fn extent(value: &RangeOrValue) -> (f64, f64) {
    match *value {
        RangeOrValue::Range(a, b) => (a, b),
        RangeOrValue::Fixed(v) => (-v.abs(), v.abs()),
        RangeOrValue::Unset => (0.0, 0.0),
    }
}
