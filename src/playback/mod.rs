//! Playback scheduler: spawns statement instances and drives them in time.
//!
//! The [`Scheduler`] sits between the compiled statements and an
//! [`AudioBackend`]. It owns every instance timeline ([`Player`]) and every
//! detached one-shot handle ([`Voice`]) and advances them all on one clock,
//! from a single thread, once per [`Scheduler::tick`].
//!
//! Each instance draws from its own `ChaCha8Rng`, seeded from the
//! scheduler's RNG at spawn. Runs with the same seed are reproducible, and
//! an instance's draws do not depend on how its neighbours are stepped.

pub mod backend;
pub mod fade;
pub mod player;
pub mod recording;
pub mod voice;
pub mod wav;

pub use backend::{AudioBackend, BackendError, HandleId, MovementMode, SpatialDescriptor};
pub use player::{Player, PlayerState};
pub use recording::{BackendCall, RecordingBackend};
pub use voice::{Voice, VoiceState};
pub use wav::WavBackend;

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::dsl::Statement;

/// Tolerance for deciding that a wait has elapsed.
pub(crate) const EPSILON: f64 = 1e-9;

/// Clip length assumed when a backend cannot report one.
pub const DEFAULT_CLIP_SECONDS: f64 = 2.0;

pub struct Scheduler {
    players: Vec<Player>,
    /// Transient handles that outlive the instance that started them.
    voices: Vec<Voice>,
    rng: ChaCha8Rng,
    next_instance: u64,
    elapsed: f64,
    fallback_clip_seconds: f64,
}

impl Scheduler {
    pub fn new(seed: u64) -> Self {
        Self {
            players: Vec::new(),
            voices: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            next_instance: 0,
            elapsed: 0.0,
            fallback_clip_seconds: DEFAULT_CLIP_SECONDS,
        }
    }

    pub fn with_fallback_clip_seconds(mut self, seconds: f64) -> Self {
        self.fallback_clip_seconds = seconds.max(0.0);
        self
    }

    /// Spawn `count` instances of every statement. Returns how many started.
    ///
    /// Running instances are left alone.
    pub fn spawn(&mut self, statements: &[Arc<Statement>]) -> usize {
        let mut spawned = 0;
        for statement in statements {
            for _ in 0..statement.count {
                let id = self.next_instance;
                self.next_instance += 1;
                let rng = ChaCha8Rng::seed_from_u64(self.rng.gen());
                self.players
                    .push(Player::new(id, Arc::clone(statement), rng));
                spawned += 1;
            }
        }
        debug!(spawned, total = self.players.len(), "spawned instances");
        spawned
    }

    /// Advance every timeline by `dt` seconds.
    pub fn tick(&mut self, dt: f64, backend: &mut dyn AudioBackend) {
        let dt = dt.max(0.0);

        for voice in &mut self.voices {
            voice.advance(dt, backend);
        }
        self.voices.retain(|v| !v.is_released());

        let mut detached = Vec::new();
        for player in &mut self.players {
            player.advance(dt, backend, self.fallback_clip_seconds, &mut detached);
        }
        self.players.retain(|p| !p.is_terminated());
        detached.retain(|v| !v.is_released());
        self.voices.extend(detached);

        self.elapsed += dt;
    }

    /// Cancel every instance and release every handle.
    pub fn hard_reset(&mut self, backend: &mut dyn AudioBackend) {
        let instances = self.players.len();
        let voices = self.voices.len();
        for player in &mut self.players {
            player.cancel(backend);
        }
        for voice in &mut self.voices {
            voice.kill(backend);
        }
        self.players.clear();
        self.voices.clear();
        info!(instances, voices, "hard reset");
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Instances whose timeline has not ended.
    pub fn instance_count(&self) -> usize {
        self.players.len()
    }

    /// Handles currently held, by instances or detached.
    pub fn voice_count(&self) -> usize {
        self.voices.len() + self.players.iter().filter(|p| p.voice().is_some()).count()
    }

    pub fn is_idle(&self) -> bool {
        self.players.is_empty() && self.voices.is_empty()
    }

    /// Seconds of scheduler time since creation.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
}
