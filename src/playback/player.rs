//! Per-instance timeline.
//!
//! A [`Player`] drives one spawned instance of a statement through
//! `WaitingToStart → Playing | WaitingForNextCycle → … → Terminated`.
//! Time is consumed in segments that end exactly on each transition, so a
//! single large step and many small ones reach the same transitions and
//! make the same random draws in the same order.
//!
//! | statement                         | behaviour                                         |
//! |-----------------------------------|---------------------------------------------------|
//! | `loop`                            | one looping handle, optional duration + fade-out  |
//! | `oneshot`, no `every`             | one transient handle, then the instance ends      |
//! | `oneshot every`, `overlap = true` | a new transient handle every cycle                |
//! | `oneshot every`, `overlap = false`| one held handle restarted every cycle             |

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

use super::backend::{AudioBackend, SpatialDescriptor};
use super::voice::{Voice, VoiceState};
use super::EPSILON;
use crate::dsl::{resolve_clip, Statement, StatementKind};
use crate::interp::{InterpolationData, InterpolationManager};

/// Shortest gap between two cycles of a repeating one-shot.
pub const MIN_CYCLE_SECONDS: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerState {
    WaitingToStart { remaining: f64 },
    Playing,
    WaitingForNextCycle { remaining: f64 },
    FadingOut,
    Terminated,
}

#[derive(Debug)]
pub struct Player {
    id: u64,
    statement: Arc<Statement>,
    state: PlayerState,
    rng: ChaCha8Rng,
    /// The loop handle or the held handle of a non-overlapping one-shot.
    voice: Option<Voice>,
}

impl Player {
    pub fn new(id: u64, statement: Arc<Statement>, mut rng: ChaCha8Rng) -> Self {
        let delay = statement.starts_at.sample_or(&mut rng, 0.0).max(0.0);
        debug!(instance = id, clip = %statement.clip, delay, "instance spawned");
        Self {
            id,
            statement,
            state: PlayerState::WaitingToStart { remaining: delay },
            rng,
            voice: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn statement(&self) -> &Arc<Statement> {
        &self.statement
    }

    pub fn voice(&self) -> Option<&Voice> {
        self.voice.as_ref()
    }

    pub fn is_terminated(&self) -> bool {
        self.state == PlayerState::Terminated
    }

    /// Advance by `dt` seconds.
    ///
    /// Transient voices started during this step are pushed to `detached`,
    /// already advanced to the end of the step.
    pub fn advance(
        &mut self,
        dt: f64,
        backend: &mut dyn AudioBackend,
        fallback_clip_seconds: f64,
        detached: &mut Vec<Voice>,
    ) {
        let mut budget = dt.max(0.0);
        let mut fresh = Vec::new();

        loop {
            match self.state {
                PlayerState::Terminated => {
                    // Voices started earlier in this step still need the rest of it.
                    self.advance_voices(budget, backend, &mut fresh);
                    break;
                }
                PlayerState::Playing | PlayerState::FadingOut => {
                    self.advance_voices(budget, backend, &mut fresh);
                    self.follow_voice();
                    break;
                }
                PlayerState::WaitingToStart { remaining }
                | PlayerState::WaitingForNextCycle { remaining } => {
                    if budget + EPSILON < remaining {
                        self.advance_voices(budget, backend, &mut fresh);
                        self.state = match self.state {
                            PlayerState::WaitingToStart { .. } => PlayerState::WaitingToStart {
                                remaining: remaining - budget,
                            },
                            _ => PlayerState::WaitingForNextCycle {
                                remaining: remaining - budget,
                            },
                        };
                        break;
                    }
                    let step = remaining.clamp(0.0, budget);
                    self.advance_voices(step, backend, &mut fresh);
                    budget = (budget - step).max(0.0);
                    self.fire(backend, fallback_clip_seconds, &mut fresh);
                }
            }
        }

        detached.extend(fresh);
    }

    /// Stop and release everything this instance holds.
    pub fn cancel(&mut self, backend: &mut dyn AudioBackend) {
        if let Some(voice) = &mut self.voice {
            voice.kill(backend);
        }
        self.voice = None;
        self.state = PlayerState::Terminated;
    }

    fn advance_voices(&mut self, dt: f64, backend: &mut dyn AudioBackend, fresh: &mut [Voice]) {
        if let Some(voice) = &mut self.voice {
            voice.advance(dt, backend);
        }
        for voice in fresh.iter_mut() {
            voice.advance(dt, backend);
        }
    }

    /// Mirror the loop voice's fade and release in the player state.
    fn follow_voice(&mut self) {
        let Some(voice) = &self.voice else {
            return;
        };
        match voice.state() {
            VoiceState::FadingOut => self.state = PlayerState::FadingOut,
            VoiceState::Released => {
                debug!(instance = self.id, "instance finished");
                self.voice = None;
                self.state = PlayerState::Terminated;
            }
            VoiceState::Playing | VoiceState::Stopped => {}
        }
    }

    fn fire(
        &mut self,
        backend: &mut dyn AudioBackend,
        fallback_clip_seconds: f64,
        fresh: &mut Vec<Voice>,
    ) {
        let first = matches!(self.state, PlayerState::WaitingToStart { .. });
        let stmt = Arc::clone(&self.statement);

        match stmt.kind {
            StatementKind::Loop => self.start_loop(backend),
            StatementKind::Oneshot if !stmt.every.is_set() => {
                if let Some(voice) = self.spawn_transient(backend, fallback_clip_seconds) {
                    fresh.push(voice);
                }
                self.terminate();
            }
            StatementKind::Oneshot if stmt.overlap => {
                match self.spawn_transient(backend, fallback_clip_seconds) {
                    Some(voice) => {
                        fresh.push(voice);
                        self.wait_for_next_cycle();
                    }
                    None => self.terminate(),
                }
            }
            StatementKind::Oneshot if first => {
                match self.start_voice(backend, false) {
                    Some(mut voice) => {
                        self.schedule_cycle_fade(&mut voice, backend, fallback_clip_seconds);
                        self.voice = Some(voice);
                        self.wait_for_next_cycle();
                    }
                    None => self.terminate(),
                }
            }
            StatementKind::Oneshot => self.restart_held(backend, fallback_clip_seconds),
        }
    }

    fn start_loop(&mut self, backend: &mut dyn AudioBackend) {
        let Some(mut voice) = self.start_voice(backend, true) else {
            self.terminate();
            return;
        };
        if self.statement.duration.is_set() {
            let duration = self.statement.duration.sample(&mut self.rng).max(0.0);
            let fade_out = self
                .statement
                .fade_out
                .sample_or(&mut self.rng, 0.0)
                .clamp(0.0, duration);
            voice.schedule_fade_out(duration - fade_out, fade_out, true);
        }
        self.voice = Some(voice);
        self.state = PlayerState::Playing;
    }

    /// A handle that plays its clip once, fades, and releases itself.
    fn spawn_transient(
        &mut self,
        backend: &mut dyn AudioBackend,
        fallback_clip_seconds: f64,
    ) -> Option<Voice> {
        let mut voice = self.start_voice(backend, false)?;
        let length = backend
            .clip_length(voice.handle())
            .unwrap_or(fallback_clip_seconds);
        let pitch = voice.pitch();
        let lifetime = if pitch > 0.0 { length / pitch } else { length };
        let fade_out = self
            .statement
            .fade_out
            .sample_or(&mut self.rng, 0.0)
            .clamp(0.0, lifetime);
        voice.schedule_fade_out(lifetime - fade_out, fade_out, true);
        Some(voice)
    }

    fn restart_held(&mut self, backend: &mut dyn AudioBackend, fallback_clip_seconds: f64) {
        let Some(mut voice) = self.voice.take() else {
            self.terminate();
            return;
        };

        let clip = resolve_clip(&self.statement.clip, &mut self.rng);
        let base_pitch = if voice.has_pitch_interpolation() {
            None
        } else {
            Some(self.statement.pitch.sample_or(&mut self.rng, 1.0))
        };
        let base_volume = self.statement.volume.sample_or(&mut self.rng, 1.0);
        let fade_in = self.statement.fade_in.sample_or(&mut self.rng, 0.0).max(0.0);

        if let Err(err) = voice.restart(backend, clip, base_volume, base_pitch, fade_in) {
            warn!(instance = self.id, error = %err, "cannot restart clip, instance stopped");
            voice.kill(backend);
            self.terminate();
            return;
        }
        self.schedule_cycle_fade(&mut voice, backend, fallback_clip_seconds);
        self.voice = Some(voice);
        self.wait_for_next_cycle();
    }

    /// Held handles fade out `fade_out` seconds before the clip ends.
    fn schedule_cycle_fade(
        &mut self,
        voice: &mut Voice,
        backend: &dyn AudioBackend,
        fallback_clip_seconds: f64,
    ) {
        let fade_out = self.statement.fade_out.sample_or(&mut self.rng, 0.0);
        if fade_out <= 0.0 {
            return;
        }
        let length = backend
            .clip_length(voice.handle())
            .unwrap_or(fallback_clip_seconds);
        let fade_out = fade_out.min(length);
        voice.schedule_fade_out(length - fade_out, fade_out, false);
    }

    /// Acquire a handle for a freshly resolved clip and start it.
    fn start_voice(&mut self, backend: &mut dyn AudioBackend, looped: bool) -> Option<Voice> {
        let stmt = Arc::clone(&self.statement);
        let clip = resolve_clip(&stmt.clip, &mut self.rng);
        let handle = match backend.acquire(&clip) {
            Ok(handle) => handle,
            Err(err) => {
                warn!(instance = self.id, error = %err, "clip unavailable, instance stopped");
                return None;
            }
        };

        let spatial = SpatialDescriptor::sample(&stmt.movement, &stmt.visuals, &mut self.rng);
        backend.place(handle, &spatial);

        let params = self.sample_params();
        let fade_in = stmt.fade_in.sample_or(&mut self.rng, 0.0).max(0.0);
        let voice_rng = ChaCha8Rng::seed_from_u64(self.rng.gen());
        Some(Voice::start(
            backend, handle, clip, params, fade_in, looped, voice_rng,
        ))
    }

    /// Base values plus a private playhead for each attached interpolation.
    fn sample_params(&mut self) -> InterpolationManager {
        let stmt = Arc::clone(&self.statement);
        let base_volume = stmt.volume.sample_or(&mut self.rng, 1.0);
        let base_pitch = stmt.pitch.sample_or(&mut self.rng, 1.0);
        let volume = stmt
            .volume_interpolation
            .clone()
            .map(|spec| InterpolationData::new(spec, &mut self.rng));
        let pitch = stmt
            .pitch_interpolation
            .clone()
            .map(|spec| InterpolationData::new(spec, &mut self.rng));
        InterpolationManager::new(base_volume, base_pitch)
            .with_volume(volume)
            .with_pitch(pitch)
    }

    fn wait_for_next_cycle(&mut self) {
        let remaining = self
            .statement
            .every
            .sample(&mut self.rng)
            .max(MIN_CYCLE_SECONDS);
        self.state = PlayerState::WaitingForNextCycle { remaining };
    }

    fn terminate(&mut self) {
        if self.state != PlayerState::Terminated {
            debug!(instance = self.id, "instance finished");
        }
        self.state = PlayerState::Terminated;
    }
}
