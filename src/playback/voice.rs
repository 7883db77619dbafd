//! One acquired handle and everything that shapes its sound over time.
//!
//! A voice owns its parameter source ([`InterpolationManager`]), a gain
//! ramp for fades, and an optional scheduled fade-out. After the fade-out
//! the handle is stopped and, for transient and loop voices, released.
//! Nothing is written to a handle once it has been released.

use rand_chacha::ChaCha8Rng;
use tracing::debug;

use super::backend::{AudioBackend, BackendError, HandleId};
use super::fade::Gain;
use super::EPSILON;
use crate::interp::InterpolationManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Playing,
    FadingOut,
    /// Stopped but still held for the next cycle.
    Stopped,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingFade {
    delay: f64,
    length: f64,
    release: bool,
}

#[derive(Debug)]
pub struct Voice {
    handle: HandleId,
    clip: String,
    params: InterpolationManager,
    gain: Gain,
    rng: ChaCha8Rng,
    pending: Option<PendingFade>,
    release_when_silent: bool,
    state: VoiceState,
    volume: f64,
    pitch: f64,
}

impl Voice {
    /// Write the opening volume and pitch, then start playback.
    ///
    /// A `goto` volume starts at its own first value. Otherwise the voice
    /// fades in over `fade_in`, or starts at full level when there is none.
    pub fn start(
        backend: &mut dyn AudioBackend,
        handle: HandleId,
        clip: String,
        params: InterpolationManager,
        fade_in: f64,
        looped: bool,
        rng: ChaCha8Rng,
    ) -> Self {
        let gain = opening_gain(&params, fade_in);
        let mut voice = Self {
            handle,
            clip,
            params,
            gain,
            rng,
            pending: None,
            release_when_silent: false,
            state: VoiceState::Playing,
            volume: 0.0,
            pitch: 1.0,
        };
        voice.step(0.0, backend);
        backend.play(handle, looped);
        debug!(handle = %handle, clip = %voice.clip, looped, "voice started");
        voice
    }

    /// Begin a fade to silence after `delay` seconds, lasting `length`.
    pub fn schedule_fade_out(&mut self, delay: f64, length: f64, release: bool) {
        self.pending = Some(PendingFade {
            delay: delay.max(0.0),
            length: length.max(0.0),
            release,
        });
    }

    /// Restart a held handle with a new clip and fresh base values.
    ///
    /// A `goto` volume starts over at a fresh first value; any other running
    /// interpolation keeps its playhead. `base_pitch` is `None` when a pitch
    /// interpolation owns the pitch.
    pub fn restart(
        &mut self,
        backend: &mut dyn AudioBackend,
        clip: String,
        base_volume: f64,
        base_pitch: Option<f64>,
        fade_in: f64,
    ) -> Result<(), BackendError> {
        if self.state == VoiceState::Released {
            return Err(BackendError::UnknownHandle(self.handle));
        }
        self.pending = None;
        if self.state != VoiceState::Stopped {
            backend.stop(self.handle);
        }
        backend.load_clip(self.handle, &clip)?;
        self.clip = clip;

        self.params.set_base_volume(base_volume);
        if let Some(pitch) = base_pitch {
            self.params.set_base_pitch(pitch);
        }
        self.params.rewind_goto_volume(&mut self.rng);
        self.gain = opening_gain(&self.params, fade_in);
        self.state = VoiceState::Playing;
        self.step(0.0, backend);
        backend.play(self.handle, false);
        debug!(handle = %self.handle, clip = %self.clip, "voice restarted");
        Ok(())
    }

    pub fn advance(&mut self, dt: f64, backend: &mut dyn AudioBackend) {
        if self.state == VoiceState::Released {
            return;
        }
        let mut dt = dt.max(0.0);

        if let Some(pending) = self.pending {
            if dt + EPSILON >= pending.delay {
                let before = pending.delay.min(dt);
                self.step(before, backend);
                dt = (dt - before).max(0.0);
                self.pending = None;
                self.begin_fade_out(pending.length, pending.release);
            } else {
                self.pending = Some(PendingFade {
                    delay: pending.delay - dt,
                    ..pending
                });
            }
        }

        self.step(dt, backend);
    }

    /// Stop and release immediately.
    pub fn kill(&mut self, backend: &mut dyn AudioBackend) {
        match self.state {
            VoiceState::Released => return,
            VoiceState::Playing | VoiceState::FadingOut => backend.stop(self.handle),
            VoiceState::Stopped => {}
        }
        backend.release(self.handle);
        self.pending = None;
        self.state = VoiceState::Released;
    }

    pub fn handle(&self) -> HandleId {
        self.handle
    }

    pub fn clip(&self) -> &str {
        &self.clip
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn is_released(&self) -> bool {
        self.state == VoiceState::Released
    }

    pub fn has_pitch_interpolation(&self) -> bool {
        self.params.has_pitch_interpolation()
    }

    /// Last volume written to the handle.
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Last pitch written to the handle.
    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    fn begin_fade_out(&mut self, length: f64, release: bool) {
        if self.state != VoiceState::Playing {
            return;
        }
        debug!(handle = %self.handle, length, "fading out");
        self.gain.fade_to(0.0, length);
        self.release_when_silent = release;
        self.state = VoiceState::FadingOut;
    }

    fn step(&mut self, dt: f64, backend: &mut dyn AudioBackend) {
        let level = self.gain.advance(dt);
        let volume = self.params.volume(dt, &mut self.rng) * level;
        let pitch = self.params.pitch(dt, &mut self.rng);

        if matches!(self.state, VoiceState::Playing | VoiceState::FadingOut) {
            self.volume = volume;
            self.pitch = pitch;
            backend.set_volume(self.handle, volume);
            backend.set_pitch(self.handle, pitch);
        }

        if self.state == VoiceState::FadingOut && self.gain.is_settled() {
            backend.stop(self.handle);
            if self.release_when_silent {
                backend.release(self.handle);
                self.state = VoiceState::Released;
                debug!(handle = %self.handle, "voice released");
            } else {
                self.state = VoiceState::Stopped;
            }
        }
    }
}

fn opening_gain(params: &InterpolationManager, fade_in: f64) -> Gain {
    if params.goto_volume_start().is_some() || fade_in <= EPSILON {
        Gain::unity()
    } else {
        Gain::fade_in(fade_in)
    }
}
