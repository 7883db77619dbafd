//! In-memory backend that records every call.
//!
//! Used by the test suite and by `satie run --dry-run`. Calls made on a
//! handle that is not live are counted as stale writes instead of recorded.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

use serde::Serialize;

use super::backend::{AudioBackend, BackendError, HandleId, SpatialDescriptor};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum BackendCall {
    Acquire { handle: HandleId, clip: String },
    LoadClip { handle: HandleId, clip: String },
    SetVolume { handle: HandleId, volume: f64 },
    SetPitch { handle: HandleId, pitch: f64 },
    Play { handle: HandleId, looped: bool },
    Stop { handle: HandleId },
    Release { handle: HandleId },
    Place { handle: HandleId, spatial: SpatialDescriptor },
}

impl BackendCall {
    pub fn handle(&self) -> HandleId {
        match self {
            BackendCall::Acquire { handle, .. }
            | BackendCall::LoadClip { handle, .. }
            | BackendCall::SetVolume { handle, .. }
            | BackendCall::SetPitch { handle, .. }
            | BackendCall::Play { handle, .. }
            | BackendCall::Stop { handle }
            | BackendCall::Release { handle }
            | BackendCall::Place { handle, .. } => *handle,
        }
    }

    /// Everything except the per-tick volume and pitch updates.
    pub fn is_lifecycle(&self) -> bool {
        !matches!(
            self,
            BackendCall::SetVolume { .. } | BackendCall::SetPitch { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
struct HandleState {
    clip: String,
    volume: Option<f64>,
    pitch: Option<f64>,
    playing: bool,
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Vec<BackendCall>,
    next_handle: u64,
    live: BTreeMap<HandleId, HandleState>,
    default_length: f64,
    lengths: HashMap<String, f64>,
    missing: HashSet<String>,
    stale_writes: usize,
}

impl RecordingBackend {
    /// Every clip reports `default_length` seconds unless overridden.
    pub fn new(default_length: f64) -> Self {
        Self {
            default_length,
            ..Self::default()
        }
    }

    pub fn with_clip_length(mut self, clip: impl Into<String>, seconds: f64) -> Self {
        self.lengths.insert(clip.into(), seconds);
        self
    }

    /// Make `clip` fail to acquire or load.
    pub fn with_missing(mut self, clip: impl Into<String>) -> Self {
        self.missing.insert(clip.into());
        self
    }

    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    pub fn lifecycle(&self) -> Vec<&BackendCall> {
        self.calls.iter().filter(|c| c.is_lifecycle()).collect()
    }

    pub fn take_calls(&mut self) -> Vec<BackendCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn live_handles(&self) -> Vec<HandleId> {
        self.live.keys().copied().collect()
    }

    pub fn clip(&self, handle: HandleId) -> Option<&str> {
        self.live.get(&handle).map(|h| h.clip.as_str())
    }

    pub fn volume(&self, handle: HandleId) -> Option<f64> {
        self.live.get(&handle).and_then(|h| h.volume)
    }

    pub fn pitch(&self, handle: HandleId) -> Option<f64> {
        self.live.get(&handle).and_then(|h| h.pitch)
    }

    pub fn is_playing(&self, handle: HandleId) -> bool {
        self.live.get(&handle).is_some_and(|h| h.playing)
    }

    /// Calls that targeted a handle which was never acquired or already released.
    pub fn stale_writes(&self) -> usize {
        self.stale_writes
    }

    fn check_clip(&self, clip: &str) -> Result<(), BackendError> {
        if self.missing.contains(clip) {
            return Err(BackendError::ClipNotFound {
                clip: clip.to_string(),
                path: PathBuf::from(clip),
            });
        }
        Ok(())
    }

    fn live_mut(&mut self, handle: HandleId) -> Option<&mut HandleState> {
        let state = self.live.get_mut(&handle);
        if state.is_none() {
            self.stale_writes += 1;
        }
        state
    }
}

impl AudioBackend for RecordingBackend {
    fn acquire(&mut self, clip: &str) -> Result<HandleId, BackendError> {
        self.check_clip(clip)?;
        self.next_handle += 1;
        let handle = HandleId(self.next_handle);
        self.live.insert(
            handle,
            HandleState {
                clip: clip.to_string(),
                volume: None,
                pitch: None,
                playing: false,
            },
        );
        self.calls.push(BackendCall::Acquire {
            handle,
            clip: clip.to_string(),
        });
        Ok(handle)
    }

    fn load_clip(&mut self, handle: HandleId, clip: &str) -> Result<(), BackendError> {
        self.check_clip(clip)?;
        let state = self
            .live_mut(handle)
            .ok_or(BackendError::UnknownHandle(handle))?;
        state.clip = clip.to_string();
        state.playing = false;
        self.calls.push(BackendCall::LoadClip {
            handle,
            clip: clip.to_string(),
        });
        Ok(())
    }

    fn set_volume(&mut self, handle: HandleId, volume: f64) {
        if let Some(state) = self.live_mut(handle) {
            state.volume = Some(volume);
            self.calls.push(BackendCall::SetVolume { handle, volume });
        }
    }

    fn set_pitch(&mut self, handle: HandleId, pitch: f64) {
        if let Some(state) = self.live_mut(handle) {
            state.pitch = Some(pitch);
            self.calls.push(BackendCall::SetPitch { handle, pitch });
        }
    }

    fn play(&mut self, handle: HandleId, looped: bool) {
        if let Some(state) = self.live_mut(handle) {
            state.playing = true;
            self.calls.push(BackendCall::Play { handle, looped });
        }
    }

    fn stop(&mut self, handle: HandleId) {
        if let Some(state) = self.live_mut(handle) {
            state.playing = false;
            self.calls.push(BackendCall::Stop { handle });
        }
    }

    fn release(&mut self, handle: HandleId) {
        if self.live.remove(&handle).is_some() {
            self.calls.push(BackendCall::Release { handle });
        } else {
            self.stale_writes += 1;
        }
    }

    fn clip_length(&self, handle: HandleId) -> Option<f64> {
        let clip = &self.live.get(&handle)?.clip;
        Some(self.lengths.get(clip).copied().unwrap_or(self.default_length))
    }

    fn place(&mut self, handle: HandleId, spatial: &SpatialDescriptor) {
        if self.live_mut(handle).is_some() {
            self.calls.push(BackendCall::Place {
                handle,
                spatial: spatial.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_lifecycle_in_order() {
        let mut b = RecordingBackend::new(1.5);
        let h = b.acquire("rain").unwrap();
        b.set_volume(h, 0.5);
        b.play(h, true);
        b.stop(h);
        b.release(h);

        let lifecycle: Vec<_> = b.lifecycle().into_iter().cloned().collect();
        assert_eq!(
            lifecycle,
            vec![
                BackendCall::Acquire {
                    handle: h,
                    clip: "rain".into()
                },
                BackendCall::Play {
                    handle: h,
                    looped: true
                },
                BackendCall::Stop { handle: h },
                BackendCall::Release { handle: h },
            ]
        );
        assert_eq!(b.calls().len(), 5);
        assert!(b.live_handles().is_empty());
    }

    #[test]
    fn clip_lengths_and_missing_clips() {
        let mut b = RecordingBackend::new(2.0)
            .with_clip_length("long", 9.0)
            .with_missing("ghost");
        let short = b.acquire("short").unwrap();
        let long = b.acquire("long").unwrap();
        assert_eq!(b.clip_length(short), Some(2.0));
        assert_eq!(b.clip_length(long), Some(9.0));
        assert!(matches!(
            b.acquire("ghost"),
            Err(BackendError::ClipNotFound { .. })
        ));
        assert!(b.load_clip(short, "ghost").is_err());
        assert_eq!(b.clip(short), Some("short"));
    }

    #[test]
    fn writes_after_release_are_stale() {
        let mut b = RecordingBackend::new(1.0);
        let h = b.acquire("x").unwrap();
        b.release(h);
        b.set_volume(h, 1.0);
        b.release(h);
        assert_eq!(b.stale_writes(), 2);
        assert_eq!(b.calls().len(), 2);
    }
}
