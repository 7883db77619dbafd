//! Backend over a directory of WAV clips.
//!
//! Clips resolve to `<root>/<clip>.wav`. The backend reads each file's
//! header with `hound` to learn its length, keeps per-handle state, and
//! logs what a real output device would be asked to do.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, trace};

use super::backend::{AudioBackend, BackendError, HandleId, SpatialDescriptor};

#[derive(Debug, Clone)]
struct WavHandle {
    clip: String,
    length: f64,
    volume: f64,
    pitch: f64,
    playing: bool,
}

pub struct WavBackend {
    root: PathBuf,
    handles: HashMap<HandleId, WavHandle>,
    lengths: HashMap<String, f64>,
    next_handle: u64,
}

impl WavBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            handles: HashMap::new(),
            lengths: HashMap::new(),
            next_handle: 0,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn clip_path(&self, clip: &str) -> PathBuf {
        if clip.to_ascii_lowercase().ends_with(".wav") {
            self.root.join(clip)
        } else {
            self.root.join(format!("{clip}.wav"))
        }
    }

    pub fn live_handles(&self) -> usize {
        self.handles.len()
    }

    /// Length of `clip` in seconds, read from its WAV header once.
    pub fn probe(&mut self, clip: &str) -> Result<f64, BackendError> {
        if let Some(&length) = self.lengths.get(clip) {
            return Ok(length);
        }
        let path = self.clip_path(clip);
        if !path.is_file() {
            return Err(BackendError::ClipNotFound {
                clip: clip.to_string(),
                path,
            });
        }
        let reader = hound::WavReader::open(&path).map_err(|source| BackendError::Decode {
            clip: clip.to_string(),
            source,
        })?;
        let spec = reader.spec();
        let length = if spec.sample_rate == 0 {
            0.0
        } else {
            reader.duration() as f64 / spec.sample_rate as f64
        };
        debug!(clip, length, "probed clip");
        self.lengths.insert(clip.to_string(), length);
        Ok(length)
    }
}

impl AudioBackend for WavBackend {
    fn acquire(&mut self, clip: &str) -> Result<HandleId, BackendError> {
        let length = self.probe(clip)?;
        self.next_handle += 1;
        let handle = HandleId(self.next_handle);
        self.handles.insert(
            handle,
            WavHandle {
                clip: clip.to_string(),
                length,
                volume: 0.0,
                pitch: 1.0,
                playing: false,
            },
        );
        debug!(handle = %handle, clip, "acquired");
        Ok(handle)
    }

    fn load_clip(&mut self, handle: HandleId, clip: &str) -> Result<(), BackendError> {
        let length = self.probe(clip)?;
        let state = self
            .handles
            .get_mut(&handle)
            .ok_or(BackendError::UnknownHandle(handle))?;
        state.clip = clip.to_string();
        state.length = length;
        state.playing = false;
        debug!(handle = %handle, clip, "loaded");
        Ok(())
    }

    fn set_volume(&mut self, handle: HandleId, volume: f64) {
        if let Some(state) = self.handles.get_mut(&handle) {
            state.volume = volume;
            trace!(handle = %handle, volume, "volume");
        }
    }

    fn set_pitch(&mut self, handle: HandleId, pitch: f64) {
        if let Some(state) = self.handles.get_mut(&handle) {
            state.pitch = pitch;
            trace!(handle = %handle, pitch, "pitch");
        }
    }

    fn play(&mut self, handle: HandleId, looped: bool) {
        if let Some(state) = self.handles.get_mut(&handle) {
            state.playing = true;
            info!(
                handle = %handle,
                clip = %state.clip,
                volume = state.volume,
                pitch = state.pitch,
                looped,
                "play"
            );
        }
    }

    fn stop(&mut self, handle: HandleId) {
        if let Some(state) = self.handles.get_mut(&handle) {
            if state.playing {
                state.playing = false;
                info!(handle = %handle, clip = %state.clip, "stop");
            }
        }
    }

    fn release(&mut self, handle: HandleId) {
        if let Some(state) = self.handles.remove(&handle) {
            debug!(handle = %handle, clip = %state.clip, "released");
        }
    }

    fn clip_length(&self, handle: HandleId) -> Option<f64> {
        self.handles.get(&handle).map(|h| h.length)
    }

    fn place(&mut self, handle: HandleId, spatial: &SpatialDescriptor) {
        if self.handles.contains_key(&handle) {
            debug!(
                handle = %handle,
                mode = ?spatial.mode,
                min = ?spatial.min,
                max = ?spatial.max,
                frequency = spatial.frequency,
                visuals = spatial.visuals.len(),
                "placed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn write_wav(path: &Path, sample_rate: u32, frames: u32, channels: u16) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..frames * channels as u32 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn reads_clip_length_from_header() {
        let dir = tempfile::tempdir().unwrap();
        write_wav(&dir.path().join("birds/1.wav"), 8000, 12000, 2);

        let mut backend = WavBackend::new(dir.path());
        let h = backend.acquire("birds/1").unwrap();
        assert_approx_eq!(backend.clip_length(h).unwrap(), 1.5, 1e-12);
        assert_eq!(backend.live_handles(), 1);

        backend.release(h);
        assert_eq!(backend.live_handles(), 0);
        assert_eq!(backend.clip_length(h), None);
    }

    #[test]
    fn explicit_extension_is_kept() {
        let backend = WavBackend::new("/clips");
        assert_eq!(backend.clip_path("a/b.wav"), PathBuf::from("/clips/a/b.wav"));
        assert_eq!(backend.clip_path("a/b"), PathBuf::from("/clips/a/b.wav"));
    }

    #[test]
    fn missing_clip_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = WavBackend::new(dir.path());
        assert!(matches!(
            backend.acquire("nope"),
            Err(BackendError::ClipNotFound { .. })
        ));
    }

    #[test]
    fn garbage_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.wav"), b"not a wav file").unwrap();
        let mut backend = WavBackend::new(dir.path());
        assert!(matches!(
            backend.acquire("bad"),
            Err(BackendError::Decode { .. })
        ));
    }

    #[test]
    fn load_clip_updates_length() {
        let dir = tempfile::tempdir().unwrap();
        write_wav(&dir.path().join("a.wav"), 1000, 1000, 1);
        write_wav(&dir.path().join("b.wav"), 1000, 3000, 1);
        let mut backend = WavBackend::new(dir.path());
        let h = backend.acquire("a").unwrap();
        backend.load_clip(h, "b").unwrap();
        assert_approx_eq!(backend.clip_length(h).unwrap(), 3.0, 1e-12);
        assert!(backend.load_clip(HandleId(99), "a").is_err());
    }
}
