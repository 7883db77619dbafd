//! Satie: a small language for generative soundscapes and the engine that
//! plays it.
//!
//! Scripts are compiled by [`dsl::Compiler`] into flat statements, which a
//! [`session::Session`] spawns as timed instances on a
//! [`playback::Scheduler`] driving any [`playback::AudioBackend`].

pub mod dsl;
pub mod ease;
pub mod interp;
pub mod playback;
pub mod session;
pub mod value;
