//! Playback session: the context object tying script, RNG, and scheduler
//! together.
//!
//! A [`Session`] owns everything that lives for one run: configuration, the
//! seeded random source, the current script and its diagnostics, and the
//! [`Scheduler`]. Nothing is global; two sessions never share state.

pub mod config;

pub use config::{config_path, load_config, load_config_from, ConfigError, SessionConfig};

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

use crate::dsl::{Compiler, Diagnostic, Statement};
use crate::playback::{AudioBackend, Scheduler};

pub struct Session {
    config: SessionConfig,
    seed: u64,
    rng: ChaCha8Rng,
    source: String,
    diagnostics: Vec<Diagnostic>,
    statements: Vec<Arc<Statement>>,
    scheduler: Scheduler,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let scheduler =
            Scheduler::new(rng.gen()).with_fallback_clip_seconds(config.default_clip_seconds);
        info!(seed, "session started");
        Self {
            config,
            seed,
            rng,
            source: String::new(),
            diagnostics: Vec::new(),
            statements: Vec::new(),
            scheduler,
        }
    }

    /// Replace the script and spawn its statements. Returns instances spawned.
    ///
    /// Instances from an earlier script keep running.
    pub fn load(&mut self, source: &str) -> usize {
        self.source = source.to_string();
        let spawned = self.compile_and_spawn();
        info!(
            statements = self.statements.len(),
            instances = spawned,
            diagnostics = self.diagnostics.len(),
            "script loaded"
        );
        spawned
    }

    /// Parse `source`, usually an edited version of the current script, and
    /// spawn fresh instances next to the running ones.
    pub fn soft_reset(&mut self, source: &str) -> usize {
        self.source = source.to_string();
        let spawned = self.compile_and_spawn();
        info!(instances = spawned, "soft reset");
        spawned
    }

    /// Cancel every instance and release every handle.
    pub fn hard_reset(&mut self, backend: &mut dyn AudioBackend) {
        self.scheduler.hard_reset(backend);
    }

    pub fn tick(&mut self, dt: f64, backend: &mut dyn AudioBackend) {
        self.scheduler.tick(dt, backend);
    }

    /// Tick at the configured step until `seconds` have passed.
    pub fn run_for(&mut self, seconds: f64, backend: &mut dyn AudioBackend) {
        let step = self.config.tick_seconds;
        let mut remaining = seconds;
        while remaining > 1e-9 {
            let dt = step.min(remaining);
            self.tick(dt, backend);
            remaining -= dt;
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The seed actually in use, drawn from entropy if none was configured.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Diagnostics from the most recent parse.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Statements from the most recent parse.
    pub fn statements(&self) -> &[Arc<Statement>] {
        &self.statements
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    fn compile_and_spawn(&mut self) -> usize {
        let output = Compiler::compile(&self.source, self.config.parse_options(), &mut self.rng);
        for diag in &output.diagnostics {
            warn!(line = diag.line, col = diag.col, "{}", diag.message);
        }
        self.diagnostics = output.diagnostics;
        self.statements = output.statements;
        self.scheduler.spawn(&self.statements)
    }
}
