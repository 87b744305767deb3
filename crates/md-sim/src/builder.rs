//! Fluent builder for constructing a [`Sim`].

use md_action::Vocabulary;
use md_core::SimConfig;
use md_road::{PresetRoad, RoadError};
use md_safety::SafetyKind;

use crate::{Sim, SimResult};

/// Fluent builder for [`Sim`].
///
/// # Required inputs
///
/// - [`SimConfig`]: tuning tables, vocabulary, safety predicates, seed, ...
///
/// # Optional inputs (have defaults)
///
/// | Method          | Default                               |
/// |-----------------|---------------------------------------|
/// | `.preset(p)`    | Every run generates its own road      |
///
/// # Example
///
/// ```rust,ignore
/// let mut sim = SimBuilder::new(SimConfig::baseline())
///     .preset(PresetRoad::default().with_segments(segments))
///     .build()?;
/// sim.reset(42)?;
/// ```
pub struct SimBuilder {
    config: SimConfig,
    preset: Option<PresetRoad>,
}

impl SimBuilder {
    pub fn new(config: SimConfig) -> Self {
        Self { config, preset: None }
    }

    /// Replay recorded road parts instead of generating them.
    ///
    /// With route samples the car follows the recorded positions and the
    /// run ends when the samples run out.
    pub fn preset(mut self, preset: PresetRoad) -> Self {
        self.preset = Some(preset);
        self
    }

    /// Validate the configuration, resolve the vocabulary and safety
    /// predicates, and return a [`Sim`] waiting for its first `reset`.
    pub fn build(self) -> SimResult<Sim> {
        self.config.validate()?;
        let vocabulary = Vocabulary::new(&self.config.available_actions)?;
        let kinds = SafetyKind::parse_list(&self.config.safety_events)?;

        if let Some(route) = self.preset.as_ref().and_then(|p| p.route.as_ref()) {
            if route.is_empty() {
                return Err(RoadError::Parse("preset route has no samples".into()).into());
            }
            if route.windows(2).any(|w| w[1].timestamp < w[0].timestamp) {
                return Err(RoadError::Parse("route timestamps must not decrease".into()).into());
            }
        }

        Ok(Sim::from_parts(self.config, self.preset, vocabulary, kinds))
    }
}
