//! Statement compiler: flattens a parsed [`Script`] into [`Statement`]s.
//!
//! Groups disappear here. Each child of a group becomes a standalone
//! statement carrying the group's defaults:
//!
//! - volume/pitch: a group interpolation is attached (by reference) to every
//!   child without one; a plain group value is sampled once per child and
//!   multiplies the child's own value, or replaces it when the child has none.
//! - timing and overlap: the child's value wins, else the group's applies.

use std::sync::Arc;

use rand::Rng;
use serde::Serialize;
use tracing::debug;

use super::ast::*;
use crate::interp::Interpolation;
use crate::value::RangeOrValue;

/// One executable unit, fully resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    pub kind: StatementKind,
    /// Clip reference; may still contain alternations or numeric ranges.
    pub clip: String,
    pub count: u32,
    pub starts_at: RangeOrValue,
    pub duration: RangeOrValue,
    pub every: RangeOrValue,
    pub volume: RangeOrValue,
    pub pitch: RangeOrValue,
    pub fade_in: RangeOrValue,
    pub fade_out: RangeOrValue,
    pub overlap: bool,
    pub movement: Movement,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub visuals: Vec<Visual>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_interpolation: Option<Arc<Interpolation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch_interpolation: Option<Arc<Interpolation>>,
    /// Source line of the statement header.
    pub line: usize,
}

/// Flatten a script into statements, in source order.
///
/// `rng` supplies the per-child draws of plain group values.
pub fn compile_script<R: Rng + ?Sized>(script: &Script, rng: &mut R) -> Vec<Arc<Statement>> {
    let mut statements = Vec::new();

    for item in &script.items {
        match item {
            Item::Statement(def) => {
                statements.push(Arc::new(compile_statement(def, None, rng)));
            }
            Item::Group(group) => {
                debug!(
                    group = %group.name,
                    children = group.children.len(),
                    "flattening group"
                );
                for child in &group.children {
                    statements.push(Arc::new(compile_statement(child, Some(&group.props), rng)));
                }
            }
        }
    }

    statements
}

fn compile_statement<R: Rng + ?Sized>(
    def: &StatementDef,
    group: Option<&PropertyBlock>,
    rng: &mut R,
) -> Statement {
    let props = &def.props;
    let inherited = |child: Option<RangeOrValue>, pick: fn(&PropertyBlock) -> Option<RangeOrValue>| {
        child
            .unwrap_or_default()
            .or(group.and_then(pick).unwrap_or_default())
    };

    let (volume, volume_interpolation) = combine_axis(
        props.volume.as_ref(),
        group.and_then(|g| g.volume.as_ref()),
        rng,
    );
    let (pitch, pitch_interpolation) = combine_axis(
        props.pitch.as_ref(),
        group.and_then(|g| g.pitch.as_ref()),
        rng,
    );

    Statement {
        kind: def.kind,
        clip: def.clip.clone(),
        count: def.count,
        starts_at: inherited(props.starts_at, |g| g.starts_at),
        duration: inherited(props.duration, |g| g.duration),
        every: inherited(props.every, |g| g.every),
        volume,
        pitch,
        fade_in: inherited(props.fade_in, |g| g.fade_in),
        fade_out: inherited(props.fade_out, |g| g.fade_out),
        overlap: props
            .overlap
            .or_else(|| group.and_then(|g| g.overlap))
            .unwrap_or(false),
        movement: props.movement.clone().unwrap_or_default(),
        visuals: props.visuals.clone(),
        volume_interpolation,
        pitch_interpolation,
        line: def.line,
    }
}

/// Merge a child's volume or pitch with its group's.
fn combine_axis<R: Rng + ?Sized>(
    child: Option<&AxisDef>,
    group: Option<&AxisDef>,
    rng: &mut R,
) -> (RangeOrValue, Option<Arc<Interpolation>>) {
    match (child, group) {
        (Some(AxisDef::Animated(interp)), _) => (RangeOrValue::Unset, Some(Arc::clone(interp))),
        (Some(AxisDef::Plain(value)), Some(AxisDef::Animated(interp))) => {
            (*value, Some(Arc::clone(interp)))
        }
        (None, Some(AxisDef::Animated(interp))) => (RangeOrValue::Unset, Some(Arc::clone(interp))),
        (Some(AxisDef::Plain(value)), Some(AxisDef::Plain(factor))) if factor.is_set() => {
            (value.scaled_by(factor.sample(rng)), None)
        }
        (None, Some(AxisDef::Plain(factor))) if factor.is_set() => {
            (RangeOrValue::Fixed(factor.sample(rng)), None)
        }
        (Some(AxisDef::Plain(value)), _) => (*value, None),
        (None, _) => (RangeOrValue::Unset, None),
    }
}
