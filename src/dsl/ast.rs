//! Abstract Syntax Tree for the script language.
//!
//! The parser produces a [`Script`] of top-level statements and groups.
//! Groups only exist here: [`super::compile`] flattens them away.

use std::sync::Arc;

use serde::Serialize;

use crate::interp::Interpolation;
use crate::value::RangeOrValue;

/// A complete parsed script, in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Statement(StatementDef),
    Group(GroupDef),
}

/// `loop` or `oneshot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    Loop,
    Oneshot,
}

impl StatementKind {
    pub fn name(self) -> &'static str {
        match self {
            StatementKind::Loop => "loop",
            StatementKind::Oneshot => "oneshot",
        }
    }
}

/// A statement header plus its property block.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementDef {
    pub kind: StatementKind,
    pub clip: String,
    pub count: u32,
    pub props: PropertyBlock,
    pub line: usize,
}

/// A named group: default properties and the statements nested under it.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupDef {
    pub name: String,
    pub line: usize,
    pub props: PropertyBlock,
    pub children: Vec<StatementDef>,
}

/// Volume or pitch as written: a plain value or an interpolation call.
#[derive(Debug, Clone, PartialEq)]
pub enum AxisDef {
    Plain(RangeOrValue),
    Animated(Arc<Interpolation>),
}

/// The `key = value` lines under a statement or group header.
///
/// `None` means the key was not written, which matters for group
/// inheritance: only unset child keys pick up the group default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyBlock {
    pub volume: Option<AxisDef>,
    pub pitch: Option<AxisDef>,
    pub starts_at: Option<RangeOrValue>,
    pub duration: Option<RangeOrValue>,
    pub fade_in: Option<RangeOrValue>,
    pub fade_out: Option<RangeOrValue>,
    pub every: Option<RangeOrValue>,
    pub overlap: Option<bool>,
    pub movement: Option<Movement>,
    pub visuals: Vec<Visual>,
}

/// How an instance moves through space.
///
/// Walk and fly describe a bounding box centred on the origin, with
/// `speed` as the wander frequency. Fixed places the instance at one point.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Movement {
    #[default]
    None,
    Walk {
        x: RangeOrValue,
        z: RangeOrValue,
        speed: RangeOrValue,
    },
    Fly {
        x: RangeOrValue,
        y: RangeOrValue,
        z: RangeOrValue,
        speed: RangeOrValue,
    },
    Fixed {
        x: RangeOrValue,
        y: RangeOrValue,
        z: RangeOrValue,
    },
}

/// A visual effect attached to an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visual {
    /// A named primitive such as `sphere` or `trail`.
    Tag(String),
    /// A resource path, written `object "path"`.
    Object(String),
}
