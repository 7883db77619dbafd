//! Easing functions: shape a normalized time `t` into progress.
//!
//! Standard Penner curves (quad through bounce, each with In/Out/InOut), a
//! full raised-cosine `Sine`, and four "return" shapes that go out and come
//! back within `t ∈ [0, 1]`.
//!
//! Input is never clamped: overshooting families (back, elastic) are
//! evaluated as-is and the caller decides what to do with the output.

use std::f64::consts::PI;

use serde::Serialize;

const BACK_C1: f64 = 1.70158;
const BACK_C2: f64 = BACK_C1 * 1.525;
const BACK_C3: f64 = BACK_C1 + 1.0;
const ELASTIC_C4: f64 = (2.0 * PI) / 3.0;
const ELASTIC_C5: f64 = (2.0 * PI) / 4.5;
const BOUNCE_N1: f64 = 7.5625;
const BOUNCE_D1: f64 = 2.75;

/// A named easing curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Ease {
    #[default]
    Linear,
    InQuad,
    OutQuad,
    InOutQuad,
    InCubic,
    OutCubic,
    InOutCubic,
    InQuart,
    OutQuart,
    InOutQuart,
    InQuint,
    OutQuint,
    InOutQuint,
    InSine,
    OutSine,
    InOutSine,
    InExpo,
    OutExpo,
    InOutExpo,
    InCirc,
    OutCirc,
    InOutCirc,
    InBack,
    OutBack,
    InOutBack,
    InElastic,
    OutElastic,
    InOutElastic,
    InBounce,
    OutBounce,
    InOutBounce,
    Sine,
    SineReturn,
    CosineReturn,
    ElasticReturn,
    BounceReturn,
}

impl Ease {
    pub const ALL: [Ease; 36] = [
        Ease::Linear,
        Ease::InQuad,
        Ease::OutQuad,
        Ease::InOutQuad,
        Ease::InCubic,
        Ease::OutCubic,
        Ease::InOutCubic,
        Ease::InQuart,
        Ease::OutQuart,
        Ease::InOutQuart,
        Ease::InQuint,
        Ease::OutQuint,
        Ease::InOutQuint,
        Ease::InSine,
        Ease::OutSine,
        Ease::InOutSine,
        Ease::InExpo,
        Ease::OutExpo,
        Ease::InOutExpo,
        Ease::InCirc,
        Ease::OutCirc,
        Ease::InOutCirc,
        Ease::InBack,
        Ease::OutBack,
        Ease::InOutBack,
        Ease::InElastic,
        Ease::OutElastic,
        Ease::InOutElastic,
        Ease::InBounce,
        Ease::OutBounce,
        Ease::InOutBounce,
        Ease::Sine,
        Ease::SineReturn,
        Ease::CosineReturn,
        Ease::ElasticReturn,
        Ease::BounceReturn,
    ];

    /// Look up a curve by name.
    ///
    /// Case-insensitive; `_`, `-`, spaces and a leading `ease` are ignored,
    /// so `easeInOutSine`, `in_out_sine` and `InOutSine` are the same curve.
    pub fn from_name(name: &str) -> Option<Ease> {
        let key = normalize_name(name);
        Self::ALL
            .into_iter()
            .find(|ease| normalize_name(ease.name()) == key)
    }

    /// Like [`from_name`](Self::from_name) but unknown names become [`Ease::Linear`].
    pub fn resolve(name: &str) -> Ease {
        Self::from_name(name).unwrap_or(Ease::Linear)
    }

    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Linear => "Linear",
            Self::InQuad => "InQuad",
            Self::OutQuad => "OutQuad",
            Self::InOutQuad => "InOutQuad",
            Self::InCubic => "InCubic",
            Self::OutCubic => "OutCubic",
            Self::InOutCubic => "InOutCubic",
            Self::InQuart => "InQuart",
            Self::OutQuart => "OutQuart",
            Self::InOutQuart => "InOutQuart",
            Self::InQuint => "InQuint",
            Self::OutQuint => "OutQuint",
            Self::InOutQuint => "InOutQuint",
            Self::InSine => "InSine",
            Self::OutSine => "OutSine",
            Self::InOutSine => "InOutSine",
            Self::InExpo => "InExpo",
            Self::OutExpo => "OutExpo",
            Self::InOutExpo => "InOutExpo",
            Self::InCirc => "InCirc",
            Self::OutCirc => "OutCirc",
            Self::InOutCirc => "InOutCirc",
            Self::InBack => "InBack",
            Self::OutBack => "OutBack",
            Self::InOutBack => "InOutBack",
            Self::InElastic => "InElastic",
            Self::OutElastic => "OutElastic",
            Self::InOutElastic => "InOutElastic",
            Self::InBounce => "InBounce",
            Self::OutBounce => "OutBounce",
            Self::InOutBounce => "InOutBounce",
            Self::Sine => "Sine",
            Self::SineReturn => "SineReturn",
            Self::CosineReturn => "CosineReturn",
            Self::ElasticReturn => "ElasticReturn",
            Self::BounceReturn => "BounceReturn",
        }
    }

    /// Whether the curve comes back to 0 at `t = 1` instead of ending at 1.
    pub fn is_return(self) -> bool {
        matches!(
            self,
            Self::Sine
                | Self::SineReturn
                | Self::CosineReturn
                | Self::ElasticReturn
                | Self::BounceReturn
        )
    }

    /// Evaluate the curve at `t`.
    pub fn apply(self, t: f64) -> f64 {
        match self {
            Self::Linear => t,
            Self::InQuad => t * t,
            Self::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Self::InOutQuad => in_out_pow(t, 2),
            Self::InCubic => t * t * t,
            Self::OutCubic => 1.0 - (1.0 - t).powi(3),
            Self::InOutCubic => in_out_pow(t, 3),
            Self::InQuart => t.powi(4),
            Self::OutQuart => 1.0 - (1.0 - t).powi(4),
            Self::InOutQuart => in_out_pow(t, 4),
            Self::InQuint => t.powi(5),
            Self::OutQuint => 1.0 - (1.0 - t).powi(5),
            Self::InOutQuint => in_out_pow(t, 5),
            Self::InSine => 1.0 - (t * PI / 2.0).cos(),
            Self::OutSine => (t * PI / 2.0).sin(),
            Self::InOutSine => -((PI * t).cos() - 1.0) / 2.0,
            Self::InExpo => {
                if t == 0.0 {
                    0.0
                } else {
                    2f64.powf(10.0 * t - 10.0)
                }
            }
            Self::OutExpo => out_expo(t),
            Self::InOutExpo => {
                if t == 0.0 {
                    0.0
                } else if t == 1.0 {
                    1.0
                } else if t < 0.5 {
                    2f64.powf(20.0 * t - 10.0) / 2.0
                } else {
                    (2.0 - 2f64.powf(-20.0 * t + 10.0)) / 2.0
                }
            }
            Self::InCirc => 1.0 - (1.0 - t * t).max(0.0).sqrt(),
            Self::OutCirc => (1.0 - (t - 1.0).powi(2)).max(0.0).sqrt(),
            Self::InOutCirc => {
                if t < 0.5 {
                    (1.0 - (1.0 - (2.0 * t).powi(2)).max(0.0).sqrt()) / 2.0
                } else {
                    ((1.0 - (-2.0 * t + 2.0).powi(2)).max(0.0).sqrt() + 1.0) / 2.0
                }
            }
            Self::InBack => BACK_C3 * t * t * t - BACK_C1 * t * t,
            Self::OutBack => 1.0 + BACK_C3 * (t - 1.0).powi(3) + BACK_C1 * (t - 1.0).powi(2),
            Self::InOutBack => {
                if t < 0.5 {
                    ((2.0 * t).powi(2) * ((BACK_C2 + 1.0) * 2.0 * t - BACK_C2)) / 2.0
                } else {
                    ((2.0 * t - 2.0).powi(2) * ((BACK_C2 + 1.0) * (t * 2.0 - 2.0) + BACK_C2)
                        + 2.0)
                        / 2.0
                }
            }
            Self::InElastic => {
                if t == 0.0 {
                    0.0
                } else if t == 1.0 {
                    1.0
                } else {
                    -(2f64.powf(10.0 * t - 10.0)) * ((t * 10.0 - 10.75) * ELASTIC_C4).sin()
                }
            }
            Self::OutElastic => out_elastic(t),
            Self::InOutElastic => {
                if t == 0.0 {
                    0.0
                } else if t == 1.0 {
                    1.0
                } else if t < 0.5 {
                    -(2f64.powf(20.0 * t - 10.0) * ((20.0 * t - 11.125) * ELASTIC_C5).sin()) / 2.0
                } else {
                    (2f64.powf(-20.0 * t + 10.0) * ((20.0 * t - 11.125) * ELASTIC_C5).sin()) / 2.0
                        + 1.0
                }
            }
            Self::InBounce => 1.0 - out_bounce(1.0 - t),
            Self::OutBounce => out_bounce(t),
            Self::InOutBounce => {
                if t < 0.5 {
                    (1.0 - out_bounce(1.0 - 2.0 * t)) / 2.0
                } else {
                    (1.0 + out_bounce(2.0 * t - 1.0)) / 2.0
                }
            }
            Self::Sine => (1.0 - (2.0 * PI * t).cos()) / 2.0,
            Self::SineReturn => there_and_back(t, Self::OutSine),
            Self::CosineReturn => there_and_back(t, Self::InOutSine),
            Self::ElasticReturn => there_and_back(t, Self::OutElastic),
            Self::BounceReturn => there_and_back(t, Self::OutBounce),
        }
    }
}

fn normalize_name(name: &str) -> String {
    let key: String = name
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect();
    match key.strip_prefix("ease") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => key,
    }
}

fn in_out_pow(t: f64, n: i32) -> f64 {
    if t < 0.5 {
        2f64.powi(n - 1) * t.powi(n)
    } else {
        1.0 - (-2.0 * t + 2.0).powi(n) / 2.0
    }
}

fn out_expo(t: f64) -> f64 {
    if t == 1.0 {
        1.0
    } else {
        1.0 - 2f64.powf(-10.0 * t)
    }
}

fn out_elastic(t: f64) -> f64 {
    if t == 0.0 {
        0.0
    } else if t == 1.0 {
        1.0
    } else {
        2f64.powf(-10.0 * t) * ((t * 10.0 - 0.75) * ELASTIC_C4).sin() + 1.0
    }
}

fn out_bounce(t: f64) -> f64 {
    if t < 1.0 / BOUNCE_D1 {
        BOUNCE_N1 * t * t
    } else if t < 2.0 / BOUNCE_D1 {
        let t = t - 1.5 / BOUNCE_D1;
        BOUNCE_N1 * t * t + 0.75
    } else if t < 2.5 / BOUNCE_D1 {
        let t = t - 2.25 / BOUNCE_D1;
        BOUNCE_N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / BOUNCE_D1;
        BOUNCE_N1 * t * t + 0.984375
    }
}

/// Run `out` forward over the first half and backward over the second.
fn there_and_back(t: f64, out: Ease) -> f64 {
    if t <= 0.5 {
        out.apply(2.0 * t)
    } else {
        out.apply(2.0 * (1.0 - t))
    }
}
