use crate::foundation::error::{CliplaneError, CliplaneResult};
use std::f64::consts::PI;

/// Base shape of an easing curve.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EaseCurve {
    /// Linear progress (`"none"`).
    None,
    /// Overshooting cubic.
    Back,
    /// Bouncing settle.
    Bounce,
    /// Damped spring.
    Elastic,
    /// Circular arc.
    Circ,
    /// Exponential.
    Expo,
    /// Polynomial of degree 2.
    Power1,
    /// Polynomial of degree 3.
    Power2,
    /// Polynomial of degree 4.
    Power3,
    /// Polynomial of degree 5.
    Power4,
    /// Quarter sine wave.
    Sine,
}

impl EaseCurve {
    /// Every named curve, in table order.
    pub const ALL: [EaseCurve; 11] = [
        Self::None,
        Self::Back,
        Self::Bounce,
        Self::Elastic,
        Self::Circ,
        Self::Expo,
        Self::Power1,
        Self::Power2,
        Self::Power3,
        Self::Power4,
        Self::Sine,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Back => "back",
            Self::Bounce => "bounce",
            Self::Elastic => "elastic",
            Self::Circ => "circ",
            Self::Expo => "expo",
            Self::Power1 => "power1",
            Self::Power2 => "power2",
            Self::Power3 => "power3",
            Self::Power4 => "power4",
            Self::Sine => "sine",
        }
    }

    fn from_name(s: &str) -> Option<Self> {
        match s {
            "none" | "linear" => Some(Self::None),
            "sin" => Some(Self::Sine),
            _ => Self::ALL.iter().copied().find(|c| c.name() == s),
        }
    }

    /// The `.out` variant; the other directions are derived from it.
    fn out(self, t: f64) -> f64 {
        match self {
            Self::None => t,
            Self::Power1 => 1.0 - (1.0 - t).powi(2),
            Self::Power2 => 1.0 - (1.0 - t).powi(3),
            Self::Power3 => 1.0 - (1.0 - t).powi(4),
            Self::Power4 => 1.0 - (1.0 - t).powi(5),
            Self::Sine => (t * PI / 2.0).sin(),
            Self::Circ => (1.0 - (t - 1.0).powi(2)).max(0.0).sqrt(),
            Self::Expo => {
                if t >= 1.0 {
                    1.0
                } else {
                    1.0 - 2f64.powf(-10.0 * t)
                }
            }
            Self::Back => {
                const C1: f64 = 1.70158;
                const C3: f64 = C1 + 1.0;
                1.0 + C3 * (t - 1.0).powi(3) + C1 * (t - 1.0).powi(2)
            }
            Self::Bounce => bounce_out(t),
            Self::Elastic => {
                if t <= 0.0 {
                    0.0
                } else if t >= 1.0 {
                    1.0
                } else {
                    let c4 = 2.0 * PI / 3.0;
                    2f64.powf(-10.0 * t) * ((t * 10.0 - 0.75) * c4).sin() + 1.0
                }
            }
        }
    }
}

fn bounce_out(t: f64) -> f64 {
    const N1: f64 = 7.5625;
    const D1: f64 = 2.75;

    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984375
    }
}

/// Which end of the curve carries the acceleration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum EaseDir {
    In,
    #[default]
    Out,
    InOut,
}

/// Named easing function, e.g. `"power2.inOut"`, `"bounce"` or `"none"`.
///
/// A bare curve name means `.out`. Values serialize back to their canonical name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ease {
    pub curve: EaseCurve,
    pub dir: EaseDir,
}

impl Default for Ease {
    fn default() -> Self {
        Self::LINEAR
    }
}

impl Ease {
    pub const LINEAR: Ease = Ease {
        curve: EaseCurve::None,
        dir: EaseDir::Out,
    };

    pub fn new(curve: EaseCurve, dir: EaseDir) -> Self {
        Self { curve, dir }
    }

    /// Parse a curve name with an optional `.in`, `.out` or `.inOut` suffix.
    pub fn parse(s: &str) -> CliplaneResult<Self> {
        let s = s.trim();
        let (base, dir) = match s.split_once('.') {
            Some((base, "in")) => (base, EaseDir::In),
            Some((base, "out")) => (base, EaseDir::Out),
            Some((base, "inOut")) => (base, EaseDir::InOut),
            Some((_, other)) => {
                return Err(CliplaneError::validation(format!(
                    "unknown easing direction '.{other}' in '{s}' (expected .in, .out or .inOut)"
                )));
            }
            None => (s, EaseDir::Out),
        };
        let curve = EaseCurve::from_name(base).ok_or_else(|| {
            CliplaneError::validation(format!("unknown easing curve '{base}'"))
        })?;
        Ok(Self { curve, dir })
    }

    pub fn name(self) -> String {
        match (self.curve, self.dir) {
            (EaseCurve::None, _) => "none".to_owned(),
            (c, EaseDir::Out) => c.name().to_owned(),
            (c, EaseDir::In) => format!("{}.in", c.name()),
            (c, EaseDir::InOut) => format!("{}.inOut", c.name()),
        }
    }

    /// Apply this easing function to normalized progress `t` in `[0, 1]`.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        let c = self.curve;
        match self.dir {
            EaseDir::Out => c.out(t),
            EaseDir::In => 1.0 - c.out(1.0 - t),
            EaseDir::InOut => {
                if t < 0.5 {
                    (1.0 - c.out(1.0 - 2.0 * t)) / 2.0
                } else {
                    (1.0 + c.out(2.0 * t - 1.0)) / 2.0
                }
            }
        }
    }
}

impl TryFrom<String> for Ease {
    type Error = CliplaneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Ease> for String {
    fn from(value: Ease) -> Self {
        value.name()
    }
}

impl std::fmt::Display for Ease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/ease.rs"]
mod tests;
