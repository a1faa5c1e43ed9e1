//! Illumination-dependent transition rates

use serde::{Deserialize, Serialize};

/// One transition rate as an affine function of laser power.
///
/// `rate(power) = base + slope * power`, in transitions per frame. A base of
/// `+∞` marks an instant transition that fires with zero waiting time; it is
/// serialized as the string `"inf"` since JSON has no infinity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RateModel {
    #[serde(with = "rate_value")]
    pub base: f64,
    pub slope: f64,
}

mod rate_value {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    const INFINITE: &str = "inf";

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if *value == f64::INFINITY {
            serializer.serialize_str(INFINITE)
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) if text == INFINITE => Ok(f64::INFINITY),
            Repr::Text(text) => Err(D::Error::custom(format!(
                "expected a rate or \"{INFINITE}\", got \"{text}\""
            ))),
        }
    }
}

impl RateModel {
    /// A transition that never fires
    pub const ZERO: RateModel = RateModel {
        base: 0.0,
        slope: 0.0,
    };

    /// A transition that fires immediately
    pub const INSTANT: RateModel = RateModel {
        base: f64::INFINITY,
        slope: 0.0,
    };

    pub fn new(base: f64, slope: f64) -> Self {
        Self { base, slope }
    }

    /// Power-independent rate
    pub fn constant(rate: f64) -> Self {
        Self::new(rate, 0.0)
    }

    /// Rate proportional to laser power
    pub fn proportional(slope: f64) -> Self {
        Self::new(0.0, slope)
    }

    /// Power-independent rate from a mean lifetime in frames.
    ///
    /// A lifetime of 0 is an instant transition, an infinite lifetime never
    /// fires.
    pub fn from_lifetime(mean_lifetime: f64) -> Self {
        if mean_lifetime == 0.0 {
            Self::INSTANT
        } else if mean_lifetime.is_infinite() {
            Self::ZERO
        } else {
            Self::constant(1.0 / mean_lifetime)
        }
    }

    /// Power-proportional rate from the mean lifetime at unit power, i.e. a
    /// lifetime of `mean_lifetime / power` frames.
    ///
    /// A lifetime of 0 is an instant transition at any power, an infinite
    /// lifetime never fires.
    pub fn from_lifetime_at_unit_power(mean_lifetime: f64) -> Self {
        if mean_lifetime == 0.0 {
            Self::INSTANT
        } else if mean_lifetime.is_infinite() {
            Self::ZERO
        } else {
            Self::proportional(1.0 / mean_lifetime)
        }
    }

    /// Effective rate at `power`.
    ///
    /// At or below `power_floor` the power-dependent term is dropped, so a
    /// purely power-driven transition does not fire with the laser off.
    pub fn evaluate(&self, power: f64, power_floor: f64) -> f64 {
        if self.base == f64::INFINITY {
            return f64::INFINITY;
        }
        let mut rate = self.base;
        if self.slope != 0.0 && power > power_floor {
            rate += self.slope * power;
        }
        if rate > 0.0 {
            rate
        } else {
            0.0
        }
    }

    pub fn is_instant(&self) -> bool {
        self.base == f64::INFINITY
    }

    /// True if this entry can never fire at any power
    pub fn is_zero(&self) -> bool {
        self.base == 0.0 && self.slope == 0.0
    }
}
