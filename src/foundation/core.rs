/// Number of representable 8-bit intensities; the default threshold divisor.
pub const MAX_COLOR: u32 = 256;

/// Bucket key: one bucket per image row.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct RowIndex(pub u32);

impl std::fmt::Display for RowIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Initial size of every bucket (`{0, .., R-1}`), also the threshold scale basis.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct Ripeness(pub u32);

impl Ripeness {
    /// Initial token set of a freshly provisioned bucket.
    pub fn tokens(self) -> std::ops::Range<u32> {
        0..self.0
    }
}

/// Minimum token value that survives a delete pass.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize,
    serde::Deserialize,
)]
pub struct Threshold(pub u32);

/// Divisor used when scaling an intensity into a threshold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdScale {
    /// `scale = R / 256`: intensity 255 keeps the top token alive.
    #[default]
    Byte,
    /// `scale = R / 255`: intensity 255 drains the bucket completely.
    Full,
}

impl ThresholdScale {
    fn divisor(self) -> u64 {
        match self {
            Self::Byte => u64::from(MAX_COLOR),
            Self::Full => u64::from(MAX_COLOR - 1),
        }
    }

    /// `floor(R / divisor * intensity)`, computed exactly in integers.
    pub fn threshold(self, ripeness: Ripeness, intensity: u8) -> Threshold {
        let scaled = u64::from(ripeness.0) * u64::from(intensity) / self.divisor();
        Threshold(scaled as u32)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
