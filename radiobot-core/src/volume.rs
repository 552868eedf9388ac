use std::{fmt::Display, str::FromStr};

use thiserror::Error;

/// The playback volume of a session, always within [Volume::MIN] and [Volume::MAX].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Volume(u16);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VolumeError {
    #[error("Volume must be a whole number, got {0:?}")]
    NotANumber(String),
    #[error("Volume must be between {} and {}, got {0}", Volume::MIN, Volume::MAX)]
    OutOfRange(i64),
}

impl Volume {
    pub const MIN: u16 = 1;
    pub const MAX: u16 = 1000;

    pub fn new(value: u16) -> Result<Self, VolumeError> {
        Self::try_from(i64::from(value))
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self(100)
    }
}

impl TryFrom<i64> for Volume {
    type Error = VolumeError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u16))
        } else {
            Err(VolumeError::OutOfRange(value))
        }
    }
}

impl FromStr for Volume {
    type Err = VolumeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| VolumeError::NotANumber(s.to_string()))?;

        Self::try_from(value)
    }
}

impl Display for Volume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}
