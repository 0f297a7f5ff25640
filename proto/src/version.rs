// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Firmware / protocol version, negotiated by the transport during pairing

use core::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Semantic firmware version (`major.minor.patch`).
///
/// Ordering is lexicographic over the components, so capability checks
/// expressed as `version >= threshold` are monotonic.
#[derive(
    Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize,
)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    /// Create a new [Version]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

/// Version parsing errors
#[derive(Clone, PartialEq, Debug, thiserror::Error)]
pub enum VersionError {
    #[error("expected three dot-separated components, found {0}")]
    Components(usize),

    #[error("invalid version component '{0}'")]
    Component(String),
}

/// Parse versions in the form `9.4.0` or `v9.4.0`, pre-release / build
/// suffixes (`-rc1`, `+abc`) are ignored
impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().trim_start_matches('v');
        let core = s.split(['-', '+']).next().unwrap_or_default();

        let parts: Vec<&str> = core.split('.').collect();
        if parts.len() != 3 {
            return Err(VersionError::Components(parts.len()));
        }

        let mut v = [0u32; 3];
        for (i, p) in parts.iter().enumerate() {
            v[i] = p
                .parse()
                .map_err(|_| VersionError::Component(p.to_string()))?;
        }

        Ok(Self::new(v[0], v[1], v[2]))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_version() {
        assert_eq!("9.4.0".parse::<Version>(), Ok(Version::new(9, 4, 0)));
        assert_eq!("v9.15.1".parse::<Version>(), Ok(Version::new(9, 15, 1)));
        assert_eq!("9.6.0-rc2".parse::<Version>(), Ok(Version::new(9, 6, 0)));

        assert_eq!("9.4".parse::<Version>(), Err(VersionError::Components(2)));
        assert_eq!(
            "9.x.0".parse::<Version>(),
            Err(VersionError::Component("x".to_string()))
        );
    }

    #[test]
    fn version_ordering() {
        let v = |s: &str| s.parse::<Version>().unwrap();

        assert!(v("9.4.0") > v("9.3.9"));
        assert!(v("10.0.0") > v("9.99.99"));
        assert!(v("9.10.0") > v("9.9.0"));
        assert_eq!(v("v9.4.0"), v("9.4.0"));
    }
}
