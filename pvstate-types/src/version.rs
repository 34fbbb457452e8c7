use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Three-part state schema version.
///
/// Ordering is lexicographic over (major, minor, patch) with plain integer
/// comparison; there are no pre-release or build tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const ZERO: Version = Version::new(0, 0, 0);

    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn less_than(self, other: Version) -> bool {
        self < other
    }

    /// `M.m` when the patch component is zero, `M.m.p` otherwise.
    pub fn short(self) -> String {
        if self.patch == 0 {
            format!("{}.{}", self.major, self.minor)
        } else {
            self.to_string()
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionParseError {
    #[error("empty version string")]
    Empty,

    #[error("version {input:?} has more than three components")]
    TooManyComponents { input: String },

    #[error("version {input:?} has a non-numeric component {component:?}")]
    InvalidComponent { input: String, component: String },
}

impl FromStr for Version {
    type Err = VersionParseError;

    /// Parses `M`, `M.m` or `M.m.p`; missing trailing components are 0.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(VersionParseError::Empty);
        }

        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.len() > 3 {
            return Err(VersionParseError::TooManyComponents {
                input: s.to_string(),
            });
        }

        let mut out = [0u32; 3];
        for (slot, part) in out.iter_mut().zip(&parts) {
            let valid = !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
            *slot = match valid.then(|| part.parse::<u32>()) {
                Some(Ok(v)) => v,
                _ => {
                    return Err(VersionParseError::InvalidComponent {
                        input: s.to_string(),
                        component: (*part).to_string(),
                    });
                }
            };
        }

        Ok(Version::new(out[0], out[1], out[2]))
    }
}

impl From<Version> for String {
    fn from(v: Version) -> Self {
        v.to_string()
    }
}

impl TryFrom<String> for Version {
    type Error = VersionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A single forward schema transition, e.g. `4.1→4.2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Transition {
    pub from: Version,
    pub to: Version,
}

impl Transition {
    pub const fn new(from: Version, to: Version) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}→{}", self.from.short(), self.to.short())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_release_chain_is_ordered() {
        let chain = [
            Version::new(4, 1, 0),
            Version::new(4, 2, 0),
            Version::new(5, 1, 0),
            Version::new(5, 4, 0),
            Version::new(5, 5, 0),
        ];
        for pair in chain.windows(2) {
            assert!(pair[0].less_than(pair[1]));
            assert!(!pair[1].less_than(pair[0]));
        }
    }

    #[test]
    fn missing_components_default_to_zero() {
        assert_eq!("5".parse::<Version>().unwrap(), Version::new(5, 0, 0));
        assert_eq!("5.4".parse::<Version>().unwrap(), Version::new(5, 4, 0));
        assert_eq!(" 4.0.1 ".parse::<Version>().unwrap(), Version::new(4, 0, 1));
    }

    #[test]
    fn malformed_versions_are_rejected() {
        assert_eq!("".parse::<Version>(), Err(VersionParseError::Empty));
        assert!(matches!(
            "1.2.3.4".parse::<Version>(),
            Err(VersionParseError::TooManyComponents { .. })
        ));
        for bad in ["abc", "5..1", "5.x.0", "-1.0.0", "5.4.", "+5"] {
            assert!(
                matches!(
                    bad.parse::<Version>(),
                    Err(VersionParseError::InvalidComponent { .. })
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn transition_label_uses_short_form() {
        let t = Transition::new(Version::new(4, 1, 0), Version::new(4, 2, 0));
        assert_eq!(t.to_string(), "4.1→4.2");
        let t = Transition::new(Version::new(4, 0, 1), Version::new(4, 1, 0));
        assert_eq!(t.to_string(), "4.0.1→4.1");
    }

    #[test]
    fn serializes_as_dotted_string() {
        let json = serde_json::to_string(&Version::new(5, 4, 0)).unwrap();
        assert_eq!(json, "\"5.4.0\"");
        let back: Version = serde_json::from_str("\"5.5\"").unwrap();
        assert_eq!(back, Version::new(5, 5, 0));
        assert!(serde_json::from_str::<Version>("\"five\"").is_err());
    }

    fn arb_version() -> impl Strategy<Value = Version> {
        (0u32..20, 0u32..20, 0u32..20).prop_map(|(a, b, c)| Version::new(a, b, c))
    }

    proptest! {
        #[test]
        fn less_than_is_a_strict_total_order(a in arb_version(), b in arb_version()) {
            prop_assert!(!a.less_than(a));
            if a != b {
                prop_assert!(a.less_than(b) ^ b.less_than(a));
            } else {
                prop_assert!(!a.less_than(b) && !b.less_than(a));
            }
        }

        #[test]
        fn less_than_is_lexicographic(a in arb_version(), b in arb_version()) {
            let lex = (a.major, a.minor, a.patch) < (b.major, b.minor, b.patch);
            prop_assert_eq!(a.less_than(b), lex);
        }

        #[test]
        fn display_then_parse_is_identity(v in arb_version()) {
            prop_assert_eq!(v.to_string().parse::<Version>().unwrap(), v);
        }
    }
}
