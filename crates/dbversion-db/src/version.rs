use std::fmt;
use std::str::FromStr;

use dbversion_common::{Error, Result};
use rusqlite::ToSql;
use rusqlite::types::ToSqlOutput;
use serde::{Deserialize, Serialize};

/// The last successfully applied migration step.
///
/// Always in `0..=i32::MAX`, the range every storage strategy can hold
/// (SQLite's `user_version` header field is a signed 32-bit integer).
/// `0` means no migration has ever been applied.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "i64", into = "i64")]
pub struct MigrationVersion(u32);

impl MigrationVersion {
    pub const ZERO: MigrationVersion = MigrationVersion(0);
    pub const MAX: MigrationVersion = MigrationVersion(i32::MAX as u32);

    pub fn new(version: u32) -> Result<Self> {
        if version > Self::MAX.0 {
            return Err(Error::InvalidVersion(format!(
                "{version} exceeds the maximum of {}",
                Self::MAX.0
            )));
        }
        Ok(Self(version))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn is_initial(self) -> bool {
        self.0 == 0
    }

    /// The version after this one, or `None` at [`MigrationVersion::MAX`].
    pub fn next(self) -> Option<Self> {
        if self == Self::MAX {
            None
        } else {
            Some(Self(self.0 + 1))
        }
    }
}

impl TryFrom<i64> for MigrationVersion {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        let version = u32::try_from(value)
            .map_err(|_| Error::InvalidVersion(format!("{value} is out of range")))?;
        Self::new(version)
    }
}

impl TryFrom<u32> for MigrationVersion {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<MigrationVersion> for i64 {
    fn from(version: MigrationVersion) -> Self {
        i64::from(version.0)
    }
}

impl From<MigrationVersion> for u32 {
    fn from(version: MigrationVersion) -> Self {
        version.0
    }
}

impl fmt::Display for MigrationVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MigrationVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| Error::InvalidVersion(format!("'{s}' is not an integer")))?;
        Self::try_from(value)
    }
}

impl ToSql for MigrationVersion {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(i64::from(*self)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_initial() {
        assert!(MigrationVersion::ZERO.is_initial());
        assert_eq!(MigrationVersion::default(), MigrationVersion::ZERO);
        assert!(!MigrationVersion::new(1).unwrap().is_initial());
    }

    #[test]
    fn rejects_values_outside_i32_range() {
        assert!(MigrationVersion::new(i32::MAX as u32).is_ok());
        assert!(matches!(
            MigrationVersion::new(i32::MAX as u32 + 1),
            Err(Error::InvalidVersion(_))
        ));
        assert!(matches!(
            MigrationVersion::try_from(-1_i64),
            Err(Error::InvalidVersion(_))
        ));
        assert!(MigrationVersion::try_from(i64::MAX).is_err());
    }

    #[test]
    fn next_stops_at_max() {
        let v = MigrationVersion::new(41).unwrap();
        assert_eq!(v.next().unwrap().get(), 42);
        assert_eq!(MigrationVersion::MAX.next(), None);
    }

    #[test]
    fn parses_from_str() {
        assert_eq!("7".parse::<MigrationVersion>().unwrap().get(), 7);
        assert_eq!(" 12 ".parse::<MigrationVersion>().unwrap().get(), 12);
        assert!("seven".parse::<MigrationVersion>().is_err());
        assert!("-3".parse::<MigrationVersion>().is_err());
    }

    #[test]
    fn serializes_as_plain_integer() {
        let v = MigrationVersion::new(3).unwrap();
        assert_eq!(serde_json::to_string(&v).unwrap(), "3");
        assert_eq!(serde_json::from_str::<MigrationVersion>("3").unwrap(), v);
        assert!(serde_json::from_str::<MigrationVersion>("-1").is_err());
    }

    #[test]
    fn orders_numerically() {
        let a = MigrationVersion::new(2).unwrap();
        let b = MigrationVersion::new(10).unwrap();
        assert!(a < b);
    }
}
