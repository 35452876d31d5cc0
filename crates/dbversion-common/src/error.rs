use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    /// The connection failed to execute a query (I/O, locking, closed handle).
    #[error("database error: {0}")]
    Database(String),

    /// Versioning metadata exists but cannot be interpreted.
    #[error("corrupt version metadata: {0}")]
    Corrupt(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("invalid migration version: {0}")]
    InvalidVersion(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the same call may succeed if attempted again.
    ///
    /// Only transport-level failures qualify. Corrupt metadata, constraint
    /// violations and bad input fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Database(_) | Error::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn error_display_includes_context() {
        let e = Error::Database("database is locked".into());
        assert_eq!(e.to_string(), "database error: database is locked");

        let e = Error::InvalidVersion("-1 is out of range".into());
        assert_eq!(e.to_string(), "invalid migration version: -1 is out of range");

        let e = Error::Corrupt("version is 'abc'".into());
        assert_eq!(e.to_string(), "corrupt version metadata: version is 'abc'");

        let e = Error::Constraint("trigger aborted".into());
        assert_eq!(e.to_string(), "constraint violation: trigger aborted");

        let e = Error::Config("unknown strategy 'btree'".into());
        assert_eq!(e.to_string(), "configuration error: unknown strategy 'btree'");
    }

    #[test]
    fn only_transport_errors_are_retryable() {
        assert!(Error::Database("database is locked".into()).is_retryable());
        assert!(Error::Io(std::io::Error::other("disk")).is_retryable());

        assert!(!Error::Corrupt("bad".into()).is_retryable());
        assert!(!Error::Constraint("bad".into()).is_retryable());
        assert!(!Error::InvalidVersion("-1".into()).is_retryable());
        assert!(!Error::Config("bad".into()).is_retryable());
    }
}
