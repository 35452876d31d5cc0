use dbversion_common::Result;
use rusqlite::{Connection, Transaction};

use crate::version::MigrationVersion;

/// Reads and writes a database's migration version.
///
/// The version may be stored any way an implementation likes (a dedicated
/// table, the `user_version` pragma, a row in a shared metadata table), but
/// every implementation must behave the same from the outside so a migration
/// runner can swap one for another.
///
/// Implementations hold only configuration fixed at construction and are
/// usable from any thread without external locking. Each call borrows the
/// connection it is given and never keeps it.
///
/// Implementations never log and never retry. Every failure is returned to
/// the caller.
///
/// Lowering the version is allowed. Whether a downgrade makes sense is for
/// the migration runner to decide.
pub trait VersionManager: Send + Sync {
    /// Short identifier of the storage strategy, e.g. `"table"`.
    fn name(&self) -> &'static str;

    /// Current migration version of the database behind `conn`.
    ///
    /// If versioning metadata does not exist yet it is created and
    /// [`MigrationVersion::ZERO`] is returned. Creation is idempotent. When
    /// `conn` is in autocommit mode the implementation wraps creation in its
    /// own transaction; inside a caller's transaction it joins that one.
    /// Beyond creating missing metadata, stored state is never modified.
    fn version(&self, conn: &Connection) -> Result<MigrationVersion>;

    /// Record `version` as part of the caller's open transaction.
    ///
    /// The transaction is neither committed nor rolled back here. On `Ok`
    /// the caller commits it, persisting the new version together with the
    /// migration's own changes. On `Err` the caller must roll it back
    /// (dropping the [`Transaction`] does so), leaving the database as it
    /// was before the attempt.
    fn set_version(&self, tx: &Transaction<'_>, version: MigrationVersion) -> Result<()>;
}

impl<M: VersionManager + ?Sized> VersionManager for Box<M> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn version(&self, conn: &Connection) -> Result<MigrationVersion> {
        (**self).version(conn)
    }

    fn set_version(&self, tx: &Transaction<'_>, version: MigrationVersion) -> Result<()> {
        (**self).set_version(tx, version)
    }
}

impl<M: VersionManager + ?Sized> VersionManager for std::sync::Arc<M> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn version(&self, conn: &Connection) -> Result<MigrationVersion> {
        (**self).version(conn)
    }

    fn set_version(&self, tx: &Transaction<'_>, version: MigrationVersion) -> Result<()> {
        (**self).set_version(tx, version)
    }
}
