//! Data access consumed by the legacy methods.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use derive_more::{Display, Error};

use crate::model::{JournalEntry, Project, Role};

/// Maximum number of journal entries returned by one changelog call.
pub const CHANGELOG_LIMIT: usize = 50_000;

/// Failure of the backing store.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum IndexError {
    /// The store could not be reached or read.
    #[display("index unavailable: {_0}")]
    Unavailable(#[error(not(source))] String),
    /// The store returned data that does not decode.
    #[display("corrupt index data: {_0}")]
    Corrupt(#[error(not(source))] String),
}

/// Read-only queries over the package index.
///
/// Project names given as arguments are matched on their canonical form.
#[async_trait]
pub trait PackageIndex: Send + Sync + 'static {
    /// Display names of every project.
    async fn project_names(&self) -> Result<Vec<String>, IndexError>;

    /// `(name, last_serial)` of every project.
    async fn project_serials(&self) -> Result<Vec<(String, i64)>, IndexError>;

    /// The project called `name`, with its releases.
    async fn project(&self, name: &str) -> Result<Option<Project>, IndexError>;

    /// Roles held by `username`, ordered by role name descending, then
    /// project name.
    async fn user_roles(&self, username: &str) -> Result<Vec<Role>, IndexError>;

    /// Roles on the project called `name`, ordered by role name descending,
    /// then username.
    async fn project_roles(&self, name: &str) -> Result<Vec<Role>, IndexError>;

    /// Highest journal serial, if the journal is not empty.
    async fn last_serial(&self) -> Result<Option<i64>, IndexError>;

    /// At most `limit` journal entries with an id above `serial`, by id.
    async fn journal_since_serial(
        &self,
        serial: i64,
        limit: usize,
    ) -> Result<Vec<JournalEntry>, IndexError>;

    /// At most `limit` journal entries submitted after `since`, by id.
    async fn journal_since(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<JournalEntry>, IndexError>;

    /// `(project name, version)` of every release carrying all of
    /// `classifiers`, ordered by name then version.
    async fn releases_with_classifiers(
        &self,
        classifiers: &[String],
    ) -> Result<Vec<(String, String)>, IndexError>;
}
