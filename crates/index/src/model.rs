//! Records served by the legacy methods.

use chrono::{DateTime, Utc};
use rpcgate_rpc::canonicalize_name;
use serde::{Deserialize, Serialize};

/// A registered project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Display name.
    pub name: String,
    /// Journal id of the last change to the project.
    #[serde(default)]
    pub last_serial: i64,
    /// Documentation link.
    #[serde(default)]
    pub documentation_url: Option<String>,
    /// Releases, in any order.
    #[serde(default)]
    pub releases: Vec<Release>,
}

impl Project {
    /// A project without releases.
    pub fn new(name: impl Into<String>, last_serial: i64) -> Self {
        Self { name: name.into(), last_serial, documentation_url: None, releases: Vec::new() }
    }

    /// Add a release.
    #[must_use]
    pub fn with_release(mut self, release: Release) -> Self {
        self.releases.push(release);
        self
    }

    /// Name in canonical form, used for lookups.
    pub fn normalized_name(&self) -> String {
        canonicalize_name(&self.name)
    }

    /// Every release, newest first.
    pub fn all_versions(&self) -> Vec<&Release> {
        let mut releases: Vec<_> = self.releases.iter().collect();
        releases.sort_by(|a, b| b.ordering.cmp(&a.ordering));
        releases
    }

    /// Newest release that is not yanked.
    pub fn latest_version(&self) -> Option<&Release> {
        self.all_versions().into_iter().find(|release| !release.yanked)
    }

    /// Release with exactly this version string.
    pub fn release(&self, version: &str) -> Option<&Release> {
        self.releases.iter().find(|release| release.version == version)
    }
}

/// A labelled project link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectUrl {
    /// Link label, such as `Homepage`.
    pub label: String,
    /// Target.
    pub url: String,
}

/// One release of a project and its metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Release {
    pub version: String,
    /// Position among the project's releases; higher is newer.
    pub ordering: i64,
    pub yanked: bool,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub author_email: Option<String>,
    pub maintainer: Option<String>,
    pub maintainer_email: Option<String>,
    pub home_page: Option<String>,
    pub download_url: Option<String>,
    pub license: Option<String>,
    pub keywords: Option<String>,
    pub platform: Option<String>,
    pub requires_python: Option<String>,
    pub project_urls: Vec<ProjectUrl>,
    pub classifiers: Vec<String>,
    pub requires: Vec<String>,
    pub requires_dist: Vec<String>,
    pub provides: Vec<String>,
    pub provides_dist: Vec<String>,
    pub obsoletes: Vec<String>,
    pub obsoletes_dist: Vec<String>,
    pub requires_external: Vec<String>,
    pub files: Vec<File>,
}

impl Release {
    /// A release with no metadata.
    pub fn new(version: impl Into<String>, ordering: i64) -> Self {
        Self { version: version.into(), ordering, ..Default::default() }
    }
}

/// A distribution file of a release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    pub filename: String,
    /// `sdist`, `bdist_wheel`, ...
    pub packagetype: String,
    pub python_version: String,
    pub size: u64,
    pub md5_digest: String,
    pub sha256_digest: String,
    pub upload_time: DateTime<Utc>,
    #[serde(default)]
    pub comment_text: Option<String>,
    /// Storage path, substituted into the files URL.
    pub path: String,
}

/// A user's role on a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// `Owner` or `Maintainer`.
    pub role_name: String,
    pub username: String,
    /// Project display name.
    pub project: String,
}

impl Role {
    /// Create a role.
    pub fn new(
        role_name: impl Into<String>,
        username: impl Into<String>,
        project: impl Into<String>,
    ) -> Self {
        Self { role_name: role_name.into(), username: username.into(), project: project.into() }
    }
}

/// One entry of the change journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Serial, strictly increasing.
    pub id: i64,
    /// Project display name.
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    pub submitted_date: DateTime<Utc>,
    /// What happened, e.g. `new release`.
    pub action: String,
}

/// Everything a [`MemoryIndex`](crate::MemoryIndex) serves, as loaded from
/// JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexData {
    pub projects: Vec<Project>,
    pub roles: Vec<Role>,
    pub journal: Vec<JournalEntry>,
}

impl IndexData {
    /// Add a project.
    #[must_use]
    pub fn with_project(mut self, project: Project) -> Self {
        self.projects.push(project);
        self
    }

    /// Add a role.
    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.push(role);
        self
    }

    /// Add a journal entry.
    #[must_use]
    pub fn with_entry(mut self, entry: JournalEntry) -> Self {
        self.journal.push(entry);
        self
    }
}
