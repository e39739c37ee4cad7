//! In-memory package index.

use std::{
    collections::{BTreeSet, HashMap},
    path::Path,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rpcgate_rpc::canonicalize_name;

use crate::{
    model::{IndexData, JournalEntry, Project, Release, Role},
    store::{IndexError, PackageIndex},
};

/// [`PackageIndex`] over data held in memory.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    projects: Vec<Project>,
    by_name: HashMap<String, usize>,
    roles: Vec<Role>,
    journal: Vec<JournalEntry>,
}

impl MemoryIndex {
    /// Index `data`. Later projects replace earlier ones with the same
    /// canonical name.
    pub fn new(data: IndexData) -> Self {
        let IndexData { projects: loaded, roles, mut journal } = data;

        let mut projects: Vec<Project> = Vec::with_capacity(loaded.len());
        let mut by_name = HashMap::with_capacity(loaded.len());
        for project in loaded {
            match by_name.get(&project.normalized_name()) {
                Some(&slot) => projects[slot] = project,
                None => {
                    by_name.insert(project.normalized_name(), projects.len());
                    projects.push(project);
                }
            }
        }
        journal.sort_by_key(|entry| entry.id);

        Self { projects, by_name, roles, journal }
    }

    /// Load a JSON document shaped like [`IndexData`].
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Corrupt`] if the document does not decode.
    pub fn from_json(json: &str) -> Result<Self, IndexError> {
        let data: IndexData =
            serde_json::from_str(json).map_err(|e| IndexError::Corrupt(e.to_string()))?;
        Ok(Self::new(data))
    }

    /// Load a JSON document from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Unavailable`] if the file cannot be read and
    /// [`IndexError::Corrupt`] if it does not decode.
    pub fn from_file(path: &Path) -> Result<Self, IndexError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| IndexError::Unavailable(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    /// Number of projects.
    pub fn len(&self) -> usize {
        self.projects.len()
    }

    /// Whether the index holds no project.
    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    fn find(&self, name: &str) -> Option<&Project> {
        self.by_name.get(&canonicalize_name(name)).map(|&slot| &self.projects[slot])
    }

    fn journal_where(&self, limit: usize, keep: impl Fn(&JournalEntry) -> bool) -> Vec<JournalEntry> {
        self.journal.iter().filter(|&entry| keep(entry)).take(limit).cloned().collect()
    }
}

#[async_trait]
impl PackageIndex for MemoryIndex {
    async fn project_names(&self) -> Result<Vec<String>, IndexError> {
        Ok(self.projects.iter().map(|project| project.name.clone()).collect())
    }

    async fn project_serials(&self) -> Result<Vec<(String, i64)>, IndexError> {
        Ok(self.projects.iter().map(|project| (project.name.clone(), project.last_serial)).collect())
    }

    async fn project(&self, name: &str) -> Result<Option<Project>, IndexError> {
        Ok(self.find(name).cloned())
    }

    async fn user_roles(&self, username: &str) -> Result<Vec<Role>, IndexError> {
        let mut roles: Vec<Role> =
            self.roles.iter().filter(|role| role.username == username).cloned().collect();
        roles.sort_by(|a, b| b.role_name.cmp(&a.role_name).then_with(|| a.project.cmp(&b.project)));
        Ok(roles)
    }

    async fn project_roles(&self, name: &str) -> Result<Vec<Role>, IndexError> {
        let wanted = canonicalize_name(name);
        let mut roles: Vec<Role> = self
            .roles
            .iter()
            .filter(|role| canonicalize_name(&role.project) == wanted)
            .cloned()
            .collect();
        roles.sort_by(|a, b| b.role_name.cmp(&a.role_name).then_with(|| a.username.cmp(&b.username)));
        Ok(roles)
    }

    async fn last_serial(&self) -> Result<Option<i64>, IndexError> {
        Ok(self.journal.last().map(|entry| entry.id))
    }

    async fn journal_since_serial(
        &self,
        serial: i64,
        limit: usize,
    ) -> Result<Vec<JournalEntry>, IndexError> {
        Ok(self.journal_where(limit, |entry| entry.id > serial))
    }

    async fn journal_since(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<JournalEntry>, IndexError> {
        Ok(self.journal_where(limit, |entry| entry.submitted_date > since))
    }

    async fn releases_with_classifiers(
        &self,
        classifiers: &[String],
    ) -> Result<Vec<(String, String)>, IndexError> {
        let wanted: BTreeSet<&str> = classifiers.iter().map(String::as_str).collect();
        // A release matches when it carries as many of the wanted classifiers
        // as were asked for, so an empty or repeating list matches nothing.
        let carries_all = |release: &Release| {
            let carried: BTreeSet<&str> = release
                .classifiers
                .iter()
                .map(String::as_str)
                .filter(|classifier| wanted.contains(classifier))
                .collect();
            !classifiers.is_empty() && carried.len() == classifiers.len()
        };
        let mut matches: Vec<(String, String)> = self
            .projects
            .iter()
            .flat_map(|project| {
                project
                    .releases
                    .iter()
                    .filter(|release| carries_all(release))
                    .map(|release| (project.name.clone(), release.version.clone()))
            })
            .collect();
        matches.sort();
        matches.dedup();
        Ok(matches)
    }
}
