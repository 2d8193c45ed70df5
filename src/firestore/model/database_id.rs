use std::fmt::{Display, Formatter};

use crate::firestore::constants::DEFAULT_DATABASE_ID;

/// Project and database pair every resource name is rooted at.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatabaseId {
    project_id: String,
    database: String,
}

impl DatabaseId {
    pub fn new(project_id: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database: database.into(),
        }
    }

    pub fn default(project_id: impl Into<String>) -> Self {
        Self::new(project_id, DEFAULT_DATABASE_ID)
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn is_default_database(&self) -> bool {
        self.database == DEFAULT_DATABASE_ID
    }

    pub fn with_database(&self, database: impl Into<String>) -> Self {
        Self::new(self.project_id.clone(), database)
    }

    /// `projects/{project}/databases/{database}`
    pub fn database_name(&self) -> String {
        format!(
            "projects/{}/databases/{}",
            self.project_id, self.database
        )
    }
}

impl Display for DatabaseId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.project_id, self.database)
    }
}
