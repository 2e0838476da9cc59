//! Application state: record store, achievement ledger, content tree and search
//! index, catalog and the current session.
//!
//! The store and ledger share one lock so every read-modify-write (bookmark
//! toggle, visit, unlock append) is serialized within this process.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, Utc};
use tokio::sync::RwLock;
use tracing::{info, instrument};

use crate::achievements::{dedup_catalog, AchievementDef, AchievementLedger};
use crate::config::{load_optional, load_study_config, Settings};
use crate::domain::Subject;
use crate::error::ConfigError;
use crate::search::SearchIndex;
use crate::seeds::{default_catalog, seed_subjects};
use crate::session::SessionContext;
use crate::store::{FileStore, MemoryStore, RecordStore};

/// User the startup session belongs to until someone logs in.
pub const LOCAL_USER: &str = "local";

pub struct Progress {
    pub store: Box<dyn RecordStore>,
    pub ledger: AchievementLedger,
}

pub struct Content {
    pub subjects: Vec<Subject>,
    pub index: SearchIndex,
}

impl Content {
    fn new(subjects: Vec<Subject>) -> Self {
        let index = SearchIndex::build(&subjects);
        Self { subjects, index }
    }

    /// Display name of a subject key, falling back to the key itself.
    pub fn subject_name(&self, key: &str) -> String {
        self.subjects
            .iter()
            .find(|s| s.key == key)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| key.to_string())
    }

    /// Title of a dotpoint in the tree, if it is there.
    pub fn dotpoint_title(&self, subject: &str, module: u32, dotpoint: &str) -> Option<String> {
        self.subjects
            .iter()
            .filter(|s| s.key == subject)
            .flat_map(|s| s.modules.iter())
            .filter(|m| m.number == module)
            .flat_map(|m| m.inquiry_questions.iter())
            .flat_map(|q| q.dotpoints.iter())
            .find(|d| d.id == dotpoint)
            .map(|d| d.title.clone())
    }
}

#[derive(Clone)]
pub struct AppState {
    pub progress: Arc<RwLock<Progress>>,
    pub content: Arc<RwLock<Content>>,
    pub catalog: Arc<Vec<AchievementDef>>,
    pub session: Arc<RwLock<Option<SessionContext>>>,
    pub config_path: Option<PathBuf>,
}

impl AppState {
    /// Build state from settings: load config, open the store, build the index,
    /// and start the local session.
    #[instrument(level = "info", skip_all)]
    pub fn new(settings: &Settings) -> Self {
        let cfg = load_optional(settings.config_path.as_deref());

        let store: Box<dyn RecordStore> = match &settings.store_path {
            Some(path) => Box::new(FileStore::open(path)),
            None => {
                info!(target: "hsc_backend", "STORE_PATH not set; progress is kept in memory only");
                Box::new(MemoryStore::new())
            }
        };

        let (subjects, catalog) = match cfg {
            Some(c) => {
                let subjects = if c.subjects.is_empty() { seed_subjects() } else { c.subjects };
                let catalog = if c.achievements.is_empty() { default_catalog() } else { c.achievements };
                (subjects, catalog)
            }
            None => (seed_subjects(), default_catalog()),
        };

        let mut state = Self::with_parts(store, subjects, catalog);
        state.config_path = settings.config_path.clone();
        state
    }

    /// State over explicit parts, with a fresh session for `LOCAL_USER`.
    pub fn with_parts(store: Box<dyn RecordStore>, subjects: Vec<Subject>, catalog: Vec<AchievementDef>) -> Self {
        let ledger = AchievementLedger::load(&*store);
        let catalog = dedup_catalog(catalog);
        info!(
            target: "hsc_backend",
            achievements = catalog.len(),
            unlocked = ledger.records().len(),
            "Achievement catalog ready"
        );

        Self {
            progress: Arc::new(RwLock::new(Progress { store, ledger })),
            content: Arc::new(RwLock::new(Content::new(subjects))),
            catalog: Arc::new(catalog),
            session: Arc::new(RwLock::new(Some(SessionContext::start(LOCAL_USER, Utc::now())))),
            config_path: None,
        }
    }

    /// In-memory state with seed content.
    pub fn in_memory() -> Self {
        Self::with_parts(Box::new(MemoryStore::new()), seed_subjects(), default_catalog())
    }

    pub fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    /// Today's date as the student sees it.
    pub fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    /// Re-read the content tree and rebuild the search index. On error the
    /// current tree stays in place.
    #[instrument(level = "info", skip(self))]
    pub async fn reload_content(&self) -> Result<usize, ConfigError> {
        let subjects = match &self.config_path {
            Some(path) => {
                let cfg = load_study_config(path)?;
                if cfg.subjects.is_empty() { seed_subjects() } else { cfg.subjects }
            }
            None => seed_subjects(),
        };
        let fresh = Content::new(subjects);
        let entries = fresh.index.len();
        *self.content.write().await = fresh;
        info!(target: "search", entries, "Content tree reloaded");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_content_lookups() {
        let content = Content::new(seed_subjects());
        assert_eq!(content.subject_name("biology"), "Biology");
        assert_eq!(content.subject_name("latin"), "latin");
        assert_eq!(content.dotpoint_title("biology", 5, "BIO-5-2-1").as_deref(), Some("Mitosis"));
        assert!(content.dotpoint_title("biology", 6, "BIO-5-2-1").is_none());
    }

    #[tokio::test]
    async fn test_reload_picks_up_new_tree() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"
            [[subjects]]
            key = "physics"
            name = "Physics"
            [[subjects.modules]]
            number = 7
            name = "The Nature of Light"
            [[subjects.modules.inquiry_questions]]
            title = "What is light?"
            [[subjects.modules.inquiry_questions.dotpoints]]
            id = "PHY-7-1"
            title = "Electromagnetic spectrum"
            has_content = true
            "#,
        )
        .unwrap();

        let mut state = AppState::in_memory();
        state.config_path = Some(file.path().to_path_buf());

        assert_eq!(state.reload_content().await.unwrap(), 1);
        let content = state.content.read().await;
        assert_eq!(content.subject_name("physics"), "Physics");
        assert!(!content.index.search("spectrum", &Default::default()).is_empty());
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_old_tree() {
        let mut state = AppState::in_memory();
        state.config_path = Some(PathBuf::from("/no/such/config.toml"));
        let before = state.content.read().await.index.len();

        assert!(state.reload_content().await.is_err());
        assert_eq!(state.content.read().await.index.len(), before);
    }
}
