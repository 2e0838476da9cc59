//! Study configuration: the content tree and an optional achievement catalog, from TOML.
//!
//! Expected schema:
//!
//! ```toml
//! [[subjects]]
//! key = "biology"
//! name = "Biology"
//!
//! [[subjects.modules]]
//! number = 5
//! name = "Module 5: Heredity"
//!
//! [[subjects.modules.inquiry_questions]]
//! title = "How does reproduction ensure the continuity of a species?"
//!
//! [[subjects.modules.inquiry_questions.dotpoints]]
//! id = "BIO-5-1-1"
//! title = "Sexual and asexual reproduction"
//! has_content = true
//!
//! [[achievements]]
//! id = "bookworm"
//! name = "Bookworm"
//! category = "exploration"
//! xp_reward = 15
//! conditions = [{ field = "bookmarks", op = "at_least", value = 5 }]
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{error, info};

use crate::achievements::AchievementDef;
use crate::domain::Subject;
use crate::error::ConfigError;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct StudyConfig {
  #[serde(default)]
  pub subjects: Vec<Subject>,
  /// Replaces the built-in catalog when non-empty.
  #[serde(default)]
  pub achievements: Vec<AchievementDef>,
}

/// Process settings read from the environment.
#[derive(Clone, Debug)]
pub struct Settings {
  pub addr: SocketAddr,
  pub config_path: Option<PathBuf>,
  pub store_path: Option<PathBuf>,
}

impl Settings {
  pub fn from_env() -> Self {
    let port = std::env::var("PORT")
      .ok()
      .and_then(|p| p.parse::<u16>().ok())
      .unwrap_or(3000);
    Self {
      addr: SocketAddr::from(([0, 0, 0, 0], port)),
      config_path: std::env::var_os("STUDY_CONFIG_PATH").map(PathBuf::from),
      store_path: std::env::var_os("STORE_PATH").map(PathBuf::from),
    }
  }
}

pub fn load_study_config(path: &Path) -> Result<StudyConfig, ConfigError> {
  let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
    path: path.display().to_string(),
    source,
  })?;
  let cfg = toml::from_str::<StudyConfig>(&s).map_err(|source| ConfigError::Parse {
    path: path.display().to_string(),
    source,
  })?;
  info!(target: "hsc_backend", path = %path.display(), subjects = cfg.subjects.len(), achievements = cfg.achievements.len(), "Loaded study config (TOML)");
  Ok(cfg)
}

/// Load the config at `path` if one is set. Any error is logged and yields `None`,
/// so startup falls back to built-in seeds.
pub fn load_optional(path: Option<&Path>) -> Option<StudyConfig> {
  let path = path?;
  match load_study_config(path) {
    Ok(cfg) => Some(cfg),
    Err(e) => {
      error!(target: "hsc_backend", error = %e, "Falling back to built-in content");
      None
    }
  }
}
