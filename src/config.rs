use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::entity::Actor;
use crate::error::Result;
use crate::remote::{DeleteMode, DEFAULT_PAGE_SIZE};
use crate::store::LoadOptions;

/// Directory holding the config file and the records database.
pub const DASHVIEW_DIR: &str = ".dashview";
const CONFIG_FILE: &str = "config.yaml";

/// Project configuration stored in `.dashview/config.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashConfig {
    /// Default actor for loads and mutations
    pub actor: Option<String>,
    /// Maximum records fetched per collection
    pub page_size: usize,
    /// Show illustrative records when a collection is empty
    pub fixtures: bool,
    pub delete_mode: DeleteMode,
    /// Log filter used when RUST_LOG is not set
    pub log_level: String,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            actor: None,
            page_size: DEFAULT_PAGE_SIZE,
            fixtures: true,
            delete_mode: DeleteMode::Soft,
            log_level: "warn".to_string(),
        }
    }
}

impl DashConfig {
    /// Read the config in `dir`, falling back to defaults when there is none.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&raw)?)
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::write(dir.join(CONFIG_FILE), serde_yaml::to_string(self)?)?;
        Ok(())
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            page_size: self.page_size,
            fixtures: self.fixtures,
        }
    }

    /// An explicit actor wins over the configured one. Blank ids count as
    /// no actor.
    pub fn resolve_actor(&self, explicit: Option<&str>) -> Option<Actor> {
        explicit
            .or(self.actor.as_deref())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(Actor::new)
    }
}

/// Find the project root by walking up from the current directory looking
/// for `.dashview/`.
pub fn find_project_root() -> Option<PathBuf> {
    let cwd = env::current_dir().ok()?;
    cwd.ancestors()
        .find(|dir| dir.join(DASHVIEW_DIR).is_dir())
        .map(Path::to_path_buf)
}
