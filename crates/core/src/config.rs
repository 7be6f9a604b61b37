use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use directories::{BaseDirs, ProjectDirs};
use once_cell::sync::Lazy;
use reqwest::Url;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000/api";
static DEFAULT_LOG_NAME: &str = "tasklist.log";
static ENV_API_URL: &str = "TASKLIST_API_URL";
static ENV_DATA_DIR: &str = "TASKLIST_DATA_DIR";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

static PROJECT_DIRS: Lazy<Option<ProjectDirs>> =
    Lazy::new(|| ProjectDirs::from("dev", "tasklist", "tasklist"));

#[derive(Debug, Clone)]
pub struct AppConfig {
    api_url: String,
    data_dir: PathBuf,
    log_path: PathBuf,
    request_timeout: Duration,
    search_debounce: Duration,
}

impl AppConfig {
    /// Resolve the API root and data directory from explicit overrides,
    /// environment variables, then platform defaults. The data directory is
    /// created when missing.
    pub fn discover(api_url: Option<String>, data_dir_override: Option<PathBuf>) -> Result<Self> {
        let api_url = resolve_api_url(api_url)?;
        let data_dir = resolve_data_dir(data_dir_override)?;
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).with_context(|| {
                format!("Failed to create data directory at {}", data_dir.display())
            })?;
        }
        Self::new(api_url, data_dir)
    }

    /// Construct [`AppConfig`] from already resolved values.
    pub fn new(api_url: impl Into<String>, data_dir: PathBuf) -> Result<Self> {
        let api_url = validate_api_url(&api_url.into())?;
        let log_path = data_dir.join(DEFAULT_LOG_NAME);
        Ok(Self {
            api_url,
            data_dir,
            log_path,
            request_timeout: REQUEST_TIMEOUT,
            search_debounce: SEARCH_DEBOUNCE,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn search_debounce(&self) -> Duration {
        self.search_debounce
    }
}

fn resolve_api_url(api_url_override: Option<String>) -> Result<String> {
    if let Some(url) = api_url_override {
        return Ok(url);
    }

    match env::var(ENV_API_URL) {
        Ok(url) if !url.trim().is_empty() => Ok(url),
        _ => Ok(DEFAULT_API_URL.to_string()),
    }
}

fn validate_api_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).with_context(|| format!("Invalid API url '{}'", trimmed))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(anyhow!(
            "API url '{}' must use http or https, not '{}'",
            trimmed,
            url.scheme()
        ));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

fn resolve_data_dir(data_dir_override: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = data_dir_override {
        return Ok(dir);
    }

    if let Ok(env_dir) = env::var(ENV_DATA_DIR) {
        return Ok(PathBuf::from(env_dir));
    }

    if let Some(project) = &*PROJECT_DIRS {
        return Ok(project.data_dir().to_path_buf());
    }

    if let Some(base) = BaseDirs::new() {
        return Ok(base.home_dir().join(".tasklist"));
    }

    Ok(env::current_dir()?.join(".tasklist"))
}
