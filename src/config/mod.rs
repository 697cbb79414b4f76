//! Layered configuration: a user-global file, a project-shared file, and a
//! project-local override, merged in that order. Permission/policy fields
//! and API keys are snapshotted from the user-global layer before project
//! layers are merged in, and restored afterward — a cloned repository
//! cannot weaken the sandbox or inject its own credentials via committed
//! config.

use crate::tool::ToolMode;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Permission configuration (loaded from config file).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PermissionConfig {
    /// Default mode (read, write, agi). Default: write.
    pub default_mode: Option<String>,
    /// Allow operations outside the working directory. Default: false.
    pub allow_outside_cwd: Option<bool>,
}

impl PermissionConfig {
    #[must_use]
    pub fn mode(&self) -> ToolMode {
        match self
            .default_mode
            .as_deref()
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("read") => ToolMode::Read,
            Some("agi") => ToolMode::Agi,
            Some("write") | None => ToolMode::Write,
            Some(other) => {
                tracing::warn!("Unknown permission mode '{other}', defaulting to write");
                ToolMode::Write
            }
        }
    }
}

/// Optional API keys (fallback when env vars not set). Only ever read from
/// the user-global config layer; never merged in from a project config.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ApiKeys {
    pub openrouter: Option<String>,
    pub anthropic: Option<String>,
    pub openai: Option<String>,
    pub google: Option<String>,
    pub groq: Option<String>,
    /// The single configured HTTP search provider's key (see `webSearch`'s
    /// resolved Open Question: one provider, no fallback chain).
    pub brave_search: Option<String>,
}

impl ApiKeys {
    #[must_use]
    pub fn get(&self, provider: &str) -> Option<&str> {
        match provider {
            "openrouter" => self.openrouter.as_deref(),
            "anthropic" => self.anthropic.as_deref(),
            "openai" => self.openai.as_deref(),
            "google" => self.google.as_deref(),
            "groq" => self.groq.as_deref(),
            "brave_search" => self.brave_search.as_deref(),
            _ => None,
        }
    }
}

/// Retry/stall/deadline knobs for the model adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub max_retries: u32,
    pub stall_timeout_secs: u64,
    pub step_deadline_secs: u64,
    pub chunk_deadline_secs: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            max_retries: 5,
            stall_timeout_secs: 90,
            step_deadline_secs: 300,
            chunk_deadline_secs: 60,
        }
    }
}

/// Whether a failed harness extension (e.g. an unreachable telemetry sink)
/// merely logs a warning (`ReportOnly`) or fails the turn (`Strict`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum HarnessMode {
    #[default]
    ReportOnly,
    Strict,
}

/// Immutable per session after open. Loaded once by [`AgentConfig::load`]
/// and shared read-only by every `TurnContext` and `ToolRuntime` the
/// session creates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub provider: Option<String>,
    #[serde(alias = "default_model")]
    pub model: Option<String>,
    /// Falls back to `model` when unset.
    pub sub_agent_model: Option<String>,

    pub working_directory: PathBuf,
    pub output_directory: PathBuf,
    pub uploads_directory: PathBuf,
    /// Workspace-scoped state root, e.g. `<workingDirectory>/.coworker`.
    pub project_agent_dir: PathBuf,
    /// User-scoped state root, e.g. `~/.coworker`.
    pub user_agent_dir: PathBuf,

    pub skills_dirs: Vec<PathBuf>,
    pub memory_dirs: Vec<PathBuf>,
    pub config_dirs: Vec<PathBuf>,

    /// Opaque per-provider options, passed through to the model adapter
    /// verbatim.
    pub provider_options: HashMap<String, serde_json::Value>,
    pub model_settings: ModelSettings,
    pub harness_mode: HarnessMode,

    pub api_keys: ApiKeys,
    pub permissions: PermissionConfig,

    /// Extra instructions appended to the default system prompt.
    pub instructions: Option<String>,
    /// Full system prompt override (replaces default entirely).
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        let working_directory = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let user_agent_dir = user_agent_dir();
        let project_agent_dir = working_directory.join(".coworker");
        Self {
            provider: None,
            model: None,
            sub_agent_model: None,
            output_directory: project_agent_dir.join("output"),
            uploads_directory: project_agent_dir.join("uploads"),
            skills_dirs: vec![project_agent_dir.join("skills"), user_agent_dir.join("skills")],
            memory_dirs: vec![project_agent_dir.join("memory"), user_agent_dir.join("memory")],
            config_dirs: vec![project_agent_dir.clone(), user_agent_dir.clone()],
            working_directory,
            project_agent_dir,
            user_agent_dir,
            provider_options: HashMap::new(),
            model_settings: ModelSettings::default(),
            harness_mode: HarnessMode::default(),
            api_keys: ApiKeys::default(),
            permissions: PermissionConfig::default(),
            instructions: None,
            system_prompt: None,
        }
    }
}

impl AgentConfig {
    #[must_use]
    pub fn needs_setup(&self) -> bool {
        self.provider.is_none() || self.model.is_none()
    }

    /// The model to use for `spawnAgent` sub-calls, falling back to the
    /// turn's primary model.
    #[must_use]
    pub fn sub_agent_model(&self) -> Option<&str> {
        self.sub_agent_model.as_deref().or(self.model.as_deref())
    }

    /// Priority: config file (explicit user configuration) > env var.
    #[must_use]
    pub fn api_key_for(&self, provider: &str) -> Option<String> {
        if provider == "local" || provider == "ollama" {
            return Some(String::new());
        }

        if let Some(key) = self.api_keys.get(provider) {
            return Some(key.to_string());
        }

        let env_vars: &[&str] = match provider {
            "openrouter" => &["OPENROUTER_API_KEY"],
            "anthropic" => &["ANTHROPIC_API_KEY"],
            "openai" => &["OPENAI_API_KEY"],
            "google" => &["GOOGLE_API_KEY", "GEMINI_API_KEY"],
            "groq" => &["GROQ_API_KEY"],
            "brave_search" => &["BRAVE_SEARCH_API_KEY"],
            _ => return None,
        };

        for var in env_vars {
            if let Ok(key) = std::env::var(var)
                && !key.is_empty()
            {
                return Some(key);
            }
        }

        None
    }

    /// The configured web-search provider's key, if any — config file first,
    /// then environment variable. `None` means `webSearch` is disabled.
    #[must_use]
    pub fn web_search_api_key(&self) -> Option<String> {
        self.api_key_for("brave_search")
    }

    /// All directories every tool's `PathGate` must see as readable.
    #[must_use]
    pub fn allowed_read_roots(&self) -> Vec<PathBuf> {
        let mut roots = vec![
            self.working_directory.clone(),
            self.output_directory.clone(),
            self.uploads_directory.clone(),
            self.project_agent_dir.clone(),
            self.user_agent_dir.clone(),
        ];
        roots.extend(self.skills_dirs.iter().cloned());
        roots.extend(self.memory_dirs.iter().cloned());
        roots.extend(self.config_dirs.iter().cloned());
        roots
    }

    /// Write roots are a strict subset of read roots: never the user dir or
    /// any built-in/installed skill or config directory.
    #[must_use]
    pub fn allowed_write_roots(&self) -> Vec<PathBuf> {
        vec![
            self.working_directory.clone(),
            self.output_directory.clone(),
            self.uploads_directory.clone(),
            self.project_agent_dir.clone(),
        ]
    }

    /// Create every agent-owned directory so tools never fail on a missing
    /// parent. Must run before any tool executes.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.output_directory)?;
        std::fs::create_dir_all(&self.uploads_directory)?;
        std::fs::create_dir_all(&self.project_agent_dir)?;
        std::fs::create_dir_all(&self.user_agent_dir)?;
        for dir in self.skills_dirs.iter().chain(&self.memory_dirs).chain(&self.config_dirs) {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Load configuration with layered precedence: user-global, then
    /// project-shared, then project-local. `working_directory` is
    /// canonicalized up front so every directory derived from it is
    /// absolute, per the data model invariant.
    pub fn load(working_directory: &Path) -> anyhow::Result<Self> {
        let working_directory = working_directory
            .canonicalize()
            .with_context(|| format!("canonicalizing {}", working_directory.display()))?;

        let mut config = Self {
            working_directory: working_directory.clone(),
            project_agent_dir: working_directory.join(".coworker"),
            ..Self::default()
        };
        config.output_directory = config.project_agent_dir.join("output");
        config.uploads_directory = config.project_agent_dir.join("uploads");
        config.skills_dirs = vec![
            config.project_agent_dir.join("skills"),
            config.user_agent_dir.join("skills"),
        ];
        config.memory_dirs = vec![
            config.project_agent_dir.join("memory"),
            config.user_agent_dir.join("memory"),
        ];
        config.config_dirs = vec![config.project_agent_dir.clone(), config.user_agent_dir.clone()];

        let user_config = config.user_agent_dir.join("config.toml");
        if user_config.exists() {
            config.merge_from_file(&user_config)?;
        }

        // Snapshot security-sensitive fields: only the user-global layer
        // may define these. A project config could otherwise weaken the
        // sandbox or smuggle in its own API keys.
        let user_permissions = config.permissions.clone();
        let user_api_keys = config.api_keys.clone();

        let project_config = config.project_agent_dir.join("config.toml");
        if project_config.exists() {
            config.merge_from_file(&project_config)?;
        }

        let local_config = config.project_agent_dir.join("config.local.toml");
        if local_config.exists() {
            config.merge_from_file(&local_config)?;
        }

        config.permissions = user_permissions;
        config.api_keys = user_api_keys;

        config.ensure_directories()?;

        Ok(config)
    }

    fn merge_from_file(&mut self, path: &Path) -> anyhow::Result<()> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let other: Self = toml::from_str(&content)
            .with_context(|| format!("parsing config from {}", path.display()))?;
        self.merge(other);
        Ok(())
    }

    fn merge(&mut self, other: Self) {
        if other.provider.is_some() {
            self.provider = other.provider;
        }
        if other.model.is_some() {
            self.model = other.model;
        }
        if other.sub_agent_model.is_some() {
            self.sub_agent_model = other.sub_agent_model;
        }
        if other.api_keys.openrouter.is_some() {
            self.api_keys.openrouter = other.api_keys.openrouter;
        }
        if other.api_keys.anthropic.is_some() {
            self.api_keys.anthropic = other.api_keys.anthropic;
        }
        if other.api_keys.openai.is_some() {
            self.api_keys.openai = other.api_keys.openai;
        }
        if other.api_keys.google.is_some() {
            self.api_keys.google = other.api_keys.google;
        }
        if other.api_keys.groq.is_some() {
            self.api_keys.groq = other.api_keys.groq;
        }
        if other.api_keys.brave_search.is_some() {
            self.api_keys.brave_search = other.api_keys.brave_search;
        }
        if !other.provider_options.is_empty() {
            self.provider_options.extend(other.provider_options);
        }
        if other.permissions.default_mode.is_some() {
            self.permissions.default_mode = other.permissions.default_mode;
        }
        if other.permissions.allow_outside_cwd.is_some() {
            self.permissions.allow_outside_cwd = other.permissions.allow_outside_cwd;
        }
        if other.instructions.is_some() {
            self.instructions = other.instructions;
        }
        if other.system_prompt.is_some() {
            self.system_prompt = other.system_prompt;
        }
    }

    /// A config with its directories created under the OS temp dir, for
    /// use in tests that need a working `ToolContext`.
    #[cfg(test)]
    #[must_use]
    pub fn for_tests() -> Self {
        let root = std::env::temp_dir().join(format!("coworker-test-{}", uuid::Uuid::new_v4()));
        let working_directory = root.join("work");
        let project_agent_dir = working_directory.join(".coworker");
        let user_agent_dir = root.join("user");
        let config = Self {
            provider: Some("anthropic".into()),
            model: Some("test-model".into()),
            output_directory: project_agent_dir.join("output"),
            uploads_directory: project_agent_dir.join("uploads"),
            skills_dirs: vec![project_agent_dir.join("skills"), user_agent_dir.join("skills")],
            memory_dirs: vec![project_agent_dir.join("memory"), user_agent_dir.join("memory")],
            config_dirs: vec![project_agent_dir.clone(), user_agent_dir.clone()],
            working_directory,
            project_agent_dir,
            user_agent_dir,
            ..Self::default()
        };
        std::fs::create_dir_all(&config.working_directory).expect("create test working dir");
        config.ensure_directories().expect("create test agent dirs");
        config
    }
}

/// User-scoped state root: `~/.coworker/`.
#[must_use]
pub fn user_agent_dir() -> PathBuf {
    dirs::home_dir().map_or_else(|| PathBuf::from(".coworker"), |h| h.join(".coworker"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_needs_setup() {
        let config = AgentConfig::default();
        assert!(config.needs_setup());
    }

    #[test]
    fn write_roots_are_subset_of_read_roots() {
        let config = AgentConfig::for_tests();
        let read = config.allowed_read_roots();
        for root in config.allowed_write_roots() {
            assert!(read.contains(&root));
        }
        assert!(!config.allowed_write_roots().contains(&config.user_agent_dir));
    }

    #[test]
    fn for_tests_creates_all_directories() {
        let config = AgentConfig::for_tests();
        assert!(config.working_directory.is_dir());
        assert!(config.output_directory.is_dir());
        assert!(config.uploads_directory.is_dir());
        for dir in config.skills_dirs.iter().chain(&config.memory_dirs) {
            assert!(dir.is_dir(), "{dir:?} should exist");
        }
    }

    #[test]
    fn project_config_cannot_override_permissions_or_keys() {
        let mut config = AgentConfig::default();
        config.permissions.default_mode = Some("read".into());
        config.api_keys.anthropic = Some("user-key".into());

        let user_permissions = config.permissions.clone();
        let user_api_keys = config.api_keys.clone();

        let project = AgentConfig {
            permissions: PermissionConfig {
                default_mode: Some("agi".into()),
                allow_outside_cwd: Some(true),
            },
            api_keys: ApiKeys {
                anthropic: Some("attacker-key".into()),
                ..Default::default()
            },
            ..AgentConfig::default()
        };
        config.merge(project);
        assert_eq!(config.permissions.default_mode, Some("agi".into()));

        config.permissions = user_permissions;
        config.api_keys = user_api_keys;
        assert_eq!(config.permissions.default_mode, Some("read".into()));
        assert_eq!(config.api_keys.anthropic, Some("user-key".into()));
    }

    #[test]
    fn instructions_merge() {
        let mut base = AgentConfig::default();
        let other = AgentConfig {
            instructions: Some("Always use tabs".into()),
            ..AgentConfig::default()
        };
        base.merge(other);
        assert_eq!(base.instructions, Some("Always use tabs".into()));
    }
}
