//! Configuration management for Claude Report
//!
//! Loads settings from TOML file at ~/.claude-report/config.toml

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Input and output locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Analysis pipeline tuning
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// PDF renderer configuration
    #[serde(default)]
    pub render: RenderConfig,

    /// AI feature configuration
    #[serde(default)]
    pub ai: AiConfig,

    /// Log output configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server port (default: 3001)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Server host (default: 127.0.0.1 - localhost only)
    #[serde(default = "default_host")]
    pub host: String,

    /// Optional API key for authentication
    /// Required in Authorization header if set: "Authorization: Bearer <key>"
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_port() -> u16 {
    3001
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: default_port(),
            host: default_host(),
            api_key: None,
        }
    }
}

/// Where session logs are read from and reports are written to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Claude Code projects directory. When unset, well-known locations are probed.
    #[serde(default)]
    pub projects_dir: Option<PathBuf>,

    /// Directory that receives generated reports
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("./claude-reports")
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            projects_dir: None,
            reports_dir: default_reports_dir(),
        }
    }
}

/// Analysis pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Number of session files analyzed concurrently
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    4
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            concurrency: default_concurrency(),
        }
    }
}

/// Headless browser used for PDF output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Explicit browser binary; detected when unset
    #[serde(default)]
    pub browser: Option<PathBuf>,

    /// Seconds before PDF generation is abandoned
    #[serde(default = "default_render_timeout")]
    pub timeout_secs: u64,
}

fn default_render_timeout() -> u64 {
    60
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            browser: None,
            timeout_secs: default_render_timeout(),
        }
    }
}

/// AI feature configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Whether the AI CLI is called at all (fallback analysis otherwise)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Explicit CLI binary; detected when unset
    #[serde(default)]
    pub command: Option<PathBuf>,

    /// Seconds before a session analysis call is abandoned
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,

    /// Maximum concurrent AI CLI invocations
    #[serde(default = "default_ai_concurrency")]
    pub max_concurrent: usize,
}

fn default_true() -> bool {
    true
}

fn default_ai_timeout() -> u64 {
    120
}

fn default_ai_concurrency() -> usize {
    2
}

impl Default for AiConfig {
    fn default() -> Self {
        AiConfig {
            enabled: true,
            command: None,
            timeout_secs: default_ai_timeout(),
            max_concurrent: default_ai_concurrency(),
        }
    }
}

/// Log output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for daily-rolling log files; stderr only when unset
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig::default(),
            paths: PathsConfig::default(),
            analysis: AnalysisConfig::default(),
            render: RenderConfig::default(),
            ai: AiConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let expanded_path = expand_path(path.as_ref());

        if !expanded_path.exists() {
            return Err(CoreError::Config(format!(
                "Configuration file not found: {}",
                expanded_path.display()
            )));
        }

        let content = std::fs::read_to_string(&expanded_path)?;
        let config: Config = toml::from_str(&content)?;

        Ok(config)
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|p| p.join(".claude-report").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".claude-report/config.toml"))
    }

    /// Reports directory, expanding ~ if present
    pub fn reports_dir(&self) -> PathBuf {
        expand_path(&self.paths.reports_dir)
    }

    /// Configured projects directory, or the first well-known location that exists.
    /// Falls back to the first candidate so callers always get a path to report.
    pub fn projects_dir(&self) -> PathBuf {
        if let Some(dir) = &self.paths.projects_dir {
            return expand_path(dir);
        }
        let candidates = candidate_projects_dirs();
        candidates
            .iter()
            .find(|p| p.is_dir())
            .or_else(|| candidates.first())
            .cloned()
            .unwrap_or_else(|| PathBuf::from("projects"))
    }

    /// Get the server socket address
    pub fn server_addr(&self) -> SocketAddr {
        use std::net::ToSocketAddrs;

        format!("{}:{}", self.server.host, self.server.port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], self.server.port)))
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CoreError::Config(format!("Failed to serialize config: {}", e)))?;
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("CLAUDE_REPORT_HOST") {
            self.server.host = host;
        }
        let port = std::env::var("CLAUDE_REPORT_PORT").or_else(|_| std::env::var("PORT"));
        if let Ok(port) = port {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(key) = std::env::var("CLAUDE_REPORT_API_KEY") {
            self.server.api_key = if key.is_empty() { None } else { Some(key) };
        }
        if let Ok(dir) = std::env::var("CLAUDE_CODE_PROJECTS_PATH") {
            if !dir.is_empty() {
                self.paths.projects_dir = Some(PathBuf::from(dir));
            }
        }
        if let Ok(dir) = std::env::var("REPORTS_DIR") {
            if !dir.is_empty() {
                self.paths.reports_dir = PathBuf::from(dir);
            }
        }
    }

    /// Create a default configuration file at the given path
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let content = r#"# Claude Report Configuration

[server]
# Port to listen on (default: 3001)
port = 3001

# Host to bind to
# "127.0.0.1" = localhost only (recommended)
# "0.0.0.0" = all interfaces (use with api_key!)
host = "127.0.0.1"

# Optional API key for authentication
# If set, clients must send: Authorization: Bearer <api_key>
# api_key = "your-secret-key"

[paths]
# Claude Code projects directory (probed when unset)
# projects_dir = "~/.claude/projects"
reports_dir = "./claude-reports"

[analysis]
# Session files analyzed at the same time
concurrency = 4

[render]
# Chromium-family browser used for PDF output (detected when unset)
# browser = "/usr/bin/chromium"
timeout_secs = 60

[ai]
# Call the Claude CLI for AI analysis; statistics-only fallback otherwise
enabled = true
# command = "~/.local/bin/claude"
timeout_secs = 120
max_concurrent = 2

[logging]
# Write daily-rolling log files here in addition to stderr
# dir = "~/.claude-report/logs"
"#;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;

        Ok(())
    }
}

/// Well-known Claude Code project directories, in probe order
pub fn candidate_projects_dirs() -> Vec<PathBuf> {
    let Some(home) = dirs::home_dir() else {
        return Vec::new();
    };
    vec![
        home.join(".claude").join("projects"),
        home.join(".config").join("claude-code").join("projects"),
        home.join("Library")
            .join("Application Support")
            .join("Claude")
            .join("claude-code")
            .join("projects"),
    ]
}

/// Expand ~ to home directory in paths
pub fn expand_path(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}
