//! Client and preview configuration
//!
//! Both HTTP clients take an explicit timeout; nothing relies on the
//! transport's defaults.

use clap::Args;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Desktop browser UA. Many shops reject or degrade markup for unknown clients.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Endpoint paths on the application's auth and gift API
pub mod paths {
    pub const REFRESH: &str = "/api/auth/refresh";
    pub const LOGIN: &str = "/api/auth/login";
    pub const REGISTER: &str = "/api/auth/register";
    pub const LOGOUT: &str = "/api/auth/logout";
    pub const GIFTS: &str = "/api/gifts";
    pub const PUBLIC_GIFTS: &str = "/api/gifts/public";
}

/// Settings for the token manager and gift client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL that relative request paths resolve against
    pub base_url: Url,
    /// Per-request timeout
    pub timeout: Duration,
    /// Where the user is sent after a failed refresh
    pub sign_in_path: String,
}

impl ClientConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(15),
            sign_in_path: "/login".to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve an absolute URL or a path relative to the base URL
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(path)
    }

    pub fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder().timeout(self.timeout).build()
    }
}

/// Settings for the link-preview fetcher
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

impl PreviewConfig {
    pub fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.timeout)
            .build()
    }
}

/// Global options shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Base URL of the wish-list application
    #[arg(long, global = true, env = "GIFTLIST_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: Url,

    /// Request timeout in milliseconds
    #[arg(long, global = true, env = "GIFTLIST_TIMEOUT", default_value = "15000")]
    pub timeout: u64,

    /// File holding the stored access/refresh tokens
    #[arg(long, global = true, env = "GIFTLIST_CREDENTIALS", default_value = "credentials.json")]
    pub credentials: PathBuf,
}

impl ConfigArgs {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.base_url.clone()).with_timeout(Duration::from_millis(self.timeout))
    }

    pub fn preview_config(&self) -> PreviewConfig {
        PreviewConfig {
            timeout: Duration::from_millis(self.timeout),
            ..PreviewConfig::default()
        }
    }
}
