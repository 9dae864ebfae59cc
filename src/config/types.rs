use serde::Deserialize;

/// Main configuration structure for Library Harvest
///
/// Every section is optional in the TOML file; missing values fall back to
/// the defaults of the public tululu.org catalog.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub http: HttpConfig,
    pub retry: RetryConfig,
    pub run: RunConfig,
    pub output: OutputConfig,
}

/// Remote catalog location
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Root URL of the library site
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Numeric id of the catalog category to walk
    #[serde(rename = "category-id")]
    pub category_id: u32,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://tululu.org/".to_string(),
            category_id: 55,
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Whole-request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("library-harvest/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// Connection-failure retry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Fixed wait before retrying after a connection failure (seconds)
    #[serde(rename = "backoff-secs")]
    pub backoff_secs: u64,

    /// Maximum attempts per book or page; 0 retries forever
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff_secs: 30,
            max_attempts: 0,
        }
    }
}

/// Batch execution configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Number of books processed at the same time
    pub concurrency: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Folder the asset directories are created in; empty means the current directory
    #[serde(rename = "dest-folder")]
    pub dest_folder: String,

    /// Directory (below `dest_folder`) for book texts
    #[serde(rename = "texts-dir")]
    pub texts_dir: String,

    /// Directory (below `dest_folder`) for cover images
    #[serde(rename = "images-dir")]
    pub images_dir: String,

    /// Path of the JSON record set
    #[serde(rename = "records-path")]
    pub records_path: String,

    /// Log file path; empty logs to stderr
    #[serde(rename = "log-path")]
    pub log_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dest_folder: String::new(),
            texts_dir: "books".to_string(),
            images_dir: "images".to_string(),
            records_path: "books_details.json".to_string(),
            log_path: String::new(),
        }
    }
}
