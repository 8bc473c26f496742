use serde::{Deserialize, Serialize};

pub use multimodal_av::ToolsConfig;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FetchConfig {
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// MIME globs accepted by generic binary fetches (default: everything)
    #[serde(default = "default_allowed_mime")]
    pub allowed_mime: Vec<String>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("multimodal/{}", env!("CARGO_PKG_VERSION"))
}

fn default_allowed_mime() -> Vec<String> {
    vec!["*".to_string()]
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            allowed_mime: default_allowed_mime(),
        }
    }
}
