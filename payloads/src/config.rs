/// Where the client sends requests when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Environment variable holding the backend base URL, including the `/api`
/// prefix.
pub const API_URL_VAR: &str = "PORTAL_API_URL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_value(std::env::var(API_URL_VAR).ok())
    }

    fn from_value(value: Option<String>) -> Self {
        let base_url = value
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Self { base_url }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_local_development_url() {
        assert_eq!(ClientConfig::from_value(None).base_url, DEFAULT_API_URL);
        assert_eq!(
            ClientConfig::from_value(Some("  ".into())).base_url,
            DEFAULT_API_URL
        );
    }

    #[test]
    fn strips_trailing_slash() {
        let config =
            ClientConfig::from_value(Some("https://portal.test/api/".into()));
        assert_eq!(config.base_url, "https://portal.test/api");
    }
}
