//! Configuration loading from disk or a remote URL.

use crate::config::schema::GatewayConfig;
use crate::error::ConfigError;

/// Load and validate configuration.
///
/// `source` is either a local file path or an `http(s)://` URL serving the
/// JSON document.
pub async fn load_config(source: &str) -> Result<GatewayConfig, ConfigError> {
    let raw = if source.starts_with("http://") || source.starts_with("https://") {
        reqwest::get(source)
            .await?
            .error_for_status()?
            .text()
            .await?
    } else {
        tokio::fs::read_to_string(source).await?
    };

    let config: GatewayConfig = serde_json::from_str(&raw)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = std::env::temp_dir().join("gateway-loader-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(
            &path,
            r#"{ "listen": "127.0.0.1:8080", "routes": { "/svc": ["noop"] } }"#,
        )
        .unwrap();

        let config = load_config(path.to_str().unwrap()).await.unwrap();
        assert_eq!(config.listen, "127.0.0.1:8080");
        assert_eq!(config.routes.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let result = load_config("/definitely/not/here.json").await;
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[tokio::test]
    async fn test_malformed_json_is_parse_error() {
        let dir = std::env::temp_dir().join("gateway-loader-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        let result = load_config(path.to_str().unwrap()).await;
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
