use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// Runtime configuration: defaults, then an optional YAML file, then `LUMI_*`
/// environment variables. CLI flags are applied by the caller last.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Output directory for reports and artifacts
    pub output_dir: PathBuf,
    pub api: ApiConfig,
    pub appium: AppiumConfig,
    pub web: WebConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ApiConfig {
    pub base_url: String,
    /// Per-request timeout (seconds)
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AppiumConfig {
    pub server_url: String,
    /// W3C capabilities sent as `alwaysMatch`
    pub capabilities: Value,
    /// HTTP timeout for a single WebDriver command (seconds)
    pub command_timeout_secs: u64,
    /// Pause after launch before the first interaction (ms)
    pub settle_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct WebConfig {
    pub base_url: String,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub action_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./output"),
            api: ApiConfig::default(),
            appium: AppiumConfig::default(),
            web: WebConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://jsonplaceholder.typicode.com".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for AppiumConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:4723/wd/hub".to_string(),
            capabilities: json!({
                "platformName": "Android",
                "appium:platformVersion": "11.0",
                "appium:deviceName": "Pixel_5_API_30",
                "appium:automationName": "UiAutomator2",
                "appium:appPackage": "com.wdiodemoapp",
                "appium:appActivity": ".MainActivity",
                "appium:noReset": false,
                "appium:fullReset": false,
                "appium:newCommandTimeout": 30000,
                "appium:autoGrantPermissions": true
            }),
            command_timeout_secs: 60,
            settle_ms: 3000,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.demoblaze.com".to_string(),
            headless: true,
            viewport_width: 1920,
            viewport_height: 1080,
            action_timeout_ms: 10_000,
        }
    }
}

impl Config {
    /// Load defaults, overlay the YAML file if given, then the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                Self::from_yaml(&text)
                    .with_context(|| format!("Invalid config {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Apply `LUMI_*` overrides using the given variable lookup
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("LUMI_API_BASE_URL") {
            self.api.base_url = url;
        }
        if let Some(url) = lookup("LUMI_APPIUM_URL") {
            self.appium.server_url = url;
        }
        if let Some(url) = lookup("LUMI_WEB_BASE_URL") {
            self.web.base_url = url;
        }
        if let Some(flag) = lookup("LUMI_HEADLESS") {
            self.web.headless = flag == "true" || flag == "1";
        }
        if let Some(dir) = lookup("LUMI_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "https://jsonplaceholder.typicode.com");
        assert_eq!(config.appium.server_url, "http://localhost:4723/wd/hub");
        assert_eq!(
            config.appium.capabilities["appium:appPackage"],
            "com.wdiodemoapp"
        );
        assert_eq!(config.web.viewport_width, 1920);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml(
            "outputDir: ./reports\napi:\n  baseUrl: http://localhost:3000\nweb:\n  headless: false\n",
        )
        .unwrap();
        assert_eq!(config.output_dir, PathBuf::from("./reports"));
        assert_eq!(config.api.base_url, "http://localhost:3000");
        assert_eq!(config.api.timeout_secs, 30);
        assert!(!config.web.headless);
        assert_eq!(config.web.base_url, "https://www.demoblaze.com");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("LUMI_APPIUM_URL", "http://device-farm:4723"),
            ("LUMI_HEADLESS", "0"),
            ("LUMI_OUTPUT_DIR", "/tmp/qa"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.appium.server_url, "http://device-farm:4723");
        assert!(!config.web.headless);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/qa"));
        assert_eq!(config.api.base_url, ApiConfig::default().base_url);
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(Config::load(Some(Path::new("/nonexistent/lumi.yaml"))).is_err());
    }
}
