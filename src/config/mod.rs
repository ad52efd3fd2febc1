use crate::component::{CONFIG_COMPONENT, Component, ComponentKind, ConfigProvider};
use crate::context::AppContext;
use anyhow::Context as _;
use async_trait::async_trait;
use dashmap::DashMap;
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Configuration component
///
/// Holds string key/value pairs. Values set explicitly win over values
/// loaded from the environment. With an env prefix such as `APP_`, the
/// variable `APP_HTTP_PORT` becomes the key `http_port` during Initialize.
#[derive(Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
    env_prefix: Option<String>,
}

impl ConfigService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load environment variables starting with `prefix` on Initialize.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    pub fn with_value(self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    pub fn set(&self, key: &str, value: impl Into<String>) {
        self.config.insert(key.to_string(), value.into());
    }

    /// Parse the value under `key`; `Ok(None)` when the key is absent.
    pub fn get_parsed<T>(&self, key: &str) -> anyhow::Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        self.get(key)
            .map(|raw| {
                raw.parse::<T>()
                    .with_context(|| format!("invalid value for config key '{key}': {raw}"))
            })
            .transpose()
    }

    pub fn len(&self) -> usize {
        self.config.len()
    }

    pub fn is_empty(&self) -> bool {
        self.config.is_empty()
    }

    fn load_env(&self, prefix: &str) -> usize {
        let mut loaded = 0;
        for (key, value) in env::vars() {
            let Some(stripped) = key.strip_prefix(prefix) else {
                continue;
            };
            if stripped.is_empty() {
                continue;
            }
            let key = stripped.to_lowercase();
            if !self.config.contains_key(&key) {
                self.config.insert(key, value);
                loaded += 1;
            }
        }
        loaded
    }
}

#[async_trait]
impl Component for ConfigService {
    fn name(&self) -> &str {
        CONFIG_COMPONENT
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Infrastructure
    }

    async fn initialize(&self, _ctx: &CancellationToken, _app: &AppContext) -> anyhow::Result<()> {
        if let Some(prefix) = &self.env_prefix {
            let loaded = self.load_env(prefix);
            tracing::debug!("Loaded {} config values from {}* variables", loaded, prefix);
        }
        Ok(())
    }
}

impl ConfigProvider for ConfigService {
    fn get(&self, key: &str) -> Option<String> {
        ConfigService::get(self, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AppShared;

    fn context() -> AppContext {
        AppContext::new(&Arc::new(AppShared::new("cfg-test".into(), "0.0.0".into())))
    }

    #[test]
    fn test_get_parsed() {
        let config = ConfigService::new()
            .with_value("port", "8080")
            .with_value("ratio", "not-a-number");

        assert_eq!(config.get_parsed::<u16>("port").unwrap(), Some(8080));
        assert_eq!(config.get_parsed::<u16>("missing").unwrap(), None);

        let err = config.get_parsed::<f64>("ratio").unwrap_err();
        assert!(err.to_string().contains("ratio"));
    }

    #[test]
    fn test_provider_default() {
        let config = ConfigService::new().with_value("mode", "prod");
        let provider: &dyn ConfigProvider = &config;

        assert_eq!(provider.get_or("mode", "dev"), "prod");
        assert_eq!(provider.get_or("region", "eu"), "eu");
    }

    #[tokio::test]
    async fn test_initialize_loads_prefixed_env() {
        // SAFETY: the variable name is unique to this test.
        unsafe {
            env::set_var("ARMATURE_CFG_TEST_LISTEN_ADDR", "0.0.0.0:9000");
            env::set_var("ARMATURE_CFG_TEST_MODE", "env");
        }

        let config = ConfigService::new()
            .with_env_prefix("ARMATURE_CFG_TEST_")
            .with_value("mode", "explicit");
        config
            .initialize(&CancellationToken::new(), &context())
            .await
            .unwrap();

        assert_eq!(config.get("listen_addr").as_deref(), Some("0.0.0.0:9000"));
        assert_eq!(config.get("mode").as_deref(), Some("explicit"));
    }
}
