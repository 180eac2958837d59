use std::{sync::Arc, time::Duration};

use crate::{
    analytics::{AnalyticsCollector, AnalyticsStore, NoopAnalyticsCollector},
    Client, Error, Result,
};

/// Configuration for [`Client`].
///
/// Configuration is captured by the client on construction and cannot be changed afterwards. To
/// talk to a different environment, create another client.
///
/// # Examples
/// ```
/// # use std::time::Duration;
/// # use flagsmith::ClientConfig;
/// let client = ClientConfig::from_environment_key("environment-key")
///     .timeout(Duration::from_secs(5))
///     .to_client()
///     .unwrap();
/// ```
pub struct ClientConfig {
    pub(crate) environment_key: String,
    pub(crate) base_url: String,
    pub(crate) timeout: Duration,
    pub(crate) enable_analytics: bool,
    pub(crate) analytics_flush_period: Duration,
    pub(crate) analytics_store: Option<Arc<dyn AnalyticsStore>>,
    pub(crate) analytics_collector: Option<Arc<dyn AnalyticsCollector>>,
}

impl ClientConfig {
    /// Default base URL for API calls.
    pub const DEFAULT_BASE_URL: &'static str = "https://edge.api.flagsmith.com/api/v1";

    /// Default timeout of a single API call.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(15_000);

    /// Default period between analytics uploads.
    pub const DEFAULT_ANALYTICS_FLUSH_PERIOD: Duration = Duration::from_secs(10);

    /// Create a default configuration using the specified environment key.
    ///
    /// ```
    /// # use flagsmith::ClientConfig;
    /// ClientConfig::from_environment_key("environment-key");
    /// ```
    pub fn from_environment_key(environment_key: impl Into<String>) -> Self {
        ClientConfig {
            environment_key: environment_key.into(),
            base_url: Self::DEFAULT_BASE_URL.to_owned(),
            timeout: Self::DEFAULT_TIMEOUT,
            enable_analytics: false,
            analytics_flush_period: Self::DEFAULT_ANALYTICS_FLUSH_PERIOD,
            analytics_store: None,
            analytics_collector: None,
        }
    }

    /// Override base URL for API calls. Only needed for self-hosted Flagsmith.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Timeout applied to every API call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Count flag evaluations and upload them to Flagsmith.
    ///
    /// Requires an [`analytics_store`](Self::analytics_store) and a running Tokio runtime when
    /// [`to_client`](Self::to_client) is called.
    pub fn enable_analytics(mut self, enable: bool) -> Self {
        self.enable_analytics = enable;
        self
    }

    /// Period between analytics uploads.
    pub fn analytics_flush_period(mut self, period: Duration) -> Self {
        self.analytics_flush_period = period;
        self
    }

    /// Storage for evaluation counts that have not been uploaded yet.
    ///
    /// ```
    /// # use flagsmith::{ClientConfig, MemoryAnalyticsStore};
    /// let config = ClientConfig::from_environment_key("environment-key")
    ///     .enable_analytics(true)
    ///     .analytics_store(MemoryAnalyticsStore::new());
    /// ```
    pub fn analytics_store(mut self, store: impl AnalyticsStore + 'static) -> Self {
        self.analytics_store = Some(Arc::new(store));
        self
    }

    /// Use a custom collector for flag evaluations instead of the built-in analytics.
    ///
    /// ```
    /// # use flagsmith::ClientConfig;
    /// let config = ClientConfig::from_environment_key("environment-key")
    ///     .analytics_collector(|feature: &str| println!("evaluated {feature}"));
    /// ```
    pub fn analytics_collector(mut self, collector: impl AnalyticsCollector + 'static) -> Self {
        self.analytics_collector = Some(Arc::new(collector));
        self
    }

    /// Create a new [`Client`] using the specified configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] or [`Error::InvalidBaseUrl`] if the configuration is not
    /// usable.
    pub fn to_client(self) -> Result<Client> {
        Client::new(self)
    }

    /// Check configuration before building a client.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(Error::Configuration("base_url is not set".to_owned()));
        }
        url::Url::parse(&self.base_url).map_err(Error::InvalidBaseUrl)?;

        if self.enable_analytics {
            if self.analytics_store.is_none() {
                return Err(Error::Configuration(
                    "analytics is enabled but no analytics_store is configured".to_owned(),
                ));
            }
            if self.analytics_collector.is_some() {
                return Err(Error::Configuration(
                    "analytics_collector cannot be combined with built-in analytics".to_owned(),
                ));
            }
            if self.analytics_flush_period.is_zero() {
                return Err(Error::Configuration(
                    "analytics_flush_period must be positive".to_owned(),
                ));
            }
        }

        Ok(())
    }

    pub(crate) fn noop_collector() -> Arc<dyn AnalyticsCollector> {
        Arc::new(NoopAnalyticsCollector)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::ClientConfig;
    use crate::{Error, MemoryAnalyticsStore};

    #[test]
    fn defaults() {
        let config = ClientConfig::from_environment_key("key");
        assert_eq!(config.base_url, "https://edge.api.flagsmith.com/api/v1");
        assert_eq!(config.timeout, Duration::from_millis(15_000));
        assert!(!config.enable_analytics);
        assert_eq!(config.analytics_flush_period, Duration::from_secs(10));
    }

    #[test]
    fn analytics_without_store_fails_immediately() {
        let result = ClientConfig::from_environment_key("key")
            .enable_analytics(true)
            .to_client();
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn analytics_disabled_needs_no_store() {
        assert!(ClientConfig::from_environment_key("key").to_client().is_ok());
    }

    #[test]
    fn analytics_with_zero_flush_period_fails() {
        let result = ClientConfig::from_environment_key("key")
            .enable_analytics(true)
            .analytics_store(MemoryAnalyticsStore::new())
            .analytics_flush_period(Duration::ZERO)
            .to_client();
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn invalid_base_url() {
        let result = ClientConfig::from_environment_key("key")
            .base_url("not a url")
            .to_client();
        assert!(matches!(result, Err(Error::InvalidBaseUrl(_))));

        let result = ClientConfig::from_environment_key("key")
            .base_url("")
            .to_client();
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
