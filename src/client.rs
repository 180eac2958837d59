use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    time::Duration,
};

#[cfg(doc)]
use crate::Error;
use crate::{
    analytics::{AnalyticsCollector, FlagAnalytics},
    dispatcher::Dispatcher,
    request::Request,
    ClientConfig, Flag, IdentityFlagsAndTraits, Result, Trait, TraitWithIdentity, Value,
};

/// A client for Flagsmith API.
///
/// In order to create a client instance, first create [`ClientConfig`].
///
/// Every call performs a fresh request: nothing is cached, deduplicated or retried. The client is
/// `Send + Sync` and concurrent calls are independent of each other.
///
/// # Examples
/// ```no_run
/// # async fn run() -> flagsmith::Result<()> {
/// # use flagsmith::ClientConfig;
/// let client = ClientConfig::from_environment_key("environment-key").to_client()?;
/// let show_banner = client.has_flag("banner", Some("user-42"), &[]).await?;
/// # Ok(())
/// # }
/// ```
pub struct Client {
    dispatcher: Dispatcher,
    timeout: Duration,
    analytics: Arc<dyn AnalyticsCollector>,
    flag_analytics: Option<Arc<FlagAnalytics>>,
}

impl Client {
    /// Create a new `Client` using the specified configuration.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Configuration`] if analytics is enabled without a store or outside of
    /// a Tokio runtime, and with [`Error::InvalidBaseUrl`] if the base URL cannot be parsed.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let dispatcher = Dispatcher::new(
            config.base_url.trim_end_matches('/').to_owned(),
            config.environment_key,
        );

        let flag_analytics = match config.analytics_store {
            Some(store) if config.enable_analytics => Some(Arc::new(FlagAnalytics::start(
                dispatcher.clone(),
                store,
                config.analytics_flush_period,
                config.timeout,
            )?)),
            _ => None,
        };

        let analytics = match (&flag_analytics, config.analytics_collector) {
            (Some(flag_analytics), _) => flag_analytics.clone() as Arc<dyn AnalyticsCollector>,
            (None, Some(collector)) => collector,
            (None, None) => ClientConfig::noop_collector(),
        };

        Ok(Client {
            dispatcher,
            timeout: config.timeout,
            analytics,
            flag_analytics,
        })
    }

    /// Get flags of the environment.
    ///
    /// If `identity` is given, flags are evaluated for that identity and `traits` are stored on it
    /// first. Without an identity, `traits` are ignored.
    pub async fn list_flags(&self, identity: Option<&str>, traits: &[Trait]) -> Result<Vec<Flag>> {
        match identity {
            Some(identity) => self
                .get_identity_flags_and_traits(identity, Some(traits.to_vec()))
                .await
                .map(IdentityFlagsAndTraits::into_flags),
            None => self.dispatcher.execute(&Request::GetFlags, self.timeout).await,
        }
    }

    /// Find an enabled flag by feature name.
    ///
    /// Returns `Ok(None)` if the feature does not exist or is disabled.
    ///
    /// Every successful lookup is reported to the analytics collector.
    pub async fn find_flag(
        &self,
        feature_name: &str,
        identity: Option<&str>,
        traits: &[Trait],
    ) -> Result<Option<Flag>> {
        let flags = self.list_flags(identity, traits).await?;

        let flag = flags
            .into_iter()
            .find(|flag| flag.name() == feature_name && flag.enabled());

        log::trace!(target: "flagsmith",
                    feature_name,
                    identity,
                    found = flag.is_some();
                    "resolved a flag");

        let analytics = &self.analytics;
        if panic::catch_unwind(AssertUnwindSafe(|| analytics.track_event(feature_name))).is_err() {
            log::warn!(target: "flagsmith", feature_name; "analytics collector panicked");
        }

        Ok(flag)
    }

    /// Check whether a feature is enabled.
    pub async fn has_flag(
        &self,
        feature_name: &str,
        identity: Option<&str>,
        traits: &[Trait],
    ) -> Result<bool> {
        self.find_flag(feature_name, identity, traits)
            .await
            .map(|flag| flag.is_some())
    }

    /// Get the value of an enabled feature.
    ///
    /// Returns `Ok(None)` if the feature does not exist or is disabled.
    ///
    /// ```no_run
    /// # async fn run(client: &flagsmith::Client) {
    /// let color = client
    ///     .value_for_flag("banner_color", None, &[])
    ///     .await
    ///     .unwrap_or_default()
    ///     .and_then(|value| value.as_str().map(str::to_owned))
    ///     // default value
    ///     .unwrap_or_else(|| "blue".to_owned());
    /// # }
    /// ```
    pub async fn value_for_flag(
        &self,
        feature_name: &str,
        identity: Option<&str>,
        traits: &[Trait],
    ) -> Result<Option<Value>> {
        self.find_flag(feature_name, identity, traits)
            .await
            .map(|flag| flag.map(|flag| flag.value().clone()))
    }

    /// Get flags and traits of an identity.
    pub async fn get_identity(&self, identity: &str) -> Result<IdentityFlagsAndTraits> {
        self.get_identity_flags_and_traits(identity, None).await
    }

    /// Get a single trait of an identity, `Ok(None)` if it is not set.
    pub async fn get_trait(&self, key: &str, identity: &str) -> Result<Option<Trait>> {
        let bundle = self.get_identity(identity).await?;
        Ok(bundle.find_trait(key).cloned())
    }

    /// Get all traits of an identity.
    pub async fn get_traits(&self, identity: &str) -> Result<Vec<Trait>> {
        self.get_identity(identity)
            .await
            .map(IdentityFlagsAndTraits::into_traits)
    }

    /// Store a trait on an identity. Returns the trait as stored by the server.
    pub async fn set_trait(&self, trait_: Trait, identity: &str) -> Result<TraitWithIdentity> {
        let request = Request::SetTrait {
            trait_,
            identity: identity.to_owned(),
        };
        self.dispatcher.execute(&request, self.timeout).await
    }

    /// Store multiple traits on an identity. Returns flags and traits after the update.
    ///
    /// Duplicate keys are resolved by the server, the last one wins.
    pub async fn set_traits(
        &self,
        traits: Vec<Trait>,
        identity: &str,
    ) -> Result<IdentityFlagsAndTraits> {
        let request = Request::SetTraits {
            traits,
            identity: identity.to_owned(),
        };
        self.dispatcher.execute(&request, self.timeout).await
    }

    /// Upload pending analytics immediately.
    ///
    /// Does nothing unless built-in analytics is enabled.
    pub async fn flush_analytics(&self) -> Result<()> {
        match &self.flag_analytics {
            Some(analytics) => analytics.flush().await,
            None => Ok(()),
        }
    }

    async fn get_identity_flags_and_traits(
        &self,
        identity: &str,
        traits: Option<Vec<Trait>>,
    ) -> Result<IdentityFlagsAndTraits> {
        let request = Request::GetIdentityFlagsAndTraits {
            identity: identity.to_owned(),
            traits,
        };
        self.dispatcher.execute(&request, self.timeout).await
    }
}
