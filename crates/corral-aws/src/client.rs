//! Shared SDK configuration.

use aws_config::BehaviorVersion;
use aws_credential_types::provider::ProvideCredentials;

/// Resolved AWS configuration shared by every service client.
///
/// Credentials and the default region come from the usual chain (env
/// vars, shared config files, instance metadata); an explicit region
/// passed to [`Aws::connect`] overrides the chain.
#[derive(Debug)]
pub struct Aws {
    config: aws_config::SdkConfig,
}

impl Aws {
    /// Load configuration, overriding the region when `region` is
    /// non-empty.
    pub async fn connect(region: &str) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if !region.is_empty() {
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }
        let config = loader.load().await;
        tracing::debug!(
            "loaded AWS config, region {}",
            config.region().map_or("none", |r| r.as_ref())
        );
        Self { config }
    }

    pub fn config(&self) -> &aws_config::SdkConfig {
        &self.config
    }

    /// The region the clients will talk to, when one resolved.
    pub fn region(&self) -> Option<&str> {
        self.config.region().map(AsRef::as_ref)
    }

    /// Whether the credential chain actually produces keys.
    pub async fn has_credentials(&self) -> bool {
        match self.config.credentials_provider() {
            Some(provider) => provider.provide_credentials().await.is_ok(),
            None => false,
        }
    }
}
