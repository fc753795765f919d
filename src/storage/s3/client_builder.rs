//! AWS SDK client construction from a [`ClientConfig`].

use std::time::Duration;

use aws_config::retry::RetryConfig as SdkRetryConfig;
use aws_config::timeout::TimeoutConfig as SdkTimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::{Credentials, SharedCredentialsProvider};
use aws_sdk_s3::Client;

use crate::config::ClientConfig;
use crate::types::S3Credentials;

/// Build an S3 client: credential source, region, retry/timeout settings,
/// then the optional custom endpoint with path-style addressing.
pub async fn create_client(client_config: ClientConfig) -> Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());

    match &client_config.credential {
        S3Credentials::Profile(profile_name) => {
            loader = loader.profile_name(profile_name);
        }
        S3Credentials::Credentials { access_keys } => {
            let credentials = Credentials::new(
                access_keys.access_key.clone(),
                access_keys.secret_access_key.clone(),
                access_keys.session_token.clone(),
                None,
                "s3bulk-static",
            );
            loader = loader.credentials_provider(SharedCredentialsProvider::new(credentials));
        }
        S3Credentials::FromEnvironment => {}
    }

    if let Some(region) = &client_config.region {
        loader = loader.region(Region::new(region.clone()));
    }

    loader = loader.retry_config(
        SdkRetryConfig::standard()
            .with_max_attempts(client_config.retry_config.aws_max_attempts)
            .with_initial_backoff(Duration::from_millis(
                client_config.retry_config.initial_backoff_milliseconds,
            )),
    );

    let mut timeout_builder = SdkTimeoutConfig::builder();
    if let Some(ms) = client_config.timeout_config.operation_timeout_milliseconds {
        timeout_builder = timeout_builder.operation_timeout(Duration::from_millis(ms));
    }
    if let Some(ms) = client_config.timeout_config.connect_timeout_milliseconds {
        timeout_builder = timeout_builder.connect_timeout(Duration::from_millis(ms));
    }
    if let Some(ms) = client_config.timeout_config.read_timeout_milliseconds {
        timeout_builder = timeout_builder.read_timeout(Duration::from_millis(ms));
    }
    loader = loader.timeout_config(timeout_builder.build());

    let sdk_config = loader.load().await;

    let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
    if let Some(endpoint_url) = &client_config.endpoint_url {
        builder = builder.endpoint_url(endpoint_url);
    }
    if client_config.force_path_style {
        builder = builder.force_path_style(true);
    }

    Client::from_conf(builder.build())
}
