use std::time::Duration;

use crate::runner::DEFAULT_MAX_CONCURRENT;
use crate::types::S3Credentials;

/// Default page size for key enumeration.
///
/// Deliberately small compared to the server-side maximum of 1000, trading
/// request count for bounded memory and latency per page.
pub const DEFAULT_LIST_PAGE_SIZE: i32 = 100;

/// Server-side maximum page size for ListObjectsV2.
pub const MAX_LIST_PAGE_SIZE: i32 = 1000;

/// Default expiry for presigned GET URLs.
pub const DEFAULT_PRESIGN_EXPIRY: Duration = Duration::from_secs(3600);

/// Engine configuration for a [`BulkClient`](crate::BulkClient).
///
/// Holds the initial bucket, the optional AWS client configuration, and the
/// engine tunables: in-flight concurrency ceiling, listing page size, and
/// presigned-URL expiry.
///
/// # Quick Start
///
/// Use [`Config::for_bucket`] for a minimal configuration with defaults:
///
/// ```
/// use s3bulk::Config;
///
/// let config = Config::for_bucket("my-bucket");
/// assert_eq!(config.max_concurrent, 5);
/// assert_eq!(config.list_page_size, 100);
/// ```
///
/// Then customize fields as needed:
///
/// ```
/// use s3bulk::Config;
///
/// let mut config = Config::for_bucket("my-bucket");
/// config.max_concurrent = 16;
/// config.list_page_size = 500;
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Initial active bucket. Must be non-empty; switchable at runtime via
    /// [`BulkClient::switch_bucket`](crate::BulkClient::switch_bucket).
    pub bucket: String,
    /// AWS client configuration. `None` uses the default credential chain
    /// and region resolution.
    pub client_config: Option<ClientConfig>,
    /// Maximum concurrently in-flight remote tasks for bulk operations.
    pub max_concurrent: usize,
    /// Keys requested per listing page, clamped to `1..=1000`.
    pub list_page_size: i32,
    /// Expiry applied to presigned GET URLs.
    pub presign_expiry: Duration,
}

impl Config {
    /// Create a `Config` targeting the given bucket, with engine defaults.
    pub fn for_bucket(bucket: &str) -> Self {
        Config {
            bucket: bucket.to_string(),
            ..Config::default()
        }
    }

    /// The listing page size clamped to the valid server range.
    pub fn effective_page_size(&self) -> i32 {
        self.list_page_size.clamp(1, MAX_LIST_PAGE_SIZE)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bucket: String::new(),
            client_config: None,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            list_page_size: DEFAULT_LIST_PAGE_SIZE,
            presign_expiry: DEFAULT_PRESIGN_EXPIRY,
        }
    }
}

/// AWS S3 client configuration: credential source, region, endpoint,
/// addressing style, retry and timeout settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub credential: S3Credentials,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    pub retry_config: RetryConfig,
    pub timeout_config: TimeoutConfig,
}

impl ClientConfig {
    /// Create a `ClientConfig` for a custom S3-compatible endpoint with
    /// static credentials. Path-style addressing is enabled, which most
    /// non-AWS endpoints require.
    pub fn for_endpoint(endpoint_url: &str, access_key: &str, secret_access_key: &str) -> Self {
        ClientConfig {
            credential: S3Credentials::Credentials {
                access_keys: crate::types::AccessKeys {
                    access_key: access_key.to_string(),
                    secret_access_key: secret_access_key.to_string(),
                    session_token: None,
                },
            },
            region: None,
            endpoint_url: Some(endpoint_url.to_string()),
            force_path_style: true,
            retry_config: RetryConfig::default(),
            timeout_config: TimeoutConfig::default(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            credential: S3Credentials::FromEnvironment,
            region: None,
            endpoint_url: None,
            force_path_style: false,
            retry_config: RetryConfig::default(),
            timeout_config: TimeoutConfig::default(),
        }
    }
}

/// Retry configuration for AWS SDK operations.
///
/// The engine itself never retries; retry policy is delegated entirely to
/// the SDK's standard retry mode.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub aws_max_attempts: u32,
    pub initial_backoff_milliseconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            aws_max_attempts: 3,
            initial_backoff_milliseconds: 100,
        }
    }
}

/// Timeout configuration for AWS SDK operations.
///
/// All timeouts belong to the transport; the engine runs operations to
/// completion.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeoutConfig {
    pub operation_timeout_milliseconds: Option<u64>,
    pub connect_timeout_milliseconds: Option<u64>,
    pub read_timeout_milliseconds: Option<u64>,
}
