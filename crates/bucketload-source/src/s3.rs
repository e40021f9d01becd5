//! Amazon S3 implementation of [`ObjectStore`].
//!
//! The AWS SDK is async; the store owns a private current-thread Tokio
//! runtime and blocks on every call, so callers stay synchronous.

use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use tokio::runtime::{Builder, Runtime};

use crate::error::{self, SourceError};
use crate::store::{ListPage, ObjectStore};

/// Optional overrides on top of the default AWS configuration chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct S3Options {
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores; enables path-style addressing.
    pub endpoint_url: Option<String>,
}

/// S3-backed object store.
///
/// Credentials come from the standard chain (environment, profile, instance
/// role); nothing here manages them.
pub struct S3ObjectStore {
    runtime: Runtime,
    client: Client,
}

impl S3ObjectStore {
    /// Resolve AWS configuration and build a client.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Setup`] if the runtime cannot be started.
    pub fn connect(options: &S3Options) -> error::Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| SourceError::Setup(format!("tokio runtime: {e}")))?;

        let client = runtime.block_on(async {
            let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
            if let Some(region) = &options.region {
                loader = loader.region(Region::new(region.clone()));
            }
            if let Some(endpoint) = &options.endpoint_url {
                loader = loader.endpoint_url(endpoint);
            }
            let shared = loader.load().await;
            let conf = aws_sdk_s3::config::Builder::from(&shared)
                .force_path_style(options.endpoint_url.is_some())
                .build();
            Client::from_conf(conf)
        });

        tracing::debug!(
            region = options.region.as_deref().unwrap_or("default"),
            endpoint = options.endpoint_url.as_deref().unwrap_or("aws"),
            "S3 client configured"
        );

        Ok(Self { runtime, client })
    }
}

impl ObjectStore for S3ObjectStore {
    fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> error::Result<ListPage> {
        let output = self
            .runtime
            .block_on(
                self.client
                    .list_objects_v2()
                    .bucket(bucket)
                    .prefix(prefix)
                    .set_continuation_token(continuation.map(str::to_string))
                    .send(),
            )
            .map_err(|e| SourceError::List {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        let keys = output
            .contents()
            .iter()
            .filter_map(|obj| obj.key())
            .map(str::to_string)
            .collect();
        let continuation = if output.is_truncated().unwrap_or(false) {
            output.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(ListPage { keys, continuation })
    }

    fn get_object(&self, bucket: &str, key: &str) -> error::Result<Vec<u8>> {
        let get_err = |message: String| SourceError::Get {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message,
        };

        self.runtime.block_on(async {
            let output = self
                .client
                .get_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| get_err(DisplayErrorContext(&e).to_string()))?;
            let body = output
                .body
                .collect()
                .await
                .map_err(|e| get_err(e.to_string()))?;
            Ok(body.into_bytes().to_vec())
        })
    }
}
