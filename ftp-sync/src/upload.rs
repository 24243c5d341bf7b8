#![doc = "Destination store integration: bridges the core `BlobStore` trait to an Azure blob container through `object_store`."]
//
//! # Blob container client
//!
//! - [`ConnectionString`] parses the `Key=Value;` storage connection string used
//!   by Azure tooling (account key, SAS, custom endpoint or the local emulator).
//! - [`BlobClient`] implements [`BlobStore`] over any `object_store` backend:
//!   Azure in production, `object_store::memory::InMemory` in tests.
//!
//! Uploads stream the local file in multipart chunks and overwrite existing
//! objects; keys are stored verbatim. Listing walks the whole container.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ftp_sync_core::config::StoreConfig;
use ftp_sync_core::contract::{BlobStore, StoreError, StoredObject};
use futures::TryStreamExt;
use object_store::azure::{AzureConfigKey, MicrosoftAzureBuilder};
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, WriteMultipart};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

const READ_CHUNK: usize = 1024 * 1024;
/// Parts in flight per upload.
const MAX_CONCURRENT_PARTS: usize = 4;

/// The parts of an Azure storage connection string this job understands.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub account_name: Option<String>,
    pub account_key: Option<String>,
    pub shared_access_signature: Option<String>,
    pub blob_endpoint: Option<String>,
    pub endpoint_suffix: Option<String>,
    pub protocol: Option<String>,
    pub use_development_storage: bool,
}

impl std::fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionString")
            .field("account_name", &self.account_name)
            .field("account_key_set", &self.account_key.is_some())
            .field("sas_set", &self.shared_access_signature.is_some())
            .field("blob_endpoint", &self.blob_endpoint)
            .field("endpoint_suffix", &self.endpoint_suffix)
            .field("use_development_storage", &self.use_development_storage)
            .finish()
    }
}

impl ConnectionString {
    pub fn parse(raw: &str) -> Result<Self> {
        let mut pairs = HashMap::new();
        for part in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            // Values (account keys, SAS tokens) may themselves contain '='.
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| anyhow!("malformed connection string segment without '='"))?;
            pairs.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }

        let parsed = Self {
            account_name: pairs.remove("accountname"),
            account_key: pairs.remove("accountkey"),
            shared_access_signature: pairs.remove("sharedaccesssignature"),
            blob_endpoint: pairs.remove("blobendpoint"),
            endpoint_suffix: pairs.remove("endpointsuffix"),
            protocol: pairs.remove("defaultendpointsprotocol"),
            use_development_storage: pairs
                .remove("usedevelopmentstorage")
                .is_some_and(|v| v.eq_ignore_ascii_case("true")),
        };
        if parsed.account_name.is_none() && !parsed.use_development_storage {
            return Err(anyhow!("connection string has no AccountName"));
        }
        Ok(parsed)
    }

    /// Explicit `BlobEndpoint`, or one derived from a non-default `EndpointSuffix`.
    pub fn blob_endpoint(&self) -> Option<String> {
        if let Some(endpoint) = &self.blob_endpoint {
            return Some(endpoint.trim_end_matches('/').to_string());
        }
        let suffix = self.endpoint_suffix.as_deref()?;
        if suffix == DEFAULT_ENDPOINT_SUFFIX {
            return None;
        }
        let account = self.account_name.as_deref()?;
        let protocol = self.protocol.as_deref().unwrap_or("https");
        Some(format!("{protocol}://{account}.blob.{suffix}"))
    }
}

pub struct BlobClient {
    store: Arc<dyn ObjectStore>,
    container: String,
}

impl BlobClient {
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let connection = ConnectionString::parse(&config.connection_string)
            .context("invalid blob connection string")?;

        let mut builder = MicrosoftAzureBuilder::new().with_container_name(&config.container);
        if connection.use_development_storage {
            builder = builder.with_use_emulator(true);
        }
        if let Some(account) = &connection.account_name {
            builder = builder.with_account(account);
        }
        if let Some(key) = &connection.account_key {
            builder = builder.with_access_key(key);
        }
        if let Some(sas) = &connection.shared_access_signature {
            builder = builder.with_config(AzureConfigKey::SasKey, sas);
        }
        if let Some(endpoint) = connection.blob_endpoint() {
            builder = builder
                .with_allow_http(endpoint.starts_with("http://"))
                .with_endpoint(endpoint);
        }
        let store = builder.build().context("failed to build Azure blob client")?;

        tracing::info!(
            container = %config.container,
            account = connection.account_name.as_deref().unwrap_or("devstoreaccount1"),
            "Initialized blob client from connection string"
        );
        Ok(Self::from_store(Arc::new(store), &config.container))
    }

    /// Wraps an existing store, e.g. `object_store::memory::InMemory` in tests.
    pub fn from_store(store: Arc<dyn ObjectStore>, container: &str) -> Self {
        Self {
            store,
            container: container.to_string(),
        }
    }
}

fn backend(e: object_store::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[async_trait]
impl BlobStore for BlobClient {
    async fn list_objects(&self) -> Result<Vec<StoredObject>, StoreError> {
        tracing::debug!(container = %self.container, "Listing container");
        let objects: Vec<StoredObject> = self
            .store
            .list(None)
            .map_ok(|meta| StoredObject {
                name: meta.location.to_string(),
                last_modified: meta.last_modified,
                size: meta.size as u64,
            })
            .try_collect()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, container = %self.container, "Failed to list container");
                backend(e)
            })?;
        tracing::info!(container = %self.container, count = objects.len(), "Listed container");
        Ok(objects)
    }

    async fn put_file(&self, key: String, local: PathBuf) -> Result<u64, StoreError> {
        let location = ObjectPath::parse(&key)
            .map_err(|e| StoreError::Backend(format!("invalid object key {key:?}: {e}")))?;
        let mut file = File::open(&local).await?;

        let upload = self.store.put_multipart(&location).await.map_err(backend)?;
        let mut writer = WriteMultipart::new(upload);
        let result = match stream_into(&mut file, &mut writer).await {
            Ok(size) => writer.finish().await.map(|_| size).map_err(backend),
            Err(e) => {
                if let Err(abort) = writer.abort().await {
                    tracing::warn!(error = %abort, key = %key, "Failed to abort multipart upload");
                }
                Err(e)
            }
        };

        match result {
            Ok(size) => {
                tracing::info!(container = %self.container, key = %key, size, "Uploaded blob");
                Ok(size)
            }
            Err(e) => {
                tracing::error!(error = %e, container = %self.container, key = %key, "Failed to upload blob");
                Err(e)
            }
        }
    }
}

async fn stream_into(file: &mut File, writer: &mut WriteMultipart) -> Result<u64, StoreError> {
    let mut buf = vec![0u8; READ_CHUNK];
    let mut size = 0u64;
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            return Ok(size);
        }
        writer
            .wait_for_capacity(MAX_CONCURRENT_PARTS)
            .await
            .map_err(backend)?;
        writer.write(&buf[..n]);
        size += n as u64;
    }
}
