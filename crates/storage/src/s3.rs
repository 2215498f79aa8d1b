//! S3 compatible object store (AWS, R2 and friends).

use crate::{
    errors::StorageError,
    store::{decode_body, encode_record, object_path, ObjectStore},
};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use trustless_types::{FileType, SavedFile, TrustlessRecord};

/// Connection settings for an S3 compatible bucket.
#[derive(Debug, Default, Clone)]
pub struct S3Config {
    /// Custom endpoint url, e.g. an R2 account endpoint.
    pub endpoint: String,
    /// Bucket region, `auto` for R2.
    pub region: String,
    /// Target bucket name.
    pub bucket: String,
    /// Static access key id.
    pub key_id: String,
    /// Static access key secret.
    pub key_secret: String,
    /// Whether payload bodies are gzipped before upload.
    pub compression: bool,
}

/// Stores record payloads in an S3 compatible bucket.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
    compression: bool,
}

impl S3Store {
    /// Builds a client from static credentials and a custom endpoint.
    pub async fn connect(config: S3Config) -> Self {
        let credentials =
            Credentials::new(config.key_id, config.key_secret, None, None, "config");
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .endpoint_url(config.endpoint)
            .load()
            .await;

        Self {
            client: aws_sdk_s3::Client::new(&sdk_config),
            bucket: config.bucket,
            compression: config.compression,
        }
    }

    const fn content_encoding(&self) -> Option<&'static str> {
        if self.compression {
            Some("compress, gzip")
        } else {
            None
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn save(
        &self,
        record: &TrustlessRecord,
        attach_proof: bool,
    ) -> Result<SavedFile, StorageError> {
        let path = object_path(record, self.compression);
        let body = encode_record(record, attach_proof, self.compression)?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&path)
            .body(ByteStream::from(body))
            .content_type("application/json")
            .set_content_encoding(self.content_encoding().map(str::to_string))
            .send()
            .await
            .map_err(|e| StorageError::S3(e.to_string()))?;

        Ok(SavedFile { file_type: FileType::S3, path })
    }

    async fn load(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| StorageError::S3(e.to_string()))?;
        let raw = object
            .body
            .collect()
            .await
            .map_err(|e| StorageError::S3(e.to_string()))?
            .into_bytes()
            .to_vec();
        decode_body(path, raw)
    }
}
