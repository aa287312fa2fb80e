// S3/MinIO client implementation

use anyhow::Result;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{Credentials, Region},
    error::DisplayErrorContext,
    primitives::ByteStream,
    Client,
};
use bytes::Bytes;
use futures::StreamExt;
use tokio_util::io::ReaderStream;

use super::{ObjectBody, ObjectStore, StorageError, StorageResult, STREAM_CHUNK_SIZE};
use crate::config::StorageConfig;

pub struct S3Client {
    client: Client,
    bucket: String,
}

impl S3Client {
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let (Some(access_key), Some(secret_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            builder = builder.credentials_provider(Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None,
                None,
                "environment",
            ));
        }
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint.clone());
        }
        builder = builder.force_path_style(config.force_path_style);

        tracing::info!(
            bucket = %config.bucket,
            region = %config.region,
            endpoint = ?config.endpoint,
            "S3 client configured"
        );

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
        })
    }
}

fn backend_error<E>(err: E) -> StorageError
where
    E: std::error::Error,
{
    StorageError::Backend(DisplayErrorContext(err).to_string())
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn put(&self, key: &str, body: Bytes, content_type: Option<String>) -> StorageResult<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .set_content_type(content_type)
            .send()
            .await
            .map_err(backend_error)?;
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<ObjectBody> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                let missing = err
                    .as_service_error()
                    .map(|e| e.is_no_such_key())
                    .unwrap_or(false);
                if missing {
                    StorageError::NotFound(key.to_string())
                } else {
                    backend_error(err)
                }
            })?;

        let content_type = output.content_type().map(str::to_string);
        let content_length = output.content_length().and_then(|len| u64::try_from(len).ok());
        let reader = output.body.into_async_read();

        Ok(ObjectBody {
            content_type,
            content_length,
            stream: ReaderStream::with_capacity(reader, STREAM_CHUNK_SIZE).boxed(),
        })
    }

    async fn list(&self) -> StorageResult<Vec<String>> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(backend_error)?;

        Ok(output
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_string))
            .collect())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(backend_error)?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}
