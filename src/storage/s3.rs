use aws_sdk_s3::{
    error::DisplayErrorContext,
    types::{CompletedMultipartUpload, CompletedPart},
    Client,
};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use log::{debug, warn};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    runtime::Handle,
};
use tokio_util::task::TaskTracker;

use crate::error::{Error, Result};

use super::ObjectStore;

/// Smaller bodies go up in a single request.
pub const PART_SIZE: usize = 8 * 1024 * 1024;

#[derive(Debug)]
pub struct S3Store {
    client: Client,
    bucket: String,
    cleanup: TaskTracker,
}

impl S3Store {
    pub async fn new(bucket: String) -> Self {
        let s3_config = aws_config::from_env().use_dual_stack(true).load().await;
        S3Store::with_client(Client::new(&s3_config), bucket)
    }

    pub fn with_client(client: Client, bucket: String) -> Self {
        S3Store {
            client,
            bucket,
            cleanup: TaskTracker::new(),
        }
    }

    pub async fn finish(&self) {
        self.cleanup.close();
        self.cleanup.wait().await;
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put_single(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let encoded_digest = md5_base64(&bytes);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(bytes.into())
            .content_md5(encoded_digest)
            .send()
            .await?;
        Ok(())
    }

    async fn put_multipart<R>(&self, key: &str, first_part: Vec<u8>, mut body: R) -> Result<()>
    where
        R: AsyncRead + Unpin + Send,
    {
        let response = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await?;

        let upload_id = response.upload_id.ok_or(Error::MissingUploadId)?;
        let mut pending = PendingUpload::new(self, key, &upload_id);
        let mut parts = vec![];
        let mut chunk = first_part;
        let mut part_number = 1;

        while !chunk.is_empty() {
            let encoded_digest = md5_base64(&chunk);
            let response = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(&upload_id)
                .part_number(part_number)
                .content_md5(encoded_digest)
                .body(chunk.into())
                .send()
                .await?;

            let part = CompletedPart::builder()
                .set_e_tag(response.e_tag)
                .part_number(part_number)
                .build();
            parts.push(part);
            debug!("uploaded part {part_number} of {key}");

            part_number += 1;
            chunk = read_part(&mut body).await?;
        }

        let completed_multipart_upload = CompletedMultipartUpload::builder()
            .set_parts(Some(parts))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .multipart_upload(completed_multipart_upload)
            .upload_id(&upload_id)
            .send()
            .await?;

        pending.complete();
        Ok(())
    }
}

impl ObjectStore for S3Store {
    async fn put<R>(&self, key: &str, mut body: R) -> Result<()>
    where
        R: AsyncRead + Unpin + Send,
    {
        let first_part = read_part(&mut body).await?;
        if first_part.len() < PART_SIZE {
            self.put_single(key, first_part).await
        } else {
            self.put_multipart(key, first_part, body).await
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await?;
        Ok(())
    }
}

/// Aborts a multipart upload dropped before completing, on the store's
/// cleanup tracker.
struct PendingUpload {
    client: Client,
    bucket: String,
    cleanup: TaskTracker,
    key: String,
    upload_id: Option<String>,
}

impl PendingUpload {
    fn new(store: &S3Store, key: &str, upload_id: &str) -> Self {
        PendingUpload {
            client: store.client.clone(),
            bucket: store.bucket.clone(),
            cleanup: store.cleanup.clone(),
            key: key.to_owned(),
            upload_id: Some(upload_id.to_owned()),
        }
    }

    fn complete(&mut self) {
        self.upload_id = None;
    }
}

impl Drop for PendingUpload {
    fn drop(&mut self) {
        let Some(upload_id) = self.upload_id.take() else {
            return;
        };

        let key = std::mem::take(&mut self.key);
        let request = self
            .client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(&key)
            .upload_id(upload_id);

        match Handle::try_current() {
            Ok(handle) => {
                let abort = async move {
                    match request.send().await {
                        Ok(_) => debug!("aborted multipart upload of {key}"),
                        Err(err) => warn!(
                            "failed to abort multipart upload of {key}: {}",
                            DisplayErrorContext(err)
                        ),
                    }
                };
                self.cleanup.spawn_on(abort, &handle);
            }
            Err(_) => warn!("abandoned multipart upload of {key}"),
        }
    }
}

async fn read_part<R>(body: &mut R) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut part = Vec::with_capacity(PART_SIZE);
    (&mut *body).take(PART_SIZE as u64).read_to_end(&mut part).await?;
    Ok(part)
}

fn md5_base64(bytes: &[u8]) -> String {
    let digest = md5::compute(bytes);
    BASE64_STANDARD.encode(digest.0)
}
