mod local;
mod s3;

use std::fmt::{self, Display};

use tokio::io::AsyncRead;

use crate::error::Result;

pub use {local::LocalStore, s3::S3Store};

#[allow(async_fn_in_trait)]
pub trait ObjectStore {
    /// Dropping the returned future must not leave a partial object behind.
    async fn put<R>(&self, key: &str, body: R) -> Result<()>
    where
        R: AsyncRead + Unpin + Send;

    async fn delete(&self, key: &str) -> Result<()>;
}

#[derive(Debug)]
pub enum Store {
    S3(S3Store),
    Local(LocalStore),
}

impl Store {
    pub async fn finish(&self) {
        match self {
            Store::S3(store) => store.finish().await,
            Store::Local(_) => {}
        }
    }
}

impl ObjectStore for Store {
    async fn put<R>(&self, key: &str, body: R) -> Result<()>
    where
        R: AsyncRead + Unpin + Send,
    {
        match self {
            Store::S3(store) => store.put(key, body).await,
            Store::Local(store) => store.put(key, body).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match self {
            Store::S3(store) => store.delete(key).await,
            Store::Local(store) => store.delete(key).await,
        }
    }
}

impl Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Store::S3(store) => write!(f, "s3://{}", store.bucket()),
            Store::Local(store) => write!(f, "file://{}", store.root().display()),
        }
    }
}
