use std::env;
use std::path::Path;

use opendal::services::S3Config;
use opendal::{Configurator, Operator};

use crate::error::Error;
use crate::filesystems::object_store::ObjectStore;
use crate::filesystems::FileSystem;
use crate::url::Url;

const DEFAULT_REGION: &str = "us-east-1";

/// S3 backend. Credentials come from the URL's userinfo or the standard AWS
/// environment variables; `endpoint_url` and `region` are recognized as URL
/// query parameters.
pub struct S3FileSystem {
    store: ObjectStore,
}

impl S3FileSystem {
    pub fn new(url: Url) -> Result<Self, Error> {
        let bucket = url
            .hostname()
            .map(String::from)
            .filter(|bucket| !bucket.is_empty())
            .ok_or_else(|| Error::InvalidUrl(url.raw().to_string()))?;

        let mut config = S3Config::default();
        config.bucket = bucket;
        config.endpoint = url.get_query("endpoint_url").map(String::from);
        config.region = url
            .get_query("region")
            .map(String::from)
            .or_else(|| env::var("AWS_REGION").ok())
            .or_else(|| env::var("AWS_DEFAULT_REGION").ok())
            .or_else(|| Some(DEFAULT_REGION.to_string()));
        config.access_key_id = url
            .username()
            .map(String::from)
            .or_else(|| env::var("AWS_ACCESS_KEY_ID").ok());
        config.secret_access_key = url
            .password()
            .map(String::from)
            .or_else(|| env::var("AWS_SECRET_ACCESS_KEY").ok());
        if config.access_key_id.is_none() || config.secret_access_key.is_none() {
            config.allow_anonymous = true;
        }

        let operator = Operator::new(config.into_builder())?.finish();
        Ok(S3FileSystem {
            store: ObjectStore::new(url, operator)?,
        })
    }
}

impl FileSystem for S3FileSystem {
    fn url(&self) -> &Url {
        self.store.url()
    }

    fn exists(&self) -> Result<bool, Error> {
        self.store.exists()
    }

    fn download(&self, path: &Path) -> Result<(), Error> {
        self.store.download(path)
    }

    fn upload(&self, path: &Path) -> Result<(), Error> {
        self.store.upload(path)
    }

    fn delete(&self) -> Result<(), Error> {
        self.store.delete()
    }

    fn get_version(&self) -> Result<Option<String>, Error> {
        self.store.get_version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_is_required() {
        let url = Url::parse("s3:///no-bucket").unwrap();
        assert!(matches!(
            S3FileSystem::new(url),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_construction_with_query_parameters() {
        let url = Url::parse(
            "s3://key:secret@bucket/path/to/object?endpoint_url=http://localhost:9000&region=eu-west-1",
        )
        .unwrap();
        assert!(S3FileSystem::new(url).is_ok());
    }
}
