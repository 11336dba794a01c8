use std::path::Path;

use opendal::services::GcsConfig;
use opendal::{Configurator, Operator};

use crate::error::Error;
use crate::filesystems::object_store::ObjectStore;
use crate::filesystems::FileSystem;
use crate::url::Url;

/// Google Cloud Storage backend for `gs://` and `gcs://` URLs. Credentials
/// come from the ambient environment (`GOOGLE_APPLICATION_CREDENTIALS`);
/// `api_endpoint` is recognized as a URL query parameter.
pub struct GcsFileSystem {
    store: ObjectStore,
}

impl GcsFileSystem {
    pub fn new(url: Url) -> Result<Self, Error> {
        let bucket = url
            .hostname()
            .map(String::from)
            .filter(|bucket| !bucket.is_empty())
            .ok_or_else(|| Error::InvalidUrl(url.raw().to_string()))?;

        let mut config = GcsConfig::default();
        config.bucket = bucket;
        config.endpoint = url.get_query("api_endpoint").map(String::from);

        let operator = Operator::new(config.into_builder())?.finish();
        Ok(GcsFileSystem {
            store: ObjectStore::new(url, operator)?,
        })
    }
}

impl FileSystem for GcsFileSystem {
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
