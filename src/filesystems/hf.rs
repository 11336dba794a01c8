use std::io::Read;
use std::path::Path;

use log::debug;

use crate::error::Error;
use crate::filesystems::http::HttpFileSystem;
use crate::filesystems::{FileSystem, WriteHandle};
use crate::url::Url;
use crate::util::Decompress;

const HUB_ENDPOINT: &str = "https://huggingface.co";
const DEFAULT_REVISION: &str = "main";

/// Hugging Face Hub backend for `hf://` URLs.
///
/// `hf://<namespace>/<repo>/<path>` addresses a file in a model repository,
/// `hf://datasets/<namespace>/<repo>/<path>` one in a dataset repository.
/// A `revision` query parameter selects a branch, tag, or commit. Files are
/// served through the Hub's `resolve` endpoint by the HTTP backend, which
/// also supplies the version token (the ETag).
pub struct HfFileSystem {
    url: Url,
    http: HttpFileSystem,
}

impl HfFileSystem {
    pub fn new(url: Url) -> Result<Self, Error> {
        let resolved = resolve_hub_url(&url)?;
        debug!("resolved {} to {}", url, resolved);
        let http = HttpFileSystem::new(Url::parse(&resolved)?)?;
        Ok(HfFileSystem { url, http })
    }

    fn unsupported(&self, operation: &'static str) -> Error {
        Error::Unsupported {
            scheme: self.url.scheme().to_string(),
            operation,
        }
    }
}

fn resolve_hub_url(url: &Url) -> Result<String, Error> {
    let host = url
        .hostname()
        .ok_or_else(|| Error::InvalidUrl(url.raw().to_string()))?;
    let revision = url.get_query("revision").unwrap_or(DEFAULT_REVISION);
    let mut segments: Vec<&str> = url
        .path()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();

    let repo = if host == "datasets" {
        // hf://datasets/<namespace>/<repo>/<path...>
        if segments.len() < 3 {
            return Err(Error::InvalidUrl(url.raw().to_string()));
        }
        let namespace = segments.remove(0);
        let name = segments.remove(0);
        format!("datasets/{}/{}", namespace, name)
    } else {
        // hf://<namespace>/<repo>/<path...>
        if segments.len() < 2 {
            return Err(Error::InvalidUrl(url.raw().to_string()));
        }
        let name = segments.remove(0);
        format!("{}/{}", host, name)
    };

    Ok(format!(
        "{}/{}/resolve/{}/{}",
        HUB_ENDPOINT,
        repo,
        revision,
        segments.join("/")
    ))
}

impl FileSystem for HfFileSystem {
    fn url(&self) -> &Url {
        &self.url
    }

    fn exists(&self) -> Result<bool, Error> {
        self.http.exists()
    }

    fn download(&self, path: &Path) -> Result<(), Error> {
        self.http.download(path)
    }

    fn upload(&self, _path: &Path) -> Result<(), Error> {
        Err(self.unsupported("upload"))
    }

    fn delete(&self) -> Result<(), Error> {
        Err(self.unsupported("delete"))
    }

    fn get_version(&self) -> Result<Option<String>, Error> {
        self.http.get_version()
    }

    fn open_file(&self, decompress: Decompress) -> Result<Box<dyn Read + Send>, Error> {
        self.http.open_file(decompress)
    }

    fn create_file(&self) -> Result<WriteHandle, Error> {
        Err(self.unsupported("writing"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_model_url() {
        let url = Url::parse("hf://bert-community/bert-base/config.json").unwrap();
        assert_eq!(
            resolve_hub_url(&url).unwrap(),
            "https://huggingface.co/bert-community/bert-base/resolve/main/config.json"
        );
    }

    #[test]
    fn test_resolve_dataset_url_with_revision() {
        let url =
            Url::parse("hf://datasets/squad/plain_text/train.json?revision=refs%2Fpr%2F1")
                .unwrap();
        assert_eq!(
            resolve_hub_url(&url).unwrap(),
            "https://huggingface.co/datasets/squad/plain_text/resolve/refs/pr/1/train.json"
        );
    }

    #[test]
    fn test_resolve_requires_a_file_path() {
        let url = Url::parse("hf://just-a-namespace").unwrap();
        assert!(resolve_hub_url(&url).is_err());
    }
}
