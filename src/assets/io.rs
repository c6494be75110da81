use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::{AssetError, Result};

/// Asynchronous byte source for asset files.
/// Supports local files and (with the `http` feature) network resources.
pub trait AssetReader: Send + Sync {
    fn read_bytes(&self, uri: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Reads files relative to a root directory.
pub struct FileAssetReader {
    root_path: PathBuf,
}

impl FileAssetReader {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root_path: root.as_ref().to_path_buf(),
        }
    }

    #[inline]
    #[must_use]
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }
}

impl AssetReader for FileAssetReader {
    async fn read_bytes(&self, uri: &str) -> Result<Vec<u8>> {
        let path = self.root_path.join(uri);
        let data = tokio::fs::read(&path).await?;
        Ok(data)
    }
}

/// Fetches resources relative to a root URL.
#[cfg(feature = "http")]
pub struct HttpAssetReader {
    root_url: url::Url,
}

#[cfg(feature = "http")]
impl HttpAssetReader {
    pub fn new(url_str: &str) -> Result<Self> {
        let url = url::Url::parse(url_str).map_err(|e| AssetError::Http(e.to_string()))?;
        let root_url = if url.path().ends_with('/') {
            url
        } else {
            let mut u = url.clone();
            if let Ok(mut segments) = u.path_segments_mut() {
                segments.pop();
                segments.push("");
            }
            u
        };
        Ok(Self { root_url })
    }

    #[inline]
    #[must_use]
    pub fn root_url(&self) -> &url::Url {
        &self.root_url
    }
}

#[cfg(feature = "http")]
impl AssetReader for HttpAssetReader {
    async fn read_bytes(&self, uri: &str) -> Result<Vec<u8>> {
        let url = self
            .root_url
            .join(uri)
            .map_err(|e| AssetError::Http(e.to_string()))?;
        let response = ehttp::fetch_async(ehttp::Request::get(url.as_str()))
            .await
            .map_err(AssetError::Http)?;
        if !response.ok {
            return Err(AssetError::Http(format!(
                "{} {} ({url})",
                response.status, response.status_text
            ))
            .into());
        }
        Ok(response.bytes)
    }
}

/// Reader picked from the shape of a source string.
#[derive(Clone)]
pub enum AssetReaderVariant {
    File(Arc<FileAssetReader>),
    #[cfg(feature = "http")]
    Http(Arc<HttpAssetReader>),
}

impl AssetReaderVariant {
    /// Creates a reader rooted at the directory containing `source`.
    pub fn from_source(source: &str) -> Result<Self> {
        if is_url(source) {
            #[cfg(feature = "http")]
            {
                Ok(Self::Http(Arc::new(HttpAssetReader::new(source)?)))
            }
            #[cfg(not(feature = "http"))]
            {
                Err(AssetError::FeatureNotEnabled(
                    "HTTP feature is not enabled. Enable it with `features = [\"http\"]`"
                        .to_string(),
                )
                .into())
            }
        } else {
            let root = Path::new(source).parent().unwrap_or(Path::new(""));
            Ok(Self::File(Arc::new(FileAssetReader::new(root))))
        }
    }

    pub async fn read_bytes(&self, uri: &str) -> Result<Vec<u8>> {
        match self {
            Self::File(r) => r.read_bytes(uri).await,
            #[cfg(feature = "http")]
            Self::Http(r) => r.read_bytes(uri).await,
        }
    }

    /// File name part of a path or URL.
    #[must_use]
    pub fn source_filename(source: &str) -> &str {
        if is_url(source) {
            source.rsplit('/').next().unwrap_or(source)
        } else {
            Path::new(source)
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or(source)
        }
    }
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Reads a whole file or URL.
pub async fn read_asset(source: &str) -> Result<Vec<u8>> {
    let reader = AssetReaderVariant::from_source(source)?;
    reader
        .read_bytes(AssetReaderVariant::source_filename(source))
        .await
}

/// Reads a whole file or URL as UTF-8 text.
pub async fn read_asset_text(source: &str) -> Result<String> {
    let bytes = read_asset(source).await?;
    String::from_utf8(bytes)
        .map_err(|e| AssetError::Format(format!("{source} is not valid UTF-8: {e}")).into())
}
