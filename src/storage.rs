//! Object storage access for raw dataset downloads.
//!
//! Three backends sit behind [`ObjectStore`]:
//!
//! - [`S3ObjectStore`]: AWS S3, signed with the default credential chain
//!   (environment, shared config/credentials files, web identity, instance
//!   metadata)
//! - [`HttpObjectStore`]: blocking GET against an S3-compatible endpoint
//!   (`{endpoint}/{bucket}/{object}`)
//! - [`LocalObjectStore`]: a directory whose subdirectories act as buckets
//!
//! The backend is chosen from `storage_endpoint` by [`from_endpoint`].
//! Every backend writes to a temp file next to `dest` and renames it into
//! place, so a failed download never leaves a partial file behind.

use crate::error::{PipelineError, Result, ResultExt as _};
use aws_sdk_s3::error::DisplayErrorContext;
use std::io::Write as _;
use std::path::{Path, PathBuf};

/// Storage backend able to fetch one object to a local file.
pub trait ObjectStore {
    /// Download `bucket/object` to `dest`, replacing any existing file.
    fn download(&self, bucket: &str, object: &str, dest: &Path) -> Result<()>;

    /// Backend name for logging
    fn backend_type(&self) -> &'static str;
}

/// Run `write` against a temp file in `dest`'s directory, then move it to
/// `dest`. The temp file is removed when `write` fails.
fn write_atomically<F>(dest: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut std::fs::File) -> Result<()>,
{
    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;

    write(tmp.as_file_mut())?;

    tmp.persist(dest)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to move download to {}", dest.display()))?;
    Ok(())
}

/// AWS S3 backend.
#[derive(Debug)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    runtime: tokio::runtime::Runtime,
}

impl S3ObjectStore {
    /// Build a client from the default AWS config chain. `region` overrides
    /// the region found there.
    pub fn new(region: Option<&str>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start S3 client runtime")?;

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region.to_owned()));
        }
        let sdk_config = runtime.block_on(loader.load());

        Ok(Self {
            client: aws_sdk_s3::Client::new(&sdk_config),
            runtime,
        })
    }

    pub fn region(&self) -> Option<String> {
        self.client.config().region().map(ToString::to_string)
    }
}

impl ObjectStore for S3ObjectStore {
    fn download(&self, bucket: &str, object: &str, dest: &Path) -> Result<()> {
        let key = object.trim_start_matches('/');
        tracing::info!("Downloading s3://{bucket}/{key}");

        let body = self.runtime.block_on(async {
            let output = self
                .client
                .get_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| {
                    PipelineError::Download(format!(
                        "s3://{bucket}/{key}: {}",
                        DisplayErrorContext(&e)
                    ))
                })?;
            output
                .body
                .collect()
                .await
                .map(|data| data.into_bytes())
                .map_err(|e| PipelineError::Download(format!("reading s3://{bucket}/{key}: {e}")))
        })?;

        write_atomically(dest, |file| {
            file.write_all(&body)
                .with_context(|| format!("Failed to write {}", dest.display()))
        })?;

        tracing::info!(bytes = body.len(), "Downloaded from bucket: {bucket}");
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "s3"
    }
}

/// S3-compatible HTTP(S) backend without request signing.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpObjectStore {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    pub fn object_url(&self, bucket: &str, object: &str) -> String {
        format!(
            "{}/{bucket}/{}",
            self.endpoint.trim_end_matches('/'),
            object.trim_start_matches('/')
        )
    }
}

impl ObjectStore for HttpObjectStore {
    fn download(&self, bucket: &str, object: &str, dest: &Path) -> Result<()> {
        let url = self.object_url(bucket, object);
        tracing::info!("Downloading {url}");

        let mut response = self
            .client
            .get(&url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| PipelineError::Download(format!("GET {url}: {e}")))?;

        write_atomically(dest, |file| {
            response
                .copy_to(file)
                .map(drop)
                .map_err(|e| PipelineError::Download(format!("reading body of {url}: {e}")))
        })?;

        tracing::info!("Downloaded from bucket: {bucket}");
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "http"
    }
}

/// Directory-backed store: `root/<bucket>/<object>`.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn object_path(&self, bucket: &str, object: &str) -> PathBuf {
        self.root.join(bucket).join(object.trim_start_matches('/'))
    }
}

impl ObjectStore for LocalObjectStore {
    fn download(&self, bucket: &str, object: &str, dest: &Path) -> Result<()> {
        let source = self.object_path(bucket, object);
        if !source.is_file() {
            return Err(PipelineError::Download(format!(
                "object '{object}' not found in bucket '{bucket}' ({})",
                source.display()
            )));
        }

        let mut reader = std::fs::File::open(&source)
            .with_context(|| format!("Failed to open {}", source.display()))?;
        write_atomically(dest, |file| {
            std::io::copy(&mut reader, file).map(drop).with_context(|| {
                format!("Failed to copy {} to {}", source.display(), dest.display())
            })
        })
    }

    fn backend_type(&self) -> &'static str {
        "local"
    }
}

/// Pick a backend for `storage_endpoint`.
///
/// `None` uses AWS S3 with the default credential chain and `region` as an
/// optional override. `http(s)://` endpoints use the HTTP backend. Anything
/// else is a directory, resolved against `root` when relative.
pub fn from_endpoint(
    endpoint: Option<&str>,
    region: Option<&str>,
    root: &Path,
) -> Result<Box<dyn ObjectStore>> {
    match endpoint {
        None => Ok(Box::new(S3ObjectStore::new(region)?)),
        Some(e) if e.starts_with("http://") || e.starts_with("https://") => {
            Ok(Box::new(HttpObjectStore::new(e)?))
        }
        Some(dir) => {
            let dir = dir.strip_prefix("file://").unwrap_or(dir);
            Ok(Box::new(LocalObjectStore::new(root.join(dir))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_object_url() {
        let store = HttpObjectStore::new("http://minio:9000/").expect("client builds");
        assert_eq!(
            store.object_url("tourism", "/Travel.csv"),
            "http://minio:9000/tourism/Travel.csv"
        );
        assert_eq!(
            store.object_url("tourism", "raw/Travel.csv"),
            "http://minio:9000/tourism/raw/Travel.csv"
        );
    }

    #[test]
    fn test_http_download_writes_body() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/tourism/Travel.csv")
            .with_status(200)
            .with_body("a,b\n1,2\n")
            .create();

        let tmp = tempfile::tempdir().expect("tempdir");
        let dest = tmp.path().join("Travel.csv");
        let store = HttpObjectStore::new(server.url()).expect("client builds");
        store
            .download("tourism", "Travel.csv", &dest)
            .expect("download");

        mock.assert();
        assert_eq!(std::fs::read_to_string(&dest).expect("read"), "a,b\n1,2\n");
    }

    #[test]
    fn test_http_forbidden_is_download_error_and_leaves_no_file() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/private/Travel.csv")
            .with_status(403)
            .with_body("<Error><Code>AccessDenied</Code></Error>")
            .create();

        let tmp = tempfile::tempdir().expect("tempdir");
        let dest = tmp.path().join("Travel.csv");
        let store = HttpObjectStore::new(server.url()).expect("client builds");
        let err = store
            .download("private", "Travel.csv", &dest)
            .unwrap_err();

        mock.assert();
        assert!(matches!(err, PipelineError::Download(_)), "{err}");
        assert!(err.to_string().contains("403"), "{err}");
        assert!(!dest.exists());
        assert_eq!(std::fs::read_dir(tmp.path()).expect("list").count(), 0);
    }

    #[test]
    fn test_failed_write_keeps_previous_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let dest = tmp.path().join("Travel.csv");
        std::fs::write(&dest, "old").expect("previous download");

        let err = write_atomically(&dest, |file| {
            file.write_all(b"a,b\n1,").expect("partial write");
            Err(PipelineError::Download("connection reset".to_owned()))
        })
        .unwrap_err();

        assert!(matches!(err, PipelineError::Download(_)));
        assert_eq!(std::fs::read_to_string(&dest).expect("read"), "old");
        assert_eq!(std::fs::read_dir(tmp.path()).expect("list").count(), 1);
    }

    #[test]
    fn test_local_store_copies_object() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let bucket_dir = tmp.path().join("bucket");
        std::fs::create_dir_all(&bucket_dir).expect("bucket dir");
        std::fs::write(bucket_dir.join("data.csv"), "a,b\n1,2\n").expect("object");

        let store = LocalObjectStore::new(tmp.path());
        let dest = tmp.path().join("out.csv");
        store.download("bucket", "data.csv", &dest).expect("download");

        assert_eq!(std::fs::read_to_string(dest).expect("read"), "a,b\n1,2\n");
    }

    #[test]
    fn test_local_store_missing_object_is_download_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = LocalObjectStore::new(tmp.path());
        let err = store
            .download("bucket", "missing.csv", &tmp.path().join("x"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Download(_)));
    }

    #[test]
    fn test_from_endpoint_selects_backend() {
        let root = Path::new("/srv");
        let store = from_endpoint(Some("file://buckets"), None, root).expect("local");
        assert_eq!(store.backend_type(), "local");

        let store = from_endpoint(Some("https://s3.example.com"), None, root).expect("http");
        assert_eq!(store.backend_type(), "http");

        let store = from_endpoint(None, Some("eu-west-1"), root).expect("s3");
        assert_eq!(store.backend_type(), "s3");
    }

    #[test]
    fn test_s3_store_uses_configured_region() {
        let store = S3ObjectStore::new(Some("eu-west-1")).expect("s3 client");
        assert_eq!(store.region().as_deref(), Some("eu-west-1"));
    }
}
