//! Template snapshot retrieval.
//!
//! A template is a GitHub repository. Its default branch is downloaded as a
//! gzipped tarball and unpacked into the project directory with the
//! top-level folder stripped, the same shape `degit` produces.

use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use devanthos_core::config::TemplateConfig;
use devanthos_core::error::{AppError, ErrorKind};
use devanthos_core::result::AppResult;

/// Default archive host.
pub const DEFAULT_ARCHIVE_BASE: &str = "https://codeload.github.com";

/// File every valid template snapshot must contain.
pub const REQUIRED_FILE: &str = "package.json";

/// Downloads a template snapshot into a directory.
#[async_trait]
pub trait TemplateFetcher: Send + Sync + std::fmt::Debug {
    /// Writes the snapshot of `template` into `target`, which exists and is empty.
    async fn fetch(&self, template: &TemplateConfig, target: &Path) -> AppResult<()>;
}

/// Fetches templates as tarballs over HTTPS.
#[derive(Debug, Clone)]
pub struct TarballFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl TarballFetcher {
    /// Creates a fetcher with a request timeout.
    pub fn new(timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("create-devanthos/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::network(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: DEFAULT_ARCHIVE_BASE.to_string(),
        })
    }

    /// Overrides the archive host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Archive URL for `owner/repo`.
    pub fn archive_url(&self, repo: &str) -> String {
        format!("{}/{}/tar.gz/HEAD", self.base_url, repo.trim_matches('/'))
    }
}

#[async_trait]
impl TemplateFetcher for TarballFetcher {
    async fn fetch(&self, template: &TemplateConfig, target: &Path) -> AppResult<()> {
        let url = self.archive_url(&template.repo);
        debug!(url = %url, "Downloading template archive");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::network(format!("Failed to download template: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::not_found(format!(
                "Template '{}' was not found. Check that the repository exists and is readable",
                template.repo
            )));
        }
        if !status.is_success() {
            return Err(AppError::network(format!(
                "Failed to download template '{}': HTTP {status}",
                template.repo
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::network(format!("Failed to read template archive: {e}")))?;

        let target = target.to_path_buf();
        let written = tokio::task::spawn_blocking(move || unpack_archive(&bytes[..], &target))
            .await
            .map_err(|e| AppError::internal(format!("Archive extraction task failed: {e}")))??;

        info!(repo = %template.repo, files = written, "Template archive unpacked");
        Ok(())
    }
}

/// Outcome of [`clone_template`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClonedTemplate {
    /// Project directory.
    pub path: PathBuf,
    /// Template description.
    pub description: String,
}

/// Fetches `template` into `target` and verifies the result.
///
/// The target must be missing or empty. On any failure the target directory
/// is removed again.
pub async fn clone_template(
    fetcher: &dyn TemplateFetcher,
    template: &TemplateConfig,
    target: &Path,
) -> AppResult<ClonedTemplate> {
    prepare_target(target).await?;

    let result = async {
        fetcher.fetch(template, target).await?;
        if !tokio::fs::try_exists(target.join(REQUIRED_FILE))
            .await
            .unwrap_or(false)
        {
            return Err(AppError::template(format!(
                "The fetched template is not valid (missing {REQUIRED_FILE}). Check that {} exists and is accessible",
                template.repo
            )));
        }
        Ok(())
    }
    .await;

    match result {
        Ok(()) => Ok(ClonedTemplate {
            path: target.to_path_buf(),
            description: template.description.clone(),
        }),
        Err(err) => {
            cleanup(target).await;
            Err(err)
        }
    }
}

/// Creates `target`, refusing an existing non-empty directory.
pub async fn prepare_target(target: &Path) -> AppResult<()> {
    match tokio::fs::read_dir(target).await {
        Ok(mut entries) => {
            if entries.next_entry().await?.is_some() {
                return Err(AppError::conflict(format!(
                    "Directory \"{}\" already exists and is not empty. Use a different name or remove it first",
                    target.display()
                )));
            }
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tokio::fs::create_dir_all(target).await?;
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotADirectory => Err(AppError::conflict(
            format!("\"{}\" already exists and is not a directory", target.display()),
        )),
        Err(e) => Err(e.into()),
    }
}

async fn cleanup(target: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(target).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %target.display(), error = %e, "Could not clean up project directory");
        }
    }
}

/// Unpacks a gzipped tarball into `target`, stripping the top-level folder.
///
/// Links are skipped and any entry that would land outside `target` aborts
/// extraction. Returns the number of files written.
pub fn unpack_archive(reader: impl Read, target: &Path) -> AppResult<usize> {
    let archive_error = |e: std::io::Error| {
        AppError::with_source(ErrorKind::Template, format!("Invalid template archive: {e}"), e)
    };

    let canonical_target = std::fs::canonicalize(target)?;
    let decoder = flate2::read::GzDecoder::new(reader);
    let mut archive = tar::Archive::new(decoder);
    let mut written = 0;

    for entry in archive.entries().map_err(archive_error)? {
        let mut entry = entry.map_err(archive_error)?;
        let kind = entry.header().entry_type();
        if kind.is_symlink() || kind.is_hard_link() {
            debug!("Skipping link entry in template archive");
            continue;
        }

        let path = entry.path().map_err(archive_error)?.into_owned();
        let Some(relative) = sanitize_archive_path(&path)? else {
            continue;
        };

        let dest = target.join(&relative);
        if kind.is_dir() {
            std::fs::create_dir_all(&dest)?;
            continue;
        }

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
            if !std::fs::canonicalize(parent)?.starts_with(&canonical_target) {
                return Err(AppError::template(format!(
                    "Archive entry escapes the project directory: {}",
                    path.display()
                )));
            }
        }

        entry.unpack(&dest).map_err(archive_error)?;
        written += 1;
    }

    Ok(written)
}

/// Strips the leading folder of an archive path and rejects unsafe components.
///
/// Returns `None` for the top-level folder itself.
pub fn sanitize_archive_path(path: &Path) -> AppResult<Option<PathBuf>> {
    let stripped: PathBuf = path.components().skip(1).collect();
    if stripped.as_os_str().is_empty() {
        return Ok(None);
    }

    for component in stripped.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(AppError::template(format!(
                    "Archive contains an unsafe path: {}",
                    path.display()
                )));
            }
        }
    }

    Ok(Some(stripped))
}

#[cfg(test)]
mod tests {
    use flate2::Compression;
    use flate2::write::GzEncoder;

    use super::*;

    fn archive(entries: &[(&str, &str)]) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (path, body) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(body.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, path, body.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn template() -> TemplateConfig {
        TemplateConfig {
            repo: "acme/starter".to_string(),
            description: "Starter".to_string(),
        }
    }

    /// Writes a fixed archive instead of downloading.
    #[derive(Debug)]
    struct FixtureFetcher(Vec<u8>);

    #[async_trait]
    impl TemplateFetcher for FixtureFetcher {
        async fn fetch(&self, _template: &TemplateConfig, target: &Path) -> AppResult<()> {
            unpack_archive(&self.0[..], target).map(|_| ())
        }
    }

    #[test]
    fn test_sanitize_strips_top_level() {
        assert_eq!(
            sanitize_archive_path(Path::new("repo-main/src/index.ts")).unwrap(),
            Some(PathBuf::from("src/index.ts"))
        );
        assert_eq!(sanitize_archive_path(Path::new("repo-main")).unwrap(), None);
        assert!(sanitize_archive_path(Path::new("repo-main/../../etc/passwd")).is_err());
    }

    #[test]
    fn test_archive_url() {
        let fetcher = TarballFetcher::new(Duration::from_secs(5))
            .unwrap()
            .with_base_url("http://localhost:9000/");
        assert_eq!(
            fetcher.archive_url("devanthos/astro-template-devanthos"),
            "http://localhost:9000/devanthos/astro-template-devanthos/tar.gz/HEAD"
        );
    }

    #[test]
    fn test_unpack_archive_strips_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = archive(&[
            ("starter-main/package.json", "{\"name\":\"starter\"}"),
            ("starter-main/src/index.ts", "export {};"),
        ]);

        let written = unpack_archive(&bytes[..], dir.path()).unwrap();

        assert_eq!(written, 2);
        assert!(dir.path().join("package.json").is_file());
        assert!(dir.path().join("src").join("index.ts").is_file());
        assert!(!dir.path().join("starter-main").exists());
    }

    #[tokio::test]
    async fn test_prepare_target_rejects_non_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("existing.txt"), "x").unwrap();

        let err = prepare_target(dir.path()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);

        let fresh = dir.path().join("fresh");
        prepare_target(&fresh).await.unwrap();
        assert!(fresh.is_dir());
        prepare_target(&fresh).await.unwrap();
    }

    #[tokio::test]
    async fn test_clone_template_success() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("site");
        let fetcher = FixtureFetcher(archive(&[("starter-main/package.json", "{}")]));

        let cloned = clone_template(&fetcher, &template(), &target).await.unwrap();

        assert_eq!(cloned.path, target);
        assert_eq!(cloned.description, "Starter");
    }

    #[tokio::test]
    async fn test_clone_template_without_package_json_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("site");
        let fetcher = FixtureFetcher(archive(&[("starter-main/README.md", "# hi")]));

        let err = clone_template(&fetcher, &template(), &target).await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::Template);
        assert!(err.message.contains("package.json"));
        assert!(!target.exists());
    }
}
