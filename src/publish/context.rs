// ABOUTME: Deterministic build context archives for the Docker build API.
// ABOUTME: Sorted entries and zeroed mtimes make the BLAKE3 digest depend on content only.

use bytes::Bytes;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const DOCKERIGNORE: &str = ".dockerignore";
const SHORT_DIGEST_LEN: usize = 12;

/// A tar archive of a build directory plus a digest of its contents.
#[derive(Debug, Clone)]
pub struct BuildContext {
    archive: Bytes,
    digest: String,
    files: usize,
}

impl BuildContext {
    /// Archive `dir`. Fails if the directory or the Dockerfile inside it is missing.
    ///
    /// This does blocking file I/O; call it from `spawn_blocking`.
    pub fn load(dir: &Path, dockerfile: &str) -> io::Result<Self> {
        if !dir.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("build context {} is not a directory", dir.display()),
            ));
        }
        if !dir.join(dockerfile).is_file() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found in {}", dockerfile, dir.display()),
            ));
        }

        let ignore = IgnoreRules::load(dir)?;
        let mut builder = tar::Builder::new(Vec::new());
        let mut hasher = blake3::Hasher::new();
        let mut files = 0;

        let walker = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.path()
                    .strip_prefix(dir)
                    .map(|rel| rel.as_os_str().is_empty() || !ignore.is_ignored(&slash_path(rel)))
                    .unwrap_or(false)
            });

        for entry in walker {
            let entry = entry.map_err(io::Error::other)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = slash_path(entry.path().strip_prefix(dir).map_err(io::Error::other)?);
            let content = std::fs::read(entry.path())?;
            let mode = file_mode(&entry.metadata().map_err(io::Error::other)?);

            let mut header = tar::Header::new_gnu();
            header.set_path(&rel)?;
            header.set_size(content.len() as u64);
            header.set_mode(mode);
            header.set_mtime(0);
            header.set_cksum();
            builder.append(&header, content.as_slice())?;

            hasher.update(rel.as_bytes());
            hasher.update(&[0]);
            hasher.update(&mode.to_le_bytes());
            hasher.update(&(content.len() as u64).to_le_bytes());
            hasher.update(&content);
            files += 1;
        }

        let archive = builder.into_inner()?;
        Ok(Self {
            archive: Bytes::from(archive),
            digest: hasher.finalize().to_hex().to_string(),
            files,
        })
    }

    pub fn archive(&self) -> Bytes {
        self.archive.clone()
    }

    /// Full hex BLAKE3 digest of the context.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Digest prefix used in tags.
    pub fn short_digest(&self) -> &str {
        &self.digest[..SHORT_DIGEST_LEN]
    }

    pub fn file_count(&self) -> usize {
        self.files
    }
}

/// Load a context on the blocking pool.
pub async fn load_context(dir: PathBuf, dockerfile: String) -> io::Result<BuildContext> {
    tokio::task::spawn_blocking(move || BuildContext::load(&dir, &dockerfile))
        .await
        .map_err(io::Error::other)?
}

fn slash_path(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(unix)]
fn file_mode(meta: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    if meta.permissions().mode() & 0o111 != 0 {
        0o755
    } else {
        0o644
    }
}

#[cfg(not(unix))]
fn file_mode(_meta: &std::fs::Metadata) -> u32 {
    0o644
}

/// Literal `.dockerignore` entries. Wildcards and negations are not supported
/// and are skipped.
#[derive(Debug, Default)]
struct IgnoreRules {
    entries: Vec<String>,
}

impl IgnoreRules {
    fn load(dir: &Path) -> io::Result<Self> {
        let mut entries = vec![".git".to_string()];
        let path = dir.join(DOCKERIGNORE);
        if path.is_file() {
            let content = std::fs::read_to_string(&path)?;
            entries.extend(Self::parse(&content));
        }
        Ok(Self { entries })
    }

    fn parse(content: &str) -> Vec<String> {
        content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .filter_map(|l| {
                if l.contains(['*', '?', '[']) || l.starts_with('!') {
                    tracing::debug!(pattern = l, "unsupported .dockerignore pattern skipped");
                    None
                } else {
                    Some(l.trim_start_matches("./").trim_matches('/').to_string())
                }
            })
            .filter(|l| !l.is_empty())
            .collect()
    }

    fn is_ignored(&self, rel: &str) -> bool {
        self.entries.iter().any(|entry| {
            rel == entry
                || rel
                    .strip_prefix(entry.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}
