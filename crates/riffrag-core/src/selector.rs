//! File selection: which files under a root become candidates for chunking.
//!
//! The walk is a lazy, single-use iterator. Directories matching an exclude
//! are pruned before descending and symlinks are never followed. With
//! `respect_vcs_ignore`, every `.gitignore` met on the way down is pushed on a
//! rule stack scoped to its subtree and popped when the walk leaves it; the
//! innermost rule that matches wins, as in git.

use chrono::{DateTime, Utc};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::Match;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::types::{IndexOptions, SkipReason};

/// Bytes inspected by the binary probe.
pub const PROBE_LEN: usize = 8192;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];

/// Gitignore-syntax patterns always applied before user patterns.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    // version control
    ".git/", ".hg/", ".svn/", ".gitignore",
    // dependencies and virtualenvs
    "node_modules/", "vendor/", "bower_components/", "venv/", ".venv/", "env/", "__pycache__/", "*.egg-info/", ".tox/", ".pytest_cache/", ".mypy_cache/",
    // build output
    "target/", "dist/", "build/", "out/", ".next/", ".gradle/",
    // editors
    ".idea/", ".vscode/", "*.swp", ".DS_Store",
    // lock files
    "*.lock", "package-lock.json", "pnpm-lock.yaml", "go.sum",
    // secrets, logs, scratch
    ".env", ".env.*", "*.log", "*.tmp",
    // databases
    "*.db", "*.sqlite", "*.sqlite3",
    // binaries and media
    "*.pyc", "*.pyo", "*.class", "*.jar", "*.war", "*.o", "*.a", "*.so", "*.dylib", "*.dll", "*.exe", "*.bin", "*.wasm",
    "*.png", "*.jpg", "*.jpeg", "*.gif", "*.bmp", "*.ico", "*.webp", "*.tiff", "*.psd",
    "*.zip", "*.tar", "*.gz", "*.tgz", "*.bz2", "*.xz", "*.7z", "*.rar",
    "*.pdf", "*.mp3", "*.mp4", "*.wav", "*.mov", "*.avi", "*.ttf", "*.otf", "*.woff", "*.woff2", "*.eot",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorConfig {
    pub max_file_size_bytes: u64,
    pub extra_excludes: Vec<String>,
    pub respect_vcs_ignore: bool,
}

impl From<&IndexOptions> for SelectorConfig {
    fn from(o: &IndexOptions) -> Self {
        Self { max_file_size_bytes: o.max_file_size_bytes, extra_excludes: o.extra_excludes.clone(), respect_vcs_ignore: o.respect_vcs_ignore }
    }
}

/// A file that passed every filter and is ready to be read and chunked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub absolute_path: PathBuf,
    /// `/`-separated path relative to the root.
    pub relative_path: String,
    pub size_bytes: u64,
    /// RFC 3339, empty when the platform cannot report it.
    pub modified_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    File(SelectedFile),
    Skipped { path: PathBuf, reason: SkipReason },
}

pub struct FileSelector {
    root: PathBuf,
    config: SelectorConfig,
    excludes: Gitignore,
}

impl FileSelector {
    pub fn new(root: &Path, config: SelectorConfig) -> Result<Self> {
        let root = fs::canonicalize(root).map_err(|e| Error::io(root, e))?;
        if !root.is_dir() { return Err(Error::InvalidConfig(format!("{} is not a directory", root.display()))); }
        let mut builder = GitignoreBuilder::new(&root);
        for pattern in DEFAULT_EXCLUDES.iter().copied().chain(config.extra_excludes.iter().map(String::as_str)) {
            builder.add_line(None, pattern.trim()).map_err(|e| Error::InvalidConfig(format!("bad exclude pattern {pattern:?}: {e}")))?;
        }
        let excludes = builder.build().map_err(|e| Error::InvalidConfig(format!("exclude patterns: {e}")))?;
        Ok(Self { root, config, excludes })
    }

    /// Canonical root all relative paths are computed against.
    pub fn root(&self) -> &Path { &self.root }

    /// Start a fresh traversal.
    pub fn walk(&self) -> Walk<'_> {
        let inner = walkdir::WalkDir::new(&self.root).follow_links(false).sort_by_file_name().into_iter();
        Walk { selector: self, inner, rules: Vec::new() }
    }

    fn is_excluded(&self, path: &Path, is_dir: bool, rules: &[(usize, Gitignore)]) -> bool {
        match self.excludes.matched(path, is_dir) {
            Match::Ignore(_) => return true,
            Match::Whitelist(_) => return false,
            Match::None => {}
        }
        for (_, rule) in rules.iter().rev() {
            match rule.matched(path, is_dir) {
                Match::Ignore(_) => return true,
                Match::Whitelist(_) => return false,
                Match::None => {}
            }
        }
        false
    }

    fn inspect(&self, path: &Path, relative_path: String, metadata: &fs::Metadata) -> Candidate {
        let skipped = |reason| Candidate::Skipped { path: path.to_path_buf(), reason };
        let size_bytes = metadata.len();
        if size_bytes > self.config.max_file_size_bytes { return skipped(SkipReason::TooLarge); }
        if size_bytes == 0 { return skipped(SkipReason::Empty); }
        match read_probe(path) {
            Ok(sample) if looks_binary(&sample) => return skipped(SkipReason::Binary),
            Ok(_) => {}
            Err(e) => { warn!(path = %path.display(), error = %e, "cannot read file"); return skipped(SkipReason::Unreadable); }
        }
        let modified_at = metadata.modified().map(|t| DateTime::<Utc>::from(t).to_rfc3339()).unwrap_or_default();
        Candidate::File(SelectedFile { absolute_path: path.to_path_buf(), relative_path, size_bytes, modified_at })
    }
}

fn load_gitignore(dir: &Path) -> Option<Gitignore> {
    let file = dir.join(".gitignore");
    if !file.is_file() { return None; }
    let mut builder = GitignoreBuilder::new(dir);
    if let Some(e) = builder.add(&file) { warn!(path = %file.display(), error = %e, "partially invalid .gitignore"); }
    match builder.build() {
        Ok(gi) => Some(gi),
        Err(e) => { warn!(path = %file.display(), error = %e, "ignoring unusable .gitignore"); None }
    }
}

/// Iterator returned by [`FileSelector::walk`]. Yields files and per-file skips; pruned
/// directories and symlinks are not yielded.
pub struct Walk<'a> {
    selector: &'a FileSelector,
    inner: walkdir::IntoIter,
    rules: Vec<(usize, Gitignore)>,
}

impl Iterator for Walk<'_> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                    warn!(path = %path.display(), error = %err, "walk error");
                    return Some(Candidate::Skipped { path, reason: SkipReason::Unreadable });
                }
            };
            let depth = entry.depth();
            let path = entry.path();
            if depth == 0 {
                if self.selector.config.respect_vcs_ignore { self.rules.extend(load_gitignore(path).map(|gi| (0, gi))); }
                continue;
            }
            self.rules.retain(|(d, _)| *d < depth);

            let file_type = entry.file_type();
            if file_type.is_symlink() { debug!(path = %path.display(), "symlink not followed"); continue; }
            let is_dir = file_type.is_dir();
            if self.selector.is_excluded(path, is_dir, &self.rules) {
                if is_dir { debug!(path = %path.display(), "pruned directory"); self.inner.skip_current_dir(); continue; }
                return Some(Candidate::Skipped { path: path.to_path_buf(), reason: SkipReason::Excluded });
            }
            if is_dir {
                if self.selector.config.respect_vcs_ignore { self.rules.extend(load_gitignore(path).map(|gi| (depth, gi))); }
                continue;
            }
            if !file_type.is_file() { continue; }
            let Some(relative) = relative_path(&self.selector.root, path) else {
                debug!(path = %path.display(), "path is not valid UTF-8");
                return Some(Candidate::Skipped { path: path.to_path_buf(), reason: SkipReason::DecodeFailure });
            };
            return Some(match entry.metadata() {
                Ok(metadata) => self.selector.inspect(path, relative, &metadata),
                Err(e) => { warn!(path = %path.display(), error = %e, "cannot stat file"); Candidate::Skipped { path: path.to_path_buf(), reason: SkipReason::Unreadable } }
            });
        }
    }
}

/// `/`-joined path under `root`. `None` when a component is not valid UTF-8, since a
/// lossy conversion could give two distinct files the same stored path.
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let parts: Option<Vec<&str>> = rel.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}

fn read_probe(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut sample = Vec::with_capacity(PROBE_LEN);
    File::open(path)?.take(PROBE_LEN as u64).read_to_end(&mut sample)?;
    Ok(sample)
}

/// Binary probe over a leading sample: NUL bytes (unless UTF-16 by BOM) or more
/// than 10% control bytes outside the usual whitespace set.
pub fn looks_binary(sample: &[u8]) -> bool {
    if sample.starts_with(UTF16_LE_BOM) || sample.starts_with(UTF16_BE_BOM) { return false; }
    if sample.contains(&0) { return true; }
    match std::str::from_utf8(sample) {
        Ok(_) => return false,
        // a multi-byte char cut off by the sample boundary is still text
        Err(e) if e.error_len().is_none() => return false,
        Err(_) => {}
    }
    let suspicious = sample.iter().filter(|&&b| (b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x08 | 0x0c | 0x1b)) || b == 0x7f).count();
    suspicious * 10 > sample.len()
}

/// Best-effort decoding: UTF-8 (BOM stripped), UTF-16 by BOM, else Latin-1.
/// `None` when a declared encoding does not hold.
pub fn decode_bytes(bytes: &[u8]) -> Option<String> {
    if let Some(rest) = bytes.strip_prefix(UTF8_BOM) { return std::str::from_utf8(rest).ok().map(str::to_owned); }
    if let Some(rest) = bytes.strip_prefix(UTF16_LE_BOM) { return decode_utf16(rest, u16::from_le_bytes); }
    if let Some(rest) = bytes.strip_prefix(UTF16_BE_BOM) { return decode_utf16(rest, u16::from_be_bytes); }
    if let Ok(s) = std::str::from_utf8(bytes) { return Some(s.to_owned()); }
    Some(bytes.iter().copied().map(char::from).collect())
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Option<String> {
    if bytes.len() % 2 != 0 { return None; }
    let units: Vec<u16> = bytes.chunks_exact(2).map(|p| unit([p[0], p[1]])).collect();
    String::from_utf16(&units).ok()
}

/// Read and decode a selected file, mapping failures to their skip reason.
pub fn read_text(file: &SelectedFile) -> std::result::Result<String, SkipReason> {
    let bytes = fs::read(&file.absolute_path).map_err(|e| {
        warn!(path = %file.absolute_path.display(), error = %e, "cannot read file");
        SkipReason::Unreadable
    })?;
    decode_bytes(&bytes).ok_or_else(|| {
        debug!(path = %file.relative_path, "undecodable text");
        SkipReason::DecodeFailure
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_probe() {
        assert!(!looks_binary(b"fn main() {}\n"));
        assert!(looks_binary(b"ELF\x00\x01\x02"));
        assert!(!looks_binary(&[0xFF, 0xFE, b'a', 0x00]));
        assert!(looks_binary(&[0x01, 0x02, 0x03, 0x04, 0x80, 0x81]));
        assert!(!looks_binary("caf\u{e9}".as_bytes().split_last().map(|(_, rest)| rest).unwrap_or_default()));
        assert!(!looks_binary(b"caf\xe9 au lait"), "latin-1 text is not binary");
    }

    #[test]
    fn decode_fallbacks() {
        assert_eq!(decode_bytes(b"\xEF\xBB\xBFhello").as_deref(), Some("hello"));
        assert_eq!(decode_bytes(&[0xFF, 0xFE, b'h', 0, b'i', 0]).as_deref(), Some("hi"));
        assert_eq!(decode_bytes(&[0xFE, 0xFF, 0, b'h', 0, b'i']).as_deref(), Some("hi"));
        assert_eq!(decode_bytes(b"caf\xe9").as_deref(), Some("caf\u{e9}"));
        assert_eq!(decode_bytes(&[0xFF, 0xFE, b'h']), None, "odd-length utf-16");
        assert_eq!(decode_bytes(&[0xFF, 0xFE, 0x00, 0xD8]), None, "lone surrogate");
    }

    #[test]
    fn relative_paths_use_forward_slashes() {
        assert_eq!(relative_path(Path::new("/r"), Path::new("/r/a/b.rs")).as_deref(), Some("a/b.rs"));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_components_have_no_relative_path() {
        use std::os::unix::ffi::OsStrExt;
        let name = std::ffi::OsStr::from_bytes(b"a\xff.txt");
        assert_eq!(relative_path(Path::new("/r"), &Path::new("/r/src").join(name)), None);
    }
}
