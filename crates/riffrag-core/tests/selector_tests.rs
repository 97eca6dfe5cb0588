use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use riffrag_core::selector::{read_text, Candidate, FileSelector, SelectorConfig};
use riffrag_core::types::SkipReason;

fn config() -> SelectorConfig {
    SelectorConfig { max_file_size_bytes: 1_000_000, extra_excludes: vec![], respect_vcs_ignore: true }
}

fn write(root: &Path, rel: &str, contents: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, contents).expect("write");
}

fn run(root: &Path, config: SelectorConfig) -> (Vec<String>, BTreeMap<String, SkipReason>) {
    let selector = FileSelector::new(root, config).expect("selector");
    let mut files = Vec::new();
    let mut skipped = BTreeMap::new();
    for candidate in selector.walk() {
        match candidate {
            Candidate::File(f) => files.push(f.relative_path),
            Candidate::Skipped { path, reason } => {
                let rel = path.strip_prefix(selector.root()).expect("under root").to_string_lossy().replace('\\', "/");
                skipped.insert(rel, reason);
            }
        }
    }
    (files, skipped)
}

#[test]
fn default_excludes_prune_dependency_and_build_dirs() {
    let tmp = TempDir::new().expect("tmp");
    let root = tmp.path();
    write(root, "src/main.rs", b"fn main() {}\n");
    write(root, "node_modules/left-pad/index.js", b"module.exports = 1;\n");
    write(root, "target/debug/out.rs", b"// generated\n");
    write(root, ".git/HEAD", b"ref: refs/heads/main\n");
    write(root, "Cargo.lock", b"# lock\n");
    write(root, "logo.png", b"\x89PNG");

    let (files, skipped) = run(root, config());
    assert_eq!(files, vec!["src/main.rs"]);
    assert_eq!(skipped.get("Cargo.lock"), Some(&SkipReason::Excluded));
    assert_eq!(skipped.get("logo.png"), Some(&SkipReason::Excluded));
    assert!(!skipped.keys().any(|k| k.starts_with("node_modules")), "pruned dirs are never descended into");
}

#[test]
fn nested_gitignore_is_scoped_to_its_subtree() {
    let tmp = TempDir::new().expect("tmp");
    let root = tmp.path();
    write(root, ".gitignore", b"*.gen.rs\n");
    write(root, "a/.gitignore", b"secret.txt\n!keep.gen.rs\n");
    write(root, "a/secret.txt", b"hidden\n");
    write(root, "a/keep.gen.rs", b"// kept by negation\n");
    write(root, "a/drop.gen.rs", b"// dropped by root rule\n");
    write(root, "b/secret.txt", b"visible here\n");
    write(root, "b/x.gen.rs", b"// dropped\n");

    let (files, skipped) = run(root, config());
    assert_eq!(files, vec!["a/keep.gen.rs", "b/secret.txt"]);
    assert_eq!(skipped.get("a/secret.txt"), Some(&SkipReason::Excluded));
    assert_eq!(skipped.get("a/drop.gen.rs"), Some(&SkipReason::Excluded));
    assert_eq!(skipped.get("b/x.gen.rs"), Some(&SkipReason::Excluded));
}

#[test]
fn vcs_ignore_can_be_disabled() {
    let tmp = TempDir::new().expect("tmp");
    let root = tmp.path();
    write(root, ".gitignore", b"notes.md\n");
    write(root, "notes.md", b"# notes\n");

    let (files, _) = run(root, SelectorConfig { respect_vcs_ignore: false, ..config() });
    assert_eq!(files, vec!["notes.md"]);
}

#[test]
fn user_globs_union_with_defaults() {
    let tmp = TempDir::new().expect("tmp");
    let root = tmp.path();
    write(root, "keep.rs", b"fn a() {}\n");
    write(root, "docs/guide.md", b"# guide\n");
    write(root, "fixtures/data.json", b"{}\n");

    let cfg = SelectorConfig { extra_excludes: vec!["*.md".into(), "fixtures/".into()], ..config() };
    let (files, skipped) = run(root, cfg);
    assert_eq!(files, vec!["keep.rs"]);
    assert_eq!(skipped.get("docs/guide.md"), Some(&SkipReason::Excluded));
}

#[test]
fn size_binary_and_empty_files_are_skipped_with_reason() {
    let tmp = TempDir::new().expect("tmp");
    let root = tmp.path();
    write(root, "small.txt", b"one\ntwo\nthree\nfour\nfive\n");
    write(root, "huge.txt", &vec![b'a'; 2_000_000]);
    write(root, "blob.dat", &[0x7f, b'E', b'L', b'F', 0, 0, 1, 2]);
    write(root, "empty.txt", b"");

    let (files, skipped) = run(root, config());
    assert_eq!(files, vec!["small.txt"]);
    assert_eq!(skipped.get("huge.txt"), Some(&SkipReason::TooLarge));
    assert_eq!(skipped.get("blob.dat"), Some(&SkipReason::Binary));
    assert_eq!(skipped.get("empty.txt"), Some(&SkipReason::Empty));
}

#[cfg(unix)]
#[test]
fn symlinks_are_not_followed() {
    let tmp = TempDir::new().expect("tmp");
    let root = tmp.path();
    write(root, "real/a.rs", b"fn a() {}\n");
    std::os::unix::fs::symlink(root.join("real"), root.join("loop")).expect("symlink dir");
    std::os::unix::fs::symlink(root.join("real/a.rs"), root.join("alias.rs")).expect("symlink file");

    let (files, skipped) = run(root, config());
    assert_eq!(files, vec!["real/a.rs"]);
    assert!(skipped.is_empty());
}

#[cfg(target_os = "linux")]
#[test]
fn non_utf8_file_names_are_skipped_not_merged() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    let tmp = TempDir::new().expect("tmp");
    let root = tmp.path();
    write(root, "ok.txt", b"fine\n");
    fs::write(root.join(OsStr::from_bytes(b"a\xff.txt")), b"one\n").expect("write ff");
    fs::write(root.join(OsStr::from_bytes(b"a\xfe.txt")), b"two\n").expect("write fe");

    let selector = FileSelector::new(root, config()).expect("selector");
    let mut files = Vec::new();
    let mut undecodable = 0;
    for candidate in selector.walk() {
        match candidate {
            Candidate::File(f) => files.push(f.relative_path),
            Candidate::Skipped { reason: SkipReason::DecodeFailure, .. } => undecodable += 1,
            Candidate::Skipped { path, reason } => panic!("unexpected skip {reason} for {}", path.display()),
        }
    }
    assert_eq!(files, vec!["ok.txt"]);
    assert_eq!(undecodable, 2);
}

#[test]
fn non_utf8_text_is_decoded_not_skipped() {
    let tmp = TempDir::new().expect("tmp");
    let root = tmp.path();
    write(root, "latin.txt", b"caf\xe9 cr\xe8me\n");

    let selector = FileSelector::new(root, config()).expect("selector");
    let file = selector.walk().find_map(|c| match c { Candidate::File(f) => Some(f), Candidate::Skipped { .. } => None }).expect("selected");
    assert_eq!(read_text(&file).expect("decoded"), "caf\u{e9} cr\u{e8}me\n");
}

#[test]
fn missing_root_is_an_error() {
    let tmp = TempDir::new().expect("tmp");
    assert!(FileSelector::new(&tmp.path().join("nope"), config()).is_err());
}
