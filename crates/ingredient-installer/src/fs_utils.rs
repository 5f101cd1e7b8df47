use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

pub fn remove_file_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

/// Returns whether anything was removed.
pub fn remove_dir_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err).with_context(|| format!("failed to remove {}", path.display())),
    }
}

/// One entry met while walking a tree; `rel` is relative to the walk root.
struct TreeEntry<'a> {
    rel: &'a Path,
    path: &'a Path,
    metadata: fs::Metadata,
}

/// Visits every entry below `root`, directories before their contents.
/// Symlinks are reported as files and never followed.
fn walk_tree<F>(root: &Path, mut visit: F) -> Result<()>
where
    F: FnMut(&TreeEntry<'_>) -> Result<()>,
{
    walk_dir(root, root, &mut visit)
}

fn walk_dir(
    root: &Path,
    dir: &Path,
    visit: &mut dyn FnMut(&TreeEntry<'_>) -> Result<()>,
) -> Result<()> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
    for entry in entries {
        let path = entry
            .with_context(|| format!("failed to list {}", dir.display()))?
            .path();
        let metadata = fs::symlink_metadata(&path)
            .with_context(|| format!("failed to stat {}", path.display()))?;
        let rel = path
            .strip_prefix(root)
            .with_context(|| format!("{} is outside {}", path.display(), root.display()))?;
        let is_dir = metadata.is_dir();

        visit(&TreeEntry {
            rel,
            path: &path,
            metadata,
        })?;
        if is_dir {
            walk_dir(root, &path, visit)?;
        }
    }
    Ok(())
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).with_context(|| format!("failed to create {}", path.display()))
}

pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    create_dir(dst)?;
    walk_tree(src, |entry| {
        let target = dst.join(entry.rel);
        if entry.metadata.is_dir() {
            create_dir(&target)
        } else {
            copy_entry(entry.path, &target, &entry.metadata)
        }
    })
}

/// Copies the files of an unpacked archive into `dst_root`, dropping the
/// first `strip_components` directories of every path. Fails when nothing
/// lies deep enough to survive the strip.
pub fn copy_with_strip(src_root: &Path, dst_root: &Path, strip_components: usize) -> Result<()> {
    let mut copied = 0usize;
    walk_tree(src_root, |entry| {
        if entry.metadata.is_dir() {
            return Ok(());
        }
        let Some(stripped) = strip_leading(entry.rel, strip_components) else {
            return Ok(());
        };
        let target = dst_root.join(stripped);
        if let Some(parent) = target.parent() {
            create_dir(parent)?;
        }
        copy_entry(entry.path, &target, &entry.metadata)?;
        copied += 1;
        Ok(())
    })?;

    if copied == 0 {
        return Err(anyhow!(
            "{} holds nothing below its top {strip_components} level(s)",
            src_root.display()
        ));
    }
    Ok(())
}

/// Copies `src` over `dst` file by file. Files for which `keep_existing`
/// returns true (given the path relative to `dst`) are left alone when they
/// already exist in `dst`.
pub fn overlay_dir<F>(src: &Path, dst: &Path, keep_existing: &F) -> Result<()>
where
    F: Fn(&Path) -> bool,
{
    walk_tree(src, |entry| {
        let target = dst.join(entry.rel);
        if entry.metadata.is_dir() {
            return create_dir(&target);
        }
        if target.exists() && keep_existing(entry.rel) {
            return Ok(());
        }
        copy_entry(entry.path, &target, &entry.metadata)
    })
}

/// Replaces `dst` with `src`, recreating symlinks as links.
fn copy_entry(src: &Path, dst: &Path, metadata: &fs::Metadata) -> Result<()> {
    remove_file_if_exists(dst).with_context(|| format!("failed to replace {}", dst.display()))?;

    #[cfg(unix)]
    if metadata.file_type().is_symlink() {
        let link = fs::read_link(src)
            .with_context(|| format!("failed to read symlink {}", src.display()))?;
        return std::os::unix::fs::symlink(&link, dst)
            .with_context(|| format!("failed to link {} to {}", dst.display(), link.display()));
    }
    #[cfg(not(unix))]
    let _ = metadata;

    fs::copy(src, dst)
        .map(|_| ())
        .with_context(|| format!("failed to copy {} to {}", src.display(), dst.display()))
}

/// `rel` without its first `count` normal components, or `None` when nothing
/// is left.
pub(crate) fn strip_leading(rel: &Path, count: usize) -> Option<PathBuf> {
    let rest: PathBuf = rel
        .components()
        .filter(|component| matches!(component, Component::Normal(_)))
        .skip(count)
        .collect();
    (!rest.as_os_str().is_empty()).then_some(rest)
}
