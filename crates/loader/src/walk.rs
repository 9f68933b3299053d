use crate::excludes::Excludes;
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

fn skip_denied<T>(res: io::Result<T>, path: &Path) -> anyhow::Result<Option<T>> {
    match res {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            debug!(path = %path.display(), "Permission denied");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Breadth-first walk of `root`, calling `callback` with every regular file
/// that is neither excluded nor oversized.
///
/// Exclusions are evaluated on paths relative to `root`, so excluded
/// directories are never entered. Symlinks are skipped and unreadable
/// entries are ignored. Entries of a directory are visited in name order.
pub fn visit<C>(root: &Path, excludes: &Excludes, callback: &mut C) -> anyhow::Result<()>
where
    C: FnMut(&Path) -> anyhow::Result<()>,
{
    let mut pending: VecDeque<PathBuf> = VecDeque::new();
    let mut visited: HashSet<PathBuf> = HashSet::new();
    pending.push_back(root.to_path_buf());

    while let Some(current) = pending.pop_front() {
        if !visited.insert(current.clone()) {
            continue;
        }
        let rel = current.strip_prefix(root).unwrap_or(&current);
        if !rel.as_os_str().is_empty() && excludes.is_excluded(rel) {
            debug!(path = %rel.display(), "Path excluded");
            continue;
        }
        let Some(metadata) = skip_denied(fs::symlink_metadata(&current), &current)? else {
            continue;
        };
        let file_type = metadata.file_type();
        if file_type.is_symlink() {
            debug!(path = %current.display(), "Symlink skipped");
            continue;
        }
        if file_type.is_file() {
            if excludes.is_oversized(&current) {
                debug!(path = %current.display(), size = metadata.len(), "File too large, skipped");
                continue;
            }
            callback(&current)?;
        } else if file_type.is_dir() {
            let Some(entries) = skip_denied(fs::read_dir(&current), &current)? else {
                continue;
            };
            let mut children = Vec::new();
            for entry_res in entries {
                let Some(entry) = skip_denied(entry_res, &current)? else {
                    continue;
                };
                children.push(entry.path());
            }
            children.sort();
            pending.extend(children);
        }
    }

    Ok(())
}
