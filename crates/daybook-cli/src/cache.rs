use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use chrono::Local;

const CONTENT_EXTENSION: &str = "dbk";
const SYNC_EXTENSION: &str = "sync";

/// The excerpt cache directory, created on first use.
pub fn dir() -> Result<PathBuf> {
    let base = match std::env::var_os("XDG_CACHE_HOME") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from(shellexpand::tilde("~/.cache").as_ref()),
    };
    let cache = base.join("daybook");
    fs::create_dir_all(&cache)
        .with_context(|| format!("Failed to create cache directory {}", cache.display()))?;
    Ok(cache)
}

/// Path for a new excerpt pair, without extension: a timestamp plus the term,
/// so the cache listing doubles as a search history.
pub fn excerpt_basename(term: &str) -> Result<PathBuf> {
    let stamp = Local::now().format("%Y%m%d-%H%M%S-%6f-");
    Ok(dir()?.join(format!("{stamp}{term}")))
}

/// Removes stray entries and the oldest excerpt pairs once the cache exceeds
/// `max_count` pairs or `max_size` bytes. The pair at `keep` counts against
/// the budget but is never deleted.
pub fn prune(max_count: usize, max_size: u64, keep: &Path) -> Result<()> {
    let cache = dir()?;
    // basename -> (total size, oldest mtime, member files)
    let mut groups: BTreeMap<PathBuf, (u64, Option<SystemTime>, Vec<PathBuf>)> = BTreeMap::new();
    for entry in fs::read_dir(&cache)
        .with_context(|| format!("Failed to list cache directory {}", cache.display()))?
    {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type()?.is_file() {
            log::info!("removing stray cache entry {}", path.display());
            fs::remove_dir_all(&path)?;
            continue;
        }
        match path.extension().and_then(|extension| extension.to_str()) {
            Some(CONTENT_EXTENSION) | Some(SYNC_EXTENSION) => {
                let metadata = entry.metadata()?;
                let modified = metadata.modified()?;
                let group = groups.entry(path.with_extension("")).or_default();
                group.0 += metadata.len();
                group.1 = Some(match group.1 {
                    Some(oldest) => oldest.min(modified),
                    None => modified,
                });
                group.2.push(path);
            }
            _ => {
                log::info!("removing foreign cache file {}", path.display());
                fs::remove_file(&path)?;
            }
        }
    }

    let (mut count, mut size_sum) = match groups.remove(keep) {
        Some((size, _, _)) => (1, size),
        None => (0, 0),
    };
    let mut remaining: Vec<_> = groups.into_iter().collect();
    remaining.sort_by_key(|(_, (_, oldest, _))| std::cmp::Reverse(*oldest));
    for (basename, (size, _, paths)) in remaining {
        size_sum += size;
        count += 1;
        if size_sum > max_size || count > max_count {
            log::info!("pruning cached excerpt {}", basename.display());
            for path in paths {
                fs::remove_file(&path)?;
            }
        }
    }
    Ok(())
}

/// Appends an extension to a basename that may itself contain dots.
pub fn member(basename: &Path, extension: &str) -> PathBuf {
    let mut path = basename.to_path_buf().into_os_string();
    path.push(".");
    path.push(extension);
    PathBuf::from(path)
}

pub fn content_path(basename: &Path) -> PathBuf {
    member(basename, CONTENT_EXTENSION)
}

pub fn sync_path(basename: &Path) -> PathBuf {
    member(basename, SYNC_EXTENSION)
}
