use crate::file::TMP_MARKER;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{error, info};
use walkdir::{DirEntry, WalkDir};

const STALE_AFTER: Duration = Duration::from_secs(300);

/// Removes temporary files a crashed writer left next to `record`.
pub(crate) async fn purge_tmp(record: &Path) {
    let Some(dir) = record.parent().map(Path::to_path_buf) else { return };
    let Some(prefix) = record.file_name().map(|n| format!("{}{TMP_MARKER}", n.to_string_lossy()))
    else {
        return;
    };
    let now = SystemTime::now();

    match tokio::task::spawn_blocking(move || remove_stale(&dir, &prefix, now, STALE_AFTER)).await
    {
        Ok((removed, failed)) if removed > 0 || failed > 0 => {
            info!(removed, failed, "Cleaned up temporary files");
        },
        Err(e) => {
            error!(error = %e, "Temp file cleanup task panicked");
        },
        _ => {},
    }
}

fn remove_stale(dir: &Path, prefix: &str, now: SystemTime, threshold: Duration) -> (usize, usize) {
    let mut removed = 0;
    let mut failed = 0;

    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .flatten()
        .filter(|entry| is_tmp(entry, prefix) && is_stale(entry, now, threshold))
        .for_each(|entry| match std::fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), error = %e, "Temp file removal failed");
                failed += 1;
            },
        });

    (removed, failed)
}

fn is_tmp(entry: &DirEntry, prefix: &str) -> bool {
    entry.file_type().is_file()
        && entry.file_name().to_str().is_some_and(|name| name.starts_with(prefix))
}

fn is_stale(entry: &DirEntry, now: SystemTime, threshold: Duration) -> bool {
    entry
        .metadata()
        .ok()
        .and_then(|m| m.modified().ok())
        .and_then(|modified| now.duration_since(modified).ok())
        .is_none_or(|age| age > threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_matching_stale_files_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.db"), b"keep").unwrap();
        std::fs::write(dir.path().join("app.db.rvktmp.1"), b"orphan").unwrap();
        std::fs::write(dir.path().join("other.db.rvktmp.1"), b"foreign").unwrap();

        let later = SystemTime::now() + Duration::from_secs(600);
        let (removed, failed) = remove_stale(dir.path(), "app.db.rvktmp.", later, STALE_AFTER);

        assert_eq!((removed, failed), (1, 0));
        assert!(dir.path().join("app.db").exists());
        assert!(!dir.path().join("app.db.rvktmp.1").exists());
        assert!(dir.path().join("other.db.rvktmp.1").exists());
    }

    #[test]
    fn fresh_files_survive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.db.rvktmp.9"), b"in flight").unwrap();
        let (removed, _) = remove_stale(dir.path(), "app.db.rvktmp.", SystemTime::now(), STALE_AFTER);
        assert_eq!(removed, 0);
    }
}
