use std::path::{Component, Path, PathBuf};

/// Resolve a stored image reference inside the upload directory.
/// Absolute paths and parent-directory hops are rejected.
pub fn resolve_upload_path(upload_dir: &Path, stored: &str) -> Option<PathBuf> {
    let relative = Path::new(stored.trim_start_matches("/uploads/").trim_start_matches('/'));
    if relative.as_os_str().is_empty() {
        return None;
    }
    let safe = relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    safe.then(|| upload_dir.join(relative))
}

/// Remove files that belonged to a deleted record. Failures are logged and ignored.
pub async fn remove_uploads(upload_dir: &Path, stored: &[String]) {
    for reference in stored {
        let Some(path) = resolve_upload_path(upload_dir, reference) else {
            tracing::warn!(file = %reference, "skipping unsafe upload path");
            continue;
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::debug!(file = %path.display(), "upload removed"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(error = %err, file = %path.display(), "upload removal failed")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_references_stay_inside_the_upload_dir() {
        let dir = Path::new("/srv/uploads");
        assert_eq!(
            resolve_upload_path(dir, "/uploads/products/mug.png"),
            Some(PathBuf::from("/srv/uploads/products/mug.png"))
        );
        assert_eq!(
            resolve_upload_path(dir, "banner.jpg"),
            Some(PathBuf::from("/srv/uploads/banner.jpg"))
        );
        assert_eq!(resolve_upload_path(dir, "../etc/passwd"), None);
        assert_eq!(resolve_upload_path(dir, "a/./../b"), None);
        assert_eq!(resolve_upload_path(dir, ""), None);
    }
}
