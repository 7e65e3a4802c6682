// [libs/cache-core/src/markers.rs]
//! Lectura/escritura de los marcadores de disco y de los permisos
//! compartidos del volumen de cache.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use tokio::fs;

pub const COMPLETE_MARKER: &str = ".cache_complete";
pub const STALE_MARKER: &str = ".cache_stale";

/// Modo setgid-on-dir: los procesos cooperantes heredan el grupo.
const SHARED_DIR_MODE: u32 = 0o2775;

pub async fn create_shared_directory(path: &Path) -> std::io::Result<()> {
    fs::create_dir_all(path).await?;
    fs::set_permissions(path, std::fs::Permissions::from_mode(SHARED_DIR_MODE)).await
}

pub async fn write_complete_marker(snapshot_path: &Path, repo_id: &str, revision: &str) -> std::io::Result<()> {
    clear_marker(snapshot_path, STALE_MARKER).await?;
    fs::write(snapshot_path.join(COMPLETE_MARKER), format!("{repo_id}\n{revision}")).await
}

pub async fn write_stale_marker(
    snapshot_path: &Path,
    repo_id: &str,
    revision: &str,
    reason: &str,
) -> std::io::Result<()> {
    clear_marker(snapshot_path, COMPLETE_MARKER).await?;
    fs::write(snapshot_path.join(STALE_MARKER), format!("{repo_id}\n{revision}\n{reason}")).await
}

pub async fn clear_marker(snapshot_path: &Path, marker_name: &str) -> std::io::Result<()> {
    let marker_path = snapshot_path.join(marker_name);
    match fs::remove_file(&marker_path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

pub async fn clear_all_markers(snapshot_path: &Path) -> std::io::Result<()> {
    clear_marker(snapshot_path, COMPLETE_MARKER).await?;
    clear_marker(snapshot_path, STALE_MARKER).await
}

pub async fn has_complete_marker(snapshot_path: &Path) -> bool {
    fs::try_exists(snapshot_path.join(COMPLETE_MARKER)).await.unwrap_or(false)
}

pub async fn has_stale_marker(snapshot_path: &Path) -> bool {
    fs::try_exists(snapshot_path.join(STALE_MARKER)).await.unwrap_or(false)
}

/// Recorre el arbol y aplica `02775` a todos los directorios y archivos,
/// tal como exige la convencion de volumen compartido tras una descarga.
pub fn chmod_tree_blocking(root: &Path) -> std::io::Result<()> {
    if !root.exists() {
        return Ok(());
    }
    std::fs::set_permissions(root, std::fs::Permissions::from_mode(SHARED_DIR_MODE))?;
    if root.is_dir() {
        for entry in std::fs::read_dir(root)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_symlink() {
                continue;
            }
            chmod_tree_blocking(&path)?;
        }
    }
    Ok(())
}
