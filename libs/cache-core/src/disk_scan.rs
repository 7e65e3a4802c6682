// [libs/cache-core/src/disk_scan.rs]
//! Descubrimiento de directorios de snapshot en el volumen de cache y
//! calculo del tamano en disco de un arbol.

use std::path::{Path, PathBuf};

use tokio::fs;

/// `true` si el nombre del directorio es un UUID de chute de 36 caracteres.
pub fn looks_like_chute_id(name: &str) -> bool {
    name.len() == 36 && name.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
}

/// `true` si `hub_path` contiene al menos un directorio `models--*`.
pub async fn has_model_directories(hub_path: &Path) -> bool {
    let Ok(mut entries) = fs::read_dir(hub_path).await else {
        return false;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        if entry.file_name().to_string_lossy().starts_with("models--") {
            return true;
        }
    }
    false
}

/// Enumera los directorios de nivel superior bajo `cache_base` cuyo nombre
/// parece un id de chute.
pub async fn discover_chute_directories(cache_base: &Path) -> std::io::Result<Vec<String>> {
    let mut found = Vec::new();
    let mut entries = match fs::read_dir(cache_base).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(found),
        Err(err) => return Err(err),
    };
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if looks_like_chute_id(&name) {
            found.push(name);
        }
    }
    Ok(found)
}

/// Tamano recursivo en disco de `root`, siguiendo el tamano real del blob al
/// que apunta un symlink (no el tamano del propio enlace).
pub async fn size_on_disk(root: &Path) -> std::io::Result<u64> {
    let mut total = 0u64;
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
            Err(err) => return Err(err),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path: PathBuf = entry.path();
            let metadata = fs::metadata(&path).await?;
            if metadata.is_dir() {
                stack.push(path);
            } else {
                total += metadata.len();
            }
        }
    }
    Ok(total)
}
