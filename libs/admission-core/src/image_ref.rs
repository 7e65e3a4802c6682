// [libs/admission-core/src/image_ref.rs]
//! Extraccion y parseo de referencias de imagen de contenedor.
//!
//! Dos algoritmos conviven aqui porque el validador de registro y el
//! validador de firma los necesitan con distinta granularidad: el primero
//! solo quiere el host de registro para contrastarlo con una lista blanca;
//! el segundo necesita descomponer la referencia entera en sus cuatro
//! partes direccionables.

use crate::model::ParsedImageReference;

const DOCKER_HUB_REGISTRY: &str = "docker.io";
const DOCKER_HUB_LIBRARY_ORG: &str = "library";

/// Alias de Docker Hub que deben normalizarse al nombre canonico.
const DOCKER_HUB_ALIASES: &[&str] = &["registry-1.docker.io", "index.docker.io"];

fn looks_like_registry_host(segment: &str) -> bool {
    segment.contains('.') || segment.contains(':') || segment == "localhost"
}

/// Extrae solo el registro de una referencia de imagen, para el validador
/// de lista blanca de registros. Una imagen de un solo componente (sin `/`)
/// nunca es un registro, aunque su tag contenga `:` (p.ej. `nginx:latest`):
/// de lo contrario el dos-puntos del tag se confundiria con un puerto.
pub fn extract_registry(image: &str) -> String {
    let mut segments = image.splitn(2, '/');
    let first = segments.next().unwrap_or_default();
    let has_more = segments.next().is_some();

    if has_more && looks_like_registry_host(first) {
        first.to_string()
    } else {
        DOCKER_HUB_REGISTRY.to_string()
    }
}

/// Normaliza los alias conocidos de Docker Hub a `docker.io`.
pub fn normalize_registry(registry: &str) -> String {
    let lower = registry.to_ascii_lowercase();
    if DOCKER_HUB_ALIASES.contains(&lower.as_str()) {
        DOCKER_HUB_REGISTRY.to_string()
    } else {
        lower
    }
}

/// Descompone una referencia de imagen completa en `(registry, org, repo,
/// tag_or_digest)` siguiendo las reglas de resolucion para verificacion de
/// firmas.
pub fn parse_image_reference(image: &str) -> ParsedImageReference {
    let (name_part, digest) = match image.split_once('@') {
        Some((name, digest)) => (name, Some(digest.to_string())),
        None => (image, None),
    };

    let (path_without_tag, tag) = if digest.is_some() {
        (name_part.to_string(), None)
    } else {
        extract_tag_from_last_segment(name_part)
    };

    let segments: Vec<&str> = path_without_tag.split('/').collect();

    let (registry, org, repo) = if segments.len() == 1 {
        (
            DOCKER_HUB_REGISTRY.to_string(),
            DOCKER_HUB_LIBRARY_ORG.to_string(),
            segments[0].to_string(),
        )
    } else if looks_like_registry_host(segments[0]) {
        let registry = normalize_registry(segments[0]);
        let rest = &segments[1..];
        if rest.len() == 1 {
            (registry, DOCKER_HUB_LIBRARY_ORG.to_string(), rest[0].to_string())
        } else {
            (registry, rest[0].to_string(), rest[1..].join("/"))
        }
    } else {
        (
            DOCKER_HUB_REGISTRY.to_string(),
            segments[0].to_string(),
            segments[1..].join("/"),
        )
    };

    let (tag_or_digest, is_digest) = match digest {
        Some(d) => (Some(d), true),
        None => (tag, false),
    };

    ParsedImageReference {
        registry,
        org,
        repo,
        tag_or_digest,
        is_digest,
    }
}

/// Separa el tag del ultimo componente de ruta, si lo contiene. El resto de
/// la ruta se devuelve intacta.
fn extract_tag_from_last_segment(path: &str) -> (String, Option<String>) {
    let last_slash = path.rfind('/');
    let last_segment = match last_slash {
        Some(index) => &path[index + 1..],
        None => path,
    };

    match last_segment.split_once(':') {
        Some((name, tag)) => {
            let prefix_end = last_slash.map(|index| index + 1).unwrap_or(0);
            let rebuilt = format!("{}{}", &path[..prefix_end], name);
            (rebuilt, Some(tag.to_string()))
        }
        None => (path.to_string(), None),
    }
}
