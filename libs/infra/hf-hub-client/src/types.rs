// [libs/infra/hf-hub-client/src/types.rs]
use chutes_cache_core::ManifestFileEntry;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct HfInfoResponse {
    pub repo_id: String,
    #[serde(default)]
    pub revision: Option<String>,
}

#[derive(Deserialize)]
pub struct HfRepoInfoResponse {
    pub files: Vec<ManifestFileEntry>,
}
