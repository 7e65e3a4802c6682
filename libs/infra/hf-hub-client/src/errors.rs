// [libs/infra/hf-hub-client/src/errors.rs]
use chutes_cache_core::CacheError;

pub fn from_reqwest(context: &str, err: reqwest::Error) -> CacheError {
    if err.is_timeout() {
        CacheError::UpstreamUnavailable(format!("{context}: timed out"))
    } else {
        CacheError::UpstreamUnavailable(format!("{context}: {err}"))
    }
}
