// [tests/mirror/libs/infra/signature-verifier/signature_verifier_test.rs]
//! Certifica el verificador de firmas contra un backend de prueba,
//! incluyendo la cache positiva evitando una segunda invocacion.

use async_trait::async_trait;
use chutes_signature_verifier::{SignatureVerifier, VerificationMethod, VerifierBackend, VerifyRequest};
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Output};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct CountingBackend {
    calls: AtomicUsize,
}

#[async_trait]
impl VerifierBackend for CountingBackend {
    async fn invoke(&self, _args: &[String]) -> std::io::Result<Output> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Output {
            status: ExitStatus::from_raw(0),
            stdout: br#"[{"critical":{}}]"#.to_vec(),
            stderr: Vec::new(),
        })
    }
}

fn request() -> VerifyRequest {
    VerifyRequest {
        image_reference: "registry.internal/team/app@sha256:abc123".to_string(),
        method: VerificationMethod::Key,
        public_key_path: Some("/etc/chutes/cosign.pub".to_string()),
        keyless_identity_regex: None,
        keyless_issuer: None,
        rekor_url: "https://rekor.sigstore.dev".to_string(),
        fulcio_url: "https://fulcio.sigstore.dev".to_string(),
        allow_http: false,
        allow_insecure: false,
    }
}

#[tokio::test]
async fn repeated_verification_of_the_same_image_hits_the_positive_cache() {
    let backend = Arc::new(CountingBackend {
        calls: AtomicUsize::new(0),
    });
    let verifier = SignatureVerifier::new(backend.clone());

    verifier.verify(&request()).await.unwrap();
    verifier.verify(&request()).await.unwrap();
    verifier.verify(&request()).await.unwrap();

    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
}
