// Request assembly and endpoint framing against an in-process backend.

use std::sync::{Arc, Mutex};

use massing_studio::generation::endpoint::{
    GenerateEndpoint, METHOD_NOT_ALLOWED, SERVER_CONFIGURATION_ERROR,
};
use massing_studio::generation::{
    AspectRatio, AssembledRequest, EncodedImage, GenerationBackend, GenerationError,
    GenerationRequest, Part, GENERIC_FAILURE,
};
use massing_studio::handoff;
use serde_json::json;

fn image(tag: u8) -> EncodedImage {
    EncodedImage::png(vec![tag])
}

/// Records every request and answers with a fixed result.
struct MockBackend {
    reply: fn(&AssembledRequest) -> Result<EncodedImage, GenerationError>,
    seen: Arc<Mutex<Vec<AssembledRequest>>>,
}

impl MockBackend {
    fn new(reply: fn(&AssembledRequest) -> Result<EncodedImage, GenerationError>) -> Self {
        Self {
            reply,
            seen: Arc::default(),
        }
    }
}

impl GenerationBackend for MockBackend {
    async fn generate(&self, request: &AssembledRequest) -> Result<EncodedImage, GenerationError> {
        self.seen.lock().unwrap().push(request.clone());
        (self.reply)(request)
    }
}

fn ok_reply(_: &AssembledRequest) -> Result<EncodedImage, GenerationError> {
    Ok(EncodedImage {
        mime_type: "image/jpeg".into(),
        data: vec![1, 2, 3],
    })
}

// ─── assembly ────────────────────────────────────────────────────────────────

#[test]
fn parts_follow_backend_order() {
    let (s, a1, a2, t, r1, r2, m1, m2) = (
        image(0),
        image(1),
        image(2),
        image(3),
        image(4),
        image(5),
        image(6),
        image(7),
    );
    let mut request = GenerationRequest::new("cozy facade", s.clone());
    request.additional_bases = vec![a1.clone(), a2.clone()];
    request.site_context = Some(t.clone());
    request.references = vec![r1.clone(), r2.clone()];
    request.material_primary = Some(m1.clone());
    request.material_secondary = Some(m2.clone());

    let assembled = request.assemble();
    assert_eq!(
        assembled.parts,
        vec![
            Part::Text("cozy facade".into()),
            Part::Image(s),
            Part::Image(a1),
            Part::Image(a2),
            Part::Image(t),
            Part::Image(r1),
            Part::Image(r2),
            Part::Image(m1),
            Part::Image(m2),
        ]
    );
}

#[test]
fn unknown_aspect_ratio_is_omitted_not_rejected() {
    let assembled = GenerationRequest::new("x", image(0))
        .with_aspect_ratio_token(Some("5:3"))
        .assemble();
    assert_eq!(assembled.aspect_ratio, None);
    assert_eq!(assembled.parts.len(), 2);

    let assembled = GenerationRequest::new("x", image(0))
        .with_aspect_ratio_token(Some("21:9"))
        .with_image_size(Some("whatever".into()))
        .assemble();
    assert_eq!(assembled.aspect_ratio, Some(AspectRatio::Ultrawide21x9));
    assert_eq!(assembled.image_size.as_deref(), Some("whatever"));
}

// ─── endpoint ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn only_post_is_accepted() {
    let endpoint = GenerateEndpoint::new(Some(MockBackend::new(ok_reply)));
    for method in ["GET", "PUT", "DELETE"] {
        let response = endpoint.handle(method, b"{}").await;
        assert_eq!(response.status, 405);
        assert_eq!(response.body["error"], METHOD_NOT_ALLOWED);
    }
}

#[tokio::test]
async fn missing_credential_is_a_configuration_error() {
    let endpoint: GenerateEndpoint<MockBackend> = GenerateEndpoint::new(None);
    let body = json!({ "prompt": "p", "image": "AQID" }).to_string();
    let response = endpoint.handle("POST", body.as_bytes()).await;
    assert_eq!(response.status, 500);
    assert_eq!(response.body["error"], SERVER_CONFIGURATION_ERROR);
}

#[tokio::test]
async fn backend_credential_failure_is_a_configuration_error() {
    fn unconfigured(_: &AssembledRequest) -> Result<EncodedImage, GenerationError> {
        Err(GenerationError::MissingCredential)
    }
    let backend = MockBackend::new(unconfigured);
    let seen = Arc::clone(&backend.seen);
    let endpoint = GenerateEndpoint::new(Some(backend));
    let body = json!({ "prompt": "p", "image": "AQID" }).to_string();

    let response = endpoint.handle("POST", body.as_bytes()).await;
    assert_eq!(response.status, 500);
    assert_eq!(response.body, json!({ "error": SERVER_CONFIGURATION_ERROR }));
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn success_returns_data_url_and_forwards_in_order() {
    let backend = MockBackend::new(ok_reply);
    let seen = Arc::clone(&backend.seen);
    let endpoint = GenerateEndpoint::new(Some(backend));
    let body = json!({
        "prompt": "cozy facade",
        "image": "data:image/png;base64,AA==",
        "additionalBaseImages": ["AQ==", "Ag=="],
        "siteImage": "Aw==",
        "referenceImages": ["BA==", "BQ=="],
        "materialImage1": "Bg==",
        "materialImage2": "Bw==",
        "aspectRatio": "5:3",
        "imageSize": "1K"
    })
    .to_string();

    let response = endpoint.handle("POST", body.as_bytes()).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body["image"], "data:image/jpeg;base64,AQID");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let request = &seen[0];
    assert_eq!(request.aspect_ratio, None);
    assert_eq!(request.image_size.as_deref(), Some("1K"));
    let tags: Vec<u8> = request
        .parts
        .iter()
        .filter_map(|part| match part {
            Part::Image(image) => Some(image.data[0]),
            Part::Text(_) => None,
        })
        .collect();
    assert_eq!(tags, vec![0, 1, 2, 3, 4, 5, 6, 7]);
}

#[tokio::test]
async fn backend_failures_collapse_to_one_message() {
    fn failing(_: &AssembledRequest) -> Result<EncodedImage, GenerationError> {
        Err(GenerationError::Backend("quota exceeded".into()))
    }
    fn empty(_: &AssembledRequest) -> Result<EncodedImage, GenerationError> {
        Err(GenerationError::EmptyResponse)
    }
    let body = json!({ "prompt": "p", "image": "AQID" }).to_string();

    let response = GenerateEndpoint::new(Some(MockBackend::new(failing)))
        .handle("POST", body.as_bytes())
        .await;
    assert_eq!(response.status, 500);
    assert_eq!(response.body["error"], "quota exceeded");

    let response = GenerateEndpoint::new(Some(MockBackend::new(empty)))
        .handle("POST", body.as_bytes())
        .await;
    assert_eq!(response.status, 500);
    assert_eq!(response.body["error"], GENERIC_FAILURE);
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
    let endpoint = GenerateEndpoint::new(Some(MockBackend::new(ok_reply)));
    assert_eq!(endpoint.handle("POST", b"not json").await.status, 400);

    let missing_image = json!({ "prompt": "p" }).to_string();
    assert_eq!(endpoint.handle("POST", missing_image.as_bytes()).await.status, 400);

    let bad_reference = json!({ "prompt": "p", "image": "AQID", "referenceImages": ["%%"] }).to_string();
    assert_eq!(endpoint.handle("POST", bad_reference.as_bytes()).await.status, 400);
}

// ─── worker ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn worker_calls_backend_once_per_request_and_saves_successes() {
    fn by_instruction(request: &AssembledRequest) -> Result<EncodedImage, GenerationError> {
        match request.parts.first() {
            Some(Part::Text(text)) if text == "fail" => {
                Err(GenerationError::Backend("quota exceeded".into()))
            }
            _ => ok_reply(request),
        }
    }

    let dir = std::env::temp_dir().join(format!("massing-studio-worker-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    let backend = MockBackend::new(by_instruction);
    let seen = Arc::clone(&backend.seen);

    let (requests, worker) = handoff::spawn_worker(backend, dir.clone());
    requests.send(GenerationRequest::new("timber", image(0))).unwrap();
    requests.send(GenerationRequest::new("fail", image(1))).unwrap();
    drop(requests);
    worker.await.unwrap();

    assert_eq!(seen.lock().unwrap().len(), 2, "no retries");
    assert_eq!(std::fs::read(dir.join("render-1.jpg")).unwrap(), vec![1, 2, 3]);
    let written = std::fs::read_dir(&dir).unwrap().count();
    assert_eq!(written, 1, "a failed request writes nothing");
    let _ = std::fs::remove_dir_all(&dir);
}
