use codeloom_core::llm::{ByteStream, GenerationOutcome};
use codeloom_core::*;
use futures::stream::{self, StreamExt};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Transport that replays a fixed SSE body and records every request.
struct MockTransport {
    body: Vec<String>,
    calls: Arc<AtomicUsize>,
    last_request: Arc<Mutex<Option<GenerationRequest>>>,
}

impl MockTransport {
    fn new(events: Vec<StreamEvent>) -> Self {
        Self {
            body: events.iter().map(|e| e.to_frame().unwrap()).collect(),
            calls: Arc::new(AtomicUsize::new(0)),
            last_request: Arc::new(Mutex::new(None)),
        }
    }
}

#[async_trait::async_trait]
impl GenerationTransport for MockTransport {
    async fn open_stream(&self, request: &GenerationRequest) -> Result<ByteStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        let chunks: Vec<Result<Vec<u8>>> =
            self.body.iter().map(|f| Ok(f.as_bytes().to_vec())).collect();
        Ok(stream::iter(chunks).boxed())
    }
}

/// Transport whose endpoint always rejects the call.
struct FailingTransport;

#[async_trait::async_trait]
impl GenerationTransport for FailingTransport {
    async fn open_stream(&self, _request: &GenerationRequest) -> Result<ByteStream> {
        Err(LoomError::transport("generation endpoint error (503): unavailable"))
    }
}

/// Transport whose body breaks after the first frame.
struct DroppingTransport;

#[async_trait::async_trait]
impl GenerationTransport for DroppingTransport {
    async fn open_stream(&self, _request: &GenerationRequest) -> Result<ByteStream> {
        let frame = StreamEvent::token("partial").to_frame().unwrap();
        let chunks: Vec<Result<Vec<u8>>> = vec![
            Ok(frame.into_bytes()),
            Err(LoomError::transport("stream read failed: connection reset")),
        ];
        Ok(stream::iter(chunks).boxed())
    }
}

fn sample_project() -> Vec<ProjectFile> {
    vec![
        ProjectFile::new(
            "src/App.tsx",
            "import Navbar from './components/Navbar';\nexport default function App() {}",
        ),
        ProjectFile::new("src/components/Navbar.tsx", "export default function Navbar() {}"),
        ProjectFile::new("src/components/Footer.tsx", "export default function Footer() {}"),
        ProjectFile::new("src/index.css", "body { margin: 0; }"),
    ]
}

fn success_events() -> Vec<StreamEvent> {
    vec![
        StreamEvent::thinking("Looking at the navbar."),
        StreamEvent::token("Done"),
        StreamEvent::Done {
            thought: Some("Added toggle".into()),
            message: Some("The navbar now has a dark mode toggle.".into()),
            files: Some(vec![FileOperation::modify(
                "src/components/Navbar.tsx",
                "export default function Navbar() { return <button />; }",
            )]),
        },
    ]
}

fn response_cache() -> ResponseCache {
    ResponseCache::new(NonZeroUsize::new(8).unwrap(), Duration::from_secs(60))
}

// ========================================================================
// GenerationSession
// ========================================================================

#[tokio::test]
async fn test_generate_end_to_end() {
    let transport = MockTransport::new(success_events());
    let last_request = Arc::clone(&transport.last_request);
    let session = GenerationSession::new(Box::new(transport), &Settings::default())
        .unwrap()
        .with_system_prompt("You edit React projects.");

    let mut history = ConversationHistory::new();
    history.add_user_message("hello");

    let GenerationOutcome {
        response,
        selection,
        cached,
    } = session
        .generate(
            &sample_project(),
            "add a dark mode toggle to the navbar",
            &history,
            None,
        )
        .await
        .unwrap();

    assert!(!cached);
    assert_eq!(response.thought, "Added toggle");
    assert_eq!(response.files.len(), 1);
    assert_eq!(selection.files.len(), 4);
    assert_eq!(selection.files_omitted, 0);

    let request = last_request.lock().unwrap().clone().unwrap();
    assert_eq!(request.prompt, "add a dark mode toggle to the navbar");
    assert_eq!(request.system_prompt.as_deref(), Some("You edit React projects."));
    assert_eq!(request.history.len(), 1);
    let sent: Vec<&str> = request.files.iter().map(|f| f.path.as_str()).collect();
    assert!(sent.contains(&"src/components/Navbar.tsx"));
}

#[tokio::test]
async fn test_second_identical_request_is_cached() {
    let transport = MockTransport::new(success_events());
    let calls = Arc::clone(&transport.calls);
    let session = GenerationSession::new(Box::new(transport), &Settings::default()).unwrap();
    let mut cache = response_cache();
    let history = ConversationHistory::new();
    let files = sample_project();

    let first = session
        .generate(&files, "tweak the footer", &history, Some(&mut cache))
        .await
        .unwrap();
    let second = session
        .generate(&files, "tweak the footer", &history, Some(&mut cache))
        .await
        .unwrap();

    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(first.response, second.response);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_different_history_is_not_served_from_cache() {
    let transport = MockTransport::new(success_events());
    let calls = Arc::clone(&transport.calls);
    let session = GenerationSession::new(Box::new(transport), &Settings::default()).unwrap();
    let mut cache = response_cache();
    let files = sample_project();

    let mut history = ConversationHistory::new();
    let first = session
        .generate(&files, "undo that", &history, Some(&mut cache))
        .await
        .unwrap();

    history.add_user_message("make the footer blue");
    history.add_assistant_message("The footer is blue now.");
    let second = session
        .generate(&files, "undo that", &history, Some(&mut cache))
        .await
        .unwrap();

    assert!(!first.cached);
    assert!(!second.cached);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(cache.len(), 2);
}

#[tokio::test]
async fn test_disabled_cache_settings_always_call_transport() {
    let mut settings = Settings::default();
    settings.cache.enabled = false;
    let transport = MockTransport::new(success_events());
    let calls = Arc::clone(&transport.calls);
    let session = GenerationSession::new(Box::new(transport), &settings).unwrap();
    let mut cache = ResponseCache::from_settings(&settings.cache);
    assert!(cache.is_none());

    for _ in 0..2 {
        let outcome = session
            .generate(
                &sample_project(),
                "tweak the footer",
                &ConversationHistory::new(),
                cache.as_mut(),
            )
            .await
            .unwrap();
        assert!(!outcome.cached);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_mid_stream_disconnect_is_transport_error() {
    let session = GenerationSession::new(Box::new(DroppingTransport), &Settings::default()).unwrap();
    let mut cache = response_cache();

    let err = session
        .generate(
            &sample_project(),
            "anything",
            &ConversationHistory::new(),
            Some(&mut cache),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, LoomError::Transport(ref m) if m.contains("connection reset")));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_error_event_is_not_cached() {
    let transport = MockTransport::new(vec![
        StreamEvent::thinking("hmm"),
        StreamEvent::error("model overloaded"),
    ]);
    let session = GenerationSession::new(Box::new(transport), &Settings::default()).unwrap();
    let mut cache = response_cache();

    let err = session
        .generate(
            &sample_project(),
            "anything",
            &ConversationHistory::new(),
            Some(&mut cache),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, LoomError::Stream(ref m) if m == "model overloaded"));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_transport_failure_surfaces_immediately() {
    let session = GenerationSession::new(Box::new(FailingTransport), &Settings::default()).unwrap();

    let err = session
        .generate(&sample_project(), "anything", &ConversationHistory::new(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, LoomError::Transport(_)));
}

#[tokio::test]
async fn test_progress_callback_receives_updates() {
    let transport = MockTransport::new(vec![
        StreamEvent::token("ab"),
        StreamEvent::token("cd"),
        StreamEvent::done("ok"),
    ]);
    let session = GenerationSession::new(Box::new(transport), &Settings::default()).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    session
        .generate_with_progress(
            &sample_project(),
            "anything",
            &ConversationHistory::new(),
            None,
            move |progress| sink.lock().unwrap().push(progress.token_chars),
        )
        .await
        .unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![2, 4]);
}

#[tokio::test]
async fn test_prepare_applies_limits() {
    let transport = MockTransport::new(success_events());
    let session = GenerationSession::new(Box::new(transport), &Settings::default())
        .unwrap()
        .with_limits(SelectionLimits::new(2, 1_000_000).unwrap());

    let prepared = session.prepare(
        &sample_project(),
        "add a dark mode toggle to the navbar",
        &ConversationHistory::new(),
    );
    assert_eq!(prepared.request.files.len(), 2);
    assert_eq!(prepared.selection.files_omitted, 2);
}

#[test]
fn test_session_rejects_zero_max_files() {
    let mut settings = Settings::default();
    settings.selection.max_files = 0;
    let result = GenerationSession::new(Box::new(FailingTransport), &settings);
    assert!(matches!(result, Err(LoomError::InvalidLimit(_))));
}

#[test]
fn test_http_transport_uses_configured_endpoint() {
    let mut settings = Settings::default();
    settings.endpoint.base_url = "https://api.example.test".to_string();
    let transport = HttpTransport::from_settings(&settings);
    assert_eq!(transport.url(), "https://api.example.test/generate");
}
