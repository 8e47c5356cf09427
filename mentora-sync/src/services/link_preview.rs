use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;

use mentora_shared::clients::FunctionsClient;
use mentora_shared::errors::AppResult;
use mentora_shared::types::Session;

use crate::models::LinkPreview;

const FALLBACK_TITLE: &str = "Untitled link";
const FALLBACK_DESCRIPTION: &str = "No description available";

/// First `scheme://non-whitespace-run` substring in the text, if any.
pub fn extract_first_url(text: &str) -> Option<&str> {
    static URL_PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = URL_PATTERN
        .get_or_init(|| Regex::new(r"[A-Za-z][A-Za-z0-9+.-]*://\S+").expect("valid url pattern"));
    pattern.find(text).map(|m| m.as_str())
}

/// Raw metadata returned by the preview resolution function. Every field
/// is optional; normalization fills the gaps.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreviewResponse {
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub favicon: Option<String>,
    pub site_name: Option<String>,
}

/// Resolution boundary; the production implementation invokes the
/// `link-preview` remote function.
#[async_trait]
pub trait PreviewFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> AppResult<PreviewResponse>;
}

#[derive(Clone)]
pub struct FunctionPreviewFetcher {
    functions: FunctionsClient,
    session: Session,
}

impl FunctionPreviewFetcher {
    pub fn new(functions: FunctionsClient, session: Session) -> Self {
        Self { functions, session }
    }
}

#[async_trait]
impl PreviewFetcher for FunctionPreviewFetcher {
    async fn fetch(&self, url: &str) -> AppResult<PreviewResponse> {
        self.functions
            .invoke(&self.session, "link-preview", &json!({ "url": url }))
            .await
    }
}

/// Observable state of the resolver.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PreviewState {
    #[default]
    Idle,
    Loading {
        url: String,
    },
    Ready(LinkPreview),
    Failed {
        message: String,
    },
}

impl PreviewState {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    pub fn preview(&self) -> Option<&LinkPreview> {
        match self {
            Self::Ready(preview) => Some(preview),
            _ => None,
        }
    }
}

/// Resolves the first URL in free text to preview metadata.
///
/// Each call to `resolve` supersedes the previous one: the displayed state
/// is cleared to `Loading` before the request goes out, and a response is
/// applied only if its request generation is still the latest, so a slow
/// stale response can never overwrite a newer one.
#[derive(Clone)]
pub struct LinkPreviewResolver<F> {
    fetcher: F,
    state: Arc<Mutex<PreviewState>>,
    generation: Arc<AtomicU64>,
}

impl<F: PreviewFetcher> LinkPreviewResolver<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            state: Arc::new(Mutex::new(PreviewState::Idle)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn state(&self) -> PreviewState {
        self.state.lock().expect("state lock poisoned").clone()
    }

    /// Re-run extraction and resolution for the current input text.
    /// Returns the resolver state after this call's outcome was applied
    /// (or discarded, if a newer call superseded it).
    pub async fn resolve(&self, text: &str) -> PreviewState {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let Some(url) = extract_first_url(text) else {
            self.apply_if_current(generation, PreviewState::Idle);
            return self.state();
        };
        let url = url.to_string();

        // Clear the previous preview before the request resolves so a
        // mismatched preview is never displayed.
        self.apply_if_current(generation, PreviewState::Loading { url: url.clone() });

        match self.fetcher.fetch(&url).await {
            Ok(response) => {
                let preview = normalize(&url, response);
                if !self.apply_if_current(generation, PreviewState::Ready(preview)) {
                    tracing::debug!(url = %url, "discarding superseded preview response");
                }
            }
            Err(e) => {
                let message = e.user_message();
                if !self.apply_if_current(generation, PreviewState::Failed { message }) {
                    tracing::debug!(url = %url, "discarding superseded preview failure");
                }
            }
        }

        self.state()
    }

    fn apply_if_current(&self, generation: u64, new_state: PreviewState) -> bool {
        let mut state = self.state.lock().expect("state lock poisoned");
        if self.generation.load(Ordering::SeqCst) == generation {
            *state = new_state;
            true
        } else {
            false
        }
    }
}

fn normalize(requested_url: &str, response: PreviewResponse) -> LinkPreview {
    let url = response.url.unwrap_or_else(|| requested_url.to_string());
    let domain = domain_of(&url);

    LinkPreview {
        title: response.title.unwrap_or_else(|| FALLBACK_TITLE.to_string()),
        description: response
            .description
            .unwrap_or_else(|| FALLBACK_DESCRIPTION.to_string()),
        image: response.image,
        favicon: response.favicon,
        site_name: response.site_name,
        domain,
        url,
    }
}

/// Host of the URL with a leading `www.` stripped.
fn domain_of(raw: &str) -> String {
    url::Url::parse(raw)
        .ok()
        .and_then(|parsed| parsed.host_str().map(|h| h.to_string()))
        .map(|host| host.strip_prefix("www.").unwrap_or(&host).to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    #[test]
    fn extracts_the_first_url() {
        assert_eq!(extract_first_url("no links here"), None);
        assert_eq!(
            extract_first_url("see https://a.example.com and http://b.example.com"),
            Some("https://a.example.com")
        );
        assert_eq!(extract_first_url("ftp://files.example.com/x y"), Some("ftp://files.example.com/x"));
    }

    #[test]
    fn domain_strips_www_prefix() {
        assert_eq!(domain_of("https://Www.Example.com/page"), "example.com");
        assert_eq!(domain_of("https://news.example.org/a"), "news.example.org");
        assert_eq!(domain_of("not a url"), "");
    }

    #[derive(Clone, Default)]
    struct StubFetcher {
        response: PreviewResponse,
        fail_with: Option<String>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PreviewFetcher for StubFetcher {
        async fn fetch(&self, _url: &str) -> AppResult<PreviewResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.fail_with {
                Some(message) => Err(mentora_shared::errors::AppError::new(
                    mentora_shared::errors::ErrorCode::FunctionFailed,
                    message.clone(),
                )),
                None => Ok(self.response.clone()),
            }
        }
    }

    /// Fetcher that blocks until the test releases the gate for a URL.
    #[derive(Clone, Default)]
    struct GatedFetcher {
        gates: Arc<Mutex<HashMap<String, Arc<Notify>>>>,
        calls: Arc<AtomicUsize>,
    }

    impl GatedFetcher {
        fn gate(&self, url: &str) -> Arc<Notify> {
            let mut gates = self.gates.lock().unwrap();
            gates.entry(url.to_string()).or_default().clone()
        }

        fn release(&self, url: &str) {
            self.gate(url).notify_one();
        }
    }

    #[async_trait]
    impl PreviewFetcher for GatedFetcher {
        async fn fetch(&self, url: &str) -> AppResult<PreviewResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let gate = self.gate(url);
            gate.notified().await;
            Ok(PreviewResponse {
                url: Some(url.to_string()),
                title: Some(format!("Title for {url}")),
                ..Default::default()
            })
        }
    }

    #[tokio::test]
    async fn text_without_url_makes_no_request() {
        let fetcher = StubFetcher::default();
        let resolver = LinkPreviewResolver::new(fetcher.clone());

        let state = resolver.resolve("just plain words").await;
        assert_eq!(state, PreviewState::Idle);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn removing_the_url_clears_a_previous_preview() {
        let fetcher = StubFetcher {
            response: PreviewResponse {
                url: Some("https://example.com".to_string()),
                title: Some("Example".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let resolver = LinkPreviewResolver::new(fetcher);

        let state = resolver.resolve("see https://example.com").await;
        assert!(state.preview().is_some());

        let state = resolver.resolve("link removed").await;
        assert_eq!(state, PreviewState::Idle);
    }

    #[tokio::test]
    async fn missing_fields_get_placeholders_and_www_is_stripped() {
        let fetcher = StubFetcher {
            response: PreviewResponse {
                url: Some("https://www.example.com/page".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let resolver = LinkPreviewResolver::new(fetcher);

        let state = resolver.resolve("check https://www.example.com/page now").await;
        let preview = state.preview().unwrap();
        assert_eq!(preview.title, FALLBACK_TITLE);
        assert_eq!(preview.description, FALLBACK_DESCRIPTION);
        assert_eq!(preview.domain, "example.com");
    }

    #[tokio::test]
    async fn failure_is_captured_and_preview_stays_absent() {
        let fetcher = StubFetcher {
            fail_with: Some("upstream timeout".to_string()),
            ..Default::default()
        };
        let resolver = LinkPreviewResolver::new(fetcher);

        let state = resolver.resolve("see https://slow.example.com").await;
        match state {
            PreviewState::Failed { message } => assert!(!message.is_empty()),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(resolver.state().preview().is_none());
    }

    #[tokio::test]
    async fn stale_in_flight_response_is_discarded() {
        let fetcher = GatedFetcher::default();
        let resolver = LinkPreviewResolver::new(fetcher.clone());

        let first = resolver.clone();
        let first_task =
            tokio::spawn(async move { first.resolve("see https://old.example.com").await });
        tokio::task::yield_now().await;

        let second = resolver.clone();
        let second_task =
            tokio::spawn(async move { second.resolve("see https://new.example.com").await });
        tokio::task::yield_now().await;

        // The newer request cleared the state before resolving.
        assert!(resolver.state().is_loading());

        // The stale response arrives late and must not be applied.
        fetcher.release("https://old.example.com");
        first_task.await.unwrap();
        assert!(resolver.state().preview().is_none());

        fetcher.release("https://new.example.com");
        let state = second_task.await.unwrap();
        let preview = state.preview().unwrap();
        assert_eq!(preview.domain, "new.example.com");
        assert_eq!(resolver.state(), state);
    }
}
