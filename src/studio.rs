use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::models::{GenerationRequest, GenerationResult, TextGenerator};
use crate::session::{HistoryEntry, SessionLedger};

pub const MAX_VERSIONS: u32 = 3;

/// What the user picked, by catalog label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationForm {
    pub prompt: String,
    pub content_type: String,
    pub tone: String,
    pub length: String,
    #[serde(default = "one")]
    pub versions: u32,
}

fn one() -> u32 { 1 }

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StudioError {
    #[error("please enter a topic")]
    EmptyPrompt,
    #[error("unknown content type: {0}")]
    UnknownContentType(String),
    #[error("unknown tone: {0}")]
    UnknownTone(String),
    #[error("unknown length: {0}")]
    UnknownLength(String),
    #[error("versions must be between 1 and 3, got {0}")]
    InvalidVersionCount(u32),
}

pub fn build_request(catalog: &Catalog, form: &GenerationForm) -> Result<GenerationRequest, StudioError> {
    if form.prompt.trim().is_empty() {
        return Err(StudioError::EmptyPrompt);
    }
    if form.versions == 0 || form.versions > MAX_VERSIONS {
        return Err(StudioError::InvalidVersionCount(form.versions));
    }
    let content_type = catalog
        .content_type(&form.content_type)
        .ok_or_else(|| StudioError::UnknownContentType(form.content_type.clone()))?;
    let tone = catalog
        .tone(&form.tone)
        .ok_or_else(|| StudioError::UnknownTone(form.tone.clone()))?;
    let length = catalog
        .length(&form.length)
        .ok_or_else(|| StudioError::UnknownLength(form.length.clone()))?;

    Ok(GenerationRequest {
        topic: form.prompt.clone(),
        content_type_description: content_type.description.clone(),
        tone_description: tone.description.clone(),
        length: length.bounds,
    })
}

/// Runs one generation action: one independent call per requested version.
///
/// Calls run concurrently; results are collected in request order so
/// entry `i` always carries version `i + 1`.
pub async fn run_generation(
    generator: Arc<dyn TextGenerator>,
    catalog: &Catalog,
    form: &GenerationForm,
) -> Result<Vec<HistoryEntry>, StudioError> {
    let request = Arc::new(build_request(catalog, form)?);
    info!(versions = form.versions, content_type = %form.content_type, tone = %form.tone, length = %form.length, "generating");

    let handles: Vec<_> = (0..form.versions)
        .map(|_| {
            let generator = generator.clone();
            let request = request.clone();
            tokio::spawn(async move { generator.generate(&request).await })
        })
        .collect();

    let mut entries = Vec::with_capacity(handles.len());
    for (i, handle) in handles.into_iter().enumerate() {
        let result = match handle.await {
            Ok(r) => r,
            Err(e) => {
                warn!(version = i + 1, error = %e, "generation task aborted");
                GenerationResult::Failure(format!("Error occurred: {}", e))
            }
        };
        if !result.is_success() {
            warn!(version = i + 1, "variant failed: {}", result.text());
        }
        entries.push(HistoryEntry {
            prompt: form.prompt.clone(),
            content_type: form.content_type.clone(),
            tone: form.tone.clone(),
            length: form.length.clone(),
            text: result.into_text(),
            version: i as u32 + 1,
            created_at: Utc::now(),
        });
    }
    Ok(entries)
}

pub fn record(ledger: &mut SessionLedger, entries: &[HistoryEntry]) {
    for e in entries {
        ledger.append(e.clone());
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Returns "call N"; earlier calls sleep longer so they finish last.
    pub(crate) struct ReverseOrderGenerator {
        pub calls: AtomicU32,
        pub finished: Mutex<Vec<u32>>,
        pub seen: Mutex<Vec<GenerationRequest>>,
    }

    impl ReverseOrderGenerator {
        pub(crate) fn new() -> Self {
            Self { calls: AtomicU32::new(0), finished: Mutex::new(Vec::new()), seen: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl TextGenerator for ReverseOrderGenerator {
        async fn generate(&self, req: &GenerationRequest) -> GenerationResult {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(req.clone());
            tokio::time::sleep(Duration::from_millis(40 * (3 - n.min(3)) as u64)).await;
            self.finished.lock().unwrap().push(n);
            GenerationResult::Success(format!("call {}", n))
        }
    }

    pub(crate) struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn generate(&self, _req: &GenerationRequest) -> GenerationResult {
            GenerationResult::Failure("API Error: 500 - server exploded".into())
        }
    }

    pub(crate) fn form(versions: u32) -> GenerationForm {
        GenerationForm {
            prompt: "Benefits of morning walks".into(),
            content_type: "Blog Post".into(),
            tone: "Friendly".into(),
            length: "Short".into(),
            versions,
        }
    }

    #[tokio::test]
    async fn versions_follow_request_order_not_completion_order() {
        let generator = Arc::new(ReverseOrderGenerator::new());
        let entries = run_generation(generator.clone(), &Catalog::default(), &form(3)).await.unwrap();

        assert_eq!(entries.iter().map(|e| e.version).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(entries.iter().map(|e| e.text.as_str()).collect::<Vec<_>>(), vec!["call 0", "call 1", "call 2"]);
        assert_eq!(*generator.finished.lock().unwrap(), vec![2, 1, 0]);
        for e in &entries {
            assert_eq!(e.prompt, "Benefits of morning walks");
            assert_eq!(e.content_type, "Blog Post");
            assert_eq!(e.tone, "Friendly");
            assert_eq!(e.length, "Short");
        }
    }

    #[tokio::test]
    async fn request_carries_descriptions_not_labels() {
        let generator = Arc::new(ReverseOrderGenerator::new());
        run_generation(generator.clone(), &Catalog::default(), &form(1)).await.unwrap();
        let seen = generator.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].topic, "Benefits of morning walks");
        assert_eq!(seen[0].content_type_description, "Long-form, SEO-friendly, informative content");
        assert_eq!(seen[0].tone_description, "Warm, relaxed and approachable");
        assert_eq!(seen[0].length.to_string(), "100-200");
    }

    #[tokio::test]
    async fn failure_text_is_recorded_like_success() {
        let mut ledger = SessionLedger::new();
        let entries = run_generation(Arc::new(FailingGenerator), &Catalog::default(), &form(1)).await.unwrap();
        record(&mut ledger, &entries);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.list()[0].text, "API Error: 500 - server exploded");
        assert_eq!(ledger.list()[0].version, 1);
        assert_eq!(crate::text::count_words(&ledger.list()[0].text), 6);
    }

    #[tokio::test]
    async fn invalid_forms_make_no_calls() {
        let generator = Arc::new(ReverseOrderGenerator::new());
        let catalog = Catalog::default();

        let mut f = form(1);
        f.prompt = "   ".into();
        assert_eq!(run_generation(generator.clone(), &catalog, &f).await, Err(StudioError::EmptyPrompt));

        assert_eq!(run_generation(generator.clone(), &catalog, &form(0)).await, Err(StudioError::InvalidVersionCount(0)));
        assert_eq!(run_generation(generator.clone(), &catalog, &form(4)).await, Err(StudioError::InvalidVersionCount(4)));

        let mut f = form(1);
        f.tone = "Sarcastic".into();
        assert_eq!(run_generation(generator.clone(), &catalog, &f).await, Err(StudioError::UnknownTone("Sarcastic".into())));

        let mut f = form(1);
        f.length = "Epic".into();
        assert_eq!(run_generation(generator.clone(), &catalog, &f).await, Err(StudioError::UnknownLength("Epic".into())));

        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn form_versions_default_to_one() {
        let f: GenerationForm = serde_json::from_str(
            r#"{"prompt":"x","content_type":"Email","tone":"Formal","length":"Short"}"#,
        ).unwrap();
        assert_eq!(f.versions, 1);
    }
}
