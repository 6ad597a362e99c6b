//! Auto-annotation source
//!
//! Produces the ranked `auto` annotation list for a text. When a phrase
//! service is configured it is asked first; any transport error or
//! unreadable body falls back to local RAKE extraction scored by the
//! connotation lexicon. Either way the caller receives a complete
//! replacement list, never a patch.

use super::keyphrase::{extract, ExtractOptions};
use crate::annotation::{phrase_key, Annotation, AnnotationSource};
use crate::connotation::ConnotationScorer;
use crate::phrase_service::{parse_response, ParseResult, PhraseRequest, PhraseServiceClient};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Where an auto-annotation list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoOrigin {
    Service,
    Local,
}

/// Builds auto annotations from the service or the local extractor.
pub struct AutoAnnotator {
    scorer: Arc<ConnotationScorer>,
    options: ExtractOptions,
    max_phrases: usize,
    client: Option<Arc<dyn PhraseServiceClient>>,
}

impl AutoAnnotator {
    pub fn new(scorer: Arc<ConnotationScorer>, options: ExtractOptions, max_phrases: usize) -> Self {
        Self {
            scorer,
            options,
            max_phrases,
            client: None,
        }
    }

    /// Delegate extraction to a remote phrase service.
    pub fn with_client(mut self, client: Arc<dyn PhraseServiceClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn scorer(&self) -> &ConnotationScorer {
        &self.scorer
    }

    /// Compute the full auto annotation list for `text`.
    ///
    /// Phrases whose key is in `marked` are left to the user source.
    pub async fn annotate(&self, text: &str, marked: &HashSet<String>) -> Vec<Annotation> {
        self.annotate_with_origin(text, marked).await.0
    }

    /// Like `annotate`, also reporting which path produced the list.
    pub async fn annotate_with_origin(
        &self,
        text: &str,
        marked: &HashSet<String>,
    ) -> (Vec<Annotation>, AutoOrigin) {
        if text.trim().is_empty() {
            return (Vec::new(), AutoOrigin::Local);
        }

        if let Some(client) = &self.client {
            if let Some(phrases) = self.ask_service(client.as_ref(), text).await {
                return (self.finish(phrases, marked), AutoOrigin::Service);
            }
        }
        (self.local(text, marked), AutoOrigin::Local)
    }

    /// Local extraction only; synchronous.
    pub fn local(&self, text: &str, marked: &HashSet<String>) -> Vec<Annotation> {
        let options = ExtractOptions {
            max_phrases: None,
            ..self.options
        };
        let candidates = extract(text, &options)
            .into_iter()
            .map(|k| (k.phrase, None))
            .collect();
        self.finish(candidates, marked)
    }

    async fn ask_service(
        &self,
        client: &dyn PhraseServiceClient,
        text: &str,
    ) -> Option<Vec<(String, Option<f64>)>> {
        let request = PhraseRequest {
            text: text.to_string(),
            max_phrases: self.max_phrases,
        };

        let body = match client.extract(&request).await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "phrase service failed; using local extraction");
                return None;
            }
        };

        match parse_response(&body) {
            ParseResult::Ok(phrases) => {
                debug!(phrases = phrases.len(), "phrase service answered");
                Some(phrases.into_iter().map(|p| (p.phrase, p.score)).collect())
            }
            ParseResult::Malformed(raw) => {
                warn!(bytes = raw.len(), "malformed phrase service response; using local extraction");
                None
            }
        }
    }

    /// Score, filter, dedupe and cap a candidate list.
    fn finish(&self, candidates: Vec<(String, Option<f64>)>, marked: &HashSet<String>) -> Vec<Annotation> {
        let mut seen = HashSet::new();
        let mut annotations = Vec::new();

        for (phrase, score) in candidates {
            if annotations.len() >= self.max_phrases {
                break;
            }
            let key = phrase_key(&phrase);
            if key.is_empty() || marked.contains(&key) || !seen.insert(key) {
                continue;
            }
            let score = match score {
                Some(s) if s.is_finite() => s.clamp(-1.0, 1.0),
                _ => self.scorer.score(&phrase),
            };
            annotations.push(Annotation::new(&phrase, AnnotationSource::Auto, Some(score)));
        }
        annotations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connotation::{color_of, Lexicon};
    use crate::phrase_service::MockClient;

    fn annotator(max_phrases: usize) -> AutoAnnotator {
        let scorer = Arc::new(ConnotationScorer::new(Lexicon::from_entries([
            ("joy", 0.8),
            ("storm", -0.6),
        ])));
        AutoAnnotator::new(scorer, ExtractOptions::default(), max_phrases)
    }

    fn keys(annotations: &[Annotation]) -> Vec<&str> {
        annotations.iter().map(|a| a.key.as_str()).collect()
    }

    #[tokio::test]
    async fn local_path_scores_with_lexicon() {
        let (annotations, origin) = annotator(10)
            .annotate_with_origin("joy after the storm", &HashSet::new())
            .await;
        assert_eq!(origin, AutoOrigin::Local);

        let joy = annotations.iter().find(|a| a.key == "joy").unwrap();
        assert_eq!(joy.score, Some(0.8));
        assert_eq!(joy.color, color_of(0.8));
        assert!(annotations.iter().all(|a| a.source == AnnotationSource::Auto));
    }

    #[tokio::test]
    async fn marked_phrases_are_excluded() {
        let marked: HashSet<String> = ["joy".to_string()].into_iter().collect();
        let annotations = annotator(10).annotate("joy after the storm", &marked).await;
        assert!(!keys(&annotations).contains(&"joy"));
        assert!(keys(&annotations).contains(&"storm"));
    }

    #[tokio::test]
    async fn list_is_capped() {
        let annotations = annotator(2)
            .annotate("amber birch cedar dune elm", &HashSet::new())
            .await;
        assert_eq!(annotations.len(), 2);
    }

    #[tokio::test]
    async fn service_phrases_are_used_with_their_scores() {
        let client = Arc::new(MockClient::with_body(
            r#"{"phrases": [{"phrase": "Open Sky", "score": 0.4}, {"phrase": "storm"}, {"phrase": "open sky", "score": -1}, {"phrase": "wild", "score": 9}]}"#,
        ));
        let auto = annotator(10).with_client(client.clone());

        let (annotations, origin) = auto
            .annotate_with_origin("open sky, storm, wild", &HashSet::new())
            .await;
        assert_eq!(origin, AutoOrigin::Service);
        assert_eq!(keys(&annotations), vec!["open sky", "storm", "wild"], "duplicates collapse");
        assert_eq!(annotations[0].phrase, "Open Sky");
        assert_eq!(annotations[0].score, Some(0.4));
        assert_eq!(annotations[1].score, Some(-0.6), "missing score falls back to lexicon");
        assert_eq!(annotations[2].score, Some(1.0), "service scores are clamped");

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].max_phrases, 10);
    }

    #[tokio::test]
    async fn wrapped_service_body_is_recovered() {
        let client = Arc::new(MockClient::with_body(
            "Here you go: [{\"phrase\": \"joy\", \"score\": 0.5}] hope that helps",
        ));
        let (annotations, origin) = annotator(10)
            .with_client(client)
            .annotate_with_origin("joy", &HashSet::new())
            .await;
        assert_eq!(origin, AutoOrigin::Service);
        assert_eq!(annotations[0].score, Some(0.5));
    }

    #[tokio::test]
    async fn malformed_body_falls_back_to_local() {
        let client = Arc::new(MockClient::with_body("I could not find any phrases."));
        let (annotations, origin) = annotator(10)
            .with_client(client)
            .annotate_with_origin("joy after the storm", &HashSet::new())
            .await;
        assert_eq!(origin, AutoOrigin::Local);
        assert!(keys(&annotations).contains(&"joy"));
    }

    #[tokio::test]
    async fn transport_failure_falls_back_to_local() {
        let client = Arc::new(MockClient::failing("connection refused"));
        let (annotations, origin) = annotator(10)
            .with_client(client)
            .annotate_with_origin("joy after the storm", &HashSet::new())
            .await;
        assert_eq!(origin, AutoOrigin::Local);
        assert!(!annotations.is_empty());
    }

    #[tokio::test]
    async fn blank_text_skips_the_service() {
        let client = Arc::new(MockClient::with_body("[]"));
        let annotations = annotator(10)
            .with_client(client.clone())
            .annotate("   ", &HashSet::new())
            .await;
        assert!(annotations.is_empty());
        assert!(client.requests().is_empty());
    }
}
