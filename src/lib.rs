//! Inktrace: Writing Timeline and Phrase Annotation Engine
//!
//! Records every edit of a piece of text with its timestamp, replays the
//! timeline at bounded original speed, and overlays the text with colored
//! phrase annotations scored by connotation.
//!
//! # Core Concepts
//!
//! - **History**: Ordered `{value, time}` snapshots, one per edit
//! - **Annotations**: Phrases from three sources (user, live, auto) merged
//!   by longest match, then precedence
//! - **Metrics**: Flow, stress and energy indices reduced from the timeline
//!
//! # Example
//!
//! ```
//! use inktrace::{render, Annotation, AnnotationSource};
//!
//! let annotations = [Annotation::new("New York", AnnotationSource::User, Some(0.5))];
//! let spans = render("I love New York.", &annotations);
//! assert!(spans.iter().any(|s| s.text == "New York" && s.is_annotated()));
//! ```

pub mod annotation;
pub mod cancel;
pub mod config;
pub mod connotation;
pub mod export;
pub mod extract;
pub mod metrics;
pub mod phrase_service;
pub mod session;
pub mod timeline;
pub mod translate;

pub use annotation::{render, Annotation, AnnotationSource, Span, SpanKind};
pub use cancel::{CancellationToken, Generation};
pub use config::{Config, ConfigError};
pub use connotation::{color_of, Color, ConnotationScorer, Lexicon};
pub use extract::{extract, AutoAnnotator, ExtractOptions, Keyphrase};
pub use metrics::{run_analysis, AnalysisResult, MetricsConfig};
pub use session::{Session, SessionController, SessionError, SessionId};
pub use timeline::{History, HistoryEntry, ReplayScheduler, ReplayState};
pub use translate::{Translation, TranslationChain, TranslateError, Translator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
