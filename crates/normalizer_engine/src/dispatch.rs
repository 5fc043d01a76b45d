use std::path::{Path, PathBuf};
use std::sync::Arc;

use engine_logging::{engine_debug, engine_info, engine_warn};
use normalizer_core::{ExtractionResult, SourceKind};

use crate::classify::classify;
use crate::config::{Clock, EngineConfig};
use crate::decode::decode;
use crate::fetch::{Fetcher, ReqwestFetcher};
use crate::loaders::{BuiltinLoader, CalamineFlattener, DocumentLoader, TabularFlattener};
use crate::mojibake::repair_mojibake;
use crate::readability::ContentScorer;
use crate::NormalizeError;

/// Routes a source to the extractor for its kind.
pub struct Dispatcher {
    fetcher: Arc<dyn Fetcher>,
    loader: Arc<dyn DocumentLoader>,
    flattener: Arc<dyn TabularFlattener>,
    scorer: Arc<ContentScorer>,
    declared_encoding: Option<String>,
    clock: Clock,
}

impl Dispatcher {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            fetcher: Arc::new(ReqwestFetcher::new(config.fetch.clone())),
            loader: Arc::new(BuiltinLoader),
            flattener: Arc::new(CalamineFlattener),
            scorer: Arc::new(ContentScorer::new().with_selector_fallback(config.selector_fallback)),
            declared_encoding: config.declared_encoding.clone(),
            clock: config.clock.clone(),
        }
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_flattener(mut self, flattener: Arc<dyn TabularFlattener>) -> Self {
        self.flattener = flattener;
        self
    }

    pub fn with_scorer(mut self, scorer: ContentScorer) -> Self {
        self.scorer = Arc::new(scorer);
        self
    }

    pub fn now(&self) -> String {
        (self.clock)()
    }

    /// Extract plain text. Local failures propagate; a URL that cannot be
    /// fetched or parsed yields an empty string.
    pub async fn extract_text(&self, source: &str) -> Result<String, NormalizeError> {
        let kind = classify(source)?;
        match self.extract_kind(source, kind).await {
            Err(err @ (NormalizeError::Network(_) | NormalizeError::Parse(_)))
                if kind == SourceKind::Url =>
            {
                engine_warn!("{} yielded no text: {}", source, err);
                Ok(String::new())
            }
            other => other,
        }
    }

    /// Extract text and wrap it in a result envelope. Never fails; every
    /// error becomes a failure result.
    pub async fn extract_with_metadata(&self, source: &str) -> ExtractionResult {
        let kind = match classify(source) {
            Ok(kind) => kind,
            Err(err) => {
                engine_warn!("{}", err);
                return ExtractionResult::failure(
                    source,
                    SourceKind::Unknown,
                    NormalizeError::from(err).to_string(),
                    self.now(),
                );
            }
        };

        match self.extract_kind(source, kind).await {
            Ok(text) => ExtractionResult::success(source, text, kind, self.now()),
            Err(err) => {
                engine_warn!("extraction failed for {}: {}", source, err);
                ExtractionResult::failure(source, kind, err.to_string(), self.now())
            }
        }
    }

    async fn extract_kind(&self, source: &str, kind: SourceKind) -> Result<String, NormalizeError> {
        engine_info!("extracting {} as {}", source, kind);
        match kind {
            SourceKind::Url => self.extract_url(source).await,
            SourceKind::Txt => {
                let declared = self.declared_encoding.clone();
                self.blocking(source, move |path| read_text(&path, declared.as_deref()))
                    .await
            }
            SourceKind::Excel => {
                let flattener = self.flattener.clone();
                self.blocking(source, move |path| Ok(flattener.flatten(&path)?))
                    .await
            }
            SourceKind::Pdf | SourceKind::Word | SourceKind::Ppt | SourceKind::Csv => {
                let loader = self.loader.clone();
                self.blocking(source, move |path| Ok(loader.load(kind, &path)?.join("\n")))
                    .await
            }
            SourceKind::Unknown => Err(NormalizeError::UnsupportedKind {
                input: source.to_string(),
                kind,
            }),
        }
    }

    async fn extract_url(&self, url: &str) -> Result<String, NormalizeError> {
        let output = self.fetcher.fetch(url).await?;
        let decoded = decode(
            &output.body,
            Some(&output.headers),
            self.declared_encoding.as_deref(),
        );
        engine_debug!(
            "{} decoded as {} ({:?})",
            output.metadata.final_url,
            decoded.encoding_label,
            decoded.stage
        );
        Ok(self.scorer.extract_from_markup(&decoded.text)?)
    }

    async fn blocking<F>(&self, source: &str, work: F) -> Result<String, NormalizeError>
    where
        F: FnOnce(PathBuf) -> Result<String, NormalizeError> + Send + 'static,
    {
        let path = PathBuf::from(source);
        tokio::task::spawn_blocking(move || work(path))
            .await
            .map_err(|err| NormalizeError::Runtime(err.to_string()))?
    }
}

/// Whole file through the encoding resolver, then mojibake repair.
fn read_text(path: &Path, declared_encoding: Option<&str>) -> Result<String, NormalizeError> {
    let bytes = std::fs::read(path)?;
    let decoded = decode(&bytes, None, declared_encoding);
    engine_debug!(
        "{} decoded as {} ({:?})",
        path.display(),
        decoded.encoding_label,
        decoded.stage
    );
    Ok(repair_mojibake(&decoded.text))
}
