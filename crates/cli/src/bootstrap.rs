//! Runtime construction shared by the `chat`, `run` and `index` commands.
//!
//! Resolves the prompt template, validates the config, and wires the backend,
//! document loader, optional document store and sessions together.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use pl_domain::config::{Config, ConfigSeverity, EmbedderKind};
use pl_providers::traits::{DocumentLoader, EmbeddingBackend};
use pl_providers::{FsDocumentLoader, GroundingAnnotator, HashingEmbedder, OpenAiCompatBackend};
use pl_retrieval::{DocumentStore, IndexReport, InMemoryCollection, PromptAugmentor};
use pl_sessions::{GenerationSession, RetrievalContext};

/// Everything a command needs to open sessions.
pub struct Runtime {
    pub config: Arc<Config>,
    pub backend: Arc<OpenAiCompatBackend>,
    pub loader: Arc<FsDocumentLoader>,
    /// `None` when retrieval is disabled in config or on the command line.
    pub store: Option<Arc<DocumentStore>>,
}

impl Runtime {
    /// A fresh session over the shared backend and store.
    pub fn session(&self) -> GenerationSession {
        let session = GenerationSession::new(self.backend.clone(), self.loader.clone())
            .with_channel_capacity(self.config.session.channel_capacity);
        match &self.store {
            Some(store) => session.with_retrieval(RetrievalContext {
                store: store.clone(),
                augmentor: PromptAugmentor::new(self.config.prompt.template.clone()),
                top_k: self.config.retrieval.top_k,
            }),
            None => session,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Replace `prompt.template` with the contents of `prompt.template_path`,
/// if set, so that validation sees the template actually in use.
pub fn resolve_prompt(config: &mut Config) -> anyhow::Result<()> {
    if let Some(path) = config.prompt.template_path.take() {
        config.prompt.template = std::fs::read_to_string(&path)
            .with_context(|| format!("reading prompt template {}", path.display()))?;
        tracing::debug!(path = %path.display(), "prompt template loaded from file");
    }
    Ok(())
}

/// Log every config issue and fail when any of them is an error.
pub fn check_config(config: &Config) -> anyhow::Result<()> {
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    let errors = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if errors > 0 {
        anyhow::bail!("config validation failed with {errors} error(s)");
    }
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Components
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub fn build_backend(config: &Config) -> anyhow::Result<Arc<OpenAiCompatBackend>> {
    let backend = OpenAiCompatBackend::from_config(&config.llm)
        .context("initializing LLM backend")?
        .with_annotator(GroundingAnnotator::new(config.session.annotations_dir.clone()));
    tracing::info!(
        base_url = %config.llm.base_url,
        model = %config.llm.model,
        "LLM backend ready"
    );
    Ok(Arc::new(backend))
}

pub fn build_embedder(
    config: &Config,
    backend: &Arc<OpenAiCompatBackend>,
) -> anyhow::Result<Arc<dyn EmbeddingBackend>> {
    let embedder: Arc<dyn EmbeddingBackend> = match config.retrieval.embedder {
        EmbedderKind::Hashing => Arc::new(
            HashingEmbedder::new(config.retrieval.hashing_dims).context("hashing embedder")?,
        ),
        EmbedderKind::Remote => backend.clone(),
    };
    tracing::info!(embedder = embedder.backend_id(), "embedder ready");
    Ok(embedder)
}

/// An empty in-memory store using the configured chunk size.
pub fn build_store(
    config: &Config,
    embedder: Arc<dyn EmbeddingBackend>,
) -> anyhow::Result<DocumentStore> {
    let store = DocumentStore::new(embedder, Arc::new(InMemoryCollection::new()))
        .with_chunk_size(config.retrieval.chunk_size)
        .context("document store")?;
    Ok(store)
}

/// Resolve the prompt, validate, and build the full runtime.
///
/// Retrieval is wired only when both `use_retrieval` and
/// `retrieval.enabled` are set. With `retrieval.index_on_start` the
/// documents directory is indexed before returning.
pub async fn build_runtime(mut config: Config, use_retrieval: bool) -> anyhow::Result<Runtime> {
    resolve_prompt(&mut config)?;
    check_config(&config)?;

    let backend = build_backend(&config)?;
    let loader = Arc::new(FsDocumentLoader::new());

    let store = if use_retrieval && config.retrieval.enabled {
        let embedder = build_embedder(&config, &backend)?;
        let store = Arc::new(build_store(&config, embedder)?);
        if config.retrieval.index_on_start {
            index_on_start(&store, &*loader, &config.retrieval.documents_path).await;
        }
        Some(store)
    } else {
        tracing::info!("retrieval disabled");
        None
    };

    Ok(Runtime {
        config: Arc::new(config),
        backend,
        loader,
        store,
    })
}

async fn index_on_start(store: &DocumentStore, loader: &dyn DocumentLoader, dir: &Path) {
    if !dir.exists() {
        tracing::warn!(path = %dir.display(), "documents_path does not exist, nothing indexed");
        return;
    }
    match index_paths(store, loader, &[dir.to_path_buf()]).await {
        Ok(report) => tracing::info!(
            path = %dir.display(),
            documents = report.sources.len(),
            chunks = report.total_chunks,
            "documents indexed on start"
        ),
        Err(e) => tracing::warn!(path = %dir.display(), error = %e, "indexing on start failed"),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Indexing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Expand `path` into the loadable documents to index, sorted.
///
/// A file is returned as-is whatever its extension; a directory is walked
/// recursively and only plain-text and PDF files are kept.
pub fn collect_documents(path: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let meta = std::fs::metadata(path).with_context(|| format!("reading {}", path.display()))?;
    if meta.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut found = Vec::new();
    let mut pending = vec![path.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries =
            std::fs::read_dir(&dir).with_context(|| format!("listing {}", dir.display()))?;
        for entry in entries {
            let entry_path = entry?.path();
            if entry_path.is_dir() {
                pending.push(entry_path);
            } else if FsDocumentLoader::is_supported(&entry_path) {
                found.push(entry_path);
            }
        }
    }
    found.sort();
    Ok(found)
}

/// Index every document under `paths` and summarise what was added.
pub async fn index_paths(
    store: &DocumentStore,
    loader: &dyn DocumentLoader,
    paths: &[PathBuf],
) -> anyhow::Result<IndexReport> {
    let mut files = Vec::new();
    for path in paths {
        files.extend(collect_documents(path)?);
    }
    if files.is_empty() {
        anyhow::bail!("no indexable documents found");
    }
    let chunks = store.index_files(loader, &files).await?;
    Ok(IndexReport::from_chunks(&chunks))
}
