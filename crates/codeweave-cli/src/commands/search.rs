//! Search command

use crate::app::{OutputFormat, ResponseMode, SearchArgs};
use crate::output::{self, SearchView};
use codeweave_core::pack::{clamp_raw_top_n, collect_raw_blocks};
use codeweave_core::search::{FilePathFilter, LanguageFilter};
use codeweave_core::{
    Config, HttpEmbedder, HttpReranker, QueryChannels, Retriever, RetrievalEventInput,
    SearchFilter, SearchRequest,
};
use anyhow::Result;
use std::sync::Arc;

pub async fn run(args: SearchArgs, format: OutputFormat) -> Result<()> {
    let config = Config::load()?;
    let filter = SearchFilter {
        languages: LanguageFilter::new(
            args.source_code_only,
            &args.include_languages,
            &args.exclude_languages,
        )?,
        paths: FilePathFilter::new(&args.include, &args.exclude)?,
    };

    let db = Arc::new(crate::open_database(&args.repo)?);
    let embedder = Arc::new(HttpEmbedder::from_config(&config.services)?);
    let mut retriever = Retriever::new(
        embedder,
        db.clone(),
        db.clone(),
        db.clone(),
        config.search.clone(),
    )?;
    if let Some(reranker) = HttpReranker::from_config(&config.services)? {
        retriever = retriever.with_reranker(Arc::new(reranker));
    }

    let channels = QueryChannels::build(&args.information_request, &args.terms);
    let request = SearchRequest::new(channels.clone()).with_filter(filter.clone());
    let pack = retriever.search(&request).await?;

    let raw_top_n = clamp_raw_top_n(args.raw_top_n);
    let raw_blocks = match args.mode {
        ResponseMode::Raw => collect_raw_blocks(&pack.seeds, raw_top_n, db.as_ref()).await?,
        ResponseMode::Overview => Vec::new(),
    };

    let mut event = RetrievalEventInput::from_search(&channels, &pack.seeds);
    event.session = args.session.clone();
    match db.record_retrieval_event(&event) {
        Ok(recorded) => tracing::info!(
            event_id = recorded.event_id,
            signals = recorded.inferred_signals.len(),
            "recorded retrieval event"
        ),
        Err(e) => tracing::warn!("Failed to record retrieval feedback: {}", e),
    }

    let view = SearchView {
        mode: args.mode,
        pack: &pack,
        raw_blocks: &raw_blocks,
        raw_top_n,
        filter: &filter,
    };
    println!("{}", output::format_search(&view, format)?);
    Ok(())
}
