//! Dealflow - Demo Entry Point
//!
//! Pages through a seeded lead collection the way the lead list does:
//! scrolling moves the render window, nearing the end loads the next page,
//! and every visible lead is scored.
//!
//! Usage: `dealflow [CONFIG_PATH]` (defaults to the platform config file)

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use dealflow::domain::config::AppConfig;
use dealflow::domain::filter::{FilterSet, ListQuery};
use dealflow::domain::lead::{EntityKind, Lead, sample_leads};
use dealflow::domain::score::ScoreCalculator;
use dealflow::error::{FetchError, Result};
use dealflow::logging;
use dealflow::services::{
    InMemorySource, LoadOutcome, Notifier, PageSource, PagedLoader, RetryConfig, RetryingSource,
    TracedSource, TracingNotifier, block_on, spawn_named,
};
use dealflow::state::QueryCache;

/// Leads in the seeded collection
const DEMO_LEADS: usize = 95;
/// Visible area of the simulated list, in pixels
const VIEWPORT_EXTENT: f64 = 480.0;
/// Load the next page when the window ends this close to the loaded items
const PREFETCH_THRESHOLD: usize = 5;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("dealflow: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let loaded = match std::env::args().nth(1) {
        Some(path) => AppConfig::load_from(Path::new(&path)),
        None => AppConfig::load(),
    };
    let (config, load_error) = match loaded {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    let _guard = logging::init(&config.logging)?;
    if let Some(e) = load_error {
        warn!(error = %e, "Failed to load config, using defaults");
    }
    info!("Starting Dealflow demo...");

    let calculator = ScoreCalculator::new(config.scoring)?;
    let records = Arc::new(InMemorySource::new(sample_leads(DEMO_LEADS, Utc::now())));
    let cache = QueryCache::new(config.pagination.cache_capacity, config.pagination.stale_time()).shared();
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);

    let remote = TracedSource::new(
        "leads",
        RetryingSource::new(records.clone(), RetryConfig::from(&config.retry)),
    );
    let loader = PagedLoader::from_config(EntityKind::Leads, remote, ListQuery::default(), &config.pagination)
        .with_cache(cache.clone())
        .with_notifier(notifier.clone());

    // Another list warms the cache for the "salud" filter in the background
    let salud_query = ListQuery::new(FilterSet::new().equals("sector", "salud"));
    let salud = Arc::new(
        PagedLoader::from_config(
            EntityKind::Leads,
            TracedSource::new("leads-salud", records.clone()),
            salud_query.clone(),
            &config.pagination,
        )
        .with_cache(cache.clone())
        .with_notifier(notifier),
    );
    let prefetch = spawn_named("prefetch-salud", {
        let salud = salud.clone();
        async move {
            if let Err(e) = salud.load_next_page().await {
                warn!(error = %e, "Prefetch failed");
            }
        }
    })?;

    block_on(async {
        // The first request hits a flaky network; the retry policy absorbs it
        records.fail_next(FetchError::Network {
            message: "connection reset by peer".to_string(),
        });
        loader.load_next_page().await?;

        scroll_through(&loader, &config, &calculator).await?;

        if let Err(e) = prefetch.await {
            warn!(error = %e, "Prefetch task panicked");
        }
        loader.reset(Some(salud_query)).await?;
        let snapshot = loader.snapshot();
        println!(
            "\nsector=salud: {} of {:?} leads loaded ({} source calls in total)",
            snapshot.items.len(),
            snapshot.total_count,
            records.call_count()
        );
        Ok::<_, dealflow::Error>(())
    })??;

    info!(cached_queries = cache.lock().len(), "Demo finished");
    Ok(())
}

/// Scroll from top to bottom half a viewport at a time
async fn scroll_through<S>(
    loader: &PagedLoader<S>,
    config: &AppConfig,
    calculator: &ScoreCalculator,
) -> Result<()>
where
    S: PageSource<Item = Lead>,
{
    let list = &config.window;
    let mut scroll_offset = 0.0;

    loop {
        let count = loader.len();
        let window = list.window(count, scroll_offset, VIEWPORT_EXTENT);

        if window.is_near_end(count, PREFETCH_THRESHOLD) && loader.has_more() {
            if let LoadOutcome::Loaded { page, appended } = loader.load_next_page().await? {
                println!("-- loaded page {page} (+{appended} leads)");
            }
        }

        println!(
            "scroll {:>6.0}px  rows {:>3}..{:<3} of {:>3}  padding {:.0}/{:.0}",
            scroll_offset,
            window.start_index,
            window.end_index,
            loader.len(),
            window.leading_offset,
            window.trailing_offset(),
        );
        loader.with_items(|items| {
            for lead in items.get(window.range()).unwrap_or_default().iter().take(3) {
                let result = calculator.score(Some(&lead.factors));
                println!(
                    "    {:<16} {:<12} {:>3}  [{}]",
                    lead.company,
                    lead.sector,
                    result.score,
                    result.labels.join(", ")
                );
            }
        });

        let max_offset = (loader.len() as f64 * list.item_extent - VIEWPORT_EXTENT).max(0.0);
        if scroll_offset >= max_offset && !loader.has_more() {
            break;
        }
        scroll_offset = (scroll_offset + VIEWPORT_EXTENT / 2.0).min(max_offset);
    }

    Ok(())
}
