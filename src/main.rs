use baltic_ais::config::cli::Command;
use baltic_ais::core::retention::{DeletionPlan, GroupingStrategy};
use baltic_ais::core::stats::collect_stats;
use baltic_ais::utils::error::{AisError, ErrorSeverity, Result};
use baltic_ais::utils::monitor::SystemMonitor;
use baltic_ais::utils::{logger, prompt, validation::Validate};
use baltic_ais::{
    execute_deletion, plan_deletion, AisFeedClient, BoundaryClassifier, CliConfig,
    CollectorPipeline, Confirmation, EtlEngine, LazyClassifier, LocalStorage,
    RetentionClassifier, SupabaseStore, TomlConfig,
};
use clap::Parser;
use std::time::Duration;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::debug!("CLI config: {:?}", cli);

    if let Err(e) = run(cli).await {
        tracing::error!(
            "❌ {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

async fn run(cli: CliConfig) -> Result<()> {
    let config = TomlConfig::load_or_default(&cli.config)?;
    config.validate()?;

    let monitor_enabled = cli.monitor || config.monitoring.enabled;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    match cli.command {
        Command::Collect {
            no_store,
            no_export,
        } => collect(&config, no_store, no_export, monitor_enabled).await,
        Command::Cleanup {
            yes,
            dry_run,
            grouping,
        } => cleanup(&config, yes, dry_run, grouping.into(), monitor_enabled).await,
        Command::Stats => stats(&config).await,
        Command::Classify { lon, lat } => classify(&config, lon, lat),
    }
}

fn open_store(config: &TomlConfig) -> Result<SupabaseStore> {
    let (url, key) = config.store.credentials()?;
    SupabaseStore::new(
        url,
        key,
        &config.store.table,
        Duration::from_secs(config.store.timeout_seconds),
    )
}

fn load_boundaries(config: &TomlConfig) -> Result<BoundaryClassifier> {
    let classifier =
        BoundaryClassifier::load(&config.boundaries.directory(), &config.boundaries.candidates)?;
    let summary = classifier.summary();
    tracing::info!(
        "Loaded {} boundaries ({} areas, {} lines, {} unresolved, {} degenerate)",
        classifier.len(),
        summary.areas,
        summary.lines,
        summary.unresolved,
        summary.degenerate
    );
    Ok(classifier)
}

async fn collect(
    config: &TomlConfig,
    no_store: bool,
    no_export: bool,
    monitor_enabled: bool,
) -> Result<()> {
    let feed = AisFeedClient::new(
        config.source.endpoint.as_str(),
        Duration::from_secs(config.source.timeout_seconds),
    )?;
    let classifier = LazyClassifier::new(
        config.boundaries.directory(),
        config.boundaries.candidates.clone(),
    );
    let mut pipeline: CollectorPipeline<LocalStorage> =
        CollectorPipeline::new(feed, classifier, config.region);

    if !no_store {
        if config.store.is_configured() {
            pipeline = pipeline.with_store(Box::new(open_store(config)?));
        } else {
            tracing::warn!("⚠️ Store not configured, positions will not be persisted");
        }
    }
    if !no_export && config.export.enabled {
        pipeline = pipeline.with_export(LocalStorage::new(&config.export.output_path));
    }

    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);
    let output = engine.run().await?;
    println!("✅ Collection completed: {}", output);
    Ok(())
}

fn print_plan(plan: &DeletionPlan) {
    println!("📊 Analysis complete:");
    println!(
        "   Vessels crossing jurisdictions (kept): {}",
        plan.vessels_kept
    );
    println!(
        "   Vessels within one jurisdiction (to delete): {}",
        plan.vessels.len()
    );
    println!(
        "   Rows to delete: {} of {} (~{:.1}% of space freed)",
        plan.estimated_rows,
        plan.total_rows,
        plan.estimated_freed_percent()
    );
}

async fn cleanup(
    config: &TomlConfig,
    yes: bool,
    dry_run: bool,
    strategy: GroupingStrategy,
    monitor_enabled: bool,
) -> Result<()> {
    let store = open_store(config)?;
    let classifier = load_boundaries(config)?;
    let monitor = SystemMonitor::new(monitor_enabled);

    let partition = RetentionClassifier::new(&classifier)
        .with_strategy(strategy)
        .analyze(&store)
        .await?;
    monitor.log_stats("Analyze");

    let plan = plan_deletion(&partition);
    print_plan(&plan);

    if dry_run {
        println!("Dry run, no data was deleted.");
        return Ok(());
    }
    if plan.is_empty() {
        println!("Nothing to delete.");
        return Ok(());
    }

    let confirmation = if yes {
        Confirmation::Confirmed
    } else {
        let question = format!(
            "⚠️ Delete ALL records for {} vessels? This cannot be undone.",
            plan.vessels.len()
        );
        let stdin = std::io::stdin();
        prompt::ask_confirmation(&mut stdin.lock(), &mut std::io::stdout(), &question)?
    };

    let report = execute_deletion(&store, &plan, confirmation).await?;
    monitor.log_stats("Delete");
    monitor.log_final_stats();

    if !report.executed {
        println!("Cancelled, no data was deleted.");
        return Ok(());
    }

    let freed = match plan.total_rows {
        0 => 0.0,
        total => report.rows_deleted as f64 / total as f64 * 100.0,
    };
    println!(
        "✅ Deleted {} rows for {} vessels in {} batches (~{:.1}% of space freed)",
        report.rows_deleted, report.vessels_deleted, report.batches_applied, freed
    );
    Ok(())
}

async fn stats(config: &TomlConfig) -> Result<()> {
    let store = open_store(config)?;
    let stats = collect_stats(&store).await?;

    let show = |t: Option<chrono::DateTime<chrono::Utc>>| {
        t.map_or_else(|| "-".to_string(), |t| t.to_rfc3339())
    };
    println!("📊 Store statistics:");
    println!("   Total rows: {}", stats.total_rows);
    println!("   Unique vessels: {}", stats.unique_vessels);
    println!("   Oldest position: {}", show(stats.oldest));
    println!("   Newest position: {}", show(stats.newest));
    Ok(())
}

fn classify(config: &TomlConfig, lon: f64, lat: f64) -> Result<()> {
    if !lon.is_finite() || !lat.is_finite() {
        return Err(AisError::InvalidConfigValueError {
            field: "point".to_string(),
            value: format!("{}, {}", lon, lat),
            reason: "coordinates must be finite".to_string(),
        });
    }

    let classifier = load_boundaries(config)?;
    match classifier.classify(lon, lat) {
        Some(jurisdiction) => println!("{}, {} -> {}", lon, lat, jurisdiction),
        None => println!("{}, {} -> no match", lon, lat),
    }
    Ok(())
}
