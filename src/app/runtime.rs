use std::collections::HashSet;
use std::fs;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail};
use clap::Parser;
use discography_core::crawl::{
    CommandCatalogClient, Crawler, FatalError, LoftyTagger, ProgressSink, YtDlpFetcher,
};
use discography_core::governor::{TokioSleeper, local_today};
use discography_core::identity::{
    HttpIdentityProbe, IdentityLedger, IdentityRotator, PRE_RUN_CHECK_MIN_ARTISTS,
    SshUciTransport, should_rotate_before_run,
};
use discography_core::{CatalogStore, Database};
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::ProcessExit;
use crate::app::config::{self, Settings};
use crate::app::status::{self, IdentityAge};
use crate::app::{progress, terminal};
use crate::cli::Args;

pub(crate) async fn run_discography() -> Result<ProcessExit> {
    let args = Args::parse();

    let no_color = terminal::should_disable_color(
        args.no_color,
        terminal::no_color_env_requested(),
        terminal::is_dumb_terminal(),
    );
    terminal::init_tracing(args.default_log_level(), no_color);
    debug!(?args, "CLI arguments parsed");

    let file_config = config::load_file_config(args.config.as_deref())?;
    let settings = config::resolve_settings(&args, file_config.as_ref(), config::process_env);

    let db = open_database(&settings.db_path).await?;
    let store = CatalogStore::new(db.clone());
    let rotator = settings
        .router
        .clone()
        .map(|router| build_rotator(&db, router, &settings))
        .transpose()?;

    if args.status {
        let identity = match &rotator {
            Some(rotator) => rotator
                .current_identity_age(local_today())
                .await?
                .map_or(IdentityAge::Unknown, IdentityAge::Days),
            None => IdentityAge::NotConfigured,
        };
        let report = status::collect(
            &store,
            settings.options.daily_limit,
            local_today(),
            identity,
        )
        .await?;
        print!("{}", status::render(&report));
        return Ok(ProcessExit::Success);
    }

    if args.mark_banned || args.rotate {
        let Some(rotator) = &rotator else {
            bail!(
                "No router configured. Set ROUTER_HOST or `host` under [router] in the config file"
            );
        };
        if args.mark_banned {
            let identity = rotator.mark_current_banned(local_today()).await?;
            info!(%identity, "Marked current identity as banned");
        } else {
            let identity = rotator.rotate(local_today()).await?;
            info!(%identity, "Rotated to a fresh identity");
        }
        return Ok(ProcessExit::Success);
    }

    let intake = collect_intake(&args, &settings.options.output_dir)?;
    for name in &intake {
        store.enqueue_artist(name).await?;
    }
    let artists: Vec<String> = if args.daemon {
        store
            .pending_artists()
            .await?
            .into_iter()
            .map(|entry| entry.artist)
            .collect()
    } else {
        intake
    };

    if artists.is_empty() {
        info!("No artists to crawl. Pass names, --file, --rescan or --daemon");
        return Ok(ProcessExit::Success);
    }
    info!(artists = artists.len(), "Discography starting");

    if let Some(rotator) = &rotator
        && artists.len() > PRE_RUN_CHECK_MIN_ARTISTS
    {
        let today = local_today();
        let age = rotator.current_identity_age(today).await?;
        if should_rotate_before_run(artists.len(), age, settings.rotate_after_days) {
            info!(age = ?age, "Identity is stale; rotating before the run");
            rotator
                .rotate(today)
                .await
                .context("Identity rotation failed; not starting the run")?;
        }
    }

    fs::create_dir_all(&settings.options.output_dir).with_context(|| {
        format!(
            "Failed to create output directory '{}'",
            settings.options.output_dir.display()
        )
    })?;

    let use_spinner = terminal::should_use_spinner(
        io::stderr().is_terminal(),
        args.quiet,
        terminal::is_dumb_terminal(),
    );
    let (sink, events) = ProgressSink::channel();
    let progress_handle = progress::spawn_progress_consumer(use_spinner, events);

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupt_notice = Arc::new(Notify::new());
    spawn_interrupt_watcher(Arc::clone(&interrupted), Arc::clone(&interrupt_notice));

    let client = CommandCatalogClient::new(
        &settings.catalog_helper,
        settings.catalog_helper_args.clone(),
    );
    let mut crawler = Crawler::new(
        store.clone(),
        Box::new(client),
        Box::new(YtDlpFetcher::new(settings.fetcher.clone())),
        Box::new(LoftyTagger),
        settings.options.clone(),
    )
    .with_events(sink)
    .with_interrupt(interrupted);

    // The crawler stops on its own at the next track or after the current
    // fetch; the notice also cuts through pacing and cool-down sleeps.
    let outcome = tokio::select! {
        outcome = crawler.run(&artists) => outcome,
        () = interrupt_notice.notified() => {
            if let Err(err) = store
                .log_error(FatalError::Interrupted.code(), None, "interrupted by operator")
                .await
            {
                warn!(error = %err, "Could not record interrupt");
            }
            Err(FatalError::Interrupted)
        }
    };
    drop(crawler);
    let _ = progress_handle.await;

    match outcome {
        Ok(summary) => {
            info!("{}", progress::summary_line(&summary));
            Ok(ProcessExit::Success)
        }
        Err(FatalError::Interrupted) => {
            warn!("Interrupted. Run again to resume.");
            Ok(ProcessExit::Failure)
        }
        Err(err) => {
            error!(error = %err, "Run stopped");
            Ok(ProcessExit::Failure)
        }
    }
}

/// Raises `flag` and `notice` on Ctrl-C.
fn spawn_interrupt_watcher(flag: Arc<AtomicBool>, notice: Arc<Notify>) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                flag.store(true, Ordering::SeqCst);
                notice.notify_one();
            }
            Err(err) => warn!(error = %err, "Could not listen for interrupt"),
        }
    });
}

async fn open_database(path: &Path) -> Result<Database> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create '{}'", parent.display()))?;
    }
    Database::new(path)
        .await
        .with_context(|| format!("Failed to open state database '{}'", path.display()))
}

fn build_rotator(
    db: &Database,
    router: discography_core::identity::RouterSettings,
    settings: &Settings,
) -> Result<IdentityRotator> {
    let probe = HttpIdentityProbe::new(settings.probe_url.clone())
        .context("Failed to build the public identity probe")?;
    Ok(IdentityRotator::new(
        IdentityLedger::new(db.clone()),
        Box::new(SshUciTransport::new(router)),
        Box::new(probe),
        Arc::new(TokioSleeper),
        settings.rotation,
    ))
}

/// Artist names from positional arguments, `--file` and `--rescan`, deduplicated in order.
fn collect_intake(args: &Args, output_dir: &Path) -> Result<Vec<String>> {
    let mut names: Vec<String> = args.artists.clone();

    if let Some(path) = &args.file {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read artist file '{}'", path.display()))?;
        names.extend(
            raw.lines()
                .map(str::trim)
                .filter(|line| !line.starts_with('#'))
                .map(str::to_string),
        );
    }

    if args.rescan {
        names.extend(artist_directories(output_dir)?);
    }

    let mut seen = HashSet::new();
    Ok(names
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty() && seen.insert(name.clone()))
        .collect())
}

fn artist_directories(output_dir: &Path) -> Result<Vec<String>> {
    if !output_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names: Vec<String> = fs::read_dir(output_dir)
        .with_context(|| format!("Failed to scan '{}'", output_dir.display()))?
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_dir()))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| !name.starts_with('.'))
        .collect();
    names.sort();
    Ok(names)
}
