//! Composition root: build every collaborator explicitly, wire the
//! background workers, serve until shutdown.

mod context;

pub use context::AppContext;

use crate::blobstore::{BlobStore, S3BlobStore};
use crate::config::Config;
use crate::events::EventBus;
use crate::gateway::{AppState, TokenVerifier, run_gateway};
use crate::notify::ProgressHub;
use crate::pipeline::run_dispatcher;
use crate::resilience::Shields;
use crate::store::Store;
use crate::sweeper;
use crate::vendors::{AssemblyAiClient, DidClient, ElevenLabsClient, OpenAiClient};
use anyhow::Context as _;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Build the shared context from live config. Vendors and the blob store
/// are the production bindings; tests assemble an [`AppContext`] by hand
/// with stubs instead.
pub async fn build_context(config: Config) -> anyhow::Result<(Arc<AppContext>, EventBus)> {
    let store = Store::connect(&config.database.url, config.database.max_connections)
        .await
        .context("connect database")?;
    let blobs: Arc<dyn BlobStore> =
        Arc::new(S3BlobStore::new(&config.blobstore).context("configure blob store")?);

    let openai = Arc::new(OpenAiClient::new(&config.openai));
    let shields = Shields::new(&config.resilience);
    let (bus, rx) = EventBus::new();

    let ctx = Arc::new(AppContext {
        voice: config.voice.profile(),
        store,
        blobs,
        question_gen: openai.clone(),
        feedback_gen: openai,
        tts: Arc::new(ElevenLabsClient::new(&config.tts)),
        avatar: Arc::new(DidClient::new(&config.avatar)),
        stt: Arc::new(AssemblyAiClient::new(&config.stt)),
        shields,
        bus: bus.clone(),
        hub: ProgressHub::new(),
        tracker: TaskTracker::new(),
        config,
    });

    // The dispatcher is the only consumer of the bus receiver; it spawns
    // pipeline work onto the tracker.
    tokio::spawn(run_dispatcher(ctx.clone(), rx));
    Ok((ctx, bus))
}

/// Run the whole service: gateway, dispatcher, sweeper. Returns after a
/// graceful shutdown.
pub async fn run(config: Config) -> anyhow::Result<()> {
    tracing::info!(summary = %config.startup_summary(), "starting greenroom");

    let verifier = Arc::new(TokenVerifier::new(
        config
            .auth
            .token_secret
            .clone()
            .unwrap_or_default(),
    ));
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let grace = Duration::from_secs(config.server.shutdown_grace_secs);

    let (ctx, _bus) = build_context(config).await?;
    let shutdown = CancellationToken::new();

    tokio::spawn(sweeper::run(ctx.clone(), shutdown.clone()));

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown signal received");
            }
            shutdown.cancel();
        });
    }

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("bind {bind_addr}"))?;
    let state = AppState {
        ctx: ctx.clone(),
        verifier,
    };
    run_gateway(listener, state, shutdown.clone()).await?;

    // Give in-flight pipelines a short grace window; anything that does
    // not finish stays in a transient state and the sweeper rescues it on
    // next start.
    ctx.tracker.close();
    if tokio::time::timeout(grace, ctx.tracker.wait()).await.is_err() {
        tracing::warn!(
            grace_secs = grace.as_secs(),
            "pipelines still running at shutdown; sweeper will recover them"
        );
    }
    Ok(())
}
