//! Camera relay demo
//!
//! Run with: cargo run --example relay_demo [URL...]
//!
//! Examples:
//!   cargo run --example relay_demo                                  # test pattern only
//!   cargo run --example relay_demo rtsp://192.168.1.117:8554/stream  # plus a network camera
//!   cargo run --example relay_demo --features device                 # enables the webcam alias
//!
//! Every stream gets a viewer feed that prints one line per relayed frame.
//! Network sources need `ffmpeg` on PATH.
//!
//! ## Analysis
//!
//! Set `ANALYSIS_API_URL` to an OpenAI-compatible `/chat/completions`
//! endpoint (plus `ANALYSIS_API_KEY` / `ANALYSIS_MODEL` as needed) to run
//! frame analysis and accumulate reward and highlights.

use std::sync::Arc;
use std::time::Duration;

use camstream::{
    HttpAnalysisHook, RegistryConfig, StreamDescriptor, StreamRegistry, ViewerFeed,
};

fn print_usage() {
    eprintln!("Usage: relay_demo [URL...]");
    eprintln!();
    eprintln!("Relays a synthetic test pattern and any given network cameras.");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  ANALYSIS_API_URL    chat completions endpoint for frame analysis");
    eprintln!("  ANALYSIS_API_KEY    bearer token");
    eprintln!("  ANALYSIS_MODEL      vision model name");
    eprintln!("  RUST_LOG            log filter");
}

async fn print_feed(mut feed: ViewerFeed) {
    let mut received = 0u64;
    while let Some(message) = feed.recv().await {
        received += 1;
        // Roughly once a second at the default cadence
        if received % 30 == 1 {
            println!(
                "[{}] frame #{} {} bytes(b64) fps={} status={} score={} highlights={}",
                message.stream_id,
                message.sequence,
                message.frame_base64.len(),
                message.fps,
                message.status,
                message.reward_score,
                message.recent_highlights.len(),
            );
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("camstream=info".parse()?)
                .add_directive("relay_demo=debug".parse()?),
        )
        .init();

    let mut config = RegistryConfig::default()
        .autostart(true)
        .initial_stream(StreamDescriptor::fallback("demo", "test-pattern").with_name("Test pattern"));
    for (index, url) in args.iter().enumerate() {
        config = config.initial_stream(StreamDescriptor::network(format!("net{}", index), url.as_str()));
    }

    let mut registry = StreamRegistry::from_config(config);
    if let Some(hook) = HttpAnalysisHook::from_env() {
        registry = registry.with_hook(Arc::new(hook?));
        println!("Frame analysis enabled");
    }
    let registry = Arc::new(registry);

    let loaded = registry.load_initial_streams().await?;
    println!("Started {} stream(s)", loaded);

    let mut viewers = Vec::new();
    for status in registry.list().await {
        let feed = registry.watch(&status.id).await?;
        viewers.push(tokio::spawn(print_feed(feed)));
    }

    let reporter = {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(10));
            loop {
                ticker.tick().await;
                let summary = registry.summary().await;
                println!(
                    "streams={} active={} failed={} frames={} reward={} highlights={}",
                    summary.total_streams,
                    summary.active_streams,
                    summary.failed_streams,
                    summary.total_frames,
                    summary.total_reward,
                    summary.total_highlights,
                );
            }
        })
    };

    tokio::signal::ctrl_c().await?;
    println!("\nShutting down...");

    reporter.abort();
    for viewer in viewers {
        viewer.abort();
    }
    registry.shutdown().await;

    for status in registry.list().await {
        println!("{} -> {}", status.id, serde_json::to_string(&status)?);
    }

    Ok(())
}
