mod cli;

use debridflow::{
    config::{self, Config, LoggingConfig},
    handoff::GrabEvent,
    pipeline::{self, lock::TranscodeLock, Orchestrator, TorrentSource},
};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use debridflow_av::{StreamKind, Tools};
use std::path::Path;
use std::sync::{Arc, Mutex};

fn init_logging(verbose: bool, logging: &LoggingConfig) -> Result<()> {
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if verbose {
            "debridflow=trace,debridflow_av=trace,debridflow_common=debug".to_string()
        } else {
            logging
                .level
                .clone()
                .unwrap_or_else(|| "debridflow=info,debridflow_av=info".to_string())
        }
    });

    let builder = tracing_subscriber::fmt().with_env_filter(&env_filter);

    match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {:?}", path))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            return validate_config(path.as_deref());
        }
        Commands::Version => {
            println!("debridflow {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    let config = Arc::new(config::load_config_or_default(cli.config.as_deref())?);
    init_logging(cli.verbose, &config.logging)?;

    match cli.command {
        Commands::Grab => grab(&config),
        Commands::Fetch { source, hash } => {
            let rt = tokio::runtime::Runtime::new()?;
            let orchestrator = Orchestrator::new(config);
            let summary =
                rt.block_on(orchestrator.fetch(TorrentSource::parse(&source), hash.as_deref()))?;
            tracing::info!("Done: {:?}", summary);
            Ok(())
        }
        Commands::Import { save_dir, hash } => {
            let rt = tokio::runtime::Runtime::new()?;
            let orchestrator = Orchestrator::new(config);
            let summary = rt.block_on(orchestrator.import(&save_dir, &hash))?;
            tracing::info!("Done: {:?}", summary);
            Ok(())
        }
        Commands::Probe { file, json } => probe_file(&config, &file, json),
        Commands::Transcode { file, dry_run } => transcode(&config, &file, dry_run),
        Commands::CheckTools => check_tools(),
        Commands::Validate { .. } | Commands::Version => Ok(()),
    }
}

fn grab(config: &Config) -> Result<()> {
    let Some(event) = GrabEvent::from_env()? else {
        tracing::info!("No download id in environment, nothing to record");
        return Ok(());
    };

    let handoff = event.to_handoff(&config.upload);
    let path = handoff.write(&config.handoff.dir)?;
    tracing::info!(
        "Saved {} {} ({}) to {:?}",
        handoff.category,
        handoff.id,
        event.title,
        path
    );
    println!("{}", path.display());
    Ok(())
}

fn tools(config: &Config) -> Result<Tools> {
    Ok(Tools::discover(
        config.tools.ffmpeg_path.as_deref(),
        config.tools.ffprobe_path.as_deref(),
    )?)
}

fn probe_file(config: &Config, file: &Path, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let tools = tools(config)?;
    let probed = debridflow_av::probe(&tools, file)?;
    let decision = debridflow_av::decide(&probed);

    if json {
        let value = match &decision {
            Ok(decision) => serde_json::json!({ "file": probed, "decision": decision }),
            Err(e) => serde_json::json!({ "file": probed, "error": e.to_string() }),
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("File: {}", probed.path.display());
    println!(
        "Container: {}",
        probed.extension().unwrap_or_else(|| "unknown".to_string())
    );

    for kind in [StreamKind::Video, StreamKind::Audio, StreamKind::Subtitle] {
        let streams: Vec<_> = probed.streams_of(kind).collect();
        println!("\n{} streams: {}", kind, streams.len());
        for (i, stream) in streams.iter().enumerate() {
            print!("  [{}] #{} {}", i, stream.index, stream.codec);
            if let Some(channels) = stream.channels {
                print!(" {}ch", channels);
            }
            if let Some(ref lang) = stream.language {
                print!(" ({})", lang);
            }
            if let Some(ref title) = stream.title {
                print!(" \"{}\"", title);
            }
            if stream.default {
                print!(" [default]");
            }
            if stream.forced {
                print!(" [forced]");
            }
            println!();
        }
    }

    println!();
    match decision {
        Ok(decision) => {
            println!("Action: {}", decision.plan.action);
            if let Some(target) = decision.plan.target_audio_index {
                println!("Target audio stream: a:{}", target);
            }
            for task in &decision.subtitles {
                println!(
                    "Subtitle: s:{} -> {}",
                    task.subtitle_ordinal,
                    task.output_name("<stem>")
                );
            }
        }
        Err(e) => println!("Rejected: {}", e),
    }

    Ok(())
}

fn transcode(config: &Config, file: &Path, dry_run: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("Input file does not exist: {:?}", file);
    }

    let tools = tools(config)?;

    if dry_run {
        let probed = debridflow_av::probe(&tools, file)?;
        let decision = debridflow_av::decide(&probed)?;
        println!("[DRY RUN] Action: {}", decision.plan.action);
        if decision.plan.rewrites_file() {
            println!(
                "ffmpeg args: {}",
                debridflow_av::actions::audio_args(&decision.plan)?.join(" ")
            );
        }
        for task in &decision.subtitles {
            println!(
                "Subtitle: {}",
                debridflow_av::actions::sidecar_for(file, task)?.display()
            );
        }
        return Ok(());
    }

    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt.block_on(async {
        let _lock = TranscodeLock::acquire(&config.handoff.dir).await?;
        pipeline::transcode_file(tools, file.to_path_buf()).await
    })?;
    match outcome {
        Some(outcome) => {
            println!("Output: {}", outcome.output.display());
            for subtitle in &outcome.subtitles {
                println!("Subtitle: {}", subtitle.display());
            }
        }
        None => println!("File was skipped"),
    }

    Ok(())
}

fn check_tools() -> Result<()> {
    println!("Checking external tools...\n");

    let tools = debridflow_av::check_tools();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install them to enable all features.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Debrid API: {}", config.debrid.base_url);
    println!("  Staging dir: {:?}", config.download.staging_dir);
    println!("  Download workers: {}", config.download.concurrency);
    println!(
        "  Upload: {}: (batches of {})",
        config.upload.remote, config.upload.batch_size
    );
    println!("  Arr integrations: {}", config.arrs.len());
    println!(
        "    Enabled: {}",
        config.arrs.iter().filter(|a| a.enabled).count()
    );
    for (name, service) in [
        ("Bazarr", &config.bazarr),
        ("Emby", &config.emby),
        ("Jellyseerr", &config.jellyseerr),
    ] {
        let enabled = service.as_ref().map(|s| s.enabled).unwrap_or(false);
        println!("  {}: {}", name, if enabled { "enabled" } else { "disabled" });
    }

    Ok(())
}
