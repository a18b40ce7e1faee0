mod cli;

use alwaysconvert::{
    config::{self, Config},
    conversion::ConversionOrchestrator,
    server,
};

use ac_av::{FfmpegConverter, ToolRegistry};
use ac_core::format::guess_content_type;
use ac_core::{FormatPolicy, UploadedFile};
use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

/// Wire the ffmpeg-backed orchestrator for the given config.
async fn build_orchestrator(config: &Config) -> Result<ConversionOrchestrator> {
    let tools = ToolRegistry::discover(&config.tools);
    if tools.require("ffmpeg").is_err() {
        tracing::warn!("ffmpeg not found; conversions will fail until it is installed");
    }

    let scratch = config.scratch.scratch_dir();
    scratch
        .ensure()
        .await
        .with_context(|| format!("Failed to prepare scratch directory {:?}", scratch.root()))?;
    tracing::info!("Scratch directory: {}", scratch.root().display());

    let converter = FfmpegConverter::new(Arc::new(tools));
    Ok(ConversionOrchestrator::new(scratch, Arc::new(converter)))
}

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting alwaysconvert server");
    tracing::info!(
        "Format mode: {}, upload limit: {} MiB",
        config.conversion.format_mode,
        config.server.max_upload_mb
    );

    let orchestrator = build_orchestrator(&config).await?;
    server::start_server(config, orchestrator).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise pick defaults based on --verbose
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "alwaysconvert=trace,ac_av=trace,ac_core=debug,tower_http=debug".to_string()
        } else {
            "alwaysconvert=debug,ac_av=debug,ac_core=debug,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Convert {
            files,
            format,
            output,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(convert_files(
                &files,
                format.as_deref(),
                output,
                cli.config.as_deref(),
            ))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("alwaysconvert {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn convert_files(
    files: &[PathBuf],
    format: Option<&str>,
    output: Option<PathBuf>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let policy = FormatPolicy::for_request(config.conversion.format_mode, format)?;

    let mut uploads = Vec::with_capacity(files.len());
    for path in files {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read input file: {:?}", path))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        let content_type = guess_content_type(&name);
        uploads.push(UploadedFile::new(data, name, content_type));
    }

    let orchestrator = build_orchestrator(&config).await?;
    let mut descriptor = orchestrator.convert_batch(&uploads, &policy).await?;

    let target = output.unwrap_or_else(|| PathBuf::from(&descriptor.filename));
    let mut out = tokio::fs::File::create(&target)
        .await
        .with_context(|| format!("Failed to create output file: {:?}", target))?;

    while let Some(chunk) = descriptor.stream.next().await {
        let chunk = chunk.context("Failed to read converted output")?;
        out.write_all(&chunk).await?;
    }
    out.flush().await?;

    println!(
        "Wrote {} ({}, {} bytes)",
        target.display(),
        descriptor.mime,
        descriptor.content_length
    );
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = config::load_config_or_default(config_path)?;
    let tools = ToolRegistry::discover(&config.tools).check_all();
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
        println!("ffmpeg is missing. Install it to enable conversions.");
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

    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Upload limit: {} MiB", config.server.max_upload_mb);
    println!("  Scratch: {}", config.scratch.scratch_dir().root().display());
    println!("  Format mode: {}", config.conversion.format_mode);
    match &config.tools.ffmpeg_path {
        Some(p) => println!("  ffmpeg: {}", p.display()),
        None => println!("  ffmpeg: (search PATH)"),
    }
    match config.tools.ffmpeg_timeout_secs {
        Some(secs) => println!("  ffmpeg timeout: {}s", secs),
        None => println!("  ffmpeg timeout: none"),
    }

    Ok(())
}
