mod cli;

use multimodal::{
    config,
    fetch::{Downloader, HttpDownloader},
    ingest,
    parts::{AudioPart, BinaryPart, DataPart, ImagePart, MessagePart, VideoPart},
    Capabilities, DecodeHints,
};
use multimodal_av::ToolRegistry;
use multimodal_common::mime;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, Kind};
use serde_json::{json, Value};
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "multimodal=trace,multimodal_av=debug,multimodal_common=debug".to_string()
        } else {
            "multimodal=info,multimodal_av=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Inspect { file, kind, json } => inspect(&file, kind, json, config_path),
        Commands::Encode { file, kind } => encode(&file, kind, config_path),
        Commands::Decode {
            json_file,
            kind,
            output,
        } => decode(&json_file, kind, output.as_deref()),
        Commands::Fetch { url, kind, allow } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(fetch(&url, kind, allow, config_path))
        }
        Commands::Query { text } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(query(&text, config_path))
        }
        Commands::CheckTools => check_tools(config_path),
        Commands::Validate {
            config: validate_path,
        } => {
            let path = validate_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("multimodal {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn capabilities(config_path: Option<&Path>) -> Result<Capabilities> {
    let config = config::load_config_or_default(config_path)?;
    Ok(Capabilities::discover(&config.tools))
}

/// Resolve `auto` from a MIME type; anything that is not audio, image or
/// video is treated as binary.
fn kind_for_mime(mime: &str) -> Kind {
    match mime.split('/').next() {
        Some("audio") => Kind::Audio,
        Some("image") => Kind::Image,
        Some("video") => Kind::Video,
        _ => Kind::Binary,
    }
}

fn load_file(file: &Path, kind: Kind, caps: &Capabilities) -> Result<MessagePart> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let kind = match kind {
        Kind::Auto => mime::guess_from_path(file)
            .map(kind_for_mime)
            .unwrap_or(Kind::Binary),
        other => other,
    };

    let part: MessagePart = match kind {
        Kind::Audio => AudioPart::from_file(file, &DecodeHints::default(), caps)?.into(),
        Kind::Image => ImagePart::from_file(file)?.into(),
        Kind::Video => VideoPart::from_file(file, None)?
            .with_capabilities(caps.clone())
            .into(),
        Kind::Binary | Kind::Auto => {
            let mime = mime::guess_from_path(file).unwrap_or("application/octet-stream");
            BinaryPart::from_file(file, Some(mime))?.into()
        }
    };
    tracing::debug!("Loaded {:?} as {} part", file, part.kind());
    Ok(part)
}

/// Properties of a part, without its payload.
fn describe(part: &MessagePart) -> Result<Value> {
    let mut summary = json!({ "type": part.kind() });
    match part {
        MessagePart::Text(text) => {
            summary["text"] = json!(text.text);
        }
        MessagePart::Binary(binary) => {
            summary["mime"] = json!(binary.mime());
            summary["size"] = json!(binary.filesize()?);
        }
        MessagePart::Audio(audio) => {
            summary["sample_rate"] = json!(audio.sample_rate());
            summary["duration"] = json!(audio.duration());
            summary["samples"] = json!(audio.raw().len() / multimodal::pcm::SAMPLE_WIDTH);
        }
        MessagePart::Image(image) => {
            let (width, height) = image.size();
            summary["mime"] = json!(image.mime());
            summary["width"] = json!(width);
            summary["height"] = json!(height);
            summary["color"] = json!(format!("{:?}", image.image().color()));
        }
        MessagePart::Video(video) => {
            summary["mime"] = json!(video.mime());
            summary["size"] = json!(video.filesize()?);
            match video.metadata() {
                Ok(meta) => {
                    summary["duration"] = json!(meta.duration);
                    summary["resolution"] = json!(meta.resolution.to_string());
                }
                Err(e) => tracing::warn!("Could not probe video: {}", e),
            }
        }
    }
    if !part.extra().is_empty() {
        summary["extra"] = Value::Object(part.extra().clone());
    }
    Ok(summary)
}

fn print_summary(part: &MessagePart, as_json: bool) -> Result<()> {
    let summary = describe(part)?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if let Value::Object(fields) = summary {
        for (key, value) in fields {
            match value {
                Value::String(s) => println!("{}: {}", key, s),
                other => println!("{}: {}", key, other),
            }
        }
    }
    Ok(())
}

fn inspect(file: &Path, kind: Kind, as_json: bool, config_path: Option<&Path>) -> Result<()> {
    let caps = capabilities(config_path)?;
    let part = load_file(file, kind, &caps)?;
    print_summary(&part, as_json)
}

fn encode(file: &Path, kind: Kind, config_path: Option<&Path>) -> Result<()> {
    let caps = capabilities(config_path)?;
    let part = load_file(file, kind, &caps)?;
    println!("{}", serde_json::to_string_pretty(&part)?);
    Ok(())
}

fn decode(json_file: &Path, kind: Kind, output: Option<&Path>) -> Result<()> {
    let content = std::fs::read_to_string(json_file)
        .with_context(|| format!("Failed to read {:?}", json_file))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {:?}", json_file))?;

    let part: MessagePart = match kind {
        Kind::Auto => serde_json::from_value(value)?,
        Kind::Binary => BinaryPart::from_json(value)?.into(),
        Kind::Audio => AudioPart::from_json(value)?.into(),
        Kind::Image => ImagePart::from_json(value)?.into(),
        Kind::Video => VideoPart::from_json(value)?.into(),
    };
    print_summary(&part, false)?;

    if let Some(output) = output {
        let bytes = match &part {
            MessagePart::Text(text) => text.text.clone().into_bytes(),
            MessagePart::Binary(binary) => binary.as_bytes()?,
            MessagePart::Audio(audio) => audio.as_wav_bytes()?,
            MessagePart::Image(image) => {
                let format = output
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or(multimodal::parts::image::DEFAULT_FORMAT);
                image.as_bytes(format)?
            }
            MessagePart::Video(video) => video.as_bytes()?,
        };
        std::fs::write(output, &bytes)
            .with_context(|| format!("Failed to write {:?}", output))?;
        println!("Wrote {} bytes to {}", bytes.len(), output.display());
    }
    Ok(())
}

async fn fetch(
    url: &str,
    kind: Kind,
    allow: Vec<String>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let caps = Capabilities::discover(&config.tools);
    let downloader = HttpDownloader::from_config(&config.fetch)?;

    let kind = match kind {
        Kind::Auto => kind_for_mime(&downloader.probe_mime(url).await?),
        other => other,
    };
    let allowed = (!allow.is_empty()).then_some(allow.as_slice());

    tracing::info!("Fetching {} as {:?}", url, kind);
    let part: MessagePart = match kind {
        Kind::Audio => {
            AudioPart::from_url(&downloader, url, allowed, &DecodeHints::default(), &caps)
                .await?
                .into()
        }
        Kind::Image => ImagePart::from_url(&downloader, url, allowed).await?.into(),
        Kind::Video => VideoPart::from_url(&downloader, url, allowed)
            .await?
            .with_capabilities(caps)
            .into(),
        Kind::Binary | Kind::Auto => {
            let allowed = allowed.unwrap_or(&config.fetch.allowed_mime);
            BinaryPart::from_url(&downloader, url, Some(allowed))
                .await?
                .into()
        }
    };
    print_summary(&part, false)
}

async fn query(text: &str, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let caps = Capabilities::discover(&config.tools);
    let downloader = HttpDownloader::from_config(&config.fetch)?;

    let parts = ingest::parts_from_query(text, &downloader, &caps).await;
    for (i, part) in parts.iter().enumerate() {
        println!("[{}] {}", i, describe(part)?);
    }
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    println!("Checking external tools...\n");

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
        println!("Some tools are missing. Audio decoding and video probing need them.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Fetch timeout: {}s", config.fetch.timeout_secs);
            println!("  User agent: {}", config.fetch.user_agent);
            println!("  Allowed MIME: {}", config.fetch.allowed_mime.join(", "));
            for (name, path) in [
                ("ffmpeg", &config.tools.ffmpeg_path),
                ("ffprobe", &config.tools.ffprobe_path),
            ] {
                match path {
                    Some(path) => println!("  {}: {}", name, path.display()),
                    None => println!("  {}: (PATH)", name),
                }
            }
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Fetch timeout: {}s", config.fetch.timeout_secs);
        }
    }

    Ok(())
}
