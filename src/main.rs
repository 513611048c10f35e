mod cli;

use boxcutter::config;
use boxcutter_media::mp4::{scan, FileTypeBox, FourCC, MovieHeaderBox, TrackBox};
use boxcutter_media::{ByteSource, ExtractPolicy, FileSource, Mp4File, ParseLimits};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use serde::Serialize;
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "boxcutter=debug,boxcutter_media=trace".to_string()
        } else {
            "boxcutter=info,boxcutter_media=info".to_string()
        }
    });

    // Logs go to stderr so stdout stays clean for reports and JSON.
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Extract {
            input,
            output,
            best_effort,
        } => extract_file(
            &input,
            output.as_deref(),
            best_effort,
            cli.config.as_deref(),
        ),
        Commands::Info { file, json } => info_file(&file, json, cli.config.as_deref()),
        Commands::Tree { file } => tree_file(&file, cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("boxcutter {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Open `file` and parse its box tree under the configured limits.
fn open_and_parse(file: &Path, limits: &ParseLimits) -> Result<(FileSource, Mp4File)> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let source =
        FileSource::open(file).with_context(|| format!("Failed to open file: {:?}", file))?;
    let mp4 = Mp4File::parse_with_limits(&source, limits)
        .with_context(|| format!("Failed to parse MP4 file: {:?}", file))?;
    Ok((source, mp4))
}

fn extract_file(
    input: &Path,
    output: Option<&Path>,
    best_effort: bool,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let policy = if best_effort {
        ExtractPolicy::BestEffort
    } else {
        config.extract.policy
    };

    tracing::info!("Extracting video from {:?} ({:?})", input, policy);
    let (source, mp4) = open_and_parse(input, &ParseLimits::from(&config.limits))?;

    let extraction = mp4
        .extract_video(&source, policy)
        .with_context(|| format!("Failed to extract video stream from {:?}", input))?;

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| input.with_extension("h264"));
    std::fs::write(&output, &extraction.stream)
        .with_context(|| format!("Failed to write output file: {:?}", output))?;

    println!(
        "Wrote {} bytes to {} ({} samples, {} NAL units)",
        extraction.stream.len(),
        output.display(),
        extraction.samples_written,
        extraction.nal_units
    );
    if !extraction.skipped.is_empty() {
        println!("Skipped {} samples:", extraction.skipped.len());
        for skipped in &extraction.skipped {
            println!(
                "  [{}] offset {} ({} bytes): {}",
                skipped.index, skipped.offset, skipped.length, skipped.reason
            );
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct InfoReport<'a> {
    file: &'a Path,
    size: u64,
    faststart: bool,
    ftyp: &'a FileTypeBox,
    mvhd: &'a MovieHeaderBox,
    tracks: Vec<TrackSummary>,
    video_track: Option<usize>,
}

#[derive(Serialize)]
struct TrackSummary {
    track_id: Option<u32>,
    handler: FourCC,
    name: String,
    width: Option<f64>,
    height: Option<f64>,
    timescale: Option<u32>,
    language: Option<String>,
    sample_count: Option<u32>,
    chunk_count: Option<usize>,
}

impl From<&TrackBox> for TrackSummary {
    fn from(track: &TrackBox) -> Self {
        let stbl = track.sample_table();
        Self {
            track_id: track.track_id(),
            handler: track.handler_type(),
            name: track.mdia.hdlr.name.clone(),
            width: track.tkhd.as_ref().map(|t| t.width.to_f64()),
            height: track.tkhd.as_ref().map(|t| t.height.to_f64()),
            timescale: track.mdia.mdhd.as_ref().map(|m| m.timescale),
            language: track.mdia.mdhd.as_ref().map(|m| m.language.clone()),
            sample_count: stbl.stsz.as_ref().map(|s| s.sample_count),
            chunk_count: stbl.chunk_offsets.as_ref().map(|c| c.offsets.len()),
        }
    }
}

fn info_file(file: &Path, json: bool, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let (_source, mp4) = open_and_parse(file, &ParseLimits::from(&config.limits))?;

    let report = InfoReport {
        file,
        size: mp4.size,
        faststart: mp4.has_faststart(),
        ftyp: &mp4.ftyp,
        mvhd: &mp4.moov.mvhd,
        tracks: mp4.tracks().iter().map(TrackSummary::from).collect(),
        video_track: mp4.tracks().iter().position(|t| t.is_video()),
    };

    if json {
        let json_str = serde_json::to_string_pretty(&report)?;
        println!("{}", json_str);
        return Ok(());
    }

    println!("File: {}", file.display());
    println!("Size: {} bytes", report.size);
    println!("Faststart: {}", if report.faststart { "yes" } else { "no" });

    let ftyp = report.ftyp;
    let brands: Vec<_> = ftyp.compatible_brands.iter().map(|b| b.to_string()).collect();
    println!("\nMajor brand: {}", ftyp.major_brand);
    println!("Minor version: {}", ftyp.minor_version);
    println!("Compatible brands: {}", brands.join(", "));

    let mvhd = report.mvhd;
    println!("\nTimescale: {}", mvhd.timescale);
    println!("Duration: {} ({:.3}s)", mvhd.duration, mp4.duration_secs());
    println!("Rate: {}", mvhd.rate);
    println!("Volume: {}", mvhd.volume);
    println!("Next track ID: {}", mvhd.next_track_id);

    println!("\nTracks: {}", report.tracks.len());
    for (i, track) in report.tracks.iter().enumerate() {
        print!("  [{}] {}", i, track.handler);
        if let Some(id) = track.track_id {
            print!(" id={}", id);
        }
        if let (Some(width), Some(height)) = (track.width, track.height) {
            if width > 0.0 && height > 0.0 {
                print!(" {}x{}", width, height);
            }
        }
        if let Some(ref lang) = track.language {
            print!(" ({})", lang);
        }
        if let Some(samples) = track.sample_count {
            print!(", {} samples", samples);
        }
        if report.video_track == Some(i) {
            print!(" [selected]");
        }
        println!();
    }

    if report.video_track.is_none() {
        println!("\nNo video track");
    }

    Ok(())
}

fn tree_file(file: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let source =
        FileSource::open(file).with_context(|| format!("Failed to open file: {:?}", file))?;
    let size = source.size()?;
    print_tree(&source, 0, size, 0, config.limits.max_depth)
        .with_context(|| format!("Failed to scan box tree of {:?}", file))
}

fn print_tree<S: ByteSource + ?Sized>(
    source: &S,
    start: u64,
    length: u64,
    depth: usize,
    max_depth: usize,
) -> Result<()> {
    for header in scan(source, start, length) {
        let header = header?;
        println!(
            "{:indent$}{} offset={} size={}",
            "",
            header.box_type,
            header.start,
            header.size,
            indent = depth * 2
        );
        if header.box_type.is_container() && depth + 1 < max_depth {
            print_tree(
                source,
                header.payload_offset(),
                header.payload_len(),
                depth + 1,
                max_depth,
            )?;
        }
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
            config::Config::default()
        }
    };

    println!("  Max depth: {}", config.limits.max_depth);
    println!("  Max boxes: {}", config.limits.max_boxes);
    println!("  Max payload bytes: {}", config.limits.max_payload_bytes);
    println!("  Extract policy: {:?}", config.extract.policy);

    Ok(())
}
