use crate::{
    annotations,
    config::Config,
    labels::{rare, taxonomy},
    pipeline::AuditPipeline,
    util::{ensure_dir, hash_file, now_rfc3339, sha256_hex},
};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "clip-audit")]
#[command(about = "Caption dataset audit toolkit (edit detection + label stats + viewer)")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./clip-audit.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check the configured environment and print a JSON diagnosis.
    Doctor {},
    /// Audit a caption export for direct edits by the target annotator.
    DetectEdits {
        #[arg(long)]
        export: PathBuf,
        /// Target annotator; overrides detection.target_user.
        #[arg(long)]
        user: Option<String>,
        /// Batch files (JSON arrays of video URLs); may repeat.
        #[arg(long = "batch-file")]
        batch_files: Vec<PathBuf>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Report rare labels from a label->videos map.
    LabelStats {
        #[arg(long)]
        labels: PathBuf,
        #[arg(long)]
        threshold: Option<u32>,
        /// Write the report here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Emit JSON instead of a markdown table.
        #[arg(long)]
        json: bool,
    },
    /// Copy positive-example videos of rare labels into per-label folders.
    CollectRare {
        #[arg(long)]
        labels: PathBuf,
        #[arg(long)]
        videos_dir: Option<PathBuf>,
        #[arg(long)]
        out_dir: PathBuf,
        #[arg(long)]
        threshold: Option<u32>,
    },
    /// Walk the labels tree and write the hierarchy JSON.
    Hierarchy {
        #[arg(long)]
        labels_dir: Option<PathBuf>,
        #[arg(long, default_value = "label_hierarchy.json")]
        output: PathBuf,
    },
    /// Write the label_name -> dotted-key mapping JSON.
    Mapping {
        #[arg(long)]
        labels_dir: Option<PathBuf>,
        /// Write the mapping here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run the read-only annotation viewer.
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg_path = resolve_config_path(args.config.as_deref())?;
    let cfg = Config::load(&cfg_path)?;

    match &args.cmd {
        Command::Doctor {} => {
            let _guard = init_logging(&args, &cfg, resolve_log_path(&cfg, None).as_deref())?;
            doctor(&cfg)
        }
        Command::DetectEdits {
            export,
            user,
            batch_files,
            out_dir,
        } => detect_edits(
            &args,
            &cfg,
            export,
            user.as_deref(),
            batch_files,
            out_dir.as_deref(),
        ),
        Command::LabelStats {
            labels,
            threshold,
            output,
            json,
        } => {
            let _guard = init_logging(&args, &cfg, resolve_log_path(&cfg, None).as_deref())?;
            label_stats(&cfg, labels, *threshold, output.as_deref(), *json)
        }
        Command::CollectRare {
            labels,
            videos_dir,
            out_dir,
            threshold,
        } => {
            let _guard = init_logging(&args, &cfg, resolve_log_path(&cfg, None).as_deref())?;
            collect_rare(&cfg, labels, videos_dir.as_deref(), out_dir, *threshold)
        }
        Command::Hierarchy { labels_dir, output } => {
            let _guard = init_logging(&args, &cfg, resolve_log_path(&cfg, None).as_deref())?;
            hierarchy(&cfg, labels_dir.as_deref(), output)
        }
        Command::Mapping { labels_dir, output } => {
            let _guard = init_logging(&args, &cfg, resolve_log_path(&cfg, None).as_deref())?;
            mapping(&cfg, labels_dir.as_deref(), output.as_deref())
        }
        Command::Serve { host, port } => {
            let _guard = init_logging(&args, &cfg, resolve_log_path(&cfg, None).as_deref())?;
            let mut cfg = cfg.clone();
            if let Some(host) = host {
                cfg.server.host = host.clone();
            }
            if let Some(port) = port {
                cfg.server.port = *port;
            }
            crate::viewer::run(&cfg)
        }
    }
}

fn resolve_config_path(user: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = user {
        return Ok(p.to_path_buf());
    }
    let default = PathBuf::from("clip-audit.toml");
    if default.exists() {
        Ok(default)
    } else {
        Ok(PathBuf::from("clip-audit.example.toml"))
    }
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn doctor(cfg: &Config) -> Result<()> {
    let annotations_dir = Path::new(&cfg.paths.annotations_dir);
    let datasets = if annotations_dir.exists() {
        annotations::list_datasets(annotations_dir, &cfg.completeness.required_ratings)
    } else {
        Vec::new()
    };

    let labels_dir = Path::new(&cfg.paths.labels_dir);
    let collections: Vec<serde_json::Value> = cfg
        .taxonomy
        .collections
        .iter()
        .map(|c| {
            serde_json::json!({
                "name": c,
                "present": labels_dir.join(c).is_dir(),
            })
        })
        .collect();

    let diag = serde_json::json!({
        "ok": true,
        "paths": {
            "out_dir": cfg.paths.out_dir,
            "annotations_dir": { "path": cfg.paths.annotations_dir, "present": annotations_dir.is_dir() },
            "videos_dir": { "path": cfg.paths.videos_dir, "present": Path::new(&cfg.paths.videos_dir).is_dir() },
            "labels_dir": { "path": cfg.paths.labels_dir, "present": labels_dir.is_dir() },
            "static_dir": { "path": cfg.paths.static_dir, "present": Path::new(&cfg.paths.static_dir).is_dir() },
        },
        "label_collections": collections,
        "datasets_with_complete_annotations": datasets.len(),
        "target_user": cfg.detection.target_user,
    });
    println!("{}", serde_json::to_string_pretty(&diag)?);
    Ok(())
}

fn detect_edits(
    args: &Args,
    cfg: &Config,
    export: &Path,
    user: Option<&str>,
    batch_files: &[PathBuf],
    out_override: Option<&Path>,
) -> Result<()> {
    let mut cfg = cfg.clone();
    if let Some(user) = user {
        cfg.detection.target_user = user.to_string();
    }
    if cfg.detection.target_user.is_empty() {
        return Err(anyhow!(
            "no target user: set detection.target_user or pass --user"
        ));
    }

    validate_export_input(&cfg, export)?;

    let cfg_hash = sha256_hex(cfg.normalized_for_hash().as_bytes());
    let input_hash = hash_file(&cfg.hashing, export)
        .with_context(|| format!("hashing input: {}", export.display()))?;
    let job_id = sha256_hex(format!("{cfg_hash}:{input_hash}").as_bytes());

    let out_root = out_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&cfg.paths.out_dir));
    let job_dir = out_root.join(&job_id);

    if job_dir.exists() && !cfg.global.resume {
        return Err(anyhow!(
            "job_dir already exists and resume=false: {}",
            job_dir.display()
        ));
    }

    ensure_dir(&job_dir)?;
    ensure_dir(&job_dir.join("final"))?;
    ensure_dir(&job_dir.join("logs"))?;

    let log_path = resolve_log_path(&cfg, Some(&job_dir));
    let _guard = init_logging(args, &cfg, log_path.as_deref())?;

    info!("job_id={job_id} out={}", job_dir.display());

    if cfg.debug.dump_effective_config {
        let raw = toml::to_string(&cfg).unwrap_or_default();
        std::fs::write(job_dir.join("effective-config.toml"), raw)?;
    }

    let started = now_rfc3339();
    let pipeline = AuditPipeline::new(&cfg);
    let output = pipeline.run_job(export, batch_files)?;

    if cfg.output.write_report {
        std::fs::write(
            job_dir.join("final").join(&cfg.output.report_filename),
            &output.report_markdown,
        )?;
    }

    if cfg.output.write_samples_jsonl {
        std::fs::write(
            job_dir.join("final").join(&cfg.output.samples_filename),
            &output.samples_jsonl,
        )?;
    }

    if cfg.output.write_index_json {
        let index = serde_json::json!({
            "job_id": job_id,
            "started": started,
            "finished": now_rfc3339(),
            "report": format!("final/{}", cfg.output.report_filename),
            "samples": format!("final/{}", cfg.output.samples_filename),
            "summary": output.summary,
        });
        std::fs::write(
            job_dir.join("index.json"),
            serde_json::to_string_pretty(&index)?,
        )?;
    }

    if cfg.global.print_summary {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "job_id": job_id,
                "job_dir": job_dir,
                "status": "ok",
                "summary": output.summary,
            }))?
        );
    }

    Ok(())
}

fn label_stats(
    cfg: &Config,
    labels: &Path,
    threshold: Option<u32>,
    output: Option<&Path>,
    json: bool,
) -> Result<()> {
    let threshold = threshold.unwrap_or(cfg.rare_labels.positive_threshold);
    let map = rare::load_label_map(labels)?;
    let stats = rare::compute_stats(&map);
    let rare_stats = rare::rare_labels(&stats, threshold);

    info!(
        "{} labels total, {} rare (positive_count < {threshold})",
        stats.len(),
        rare_stats.len()
    );

    let rendered = if json {
        serde_json::to_string_pretty(&rare_stats)?
    } else {
        rare::render_markdown_table(&rare_stats, threshold)
    };

    match output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("writing {}", path.display()))?;
            info!("wrote rare label report to {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn collect_rare(
    cfg: &Config,
    labels: &Path,
    videos_dir: Option<&Path>,
    out_dir: &Path,
    threshold: Option<u32>,
) -> Result<()> {
    let threshold = threshold.unwrap_or(cfg.rare_labels.positive_threshold);
    let videos_dir = videos_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&cfg.paths.videos_dir));

    let map = rare::load_label_map(labels)?;
    ensure_dir(out_dir)?;
    let summary = rare::collect_videos(&map, threshold, &videos_dir, out_dir)?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn hierarchy(cfg: &Config, labels_dir: Option<&Path>, output: &Path) -> Result<()> {
    let labels_dir = labels_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&cfg.paths.labels_dir));

    let primitives = taxonomy::walk_labels_dir(&labels_dir, &cfg.taxonomy.collections)?;
    let hierarchy = taxonomy::organize_hierarchy(&primitives);

    std::fs::write(output, serde_json::to_string_pretty(&hierarchy)?)
        .with_context(|| format!("writing {}", output.display()))?;

    info!(
        "found {} primitives across {} collections",
        primitives.len(),
        hierarchy.len()
    );
    for (collection, aspects) in &hierarchy {
        for (aspect, prims) in aspects {
            info!("{collection}.{aspect}: {} primitives", prims.len());
        }
    }
    Ok(())
}

fn mapping(cfg: &Config, labels_dir: Option<&Path>, output: Option<&Path>) -> Result<()> {
    let labels_dir = labels_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&cfg.paths.labels_dir));

    let primitives = taxonomy::walk_labels_dir(&labels_dir, &cfg.taxonomy.collections)?;
    let mapping = taxonomy::name_mapping(&primitives);
    let rendered = serde_json::to_string_pretty(&mapping)?;

    match output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("writing {}", path.display()))?;
            info!("wrote {} label names to {}", mapping.len(), path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn validate_export_input(cfg: &Config, input: &Path) -> Result<()> {
    let input_str = input.display().to_string();

    if cfg.security.reject_url_inputs && looks_like_url(&input_str) {
        return Err(anyhow!("URL inputs are disabled: {input_str}"));
    }

    if !input.exists() {
        return Err(anyhow!("input does not exist: {}", input.display()));
    }

    if let Some(ext) = input.extension().and_then(|s| s.to_str()) {
        if ext.to_ascii_lowercase() != "json" {
            return Err(anyhow!("input is not a JSON export: {}", input.display()));
        }
    } else {
        warn!("input has no extension; assuming JSON: {}", input.display());
    }

    Ok(())
}

fn looks_like_url(s: &str) -> bool {
    let s = s.to_ascii_lowercase();
    s.starts_with("http://") || s.starts_with("https://") || s.starts_with("file://")
}

fn resolve_log_path(cfg: &Config, job_dir: Option<&Path>) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }

    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }

    if let Some(job_dir) = job_dir {
        return Some(job_dir.join("logs").join("clip-audit.log"));
    }

    Some(PathBuf::from(&cfg.paths.out_dir).join("clip-audit.log"))
}
