use std::collections::BTreeMap;
use std::fs;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::warn;

use flt_config::AuditOptions;
use flt_engine::{EngineConfig, LabelCache, RunInfo};
use flt_query::{DirEntitySource, HttpSiteQuery, LocalOverlay, SiteQuery};
use flt_registry::{short_label, ResourceKind, Site, SiteRegistry};

#[derive(Parser)]
#[command(name = "flt")]
#[command(about = "Fleet configuration audit CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a reconciliation pass and emit the merged dataset as JSON
    Run {
        /// Layered config paths in merge order (base -> env -> local...)
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// Resource kinds to audit; repeatable. Empty means all kinds.
        #[arg(long = "kind")]
        kinds: Vec<String>,

        /// JSON file mapping resource keys to display labels
        #[arg(long)]
        labels: Option<String>,

        /// Write the JSON report here instead of stdout
        #[arg(long)]
        out: Option<String>,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// List the fleet a config resolves to
    Sites {
        /// Layered config paths in merge order
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env.local if present (dev convenience). Silent if the file
    // does not exist.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Run {
            config_paths,
            kinds,
            labels,
            out,
        } => {
            let (options, config_hash) = load_options(&config_paths)?;

            let kinds = resolve_kinds(&kinds)?;
            let registry = build_registry(&options)?;
            let query = build_query(&options)?;
            let mut label_cache = load_label_cache(labels.as_deref())?;

            let engine_config = EngineConfig {
                priority_groups: options.priority_groups.clone(),
                hide_empty: options.hide_empty,
                site_timeout_ms: options.site_timeout_ms,
                max_concurrency: options.max_concurrency,
            };

            let mut reports: Vec<Value> = Vec::new();
            for kind in kinds {
                let dataset =
                    flt_engine::run(&registry, kind, &engine_config, Arc::clone(&query)).await?;
                let info = RunInfo::new(kind, Some(config_hash.clone()));
                let labels_value = label_cache
                    .as_mut()
                    .map(|cache| resolve_labels(cache, &dataset.display_order));
                let mut report = serde_json::json!({
                    "info": info,
                    "dataset": dataset,
                });
                if let Some(value) = labels_value {
                    report["labels"] = value;
                }
                reports.push(report);
            }

            let mut envelope = serde_json::json!({ "reports": reports });
            if let Some(cache) = &label_cache {
                envelope["label_misses"] =
                    Value::from(cache.misses().collect::<Vec<_>>());
            }

            let body =
                serde_json::to_string_pretty(&envelope).context("report serialize failed")?;
            match out {
                Some(path) => {
                    fs::write(&path, body)
                        .with_context(|| format!("failed to write report: {path}"))?;
                    println!("report_written=true path={path}");
                }
                None => println!("{body}"),
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = flt_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Sites { config_paths } => {
            let (options, _) = load_options(&config_paths)?;
            let registry = build_registry(&options)?;
            for site in registry.sorted_sites() {
                println!(
                    "site={} endpoint={} label={}",
                    site.id,
                    site.endpoint,
                    short_label(&site.id)
                );
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Load layered config, surface unrecognized top-level keys, and parse
/// the typed options. Returns the options plus the config hash for the
/// report envelope.
fn load_options(config_paths: &[String]) -> Result<(AuditOptions, String)> {
    let path_refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
    let loaded = flt_config::load_layered_yaml(&path_refs)?;

    for key in flt_config::unknown_keys(&loaded.config_json) {
        warn!(%key, "unrecognized top-level config key");
    }

    let options = AuditOptions::from_value(&loaded.config_json)?;
    Ok((options, loaded.config_hash))
}

fn resolve_kinds(raw: &[String]) -> Result<Vec<ResourceKind>> {
    if raw.is_empty() {
        return Ok(ResourceKind::ALL.to_vec());
    }
    raw.iter()
        .map(|s| ResourceKind::from_str(s).map_err(anyhow::Error::from))
        .collect()
}

/// Build the fleet registry. When the local instance participates, it
/// is appended as one more site (unless the config already lists it)
/// so it cannot be counted twice.
fn build_registry(options: &AuditOptions) -> Result<SiteRegistry> {
    let mut sites = options.sites.clone();
    if options.include_local_site && !sites.iter().any(|s| s.id == options.local_site_id) {
        sites.push(Site::new(
            options.local_site_id.clone(),
            format!("local://{}", options.local_root),
        ));
    }
    SiteRegistry::new(sites).context("invalid site list")
}

fn load_label_cache(path: Option<&str>) -> Result<Option<LabelCache>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read labels file: {path}"))?;
    let entries: BTreeMap<String, String> =
        serde_json::from_str(&raw).context("labels file must be a JSON string map")?;
    Ok(Some(LabelCache::new(entries)))
}

/// Translate display-order keys through the label table. Keys without
/// a translation are recorded as misses and fall back to themselves.
fn resolve_labels(cache: &mut LabelCache, keys: &[String]) -> Value {
    let mut out = serde_json::Map::new();
    for key in keys {
        let label = cache.lookup(key).map(str::to_owned);
        match label {
            Some(label) => {
                out.insert(key.clone(), Value::from(label));
            }
            None => {
                cache.record_miss(key);
                out.insert(key.clone(), Value::from(key.as_str()));
            }
        }
    }
    Value::Object(out)
}

fn build_query(options: &AuditOptions) -> Result<Arc<dyn SiteQuery>> {
    let http = HttpSiteQuery::new(Duration::from_millis(options.site_timeout_ms))?;
    if options.include_local_site {
        Ok(Arc::new(LocalOverlay::new(
            http,
            options.local_site_id.clone(),
            DirEntitySource::new(options.local_root.clone()),
        )))
    } else {
        Ok(Arc::new(http))
    }
}
