//! rfprint CLI - render page fragments into print popups

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use clap::{Args, Parser, Subcommand};

use rfprint::host::{HostConfig, PageHost, PopupPolicy};
use rfprint::{ContentSource, PresetCatalog, PrintConfig, PrintPopupRenderer};

#[derive(Parser)]
#[command(name = "rfprint")]
#[command(version)]
#[command(about = "Snapshot a page fragment into a print-ready popup document", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a print popup for an element and run its lifecycle
    Print {
        #[command(flatten)]
        target: Target,

        /// Directory printed documents are spooled to
        #[arg(long, value_name = "DIR")]
        spool: Option<PathBuf>,

        /// Refuse popups, as a browser with a popup blocker would
        #[arg(long)]
        block_popups: bool,

        /// Do not wait for the auto-close timer in real time
        #[arg(long)]
        no_wait: bool,
    },

    /// Write the standalone print document for an element
    Compose {
        #[command(flatten)]
        target: Target,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// List available presets
    Presets {
        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,

        /// Extra preset catalog (JSON) merged over the built-in one
        #[arg(long, value_name = "FILE")]
        presets: Option<PathBuf>,
    },
}

#[derive(Args)]
struct Target {
    /// Page to load: a file path or http(s) URL
    #[arg(value_name = "PAGE")]
    page: String,

    /// Element id to print; with --preset it fills the `{id}` label
    #[arg(long)]
    id: Option<String>,

    /// Named layout; see `rfprint presets`
    #[arg(long)]
    preset: Option<String>,

    /// Extra preset catalog (JSON) merged over the built-in one
    #[arg(long, value_name = "FILE")]
    presets: Option<PathBuf>,

    /// Label substitution, e.g. --label month=March
    #[arg(long = "label", value_name = "NAME=VALUE", value_parser = parse_label)]
    labels: Vec<(String, String)>,

    /// Shorthand for --label month=<MONTH>
    #[arg(long)]
    month: Option<String>,

    /// Shorthand for --label year=<YEAR>
    #[arg(long)]
    year: Option<String>,

    /// Override the document title
    #[arg(long)]
    title: Option<String>,

    /// Override the auto-close delay in milliseconds
    #[arg(long, value_name = "MS")]
    close_delay: Option<u64>,
}

fn parse_label(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))?;
    if name.is_empty() {
        return Err(format!("empty label name in '{}'", s));
    }
    Ok((name.to_string(), value.to_string()))
}

fn catalog(extra: Option<&PathBuf>) -> anyhow::Result<PresetCatalog> {
    let mut catalog = PresetCatalog::builtin();
    if let Some(path) = extra {
        let more = PresetCatalog::from_file(path)
            .with_context(|| format!("Failed to read presets from {}", path.display()))?;
        catalog.merge(more);
    }
    Ok(catalog)
}

impl Target {
    fn labels(&self) -> BTreeMap<String, String> {
        let mut labels: BTreeMap<String, String> = self.labels.iter().cloned().collect();
        if let Some(m) = &self.month {
            labels.insert("month".into(), m.clone());
        }
        if let Some(y) = &self.year {
            labels.insert("year".into(), y.clone());
        }
        if let Some(id) = &self.id {
            labels.entry("id".into()).or_insert_with(|| id.clone());
        }
        labels
    }

    fn resolve(&self) -> anyhow::Result<(ContentSource, PrintConfig)> {
        let labels = self.labels();
        let (source, mut config) = match (&self.preset, &self.id) {
            (Some(name), _) => catalog(self.presets.as_ref())?.resolve(name, &labels)?,
            (None, Some(id)) => (
                ContentSource::id(id.clone()),
                PrintConfig {
                    labels,
                    ..Default::default()
                },
            ),
            (None, None) => bail!("one of --id or --preset is required"),
        };
        if let Some(title) = &self.title {
            config.title = title.clone();
        }
        if let Some(ms) = self.close_delay {
            config.auto_close_delay_ms = ms;
        }
        Ok((source, config))
    }

    fn host(&self, config: HostConfig) -> anyhow::Result<PageHost> {
        let mut host = PageHost::new(config)?;
        host.load(&self.page)
            .with_context(|| format!("Failed to load {}", self.page))?;
        Ok(host)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Print {
            target,
            spool,
            block_popups,
            no_wait,
        } => {
            let (source, config) = target.resolve()?;
            let host = target.host(HostConfig {
                popup_policy: if block_popups {
                    PopupPolicy::Block
                } else {
                    PopupPolicy::Allow
                },
                spool_dir: spool,
                ..Default::default()
            })?;
            let mut renderer = PrintPopupRenderer::new(host);
            let rendered = match renderer.render(&source, &config) {
                Ok(r) => r,
                Err(e) => {
                    for notice in renderer.host().notices() {
                        eprintln!("{}", notice);
                    }
                    return Err(anyhow!(e));
                }
            };
            if no_wait {
                renderer.host_mut().run_until_idle();
            } else {
                renderer.host_mut().run_realtime();
            }

            let report = &rendered.report;
            println!("{} ({} bytes, sha256 {})", report.title, report.bytes, report.digest);
            for popup in renderer.host().popups() {
                if let Some(path) = popup.spooled_to {
                    println!("spooled: {}", path.display());
                }
            }
            log::info!("final state: {:?}", rendered.state());
        }

        Commands::Compose { target, output } => {
            let (source, mut config) = target.resolve()?;
            config.embed_lifecycle_script = true;
            let host = target.host(HostConfig::default())?;
            let renderer = PrintPopupRenderer::new(host);
            let document = renderer.compose(&source, &config)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, document.markup())
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    eprintln!("wrote {} ({} bytes)", path.display(), document.len());
                }
                None => print!("{}", document.markup()),
            }
        }

        Commands::Presets { json, presets } => {
            let catalog = catalog(presets.as_ref())?;
            if json {
                println!("{}", catalog.to_json()?);
            } else {
                for name in catalog.names() {
                    if let Some(p) = catalog.get(name) {
                        println!("{:<24} {}", name, p.element_id);
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(args: &[&str]) -> Target {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Print { target, .. } | Commands::Compose { target, .. } => target,
            Commands::Presets { .. } => panic!("expected a print or compose command"),
        }
    }

    #[test]
    fn id_fills_the_preset_placeholder() {
        let t = target(&[
            "rfprint",
            "print",
            "page.html",
            "--preset",
            "summary",
            "--id",
            "payroll-summary",
        ]);
        let (source, config) = t.resolve().unwrap();
        assert_eq!(source.id, "payroll-summary");
        assert_eq!(config.title, "print_Summary");
    }

    #[test]
    fn month_and_year_shorthands_become_labels() {
        let t = target(&[
            "rfprint",
            "compose",
            "page.html",
            "--preset",
            "severance-pay-journal-entry",
            "--id",
            "sev",
            "--month",
            "March",
            "--year",
            "2024",
            "--close-delay",
            "50",
        ]);
        let (source, config) = t.resolve().unwrap();
        assert_eq!(source.id, "sev");
        assert_eq!(config.labels.get("month").map(String::as_str), Some("March"));
        assert_eq!(config.auto_close_delay_ms, 50);
    }

    #[test]
    fn explicit_label_wins_over_id() {
        let t = target(&[
            "rfprint", "print", "page.html", "--preset", "content", "--id", "a", "--label",
            "id=b", "--label", "title=Plan",
        ]);
        let (source, _) = t.resolve().unwrap();
        assert_eq!(source.id, "b");
    }

    #[test]
    fn id_or_preset_is_required() {
        let t = target(&["rfprint", "print", "page.html"]);
        assert!(t.resolve().is_err());
        assert!(Cli::try_parse_from(["rfprint", "print", "page.html", "--label", "x"]).is_err());
    }
}
