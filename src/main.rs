use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::Parser;

use shard::diagnostics::{CollectingSink, Diagnostic, Severity};
use shard::filter::{DisplayFilter, HookRegistry};
use shard::memory::MemorySite;
use shard::metadata::{ShardMetadata, StoreIdentities};
use shard::scanner::scan_markers;
use shard::{Converter, HostFieldValue, Identity, ShardError, placeholder};

mod cli;
use cli::{Cli, Commands, HostArg};

fn read_all(path: Option<&PathBuf>) -> io::Result<String> {
    match path {
        Some(p) => fs::read_to_string(p),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn start_dir_for(input_path: &Option<PathBuf>) -> io::Result<PathBuf> {
    if let Some(p) = input_path {
        Ok(p.parent().unwrap_or(Path::new(".")).to_path_buf())
    } else {
        std::env::current_dir()
    }
}

fn load_site(path: Option<&Path>) -> io::Result<MemorySite> {
    match path {
        Some(p) => MemorySite::load(p),
        None => {
            log::debug!("No site file given, using an empty site");
            Ok(MemorySite::new())
        }
    }
}

/// Field-scoped failures end the run with exit code 1; collaborator failures surface as
/// I/O errors.
fn fail(error: ShardError, sink: &CollectingSink) -> io::Result<()> {
    if error.is_fatal() {
        return Err(io::Error::other(error));
    }
    print_diagnostics(&sink.take());
    eprintln!("\x1b[31merror\x1b[0m: {error}");
    std::process::exit(1);
}

fn main() -> io::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let file = match &cli.command {
        Commands::Store { file, .. }
        | Commands::Display { file }
        | Commands::Edit { file }
        | Commands::Scan { file } => file.clone(),
    };
    let start_dir = start_dir_for(&file)?;
    let (cfg, cfg_path) = shard::config::load(cli.config.as_deref(), &start_dir)?;

    if let Some(path) = &cfg_path {
        log::debug!("Using config from: {}", path.display());
    } else {
        log::debug!("Using default config");
    }

    let site_path = cli.site.clone().or_else(|| cfg.site.clone());
    let site = load_site(site_path.as_deref())?;
    let metadata = ShardMetadata::new(&cfg, &site);
    let identities = StoreIdentities::new(&site);
    let sink = CollectingSink::new();
    let ctx = site.context(&metadata, &identities, &sink);
    let converter = Converter::with_config(ctx, &cfg);

    let input = read_all(file.as_ref())?;

    match cli.command {
        Commands::Store {
            host, field, index, write, ..
        } => {
            let host = match host {
                HostArg::Id(id) => Identity::Id(id),
                HostArg::New => placeholder::new_placeholder(&identities),
            };
            let target = HostFieldValue::new(host, field, index);
            let conversion = match converter.authoring_to_storage(&input, &target) {
                Ok(conversion) => conversion,
                Err(e) => return fail(e, &sink),
            };

            print!("{}", conversion.markup);
            print_diagnostics(&sink.take());

            if !conversion.pending.is_empty() {
                let json = serde_json::to_string_pretty(&conversion.pending).map_err(io::Error::other)?;
                eprintln!("{json}");
            }

            if write {
                match &site_path {
                    Some(path) => site.save(path)?,
                    None => {
                        eprintln!("Error: --write needs a site file (--site or `site` in config)");
                        std::process::exit(1);
                    }
                }
            }
            Ok(())
        }
        Commands::Display { .. } => {
            let hooks = HookRegistry::new();
            let filter = DisplayFilter::new(converter, &hooks);
            match filter.process(&input) {
                Ok(output) => {
                    print!("{output}");
                    print_diagnostics(&sink.take());
                    Ok(())
                }
                Err(e) => fail(e, &sink),
            }
        }
        Commands::Edit { .. } => match converter.storage_to_authoring(&input) {
            Ok(conversion) => {
                print!("{}", conversion.markup);
                print_diagnostics(&sink.take());
                Ok(())
            }
            Err(e) => fail(e, &sink),
        },
        Commands::Scan { .. } => {
            let markers = match scan_markers(&input, &metadata) {
                Ok(markers) => markers,
                Err(e) => return fail(e, &sink),
            };
            let file_name = file.as_ref().and_then(|p| p.to_str()).unwrap_or("<stdin>");

            if markers.is_empty() {
                println!("No embed markers found");
                return Ok(());
            }
            for marker in &markers {
                let mut line = format!("{file_name}:{}: {}", marker.line, marker.embed_type);
                for (label, value) in [
                    ("guest", &marker.guest_id),
                    ("id", &marker.record_id),
                    ("view-mode", &marker.view_mode),
                ] {
                    if let Some(value) = value {
                        line.push_str(&format!(" {label}={value}"));
                    }
                }
                if !marker.known {
                    line.push_str(" (unknown type)");
                }
                if marker.processed {
                    line.push_str(" (processed)");
                }
                println!("{line}");
            }
            println!("\nFound {} marker(s)", markers.len());
            Ok(())
        }
    }
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for diag in diagnostics {
        let severity_str = match diag.severity {
            Severity::Error => "\x1b[31merror\x1b[0m",     // red
            Severity::Warning => "\x1b[33mwarning\x1b[0m", // yellow
            Severity::Info => "\x1b[34minfo\x1b[0m",       // blue
        };

        match (&diag.field, diag.index) {
            (Some(field), Some(index)) => {
                eprintln!("{severity_str}[{}]: {} in {field}[{index}]", diag.code, diag.message)
            }
            _ => eprintln!("{severity_str}[{}]: {}", diag.code, diag.message),
        }
    }
}
