use std::path::Path;

use anyhow::{bail, Context, Result};
use clj_uberjar::logging::{self, LoggingConfig};
use clj_uberjar::{build_package, excluded_coordinates, load_package_config, plan};

fn usage() -> &'static str {
    "Usage:\n  clj-uberjar package <request.toml> [--json]\n  clj-uberjar classify <request.toml>\n  clj-uberjar excluded <request.toml>\n\nLog level: CLJ_UBERJAR_LOG_LEVEL (default: info); RUST_LOG overrides it."
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.as_slice() {
        [cmd, request] if cmd == "package" => package(Path::new(request), false),
        [cmd, request, flag] if cmd == "package" && flag == "--json" => {
            package(Path::new(request), true)
        }
        [cmd, request] if cmd == "classify" => classify(Path::new(request)),
        [cmd, request] if cmd == "excluded" => excluded(Path::new(request)),
        [help] if help == "-h" || help == "--help" => {
            println!("{}", usage());
            Ok(())
        }
        _ => bail!(usage()),
    }
}

fn package(request: &Path, json: bool) -> Result<()> {
    // Structured report on stdout; keep logs machine-readable too.
    logging::init(LoggingConfig::from_env().json(json));

    let config = load_package_config(request)?;
    let report = build_package(&config)
        .with_context(|| format!("building uberjar '{}'", config.output.display()))?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serializing report")?
        );
    } else {
        println!(
            "[package] {} ({} entries, {} excluded, sha256 {})",
            report.output.display(),
            report.entries_written,
            report.excluded,
            report.sha256
        );
    }
    Ok(())
}

fn classify(request: &Path) -> Result<()> {
    logging::init(LoggingConfig::from_env());

    let config = load_package_config(request)?;
    let plan = plan(&config).context("classifying artifacts")?;
    for (path, disposition) in plan.dispositions.iter() {
        println!("{disposition}\t{path}");
    }
    Ok(())
}

fn excluded(request: &Path) -> Result<()> {
    logging::init(LoggingConfig::from_env());

    let config = load_package_config(request)?;
    for coordinate in excluded_coordinates(&config).iter() {
        println!("{}", coordinate.key());
    }
    Ok(())
}
