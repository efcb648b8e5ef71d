//! Pack command - build one plugin archive per target engine version
//!
//! Running `unrealpack` without a subcommand lands here too, so the bare
//! command packages the current directory for every engine version in the
//! config.

use crate::PackArgs;
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use unrealpack::{format_size, PackConfig, Packager};

pub fn run(args: PackArgs) -> Result<()> {
    println!("Creating packages for Unreal Engine...");
    println!();

    // Determine plugin directory
    let plugin_dir = if let Some(p) = args.path {
        PathBuf::from(p)
    } else {
        env::current_dir()?
    };

    if !plugin_dir.exists() {
        anyhow::bail!("Plugin directory does not exist: {}", plugin_dir.display());
    }

    // Resolve to an absolute path so the staging directory lands next to it
    let plugin_dir = plugin_dir.canonicalize()?;

    let mut config = match &args.config {
        Some(path) => PackConfig::load_from(path)?,
        None => PackConfig::load(&plugin_dir)?,
    };

    // Command-line overrides
    if !args.engine_versions.is_empty() {
        config.target_versions = args.engine_versions;
    }
    if let Some(product) = args.product {
        config.product_name = product;
    }
    if let Some(output) = args.output {
        config.output_dir = Some(output);
    }
    if args.no_stamp {
        config.license.enabled = false;
    }

    let packager = Packager::new(config).keep_staging(args.keep_staging);

    println!("  Preparing files...");
    let plan = packager.plan(&plugin_dir)?;

    println!("  Plugin: {}", plugin_dir.display());
    println!("  Version: {}", plan.version_name);
    println!(
        "  Engine versions: {}",
        packager.config().target_versions.join(", ")
    );
    println!("  Files to pack: {}", plan.file_count);
    match &plan.license_file {
        Some(license) => println!("  License header: {}", license.display()),
        None => println!("  License header: none"),
    }
    println!();

    if args.dry_run {
        println!("[DRY RUN] Would stage to: {}", plan.staging_path.display());
        println!();
        println!("Would create:");
        for archive in &plan.archives {
            println!("    {}", archive.display());
        }
        return Ok(());
    }

    let pb = ProgressBar::new(packager.config().target_versions.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("█▓▒░ "),
    );

    let progress_bar = pb.clone();
    let packager = packager.with_progress(Arc::new(
        move |message: &str, current: u64, total: u64| {
            progress_bar.set_length(total);
            progress_bar.set_position(current);
            progress_bar.set_message(message.to_string());
        },
    ));

    let report = match packager.run(&plugin_dir) {
        Ok(report) => report,
        Err(e) => {
            pb.abandon();
            return Err(e.into());
        }
    };
    pb.finish_and_clear();

    println!("Packages created successfully!");
    println!();
    for archive in &report.archives {
        println!("  UE {}", archive.target_version);
        println!("    Output: {}", archive.path.display());
        println!("    Files: {}", archive.file_count);
        println!("    Size: {}", format_size(archive.size_bytes));
        println!("    Checksum: {}", archive.checksum);
    }
    println!();
    if report.files_stamped > 0 {
        println!("  Stamped license header on {} files", report.files_stamped);
    }
    if let Some(staging) = &report.kept_staging {
        println!("  Staging directory kept at: {}", staging.display());
    }

    Ok(())
}
