use super::{default_output, resolve_path};
use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use regionlock_editor::{
    apply_protection, with_session, EditorError, FileHost, ProtectionOptions, ProtectionReport,
    TagPair,
};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Args)]
pub struct LockArgs {
    /// Document to protect
    pub input: PathBuf,

    /// Output path (defaults to <stem>.protected.<ext>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Named region to keep locked (repeatable)
    #[arg(short, long = "keep", value_name = "NAME")]
    pub keep: Vec<String>,

    /// Named region to make editable even if kept locked (repeatable)
    #[arg(long, value_name = "NAME")]
    pub unlock: Vec<String>,

    /// Tag pair whose interior stays editable (repeatable)
    #[arg(long, num_args = 2, value_names = ["OPEN", "CLOSE"])]
    pub tag: Vec<String>,

    /// Protection password
    #[arg(long)]
    pub password: Option<String>,

    /// Grant edit spans but leave the document unprotected
    #[arg(long)]
    pub no_protect: bool,

    /// Config file (defaults to regionlock.config.json in the current directory)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl LockArgs {
    /// Config values extended and overridden by flags
    pub fn options(&self, config: &Config) -> Result<ProtectionOptions> {
        let mut options = config.protection_options();

        options.keep_locked.extend(self.keep.iter().cloned());
        options.unlock.extend(self.unlock.iter().cloned());
        for pair in self.tag.chunks(2) {
            if let [open, close] = pair {
                options.tags.push(TagPair::new(open.as_str(), close.as_str())?);
            }
        }
        if let Some(password) = &self.password {
            options.password = Some(password.clone());
        }
        if self.no_protect {
            options.protect = false;
        }

        Ok(options)
    }
}

pub fn lock(args: LockArgs, cwd: &Path) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::load_from(&resolve_path(cwd, path))?,
        None => Config::load(cwd)?,
    };
    let options = args.options(&config)?;
    debug!(
        "Keeping {:?} locked, unlocking {:?}, {} tag pair(s)",
        options.keep_locked,
        options.unlock,
        options.tags.len()
    );

    let input = resolve_path(cwd, &args.input);
    let output = match &args.output {
        Some(path) => resolve_path(cwd, path),
        None => default_output(&input, "protected"),
    };

    println!("{}", "Locking document regions...".bright_blue().bold());
    println!("   Input:  {}", input.display());
    println!("   Output: {}", output.display());
    println!();

    let mut host = FileHost;
    let report = with_session(&mut host, &input, |session| {
        let report = apply_protection(session.document_mut(), &options)?;
        session.save_as(&output)?;
        Ok::<_, EditorError>(report)
    })
    .with_context(|| format!("Failed to protect {}", input.display()))?;

    print_report(&report);
    Ok(())
}

fn print_report(report: &ProtectionReport) {
    for name in &report.kept {
        println!("  {} {} stays locked", "🔒".yellow(), name);
    }
    for name in &report.released {
        println!("  {} {} editable", "✓".green(), name);
    }
    for name in &report.unlocked.unlocked {
        println!("  {} {} unlocked", "✓".green(), name);
    }
    for name in report.missing.iter().chain(&report.unlocked.missing) {
        println!("  {} {} not found", "⚠️".yellow(), name);
    }
    for name in &report.unlocked.skipped {
        println!("  {} {} skipped, stream unavailable", "⚠️".yellow(), name);
    }

    println!();
    println!(
        "   {} gap(s), {} tag span(s), {} new grant(s)",
        report.gap_grants, report.tag_grants, report.grants_added
    );
    let state = if report.protected {
        "protected".green()
    } else {
        "left unprotected".yellow()
    };
    println!("{} Document {}", "Done".green().bold(), state);
}
