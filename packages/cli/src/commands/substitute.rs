use super::{default_output, resolve_path};
use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use regionlock_editor::{with_session, EditorError, FileHost, Pipeline, SubstitutionRequest};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Args)]
pub struct SubstituteArgs {
    /// Document to update
    pub input: PathBuf,

    /// Property list: JSON array of { "Property", "Text-Name" } objects
    #[arg(short, long)]
    pub properties: PathBuf,

    /// Output path (defaults to <stem>.updated.<ext>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// One entry of a property list file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectProperty {
    #[serde(rename = "Property")]
    pub property: String,

    /// Literal text replaced by the property field
    #[serde(rename = "Text-Name")]
    pub text_name: String,
}

impl From<ProjectProperty> for SubstitutionRequest {
    fn from(p: ProjectProperty) -> Self {
        SubstitutionRequest::new(p.text_name, p.property)
    }
}

pub fn load_properties(path: &Path) -> Result<Vec<SubstitutionRequest>> {
    if !path.exists() {
        return Err(anyhow!("Property list not found: {}", path.display()));
    }
    let content = std::fs::read_to_string(path)?;
    let properties: Vec<ProjectProperty> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid property list {}", path.display()))?;
    info!("Loaded {} substitution request(s) from {}", properties.len(), path.display());
    Ok(properties.into_iter().map(SubstitutionRequest::from).collect())
}

pub fn substitute(args: SubstituteArgs, cwd: &Path) -> Result<()> {
    let input = resolve_path(cwd, &args.input);
    let output = match &args.output {
        Some(path) => resolve_path(cwd, path),
        None => default_output(&input, "updated"),
    };
    let requests = load_properties(&resolve_path(cwd, &args.properties))?;

    println!("{}", "Substituting document properties...".bright_blue().bold());
    println!("   Input:  {}", input.display());
    println!("   Output: {}", output.display());
    println!();

    let mut host = FileHost;
    let result = with_session(&mut host, &input, |session| {
        let result = Pipeline::new()
            .with_substitutions(requests)
            .run(session.document_mut())?;
        session.save_as(&output)?;
        Ok::<_, EditorError>(result)
    })
    .with_context(|| format!("Failed to update {}", input.display()))?;

    if let Some(report) = &result.substitution {
        for outcome in &report.outcomes {
            let status = if outcome.created { "created" } else { "reused" };
            println!(
                "  {} {} → {} ({}, {} replacement(s))",
                "✓".green(),
                outcome.request.search_text,
                outcome.property.name,
                status.dimmed(),
                outcome.total()
            );
            for count in outcome.streams.iter().filter(|c| c.replacements > 0) {
                println!("      {}: {}", count.stream, count.replacements);
            }
        }
        println!();
        println!(
            "{} Replaced {} instance(s), refreshed {} field(s)",
            "Done".green().bold(),
            report.total(),
            result.fields_updated
        );
    }

    Ok(())
}
