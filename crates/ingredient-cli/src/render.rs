use anyhow::{Context, Result};
use ingredient_core::{default_install_dir, Flavor, Platform, ResolvedArtifact};
use ingredient_installer::ActionOutcome;
use serde::Serialize;

pub(crate) fn format_outcome_line(outcome: &ActionOutcome) -> String {
    let mut line = format!(
        "{:<13} {} ({})",
        outcome.status.as_str(),
        outcome.resource,
        outcome.path.display()
    );
    if let Some(version) = &outcome.version {
        line.push_str(&format!(" version={version}"));
    }
    if let Some(backup) = &outcome.backup {
        line.push_str(&format!(" backup={}", backup.display()));
    }
    line
}

pub(crate) fn print_outcome(outcome: &ActionOutcome, json: bool) -> Result<()> {
    if json {
        let line = serde_json::to_string(outcome).context("failed to encode outcome")?;
        println!("{line}");
    } else {
        println!("{}", format_outcome_line(outcome));
    }
    Ok(())
}

pub(crate) fn format_summary_line(outcomes: &[ActionOutcome]) -> String {
    let changed = outcomes
        .iter()
        .filter(|outcome| outcome.status.changed())
        .count();
    format!(
        "converged {} resource(s), {changed} changed",
        outcomes.len()
    )
}

#[derive(Debug, Serialize)]
pub(crate) struct ResolveReport {
    pub platform: String,
    pub flavor: Flavor,
    pub url: String,
    pub filename: String,
    pub format: &'static str,
    pub default_install_dir: String,
}

impl ResolveReport {
    pub(crate) fn new(platform: Platform, flavor: Flavor, artifact: ResolvedArtifact) -> Self {
        Self {
            platform: platform.to_string(),
            flavor,
            url: artifact.url,
            filename: artifact.filename,
            format: artifact.format.as_str(),
            default_install_dir: default_install_dir(platform, flavor).display().to_string(),
        }
    }

    pub(crate) fn lines(&self) -> Vec<String> {
        vec![
            format!("platform: {}", self.platform),
            format!("flavor: {}", self.flavor),
            format!("url: {}", self.url),
            format!("filename: {}", self.filename),
            format!("format: {}", self.format),
            format!("install_dir: {}", self.default_install_dir),
        ]
    }
}
