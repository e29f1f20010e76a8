//! Phase 2: Variables
//!
//! Writes the derived variables of a host into its `VARIABLES/` directory,
//! one file per variable. Derived variables overwrite files of the same name
//! that came from the source tree; every other source variable is kept.

use std::fs;
use std::path::Path;

use log::debug;

use super::overlay::MergedTree;
use super::BuildContext;
use crate::error::{Error, Result};
use crate::segment::Segment;

/// Variable name to content, in the order they are written.
pub type Variables = Vec<(String, String)>;

/// Compute the derived variables of `hostname`.
pub fn derive(
    hostname: &str,
    revision: &str,
    ctx: &BuildContext,
    merged: &MergedTree,
) -> Result<Variables> {
    let mut variables: Variables = merged
        .dependencies
        .render(ctx.settings.repo_packages.as_deref())?
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();

    let segment_settings = ctx.settings.segment_settings();
    for segment in Segment::ALL_KINDS {
        variables.push((
            segment.variable_name(),
            segment.values(hostname, &segment_settings).join(" "),
        ));
    }

    let info = ctx.lookup.lookup(hostname)?;
    variables.push(("REVISION".to_string(), revision.to_string()));
    variables.push((
        "IP".to_string(),
        info.ip.map(|ip| ip.to_string()).unwrap_or_default(),
    ));
    variables.push(("FQDN".to_string(), info.fqdn));
    variables.push(("ALIASES".to_string(), info.aliases.join(" ")));
    variables.push(("OVERLAYING".to_string(), merged.overlaying.join("\n")));
    variables.push(("SVNLOG".to_string(), ctx.exporter.log(revision)?));

    Ok(variables)
}

/// Execute Phase 2: write the derived variables into `variables_dir`.
pub fn execute(
    hostname: &str,
    revision: &str,
    ctx: &BuildContext,
    merged: &MergedTree,
    variables_dir: &Path,
) -> Result<()> {
    fs::create_dir_all(variables_dir).map_err(|e| Error::Filesystem {
        message: format!(
            "Failed to create directory '{}': {}",
            variables_dir.display(),
            e
        ),
    })?;

    for (name, value) in derive(hostname, revision, ctx, merged)? {
        let path = variables_dir.join(&name);
        if path.exists() {
            debug!("{}: derived variable {} replaces source file", hostname, name);
        }
        fs::write(&path, format!("{}\n", value)).map_err(|e| Error::Filesystem {
            message: format!("Failed to write file '{}': {}", path.display(), e),
        })?;
    }

    Ok(())
}
