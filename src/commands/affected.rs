//! # Affected Command Implementation
//!
//! Lists the known hosts whose overlay includes at least one of the given
//! repository paths, one per line. Typically fed with the paths touched by a
//! commit to decide which hosts need a rebuild.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use hostconf::defaults::SETTINGS_FILE;
use hostconf::overlay::resolve_affected_hosts;

use super::load_settings;

/// List the hosts affected by changed repository paths
#[derive(Args, Debug)]
pub struct AffectedArgs {
    /// Changed repository paths, e.g. `loc/ber/etc/ntp.conf`.
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<String>,

    /// Path to the settings file.
    #[arg(short, long, value_name = "FILE", default_value = SETTINGS_FILE, env = "HOSTCONF_CONFIG")]
    pub config: PathBuf,
}

/// Execute the `affected` command.
pub fn execute(args: AffectedArgs) -> Result<()> {
    let settings = load_settings(&args.config)?;
    let affected = resolve_affected_hosts(
        &args.paths,
        &settings.hosts,
        &settings.segment_settings(),
    );

    for host in affected {
        println!("{}", host);
    }
    Ok(())
}
