//! # Overlay Command Implementation
//!
//! Displays the overlay of a host as a tree: the segments in merge order and,
//! below each, the source paths exported for it. Paths are listed whether or
//! not they exist in the source tree.
//!
//! This command is a safe, read-only operation that does not touch the source.

use anyhow::Result;
use clap::Args;
use ptree::{print_tree, TreeItem};
use std::path::PathBuf;

use hostconf::defaults::SETTINGS_FILE;
use hostconf::overlay::OVERLAY_ORDER;
use hostconf::segment::{validate_hostname, Segment, SegmentSettings};

use super::load_settings;

/// Show the segment paths overlaid for a host
#[derive(Args, Debug)]
pub struct OverlayArgs {
    /// Host name, e.g. `berweb01`.
    #[arg(value_name = "HOST")]
    pub host: String,

    /// Path to the settings file.
    #[arg(short, long, value_name = "FILE", default_value = SETTINGS_FILE, env = "HOSTCONF_CONFIG")]
    pub config: PathBuf,

    /// Also list the segment variables of the host.
    #[arg(long)]
    pub variables: bool,
}

/// Execute the `overlay` command.
pub fn execute(args: OverlayArgs) -> Result<()> {
    validate_hostname(&args.host)?;
    let settings = load_settings(&args.config)?;

    let tree = build_tree(&args.host, &settings.segment_settings(), args.variables);
    print_tree(&tree).map_err(|e| anyhow::anyhow!("Failed to display tree: {}", e))?;
    Ok(())
}

/// Build the display tree of a host's overlay.
fn build_tree(host: &str, settings: &SegmentSettings, with_variables: bool) -> TreeNode {
    let mut children: Vec<TreeNode> = OVERLAY_ORDER
        .iter()
        .map(|segment| TreeNode {
            label: segment.name().to_string(),
            children: segment
                .svn_paths(host, settings)
                .into_iter()
                .map(TreeNode::leaf)
                .collect(),
        })
        .collect();

    if with_variables {
        children.push(TreeNode {
            label: "variables".to_string(),
            children: Segment::ALL_KINDS
                .iter()
                .map(|segment| {
                    TreeNode::leaf(format!(
                        "{}={}",
                        segment.variable_name(),
                        segment.values(host, settings).join(" ")
                    ))
                })
                .collect(),
        });
    }

    TreeNode {
        label: host.to_string(),
        children,
    }
}

/// Tree node structure for ptree visualization
#[derive(Clone, Debug)]
struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
}

impl TreeNode {
    fn leaf(label: String) -> Self {
        Self {
            label,
            children: Vec::new(),
        }
    }
}

impl TreeItem for TreeNode {
    type Child = TreeNode;

    fn write_self<W: std::io::Write>(
        &self,
        f: &mut W,
        _style: &ptree::Style,
    ) -> std::io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> std::borrow::Cow<'_, [Self::Child]> {
        std::borrow::Cow::Borrowed(&self.children)
    }
}
