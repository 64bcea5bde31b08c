//! Normalizing a mod archive's folder layout onto the runtime conventions.
//!
//! Mod archives disagree on structure. Some ship `user/mods/<Name>/...`, some
//! ship loose DLLs under `BepInEx/plugins/`, some wrap everything in one extra
//! top-level folder. The plan built here maps every file of an extracted
//! archive to exactly one destination:
//!
//! - files below a recognized root land in `<root>/<slug>/...`, with the
//!   first directory level below the root dropped so all of a package's
//!   folders merge into one slug directory
//! - every other file keeps its relative path
//!
//! Two package files that would land on the same path inside a slug
//! directory make the plan fail instead of overwriting each other.

use crate::core::HostError;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Files destined for one recognized root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootContent {
    /// Root relative to the runtime directory, e.g. `BepInEx/plugins`.
    pub root: PathBuf,
    /// `(absolute source, path inside the slug directory)`.
    pub files: Vec<(PathBuf, PathBuf)>,
    /// Whether anything at all sat under this root, even empty folders.
    pub present: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutPlan {
    /// Directory the plan was computed from, after unwrapping.
    pub content_root: PathBuf,
    pub roots: Vec<RootContent>,
    /// Files outside every recognized root, relative to `content_root`.
    pub verbatim: Vec<PathBuf>,
}

impl LayoutPlan {
    /// Recognized roots that receive a slug directory.
    pub fn populated_roots(&self) -> impl Iterator<Item = &RootContent> {
        self.roots.iter().filter(|r| r.present)
    }
}

fn has_recognized_root(dir: &Path, roots: &[PathBuf]) -> bool {
    roots.iter().any(|root| dir.join(root).is_dir())
}

/// Descend through a single wrapper directory when the top level holds no
/// recognized root but that wrapper does.
pub fn find_content_root(staging: &Path, roots: &[PathBuf]) -> Result<PathBuf> {
    if has_recognized_root(staging, roots) {
        return Ok(staging.to_path_buf());
    }

    let entries: Vec<PathBuf> = std::fs::read_dir(staging)
        .with_context(|| format!("Failed to read staging directory: {}", staging.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();

    if let [only] = entries.as_slice()
        && only.is_dir()
        && has_recognized_root(only, roots)
    {
        return Ok(only.clone());
    }
    Ok(staging.to_path_buf())
}

/// Build the destination plan for an extracted archive.
pub fn plan(staging: &Path, roots: &[PathBuf]) -> Result<LayoutPlan> {
    let content_root = find_content_root(staging, roots)?;
    let mut plan = LayoutPlan {
        content_root: content_root.clone(),
        roots: roots
            .iter()
            .map(|root| RootContent {
                root: root.clone(),
                ..RootContent::default()
            })
            .collect(),
        verbatim: Vec::new(),
    };

    for entry in WalkDir::new(&content_root).min_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", content_root.display()))?;
        let relative = entry
            .path()
            .strip_prefix(&content_root)
            .with_context(|| format!("Entry escaped its root: {}", entry.path().display()))?
            .to_path_buf();

        let owner = plan.roots.iter_mut().find(|r| relative.starts_with(&r.root));
        match owner {
            Some(root) => {
                let inside = relative.strip_prefix(&root.root).unwrap_or(&relative).to_path_buf();
                if inside.as_os_str().is_empty() {
                    continue;
                }
                root.present = true;
                if !entry.file_type().is_file() {
                    continue;
                }
                let mut parts = inside.components();
                parts.next();
                let rest = parts.as_path();
                // Loose files directly under the root keep their name
                let target =
                    if rest.as_os_str().is_empty() { inside.clone() } else { rest.to_path_buf() };
                root.files.push((entry.path().to_path_buf(), target));
            }
            None if entry.file_type().is_file() => plan.verbatim.push(relative),
            None => {}
        }
    }

    for root in &plan.roots {
        reject_collisions(&content_root, root)?;
    }
    Ok(plan)
}

fn reject_collisions(content_root: &Path, root: &RootContent) -> Result<()> {
    let mut seen: HashMap<&Path, &Path> = HashMap::new();
    for (source, target) in &root.files {
        if let Some(first) = seen.insert(target.as_path(), source.as_path()) {
            let relative = |p: &Path| p.strip_prefix(content_root).unwrap_or(p).display().to_string();
            return Err(HostError::archive(
                content_root.display(),
                format!(
                    "{} and {} would both install to {}",
                    relative(first),
                    relative(source),
                    root.root.join(target).display()
                ),
            )
            .into());
        }
    }
    Ok(())
}
