//! Release feed model and download asset selection.

use super::comparison::{ReleaseVersion, extract_version};
use crate::config::ArtifactConfig;
use crate::utils::archive::is_archive_name;
use serde::Deserialize;

/// One entry of an upstream releases feed.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}

/// The downloadable release chosen from a feed. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseCandidate {
    pub tag: String,
    pub version: ReleaseVersion,
    pub asset_name: String,
    pub asset_url: String,
    pub body: Option<String>,
}

pub fn parse_feed(content: &str) -> serde_json::Result<Vec<Release>> {
    serde_json::from_str(content)
}

/// The most recent published release. Feeds list newest first.
#[must_use]
pub fn latest_release(releases: &[Release]) -> Option<&Release> {
    releases.iter().find(|r| !r.draft && !r.prerelease)
}

/// Pick the download asset for `release`.
///
/// Precedence: exact match of the filename template, then an archive whose
/// name contains the product name, then the first archive of any name.
#[must_use]
pub fn select_asset<'a>(
    release: &'a Release,
    template: &str,
    product_name: &str,
) -> Option<&'a ReleaseAsset> {
    let tag_version = extract_version(&release.tag_name).unwrap_or_else(|| "*".to_string());
    let expected = template.replace("{version}", &tag_version);

    if let Ok(pattern) = glob::Pattern::new(&expected)
        && let Some(asset) = release.assets.iter().find(|a| pattern.matches(&a.name))
    {
        return Some(asset);
    }

    let product = product_name.to_lowercase();
    let archives = move || release.assets.iter().filter(|a| is_archive_name(&a.name));

    if !product.is_empty()
        && let Some(asset) = archives().find(|a| a.name.to_lowercase().contains(&product))
    {
        return Some(asset);
    }

    archives().next()
}

/// Reduce a feed to the candidate a version check compares against.
///
/// Returns `None` when the feed has no published release or the release has
/// no archive asset. The version comes from the tag, else from the asset
/// filename, else the literal tag text.
#[must_use]
pub fn select_candidate(releases: &[Release], artifact: &ArtifactConfig) -> Option<ReleaseCandidate> {
    let release = latest_release(releases)?;
    let asset = select_asset(release, &artifact.asset_template, &artifact.product_name)?;

    let version = extract_version(&release.tag_name)
        .or_else(|| extract_version(&asset.name))
        .map_or_else(|| ReleaseVersion::parse(&release.tag_name), |v| ReleaseVersion::parse(&v));

    Some(ReleaseCandidate {
        tag: release.tag_name.clone(),
        version,
        asset_name: asset.name.clone(),
        asset_url: asset.browser_download_url.clone(),
        body: release.body.clone().filter(|b| !b.trim().is_empty()),
    })
}
