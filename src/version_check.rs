//! Version check against GitHub releases.

use anyhow::{Context, Result};
use serde::Deserialize;

/// GitHub API endpoint for the latest release
const GITHUB_RELEASES_URL: &str =
    "https://api.github.com/repos/satchel-chat/satchel/releases/latest";

/// Current application version (from Cargo.toml)
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Information about a GitHub release
#[derive(Debug, Clone)]
pub struct LatestRelease {
    /// Version string without 'v' prefix (e.g., "0.6.0")
    pub version: String,
    /// Original tag name (e.g., "v0.6.0")
    pub tag_name: String,
    /// URL to the release page
    pub html_url: String,
}

/// GitHub API response structure
#[derive(Debug, Deserialize)]
struct GitHubRelease {
    tag_name: String,
    html_url: String,
}

/// Fetches the latest release information from GitHub.
///
/// This is designed to fail silently - version checks should not
/// disrupt the user experience.
pub async fn fetch_latest_release() -> Result<LatestRelease> {
    let client = reqwest::Client::new();
    let response = client
        .get(GITHUB_RELEASES_URL)
        .header("User-Agent", "satchel-cli")
        .header("Accept", "application/vnd.github+json")
        .timeout(std::time::Duration::from_secs(5))
        .send()
        .await
        .context("Failed to fetch releases from GitHub")?;

    if !response.status().is_success() {
        anyhow::bail!("GitHub API returned status {}", response.status());
    }

    let release: GitHubRelease = response
        .json()
        .await
        .context("Failed to parse GitHub release response")?;

    let version = release
        .tag_name
        .strip_prefix('v')
        .unwrap_or(&release.tag_name)
        .to_string();

    Ok(LatestRelease {
        version,
        tag_name: release.tag_name,
        html_url: release.html_url,
    })
}

/// Compares two version strings and returns true if `latest` is newer than
/// `current`. Returns `false` if either version string is invalid.
pub fn is_newer_version(current: &str, latest: &str) -> bool {
    match (
        semver::Version::parse(current),
        semver::Version::parse(latest),
    ) {
        (Ok(curr), Ok(lat)) => lat > curr,
        _ => {
            tracing::warn!(
                "Failed to parse versions for comparison: current={}, latest={}",
                current,
                latest
            );
            false
        }
    }
}

/// Checks if an update is available and returns the release info if so.
///
/// Returns `None` if the fetch fails or the current version is up to date.
pub async fn check_for_update() -> Option<LatestRelease> {
    match fetch_latest_release().await {
        Ok(release) => {
            if is_newer_version(CURRENT_VERSION, &release.version) {
                tracing::debug!(
                    "Update available: {} -> {}",
                    CURRENT_VERSION,
                    release.version
                );
                Some(release)
            } else {
                tracing::debug!(
                    "No update available: current={}, latest={}",
                    CURRENT_VERSION,
                    release.version
                );
                None
            }
        }
        Err(e) => {
            tracing::debug!("Failed to check for updates: {}", e);
            None
        }
    }
}

/// Print the update message to stderr
pub fn print_update_message(release: &LatestRelease) {
    use nu_ansi_term::{Color, Style};

    let yellow = Style::new().fg(Color::Yellow).bold();
    let cyan = Style::new().fg(Color::Cyan);
    let dim = Style::new().dimmed();

    eprintln!();
    eprintln!(
        "{} A new version of satchel is available: {} → {}",
        yellow.paint("⬆"),
        dim.paint(CURRENT_VERSION),
        cyan.paint(&release.version)
    );
    eprintln!("  {}", dim.paint(&release.html_url));
    eprintln!();
}
