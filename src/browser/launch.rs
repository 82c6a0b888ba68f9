//! Resolving and launching the Chrome binary shared by a run

use anyhow::{Context, Result, anyhow};
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::detection::{DetectionOptions, default_executable};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::utils::CHROME_USER_AGENT;

/// Environment variable naming an explicit Chrome/Chromium binary
pub const CHROMIUM_PATH_ENV: &str = "CHROMIUM_PATH";

const CDP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the binary used for a run came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutableSource {
    /// `CHROMIUM_PATH`
    Environment(PathBuf),
    /// An installed browser found by chromiumoxide's detection
    Installed(PathBuf),
    /// Downloaded into the harvest cache
    Downloaded(PathBuf),
}

impl ExecutableSource {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Environment(path) | Self::Installed(path) | Self::Downloaded(path) => path,
        }
    }
}

/// `CHROMIUM_PATH` when it points at a file, else an installed browser, else a download
pub async fn resolve_executable() -> Result<ExecutableSource> {
    if let Some(path) = std::env::var_os(CHROMIUM_PATH_ENV).map(PathBuf::from) {
        if path.is_file() {
            return Ok(ExecutableSource::Environment(path));
        }
        warn!("Ignoring {CHROMIUM_PATH_ENV}={}: not a file", path.display());
    }

    match default_executable(DetectionOptions::default()) {
        Ok(path) => Ok(ExecutableSource::Installed(path)),
        Err(reason) => {
            info!("No installed Chrome ({reason}), downloading one");
            fetch_chromium(&chromium_cache_dir())
                .await
                .map(ExecutableSource::Downloaded)
        }
    }
}

fn chromium_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("answer-harvest")
        .join("chromium")
}

/// Download (or reuse) the fetcher's pinned Chromium revision under `cache_dir`
pub async fn fetch_chromium(cache_dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(cache_dir)
        .await
        .with_context(|| format!("creating {}", cache_dir.display()))?;

    let options = BrowserFetcherOptions::builder()
        .with_path(cache_dir)
        .build()
        .context("invalid fetcher options")?;
    let revision = BrowserFetcher::new(options)
        .fetch()
        .await
        .context("Chromium download failed")?;

    info!("Chromium ready in {}", revision.folder_path.display());
    Ok(revision.executable_path)
}

/// A launched browser and the task pumping its CDP connection
///
/// Dropping it stops the pump and deletes a profile directory it created;
/// only [`BrowserWrapper::shutdown`] waits for the process to exit.
pub struct BrowserWrapper {
    browser: Browser,
    handler: JoinHandle<()>,
    owned_profile: Option<PathBuf>,
}

impl BrowserWrapper {
    pub(crate) fn browser(&self) -> &Browser {
        &self.browser
    }

    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Browser close failed: {e}");
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Browser exit wait failed: {e}");
        }
        self.remove_owned_profile();
        info!("Browser stopped");
    }

    fn remove_owned_profile(&mut self) {
        let Some(dir) = self.owned_profile.take() else {
            return;
        };
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => debug!("Removed profile {}", dir.display()),
            Err(e) => warn!("Could not remove profile {}: {e}", dir.display()),
        }
    }
}

impl Drop for BrowserWrapper {
    fn drop(&mut self) {
        self.handler.abort();
        self.remove_owned_profile();
    }
}

/// Launch the resolved browser with a fixed desktop user agent
///
/// `profile_dir` of `None` means a throwaway profile owned by the wrapper.
pub async fn launch_browser(headless: bool, profile_dir: Option<PathBuf>) -> Result<BrowserWrapper> {
    let executable = resolve_executable().await?;
    debug!("Chrome executable: {executable:?}");

    let (profile, owned_profile) = match profile_dir {
        Some(dir) => (dir, None),
        None => {
            let dir = std::env::temp_dir().join(format!("answer-harvest-profile-{}", std::process::id()));
            (dir.clone(), Some(dir))
        }
    };
    tokio::fs::create_dir_all(&profile)
        .await
        .with_context(|| format!("creating profile {}", profile.display()))?;

    let builder = BrowserConfigBuilder::default()
        .chrome_executable(executable.path())
        .user_data_dir(&profile)
        .request_timeout(CDP_REQUEST_TIMEOUT)
        .window_size(1366, 900);
    let builder = if headless {
        builder.headless_mode(HeadlessMode::default())
    } else {
        builder.with_head()
    };
    let config = builder
        .arg(format!("--user-agent={CHROME_USER_AGENT}"))
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--disable-notifications")
        .arg("--mute-audio")
        .build()
        .map_err(|e| anyhow!("browser config: {e}"))?;

    let (browser, mut events) = Browser::launch(config)
        .await
        .context("Chrome failed to start")?;
    info!("Chrome started (headless: {headless}, profile: {})", profile.display());

    let handler = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            // Undecodable events from newer Chrome builds do not end the connection
            if let Err(e) = event {
                debug!("CDP event error: {e}");
            }
        }
        debug!("CDP connection closed");
    });

    Ok(BrowserWrapper {
        browser,
        handler,
        owned_profile,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_source_exposes_its_path() {
        let path = PathBuf::from("/opt/chrome/chrome");
        for source in [
            ExecutableSource::Environment(path.clone()),
            ExecutableSource::Installed(path.clone()),
            ExecutableSource::Downloaded(path.clone()),
        ] {
            assert_eq!(source.path(), path.as_path());
        }
    }

    #[test]
    fn cache_dir_is_namespaced() {
        let dir = chromium_cache_dir();
        assert!(dir.ends_with("answer-harvest/chromium"));
    }
}
