use crate::types::{AcError, AcResult};
use std::fmt::Debug;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const OCEANDATA_SEARCH_URL: &str = "http://oceandata.sci.gsfc.nasa.gov/search/file_search.cgi";
pub const OCEANDATA_GETFILE_URL: &str = "http://oceandata.sci.gsfc.nasa.gov/cgi/getfile/";

/// Strategy that places a missing ancillary file into a local directory
pub trait AncillaryFetcher: Send + Sync + Debug {
    /// Fetch the first available of `file_names` (all sharing `prefix`)
    /// into `target_dir` and return its path. `target_dir` is created only
    /// once a file is written.
    fn fetch(&self, prefix: &str, file_names: &[String], target_dir: &Path) -> AcResult<PathBuf>;
}

/// Retry and timeout settings shared by the HTTP fetchers
#[derive(Debug, Clone)]
pub struct DownloadSettings {
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub user_agent: String,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
            user_agent: format!("acnet/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl DownloadSettings {
    fn client(&self) -> AcResult<reqwest::blocking::Client> {
        reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.clone())
            .build()
            .map_err(|e| AcError::Download(format!("Failed to create HTTP client: {}", e)))
    }
}

/// OBPG ocean colour archive: file search followed by direct download
#[derive(Debug, Clone)]
pub struct OceanDataFetcher {
    pub search_url: String,
    pub getfile_url: String,
    pub settings: DownloadSettings,
}

impl Default for OceanDataFetcher {
    fn default() -> Self {
        Self {
            search_url: OCEANDATA_SEARCH_URL.to_string(),
            getfile_url: OCEANDATA_GETFILE_URL.to_string(),
            settings: DownloadSettings::default(),
        }
    }
}

impl OceanDataFetcher {
    /// Names of archive files starting with `prefix`
    pub fn search(&self, client: &reqwest::blocking::Client, prefix: &str) -> AcResult<Vec<String>> {
        let pattern = format!("{}*", prefix);
        let params = [
            ("std_only", "1"),
            ("sensor", "all"),
            ("search", pattern.as_str()),
            ("results_as_file", "1"),
            ("dtype", "anc"),
            ("addurl", "1"),
        ];
        log::debug!("Searching {} for {}", self.search_url, pattern);

        let response = client
            .post(&self.search_url)
            .form(&params)
            .send()
            .map_err(|e| AcError::Download(format!("File search request failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(AcError::Download(format!("File search failed: {}", response.status())));
        }
        let body = response
            .text()
            .map_err(|e| AcError::Download(format!("Failed to read search response: {}", e)))?;
        Ok(parse_search_response(&body))
    }
}

impl AncillaryFetcher for OceanDataFetcher {
    fn fetch(&self, prefix: &str, file_names: &[String], target_dir: &Path) -> AcResult<PathBuf> {
        let client = self.settings.client()?;
        let available = self.search(&client, prefix)?;
        log::debug!("Archive lists {} files for {}", available.len(), prefix);

        let name = file_names
            .iter()
            .find(|name| available.iter().any(|a| a == *name))
            .ok_or_else(|| AcError::AuxDataUnavailable(format!("no archive file matches {}", prefix)))?;

        let url = format!("{}{}", self.getfile_url, name);
        download_with_retries(&client, &self.settings, &url, &target_dir.join(name))
    }
}

/// Plain HTTP mirrors serving files as `<base_url>/<name>`
#[derive(Debug, Clone)]
pub struct MirrorFetcher {
    pub base_urls: Vec<String>,
    pub settings: DownloadSettings,
}

impl MirrorFetcher {
    pub fn new(base_urls: Vec<String>) -> Self {
        Self {
            base_urls,
            settings: DownloadSettings::default(),
        }
    }
}

impl AncillaryFetcher for MirrorFetcher {
    fn fetch(&self, prefix: &str, file_names: &[String], target_dir: &Path) -> AcResult<PathBuf> {
        let client = self.settings.client()?;
        for base_url in &self.base_urls {
            for name in file_names {
                let url = format!("{}/{}", base_url.trim_end_matches('/'), name);
                match download_with_retries(&client, &self.settings, &url, &target_dir.join(name)) {
                    Ok(path) => return Ok(path),
                    Err(e) => log::debug!("Mirror miss {}: {}", url, e),
                }
            }
        }
        Err(AcError::AuxDataUnavailable(format!(
            "no mirror provides a file for {}",
            prefix
        )))
    }
}

/// Ordered chain of strategies; the first success wins
#[derive(Debug, Default)]
pub struct FallbackFetcher {
    strategies: Vec<Box<dyn AncillaryFetcher>>,
}

impl FallbackFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, strategy: impl AncillaryFetcher + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl AncillaryFetcher for FallbackFetcher {
    fn fetch(&self, prefix: &str, file_names: &[String], target_dir: &Path) -> AcResult<PathBuf> {
        let mut last_error = None;
        for strategy in &self.strategies {
            match strategy.fetch(prefix, file_names, target_dir) {
                Ok(path) => return Ok(path),
                Err(e) => {
                    log::warn!("Ancillary fetch for {} failed: {}", prefix, e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error
            .unwrap_or_else(|| AcError::AuxDataUnavailable(format!("no fetch strategy configured for {}", prefix))))
    }
}

/// Candidate file names from a search response, one URL per line
pub fn parse_search_response(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| line.starts_with("http"))
        .filter_map(|line| line.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn download_with_retries(
    client: &reqwest::blocking::Client,
    settings: &DownloadSettings,
    url: &str,
    target: &Path,
) -> AcResult<PathBuf> {
    let mut last_error = None;
    for attempt in 1..=settings.max_retries.max(1) {
        log::debug!("Download attempt {} of {}: {}", attempt, settings.max_retries, url);
        match try_download_once(client, url) {
            Ok(content) => {
                write_payload(&content, target)?;
                log::info!("Downloaded ancillary file: {}", target.display());
                return Ok(target.to_path_buf());
            }
            Err(e) => {
                last_error = Some(e);
                if attempt < settings.max_retries {
                    log::warn!("Download attempt {} failed, retrying...", attempt);
                    std::thread::sleep(settings.retry_delay);
                }
            }
        }
    }
    Err(last_error.unwrap_or_else(|| AcError::Download(format!("Download failed after all retries: {}", url))))
}

fn try_download_once(client: &reqwest::blocking::Client, url: &str) -> AcResult<Vec<u8>> {
    let response = client
        .get(url)
        .send()
        .map_err(|e| AcError::Download(format!("HTTP request failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(AcError::Download(format!(
            "HTTP {} {}: {}",
            response.status().as_u16(),
            response.status().canonical_reason().unwrap_or(""),
            url
        )));
    }

    let content = response
        .bytes()
        .map_err(|e| AcError::Download(format!("Failed to read response body: {}", e)))?;
    if content.is_empty() {
        return Err(AcError::Download(format!("Empty response from {}", url)));
    }
    log::debug!("Downloaded {} bytes", content.len());
    Ok(content.to_vec())
}

/// Write a downloaded payload as `tmp_<name>` and rename it into place,
/// inflating gzip content on the way
pub fn write_payload(content: &[u8], target: &Path) -> AcResult<()> {
    let name = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AcError::InvalidFormat(format!("invalid target path {}", target.display())))?;
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let data = if is_gzip_content(content) {
        log::debug!("Decompressing gzip payload for {}", name);
        let mut decoder = flate2::read::GzDecoder::new(content);
        let mut inflated = Vec::new();
        decoder
            .read_to_end(&mut inflated)
            .map_err(|e| AcError::Download(format!("Failed to decompress gzip data: {}", e)))?;
        inflated
    } else {
        content.to_vec()
    };

    let tmp = dir.join(format!("tmp_{}", name));
    std::fs::write(&tmp, &data)?;
    if let Err(e) = std::fs::rename(&tmp, target) {
        let _ = std::fs::remove_file(&tmp);
        return Err(AcError::Io(e));
    }
    Ok(())
}

fn is_gzip_content(content: &[u8]) -> bool {
    content.len() >= 2 && content[0] == 0x1F && content[1] == 0x8B
}
