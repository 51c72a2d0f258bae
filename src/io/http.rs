use std::fs;
use std::path::Path;

use reqwest::blocking::Client;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Source of archive bytes for the download stage
pub trait Fetcher {
    /// Write the body of `url` to `dest`
    fn fetch(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Plain HTTP GET, no retry
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("lidarkit/", env!("CARGO_PKG_VERSION")))
            .timeout(None)
            .build()?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        let dir = dest.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let mut response = self.client.get(url).send()?;
        if !response.status().is_success() {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        // Only a complete body is moved into place
        let mut partial = tempfile::Builder::new()
            .prefix(".download_")
            .suffix(".partial")
            .tempfile_in(dir)?;
        let bytes = response.copy_to(partial.as_file_mut())?;
        debug!("Received {} bytes from {}", bytes, url);
        partial.persist(dest).map_err(|e| Error::Io(e.error))?;
        info!("Downloaded: {} -> {:?}", url, dest);
        Ok(())
    }
}
