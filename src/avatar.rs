// src/avatar.rs

use crate::error::{Error, Result};
use crate::graph::Node;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub trait ImageFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Downloads images over HTTP(S).
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let agent = ureq::AgentBuilder::new().timeout(Duration::from_secs(60)).build();
        Self { agent }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let download_error = |reason: String| Error::Download { url: url.to_string(), reason };
        let response = self.agent.get(url).call().map_err(|e| download_error(e.to_string()))?;
        let mut bytes = Vec::new();
        response.into_reader().read_to_end(&mut bytes).map_err(|e| download_error(e.to_string()))?;
        Ok(bytes)
    }
}

fn is_remote(uri: &str) -> bool {
    uri.starts_with("http://") || uri.starts_with("https://")
}

/// Replaces a remote `image` of `node` with a local copy stored at
/// `image_dir/<node id>`, downloading it only if that file is missing.
///
/// The node then refers to the copy relative to `base`.
pub fn localize(node: &mut Node, fetcher: &dyn ImageFetcher, base: &Path, image_dir: &Path) -> Result<()> {
    let Some(url) = node.image.as_deref().filter(|uri| is_remote(uri)) else {
        return Ok(());
    };
    let target = image_dir.join(&node.id);

    if target.exists() {
        debug!("Avatar for {} already cached", node.id);
    } else {
        let bytes = fetcher.fetch(url)?;
        let format = image::guess_format(&bytes).map_err(|e| Error::Download {
            url: url.to_string(),
            reason: format!("not an image: {}", e),
        })?;
        debug!("Downloaded {:?} avatar for {} ({} bytes)", format, node.id, bytes.len());
        fs::create_dir_all(image_dir).map_err(|e| Error::io(image_dir, e))?;
        fs::write(&target, &bytes).map_err(|e| Error::io(&target, e))?;
    }

    let local = target.strip_prefix(base).unwrap_or(&target);
    node.image = Some(local.to_string_lossy().into_owned());
    Ok(())
}
