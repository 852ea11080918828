//! HTTP transport: one blocking GET per source, whole body in memory.

use std::time::Duration;

use crate::error::{GrabError, Result};

/// Fetches the full body of a URL. Anything but HTTP 200 is an error.
pub trait Fetcher {
    fn fetch(&mut self, url: &str) -> Result<Vec<u8>>;
}

/// libcurl-backed fetcher; the handle is reused across requests so
/// connections to the same host are kept alive.
pub struct CurlFetcher {
    easy: curl::easy::Easy,
    connect_timeout: Duration,
}

impl CurlFetcher {
    pub fn new() -> Self {
        Self {
            easy: curl::easy::Easy::new(),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for CurlFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher for CurlFetcher {
    fn fetch(&mut self, url: &str) -> Result<Vec<u8>> {
        let curl_err = |e: curl::Error| GrabError::Transport {
            url: url.to_string(),
            status: None,
            message: e.to_string(),
        };

        let easy = &mut self.easy;
        easy.url(url).map_err(curl_err)?;
        easy.get(true).map_err(curl_err)?;
        easy.follow_location(true).map_err(curl_err)?;
        easy.max_redirections(10).map_err(curl_err)?;
        easy.connect_timeout(self.connect_timeout).map_err(curl_err)?;
        easy.useragent(concat!("grablib/", env!("CARGO_PKG_VERSION")))
            .map_err(curl_err)?;

        let mut body = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer
                .write_function(|data| {
                    body.extend_from_slice(data);
                    Ok(data.len())
                })
                .map_err(curl_err)?;
            transfer.perform().map_err(|e| {
                tracing::error!("problem occurred during download: {}", e);
                curl_err(e)
            })?;
        }

        let code = easy.response_code().map_err(curl_err)?;
        if code != 200 {
            tracing::error!("wrong status code: {}", code);
            return Err(GrabError::Transport {
                url: url.to_string(),
                status: Some(code),
                message: format!("wrong status code {}", code),
            });
        }
        tracing::debug!(bytes = body.len(), "fetched {}", url);
        Ok(body)
    }
}
