// The HTTP seam of the pipeline.
//
// The oracle and the fetcher only need three things from the network: where
// a URL finally lands, the text behind a URL, and a streamed download. Keeping
// them behind a trait lets the tests drive both components without sockets.

use colored::Colorize;
use std::io::{Read, Write};
use std::time::Duration;

use crate::log_debug;
use crate::schemas::errors::ModuleError;

/// Some download hosts refuse clients they do not recognise.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

pub trait HttpClient: Sync {
    /// HEADs `url`, following redirects, and returns the final URL.
    /// A server that rejects HEAD (405) leaves the URL as it is.
    fn resolve(&self, url: &str) -> Result<String, ModuleError>;

    /// GETs `url` and returns the body as text.
    fn fetch_text(&self, url: &str) -> Result<String, ModuleError>;

    /// GETs `url` and streams the body into `sink`, reporting `(received, total)`
    /// after every chunk. Returns the number of bytes written.
    fn download(
        &self,
        url: &str,
        sink: &mut dyn Write,
        on_chunk: &mut dyn FnMut(u64, Option<u64>),
    ) -> Result<u64, ModuleError>;
}

/// Blocking client backed by a shared `ureq::Agent`.
pub struct UreqClient {
    agent: ureq::Agent,
}

impl UreqClient {
    pub fn new() -> Self {
        let agent = ureq::AgentBuilder::new()
            .user_agent(USER_AGENT)
            .redirects(10)
            .timeout_connect(Duration::from_secs(30))
            .timeout_read(Duration::from_secs(120))
            .build();
        UreqClient { agent }
    }
}

impl Default for UreqClient {
    fn default() -> Self {
        UreqClient::new()
    }
}

fn network_error(url: &str, e: ureq::Error) -> ModuleError {
    let message = match e {
        ureq::Error::Status(code, response) => format!("HTTP {} {}", code, response.status_text()),
        ureq::Error::Transport(transport) => transport.to_string(),
    };
    ModuleError::Network {
        url: url.to_string(),
        message,
    }
}

impl HttpClient for UreqClient {
    fn resolve(&self, url: &str) -> Result<String, ModuleError> {
        log_debug!("[Http] HEAD {}", url.blue());
        match self.agent.head(url).call() {
            Ok(response) => Ok(response.get_url().to_string()),
            Err(ureq::Error::Status(405, _)) => {
                log_debug!("[Http] HEAD not allowed on {}, keeping the configured URL", url);
                Ok(url.to_string())
            }
            Err(e) => Err(network_error(url, e)),
        }
    }

    fn fetch_text(&self, url: &str) -> Result<String, ModuleError> {
        log_debug!("[Http] GET {}", url.blue());
        let response = self.agent.get(url).call().map_err(|e| network_error(url, e))?;
        response.into_string().map_err(|e| ModuleError::Network {
            url: url.to_string(),
            message: format!("cannot read response body: {e}"),
        })
    }

    fn download(
        &self,
        url: &str,
        sink: &mut dyn Write,
        on_chunk: &mut dyn FnMut(u64, Option<u64>),
    ) -> Result<u64, ModuleError> {
        log_debug!("[Http] Downloading {}", url.blue());
        let response = self.agent.get(url).call().map_err(|e| network_error(url, e))?;
        let total = response
            .header("Content-Length")
            .and_then(|len| len.trim().parse::<u64>().ok());

        let transfer_error = |e: std::io::Error| ModuleError::Network {
            url: url.to_string(),
            message: format!("transfer interrupted: {e}"),
        };
        let mut reader = response.into_reader();
        let mut buffer = [0u8; 64 * 1024];
        let mut received: u64 = 0;
        loop {
            let read = reader.read(&mut buffer).map_err(transfer_error)?;
            if read == 0 {
                break;
            }
            sink.write_all(&buffer[..read]).map_err(transfer_error)?;
            received += read as u64;
            on_chunk(received, total);
        }
        sink.flush().map_err(transfer_error)?;
        log_debug!("[Http] {} byte(s) received from {}", received, url);
        Ok(received)
    }
}

/// Scripted client for tests: redirects, pages and files keyed by URL.
#[cfg(test)]
pub mod fake {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct FakeHttp {
        pub redirects: HashMap<String, String>,
        pub pages: HashMap<String, String>,
        pub files: HashMap<String, Vec<u8>>,
        /// Every URL passed to `fetch_text` or `download`, in order.
        pub requests: Mutex<Vec<String>>,
    }

    impl FakeHttp {
        pub fn redirect(mut self, from: &str, to: &str) -> Self {
            self.redirects.insert(from.to_string(), to.to_string());
            self
        }

        pub fn page(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), body.to_string());
            self
        }

        pub fn file(mut self, url: &str, bytes: &[u8]) -> Self {
            self.files.insert(url.to_string(), bytes.to_vec());
            self
        }

        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }

        fn missing(url: &str) -> ModuleError {
            ModuleError::Network {
                url: url.to_string(),
                message: "HTTP 404 Not Found".to_string(),
            }
        }
    }

    impl HttpClient for FakeHttp {
        fn resolve(&self, url: &str) -> Result<String, ModuleError> {
            Ok(self.redirects.get(url).cloned().unwrap_or_else(|| url.to_string()))
        }

        fn fetch_text(&self, url: &str) -> Result<String, ModuleError> {
            self.requests.lock().unwrap().push(url.to_string());
            self.pages.get(url).cloned().ok_or_else(|| Self::missing(url))
        }

        fn download(
            &self,
            url: &str,
            sink: &mut dyn Write,
            on_chunk: &mut dyn FnMut(u64, Option<u64>),
        ) -> Result<u64, ModuleError> {
            self.requests.lock().unwrap().push(url.to_string());
            let bytes = self.files.get(url).ok_or_else(|| Self::missing(url))?;
            let total = bytes.len() as u64;
            let half = bytes.len() / 2;
            sink.write_all(&bytes[..half]).unwrap();
            on_chunk(half as u64, Some(total));
            sink.write_all(&bytes[half..]).unwrap();
            on_chunk(total, Some(total));
            Ok(total)
        }
    }
}
