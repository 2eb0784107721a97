use crate::{Error, Result};
use std::fmt;
use std::io;
use tracing::{instrument, warn};
use url::Url;

/// Service name accepted in place of a numeric port
pub const HTTP_SERVICE: &str = "http";
const HTTP_PORT: u16 = 80;

/// The remote resource: server, port and path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    server: String,
    port: String,
    path: String,
}

impl Target {
    /// # Arguments
    /// * `server` - dns name of the server or IP address
    /// * `port` - either `"http"` or a port number
    /// * `path` - path to the file e.g. `/file.ext`
    pub fn new(server: impl Into<String>, port: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            port: port.into(),
            path: path.into(),
        }
    }

    /// Split an `http://` url into its server, port and path
    ///
    /// `https` urls are accepted but fetched over plain HTTP.
    ///
    /// # Example
    ///
    /// ```
    /// use multiget::Target;
    /// # fn main() -> Result<(), multiget::Error> {
    /// let target = Target::parse("http://example.com:8080/file.bin?x=1")?;
    /// assert_eq!(target.server(), "example.com");
    /// assert_eq!(target.port(), "8080");
    /// assert_eq!(target.path(), "/file.bin");
    /// # Ok(())
    /// # }
    /// ```
    #[instrument]
    pub fn parse(url: &str) -> Result<Self> {
        let parsed = Url::parse(url)?;
        match parsed.scheme() {
            "http" => {}
            "https" => warn!("TLS isn't supported, fetching {} over plain HTTP", url),
            other => return Err(Error::UnsupportedScheme(other.to_string())),
        }
        let server = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::Url(format!("Unable to parse server from the url: {}", url)))?;
        let port = parsed
            .port()
            .map(|p| p.to_string())
            .unwrap_or_else(|| HTTP_SERVICE.to_string());
        Ok(Self::new(server, port, parsed.path()))
    }

    /// Server as it appears in the url and the `Host` header, IPv6 literals keep their brackets
    pub fn server(&self) -> &str {
        &self.server
    }
    /// Server in the form the resolver accepts
    pub fn host(&self) -> &str {
        self.server
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .unwrap_or(&self.server)
    }
    pub fn port(&self) -> &str {
        &self.port
    }
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Numeric port, `"http"` maps to 80
    pub fn port_number(&self) -> Result<u16> {
        if self.port == HTTP_SERVICE {
            return Ok(HTTP_PORT);
        }
        self.port.parse::<u16>().map_err(|e| {
            Error::Resolution(
                self.to_string(),
                io::Error::new(io::ErrorKind::InvalidInput, e),
            )
        })
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "http://{}", self.server)?;
        if self.port != HTTP_SERVICE {
            write!(f, ":{}", self.port)?;
        }
        write!(f, "{}", self.path)
    }
}
