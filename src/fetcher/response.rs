use crate::{Error, Result};

/// Parsed `HTTP/<version> <code> <reason>` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub version: String,
    pub code: u16,
    pub reason: String,
}

impl StatusLine {
    /// Parse a status line, with or without its terminator
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim_end_matches(|c| c == '\r' || c == '\n');
        let (version, rest) = split_token(line);
        if !version.starts_with("HTTP/") {
            return Err(Error::Protocol(format!("not an HTTP status line: {:?}", line)));
        }
        let (code, reason) = split_token(rest);
        let code = code
            .parse::<u16>()
            .map_err(|_| Error::Protocol(format!("bad status code in {:?}", line)))?;
        Ok(Self {
            version: version.to_string(),
            code,
            reason: reason.trim().to_string(),
        })
    }

    /// Only a full or a partial content answer carries the chunk
    pub fn is_success(&self) -> bool {
        matches!(self.code, 200 | 206)
    }

    /// `Ok(())` for 200 and 206, the status error otherwise
    pub fn check(&self) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(Error::HttpStatus { code: self.code })
        }
    }
}

fn split_token(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], &s[i..]),
        None => (s, ""),
    }
}

/// True for the empty line closing the header block
pub(crate) fn is_header_end(line: &[u8]) -> bool {
    line == b"\r\n" || line == b"\n"
}
