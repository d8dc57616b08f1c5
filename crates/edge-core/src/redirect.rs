//! Redirect directives and props-producing results.

use serde::{Deserialize, Serialize};

/// Redirect returned by a props loader. Supersedes everything else for the pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Redirect {
    /// Where to send the user.
    pub destination: String,
    /// Explicit HTTP status, wins over `permanent`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Permanent (308) or temporary (307) redirect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permanent: Option<bool>,
}

impl Redirect {
    /// Redirect with no status preference (302).
    pub fn to(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            status_code: None,
            permanent: None,
        }
    }

    /// Permanent redirect (308).
    pub fn permanent(destination: impl Into<String>) -> Self {
        Self::to(destination).with_permanent(true)
    }

    /// Temporary redirect (307).
    pub fn temporary(destination: impl Into<String>) -> Self {
        Self::to(destination).with_permanent(false)
    }

    /// Set the permanent flag.
    pub fn with_permanent(mut self, permanent: bool) -> Self {
        self.permanent = Some(permanent);
        self
    }

    /// Set an explicit status code.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    /// Status to respond with on the server.
    pub fn status(&self) -> u16 {
        match (self.status_code, self.permanent) {
            (Some(code), _) => code,
            (None, Some(true)) => 308,
            (None, Some(false)) => 307,
            (None, None) => 302,
        }
    }

    /// Build the HTTP response for this redirect.
    ///
    /// Status codes outside the valid range fall back to 302. Characters of
    /// the destination outside visible ASCII are percent-encoded into the
    /// `Location` header.
    pub fn to_response(&self) -> Result<http::Response<()>, http::Error> {
        let status =
            http::StatusCode::from_u16(self.status()).unwrap_or(http::StatusCode::FOUND);
        http::Response::builder()
            .status(status)
            .header(http::header::LOCATION, location_header(&self.destination))
            .body(())
    }
}

fn location_header(destination: &str) -> String {
    let mut encoded = String::with_capacity(destination.len());
    for c in destination.chars() {
        if c.is_ascii_graphic() {
            encoded.push(c);
        } else {
            let mut buf = [0u8; 4];
            encoded.push_str(&urlencoding::encode(c.encode_utf8(&mut buf)));
        }
    }
    encoded
}

/// Result of a props loader: props to render with, or a redirect.
#[derive(Debug, Clone, PartialEq)]
pub enum PropsResult<P> {
    /// Render the page with these props.
    Props(P),
    /// Stop and redirect.
    Redirect(Redirect),
}

impl<P> PropsResult<P> {
    /// The redirect, if this result carries one.
    pub fn redirect(&self) -> Option<&Redirect> {
        match self {
            Self::Redirect(redirect) => Some(redirect),
            Self::Props(_) => None,
        }
    }
}

impl<P: Default> Default for PropsResult<P> {
    fn default() -> Self {
        Self::Props(P::default())
    }
}
