//! Upstream response head parsing and acceptance checks.
//!
//! # Responsibilities
//! - Parse the status line (`HTTP/1.0` or `HTTP/1.1`, three digit status)
//! - Look up headers by case-insensitive name
//! - Decide whether a head describes a relayable image
//!
//! # Design Decisions
//! - Header values stop at the first CR or LF and have leading spaces/tabs
//!   and trailing whitespace removed
//! - The first occurrence of a repeated header wins
//! - Only `image/*` content with a positive `Content-Length` is accepted

use crate::upstream::error::FetchError;

/// Parsed status line and headers of an upstream response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub version: String,
    pub status: u16,
    headers: Vec<(String, String)>,
}

impl ResponseHead {
    /// Parse a raw head, as returned by [`crate::http::head::read_head`].
    pub fn parse(raw: &[u8]) -> Result<Self, FetchError> {
        let text = std::str::from_utf8(raw)
            .map_err(|_| FetchError::MalformedHeader("head is not valid UTF-8".into()))?;
        let mut lines = text.split("\r\n");

        let status_line = lines
            .next()
            .filter(|line| !line.is_empty())
            .ok_or_else(|| FetchError::MalformedHeader("missing status line".into()))?;
        let (version, status) = parse_status_line(status_line)?;

        let mut headers = Vec::new();
        for line in lines.take_while(|line| !line.is_empty()) {
            let (name, value) = line.split_once(':').ok_or_else(|| {
                FetchError::MalformedHeader(format!("header line without ':': {line:?}"))
            })?;
            let name = name.trim();
            if name.is_empty() {
                return Err(FetchError::MalformedHeader("empty header name".into()));
            }
            // A bare CR or LF ends the value; nothing after it is relayed.
            let value = value.split(['\r', '\n']).next().unwrap_or_default();
            let value = value.trim_start_matches([' ', '\t']).trim_end();
            headers.push((name.to_string(), value.to_string()));
        }

        Ok(Self {
            version: version.to_string(),
            status,
            headers,
        })
    }

    /// First value of the header `name`, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Declared body length; unparseable values count as absent.
    pub fn content_length(&self) -> Option<u64> {
        self.header("content-length")
            .and_then(|v| v.parse::<u64>().ok())
    }

    /// Check the head against the relay's acceptance rules.
    ///
    /// Returns the content type and body length to relay.
    pub fn accept_image(&self, max_bytes: u64) -> Result<(String, u64), FetchError> {
        if !self.is_success() {
            return Err(FetchError::NonSuccessStatus(self.status));
        }

        let content_type = match self.content_type() {
            Some(ct) if ct.starts_with("image/") => ct.to_string(),
            other => return Err(FetchError::NotAnImage(other.map(ToString::to_string))),
        };

        if let Some(encoding) = self.header("transfer-encoding") {
            if !encoding.eq_ignore_ascii_case("identity") {
                return Err(FetchError::UnsupportedTransferEncoding(encoding.to_string()));
            }
        }

        let length = match self.content_length() {
            Some(0) | None => return Err(FetchError::MissingOrZeroLength),
            Some(n) => n,
        };
        if length > max_bytes {
            return Err(FetchError::BodyTooLarge {
                declared: length,
                limit: max_bytes,
            });
        }

        Ok((content_type, length))
    }
}

fn parse_status_line(line: &str) -> Result<(&str, u16), FetchError> {
    let malformed = || FetchError::MalformedHeader(format!("bad status line: {line:?}"));

    let (version, rest) = line.split_once(' ').ok_or_else(malformed)?;
    if version != "HTTP/1.1" && version != "HTTP/1.0" {
        return Err(malformed());
    }
    let code = rest.split(' ').next().unwrap_or_default();
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    let status = code.parse::<u16>().map_err(|_| malformed())?;
    Ok((version, status))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: u64 = 10 * 1024 * 1024;

    fn head(raw: &str) -> ResponseHead {
        ResponseHead::parse(raw.as_bytes()).unwrap()
    }

    #[test]
    fn parses_status_and_headers() {
        let h = head("HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: 4\r\n\r\n");
        assert_eq!(h.version, "HTTP/1.1");
        assert_eq!(h.status, 200);
        assert_eq!(h.content_type(), Some("image/png"));
        assert_eq!(h.content_length(), Some(4));
    }

    #[test]
    fn http_1_0_is_accepted() {
        let h = head("HTTP/1.0 200\r\ncontent-type: image/gif\r\ncontent-length: 1\r\n\r\n");
        assert!(h.is_success());
        assert_eq!(h.accept_image(MAX).unwrap(), ("image/gif".to_string(), 1));
    }

    #[test]
    fn header_names_are_case_insensitive() {
        let h = head(
            "HTTP/1.1 200 OK\r\nCONTENT-TYPE:    image/webp\r\ncOnTeNt-LeNgTh:\t12  \r\n\r\n",
        );
        assert_eq!(h.content_type(), Some("image/webp"));
        assert_eq!(h.content_length(), Some(12));
    }

    #[test]
    fn first_duplicate_wins() {
        let h = head(
            "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Type: text/html\r\n\r\n",
        );
        assert_eq!(h.content_type(), Some("image/png"));
    }

    #[test]
    fn values_stop_at_bare_cr_or_lf() {
        let h = head(concat!(
            "HTTP/1.1 200 OK\r\nContent-Type: image/png\rSet-Cookie: x=1\r\n",
            "Content-Length: 4\r\n\r\n",
        ));
        assert_eq!(h.content_type(), Some("image/png"));
        assert_eq!(h.accept_image(MAX).unwrap(), ("image/png".to_string(), 4));

        let h = head("HTTP/1.1 200 OK\r\nContent-Type: image/gif \nX-Evil: 1\r\n\r\n");
        assert_eq!(h.content_type(), Some("image/gif"));
        assert_eq!(h.header("x-evil"), None);
    }

    #[test]
    fn rejects_bad_status_lines() {
        for raw in [
            "\r\n\r\n",
            "HTTP/2 200 OK\r\n\r\n",
            "HTTP/1.1\r\n\r\n",
            "HTTP/1.1 20 OK\r\n\r\n",
            "HTTP/1.1 abc OK\r\n\r\n",
            "ICY 200 OK\r\n\r\n",
        ] {
            assert!(
                matches!(ResponseHead::parse(raw.as_bytes()), Err(FetchError::MalformedHeader(_))),
                "{raw:?}"
            );
        }
    }

    #[test]
    fn rejects_header_without_colon() {
        let err = ResponseHead::parse(b"HTTP/1.1 200 OK\r\nnonsense\r\n\r\n").unwrap_err();
        assert!(matches!(err, FetchError::MalformedHeader(_)));
    }

    #[test]
    fn non_200_is_failure() {
        for status in ["404 Not Found", "301 Moved", "206 Partial Content", "500 Oops"] {
            let h = head(&format!(
                "HTTP/1.1 {status}\r\nContent-Type: image/png\r\nContent-Length: 4\r\n\r\n"
            ));
            assert!(matches!(h.accept_image(MAX), Err(FetchError::NonSuccessStatus(_))));
        }
    }

    #[test]
    fn non_image_content_type_is_failure() {
        let h = head("HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 4\r\n\r\n");
        assert!(matches!(
            h.accept_image(MAX),
            Err(FetchError::NotAnImage(Some(ct))) if ct == "text/html"
        ));

        let missing = head("HTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\n");
        assert!(matches!(missing.accept_image(MAX), Err(FetchError::NotAnImage(None))));

        // Prefix match is literal and case-sensitive.
        let upper = head("HTTP/1.1 200 OK\r\nContent-Type: IMAGE/png\r\nContent-Length: 4\r\n\r\n");
        assert!(matches!(upper.accept_image(MAX), Err(FetchError::NotAnImage(_))));
    }

    #[test]
    fn missing_zero_or_garbage_length_is_failure() {
        for length_line in ["", "Content-Length: 0\r\n", "Content-Length: lots\r\n"] {
            let h = head(&format!(
                "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\n{length_line}\r\n"
            ));
            assert!(
                matches!(h.accept_image(MAX), Err(FetchError::MissingOrZeroLength)),
                "{length_line:?}"
            );
        }
    }

    #[test]
    fn chunked_is_unsupported() {
        let h = head(concat!(
            "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\n",
            "Transfer-Encoding: chunked\r\nContent-Length: 4\r\n\r\n",
        ));
        assert!(matches!(
            h.accept_image(MAX),
            Err(FetchError::UnsupportedTransferEncoding(_))
        ));
    }

    #[test]
    fn oversized_body_is_failure() {
        let h = head("HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: 11\r\n\r\n");
        assert!(matches!(
            h.accept_image(10),
            Err(FetchError::BodyTooLarge { declared: 11, limit: 10 })
        ));
    }
}
