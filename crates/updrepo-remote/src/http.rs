use crate::RemoteError;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use updrepo_schema::RepoUri;

/// Thin blocking HTTP client used for index and payload retrieval.
///
/// Request URLs may carry userinfo; every log line and error built here uses
/// the redacted form.
pub struct HttpClient {
    agent: ureq::Agent,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
        }
    }
}

/// `url` with its userinfo replaced by a placeholder.
pub(crate) fn redact_url(url: &str) -> String {
    RepoUri::parse(url).map_or_else(|_| "<unparseable url>".to_owned(), |u| u.redacted())
}

impl HttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn call(&self, url: &str) -> Result<ureq::http::Response<ureq::Body>, RemoteError> {
        let shown = redact_url(url);
        match self.agent.get(url).call() {
            Ok(resp) => {
                let code = resp.status().as_u16();
                if code == 404 {
                    Err(RemoteError::NotFound(shown))
                } else if code >= 400 {
                    Err(RemoteError::Http(format!("HTTP {code} for {shown}")))
                } else {
                    Ok(resp)
                }
            }
            Err(ureq::Error::StatusCode(404)) => Err(RemoteError::NotFound(shown)),
            Err(ureq::Error::StatusCode(code)) => {
                Err(RemoteError::Http(format!("HTTP {code} for {shown}")))
            }
            Err(e) => Err(RemoteError::Http(format!(
                "request to {shown} failed: {}",
                e.to_string().replace(url, &shown)
            ))),
        }
    }

    /// GET `url` into memory. `Ok(None)` on 404.
    pub fn get_bytes(&self, url: &str) -> Result<Option<Vec<u8>>, RemoteError> {
        tracing::debug!("GET {}", redact_url(url));
        let resp = match self.call(url) {
            Ok(resp) => resp,
            Err(RemoteError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        let mut reader = resp.into_body().into_reader();
        let mut body = Vec::new();
        reader.read_to_end(&mut body).map_err(|e| {
            RemoteError::Http(format!("reading {} failed: {e}", redact_url(url)))
        })?;
        Ok(Some(body))
    }

    /// Stream `url` into the file at `dest`, replacing its content.
    pub fn download_to(&self, url: &str, dest: &Path) -> Result<u64, RemoteError> {
        tracing::debug!("GET {} -> {}", redact_url(url), dest.display());
        let resp = self.call(url)?;
        let mut reader = resp.into_body().into_reader();
        let mut out = BufWriter::new(File::create(dest)?);
        let written = std::io::copy(&mut reader, &mut out).map_err(|e| {
            RemoteError::Http(format!("transfer from {} failed: {e}", redact_url(url)))
        })?;
        out.flush()?;
        Ok(written)
    }
}

/// Minimal HTTP/1.1 server for tests: answers `GET` for each route and 404
/// for everything else. Returns the base URL.
#[cfg(test)]
pub(crate) fn serve_routes(routes: Vec<(&'static str, Vec<u8>)>) -> String {
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = format!("http://{}", listener.local_addr().unwrap());
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            if reader.read_line(&mut request_line).is_err() {
                continue;
            }
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).is_err() || line.trim().is_empty() {
                    break;
                }
            }
            let path = request_line.split_whitespace().nth(1).unwrap_or("/");
            let response = match routes.iter().find(|(route, _)| *route == path) {
                Some((_, body)) => {
                    let mut response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        body.len()
                    )
                    .into_bytes();
                    response.extend_from_slice(body);
                    response
                }
                None => b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                    .to_vec(),
            };
            let _ = stream.write_all(&response);
        }
    });
    addr
}
