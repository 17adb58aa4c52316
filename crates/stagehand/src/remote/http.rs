use std::net::{SocketAddr, TcpListener as StdListener};
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use base64::Engine;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use super::{RemoteControl, parse_keyflag};

const SERVER: &str = "stagehand-ws";
const USERNAME: &str = "stagehand";
const MAX_HEAD: usize = 16 * 1024;
const MAX_BODY: usize = 4 * 1024;
const INDEX_HTML: &str = include_str!("index.html");

#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub port: u16,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Request {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn content_length(&self) -> usize {
        self.header("content-length")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
    /// HEAD responses carry the headers of the body but not the body.
    pub omit_body: bool,
}

impl Response {
    fn new(status: u16) -> Self {
        Self {
            status,
            headers: vec![("Server", SERVER.to_string())],
            body: Vec::new(),
            omit_body: false,
        }
    }

    fn with_body(mut self, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        self.headers.push(("Content-Type", content_type.to_string()));
        self.body = body.into();
        self
    }

    fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            400 => "Bad Request",
            401 => "Unauthorized",
            404 => "Not Found",
            501 => "Not Implemented",
            _ => "Unknown",
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status, self.reason());
        for (name, value) in &self.headers {
            head.push_str(&format!("{name}: {value}\r\n"));
        }
        head.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        head.push_str("Connection: close\r\n\r\n");

        let mut bytes = head.into_bytes();
        if !self.omit_body {
            bytes.extend_from_slice(&self.body);
        }
        bytes
    }
}

/// Parse a request head (everything up to the blank line).
pub fn parse_request(head: &str) -> Option<Request> {
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?;
    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path.to_string(), Some(query.to_string())),
        None => (target.to_string(), None),
    };

    let headers = lines
        .take_while(|line| !line.is_empty())
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    Some(Request {
        method,
        path,
        query,
        headers,
        body: String::new(),
    })
}

fn authorized(request: &Request, password: &str) -> bool {
    let Some(encoded) = request
        .header("authorization")
        .and_then(|v| v.strip_prefix("Basic "))
    else {
        return false;
    };
    let Ok(decoded) = base64::engine::general_purpose::STANDARD.decode(encoded.trim()) else {
        return false;
    };
    let expected = format!("{USERNAME}:{password}");
    decoded == expected.as_bytes()
}

/// Value of `keyflag=` in a form-encoded string.
fn keyflag(form: &str) -> u32 {
    form.split('&')
        .find_map(|pair| pair.strip_prefix("keyflag="))
        .map_or(0, parse_keyflag)
}

/// Route a request, forwarding control keys to `remote`.
pub fn respond(request: &Request, password: Option<&str>, remote: &RemoteControl) -> Response {
    if let Some(password) = password {
        if !authorized(request, password) {
            let mut response = Response::new(401);
            response
                .headers
                .push(("WWW-Authenticate", "Basic realm=\"Authenticate\"".to_string()));
            return response;
        }
    }

    let method = request.method.as_str();
    if !matches!(method, "GET" | "POST" | "HEAD") {
        return Response::new(501);
    }

    let mut response = match request.path.as_str() {
        "/API/ControlKey" => {
            let form = if method == "POST" {
                request.body.as_str()
            } else {
                request.query.as_deref().unwrap_or("")
            };
            remote.control_key(keyflag(form));
            Response::new(200).with_body("text/plain", "OK")
        }
        "/" | "/index.html" => Response::new(200).with_body("text/html; charset=utf-8", INDEX_HTML),
        _ => Response::new(404),
    };
    response.omit_body = method == "HEAD";
    response
}

/// Bind the listener and serve from a background thread.
pub fn spawn(options: HttpOptions, remote: RemoteControl) -> Result<JoinHandle<()>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], options.port));
    let listener =
        StdListener::bind(addr).with_context(|| format!("Failed to bind HTTP remote on {addr}"))?;
    listener
        .set_nonblocking(true)
        .context("Failed to configure HTTP listener")?;
    tracing::info!("HTTP remote listening on {addr}");

    let handle = std::thread::Builder::new()
        .name("http-remote".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_io()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    tracing::error!("failed to start HTTP runtime: {e}");
                    return;
                }
            };
            runtime.block_on(async move {
                if let Err(e) = serve(listener, options.password, remote).await {
                    tracing::error!("HTTP remote stopped: {e:#}");
                }
            });
        })
        .context("Failed to spawn HTTP thread")?;
    Ok(handle)
}

async fn serve(listener: StdListener, password: Option<String>, remote: RemoteControl) -> Result<()> {
    let listener = TcpListener::from_std(listener)?;
    loop {
        let (stream, peer) = listener.accept().await?;
        let password = password.clone();
        let remote = remote.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, password.as_deref(), &remote).await {
                tracing::debug!(%peer, "HTTP connection error: {e:#}");
            }
        });
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    password: Option<&str>,
    remote: &RemoteControl,
) -> Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        if buf.len() > MAX_HEAD {
            anyhow::bail!("request head too large");
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            anyhow::bail!("connection closed mid-request");
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]);
    let response = match parse_request(&head) {
        Some(mut request) => {
            let wanted = request.content_length().min(MAX_BODY);
            let mut body = buf[head_end + 4..].to_vec();
            while body.len() < wanted {
                let n = stream.read(&mut chunk).await?;
                if n == 0 {
                    break;
                }
                body.extend_from_slice(&chunk[..n]);
            }
            body.truncate(wanted);
            request.body = String::from_utf8_lossy(&body).into_owned();
            respond(&request, password, remote)
        }
        None => Response::new(400),
    };

    stream.write_all(&response.to_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{KeyEvent, keysym};

    fn request(method: &str, target: &str) -> Request {
        parse_request(&format!("{method} {target} HTTP/1.1\r\nHost: x")).unwrap()
    }

    fn basic(user_pass: &str) -> String {
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(user_pass)
        )
    }

    #[test]
    fn test_parse_request_line_and_headers() {
        let req = parse_request(
            "POST /API/ControlKey?x=1 HTTP/1.1\r\nContent-Length: 13\r\nAuthorization: Basic abc",
        )
        .unwrap();
        assert_eq!(req.method, "POST");
        assert_eq!(req.path, "/API/ControlKey");
        assert_eq!(req.query.as_deref(), Some("x=1"));
        assert_eq!(req.content_length(), 13);
        assert_eq!(req.header("AUTHORIZATION"), Some("Basic abc"));
        assert!(parse_request("").is_none());
    }

    #[test]
    fn test_get_control_key_forwards() {
        let (remote, rx) = RemoteControl::channel();
        let res = respond(&request("GET", "/API/ControlKey?keyflag=65363"), None, &remote);
        assert_eq!(res.status, 200);
        assert_eq!(rx.try_recv().unwrap(), KeyEvent::Press(keysym::RIGHT));
    }

    #[test]
    fn test_post_control_key_uses_body() {
        let (remote, rx) = RemoteControl::channel();
        let mut req = request("POST", "/API/ControlKey");
        req.body = "keyflag=65361".to_string();
        assert_eq!(respond(&req, None, &remote).status, 200);
        assert_eq!(rx.try_recv().unwrap(), KeyEvent::Press(keysym::LEFT));
    }

    #[test]
    fn test_unparsable_keyflag_is_ignored() {
        let (remote, rx) = RemoteControl::channel();
        let res = respond(&request("GET", "/API/ControlKey?keyflag=abc"), None, &remote);
        assert_eq!(res.status, 200);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_routing() {
        let (remote, _rx) = RemoteControl::channel();
        let index = respond(&request("GET", "/"), None, &remote);
        assert_eq!(index.status, 200);
        assert!(String::from_utf8_lossy(&index.body).contains("keyflag"));
        assert_eq!(respond(&request("GET", "/index.html"), None, &remote).status, 200);
        assert_eq!(respond(&request("GET", "/secret"), None, &remote).status, 404);
        assert_eq!(respond(&request("DELETE", "/"), None, &remote).status, 501);

        let head = respond(&request("HEAD", "/"), None, &remote);
        let bytes = String::from_utf8(head.to_bytes()).unwrap();
        assert!(bytes.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(bytes.contains("Server: stagehand-ws\r\n"));
        assert!(bytes.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_basic_auth() {
        let (remote, rx) = RemoteControl::channel();
        let denied = respond(&request("GET", "/API/ControlKey?keyflag=65363"), Some("pw"), &remote);
        assert_eq!(denied.status, 401);
        assert!(
            denied
                .headers
                .contains(&("WWW-Authenticate", "Basic realm=\"Authenticate\"".to_string()))
        );
        assert!(rx.try_recv().is_err());

        let mut wrong = request("GET", "/");
        wrong.headers.push(("Authorization".into(), basic("admin:pw")));
        assert_eq!(respond(&wrong, Some("pw"), &remote).status, 401);

        let mut ok = request("GET", "/API/ControlKey?keyflag=65363");
        ok.headers.push(("Authorization".into(), basic("stagehand:pw")));
        assert_eq!(respond(&ok, Some("pw"), &remote).status, 200);
        assert_eq!(rx.try_recv().unwrap(), KeyEvent::Press(keysym::RIGHT));
    }
}
