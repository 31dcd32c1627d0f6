//! Interactive consent flow with a loopback callback listener
//!
//! The user is sent to the provider's consent page; the provider redirects
//! back to a listener on 127.0.0.1 carrying the authorization code. PKCE
//! (S256) binds the code to this process.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::blocking::Client;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use url::Url;

use super::secrets::ClientSecrets;
use super::token::{exchange_code, TokenResponse};
use crate::error::{Error, Result};

const VERIFIER_LEN: usize = 64;
const STATE_LEN: usize = 30;

const SUCCESS_PAGE: &str = "<html><body>The authentication flow has completed. \
    You may close this window.</body></html>";

/// Random PKCE code verifier
pub fn generate_verifier() -> String {
    random_token(VERIFIER_LEN)
}

/// S256 challenge for a verifier
pub fn compute_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Consent page URL
pub fn build_authorization_url(
    secrets: &ClientSecrets,
    redirect_uri: &str,
    scopes: &[&str],
    state: &str,
    challenge: &str,
) -> Result<Url> {
    let scope = scopes.join(" ");
    let url = Url::parse_with_params(
        &secrets.auth_uri,
        &[
            ("response_type", "code"),
            ("client_id", secrets.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("scope", scope.as_str()),
            ("state", state),
            ("code_challenge", challenge),
            ("code_challenge_method", "S256"),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )?;
    Ok(url)
}

/// Pull the authorization code out of the callback's request line
///
/// Returns `Ok(None)` for requests that carry neither a code nor an error
/// (a browser asking for `/favicon.ico`, for instance).
pub fn parse_callback(request_line: &str, expected_state: &str) -> Result<Option<String>> {
    let target = request_line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| Error::InvalidCallback(request_line.trim().to_string()))?;
    let url = Url::parse("http://127.0.0.1")?.join(target)?;

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "error" => return Err(Error::ConsentDenied(value.into_owned())),
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            _ => {}
        }
    }

    let Some(code) = code else {
        return Ok(None);
    };
    if state.as_deref() != Some(expected_state) {
        return Err(Error::InvalidCallback("state mismatch".to_string()));
    }
    Ok(Some(code))
}

/// Run the full consent flow and return the exchanged tokens
///
/// Blocks until the browser hits the callback listener.
pub fn run_local_server(http: &Client, secrets: &ClientSecrets, scopes: &[&str]) -> Result<TokenResponse> {
    let listener = TcpListener::bind(("127.0.0.1", 0))?;
    let port = listener.local_addr()?.port();
    let redirect_uri = format!("http://127.0.0.1:{}/", port);

    let verifier = generate_verifier();
    let state = random_token(STATE_LEN);
    let url = build_authorization_url(secrets, &redirect_uri, scopes, &state, &compute_challenge(&verifier))?;

    println!("Please visit this URL to authorize this application: {}", url);
    if let Err(e) = open_browser(url.as_str()) {
        warn!("Could not open a browser: {}", e);
    }

    info!(port, "Waiting for the authorization callback");
    let code = wait_for_code(&listener, &state)?;

    exchange_code(http, secrets, &code, &redirect_uri, &verifier)
}

fn wait_for_code(listener: &TcpListener, state: &str) -> Result<String> {
    for stream in listener.incoming() {
        let mut stream = stream?;
        let request_line = read_request(&stream)?;
        debug!(request = request_line.trim(), "Callback request");

        let outcome = parse_callback(&request_line, state);
        match outcome {
            Ok(None) => respond(&mut stream, "404 Not Found", "")?,
            Ok(Some(code)) => {
                respond(&mut stream, "200 OK", SUCCESS_PAGE)?;
                return Ok(code);
            }
            Err(e) => {
                respond(&mut stream, "400 Bad Request", &e.to_string())?;
                return Err(e);
            }
        }
    }

    Err(Error::InvalidCallback("listener closed before a callback arrived".to_string()))
}

/// Read the request line, consuming the headers up to the blank line
fn read_request(stream: &TcpStream) -> Result<String> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;

    let mut header = String::new();
    loop {
        header.clear();
        if reader.read_line(&mut header)? == 0 || header.trim().is_empty() {
            break;
        }
    }
    Ok(request_line)
}

fn respond(stream: &mut TcpStream, status: &str, body: &str) -> Result<()> {
    write!(
        stream,
        "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    )?;
    stream.flush()?;
    Ok(())
}

/// Open a URL with the system default browser
fn open_browser(url: &str) -> std::io::Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }
    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", "", url])
            .spawn()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secrets() -> ClientSecrets {
        ClientSecrets {
            client_id: "client.apps.googleusercontent.com".to_string(),
            client_secret: "s".to_string(),
            auth_uri: "https://accounts.google.com/o/oauth2/auth".to_string(),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
        }
    }

    #[test]
    fn test_challenge_matches_rfc7636_example() {
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(compute_challenge(verifier), "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn test_verifier_length_and_charset() {
        let verifier = generate_verifier();
        assert_eq!(verifier.len(), VERIFIER_LEN);
        assert!(verifier.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_authorization_url_carries_flow_parameters() {
        let url = build_authorization_url(
            &secrets(),
            "http://127.0.0.1:8080/",
            &["scope-a", "scope-b"],
            "xyz",
            "challenge",
        )
        .unwrap();

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("scope".to_string(), "scope-a scope-b".to_string())));
        assert!(pairs.contains(&("redirect_uri".to_string(), "http://127.0.0.1:8080/".to_string())));
        assert!(pairs.contains(&("code_challenge_method".to_string(), "S256".to_string())));
        assert!(pairs.contains(&("access_type".to_string(), "offline".to_string())));
        assert_eq!(url.host_str(), Some("accounts.google.com"));
    }

    #[test]
    fn test_parse_callback_returns_code() {
        let line = "GET /?state=xyz&code=4%2F0Abc&scope=drive HTTP/1.1\r\n";
        assert_eq!(parse_callback(line, "xyz").unwrap(), Some("4/0Abc".to_string()));
    }

    #[test]
    fn test_parse_callback_rejects_wrong_state() {
        let line = "GET /?state=other&code=abc HTTP/1.1";
        assert!(matches!(parse_callback(line, "xyz"), Err(Error::InvalidCallback(_))));
    }

    #[test]
    fn test_parse_callback_reports_declined_consent() {
        let line = "GET /?error=access_denied&state=xyz HTTP/1.1";
        assert!(matches!(parse_callback(line, "xyz"), Err(Error::ConsentDenied(e)) if e == "access_denied"));
    }

    #[test]
    fn test_parse_callback_ignores_unrelated_requests() {
        assert_eq!(parse_callback("GET /favicon.ico HTTP/1.1", "xyz").unwrap(), None);
        assert!(parse_callback("", "xyz").is_err());
    }

    fn send_request(addr: std::net::SocketAddr, target: &str) -> String {
        use std::io::Read;

        let mut stream = TcpStream::connect(addr).unwrap();
        write!(stream, "GET {} HTTP/1.1\r\nHost: 127.0.0.1\r\nAccept: */*\r\n\r\n", target).unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    #[test]
    fn test_wait_for_code_answers_stray_requests_until_callback() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let addr = listener.local_addr().unwrap();
        let browser = std::thread::spawn(move || {
            let stray = send_request(addr, "/favicon.ico");
            let callback = send_request(addr, "/?state=xyz&code=4%2F0Abc");
            (stray, callback)
        });

        let code = wait_for_code(&listener, "xyz").unwrap();
        let (stray, callback) = browser.join().unwrap();

        assert_eq!(code, "4/0Abc");
        assert!(stray.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(stray.ends_with("Content-Length: 0\r\nConnection: close\r\n\r\n"));
        assert!(callback.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(callback.ends_with(SUCCESS_PAGE));
    }

    #[test]
    fn test_wait_for_code_reports_declined_consent() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let addr = listener.local_addr().unwrap();
        let browser = std::thread::spawn(move || send_request(addr, "/?error=access_denied&state=xyz"));

        let result = wait_for_code(&listener, "xyz");
        let response = browser.join().unwrap();

        assert!(matches!(result, Err(Error::ConsentDenied(e)) if e == "access_denied"));
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }
}
