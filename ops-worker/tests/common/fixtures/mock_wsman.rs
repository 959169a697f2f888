//! Mock WS-Management endpoint for testing
//!
//! Answers the Create / Command / Receive / Signal / Delete exchanges the
//! gateway performs, so `WinRmGateway` can be exercised without a Windows host.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use wiremock::{
    matchers::{basic_auth, body_string_contains, method, path},
    Mock, MockServer, Request, ResponseTemplate,
};

const SHELL_NS: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell";
const ACTION_CREATE: &str = "http://schemas.xmlsoap.org/ws/2004/09/transfer/Create</a:Action>";
const ACTION_DELETE: &str = "http://schemas.xmlsoap.org/ws/2004/09/transfer/Delete</a:Action>";
const ACTION_COMMAND: &str =
    "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/Command</a:Action>";
const ACTION_RECEIVE: &str =
    "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/Receive</a:Action>";
const ACTION_SIGNAL: &str =
    "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/Signal</a:Action>";

pub const SHELL_ID: &str = "6D5B1C2E-0000-4000-8000-000000000001";
pub const COMMAND_ID: &str = "9A8B7C6D-0000-4000-8000-000000000002";

/// Mock WinRM listener that simulates a lab station agent host
pub struct MockWsmanServer {
    pub server: MockServer,
    pub address: String,
    pub port: u16,
}

impl MockWsmanServer {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let socket = *server.address();
        Self {
            server,
            address: socket.ip().to_string(),
            port: socket.port(),
        }
    }

    /// Shell lifecycle plus one command that finishes with the given output
    pub async fn mock_command(&self, username: &str, password: &str, stdout: &str, stderr: &str, exit_code: i32) {
        self.mount(basic_auth(username, password), ACTION_CREATE, 200, create_response())
            .await;
        self.mount(basic_auth(username, password), ACTION_COMMAND, 200, command_response())
            .await;
        self.mount(
            basic_auth(username, password),
            ACTION_RECEIVE,
            200,
            receive_response(stdout, stderr, exit_code),
        )
        .await;
        self.mount(basic_auth(username, password), ACTION_SIGNAL, 200, empty_response())
            .await;
        self.mount(basic_auth(username, password), ACTION_DELETE, 200, empty_response())
            .await;
    }

    /// Like `mock_command`, but the final Receive carries no ExitCode
    pub async fn mock_command_without_exit_code(&self, username: &str, password: &str, stdout: &str) {
        self.mount(basic_auth(username, password), ACTION_CREATE, 200, create_response())
            .await;
        self.mount(basic_auth(username, password), ACTION_COMMAND, 200, command_response())
            .await;
        self.mount(
            basic_auth(username, password),
            ACTION_RECEIVE,
            200,
            receive_response_with(stdout, "", None),
        )
        .await;
        self.mount(basic_auth(username, password), ACTION_SIGNAL, 200, empty_response())
            .await;
        self.mount(basic_auth(username, password), ACTION_DELETE, 200, empty_response())
            .await;
    }

    /// Every request is rejected with HTTP 401
    pub async fn mock_unauthorized(&self) {
        Mock::given(method("POST"))
            .and(path("/wsman"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&self.server)
            .await;
    }

    /// SOAP bodies of every request received so far
    pub async fn request_bodies(&self) -> Vec<String> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|r: &Request| String::from_utf8_lossy(&r.body).into_owned())
            .collect()
    }

    async fn mount<M>(&self, auth: M, action: &str, status: u16, body: String)
    where
        M: wiremock::Match + 'static,
    {
        Mock::given(method("POST"))
            .and(path("/wsman"))
            .and(auth)
            .and(body_string_contains(action))
            .respond_with(
                ResponseTemplate::new(status)
                    .insert_header("Content-Type", "application/soap+xml;charset=UTF-8")
                    .set_body_string(body),
            )
            .mount(&self.server)
            .await;
    }
}

fn envelope(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope" xmlns:rsp="{}"><s:Header/><s:Body>{}</s:Body></s:Envelope>"#,
        SHELL_NS, body
    )
}

fn create_response() -> String {
    envelope(&format!(
        "<rsp:Shell><rsp:ShellId>{}</rsp:ShellId><rsp:InputStreams>stdin</rsp:InputStreams></rsp:Shell>",
        SHELL_ID
    ))
}

fn command_response() -> String {
    envelope(&format!(
        "<rsp:CommandResponse><rsp:CommandId>{}</rsp:CommandId></rsp:CommandResponse>",
        COMMAND_ID
    ))
}

fn receive_response(stdout: &str, stderr: &str, exit_code: i32) -> String {
    receive_response_with(stdout, stderr, Some(exit_code))
}

fn receive_response_with(stdout: &str, stderr: &str, exit_code: Option<i32>) -> String {
    let mut streams = String::new();
    if !stdout.is_empty() {
        streams.push_str(&format!(
            r#"<rsp:Stream Name="stdout" CommandId="{}">{}</rsp:Stream>"#,
            COMMAND_ID,
            BASE64.encode(stdout)
        ));
    }
    if !stderr.is_empty() {
        streams.push_str(&format!(
            r#"<rsp:Stream Name="stderr" CommandId="{}">{}</rsp:Stream>"#,
            COMMAND_ID,
            BASE64.encode(stderr)
        ));
    }
    streams.push_str(&format!(
        r#"<rsp:Stream Name="stdout" CommandId="{id}" End="true"></rsp:Stream><rsp:Stream Name="stderr" CommandId="{id}" End="true"></rsp:Stream>"#,
        id = COMMAND_ID
    ));

    let exit_code = exit_code
        .map(|code| format!("<rsp:ExitCode>{}</rsp:ExitCode>", code))
        .unwrap_or_default();
    envelope(&format!(
        r#"<rsp:ReceiveResponse>{}<rsp:CommandState CommandId="{}" State="{}/CommandState/Done">{}</rsp:CommandState></rsp:ReceiveResponse>"#,
        streams, COMMAND_ID, SHELL_NS, exit_code
    ))
}

fn empty_response() -> String {
    envelope("")
}
