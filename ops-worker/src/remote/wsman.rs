//! Minimal WS-Management client for the Windows remote shell.
//!
//! Covers the five exchanges needed to run one command: Create (open shell),
//! Command, Receive (until the command state is Done), Signal (terminate) and
//! Delete (close shell). Authentication is HTTP Basic.

use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use regex::Regex;
use reqwest::{Client, StatusCode};
use std::sync::OnceLock;
use tracing::debug;
use uuid::Uuid;

use crate::constants::winrm::{MAX_ENVELOPE_SIZE, OPERATION_TIMEOUT_SECONDS, UNKNOWN_EXIT_CODE};

const NS_ENVELOPE: &str = r#"xmlns:env="http://www.w3.org/2003/05/soap-envelope" xmlns:a="http://schemas.xmlsoap.org/ws/2004/08/addressing" xmlns:w="http://schemas.dmtf.org/wbem/wsman/1/wsman.xsd" xmlns:p="http://schemas.microsoft.com/wbem/wsman/1/wsman.xsd" xmlns:rsp="http://schemas.microsoft.com/wbem/wsman/1/windows/shell""#;
const RESOURCE_CMD: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/cmd";
const ACTION_CREATE: &str = "http://schemas.xmlsoap.org/ws/2004/09/transfer/Create";
const ACTION_DELETE: &str = "http://schemas.xmlsoap.org/ws/2004/09/transfer/Delete";
const ACTION_COMMAND: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/Command";
const ACTION_RECEIVE: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/Receive";
const ACTION_SIGNAL: &str = "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/Signal";
const SIGNAL_TERMINATE: &str =
    "http://schemas.microsoft.com/wbem/wsman/1/windows/shell/signal/terminate";
const ANONYMOUS: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing/role/anonymous";

/// WS-Man fault code for "no output yet, receive again".
const RECEIVE_TIMEOUT_FAULT: &str = "2150858793";

/// Exit status and undecoded output streams of a remote command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCommandOutput {
    pub status_code: i32,
    pub std_out: Vec<u8>,
    pub std_err: Vec<u8>,
}

#[derive(Debug, Default)]
struct ReceiveChunk {
    std_out: Vec<u8>,
    std_err: Vec<u8>,
    done: bool,
    exit_code: Option<i32>,
}

struct Patterns {
    shell_id: Regex,
    shell_selector: Regex,
    command_id: Regex,
    stream: Regex,
    stream_name: Regex,
    done: Regex,
    exit_code: Regex,
    clixml_error: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        shell_id: Regex::new(r"<(?:\w+:)?ShellId>([^<]+)</").expect("valid regex"),
        shell_selector: Regex::new(r#"Name="ShellId"[^>]*>([^<]+)<"#).expect("valid regex"),
        command_id: Regex::new(r"<(?:\w+:)?CommandId>([^<]+)</").expect("valid regex"),
        stream: Regex::new(r"<(?:\w+:)?Stream\s([^>]*?)(?:/>|>([^<]*)</(?:\w+:)?Stream>)")
            .expect("valid regex"),
        stream_name: Regex::new(r#"Name="(\w+)""#).expect("valid regex"),
        done: Regex::new(r#"State="[^"]*/CommandState/Done""#).expect("valid regex"),
        exit_code: Regex::new(r"<(?:\w+:)?ExitCode>(-?\d+)</").expect("valid regex"),
        clixml_error: Regex::new(r#"(?s)<S S="Error">(.*?)</S>"#).expect("valid regex"),
    })
}

pub struct WsmanSession {
    client: Client,
    endpoint: String,
    username: String,
    password: String,
}

impl WsmanSession {
    pub fn new(client: Client, endpoint: String, username: String, password: String) -> Self {
        Self {
            client,
            endpoint,
            username,
            password,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Runs `command args...` in a fresh cmd shell.
    pub async fn run_cmd(&self, command: &str, args: &[String]) -> Result<RawCommandOutput> {
        let shell_id = self.open_shell().await?;

        let result = match self.run_command(&shell_id, command, args).await {
            Ok(command_id) => {
                let output = self.receive_output(&shell_id, &command_id).await;
                if let Err(e) = self.cleanup_command(&shell_id, &command_id).await {
                    debug!("Signal terminate failed on {}: {}", self.endpoint, e);
                }
                output
            }
            Err(e) => Err(e),
        };

        if let Err(e) = self.close_shell(&shell_id).await {
            debug!("Closing shell {} on {} failed: {}", shell_id, self.endpoint, e);
        }

        result
    }

    /// Runs a PowerShell script through `-EncodedCommand`.
    pub async fn run_ps(&self, script: &str) -> Result<RawCommandOutput> {
        let mut output = self
            .run_cmd("powershell", &["-NoProfile".to_string(), "-EncodedCommand".to_string(), encode_powershell(script)])
            .await?;

        if output.std_err.starts_with(b"#< CLIXML") {
            output.std_err = clean_clixml(&String::from_utf8_lossy(&output.std_err)).into_bytes();
        }
        Ok(output)
    }

    async fn open_shell(&self) -> Result<String> {
        let body = "<rsp:Shell><rsp:InputStreams>stdin</rsp:InputStreams><rsp:OutputStreams>stdout stderr</rsp:OutputStreams></rsp:Shell>";
        let options = [("WINRS_NOPROFILE", "FALSE"), ("WINRS_CODEPAGE", "65001")];
        let response = self
            .send(self.envelope(ACTION_CREATE, None, &options, body))
            .await
            .context("open shell")?;

        let p = patterns();
        p.shell_id
            .captures(&response)
            .or_else(|| p.shell_selector.captures(&response))
            .map(|c| c[1].trim().to_string())
            .ok_or_else(|| anyhow!("No ShellId in WS-Man response from {}", self.endpoint))
    }

    async fn run_command(&self, shell_id: &str, command: &str, args: &[String]) -> Result<String> {
        let mut body = String::from("<rsp:CommandLine><rsp:Command>");
        body.push_str(&xml_escape(&quote_argument(command)));
        body.push_str("</rsp:Command>");
        if !args.is_empty() {
            let joined: Vec<String> = args.iter().map(|a| quote_argument(a)).collect();
            body.push_str("<rsp:Arguments>");
            body.push_str(&xml_escape(&joined.join(" ")));
            body.push_str("</rsp:Arguments>");
        }
        body.push_str("</rsp:CommandLine>");

        let options = [
            ("WINRS_CONSOLEMODE_STDIN", "TRUE"),
            ("WINRS_SKIP_CMD_SHELL", "FALSE"),
        ];
        let response = self
            .send(self.envelope(ACTION_COMMAND, Some(shell_id), &options, &body))
            .await
            .context("start command")?;

        patterns()
            .command_id
            .captures(&response)
            .map(|c| c[1].trim().to_string())
            .ok_or_else(|| anyhow!("No CommandId in WS-Man response from {}", self.endpoint))
    }

    async fn receive_output(&self, shell_id: &str, command_id: &str) -> Result<RawCommandOutput> {
        let body = format!(
            r#"<rsp:Receive><rsp:DesiredStream CommandId="{}">stdout stderr</rsp:DesiredStream></rsp:Receive>"#,
            xml_escape(command_id)
        );
        let mut output = RawCommandOutput::default();

        loop {
            let (status, response) = self
                .post(self.envelope(ACTION_RECEIVE, Some(shell_id), &[], &body))
                .await
                .context("receive output")?;

            if !status.is_success() {
                if response.contains(RECEIVE_TIMEOUT_FAULT) {
                    debug!("Receive timed out server-side on {}, polling again", self.endpoint);
                    continue;
                }
                return Err(anyhow!(
                    "WS-Man receive failed with status {}: {}",
                    status,
                    fault_text(&response)
                ));
            }

            let chunk = parse_receive(&response)?;
            output.std_out.extend_from_slice(&chunk.std_out);
            output.std_err.extend_from_slice(&chunk.std_err);
            if chunk.done {
                output.status_code = chunk.exit_code.unwrap_or(UNKNOWN_EXIT_CODE);
                return Ok(output);
            }
        }
    }

    async fn cleanup_command(&self, shell_id: &str, command_id: &str) -> Result<()> {
        let body = format!(
            r#"<rsp:Signal CommandId="{}"><rsp:Code>{}</rsp:Code></rsp:Signal>"#,
            xml_escape(command_id),
            SIGNAL_TERMINATE
        );
        self.send(self.envelope(ACTION_SIGNAL, Some(shell_id), &[], &body))
            .await
            .map(|_| ())
    }

    async fn close_shell(&self, shell_id: &str) -> Result<()> {
        self.send(self.envelope(ACTION_DELETE, Some(shell_id), &[], ""))
            .await
            .map(|_| ())
    }

    async fn send(&self, envelope: String) -> Result<String> {
        let (status, text) = self.post(envelope).await?;
        if status == StatusCode::UNAUTHORIZED {
            return Err(anyhow!("Authentication failed for {}", self.endpoint));
        }
        if !status.is_success() {
            return Err(anyhow!(
                "WS-Man request to {} failed with status {}: {}",
                self.endpoint,
                status,
                fault_text(&text)
            ));
        }
        Ok(text)
    }

    async fn post(&self, envelope: String) -> Result<(StatusCode, String)> {
        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.username, Some(&self.password))
            .header("Content-Type", "application/soap+xml;charset=UTF-8")
            .body(envelope)
            .send()
            .await
            .map_err(|e| anyhow!("HTTP request to {} failed: {}", self.endpoint, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read response from {}: {}", self.endpoint, e))?;
        Ok((status, text))
    }

    fn envelope(
        &self,
        action: &str,
        shell_id: Option<&str>,
        options: &[(&str, &str)],
        body: &str,
    ) -> String {
        let selector = shell_id
            .map(|id| {
                format!(
                    r#"<w:SelectorSet><w:Selector Name="ShellId">{}</w:Selector></w:SelectorSet>"#,
                    xml_escape(id)
                )
            })
            .unwrap_or_default();

        let option_set = if options.is_empty() {
            String::new()
        } else {
            let items: String = options
                .iter()
                .map(|(name, value)| format!(r#"<w:Option Name="{}">{}</w:Option>"#, name, value))
                .collect();
            format!("<w:OptionSet>{}</w:OptionSet>", items)
        };

        format!(
            concat!(
                r#"<?xml version="1.0" encoding="utf-8"?>"#,
                "<env:Envelope {ns}><env:Header>",
                "<a:To>{to}</a:To>",
                r#"<a:ReplyTo><a:Address mustUnderstand="true">{anon}</a:Address></a:ReplyTo>"#,
                r#"<w:MaxEnvelopeSize mustUnderstand="true">{max}</w:MaxEnvelopeSize>"#,
                "<a:MessageID>uuid:{id}</a:MessageID>",
                r#"<w:Locale xml:lang="en-US" mustUnderstand="false"/>"#,
                r#"<p:DataLocale xml:lang="en-US" mustUnderstand="false"/>"#,
                "<w:OperationTimeout>PT{timeout}S</w:OperationTimeout>",
                r#"<w:ResourceURI mustUnderstand="true">{resource}</w:ResourceURI>"#,
                r#"<a:Action mustUnderstand="true">{action}</a:Action>"#,
                "{selector}{options}",
                "</env:Header><env:Body>{body}</env:Body></env:Envelope>"
            ),
            ns = NS_ENVELOPE,
            to = xml_escape(&self.endpoint),
            anon = ANONYMOUS,
            max = MAX_ENVELOPE_SIZE,
            id = Uuid::new_v4().to_string().to_uppercase(),
            timeout = OPERATION_TIMEOUT_SECONDS,
            resource = RESOURCE_CMD,
            action = action,
            selector = selector,
            options = option_set,
            body = body,
        )
    }
}

fn parse_receive(response: &str) -> Result<ReceiveChunk> {
    let p = patterns();
    let mut chunk = ReceiveChunk::default();

    for caps in p.stream.captures_iter(response) {
        let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let Some(content) = caps.get(2).map(|m| m.as_str().trim()) else {
            continue;
        };
        if content.is_empty() {
            continue;
        }
        let decoded = BASE64
            .decode(content)
            .map_err(|e| anyhow!("Invalid base64 in output stream: {}", e))?;
        match p.stream_name.captures(attrs).map(|c| c[1].to_string()).as_deref() {
            Some("stdout") => chunk.std_out.extend_from_slice(&decoded),
            Some("stderr") => chunk.std_err.extend_from_slice(&decoded),
            _ => {}
        }
    }

    chunk.done = p.done.is_match(response);
    chunk.exit_code = p
        .exit_code
        .captures(response)
        .and_then(|c| c[1].parse::<i32>().ok());
    Ok(chunk)
}

fn encode_powershell(script: &str) -> String {
    let utf16: Vec<u8> = script.encode_utf16().flat_map(|unit| unit.to_le_bytes()).collect();
    BASE64.encode(utf16)
}

/// Error records out of a PowerShell CLIXML stderr blob.
fn clean_clixml(text: &str) -> String {
    let lines: Vec<String> = patterns()
        .clixml_error
        .captures_iter(text)
        .map(|c| c[1].replace("_x000D__x000A_", "\n").replace("_x000D_", "").replace("_x000A_", "\n"))
        .collect();
    if lines.is_empty() {
        return text.to_string();
    }
    lines.concat().trim_end().to_string()
}

fn quote_argument(arg: &str) -> String {
    if arg.is_empty() {
        return "\"\"".to_string();
    }
    if arg.chars().any(char::is_whitespace) && !(arg.starts_with('"') && arg.ends_with('"')) {
        format!("\"{}\"", arg.replace('"', "\\\""))
    } else {
        arg.to_string()
    }
}

fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn fault_text(response: &str) -> String {
    static REASON: OnceLock<Regex> = OnceLock::new();
    let reason = REASON.get_or_init(|| {
        Regex::new(r"(?s)<(?:\w+:)?Text[^>]*>(.*?)</(?:\w+:)?Text>").expect("valid regex")
    });
    reason
        .captures(response)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_else(|| response.chars().take(200).collect())
}
