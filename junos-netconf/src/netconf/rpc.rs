//! RPC envelope building and reply parsing.
//!
//! Replies are scanned for `<rpc-error>` diagnostics wherever they appear in
//! the document. Junos nests commit diagnostics inside a `<commit-results>`
//! envelope on some platforms; a whole-document scan picks those up without
//! a second pass.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{NetconfError, Result};

/// Severity of a device-reported RPC diagnostic.
///
/// Anything the device does not flag as `error` is advisory: collected and
/// surfaced next to success, never failing the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    fn parse(text: &str) -> Self {
        if text.trim().eq_ignore_ascii_case("error") {
            Severity::Error
        } else {
            Severity::Warning
        }
    }
}

/// One `<rpc-error>` element from a reply.
#[derive(Debug, Clone)]
pub struct RpcDiagnostic {
    pub severity: Severity,
    /// `<error-tag>` value, e.g. `operation-failed`.
    pub tag: Option<String>,
    /// `<error-path>` value when the device points at a config node.
    pub path: Option<String>,
    /// `<error-message>` text.
    pub message: String,
    /// `<bad-element>` from `<error-info>`, when present.
    pub bad_element: Option<String>,
}

impl RpcDiagnostic {
    /// Render the diagnostic the way the device phrased it, with the
    /// offending element appended when known.
    pub fn render(&self) -> String {
        let mut text = if self.message.is_empty() {
            self.tag.clone().unwrap_or_else(|| "unspecified error".to_string())
        } else {
            self.message.clone()
        };
        if let Some(bad) = &self.bad_element {
            text.push_str(&format!(" (element '{}')", bad));
        }
        if let Some(path) = &self.path {
            text.push_str(&format!(" at {}", path));
        }
        text
    }
}

/// A parsed `<rpc-reply>`.
#[derive(Debug, Clone)]
pub struct RpcReply {
    /// The raw reply document, delimiter stripped.
    pub raw: String,

    /// Every `<rpc-error>` found anywhere in the reply.
    pub diagnostics: Vec<RpcDiagnostic>,
}

impl RpcReply {
    /// Parse a reply document, collecting all diagnostics.
    pub fn parse(operation: &str, raw: String) -> Result<Self> {
        let diagnostics = scan_diagnostics(&raw).map_err(|e| NetconfError::MalformedReply {
            operation: operation.to_string(),
            message: e.to_string(),
            raw: raw.clone(),
        })?;
        Ok(Self { raw, diagnostics })
    }

    /// Split diagnostics into advisory warnings and fatal errors.
    ///
    /// Error-severity diagnostics never appear among the warnings.
    pub fn split_diagnostics(&self) -> (Vec<String>, Vec<&RpcDiagnostic>) {
        let mut warnings = Vec::new();
        let mut errors = Vec::new();
        for diag in &self.diagnostics {
            match diag.severity {
                Severity::Error => errors.push(diag),
                Severity::Warning => warnings.push(diag.render()),
            }
        }
        (warnings, errors)
    }

    /// Fail on error-severity diagnostics, otherwise return the warnings.
    pub fn check(&self, operation: &str) -> Result<Vec<String>> {
        let (warnings, errors) = self.split_diagnostics();
        if errors.is_empty() {
            return Ok(warnings);
        }
        let message = errors
            .iter()
            .map(|d| d.render())
            .collect::<Vec<_>>()
            .join("; ");
        Err(NetconfError::Rpc {
            operation: operation.to_string(),
            message,
        }
        .into())
    }

    /// True when the reply carries at least one error-severity diagnostic.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }
}

/// Wrap an RPC body in the `<rpc>` envelope.
pub fn wrap_rpc(message_id: u64, body: &str) -> String {
    format!(
        "<rpc message-id=\"{}\" xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\">{}</rpc>",
        message_id, body
    )
}

/// The client `<hello>` advertising base:1.0 only.
pub fn client_hello() -> &'static str {
    "<hello xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\">\
     <capabilities>\
     <capability>urn:ietf:params:xml:ns:netconf:base:1.0</capability>\
     </capabilities>\
     </hello>"
}

/// Server `<hello>` contents.
#[derive(Debug, Clone, Default)]
pub struct ServerHello {
    pub capabilities: Vec<String>,
    pub session_id: Option<u64>,
}

impl ServerHello {
    /// Decode the server hello message.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut reader = Reader::from_str(raw);
        reader.config_mut().trim_text(true);

        let mut hello = ServerHello::default();
        let mut field: Option<&'static str> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => match e.local_name().as_ref() {
                    b"capability" => field = Some("capability"),
                    b"session-id" => field = Some("session-id"),
                    _ => {}
                },
                Ok(Event::Text(t)) => {
                    let text = t
                        .unescape()
                        .map_err(|e| hello_error(raw, e))?
                        .trim()
                        .to_string();
                    match field {
                        Some("capability") => hello.capabilities.push(text),
                        Some("session-id") => hello.session_id = text.parse().ok(),
                        _ => {}
                    }
                }
                Ok(Event::End(_)) => field = None,
                Ok(Event::Eof) => break,
                Err(e) => return Err(hello_error(raw, e)),
                _ => {}
            }
        }

        if hello.capabilities.is_empty() {
            return Err(NetconfError::Hello {
                message: format!("no capabilities in server hello: {}", raw),
            }
            .into());
        }
        Ok(hello)
    }
}

fn hello_error(raw: &str, e: impl std::fmt::Display) -> crate::Error {
    NetconfError::Hello {
        message: format!("{} (raw hello: {})", e, raw),
    }
    .into()
}

/// Escape text for embedding in an XML element body.
pub fn escape_text(text: &str) -> String {
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

/// Extract the human-readable payload of a `<command format="text">` reply.
///
/// Junos wraps operational output in `<output>` or
/// `<configuration-information>/<configuration-output>` depending on the
/// command. Falls back to the concatenated text content of the reply
/// (diagnostic subtrees excluded) for other envelopes.
pub fn extract_output(raw: &str) -> Option<String> {
    let mut reader = Reader::from_str(raw);

    let mut wrapped = String::new();
    let mut fallback = String::new();
    let mut in_output = 0u32;
    let mut in_error = 0u32;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"output" | b"configuration-output" => in_output += 1,
                b"rpc-error" => in_error += 1,
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"output" | b"configuration-output" => in_output = in_output.saturating_sub(1),
                b"rpc-error" => in_error = in_error.saturating_sub(1),
                _ => {}
            },
            Ok(Event::Text(t)) => {
                let Ok(text) = t.unescape() else { continue };
                if in_output > 0 {
                    wrapped.push_str(&text);
                } else if in_error == 0 {
                    fallback.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => return None,
            _ => {}
        }
    }

    let chosen = if wrapped.trim().is_empty() {
        fallback
    } else {
        wrapped
    };
    let trimmed = chosen.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Scan a document for `<rpc-error>` subtrees at any depth.
fn scan_diagnostics(raw: &str) -> std::result::Result<Vec<RpcDiagnostic>, quick_xml::Error> {
    let mut reader = Reader::from_str(raw);
    reader.config_mut().trim_text(true);

    let mut diagnostics = Vec::new();
    let mut current: Option<RpcDiagnostic> = None;
    let mut field: Vec<u8> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                if name == b"rpc-error" {
                    current = Some(RpcDiagnostic {
                        // Junos omits <error-severity> on some fatal replies;
                        // absent severity is treated as error, not advisory.
                        severity: Severity::Error,
                        tag: None,
                        path: None,
                        message: String::new(),
                        bad_element: None,
                    });
                } else if current.is_some() {
                    field = name;
                }
            }
            Event::Text(t) => {
                if let Some(diag) = current.as_mut() {
                    let text = t.unescape()?.trim().to_string();
                    match field.as_slice() {
                        b"error-severity" => diag.severity = Severity::parse(&text),
                        b"error-tag" => diag.tag = Some(text),
                        b"error-path" => diag.path = Some(text),
                        b"error-message" => diag.message = text,
                        b"bad-element" => diag.bad_element = Some(text),
                        _ => {}
                    }
                }
            }
            Event::End(e) => {
                if e.local_name().as_ref() == b"rpc-error" {
                    if let Some(diag) = current.take() {
                        diagnostics.push(diag);
                    }
                }
                field.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLY_OK: &str = r#"<rpc-reply message-id="1"><ok/></rpc-reply>"#;

    const REPLY_ONE_ERROR_ONE_WARNING: &str = r#"
        <rpc-reply message-id="4">
          <rpc-error>
            <error-severity>warning</error-severity>
            <error-message>statement has no contents; ignored</error-message>
          </rpc-error>
          <rpc-error>
            <error-type>protocol</error-type>
            <error-tag>operation-failed</error-tag>
            <error-severity>error</error-severity>
            <error-message>configuration check-out failed</error-message>
          </rpc-error>
        </rpc-reply>"#;

    const REPLY_NESTED_COMMIT_ERROR: &str = r#"
        <rpc-reply message-id="7">
          <commit-results>
            <rpc-error>
              <error-severity>error</error-severity>
              <error-path>[edit interfaces]</error-path>
              <error-message>commit failed</error-message>
              <error-info><bad-element>ge-0/0/0</bad-element></error-info>
            </rpc-error>
          </commit-results>
        </rpc-reply>"#;

    #[test]
    fn test_clean_reply_has_no_diagnostics() {
        let reply = RpcReply::parse("commit", REPLY_OK.to_string()).unwrap();
        assert!(reply.diagnostics.is_empty());
        assert!(!reply.has_errors());
        assert!(reply.check("commit").unwrap().is_empty());
    }

    #[test]
    fn test_error_and_warning_are_split() {
        let reply =
            RpcReply::parse("commit", REPLY_ONE_ERROR_ONE_WARNING.to_string()).unwrap();
        let (warnings, errors) = reply.split_diagnostics();

        assert_eq!(warnings.len(), 1);
        assert_eq!(errors.len(), 1);
        assert!(warnings[0].contains("no contents"));
        assert!(errors[0].message.contains("check-out failed"));
    }

    #[test]
    fn test_error_severity_fails_check() {
        let reply =
            RpcReply::parse("commit", REPLY_ONE_ERROR_ONE_WARNING.to_string()).unwrap();
        let err = reply.check("commit").unwrap_err();
        let text = err.to_string();
        assert!(text.contains("commit"));
        assert!(text.contains("check-out failed"));
        assert!(!text.contains("no contents"));
    }

    #[test]
    fn test_nested_commit_results_errors_are_found() {
        let reply =
            RpcReply::parse("commit", REPLY_NESTED_COMMIT_ERROR.to_string()).unwrap();
        assert!(reply.has_errors());
        let (_, errors) = reply.split_diagnostics();
        assert_eq!(errors[0].bad_element.as_deref(), Some("ge-0/0/0"));
        assert!(errors[0].render().contains("ge-0/0/0"));
        assert!(errors[0].render().contains("[edit interfaces]"));
    }

    #[test]
    fn test_severity_defaults_to_error_when_absent() {
        let raw = r#"<rpc-reply><rpc-error>
            <error-message>boom</error-message>
        </rpc-error></rpc-reply>"#;
        let reply = RpcReply::parse("op", raw.to_string()).unwrap();
        assert!(reply.has_errors());
    }

    #[test]
    fn test_malformed_reply_carries_raw_payload() {
        let raw = "<rpc-reply><unterminated".to_string();
        let err = RpcReply::parse("get", raw).unwrap_err();
        assert!(err.to_string().contains("<rpc-reply><unterminated"));
    }

    #[test]
    fn test_wrap_rpc_carries_message_id() {
        let rpc = wrap_rpc(42, "<get-system-information/>");
        assert!(rpc.starts_with("<rpc message-id=\"42\""));
        assert!(rpc.contains("<get-system-information/>"));
        assert!(rpc.ends_with("</rpc>"));
    }

    #[test]
    fn test_escape_text() {
        assert_eq!(
            escape_text(r#"set system name-server "8.8.8.8" <primary> & co"#),
            "set system name-server &quot;8.8.8.8&quot; &lt;primary&gt; &amp; co"
        );
    }

    #[test]
    fn test_server_hello_parses_capabilities_and_session_id() {
        let raw = r#"<hello xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
            <capabilities>
              <capability>urn:ietf:params:xml:ns:netconf:base:1.0</capability>
              <capability>urn:ietf:params:netconf:capability:candidate:1.0</capability>
            </capabilities>
            <session-id>38291</session-id>
        </hello>"#;
        let hello = ServerHello::parse(raw).unwrap();
        assert_eq!(hello.capabilities.len(), 2);
        assert_eq!(hello.session_id, Some(38291));
    }

    #[test]
    fn test_server_hello_without_capabilities_fails() {
        let err = ServerHello::parse("<hello/>").unwrap_err();
        assert!(err.to_string().contains("hello"));
    }

    #[test]
    fn test_extract_output_prefers_output_element() {
        let raw = r#"<rpc-reply><output>
Hostname: fw0
Model: srx340
</output></rpc-reply>"#;
        let output = extract_output(raw).unwrap();
        assert!(output.starts_with("Hostname: fw0"));
        assert!(output.ends_with("Model: srx340"));
    }

    #[test]
    fn test_extract_output_configuration_output() {
        let raw = r#"<rpc-reply><configuration-information>
            <configuration-output>set system host-name fw0</configuration-output>
        </configuration-information></rpc-reply>"#;
        assert_eq!(
            extract_output(raw).as_deref(),
            Some("set system host-name fw0")
        );
    }

    #[test]
    fn test_extract_output_empty_reply() {
        assert!(extract_output(r#"<rpc-reply><output>
        </output></rpc-reply>"#).is_none());
        assert!(extract_output(r#"<rpc-reply><ok/></rpc-reply>"#).is_none());
    }

    #[test]
    fn test_extract_output_skips_diagnostic_text() {
        let raw = r#"<rpc-reply>
            <rpc-error><error-message>bad command</error-message></rpc-error>
        </rpc-reply>"#;
        assert!(extract_output(raw).is_none());
    }
}
