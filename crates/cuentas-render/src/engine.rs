//! # PDF Engines
//!
//! Markup in, PDF bytes out.
//!
//! ## Child Process Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CommandPdfEngine                                                      │
//! │                                                                         │
//! │  spawn: <program> --base-url <base> - -                               │
//! │       │                                                                 │
//! │       ├── stdin  ◄── markup (written while stdout is drained)          │
//! │       ├── stdout ──► PDF bytes                                         │
//! │       └── stderr ──► error detail (truncated)                          │
//! │                                                                         │
//! │  exit 0 + bytes   → Ok(bytes)                                          │
//! │  exit 0 + nothing → EmptyOutput                                        │
//! │  exit != 0        → Engine(stderr)                                     │
//! │  spawn failure    → Engine("failed to start ...")                      │
//! │  timeout          → Engine("timed out ...") and the child is killed    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use cuentas_core::error::{RenderError, RenderResult};

/// Program used when none is configured.
pub const DEFAULT_PDF_PROGRAM: &str = "weasyprint";

/// Token in engine arguments replaced by the base path.
pub const BASE_URL_TOKEN: &str = "{base_url}";

/// Maximum number of stderr characters kept in an error.
const STDERR_LIMIT: usize = 500;

/// Converts markup into a PDF document.
#[async_trait]
pub trait PdfEngine: Send + Sync {
    /// Renders `markup`; relative resource references resolve against `base_path`.
    async fn render_pdf(&self, markup: &str, base_path: &Path) -> RenderResult<Vec<u8>>;
}

// =============================================================================
// External Command Engine
// =============================================================================

/// PDF engine run as a child process.
#[derive(Debug, Clone)]
pub struct CommandPdfEngine {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl Default for CommandPdfEngine {
    fn default() -> Self {
        Self::new(DEFAULT_PDF_PROGRAM)
    }
}

impl CommandPdfEngine {
    /// Engine invoking `program --base-url <base> - -`.
    pub fn new(program: impl Into<String>) -> Self {
        CommandPdfEngine {
            program: program.into(),
            args: vec![
                "--base-url".to_string(),
                BASE_URL_TOKEN.to_string(),
                "-".to_string(),
                "-".to_string(),
            ],
            timeout: None,
        }
    }

    /// Replaces the argument list. [`BASE_URL_TOKEN`] is substituted in each.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Kills the engine when it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configured program.
    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self, base_path: &Path) -> Command {
        let base = base_path.to_string_lossy();
        let mut command = Command::new(&self.program);
        command
            .args(self.args.iter().map(|a| a.replace(BASE_URL_TOKEN, &base)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    async fn run(&self, markup: &str, base_path: &Path) -> RenderResult<Vec<u8>> {
        let mut child = self.command(base_path).spawn().map_err(|e| {
            RenderError::Engine(format!("failed to start '{}': {}", self.program, e))
        })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| RenderError::Engine("engine stdin unavailable".to_string()))?;

        let input = markup.as_bytes().to_vec();
        let feed = async move {
            let written = stdin.write_all(&input).await;
            drop(stdin);
            written
        };

        let (written, output) = tokio::join!(feed, child.wait_with_output());
        let output = output
            .map_err(|e| RenderError::Engine(format!("engine did not finish: {e}")))?;

        if let Err(e) = written {
            // Early exit closes the pipe; the exit status below reports it.
            if e.kind() != ErrorKind::BrokenPipe {
                return Err(RenderError::Engine(format!("failed to feed engine: {e}")));
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RenderError::Engine(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                truncate(stderr.trim(), STDERR_LIMIT)
            )));
        }

        if output.stdout.is_empty() {
            return Err(RenderError::EmptyOutput);
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl PdfEngine for CommandPdfEngine {
    async fn render_pdf(&self, markup: &str, base_path: &Path) -> RenderResult<Vec<u8>> {
        debug!(
            program = %self.program,
            base = %base_path.display(),
            markup_bytes = markup.len(),
            "Starting PDF engine"
        );

        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.run(markup, base_path))
                .await
                .unwrap_or_else(|_| {
                    warn!(program = %self.program, timeout_ms = limit.as_millis() as u64, "PDF engine timed out");
                    Err(RenderError::Engine(format!(
                        "'{}' timed out after {:?}",
                        self.program, limit
                    )))
                }),
            None => self.run(markup, base_path).await,
        };

        if let Ok(bytes) = &result {
            debug!(program = %self.program, pdf_bytes = bytes.len(), "PDF engine finished");
        }
        result
    }
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(limit).collect();
    cut.push_str("...");
    cut
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell(script: &str) -> CommandPdfEngine {
        CommandPdfEngine::new("sh").with_args(["-c", script])
    }

    #[tokio::test]
    async fn test_stdout_is_the_document() {
        let engine = shell("cat");
        let bytes = engine.render_pdf("<p>hola</p>", Path::new("/tmp")).await.unwrap();
        assert_eq!(bytes, b"<p>hola</p>".to_vec());
    }

    #[tokio::test]
    async fn test_large_markup_does_not_deadlock() {
        let engine = shell("cat");
        let markup = "x".repeat(1 << 20);
        let bytes = engine.render_pdf(&markup, Path::new("/tmp")).await.unwrap();
        assert_eq!(bytes.len(), markup.len());
    }

    #[tokio::test]
    async fn test_base_url_is_substituted() {
        let engine =
            CommandPdfEngine::new("sh").with_args(["-c", "printf %s \"$0\"", BASE_URL_TOKEN]);
        let bytes = engine.render_pdf("", Path::new("/srv/cuentas")).await.unwrap();
        assert_eq!(bytes, b"/srv/cuentas".to_vec());
    }

    #[tokio::test]
    async fn test_nonzero_exit_reports_stderr() {
        let engine = shell("echo 'fuente no encontrada' >&2; exit 3");
        let err = engine.render_pdf("<p></p>", Path::new("/tmp")).await.unwrap_err();
        match err {
            RenderError::Engine(msg) => assert!(msg.contains("fuente no encontrada"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_output() {
        let engine = shell("cat > /dev/null");
        assert!(matches!(
            engine.render_pdf("<p></p>", Path::new("/tmp")).await,
            Err(RenderError::EmptyOutput)
        ));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let engine = CommandPdfEngine::new("/nonexistent/pdf-engine");
        assert!(matches!(
            engine.render_pdf("<p></p>", Path::new("/tmp")).await,
            Err(RenderError::Engine(_))
        ));
    }

    #[tokio::test]
    async fn test_timeout() {
        let engine = shell("sleep 5").with_timeout(Some(Duration::from_millis(100)));
        let err = engine.render_pdf("", Path::new("/tmp")).await.unwrap_err();
        assert!(matches!(err, RenderError::Engine(msg) if msg.contains("timed out")));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abc", 5), "abc");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }

    #[test]
    fn test_default_arguments() {
        let engine = CommandPdfEngine::default();
        assert_eq!(engine.program(), "weasyprint");
        assert_eq!(engine.args, vec!["--base-url", BASE_URL_TOKEN, "-", "-"]);
    }
}
