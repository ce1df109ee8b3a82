use crate::engine::{HttpBackend, InferenceBackend};
use crate::error::ClientError;
use crate::model::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_MAX_FILE_SIZE};
use crate::orchestrator::InteractionController;
use crate::render::RenderTarget;
use crate::text_summary::{OutputMode, TextRenderer};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
pub(crate) enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "graphcare-cli",
    version,
    about = "Terminal client for the GraphCare inference backend"
)]
pub struct Cli {
    /// Base URL of the inference backend
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Per-request timeout
    #[arg(long, default_value = "30s")]
    pub timeout: humantime::Duration,

    /// Largest file accepted for upload, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_FILE_SIZE)]
    pub max_file_size: u64,

    /// File to analyze (preselected in the TUI)
    #[arg(long, conflicts_with = "demo")]
    pub file: Option<PathBuf>,

    /// Supplementary text sent after the first inference; repeat to send several in order
    #[arg(long, value_name = "TEXT")]
    pub augment: Vec<String>,

    /// Run inference on the backend's bundled sample instead of a file
    #[arg(long)]
    pub demo: bool,

    /// Print a text summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Print the result as JSON and exit (no TUI)
    #[arg(long, conflicts_with = "text")]
    pub json: bool,

    /// Check backend health and exit
    #[arg(long)]
    pub health: bool,

    /// Export the final result as JSON
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset (e.g. info, graphcare_cli=debug)
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Write logs to this file instead of the default location
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn is_headless(&self) -> bool {
        self.json || self.text || self.health
    }
}

pub async fn run(args: Cli) -> Result<()> {
    if !args.augment.is_empty() && args.file.is_none() && !args.demo {
        return Err(anyhow::anyhow!("--augment needs --file or --demo"));
    }

    if args.health {
        return run_health(args).await;
    }

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_headless(args, OutputMode::Text).await;
        }
    }

    let mode = if args.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };
    run_headless(args, mode).await
}

/// Build a `ClientConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> Result<ClientConfig, ClientError> {
    let timeout = Duration::from(args.timeout);
    if timeout.is_zero() {
        return Err(ClientError::Config("--timeout must be positive".into()));
    }
    if args.max_file_size == 0 {
        return Err(ClientError::Config("--max-file-size must be positive".into()));
    }
    Ok(ClientConfig {
        base_url: args.base_url.clone(),
        timeout,
        max_file_size: args.max_file_size,
        ..ClientConfig::default()
    })
}

async fn run_health(args: Cli) -> Result<()> {
    let cfg = build_config(&args)?;
    let backend = HttpBackend::new(&cfg).context("create backend client")?;
    let status = backend
        .health()
        .await
        .with_context(|| format!("health check against {} failed", cfg.base_url))?;

    let (out_tx, out_handle) = spawn_output_writer();
    let line = if args.json {
        serde_json::to_string(&status)?
    } else {
        format!("{}: {}", cfg.base_url, status.status)
    };
    let _ = out_tx.send(OutputLine::Stdout(line));
    drop(out_tx);
    let _ = out_handle.await;

    if !status.is_ok() {
        return Err(anyhow::anyhow!("backend reported status {:?}", status.status));
    }
    Ok(())
}

async fn run_headless(args: Cli, mode: OutputMode) -> Result<()> {
    let cfg = build_config(&args)?;
    let backend = Arc::new(HttpBackend::new(&cfg).context("create backend client")?);
    let (out_tx, out_handle) = spawn_output_writer();

    let outcome = headless_session(&args, mode, backend, cfg.max_file_size, out_tx).await;
    let _ = out_handle.await;
    outcome
}

/// Runs one headless interaction, writing its output lines to `out_tx`.
async fn headless_session(
    args: &Cli,
    mode: OutputMode,
    backend: Arc<dyn InferenceBackend>,
    max_file_size: u64,
    out_tx: mpsc::UnboundedSender<OutputLine>,
) -> Result<()> {
    let renderer = TextRenderer::new(out_tx.clone(), mode);
    let mut ctrl = InteractionController::new(backend, renderer, max_file_size);

    drive(args, &mut ctrl).await?;
    if let Some(p) = args.export_json.as_deref() {
        ctrl.export(p).context("export result")?;
    }
    if mode == OutputMode::Json {
        if let Some(snapshot) = ctrl.snapshot() {
            let out = serde_json::to_string_pretty(&snapshot)?;
            let _ = out_tx.send(OutputLine::Stdout(out));
        }
    }
    Ok(())
}

/// Upload (or demo), then apply each augmentation in order.
async fn drive<R: RenderTarget>(args: &Cli, ctrl: &mut InteractionController<R>) -> Result<()> {
    match (args.file.as_deref(), args.demo) {
        (Some(path), _) => {
            ctrl.select_path(path)
                .await
                .with_context(|| format!("select {}", path.display()))?;
            ctrl.submit_upload().await.context("upload inference failed")?;
        }
        (None, true) => ctrl.submit_demo().await.context("demo inference failed")?,
        (None, false) => {
            return Err(anyhow::anyhow!(
                "--text/--json need --file <PATH> or --demo"
            ))
        }
    }
    for (i, text) in args.augment.iter().enumerate() {
        ctrl.submit_augment(text)
            .await
            .with_context(|| format!("augmentation #{} failed", i + 1))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::tests_support::{report_response, FakeBackend, RecordingRenderer};

    fn parse(argv: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("graphcare-cli").chain(argv.iter().copied()))
            .unwrap()
    }

    #[test]
    fn defaults_match_documented_bounds() {
        let args = parse(&[]);
        let cfg = build_config(&args).unwrap();
        assert_eq!(cfg.base_url, "http://localhost:8000");
        assert_eq!(cfg.timeout, Duration::from_secs(30));
        assert_eq!(cfg.max_file_size, 10 * 1024 * 1024);
        assert!(!args.is_headless());
    }

    #[test]
    fn timeout_accepts_humantime() {
        let cfg = build_config(&parse(&["--timeout", "1m 30s"])).unwrap();
        assert_eq!(cfg.timeout, Duration::from_secs(90));
    }

    #[test]
    fn zero_file_size_is_rejected() {
        let err = build_config(&parse(&["--max-file-size", "0"])).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn conflicting_modes_are_usage_errors() {
        let argv = ["graphcare-cli", "--json", "--text"];
        assert!(Cli::try_parse_from(argv).is_err());
        let argv = ["graphcare-cli", "--file", "a.json", "--demo"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn augment_is_repeatable_in_order() {
        let args = parse(&["--demo", "--augment", "one", "--augment", "two"]);
        assert_eq!(args.augment, vec!["one".to_string(), "two".to_string()]);
    }

    #[tokio::test]
    async fn augment_without_source_is_rejected() {
        let err = run(parse(&["--text", "--augment", "x"])).await.unwrap_err();
        assert!(err.to_string().contains("--augment"));
    }

    #[tokio::test]
    async fn drive_uploads_then_augments_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("report.json");
        std::fs::write(&file, b"{}").unwrap();

        let backend = Arc::new(FakeBackend::scripted(vec![
            Ok(report_response()),
            Ok(report_response()),
            Ok(report_response()),
        ]));
        let mut ctrl =
            InteractionController::new(backend.clone(), RecordingRenderer::default(), 1024);
        let args = parse(&[
            "--text",
            "--file",
            file.to_str().unwrap(),
            "--augment",
            "first",
            "--augment",
            "second",
        ]);
        drive(&args, &mut ctrl).await.unwrap();

        let texts: Vec<String> = backend
            .augments
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.text.clone())
            .collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(ctrl.state().session().notes, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn drive_stops_at_first_failure() {
        let backend = Arc::new(FakeBackend::scripted(vec![Err(ClientError::Status {
            status: 502,
            detail: None,
        })]));
        let mut ctrl =
            InteractionController::new(backend.clone(), RecordingRenderer::default(), 1024);
        let args = parse(&["--json", "--demo", "--augment", "never sent"]);
        let err = drive(&args, &mut ctrl).await.unwrap_err();
        assert!(format!("{err:#}").contains("502"));
        assert!(backend.augments.lock().unwrap().is_empty());
    }

    fn split(lines: Vec<OutputLine>) -> (Vec<String>, Vec<String>) {
        let (mut out, mut err) = (Vec::new(), Vec::new());
        for line in lines {
            match line {
                OutputLine::Stdout(s) => out.push(s),
                OutputLine::Stderr(s) => err.push(s),
            }
        }
        (out, err)
    }

    async fn collect(mut rx: mpsc::UnboundedReceiver<OutputLine>) -> Vec<OutputLine> {
        let mut lines = Vec::new();
        while let Some(line) = rx.recv().await {
            lines.push(line);
        }
        lines
    }

    #[tokio::test]
    async fn text_session_prints_only_the_real_result() {
        let backend = Arc::new(FakeBackend::scripted(vec![Ok(report_response())]));
        let (tx, rx) = mpsc::unbounded_channel();
        headless_session(&parse(&["--text", "--demo"]), OutputMode::Text, backend, 1024, tx)
            .await
            .unwrap();

        let (out, _) = split(collect(rx).await);
        assert_eq!(out.first().map(String::as_str), Some("Probability: 73% (263° of 360°)"));
        assert!(!out.iter().any(|l| l.starts_with("Probability: 0%")));
        assert!(out.contains(&"  1. A: x".to_string()));
        assert!(out.contains(&"Similar cases:".to_string()));
    }

    #[tokio::test]
    async fn failed_session_leaves_error_reporting_to_caller() {
        let backend = Arc::new(FakeBackend::scripted(vec![Err(ClientError::Status {
            status: 500,
            detail: None,
        })]));
        let (tx, rx) = mpsc::unbounded_channel();
        let err = headless_session(&parse(&["--text", "--demo"]), OutputMode::Text, backend, 1024, tx)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("500"));

        let (out, err_lines) = split(collect(rx).await);
        assert!(out.is_empty());
        assert!(!err_lines.iter().any(|l| l.contains("500")));
    }

    #[tokio::test]
    async fn json_session_prints_snapshot_on_stdout() {
        let backend = Arc::new(FakeBackend::scripted(vec![Ok(report_response())]));
        let (tx, rx) = mpsc::unbounded_channel();
        headless_session(&parse(&["--json", "--demo"]), OutputMode::Json, backend, 1024, tx)
            .await
            .unwrap();

        let (out, _) = split(collect(rx).await);
        assert_eq!(out.len(), 1);
        let snapshot: serde_json::Value = serde_json::from_str(&out[0]).unwrap();
        assert_eq!(snapshot["session_id"], "s1");
    }
}
