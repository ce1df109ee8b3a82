//! Interaction controller.
//!
//! Wraps the state machine with a backend and a render target. Each user action
//! is exposed twice: as `start_*`/`finish_*` halves so the command loop can keep
//! accepting input while a request is in flight, and as a sequential `submit_*`
//! for headless callers.

use super::session::{Applied, Interaction};
use crate::engine::InferenceBackend;
use crate::error::{ClientError, ValidationError};
use crate::export;
use crate::model::{
    Action, HealthStatus, InferResponse, ResultSnapshot, SelectedFile, View,
};
use crate::render::{render_result, RenderTarget};
use anyhow::Result;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

pub(crate) type InferFuture = BoxFuture<'static, Result<InferResponse, ClientError>>;
pub(crate) type HealthFuture = BoxFuture<'static, Result<HealthStatus, ClientError>>;

/// Commands emitted by UI layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum UiCommand {
    SelectFile(PathBuf),
    SubmitUpload,
    SubmitDemo,
    SubmitAugment(String),
    Reset,
    CheckHealth,
    Export,
    Quit,
}

pub struct InteractionController<R> {
    state: Interaction,
    backend: Arc<dyn InferenceBackend>,
    renderer: R,
    max_file_size: u64,
}

impl<R: RenderTarget> InteractionController<R> {
    pub fn new(backend: Arc<dyn InferenceBackend>, mut renderer: R, max_file_size: u64) -> Self {
        let state = Interaction::default();
        render_result(&mut renderer, None);
        renderer.set_view(state.view());
        Self {
            state,
            backend,
            renderer,
            max_file_size,
        }
    }

    pub fn state(&self) -> &Interaction {
        &self.state
    }

    #[cfg(test)]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    #[cfg(test)]
    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Surface an error to the user and hand it back to the caller.
    fn fail(&mut self, err: ClientError) -> ClientError {
        tracing::debug!(kind = ?err.kind(), error = %err, "action failed");
        if matches!(err, ClientError::Validation(ValidationError::EmptyText)) {
            self.renderer.focus_augment_input();
        }
        self.renderer.show_error(&err.to_string());
        err
    }

    pub async fn select_path(&mut self, path: &Path) -> Result<(), ClientError> {
        if self.state.view() != View::Uploading {
            return Err(self.fail(
                ValidationError::NotAvailable {
                    action: Action::Upload,
                    view: self.state.view(),
                }
                .into(),
            ));
        }
        match SelectedFile::load(path, self.max_file_size).await {
            Ok(file) => self.select_file(file),
            Err(e) => Err(self.fail(e)),
        }
    }

    pub fn select_file(&mut self, file: SelectedFile) -> Result<(), ClientError> {
        let name = file.name.clone();
        let size = file.size();
        self.state.select_file(file).map_err(|e| self.fail(e))?;
        tracing::info!(file = %name, bytes = size, "file selected");
        self.renderer.set_selected_file(Some(&name));
        Ok(())
    }

    pub(crate) fn start_upload(&mut self) -> Result<InferFuture, ClientError> {
        let file = self.state.begin_upload().map_err(|e| self.fail(e))?;
        self.renderer.set_loading(Action::Upload, true);
        let backend = Arc::clone(&self.backend);
        Ok(async move { backend.infer_upload(file).await }.boxed())
    }

    pub(crate) fn start_demo(&mut self) -> Result<InferFuture, ClientError> {
        self.state.begin_demo().map_err(|e| self.fail(e))?;
        self.renderer.set_loading(Action::Upload, true);
        let backend = Arc::clone(&self.backend);
        Ok(async move { backend.infer_demo().await }.boxed())
    }

    pub(crate) fn finish_upload(
        &mut self,
        outcome: Result<InferResponse, ClientError>,
    ) -> Result<(), ClientError> {
        let applied = self.state.complete_upload(outcome);
        self.renderer.set_loading(Action::Upload, false);
        match applied {
            Ok(Applied::Replaced { entered_review }) => {
                tracing::info!(session = ?self.state.session_id(), "entered review");
                render_result(&mut self.renderer, self.state.result());
                self.renderer.set_session(self.state.session_id());
                if entered_review {
                    self.renderer.set_view(View::Reviewing);
                }
                Ok(())
            }
            Ok(Applied::Discarded) => Ok(()),
            Err(e) => Err(self.fail(e)),
        }
    }

    pub(crate) fn start_augment(&mut self, text: &str) -> Result<InferFuture, ClientError> {
        let request = self.state.begin_augment(text).map_err(|e| self.fail(e))?;
        self.renderer.set_loading(Action::Augment, true);
        let backend = Arc::clone(&self.backend);
        Ok(async move { backend.infer_augment(request).await }.boxed())
    }

    pub(crate) fn finish_augment(
        &mut self,
        outcome: Result<InferResponse, ClientError>,
    ) -> Result<(), ClientError> {
        let applied = self.state.complete_augment(outcome);
        self.renderer.set_loading(Action::Augment, false);
        match applied {
            Ok(Applied::Replaced { .. }) => {
                tracing::info!(
                    session = ?self.state.session_id(),
                    notes = self.state.session().notes.len(),
                    "result refined"
                );
                render_result(&mut self.renderer, self.state.result());
                self.renderer.clear_augment_input();
                Ok(())
            }
            Ok(Applied::Discarded) => {
                tracing::debug!("dropped augmentation response for a reset session");
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub async fn submit_upload(&mut self) -> Result<(), ClientError> {
        let request = self.start_upload()?;
        let outcome = request.await;
        self.finish_upload(outcome)
    }

    pub async fn submit_demo(&mut self) -> Result<(), ClientError> {
        let request = self.start_demo()?;
        let outcome = request.await;
        self.finish_upload(outcome)
    }

    pub async fn submit_augment(&mut self, text: &str) -> Result<(), ClientError> {
        let request = self.start_augment(text)?;
        let outcome = request.await;
        self.finish_augment(outcome)
    }

    pub fn reset(&mut self) -> Result<(), ClientError> {
        self.state.reset().map_err(|e| self.fail(e))?;
        tracing::info!("session reset");
        render_result(&mut self.renderer, None);
        self.renderer.set_selected_file(None);
        self.renderer.set_session(None);
        self.renderer.set_view(View::Uploading);
        Ok(())
    }

    pub(crate) fn start_health(&self) -> HealthFuture {
        let backend = Arc::clone(&self.backend);
        async move { backend.health().await }.boxed()
    }

    pub(crate) fn finish_health(
        &mut self,
        outcome: Result<HealthStatus, ClientError>,
    ) -> Result<HealthStatus, ClientError> {
        match outcome {
            Ok(status) => {
                self.renderer
                    .show_info(&format!("Backend status: {}", status.status));
                Ok(status)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub async fn check_health(&mut self) -> Result<HealthStatus, ClientError> {
        let outcome = self.start_health().await;
        self.finish_health(outcome)
    }

    /// Current result in exportable form, if there is one.
    pub fn snapshot(&self) -> Option<ResultSnapshot> {
        let result = self.state.result()?.clone();
        Some(ResultSnapshot {
            exported_at_utc: export::now_rfc3339(),
            session_id: self.state.session_id().map(str::to_string),
            source_file: self.state.selected_file().map(|f| f.name.clone()),
            notes: self.state.session().notes.clone(),
            result,
        })
    }

    /// Write the current result as JSON. `dir_or_file` is taken as a directory
    /// when it already exists as one.
    pub fn export(&mut self, dir_or_file: &Path) -> Result<PathBuf, ClientError> {
        let Some(snapshot) = self.snapshot() else {
            return Err(self.fail(ClientError::Export {
                path: dir_or_file.to_path_buf(),
                message: "no result to export yet".into(),
            }));
        };
        let written = if dir_or_file.is_dir() {
            export::export_json_into(dir_or_file, &snapshot)
        } else {
            export::export_json(dir_or_file, &snapshot).map(|_| dir_or_file.to_path_buf())
        };
        match written {
            Ok(path) => {
                self.renderer
                    .show_info(&format!("Exported JSON: {}", path.display()));
                Ok(path)
            }
            Err(e) => Err(self.fail(e)),
        }
    }
}

/// Wait for a request slot; never resolves while the slot is empty.
async fn join_slot<T>(slot: &mut Option<JoinHandle<Result<T, ClientError>>>) -> Result<T, ClientError> {
    match slot.as_mut() {
        Some(handle) => handle
            .await
            .unwrap_or_else(|e| Err(ClientError::Task(e.to_string()))),
        None => futures::future::pending().await,
    }
}

/// Drive the controller from UI commands until the UI quits.
///
/// Requests run as spawned tasks so the loop keeps serving commands; a second
/// request of the same kind is refused by the state machine until the first
/// one resolves.
pub(crate) async fn run_controller<R: RenderTarget>(
    mut ctrl: InteractionController<R>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
    export_dir: PathBuf,
) -> Result<()> {
    let mut upload_task: Option<JoinHandle<Result<InferResponse, ClientError>>> = None;
    let mut augment_task: Option<JoinHandle<Result<InferResponse, ClientError>>> = None;
    let mut health_task: Option<JoinHandle<Result<HealthStatus, ClientError>>> =
        Some(tokio::spawn(ctrl.start_health()));

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::SelectFile(path)) => {
                        let _ = ctrl.select_path(&path).await;
                    }
                    Some(UiCommand::SubmitUpload) => {
                        if let Ok(request) = ctrl.start_upload() {
                            upload_task = Some(tokio::spawn(request));
                        }
                    }
                    Some(UiCommand::SubmitDemo) => {
                        if let Ok(request) = ctrl.start_demo() {
                            upload_task = Some(tokio::spawn(request));
                        }
                    }
                    Some(UiCommand::SubmitAugment(text)) => {
                        if let Ok(request) = ctrl.start_augment(&text) {
                            augment_task = Some(tokio::spawn(request));
                        }
                    }
                    Some(UiCommand::Reset) => {
                        let _ = ctrl.reset();
                    }
                    Some(UiCommand::CheckHealth) => {
                        if health_task.is_none() {
                            health_task = Some(tokio::spawn(ctrl.start_health()));
                        }
                    }
                    Some(UiCommand::Export) => {
                        let _ = ctrl.export(&export_dir);
                    }
                    // In-flight requests cannot be cancelled; they are abandoned with the runtime.
                    Some(UiCommand::Quit) | None => {
                        for action in [Action::Upload, Action::Augment] {
                            if ctrl.state().is_in_flight(action) {
                                tracing::info!(%action, "abandoning request in flight");
                            }
                        }
                        break;
                    }
                }
            }
            outcome = join_slot(&mut upload_task) => {
                upload_task = None;
                let _ = ctrl.finish_upload(outcome);
            }
            outcome = join_slot(&mut augment_task) => {
                augment_task = None;
                let _ = ctrl.finish_augment(outcome);
            }
            outcome = join_slot(&mut health_task) => {
                health_task = None;
                let _ = ctrl.finish_health(outcome);
            }
        }
    }

    Ok(())
}
