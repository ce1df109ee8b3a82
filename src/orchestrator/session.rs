//! Interaction state machine.
//!
//! Pure state: no I/O, no rendering. Every request is split into a `begin_*`
//! step that validates and claims the in-flight slot, and a `complete_*` step
//! that applies the backend outcome and releases the slot.

use crate::error::{ClientError, ValidationError};
use crate::model::{
    Action, AugmentRequest, InferResponse, InferenceResult, SelectedFile, Session, View,
};

/// What a completed request did to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The result was replaced; `entered_review` is true when the view switched.
    Replaced { entered_review: bool },
    /// The response belonged to a session that was reset meanwhile.
    Discarded,
}

#[derive(Debug)]
pub struct Interaction {
    view: View,
    selected_file: Option<SelectedFile>,
    session: Session,
    result: Option<InferenceResult>,
    upload_in_flight: bool,
    pending_augment: Option<AugmentRequest>,
}

impl Default for Interaction {
    fn default() -> Self {
        Self {
            view: View::Uploading,
            selected_file: None,
            session: Session::default(),
            result: None,
            upload_in_flight: false,
            pending_augment: None,
        }
    }
}

impl Interaction {
    pub fn view(&self) -> View {
        self.view
    }

    pub fn selected_file(&self) -> Option<&SelectedFile> {
        self.selected_file.as_ref()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.id.as_deref()
    }

    pub fn result(&self) -> Option<&InferenceResult> {
        self.result.as_ref()
    }

    pub fn is_in_flight(&self, action: Action) -> bool {
        match action {
            Action::Upload => self.upload_in_flight,
            Action::Augment => self.pending_augment.is_some(),
        }
    }

    fn require_view(&self, action: Action, view: View) -> Result<(), ValidationError> {
        if self.view == view {
            Ok(())
        } else {
            Err(ValidationError::NotAvailable {
                action,
                view: self.view,
            })
        }
    }

    pub fn select_file(&mut self, file: SelectedFile) -> Result<(), ClientError> {
        self.require_view(Action::Upload, View::Uploading)?;
        if self.upload_in_flight {
            return Err(ClientError::Busy(Action::Upload));
        }
        self.selected_file = Some(file);
        Ok(())
    }

    /// Claim the upload slot and hand out the file to send.
    pub fn begin_upload(&mut self) -> Result<SelectedFile, ClientError> {
        self.require_view(Action::Upload, View::Uploading)?;
        if self.upload_in_flight {
            return Err(ClientError::Busy(Action::Upload));
        }
        let file = self
            .selected_file
            .clone()
            .ok_or(ValidationError::NoFileSelected)?;
        self.upload_in_flight = true;
        Ok(file)
    }

    /// Claim the upload slot for a demo inference; no file is needed.
    pub fn begin_demo(&mut self) -> Result<(), ClientError> {
        self.require_view(Action::Upload, View::Uploading)?;
        if self.upload_in_flight {
            return Err(ClientError::Busy(Action::Upload));
        }
        self.upload_in_flight = true;
        Ok(())
    }

    /// Apply an upload (or demo) outcome. On failure the selected file is kept.
    pub fn complete_upload(
        &mut self,
        outcome: Result<InferResponse, ClientError>,
    ) -> Result<Applied, ClientError> {
        self.upload_in_flight = false;
        let (session_id, result) = outcome?.into_parts();
        let session_id = session_id.ok_or(ClientError::MissingSessionId)?;
        if self.view != View::Uploading {
            return Ok(Applied::Discarded);
        }
        self.session = Session {
            id: Some(session_id),
            notes: Vec::new(),
        };
        self.result = Some(result);
        self.view = View::Reviewing;
        Ok(Applied::Replaced {
            entered_review: true,
        })
    }

    /// Validate supplementary text and claim the augmentation slot.
    pub fn begin_augment(&mut self, text: &str) -> Result<AugmentRequest, ClientError> {
        self.require_view(Action::Augment, View::Reviewing)?;
        let session_id = self.session.id.clone().ok_or(ValidationError::NoSession)?;
        if self.pending_augment.is_some() {
            return Err(ClientError::Busy(Action::Augment));
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyText.into());
        }
        let request = AugmentRequest {
            session_id,
            text: text.to_string(),
        };
        self.pending_augment = Some(request.clone());
        Ok(request)
    }

    /// Apply an augmentation outcome. On failure the previous result stays.
    pub fn complete_augment(
        &mut self,
        outcome: Result<InferResponse, ClientError>,
    ) -> Result<Applied, ClientError> {
        let Some(request) = self.pending_augment.take() else {
            return Ok(Applied::Discarded);
        };
        if self.session.id.as_deref() != Some(request.session_id.as_str()) {
            return Ok(Applied::Discarded);
        }
        let response = outcome?;
        // The session is already known; any id in the response is ignored.
        let (_, result) = response.into_parts();
        self.result = Some(result);
        self.session.notes.push(request.text);
        Ok(Applied::Replaced {
            entered_review: false,
        })
    }

    /// Drop file, session and result and go back to uploading.
    pub fn reset(&mut self) -> Result<(), ClientError> {
        if self.view != View::Reviewing {
            return Err(ValidationError::NothingToReset.into());
        }
        self.selected_file = None;
        self.session = Session::default();
        self.result = None;
        self.view = View::Uploading;
        Ok(())
    }
}
