//! Message dispatcher.
//!
//! Turns user input into conversation updates: greetings are answered
//! locally, everything else goes to the backend. A backend round trip is
//! split in three so a UI can keep drawing while it is in flight:
//!
//! 1. [`ChatDispatcher::begin_send`] / [`ChatDispatcher::begin_file_selection`]
//!    update the conversation and return a [`PendingQuery`]
//! 2. [`ChatDispatcher::execute`] performs the request without touching
//!    dispatcher state, so it can run on another task
//! 3. [`ChatDispatcher::complete`] applies the result
//!
//! [`ChatDispatcher::send`] and [`ChatDispatcher::select_file`] run all three
//! in sequence.

use std::sync::Arc;

use expertbot_client::{ExpertBackend, FileOption, QueryRequest, QueryResponse, ResponseShape};
use expertbot_core::{classify_greeting, respond_to_greeting, Message, Session};
use expertbot_session::SessionController;
use rand::RngCore;
use tracing::{debug, error, info, warn};

/// Bot text when the backend offers files without its own prompt.
pub const DISAMBIGUATION_PROMPT: &str =
    "I found information in multiple files. Please select which one you want to use:";

/// Bot text for an enriched response without an enhanced answer.
pub const NO_ENHANCED_RESPONSE: &str = "No enhanced response available.";

/// Bot text when a file-specific answer is empty.
pub const NO_RESPONSE: &str = "No response available.";

/// Bot text when a fresh query fails.
pub const QUERY_FAILED: &str = "I'm having trouble connecting to my knowledge base. Please check the logs for details and try again later.";

/// Bot text when a file-specific query fails.
pub const SELECTION_FAILED: &str = "I'm having trouble retrieving information from the selected file. Please check the logs for details and try again.";

/// What a send or file selection ended in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Answered locally with a canned greeting.
    Greeted,
    /// The backend answered.
    Answered,
    /// The backend offered this many files to choose from.
    Disambiguation(usize),
    /// The request failed; an apology was appended.
    Failed,
    /// A request is already in flight. Nothing changed.
    Busy,
    /// Blank input, or a file selection with no user message to re-ask.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// A new question typed by the user.
    Fresh,
    /// The previous question re-asked against a chosen file.
    FileSelection,
}

/// A request started by `begin_*` and not yet completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuery {
    pub kind: QueryKind,
    pub request: QueryRequest,
    /// Post to the diagnostic echo endpoint first.
    pub probe: bool,
}

/// Result of the synchronous half of a send.
#[derive(Debug)]
pub enum DispatchStep {
    Finished(DispatchOutcome),
    Pending(PendingQuery),
}

pub struct ChatDispatcher {
    controller: SessionController,
    backend: Arc<dyn ExpertBackend>,
    rng: Box<dyn RngCore + Send>,
    loading: bool,
    file_options: Vec<FileOption>,
    selected_file: Option<String>,
    probe: bool,
}

impl ChatDispatcher {
    pub fn new(
        controller: SessionController,
        backend: Arc<dyn ExpertBackend>,
        rng: Box<dyn RngCore + Send>,
    ) -> Self {
        Self {
            controller,
            backend,
            rng,
            loading: false,
            file_options: Vec::new(),
            selected_file: None,
            probe: false,
        }
    }

    /// Post each fresh query to the echo endpoint before the real one.
    pub fn with_probe(mut self, probe: bool) -> Self {
        self.probe = probe;
        self
    }

    /// Send `text` and wait for the answer.
    pub async fn send(&mut self, text: &str) -> DispatchOutcome {
        match self.begin_send(text).await {
            DispatchStep::Finished(outcome) => outcome,
            DispatchStep::Pending(pending) => {
                let result = Self::execute(self.backend.as_ref(), &pending).await;
                self.complete(pending, result).await
            }
        }
    }

    /// Re-ask the last question against `file_id` and wait for the answer.
    pub async fn select_file(&mut self, file_id: &str) -> DispatchOutcome {
        match self.begin_file_selection(file_id) {
            DispatchStep::Finished(outcome) => outcome,
            DispatchStep::Pending(pending) => {
                let result = Self::execute(self.backend.as_ref(), &pending).await;
                self.complete(pending, result).await
            }
        }
    }

    /// Append the user message and either answer a greeting or start a
    /// backend request.
    pub async fn begin_send(&mut self, text: &str) -> DispatchStep {
        if self.loading {
            debug!("Send rejected while a request is in flight");
            return DispatchStep::Finished(DispatchOutcome::Busy);
        }
        if text.trim().is_empty() {
            return DispatchStep::Finished(DispatchOutcome::Ignored);
        }

        self.controller.append_message(Message::user(text));

        if classify_greeting(text) {
            let reply = respond_to_greeting(&mut *self.rng);
            self.controller.append_message(Message::bot(reply));
            self.controller.save_active().await;
            debug!("Answered greeting locally");
            return DispatchStep::Finished(DispatchOutcome::Greeted);
        }

        self.loading = true;
        let request = QueryRequest {
            query: text.to_string(),
            selected_file: self.selected_file.clone(),
        };
        info!("Dispatching query ({} chars)", request.query.chars().count());

        DispatchStep::Pending(PendingQuery {
            kind: QueryKind::Fresh,
            request,
            probe: self.probe,
        })
    }

    /// Record the choice and start re-asking the last user question against
    /// `file_id`.
    pub fn begin_file_selection(&mut self, file_id: &str) -> DispatchStep {
        if self.loading {
            debug!("File selection rejected while a request is in flight");
            return DispatchStep::Finished(DispatchOutcome::Busy);
        }

        let Some(query) = self.controller.last_user_message().map(|m| m.content.clone()) else {
            warn!("File {} selected but there is no question to re-ask", file_id);
            return DispatchStep::Finished(DispatchOutcome::Ignored);
        };

        let name = self
            .file_options
            .iter()
            .find(|option| option.id == file_id)
            .map(|option| option.name.clone())
            .unwrap_or_else(|| file_id.to_string());
        info!("Selected file {} ({})", name, file_id);

        self.controller
            .append_message(Message::user(format!("You selected: {}", name)));
        self.selected_file = Some(file_id.to_string());
        self.loading = true;

        DispatchStep::Pending(PendingQuery {
            kind: QueryKind::FileSelection,
            request: QueryRequest::new(query).with_selected_file(file_id),
            probe: false,
        })
    }

    /// Perform the network part of `pending`.
    ///
    /// A failed probe is logged and does not affect the query.
    pub async fn execute(
        backend: &dyn ExpertBackend,
        pending: &PendingQuery,
    ) -> expertbot_client::Result<QueryResponse> {
        if pending.probe {
            match backend.probe(&pending.request).await {
                Ok(echo) => debug!("Test endpoint echoed: {}", echo),
                Err(e) => warn!("Test endpoint failed: {}", e),
            }
        }
        backend.query(&pending.request).await
    }

    /// Apply the outcome of `pending` to the conversation.
    pub async fn complete(
        &mut self,
        pending: PendingQuery,
        result: expertbot_client::Result<QueryResponse>,
    ) -> DispatchOutcome {
        let outcome = match pending.kind {
            QueryKind::Fresh => self.complete_fresh(result).await,
            QueryKind::FileSelection => self.complete_selection(result).await,
        };
        self.loading = false;
        outcome
    }

    async fn complete_fresh(
        &mut self,
        result: expertbot_client::Result<QueryResponse>,
    ) -> DispatchOutcome {
        let shape = match result {
            Ok(response) => response.shape(),
            Err(e) => {
                error!("Query failed: {}", e);
                return self.fail_fresh().await;
            }
        };

        match shape {
            ResponseShape::Disambiguation { options, prompt } => {
                let count = options.len();
                info!("Backend offered {} files", count);
                self.controller.append_message(Message::bot(
                    prompt.unwrap_or_else(|| DISAMBIGUATION_PROMPT.to_string()),
                ));
                self.file_options = options;
                self.controller.save_active().await;
                DispatchOutcome::Disambiguation(count)
            }
            ResponseShape::Direct { response } => {
                self.clear_file_state();
                self.controller.append_message(Message::bot(response));
                self.controller.save_active().await;
                DispatchOutcome::Answered
            }
            ResponseShape::Enriched { enhanced } => {
                self.clear_file_state();
                self.controller.append_message(Message::bot(
                    enhanced.unwrap_or_else(|| NO_ENHANCED_RESPONSE.to_string()),
                ));
                self.controller.save_active().await;
                DispatchOutcome::Answered
            }
            ResponseShape::Unrecognized => {
                error!("Query failed: invalid response format from server");
                self.fail_fresh().await
            }
        }
    }

    async fn fail_fresh(&mut self) -> DispatchOutcome {
        self.controller.append_message(Message::bot(QUERY_FAILED));
        self.controller.save_active().await;
        DispatchOutcome::Failed
    }

    async fn complete_selection(
        &mut self,
        result: expertbot_client::Result<QueryResponse>,
    ) -> DispatchOutcome {
        self.clear_file_state();
        match result {
            Ok(response) => {
                let text = response
                    .selection_text()
                    .unwrap_or_else(|| NO_RESPONSE.to_string());
                self.controller.append_message(Message::bot(text));
                self.controller.save_active().await;
                DispatchOutcome::Answered
            }
            Err(e) => {
                // No save on this path.
                error!("File query failed: {}", e);
                self.controller.append_message(Message::bot(SELECTION_FAILED));
                DispatchOutcome::Failed
            }
        }
    }

    fn clear_file_state(&mut self) {
        self.file_options.clear();
        self.selected_file = None;
    }

    /// Archive the current conversation and start a fresh one.
    pub async fn new_chat(&mut self) {
        self.clear_file_state();
        self.controller.start_new_session().await;
    }

    pub async fn open_session(&mut self, id: &str) -> bool {
        let selected = self.controller.select_session(id).await;
        if selected {
            self.clear_file_state();
        }
        selected
    }

    pub async fn delete_session(&mut self, id: &str) {
        let was_bound = self.controller.bound_id() == Some(id);
        self.controller.delete_session(id).await;
        if was_bound {
            self.clear_file_state();
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Files offered by the last disambiguation, empty when none is pending.
    pub fn file_options(&self) -> &[FileOption] {
        &self.file_options
    }

    pub fn selected_file(&self) -> Option<&str> {
        self.selected_file.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        self.controller.active_messages()
    }

    pub fn sessions(&self) -> &[Session] {
        self.controller.sessions()
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn backend(&self) -> Arc<dyn ExpertBackend> {
        Arc::clone(&self.backend)
    }
}
