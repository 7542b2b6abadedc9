use expertbot_chat::{ChatDispatcher, DispatchOutcome, DispatchStep, PendingQuery};
use expertbot_client::QueryResponse;
use tokio::sync::mpsc;
use tracing::{debug, error};

type Completion = (PendingQuery, expertbot_client::Result<QueryResponse>);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Connecting,
    Error,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Connected => write!(f, "● Connected"),
            ConnectionStatus::Disconnected => write!(f, "○ Disconnected"),
            ConnectionStatus::Connecting => write!(f, "◐ Connecting"),
            ConnectionStatus::Error => write!(f, "✗ Error"),
        }
    }
}

/// Pane receiving arrow keys and Enter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Focus {
    Input,
    Sidebar,
    FileOptions,
}

pub struct App {
    pub dispatcher: ChatDispatcher,
    pub input: String,
    pub focus: Focus,
    pub status: ConnectionStatus,
    pub dark_mode: bool,
    pub sidebar_index: usize,
    pub option_index: usize,
    /// Lines scrolled up from the bottom of the conversation.
    pub scroll_back: u16,
    pub tick: u64,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
}

impl App {
    pub fn new(dispatcher: ChatDispatcher, dark_mode: bool) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Self {
            dispatcher,
            input: String::new(),
            focus: Focus::Input,
            status: ConnectionStatus::Disconnected,
            dark_mode,
            sidebar_index: 0,
            option_index: 0,
            scroll_back: 0,
            tick: 0,
            completion_tx,
            completion_rx,
        }
    }

    pub async fn check_connection(&mut self) {
        self.status = ConnectionStatus::Connecting;
        self.status = if self.dispatcher.backend().health_check().await {
            ConnectionStatus::Connected
        } else {
            ConnectionStatus::Disconnected
        };
        debug!("Backend status: {}", self.status);
    }

    pub fn is_loading(&self) -> bool {
        self.dispatcher.is_loading()
    }

    /// Enter: send the input, open the highlighted chat or pick the
    /// highlighted file, depending on focus.
    pub async fn submit(&mut self) {
        match self.focus {
            Focus::Input => self.send_input().await,
            Focus::Sidebar => self.open_selected_session().await,
            Focus::FileOptions => self.pick_selected_option(),
        }
    }

    async fn send_input(&mut self) {
        if self.is_loading() || self.input.trim().is_empty() {
            return;
        }

        let text = std::mem::take(&mut self.input);
        match self.dispatcher.begin_send(&text).await {
            DispatchStep::Finished(DispatchOutcome::Busy) => {
                self.input = text;
            }
            DispatchStep::Finished(_) => {}
            DispatchStep::Pending(pending) => self.spawn_query(pending),
        }
        self.scroll_to_bottom();
    }

    fn pick_selected_option(&mut self) {
        let Some(option) = self.dispatcher.file_options().get(self.option_index) else {
            return;
        };
        let file_id = option.id.clone();

        if let DispatchStep::Pending(pending) = self.dispatcher.begin_file_selection(&file_id) {
            self.spawn_query(pending);
        }
        self.scroll_to_bottom();
    }

    fn spawn_query(&self, pending: PendingQuery) {
        let backend = self.dispatcher.backend();
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = ChatDispatcher::execute(backend.as_ref(), &pending).await;
            if tx.send((pending, result)).is_err() {
                error!("UI closed before the query completed");
            }
        });
    }

    /// Apply finished backend requests.
    pub async fn process_completions(&mut self) {
        while let Ok((pending, result)) = self.completion_rx.try_recv() {
            let reachable = !matches!(
                result,
                Err(expertbot_client::ClientError::Network(_))
                    | Err(expertbot_client::ClientError::Timeout)
            );
            let outcome = self.dispatcher.complete(pending, result).await;
            debug!("Query completed: {:?}", outcome);

            self.status = match outcome {
                DispatchOutcome::Failed if !reachable => ConnectionStatus::Disconnected,
                DispatchOutcome::Failed => ConnectionStatus::Error,
                _ => ConnectionStatus::Connected,
            };

            if let DispatchOutcome::Disambiguation(_) = outcome {
                self.focus = Focus::FileOptions;
                self.option_index = 0;
            } else if self.focus == Focus::FileOptions {
                self.focus = Focus::Input;
            }
            self.scroll_to_bottom();
        }
    }

    pub async fn new_chat(&mut self) {
        if self.is_loading() {
            return;
        }
        self.dispatcher.new_chat().await;
        self.focus = Focus::Input;
        self.sidebar_index = 0;
        self.scroll_to_bottom();
    }

    async fn open_selected_session(&mut self) {
        if self.is_loading() {
            return;
        }
        let Some(id) = self
            .dispatcher
            .sessions()
            .get(self.sidebar_index)
            .map(|s| s.id.clone())
        else {
            return;
        };

        if self.dispatcher.open_session(&id).await {
            // Saving unsaved work may have prepended an entry.
            self.sidebar_index = self
                .dispatcher
                .sessions()
                .iter()
                .position(|s| s.id == id)
                .unwrap_or(0);
            self.focus = Focus::Input;
            self.scroll_to_bottom();
        }
    }

    pub async fn delete_selected_session(&mut self) {
        if self.focus != Focus::Sidebar || self.is_loading() {
            return;
        }
        let Some(id) = self
            .dispatcher
            .sessions()
            .get(self.sidebar_index)
            .map(|s| s.id.clone())
        else {
            return;
        };

        self.dispatcher.delete_session(&id).await;

        let remaining = self.dispatcher.sessions().len();
        if remaining == 0 {
            self.focus = Focus::Input;
            self.sidebar_index = 0;
        } else {
            self.sidebar_index = self.sidebar_index.min(remaining - 1);
        }
    }

    pub async fn toggle_dark_mode(&mut self) {
        self.dark_mode = !self.dark_mode;
        let store = self.dispatcher.controller().store();
        if let Err(e) = store.save_dark_mode(self.dark_mode).await {
            error!("Failed to save dark mode preference: {}", e);
        }
    }

    /// Tab: input → sidebar → file options → input, skipping empty panes.
    pub fn cycle_focus(&mut self) {
        let has_sessions = !self.dispatcher.sessions().is_empty();
        let has_options = !self.dispatcher.file_options().is_empty();

        self.focus = match self.focus {
            Focus::Input if has_sessions => Focus::Sidebar,
            Focus::Input | Focus::Sidebar if has_options => Focus::FileOptions,
            _ => Focus::Input,
        };
    }

    pub fn move_up(&mut self) {
        match self.focus {
            Focus::Input => self.scroll_back = self.scroll_back.saturating_add(1),
            Focus::Sidebar => self.sidebar_index = self.sidebar_index.saturating_sub(1),
            Focus::FileOptions => self.option_index = self.option_index.saturating_sub(1),
        }
    }

    pub fn move_down(&mut self) {
        match self.focus {
            Focus::Input => self.scroll_back = self.scroll_back.saturating_sub(1),
            Focus::Sidebar => {
                let last = self.dispatcher.sessions().len().saturating_sub(1);
                self.sidebar_index = (self.sidebar_index + 1).min(last);
            }
            Focus::FileOptions => {
                let last = self.dispatcher.file_options().len().saturating_sub(1);
                self.option_index = (self.option_index + 1).min(last);
            }
        }
    }

    pub fn scroll_page_up(&mut self) {
        self.scroll_back = self.scroll_back.saturating_add(10);
    }

    pub fn scroll_page_down(&mut self) {
        self.scroll_back = self.scroll_back.saturating_sub(10);
    }

    pub fn push_input(&mut self, c: char) {
        self.input.push(c);
    }

    pub fn pop_input(&mut self) {
        self.input.pop();
    }

    pub fn on_tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_back = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use expertbot_client::{ExpertBackend, QueryRequest};
    use expertbot_session::{MemorySlotStorage, SessionController, SessionStore, DARK_MODE_SLOT};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;

    struct OfferingBackend;

    #[async_trait]
    impl ExpertBackend for OfferingBackend {
        async fn probe(&self, _request: &QueryRequest) -> expertbot_client::Result<Value> {
            Ok(Value::Null)
        }

        async fn query(&self, request: &QueryRequest) -> expertbot_client::Result<QueryResponse> {
            let body = match request.selected_file {
                Some(_) => json!({"response": "file answer"}),
                None => json!({"file_options": [{"id": "a", "name": "A.pdf"}, {"id": "b", "name": "B.pdf"}]}),
            };
            Ok(serde_json::from_value(body).unwrap())
        }

        async fn health_check(&self) -> bool {
            true
        }
    }

    async fn app() -> (App, Arc<MemorySlotStorage>) {
        let storage = Arc::new(MemorySlotStorage::new());
        let controller = SessionController::open(SessionStore::new(storage.clone())).await;
        let dispatcher = ChatDispatcher::new(
            controller,
            Arc::new(OfferingBackend),
            Box::new(StdRng::seed_from_u64(1)),
        );
        (App::new(dispatcher, false), storage)
    }

    async fn wait_for_completion(app: &mut App) {
        for _ in 0..100 {
            app.process_completions().await;
            if !app.is_loading() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("query never completed");
    }

    fn type_text(app: &mut App, text: &str) {
        text.chars().for_each(|c| app.push_input(c));
    }

    #[tokio::test]
    async fn test_disambiguation_moves_focus_to_options() {
        let (mut app, _) = app().await;
        type_text(&mut app, "transfer rules");
        app.submit().await;
        assert!(app.input.is_empty());
        assert!(app.is_loading());

        wait_for_completion(&mut app).await;
        assert_eq!(app.focus, Focus::FileOptions);
        assert_eq!(app.status, ConnectionStatus::Connected);

        app.move_down();
        app.submit().await;
        wait_for_completion(&mut app).await;

        assert_eq!(app.focus, Focus::Input);
        let contents: Vec<&str> = app
            .dispatcher
            .messages()
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert!(contents.contains(&"You selected: B.pdf"));
        assert_eq!(contents.last(), Some(&"file answer"));
    }

    #[tokio::test]
    async fn test_input_kept_while_loading() {
        let (mut app, _) = app().await;
        type_text(&mut app, "first");
        app.submit().await;

        type_text(&mut app, "second");
        app.submit().await;
        assert_eq!(app.input, "second");

        wait_for_completion(&mut app).await;
    }

    #[tokio::test]
    async fn test_focus_cycle_skips_empty_panes() {
        let (mut app, _) = app().await;
        app.cycle_focus();
        assert_eq!(app.focus, Focus::Input);

        type_text(&mut app, "hello");
        app.submit().await;
        app.cycle_focus();
        assert_eq!(app.focus, Focus::Sidebar);
        app.cycle_focus();
        assert_eq!(app.focus, Focus::Input);
    }

    #[tokio::test]
    async fn test_delete_from_sidebar() {
        let (mut app, _) = app().await;
        type_text(&mut app, "hello");
        app.submit().await;
        assert_eq!(app.dispatcher.sessions().len(), 1);

        app.cycle_focus();
        app.delete_selected_session().await;

        assert!(app.dispatcher.sessions().is_empty());
        assert_eq!(app.focus, Focus::Input);
        assert_eq!(app.dispatcher.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_dark_mode_is_persisted() {
        let (mut app, storage) = app().await;
        app.toggle_dark_mode().await;
        assert!(app.dark_mode);
        assert_eq!(storage.peek(DARK_MODE_SLOT).as_deref(), Some("true"));
    }
}
