use ragdash_core::{
    ActionOutcome, BackendClient, BackendStatus, ChatSession, Cluster, Config, Fetch, IngestReport,
    PipelineConfig, Sentiment, Task, TimePoint,
};
use ratatui::widgets::TableState;

use crate::input::LineInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Dashboard,
    Chat,
    Analytics,
    Documents,
    Settings,
}

impl Screen {
    pub const ALL: [Screen; 5] = [
        Screen::Dashboard,
        Screen::Chat,
        Screen::Analytics,
        Screen::Documents,
        Screen::Settings,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Screen::Dashboard => "Dashboard",
            Screen::Chat => "Chat",
            Screen::Analytics => "Analytics",
            Screen::Documents => "Documents",
            Screen::Settings => "Settings",
        }
    }

    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).unwrap_or(0)
    }

    pub fn next(&self) -> Screen {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(&self) -> Screen {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Editable fields on the settings screen, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    EmbeddingModel,
    VectorDb,
    LlmModel,
    IngestPath,
}

impl SettingsField {
    pub const ALL: [SettingsField; 4] = [
        SettingsField::EmbeddingModel,
        SettingsField::VectorDb,
        SettingsField::LlmModel,
        SettingsField::IngestPath,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SettingsField::EmbeddingModel => "Embedding model",
            SettingsField::VectorDb => "Vector DB",
            SettingsField::LlmModel => "LLM model",
            SettingsField::IngestPath => "Ingest folder",
        }
    }
}

pub struct DashboardView {
    pub status: Fetch<BackendStatus>,
    pub sentiment: Fetch<Sentiment>,
    pub timeseries: Fetch<Vec<TimePoint>>,
}

pub struct ChatView {
    pub session: ChatSession,
    pub input: LineInput,
    pub scroll: u16,
    /// Keep the newest message in view; cleared by manual scrolling
    pub follow: bool,
    pub max_scroll: u16,
}

pub struct AnalyticsView {
    pub clusters: Fetch<Vec<Cluster>>,
    pub sentiment: Fetch<Sentiment>,
    pub timeseries: Fetch<Vec<TimePoint>>,
    pub cluster_state: TableState,
}

pub struct DocumentsView {
    pub status: Fetch<BackendStatus>,
    pub scroll: u16,
}

pub struct SettingsView {
    pub status: Fetch<BackendStatus>,
    pub fields: [LineInput; 4],
    pub selected: usize,
    /// Pipeline fields are filled from `/api/status` once, on first load
    pub prefilled: bool,
    pub ingest: Task<IngestReport>,
    pub ingest_outcome: Option<ActionOutcome>,
    pub config_update: Task<PipelineConfig>,
}

impl SettingsView {
    pub fn selected_field(&self) -> SettingsField {
        SettingsField::ALL[self.selected.min(SettingsField::ALL.len() - 1)]
    }

    pub fn field(&self, field: SettingsField) -> &LineInput {
        &self.fields[field as usize]
    }

    pub fn field_mut(&mut self, field: SettingsField) -> &mut LineInput {
        &mut self.fields[field as usize]
    }

    /// Pipeline config from the form; blank fields are left unset
    pub fn pipeline_config(&self) -> PipelineConfig {
        let value = |field: SettingsField| {
            let text = self.field(field).text.trim();
            (!text.is_empty()).then(|| text.to_string())
        };
        PipelineConfig {
            embedding_model: value(SettingsField::EmbeddingModel),
            vector_db: value(SettingsField::VectorDb),
            llm_model: value(SettingsField::LlmModel),
        }
    }

    fn prefill(&mut self, config: &PipelineConfig) {
        let pairs = [
            (SettingsField::EmbeddingModel, &config.embedding_model),
            (SettingsField::VectorDb, &config.vector_db),
            (SettingsField::LlmModel, &config.llm_model),
        ];
        for (field, value) in pairs {
            if let Some(value) = value {
                *self.field_mut(field) = LineInput::with_text(value);
            }
        }
        self.prefilled = true;
    }
}

/// View-local state of the active screen. Leaving a screen drops its state.
pub enum View {
    Dashboard(DashboardView),
    Chat(ChatView),
    Analytics(AnalyticsView),
    Documents(DocumentsView),
    Settings(SettingsView),
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub view: View,

    // Backend
    pub client: BackendClient,
    pub use_hyde: bool,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    /// Blocking alert; any key dismisses it
    pub notice: Option<ActionOutcome>,
}

impl App {
    /// Build the app and activate the dashboard. Must run inside a tokio runtime.
    pub fn new(client: BackendClient, config: &Config) -> Self {
        let view = activate(Screen::Dashboard, &client, config.use_hyde());
        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            view,
            client,
            use_hyde: config.use_hyde(),
            animation_frame: 0,
            notice: None,
        }
    }

    pub fn screen(&self) -> Screen {
        match self.view {
            View::Dashboard(_) => Screen::Dashboard,
            View::Chat(_) => Screen::Chat,
            View::Analytics(_) => Screen::Analytics,
            View::Documents(_) => Screen::Documents,
            View::Settings(_) => Screen::Settings,
        }
    }

    /// Switch to `screen`, discarding the current view's state and issuing
    /// the new view's fetches. Switching to the current screen reloads it.
    pub fn switch_to(&mut self, screen: Screen) {
        tracing::debug!(from = self.screen().title(), to = screen.title(), "switching screen");
        self.input_mode = InputMode::Normal;
        self.view = activate(screen, &self.client, self.use_hyde);
    }

    pub fn reload(&mut self) {
        self.switch_to(self.screen());
    }

    pub fn is_busy(&self) -> bool {
        match &self.view {
            View::Dashboard(v) => {
                v.status.state().is_loading() || v.sentiment.state().is_loading() || v.timeseries.state().is_loading()
            }
            View::Chat(v) => v.session.is_pending(),
            View::Analytics(v) => {
                v.clusters.state().is_loading() || v.sentiment.state().is_loading() || v.timeseries.state().is_loading()
            }
            View::Documents(v) => v.status.state().is_loading(),
            View::Settings(v) => {
                v.status.state().is_loading() || v.ingest.is_running() || v.config_update.is_running()
            }
        }
    }

    /// Reconcile any finished background requests into view state.
    /// Returns true if anything changed.
    pub async fn poll_tasks(&mut self) -> bool {
        match &mut self.view {
            View::Dashboard(v) => {
                let a = v.status.poll().await;
                let b = v.sentiment.poll().await;
                let c = v.timeseries.poll().await;
                a || b || c
            }
            View::Chat(v) => {
                let changed = v.session.poll().await;
                if changed {
                    v.follow = true;
                }
                changed
            }
            View::Analytics(v) => {
                let a = v.clusters.poll().await;
                let b = v.sentiment.poll().await;
                let c = v.timeseries.poll().await;
                if a && v.clusters.ready().is_some_and(|c| !c.is_empty()) {
                    v.cluster_state.select(Some(0));
                }
                a || b || c
            }
            View::Documents(v) => v.status.poll().await,
            View::Settings(v) => {
                let mut changed = v.status.poll().await;
                if changed && !v.prefilled {
                    if let Some(status) = v.status.ready().cloned() {
                        v.prefill(&status.config);
                    }
                }
                if let Some(result) = v.ingest.poll().await {
                    v.ingest_outcome = Some(ActionOutcome::from_result(result, describe_ingest));
                    changed = true;
                }
                if let Some(result) = v.config_update.poll().await {
                    self.notice = Some(ActionOutcome::from_result(result, describe_config));
                    changed = true;
                }
                changed
            }
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Send the chat input line, if the chat screen is active
    pub fn submit_chat(&mut self) -> bool {
        let View::Chat(chat) = &mut self.view else {
            return false;
        };
        let sent = chat.session.submit(&mut chat.input.text);
        chat.input.sync_cursor();
        if sent {
            chat.follow = true;
        }
        sent
    }

    /// Abort the in-flight chat request
    pub fn cancel_chat(&mut self) -> bool {
        match &mut self.view {
            View::Chat(chat) => chat.session.cancel(),
            _ => false,
        }
    }

    pub fn start_ingest(&mut self) -> bool {
        let View::Settings(settings) = &mut self.view else {
            return false;
        };
        if settings.ingest.is_running() {
            return false;
        }
        let path = settings.field(SettingsField::IngestPath).text.trim().to_string();
        tracing::info!(%path, "starting ingest");
        let client = self.client.clone();
        settings.ingest = Task::spawn(async move { client.ingest(&path).await });
        settings.ingest_outcome = None;
        true
    }

    pub fn start_config_update(&mut self) -> bool {
        let View::Settings(settings) = &mut self.view else {
            return false;
        };
        if settings.config_update.is_running() {
            return false;
        }
        let config = settings.pipeline_config();
        tracing::info!(?config, "updating pipeline config");
        let client = self.client.clone();
        settings.config_update = Task::spawn(async move { client.update_config(&config).await });
        true
    }

    /// Flip HyDE retrieval for new chat sessions and persist the choice
    pub fn toggle_hyde(&mut self) {
        self.use_hyde = !self.use_hyde;
        if let Err(err) = Config::save_use_hyde(self.use_hyde) {
            tracing::warn!(error = %err, "could not save config");
        }
    }
}

/// Build a fresh view for `screen` and issue its fetches
pub fn activate(screen: Screen, client: &BackendClient, use_hyde: bool) -> View {
    match screen {
        Screen::Dashboard => View::Dashboard(DashboardView {
            status: fetch_status(client),
            sentiment: fetch_sentiment(client),
            timeseries: fetch_timeseries(client),
        }),
        Screen::Chat => View::Chat(ChatView {
            session: ChatSession::new(client.clone(), use_hyde),
            input: LineInput::default(),
            scroll: 0,
            follow: true,
            max_scroll: 0,
        }),
        Screen::Analytics => View::Analytics(AnalyticsView {
            clusters: {
                let client = client.clone();
                Fetch::spawn(async move { client.clusters().await })
            },
            sentiment: fetch_sentiment(client),
            timeseries: fetch_timeseries(client),
            cluster_state: TableState::default(),
        }),
        Screen::Documents => View::Documents(DocumentsView {
            status: fetch_status(client),
            scroll: 0,
        }),
        Screen::Settings => View::Settings(SettingsView {
            status: fetch_status(client),
            fields: Default::default(),
            selected: 0,
            prefilled: false,
            ingest: Task::default(),
            ingest_outcome: None,
            config_update: Task::default(),
        }),
    }
}

fn fetch_status(client: &BackendClient) -> Fetch<BackendStatus> {
    let client = client.clone();
    Fetch::spawn(async move { client.status().await })
}

fn fetch_sentiment(client: &BackendClient) -> Fetch<Sentiment> {
    let client = client.clone();
    Fetch::spawn(async move { client.sentiment().await })
}

fn fetch_timeseries(client: &BackendClient) -> Fetch<Vec<TimePoint>> {
    let client = client.clone();
    Fetch::spawn(async move { client.timeseries().await })
}

pub fn describe_ingest(report: IngestReport) -> String {
    match report.summary() {
        Some(summary) => format!("Ingestion complete. {}", summary),
        None => "Ingestion complete.".to_string(),
    }
}

pub fn describe_config(config: PipelineConfig) -> String {
    let parts: Vec<String> = [
        ("embedding", &config.embedding_model),
        ("vector db", &config.vector_db),
        ("llm", &config.llm_model),
    ]
    .into_iter()
    .filter_map(|(label, value)| value.as_ref().map(|v| format!("{}: {}", label, v)))
    .collect();

    if parts.is_empty() {
        "Configuration updated.".to_string()
    } else {
        format!("Configuration updated ({}).", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_screen_cycle() {
        assert_eq!(Screen::Dashboard.next(), Screen::Chat);
        assert_eq!(Screen::Settings.next(), Screen::Dashboard);
        assert_eq!(Screen::Dashboard.prev(), Screen::Settings);
        assert_eq!(Screen::Analytics.index(), 2);
    }

    #[test]
    fn test_describe_ingest() {
        assert_eq!(describe_ingest(IngestReport::default()), "Ingestion complete.");
        let report = IngestReport { stats: Some(json!({"docs_added": 2})) };
        assert_eq!(describe_ingest(report), "Ingestion complete. docs_added: 2");
    }

    #[test]
    fn test_describe_config() {
        assert_eq!(describe_config(PipelineConfig::default()), "Configuration updated.");
        let config = PipelineConfig {
            llm_model: Some("bling-phi-3-gguf".to_string()),
            ..Default::default()
        };
        assert_eq!(describe_config(config), "Configuration updated (llm: bling-phi-3-gguf).");
    }

    #[tokio::test]
    async fn test_switching_drops_chat_transcript() {
        let client = BackendClient::new("http://127.0.0.1:9");
        let mut app = App::new(client, &Config::new());
        assert_eq!(app.screen(), Screen::Dashboard);

        app.switch_to(Screen::Chat);
        if let View::Chat(chat) = &mut app.view {
            chat.input = LineInput::with_text("hello");
        }
        assert!(app.submit_chat());
        assert!(app.cancel_chat());

        app.switch_to(Screen::Analytics);
        app.switch_to(Screen::Chat);
        let View::Chat(chat) = &app.view else {
            panic!("expected chat view");
        };
        assert!(chat.session.store().is_empty());
    }

    #[tokio::test]
    async fn test_settings_form_to_pipeline_config() {
        let client = BackendClient::new("http://127.0.0.1:9");
        let View::Settings(mut settings) = activate(Screen::Settings, &client, false) else {
            panic!("expected settings view");
        };
        settings.prefill(&PipelineConfig {
            embedding_model: Some("mini-lm-sbert".to_string()),
            vector_db: None,
            llm_model: Some("bling-phi-3-gguf".to_string()),
        });
        *settings.field_mut(SettingsField::VectorDb) = LineInput::with_text("  chromadb ");

        let config = settings.pipeline_config();
        assert_eq!(config.embedding_model.as_deref(), Some("mini-lm-sbert"));
        assert_eq!(config.vector_db.as_deref(), Some("chromadb"));
        assert_eq!(config.llm_model.as_deref(), Some("bling-phi-3-gguf"));
        assert!(settings.prefilled);
    }
}
