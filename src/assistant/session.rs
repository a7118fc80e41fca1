use crate::assistant::extract_sql;
use crate::assistant::history::{
    fixed_question, QueryHistory, QueryHistoryEntry, FIXED_EXPLANATION, MANUAL_EXPLANATION, MANUAL_QUESTION,
};
use crate::config::AnalysisSettings;
use crate::db::{Backend, QueryResult};
use crate::error::{AssistantError, Result};
use crate::llm::prompts::{error_explanation_prompt, result_explanation_prompt, sql_generation_prompt};
use crate::llm::CompletionModel;
use crate::schema::{build_snapshot, describe_schema, render_model_brief, SchemaSnapshot};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Generating,
    Generated,
    Executing,
    Succeeded,
    Failed,
    Editing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Generating => "generating",
            Phase::Generated => "generated",
            Phase::Executing => "executing",
            Phase::Succeeded => "succeeded",
            Phase::Failed => "failed",
            Phase::Editing => "editing",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Explanation {
    Text(String),
    /// The model could not be reached; carries the transport error.
    Unavailable(String),
}

impl Explanation {
    pub fn as_text(&self) -> String {
        match self {
            Explanation::Text(text) => text.clone(),
            Explanation::Unavailable(reason) => format!("Explanation unavailable: {}", reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Answer {
    pub sql: String,
    pub result: QueryResult,
    pub explanation: Explanation,
}

#[derive(Debug, Clone)]
pub struct Failure {
    pub question: String,
    pub sql: String,
    pub error: String,
    pub explanation: Explanation,
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Succeeded(Answer),
    Failed(Failure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Generated,
    Manual,
    Fixed,
}

/// Per-user state owned by the caller and handed to every [`Assistant`] call.
#[derive(Debug, Default)]
pub struct Session {
    phase: Phase,
    trail: Vec<Phase>,
    snapshot: Option<SchemaSnapshot>,
    description: String,
    brief: String,
    history: QueryHistory,
    failure: Option<Failure>,
    last_raw_response: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Phases entered since the current question or query started.
    pub fn phase_trail(&self) -> &[Phase] {
        &self.trail
    }

    pub fn snapshot(&self) -> Option<&SchemaSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn brief(&self) -> &str {
        &self.brief
    }

    pub fn history(&self) -> &QueryHistory {
        &self.history
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    pub fn last_raw_response(&self) -> Option<&str> {
        self.last_raw_response.as_deref()
    }

    fn set_phase(&mut self, phase: Phase) {
        tracing::debug!("phase {} -> {}", self.phase, phase);
        self.phase = phase;
        self.trail.push(phase);
    }

    fn start(&mut self, phase: Phase) {
        self.trail.clear();
        self.set_phase(phase);
    }

    fn require(&self, allowed: &[Phase], action: &str) -> Result<()> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(AssistantError::InvalidTransition {
                phase: self.phase.to_string(),
                action: action.to_string(),
            })
        }
    }
}

const START_PHASES: &[Phase] = &[Phase::Idle, Phase::Succeeded, Phase::Failed, Phase::Editing];

/// Drives one database and one model through the question/answer flow.
/// Stages run strictly one after another; nothing is retried without the
/// caller asking for it.
pub struct Assistant<B: Backend, M: CompletionModel> {
    backend: B,
    model: M,
    settings: AnalysisSettings,
}

impl<B: Backend, M: CompletionModel> Assistant<B, M> {
    pub fn new(backend: B, model: M, settings: AnalysisSettings) -> Self {
        Self {
            backend,
            model,
            settings,
        }
    }

    #[cfg(test)]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[cfg(test)]
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Scans the schema and replaces the session's snapshot and renderings.
    pub async fn analyze(&mut self, session: &mut Session) -> Result<()> {
        self.ensure_connection().await?;
        let snapshot = build_snapshot(&self.backend, self.settings.sample_limit).await?;
        session.description = describe_schema(&snapshot);
        session.brief = render_model_brief(&snapshot);
        session.snapshot = Some(snapshot);
        Ok(())
    }

    /// Generates SQL for `question`, runs it and explains the outcome.
    pub async fn ask(&mut self, session: &mut Session, question: &str) -> Result<Outcome> {
        session.require(START_PHASES, "ask a question")?;
        if session.snapshot.is_none() {
            return Err(AssistantError::NotAnalyzed);
        }

        session.start(Phase::Generating);
        session.failure = None;
        tracing::info!("generating SQL for: {}", question);

        let prompt = sql_generation_prompt(&session.brief, question);
        let raw = match self.model.complete(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                session.set_phase(Phase::Idle);
                return Err(e);
            }
        };
        session.set_phase(Phase::Generated);

        let sql = extract_sql(&raw);
        session.last_raw_response = Some(raw);
        if sql.trim().is_empty() {
            session.set_phase(Phase::Idle);
            return Err(AssistantError::ExtractionEmpty {
                raw: session.last_raw_response.clone().unwrap_or_default(),
            });
        }

        self.execute(session, question, &sql, Origin::Generated).await
    }

    /// Enters the editing step after a failure and returns the SQL to edit.
    pub fn begin_edit(&self, session: &mut Session) -> Result<String> {
        session.require(&[Phase::Failed], "edit the query")?;
        let sql = session
            .failure
            .as_ref()
            .map(|f| f.sql.clone())
            .ok_or_else(|| AssistantError::InvalidTransition {
                phase: session.phase.to_string(),
                action: "edit the query".to_string(),
            })?;
        session.set_phase(Phase::Editing);
        Ok(sql)
    }

    /// Runs the user's replacement for the failed query.
    pub async fn submit_fix(&mut self, session: &mut Session, sql: &str) -> Result<Outcome> {
        session.require(&[Phase::Editing], "submit a fix")?;
        if sql.trim().is_empty() {
            return Err(AssistantError::EmptyQuery);
        }
        let question = session
            .failure
            .as_ref()
            .map(|f| f.question.clone())
            .unwrap_or_else(|| MANUAL_QUESTION.to_string());

        self.execute(session, &question, sql.trim(), Origin::Fixed).await
    }

    /// Runs user-entered SQL without involving the model.
    pub async fn run_manual(&mut self, session: &mut Session, sql: &str) -> Result<Outcome> {
        session.require(START_PHASES, "run a query")?;
        if sql.trim().is_empty() {
            return Err(AssistantError::EmptyQuery);
        }
        session.trail.clear();
        session.failure = None;

        self.execute(session, MANUAL_QUESTION, sql.trim(), Origin::Manual).await
    }

    /// Re-runs a past query; `index` counts from the most recent entry.
    pub async fn replay(&mut self, session: &mut Session, index: usize) -> Result<Outcome> {
        let sql = session
            .history
            .get(index)
            .map(|entry| entry.sql.clone())
            .ok_or(AssistantError::HistoryEntryMissing {
                index,
                len: session.history.len(),
            })?;
        self.run_manual(session, &sql).await
    }

    async fn ensure_connection(&mut self) -> Result<()> {
        if self.backend.ping().await {
            return Ok(());
        }

        tracing::warn!("database connection lost, reconnecting");
        self.backend.reconnect().await.map_err(|e| match e {
            AssistantError::Connection(message) => {
                AssistantError::Connection(format!("could not reconnect: {}", message))
            }
            other => AssistantError::Connection(format!("could not reconnect: {}", other)),
        })
    }

    async fn execute(&mut self, session: &mut Session, question: &str, sql: &str, origin: Origin) -> Result<Outcome> {
        session.set_phase(Phase::Executing);

        if let Err(e) = self.ensure_connection().await {
            session.set_phase(Phase::Idle);
            return Err(e);
        }

        let recorded_question = match origin {
            Origin::Generated => question.to_string(),
            Origin::Manual => MANUAL_QUESTION.to_string(),
            Origin::Fixed => fixed_question(question),
        };

        match self.backend.execute(sql).await {
            Ok(result) => {
                session.set_phase(Phase::Succeeded);
                tracing::info!("query returned {} rows", result.row_count());

                let explanation = match origin {
                    Origin::Generated => self.explain_result(question, sql, &result).await,
                    Origin::Manual => Explanation::Text(MANUAL_EXPLANATION.to_string()),
                    Origin::Fixed => Explanation::Text(FIXED_EXPLANATION.to_string()),
                };

                session.history.push(QueryHistoryEntry::new(
                    &recorded_question,
                    sql,
                    result.row_count(),
                    &explanation.as_text(),
                    None,
                ));
                session.failure = None;

                Ok(Outcome::Succeeded(Answer {
                    sql: sql.to_string(),
                    result,
                    explanation,
                }))
            }
            Err(AssistantError::QueryExecution { message, .. }) => {
                session.set_phase(Phase::Failed);
                tracing::warn!("query failed: {}", message);

                let explanation = self.explain_error(question, sql, &message).await;
                session.history.push(QueryHistoryEntry::new(
                    &recorded_question,
                    sql,
                    0,
                    &explanation.as_text(),
                    Some(message.clone()),
                ));

                let failure = Failure {
                    question: question.to_string(),
                    sql: sql.to_string(),
                    error: message,
                    explanation,
                };
                session.failure = Some(failure.clone());
                Ok(Outcome::Failed(failure))
            }
            Err(other) => {
                session.set_phase(Phase::Idle);
                Err(other)
            }
        }
    }

    async fn explain_result(&self, question: &str, sql: &str, result: &QueryResult) -> Explanation {
        let prompt = result_explanation_prompt(question, sql, result, self.settings.explain_row_limit);
        self.explain(&prompt).await
    }

    async fn explain_error(&self, question: &str, sql: &str, error: &str) -> Explanation {
        self.explain(&error_explanation_prompt(question, sql, error)).await
    }

    async fn explain(&self, prompt: &str) -> Explanation {
        match self.model.complete(prompt).await {
            Ok(text) => Explanation::Text(text.trim().to_string()),
            Err(e) => {
                tracing::warn!("explanation failed: {}", e);
                Explanation::Unavailable(e.to_string())
            }
        }
    }
}
