/*!
 * Query session.
 *
 * A session owns one backend connection, the translator, the relationship
 * hints and the confirmation gate. Callers hold the session explicitly and
 * pass it through each step:
 *
 * 1. `prepare` rediscovers the schema, translates the question and
 *    classifies the result
 * 2. `confirm` arms the gate for the most recently prepared statement;
 *    statements superseded by a later `prepare` cannot be confirmed
 * 3. `execute` runs the prepared statement, consuming any confirmation
 *
 * `close` releases the connection and must be called on every exit path.
 */

use log::{info, warn};
use std::sync::Arc;
use uuid::Uuid;

use crate::app_config::{Config, EngineKind};
use crate::backend::{self, Backend};
use crate::errors::{ConnectionError, ExecutionError, SchemaError, SessionError, TranslationError};
use crate::executor::{self, RunOutcome};
use crate::providers::Provider;
use crate::safety::{classify, ConfirmationGate, StatementClass};
use crate::schema::{self, hints, RelationshipHint, Schema, SchemaText};
use crate::translator::{GeneratedStatement, TranslationRequest, Translator, TranslatorOptions};

/// Per-session discovery settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Rows sampled per table during discovery
    pub sample_rows: usize,
    /// Reject hints that do not match the discovered schema
    pub validate_hints: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            sample_rows: schema::DEFAULT_SAMPLE_ROWS,
            validate_hints: false,
        }
    }
}

/// A translated, classified statement ready to run
#[derive(Debug)]
pub struct PreparedQuery {
    /// The question as asked
    pub question: String,
    /// Schema text the translation was based on
    pub schema_text: SchemaText,
    /// Translator output
    pub statement: GeneratedStatement,
    /// Read-only or mutating
    pub class: StatementClass,
    /// Discovery failure, if the schema had to be left empty
    pub schema_error: Option<SchemaError>,
}

impl PreparedQuery {
    pub fn sql(&self) -> &str {
        self.statement.sql()
    }

    pub fn is_mutating(&self) -> bool {
        self.class.is_mutating()
    }
}

/// Explicit state for one user's conversation with a database
#[derive(Debug)]
pub struct QuerySession {
    backend: Box<dyn Backend>,
    translator: Translator,
    hints: Vec<RelationshipHint>,
    options: SessionOptions,
    gate: ConfirmationGate,
    /// Id of the statement returned by the latest `prepare`
    current: Option<Uuid>,
}

impl QuerySession {
    /// Create a session over an open backend
    pub fn new(
        backend: Box<dyn Backend>,
        translator: Translator,
        hints: Vec<RelationshipHint>,
        options: SessionOptions,
    ) -> Self {
        Self {
            backend,
            translator,
            hints,
            options,
            gate: ConfirmationGate::new(),
            current: None,
        }
    }

    /// Connect the configured backend and build a session around it
    pub async fn connect(config: &Config, provider: Arc<dyn Provider>) -> Result<Self, ConnectionError> {
        let backend = backend::connect(&config.backend).await?;
        let translator = Translator::new(
            provider,
            config.backend.engine,
            TranslatorOptions::from_config(&config.generation),
        );
        let hints = config.schema.hints.iter().map(RelationshipHint::new).collect();
        let options = SessionOptions {
            sample_rows: config.schema.sample_rows,
            validate_hints: config.schema.validate_hints,
        };

        info!("Session opened on {}", config.backend.engine);
        Ok(Self::new(backend, translator, hints, options))
    }

    pub fn engine(&self) -> EngineKind {
        self.backend.engine()
    }

    pub fn hints(&self) -> &[RelationshipHint] {
        &self.hints
    }

    /// Replace the relationship hints used for later questions
    pub fn set_hints(&mut self, hints: Vec<RelationshipHint>) {
        self.hints = hints;
    }

    /// Direct access to the connection, for ingestion
    pub fn backend_mut(&mut self) -> &mut dyn Backend {
        self.backend.as_mut()
    }

    /// Check that the text-generation provider is reachable
    pub async fn check_provider(&self) -> Result<(), TranslationError> {
        self.translator.check_provider().await
    }

    /// Discover the current schema
    pub async fn schema(&mut self) -> Result<Schema, SchemaError> {
        schema::discover(self.backend.as_mut(), self.options.sample_rows).await
    }

    /// Translate and classify a question
    ///
    /// Any confirmation given for an earlier statement is dropped first.
    pub async fn prepare(&mut self, question: &str, details: Option<&str>) -> Result<PreparedQuery, SessionError> {
        self.gate.reset();
        self.current = None;

        let (schema, schema_error) = match self.schema().await {
            Ok(schema) => (schema, None),
            Err(e) => {
                warn!("Schema discovery failed, continuing with an empty schema: {}", e);
                (Schema::new(), Some(e))
            }
        };

        if self.options.validate_hints {
            if schema_error.is_none() {
                hints::validate_all(&self.hints, &schema)?;
            } else {
                warn!("Skipping hint validation without a discovered schema");
            }
        }

        let schema_text = schema::merge(&schema, &self.hints);
        let request = TranslationRequest::new(question, schema_text.as_str())
            .with_details(details.map(str::to_string));
        let statement = self.translator.translate(&request).await?;
        let class = classify(statement.sql());
        info!("Statement {} classified as {}", statement.id(), class);
        self.current = Some(statement.id());

        Ok(PreparedQuery {
            question: question.to_string(),
            schema_text,
            statement,
            class,
            schema_error,
        })
    }

    /// Confirm a prepared statement for one execution
    ///
    /// Only the latest prepared statement can be confirmed.
    pub fn confirm(&mut self, prepared: &PreparedQuery) {
        if self.current != Some(prepared.statement.id()) {
            warn!("Ignoring confirmation for superseded statement {}", prepared.statement.id());
            return;
        }
        self.gate.confirm(&prepared.statement);
    }

    /// Run a prepared statement
    ///
    /// Mutating statements run only when confirmed since the last `prepare`;
    /// otherwise the outcome is `AwaitingConfirmation`.
    pub async fn execute(&mut self, prepared: &PreparedQuery) -> Result<RunOutcome, ExecutionError> {
        let confirmed = self.gate.take(&prepared.statement);
        executor::run(self.backend.as_mut(), &prepared.statement, prepared.class, confirmed).await
    }

    /// Prepare and execute in one step
    pub async fn ask(&mut self, question: &str, details: Option<&str>) -> Result<(PreparedQuery, RunOutcome), SessionError> {
        let prepared = self.prepare(question, details).await?;
        let outcome = self.execute(&prepared).await?;
        Ok((prepared, outcome))
    }

    /// Release the connection
    pub async fn close(&mut self) -> Result<(), ConnectionError> {
        self.gate.reset();
        self.current = None;
        self.backend.close().await
    }
}
