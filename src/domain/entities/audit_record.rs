use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Actor, ActorContext, AuditAction, Snapshot};

/// Width of the `VARCHAR` columns of `activity_logs`
pub const MAX_COLUMN_CHARS: usize = 255;

/// Cut `value` to at most `max` characters, never splitting a character
fn clip(mut value: String, max: usize) -> String {
    if let Some((end, _)) = value.char_indices().nth(max) {
        value.truncate(end);
    }
    value
}

/// Data structure for reconstructing audit records from the database
#[derive(Debug, Clone)]
pub struct AuditRecordDbData {
    pub id: i64,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: Option<i64>,
    pub entity_name: Option<String>,
    pub user_id: Option<i64>,
    pub user_email: Option<String>,
    pub description: Option<String>,
    pub old_data: Option<Snapshot>,
    pub new_data: Option<Snapshot>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One append-only entry of the activity trail.
///
/// Records are built once through [`AuditRecordBuilder`] and never mutated;
/// the only change after construction is the surrogate id assigned by the
/// repository on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    id: Option<i64>,
    action: AuditAction,
    entity_type: String,
    entity_id: Option<i64>,
    entity_name: Option<String>,
    user_id: Option<i64>,
    user_email: Option<String>,
    description: Option<String>,
    old_data: Option<Snapshot>,
    new_data: Option<Snapshot>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    created_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn builder(action: AuditAction, entity_type: impl Into<String>) -> AuditRecordBuilder {
        AuditRecordBuilder::new(action, entity_type)
    }

    /// Reconstruct from database data (used by repository)
    pub fn from_db(db_data: AuditRecordDbData) -> Self {
        Self {
            id: Some(db_data.id),
            action: db_data.action,
            entity_type: db_data.entity_type,
            entity_id: db_data.entity_id,
            entity_name: db_data.entity_name,
            user_id: db_data.user_id,
            user_email: db_data.user_email,
            description: db_data.description,
            old_data: db_data.old_data,
            new_data: db_data.new_data,
            ip_address: db_data.ip_address,
            user_agent: db_data.user_agent,
            created_at: db_data.created_at,
        }
    }

    /// Attach the id assigned on insert
    pub fn persisted(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    // Getters
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn action(&self) -> &AuditAction {
        &self.action
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn entity_id(&self) -> Option<i64> {
        self.entity_id
    }

    pub fn entity_name(&self) -> Option<&str> {
        self.entity_name.as_deref()
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user_id
    }

    pub fn user_email(&self) -> Option<&str> {
        self.user_email.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn old_data(&self) -> Option<&Snapshot> {
        self.old_data.as_ref()
    }

    pub fn new_data(&self) -> Option<&Snapshot> {
        self.new_data.as_ref()
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    pub fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }

    /// Case-insensitive substring match over the searchable columns
    pub fn matches_term(&self, term: &str) -> bool {
        let needle = term.to_lowercase();
        let haystacks = [
            Some(self.action.as_str()),
            Some(self.entity_type.as_str()),
            self.description.as_deref(),
            self.entity_name.as_deref(),
            self.user_email.as_deref(),
        ];
        haystacks
            .into_iter()
            .flatten()
            .any(|value| value.to_lowercase().contains(&needle))
    }
}

/// Builder for new audit records
#[derive(Debug, Clone)]
pub struct AuditRecordBuilder {
    action: AuditAction,
    entity_type: String,
    entity_id: Option<i64>,
    entity_name: Option<String>,
    user_id: Option<i64>,
    user_email: Option<String>,
    description: Option<String>,
    old_data: Option<Snapshot>,
    new_data: Option<Snapshot>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

impl AuditRecordBuilder {
    fn new(action: AuditAction, entity_type: impl Into<String>) -> Self {
        Self {
            action,
            entity_type: entity_type.into(),
            entity_id: None,
            entity_name: None,
            user_id: None,
            user_email: None,
            description: None,
            old_data: None,
            new_data: None,
            ip_address: None,
            user_agent: None,
            created_at: None,
        }
    }

    pub fn entity_id(mut self, entity_id: Option<i64>) -> Self {
        self.entity_id = entity_id;
        self
    }

    pub fn entity_name(mut self, entity_name: Option<String>) -> Self {
        self.entity_name = entity_name;
        self
    }

    /// Acting user; also snapshots the email so the record stays readable
    /// after the account is gone
    pub fn user(mut self, user: Option<&Actor>) -> Self {
        self.user_id = user.map(|u| u.id);
        self.user_email = user.map(|u| u.email.clone());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn old_data(mut self, old_data: Option<Snapshot>) -> Self {
        self.old_data = old_data;
        self
    }

    pub fn new_data(mut self, new_data: Option<Snapshot>) -> Self {
        self.new_data = new_data;
        self
    }

    /// Copy identity and request attributes from the acting context
    pub fn context(self, ctx: &ActorContext) -> Self {
        let ip_address = ctx.ip_address().map(str::to_string);
        let user_agent = ctx.user_agent().map(str::to_string);
        let mut builder = self.user(ctx.identity.as_ref());
        builder.ip_address = ip_address;
        builder.user_agent = user_agent;
        builder
    }

    /// Request attributes only (identity set separately)
    pub fn request_of(mut self, ctx: &ActorContext) -> Self {
        self.ip_address = ctx.ip_address().map(str::to_string);
        self.user_agent = ctx.user_agent().map(str::to_string);
        self
    }

    /// Override the construction timestamp (imports and fixtures)
    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Finish the record. Values bound for the `VARCHAR` columns are clipped
    /// to [`MAX_COLUMN_CHARS`] so an oversized input cannot fail the insert.
    pub fn build(self) -> AuditRecord {
        let bounded = |value: Option<String>| value.map(|v| clip(v, MAX_COLUMN_CHARS));
        let action = match self.action {
            AuditAction::Other(value) => AuditAction::Other(clip(value, MAX_COLUMN_CHARS)),
            known => known,
        };
        AuditRecord {
            id: None,
            action,
            entity_type: clip(self.entity_type, MAX_COLUMN_CHARS),
            entity_id: self.entity_id,
            entity_name: bounded(self.entity_name),
            user_id: self.user_id,
            user_email: bounded(self.user_email),
            description: self.description,
            old_data: self.old_data,
            new_data: self.new_data,
            ip_address: bounded(self.ip_address),
            user_agent: self.user_agent,
            created_at: self.created_at.unwrap_or_else(Utc::now),
        }
    }
}
