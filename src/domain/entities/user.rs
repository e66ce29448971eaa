use serde::{Deserialize, Serialize};

use crate::domain::tracking::Trackable;
use crate::domain::value_objects::Actor;

/// Staff or admin account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Never part of any snapshot
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
}

impl User {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            roles: Vec::new(),
            password_hash: None,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Acting identity for this account; `None` until persisted
    pub fn as_actor(&self) -> Option<Actor> {
        self.id.map(|id| {
            Actor::new(id, self.email.clone())
                .with_display_name(self.full_name())
                .with_roles(self.roles.clone())
        })
    }
}

impl Trackable for User {
    const ENTITY_TYPE: &'static str = "User";

    fn entity_id(&self) -> Option<i64> {
        self.id
    }
}
