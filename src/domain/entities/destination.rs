use serde::{Deserialize, Serialize};

use crate::domain::tracking::Trackable;

/// Travel destination managed from the admin screens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub id: Option<i64>,
    pub name: String,
    pub location: String,
    pub description: Option<String>,
    pub image: Option<String>,
    /// Email of the staff member who created it
    pub created_by: Option<String>,
}

impl Destination {
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            location: location.into(),
            description: None,
            image: None,
            created_by: None,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_created_by(mut self, email: impl Into<String>) -> Self {
        self.created_by = Some(email.into());
        self
    }
}

impl Trackable for Destination {
    const ENTITY_TYPE: &'static str = "Destination";

    fn entity_id(&self) -> Option<i64> {
        self.id
    }
}
