use serde::{Deserialize, Serialize};

use crate::domain::tracking::Trackable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotel {
    pub id: Option<i64>,
    pub name: String,
    pub location: String,
    /// Nightly price
    pub price: Option<f64>,
    pub description: Option<String>,
    pub image: Option<String>,
}

impl Hotel {
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            location: location.into(),
            price: None,
            description: None,
            image: None,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Trackable for Hotel {
    const ENTITY_TYPE: &'static str = "Hotel";

    fn entity_id(&self) -> Option<i64> {
        self.id
    }
}
