//! Medicine Entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::ids::new_id;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub generic_name: String,
    #[serde(default)]
    pub form: String,
    #[serde(default)]
    pub strength: String,
    #[serde(default)]
    pub batch_number: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub unit_price: f64,
    #[serde(default)]
    pub stock: f64,
    /// Stock level below which the medicine is flagged
    #[serde(default)]
    pub threshold: f64,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional"
    )]
    pub expiry_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Medicine {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name: name.into(),
            generic_name: String::new(),
            form: String::new(),
            strength: String::new(),
            batch_number: String::new(),
            manufacturer: String::new(),
            unit_price: 0.0,
            stock: 0.0,
            threshold: 0.0,
            expiry_date: None,
            notes: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// A threshold of zero disables the signal.
    pub fn is_low_stock(&self) -> bool {
        self.threshold > 0.0 && self.stock < self.threshold
    }

    /// Stock as a percentage of threshold, capped at 100.
    pub fn stock_level_percent(&self) -> u8 {
        if self.threshold <= 0.0 {
            return 100;
        }
        ((self.stock / self.threshold) * 100.0).round().clamp(0.0, 100.0) as u8
    }
}
