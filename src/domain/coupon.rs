//! Coupon entity.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    Percentage,
    Fixed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Coupon {
    pub id: Uuid,
    /// Stored normalized; see [`Coupon::normalize_code`].
    pub code: String,
    pub name: String,
    pub thumbnail: Option<String>,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    /// Global redemption cap.
    pub usage_limit: Option<u32>,
    /// Redemption cap per user; defaults to one when absent.
    pub per_user_limit: Option<u32>,
    pub used_count: u32,
    pub used_by: Vec<Uuid>,
    /// When set, the discount only applies to items of this category.
    pub category_id: Option<Uuid>,
}

impl Coupon {
    /// Codes are compared case-insensitively and ignore surrounding
    /// whitespace.
    pub fn normalize_code(code: &str) -> String {
        code.trim().to_uppercase()
    }

    pub fn is_within_window(&self, at: DateTime<Utc>) -> bool {
        self.start_date <= at && at <= self.end_date
    }

    pub fn uses_by(&self, user_id: Uuid) -> u32 {
        self.used_by.iter().filter(|u| **u == user_id).count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_normalization() {
        assert_eq!(Coupon::normalize_code("  summer10 "), "SUMMER10");
    }
}
