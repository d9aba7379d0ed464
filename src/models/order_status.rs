use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use utoipa::ToSchema;

use crate::errors::ServiceError;

/// Fulfillment progress of an order.
///
/// The allowed transition graph is linear with a cancellation branch:
/// `pending → processing → completed`, with `cancelled` reachable from any
/// non-terminal state. `completed` and `cancelled` are terminal. Re-applying
/// the current status is treated as an idempotent no-op.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
    #[strum(to_string = "cancelled", serialize = "canceled")]
    Cancelled,
}

impl OrderStatus {
    /// Parses a client-supplied status string, case-insensitively.
    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        Self::from_str(raw.trim()).map_err(|_| {
            let valid = Self::iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            ServiceError::InvalidStatus(format!("'{raw}' is not one of: {valid}"))
        })
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether moving from `self` to `next` is an allowed transition.
    pub fn can_transition_to(self, next: Self) -> bool {
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Pending, Self::Cancelled)
                | (Self::Processing, Self::Cancelled)
        )
    }
}
