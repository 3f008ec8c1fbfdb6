use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Priority of a todo, wire-encoded as the integers the API has always used:
/// 1 = high, 2 = medium, 3 = low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(try_from = "i16", into = "i16")]
#[repr(i16)]
pub enum Priority {
    High = 1,
    Medium = 2,
    Low = 3,
}

impl TryFrom<i16> for Priority {
    type Error = String;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Priority::High),
            2 => Ok(Priority::Medium),
            3 => Ok(Priority::Low),
            other => Err(format!("priority must be 1, 2 or 3, got {other}")),
        }
    }
}

impl From<Priority> for i16 {
    fn from(priority: Priority) -> Self {
        priority as i16
    }
}

/// Todo record as stored; always owned by a user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Todo {
    pub id: Uuid,
    pub user_id: Uuid,
    pub todo_name: String,
    pub todo_description: String,
    pub priority: Priority,
    pub completed: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewTodo {
    pub user_id: Uuid,
    pub todo_name: String,
    pub todo_description: String,
    pub priority: Priority,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct TodoPatch {
    pub todo_name: Option<String>,
    pub todo_description: Option<String>,
    pub priority: Option<Priority>,
    pub completed: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_round_trips_through_integers() {
        let json = serde_json::to_string(&Priority::High).unwrap();
        assert_eq!(json, "1");
        let parsed: Priority = serde_json::from_str("3").unwrap();
        assert_eq!(parsed, Priority::Low);
    }

    #[test]
    fn priority_rejects_out_of_range_values() {
        assert!(serde_json::from_str::<Priority>("0").is_err());
        assert!(serde_json::from_str::<Priority>("4").is_err());
    }
}
