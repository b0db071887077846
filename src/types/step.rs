//! Step and option types - the nodes and edges of a menu flow.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Default seconds a phone session waits on a prompt
pub const DEFAULT_TIMEOUT_SECONDS: i32 = 30;

/// Highest digit a subscriber can press for an option
pub const MAX_OPTION_NUMBER: i32 = 9;

/// How a step consumes the subscriber's reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ResponseType {
    /// Numbered menu; the reply picks an option
    #[default]
    Selection,
    /// Free text (amount, phone number, PIN)
    Input,
    /// Yes / No prompt
    Confirmation,
    /// Final message, session closes
    End,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Selection => "selection",
            ResponseType::Input => "input",
            ResponseType::Confirmation => "confirmation",
            ResponseType::End => "end",
        }
    }

    /// Whether the step branches through option records
    pub fn uses_options(&self) -> bool {
        matches!(self, ResponseType::Selection)
    }
}

impl std::fmt::Display for ResponseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResponseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "selection" => Ok(Self::Selection),
            "input" => Ok(Self::Input),
            "confirmation" => Ok(Self::Confirmation),
            "end" => Ok(Self::End),
            other => Err(format!("unknown response type '{}'", other)),
        }
    }
}

/// A prompt shown to the phone user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, JsonSchema)]
#[ts(export)]
pub struct MenuStep {
    pub id: Uuid,

    pub flow_id: Uuid,

    /// Presentation order, assigned by the store
    pub step_number: i32,

    pub step_name: String,

    /// Prompt text sent to the handset
    pub menu_text: String,

    pub response_type: ResponseType,

    #[serde(default = "default_timeout")]
    pub timeout_seconds: i32,

    /// Shown instead of the generic message on invalid replies
    #[serde(default)]
    pub fallback_message: Option<String>,

    /// Informational parent link; traversal follows options only
    #[serde(default)]
    pub parent_step_id: Option<Uuid>,

    /// Backend endpoint the gateway calls when the step completes
    #[serde(default)]
    pub api_endpoint: Option<String>,

    #[serde(default)]
    pub is_initial_step: bool,

    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,

    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

fn default_timeout() -> i32 {
    DEFAULT_TIMEOUT_SECONDS
}

impl MenuStep {
    /// Create a step with defaults; `step_number` is assigned on insert
    pub fn new(
        flow_id: Uuid,
        step_name: impl Into<String>,
        menu_text: impl Into<String>,
        response_type: ResponseType,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            flow_id,
            step_number: 0,
            step_name: step_name.into(),
            menu_text: menu_text.into(),
            response_type,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            fallback_message: None,
            parent_step_id: None,
            api_endpoint: None,
            is_initial_step: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn initial(mut self) -> Self {
        self.is_initial_step = true;
        self
    }
}

/// A numbered choice on a selection step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, JsonSchema)]
#[ts(export)]
pub struct MenuOption {
    pub id: Uuid,

    pub step_id: Uuid,

    /// Digit the subscriber presses (1-9)
    pub option_number: i32,

    /// Label shown next to the digit
    pub option_text: String,

    /// Backend payload, never shown to the subscriber
    #[serde(default)]
    pub option_value: Option<String>,

    /// Target step; `None` ends the session
    #[serde(default)]
    pub next_step_id: Option<Uuid>,

    #[serde(default = "default_true")]
    pub is_active: bool,

    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,

    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl MenuOption {
    pub fn new(
        step_id: Uuid,
        option_number: i32,
        option_text: impl Into<String>,
        next_step_id: Option<Uuid>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            step_id,
            option_number,
            option_text: option_text.into(),
            option_value: None,
            next_step_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Render the option as the handset shows it
    pub fn label(&self) -> String {
        format!("{}. {}", self.option_number, self.option_text)
    }
}
