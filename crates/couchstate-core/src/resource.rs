//! Logical resources and their document layout

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One of the named pieces of host state persisted by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalResource {
    Flows,
    Credentials,
    Settings,
}

impl LogicalResource {
    /// Every resource, in a stable order
    pub const ALL: [Self; 3] = [Self::Flows, Self::Credentials, Self::Settings];

    /// Id of the document holding this resource
    #[must_use]
    pub fn document_id(self) -> &'static str {
        match self {
            Self::Flows => "nodered_flows",
            Self::Credentials => "nodered_credentials",
            Self::Settings => "nodered_settings",
        }
    }

    /// Field inside the document that carries the payload
    #[must_use]
    pub fn field_name(self) -> &'static str {
        match self {
            Self::Flows => "flows",
            Self::Credentials => "credentials",
            Self::Settings => "settings",
        }
    }

    /// Value returned when nothing has been stored yet
    #[must_use]
    pub fn default_value(self) -> Value {
        match self {
            Self::Flows => Value::Array(Vec::new()),
            Self::Credentials | Self::Settings => Value::Object(Map::new()),
        }
    }

    /// Whether a payload has the shape this resource stores
    /// (an array for flows, an object otherwise)
    #[must_use]
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Flows => value.is_array(),
            Self::Credentials | Self::Settings => value.is_object(),
        }
    }
}

impl fmt::Display for LogicalResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

impl FromStr for LogicalResource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flows" => Ok(Self::Flows),
            "credentials" => Ok(Self::Credentials),
            "settings" => Ok(Self::Settings),
            _ => Err(format!(
                "Unknown resource '{s}'. Use 'flows', 'credentials', or 'settings'."
            )),
        }
    }
}
