use serde::{Deserialize, Serialize};

/// Settings read from `modules.appointments` in the application config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppointmentsConfig {
    /// Document collection holding the appointments.
    #[serde(default = "default_collection")]
    pub collection: String,
}

impl Default for AppointmentsConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
        }
    }
}

fn default_collection() -> String {
    "appointments".to_string()
}

impl AppointmentsConfig {
    /// Build from the raw module section; an absent section means defaults.
    pub fn from_module_value(raw: Option<&serde_json::Value>) -> anyhow::Result<Self> {
        match raw {
            None | Some(serde_json::Value::Null) => Ok(Self::default()),
            Some(value) => Ok(serde_json::from_value(value.clone())?),
        }
    }
}
