use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What the executor does once the iteration or time budget runs out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EarlyStoppingMethod {
    /// Return a fixed "stopped" message.
    #[default]
    Force,
    /// Make one last planning call and return whatever it produces.
    Generate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// `None` disables the iteration cap.
    pub max_iterations: Option<usize>,
    #[serde(rename = "max_execution_time_secs", with = "duration_secs")]
    pub max_execution_time: Option<Duration>,
    pub early_stopping_method: EarlyStoppingMethod,
    pub return_intermediate_steps: bool,
    /// Consecutive unparseable model replies tolerated before the run fails.
    pub max_consecutive_parse_errors: Option<usize>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_iterations: Some(15),
            max_execution_time: None,
            early_stopping_method: EarlyStoppingMethod::Force,
            return_intermediate_steps: false,
            max_consecutive_parse_errors: None,
        }
    }
}

impl ExecutorConfig {
    pub fn merge(&self, overrides: &ExecutorOptions) -> Self {
        Self {
            max_iterations: overrides.max_iterations.unwrap_or(self.max_iterations),
            max_execution_time: overrides
                .max_execution_time
                .unwrap_or(self.max_execution_time),
            early_stopping_method: overrides
                .early_stopping_method
                .unwrap_or(self.early_stopping_method),
            return_intermediate_steps: overrides
                .return_intermediate_steps
                .unwrap_or(self.return_intermediate_steps),
            max_consecutive_parse_errors: overrides
                .max_consecutive_parse_errors
                .unwrap_or(self.max_consecutive_parse_errors),
        }
    }
}

/// Per-run overrides applied on top of the executor's [`ExecutorConfig`].
///
/// `None` keeps the configured value. For the limits, `Some(None)` lifts the
/// limit for this run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutorOptions {
    pub max_iterations: Option<Option<usize>>,
    pub max_execution_time: Option<Option<Duration>>,
    pub early_stopping_method: Option<EarlyStoppingMethod>,
    pub return_intermediate_steps: Option<bool>,
    pub max_consecutive_parse_errors: Option<Option<usize>>,
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(duration) => serializer.serialize_some(&duration.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<f64>::deserialize(deserializer)?
            .map(|secs| Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom))
            .transpose()
    }
}
