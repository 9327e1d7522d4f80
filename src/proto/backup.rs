use super::*;
use crate::config::Options;

/// Back up `paths` to one destination
#[derive(Debug, Clone, PartialEq)]
pub struct BackupRequest {
    pub paths: Vec<String>,
    pub exclude: Vec<String>,
    pub destination_name: String,
    pub job_name: String,
    pub options: Options,
}

impl BackupRequest {
    pub fn to_env(&self) -> Result<EnvVars, serde_json::Error> {
        Ok(vec![
            (ENV_PATHS, join_list(&self.paths)),
            (ENV_EXCLUDE, join_list(&self.exclude)),
            (ENV_DESTINATION_NAME, self.destination_name.clone()),
            (ENV_JOB_NAME, self.job_name.clone()),
            (ENV_OPTIONS, serde_json::to_string(&self.options)?),
        ])
    }

    /// Decode from the environment. Exclude may be absent or empty.
    pub fn from_env<F>(lookup: F) -> Result<Self, ProtoError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            paths: split_list(&require_env(&lookup, ENV_PATHS)?),
            exclude: lookup(ENV_EXCLUDE).map(|v| split_list(&v)).unwrap_or_default(),
            destination_name: require_env(&lookup, ENV_DESTINATION_NAME)?,
            job_name: require_env(&lookup, ENV_JOB_NAME)?,
            options: require_json_env(&lookup, ENV_OPTIONS)?,
        })
    }
}
