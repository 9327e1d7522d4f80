use super::*;
use crate::config::Options;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub struct ListBackupsRequest {
    pub destination_name: String,
    pub options: Options,
}

impl ListBackupsRequest {
    pub fn to_env(&self) -> Result<EnvVars, serde_json::Error> {
        Ok(vec![
            (ENV_DESTINATION_NAME, self.destination_name.clone()),
            (ENV_OPTIONS, serde_json::to_string(&self.options)?),
        ])
    }

    pub fn from_env<F>(lookup: F) -> Result<Self, ProtoError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            destination_name: require_env(&lookup, ENV_DESTINATION_NAME)?,
            options: require_json_env(&lookup, ENV_OPTIONS)?,
        })
    }
}

/// Document a backend writes to stdout for `list-backups`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListBackupsResponse {
    pub backups: Vec<BackupRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub id: String,
    /// Backend-formatted timestamp
    pub time: String,
    pub job: String,
    pub destination: String,
    pub bytes: u64,
    /// Backend-specific details. Missing and `null` both decode as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub extra: Options,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Options, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Options>::deserialize(deserializer)?.unwrap_or_default())
}
