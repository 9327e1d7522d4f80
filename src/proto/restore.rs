use super::*;
use crate::config::Options;

#[derive(Debug, Clone, PartialEq)]
pub struct RestoreRequest {
    pub backup_id: String,
    pub destination_name: String,
    pub output_dir: String,
    pub options: Options,
}

impl RestoreRequest {
    pub fn to_env(&self) -> Result<EnvVars, serde_json::Error> {
        Ok(vec![
            (ENV_BACKUP_ID, self.backup_id.clone()),
            (ENV_DESTINATION_NAME, self.destination_name.clone()),
            (ENV_OUTPUT_DIR, self.output_dir.clone()),
            (ENV_OPTIONS, serde_json::to_string(&self.options)?),
        ])
    }

    pub fn from_env<F>(lookup: F) -> Result<Self, ProtoError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            backup_id: require_env(&lookup, ENV_BACKUP_ID)?,
            destination_name: require_env(&lookup, ENV_DESTINATION_NAME)?,
            output_dir: require_env(&lookup, ENV_OUTPUT_DIR)?,
            options: require_json_env(&lookup, ENV_OPTIONS)?,
        })
    }
}
