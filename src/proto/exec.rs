use super::*;
use crate::config::Options;

/// Run backend-specific arguments, optionally against a destination
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecRequest {
    pub args: Vec<String>,
    /// Empty when invoked against a bare backend
    pub destination_name: String,
    pub options: Options,
}

impl ExecRequest {
    pub fn to_env(&self) -> Result<EnvVars, serde_json::Error> {
        Ok(vec![
            (ENV_ARGS, serde_json::to_string(&self.args)?),
            (ENV_DESTINATION_NAME, self.destination_name.clone()),
            (ENV_OPTIONS, serde_json::to_string(&self.options)?),
        ])
    }

    pub fn from_env<F>(lookup: F) -> Result<Self, ProtoError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let options = match lookup(ENV_OPTIONS).filter(|v| !v.is_empty()) {
            Some(raw) => serde_json::from_str(&raw).map_err(|source| ProtoError::InvalidEnv {
                name: ENV_OPTIONS,
                source,
            })?,
            None => Options::new(),
        };

        Ok(Self {
            args: require_json_env(&lookup, ENV_ARGS)?,
            destination_name: lookup(ENV_DESTINATION_NAME).unwrap_or_default(),
            options,
        })
    }
}
