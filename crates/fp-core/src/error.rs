use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Structural problems in a model or scenario description.
///
/// These are raised while a model is being assembled (or a scenario is being
/// resolved against a model) and are never recovered from.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Block '{block}' references unknown flow '{flow}'")]
    UnknownFlow { block: String, flow: String },

    #[error("Unknown block '{name}' in {context}")]
    UnknownBlock { name: String, context: String },

    #[error("Flow '{flow}' has no field '{field}' (referenced by block '{block}')")]
    UnknownField {
        block: String,
        flow: String,
        field: String,
    },

    #[error("Block '{block}' has no fault mode '{mode}'")]
    UnknownMode { block: String, mode: String },

    #[error("Duplicate {kind} name '{name}'")]
    DuplicateName { kind: &'static str, name: String },

    #[error("Duplicate fault mode '{mode}' on block '{block}'")]
    DuplicateMode { block: String, mode: String },

    #[error("Block '{block}' expects {expected} flow connections, got {actual}")]
    ConnectionCount {
        block: String,
        expected: usize,
        actual: usize,
    },

    #[error(
        "Opportunity vector of mode '{mode}' on block '{block}' has {actual} entries (model has {expected} phases)"
    )]
    OpportunityLength {
        block: String,
        mode: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid time range: {what}")]
    InvalidTimeRange { what: String },

    #[error("Invalid parameter '{param}' on block '{block}': {reason}")]
    InvalidParam {
        block: String,
        param: String,
        reason: String,
    },

    #[error("Invalid scenario '{scenario}': {what}")]
    InvalidScenario { scenario: String, what: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_messages_name_the_offender() {
        let err = ConfigError::UnknownFlow {
            block: "move_water".into(),
            flow: "wat_9".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("move_water"));
        assert!(msg.contains("wat_9"));
    }
}
