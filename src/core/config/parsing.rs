use std::env;

use super::types::{ConfigError, Environment};
use crate::session::proctoring::ProctoringPolicy;

pub(crate) fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

pub(super) fn env_or_default(key: &str, default: &str) -> String {
    env_optional(key).unwrap_or_else(|| default.to_string())
}

pub(crate) fn parse_u64(field: &'static str, value: String) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidValue { field, value })
}

pub(super) fn parse_positive_u64(field: &'static str, value: String) -> Result<u64, ConfigError> {
    let parsed = parse_u64(field, value.clone())?;
    if parsed == 0 {
        return Err(ConfigError::InvalidValue { field, value });
    }
    Ok(parsed)
}

pub(super) fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES" | "on" | "ON")
}

pub(super) fn parse_environment(value: Option<String>) -> Environment {
    match value.as_deref().map(|item| item.to_lowercase()) {
        Some(ref val) if val == "production" || val == "prod" => Environment::Production,
        Some(ref val) if val == "staging" => Environment::Staging,
        Some(ref val) if val == "test" || val == "testing" => Environment::Test,
        _ => Environment::Development,
    }
}

pub(super) fn parse_exit_policy(value: Option<String>) -> Result<ProctoringPolicy, ConfigError> {
    let Some(raw) = value else {
        return Ok(ProctoringPolicy::Observe);
    };

    match raw.to_ascii_lowercase().as_str() {
        "observe" | "ignore" => Ok(ProctoringPolicy::Observe),
        "reengage" | "re-engage" | "reprompt" => Ok(ProctoringPolicy::Reengage),
        "pause" => Ok(ProctoringPolicy::Pause),
        _ => Err(ConfigError::InvalidValue { field: "PROCTORING_EXIT_POLICY", value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_variants() {
        assert!(parse_bool("1"));
        assert!(parse_bool("true"));
        assert!(parse_bool("TRUE"));
        assert!(parse_bool("yes"));
        assert!(parse_bool("on"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("0"));
    }

    #[test]
    fn parse_environment_variants() {
        assert_eq!(parse_environment(Some("prod".to_string())), Environment::Production);
        assert_eq!(parse_environment(Some("production".to_string())), Environment::Production);
        assert_eq!(parse_environment(Some("staging".to_string())), Environment::Staging);
        assert_eq!(parse_environment(Some("testing".to_string())), Environment::Test);
        assert_eq!(parse_environment(None), Environment::Development);
    }

    #[test]
    fn parse_exit_policy_defaults_to_observe() {
        assert_eq!(parse_exit_policy(None).expect("default"), ProctoringPolicy::Observe);
        assert_eq!(
            parse_exit_policy(Some("Re-Engage".to_string())).expect("reengage"),
            ProctoringPolicy::Reengage
        );
        assert_eq!(parse_exit_policy(Some("pause".to_string())).expect("pause"), ProctoringPolicy::Pause);
    }

    #[test]
    fn parse_exit_policy_rejects_unknown_values() {
        let err = parse_exit_policy(Some("lock".to_string())).expect_err("unknown policy");
        assert!(matches!(err, ConfigError::InvalidValue { field: "PROCTORING_EXIT_POLICY", .. }));
    }

    #[test]
    fn parse_positive_u64_rejects_zero() {
        assert!(parse_positive_u64("EXAM_TICK_MILLIS", "0".to_string()).is_err());
        assert_eq!(parse_positive_u64("EXAM_TICK_MILLIS", "250".to_string()).expect("tick"), 250);
    }
}
