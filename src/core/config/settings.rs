use super::parsing::{
    env_optional, env_or_default, parse_bool, parse_environment, parse_exit_policy,
    parse_positive_u64, parse_u64,
};
use super::types::{
    ApiSettings, BaseUrl, ConfigError, ExamSettings, RuntimeSettings, Settings, TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let environment =
            parse_environment(env_optional("PICRETE_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("PICRETE_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let base_url = env_or_default("EXAM_API_BASE_URL", "http://localhost:8000/api/v1");
        let token = env_or_default("EXAM_API_TOKEN", "");
        let timeout_seconds = parse_positive_u64(
            "EXAM_API_TIMEOUT_SECONDS",
            env_or_default("EXAM_API_TIMEOUT_SECONDS", "30"),
        )?;
        let connect_timeout_seconds = parse_positive_u64(
            "EXAM_API_CONNECT_TIMEOUT_SECONDS",
            env_or_default("EXAM_API_CONNECT_TIMEOUT_SECONDS", "10"),
        )?;

        let tick_millis =
            parse_positive_u64("EXAM_TICK_MILLIS", env_or_default("EXAM_TICK_MILLIS", "1000"))?;
        let proctoring_poll_millis = parse_u64(
            "EXAM_PROCTORING_POLL_MILLIS",
            env_or_default("EXAM_PROCTORING_POLL_MILLIS", "500"),
        )?
        .max(50);
        let exit_policy = parse_exit_policy(env_optional("PROCTORING_EXIT_POLICY"))?;

        let log_level = env_or_default("PICRETE_LOG_LEVEL", "info");
        let json = env_optional("PICRETE_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings {
                base_url: BaseUrl::parse(base_url)?,
                token,
                timeout_seconds,
                connect_timeout_seconds,
            },
            exam: ExamSettings { tick_millis, proctoring_poll_millis, exit_policy },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;

        Ok(settings)
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn exam(&self) -> &ExamSettings {
        &self.exam
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.api.token.is_empty() {
            return Err(ConfigError::MissingSecret("EXAM_API_TOKEN"));
        }

        if self.api.base_url.as_str().starts_with("http://") {
            return Err(ConfigError::InvalidValue {
                field: "EXAM_API_BASE_URL",
                value: self.api.base_url.as_str().to_string(),
            });
        }

        Ok(())
    }
}
