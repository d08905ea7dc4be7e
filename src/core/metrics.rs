use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) const ANSWERS_PERSISTED: &str = "exam_answers_persisted_total";
pub(crate) const ANSWER_FAILURES: &str = "exam_answer_failures_total";
pub(crate) const COMPLETIONS: &str = "exam_completions_total";
pub(crate) const COMPLETION_FAILURES: &str = "exam_completion_failures_total";
pub(crate) const FULLSCREEN_EXITS: &str = "exam_fullscreen_exits_total";
pub(crate) const PAUSES: &str = "exam_pauses_total";

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}
