mod parsing;
mod settings;
mod types;

pub(crate) use parsing::{env_optional, parse_u64};
pub(crate) use types::{ConfigError, ExamSettings, Settings};
