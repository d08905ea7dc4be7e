pub(crate) mod addressing;
pub(crate) mod answers;
pub(crate) mod bootstrap;
pub(crate) mod controller;
pub(crate) mod countdown;
pub(crate) mod effects;
pub(crate) mod errors;
pub(crate) mod navigation;
pub(crate) mod proctoring;
pub(crate) mod types;
