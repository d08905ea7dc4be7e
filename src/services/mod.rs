pub(crate) mod backend;
pub(crate) mod http_backend;
pub(crate) mod report;
