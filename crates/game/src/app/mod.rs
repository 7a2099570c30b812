mod bootstrap;
mod session;

pub(crate) use bootstrap::build_app;
pub(crate) use session::run_session;
