//! Terminal UI split across logical submodules.

mod app;
mod forms;
mod helpers;
mod terminal;

pub use app::App;
pub use terminal::run_app;
