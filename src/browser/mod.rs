//! Chrome-backed browser sessions
//!
//! One browser process is shared by all jobs of a run; each job opens its own
//! page through [`ChromiumProvider`] and closes it when done.

mod launch;
mod session;
mod user_agent;

pub use launch::{
    BrowserWrapper, CHROMIUM_PATH_ENV, ExecutableSource, fetch_chromium, launch_browser,
    resolve_executable,
};
pub use session::{ChromiumProvider, ChromiumSession};
pub use user_agent::apply_user_agent;
