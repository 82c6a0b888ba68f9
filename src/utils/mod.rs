pub mod constants;
pub mod url_utils;

pub use constants::*;
pub use url_utils::{host_matches_domain, last_path_segment, preview};
