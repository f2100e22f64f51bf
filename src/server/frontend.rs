//! The front-end document served at `/`.

use std::path::Path;

use tracing::{info, warn};

/// Bundled page, used when the static directory has no `index.html`.
pub const DEFAULT_INDEX_HTML: &str = include_str!("../../static/index.html");

/// Read `index.html` from `static_dir`, falling back to the bundled page.
pub fn load_index(static_dir: &Path) -> String {
    let path = static_dir.join("index.html");
    match std::fs::read_to_string(&path) {
        Ok(html) if !html.trim().is_empty() => {
            info!(path = %path.display(), "Loaded front-end document");
            html
        }
        Ok(_) => {
            warn!(path = %path.display(), "Front-end document is empty, using bundled page");
            DEFAULT_INDEX_HTML.to_string()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Front-end document unavailable, using bundled page");
            DEFAULT_INDEX_HTML.to_string()
        }
    }
}
