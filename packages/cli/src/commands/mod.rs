pub mod lock;
pub mod substitute;

pub use lock::{lock, LockArgs};
pub use substitute::{substitute, SubstituteArgs};

use std::path::{Path, PathBuf};

/// `<dir>/<stem>.<suffix>.<ext>` next to `input`
pub fn default_output(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{}.{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}.{}", stem, suffix),
    };
    input.with_file_name(name)
}

/// Resolve `path` against the working directory
pub fn resolve_path(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}
