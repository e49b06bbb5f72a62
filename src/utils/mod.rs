use std::path::Path;

/// Terminate `message` with a newline unless it already ends with one
pub fn ensure_newline(message: &str) -> String {
    if message.ends_with('\n') {
        message.to_string()
    } else {
        format!("{}\n", message)
    }
}

/// Integer percentage of `done` over `total`; 0 when the total is unknown
pub fn percent(done: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    (done as u128 * 100 / total as u128) as u64
}

/// Quote a path for inclusion in a `sh -c` command line
pub fn shell_quote(path: &Path) -> String {
    let raw = path.to_string_lossy();
    format!("'{}'", raw.replace('\'', r"'\''"))
}
