use regex::Regex;
use std::sync::OnceLock;

/// Replace characters other than ASCII letters, digits, `.` and `-` with "_".
///
/// NUL bytes are dropped first. The result never contains a path separator, so it
/// is safe to join onto the staging directory.
pub(crate) fn sanitize<S: AsRef<str>>(s: S) -> String {
    let s_nonull = s.as_ref().replace('\0', "");
    VALID_CHARS_RE
        .get_or_init(|| Regex::new(r#"[^A-Za-z0-9\.\-]+"#).unwrap())
        .replace_all(&s_nonull, "_")
        .to_string()
}

static VALID_CHARS_RE: OnceLock<Regex> = OnceLock::new();
