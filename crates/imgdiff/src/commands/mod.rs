mod approve;
mod diff;
mod init;
mod test;

pub use self::approve::approve;
pub use self::diff::diff;
pub use self::init::init;
pub use self::test::test;

/// Case-insensitive substring match on a snapshot id. A trailing image
/// extension on the pattern is ignored so file names can be pasted.
pub(crate) fn matches_filter(id: &str, filter: Option<&str>) -> bool {
    let Some(pattern) = filter else {
        return true;
    };
    let lower = pattern.to_ascii_lowercase();
    let pattern = crate::io::EXTENSIONS
        .iter()
        .find_map(|ext| lower.strip_suffix(ext).and_then(|p| p.strip_suffix('.')))
        .unwrap_or(lower.as_str());
    id.to_ascii_lowercase().contains(pattern)
}
