/// First non-empty string, or an empty string if there is none.
pub fn coalesce<S: AsRef<str>>(inputs: impl IntoIterator<Item = S>) -> String {
    inputs
        .into_iter()
        .find(|s| !s.as_ref().is_empty())
        .map(|s| s.as_ref().to_string())
        .unwrap_or_default()
}
