//! Hierarchical name handling
//!
//! Event names and subscription patterns are dot-separated component
//! sequences. Publish names must have non-empty components; in patterns
//! an empty component is a wildcard matching any single component.

/// Split a publish-time event name into its components
///
/// Fails with a message (the caller attaches the `BadEventName` kind)
/// if the name is empty or any component is empty — i.e. a leading,
/// trailing, or doubled dot.
pub(crate) fn event_path(name: &str) -> Result<Vec<String>, String> {
    let path: Vec<String> = name.split('.').map(str::to_string).collect();
    if path.iter().any(String::is_empty) {
        return Err(format!(
            "Event names must not contain empty components (name={})",
            name
        ));
    }
    Ok(path)
}

/// Split a subscription pattern into its components
///
/// Empty components are legal and denote wildcards. The empty pattern
/// yields a single wildcard component, which matches any event.
pub(crate) fn pattern_path(pattern: &str) -> Vec<String> {
    pattern.split('.').map(str::to_string).collect()
}
