//! C5: pure, stateless translation between POSIX paths and bucket keys (§4.1).
//!
//! Nothing here touches the network or the cache; it exists so the dispatcher
//! (C6) never has to do string surgery inline.

/// Strips exactly one leading `/`. The root path maps to the empty key.
pub fn key_of(path: &str) -> String {
    path.strip_prefix('/').unwrap_or(path).to_string()
}

/// The prefix to hand to `list_prefix` for a directory's own key.
pub fn list_prefix_for(dir_key: &str) -> String {
    if dir_key.is_empty() {
        String::new()
    } else {
        format!("{dir_key}/")
    }
}

/// Joins a parent key and a basename into a child key.
pub fn join(parent_key: &str, name: &str) -> String {
    if parent_key.is_empty() {
        name.to_string()
    } else {
        format!("{parent_key}/{name}")
    }
}

/// Splits a key into `(parent_key, basename)`. The root's basename is itself.
pub fn split_parent(key: &str) -> (String, String) {
    match key.rsplit_once('/') {
        Some((parent, name)) => (parent.to_string(), name.to_string()),
        None => (String::new(), key.to_string()),
    }
}

/// For each listed key, strips `prefix` to get the immediate child name. Keys
/// ending in `/` denote sub-directories (the trailing slash is part of the
/// returned name, matching the teacher's and the spec's own convention).
/// Does not deduplicate — the store's listing already does that (§4.1).
pub fn child_names<'a>(prefix: &str, listing: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    listing
        .into_iter()
        .filter_map(|l| l.strip_prefix(prefix).map(|s| s.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_of_strips_one_leading_slash() {
        assert_eq!(key_of("/a/b"), "a/b");
        assert_eq!(key_of("/"), "");
    }

    #[test]
    fn list_prefix_for_root_is_empty() {
        assert_eq!(list_prefix_for(""), "");
        assert_eq!(list_prefix_for("dir"), "dir/");
    }

    #[test]
    fn join_handles_root_parent() {
        assert_eq!(join("", "a.txt"), "a.txt");
        assert_eq!(join("dir", "a.txt"), "dir/a.txt");
    }

    #[test]
    fn split_parent_round_trips_with_join() {
        assert_eq!(split_parent("dir/a.txt"), ("dir".to_string(), "a.txt".to_string()));
        assert_eq!(split_parent("a.txt"), ("".to_string(), "a.txt".to_string()));
    }

    #[test]
    fn child_names_strips_prefix_without_dedup() {
        let listing = vec!["dir/a.txt", "dir/b/", "dir/a.txt"];
        let names = child_names("dir/", listing);
        assert_eq!(names, vec!["a.txt", "b/", "a.txt"]);
    }
}
