// ABOUTME: Detectors for incoming changes that need operator follow-up.
// ABOUTME: Covers dependency manifest, sample config, and index definition diffs.

use regex::Regex;
use std::sync::LazyLock;

static SAMPLE_CONFIG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"config.(js|json)\.sample").unwrap());

pub const MANIFEST_FILE: &str = "package.json";
pub const INDEX_DEFINITIONS_FILE: &str = "indexes.js";

/// Whether a manifest diff adds anything besides a version bump.
pub fn manifest_has_additions(diff: &str) -> bool {
    diff.lines()
        .filter(|line| line.starts_with('+'))
        .any(|line| !line.contains(MANIFEST_FILE) && !line.contains("version"))
}

/// The sample config file name in a directory listing, if any.
pub fn find_sample_config(listing: &str) -> Option<String> {
    SAMPLE_CONFIG
        .find(listing)
        .map(|found| found.as_str().to_string())
}

/// Whether a diff has any content.
pub fn has_changes(diff: &str) -> bool {
    !diff.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_bump_alone_is_not_an_addition() {
        let diff = "\
diff --git a/package.json b/package.json
--- a/package.json
+++ b/package.json
@@ -1,4 +1,4 @@
-  \"version\": \"1.2.0\",
+  \"version\": \"1.3.0\",
";
        assert!(!manifest_has_additions(diff));
    }

    #[test]
    fn new_dependency_is_an_addition() {
        let diff = "\
+++ b/package.json
+    \"left-pad\": \"^1.3.0\",
";
        assert!(manifest_has_additions(diff));
    }

    #[test]
    fn empty_manifest_diff() {
        assert!(!manifest_has_additions(""));
    }

    #[test]
    fn finds_sample_config_in_listing() {
        let listing = "README.md\nconfig.json\nconfig.json.sample\nlib\n";
        assert_eq!(find_sample_config(listing).as_deref(), Some("config.json.sample"));
        assert_eq!(find_sample_config("config.js.sample").as_deref(), Some("config.js.sample"));
        assert_eq!(find_sample_config("config.json\nlib\n"), None);
    }

    #[test]
    fn whitespace_only_diff_has_no_changes() {
        assert!(!has_changes("\n  \n"));
        assert!(has_changes("-a\n+b\n"));
    }
}
