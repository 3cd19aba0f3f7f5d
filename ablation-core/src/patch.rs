//! Unified-diff applier for agent submissions.
//!
//! Agents submit their answer as a git diff that creates one or more new files. The
//! post-image of every created file is reconstructed and concatenated in diff order,
//! which is what the judges then parse as JSON lines. Each file section is parsed
//! with `diffy` and applied to an empty base, so hunks that need a pre-image fail.

use crate::error::AgentError;

/// Whether an agent submission is a git diff rather than raw output.
pub fn is_unified_diff(text: &str) -> bool {
    text.starts_with("diff --git")
}

/// Decode an agent submission: apply it if it is a diff, otherwise take it verbatim.
pub fn resolve_model_patch(text: &str) -> Result<String, AgentError> {
    if is_unified_diff(text) {
        apply_patch(text)
    } else {
        Ok(text.to_string())
    }
}

/// Split a multi-file git diff into one section per `diff --git` header.
fn file_sections(diff: &str) -> Vec<&str> {
    let starts: Vec<usize> = diff
        .match_indices("diff --git")
        .map(|(i, _)| i)
        .filter(|&i| i == 0 || diff.as_bytes()[i - 1] == b'\n')
        .collect();
    starts
        .iter()
        .enumerate()
        .map(|(n, &start)| {
            let end = starts.get(n + 1).copied().unwrap_or(diff.len());
            &diff[start..end]
        })
        .collect()
}

/// Post-image of a single file section. Sections without a `---` header
/// (an empty file creation) contribute nothing.
fn apply_section(section: &str) -> Result<String, AgentError> {
    let Some(header) = section
        .match_indices("--- ")
        .map(|(i, _)| i)
        .find(|&i| i == 0 || section.as_bytes()[i - 1] == b'\n')
    else {
        return Ok(String::new());
    };
    let patch = diffy::Patch::from_str(&section[header..]).map_err(|e| AgentError::Patch {
        message: format!("Malformed diff: {e}"),
    })?;
    // No base file is available, so only hunks that create content apply
    diffy::apply("", &patch).map_err(|e| AgentError::Patch {
        message: format!("Hunk needs a base file: {e}"),
    })
}

/// Reconstruct the contents of every file the diff creates, concatenated.
pub fn apply_patch(diff: &str) -> Result<String, AgentError> {
    let sections = file_sections(diff);
    if sections.is_empty() {
        return Err(AgentError::Patch {
            message: "No file sections in diff".into(),
        });
    }
    let mut output = String::new();
    for section in sections {
        output.push_str(&apply_section(section)?);
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const NEW_FILE: &str = "diff --git a/preds.jsonl b/preds.jsonl
new file mode 100644
index 0000000..e69de29
--- /dev/null
+++ b/preds.jsonl
@@ -0,0 +1,2 @@
+{\"name_in_A\": \"dropout\", \"name_in_B\": \"no-dropout\"}
+{\"name_in_A\": \"bn\", \"name_in_B\": null}
";

    #[test]
    fn test_apply_new_file() {
        let out = apply_patch(NEW_FILE).unwrap();
        assert_eq!(
            out,
            "{\"name_in_A\": \"dropout\", \"name_in_B\": \"no-dropout\"}\n{\"name_in_A\": \"bn\", \"name_in_B\": null}\n"
        );
    }

    #[test]
    fn test_no_newline_marker() {
        let diff = "diff --git a/x b/x\nnew file mode 100644\n--- /dev/null\n+++ b/x\n@@ -0,0 +1 @@\n+only\n\\ No newline at end of file\n";
        assert_eq!(apply_patch(diff).unwrap(), "only");
    }

    #[test]
    fn test_multiple_files_concatenate() {
        let diff = format!(
            "{NEW_FILE}diff --git a/y b/y\nnew file mode 100644\n--- /dev/null\n+++ b/y\n@@ -0,0 +1,1 @@\n+third\n"
        );
        let out = apply_patch(&diff).unwrap();
        assert_eq!(out.lines().count(), 3);
        assert!(out.ends_with("third\n"));
    }

    #[test]
    fn test_modification_hunk_rejected() {
        let diff = "diff --git a/x b/x\n--- a/x\n+++ b/x\n@@ -1,2 +1,2 @@\n keep\n-old\n+new\n";
        assert!(matches!(apply_patch(diff), Err(AgentError::Patch { .. })));
    }

    #[test]
    fn test_truncated_hunk_rejected() {
        let diff = "diff --git a/x b/x\n--- /dev/null\n+++ b/x\n@@ -0,0 +1,3 @@\n+a\n";
        assert!(matches!(apply_patch(diff), Err(AgentError::Patch { .. })));
    }

    #[test]
    fn test_empty_new_file_contributes_nothing() {
        let diff = format!("diff --git a/e b/e\nnew file mode 100644\nindex 0000000..e69de29\n{NEW_FILE}");
        assert_eq!(apply_patch(&diff).unwrap().lines().count(), 2);
    }

    #[test]
    fn test_text_without_file_sections_rejected() {
        assert!(matches!(apply_patch("--- a\n+++ b\n"), Err(AgentError::Patch { .. })));
    }

    #[test]
    fn test_resolve_passes_raw_text_through() {
        let raw = "{\"name_in_plan\": \"a\", \"appears_in_review\": true}";
        assert_eq!(resolve_model_patch(raw).unwrap(), raw);
        assert!(is_unified_diff(NEW_FILE));
        assert!(!is_unified_diff(raw));
    }
}
