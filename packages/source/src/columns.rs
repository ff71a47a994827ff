//! Ordered column resolution.
//!
//! Source files label the same attribute inconsistently (`SIG_KOR_NM`,
//! `name`, `자치구`, ...). Callers pass a priority-ordered list of
//! candidate labels; the first candidate present in the source wins. If
//! none is present the source is rejected with a schema error instead of
//! guessing.

use crate::SourceError;

/// Returns the index in `available` of the highest-priority candidate.
///
/// Labels are compared after trimming whitespace and a leading UTF-8 byte
/// order mark, so `"\u{feff}자치구 "` matches `"자치구"`.
///
/// # Errors
///
/// Returns [`SourceError::Schema`] if no candidate is present, or if the
/// candidate list is empty.
pub fn resolve_column<S: AsRef<str>>(
    available: &[S],
    candidates: &[String],
    what: &str,
) -> Result<usize, SourceError> {
    for candidate in candidates {
        let wanted = normalize_label(candidate);
        if let Some(index) = available
            .iter()
            .position(|label| normalize_label(label.as_ref()) == wanted)
        {
            log::debug!("Resolved {what} column to '{candidate}'");
            return Ok(index);
        }
    }

    Err(SourceError::Schema {
        message: format!(
            "no {what} column found (tried {candidates:?}, available {:?})",
            available.iter().map(AsRef::<str>::as_ref).collect::<Vec<_>>()
        ),
    })
}

fn normalize_label(label: &str) -> &str {
    label.trim_start_matches('\u{feff}').trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn picks_candidate_priority_over_header_order() {
        let available = ["name", "SIG_KOR_NM", "code"];
        let index =
            resolve_column(&available, &candidates(&["SIG_KOR_NM", "name"]), "name").unwrap();
        assert_eq!(index, 1);
    }

    #[test]
    fn falls_through_to_lower_priority_candidates() {
        let available = ["code", "name"];
        let index =
            resolve_column(&available, &candidates(&["SIG_KOR_NM", "name"]), "name").unwrap();
        assert_eq!(index, 1);
    }

    #[test]
    fn ignores_bom_and_padding() {
        let available = ["\u{feff}자치구 ", "인구"];
        let index = resolve_column(&available, &candidates(&["자치구"]), "district").unwrap();
        assert_eq!(index, 0);
    }

    #[test]
    fn total_miss_is_schema_error() {
        let available = ["code", "area"];
        let err =
            resolve_column(&available, &candidates(&["SIG_KOR_NM", "name"]), "name").unwrap_err();
        assert!(err.is_schema());
        assert!(err.to_string().contains("SIG_KOR_NM"));
    }

    #[test]
    fn empty_candidate_list_is_schema_error() {
        let available = ["name"];
        assert!(resolve_column(&available, &[], "name").unwrap_err().is_schema());
    }
}
