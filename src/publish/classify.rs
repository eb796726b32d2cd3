//! publish::classify
//!
//! Maps git failure text to failure categories.
//!
//! git reports "nothing to commit" or a push permission denial only as
//! human-readable text, so classification is a substring match against a
//! fixed table. Anything not in the table is [`FailureKind::Other`].

/// Pipeline step whose failure is being classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Commit,
    Push,
}

/// Category of a git failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The index had nothing new to commit.
    NothingToCommit,
    /// The remote refused the push for lack of permission.
    PushForbidden,
    /// No known signature matched.
    Other,
}

/// Known failure signatures, checked in order.
const SIGNATURES: &[(Stage, &str, FailureKind)] = &[
    (Stage::Commit, "nothing to commit", FailureKind::NothingToCommit),
    (Stage::Commit, "nothing added to commit", FailureKind::NothingToCommit),
    (Stage::Push, "Permission to", FailureKind::PushForbidden),
    (
        Stage::Push,
        "The requested URL returned error: 403",
        FailureKind::PushForbidden,
    ),
];

/// Classify the raw failure `text` of a `stage`.
pub fn classify(stage: Stage, text: &str) -> FailureKind {
    SIGNATURES
        .iter()
        .find(|(s, needle, _)| *s == stage && text.contains(needle))
        .map(|(_, _, kind)| *kind)
        .unwrap_or(FailureKind::Other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_to_commit() {
        assert_eq!(
            classify(Stage::Commit, "On branch main\nnothing to commit, working tree clean"),
            FailureKind::NothingToCommit
        );
        assert_eq!(
            classify(
                Stage::Commit,
                "nothing added to commit but untracked files present"
            ),
            FailureKind::NothingToCommit
        );
    }

    #[test]
    fn push_permission_denied() {
        assert_eq!(
            classify(
                Stage::Push,
                "remote: Permission to acme/site.git denied to editor.\nfatal: unable to access"
            ),
            FailureKind::PushForbidden
        );
        assert_eq!(
            classify(Stage::Push, "fatal: The requested URL returned error: 403"),
            FailureKind::PushForbidden
        );
    }

    #[test]
    fn signatures_are_stage_specific() {
        assert_eq!(
            classify(Stage::Push, "nothing to commit"),
            FailureKind::Other
        );
        assert_eq!(
            classify(Stage::Commit, "Permission to acme/site.git denied"),
            FailureKind::Other
        );
    }

    #[test]
    fn unknown_text_falls_back_to_other() {
        assert_eq!(
            classify(Stage::Push, "fatal: repository not found"),
            FailureKind::Other
        );
        assert_eq!(classify(Stage::Commit, ""), FailureKind::Other);
    }
}
