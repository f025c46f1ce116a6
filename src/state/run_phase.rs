/// Run phase definitions for the batch orchestrator
///
/// A run starts by enumerating the index page, then loops over leaf URLs.
/// Every path out of the loop goes through a checkpoint before `Done`.
use std::fmt;

/// Represents the current phase of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunPhase {
    /// Fetching and parsing the index page
    Enumerating,

    /// Picking the next unknown URL and fetching it
    FetchingNext,

    // ===== Per-page outcomes =====
    /// Page became a catalog entry
    Accepted,

    /// Page was fetched but is not an entry
    Rejected,

    /// Page fetch failed; URL stays unmarked for the next run
    NetworkFailed,

    /// Flushing the catalog and syncing the ledger
    Checkpointing,

    /// Run finished (exhausted, limit reached, interrupted or failed)
    Done,
}

impl RunPhase {
    /// Returns true once the run can make no further progress
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if the orchestrator may move from `self` to `next`
    ///
    /// Checkpointing is reachable from every non-terminal phase so that a
    /// failing or interrupted run still ends with a final flush. `Done` is only
    /// reachable through a checkpoint.
    pub fn can_transition_to(&self, next: RunPhase) -> bool {
        use RunPhase::*;

        match (self, next) {
            (Enumerating, FetchingNext) => true,
            (FetchingNext, Accepted | Rejected | NetworkFailed) => true,
            (Accepted | Rejected | NetworkFailed, FetchingNext) => true,
            (Checkpointing, FetchingNext | Done) => true,
            (Done, _) => false,
            (_, Checkpointing) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enumerating => "enumerating",
            Self::FetchingNext => "fetching_next",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::NetworkFailed => "network_failed",
            Self::Checkpointing => "checkpointing",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
