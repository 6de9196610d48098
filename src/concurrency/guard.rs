// Conditional-request evaluation: pure functions over explicit inputs
use chrono::{DateTime, Duration, SubsecRound, Utc};
use tracing::debug;

use super::token::{ChangeToken, IfMatch};
use crate::error::CoreError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadPreconditions {
    pub if_modified_since: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WritePreconditions {
    pub if_match: Option<IfMatch>,
    pub if_unmodified_since: Option<DateTime<Utc>>,
}

impl WritePreconditions {
    pub fn if_match(token: ChangeToken) -> Self {
        Self {
            if_match: Some(IfMatch::Tags(vec![token])),
            if_unmodified_since: None,
        }
    }

    pub fn if_unmodified_since(at: DateTime<Utc>) -> Self {
        Self {
            if_match: None,
            if_unmodified_since: Some(at),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadDecision {
    Full,
    NotModified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreconditionState {
    NoPrecondition,
    Matched,
    Mismatched(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteDecision {
    Proceed,
    PreconditionFailed(String),
}

impl From<PreconditionState> for WriteDecision {
    fn from(state: PreconditionState) -> Self {
        match state {
            PreconditionState::NoPrecondition | PreconditionState::Matched => WriteDecision::Proceed,
            PreconditionState::Mismatched(reason) => WriteDecision::PreconditionFailed(reason),
        }
    }
}

impl WriteDecision {
    pub fn into_result(self) -> Result<(), CoreError> {
        match self {
            WriteDecision::Proceed => Ok(()),
            WriteDecision::PreconditionFailed(reason) => Err(CoreError::PreconditionFailed(reason)),
        }
    }
}

/// Result of a conditional read, carrying the stamp the response validators derive from.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome<T> {
    Full {
        value: T,
        last_modified: Option<DateTime<Utc>>,
    },
    NotModified {
        last_modified: Option<DateTime<Utc>>,
    },
}

impl<T> ReadOutcome<T> {
    pub fn decide(
        decision: ReadDecision,
        last_modified: Option<DateTime<Utc>>,
        value: impl FnOnce() -> T,
    ) -> Self {
        match decision {
            ReadDecision::Full => ReadOutcome::Full {
                value: value(),
                last_modified,
            },
            ReadDecision::NotModified => ReadOutcome::NotModified { last_modified },
        }
    }

    pub fn is_not_modified(&self) -> bool {
        matches!(self, ReadOutcome::NotModified { .. })
    }

    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        match self {
            ReadOutcome::Full { last_modified, .. } | ReadOutcome::NotModified { last_modified } => {
                *last_modified
            }
        }
    }

    pub fn token(&self) -> Option<ChangeToken> {
        self.last_modified().map(ChangeToken::from_timestamp)
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            ReadOutcome::Full { value, .. } => Some(value),
            ReadOutcome::NotModified { .. } => None,
        }
    }
}

pub fn change_token(last_modified: DateTime<Utc>) -> ChangeToken {
    ChangeToken::from_timestamp(last_modified)
}

/// HTTP-date bounds carry whole seconds; compare at that resolution.
fn http_resolution(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(0)
}

pub fn evaluate_read(last_modified: DateTime<Utc>, pre: &ReadPreconditions) -> ReadDecision {
    match pre.if_modified_since {
        Some(bound) if http_resolution(last_modified) <= bound => {
            debug!("Not modified since {}", bound);
            ReadDecision::NotModified
        }
        _ => ReadDecision::Full,
    }
}

/// Collection variant: not modified only when no item changed after the bound.
/// An empty collection always yields the full (empty) representation.
pub fn evaluate_collection_read<I>(stamps: I, pre: &ReadPreconditions) -> (ReadDecision, Option<DateTime<Utc>>)
where
    I: IntoIterator<Item = DateTime<Utc>>,
{
    let newest = stamps.into_iter().max();
    let decision = match newest {
        Some(stamp) => evaluate_read(stamp, pre),
        None => ReadDecision::Full,
    };
    (decision, newest)
}

/// Checks write preconditions against the current stamp.
///
/// `If-Unmodified-Since` is an HTTP-date, so it is compared at whole-second
/// resolution: a competing write that lands in the same second as the
/// client's read still passes it. `If-Match` compares the full-precision
/// change token and is the validator to use when that window matters.
pub fn precondition_state(last_modified: DateTime<Utc>, pre: &WritePreconditions) -> PreconditionState {
    if pre.if_match.is_none() && pre.if_unmodified_since.is_none() {
        return PreconditionState::NoPrecondition;
    }

    if let Some(if_match) = &pre.if_match {
        let current = change_token(last_modified);
        if !if_match.matches(&current) {
            return PreconditionState::Mismatched(format!(
                "resource has changed; current token is {}",
                current
            ));
        }
    }

    if let Some(bound) = pre.if_unmodified_since {
        if bound < http_resolution(last_modified) {
            return PreconditionState::Mismatched(format!(
                "resource was modified at {}, after {}",
                last_modified.to_rfc2822(),
                bound.to_rfc2822()
            ));
        }
    }

    PreconditionState::Matched
}

pub fn evaluate_write(last_modified: DateTime<Utc>, pre: &WritePreconditions) -> WriteDecision {
    let decision = WriteDecision::from(precondition_state(last_modified, pre));
    debug!("Write precondition decision: {:?}", decision);
    decision
}

/// Commit time for a mutation. Never regresses, even when `now` lags behind `prev`.
pub fn next_timestamp(
    prev: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    min_advance: Duration,
) -> DateTime<Utc> {
    match prev {
        Some(prev) if now <= prev => prev + min_advance,
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 6, 1, 12, 0, 0).unwrap() + Duration::microseconds(250_000)
    }

    #[test]
    fn read_one_second_after_is_not_modified() {
        let lm = stamp();
        let pre = ReadPreconditions {
            if_modified_since: Some(http_resolution(lm) + Duration::seconds(1)),
        };
        assert_eq!(evaluate_read(lm, &pre), ReadDecision::NotModified);
    }

    #[test]
    fn read_before_creation_is_full() {
        let lm = stamp();
        let pre = ReadPreconditions {
            if_modified_since: Some(lm - Duration::seconds(5)),
        };
        assert_eq!(evaluate_read(lm, &pre), ReadDecision::Full);
        assert_eq!(evaluate_read(lm, &ReadPreconditions::default()), ReadDecision::Full);
    }

    #[test]
    fn read_at_same_second_is_not_modified() {
        // Last-Modified is emitted at second resolution and echoed back
        let lm = stamp();
        let pre = ReadPreconditions {
            if_modified_since: Some(http_resolution(lm)),
        };
        assert_eq!(evaluate_read(lm, &pre), ReadDecision::NotModified);
    }

    #[test]
    fn empty_collection_is_full() {
        let pre = ReadPreconditions {
            if_modified_since: Some(stamp()),
        };
        let (decision, newest) = evaluate_collection_read(Vec::new(), &pre);
        assert_eq!(decision, ReadDecision::Full);
        assert_eq!(newest, None);
    }

    #[test]
    fn collection_uses_newest_item() {
        let lm = stamp();
        let pre = ReadPreconditions {
            if_modified_since: Some(http_resolution(lm) + Duration::seconds(1)),
        };
        let (decision, _) = evaluate_collection_read(vec![lm, lm - Duration::hours(1)], &pre);
        assert_eq!(decision, ReadDecision::NotModified);

        let (decision, newest) =
            evaluate_collection_read(vec![lm, lm + Duration::seconds(3)], &pre);
        assert_eq!(decision, ReadDecision::Full);
        assert_eq!(newest, Some(lm + Duration::seconds(3)));
    }

    #[test]
    fn stale_token_fails_write() {
        let lm = stamp();
        let stale = change_token(lm - Duration::seconds(1));
        let decision = evaluate_write(lm, &WritePreconditions::if_match(stale));
        assert!(matches!(decision, WriteDecision::PreconditionFailed(_)));

        let fresh = change_token(lm);
        assert_eq!(evaluate_write(lm, &WritePreconditions::if_match(fresh)), WriteDecision::Proceed);
    }

    #[test]
    fn unmodified_since_before_stamp_fails_write() {
        let lm = stamp();
        assert!(matches!(
            evaluate_write(lm, &WritePreconditions::if_unmodified_since(lm - Duration::seconds(1))),
            WriteDecision::PreconditionFailed(_)
        ));
        assert_eq!(
            evaluate_write(lm, &WritePreconditions::if_unmodified_since(http_resolution(lm))),
            WriteDecision::Proceed
        );
        assert_eq!(
            precondition_state(lm, &WritePreconditions::default()),
            PreconditionState::NoPrecondition
        );
    }

    #[test]
    fn same_second_write_passes_date_but_not_token() {
        let read = stamp();
        let competing = read + Duration::milliseconds(100);

        let by_date = WritePreconditions::if_unmodified_since(http_resolution(read));
        assert_eq!(evaluate_write(competing, &by_date), WriteDecision::Proceed);

        let by_token = WritePreconditions::if_match(change_token(read));
        assert!(matches!(
            evaluate_write(competing, &by_token),
            WriteDecision::PreconditionFailed(_)
        ));
    }

    #[test]
    fn timestamps_never_regress() {
        let prev = stamp();
        let step = Duration::microseconds(1);
        assert_eq!(next_timestamp(Some(prev), prev - Duration::seconds(30), step), prev + step);
        assert_eq!(next_timestamp(Some(prev), prev, step), prev + step);
        let later = prev + Duration::seconds(1);
        assert_eq!(next_timestamp(Some(prev), later, step), later);
        assert_eq!(next_timestamp(None, prev, step), prev);
    }
}
