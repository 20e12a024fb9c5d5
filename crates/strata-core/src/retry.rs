//! Retry classification for backup errors
//!
//! This core never retries internally. It only decides which failures are
//! worth another attempt; the scheduler that owns the job loop plugs one of
//! these predicates into its own retry policy.

use crate::error::{Error, ErrorKind};

/// Decides whether a failed backup step may be attempted again
pub trait RetryPredicate<E: ?Sized>: Send + Sync {
    fn should_retry(&self, error: &E) -> bool;
}

/// Retries everything; useful for scheduler tests
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRetry;

impl<E: ?Sized> RetryPredicate<E> for AlwaysRetry {
    fn should_retry(&self, _error: &E) -> bool {
        true
    }
}

/// Treats every failure as final
#[derive(Debug, Clone, Copy)]
pub struct NeverRetry;

impl<E: ?Sized> RetryPredicate<E> for NeverRetry {
    fn should_retry(&self, _error: &E) -> bool {
        false
    }
}

/// Caller supplied retry rule
pub struct ClosurePredicate<F> {
    predicate: F,
}

impl<F> ClosurePredicate<F> {
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<E, F> RetryPredicate<E> for ClosurePredicate<F>
where
    F: Fn(&E) -> bool + Send + Sync,
{
    fn should_retry(&self, error: &E) -> bool {
        (self.predicate)(error)
    }
}

/// Retries exactly the error kinds the backup classifier marks as transient
#[derive(Debug, Clone, Copy, Default)]
pub struct BackupErrorPredicate;

impl RetryPredicate<Error> for BackupErrorPredicate {
    fn should_retry(&self, error: &Error) -> bool {
        error.is_need_retry()
    }
}

impl RetryPredicate<ErrorKind> for BackupErrorPredicate {
    fn should_retry(&self, kind: &ErrorKind) -> bool {
        kind.is_need_retry()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_always_and_never_retry() {
        let err = Error::invalid_argument("bad");
        assert!(AlwaysRetry.should_retry(&err));
        assert!(!NeverRetry.should_retry(&err));
    }

    #[test]
    fn test_backup_error_predicate() {
        let predicate = BackupErrorPredicate;
        assert!(predicate.should_retry(&Error::timeout("rpc")));
        assert!(!predicate.should_retry(&Error::checksum_error("crc")));
        assert!(!predicate.should_retry(&ErrorKind::LogArchiveStatusNotMatch));
        assert!(predicate.should_retry(&ErrorKind::Io));
    }

    #[test]
    fn test_closure_predicate_selective() {
        let predicate =
            ClosurePredicate::new(|err: &Error| matches!(err.kind(), ErrorKind::Again));
        assert!(predicate.should_retry(&Error::again("busy")));
        assert!(!predicate.should_retry(&Error::timeout("slow")));
    }
}
