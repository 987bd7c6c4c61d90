//! A minimal `Either` sum type, kept only as the internal representation
//! [`crate::effect::constructors::from_either`] consumes. Not a
//! general-purpose utility users are expected to reach for.

use std::fmt;

/// A value that is either `Left(L)` or `Right(R)`.
///
/// By convention `Right` is the success/happy-path branch, matching
/// `from_either`'s `Right → Ok`, `Left → Err(Expected(left))` mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Either<L, R> {
    /// The left variant (by convention, the failure branch).
    Left(L),
    /// The right variant (by convention, the success branch).
    Right(R),
}

impl<L, R> Either<L, R> {
    /// Construct a `Left`.
    pub fn left(value: L) -> Self {
        Either::Left(value)
    }

    /// Construct a `Right`.
    pub fn right(value: R) -> Self {
        Either::Right(value)
    }

    /// `true` for `Left`.
    pub fn is_left(&self) -> bool {
        matches!(self, Either::Left(_))
    }

    /// `true` for `Right`.
    pub fn is_right(&self) -> bool {
        matches!(self, Either::Right(_))
    }

    /// Transform the `Right` branch, leaving `Left` untouched.
    pub fn map<R2>(self, f: impl FnOnce(R) -> R2) -> Either<L, R2> {
        match self {
            Either::Left(l) => Either::Left(l),
            Either::Right(r) => Either::Right(f(r)),
        }
    }

    /// Collapse both branches to a single type.
    pub fn fold<T>(self, on_left: impl FnOnce(L) -> T, on_right: impl FnOnce(R) -> T) -> T {
        match self {
            Either::Left(l) => on_left(l),
            Either::Right(r) => on_right(r),
        }
    }

    /// `Right(r) -> Ok(r)`, `Left(l) -> Err(l)`.
    pub fn into_result(self) -> Result<R, L> {
        match self {
            Either::Right(r) => Ok(r),
            Either::Left(l) => Err(l),
        }
    }
}

impl<L, R> From<Result<R, L>> for Either<L, R> {
    fn from(result: Result<R, L>) -> Self {
        match result {
            Ok(r) => Either::Right(r),
            Err(l) => Either::Left(l),
        }
    }
}

impl<L, R> From<Either<L, R>> for Result<R, L> {
    fn from(either: Either<L, R>) -> Self {
        either.into_result()
    }
}

impl<L: fmt::Display, R: fmt::Display> fmt::Display for Either<L, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Either::Left(l) => write!(f, "Left({l})"),
            Either::Right(r) => write!(f, "Right({r})"),
        }
    }
}
