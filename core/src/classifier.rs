//! Failure classification for exception filtering
//!
//! This module decides which failures count toward tripping the circuit.
//! Failures are matched against [`Category`] values: content-based predicates
//! over the failed outcome rather than a type hierarchy. A deadline expiry is
//! itself a category ([`Category::timeout`]) and is filtered like any other.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Outcome of a call that did not produce a value
#[derive(Debug, Clone, Copy)]
pub enum Failure<'a> {
    /// The call deadline expired before the operation returned
    Timeout,
    /// The operation returned an error (can be downcast to its concrete type)
    Error(&'a dyn Any),
}

/// Context provided to failure classifiers for error evaluation
#[derive(Debug)]
pub struct FailureContext<'a> {
    /// Circuit name
    pub circuit_name: &'a str,
    /// What went wrong
    pub failure: Failure<'a>,
    /// Duration of the failed call in seconds
    pub duration: f64,
}

/// Trait for classifying failures - determines if an error should trip the circuit
///
/// # Examples
///
/// ```rust
/// use circuit_breakage::{FailureClassifier, FailureContext, Failure};
///
/// #[derive(Debug)]
/// struct TimeoutsOnly;
///
/// impl FailureClassifier for TimeoutsOnly {
///     fn should_trip(&self, ctx: &FailureContext<'_>) -> bool {
///         matches!(ctx.failure, Failure::Timeout)
///     }
/// }
/// ```
pub trait FailureClassifier: Send + Sync + fmt::Debug {
    /// Returns `true` if the failure should count toward opening the circuit.
    fn should_trip(&self, ctx: &FailureContext<'_>) -> bool;
}

/// Default classifier that trips on all errors
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassifier;

impl FailureClassifier for DefaultClassifier {
    fn should_trip(&self, _ctx: &FailureContext<'_>) -> bool {
        true
    }
}

/// Predicate-based classifier using a closure
pub struct PredicateClassifier<F>
where
    F: Fn(&FailureContext<'_>) -> bool + Send + Sync,
{
    predicate: F,
}

impl<F> PredicateClassifier<F>
where
    F: Fn(&FailureContext<'_>) -> bool + Send + Sync,
{
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F> FailureClassifier for PredicateClassifier<F>
where
    F: Fn(&FailureContext<'_>) -> bool + Send + Sync,
{
    fn should_trip(&self, ctx: &FailureContext<'_>) -> bool {
        (self.predicate)(ctx)
    }
}

impl<F> fmt::Debug for PredicateClassifier<F>
where
    F: Fn(&FailureContext<'_>) -> bool + Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateClassifier")
            .field("predicate", &"<closure>")
            .finish()
    }
}

type Matcher = dyn Fn(&Failure<'_>) -> bool + Send + Sync;

/// A named class of failures
///
/// A single failure may belong to several categories, which is how a broad
/// category ("any `ApiError`") and a narrow one ("`ApiError::NotFound`") can
/// both be listed in a breaker's configuration.
#[derive(Clone)]
pub struct Category {
    name: Cow<'static, str>,
    matcher: Arc<Matcher>,
}

impl Category {
    /// Deadline expiry of the protected call
    pub fn timeout() -> Self {
        Self::custom("timeout", |failure| matches!(failure, Failure::Timeout))
    }

    /// Every error of concrete type `E`
    pub fn of<E: Any>() -> Self {
        Self::custom(std::any::type_name::<E>(), |failure| match failure {
            Failure::Error(e) => e.is::<E>(),
            Failure::Timeout => false,
        })
    }

    /// Errors of type `E` for which `predicate` holds
    pub fn matching<E, F>(name: impl Into<Cow<'static, str>>, predicate: F) -> Self
    where
        E: Any,
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        Self::custom(name, move |failure| match failure {
            Failure::Error(e) => e.downcast_ref::<E>().is_some_and(&predicate),
            Failure::Timeout => false,
        })
    }

    /// Arbitrary predicate over the failure
    pub fn custom<F>(name: impl Into<Cow<'static, str>>, matcher: F) -> Self
    where
        F: Fn(&Failure<'_>) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            matcher: Arc::new(matcher),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matches(&self, failure: &Failure<'_>) -> bool {
        (self.matcher)(failure)
    }
}

impl fmt::Debug for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Category").field(&self.name).finish()
    }
}

/// Allow/deny list classifier
///
/// - a failure matching any `never_trip_on` entry never counts, even if it is
///   also in `only_trip_on`
/// - otherwise, if `only_trip_on` is non-empty, only matching failures count
/// - otherwise every failure counts
#[derive(Debug, Clone, Default)]
pub struct TripFilter {
    pub only_trip_on: Vec<Category>,
    pub never_trip_on: Vec<Category>,
}

impl TripFilter {
    pub fn new(only_trip_on: Vec<Category>, never_trip_on: Vec<Category>) -> Self {
        Self {
            only_trip_on,
            never_trip_on,
        }
    }

    pub fn is_tripping(&self, failure: &Failure<'_>) -> bool {
        if self.never_trip_on.iter().any(|c| c.matches(failure)) {
            return false;
        }
        self.only_trip_on.is_empty() || self.only_trip_on.iter().any(|c| c.matches(failure))
    }
}

impl FailureClassifier for TripFilter {
    fn should_trip(&self, ctx: &FailureContext<'_>) -> bool {
        self.is_tripping(&ctx.failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum ApiError {
        NotFound,
        Unavailable,
    }

    #[derive(Debug)]
    struct VerySpecificError;

    fn ctx<'a>(failure: Failure<'a>, duration: f64) -> FailureContext<'a> {
        FailureContext {
            circuit_name: "test",
            failure,
            duration,
        }
    }

    #[test]
    fn test_default_classifier_trips_all() {
        assert!(DefaultClassifier.should_trip(&ctx(Failure::Error(&"any error"), 0.1)));
        assert!(DefaultClassifier.should_trip(&ctx(Failure::Timeout, 0.1)));
    }

    #[test]
    fn test_predicate_classifier() {
        let classifier = PredicateClassifier::new(|ctx| ctx.duration > 1.0);

        assert!(!classifier.should_trip(&ctx(Failure::Error(&"fast error"), 0.5)));
        assert!(classifier.should_trip(&ctx(Failure::Error(&"slow error"), 2.0)));
    }

    #[test]
    fn test_empty_filter_trips_everything() {
        let filter = TripFilter::default();
        assert!(filter.is_tripping(&Failure::Error(&ApiError::NotFound)));
        assert!(filter.is_tripping(&Failure::Timeout));
    }

    #[test]
    fn test_only_trip_on_excludes_other_categories() {
        let filter = TripFilter::new(vec![Category::of::<VerySpecificError>()], vec![]);

        assert!(filter.is_tripping(&Failure::Error(&VerySpecificError)));
        assert!(!filter.is_tripping(&Failure::Error(&ApiError::Unavailable)));
        assert!(!filter.is_tripping(&Failure::Timeout));
    }

    #[test]
    fn test_never_trip_on_excludes_category() {
        let filter = TripFilter::new(vec![], vec![Category::of::<VerySpecificError>()]);

        assert!(!filter.is_tripping(&Failure::Error(&VerySpecificError)));
        assert!(filter.is_tripping(&Failure::Error(&ApiError::Unavailable)));
    }

    #[test]
    fn test_deny_list_wins_on_overlap() {
        let filter = TripFilter::new(
            vec![Category::of::<ApiError>()],
            vec![Category::matching::<ApiError, _>("not_found", |e| {
                matches!(e, ApiError::NotFound)
            })],
        );

        assert!(!filter.is_tripping(&Failure::Error(&ApiError::NotFound)));
        assert!(filter.is_tripping(&Failure::Error(&ApiError::Unavailable)));
    }

    #[test]
    fn test_timeout_is_filtered_like_any_category() {
        let ignore_timeouts = TripFilter::new(vec![], vec![Category::timeout()]);
        assert!(!ignore_timeouts.is_tripping(&Failure::Timeout));
        assert!(ignore_timeouts.is_tripping(&Failure::Error(&ApiError::Unavailable)));

        let only_timeouts = TripFilter::new(vec![Category::timeout()], vec![]);
        assert!(only_timeouts.is_tripping(&Failure::Timeout));
        assert!(!only_timeouts.is_tripping(&Failure::Error(&ApiError::Unavailable)));
    }

    #[test]
    fn test_category_names() {
        assert_eq!(Category::timeout().name(), "timeout");
        assert!(Category::of::<ApiError>().name().ends_with("ApiError"));
        assert_eq!(format!("{:?}", Category::timeout()), "Category(\"timeout\")");
    }
}
