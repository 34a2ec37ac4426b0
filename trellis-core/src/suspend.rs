//! Suspendable step sequences.
//!
//! A [`Suspendable`] is an explicit state machine: it is resumed with a
//! [`Resume`] input and answers with a [`Step`], either yielding a value
//! that has to be resolved before it can advance, completing with the final
//! response, or failing.
//!
//! The driver lives in [`HandlerResult::resolve`]. It starts the sequence with
//! [`Resume::Start`], resumes it synchronously with [`Yielded::Immediate`]
//! values and suspends on [`Yielded::Deferred`] values. When a yielded
//! deferred value fails, the sequence is abandoned and the failure propagated.
//!
//! Yielded values are type-erased so that each step may await a value of a
//! different type. [`Resume::take`] recovers the typed value, reporting
//! [`Failure::InvalidYield`] when the sequence is resumed with anything else.
//!
//! # Example
//!
//! ```
//! use trellis_core::{HandlerResult, Resume, Step, Suspendable, Yielded};
//!
//! /// Looks up a user id, then the user's name, then greets.
//! enum Greeter {
//!     LookupId,
//!     LookupName,
//!     Done,
//! }
//!
//! impl Suspendable<String> for Greeter {
//!     fn resume(&mut self, input: Resume) -> Step<String> {
//!         match self {
//!             Self::LookupId => {
//!                 *self = Self::LookupName;
//!                 Step::Yielded(Yielded::deferred(async { Ok(42u64) }))
//!             }
//!             Self::LookupName => {
//!                 *self = Self::Done;
//!                 match input.take::<u64>() {
//!                     Ok(id) => Step::Yielded(Yielded::immediate(format!("user-{id}"))),
//!                     Err(failure) => Step::Failed(failure),
//!                 }
//!             }
//!             Self::Done => match input.take::<String>() {
//!                 Ok(name) => Step::Completed(format!("Hello {name}!")),
//!                 Err(failure) => Step::Failed(failure),
//!             },
//!         }
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let greeting = HandlerResult::suspendable(Greeter::LookupId).resolve().await.unwrap();
//! assert_eq!(greeting, "Hello user-42!");
//! # }
//! ```
//!
//! [`HandlerResult::resolve`]: crate::HandlerResult::resolve

use crate::telemetry::tracing;
use crate::{Deferred, Failure};
use std::any::{Any, type_name};
use std::fmt;

/// Type-erased value passed between a [`Suspendable`] sequence and its driver.
pub type Value = Box<dyn Any + Send>;

/// A multi-step computation which can pause on deferred values.
pub trait Suspendable<Res>: Send {
    /// Advance the sequence by one step.
    ///
    /// The driver never calls this again once [`Step::Completed`]
    /// or [`Step::Failed`] has been returned.
    fn resume(&mut self, input: Resume) -> Step<Res>;
}

impl<F, Res> Suspendable<Res> for F
where
    F: FnMut(Resume) -> Step<Res> + Send,
{
    fn resume(&mut self, input: Resume) -> Step<Res> {
        (self)(input)
    }
}

/// Input handed to [`Suspendable::resume`].
pub enum Resume {
    /// First resumption, nothing was yielded yet.
    Start,
    /// The resolved value of the previously yielded step.
    Value(Value),
}

impl Resume {
    /// Returns `true` if this is the first resumption of the sequence.
    #[must_use]
    pub fn is_start(&self) -> bool {
        matches!(self, Self::Start)
    }

    /// Take the resumed value as a `T`.
    ///
    /// Fails with [`Failure::InvalidYield`] if there is no value
    /// or if it is not a `T`.
    pub fn take<T: Any>(self) -> Result<T, Failure> {
        let invalid = Failure::InvalidYield {
            expected: type_name::<T>(),
        };
        match self {
            Self::Start => Err(invalid),
            Self::Value(value) => value
                .downcast::<T>()
                .map(|value| *value)
                .map_err(|_value| invalid),
        }
    }
}

impl fmt::Debug for Resume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => f.write_str("Resume::Start"),
            Self::Value(_) => f.write_str("Resume::Value(..)"),
        }
    }
}

/// A value yielded by a [`Suspendable`] sequence.
pub enum Yielded {
    /// Available right away, the sequence is resumed without suspension.
    Immediate(Value),
    /// Only available once the deferred value settles.
    Deferred(Deferred<Value>),
}

impl Yielded {
    /// Yield a value which is available right away.
    pub fn immediate<T: Any + Send>(value: T) -> Self {
        Self::Immediate(Box::new(value))
    }

    /// Yield a value which becomes available once the given future settles.
    pub fn deferred<T, F>(future: F) -> Self
    where
        T: Any + Send,
        F: Future<Output = Result<T, Failure>> + Send + 'static,
    {
        Self::Deferred(Deferred::new(async move {
            future.await.map(|value| Box::new(value) as Value)
        }))
    }
}

impl fmt::Debug for Yielded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate(_) => f.write_str("Yielded::Immediate(..)"),
            Self::Deferred(_) => f.write_str("Yielded::Deferred(..)"),
        }
    }
}

/// Outcome of a single [`Suspendable::resume`] call.
pub enum Step<Res> {
    /// The sequence is waiting on the yielded value.
    Yielded(Yielded),
    /// The sequence finished with its final response.
    Completed(Res),
    /// The sequence failed.
    Failed(Failure),
}

impl<Res> fmt::Debug for Step<Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yielded(yielded) => f.debug_tuple("Step::Yielded").field(yielded).finish(),
            Self::Completed(_) => f.write_str("Step::Completed(..)"),
            Self::Failed(failure) => f.debug_tuple("Step::Failed").field(failure).finish(),
        }
    }
}

pub(crate) async fn drive<Res>(mut sequence: Box<dyn Suspendable<Res>>) -> Result<Res, Failure> {
    let mut input = Resume::Start;
    let mut steps = 0usize;
    loop {
        steps += 1;
        input = match sequence.resume(input) {
            Step::Completed(res) => {
                tracing::trace!(steps, "suspendable sequence completed");
                return Ok(res);
            }
            Step::Failed(failure) => {
                tracing::trace!(steps, "suspendable sequence failed: {failure}");
                return Err(failure);
            }
            Step::Yielded(Yielded::Immediate(value)) => Resume::Value(value),
            Step::Yielded(Yielded::Deferred(deferred)) => match deferred.await {
                Ok(value) => Resume::Value(value),
                Err(failure) => {
                    tracing::trace!(steps, "abandon suspendable sequence: {failure}");
                    return Err(failure);
                }
            },
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HandlerResult;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Yields two deferred values of different types, then completes.
    struct TwoStep {
        state: u8,
        resumed: Arc<AtomicUsize>,
        fail_first: bool,
    }

    impl Suspendable<String> for TwoStep {
        fn resume(&mut self, input: Resume) -> Step<String> {
            self.resumed.fetch_add(1, Ordering::SeqCst);
            self.state += 1;
            match self.state {
                1 => {
                    let fail = self.fail_first;
                    Step::Yielded(Yielded::deferred(async move {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        if fail {
                            Err(Failure::application("lookup failed"))
                        } else {
                            Ok(7u32)
                        }
                    }))
                }
                2 => match input.take::<u32>() {
                    Ok(n) => Step::Yielded(Yielded::deferred(async move { Ok(format!("n={n}")) })),
                    Err(failure) => Step::Failed(failure),
                },
                _ => match input.take::<String>() {
                    Ok(s) => Step::Completed(s),
                    Err(failure) => Step::Failed(failure),
                },
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn drives_heterogeneous_steps() {
        let resumed = Arc::new(AtomicUsize::new(0));
        let result = HandlerResult::suspendable(TwoStep {
            state: 0,
            resumed: resumed.clone(),
            fail_first: false,
        });
        assert_eq!(result.resolve().await.unwrap(), "n=7");
        assert_eq!(resumed.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_deferred_abandons_sequence() {
        let resumed = Arc::new(AtomicUsize::new(0));
        let result = HandlerResult::suspendable(TwoStep {
            state: 0,
            resumed: resumed.clone(),
            fail_first: true,
        });
        let failure = result.resolve().await.unwrap_err();
        assert_eq!(failure.to_string(), "lookup failed");
        // never resumed after the failed step
        assert_eq!(resumed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn wrong_resume_type_is_invalid_yield() {
        let result = HandlerResult::<u8>::suspendable(|input: Resume| {
            if input.is_start() {
                Step::Yielded(Yielded::immediate("not a number"))
            } else {
                match input.take::<u8>() {
                    Ok(n) => Step::Completed(n),
                    Err(failure) => Step::Failed(failure),
                }
            }
        });
        let failure = result.resolve().await.unwrap_err();
        assert!(matches!(failure, Failure::InvalidYield { expected: "u8" }));
        assert!(failure.is_contract_violation());
    }

    #[tokio::test]
    async fn immediate_yields_resume_synchronously() {
        let mut counter = 0u32;
        let result = HandlerResult::suspendable(move |input: Resume| {
            if !input.is_start() {
                counter += match input.take::<u32>() {
                    Ok(n) => n,
                    Err(failure) => return Step::Failed(failure),
                };
            }
            if counter >= 3 {
                Step::Completed(counter)
            } else {
                Step::Yielded(Yielded::immediate(1u32))
            }
        });

        let mut fut = tokio_test::task::spawn(result.resolve());
        let out = tokio_test::assert_ready!(fut.poll());
        assert_eq!(out.unwrap(), 3);
    }

    #[test]
    fn take_on_start_is_invalid() {
        let failure = Resume::Start.take::<String>().unwrap_err();
        assert!(matches!(failure, Failure::InvalidYield { .. }));
    }
}
