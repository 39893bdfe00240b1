//! Running several requests together.

use std::future::Future;

use futures::future::{join_all, try_join_all};

use crate::ApiError;

/// Run every request concurrently, failing with the first error.
///
/// Results keep the order of `requests`.
pub async fn all<I, F, T, E>(requests: I) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    try_join_all(requests).await
}

/// Run every request concurrently and collect each outcome.
///
/// Pair with [`get_response_count`](crate::get_response_count) to tally
/// the batch.
pub async fn all_settled<I, F, T, E>(requests: I) -> Vec<Result<T, E>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    join_all(requests).await
}

/// A callback taking one argument per batch result.
///
/// Implemented for `Fn` closures of one to six arguments of the same type.
/// `Args` only tells the implementations apart.
pub trait Spread<T, Args> {
    type Output;

    /// Number of results the callback takes.
    fn arity(&self) -> usize;

    /// Call with `values` spread over the arguments.
    fn spread_call(&self, values: Vec<T>) -> Result<Self::Output, ApiError>;
}

macro_rules! impl_spread {
    (@ty $arg:ident) => { T };
    ($arity:literal; $($arg:ident),+) => {
        impl<F, T, R> Spread<T, [(); $arity]> for F
        where
            F: Fn($(impl_spread!(@ty $arg)),+) -> R,
        {
            type Output = R;

            fn arity(&self) -> usize {
                $arity
            }

            fn spread_call(&self, values: Vec<T>) -> Result<R, ApiError> {
                let found = values.len();
                let [$($arg),+]: [T; $arity] = values
                    .try_into()
                    .map_err(|_| ApiError::Arity { expected: $arity, found })?;
                Ok(self($($arg),+))
            }
        }
    };
}

impl_spread!(1; a);
impl_spread!(2; a, b);
impl_spread!(3; a, b, c);
impl_spread!(4; a, b, c, d);
impl_spread!(5; a, b, c, d, e);
impl_spread!(6; a, b, c, d, e, f);

/// Adapt `callback` to take the `Vec` produced by [`all`].
///
/// ```
/// use webui_api::spread;
///
/// let sum = spread(|a: u32, b: u32| a + b);
/// assert_eq!(sum(vec![1, 2]).unwrap(), 3);
/// assert!(sum(vec![1, 2, 3]).is_err());
/// ```
pub fn spread<T, Args, F>(callback: F) -> impl Fn(Vec<T>) -> Result<F::Output, ApiError>
where
    F: Spread<T, Args>,
{
    move |values| callback.spread_call(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    async fn ok(value: u32) -> Result<u32, ApiError> {
        Ok(value)
    }

    async fn fail(expected: usize) -> Result<u32, ApiError> {
        Err(ApiError::Arity { expected, found: 0 })
    }

    #[tokio::test]
    async fn test_all_keeps_order() {
        let values = all(vec![ok(1), ok(2), ok(3)]).await.unwrap();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_all_fails_on_error() {
        let error = all(vec![ok(1).boxed(), fail(7).boxed()]).await.unwrap_err();
        assert!(matches!(error, ApiError::Arity { expected: 7, .. }));
    }

    #[tokio::test]
    async fn test_all_settled_collects_every_outcome() {
        let results = all_settled(vec![ok(1).boxed(), fail(1).boxed(), ok(3).boxed()]).await;
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap(), &3);
    }

    #[test]
    fn test_spread_arities() {
        assert_eq!(spread(|a: u8| a)(vec![1]).unwrap(), 1);
        assert_eq!(
            spread(|a: u8, b: u8, c: u8, d: u8, e: u8, f: u8| a + b + c + d + e + f)(vec![
                1, 2, 3, 4, 5, 6
            ])
            .unwrap(),
            21
        );
    }

    #[test]
    fn test_spread_arity_mismatch() {
        let pair = spread(|a: u8, b: u8| (a, b));
        let error = pair(vec![1]).unwrap_err();
        assert!(matches!(
            error,
            ApiError::Arity {
                expected: 2,
                found: 1
            }
        ));
    }
}
