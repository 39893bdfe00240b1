use serde::Serialize;

/// Outcome tally of a settled batch of requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseCount {
    /// Number of requests that completed successfully.
    pub success_count: usize,
    /// Number of requests that failed.
    pub error_count: usize,
}

impl ResponseCount {
    /// Total number of settled requests.
    pub fn total(&self) -> usize {
        self.success_count + self.error_count
    }
}

/// Classifies each settled result and counts the two outcomes.
///
/// ```
/// use webui_api_core::{ResponseCount, get_response_count};
///
/// let results: Vec<Result<u16, String>> = vec![Ok(200), Err("x".into()), Ok(204)];
/// assert_eq!(
///     get_response_count(&results),
///     ResponseCount { success_count: 2, error_count: 1 }
/// );
/// ```
pub fn get_response_count<T, E>(responses: &[Result<T, E>]) -> ResponseCount {
    responses
        .iter()
        .fold(ResponseCount::default(), |mut count, response| {
            match response {
                Ok(_) => count.success_count += 1,
                Err(_) => count.error_count += 1,
            }
            count
        })
}
