use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use super::{Oracle, OracleError};

/// Scripted oracle: answers prompts in order from a queue and records every
/// prompt it receives. An exhausted queue fails with `NotConfigured`.
#[derive(Default)]
pub struct MockOracle {
    script: Mutex<VecDeque<Result<String, OracleError>>>,
    prompts: Mutex<Vec<String>>,
    /// Explicit temperature per call; `None` for `invoke`.
    temperatures: Mutex<Vec<Option<f32>>>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Oracle answering each prompt with the next response, in order.
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let oracle = Self::new();
        for r in responses {
            oracle.push_response(r);
        }
        oracle
    }

    pub fn push_response(&self, response: impl Into<String>) {
        lock(&self.script).push_back(Ok(response.into()));
    }

    pub fn push_error(&self, error: OracleError) {
        lock(&self.script).push_back(Err(error));
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.prompts).len()
    }

    pub fn temperatures(&self) -> Vec<Option<f32>> {
        lock(&self.temperatures).clone()
    }

    fn answer(&self, prompt: &str, temperature: Option<f32>) -> Result<String, OracleError> {
        lock(&self.prompts).push(prompt.to_string());
        lock(&self.temperatures).push(temperature);
        lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| Err(OracleError::NotConfigured("mock oracle has no scripted response".into())))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Oracle for MockOracle {
    fn invoke(&self, prompt: &str) -> Result<String, OracleError> {
        self.answer(prompt, None)
    }

    fn invoke_at(&self, prompt: &str, temperature: f32) -> Result<String, OracleError> {
        self.answer(prompt, Some(temperature))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_in_order_and_records_prompts() {
        let oracle = MockOracle::with_responses(["first", "second"]);
        assert_eq!(oracle.invoke("a").unwrap(), "first");
        assert_eq!(oracle.invoke("b").unwrap(), "second");
        assert_eq!(oracle.prompts(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn records_explicit_temperatures() {
        let oracle = MockOracle::with_responses(["first", "second"]);
        oracle.invoke("a").unwrap();
        oracle.invoke_at("b", 0.3).unwrap();
        assert_eq!(oracle.temperatures(), vec![None, Some(0.3)]);
    }

    #[test]
    fn scripted_error_is_returned() {
        let oracle = MockOracle::new();
        oracle.push_error(OracleError::Timeout { secs: 1 });
        assert_eq!(oracle.invoke("x"), Err(OracleError::Timeout { secs: 1 }));
    }

    #[test]
    fn exhausted_script_fails() {
        let oracle = MockOracle::new();
        assert!(matches!(oracle.invoke("x"), Err(OracleError::NotConfigured(_))));
        assert_eq!(oracle.call_count(), 1);
    }
}
