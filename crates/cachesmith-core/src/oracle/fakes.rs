//! Scripted oracle for tests and dry runs.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::error::{OracleError, OracleResult};
use super::Oracle;

/// Replays a fixed queue of replies and records every prompt it receives.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    replies: Mutex<VecDeque<OracleResult<String>>>,
    prompts: Mutex<Vec<String>>,
    served: Mutex<usize>,
}

impl ScriptedOracle {
    pub fn new<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(sources.into_iter().map(|s| Ok(s.into())).collect()),
            ..Self::default()
        }
    }

    /// Queue a failing reply.
    pub fn then_fail(self, err: OracleError) -> Self {
        self.replies.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn generate(&self, prompt: &str) -> OracleResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let mut served = self.served.lock().unwrap();
        match self.replies.lock().unwrap().pop_front() {
            Some(reply) => {
                *served += 1;
                reply
            }
            None => Err(OracleError::Exhausted(*served)),
        }
    }
}
