//! Serves recorded interactions back in order.

use std::collections::{HashMap, VecDeque};

use super::format::{Cassette, Interaction};

/// Replays a cassette, keeping one independent queue per port/method pair.
pub struct CassetteReplayer {
    queues: HashMap<(String, String), VecDeque<Interaction>>,
}

impl CassetteReplayer {
    /// Build a replayer over every interaction in `cassette`.
    #[must_use]
    pub fn new(cassette: &Cassette) -> Self {
        let mut queues: HashMap<(String, String), VecDeque<Interaction>> = HashMap::new();
        for interaction in &cassette.interactions {
            queues
                .entry((interaction.port.clone(), interaction.method.clone()))
                .or_default()
                .push_back(interaction.clone());
        }
        Self { queues }
    }

    /// Take the next interaction recorded for `port`/`method`.
    ///
    /// # Errors
    ///
    /// Returns a message naming the exhausted pair and what remains.
    pub fn next_interaction(&mut self, port: &str, method: &str) -> Result<Interaction, String> {
        let key = (port.to_string(), method.to_string());
        if let Some(next) = self.queues.get_mut(&key).and_then(VecDeque::pop_front) {
            return Ok(next);
        }
        let mut remaining: Vec<String> = self
            .queues
            .iter()
            .filter(|(_, q)| !q.is_empty())
            .map(|((p, m), q)| format!("{p}::{m} x{}", q.len()))
            .collect();
        remaining.sort();
        Err(format!(
            "cassette exhausted for {port}::{method}; remaining: [{}]",
            remaining.join(", ")
        ))
    }

    /// Interactions not yet served, across all ports.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }
}
