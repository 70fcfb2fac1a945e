//! Recording delivery port for tests and local wiring

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::domain::entities::Channel;
use crate::errors::DeliveryError;

use super::traits::{DeliveryPort, OtpMessage};

/// A send observed by `RecordingDeliveryPort`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub destination: String,
    pub channel: Channel,
    pub code: String,
}

/// Delivery port that records every call and replays scripted outcomes
///
/// Scripted results are consumed in order; once the script is empty the
/// fallback result applies (success unless `fail_always` was called).
/// Only successful sends are recorded in `sent()`; `call_count()` counts all.
pub struct RecordingDeliveryPort {
    name: String,
    script: Mutex<VecDeque<Result<(), DeliveryError>>>,
    fallback: Mutex<Option<DeliveryError>>,
    latency: Mutex<Option<Duration>>,
    slow_destinations: Mutex<HashMap<String, Duration>>,
    sent: Mutex<Vec<SentMessage>>,
    calls: AtomicUsize,
}

impl RecordingDeliveryPort {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(None),
            latency: Mutex::new(None),
            slow_destinations: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Queue the outcome of the next unscripted call
    pub fn push_outcome(&self, outcome: Result<(), DeliveryError>) {
        lock(&self.script).push_back(outcome);
    }

    /// Fail every call that has no scripted outcome
    pub fn fail_always(&self, error: DeliveryError) {
        *lock(&self.fallback) = Some(error);
    }

    /// Delay every call, to exercise the engine's send timeout
    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.latency) = Some(latency);
    }

    /// Delay only the calls addressed to `destination`
    pub fn set_latency_for(&self, destination: &str, latency: Duration) {
        lock(&self.slow_destinations).insert(destination.to_string(), latency);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        lock(&self.sent).clone()
    }

    pub fn last_code_for(&self, destination: &str) -> Option<String> {
        lock(&self.sent)
            .iter()
            .rev()
            .find(|m| m.destination == destination)
            .map(|m| m.code.clone())
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for RecordingDeliveryPort {
    fn default() -> Self {
        Self::new("recording")
    }
}

#[async_trait]
impl DeliveryPort for RecordingDeliveryPort {
    async fn send(
        &self,
        destination: &str,
        channel: Channel,
        message: &OtpMessage,
    ) -> Result<String, DeliveryError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        let latency = lock(&self.slow_destinations)
            .get(destination)
            .copied()
            .or(*lock(&self.latency));
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let scripted = lock(&self.script).pop_front();
        let outcome = match scripted {
            Some(outcome) => outcome,
            None => match lock(&self.fallback).clone() {
                Some(error) => Err(error),
                None => Ok(()),
            },
        };
        outcome?;

        lock(&self.sent).push(SentMessage {
            destination: destination.to_string(),
            channel,
            code: message.code.clone(),
        });
        Ok(format!("{}-{}-{}", self.name, channel, n))
    }

    fn provider_name(&self) -> &str {
        &self.name
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
