//! Sample workload: a chain of counter steps.
//!
//! Each step waits, increments the value it was handed and passes it on. The
//! first step starts from 1 when it gets nothing, so a looping chain keeps
//! counting across rounds.

use anyhow::anyhow;
use gatekeep_core::{OperationRef, StepOutput};
use serde_json::{json, Value};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub fn counter_chain(steps: usize, delay: Duration) -> Vec<OperationRef> {
    (0..steps)
        .map(|index| -> OperationRef {
            Arc::new(move |params: Vec<Value>| -> anyhow::Result<StepOutput> {
                let value = match params.first().and_then(Value::as_i64) {
                    Some(value) => value,
                    None if index == 0 => 1,
                    None => return Err(anyhow!("step {} got no counter value", index + 1)),
                };
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
                let next = value + 1;
                Ok(StepOutput::chain(next.to_string(), vec![json!(next)]))
            })
        })
        .collect()
}
