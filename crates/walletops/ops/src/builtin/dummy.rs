use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use crate::error::Result;
use crate::operation::{Operation, OperationArgs, OperationContext};

/// Sleeps for a random while and succeeds. Used to drill interruption.
#[derive(Debug, Clone, Copy)]
pub struct DummyOperation {
    min: Duration,
    max: Duration,
}

impl Default for DummyOperation {
    fn default() -> Self {
        Self::with_range(Duration::from_secs(3), Duration::from_secs(13))
    }
}

impl DummyOperation {
    pub fn with_range(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max: max.max(min),
        }
    }
}

#[async_trait]
impl Operation for DummyOperation {
    fn name(&self) -> &'static str {
        "dummy"
    }

    fn description(&self) -> &'static str {
        "Sleep for a few seconds, then succeed"
    }

    fn help(&self) -> String {
        "dummy takes no arguments".to_string()
    }

    fn parse(&self, _raw: &str) -> Result<OperationArgs> {
        Ok(Arc::new(()))
    }

    async fn run(&self, ctx: &OperationContext) -> Result<String> {
        let millis = rand::thread_rng()
            .gen_range(self.min.as_millis() as u64..=self.max.as_millis() as u64);
        ctx.report(&format!("sleeping {}ms", millis));
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok("done".to_string())
    }
}
