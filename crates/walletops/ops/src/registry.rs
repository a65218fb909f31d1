//! Operation registry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::builtin::{BalanceOperation, DrainOperation, DummyOperation, FundOperation};
use crate::error::{OperationError, Result};
use crate::operation::Operation;

/// Name to operation lookup table, filled at start-up.
#[derive(Default, Clone)]
pub struct OperationRegistry {
    operations: HashMap<String, Arc<dyn Operation>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in operation.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(BalanceOperation));
        registry.register(Arc::new(FundOperation));
        registry.register(Arc::new(DrainOperation));
        registry.register(Arc::new(DummyOperation::default()));
        registry
    }

    /// Add or replace an operation under its own name.
    pub fn register(&mut self, operation: Arc<dyn Operation>) {
        self.operations
            .insert(operation.name().to_string(), operation);
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Operation>> {
        self.operations
            .get(name)
            .cloned()
            .ok_or_else(|| OperationError::UnknownOperation(name.to_string()))
    }

    /// All operations sorted by name.
    pub fn list(&self) -> Vec<Arc<dyn Operation>> {
        let mut ops: Vec<_> = self.operations.values().cloned().collect();
        ops.sort_by_key(|op| op.name());
        ops
    }
}
