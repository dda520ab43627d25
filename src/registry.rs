//! Method registry: name → handler mapping (§4.C).
//!
//! Backed by `DashMap` so registration, lookup, and concurrent dispatch
//! from many connections never contend on one lock. `register` follows
//! last-write-wins semantics — re-registering a name is not an error.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

use crate::error::RpcError;

/// A boxed, type-erased future returning a handler's JSON result.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Value, RpcError>> + Send>>;

/// A registered method: takes the params JSON array and returns a
/// future resolving to a JSON result or an [`RpcError`] (§3 "Registered
/// method").
pub trait Handler: Send + Sync {
    fn call(&self, params: Value) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, RpcError>> + Send + 'static,
{
    fn call(&self, params: Value) -> HandlerFuture {
        Box::pin((self)(params))
    }
}

/// The server's name → handler mapping.
#[derive(Default)]
pub struct MethodRegistry {
    handlers: DashMap<String, Arc<dyn Handler>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`. Last write wins — this is a
    /// normal operation, not an error (§4.C).
    pub fn register(&self, name: impl Into<String>, handler: impl Handler + 'static) {
        self.handlers.insert(name.into(), Arc::new(handler));
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn clear(&self) {
        self.handlers.clear();
    }

    pub fn method_names(&self) -> Vec<String> {
        self.handlers.iter().map(|e| e.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn register_and_lookup() {
        let registry = MethodRegistry::new();
        registry.register("ping", |_params: Value| async { Ok(json!("pong")) });

        let handler = registry.lookup("ping").expect("registered");
        let result = handler.call(json!([])).await.unwrap();
        assert_eq!(result, json!("pong"));

        assert!(registry.lookup("missing").is_none());
    }

    #[tokio::test]
    async fn last_write_wins() {
        let registry = MethodRegistry::new();
        registry.register("m", |_p: Value| async { Ok(json!(1)) });
        registry.register("m", |_p: Value| async { Ok(json!(2)) });

        let handler = registry.lookup("m").unwrap();
        assert_eq!(handler.call(json!([])).await.unwrap(), json!(2));
    }

    #[test]
    fn clear_empties_registry() {
        let registry = MethodRegistry::new();
        registry.register("a", |_p: Value| async { Ok(Value::Null) });
        registry.clear();
        assert!(registry.method_names().is_empty());
    }
}
