//! Namespaced key/value persistence provided by the host.

use std::sync::Arc;

use crate::errors::CourierResult;

/// Trait for namespaced key/value persistence.
///
/// Backed by whatever durable storage the host has (preferences file,
/// settings database). Values survive process restarts.
pub trait IKeyValueStore: Send + Sync {
    /// Read a string value, `None` when absent.
    fn get_string(&self, namespace: &str, key: &str) -> CourierResult<Option<String>>;

    /// Write a string value.
    fn set_string(&self, namespace: &str, key: &str, value: &str) -> CourierResult<()>;

    /// Read an integer value, `None` when absent.
    fn get_i64(&self, namespace: &str, key: &str) -> CourierResult<Option<i64>>;

    /// Write an integer value.
    fn set_i64(&self, namespace: &str, key: &str, value: i64) -> CourierResult<()>;

    /// Remove a value if present.
    fn remove(&self, namespace: &str, key: &str) -> CourierResult<()>;
}

impl<T: IKeyValueStore + ?Sized> IKeyValueStore for Arc<T> {
    fn get_string(&self, namespace: &str, key: &str) -> CourierResult<Option<String>> {
        (**self).get_string(namespace, key)
    }

    fn set_string(&self, namespace: &str, key: &str, value: &str) -> CourierResult<()> {
        (**self).set_string(namespace, key, value)
    }

    fn get_i64(&self, namespace: &str, key: &str) -> CourierResult<Option<i64>> {
        (**self).get_i64(namespace, key)
    }

    fn set_i64(&self, namespace: &str, key: &str, value: i64) -> CourierResult<()> {
        (**self).set_i64(namespace, key, value)
    }

    fn remove(&self, namespace: &str, key: &str) -> CourierResult<()> {
        (**self).remove(namespace, key)
    }
}
