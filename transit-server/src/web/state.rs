//! Application state for the web layer.

use std::sync::Arc;

use crate::store::LineStore;

/// Shared application state.
pub struct AppState<B> {
    /// Cache-first line data
    pub store: Arc<LineStore<B>>,
}

impl<B> AppState<B> {
    pub fn new(store: Arc<LineStore<B>>) -> Self {
        Self { store }
    }
}

// Manual impl: `B` itself need not be `Clone`.
impl<B> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}
