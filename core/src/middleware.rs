//! Handler stack around the transport.
//!
//! # Design
//! A middleware takes the next handler and returns a new handler that wraps
//! it. The stack is an ordered list of optionally named middlewares that is
//! resolved once into a single `Transport`; the first middleware pushed is
//! the outermost one and sees the request first.

use std::sync::Arc;

use crate::transport::Transport;

/// Wraps a handler with extra behavior.
pub trait Middleware: Send + Sync {
    fn wrap(&self, next: Arc<dyn Transport>) -> Arc<dyn Transport>;
}

impl<F> Middleware for F
where
    F: Fn(Arc<dyn Transport>) -> Arc<dyn Transport> + Send + Sync,
{
    fn wrap(&self, next: Arc<dyn Transport>) -> Arc<dyn Transport> {
        self(next)
    }
}

/// Ordered middlewares plus the transport they wrap.
pub struct HandlerStack {
    transport: Arc<dyn Transport>,
    middlewares: Vec<(Option<String>, Arc<dyn Middleware>)>,
}

impl HandlerStack {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            middlewares: Vec::new(),
        }
    }

    /// Add a middleware at the inner end of the stack. Pushing a name that
    /// is already present replaces that middleware in place.
    pub fn push(&mut self, middleware: Arc<dyn Middleware>, name: Option<&str>) -> &mut Self {
        if let Some(name) = name {
            let existing = self
                .middlewares
                .iter_mut()
                .find(|(n, _)| n.as_deref() == Some(name));
            if let Some(slot) = existing {
                slot.1 = middleware;
                return self;
            }
        }
        self.middlewares.push((name.map(str::to_string), middleware));
        self
    }

    pub fn names(&self) -> Vec<Option<String>> {
        self.middlewares.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Compose every middleware around the transport.
    pub fn resolve(&self) -> Arc<dyn Transport> {
        self.middlewares
            .iter()
            .rev()
            .fold(Arc::clone(&self.transport), |next, (_, middleware)| middleware.wrap(next))
    }
}
