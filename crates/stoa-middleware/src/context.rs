//! Per-request state carried through the pipeline.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Context that flows through the middleware pipeline.
///
/// Stages use it to share data with each other and with the caller that
/// drove the pipeline, for example the path of a file that was served.
///
/// # Example
///
/// ```
/// use stoa_middleware::MiddlewareContext;
///
/// #[derive(Debug, PartialEq)]
/// struct Tag(&'static str);
///
/// let mut ctx = MiddlewareContext::new();
/// ctx.set_extension(Tag("static"));
/// assert_eq!(ctx.get_extension::<Tag>(), Some(&Tag("static")));
/// ```
#[derive(Debug)]
pub struct MiddlewareContext {
    request_id: Uuid,
    started_at: Instant,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl MiddlewareContext {
    /// Creates a context with a fresh UUID v7 request ID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(Uuid::now_v7())
    }

    /// Creates a context with a specific request ID.
    #[must_use]
    pub fn with_request_id(request_id: Uuid) -> Self {
        Self {
            request_id,
            started_at: Instant::now(),
            extensions: HashMap::new(),
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Replaces the request ID.
    pub fn set_request_id(&mut self, request_id: Uuid) {
        self.request_id = request_id;
    }

    /// Returns the time elapsed since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Stores a value keyed by its type, replacing any previous value.
    pub fn set_extension<T: Any + Send + Sync>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Returns the stored value of type `T`.
    #[must_use]
    pub fn get_extension<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref())
    }

    /// Removes and returns the stored value of type `T`.
    pub fn remove_extension<T: Any + Send + Sync>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast().ok())
            .map(|boxed| *boxed)
    }

    /// Returns true if a value of type `T` is stored.
    #[must_use]
    pub fn has_extension<T: Any + Send + Sync>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }
}

impl Default for MiddlewareContext {
    fn default() -> Self {
        Self::new()
    }
}
