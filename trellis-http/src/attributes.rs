use crate::Request;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Per-request bag of derived values, keyed by name.
///
/// Handlers use it to pass context (e.g. the outcome of an authentication
/// check, or the matched path parameters) to the handlers that follow them.
///
/// Attributes are copy-on-change: [`Attributes::with`] produces a new bag,
/// any other clone of the original keeps seeing the old values.
#[derive(Clone, Default)]
pub struct Attributes {
    inner: Arc<ahash::HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl Attributes {
    /// Create an empty [`Attributes`] bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce a bag with `key` set to `value`, replacing any previous value.
    #[must_use]
    pub fn with<T>(mut self, key: impl Into<String>, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Arc::make_mut(&mut self.inner).insert(key.into(), Arc::new(value));
        self
    }

    /// Produce a bag with all given entries set.
    #[must_use]
    pub fn with_all<K, T>(mut self, entries: impl IntoIterator<Item = (K, T)>) -> Self
    where
        K: Into<String>,
        T: Any + Send + Sync,
    {
        let inner = Arc::make_mut(&mut self.inner);
        for (key, value) in entries {
            inner.insert(key.into(), Arc::new(value));
        }
        self
    }

    /// Produce a bag without `key`.
    #[must_use]
    pub fn without(mut self, key: &str) -> Self {
        if self.inner.contains_key(key) {
            Arc::make_mut(&mut self.inner).remove(key);
        }
        self
    }

    /// Get the value stored under `key`, if it exists and is a `T`.
    #[must_use]
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.inner.get(key)?.downcast_ref()
    }

    /// Returns `true` if a value is stored under `key`, whatever its type.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Iterate over the keys of this bag, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    /// Number of attributes in this bag.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if no attribute is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.keys()).finish()
    }
}

/// Attribute access for a [`Request`].
///
/// The bag lives in the request extensions.
/// Setting an attribute consumes the request and returns the updated one,
/// so that only the most recent request value flows onward.
pub trait RequestExt: private::Sealed + Sized {
    /// The attributes attached to this request.
    fn attributes(&self) -> Attributes;

    /// Get the attribute stored under `key`, if it exists and is a `T`.
    fn attribute<T: Any>(&self, key: &str) -> Option<&T>;

    /// Attach an attribute to this request.
    #[must_use]
    fn with_attribute<T>(self, key: impl Into<String>, value: T) -> Self
    where
        T: Any + Send + Sync;

    /// Replace all attributes of this request.
    #[must_use]
    fn with_attributes(self, attributes: Attributes) -> Self;

    /// Get the path parameter captured by the matched route pattern.
    fn path_param(&self, name: &str) -> Option<&str> {
        self.attribute::<String>(name).map(String::as_str)
    }
}

impl<B> RequestExt for Request<B> {
    fn attributes(&self) -> Attributes {
        self.extensions()
            .get::<Attributes>()
            .cloned()
            .unwrap_or_default()
    }

    fn attribute<T: Any>(&self, key: &str) -> Option<&T> {
        self.extensions().get::<Attributes>()?.get(key)
    }

    fn with_attribute<T>(mut self, key: impl Into<String>, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        let attributes = self
            .extensions_mut()
            .remove::<Attributes>()
            .unwrap_or_default()
            .with(key, value);
        self.extensions_mut().insert(attributes);
        self
    }

    fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.extensions_mut().insert(attributes);
        self
    }
}

mod private {
    pub trait Sealed {}

    impl<B> Sealed for crate::Request<B> {}
}
