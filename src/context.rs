//! The service-context mapping: a type-keyed bag of shared services. A tag is
//! a stable identifier plus a phantom service type; a `Context` maps tags to
//! services and merges cheaply because it shares structure with `im`.

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use im::HashMap;

/// A typed key into a [`Context`].
///
/// Two tags for the same `T` but different `id` are considered distinct slots.
pub struct Tag<T> {
    id: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Tag<T> {
    /// Create a new tag identified by `id`.
    pub const fn new(id: &'static str) -> Self {
        Tag {
            id,
            _marker: PhantomData,
        }
    }

    /// The tag's stable identifier.
    pub fn id(&self) -> &'static str {
        self.id
    }
}

impl<T> Clone for Tag<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Tag<T> {}

impl<T> fmt::Debug for Tag<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Tag").field(&self.id).finish()
    }
}

/// Error returned when a required service is absent from the context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceNotFound {
    /// The tag identifier that was looked up.
    pub tag: &'static str,
}

impl fmt::Display for ServiceNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "service not found for tag {:?}", self.tag)
    }
}

impl std::error::Error for ServiceNotFound {}

/// A type-keyed bag of services, shared via `im::HashMap` so that deriving a
/// new context (`add`) is a cheap structural-sharing clone rather than a deep copy.
#[derive(Clone, Default)]
pub struct Context {
    services: HashMap<(&'static str, TypeId), Arc<dyn Any + Send + Sync>>,
}

impl Context {
    /// An empty context.
    pub fn empty() -> Self {
        Context {
            services: HashMap::new(),
        }
    }

    /// Derive a new context with `tag` bound to `service`.
    pub fn add<T: Send + Sync + 'static>(&self, tag: Tag<T>, service: T) -> Self {
        let mut services = self.services.clone();
        services.insert((tag.id, TypeId::of::<T>()), Arc::new(service));
        Context { services }
    }

    /// Look up the service bound to `tag`, if present.
    pub fn get<T: Send + Sync + 'static>(&self, tag: Tag<T>) -> Option<Arc<T>> {
        self.services
            .get(&(tag.id, TypeId::of::<T>()))
            .and_then(|svc| svc.clone().downcast::<T>().ok())
    }

    /// Look up the service bound to `tag`, failing with [`ServiceNotFound`] if absent.
    pub fn require<T: Send + Sync + 'static>(&self, tag: Tag<T>) -> Result<Arc<T>, ServiceNotFound> {
        self.get(tag).ok_or(ServiceNotFound { tag: tag.id })
    }

    /// Merge `other` on top of `self`; entries in `other` win on collision.
    pub fn merge(&self, other: &Context) -> Self {
        Context {
            services: self.services.clone().union(other.services.clone()),
        }
    }

    /// Number of bound services.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// `true` if no services are bound.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("len", &self.services.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static COUNTER: Tag<i32> = Tag::new("test/counter");
    static NAME: Tag<String> = Tag::new("test/name");

    #[test]
    fn add_and_get() {
        let ctx = Context::empty().add(COUNTER, 42);
        assert_eq!(*ctx.get(COUNTER).unwrap(), 42);
    }

    #[test]
    fn missing_service_is_none() {
        let ctx = Context::empty();
        assert!(ctx.get(COUNTER).is_none());
    }

    #[test]
    fn require_reports_tag() {
        let ctx = Context::empty();
        let err = ctx.require(COUNTER).unwrap_err();
        assert_eq!(err.tag, "test/counter");
    }

    #[test]
    fn merge_prefers_other() {
        let a = Context::empty().add(COUNTER, 1).add(NAME, "a".to_string());
        let b = Context::empty().add(COUNTER, 2);
        let merged = a.merge(&b);
        assert_eq!(*merged.get(COUNTER).unwrap(), 2);
        assert_eq!(*merged.get(NAME).unwrap(), "a");
    }

    #[test]
    fn add_does_not_mutate_original() {
        let base = Context::empty();
        let derived = base.add(COUNTER, 1);
        assert!(base.get(COUNTER).is_none());
        assert_eq!(*derived.get(COUNTER).unwrap(), 1);
    }
}
