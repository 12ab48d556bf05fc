//! Deferred construction of the extension list.
//!
//! Building the list probes compilers, queries capability providers and may
//! run the translator. None of that may happen for invocations that only
//! print metadata, so the builder is wrapped in a [`LazyList`] that runs it
//! the first time the list is read.

use std::cell::{Cell, OnceCell, RefCell};
use std::fmt;

use anyhow::{bail, Result};

use crate::core::descriptor::{DescriptorSet, ExtensionDescriptor};

type Builder<T> = Box<dyn FnOnce() -> Result<Vec<T>>>;

/// A list computed on first access, at most once.
pub struct LazyList<T> {
    builder: RefCell<Option<Builder<T>>>,
    value: OnceCell<Vec<T>>,
    failed: Cell<bool>,
}

/// The extension list handed to the packaging layer.
pub type LazyExtensions = LazyList<ExtensionDescriptor>;

impl<T> LazyList<T> {
    /// Wrap a builder. Nothing runs until [`LazyList::force`].
    pub fn new(builder: impl FnOnce() -> Result<Vec<T>> + 'static) -> Self {
        LazyList {
            builder: RefCell::new(Some(Box::new(builder))),
            value: OnceCell::new(),
            failed: Cell::new(false),
        }
    }

    /// Always true; lets consumers tell this apart from an eager list.
    pub fn is_lazy(&self) -> bool {
        true
    }

    /// Whether the builder has already produced the list.
    pub fn is_evaluated(&self) -> bool {
        self.value.get().is_some()
    }

    /// Run the builder if needed and borrow the list.
    pub fn force(&self) -> Result<&[T]> {
        if let Some(list) = self.value.get() {
            return Ok(list);
        }

        let builder = self.builder.borrow_mut().take();
        let Some(builder) = builder else {
            if self.failed.get() {
                bail!("building the extension list already failed in this invocation");
            }
            bail!("extension list requested while it is being built");
        };

        match builder() {
            Ok(list) => Ok(self.value.get_or_init(|| list)),
            Err(e) => {
                self.failed.set(true);
                Err(e)
            }
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for LazyList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value.get() {
            Some(list) => f.debug_tuple("LazyList").field(list).finish(),
            None if self.failed.get() => f.write_str("LazyList(<failed>)"),
            None => f.write_str("LazyList(<pending>)"),
        }
    }
}

/// Extension modules as seen by the packaging layer: either a plain list
/// or one that is built on demand.
#[derive(Debug)]
pub enum ExtModules {
    Eager(DescriptorSet),
    Lazy(LazyExtensions),
}

impl ExtModules {
    pub fn is_lazy(&self) -> bool {
        matches!(self, ExtModules::Lazy(list) if list.is_lazy())
    }

    /// Borrow the descriptors, building them first if needed.
    pub fn resolve(&self) -> Result<&[ExtensionDescriptor]> {
        match self {
            ExtModules::Eager(set) => Ok(set.as_slice()),
            ExtModules::Lazy(list) => list.force(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_builder_runs_once() {
        let runs = Rc::new(Cell::new(0));
        let counter = Rc::clone(&runs);
        let list = LazyList::new(move || {
            counter.set(counter.get() + 1);
            Ok(vec![1, 2, 3])
        });

        assert!(!list.is_evaluated());
        assert_eq!(runs.get(), 0);
        assert_eq!(list.force().unwrap(), &[1, 2, 3]);
        assert_eq!(list.force().unwrap(), &[1, 2, 3]);
        assert_eq!(list.force().unwrap().len(), 3);
        assert_eq!(runs.get(), 1);
        assert!(list.is_evaluated());
    }

    #[test]
    fn test_failure_is_remembered() {
        let runs = Rc::new(Cell::new(0));
        let counter = Rc::clone(&runs);
        let list: LazyList<u32> = LazyList::new(move || {
            counter.set(counter.get() + 1);
            bail!("provider `numpy` failed")
        });

        let first = list.force().unwrap_err();
        assert!(first.to_string().contains("numpy"));
        let second = list.force().unwrap_err();
        assert!(second.to_string().contains("already failed"));
        assert_eq!(runs.get(), 1);
        assert!(!list.is_evaluated());
    }

    #[test]
    fn test_ext_modules_shapes_agree() {
        let set: DescriptorSet = vec![ExtensionDescriptor::new("m", ["m.c"])].into();
        let eager = ExtModules::Eager(set.clone());
        let cloned = set.clone();
        let lazy = ExtModules::Lazy(LazyList::new(move || Ok(cloned.into_vec())));

        assert!(!eager.is_lazy());
        assert!(lazy.is_lazy());
        assert_eq!(eager.resolve().unwrap(), lazy.resolve().unwrap());
    }

    #[test]
    fn test_debug_does_not_force() {
        let list: LazyList<u8> = LazyList::new(|| bail!("must not run"));
        assert_eq!(format!("{:?}", list), "LazyList(<pending>)");
        assert!(!list.is_evaluated());
    }
}
