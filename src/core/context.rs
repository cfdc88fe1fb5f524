//! Shared engine context
//!
//! An [`XmpContext`] owns the namespace and alias registries consulted by
//! every document and file session bound to it. `XmpContext::global()` is
//! the default process-wide instance; `XmpContext::new()` gives an isolated
//! one, which keeps tests independent of each other.

use crate::core::alias::{AliasForm, AliasInfo, AliasMap};
use crate::core::error::{XmpError, XmpResult};
use crate::core::namespace::NamespaceMap;
use parking_lot::{RwLock, RwLockReadGuard};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

static GLOBAL_CONTEXT: OnceLock<Arc<XmpContext>> = OnceLock::new();

/// Namespace and alias registries shared by a group of sessions
#[derive(Debug)]
pub struct XmpContext {
    namespaces: RwLock<NamespaceMap>,
    aliases: RwLock<AliasMap>,
    terminated: AtomicBool,
}

impl XmpContext {
    /// Create an isolated context with the built-in namespaces and aliases
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            namespaces: RwLock::new(NamespaceMap::new()),
            aliases: RwLock::new(AliasMap::new()),
            terminated: AtomicBool::new(false),
        })
    }

    /// The default process-wide context
    pub fn global() -> Arc<Self> {
        GLOBAL_CONTEXT.get_or_init(XmpContext::new).clone()
    }

    /// Register a namespace, returning the prefix actually bound to it
    pub fn register_namespace(&self, uri: &str, suggested_prefix: &str) -> XmpResult<String> {
        self.check_alive()?;
        self.namespaces.write().register(uri, suggested_prefix)
    }

    /// Prefix registered for `uri`
    pub fn get_namespace_prefix(&self, uri: &str) -> Option<String> {
        self.namespaces.read().get_prefix(uri).map(str::to_string)
    }

    /// URI registered for `prefix`
    pub fn get_namespace_uri(&self, prefix: &str) -> Option<String> {
        self.namespaces.read().get_uri(prefix).map(str::to_string)
    }

    /// Register an alias. Both namespaces must already be registered.
    pub fn register_alias(
        &self,
        alias_ns: &str,
        alias_name: &str,
        actual_ns: &str,
        actual_name: &str,
        form: AliasForm,
    ) -> XmpResult<()> {
        self.check_alive()?;
        // Lock order: namespaces before aliases.
        let namespaces = self.namespaces.read();
        self.aliases.write().register(
            &namespaces,
            alias_ns,
            alias_name,
            actual_ns,
            actual_name,
            form,
        )
    }

    /// Resolve an alias; `None` means the name is not an alias
    pub fn resolve_alias(&self, alias_ns: &str, alias_name: &str) -> Option<AliasInfo> {
        self.aliases.read().resolve(alias_ns, alias_name).cloned()
    }

    /// Textual listing of all namespaces
    pub fn dump_namespaces(&self) -> String {
        self.namespaces.read().dump()
    }

    /// Textual listing of all aliases
    pub fn dump_aliases(&self) -> String {
        let namespaces = self.namespaces.read();
        self.aliases.read().dump(&namespaces)
    }

    /// Read access to the namespace registry
    pub fn namespaces(&self) -> RwLockReadGuard<'_, NamespaceMap> {
        self.namespaces.read()
    }

    /// Read access to the alias registry
    pub fn aliases(&self) -> RwLockReadGuard<'_, AliasMap> {
        self.aliases.read()
    }

    /// Shut the context down. Sessions bound to it stop working: mutations
    /// fail with [`XmpError::Terminated`] and queries return nothing.
    pub fn terminate(&self) {
        self.terminated.store(true, Ordering::SeqCst);
    }

    /// Whether [`terminate`](Self::terminate) has been called
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    pub(crate) fn check_alive(&self) -> XmpResult<()> {
        if self.is_terminated() {
            Err(XmpError::Terminated)
        } else {
            Ok(())
        }
    }
}

/// Register an alias in the global context
pub fn register_alias(
    alias_ns: &str,
    alias_name: &str,
    actual_ns: &str,
    actual_name: &str,
    form: AliasForm,
) -> XmpResult<()> {
    XmpContext::global().register_alias(alias_ns, alias_name, actual_ns, actual_name, form)
}

/// Resolve an alias in the global context
pub fn resolve_alias(alias_ns: &str, alias_name: &str) -> Option<AliasInfo> {
    XmpContext::global().resolve_alias(alias_ns, alias_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::namespace::ns;

    #[test]
    fn test_contexts_are_isolated() {
        let a = XmpContext::new();
        let b = XmpContext::new();
        a.register_namespace("http://example.com/iso/", "iso").unwrap();
        assert_eq!(
            a.get_namespace_prefix("http://example.com/iso/"),
            Some("iso".to_string())
        );
        assert_eq!(b.get_namespace_prefix("http://example.com/iso/"), None);
    }

    #[test]
    fn test_register_and_resolve_alias() {
        let ctx = XmpContext::new();
        ctx.register_namespace("http://example.com/al/", "al").unwrap();
        ctx.register_alias(
            "http://example.com/al/",
            "Headline",
            ns::PHOTOSHOP,
            "Headline",
            AliasForm::Simple,
        )
        .unwrap();
        let info = ctx.resolve_alias("http://example.com/al/", "Headline").unwrap();
        assert_eq!(info.namespace, ns::PHOTOSHOP);
        assert!(ctx.resolve_alias(ns::PHOTOSHOP, "Headline").is_none());
        assert!(ctx.dump_aliases().contains("al:Headline"));
    }

    #[test]
    fn test_terminate() {
        let ctx = XmpContext::new();
        ctx.terminate();
        assert!(ctx.is_terminated());
        assert!(matches!(
            ctx.register_namespace("http://example.com/t/", "t"),
            Err(XmpError::Terminated)
        ));
    }

    #[test]
    fn test_global_is_shared() {
        let a = XmpContext::global();
        let b = XmpContext::global();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
