//! Conversion-key → converter lookup.
//!
//! The lookup fails closed: a key that is unknown, or known but without a
//! registered converter, resolves to `None` and the orchestrator rejects the
//! batch before any file is touched.

use crate::catalog::ConversionKind;
use crate::converter::{FormatConverter, ImageToPdf, ToPng, ToWebp};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

static BUILTIN: Lazy<ConverterRegistry> = Lazy::new(ConverterRegistry::with_builtin);

/// Maps conversion kinds to converters.
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    entries: HashMap<ConversionKind, Arc<dyn FormatConverter>>,
}

impl ConverterRegistry {
    /// A registry with nothing registered.
    pub fn empty() -> Self {
        Self::default()
    }

    /// `to-pdf`, `to-png` and `to-webp`.
    pub fn with_builtin() -> Self {
        Self::empty()
            .register(ConversionKind::ToPdf, Arc::new(ImageToPdf))
            .register(ConversionKind::ToPng, Arc::new(ToPng))
            .register(ConversionKind::ToWebp, Arc::new(ToWebp))
    }

    /// The shared built-in registry.
    pub fn builtin() -> &'static ConverterRegistry {
        &BUILTIN
    }

    /// Add or replace the converter for `kind`.
    pub fn register(mut self, kind: ConversionKind, converter: Arc<dyn FormatConverter>) -> Self {
        self.entries.insert(kind, converter);
        self
    }

    /// Converter for a conversion key, if one is registered.
    pub fn resolve(&self, key: &str) -> Option<Arc<dyn FormatConverter>> {
        let kind: ConversionKind = key.parse().ok()?;
        self.get(kind)
    }

    pub fn get(&self, kind: ConversionKind) -> Option<Arc<dyn FormatConverter>> {
        self.entries.get(&kind).cloned()
    }

    /// Registered kinds, in catalog order.
    pub fn supported(&self) -> Vec<ConversionKind> {
        ConversionKind::ALL
            .into_iter()
            .filter(|k| self.entries.contains_key(k))
            .collect()
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("supported", &self.supported())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_resolves_implemented_keys() {
        let r = ConverterRegistry::builtin();
        assert_eq!(r.resolve("to-pdf").unwrap().kind(), ConversionKind::ToPdf);
        assert_eq!(r.resolve("to-png").unwrap().kind(), ConversionKind::ToPng);
        assert_eq!(r.resolve("to-webp").unwrap().kind(), ConversionKind::ToWebp);
    }

    #[test]
    fn unregistered_keys_resolve_to_none() {
        let r = ConverterRegistry::builtin();
        for key in ["to-jpg", "to-docx", "to-odt", "to-xlsx", "to-ods", "to-pptx", "to-odp"] {
            assert!(r.resolve(key).is_none(), "{key}");
        }
        assert!(r.resolve("to-gif").is_none());
        assert!(r.resolve("").is_none());
    }

    #[test]
    fn supported_lists_in_catalog_order() {
        assert_eq!(
            ConverterRegistry::builtin().supported(),
            vec![ConversionKind::ToPdf, ConversionKind::ToPng, ConversionKind::ToWebp]
        );
    }

    #[test]
    fn empty_registry_resolves_nothing() {
        let r = ConverterRegistry::empty();
        assert!(r.resolve("to-png").is_none());
        assert!(r.supported().is_empty());
    }

    #[test]
    fn register_replaces() {
        let r = ConverterRegistry::empty()
            .register(ConversionKind::ToPng, Arc::new(ToWebp))
            .register(ConversionKind::ToPng, Arc::new(ToPng));
        assert_eq!(r.resolve("to-png").unwrap().name(), "to-png");
    }
}
