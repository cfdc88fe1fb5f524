//! Localized text (alt-text arrays)

use super::{resolve, XmpMeta};
use crate::core::error::{XmpError, XmpResult};
use crate::core::namespace::ns;
use crate::core::node::{ArrayNode, ArrayType, Node, PropKind, X_DEFAULT};

fn lang_item(lang: &str, value: &str) -> Node {
    let mut item = Node::simple(value);
    item.set_qualifier(ns::XML, "lang", Node::simple(lang));
    item
}

/// Whether `lang` is `generic` or one of its subtags (`en` matches `en-GB`)
fn matches_generic(lang: &str, generic: &str) -> bool {
    lang.len() > generic.len()
        && lang.as_bytes()[generic.len()] == b'-'
        && lang[..generic.len()].eq_ignore_ascii_case(generic)
        || lang.eq_ignore_ascii_case(generic)
}

/// Pick the item for a lookup: exact, then generic, then x-default, then first
fn choose_item<'a>(array: &'a ArrayNode, generic: &str, specific: &str) -> Option<&'a Node> {
    if let Some(i) = array.find_lang(specific) {
        return array.get(i);
    }
    if !generic.is_empty() {
        let generic_match = array
            .items
            .iter()
            .find(|item| item.lang().is_some_and(|l| matches_generic(l, generic)));
        if generic_match.is_some() {
            return generic_match;
        }
    }
    array
        .find_lang(X_DEFAULT)
        .and_then(|i| array.get(i))
        .or_else(|| array.items.first())
}

impl XmpMeta {
    /// Get a localized text property
    ///
    /// This method searches for a localized text value matching the specified
    /// language codes. It follows XMP language matching rules:
    /// 1. Exact match for specific_lang
    /// 2. Match for generic_lang if specific_lang not found
    /// 3. Fallback to "x-default" if neither found
    /// 4. The first item of the array
    ///
    /// # Arguments
    ///
    /// * `namespace` - The namespace URI or prefix
    /// * `alt_text_name` - Path of the alt-text array
    /// * `generic_lang` - Generic language code (e.g., "en"), can be empty string
    /// * `specific_lang` - Specific language code (e.g., "en-US")
    ///
    /// # Returns
    ///
    /// Returns `Some((value, actual_lang))` if found, where `actual_lang` is
    /// the language of the item used (may differ from requested).
    ///
    /// # Example
    ///
    /// ```rust
    /// use xmpengine::{ns, XmpMeta};
    ///
    /// let mut meta = XmpMeta::new();
    /// meta.set_localized_text(ns::DC, "title", "", "x-default", "Hello").unwrap();
    /// meta.set_localized_text(ns::DC, "title", "en", "en-US", "Hi").unwrap();
    ///
    /// let (value, lang) = meta.get_localized_text(ns::DC, "title", "en", "en-GB").unwrap();
    /// assert_eq!(value, "Hi");
    /// assert_eq!(lang, "en-US");
    /// ```
    pub fn get_localized_text(
        &self,
        namespace: &str,
        alt_text_name: &str,
        generic_lang: &str,
        specific_lang: &str,
    ) -> Option<(String, String)> {
        let (_, resolved) = self.resolve(namespace, alt_text_name).ok()?;
        let array = resolve::find(self.root(), &resolved.steps)?.as_array()?;
        if !array.array_type.is_alternative() {
            return None;
        }
        let specific = if specific_lang.is_empty() {
            X_DEFAULT
        } else {
            specific_lang
        };
        let item = choose_item(array, generic_lang, specific)?;
        let value = item.value()?.to_string();
        Some((value, item.lang().unwrap_or_default().to_string()))
    }

    /// Set a localized text property
    ///
    /// Creates the alt-text array on first use. The `x-default` item is kept
    /// in sync: the first item written to an empty array also becomes the
    /// `x-default` item, and an `x-default` item holding the value being
    /// replaced is updated along with it.
    pub fn set_localized_text(
        &mut self,
        namespace: &str,
        alt_text_name: &str,
        _generic_lang: &str,
        specific_lang: &str,
        value: &str,
    ) -> XmpResult<()> {
        if specific_lang.is_empty() {
            return Err(XmpError::BadParam("Empty specific language".to_string()));
        }
        let (_, resolved) = self.resolve(namespace, alt_text_name)?;
        let node = resolve::ensure(
            self.root_mut(),
            &resolved,
            PropKind::Array(ArrayType::AltText),
        )?;
        let array = node
            .as_array_mut()
            .ok_or_else(|| XmpError::InternalError("Alt-text array expected".to_string()))?;
        if array.items.iter().any(|item| !item.is_simple()) {
            return Err(XmpError::TypeMismatch(format!(
                "'{}' is not a localized text array",
                alt_text_name
            )));
        }
        array.array_type = ArrayType::AltText;

        let was_empty = array.is_empty();
        let default_index = array.find_lang(X_DEFAULT);

        if specific_lang.eq_ignore_ascii_case(X_DEFAULT) {
            match default_index {
                Some(i) => set_item_value(array, i, value),
                None => array.items.insert(0, lang_item(X_DEFAULT, value)),
            }
            return Ok(());
        }

        let old = match array.find_lang(specific_lang) {
            Some(i) => {
                let old = array.get(i).and_then(Node::value).map(str::to_string);
                set_item_value(array, i, value);
                old
            }
            None => {
                array.append(lang_item(specific_lang, value));
                None
            }
        };

        match default_index {
            None if was_empty => array.items.insert(0, lang_item(X_DEFAULT, value)),
            Some(i) if old.is_some() && array.get(i).and_then(Node::value) == old.as_deref() => {
                set_item_value(array, i, value)
            }
            _ => {}
        }
        Ok(())
    }

    /// Delete one language item of an alt-text array. Missing items are a no-op.
    pub fn delete_localized_text(
        &mut self,
        namespace: &str,
        alt_text_name: &str,
        specific_lang: &str,
    ) -> XmpResult<()> {
        let resolved = match self.resolve(namespace, alt_text_name) {
            Ok((_, resolved)) => resolved,
            Err(XmpError::BadSchema(_)) => return Ok(()),
            Err(e) => return Err(e),
        };
        if let Some(array) = resolve::find_mut(self.root_mut(), &resolved.steps)
            .and_then(Node::as_array_mut)
        {
            if let Some(i) = array.find_lang(specific_lang) {
                array.remove(i)?;
            }
        }
        Ok(())
    }
}

fn set_item_value(array: &mut ArrayNode, index: usize, value: &str) {
    if let Some(Node::Simple(item)) = array.get_mut(index) {
        item.value = value.to_string();
    }
}
