//! URL slugs for cities, categories, sellers and products.
//!
//! Callers fetch the slugs already taken in their scope that start with the
//! base slug (`Column::Slug.starts_with(base)`) and let [`pick_unique`] choose
//! the first free `base`, `base-1`, `base-2`, ...

use crate::errors::{Error, Result};

/// Lowercase ASCII slug. Non-Latin scripts and ligatures are transliterated
/// (`Москва` gives `moskva`, `œ` gives `oe`), everything that is not a letter
/// or digit collapses into single dashes.
#[must_use]
pub fn slugify(text: &str) -> String {
    ::slug::slugify(text)
}

/// Slug of `name`, or a validation error on `field` when nothing survives.
pub fn slug_for(field: &'static str, name: &str) -> Result<String> {
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(Error::validation(
            field,
            "must contain at least one letter or digit",
        ));
    }
    Ok(slug)
}

/// First of `base`, `base-1`, `base-2`, ... not present in `taken`.
#[must_use]
pub fn pick_unique(base: &str, taken: &[String]) -> String {
    if !taken.iter().any(|s| s == base) {
        return base.to_string();
    }
    (1u32..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken.iter().any(|s| s == candidate))
        .unwrap_or_else(|| base.to_string())
}
