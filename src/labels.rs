//! Canonical mask classes and free-text label normalization.
//!
//! Labels typed by annotators are inconsistent ("Torso", " hands ", "HEAD").
//! Every label is folded (trimmed, lower-cased) and looked up in an explicit
//! alias table for the active [`MaskScheme`]. A label that does not map to a
//! class of the scheme is "unrecognized" and the shape carrying it is dropped.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::MaskpackError;

/// A class that can appear in a packed mask.
///
/// Each class owns one bit of the packed single-channel mask value and one
/// channel of the RGB preview (head = R, hand = G, body = B).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalClass {
    Head,
    Hand,
    Body,
    Foreground,
}

impl CanonicalClass {
    /// Stable lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            CanonicalClass::Head => "head",
            CanonicalClass::Hand => "hand",
            CanonicalClass::Body => "body",
            CanonicalClass::Foreground => "foreground",
        }
    }

    /// Bit used for this class in the packed mask byte.
    pub fn bit(self) -> u8 {
        match self {
            CanonicalClass::Head => 1 << 0,
            CanonicalClass::Hand => 1 << 1,
            CanonicalClass::Body => 1 << 2,
            CanonicalClass::Foreground => 1 << 0,
        }
    }

    /// Parse a canonical class from its exact name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "head" => Some(CanonicalClass::Head),
            "hand" => Some(CanonicalClass::Hand),
            "body" => Some(CanonicalClass::Body),
            "foreground" => Some(CanonicalClass::Foreground),
            _ => None,
        }
    }
}

impl fmt::Display for CanonicalClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which set of classes the pipeline builds masks for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MaskScheme {
    /// Head, hand and body, with an overlap rule between head and hand.
    #[default]
    ThreeClass,
    /// A single foreground class.
    Binary,
}

impl MaskScheme {
    /// Classes of this scheme, in bit order.
    pub fn classes(self) -> &'static [CanonicalClass] {
        match self {
            MaskScheme::ThreeClass => &[
                CanonicalClass::Head,
                CanonicalClass::Hand,
                CanonicalClass::Body,
            ],
            MaskScheme::Binary => &[CanonicalClass::Foreground],
        }
    }

    pub fn contains(self, class: CanonicalClass) -> bool {
        self.classes().contains(&class)
    }

    /// Union of every class bit of the scheme.
    pub fn bit_mask(self) -> u8 {
        self.classes().iter().fold(0, |acc, class| acc | class.bit())
    }

    pub fn name(self) -> &'static str {
        match self {
            MaskScheme::ThreeClass => "three-class",
            MaskScheme::Binary => "binary",
        }
    }
}

/// Built-in alias table. Keys are already folded.
fn builtin_alias(scheme: MaskScheme, folded: &str) -> Option<CanonicalClass> {
    match scheme {
        MaskScheme::ThreeClass => match folded {
            "head" => Some(CanonicalClass::Head),
            "hand" | "hands" => Some(CanonicalClass::Hand),
            "body" | "torso" => Some(CanonicalClass::Body),
            _ => None,
        },
        MaskScheme::Binary => match folded {
            "foreground" | "fg" | "baby" => Some(CanonicalClass::Foreground),
            _ => None,
        },
    }
}

fn fold_label(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Normalize a label against the built-in alias table of `scheme`.
///
/// Returns `None` for empty or unknown labels; callers drop such shapes.
pub fn normalize_label(scheme: MaskScheme, raw: &str) -> Option<CanonicalClass> {
    let folded = fold_label(raw);
    if folded.is_empty() {
        return None;
    }
    builtin_alias(scheme, &folded)
}

/// Alias table for one scheme: the built-in aliases plus user additions.
///
/// User aliases are consulted first, so they can also redirect a built-in
/// spelling to another class of the same scheme.
#[derive(Clone, Debug, Default)]
pub struct LabelTable {
    scheme: MaskScheme,
    extra: BTreeMap<String, CanonicalClass>,
}

impl LabelTable {
    pub fn for_scheme(scheme: MaskScheme) -> Self {
        Self {
            scheme,
            extra: BTreeMap::new(),
        }
    }

    /// Add an alias. The class must belong to the table's scheme.
    pub fn with_alias(
        mut self,
        alias: &str,
        class: CanonicalClass,
    ) -> Result<Self, MaskpackError> {
        if !self.scheme.contains(class) {
            return Err(MaskpackError::InvalidConfig(format!(
                "alias '{}' maps to class '{}', which is not part of the {} scheme",
                alias,
                class,
                self.scheme.name()
            )));
        }

        let folded = fold_label(alias);
        if folded.is_empty() {
            return Err(MaskpackError::InvalidConfig(
                "label aliases must not be empty".to_string(),
            ));
        }

        self.extra.insert(folded, class);
        Ok(self)
    }

    pub fn scheme(&self) -> MaskScheme {
        self.scheme
    }

    pub fn normalize(&self, raw: &str) -> Option<CanonicalClass> {
        let folded = fold_label(raw);
        if folded.is_empty() {
            return None;
        }
        self.extra
            .get(&folded)
            .copied()
            .or_else(|| builtin_alias(self.scheme, &folded))
    }
}
