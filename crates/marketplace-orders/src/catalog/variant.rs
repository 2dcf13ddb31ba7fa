//! Variant selections and variant price lookup.
//!
//! A selection is a set of `(axis, value)` pairs such as `size=m, color=red`.
//! Its canonical key sorts axes by name and lower-cases everything:
//! `color=red|size=m`. That key is the only thing used to look up a
//! variant price.
//!
//! Older catalog entries were priced on two fixed axes and stored keys of the
//! form `<size>|<color>` (or just one of the values). [`legacy_keys`] produces
//! those shapes so such entries keep resolving. New data should always use
//! the canonical key.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Normalized attribute selection, sorted by axis name.
///
/// Deserializing goes through [`VariantSelection::from_pairs`], so a
/// selection sent as `{"Size": " XL "}` is stored as `size=xl`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct VariantSelection(BTreeMap<String, String>);

impl From<BTreeMap<String, String>> for VariantSelection {
    fn from(raw: BTreeMap<String, String>) -> Self {
        Self::from_pairs(raw)
    }
}

impl From<VariantSelection> for BTreeMap<String, String> {
    fn from(selection: VariantSelection) -> Self {
        selection.0
    }
}

impl VariantSelection {
    /// An empty selection (the base product).
    pub fn none() -> Self {
        Self::default()
    }

    /// Build a selection from raw pairs. Axis names and values are trimmed
    /// and lower-cased; empty axes or values are dropped.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut axes = BTreeMap::new();
        for (axis, value) in pairs {
            let axis = normalize(axis.as_ref());
            let value = normalize(value.as_ref());
            if !axis.is_empty() && !value.is_empty() {
                axes.insert(axis, value);
            }
        }
        Self(axes)
    }

    /// Add one axis.
    pub fn with(mut self, axis: &str, value: &str) -> Self {
        let (axis, value) = (normalize(axis), normalize(value));
        if !axis.is_empty() && !value.is_empty() {
            self.0.insert(axis, value);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, axis: &str) -> Option<&str> {
        self.0.get(&normalize(axis)).map(String::as_str)
    }

    /// Canonical lookup key, e.g. `color=red|size=m`.
    pub fn canonical_key(&self) -> String {
        self.0
            .iter()
            .map(|(axis, value)| format!("{}={}", axis, value))
            .collect::<Vec<_>>()
            .join("|")
    }

    /// Display form for order lines, e.g. `red / m`.
    pub fn label(&self) -> Option<String> {
        if self.0.is_empty() {
            return None;
        }
        Some(self.0.values().cloned().collect::<Vec<_>>().join(" / "))
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Keys in the older two-axis encoding, most specific first.
pub fn legacy_keys(selection: &VariantSelection) -> Vec<String> {
    let size = selection.get("size");
    let color = selection.get("color");

    match (size, color) {
        (Some(size), Some(color)) => vec![
            format!("{}|{}", size, color),
            format!("{}-{}", size, color),
        ],
        (Some(only), None) | (None, Some(only)) => vec![only.to_string()],
        (None, None) => Vec::new(),
    }
}

/// Variant price map of a product. Keys are normalized on insert and on
/// deserialize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "HashMap<String, Money>", into = "HashMap<String, Money>")]
pub struct VariantPriceTable(HashMap<String, Money>);

impl From<HashMap<String, Money>> for VariantPriceTable {
    fn from(raw: HashMap<String, Money>) -> Self {
        let mut table = Self::new();
        for (key, price) in raw {
            table.insert_raw(&key, price);
        }
        table
    }
}

impl From<VariantPriceTable> for HashMap<String, Money> {
    fn from(table: VariantPriceTable) -> Self {
        table.0
    }
}

impl VariantPriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Price a selection by its canonical key.
    pub fn insert(&mut self, selection: &VariantSelection, price: Money) {
        self.0.insert(selection.canonical_key(), price);
    }

    /// Insert under a raw stored key (legacy data import).
    pub fn insert_raw(&mut self, key: &str, price: Money) {
        self.0.insert(normalize(key), price);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Look up the canonical key, then each legacy key shape.
    pub fn lookup(&self, selection: &VariantSelection) -> Option<Money> {
        if let Some(price) = self.0.get(&selection.canonical_key()) {
            return Some(*price);
        }
        legacy_keys(selection)
            .iter()
            .find_map(|key| self.0.get(key).copied())
    }
}

/// Authoritative unit price for a selection.
///
/// Never fails: an empty selection, a missing price table, an unknown key or
/// a negative stored price all resolve to `base_price`.
pub fn resolve_unit_price(
    base_price: Money,
    prices: &VariantPriceTable,
    selection: &VariantSelection,
) -> Money {
    if selection.is_empty() || prices.is_empty() {
        return base_price;
    }
    match prices.lookup(selection) {
        Some(price) if !price.is_negative() => price,
        _ => base_price,
    }
}
