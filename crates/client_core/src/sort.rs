//! Sort state and its `field,direction` query-parameter form.

use std::{cmp::Ordering, fmt, str::FromStr};

const SEPARATOR: char = ',';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

impl FromStr for SortOrder {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(()),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortKey {
    pub predicate: String,
    pub order: SortOrder,
}

/// An optional (field, direction) pair. The empty state keeps server order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SortState(Option<SortKey>);

impl SortState {
    pub fn none() -> Self {
        Self(None)
    }

    /// An empty predicate yields the empty state.
    pub fn by(predicate: impl Into<String>, order: SortOrder) -> Self {
        let predicate = predicate.into();
        if predicate.is_empty() {
            return Self(None);
        }
        Self(Some(SortKey { predicate, order }))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn key(&self) -> Option<&SortKey> {
        self.0.as_ref()
    }

    pub fn predicate(&self) -> Option<&str> {
        self.0.as_ref().map(|key| key.predicate.as_str())
    }

    pub fn order(&self) -> Option<SortOrder> {
        self.0.as_ref().map(|key| key.order)
    }

    /// Clicking the active column flips its direction; any other column
    /// starts ascending.
    pub fn toggled(&self, predicate: &str) -> Self {
        match &self.0 {
            Some(key) if key.predicate == predicate => Self::by(predicate, key.order.reversed()),
            _ => Self::by(predicate, SortOrder::Asc),
        }
    }
}

/// Parses `raw`, or `fallback` when `raw` is absent. A present but malformed
/// `raw` does not fall back; it decodes to the empty state.
pub fn decode(raw: Option<&str>, fallback: Option<&str>) -> SortState {
    match raw.or(fallback) {
        Some(token) => parse_token(token),
        None => SortState::none(),
    }
}

fn parse_token(token: &str) -> SortState {
    // Split on the last separator so predicates may themselves contain one.
    let Some((predicate, order)) = token.rsplit_once(SEPARATOR) else {
        return SortState::none();
    };
    match order.parse::<SortOrder>() {
        Ok(order) => SortState::by(predicate, order),
        Err(()) => SortState::none(),
    }
}

/// `None` for the empty state so the parameter is omitted, not sent blank.
pub fn encode(state: &SortState) -> Option<String> {
    state
        .key()
        .map(|key| format!("{}{SEPARATOR}{}", key.predicate, key.order))
}

/// A field value as seen by client-side ordering.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Bool(bool),
}

/// Records that can be ordered by a field named at runtime.
pub trait SortField {
    fn sort_field(&self, predicate: &str) -> Option<FieldValue>;
}

/// Case-insensitive, numeric-aware comparison. Missing values sort last in
/// ascending order.
pub fn compare_values(a: Option<&FieldValue>, b: Option<&FieldValue>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => compare_present(a, b),
    }
}

fn compare_present(a: &FieldValue, b: &FieldValue) -> Ordering {
    match (a, b) {
        (FieldValue::Number(a), FieldValue::Number(b)) => a.total_cmp(b),
        (FieldValue::Bool(a), FieldValue::Bool(b)) => a.cmp(b),
        (FieldValue::Text(a), FieldValue::Text(b)) => {
            match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
                (Ok(a), Ok(b)) => a.total_cmp(&b),
                _ => a.to_lowercase().cmp(&b.to_lowercase()),
            }
        }
        _ => render(a).to_lowercase().cmp(&render(b).to_lowercase()),
    }
}

fn render(value: &FieldValue) -> String {
    match value {
        FieldValue::Number(n) => n.to_string(),
        FieldValue::Text(s) => s.clone(),
        FieldValue::Bool(b) => b.to_string(),
    }
}

/// Stable in-place sort; the empty state leaves `items` untouched.
pub fn apply<T: SortField>(items: &mut [T], state: &SortState) {
    let Some(key) = state.key() else {
        return;
    };
    items.sort_by(|a, b| {
        let ordering = compare_values(
            a.sort_field(&key.predicate).as_ref(),
            b.sort_field(&key.predicate).as_ref(),
        );
        match key.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

#[cfg(test)]
#[path = "tests/sort_tests.rs"]
mod tests;
