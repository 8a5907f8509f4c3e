use indexmap::IndexMap;
use serde::Serialize;

use super::LayerKind;

/// Token written for categorical cells of collapsed nodes.
pub const EMPTY_TOKEN: &str = "None";

/// A single cell of the leaf table. The same cell holds the raw value, then
/// the normalized value, then the pixel extent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LayerValue {
    Token(Option<String>),
    Scalar(f64),
    Segments(Vec<f64>),
}

impl LayerValue {
    fn parse(kind: LayerKind, raw: &str) -> Self {
        match kind {
            LayerKind::Numerical => LayerValue::Scalar(parse_scalar(raw)),
            LayerKind::StackBar => {
                LayerValue::Segments(raw.split(';').map(parse_scalar).collect())
            }
            LayerKind::Categorical | LayerKind::Parent => {
                let trimmed = raw.trim();
                LayerValue::Token((!trimmed.is_empty()).then(|| trimmed.to_owned()))
            }
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            LayerValue::Scalar(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_segments(&self) -> Option<&[f64]> {
        match self {
            LayerValue::Segments(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_token(&self) -> Option<&str> {
        match self {
            LayerValue::Token(token) => token.as_deref(),
            _ => None,
        }
    }
}

/// Values that fail to parse stay in the table as NaN.
fn parse_scalar(raw: &str) -> f64 {
    raw.trim().parse::<f64>().unwrap_or(f64::NAN)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeafRow {
    /// One value per column; column 0 is the label itself.
    pub values: Vec<LayerValue>,
    /// Fabricated for a collapsed node rather than loaded.
    pub synthetic: bool,
}

/// Per-leaf layer values keyed by leaf label.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LeafValueTable {
    headers: Vec<String>,
    kinds: Vec<LayerKind>,
    rows: IndexMap<String, LeafRow>,
}

impl LeafValueTable {
    /// Build a table from a header row and raw string rows. Column kinds are
    /// detected from the headers and the first data row.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let kinds: Vec<LayerKind> = headers
            .iter()
            .enumerate()
            .map(|(column, header)| {
                let sample = rows.first().and_then(|row| row.get(column)).map(String::as_str);
                LayerKind::detect(header, sample)
            })
            .collect();

        let mut table = Self {
            headers,
            kinds,
            rows: IndexMap::with_capacity(rows.len()),
        };

        for raw in rows {
            let Some(label) = raw.first().map(|label| label.trim().to_owned()) else {
                continue;
            };
            let mut values = Vec::with_capacity(table.headers.len());
            values.push(LayerValue::Token(Some(label.clone())));
            for column in 1..table.headers.len() {
                let cell = raw.get(column).map(String::as_str).unwrap_or("");
                values.push(LayerValue::parse(table.kinds[column], cell));
            }
            table.rows.insert(
                label,
                LeafRow {
                    values,
                    synthetic: false,
                },
            );
        }

        table
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn header(&self, index: usize) -> Option<&str> {
        self.headers.get(index).map(String::as_str)
    }

    /// Kind of a data column. Column 0 holds labels and has no kind.
    pub fn kind(&self, index: usize) -> Option<LayerKind> {
        if index == 0 {
            return None;
        }
        self.kinds.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    pub fn row(&self, label: &str) -> Option<&LeafRow> {
        self.rows.get(label)
    }

    pub fn value(&self, label: &str, index: usize) -> Option<&LayerValue> {
        self.rows.get(label)?.values.get(index)
    }

    pub(crate) fn rows_mut(&mut self) -> impl Iterator<Item = &mut LeafRow> {
        self.rows.values_mut()
    }

    /// Insert zeroed placeholder values for a collapsed node so layers can
    /// treat it as an ordinary leaf. A loaded row for `label` is kept as is.
    pub fn insert_synthetic(&mut self, label: &str) {
        if self.rows.contains_key(label) {
            return;
        }
        let mut values = Vec::with_capacity(self.headers.len());
        values.push(LayerValue::Token(Some(label.to_owned())));
        for column in 1..self.headers.len() {
            values.push(match self.kinds[column] {
                LayerKind::StackBar => {
                    let segments = self.headers[column].split(';').count();
                    LayerValue::Segments(vec![0.0; segments])
                }
                LayerKind::Numerical => LayerValue::Scalar(0.0),
                LayerKind::Categorical | LayerKind::Parent => {
                    LayerValue::Token(Some(EMPTY_TOKEN.to_owned()))
                }
            });
        }
        self.rows.insert(
            label.to_owned(),
            LeafRow {
                values,
                synthetic: true,
            },
        );
    }

    /// Character count of the longest loaded token in a column.
    pub fn longest_token_len(&self, index: usize) -> usize {
        self.rows
            .values()
            .filter(|row| !row.synthetic)
            .filter_map(|row| row.values.get(index).and_then(LayerValue::as_token))
            .map(|token| token.chars().count())
            .max()
            .unwrap_or(0)
    }
}
