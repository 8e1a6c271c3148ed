//! Filters and sort specifications for appointment lookups.
//!
//! Builders are pure. A `Filter` can be evaluated against a document
//! (in-memory store), compiled to SQL (SQLite store) or rendered in
//! document-store query syntax for diagnostics.

use std::cmp::Ordering;

use serde_json::{json, Number, Value};

use crate::contract::model::{AppointmentStatus, Document};

pub const FIELD_ID: &str = "id";
pub const FIELD_APPOINTMENT_DATE: &str = "appointmentDate";
pub const FIELD_STATUS: &str = "status";
pub const FIELD_PRICE: &str = "price";

const MAX_PATH_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Gte,
    Lte,
}

impl CmpOp {
    pub fn operator(&self) -> &'static str {
        match self {
            CmpOp::Eq => "$eq",
            CmpOp::Gte => "$gte",
            CmpOp::Lte => "$lte",
        }
    }

    fn holds(&self, ord: Ordering) -> bool {
        match self {
            CmpOp::Eq => ord == Ordering::Equal,
            CmpOp::Gte => ord != Ordering::Less,
            CmpOp::Lte => ord != Ordering::Greater,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every document.
    All,
    And(Vec<Filter>),
    Cmp { path: String, op: CmpOp, value: Value },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub order: Order,
}

/// Options for `find_many`. An empty `sort` keeps natural store order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub sort: Vec<SortSpec>,
}

// --- builders ---

/// Exact, case-sensitive match on the business key.
pub fn by_id(id: &str) -> Filter {
    Filter::Cmp {
        path: FIELD_ID.to_string(),
        op: CmpOp::Eq,
        value: Value::String(id.to_string()),
    }
}

pub fn match_all() -> Filter {
    Filter::All
}

/// Booked appointments with `start <= appointmentDate <= end`.
pub fn by_date_range_booked(start: i64, end: i64) -> Filter {
    Filter::And(vec![
        Filter::Cmp {
            path: FIELD_APPOINTMENT_DATE.to_string(),
            op: CmpOp::Gte,
            value: json!(start),
        },
        Filter::Cmp {
            path: FIELD_APPOINTMENT_DATE.to_string(),
            op: CmpOp::Lte,
            value: json!(end),
        },
        Filter::Cmp {
            path: FIELD_STATUS.to_string(),
            op: CmpOp::Eq,
            value: json!(AppointmentStatus::Booked.as_str()),
        },
    ])
}

/// Cheapest first. Equal prices keep natural store order, which is not
/// guaranteed to be the same across backends.
pub fn ascending_by_price() -> FindOptions {
    FindOptions {
        sort: vec![SortSpec {
            field: FIELD_PRICE.to_string(),
            order: Order::Asc,
        }],
    }
}

// --- evaluation ---

impl Filter {
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::And(parts) => parts.iter().all(|f| f.matches(doc)),
            Filter::Cmp { path, op, value } => lookup(doc, path)
                .and_then(|found| compare_values(found, value))
                .is_some_and(|ord| op.holds(ord)),
        }
    }

    /// Render in document-store query syntax, e.g.
    /// `{"appointmentDate": {"$gte": 1, "$lte": 2}, "status": "BOOKED"}`.
    pub fn to_document(&self) -> Document {
        match self {
            Filter::All => Document::new(),
            Filter::Cmp { path, op, value } => {
                let mut out = Document::new();
                let rendered = match op {
                    CmpOp::Eq => value.clone(),
                    other => {
                        let mut inner = Document::new();
                        inner.insert(other.operator().to_string(), value.clone());
                        Value::Object(inner)
                    }
                };
                out.insert(path.clone(), rendered);
                out
            }
            Filter::And(parts) => {
                let mut out = Document::new();
                for part in parts {
                    for (key, value) in part.to_document() {
                        match (out.get_mut(&key), value) {
                            (Some(Value::Object(existing)), Value::Object(more)) => {
                                existing.extend(more)
                            }
                            (Some(_), _) => return explicit_and(parts),
                            (None, value) => {
                                out.insert(key, value);
                            }
                        }
                    }
                }
                out
            }
        }
    }
}

fn explicit_and(parts: &[Filter]) -> Document {
    let rendered: Vec<Value> = parts
        .iter()
        .map(|p| Value::Object(p.to_document()))
        .collect();
    let mut out = Document::new();
    out.insert("$and".to_string(), Value::Array(rendered));
    out
}

/// Resolve a dotted path inside a document. Missing segments yield `None`.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for (depth, segment) in segments.enumerate() {
        if depth >= MAX_PATH_DEPTH {
            return None;
        }
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Order two JSON scalars of the same kind. Numbers compare numerically
/// regardless of integer/float encoding. Mixed kinds are incomparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn compare_numbers(x: &Number, y: &Number) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return Some(a.cmp(&b));
    }
    x.as_f64()?.partial_cmp(&y.as_f64()?)
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

/// Sort comparator. Missing fields order before present ones.
pub fn compare_documents(a: &Document, b: &Document, sort: &[SortSpec]) -> Ordering {
    for spec in sort {
        let ord = match (lookup(a, &spec.field), lookup(b, &spec.field)) {
            (Some(x), Some(y)) => {
                compare_values(x, y).unwrap_or_else(|| type_rank(x).cmp(&type_rank(y)))
            }
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return match spec.order {
                Order::Asc => ord,
                Order::Desc => ord.reverse(),
            };
        }
    }
    Ordering::Equal
}
