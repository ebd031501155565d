use std::cmp::Ordering;

use chrono::DateTime;
use serde_json::Value;

use super::Fields;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Equal,
    NotEqual,
    ArrayContains,
    /// Field is an array sharing at least one element with the value array.
    ArrayContainsAny,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// A structured query over one collection: AND of field filters, then
/// ordering, then limit.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<FieldFilter>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn collection(name: &str) -> Self {
        Self {
            collection: name.to_string(),
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    fn filter(mut self, field: &str, op: FilterOp, value: Value) -> Self {
        self.filters.push(FieldFilter {
            field: field.to_string(),
            op,
            value,
        });
        self
    }

    pub fn where_eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Equal, value.into())
    }

    pub fn where_ne(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::NotEqual, value.into())
    }

    pub fn where_array_contains(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::ArrayContains, value.into())
    }

    pub fn where_array_contains_any(self, field: &str, values: Vec<Value>) -> Self {
        self.filter(field, FilterOp::ArrayContainsAny, Value::Array(values))
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by.push(OrderBy {
            field: field.to_string(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a document passes every filter. Documents missing a field
    /// used in a filter or in the ordering never match, as in Firestore.
    pub fn matches(&self, fields: &Fields) -> bool {
        let filters_pass = self.filters.iter().all(|f| {
            let Some(actual) = fields.get(&f.field) else {
                return false;
            };
            match f.op {
                FilterOp::Equal => actual == &f.value,
                FilterOp::NotEqual => !actual.is_null() && actual != &f.value,
                FilterOp::ArrayContains => actual
                    .as_array()
                    .map(|a| a.contains(&f.value))
                    .unwrap_or(false),
                FilterOp::ArrayContainsAny => match (actual.as_array(), f.value.as_array()) {
                    (Some(a), Some(wanted)) => wanted.iter().any(|w| a.contains(w)),
                    _ => false,
                },
            }
        });
        filters_pass && self.order_by.iter().all(|o| fields.contains_key(&o.field))
    }

    /// Sort matched documents by the ordering clauses.
    pub fn sort<T>(&self, items: &mut [T], fields_of: impl Fn(&T) -> &Fields) {
        if self.order_by.is_empty() {
            return;
        }
        items.sort_by(|a, b| {
            let (fa, fb) = (fields_of(a), fields_of(b));
            for order in &self.order_by {
                let ord = compare_values(fa.get(&order.field), fb.get(&order.field));
                let ord = match order.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over field values: by type first, then by value. Strings
/// that both parse as RFC 3339 timestamps compare chronologically.
pub(crate) fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let (a, b) = match (a, b) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Less,
        (Some(_), None) => return Ordering::Greater,
        (Some(a), Some(b)) => (a, b),
    };
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => {
            match (DateTime::parse_from_rfc3339(x), DateTime::parse_from_rfc3339(y)) {
                (Ok(tx), Ok(ty)) => tx.cmp(&ty),
                _ => x.cmp(y),
            }
        }
        (Value::Array(x), Value::Array(y)) => {
            for (ex, ey) in x.iter().zip(y) {
                let ord = compare_values(Some(ex), Some(ey));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(v: Value) -> Fields {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn not_equal_requires_the_field() {
        let q = Query::collection("users").where_ne("username", "ana");
        assert!(q.matches(&fields(json!({ "username": "bob" }))));
        assert!(!q.matches(&fields(json!({ "username": "ana" }))));
        assert!(!q.matches(&fields(json!({ "fullName": "No Username" }))));
    }

    #[test]
    fn array_contains_any_intersects() {
        let q = Query::collection("posts")
            .where_array_contains_any("tags", vec![json!("Music"), json!("Travel")]);
        assert!(q.matches(&fields(json!({ "tags": ["Food", "Travel"] }))));
        assert!(!q.matches(&fields(json!({ "tags": ["Food"] }))));
        assert!(!q.matches(&fields(json!({ "tags": "Travel" }))));
    }

    #[test]
    fn order_by_excludes_documents_without_the_field() {
        let q = Query::collection("posts").order_by("createdAt", Direction::Descending);
        assert!(!q.matches(&fields(json!({ "ownerId": "u1" }))));
    }

    #[test]
    fn timestamps_sort_chronologically() {
        let q = Query::collection("posts").order_by("createdAt", Direction::Descending);
        let mut docs = vec![
            fields(json!({ "createdAt": "2024-03-01T10:00:00Z" })),
            fields(json!({ "createdAt": "2024-03-01T10:00:00.500Z" })),
            fields(json!({ "createdAt": "2024-02-01T10:00:00Z" })),
        ];
        q.sort(&mut docs, |f| f);
        let order: Vec<_> = docs.iter().map(|f| f["createdAt"].as_str().unwrap()).collect();
        assert_eq!(
            order,
            vec!["2024-03-01T10:00:00.500Z", "2024-03-01T10:00:00Z", "2024-02-01T10:00:00Z"]
        );
    }

    #[test]
    fn multiple_order_clauses_break_ties() {
        let q = Query::collection("posts")
            .order_by("ownerId", Direction::Ascending)
            .order_by("n", Direction::Descending);
        let mut docs = vec![
            fields(json!({ "ownerId": "b", "n": 1 })),
            fields(json!({ "ownerId": "a", "n": 1 })),
            fields(json!({ "ownerId": "a", "n": 2 })),
        ];
        q.sort(&mut docs, |f| f);
        let order: Vec<_> = docs
            .iter()
            .map(|f| (f["ownerId"].as_str().unwrap().to_string(), f["n"].as_i64().unwrap()))
            .collect();
        let expected: Vec<(String, i64)> = vec![("a".into(), 2), ("a".into(), 1), ("b".into(), 1)];
        assert_eq!(order, expected);
    }
}
