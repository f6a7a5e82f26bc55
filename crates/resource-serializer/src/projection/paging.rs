//! Filter, ordering and paging of expanded collections.

use std::cmp::Ordering;

use crate::model::{PrimitiveValue, Value};
use crate::projection::ExpandOptions;

/// Applies expansion options to a collection.
///
/// Returns the items to write and, when requested, the number of items that
/// matched the filter before paging.
pub fn apply_expand_options<'v>(
    items: &'v [Value],
    options: &ExpandOptions,
) -> (Vec<&'v Value>, Option<u64>) {
    let mut selected: Vec<&Value> = match &options.filter {
        Some(filter) => items
            .iter()
            .filter(|item| member(item, &filter.property) == Some(&filter.equals))
            .collect(),
        None => items.iter().collect(),
    };
    let count = options.count.then_some(selected.len() as u64);

    if !options.order_by.is_empty() {
        // Stable: ties keep their original order.
        selected.sort_by(|a, b| {
            options
                .order_by
                .iter()
                .map(|key| {
                    let ordering = compare_values(member(a, &key.property), member(b, &key.property));
                    if key.descending {
                        ordering.reverse()
                    } else {
                        ordering
                    }
                })
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
    }

    let skip = options.skip.unwrap_or(0);
    let top = options.top.unwrap_or(usize::MAX);
    let page = selected.into_iter().skip(skip).take(top).collect();
    (page, count)
}

fn member<'v>(item: &'v Value, property: &str) -> Option<&'v Value> {
    let resource = item.as_resource()?;
    resource
        .property(property)
        .or_else(|| resource.dynamic_property(property))
}

/// Total order over property values: missing and null first, then by kind.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Primitive(a)), Some(Value::Primitive(b))) => compare_primitives(a, b),
        (Some(Value::Enum { member: a, .. }), Some(Value::Enum { member: b, .. })) => a.cmp(b),
        (Some(a), Some(b)) => a.describe().cmp(&b.describe()),
    }
}

fn as_f64(value: &PrimitiveValue) -> Option<f64> {
    match value {
        PrimitiveValue::Single(v) => Some(f64::from(*v)),
        PrimitiveValue::Double(v) => Some(*v),
        PrimitiveValue::Decimal { mantissa, exponent } => {
            Some(*mantissa as f64 * 10f64.powi(*exponent))
        }
        other => other.as_i64().map(|v| v as f64),
    }
}

fn compare_primitives(a: &PrimitiveValue, b: &PrimitiveValue) -> Ordering {
    use PrimitiveValue as P;

    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x.cmp(&y);
    }
    if let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) {
        return x.total_cmp(&y);
    }
    match (a, b) {
        (P::Boolean(x), P::Boolean(y)) => x.cmp(y),
        (P::String(x), P::String(y)) => x.cmp(y),
        (P::Guid(x), P::Guid(y)) => x.cmp(y),
        (P::Binary(x), P::Binary(y)) => x.cmp(y),
        (P::Date { days: x }, P::Date { days: y }) => x.cmp(y),
        (P::TimeOfDay { micros: x }, P::TimeOfDay { micros: y }) => x.cmp(y),
        (P::DateTimeOffset { epoch_us: x, .. }, P::DateTimeOffset { epoch_us: y, .. }) => {
            x.cmp(y)
        }
        (P::Duration { micros: x }, P::Duration { micros: y }) => x.cmp(y),
        _ => a.kind().cmp(&b.kind()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceBuilder;
    use crate::projection::{OrderBy, PropertyFilter};

    fn orders() -> Vec<Value> {
        [(1, "open", 30), (2, "closed", 10), (3, "open", 20), (4, "open", 10)]
            .into_iter()
            .map(|(id, status, amount)| {
                ResourceBuilder::new("Sales.Order")
                    .property("Id", id)
                    .property("Status", status)
                    .property("Amount", amount)
                    .into_value()
            })
            .collect()
    }

    fn ids(items: &[&Value]) -> Vec<i32> {
        items
            .iter()
            .filter_map(|v| match v.as_resource()?.property("Id")? {
                Value::Primitive(PrimitiveValue::Int32(id)) => Some(*id),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_identity_options() {
        let orders = orders();
        let (items, count) = apply_expand_options(&orders, &ExpandOptions::default());
        assert_eq!(ids(&items), [1, 2, 3, 4]);
        assert_eq!(count, None);
    }

    #[test]
    fn test_filter_order_page_count() {
        let orders = orders();
        let options = ExpandOptions {
            filter: Some(PropertyFilter {
                property: "Status".into(),
                equals: Value::from("open"),
            }),
            order_by: vec![OrderBy {
                property: "Amount".into(),
                descending: false,
            }],
            skip: Some(1),
            top: Some(1),
            count: true,
        };
        let (items, count) = apply_expand_options(&orders, &options);
        // open orders by amount: 4 (10), 3 (20), 1 (30)
        assert_eq!(ids(&items), [3]);
        assert_eq!(count, Some(3));
    }

    #[test]
    fn test_descending_is_stable() {
        let orders = orders();
        let options = ExpandOptions {
            order_by: vec![OrderBy {
                property: "Amount".into(),
                descending: true,
            }],
            ..ExpandOptions::default()
        };
        let (items, _) = apply_expand_options(&orders, &options);
        assert_eq!(ids(&items), [1, 3, 2, 4]);
    }

    #[test]
    fn test_nulls_sort_first() {
        let one = Value::from(1);
        assert_eq!(compare_values(None, Some(&one)), Ordering::Less);
        assert_eq!(compare_values(Some(&Value::Null), None), Ordering::Equal);
        assert_eq!(
            compare_values(Some(&Value::from(2i64)), Some(&Value::from(1.5f64))),
            Ordering::Greater
        );
    }
}
