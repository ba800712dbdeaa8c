//! Query-string → store predicates. Pure and deterministic: same parameters, same query.
//!
//! Recognised shapes, for fields the descriptor declares:
//! - `field=value` / `field=eq.value` → equality
//! - `field=gte.value` / `field=lte.value` → inclusive range bound
//! - `field=in.(a,b,c)` → membership
//! - reserved parameters (`dateFrom`, `minPrice`, ...) → their mapped column and operator
//! - `order=field.asc|desc` → explicit sort, ahead of the fixed newest-first sort
//!
//! Anything else is ignored.

use crate::error::AppError;
use crate::resource::{FieldKind, ResourceDescriptor};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Gte,
    Lte,
    In,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FilterValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    List(Vec<FilterValue>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    pub op: Operator,
    pub value: FilterValue,
}

/// Field name → conditions, all of which must hold. Ordered so generated SQL is stable.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryFilter {
    fields: BTreeMap<String, Vec<Condition>>,
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, op: Operator, value: FilterValue) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(Condition { op, value });
    }

    pub fn with(mut self, field: &str, op: Operator, value: FilterValue) -> Self {
        self.push(field, op, value);
        self
    }

    pub fn get(&self, field: &str) -> Option<&[Condition]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Condition)> {
        self.fields
            .iter()
            .flat_map(|(f, conds)| conds.iter().map(move |c| (f.as_str(), c)))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Output of [`translate`]: predicates plus ordering.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListQuery {
    pub filter: QueryFilter,
    pub order: Vec<OrderBy>,
}

#[derive(Error, Debug, PartialEq)]
#[error("invalid value for '{param}': {reason}")]
pub struct FilterError {
    pub param: String,
    pub reason: String,
}

impl From<FilterError> for AppError {
    fn from(e: FilterError) -> Self {
        AppError::Validation(e.to_string())
    }
}

pub fn translate(
    descriptor: &ResourceDescriptor,
    params: &[(String, String)],
) -> Result<ListQuery, FilterError> {
    let mut filter = QueryFilter::new();
    let mut explicit_order: Option<OrderBy> = None;

    for (key, raw) in params {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        if key == "order" {
            explicit_order = parse_order(descriptor, raw).or(explicit_order);
            continue;
        }
        if let Some(reserved) = descriptor.reserved(key) {
            let kind = descriptor
                .field_kind(&reserved.field)
                .unwrap_or(FieldKind::Text);
            let value = parse_value(key, raw, kind, reserved.op)?;
            filter.push(&reserved.field, reserved.op, value);
            continue;
        }
        let Some(kind) = descriptor.field_kind(key) else {
            tracing::trace!(param = %key, collection = %descriptor.collection, "ignoring unknown query parameter");
            continue;
        };
        let (op, rest) = split_operator(raw);
        let value = if op == Operator::In {
            let items = rest
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| parse_value(key, s, kind, Operator::Eq))
                .collect::<Result<Vec<_>, _>>()?;
            FilterValue::List(items)
        } else {
            parse_value(key, rest, kind, op)?
        };
        filter.push(key, op, value);
    }

    let mut order = Vec::new();
    if let Some(o) = explicit_order {
        order.push(o);
    }
    if let Some(created) = &descriptor.created_at {
        if !order.iter().any(|o| &o.field == created) {
            order.push(OrderBy {
                field: created.clone(),
                direction: Direction::Desc,
            });
        }
    }
    Ok(ListQuery { filter, order })
}

fn split_operator(raw: &str) -> (Operator, &str) {
    if let Some(rest) = raw.strip_prefix("gte.") {
        (Operator::Gte, rest)
    } else if let Some(rest) = raw.strip_prefix("lte.") {
        (Operator::Lte, rest)
    } else if let Some(rest) = raw.strip_prefix("eq.") {
        (Operator::Eq, rest)
    } else if let Some(rest) = raw.strip_prefix("in.") {
        let rest = rest.trim();
        let rest = rest
            .strip_prefix('(')
            .and_then(|r| r.strip_suffix(')'))
            .unwrap_or(rest);
        (Operator::In, rest)
    } else {
        (Operator::Eq, raw)
    }
}

fn parse_order(descriptor: &ResourceDescriptor, raw: &str) -> Option<OrderBy> {
    let (field, direction) = match raw.rsplit_once('.') {
        Some((f, "desc")) => (f, Direction::Desc),
        Some((f, "asc")) => (f, Direction::Asc),
        _ => (raw, Direction::Asc),
    };
    descriptor.field_kind(field).map(|_| OrderBy {
        field: field.to_string(),
        direction,
    })
}

fn invalid(param: &str, reason: impl Into<String>) -> FilterError {
    FilterError {
        param: param.to_string(),
        reason: reason.into(),
    }
}

fn parse_value(param: &str, raw: &str, kind: FieldKind, op: Operator) -> Result<FilterValue, FilterError> {
    match kind {
        FieldKind::Text => Ok(FilterValue::Text(raw.to_string())),
        FieldKind::Integer => raw
            .parse::<i64>()
            .map(FilterValue::Int)
            .map_err(|_| invalid(param, format!("'{}' is not an integer", raw))),
        FieldKind::Number => match raw.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(FilterValue::Float(n)),
            _ => Err(invalid(param, format!("'{}' is not a number", raw))),
        },
        FieldKind::Boolean => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(FilterValue::Bool(true)),
            "false" | "0" => Ok(FilterValue::Bool(false)),
            _ => Err(invalid(param, format!("'{}' is not a boolean", raw))),
        },
        FieldKind::Uuid => Uuid::parse_str(raw)
            .map(FilterValue::Uuid)
            .map_err(|_| invalid(param, format!("'{}' is not a uuid", raw))),
        FieldKind::Timestamp => parse_timestamp(raw, op)
            .map(FilterValue::Timestamp)
            .ok_or_else(|| invalid(param, format!("'{}' is not a date or timestamp", raw))),
    }
}

/// RFC 3339, naive date-time (taken as UTC) or a bare date. A bare date used as an upper
/// bound covers the whole day.
pub fn parse_timestamp(raw: &str, op: Operator) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let naive = match op {
        Operator::Lte => date.and_hms_micro_opt(23, 59, 59, 999_999)?,
        _ => date.and_hms_opt(0, 0, 0)?,
    };
    Some(naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Entity, Products, Quotes, Testimonials};

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn no_params_orders_newest_first() {
        let q = translate(&Testimonials::descriptor(), &[]).unwrap();
        assert!(q.filter.is_empty());
        assert_eq!(
            q.order,
            vec![OrderBy {
                field: "created_at".into(),
                direction: Direction::Desc
            }]
        );
    }

    #[test]
    fn unknown_params_are_ignored() {
        let d = Testimonials::descriptor();
        let with_foo = translate(&d, &params(&[("status", "approved"), ("foo", "bar")])).unwrap();
        let without = translate(&d, &params(&[("status", "approved")])).unwrap();
        assert_eq!(with_foo, without);
    }

    #[test]
    fn date_range_is_inclusive_of_whole_days() {
        let q = translate(
            &Quotes::descriptor(),
            &params(&[("dateFrom", "2024-01-01"), ("dateTo", "2024-01-31")]),
        )
        .unwrap();
        let conds = q.filter.get("created_at").unwrap();
        assert_eq!(conds.len(), 2);
        assert_eq!(conds[0].op, Operator::Gte);
        assert_eq!(
            conds[0].value,
            FilterValue::Timestamp("2024-01-01T00:00:00Z".parse().unwrap())
        );
        assert_eq!(conds[1].op, Operator::Lte);
        assert_eq!(
            conds[1].value,
            FilterValue::Timestamp("2024-01-31T23:59:59.999999Z".parse().unwrap())
        );
    }

    #[test]
    fn price_bounds_are_both_kept() {
        let q = translate(
            &Products::descriptor(),
            &params(&[("minPrice", "10"), ("maxPrice", "99.5"), ("inStock", "true")]),
        )
        .unwrap();
        let price = q.filter.get("price").unwrap();
        assert_eq!(price[0], Condition { op: Operator::Gte, value: FilterValue::Float(10.0) });
        assert_eq!(price[1], Condition { op: Operator::Lte, value: FilterValue::Float(99.5) });
        assert_eq!(q.filter.get("in_stock").unwrap()[0].value, FilterValue::Bool(true));
    }

    #[test]
    fn operator_prefixes_on_declared_fields() {
        let q = translate(&Products::descriptor(), &params(&[("price", "lte.20")])).unwrap();
        assert_eq!(
            q.filter.get("price").unwrap()[0],
            Condition { op: Operator::Lte, value: FilterValue::Float(20.0) }
        );

        let q = translate(&Products::descriptor(), &params(&[("name", "in.(a, b)")])).unwrap();
        let name = &q.filter.get("name").unwrap()[0];
        assert_eq!(name.op, Operator::In);
        assert_eq!(
            name.value,
            FilterValue::List(vec![FilterValue::Text("a".into()), FilterValue::Text("b".into())])
        );
    }

    #[test]
    fn reserved_params_take_the_value_verbatim() {
        let q = translate(&Testimonials::descriptor(), &params(&[("rating", "4"), ("featured", "false")]))
            .unwrap();
        assert_eq!(q.filter.get("rating").unwrap()[0].value, FilterValue::Int(4));
        assert_eq!(q.filter.get("is_featured").unwrap()[0].value, FilterValue::Bool(false));
    }

    #[test]
    fn malformed_value_for_known_field_is_an_error() {
        let err = translate(&Testimonials::descriptor(), &params(&[("rating", "five")])).unwrap_err();
        assert_eq!(err.param, "rating");
        assert!(translate(&Quotes::descriptor(), &params(&[("serviceId", "nope")])).is_err());
    }

    #[test]
    fn empty_values_are_skipped() {
        let q = translate(&Testimonials::descriptor(), &params(&[("status", "")])).unwrap();
        assert!(q.filter.is_empty());
    }

    #[test]
    fn explicit_order_comes_before_creation_sort() {
        let q = translate(&Products::descriptor(), &params(&[("order", "price.asc")])).unwrap();
        assert_eq!(q.order.len(), 2);
        assert_eq!(q.order[0].field, "price");
        assert_eq!(q.order[0].direction, Direction::Asc);
        assert_eq!(q.order[1].field, "created_at");

        let q = translate(&Products::descriptor(), &params(&[("order", "secret.desc")])).unwrap();
        assert_eq!(q.order.len(), 1);
    }

    #[test]
    fn timestamps_accept_rfc3339_and_naive_forms() {
        assert!(parse_timestamp("2024-03-01T10:00:00+02:00", Operator::Gte).is_some());
        assert!(parse_timestamp("2024-03-01T10:00:00", Operator::Gte).is_some());
        assert!(parse_timestamp("2024-03-01 10:00:00.5", Operator::Gte).is_some());
        assert!(parse_timestamp("March 1st", Operator::Gte).is_none());
    }
}
