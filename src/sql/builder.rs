//! Builds parameterized SELECT, INSERT, UPDATE, DELETE. Rows come back as `to_jsonb(main)`.
//! Payload columns are typed through `jsonb_populate_record` against the table's own row type.

use crate::query::{Condition, Direction, FilterValue, Operator, SelectQuery};
use crate::resource::Expansion;
use crate::sql::PgBindValue;
use crate::store::{Collection, Record};

const MAIN_ALIAS: &str = "main";

/// Quote identifier for PostgreSQL.
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<PgBindValue>,
}

impl QueryBuf {
    fn push_param(&mut self, v: PgBindValue) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

fn column_list(columns: &[String]) -> String {
    if columns.is_empty() {
        return "*".into();
    }
    columns
        .iter()
        .map(|c| quoted(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Scalar sub-select embedding the related row, or NULL.
fn expansion_subquery(schema: &str, exp: &Expansion) -> String {
    let related = qualified_table(schema, &exp.collection);
    let from = format!(
        "SELECT {} FROM {} WHERE {} = {}.{}",
        column_list(&exp.columns),
        related,
        quoted(&exp.foreign_key),
        MAIN_ALIAS,
        quoted(&exp.local_key)
    );
    format!("(SELECT to_jsonb(sub) FROM ({} LIMIT 1) sub)", from)
}

fn operand(value: &FilterValue, field: &str) -> String {
    match value {
        // text filters also match enum-typed columns
        FilterValue::Text(_) => format!("{}.{}::text", MAIN_ALIAS, quoted(field)),
        FilterValue::List(items) if matches!(items.first(), Some(FilterValue::Text(_))) => {
            format!("{}.{}::text", MAIN_ALIAS, quoted(field))
        }
        _ => format!("{}.{}", MAIN_ALIAS, quoted(field)),
    }
}

fn predicate(q: &mut QueryBuf, field: &str, cond: &Condition) -> String {
    let lhs = operand(&cond.value, field);
    match (&cond.op, &cond.value) {
        (Operator::In, FilterValue::List(items)) => {
            if items.is_empty() {
                return "FALSE".into();
            }
            let placeholders: Vec<String> = items
                .iter()
                .map(|v| format!("${}", q.push_param(PgBindValue::from_filter(v))))
                .collect();
            format!("{} IN ({})", lhs, placeholders.join(", "))
        }
        (op, value) => {
            let n = q.push_param(PgBindValue::from_filter(value));
            let sym = match op {
                Operator::Gte => ">=",
                Operator::Lte => "<=",
                Operator::Eq | Operator::In => "=",
            };
            format!("{} {} ${}", lhs, sym, n)
        }
    }
}

/// SELECT with filters, ordering and expansions in a single statement.
pub fn select(query: &SelectQuery) -> QueryBuf {
    let mut q = QueryBuf::default();
    let c = &query.collection;
    let table = qualified_table(&c.schema, &c.name);

    let mut row_expr = format!("to_jsonb({})", MAIN_ALIAS);
    if !query.expansions.is_empty() {
        let pairs: Vec<String> = query
            .expansions
            .iter()
            .map(|e| format!("{}, {}", literal(&e.name), expansion_subquery(&c.schema, e)))
            .collect();
        row_expr = format!("{} || jsonb_build_object({})", row_expr, pairs.join(", "));
    }

    let where_parts: Vec<String> = query
        .filter
        .iter()
        .map(|(field, cond)| predicate(&mut q, field, cond))
        .collect();
    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    };
    let order_clause = if query.order.is_empty() {
        String::new()
    } else {
        let parts: Vec<String> = query
            .order
            .iter()
            .map(|o| {
                let dir = match o.direction {
                    Direction::Asc => "ASC",
                    Direction::Desc => "DESC",
                };
                format!("{}.{} {}", MAIN_ALIAS, quoted(&o.field), dir)
            })
            .collect();
        format!(" ORDER BY {}", parts.join(", "))
    };

    q.sql = format!(
        "SELECT {} FROM {} {}{}{}",
        row_expr, table, MAIN_ALIAS, where_clause, order_clause
    );
    q
}

/// INSERT only the columns present in the payload so omitted columns keep their DB default.
pub fn insert(collection: &Collection, payload: &Record) -> QueryBuf {
    let mut q = QueryBuf::default();
    let table = qualified_table(&collection.schema, &collection.name);
    if payload.is_empty() {
        q.sql = format!(
            "INSERT INTO {} AS {} DEFAULT VALUES RETURNING to_jsonb({})",
            table, MAIN_ALIAS, MAIN_ALIAS
        );
        return q;
    }
    let cols: Vec<String> = payload.keys().map(|k| quoted(k)).collect();
    let cols = cols.join(", ");
    let n = q.push_param(PgBindValue::Json(serde_json::Value::Object(payload.clone())));
    q.sql = format!(
        "INSERT INTO {table} AS {alias} ({cols}) SELECT {cols} FROM jsonb_populate_record(NULL::{table}, ${n}) RETURNING to_jsonb({alias})",
        table = table,
        alias = MAIN_ALIAS,
        cols = cols,
        n = n
    );
    q
}

/// UPDATE by primary key: SET only the payload's columns, never the key itself.
pub fn update(collection: &Collection, id: &FilterValue, payload: &Record) -> QueryBuf {
    let mut q = QueryBuf::default();
    let table = qualified_table(&collection.schema, &collection.name);
    let pk = quoted(&collection.primary_key);
    let sets: Vec<String> = payload
        .keys()
        .filter(|k| **k != collection.primary_key)
        .map(|k| format!("{} = src.{}", quoted(k), quoted(k)))
        .collect();
    if sets.is_empty() {
        let n = q.push_param(PgBindValue::from_filter(id));
        q.sql = format!(
            "SELECT to_jsonb({alias}) FROM {table} {alias} WHERE {alias}.{pk} = ${n}",
            alias = MAIN_ALIAS,
            table = table,
            pk = pk,
            n = n
        );
        return q;
    }
    let body = q.push_param(PgBindValue::Json(serde_json::Value::Object(payload.clone())));
    let id_param = q.push_param(PgBindValue::from_filter(id));
    q.sql = format!(
        "UPDATE {table} AS {alias} SET {sets} FROM jsonb_populate_record(NULL::{table}, ${body}) AS src WHERE {alias}.{pk} = ${id} RETURNING to_jsonb({alias})",
        table = table,
        alias = MAIN_ALIAS,
        sets = sets.join(", "),
        body = body,
        pk = pk,
        id = id_param
    );
    q
}

/// DELETE by primary key, returning the removed rows.
pub fn delete(collection: &Collection, id: &FilterValue) -> QueryBuf {
    let mut q = QueryBuf::default();
    let table = qualified_table(&collection.schema, &collection.name);
    let n = q.push_param(PgBindValue::from_filter(id));
    q.sql = format!(
        "DELETE FROM {table} AS {alias} WHERE {alias}.{pk} = ${n} RETURNING to_jsonb({alias})",
        table = table,
        alias = MAIN_ALIAS,
        pk = quoted(&collection.primary_key),
        n = n
    );
    q
}
