//! Resource descriptor: immutable per-entity configuration built once at startup.

use crate::query::Operator;
use crate::store::{Collection, Record};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Value type of a filterable field; drives query-string parsing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Number,
    Boolean,
    Uuid,
    Timestamp,
}

#[derive(Clone, Debug)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
}

/// Query parameter with a fixed meaning, e.g. `dateFrom` → `created_at >= value`.
#[derive(Clone, Debug)]
pub struct ReservedParam {
    pub name: String,
    pub field: String,
    pub op: Operator,
}

/// Field-level rewrite applied to update payloads before they reach the store.
#[derive(Clone, Debug, PartialEq)]
pub enum TransformRule {
    /// When the payload sets `field` to `value`, write the current time into `stamp`.
    StampOnValue {
        field: String,
        value: Value,
        stamp: String,
    },
    /// Always write the current time into `field`.
    Touch { field: String },
}

impl TransformRule {
    pub fn apply(&self, payload: &mut Record, now: DateTime<Utc>) {
        let ts = Value::String(now.to_rfc3339_opts(SecondsFormat::Micros, true));
        match self {
            TransformRule::StampOnValue {
                field,
                value,
                stamp,
            } => {
                if payload.get(field) == Some(value) {
                    payload.insert(stamp.clone(), ts);
                }
            }
            TransformRule::Touch { field } => {
                payload.insert(field.clone(), ts);
            }
        }
    }
}

/// Related row embedded under `name` in list/get results, fetched in the same query.
/// We hold the foreign key; null when nothing matches.
#[derive(Clone, Debug)]
pub struct Expansion {
    pub name: String,
    pub collection: String,
    /// Our foreign key column.
    pub local_key: String,
    /// Their key column.
    pub foreign_key: String,
    /// Projected columns of the related row; empty means all.
    pub columns: Vec<String>,
}

impl Expansion {
    pub fn to_one(name: &str, collection: &str, local_key: &str, columns: &[&str]) -> Self {
        Expansion {
            name: name.into(),
            collection: collection.into(),
            local_key: local_key.into(),
            foreign_key: "id".into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::List,
        Operation::Get,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
    ];
}

/// Per-field request body rules checked by [`crate::service::RequestValidator`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

#[derive(Clone, Debug)]
pub struct ResourceDescriptor {
    /// Table name in the store.
    pub collection: String,
    /// URL segment under `/api/admin`.
    pub path_segment: String,
    /// Uuid-valued key column.
    pub primary_key: String,
    /// Creation timestamp column used for default newest-first ordering and date ranges.
    pub created_at: Option<String>,
    pub fields: Vec<FieldSpec>,
    pub params: Vec<ReservedParam>,
    pub transforms: Vec<TransformRule>,
    pub expansions: Vec<Expansion>,
    pub operations: HashSet<Operation>,
    /// Columns dropped from update payloads.
    pub immutable: HashSet<String>,
    pub validation: HashMap<String, ValidationRule>,
}

impl ResourceDescriptor {
    /// Uuid `id` key, `created_at`/`updated_at` timestamps, all five operations.
    pub fn new(collection: &str) -> Self {
        ResourceDescriptor {
            collection: collection.into(),
            path_segment: collection.into(),
            primary_key: "id".into(),
            created_at: Some("created_at".into()),
            fields: vec![
                FieldSpec {
                    name: "id".into(),
                    kind: FieldKind::Uuid,
                },
                FieldSpec {
                    name: "created_at".into(),
                    kind: FieldKind::Timestamp,
                },
                FieldSpec {
                    name: "updated_at".into(),
                    kind: FieldKind::Timestamp,
                },
            ],
            params: Vec::new(),
            transforms: Vec::new(),
            expansions: Vec::new(),
            operations: Operation::ALL.into_iter().collect(),
            immutable: ["id", "created_at"].into_iter().map(String::from).collect(),
            validation: HashMap::new(),
        }
    }

    pub fn path(mut self, segment: &str) -> Self {
        self.path_segment = segment.into();
        self
    }

    pub fn field(mut self, name: &str, kind: FieldKind) -> Self {
        self.fields.retain(|f| f.name != name);
        self.fields.push(FieldSpec {
            name: name.into(),
            kind,
        });
        self
    }

    pub fn param(mut self, name: &str, field: &str, op: Operator) -> Self {
        self.params.push(ReservedParam {
            name: name.into(),
            field: field.into(),
            op,
        });
        self
    }

    /// `dateFrom`/`dateTo` as inclusive bounds on the creation timestamp.
    pub fn date_range(self) -> Self {
        let Some(created) = self.created_at.clone() else {
            return self;
        };
        self.param("dateFrom", &created, Operator::Gte)
            .param("dateTo", &created, Operator::Lte)
    }

    pub fn stamp_on(mut self, field: &str, value: &str, stamp: &str) -> Self {
        self.transforms.push(TransformRule::StampOnValue {
            field: field.into(),
            value: Value::String(value.into()),
            stamp: stamp.into(),
        });
        self
    }

    pub fn touch(mut self, field: &str) -> Self {
        self.transforms.push(TransformRule::Touch {
            field: field.into(),
        });
        self
    }

    pub fn expand(mut self, expansion: Expansion) -> Self {
        self.expansions.push(expansion);
        self
    }

    pub fn without(mut self, op: Operation) -> Self {
        self.operations.remove(&op);
        self
    }

    pub fn rule(mut self, field: &str, rule: ValidationRule) -> Self {
        self.validation.insert(field.into(), rule);
        self
    }

    pub fn allows(&self, op: Operation) -> bool {
        self.operations.contains(&op)
    }

    pub fn field_kind(&self, name: &str) -> Option<FieldKind> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.kind)
    }

    pub fn reserved(&self, name: &str) -> Option<&ReservedParam> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn collection_in(&self, schema: &str) -> Collection {
        Collection {
            schema: schema.into(),
            name: self.collection.clone(),
            primary_key: self.primary_key.clone(),
        }
    }

    /// Apply every transform rule to an update payload.
    pub fn apply_transforms(&self, payload: &mut Record, now: DateTime<Utc>) {
        for rule in &self.transforms {
            rule.apply(payload, now);
        }
    }
}
