//! Read query handed to a store: collection, predicates, ordering, expansions.

use crate::query::{Direction, FilterValue, ListQuery, Operator, OrderBy, QueryFilter};
use crate::resource::Expansion;
use crate::store::Collection;

#[derive(Clone, Debug)]
pub struct SelectQuery {
    pub collection: Collection,
    pub filter: QueryFilter,
    pub order: Vec<OrderBy>,
    pub expansions: Vec<Expansion>,
}

impl SelectQuery {
    pub fn from(collection: Collection) -> Self {
        SelectQuery {
            collection,
            filter: QueryFilter::new(),
            order: Vec::new(),
            expansions: Vec::new(),
        }
    }

    pub fn list(mut self, list: ListQuery) -> Self {
        self.filter = list.filter;
        self.order = list.order;
        self
    }

    pub fn eq(mut self, field: &str, value: FilterValue) -> Self {
        self.filter.push(field, Operator::Eq, value);
        self
    }

    pub fn gte(mut self, field: &str, value: FilterValue) -> Self {
        self.filter.push(field, Operator::Gte, value);
        self
    }

    pub fn order(mut self, field: &str, direction: Direction) -> Self {
        self.order.push(OrderBy {
            field: field.to_string(),
            direction,
        });
        self
    }

    pub fn expand(mut self, expansions: &[Expansion]) -> Self {
        self.expansions.extend_from_slice(expansions);
        self
    }
}
