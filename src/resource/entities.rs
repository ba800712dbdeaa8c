//! The five admin entities. Each marker type binds a descriptor at compile time.

use crate::query::Operator;
use crate::resource::descriptor::*;
use serde_json::json;

pub trait Entity: Send + Sync + 'static {
    fn descriptor() -> ResourceDescriptor;
}

pub struct Testimonials;
pub struct Services;
pub struct Products;
pub struct Quotes;
pub struct ContactMessages;

impl Entity for Testimonials {
    fn descriptor() -> ResourceDescriptor {
        ResourceDescriptor::new("testimonials")
            .field("status", FieldKind::Text)
            .field("rating", FieldKind::Integer)
            .field("is_featured", FieldKind::Boolean)
            .param("status", "status", Operator::Eq)
            .param("rating", "rating", Operator::Eq)
            .param("featured", "is_featured", Operator::Eq)
            .stamp_on("status", "approved", "approved_at")
            .touch("updated_at")
            .rule(
                "rating",
                ValidationRule {
                    minimum: Some(1.0),
                    maximum: Some(5.0),
                    ..Default::default()
                },
            )
            .rule(
                "status",
                ValidationRule {
                    allowed: Some(vec![json!("pending"), json!("approved"), json!("rejected")]),
                    ..Default::default()
                },
            )
    }
}

impl Entity for Services {
    fn descriptor() -> ResourceDescriptor {
        ResourceDescriptor::new("services")
            .field("name", FieldKind::Text)
            .field("is_active", FieldKind::Boolean)
            .touch("updated_at")
            .rule(
                "name",
                ValidationRule {
                    required: Some(true),
                    min_length: Some(1),
                    max_length: Some(200),
                    ..Default::default()
                },
            )
    }
}

impl Entity for Products {
    fn descriptor() -> ResourceDescriptor {
        ResourceDescriptor::new("products")
            .field("name", FieldKind::Text)
            .field("category", FieldKind::Text)
            .field("in_stock", FieldKind::Boolean)
            .field("price", FieldKind::Number)
            .param("category", "category", Operator::Eq)
            .param("inStock", "in_stock", Operator::Eq)
            .param("minPrice", "price", Operator::Gte)
            .param("maxPrice", "price", Operator::Lte)
            .touch("updated_at")
            .rule(
                "name",
                ValidationRule {
                    required: Some(true),
                    min_length: Some(1),
                    ..Default::default()
                },
            )
            .rule(
                "price",
                ValidationRule {
                    minimum: Some(0.0),
                    ..Default::default()
                },
            )
    }
}

impl Entity for Quotes {
    fn descriptor() -> ResourceDescriptor {
        ResourceDescriptor::new("quotes")
            .field("status", FieldKind::Text)
            .field("service_id", FieldKind::Uuid)
            .field("contact_id", FieldKind::Uuid)
            .param("status", "status", Operator::Eq)
            .param("serviceId", "service_id", Operator::Eq)
            .date_range()
            .expand(Expansion::to_one(
                "services",
                "services",
                "service_id",
                &["id", "name", "description"],
            ))
            .expand(Expansion::to_one(
                "clients",
                "contact_messages",
                "contact_id",
                &["id", "name", "email", "phone"],
            ))
            .touch("updated_at")
            .rule(
                "email",
                ValidationRule {
                    format: Some("email".into()),
                    ..Default::default()
                },
            )
    }
}

impl Entity for ContactMessages {
    fn descriptor() -> ResourceDescriptor {
        ResourceDescriptor::new("contact_messages")
            .path("contacts")
            .field("status", FieldKind::Text)
            .field("email", FieldKind::Text)
            .param("status", "status", Operator::Eq)
            .date_range()
            .stamp_on("status", "replied", "replied_at")
            .touch("updated_at")
            .without(Operation::Create)
            .rule(
                "email",
                ValidationRule {
                    format: Some("email".into()),
                    ..Default::default()
                },
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contacts_live_under_their_own_path_without_create() {
        let d = ContactMessages::descriptor();
        assert_eq!(d.collection, "contact_messages");
        assert_eq!(d.path_segment, "contacts");
        assert!(!d.allows(Operation::Create));
    }

    #[test]
    fn products_keep_both_price_bounds() {
        let d = Products::descriptor();
        assert_eq!(d.reserved("minPrice").unwrap().op, Operator::Gte);
        assert_eq!(d.reserved("maxPrice").unwrap().op, Operator::Lte);
        assert_eq!(d.reserved("maxPrice").unwrap().field, "price");
    }

    #[test]
    fn quotes_expand_service_and_client() {
        let d = Quotes::descriptor();
        let names: Vec<_> = d.expansions.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["services", "clients"]);
        assert_eq!(d.expansions[1].collection, "contact_messages");
    }
}
