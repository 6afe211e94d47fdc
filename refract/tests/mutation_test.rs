use refract::model::DefaultValue;
use refract::mutation::{NestedOp, Target};
use refract::{
    ErrorKind, FieldKind, FieldValue, FieldWrite, Operation, Payload, ScalarValue, Schema,
};
use serde_json::json;

pub mod helpers {
    use super::*;

    pub const CUSTOMER_ID: &str = "6f1c2a4e-8b0a-4c5e-9d3e-2f1a7b6c5d4e";

    pub fn shop_schema() -> Schema {
        let _ = env_logger::builder().is_test(true).try_init();
        Schema::builder()
            .enumeration("Tier", ["BASIC", "GOLD"])
            .enumeration("OrderStatus", ["PENDING", "PAID", "SHIPPED"])
            .entity("Customer", |e| {
                e.field("id", FieldKind::Uuid)
                    .id()
                    .default(DefaultValue::Uuid);
                e.field("email", FieldKind::String).unique();
                e.field("name", FieldKind::String);
                e.field("tier", FieldKind::enumeration("Tier"))
                    .default(DefaultValue::Value(json!("BASIC")));
                e.field("points", FieldKind::Int)
                    .default(DefaultValue::Value(json!(0)));
                e.field("createdAt", FieldKind::DateTime)
                    .default(DefaultValue::Now);
                e.relation("orders", "Order").many();
                e.relation("addresses", "Address").many();
            })
            .entity("Order", |e| {
                e.field("id", FieldKind::Int)
                    .id()
                    .default(DefaultValue::Autoincrement);
                e.field("number", FieldKind::String).unique();
                e.field("total", FieldKind::Decimal);
                e.field("status", FieldKind::enumeration("OrderStatus"))
                    .default(DefaultValue::Value(json!("PENDING")));
                e.field("notes", FieldKind::String).nullable().optional();
                e.field("customerId", FieldKind::Uuid);
                e.relation("customer", "Customer")
                    .fields(["customerId"])
                    .references(["id"]);
                e.relation("items", "OrderItem").many();
            })
            .entity("Address", |e| {
                e.field("id", FieldKind::Int)
                    .id()
                    .default(DefaultValue::Autoincrement);
                e.field("street", FieldKind::String);
                e.field("city", FieldKind::String);
                e.field("customerId", FieldKind::Uuid)
                    .nullable()
                    .optional();
                e.relation("customer", "Customer")
                    .fields(["customerId"])
                    .references(["id"]);
            })
            .entity("Product", |e| {
                e.field("id", FieldKind::Int)
                    .id()
                    .default(DefaultValue::Autoincrement);
                e.field("sku", FieldKind::String).unique();
                e.field("price", FieldKind::Decimal);
                e.field("stock", FieldKind::Int)
                    .default(DefaultValue::Value(json!(0)));
                e.field("labels", FieldKind::String).list().optional();
                e.relation("items", "OrderItem").many();
            })
            .entity("OrderItem", |e| {
                e.field("orderId", FieldKind::Int);
                e.field("productId", FieldKind::Int);
                e.field("quantity", FieldKind::Int);
                e.compound_id(["orderId", "productId"]);
                e.relation("order", "Order")
                    .fields(["orderId"])
                    .references(["id"]);
                e.relation("product", "Product")
                    .fields(["productId"])
                    .references(["id"]);
            })
            .build()
            .unwrap()
    }

    /// Customer with a one-to-one card whose foreign key lives on the card
    pub fn loyalty_schema() -> Schema {
        let _ = env_logger::builder().is_test(true).try_init();
        Schema::builder()
            .entity("Member", |e| {
                e.field("id", FieldKind::Int)
                    .id()
                    .default(DefaultValue::Autoincrement);
                e.field("email", FieldKind::String).unique();
                e.relation("card", "Card").one();
            })
            .entity("Card", |e| {
                e.field("id", FieldKind::Int)
                    .id()
                    .default(DefaultValue::Autoincrement);
                e.field("number", FieldKind::String).unique();
                e.field("memberId", FieldKind::Int).unique();
                e.relation("member", "Member")
                    .fields(["memberId"])
                    .references(["id"]);
            })
            .build()
            .unwrap()
    }
}

mod create_tests {
    use super::helpers::*;
    use super::*;

    #[test]
    fn test_create_with_connect() {
        // Setup
        let schema = shop_schema();
        let data = schema
            .validate_create(
                "Order",
                &json!({
                    "number": "A-1",
                    "total": "19.99",
                    "customer": { "connect": { "id": CUSTOMER_ID } }
                }),
            )
            .unwrap();

        assert!(matches!(
            data.field("total"),
            Some(FieldValue::Scalar(ScalarValue::Decimal(_)))
        ));
        let write = data.relation("customer").unwrap();
        assert!(matches!(write.op("connect"), Some(NestedOp::Connect(items)) if items.len() == 1));
    }

    #[test]
    fn test_fields_are_kept_in_name_order() {
        let schema = shop_schema();
        let data = schema
            .validate_create(
                "Customer",
                &json!({ "points": 5, "name": "Ada", "email": "ada@example.com" }),
            )
            .unwrap();
        let names: Vec<&str> = data.fields.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["email", "name", "points"]);
    }

    #[test]
    fn test_missing_required_fields_all_reported() {
        let schema = shop_schema();
        let errors = schema
            .validate_create("Order", &json!({ "number": "A-1" }))
            .unwrap_err();
        assert_eq!(
            errors.kinds(),
            vec![ErrorKind::MissingField, ErrorKind::MissingField]
        );
        assert!(errors.at("total").is_some());
        let customer = errors.at("customerId").unwrap();
        assert!(customer.message.contains("customer"));
    }

    #[test]
    fn test_defaults_and_optionals_may_be_left_out() {
        let schema = shop_schema();
        assert!(schema
            .validate_create("Customer", &json!({ "email": "a@example.com", "name": "A" }))
            .is_ok());
        assert!(schema
            .validate_create("Address", &json!({ "street": "1 Main St", "city": "Oslo" }))
            .is_ok());
    }

    #[test]
    fn test_nullable_is_not_optional() {
        let schema = shop_schema();
        let data = schema
            .validate_create(
                "Order",
                &json!({ "number": "A-1", "total": 5, "customerId": CUSTOMER_ID, "notes": null }),
            )
            .unwrap();
        assert_eq!(
            data.field("notes"),
            Some(&FieldValue::Scalar(ScalarValue::Null))
        );

        let errors = schema
            .validate_create(
                "Order",
                &json!({ "number": null, "total": 5, "customerId": CUSTOMER_ID }),
            )
            .unwrap_err();
        assert_eq!(errors.kinds(), vec![ErrorKind::TypeMismatch]);
        assert!(errors.at("number").is_some());
    }

    #[test]
    fn test_foreign_key_and_relation_write_conflict() {
        let schema = shop_schema();
        let errors = schema
            .validate_create(
                "Order",
                &json!({
                    "number": "A-1",
                    "total": 5,
                    "customerId": CUSTOMER_ID,
                    "customer": { "connect": { "id": CUSTOMER_ID } }
                }),
            )
            .unwrap_err();
        assert_eq!(errors.kinds(), vec![ErrorKind::ConstraintViolation]);
        assert!(errors.at("customerId").is_some());
    }

    #[test]
    fn test_nested_create_leaves_out_back_relation() {
        let schema = shop_schema();
        let data = schema
            .validate_create(
                "Customer",
                &json!({
                    "email": "a@example.com",
                    "name": "A",
                    "orders": { "create": [{ "number": "A-1", "total": 5 }, { "number": "A-2", "total": 7 }] }
                }),
            )
            .unwrap();
        match data.relation("orders").unwrap().op("create") {
            Some(NestedOp::Create(rows)) => assert_eq!(rows.len(), 2),
            other => panic!("expected nested create, got {:?}", other),
        }

        let errors = schema
            .validate_create(
                "Customer",
                &json!({
                    "email": "a@example.com",
                    "name": "A",
                    "orders": { "create": [{ "number": "A-1", "total": 5, "customerId": CUSTOMER_ID }] }
                }),
            )
            .unwrap_err();
        assert_eq!(errors.kinds(), vec![ErrorKind::UnknownField]);
        assert!(errors.at("orders.create[0].customerId").is_some());
    }

    #[test]
    fn test_update_operations_unavailable_in_create() {
        let schema = shop_schema();
        let errors = schema
            .validate_create(
                "Customer",
                &json!({
                    "email": "a@example.com",
                    "name": "A",
                    "orders": { "update": { "where": { "id": 1 }, "data": { "notes": "x" } } }
                }),
            )
            .unwrap_err();
        assert_eq!(errors.kinds(), vec![ErrorKind::UnknownField]);
        assert!(errors.at("orders.update").is_some());
    }

    #[test]
    fn test_nested_create_many_and_connect_or_create() {
        let schema = shop_schema();
        let data = schema
            .validate_create(
                "Customer",
                &json!({
                    "email": "a@example.com",
                    "name": "A",
                    "orders": {
                        "createMany": { "data": [{ "number": "A-1", "total": 5 }], "skipDuplicates": true }
                    }
                }),
            )
            .unwrap();
        assert!(matches!(
            data.relation("orders").unwrap().op("createMany"),
            Some(NestedOp::CreateMany { skip_duplicates: true, .. })
        ));

        assert!(schema
            .validate_create(
                "Order",
                &json!({
                    "number": "A-1",
                    "total": 5,
                    "customer": {
                        "connectOrCreate": {
                            "where": { "email": "a@example.com" },
                            "create": { "email": "a@example.com", "name": "A" }
                        }
                    }
                }),
            )
            .is_ok());
    }

    #[test]
    fn test_list_columns_take_plain_or_set_form() {
        let schema = shop_schema();
        let plain = schema
            .validate_create("Product", &json!({ "sku": "P1", "price": 3, "labels": ["a", "b"] }))
            .unwrap();
        let wrapped = schema
            .validate_create(
                "Product",
                &json!({ "sku": "P1", "price": 3, "labels": { "set": ["a", "b"] } }),
            )
            .unwrap();
        assert_eq!(plain, wrapped);

        let errors = schema
            .validate_create("Product", &json!({ "sku": "P1", "price": 3, "labels": ["a", 1] }))
            .unwrap_err();
        assert!(errors.at("labels[1]").is_some());
    }

    #[test]
    fn test_scalar_kinds_are_checked() {
        let schema = shop_schema();
        let errors = schema
            .validate_create(
                "Order",
                &json!({ "number": "A-1", "total": "lots", "customerId": "not-a-uuid", "status": "LOST" }),
            )
            .unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors.at("total").unwrap().kind, ErrorKind::TypeMismatch);
        assert_eq!(errors.at("customerId").unwrap().kind, ErrorKind::TypeMismatch);
        assert_eq!(
            errors.at("status").unwrap().kind,
            ErrorKind::EnumDomainViolation
        );
    }
}

mod inverse_tests {
    use super::helpers::*;
    use super::*;

    #[test]
    fn test_inverse_side_rejects_nested_writes() {
        // Setup
        let schema = loyalty_schema();

        let errors = schema
            .validate_create(
                "Member",
                &json!({ "email": "a@example.com", "card": { "create": { "number": "0001" } } }),
            )
            .unwrap_err();
        assert_eq!(errors.kinds(), vec![ErrorKind::UnknownField]);
        let error = errors.at("card").unwrap();
        assert!(error.message.contains("Card.member"), "{}", error.message);

        let errors = schema
            .validate_update("Member", &json!({ "card": { "disconnect": true } }))
            .unwrap_err();
        assert_eq!(errors.kinds(), vec![ErrorKind::UnknownField]);
        assert!(errors.at("card").is_some());
    }

    #[test]
    fn test_inverse_side_still_filters() {
        let schema = loyalty_schema();
        assert!(schema
            .validate_where("Member", &json!({ "card": { "is": null } }))
            .is_ok());
        assert!(schema
            .validate_where("Member", &json!({ "card": { "number": { "startsWith": "00" } } }))
            .is_ok());
    }

    #[test]
    fn test_owning_side_writes_through_the_relation() {
        let schema = loyalty_schema();
        let data = schema
            .validate_create(
                "Card",
                &json!({ "number": "0001", "member": { "create": { "email": "a@example.com" } } }),
            )
            .unwrap();
        assert!(data.relation("member").is_some());
        assert!(data.field("memberId").is_none());
    }
}

mod update_tests {
    use super::helpers::*;
    use super::*;

    #[test]
    fn test_field_operators() {
        let schema = shop_schema();
        let data = schema
            .validate_update(
                "Customer",
                &json!({ "points": { "increment": 5 }, "name": "B", "tier": { "set": "GOLD" } }),
            )
            .unwrap();
        assert_eq!(
            data.field("points"),
            Some(&FieldWrite::Increment(ScalarValue::Int(5)))
        );
        assert_eq!(
            data.field("name"),
            Some(&FieldWrite::Set(FieldValue::Scalar(ScalarValue::String(
                "B".into()
            ))))
        );
        assert!(schema.validate_update("Customer", &json!({})).unwrap().is_empty());
    }

    #[test]
    fn test_operator_misuse() {
        let schema = shop_schema();
        let errors = schema
            .validate_update("Customer", &json!({ "points": { "increment": 1, "decrement": 1 } }))
            .unwrap_err();
        assert_eq!(errors.kinds(), vec![ErrorKind::ConstraintViolation]);

        let errors = schema
            .validate_update("Customer", &json!({ "name": { "increment": 1 } }))
            .unwrap_err();
        assert_eq!(errors.kinds(), vec![ErrorKind::UnknownField]);
        assert!(errors.at("name.increment").is_some());

        let errors = schema
            .validate_update("Customer", &json!({ "points": { "divide": 0 } }))
            .unwrap_err();
        assert_eq!(errors.kinds(), vec![ErrorKind::ConstraintViolation]);
        assert!(errors.at("points.divide").is_some());
    }

    #[test]
    fn test_list_push() {
        let schema = shop_schema();
        let data = schema
            .validate_update("Product", &json!({ "labels": { "push": "new" } }))
            .unwrap();
        assert_eq!(
            data.field("labels"),
            Some(&FieldWrite::Push(vec![ScalarValue::String("new".into())]))
        );

        let errors = schema
            .validate_update("Product", &json!({ "labels": { "set": [], "push": "x" } }))
            .unwrap_err();
        assert_eq!(errors.kinds(), vec![ErrorKind::ConstraintViolation]);

        let errors = schema
            .validate_update("Product", &json!({ "stock": { "push": 1 } }))
            .unwrap_err();
        assert_eq!(errors.kinds(), vec![ErrorKind::UnknownField]);
    }

    #[test]
    fn test_required_relation_cannot_be_removed() {
        let schema = shop_schema();
        let errors = schema
            .validate_update("Order", &json!({ "customer": { "disconnect": true } }))
            .unwrap_err();
        assert_eq!(errors.kinds(), vec![ErrorKind::RequiredRelationViolation]);
        assert!(errors.at("customer.disconnect").is_some());

        let errors = schema
            .validate_update("Customer", &json!({ "orders": { "disconnect": { "id": 1 } } }))
            .unwrap_err();
        assert_eq!(errors.kinds(), vec![ErrorKind::RequiredRelationViolation]);

        let errors = schema
            .validate_update("Order", &json!({ "customer": { "set": { "id": CUSTOMER_ID } } }))
            .unwrap_err();
        assert_eq!(errors.kinds(), vec![ErrorKind::RequiredRelationViolation]);
    }

    #[test]
    fn test_optional_relation_can_be_removed() {
        let schema = shop_schema();
        let data = schema
            .validate_update("Address", &json!({ "customer": { "disconnect": true } }))
            .unwrap();
        assert_eq!(
            data.relation("customer").unwrap().op("disconnect"),
            Some(&NestedOp::Disconnect(vec![Target::Linked]))
        );

        let data = schema
            .validate_update("Address", &json!({ "customer": { "disconnect": false } }))
            .unwrap();
        assert!(data.relation("customer").unwrap().ops.is_empty());

        assert!(schema
            .validate_update("Customer", &json!({ "addresses": { "set": [{ "id": 1 }, { "id": 2 }] } }))
            .is_ok());
        assert!(schema
            .validate_update("Customer", &json!({ "orders": { "delete": { "id": 1 } } }))
            .is_ok());

        let errors = schema
            .validate_update("Address", &json!({ "customer": { "set": { "id": CUSTOMER_ID } } }))
            .unwrap_err();
        assert_eq!(errors.kinds(), vec![ErrorKind::UnknownField]);
    }

    #[test]
    fn test_nested_update_forms() {
        let schema = shop_schema();
        let data = schema
            .validate_update("Order", &json!({ "customer": { "update": { "name": "B" } } }))
            .unwrap();
        match data.relation("customer").unwrap().op("update") {
            Some(NestedOp::Update(updates)) => assert_eq!(updates[0].where_, Target::Linked),
            other => panic!("expected nested update, got {:?}", other),
        }

        let errors = schema
            .validate_update("Customer", &json!({ "orders": { "update": { "data": { "notes": "x" } } } }))
            .unwrap_err();
        assert_eq!(errors.kinds(), vec![ErrorKind::MissingField]);
        assert!(errors.at("orders.update.where").is_some());

        let errors = schema
            .validate_update(
                "Customer",
                &json!({ "orders": { "upsert": { "create": { "number": "A", "total": 1 }, "update": {} } } }),
            )
            .unwrap_err();
        assert_eq!(errors.kinds(), vec![ErrorKind::MissingField]);
        assert!(errors.at("orders.upsert.where").is_some());
    }

    #[test]
    fn test_update_many_is_scalar_only() {
        let schema = shop_schema();
        let args = schema
            .validate(
                Operation::UpdateMany,
                "Order",
                &json!({ "where": { "status": "PENDING" }, "data": { "status": "PAID" } }),
            )
            .unwrap();
        assert!(matches!(args.payload, Some(Payload::Update(_))));

        let errors = schema
            .validate(
                Operation::UpdateMany,
                "Customer",
                &json!({ "data": { "orders": { "deleteMany": {} } } }),
            )
            .unwrap_err();
        assert_eq!(errors.kinds(), vec![ErrorKind::UnknownField]);
        assert!(errors.at("data.orders").is_some());
    }
}

mod identity_tests {
    use super::helpers::*;
    use super::*;

    #[test]
    fn test_compound_primary_key_nested_or_flattened() {
        let schema = shop_schema();
        let nested = schema
            .validate_where_unique(
                "OrderItem",
                &json!({ "orderId_productId": { "productId": 2, "orderId": 1 } }),
            )
            .unwrap();
        let flattened = schema
            .validate_where_unique("OrderItem", &json!({ "orderId": 1, "productId": 2 }))
            .unwrap();
        assert_eq!(nested, flattened);

        let errors = schema
            .validate_where_unique("OrderItem", &json!({ "orderId": 1 }))
            .unwrap_err();
        assert_eq!(errors.kinds(), vec![ErrorKind::UnionMismatch]);
    }

    #[test]
    fn test_connect_takes_unique_selectors() {
        let schema = shop_schema();
        let errors = schema
            .validate_create(
                "OrderItem",
                &json!({
                    "quantity": 1,
                    "order": { "connect": { "status": "PAID" } },
                    "product": { "connect": { "sku": "P1" } }
                }),
            )
            .unwrap_err();
        assert_eq!(errors.kinds(), vec![ErrorKind::UnionMismatch]);
        assert!(errors.at("order.connect").is_some());
    }
}

mod round_trip_tests {
    use super::helpers::*;
    use super::*;
    use refract::ToInput;

    #[test]
    fn test_create_payload_replays_as_update() {
        let schema = shop_schema();
        let created = schema
            .validate_create(
                "Order",
                &json!({
                    "number": "A-1",
                    "total": "19.50",
                    "notes": null,
                    "status": "PAID",
                    "customer": { "connect": { "id": CUSTOMER_ID } }
                }),
            )
            .unwrap();

        let updated = schema
            .validate_update("Order", &created.to_update_input())
            .unwrap();
        for (field, value) in &created.fields {
            assert_eq!(
                updated.field(field),
                Some(&FieldWrite::Set(value.clone())),
                "field {}",
                field
            );
        }
        assert_eq!(updated.relation("customer"), created.relation("customer"));
    }

    #[test]
    fn test_list_columns_replay_as_set() {
        let schema = shop_schema();
        let created = schema
            .validate_create("Product", &json!({ "sku": "P1", "price": 3, "labels": ["a"] }))
            .unwrap();
        let updated = schema
            .validate_update("Product", &created.to_update_input())
            .unwrap();
        assert_eq!(
            updated.field("labels"),
            Some(&FieldWrite::Set(FieldValue::List(vec![ScalarValue::String(
                "a".into()
            )])))
        );
    }

    #[test]
    fn test_update_payload_renders_canonically() {
        let schema = shop_schema();
        let data = schema
            .validate_update("Customer", &json!({ "name": "B", "points": { "decrement": 2 } }))
            .unwrap();
        assert_eq!(
            data.to_input(),
            json!({ "name": { "set": "B" }, "points": { "decrement": 2 } })
        );
        assert_eq!(schema.validate_update("Customer", &data.to_input()).unwrap(), data);
    }
}
