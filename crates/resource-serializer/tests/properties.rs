//! Property tests: frame balance, determinism and delta narrowing over
//! generated customer graphs.

use proptest::prelude::*;

use resource_serializer::{
    check_frames, EdmModel, EncodeOptions, ExpandItem, MetadataLevel, ModelBuilder,
    ResourceBuilder, ResourceEncoder, SelectExpandRequest, Value, WriteEvent, WriteTarget,
};

fn model() -> EdmModel {
    ModelBuilder::new("Sales")
        .complex_type("Address", |t| t.property("City", "Edm.String"))
        .entity_type("Customer", |t| {
            t.key("Id")
                .open()
                .property("Id", "Edm.Int32")
                .property("Name", "Edm.String")
                .property("Tags", "Collection(Edm.String)")
                .property("Address", "Address")
                .navigation("Orders", "Order", true)
                .navigation("Manager", "Customer", false)
        })
        .entity_type("Order", |t| {
            t.key("Id")
                .property("Id", "Edm.Int32")
                .property("Total", "Edm.Double")
        })
        .entity_set("Customers", "Customer", |s| {
            s.conventional("https://host/svc")
                .bind("Orders", "Orders")
                .bind("Manager", "Customers")
        })
        .entity_set("Orders", "Order", |s| s.conventional("https://host/svc"))
        .build()
        .unwrap()
}

#[derive(Debug, Clone)]
struct Customer {
    id: i32,
    name: Option<String>,
    tags: Vec<String>,
    city: Option<String>,
    orders: Vec<(i32, f64)>,
    nickname: Option<String>,
    manager: Option<Box<Customer>>,
}

impl Customer {
    fn builder(&self) -> ResourceBuilder {
        let mut builder = ResourceBuilder::new("Sales.Customer")
            .property("Id", self.id)
            .property("Name", self.name.clone())
            .property(
                "Tags",
                self.tags.iter().map(|t| Value::from(t.as_str())).collect::<Vec<_>>(),
            )
            .property(
                "Orders",
                self.orders
                    .iter()
                    .map(|(id, total)| {
                        ResourceBuilder::new("Sales.Order")
                            .property("Id", *id)
                            .property("Total", *total)
                            .into_value()
                    })
                    .collect::<Vec<_>>(),
            );
        if let Some(city) = &self.city {
            builder = builder.property(
                "Address",
                ResourceBuilder::new("Sales.Address").property("City", city.as_str()),
            );
        }
        if let Some(nickname) = &self.nickname {
            builder = builder.dynamic("Nickname", nickname.as_str());
        }
        if let Some(manager) = &self.manager {
            builder = builder.property("Manager", manager.builder());
        }
        builder
    }
}

fn arb_leaf() -> impl Strategy<Value = Customer> {
    (
        any::<i32>(),
        proptest::option::of("[a-z]{1,8}"),
        proptest::collection::vec("[a-z]{1,4}", 0..3),
        proptest::option::of("[A-Z][a-z]{2,6}"),
        proptest::collection::vec((0..1000i32, -1e6..1e6f64), 0..4),
        proptest::option::of("[a-z]{1,6}"),
    )
        .prop_map(|(id, name, tags, city, orders, nickname)| Customer {
            id,
            name,
            tags,
            city,
            orders,
            nickname,
            manager: None,
        })
}

fn arb_customer() -> impl Strategy<Value = Customer> {
    (arb_leaf(), proptest::option::of(arb_leaf())).prop_map(|(mut customer, manager)| {
        customer.manager = manager.map(Box::new);
        customer
    })
}

fn arb_metadata() -> impl Strategy<Value = MetadataLevel> {
    prop_oneof![
        Just(MetadataLevel::Full),
        Just(MetadataLevel::Minimal),
        Just(MetadataLevel::None),
    ]
}

fn target(expand_orders: bool, expand_manager: bool) -> WriteTarget {
    let mut request = SelectExpandRequest::all();
    if expand_orders {
        request = request.expand(ExpandItem::new("Orders"));
    }
    if expand_manager {
        request = request.expand(ExpandItem::new("Manager"));
    }
    WriteTarget::entity_set("Customers").with_select_expand(request)
}

fn top_level_property_names(events: &[WriteEvent]) -> Vec<String> {
    let mut depth = 0usize;
    let mut names = Vec::new();
    for event in events {
        match event {
            WriteEvent::Property { name, .. } if depth == 1 => names.push(name.clone()),
            e if e.is_start() => depth += 1,
            e if e.is_end() => depth -= 1,
            _ => {}
        }
    }
    names
}

proptest! {
    #[test]
    fn prop_frames_balance_and_repeat(
        customer in arb_customer(),
        metadata in arb_metadata(),
        expand_orders in any::<bool>(),
        expand_manager in any::<bool>(),
    ) {
        let model = model();
        let encoder = ResourceEncoder::new(&model, EncodeOptions::default().with_metadata(metadata));
        let value = customer.builder().into_value();
        let target = target(expand_orders, expand_manager);

        let first = encoder.encode_resource(&value, None, &target).unwrap();
        let second = encoder.encode_resource(&value, None, &target).unwrap();
        prop_assert_eq!(check_frames(&first), Ok(()));
        prop_assert_eq!(
            first.iter().filter(|e| e.is_start()).count(),
            first.iter().filter(|e| e.is_end()).count()
        );
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_delta_bag_is_keys_plus_changed(
        customer in arb_leaf(),
        changed in proptest::sample::subsequence(vec!["Name", "Tags", "Nickname"], 0..=3),
    ) {
        let model = model();
        let encoder = ResourceEncoder::new(&model, EncodeOptions::delta());
        let value = customer.builder().changed(changed.iter().copied()).into_value();

        let events = encoder
            .encode_resource(&value, None, &WriteTarget::entity_set("Customers"))
            .unwrap();
        prop_assert_eq!(check_frames(&events), Ok(()));

        let mut expected = vec!["Id".to_string()];
        for name in ["Name", "Tags"] {
            if changed.contains(&name) {
                expected.push(name.to_string());
            }
        }
        if changed.contains(&"Nickname") && customer.nickname.is_some() {
            expected.push("Nickname".to_string());
        }
        prop_assert_eq!(top_level_property_names(&events), expected);
        prop_assert!(!events.iter().any(|e| matches!(e, WriteEvent::StartNestedInfo(_))));
    }
}
