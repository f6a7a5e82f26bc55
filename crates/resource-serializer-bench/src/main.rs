//! Benchmark for resource encoding using a synthetic customer/order graph.
//!
//! Usage: `bench-customers [COUNT] [--json]`. With `--json` the events of
//! the first customer are printed as JSON lines.

use std::time::Instant;

use resource_serializer::{
    check_frames, enum_value, EdmModel, EncodeOptions, ExpandItem, HashETagHandler,
    MetadataLevel, ModelBuilder, ResourceBuilder, ResourceEncoder, SelectExpandRequest, Value,
    WriteEvent, WriteTarget,
};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const SERVICE_ROOT: &str = "https://example.com/svc";
const TIERS: [&str; 3] = ["Bronze", "Silver", "Gold"];
const CITIES: [&str; 5] = ["Oslo", "Lisbon", "Osaka", "Quito", "Accra"];

fn build_model() -> EdmModel {
    ModelBuilder::new("Sales")
        .enum_type("Tier", TIERS)
        .complex_type("Address", |t| {
            t.property("Street", "Edm.String")
                .property("City", "Edm.String")
        })
        .entity_type("Customer", |t| {
            t.key("Id")
                .open()
                .property("Id", "Edm.Int32")
                .property("Token", "Edm.Guid")
                .property("Name", "Edm.String")
                .property("Tier", "Tier")
                .property("Version", "Edm.Int64")
                .property("Address", "Address")
                .navigation("Orders", "Order", true)
        })
        .entity_type("Order", |t| {
            t.key("Id")
                .property("Id", "Edm.Int32")
                .property("Total", "Edm.Double")
                .property("Lines", "Collection(Edm.String)")
        })
        .entity_set("Customers", "Customer", |s| {
            s.conventional(SERVICE_ROOT)
                .concurrency("Version")
                .bind("Orders", "Orders")
        })
        .entity_set("Orders", "Order", |s| s.conventional(SERVICE_ROOT))
        .action("Customer", "Approve")
        .build()
        .expect("Failed to build model")
}

fn build_customers(count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| {
            let id = i as i32;
            let orders: Vec<Value> = (0..(i % 7))
                .map(|n| {
                    ResourceBuilder::new("Sales.Order")
                        .property("Id", id * 10 + n as i32)
                        .property("Total", (n as f64) * 12.5)
                        .property(
                            "Lines",
                            vec![Value::from("widget"), Value::from("gadget")],
                        )
                        .into_value()
                })
                .collect();
            ResourceBuilder::new("Sales.Customer")
                .property("Id", id)
                .property("Token", Uuid::new_v4())
                .property("Name", format!("Customer {}", i))
                .property("Tier", enum_value("Sales.Tier", TIERS[i % TIERS.len()]))
                .property("Version", i as i64)
                .property(
                    "Address",
                    ResourceBuilder::new("Sales.Address")
                        .property("Street", format!("{} Main St", i))
                        .property("City", CITIES[i % CITIES.len()]),
                )
                .property("Orders", orders)
                .dynamic("Score", (i % 100) as i32)
                .into_value()
        })
        .collect()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let dump_json = args.iter().any(|a| a == "--json");
    let count = args
        .iter()
        .find_map(|a| a.parse::<usize>().ok())
        .unwrap_or(10_000);

    let model = build_model();
    let build_start = Instant::now();
    let customers = build_customers(count);
    println!("Built {} customers in {:?}", customers.len(), build_start.elapsed());

    let request = SelectExpandRequest::all().expand(ExpandItem::new("Orders"));
    let target = WriteTarget::entity_set("Customers").with_select_expand(request);
    let etags = HashETagHandler;

    for metadata in [MetadataLevel::None, MetadataLevel::Minimal, MetadataLevel::Full] {
        let encoder = ResourceEncoder::new(&model, EncodeOptions::default().with_metadata(metadata))
            .with_etag_handler(&etags);

        let encode_start = Instant::now();
        let events = encoder
            .encode_resource_set(&customers, None, &target)
            .expect("Failed to encode");
        let encode_time = encode_start.elapsed();

        check_frames(&events).expect("Unbalanced event stream");
        let properties = events
            .iter()
            .filter(|e| matches!(e, WriteEvent::Property { .. }))
            .count();

        println!("\n{:?} metadata: {} events in {:?}", metadata, events.len(), encode_time);
        println!("  - {} properties", properties);
        println!(
            "  Throughput: {:.0} resources/s",
            count as f64 / encode_time.as_secs_f64()
        );
    }

    if dump_json {
        let encoder = ResourceEncoder::new(&model, EncodeOptions::default());
        if let Some(first) = customers.first() {
            let events = encoder
                .encode_resource(first, None, &target)
                .expect("Failed to encode");
            for event in &events {
                println!("{}", serde_json::to_string(event).expect("Failed to serialize event"));
            }
        }
    }
}
