use reflecthash::{hash_message_hex, FieldValue, HashOptions, Registry};

const SCHEMA: &str = r#"{
  "package": "demo",
  "messages": [
    { "name": "Order", "fields": [
      { "name": "id", "number": 1, "kind": "int64" },
      { "name": "items", "number": 2, "kind": "string", "label": "repeated" },
      { "name": "prices", "number": 3, "map": { "key": "string", "value": "double" } }
    ] }
  ]
}"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let registry = Registry::from_json_str(SCHEMA)?;

    let mut built = registry
        .new_message("demo.Order")
        .ok_or("demo.Order is not registered")?;
    built
        .set("prices", FieldValue::map([("pear", 0.5), ("apple", 1.25)]))?
        .set("items", FieldValue::list(["apple", "pear"]))?
        .set("id", 7)?;

    let decoded = registry.decode_json_str(
        "demo.Order",
        r#"{"id": "7", "items": ["apple", "pear"], "prices": {"apple": 1.25, "pear": 0.5}}"#,
    )?;

    for options in [HashOptions::default(), HashOptions::new().with_field_names_as_keys(true)] {
        let a = hash_message_hex(Some(&built), &options)?;
        let b = hash_message_hex(Some(&decoded), &options)?;
        println!("{:?}: {}", options, a);
        assert_eq!(a, b);
    }
    Ok(())
}
