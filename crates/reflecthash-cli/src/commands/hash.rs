//! Hash command implementation.

use reflecthash::{hash_message, HashOptions, Registry};
use serde_json::json;
use tracing::info;

use super::read_input;
use crate::output::format_json;

pub fn run(
    schema: String,
    type_name: String,
    field_names: bool,
    json_output: bool,
    input: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let registry = Registry::load(&schema)
        .map_err(|e| format!("Failed to load schema {}: {}", schema, e))?;

    let text = read_input(input)?;
    let message = registry.decode_json_str(&type_name, &text)?;

    let options = HashOptions::new().with_field_names_as_keys(field_names);
    let digest = hash_message(Some(&message), &options)?;
    info!(type_name = %type_name, field_names, "hashed message");

    if json_output {
        let keys = if field_names { "name" } else { "number" };
        println!(
            "{}",
            format_json(&json!({
                "type": type_name,
                "keys": keys,
                "digest": digest.to_hex(),
            }))
        );
    } else {
        println!("{}", digest.to_hex());
    }
    Ok(())
}
