//! JSON reference hash command implementation.

use reflecthash::hash_json;
use serde_json::{json, Value};

use super::read_input;
use crate::output::format_json;

pub fn run(json_output: bool, input: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let text = read_input(input)?;
    let value: Value =
        serde_json::from_str(&text).map_err(|e| format!("Invalid JSON: {}", e))?;

    let digest = hash_json(&value)?;

    if json_output {
        println!("{}", format_json(&json!({ "digest": digest.to_hex() })));
    } else {
        println!("{}", digest.to_hex());
    }
    Ok(())
}
