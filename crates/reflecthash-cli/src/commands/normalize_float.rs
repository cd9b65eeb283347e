//! Float normalization command implementation.

use reflecthash::normalize;

pub fn run(value: String, single: bool) -> Result<(), Box<dyn std::error::Error>> {
    let parsed: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("Not a floating point value: {}", value))?;

    let parsed = if single {
        let narrowed = parsed as f32;
        if parsed.is_finite() && narrowed.is_infinite() {
            return Err(format!("{} is out of range for single precision", value).into());
        }
        f64::from(narrowed)
    } else {
        parsed
    };

    println!("{}", normalize(parsed)?);
    Ok(())
}
