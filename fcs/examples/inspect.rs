//! Inspect an FCS file: header, offsets, dictionary, and load findings

use fcs::{FcsFile, LoadConfig};
use std::time::Instant;

fn main() -> fcs::Result<()> {
    let filename = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sample.fcs".to_string());

    if !std::path::Path::new(&filename).exists() {
        println!("File '{filename}' not found!");
        println!("   Run 'cargo run --example roundtrip' first, or pass a path");
        return Ok(());
    }

    println!("Inspecting '{filename}'...");
    let start = Instant::now();
    let (result, log) = FcsFile::load_logged(&filename, LoadConfig::default());
    let load_time = start.elapsed();

    // findings are reported even when the load fails
    if !log.is_empty() {
        println!("\nLoad findings:");
        for entry in log.entries() {
            println!("   [{}] {}", entry.severity, entry.message);
        }
    }

    let file = result?;
    println!("\nLoaded in {:.3}ms", load_time.as_secs_f64() * 1000.0);
    println!("\nContainer:");
    println!("   Version: {}", file.version);
    println!("   TEXT segment: {:?}", file.offsets.text);
    println!("   Supplemental TEXT: {:?}", file.offsets.supplemental_text);
    println!("   DATA segment: {:?}", file.offsets.data);

    if let Some(matrix) = &file.matrix {
        println!("\nEvent data:");
        println!("   Events: {}", matrix.event_count());
        println!("   Parameters: {}", matrix.parameter_count());
        println!("   Precision: {}", if matrix.is_double_precision() { "f64" } else { "f32" });
        for (i, name) in matrix.names().iter().enumerate() {
            let observed = matrix.observed_range(i).unwrap_or_default();
            println!("   {name}: observed [{:.3}, {:.3}]", observed.min, observed.max);
        }
    }

    // dictionary as JSON for piping into other tools
    let entries: serde_json::Map<String, serde_json::Value> = file
        .dictionary
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
        .collect();
    println!("\nDictionary:");
    println!("{}", serde_json::to_string_pretty(&entries).unwrap_or_default());

    Ok(())
}
