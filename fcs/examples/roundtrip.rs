//! Write a synthetic FCS file, then load it back and compare

use fcs::{EventMatrix, EventStore, FcsFile, LoadConfig};
use std::time::Instant;

fn main() -> fcs::Result<()> {
    let filename = "sample.fcs";
    let events = 100_000;

    println!("Building a synthetic dataset ({events} events, 3 parameters)...");
    let names = vec!["FSC-A".to_string(), "SSC-A".to_string(), "FL1-A".to_string()];
    let mut matrix = EventMatrix::new(names, events, false);
    for e in 0..events {
        let t = e as f64 / events as f64;
        matrix.set(e, 0, 200.0 + 800.0 * t);
        matrix.set(e, 1, 1000.0 - 900.0 * t);
        matrix.set(e, 2, (t * 1023.0).floor());
    }
    matrix.recompute_observed_ranges();

    let mut file = FcsFile::new();
    file.dictionary.set("$CYT", "Synthetic Cytometer 3000");
    file.dictionary.set("$PROJ", "roundtrip example");
    file.set_matrix(matrix);

    println!("Writing '{filename}'...");
    let start = Instant::now();
    file.save(filename)?;
    println!("Written in {:.3}ms", start.elapsed().as_secs_f64() * 1000.0);
    println!("   DATA segment: {:?}", file.offsets.data);

    println!("Loading it back...");
    let start = Instant::now();
    let loaded = FcsFile::load_with(filename, LoadConfig::new().with_scaling(false))?;
    println!("Loaded in {:.3}ms", start.elapsed().as_secs_f64() * 1000.0);

    let reloaded = loaded.matrix.as_ref().expect("saved files carry data");
    println!("\nComparing matrices...");
    let mut mismatches = 0;
    for p in 0..reloaded.parameter_count() {
        for e in 0..reloaded.event_count() {
            if file.matrix.as_ref().and_then(|m| m.get(e, p)) != reloaded.get(e, p) {
                mismatches += 1;
            }
        }
    }
    println!(
        "   {} events x {} parameters, {mismatches} mismatches",
        reloaded.event_count(),
        reloaded.parameter_count()
    );
    println!("   $CYT = {:?}", loaded.dictionary.get("$CYT"));

    Ok(())
}
