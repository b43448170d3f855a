use persist_reader::{decode, EmptyRegistry};
use std::env;
use std::fs;
use std::process;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <path-to-snapshot-file>", args[0]);
        eprintln!("Set RUST_LOG=trace for a per-record decode trace.");
        process::exit(1);
    }
    let path = &args[1];

    println!("Reading persist snapshot: {}", path);
    println!("{}", "=".repeat(60));

    let buf = match fs::read(path) {
        Ok(buf) => buf,
        Err(e) => {
            eprintln!("ERROR: cannot read {}: {}", path, e);
            process::exit(1);
        }
    };

    // Capability keys cannot be resolved from a file alone; report them as
    // unresolved rather than guessing.
    match decode(&buf, &EmptyRegistry) {
        Ok(Some(document)) => {
            println!("SUCCESS! Decoding completed.");

            println!("\nSnapshot information:");
            println!("  Buffer size: {} bytes", buf.len());
            println!("  Objects decoded: {}", document.num_objects());
            println!("  Dicts allocated: {}", document.num_dicts());
            match document.root() {
                Some(root) => println!("  Root: {}", document.render(root)),
                None => println!("  Root: <none> (no M record)"),
            }

            println!("\nObject table:");
            for (offset, value) in document.objects() {
                println!("  #{:<6} {}", offset, document.render(value));
            }
        }
        Ok(None) => {
            eprintln!("Not a persist snapshot (magic mismatch).");
            process::exit(2);
        }
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    }
}
