//! Run the record picker standalone over a compressed CSV.
//!
//! Prints the exact byte stream the bulk-copy channel would receive:
//! projected columns only, caller order, CRLF line endings, sentinel rows
//! dropped. Useful for eyeballing what a loader configuration will stage
//! before pointing it at a database.
//!
//! Run with: `cargo run --example picker_stream -- data.csv.gz url stat_name`

use anyhow::Result;
use granary::io::compression::open_source;
use granary::picker::RecordPicker;

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        anyhow::bail!("usage: picker_stream <file.csv[.gz]> <column>...");
    };
    let fields: Vec<String> = args.collect();
    if fields.is_empty() {
        anyhow::bail!("at least one column to project is required");
    }

    let source = open_source(&path)?;
    let mut picker = RecordPicker::new(source, &fields, None)?;

    let mut rows = 0u64;
    while let Some(line) = picker.next_chunk()? {
        print!("{line}");
        rows += 1;
    }
    eprintln!("-- {rows} row(s), {} field(s) each", picker.width());
    Ok(())
}
