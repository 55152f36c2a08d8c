use anyhow::Result;
use geobin::LookupResult;

use super::OpenOptions;

pub fn cmd_query(options: OpenOptions, addresses: Vec<String>, quiet: bool) -> Result<()> {
    let db = options.open()?;

    let results: Vec<LookupResult> = addresses.iter().map(|a| db.query(a)).collect();
    let all_found = results.iter().all(LookupResult::is_ok);

    if quiet {
        // Quiet mode: no output, just exit code
        std::process::exit(if all_found { 0 } else { 1 });
    }

    // Always an array, one element per address in argument order
    println!("{}", serde_json::to_string_pretty(&results)?);

    std::process::exit(if all_found { 0 } else { 1 });
}
