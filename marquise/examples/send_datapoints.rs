//! Example demonstrating the full client flow.
//!
//! This example shows how to:
//! - Open a handle for a namespace
//! - Address a series by identifier or by explicit address
//! - Queue simple and extended datapoints
//! - Attach a source dictionary to an address

use marquise::error::Result;
use marquise::{AddressSpec, Marquise, SourceDict, hash_identifier};

fn main() -> Result<()> {
    // Spool under a scratch directory so the example runs anywhere;
    // production callers use Marquise::new() and $MARQUISE_SPOOL_DIR.
    let spool_dir = std::env::temp_dir().join("marquise_example");
    let mut handle = Marquise::with_spool_dir("mynamespace", &spool_dir)?;
    println!("{handle}");

    // Series are addressed by identifier; the address is just its hash.
    let identifier = "hostname:fe1.example.com,metric:BytesUsed,service:memory,";
    println!("address for identifier: {}", hash_identifier(identifier));

    // Queue a few numeric samples against the identifier.
    let spec = AddressSpec::BySource(identifier.to_string());
    for (offset, value) in [200000u64, 200001, 200002, 200003].iter().enumerate() {
        let accepted = handle.send_simple(&spec, Some(100 + offset as u64), *value)?;
        println!("send_simple({value}) accepted: {accepted}");
    }

    // Extended datapoints carry strings instead of words.
    handle.send_extended(&spec, None, "lorem ipsum")?;

    // Describe the series once; the daemon associates it with the address.
    let metadata = SourceDict::from_pairs([
        ("hostname", "fe1.example.com"),
        ("metric", "BytesUsed"),
        ("service", "memory"),
    ])?;
    handle.update_source(&spec, &metadata)?;
    println!("source dictionary of {} pair(s) submitted", metadata.len());

    handle.close();
    Ok(())
}
