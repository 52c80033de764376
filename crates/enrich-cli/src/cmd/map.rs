use crate::cmd::{read_payload, read_schema, Context};
use crate::output::{print_json, print_mapping};
use enrich_core::mapper::map_deterministic;
use enrich_core::payload::{detect_sources, key_count, normalize};
use std::path::Path;

/// Offline deterministic mapping: no store, no assistant.
pub fn run(ctx: &Context, payload: &Path, schema: &Path) -> anyhow::Result<()> {
    let cfg = ctx.load_config()?;
    let schema = read_schema(schema)?;
    let payload = normalize(read_payload(payload)?);

    let result = map_deterministic(
        &payload,
        &schema,
        &cfg.alias_table(),
        &cfg.engine.limits(),
    );

    if ctx.json {
        return print_json(&result);
    }

    print_mapping(&result.mapping);
    let sources: Vec<String> = detect_sources(&payload)
        .iter()
        .map(ToString::to_string)
        .collect();
    if !sources.is_empty() {
        println!("\nSources: {}", sources.join(", "));
    }
    let leftover = key_count(&result.residual);
    if leftover > 0 {
        println!("\nUnmapped ({leftover} keys):");
        println!("{}", serde_json::to_string_pretty(&result.residual)?);
    }
    Ok(())
}
