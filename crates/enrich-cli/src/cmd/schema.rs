use crate::cmd::{open_store, runtime, store_id, Context};
use crate::output::{print_json, print_table};
use anyhow::Context as _;
use enrich_core::store::RecordStore;

/// Fetch the live schema directly, without the identity-only fallback, so a
/// broken store is reported instead of hidden.
pub fn run(ctx: &Context, store: Option<&str>) -> anyhow::Result<()> {
    let cfg = ctx.load_config()?;
    let store_id = store_id(&cfg, store)?;
    let store = open_store(&cfg)?;

    let schema = runtime()?
        .block_on(store.fetch_schema(&store_id))
        .with_context(|| format!("failed to fetch schema for '{store_id}'"))?;

    if ctx.json {
        return print_json(&schema.to_json());
    }

    let title = schema.title_field().to_string();
    let rows = schema
        .fields()
        .map(|(name, ty)| {
            let marker = if name == title { "*" } else { "" };
            vec![format!("{name}{marker}"), ty.to_string()]
        })
        .collect();
    print_table(&["FIELD", "TYPE"], rows);
    println!("\n* title field");
    Ok(())
}
