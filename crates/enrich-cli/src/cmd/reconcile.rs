use crate::assistant::AgentAssistant;
use crate::cmd::{open_store, read_payload, read_schema, runtime, store_id, Context};
use crate::output::{print_json, print_mapping, print_table};
use anyhow::Context as _;
use enrich_core::config::Config;
use enrich_core::store::{MemoryStore, RecordStore};
use enrich_core::types::MergeOutcome;
use enrich_core::Reconciler;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

pub struct ReconcileArgs {
    pub payload: PathBuf,
    pub store: Option<String>,
    pub schema: Option<PathBuf>,
    pub dry_run: bool,
    pub batch: bool,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(ctx: &Context, args: ReconcileArgs) -> anyhow::Result<()> {
    let cfg = ctx.load_config()?;
    let store_id = store_id(&cfg, args.store.as_deref())?;
    let payload = read_payload(&args.payload)?;
    let schema = args.schema.as_deref().map(read_schema).transpose()?;
    let offline = args.dry_run && schema.is_some() && cfg.store.token().is_err();
    let engine = build_engine(&cfg, offline)?;
    let rt = runtime()?;

    if args.batch {
        let Value::Array(payloads) = payload else {
            anyhow::bail!("--batch expects a JSON array of payloads");
        };
        let results = rt.block_on(engine.reconcile_batch(&payloads, &store_id));
        return report_batch(ctx, results);
    }

    if args.dry_run {
        let plan = rt
            .block_on(engine.plan(&payload, &store_id, schema))
            .context("reconcile plan failed")?;
        if ctx.json {
            return print_json(&plan);
        }
        print_mapping(&plan.outcome.mapping);
        let target = plan.outcome.record_id.as_deref().unwrap_or("new record");
        println!(
            "\nDry run: would {} {} ({} fields to write)",
            if plan.outcome.record_id.is_some() { "update" } else { "create" },
            target,
            plan.write_set.len()
        );
        return Ok(());
    }

    let outcome = rt
        .block_on(engine.reconcile(&payload, &store_id, schema))
        .context("reconcile failed")?;
    if ctx.json {
        return print_json(&outcome);
    }
    print_mapping(&outcome.mapping);
    println!("\n{}", summary(&outcome));
    Ok(())
}

/// `offline` plans against an empty in-memory store instead of the live one.
fn build_engine(cfg: &Config, offline: bool) -> anyhow::Result<Reconciler> {
    let store: Arc<dyn RecordStore> = if offline {
        tracing::info!("no store token; planning against an empty in-memory store");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(open_store(cfg)?)
    };
    let mut engine = Reconciler::from_config(store, cfg);
    if let Some(assistant_cfg) = &cfg.assistant {
        engine = engine.with_assistant(Arc::new(AgentAssistant::from_config(assistant_cfg)?));
    }
    Ok(engine)
}

fn summary(outcome: &MergeOutcome) -> String {
    format!(
        "{} {}: {} fields populated ({} deterministic, {} semantic), {} preserved",
        outcome.action,
        outcome.record_id.as_deref().unwrap_or("-"),
        outcome.fields_populated(),
        outcome.deterministic,
        outcome.semantic,
        outcome.preserved
    )
}

// ---------------------------------------------------------------------------
// Batch reporting
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct BatchItem {
    index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<MergeOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn report_batch(
    ctx: &Context,
    results: Vec<enrich_core::Result<MergeOutcome>>,
) -> anyhow::Result<()> {
    let items: Vec<BatchItem> = results
        .into_iter()
        .enumerate()
        .map(|(index, r)| match r {
            Ok(outcome) => BatchItem {
                index,
                outcome: Some(outcome),
                error: None,
            },
            Err(e) => BatchItem {
                index,
                outcome: None,
                error: Some(e.to_string()),
            },
        })
        .collect();
    let failed = items.iter().filter(|i| i.error.is_some()).count();

    if ctx.json {
        print_json(&items)?;
    } else {
        let rows = items
            .iter()
            .map(|item| match (&item.outcome, &item.error) {
                (Some(o), _) => vec![
                    item.index.to_string(),
                    o.action.to_string(),
                    o.record_id.clone().unwrap_or_default(),
                    o.fields_populated().to_string(),
                    String::new(),
                ],
                (None, err) => vec![
                    item.index.to_string(),
                    "failed".into(),
                    String::new(),
                    String::new(),
                    err.clone().unwrap_or_default(),
                ],
            })
            .collect();
        print_table(&["#", "ACTION", "RECORD", "FIELDS", "ERROR"], rows);
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} payloads failed", items.len());
    }
    Ok(())
}
