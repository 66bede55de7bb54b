//!
//! bridgebook CLI binary
//! ----------------------
//! Administrative commands against a local data root: create the listing root,
//! create folders and documents, print the listing, and run bulk provisioning
//! from a list document. Results are printed as JSON.

use std::env;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use serde_json::json;

use bridgebook::config::ServiceConfig;
use bridgebook::folder_index::FolderIndex;
use bridgebook::host::DocumentHost;
use bridgebook::provision::{BulkProvisioner, ListRun};
use bridgebook::server::RequestRouter;
use bridgebook::storage::{DocumentKind, SharedStore};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [options] init-root <name>\n  {program} [options] mkdir <parent-folder-id> <name>\n  {program} [options] create-doc <folder-id> <name>\n  {program} [options] list\n  {program} [options] provision <list-document-id>\n\nOptions are the server's (--config, --data-root, --root-folder, --variant, ...).\n\nExamples:\n  {program} --data-root data init-root 点検データ\n  {program} --root-folder <id> provision <list-document-id>"
    );
}

/// Arguments that are not `--flag value` pairs.
fn positional(args: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    let mut i = 1;
    while i < args.len() {
        if args[i].starts_with("--") { i += 2; continue; }
        out.push(args[i].clone());
        i += 1;
    }
    out
}

fn print_json(v: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(v)?);
    Ok(())
}

fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().cloned().unwrap_or_else(|| "bridgebook_cli".to_string());
    let pos = positional(&args);
    let Some(command) = pos.first() else {
        print_usage(&program);
        return Err(anyhow!("missing command"));
    };

    let cfg = ServiceConfig::from_sources(&args).context("While loading configuration")?;
    let validated = cfg.validate().context("Invalid configuration")?;
    let store = SharedStore::new(&validated.data_root)
        .with_context(|| format!("While opening data root: {}", validated.data_root.display()))?;

    let arg = |i: usize, what: &str| -> Result<String> {
        pos.get(i).cloned().ok_or_else(|| anyhow!("{}: missing <{}>", command, what))
    };

    match command.as_str() {
        "init-root" => {
            let name = arg(1, "name")?;
            let root = store.create_root_folder(&name)?;
            print_json(&json!({ "id": root.id, "name": root.name }))
        }
        "mkdir" => {
            let (parent, name) = (arg(1, "parent-folder-id")?, arg(2, "name")?);
            let id = FolderIndex::new(&store).resolve_subfolder(&parent, &name)?;
            print_json(&json!({ "id": id, "name": name, "parent": parent }))
        }
        "create-doc" => {
            let (folder, name) = (arg(1, "folder-id")?, arg(2, "name")?);
            let doc = store.create_document(&name, DocumentKind::Spreadsheet)?;
            store.move_document(&doc.id, &folder)?;
            print_json(&json!({ "id": doc.id, "name": doc.name, "url": validated.document_url(&doc.id) }))
        }
        "list" => {
            let router = RequestRouter::new(store.clone(), Arc::new(validated.clone()));
            let (_status, body) = router.list_response();
            print_json(&body)
        }
        "provision" => {
            let list_id = arg(1, "list-document-id")?;
            let root = validated.root_folder()?;
            let provisioner = BulkProvisioner::new(&store, root, validated.schema_variant, &validated.provision_sheet_name);
            match provisioner.run_list_document(&list_id)? {
                ListRun::Prepared => print_json(&json!({
                    "status": "prepared",
                    "message": "list sheet created; enter bridge names in column A and run again"
                })),
                ListRun::NoData => print_json(&json!({ "status": "no_data" })),
                ListRun::Completed(report) => {
                    let results: Vec<String> = report.outcomes.iter().map(|o| o.to_string()).collect();
                    print_json(&json!({
                        "status": "completed",
                        "created": report.created,
                        "skipped": report.skipped,
                        "failed": report.failed,
                        "results": results,
                    }))
                }
            }
        }
        other => {
            print_usage(&program);
            Err(anyhow!("unknown command: {}", other))
        }
    }
}
