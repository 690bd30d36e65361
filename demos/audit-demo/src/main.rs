//! Audit demo
//!
//! Shows:
//! 1. A client anchors on a log and follows it as it grows
//! 2. Inclusion of a single entry is proven
//! 3. A server that rewrites an entry is caught by the audit replay
//! 4. Map values are fetched with proofs against a logged map root
//! 5. A redacted document still hashes to its logged value
//! 6. The whole map is rebuilt from its mutation log and checked

mod config;

use anyhow::{bail, Context, Result};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vds::{
    redactable, InMemoryLog, InMemoryMap, LogAnchor, LogSource, MapAuditor, MapSource, ObjectHasher, VdsError,
    VerifiableEntry, VerifiableLog, VerifiableMap,
};

use crate::config::DemoConfig;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = DemoConfig::from_env()?;
    info!(?cfg, "starting audit demo");

    println!("Verifiable Data Structures - audit demo\n");

    // 1. Anchor and follow a log
    println!("Step 1: anchor on a log of {} entries", cfg.log_entries);
    let mut log = InMemoryLog::new();
    for i in 0..cfg.log_entries {
        log.append(VerifiableEntry::RawData(format!("entry{}", i + 1).into_bytes()))?;
    }

    let mut anchor = LogAnchor::default();
    let first = anchor.advance(&VerifiableLog::new(&log))?;
    println!("   anchored at size {} root {}", first.tree_size, short_root(first.root_hash));

    log.append(VerifiableEntry::Json(json!({"event": "appended later"})))?;
    let second = anchor
        .advance(&VerifiableLog::new(&log))
        .context("log grew but consistency proof failed")?;
    println!("   advanced to size {} after consistency check\n", second.tree_size);

    // 2. Prove one entry is in the log
    println!("Step 2: inclusion of entry1");
    let vlog = VerifiableLog::new(&log);
    vlog.verify_inclusion(&second, &VerifiableEntry::RawData(b"entry1".to_vec()))?;
    println!("   entry1 is in the log at size {}\n", second.tree_size);

    // 3. A server rewriting history is caught by replay
    println!("Step 3: server rewrites an entry");
    let mut evil = log.clone();
    evil.tamper_entry(0, VerifiableEntry::RawData(b"forged".to_vec()))?;
    match VerifiableLog::new(&evil).verify_entries(None, &second, |_, _| Ok(())) {
        Err(VdsError::VerificationFailed) => println!("   tampering detected during replay\n"),
        Err(e) => bail!("unexpected failure during replay: {e}"),
        Ok(()) => bail!("tampered log passed replay"),
    }

    // 4. Map values with proofs
    println!("Step 4: map with {} keys", cfg.map_keys);
    let mut map = InMemoryMap::new();
    for i in 0..cfg.map_keys {
        let doc = redactable(&json!({"user": format!("user{i}"), "email": format!("user{i}@example.com")}));
        map.set(format!("user{i}").as_bytes(), VerifiableEntry::Json(doc))?;
    }
    map.delete(b"nobody")?;

    let vmap = VerifiableMap::new(&map);
    let Some(state) = vmap.verified_latest_map_state(None)? else {
        bail!("map has no mutations");
    };
    println!(
        "   map state at size {} bound to tree head log size {}",
        state.tree_size(),
        state.tree_head_log_head.tree_size
    );

    let value = vmap.verified_get(b"user0", &state)?;
    println!("   user0 -> {}\n", String::from_utf8_lossy(&value.data()?));

    // 5. Redaction keeps the hash
    println!("Step 5: redact a member with prefix {:?}", cfg.redaction_prefix);
    let hasher = ObjectHasher::with_prefix(cfg.redaction_prefix.clone());
    if let VerifiableEntry::Json(doc) = &value {
        let redacted = hasher.redact(doc, "email")?;
        if hasher.hash(&redacted)? != hasher.hash(doc)? {
            bail!("redaction changed the object hash");
        }
        println!("   redacted view: {}", hasher.shed_redacted(&redacted)?);
        println!("   object hash unchanged\n");
    }

    // 6. Rebuild the map and check every logged root
    println!("Step 6: full map audit");
    let mut changed = 0u64;
    let mut auditor = MapAuditor::new().with_callback(|_, _| {
        changed += 1;
        Ok(())
    });
    vmap.verify_map(None, &state, &mut auditor)?;
    let root = auditor.root();
    drop(auditor);
    println!(
        "   {} mutations replayed, {} changed the map, root {}",
        map.mutation_log().tree_head(0)?.tree_size,
        changed,
        hex::encode(&root[..8])
    );

    println!("\nAll checks passed.");
    Ok(())
}

fn short_root(root: Option<vds::Hash32>) -> String {
    root.map(|r| hex::encode(&r[..8])).unwrap_or_else(|| "-".to_string())
}
