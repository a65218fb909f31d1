//! Ordered schema migrations for the ledger document.
//!
//! The stored document carries the version of the last migration applied to
//! it. On first read every migration with a greater version runs, in order,
//! exactly once. Documents written before versioning used the key
//! `migration`; it is accepted as the stored version.

use serde_json::{Map, Value};
use tracing::info;
use walletops_types::{LedgerDocument, WEI_PER_GWEI};

use crate::error::{LedgerError, Result};

/// Version every freshly created document is stamped with.
pub const LATEST_VERSION: u32 = 3;

type MigrationFn = fn(Value) -> std::result::Result<Value, String>;

/// A single forward step between two schema versions.
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    apply: MigrationFn,
}

/// All migrations, ascending by version.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_tables",
        apply: initial_tables,
    },
    Migration {
        version: 2,
        name: "tx_hash_to_desc",
        apply: tx_hash_to_desc,
    },
    Migration {
        version: 3,
        name: "ledger_schema_v3",
        apply: ledger_schema_v3,
    },
];

/// Read the schema version a stored document claims.
pub fn stored_version(document: &Value) -> u32 {
    document
        .get("migrationVersion")
        .or_else(|| document.get("migration"))
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0)
}

/// Bring a stored document up to [`LATEST_VERSION`].
///
/// Returns the typed document and the versions that were applied. An empty
/// list means the document was already current.
pub fn migrate(document: Value) -> Result<(LedgerDocument, Vec<u32>)> {
    let found = stored_version(&document);
    if found > LATEST_VERSION {
        return Err(LedgerError::UnsupportedVersion {
            found,
            supported: LATEST_VERSION,
        });
    }

    let mut current = document;
    let mut applied = Vec::new();
    for migration in MIGRATIONS.iter().filter(|m| m.version > found) {
        info!(
            version = migration.version,
            name = migration.name,
            "applying ledger migration"
        );
        current = (migration.apply)(current).map_err(|reason| LedgerError::Migration {
            version: migration.version,
            reason,
        })?;
        applied.push(migration.version);
    }

    let doc: LedgerDocument = serde_json::from_value(current)?;
    Ok((doc, applied))
}

fn as_object(document: &mut Value) -> std::result::Result<&mut Map<String, Value>, String> {
    document
        .as_object_mut()
        .ok_or_else(|| "ledger document is not a JSON object".to_string())
}

fn rename(object: &mut Map<String, Value>, from: &str, to: &str) {
    if let Some(value) = object.remove(from) {
        object.entry(to.to_string()).or_insert(value);
    }
}

fn rows<'a>(
    object: &'a mut Map<String, Value>,
    table: &str,
) -> std::result::Result<Vec<&'a mut Map<String, Value>>, String> {
    match object.get_mut(table) {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter_mut()
            .map(|item| {
                item.as_object_mut()
                    .ok_or_else(|| format!("row in '{}' is not an object", table))
            })
            .collect(),
        Some(_) => Err(format!("table '{}' is not an array", table)),
    }
}

/// Creates the tables and the credential cipher slot.
fn initial_tables(mut document: Value) -> std::result::Result<Value, String> {
    let object = as_object(&mut document)?;
    object
        .entry("auth".to_string())
        .or_insert_with(|| Value::String(String::new()));
    for table in ["wallets", "networks", "calls", "txs"] {
        object
            .entry(table.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
    }
    object.insert("migration".to_string(), Value::from(1));
    Ok(document)
}

/// Transactions used to carry a `hash` column; it became a free-form `desc`.
fn tx_hash_to_desc(mut document: Value) -> std::result::Result<Value, String> {
    let object = as_object(&mut document)?;
    for tx in rows(object, "txs")? {
        rename(tx, "hash", "desc");
    }
    object.insert("migration".to_string(), Value::from(2));
    Ok(document)
}

/// Moves the legacy document onto the typed shape: camelCase keys, named
/// roles and outcomes, RFC 3339 timestamps and gas in wei.
fn ledger_schema_v3(mut document: Value) -> std::result::Result<Value, String> {
    let object = as_object(&mut document)?;
    object.remove("migration");
    rename(object, "auth", "authCipher");
    rename(object, "wallets", "accounts");

    for account in rows(object, "accounts")? {
        rename(account, "pk", "encryptedKey");
        if matches!(account.get("encryptedKey"), Some(Value::Null)) {
            account.remove("encryptedKey");
        }
        if let Some(role) = account.get("role").and_then(Value::as_u64) {
            let name = match role {
                0 => "unused",
                1 => "funding",
                2 => "transaction",
                other => return Err(format!("unknown account role {}", other)),
            };
            account.insert("role".to_string(), Value::from(name));
        }
    }

    for network in rows(object, "networks")? {
        rename(network, "rpc", "endpoint");
        match network.remove("gas") {
            Some(Value::Number(gwei)) => {
                let gwei = gwei
                    .as_u64()
                    .ok_or_else(|| format!("gas value {} is not a whole gwei amount", gwei))?;
                if gwei > 0 {
                    let wei = u128::from(gwei) * WEI_PER_GWEI;
                    network.insert("gasOverride".to_string(), Value::from(wei.to_string()));
                }
            }
            Some(Value::Null) | None => {}
            Some(other) => return Err(format!("unexpected gas value {}", other)),
        }
        if matches!(network.get("chainId"), Some(Value::Null)) {
            network.remove("chainId");
        }
    }

    for call in rows(object, "calls")? {
        rename(call, "op", "operationName");
        rename(call, "desc", "description");
        rename(call, "args", "rawArgs");
        convert_timestamp(call, "timestamp", "createdAt")?;
        for key in ["networkId", "description", "rawArgs"] {
            if matches!(call.get(key), Some(Value::Null)) {
                call.remove(key);
            }
        }
    }

    for tx in rows(object, "txs")? {
        rename(tx, "walletId", "accountId");
        rename(tx, "desc", "detail");
        if matches!(tx.get("detail"), Some(Value::Null)) {
            tx.remove("detail");
        }
        match tx.remove("status") {
            Some(Value::Number(status)) => {
                let outcome = match status.as_u64() {
                    Some(0) => "success",
                    Some(1) => "error",
                    _ => return Err(format!("unknown tx status {}", status)),
                };
                tx.insert("outcome".to_string(), Value::from(outcome));
            }
            Some(other) => {
                tx.insert("outcome".to_string(), other);
            }
            None => {}
        }
        convert_timestamp(tx, "timestamp", "recordedAt")?;
    }

    object.insert("migrationVersion".to_string(), Value::from(LATEST_VERSION));
    Ok(document)
}

fn convert_timestamp(
    row: &mut Map<String, Value>,
    from: &str,
    to: &str,
) -> std::result::Result<(), String> {
    match row.remove(from) {
        Some(Value::Number(ms)) => {
            let ms = ms
                .as_i64()
                .ok_or_else(|| format!("timestamp {} is out of range", ms))?;
            let at = chrono::DateTime::from_timestamp_millis(ms)
                .ok_or_else(|| format!("timestamp {} is out of range", ms))?;
            row.insert(to.to_string(), Value::from(at.to_rfc3339()));
        }
        Some(other) => {
            row.insert(to.to_string(), other);
        }
        None => {}
    }
    Ok(())
}
