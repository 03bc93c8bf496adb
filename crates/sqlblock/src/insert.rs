use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};

use crate::codec;
use crate::model::{Block, Transaction};


const BLOCK_COLUMNS: &[&str] = &[
    "chain",
    "height",
    "hash",
    "parent_hash",
    "miner",
    "timestamp",
    "size",
    "gas_limit",
    "gas_used",
    "transactions_root",
    "state_root",
    "receipts_root",
    "logs_bloom",
    "near_hash",
    "author",
    "sequence",
];

const TRANSACTION_COLUMNS: &[&str] = &[
    "hash",
    "block_height",
    "block_hash",
    "index",
    "from",
    "to",
    "nonce",
    "gas_price",
    "gas_limit",
    "gas_used",
    "value",
    "input",
    "output",
    "v",
    "r",
    "s",
    "status",
    "logs_bloom",
    "access_list",
    "max_fee_per_gas",
    "max_priority_fee_per_gas",
    "type",
    "contract_address",
    "near_hash",
    "near_receipt_hash",
];

const EVENT_COLUMNS: &[&str] = &[
    "transaction",
    "index",
    "data",
    "from",
    "topics",
    "block",
    "block_hash",
    "transaction_index",
    "transaction_hash",
];

// Columns refreshed when a replayed event hits the (transaction, index) key.
const EVENT_UPDATE_COLUMNS: &[&str] = &[
    "data",
    "from",
    "topics",
    "block",
    "block_hash",
    "transaction_index",
    "transaction_hash",
];


/// Builds the single statement that persists a block, its transactions
/// and their logs atomically.
///
/// The statement is a chain of data-modifying CTEs:
/// the block insert is a no-op on conflict, each transaction upsert
/// returns the resolved row id (newly assigned or already present),
/// and the final event insert derives its rows from those ids.
/// Replaying the same block is a silent no-op; a transaction row is
/// only rewritten when its status is promoted from false to true.
pub fn insert_statement(block: &Block) -> anyhow::Result<QueryBuilder<'static, Postgres>> {
    let mut qb = QueryBuilder::new("WITH \"b\" AS (INSERT INTO \"block\" (");
    push_columns(&mut qb, BLOCK_COLUMNS);
    qb.push(") VALUES (");
    push_block_values(&mut qb, block)?;
    qb.push(") ON CONFLICT DO NOTHING)");

    for (index, transaction) in block.transactions.iter().enumerate() {
        push_transaction(&mut qb, index, transaction)?;
    }

    push_events(&mut qb, block)?;
    Ok(qb)
}


fn push_columns(qb: &mut QueryBuilder<'static, Postgres>, columns: &[&str]) {
    let mut list = qb.separated(", ");
    for column in columns {
        list.push(format!("\"{column}\""));
    }
}


fn push_block_values(qb: &mut QueryBuilder<'static, Postgres>, block: &Block) -> anyhow::Result<()> {
    let existing = block.near_metadata.existing();

    let mut row = qb.separated(", ");
    row.push_bind(block.chain_id as i64);
    row.push_bind(block.height as i64);
    row.push_bind(codec::hex_bytes(&block.hash)?);
    row.push_bind(codec::hex_bytes(&block.parent_hash)?);
    row.push_bind(codec::hex_bytes(&block.miner)?);
    row.push_bind(codec::timestamp_secs(block.timestamp));
    row.push_bind(block.size.to_decimal());
    row.push_unseparated("::numeric");
    row.push_bind(block.gas_limit.to_decimal());
    row.push_unseparated("::numeric");
    row.push_bind(block.gas_used.to_decimal());
    row.push_unseparated("::numeric");
    row.push_bind(codec::hex_bytes(&block.transactions_root)?);
    row.push_bind(codec::hex_bytes(&block.state_root)?);
    row.push_bind(codec::hex_bytes(&block.receipts_root)?);
    row.push_bind(codec::hex_bytes(&block.logs_bloom)?);
    row.push_bind(codec::base58_bytes(&existing.near_hash));
    row.push_bind(existing.author);
    row.push_bind(block.sequence as i64);
    Ok(())
}


fn push_transaction(
    qb: &mut QueryBuilder<'static, Postgres>,
    index: usize,
    transaction: &Transaction,
) -> anyhow::Result<()> {
    qb.push(format!(", \"tx{index}\" AS (INSERT INTO \"transaction\" AS \"t\" ("));
    push_columns(qb, TRANSACTION_COLUMNS);
    qb.push(") VALUES (");

    let receipt_hash = codec::base58_bytes(&transaction.near_metadata.receipt_hash);

    let mut row = qb.separated(", ");
    row.push_bind(codec::hex_bytes(&transaction.hash)?);
    row.push_bind(transaction.block_height as i64);
    row.push_bind(codec::hex_bytes(&transaction.block_hash)?);
    row.push_bind(transaction.transaction_index as i32);
    row.push_bind(codec::hex_bytes(&transaction.from)?);
    row.push_bind(codec::hex_bytes(&transaction.to)?);
    row.push_bind(transaction.nonce.to_decimal());
    row.push_unseparated("::numeric");
    row.push_bind(transaction.gas_price.to_decimal());
    row.push_unseparated("::numeric");
    row.push_bind(transaction.gas_limit.to_decimal());
    row.push_unseparated("::numeric");
    row.push_bind(transaction.gas_used as i64);
    row.push_bind(transaction.value.to_decimal());
    row.push_unseparated("::numeric");
    row.push_bind(codec::bytes_opt(&transaction.input));
    row.push_bind(codec::bytes_opt(&transaction.output));
    row.push_bind(transaction.v as i64);
    row.push_bind(transaction.r.to_decimal());
    row.push_unseparated("::numeric");
    row.push_bind(transaction.s.to_decimal());
    row.push_unseparated("::numeric");
    row.push_bind(transaction.status);
    row.push_bind(codec::hex_bytes(&transaction.logs_bloom)?);
    row.push_bind(Json(transaction.access_list.clone()));
    row.push_bind(transaction.max_fee_per_gas.to_decimal());
    row.push_unseparated("::numeric");
    row.push_bind(transaction.max_priority_fee_per_gas.to_decimal());
    row.push_unseparated("::numeric");
    row.push_bind(transaction.tx_type as i16);
    row.push_bind(codec::hex_bytes(&transaction.contract_address)?);
    row.push_bind(receipt_hash.clone());
    row.push_bind(receipt_hash);
    drop(row);

    qb.push(") ON CONFLICT (\"hash\") DO UPDATE SET ");
    let mut updates = qb.separated(", ");
    for column in TRANSACTION_COLUMNS {
        updates.push(format!("\"{column}\" = EXCLUDED.\"{column}\""));
    }
    qb.push(
        " WHERE \"t\".\"status\" = false AND EXCLUDED.\"status\" = true RETURNING \"id\")",
    );
    Ok(())
}


fn push_events(qb: &mut QueryBuilder<'static, Postgres>, block: &Block) -> anyhow::Result<()> {
    let mut first = true;

    for (index, transaction) in block.transactions.iter().enumerate() {
        for (event_index, log) in transaction.logs.iter().enumerate() {
            if first {
                qb.push(" INSERT INTO \"event\" (");
                push_columns(qb, EVENT_COLUMNS);
                qb.push(") ");
                first = false;
            } else {
                qb.push(" UNION ALL ");
            }

            qb.push(format!("SELECT \"tx{index}\".\"id\", "));
            let mut row = qb.separated(", ");
            row.push_bind(event_index as i32);
            row.push_bind(codec::bytes_opt(&log.data));
            row.push_bind(codec::hex_bytes(&log.address)?);
            row.push_bind(log.topics.clone());
            row.push_bind(block.height as i64);
            row.push_bind(codec::hex_bytes(&block.hash)?);
            row.push_bind(transaction.transaction_index as i32);
            row.push_bind(codec::hex_bytes(&transaction.hash)?);
            drop(row);
            qb.push(format!(" FROM \"tx{index}\""));
        }
    }

    if first {
        // A block without logs still has to read as one valid statement.
        qb.push(" SELECT 1");
    } else {
        qb.push(" ON CONFLICT (\"transaction\", \"index\") DO UPDATE SET ");
        let mut updates = qb.separated(", ");
        for column in EVENT_UPDATE_COLUMNS {
            updates.push(format!("\"{column}\" = EXCLUDED.\"{column}\""));
        }
    }
    Ok(())
}
