use serde::{Deserialize, Serialize};


pub type BlockHeight = u64;

pub type H256 = String;

pub type Address = String;


/// 256-bit integer carried as a decimal or prefixed numeric string.
///
/// The refiner emits these as strings to avoid precision loss;
/// they are only ever interpreted when rendered for the database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Uint256(pub String);


/// One block file produced by the refiner, with transactions and logs nested within.
#[derive(Debug, Clone, Deserialize)]
pub struct Block {
    pub chain_id: u64,
    pub hash: H256,
    pub parent_hash: H256,
    pub height: BlockHeight,
    pub miner: Address,
    /// Nanoseconds since epoch.
    pub timestamp: i64,
    pub gas_limit: Uint256,
    pub gas_used: Uint256,
    pub logs_bloom: String,
    pub transactions_root: H256,
    pub receipts_root: H256,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    pub near_metadata: NearBlock,
    pub state_root: String,
    pub size: Uint256,
    /// Assigned at ingestion time, equal to `height`.
    #[serde(skip)]
    pub sequence: u64,
}


#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    pub hash: H256,
    pub block_hash: H256,
    pub block_height: BlockHeight,
    pub chain_id: u64,
    pub transaction_index: u32,
    pub from: Address,
    #[serde(default)]
    pub to: Address,
    pub nonce: Uint256,
    pub gas_price: Uint256,
    pub gas_limit: Uint256,
    pub gas_used: u64,
    pub max_priority_fee_per_gas: Uint256,
    pub max_fee_per_gas: Uint256,
    pub value: Uint256,
    #[serde(default)]
    pub input: Vec<u8>,
    #[serde(default)]
    pub output: Vec<u8>,
    #[serde(default)]
    pub access_list: Vec<AccessListEntry>,
    pub tx_type: u8,
    pub status: bool,
    #[serde(default)]
    pub logs: Vec<Log>,
    pub logs_bloom: String,
    #[serde(default)]
    pub contract_address: Address,
    pub v: u64,
    pub r: Uint256,
    pub s: Uint256,
    pub near_metadata: NearTransaction,
}


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessListEntry {
    pub address: Address,
    #[serde(rename = "storageKeys")]
    pub storage_keys: Vec<H256>,
}


#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    #[serde(rename = "Address")]
    pub address: Address,
    #[serde(rename = "Topics")]
    pub topics: Vec<Vec<u8>>,
    #[serde(default)]
    pub data: Vec<u8>,
}


/// Provenance of a block on the underlying chain.
///
/// Either a structured record describing the originating block
/// or a bare marker string with no extractable fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NearBlock {
    Existing {
        #[serde(rename = "ExistingBlock")]
        block: ExistingBlock,
    },
    Skip(String),
}


impl NearBlock {
    pub fn existing(&self) -> ExistingBlock {
        match self {
            NearBlock::Existing { block } => block.clone(),
            NearBlock::Skip(_) => ExistingBlock::default(),
        }
    }
}


#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExistingBlock {
    pub near_hash: String,
    pub near_parent_hash: String,
    pub author: String,
}


#[derive(Debug, Clone, Default, Deserialize)]
pub struct NearTransaction {
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub receipt_hash: String,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_structured_provenance() {
        let near: NearBlock = serde_json::from_str(
            r#"{"ExistingBlock": {
                "near_hash": "6gCQ9VSkBprHHZzoxXZ5N9TLGWA5qnvESGdebeGGJkiV",
                "near_parent_hash": "8nkqY9BuzMwLjvPuuzbtAc2QbwTxMAuhfkqNz3G5dSPH",
                "author": "aurora.pool.near"
            }}"#,
        )
        .unwrap();

        let existing = near.existing();
        assert_eq!(existing.author, "aurora.pool.near");
        assert_eq!(
            existing.near_hash,
            "6gCQ9VSkBprHHZzoxXZ5N9TLGWA5qnvESGdebeGGJkiV"
        );
    }

    #[test]
    fn decode_marker_provenance() {
        let near: NearBlock = serde_json::from_str(r#""SkipBlock""#).unwrap();
        let existing = near.existing();
        assert_eq!(existing.near_hash, "");
        assert_eq!(existing.near_parent_hash, "");
        assert_eq!(existing.author, "");
    }

    #[test]
    fn reject_unknown_provenance_shape() {
        assert!(serde_json::from_str::<NearBlock>("42").is_err());
        assert!(serde_json::from_str::<NearBlock>(r#"["SkipBlock"]"#).is_err());
    }

    #[test]
    fn access_list_round_trips_source_field_names() {
        let entry: AccessListEntry = serde_json::from_str(
            r#"{"address": "0x0wner", "storageKeys": ["0x01"]}"#,
        )
        .unwrap();
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("storageKeys").is_some());
    }
}
