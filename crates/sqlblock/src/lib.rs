mod codec;
mod insert;
mod model;

pub use insert::insert_statement;
pub use model::{
    AccessListEntry, Address, Block, BlockHeight, ExistingBlock, Log, NearBlock, NearTransaction,
    Transaction, Uint256, H256,
};
