//! Transaction submission: fixed-point scaling and the shared envelope sender

mod scale;
mod sender;

pub use scale::FixedPointBase;
pub use sender::{ContractCall, SubmittedTransaction, TransactionSender};

#[cfg(test)]
pub(crate) use sender::tests::mined_receipt;
