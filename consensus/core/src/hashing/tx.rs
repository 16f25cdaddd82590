use super::HasherExtensions;
use crate::tx::{Transaction, TransactionId, TransactionInput, TransactionOutpoint, TransactionOutput};
use stake_hashes::{Hash, HasherBase};

/// Returns the transaction hash, committing to all fields including signature scripts.
/// Note that this is different than the transaction ID.
pub fn hash(tx: &Transaction) -> Hash {
    let mut hasher = stake_hashes::TransactionHash::new();
    write_transaction(&mut hasher, tx, true);
    hasher.finalize()
}

/// Not intended for direct use by clients. Instead use `tx.id()`
pub fn id(tx: &Transaction) -> TransactionId {
    let mut hasher = stake_hashes::TransactionId::new();
    write_transaction(&mut hasher, tx, false);
    hasher.finalize()
}

fn write_transaction<T: HasherBase>(hasher: &mut T, tx: &Transaction, include_signature_scripts: bool) {
    hasher.update(tx.version.to_le_bytes()).write_len(tx.inputs.len());
    for input in tx.inputs.iter() {
        write_input(hasher, input, include_signature_scripts);
    }

    hasher.write_len(tx.outputs.len());
    for output in tx.outputs.iter() {
        write_output(hasher, output);
    }

    hasher.update(tx.lock_time.to_le_bytes());
}

#[inline(always)]
fn write_input<T: HasherBase>(hasher: &mut T, input: &TransactionInput, include_signature_script: bool) {
    write_outpoint(hasher, &input.previous_outpoint);
    if include_signature_script {
        hasher.write_var_bytes(&input.signature_script);
    } else {
        hasher.write_var_bytes(&[]);
    }
    hasher.update(input.sequence.to_le_bytes());
}

#[inline(always)]
fn write_outpoint<T: HasherBase>(hasher: &mut T, outpoint: &TransactionOutpoint) {
    hasher.update(outpoint.transaction_id).update(outpoint.index.to_le_bytes());
}

#[inline(always)]
fn write_output<T: HasherBase>(hasher: &mut T, output: &TransactionOutput) {
    hasher.update(output.value.to_le_bytes()).write_var_bytes(&output.script_public_key);
}
