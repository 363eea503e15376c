use uuid::Uuid;

/// Fixed namespace for deterministic aligned-node ids.
const ALIGN_NS: Uuid = Uuid::from_bytes([
    0x7a, 0x3e, 0x11, 0x51, 0x00, 0x00, 0x40, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
]);

/// Id for a node appended by reconciliation: the linear index plus a random
/// disambiguator, so rapid retries can never hand out the same id twice.
pub fn reconciled_id(linear_index: usize) -> String {
    format!(
        "turn{linear_index}_{}",
        ulid::Ulid::new().to_string().to_lowercase()
    )
}

/// Deterministic id for position `i` of an aligned chain. Same position,
/// same id, which is what makes re-alignment stable.
pub fn aligned_id(linear_index: usize) -> String {
    Uuid::new_v5(&ALIGN_NS, format!("aligned-{linear_index}").as_bytes()).to_string()
}
