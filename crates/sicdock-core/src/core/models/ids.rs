use slotmap::new_key_type;

new_key_type! {
    /// Stable handle to an atom inside a [`Fragment`](super::fragment::Fragment).
    pub struct AtomId;
    pub struct ResidueId;
    pub struct ChainId;
}
