use super::atom::Atom;
use super::chain::{Chain, ChainType};
use super::ids::{AtomId, ChainId, ResidueId};
use super::residue::Residue;
use crate::core::geometry::Xform;
use nalgebra::Point3;
use slotmap::SlotMap;
use std::collections::HashMap;

/// One rigid body of a docking problem.
///
/// Storage mirrors a full molecular system (slot maps keyed by stable ids plus
/// lookup maps) but a fragment carries no force-field state: scores only need
/// coordinates, residue membership, named atoms and chain order. Residues keep
/// a global sequential order, which is the order they were added in.
#[derive(Debug, Clone, Default)]
pub struct Fragment {
    /// Primary storage for atoms.
    atoms: SlotMap<AtomId, Atom>,
    /// Primary storage for residues.
    residues: SlotMap<ResidueId, Residue>,
    /// Primary storage for chains.
    chains: SlotMap<ChainId, Chain>,
    /// Residues in sequential (insertion) order across all chains.
    residue_order: Vec<ResidueId>,
    /// Chains in insertion order.
    chain_order: Vec<ChainId>,
    /// Lookup map for finding residues by chain ID and residue number.
    residue_id_map: HashMap<(ChainId, isize), ResidueId>,
    /// Lookup map for finding chains by their single-character identifier.
    chain_id_map: HashMap<char, ChainId>,
}

impl Fragment {
    /// Creates a new, empty fragment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieves an atom by its ID.
    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    /// Returns the local-frame position of an atom, if it exists.
    pub fn atom_position(&self, id: AtomId) -> Option<Point3<f64>> {
        self.atoms.get(id).map(|atom| atom.position)
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Retrieves a residue by its ID.
    pub fn residue(&self, id: ResidueId) -> Option<&Residue> {
        self.residues.get(id)
    }

    /// Number of residues in the fragment.
    pub fn residue_count(&self) -> usize {
        self.residue_order.len()
    }

    /// Returns the residue at a zero-based sequential position.
    ///
    /// # Return
    ///
    /// Returns `Some((ResidueId, &Residue))` if `index < residue_count()`, otherwise `None`.
    pub fn residue_at(&self, index: usize) -> Option<(ResidueId, &Residue)> {
        let id = *self.residue_order.get(index)?;
        self.residues.get(id).map(|residue| (id, residue))
    }

    /// Returns an iterator over all residues in sequential order.
    pub fn residues_iter(&self) -> impl Iterator<Item = (ResidueId, &Residue)> {
        self.residue_order
            .iter()
            .filter_map(|&id| self.residues.get(id).map(|residue| (id, residue)))
    }

    /// Retrieves a chain by its ID.
    pub fn chain(&self, id: ChainId) -> Option<&Chain> {
        self.chains.get(id)
    }

    /// Returns an iterator over all chains in insertion order.
    pub fn chains_iter(&self) -> impl Iterator<Item = (ChainId, &Chain)> {
        self.chain_order
            .iter()
            .filter_map(|&id| self.chains.get(id).map(|chain| (id, chain)))
    }

    /// Finds a chain ID by its single-character identifier.
    pub fn find_chain_by_id(&self, id: char) -> Option<ChainId> {
        self.chain_id_map.get(&id).copied()
    }

    /// Finds a residue ID by its chain ID and residue number.
    pub fn find_residue_by_id(
        &self,
        chain_id: ChainId,
        residue_number: isize,
    ) -> Option<ResidueId> {
        self.residue_id_map
            .get(&(chain_id, residue_number))
            .copied()
    }

    /// Finds an atom by chain identifier, residue number and atom name.
    pub fn find_atom(&self, chain: char, residue_number: isize, atom_name: &str) -> Option<AtomId> {
        let chain_id = self.find_chain_by_id(chain)?;
        let residue_id = self.find_residue_by_id(chain_id, residue_number)?;
        self.residues.get(residue_id)?.get_atom_id_by_name(atom_name)
    }

    /// Position of a named atom within a residue.
    pub fn named_atom_position(&self, residue_id: ResidueId, atom_name: &str) -> Option<Point3<f64>> {
        let atom_id = self.residues.get(residue_id)?.get_atom_id_by_name(atom_name)?;
        self.atom_position(atom_id)
    }

    /// Adds a new chain or returns the existing one with the same identifier.
    pub fn add_chain(&mut self, id: char, chain_type: ChainType) -> ChainId {
        *self.chain_id_map.entry(id).or_insert_with(|| {
            let chain_id = self.chains.insert(Chain::new(id, chain_type));
            self.chain_order.push(chain_id);
            chain_id
        })
    }

    /// Adds a new residue to a chain or returns the existing one.
    ///
    /// # Return
    ///
    /// Returns `None` if the chain doesn't exist.
    pub fn add_residue(
        &mut self,
        chain_id: ChainId,
        residue_number: isize,
        name: &str,
    ) -> Option<ResidueId> {
        let chain = self.chains.get_mut(chain_id)?;
        let key = (chain_id, residue_number);

        if let Some(&existing) = self.residue_id_map.get(&key) {
            return Some(existing);
        }

        let residue_id = self
            .residues
            .insert(Residue::new(residue_number, name, chain_id));
        self.residue_id_map.insert(key, residue_id);
        self.residue_order.push(residue_id);
        chain.residues.push(residue_id);

        Some(residue_id)
    }

    /// Adds an atom to a specific residue.
    ///
    /// # Return
    ///
    /// Returns `None` if the residue doesn't exist.
    pub fn add_atom_to_residue(&mut self, residue_id: ResidueId, atom: Atom) -> Option<AtomId> {
        if !self.residues.contains_key(residue_id) {
            return None;
        }

        let name = atom.name.clone();
        let atom_id = self.atoms.insert(atom);
        self.residues.get_mut(residue_id)?.add_atom(&name, atom_id);

        Some(atom_id)
    }

    /// Returns a copy of the fragment with every coordinate moved by `xform`.
    ///
    /// Ids are preserved, so atom handles taken from `self` stay valid on the copy.
    pub fn transformed(&self, xform: &Xform) -> Fragment {
        let mut moved = self.clone();
        for (_, atom) in moved.atoms.iter_mut() {
            atom.position = xform * atom.position;
        }
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Translation3, UnitQuaternion, Vector3};

    struct TestRefs {
        chain_a_id: ChainId,
        gly_id: ResidueId,
        gly_ca_id: AtomId,
        ala_id: ResidueId,
        ala_cb_id: AtomId,
    }

    fn create_standard_test_fragment() -> (Fragment, TestRefs) {
        let mut fragment = Fragment::new();
        let chain_a_id = fragment.add_chain('A', ChainType::Protein);

        let gly_id = fragment.add_residue(chain_a_id, 1, "GLY").unwrap();
        fragment
            .add_atom_to_residue(gly_id, Atom::new("N", gly_id, Point3::new(0.0, 0.0, 0.0)))
            .unwrap();
        let gly_ca_id = fragment
            .add_atom_to_residue(gly_id, Atom::new("CA", gly_id, Point3::new(1.4, 0.0, 0.0)))
            .unwrap();

        let ala_id = fragment.add_residue(chain_a_id, 2, "ALA").unwrap();
        let ala_cb_id = fragment
            .add_atom_to_residue(ala_id, Atom::new("CB", ala_id, Point3::new(2.0, 1.0, 0.0)))
            .unwrap();

        let refs = TestRefs {
            chain_a_id,
            gly_id,
            gly_ca_id,
            ala_id,
            ala_cb_id,
        };
        (fragment, refs)
    }

    #[test]
    fn fragment_creation_and_access() {
        let (fragment, refs) = create_standard_test_fragment();

        assert_eq!(fragment.atom_count(), 3);
        assert_eq!(fragment.residue_count(), 2);
        assert_eq!(fragment.chains_iter().count(), 1);
        assert!(fragment.find_chain_by_id('B').is_none());
        assert_eq!(fragment.find_residue_by_id(refs.chain_a_id, 1), Some(refs.gly_id));
        assert_eq!(fragment.find_residue_by_id(refs.chain_a_id, 2), Some(refs.ala_id));
        assert_eq!(fragment.residue(refs.gly_id).unwrap().name, "GLY");
        assert_eq!(fragment.atom(refs.gly_ca_id).unwrap().name, "CA");
    }

    #[test]
    fn residues_keep_sequential_order_across_chains() {
        let (mut fragment, refs) = create_standard_test_fragment();
        let chain_b_id = fragment.add_chain('B', ChainType::Protein);
        let lys_id = fragment.add_residue(chain_b_id, 1, "LYS").unwrap();

        let order: Vec<_> = fragment.residues_iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec![refs.gly_id, refs.ala_id, lys_id]);
        assert_eq!(fragment.residue_at(2).map(|(id, _)| id), Some(lys_id));
        assert!(fragment.residue_at(3).is_none());
    }

    #[test]
    fn add_chain_and_add_residue_are_idempotent() {
        let (mut fragment, refs) = create_standard_test_fragment();
        assert_eq!(fragment.add_chain('A', ChainType::Protein), refs.chain_a_id);
        assert_eq!(fragment.add_residue(refs.chain_a_id, 1, "GLY"), Some(refs.gly_id));
        assert_eq!(fragment.residue_count(), 2);
        assert_eq!(fragment.chain(refs.chain_a_id).unwrap().residues().len(), 2);
    }

    #[test]
    fn add_atom_to_missing_residue_fails() {
        let (mut fragment, _) = create_standard_test_fragment();
        let missing = ResidueId::default();
        let atom = Atom::new("CA", missing, Point3::origin());
        assert!(fragment.add_atom_to_residue(missing, atom).is_none());
        assert_eq!(fragment.atom_count(), 3);
    }

    #[test]
    fn find_atom_resolves_chain_residue_and_name() {
        let (fragment, refs) = create_standard_test_fragment();
        assert_eq!(fragment.find_atom('A', 2, "CB"), Some(refs.ala_cb_id));
        assert_eq!(fragment.find_atom('A', 1, "CA"), Some(refs.gly_ca_id));
        assert!(fragment.find_atom('A', 1, "CB").is_none());
        assert!(fragment.find_atom('B', 1, "CA").is_none());
        assert_eq!(
            fragment.named_atom_position(refs.ala_id, "CB"),
            Some(Point3::new(2.0, 1.0, 0.0))
        );
    }

    #[test]
    fn transformed_moves_coordinates_and_keeps_ids() {
        let (fragment, refs) = create_standard_test_fragment();
        let xform = Xform::from_parts(
            Translation3::new(1.0, -2.0, 3.0),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f64::consts::FRAC_PI_2),
        );
        let moved = fragment.transformed(&xform);

        let expected = xform * Point3::new(2.0, 1.0, 0.0);
        let actual = moved.atom_position(refs.ala_cb_id).unwrap();
        assert!((expected - actual).norm() < 1e-12);
        assert_eq!(fragment.atom_position(refs.ala_cb_id), Some(Point3::new(2.0, 1.0, 0.0)));
        assert_eq!(moved.residue_count(), fragment.residue_count());
    }
}
