use super::ids::ResidueId;
use nalgebra::Point3;

/// An atom of a rigid fragment.
///
/// Only the data the docking scores consume is carried: the atom name used for
/// named lookups inside a residue, the owning residue, and the coordinates in
/// the fragment's own (untransformed) frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The name of the atom (e.g., "CA", "N", "CB").
    pub name: String,
    /// The ID of the parent residue this atom belongs to.
    pub residue_id: ResidueId,
    /// The 3D coordinates of the atom in Angstroms.
    pub position: Point3<f64>,
}

impl Atom {
    /// Creates a new `Atom`.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the atom.
    /// * `residue_id` - The ID of the residue this atom belongs to.
    /// * `position` - The 3D coordinates of the atom.
    pub fn new(name: &str, residue_id: ResidueId, position: Point3<f64>) -> Self {
        Self {
            name: name.to_string(),
            residue_id,
            position,
        }
    }

    /// Returns `true` for the three atoms that define a backbone frame.
    pub fn is_backbone_frame_atom(&self) -> bool {
        matches!(self.name.as_str(), "N" | "CA" | "C")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_atom_stores_all_fields() {
        let residue_id = ResidueId::default();
        let atom = Atom::new("CA", residue_id, Point3::new(1.0, 2.0, 3.0));

        assert_eq!(atom.name, "CA");
        assert_eq!(atom.residue_id, residue_id);
        assert_eq!(atom.position, Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn backbone_frame_atoms_are_recognized() {
        let residue_id = ResidueId::default();
        for name in ["N", "CA", "C"] {
            assert!(Atom::new(name, residue_id, Point3::origin()).is_backbone_frame_atom());
        }
        for name in ["O", "CB", "CAX", ""] {
            assert!(!Atom::new(name, residue_id, Point3::origin()).is_backbone_frame_atom());
        }
    }

    #[test]
    fn atom_equality_and_clone_works() {
        let atom1 = Atom::new("N", ResidueId::default(), Point3::new(0.5, 0.0, -1.0));
        let atom2 = atom1.clone();
        assert_eq!(atom1, atom2);
    }
}
