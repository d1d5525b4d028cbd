//! Diagnostic structure dumps in a minimal PDB layout.
//!
//! Only ATOM and TER/END records are written. The output is meant for quick
//! inspection in a viewer, not as an interchange format.

use crate::core::loops::segment::BackboneResidue;
use crate::core::models::fragment::Fragment;
use nalgebra::Point3;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

fn write_atom_record(
    writer: &mut impl Write,
    serial: usize,
    atom_name: &str,
    residue_name: &str,
    chain: char,
    residue_number: isize,
    position: &Point3<f64>,
) -> io::Result<()> {
    // Four-character names start in column 13, shorter ones in column 14.
    let name = if atom_name.len() >= 4 {
        atom_name.to_string()
    } else {
        format!(" {}", atom_name)
    };
    let element = atom_name
        .chars()
        .find(|c| c.is_ascii_alphabetic())
        .unwrap_or('X');
    writeln!(
        writer,
        "ATOM  {:>5} {:<4} {:>3} {}{:>4}    {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2}",
        serial % 100_000,
        name,
        residue_name,
        chain,
        residue_number,
        position.x,
        position.y,
        position.z,
        1.0,
        0.0,
        element
    )
}

/// Writes every atom of a fragment, chain by chain.
pub fn write_fragment_pdb(fragment: &Fragment, writer: &mut impl Write) -> io::Result<()> {
    let mut serial = 1;
    for (_, chain) in fragment.chains_iter() {
        for &residue_id in chain.residues() {
            let Some(residue) = fragment.residue(residue_id) else {
                continue;
            };
            for &atom_id in residue.atoms() {
                let Some(atom) = fragment.atom(atom_id) else {
                    continue;
                };
                write_atom_record(
                    writer,
                    serial,
                    &atom.name,
                    &residue.name,
                    chain.id,
                    residue.residue_number,
                    &atom.position,
                )?;
                serial += 1;
            }
        }
        writeln!(writer, "TER")?;
    }
    writeln!(writer, "END")
}

/// Writes a placed loop backbone as chain `L`, residues numbered from 1.
pub fn write_backbone_pdb(path: &Path, residues: &[BackboneResidue]) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    let mut serial = 1;
    for (i, residue) in residues.iter().enumerate() {
        for (name, position) in [("N", residue.n()), ("CA", residue.ca()), ("C", residue.c())] {
            write_atom_record(&mut writer, serial, name, "GLY", 'L', i as isize + 1, &position)?;
            serial += 1;
        }
    }
    writeln!(writer, "TER")?;
    writeln!(writer, "END")?;
    writer.flush()
}

/// Writes a fragment to `path`.
pub fn write_fragment_pdb_to_path(fragment: &Fragment, path: &Path) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_fragment_pdb(fragment, &mut writer)?;
    writer.flush()
}
