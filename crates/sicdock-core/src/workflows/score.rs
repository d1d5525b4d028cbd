use crate::core::docking::linker::MIN_LOOP_LENGTH;
use crate::core::docking::{
    AtomPairConstraint, CbScore, Constraint, ConstraintAtom, ConstraintSetScore, JointScore,
    LinkerScore, RigidScore,
};
use crate::core::geometry::Xform;
use crate::core::io::dump::write_fragment_pdb_to_path;
use crate::core::loops::SharedLoopLibrary;
use crate::core::models::fragment::Fragment;
use crate::engine::config::{
    AtomSpecifier, ComponentConfig, ConstraintSpec, DockScoreConfig, FragmentSide,
};
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use std::cmp::Ordering;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Prefix of the tag passed to each linker score; the component index is
/// appended so that dumps of different linker components never collide.
const LINKER_TAG: &str = "linker";

/// One candidate placement of the two fragments.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePose {
    pub id: String,
    pub x1: Xform,
    pub x2: Xform,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoseScore {
    pub id: String,
    pub x1: Xform,
    pub x2: Xform,
    pub total: f64,
    /// Unweighted component values in configuration order; `None` for zero-weight components.
    pub components: Vec<Option<f64>>,
}

#[derive(Debug)]
pub struct ScoringResult {
    /// The assembled score, kept for tabular output of individual poses.
    pub score: JointScore,
    pub labels: Vec<&'static str>,
    pub weights: Vec<f64>,
    /// Poses ranked by total score, best (highest) first.
    pub poses: Vec<PoseScore>,
    /// Ids of the poses for which linker examples were written.
    pub dumped: Vec<String>,
}

/// Builds the weighted score described by `config`.
///
/// Linker components share one loop library, loaded through `shared_library`
/// for every loop length up to the longest one requested.
pub fn build_joint_score(
    fragment1: &Fragment,
    fragment2: &Fragment,
    config: &DockScoreConfig,
    shared_library: &SharedLoopLibrary,
) -> Result<(JointScore, Vec<Arc<LinkerScore>>), EngineError> {
    let loop_sizes: Vec<usize> = config
        .max_loop_length()
        .map(|max| (MIN_LOOP_LENGTH..=max).collect())
        .unwrap_or_default();

    let mut joint = JointScore::new();
    let mut linkers = Vec::new();
    for (index, component) in config.components.iter().enumerate() {
        let score: Box<dyn RigidScore> = match component {
            ComponentConfig::Contact {
                clash_distance,
                contact_distance,
                ..
            } => Box::new(CbScore::new(
                fragment1,
                fragment2,
                *clash_distance,
                *contact_distance,
            )),
            ComponentConfig::Linker {
                max_loop_length,
                lookup_radius,
                ..
            } => {
                let library = shared_library.get_or_load(&config.loop_library, &loop_sizes)?;
                let linker = Arc::new(LinkerScore::new(
                    fragment1,
                    fragment2,
                    *max_loop_length,
                    *lookup_radius,
                    &format!("{}{}", LINKER_TAG, index),
                    library,
                )?);
                linkers.push(Arc::clone(&linker));
                Box::new(linker)
            }
            ComponentConfig::Constraints { constraints, .. } => {
                let resolved = resolve_constraints(fragment1, fragment2, constraints)?;
                Box::new(ConstraintSetScore::new(fragment1, fragment2, resolved)?)
            }
        };
        joint.add_score(score, component.weight());
    }
    Ok((joint, linkers))
}

fn resolve_atom(
    fragment1: &Fragment,
    fragment2: &Fragment,
    spec: &AtomSpecifier,
) -> Result<ConstraintAtom, EngineError> {
    let fragment = match spec.side {
        FragmentSide::One => fragment1,
        FragmentSide::Two => fragment2,
    };
    let id = fragment
        .find_atom(spec.chain_id, spec.residue_number, &spec.atom_name)
        .ok_or_else(|| EngineError::AtomNotFound { spec: spec.clone() })?;
    Ok(match spec.side {
        FragmentSide::One => ConstraintAtom::FragmentOne(id),
        FragmentSide::Two => ConstraintAtom::FragmentTwo(id),
    })
}

fn resolve_constraints(
    fragment1: &Fragment,
    fragment2: &Fragment,
    specs: &[ConstraintSpec],
) -> Result<Vec<Arc<dyn Constraint>>, EngineError> {
    specs
        .iter()
        .map(|spec| {
            let atom1 = resolve_atom(fragment1, fragment2, &spec.atom1)?;
            let atom2 = resolve_atom(fragment1, fragment2, &spec.atom2)?;
            Ok(Arc::new(AtomPairConstraint::new(atom1, atom2, spec.func)) as Arc<dyn Constraint>)
        })
        .collect()
}

fn evaluate(
    joint: &JointScore,
    candidate: &CandidatePose,
    reporter: &ProgressReporter,
) -> Result<PoseScore, EngineError> {
    let x1s = [candidate.x1];
    let x2s = [candidate.x2];
    let components = joint.breakdown(&x1s, &x2s)?;
    let total = components
        .iter()
        .zip(joint.weights())
        .filter_map(|(value, weight)| value.map(|v| v * weight))
        .sum();
    reporter.report(Progress::TaskIncrement);
    Ok(PoseScore {
        id: candidate.id.clone(),
        x1: candidate.x1,
        x2: candidate.x2,
        total,
        components,
    })
}

/// Scores every candidate pose, ranks them and optionally dumps linkers for the best ones.
#[instrument(skip_all, name = "scoring_workflow")]
pub fn run(
    fragment1: &Fragment,
    fragment2: &Fragment,
    config: &DockScoreConfig,
    candidates: &[CandidatePose],
    shared_library: &SharedLoopLibrary,
    reporter: &ProgressReporter,
) -> Result<ScoringResult, EngineError> {
    let (joint, linkers) = reporter.phase("Preparation", || {
        info!(
            components = config.components.len(),
            atoms1 = fragment1.atom_count(),
            atoms2 = fragment2.atom_count(),
            "Building docking score."
        );
        build_joint_score(fragment1, fragment2, config, shared_library)
    })?;

    let mut poses = reporter.phase("Scoring Poses", || {
        reporter.report(Progress::TaskStart {
            total_steps: candidates.len() as u64,
        });

        #[cfg(not(feature = "parallel"))]
        let iterator = candidates.iter();

        #[cfg(feature = "parallel")]
        let iterator = candidates.par_iter();

        let results: Result<Vec<PoseScore>, EngineError> = iterator
            .map(|candidate| evaluate(&joint, candidate, reporter))
            .collect();

        reporter.report(Progress::TaskFinish);
        results
    })?;

    poses.sort_by(|a, b| b.total.partial_cmp(&a.total).unwrap_or(Ordering::Equal));
    info!(poses = poses.len(), "Scoring complete.");
    if let Some(best) = poses.first() {
        info!(pose = %best.id, total = best.total, "Best pose.");
    }

    let mut dumped = Vec::new();
    if let Some(dump) = &config.dump {
        if linkers.is_empty() {
            warn!("Linker dump requested but no linker component is configured.");
        } else {
            reporter.phase("Dumping Linkers", || {
                for pose in poses.iter().take(dump.top) {
                    let prefix = format!("{}{}_", dump.out_prefix, pose.id);
                    let mut any = false;
                    for linker in &linkers {
                        any |= linker.dump_linkers(&pose.x1, &pose.x2, &prefix).map_err(|e| {
                            EngineError::Dump {
                                pose: pose.id.clone(),
                                source: e,
                            }
                        })?;
                    }
                    if any {
                        for (suffix, fragment, xform) in
                            [("comp1", fragment1, &pose.x1), ("comp2", fragment2, &pose.x2)]
                        {
                            let path = PathBuf::from(format!("{}{}.pdb", prefix, suffix));
                            write_fragment_pdb_to_path(&fragment.transformed(xform), &path)
                                .map_err(|source| EngineError::DumpIo { path, source })?;
                        }
                        dumped.push(pose.id.clone());
                    }
                }
                Ok::<(), EngineError>(())
            })?;
            info!(dumped = dumped.len(), "Linker dumps written.");
        }
    }

    Ok(ScoringResult {
        labels: joint.components().map(|(s, _)| s.type_name()).collect(),
        weights: joint.weights().to_vec(),
        score: joint,
        poses,
        dumped,
    })
}
