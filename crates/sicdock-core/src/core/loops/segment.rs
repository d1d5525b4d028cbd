use crate::core::geometry::{Xform, backbone_stub};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Backbone N, CA and C coordinates of one residue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackboneResidue {
    pub n: [f64; 3],
    pub ca: [f64; 3],
    pub c: [f64; 3],
}

impl BackboneResidue {
    pub fn new(n: Point3<f64>, ca: Point3<f64>, c: Point3<f64>) -> Self {
        Self {
            n: [n.x, n.y, n.z],
            ca: [ca.x, ca.y, ca.z],
            c: [c.x, c.y, c.z],
        }
    }

    pub fn n(&self) -> Point3<f64> {
        Point3::from(self.n)
    }

    pub fn ca(&self) -> Point3<f64> {
        Point3::from(self.ca)
    }

    pub fn c(&self) -> Point3<f64> {
        Point3::from(self.c)
    }

    pub fn stub(&self) -> Option<Xform> {
        backbone_stub(&self.n(), &self.ca(), &self.c())
    }

    fn transformed(&self, xform: &Xform) -> Self {
        Self::new(xform * self.n(), xform * self.ca(), xform * self.c())
    }
}

/// An observed loop: the two anchor residues and every residue between them.
///
/// Coordinates are stored in the lower anchor's local frame, so the lower
/// anchor's stub is the identity and [`LoopSegment::transform`] is the frame of
/// the upper anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoopSegment {
    residues: Vec<BackboneResidue>,
}

impl LoopSegment {
    /// Builds a segment from global-frame backbone coordinates.
    ///
    /// Returns `None` if there is no residue between the anchors or if either
    /// anchor has a degenerate backbone.
    pub fn from_backbone(residues: &[BackboneResidue]) -> Option<Self> {
        if residues.len() < 3 {
            return None;
        }
        let lower = residues.first()?.stub()?;
        residues.last()?.stub()?;

        let to_local = lower.inverse();
        Some(Self {
            residues: residues.iter().map(|r| r.transformed(&to_local)).collect(),
        })
    }

    /// Number of residues between the two anchors.
    pub fn loop_length(&self) -> usize {
        self.residues.len().saturating_sub(2)
    }

    /// Upper-anchor frame expressed in the lower-anchor frame.
    pub fn transform(&self) -> Option<Xform> {
        self.residues.last()?.stub()
    }

    pub fn residues(&self) -> &[BackboneResidue] {
        &self.residues
    }

    /// The loop with its lower anchor placed on `lower`.
    pub fn placed(&self, lower: &Xform) -> Vec<BackboneResidue> {
        self.residues.iter().map(|r| r.transformed(lower)).collect()
    }
}
