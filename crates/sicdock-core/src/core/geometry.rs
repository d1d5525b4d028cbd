use nalgebra::{
    Isometry3, Matrix3, Point3, Rotation3, Translation3, Unit, UnitQuaternion, Vector3,
};

/// Rigid transform (rotation followed by translation) used to place a fragment.
///
/// Composition is `a * b` (apply `b` first), inversion is `inverse()`, and a
/// point is moved with `xform * point`.
pub type Xform = Isometry3<f64>;

#[derive(Debug, Clone, Copy)]
pub struct CbCreationParams {
    pub off_bisector_angle: f64,
    pub off_plane_angle: f64,
    pub bond_length: f64,
}

impl Default for CbCreationParams {
    fn default() -> Self {
        Self {
            off_bisector_angle: 2.5,
            off_plane_angle: 54.75,
            bond_length: 1.53,
        }
    }
}

/// Transform that expresses `query`-frame points in the `indexed` frame: `indexed⁻¹ · query`.
#[inline]
pub fn relative_xform(indexed: &Xform, query: &Xform) -> Xform {
    indexed.inverse() * query
}

/// Builds a transform from a translation and a rotation vector (axis scaled by angle, radians).
pub fn xform_from_parts(translation: [f64; 3], rotation_vector: [f64; 3]) -> Xform {
    Isometry3::from_parts(
        Translation3::new(translation[0], translation[1], translation[2]),
        UnitQuaternion::from_scaled_axis(Vector3::from(rotation_vector)),
    )
}

/// Inverse of [`xform_from_parts`].
pub fn xform_to_parts(xform: &Xform) -> ([f64; 3], [f64; 3]) {
    let t = xform.translation.vector;
    let r = xform.rotation.scaled_axis();
    ([t.x, t.y, t.z], [r.x, r.y, r.z])
}

/// Local frame of a residue backbone, centered on CA.
///
/// The first axis points from CA to N, the third is normal to the N-CA-C plane
/// and the second completes a right-handed basis. Returns `None` when the three
/// atoms are (nearly) collinear.
pub fn backbone_stub(n: &Point3<f64>, ca: &Point3<f64>, c: &Point3<f64>) -> Option<Xform> {
    let e1 = (n - ca).try_normalize(1e-9)?;
    let e3 = e1.cross(&(c - ca)).try_normalize(1e-9)?;
    let e2 = e3.cross(&e1);

    let rotation = Rotation3::from_matrix_unchecked(Matrix3::from_columns(&[e1, e2, e3]));
    Some(Isometry3::from_parts(
        Translation3::from(ca.coords),
        UnitQuaternion::from_rotation_matrix(&rotation),
    ))
}

/// Places a virtual CB from backbone N, CA and C.
pub fn calculate_cb_position(
    n_pos: &Point3<f64>,
    ca_pos: &Point3<f64>,
    c_pos: &Point3<f64>,
    params: &CbCreationParams,
) -> Point3<f64> {
    let ca_n = (n_pos - ca_pos).normalize();
    let ca_c = (c_pos - ca_pos).normalize();

    let bisector = -(ca_n + ca_c).normalize();
    let plane_normal = Unit::new_normalize(ca_n.cross(&ca_c));

    let rot_off_bisector =
        Rotation3::from_axis_angle(&plane_normal, params.off_bisector_angle.to_radians());
    let cb_vec_in_plane = rot_off_bisector * bisector;

    let in_plane_axis = Unit::new_normalize(cb_vec_in_plane.cross(&plane_normal.into_inner()));
    let rot_off_plane =
        Rotation3::from_axis_angle(&in_plane_axis, params.off_plane_angle.to_radians());
    let final_cb_vec = rot_off_plane * cb_vec_in_plane;

    ca_pos + final_cb_vec * params.bond_length
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    const TOLERANCE: f64 = 1e-9;

    fn backbone() -> (Point3<f64>, Point3<f64>, Point3<f64>) {
        (
            Point3::new(-0.525, 1.363, 0.0),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.526, 0.0, 0.0),
        )
    }

    #[test]
    fn relative_xform_maps_query_frame_into_indexed_frame() {
        let indexed = xform_from_parts([1.0, 2.0, 3.0], [0.0, 0.0, FRAC_PI_2]);
        let query = xform_from_parts([-4.0, 0.5, 2.0], [0.3, -0.2, 0.1]);
        let p = Point3::new(0.7, -1.1, 2.3);

        let rel = relative_xform(&indexed, &query);
        let direct = indexed.inverse_transform_point(&(query * p));
        assert!((rel * p - direct).norm() < TOLERANCE);
    }

    #[test]
    fn xform_parts_round_trip() {
        let x = xform_from_parts([1.5, -2.0, 0.25], [0.4, 0.1, -0.7]);
        let (t, r) = xform_to_parts(&x);
        let y = xform_from_parts(t, r);
        let p = Point3::new(3.0, -1.0, 2.0);
        assert!((x * p - y * p).norm() < TOLERANCE);
    }

    #[test]
    fn backbone_stub_is_centered_on_ca_and_orthonormal() {
        let (n, ca, c) = backbone();
        let stub = backbone_stub(&n, &ca, &c).unwrap();
        assert!((stub * Point3::origin() - ca).norm() < TOLERANCE);

        let m = stub.rotation.to_rotation_matrix().into_inner();
        assert!((m.transpose() * m - Matrix3::identity()).norm() < 1e-9);
        assert!((m.determinant() - 1.0).abs() < 1e-9);

        let local_n = stub.inverse_transform_point(&n);
        assert!(local_n.y.abs() < 1e-9 && local_n.z.abs() < 1e-9 && local_n.x > 0.0);
    }

    #[test]
    fn backbone_stub_moves_with_the_atoms() {
        let (n, ca, c) = backbone();
        let x = xform_from_parts([5.0, -3.0, 1.0], [0.2, 0.9, -0.4]);
        let stub = backbone_stub(&n, &ca, &c).unwrap();
        let moved = backbone_stub(&(x * n), &(x * ca), &(x * c)).unwrap();
        let expected = x * stub;
        let p = Point3::new(1.0, 2.0, 3.0);
        assert!((moved * p - expected * p).norm() < 1e-9);
    }

    #[test]
    fn backbone_stub_rejects_collinear_atoms() {
        let stub = backbone_stub(
            &Point3::new(-1.0, 0.0, 0.0),
            &Point3::origin(),
            &Point3::new(1.0, 0.0, 0.0),
        );
        assert!(stub.is_none());
    }

    #[test]
    fn virtual_cb_sits_at_bond_length_from_ca() {
        let (n, ca, c) = backbone();
        let params = CbCreationParams::default();
        let cb = calculate_cb_position(&n, &ca, &c, &params);
        assert!(((cb - ca).norm() - params.bond_length).abs() < 1e-9);
        assert!((cb - n).norm() > 1.0 && (cb - c).norm() > 1.0);
    }
}
