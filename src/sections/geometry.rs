//! Fiber layout generators
//!
//! Every generator clones the given material into each fiber, so fibers never
//! share state.

use super::Fiber;
use crate::materials::UniaxialMaterial;

/// Rectangular patch between opposite corners, `ny` by `nz` fibers
pub fn rect_patch(
    material: &UniaxialMaterial,
    ny: usize,
    nz: usize,
    (y1, z1): (f64, f64),
    (y2, z2): (f64, f64),
) -> Vec<Fiber> {
    let (ny, nz) = (ny.max(1), nz.max(1));
    let dy = (y2 - y1) / ny as f64;
    let dz = (z2 - z1) / nz as f64;
    let area = (dy * dz).abs();
    let mut fibers = Vec::with_capacity(ny * nz);
    for i in 0..ny {
        for j in 0..nz {
            let y = y1 + (i as f64 + 0.5) * dy;
            let z = z1 + (j as f64 + 0.5) * dz;
            fibers.push(Fiber::new(y, z, area, material.clone()));
        }
    }
    fibers
}

/// Quadrilateral patch with vertices given counter-clockwise as (y, z)
///
/// `n_ij` divisions run along edge I-J and `n_jk` along edge J-K. Each fiber
/// sits at the centroid of its cell with the cell's exact area.
pub fn quad_patch(
    material: &UniaxialMaterial,
    n_ij: usize,
    n_jk: usize,
    vertices: [(f64, f64); 4],
) -> Vec<Fiber> {
    let (n_ij, n_jk) = (n_ij.max(1), n_jk.max(1));
    let map = |s: f64, t: f64| {
        let n = [(1.0 - s) * (1.0 - t), s * (1.0 - t), s * t, (1.0 - s) * t];
        let y = (0..4).map(|k| n[k] * vertices[k].0).sum::<f64>();
        let z = (0..4).map(|k| n[k] * vertices[k].1).sum::<f64>();
        (y, z)
    };
    let mut fibers = Vec::with_capacity(n_ij * n_jk);
    for i in 0..n_ij {
        for j in 0..n_jk {
            let s0 = i as f64 / n_ij as f64;
            let s1 = (i + 1) as f64 / n_ij as f64;
            let t0 = j as f64 / n_jk as f64;
            let t1 = (j + 1) as f64 / n_jk as f64;
            let cell = [map(s0, t0), map(s1, t0), map(s1, t1), map(s0, t1)];
            let (area, y, z) = polygon_centroid(&cell);
            if area > 0.0 {
                fibers.push(Fiber::new(y, z, area, material.clone()));
            }
        }
    }
    fibers
}

/// Shoelace area and centroid of a simple polygon
fn polygon_centroid(points: &[(f64, f64)]) -> (f64, f64, f64) {
    let mut a = 0.0;
    let mut cy = 0.0;
    let mut cz = 0.0;
    for k in 0..points.len() {
        let (y0, z0) = points[k];
        let (y1, z1) = points[(k + 1) % points.len()];
        let cross = y0 * z1 - y1 * z0;
        a += cross;
        cy += (y0 + y1) * cross;
        cz += (z0 + z1) * cross;
    }
    a *= 0.5;
    if a.abs() < 1e-300 {
        return (0.0, 0.0, 0.0);
    }
    (a.abs(), cy / (6.0 * a), cz / (6.0 * a))
}

/// `n` bars of equal area evenly spaced from `start` to `end` (inclusive)
pub fn straight_layer(
    material: &UniaxialMaterial,
    n: usize,
    bar_area: f64,
    start: (f64, f64),
    end: (f64, f64),
) -> Vec<Fiber> {
    match n {
        0 => Vec::new(),
        1 => vec![Fiber::new(
            0.5 * (start.0 + end.0),
            0.5 * (start.1 + end.1),
            bar_area,
            material.clone(),
        )],
        _ => (0..n)
            .map(|k| {
                let t = k as f64 / (n - 1) as f64;
                Fiber::new(
                    start.0 + t * (end.0 - start.0),
                    start.1 + t * (end.1 - start.1),
                    bar_area,
                    material.clone(),
                )
            })
            .collect(),
    }
}

/// Doubly symmetric I shape centred on the origin with the web along y
///
/// Flanges get `n_flange` fibers through the thickness, the web `n_web`
/// along its height; the other direction uses `n_across` fibers.
pub fn i_shape(
    material: &UniaxialMaterial,
    depth: f64,
    flange_width: f64,
    flange_thickness: f64,
    web_thickness: f64,
    n_flange: usize,
    n_web: usize,
    n_across: usize,
) -> Vec<Fiber> {
    let h = depth / 2.0;
    let hw = h - flange_thickness;
    let b = flange_width / 2.0;
    let t = web_thickness / 2.0;
    let mut fibers = rect_patch(material, n_flange, n_across, (hw, -b), (h, b));
    fibers.extend(rect_patch(material, n_flange, n_across, (-h, -b), (-hw, b)));
    fibers.extend(rect_patch(material, n_web, 1.max(n_across / 4), (-hw, -t), (hw, t)));
    fibers
}
