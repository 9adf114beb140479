//! Convex hull facets of a point set on the sphere

use nalgebra::Vector3;

const PLANE_TOL: f64 = 1e-6;

/// Facets of the convex hull of `points`, as sorted vertex index lists.
///
/// Coplanar hull triangles are merged, so a facet may have more than three
/// vertices. Facets are returned in order of first discovery.
pub fn convex_hull_facets(points: &[Vector3<f64>]) -> Vec<Vec<usize>> {
    let n = points.len();
    let mut facets: Vec<Vec<usize>> = Vec::new();

    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                let normal = (points[j] - points[i]).cross(&(points[k] - points[i]));
                let norm = normal.norm();
                if norm < 1e-10 {
                    continue;
                }
                let mut normal = normal / norm;
                let mut offset = normal.dot(&points[i]);

                let dots: Vec<f64> = points.iter().map(|p| normal.dot(p)).collect();
                if dots.iter().all(|&d| d <= offset + PLANE_TOL) {
                    // already facing outwards
                } else if dots.iter().all(|&d| d >= offset - PLANE_TOL) {
                    normal = -normal;
                    offset = -offset;
                } else {
                    continue;
                }

                let facet: Vec<usize> = points
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| (normal.dot(p) - offset).abs() < PLANE_TOL)
                    .map(|(idx, _)| idx)
                    .collect();

                if !facets.contains(&facet) {
                    facets.push(facet);
                }
            }
        }
    }

    facets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_octahedron() {
        let points = [
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(-1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, -1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(0.0, 0.0, -1.0),
        ];
        let facets = convex_hull_facets(&points);
        assert_eq!(facets.len(), 8);
        assert!(facets.iter().all(|f| f.len() == 3));
    }

    #[test]
    fn test_cube_merges_coplanar_triangles() {
        let mut points = Vec::new();
        for &x in &[-1.0, 1.0] {
            for &y in &[-1.0, 1.0] {
                for &z in &[-1.0, 1.0] {
                    points.push(Vector3::new(x, y, z));
                }
            }
        }
        let facets = convex_hull_facets(&points);
        assert_eq!(facets.len(), 6);
        assert!(facets.iter().all(|f| f.len() == 4));
    }

    #[test]
    fn test_interior_point_ignored() {
        let points = [
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(-1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, -1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(0.0, 0.0, -1.0),
            Vector3::new(0.1, 0.1, 0.1),
        ];
        let facets = convex_hull_facets(&points);
        assert!(facets.iter().all(|f| !f.contains(&6)));
    }
}
