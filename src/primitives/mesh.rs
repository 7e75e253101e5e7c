use super::{Containment, Intersect, Triangle, AABB};
use crate::{
    error::{Error, Result},
    ray::{sort_crossings, Crossings, Ray},
};
use glam::{vec3, Vec3};

/// A closed, consistently wound triangle mesh treated as a solid.
#[derive(Clone, Debug)]
pub struct Mesh {
    triangles: Vec<Triangle>,
    bounds: AABB,
}

impl Mesh {
    pub fn new(vertices: &[Vec3], indices: &[[usize; 3]]) -> Result<Self> {
        if indices.is_empty() {
            return Err(Error::InvalidMesh("no triangles".to_string()));
        }

        let triangles = indices
            .iter()
            .map(|&[a, b, c]| {
                let vertex = |i: usize| {
                    vertices.get(i).copied().ok_or_else(|| {
                        Error::InvalidMesh(format!(
                            "index {} out of range for {} vertices",
                            i,
                            vertices.len()
                        ))
                    })
                };
                Ok(Triangle::new(vertex(a)?, vertex(b)?, vertex(c)?))
            })
            .collect::<Result<Vec<_>>>()?;

        let bounds = triangles
            .iter()
            .fold(AABB::empty(), |b, t| b.union(t.bounds()));

        Ok(Self { triangles, bounds })
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }
}

impl Intersect for Mesh {
    fn intersections(&self, ray: Ray, t_min: f32, t_max: f32) -> Crossings {
        let mut crossings = Crossings::new();
        if !self.bounds.has_intersection(ray, t_min, t_max) {
            return crossings;
        }

        for triangle in &self.triangles {
            crossings.extend(triangle.intersections(ray, t_min, t_max));
        }
        sort_crossings(&mut crossings);

        // A ray through a shared edge reports the same crossing once per triangle
        crossings.dedup_by(|b, a| a.entering == b.entering && (a.t() - b.t()).abs() < 1e-6);
        crossings
    }

    fn bounds(&self) -> AABB {
        self.bounds
    }

    /// Crossing parity along a direction unlikely to graze an edge
    fn contains(&self, point: Vec3) -> bool {
        if !self.bounds.contains_point(point) {
            return false;
        }

        let ray = Ray::new(point, vec3(0.5773, 0.5779, 0.5767));
        let crossings = self
            .triangles
            .iter()
            .filter_map(|t| t.hit_parameter(ray))
            .filter(|&t| t > 0.0)
            .count();

        crossings % 2 == 1
    }

    fn classify(&self, region: &AABB) -> Containment {
        if !self.bounds.overlaps(region) {
            return Containment::Outside;
        }

        if self.triangles.iter().any(|t| t.bounds().overlaps(region)) {
            return Containment::Straddling;
        }

        // No surface passes through the region, so it is entirely on one side
        if self.contains(region.centroid()) {
            Containment::Inside
        } else {
            Containment::Outside
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Outward wound unit cube as twelve triangles
    fn cube() -> Mesh {
        let v = [
            vec3(0.0, 0.0, 0.0),
            vec3(1.0, 0.0, 0.0),
            vec3(1.0, 1.0, 0.0),
            vec3(0.0, 1.0, 0.0),
            vec3(0.0, 0.0, 1.0),
            vec3(1.0, 0.0, 1.0),
            vec3(1.0, 1.0, 1.0),
            vec3(0.0, 1.0, 1.0),
        ];
        let faces = [
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [3, 6, 2],
            [3, 7, 6],
            [0, 4, 7],
            [0, 7, 3],
            [1, 2, 6],
            [1, 6, 5],
        ];
        Mesh::new(&v, &faces).unwrap()
    }

    #[test]
    fn test_cube_mesh_crossings() {
        let mesh = cube();
        let ray = Ray::new(vec3(-1.0, 0.3, 0.6), Vec3::X);

        let crossings = mesh.intersections(ray, 0.0, f32::INFINITY);
        assert_eq!(crossings.len(), 2);
        assert!((crossings[0].t() - 1.0).abs() < 1e-5);
        assert!(crossings[0].entering);
        assert!((crossings[1].t() - 2.0).abs() < 1e-5);
        assert!(!crossings[1].entering);
    }

    #[test]
    fn test_cube_mesh_containment() {
        let mesh = cube();
        assert!(mesh.contains(vec3(0.5, 0.5, 0.5)));
        assert!(mesh.contains(vec3(0.1, 0.9, 0.2)));
        assert!(!mesh.contains(vec3(1.5, 0.5, 0.5)));
    }

    #[test]
    fn test_cube_mesh_classify() {
        let mesh = cube();
        let core = AABB::new(Vec3::splat(0.25), Vec3::splat(0.75));
        let outside = AABB::new(Vec3::splat(2.0), Vec3::splat(3.0));
        let across = AABB::new(Vec3::splat(0.5), Vec3::splat(1.5));

        assert_eq!(mesh.classify(&core), Containment::Inside);
        assert_eq!(mesh.classify(&outside), Containment::Outside);
        assert_eq!(mesh.classify(&across), Containment::Straddling);
    }

    #[test]
    fn test_bad_index_is_rejected() {
        let result = Mesh::new(&[Vec3::ZERO], &[[0, 1, 2]]);
        assert!(matches!(result, Err(Error::InvalidMesh(_))));
    }
}
