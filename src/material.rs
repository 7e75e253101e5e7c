use glam::Vec3;

/// Surface description carried through hit records. Shading lives with the
/// renderer; the geometry core only threads the reference along.
pub trait Material: std::fmt::Debug + Send + Sync {
    fn albedo(&self) -> Vec3;
}

#[derive(Debug)]
pub struct Diffuse {
    pub albedo: Vec3,
}

impl Diffuse {
    pub fn new(albedo: Vec3) -> Self {
        Self { albedo }
    }
}

impl Material for Diffuse {
    fn albedo(&self) -> Vec3 {
        self.albedo
    }
}
