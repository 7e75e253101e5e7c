use crate::{
    bvh::Bvh,
    config::BvhConfig,
    csg,
    error::{Error, Result},
    primitives::{same_shape, Intersect},
    ray::{Hit, Ray},
};
use glam::Mat4;
use log::debug;
use std::sync::Arc;

/// The objects being rendered and the hierarchy over them.
///
/// Every mutation rebuilds the hierarchy. Mutation needs `&mut self`, so no
/// query can be running against a scene while it changes.
#[derive(Debug)]
pub struct Scene {
    objects: Vec<Arc<dyn Intersect>>,
    bvh: Bvh,
    config: BvhConfig,
}

impl Scene {
    pub fn new(objects: Vec<Arc<dyn Intersect>>) -> Result<Self> {
        Self::with_config(objects, BvhConfig::default())
    }

    pub fn with_config(objects: Vec<Arc<dyn Intersect>>, config: BvhConfig) -> Result<Self> {
        let bvh = Bvh::with_config(objects.clone(), &config)?;
        Ok(Self {
            objects,
            bvh,
            config,
        })
    }

    /// Nearest surface hit along the ray within `(t_min, t_max)`
    pub fn hit(&self, ray: Ray, t_min: f32, t_max: f32) -> Option<Hit> {
        self.bvh.intersection(ray, t_min, t_max)
    }

    /// Objects in insertion order
    pub fn objects(&self) -> &[Arc<dyn Intersect>] {
        &self.objects
    }

    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn push(&mut self, object: Arc<dyn Intersect>) -> Result<()> {
        self.objects.push(object);
        self.rebuild()
    }

    /// Removes and returns an object. The last object cannot be removed.
    pub fn remove(&mut self, index: usize) -> Result<Arc<dyn Intersect>> {
        self.check_index(index)?;
        if self.objects.len() == 1 {
            return Err(Error::EmptyScene);
        }

        let removed = self.objects.remove(index);
        self.rebuild()?;
        Ok(removed)
    }

    /// Applies `transform` on top of an object's current pose
    pub fn set_transform(&mut self, index: usize, transform: Mat4) -> Result<()> {
        self.check_index(index)?;
        self.objects[index] = csg::transformed(&self.objects[index], transform);
        self.rebuild()
    }

    /// Swaps `target` for `replacement` wherever it appears, at the top level
    /// or shared inside CSG trees. Returns how many objects changed.
    pub fn replace(
        &mut self,
        target: &Arc<dyn Intersect>,
        replacement: Arc<dyn Intersect>,
    ) -> Result<usize> {
        let mut changed = 0;
        for object in self.objects.iter_mut() {
            let rebuilt = if same_shape(object, target) {
                Some(replacement.clone())
            } else {
                object.replaced(target, &replacement)
            };

            if let Some(rebuilt) = rebuilt {
                *object = rebuilt;
                changed += 1;
            }
        }

        if changed > 0 {
            self.rebuild()?;
        }
        Ok(changed)
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.objects.len() {
            Ok(())
        } else {
            Err(Error::IndexOutOfRange {
                index,
                len: self.objects.len(),
            })
        }
    }

    fn rebuild(&mut self) -> Result<()> {
        self.bvh = Bvh::with_config(self.objects.clone(), &self.config)?;
        debug!("rebuilt scene hierarchy: {:?}", self.bvh.stats());
        Ok(())
    }
}
