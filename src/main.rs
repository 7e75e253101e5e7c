use anyhow::{Context, Result};
use csgtrace::{
    camera::Camera,
    config::Config,
    csg::Csg,
    material::{Diffuse, Material},
    octree::{Cube, Octree},
    primitives::{Cuboid, Cylinder, Instance, Intersect, Mesh, Plane, Sphere, Torus},
    DefaultRng, Ray, Scene,
};
use glam::{vec3, Mat4, Vec3};
use log::{info, Level, LevelFilter, Log, Metadata, Record};
use rand::prelude::*;
use rayon::prelude::*;
use std::{
    f32::consts::FRAC_PI_2,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};

const COLOR_CHANNELS: u32 = 3;
const GAMMA: f32 = 2.2;
const AMBIENT: f32 = 0.15;
const T_MIN: f32 = 1e-3;

/// Writes records to stderr
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:<5} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logger() -> Result<()> {
    let level = std::env::var("CSGTRACE_LOG")
        .ok()
        .and_then(|level| level.parse::<Level>().ok())
        .map_or(LevelFilter::Info, |level| level.to_level_filter());

    log::set_logger(&LOGGER).context("a logger was already installed")?;
    log::set_max_level(level);
    Ok(())
}

fn diffuse(r: f32, g: f32, b: f32) -> Arc<dyn Material> {
    Arc::new(Diffuse::new(vec3(r, g, b)))
}

/// Cube intersected with a sphere, with three cylinders drilled through it
fn drilled_block() -> Arc<dyn Intersect> {
    let block: Arc<dyn Intersect> = Arc::new(Cuboid::new(Vec3::splat(-1.0), Vec3::splat(1.0)));
    let ball: Arc<dyn Intersect> = Arc::new(Sphere::new(Vec3::ZERO, 1.35));
    let rounded: Arc<dyn Intersect> = Arc::new(Csg::intersection(block, ball));

    // One cylinder shared by all three drill holes
    let drill: Arc<dyn Intersect> = Arc::new(Cylinder::new(0.5, 1.5));
    let along_x: Arc<dyn Intersect> = Arc::new(Instance::new(
        drill.clone(),
        None,
        Mat4::from_rotation_z(FRAC_PI_2),
    ));
    let along_z: Arc<dyn Intersect> = Arc::new(Instance::new(
        drill.clone(),
        None,
        Mat4::from_rotation_x(FRAC_PI_2),
    ));
    let holes: Arc<dyn Intersect> = Arc::new(Csg::union(
        Arc::new(Csg::union(drill, along_x)),
        along_z,
    ));

    Arc::new(Csg::difference(rounded, holes))
}

/// Square pyramid as a closed mesh
fn pyramid() -> csgtrace::Result<Mesh> {
    let vertices = [
        vec3(-0.7, 0.0, -0.7),
        vec3(0.7, 0.0, -0.7),
        vec3(0.7, 0.0, 0.7),
        vec3(-0.7, 0.0, 0.7),
        vec3(0.0, 1.2, 0.0),
    ];
    let faces = [
        [0, 1, 2],
        [0, 2, 3],
        [0, 4, 1],
        [1, 4, 2],
        [2, 4, 3],
        [3, 4, 0],
    ];
    Mesh::new(&vertices, &faces)
}

fn build_scene(config: &Config, solid: Arc<dyn Intersect>) -> Result<Scene> {
    let mut objects: Vec<Arc<dyn Intersect>> = Vec::new();

    let ground = Arc::new(Plane::new(Vec3::Y, -1.0));
    objects.push(Arc::new(Instance::receiver(ground, diffuse(0.5, 0.5, 0.5))));

    objects.push(Arc::new(Instance::new(
        solid,
        Some(diffuse(0.8, 0.3, 0.2)),
        Mat4::from_rotation_y(0.5),
    )));

    let torus = Arc::new(Torus::new(0.8, 0.25));
    objects.push(Arc::new(Instance::new(
        torus,
        Some(diffuse(0.2, 0.6, 0.8)),
        Mat4::from_translation(vec3(-3.0, -0.75, 0.5)),
    )));

    let pyramid = Arc::new(pyramid().context("building the pyramid mesh")?);
    objects.push(Arc::new(Instance::new(
        pyramid,
        Some(diffuse(0.9, 0.8, 0.3)),
        Mat4::from_translation(vec3(3.0, -1.0, 0.0)),
    )));

    let sphere: Arc<dyn Intersect> = Arc::new(Sphere::new(Vec3::ZERO, 0.3));
    for i in 0..8 {
        let angle = i as f32 * std::f32::consts::TAU / 8.0;
        let position = vec3(4.5 * angle.cos(), -0.7, 4.5 * angle.sin());
        objects.push(Arc::new(Instance::new(
            sphere.clone(),
            Some(diffuse(0.3, 0.8, 0.3)),
            Mat4::from_translation(position),
        )));
    }

    Ok(Scene::with_config(objects, config.bvh)?)
}

/// Single directional light with hard shadows over a sky gradient
fn color(ray: Ray, scene: &Scene, light: Vec3) -> Vec3 {
    match scene.hit(ray, T_MIN, f32::INFINITY) {
        Some(hit) => {
            let albedo = hit
                .material
                .as_ref()
                .map_or(Vec3::splat(0.5), |material| material.albedo());

            let shadow = Ray::new(hit.point + hit.normal * T_MIN, light);
            let lit = if scene.hit(shadow, T_MIN, f32::INFINITY).is_some() {
                0.0
            } else {
                hit.normal.dot(light).max(0.0)
            };

            albedo * (AMBIENT + (1.0 - AMBIENT) * lit)
        }
        None => {
            let dir = ray.direction.normalize();
            let t = 0.5 * (dir.y + 1.0);
            (1.0 - t) * Vec3::ONE + t * vec3(0.5, 0.7, 1.0)
        }
    }
}

fn render(config: &Config, scene: &Scene) -> Vec<u8> {
    let width = config.render.width;
    let height = config.render.height;
    let samples = config.render.samples.max(1);

    let camera = Camera::new(
        vec3(0.0, 3.0, 9.0),
        vec3(0.0, 0.0, 0.0),
        Vec3::Y,
        40.0,
        width as f32 / height as f32,
        0.0,
    );
    let light = vec3(-1.0, 2.0, 1.5).normalize();

    let mut buffer = vec![0u8; (width * height * COLOR_CHANNELS) as usize];
    let ray_count = AtomicU64::new(0);
    let start = Instant::now();

    buffer
        .par_chunks_mut((width * COLOR_CHANNELS) as usize)
        .rev()
        .enumerate()
        .for_each(|(y, row)| {
            let mut rng = DefaultRng::seed_from_u64(y as u64);
            row.chunks_mut(COLOR_CHANNELS as usize)
                .enumerate()
                .for_each(|(x, pixel)| {
                    let mut out = Vec3::ZERO;

                    // Antialiasing via multisampling
                    for _ in 0..samples {
                        let u = (rng.gen::<f32>() + x as f32) / width as f32;
                        let v = (rng.gen::<f32>() + y as f32) / height as f32;
                        out += color(camera.ray(u, v, &mut rng), scene, light);
                    }
                    out /= samples as f32;

                    // Gamma correct and convert from [0, 1] to [0, 256]
                    for (channel, value) in pixel.iter_mut().zip(out.to_array()) {
                        *channel = (255.99 * value.powf(1.0 / GAMMA).clamp(0.0, 1.0)) as u8;
                    }
                });

            // Primary and shadow rays
            ray_count.fetch_add(2 * (width as u64) * samples as u64, Ordering::Relaxed);
        });

    let duration = start.elapsed();
    let rays = ray_count.load(Ordering::Relaxed) as f64 / 1_000_000.0;
    info!(
        "rendered {}x{} in {:.2?}: {:.2}M rays, {:.2}M rays per second",
        width,
        height,
        duration,
        rays,
        rays / duration.as_secs_f64()
    );

    buffer
}

fn report_octree(config: &Config, solid: &dyn Intersect) -> Result<()> {
    let start = Instant::now();
    let octree = Octree::build_with(Cube::enclosing(&solid.bounds()), solid, &config.octree)?;
    let stats = octree.stats();

    info!(
        "octree at depth {} in {:.2?}: volume {:.4}, surface area {:.4}, {} nodes, {} full leaves",
        config.octree.max_depth,
        start.elapsed(),
        octree.volume(),
        octree.surface_area(),
        stats.nodes,
        stats.full_leaves
    );
    Ok(())
}

fn main() -> Result<()> {
    init_logger()?;

    let config = match std::env::args().nth(1) {
        Some(path) => {
            Config::load(&path).with_context(|| format!("loading configuration from {}", path))?
        }
        None => Config::default(),
    };

    let solid = drilled_block();
    report_octree(&config, solid.as_ref())?;

    let scene = build_scene(&config, solid)?;
    info!("scene has {} objects", scene.len());

    let buffer = render(&config, &scene);
    image::save_buffer(
        &config.render.output,
        &buffer,
        config.render.width,
        config.render.height,
        image::ColorType::Rgb8,
    )
    .with_context(|| format!("writing {}", config.render.output))?;
    info!("saved {}", config.render.output);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_installs_once() {
        assert!(init_logger().is_ok());
        let error = init_logger().unwrap_err();
        assert!(format!("{:#}", error).starts_with("a logger was already installed"));
    }
}
