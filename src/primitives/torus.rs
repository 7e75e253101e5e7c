use super::{radial_range, Containment, Intersect, AABB};
use crate::ray::{Crossing, Crossings, Ray};
use glam::{vec3, DVec3, Vec3};

const NEWTON_STEPS: usize = 3;
/// Roots closer than this along the ray are a tangent graze
const GRAZE: f64 = 1e-7;

/// A torus lying in the XZ plane, centered on the origin.
///
/// Crossings are the real roots of the ray's quartic, found with Ferrari's
/// method and polished with a few Newton steps.
#[derive(Clone, Debug)]
pub struct Torus {
    pub major: f32,
    pub minor: f32,
}

impl Torus {
    pub fn new(major: f32, minor: f32) -> Self {
        Self { major, minor }
    }

    /// Squared distance to the tube's center circle minus the squared tube radius
    fn implicit(&self, p: DVec3) -> f64 {
        let rho = (p.x * p.x + p.z * p.z).sqrt() - self.major as f64;
        rho * rho + p.y * p.y - (self.minor as f64).powi(2)
    }

    fn normal(&self, p: Vec3) -> Vec3 {
        let rho = (p.x * p.x + p.z * p.z).sqrt();
        if rho <= f32::EPSILON {
            return Vec3::Y;
        }
        let scale = 1.0 - self.major / rho;
        vec3(p.x * scale, p.y, p.z * scale).normalize()
    }

    /// Coefficients of `(|p|² - R² - r²)² - 4R²(r² - y²)` along `o + t d`,
    /// highest power first
    fn quartic(&self, o: DVec3, d: DVec3) -> [f64; 5] {
        let r2 = (self.major as f64).powi(2);
        let a2 = (self.minor as f64).powi(2);

        let dd = d.dot(d);
        let od = o.dot(d);
        let k = o.dot(o) - (r2 + a2);

        [
            dd * dd,
            4.0 * dd * od,
            2.0 * dd * k + 4.0 * od * od + 4.0 * r2 * d.y * d.y,
            4.0 * k * od + 8.0 * r2 * o.y * d.y,
            k * k - 4.0 * r2 * (a2 - o.y * o.y),
        ]
    }
}

fn polish(c: &[f64; 5], mut t: f64) -> f64 {
    for _ in 0..NEWTON_STEPS {
        let value = (((c[0] * t + c[1]) * t + c[2]) * t + c[3]) * t + c[4];
        let slope = ((4.0 * c[0] * t + 3.0 * c[1]) * t + 2.0 * c[2]) * t + c[3];
        if slope == 0.0 {
            break;
        }
        t -= value / slope;
    }
    t
}

/// Largest real root of `x³ + b x² + c x + d`
fn largest_cubic_root(b: f64, c: f64, d: f64) -> f64 {
    let p = c - b * b / 3.0;
    let q = 2.0 * b * b * b / 27.0 - b * c / 3.0 + d;
    let shift = b / 3.0;

    let disc = q * q / 4.0 + p * p * p / 27.0;
    if disc > 0.0 {
        let root = disc.sqrt();
        return (-q / 2.0 + root).cbrt() + (-q / 2.0 - root).cbrt() - shift;
    }
    if p == 0.0 {
        return -shift;
    }

    let m = 2.0 * (-p / 3.0).sqrt();
    let theta = (3.0 * q / (p * m)).clamp(-1.0, 1.0).acos() / 3.0;
    m * theta.cos() - shift
}

/// Pushes the real roots of `y² + b y + c`, shifted by `-offset`
fn push_quadratic_roots(b: f64, c: f64, offset: f64, roots: &mut Vec<f64>) {
    let disc = b * b - 4.0 * c;
    if disc >= 0.0 {
        let root = disc.sqrt();
        roots.push((-b - root) / 2.0 - offset);
        roots.push((-b + root) / 2.0 - offset);
    }
}

/// Real roots of a quartic with a nonzero leading coefficient, unsorted
fn solve_quartic(c: &[f64; 5]) -> Vec<f64> {
    let p = c[1] / c[0];
    let q = c[2] / c[0];
    let r = c[3] / c[0];
    let s = c[4] / c[0];

    // Depressed quartic y⁴ + a2 y² + a1 y + a0 with x = y - p/4
    let a2 = q - 3.0 * p * p / 8.0;
    let a1 = r - p * q / 2.0 + p * p * p / 8.0;
    let a0 = s - p * r / 4.0 + p * p * q / 16.0 - 3.0 * p.powi(4) / 256.0;
    let offset = p / 4.0;

    let mut roots = Vec::with_capacity(4);

    // The resolvent is negative at zero, so its largest root is never negative
    let u = largest_cubic_root(a2, (a2 * a2 - 4.0 * a0) / 4.0, -a1 * a1 / 8.0);
    if u > 1e-12 {
        let s = (2.0 * u).sqrt();
        let alpha = a2 + 2.0 * u;
        let beta = a1 / s;
        push_quadratic_roots(s, (alpha - beta) / 2.0, offset, &mut roots);
        push_quadratic_roots(-s, (alpha + beta) / 2.0, offset, &mut roots);
    } else {
        // Biquadratic
        let disc = a2 * a2 - 4.0 * a0;
        if disc >= 0.0 {
            for y2 in [(-a2 + disc.sqrt()) / 2.0, (-a2 - disc.sqrt()) / 2.0] {
                if y2 >= 0.0 {
                    roots.push(y2.sqrt() - offset);
                    roots.push(-y2.sqrt() - offset);
                }
            }
        }
    }

    roots
}

impl Intersect for Torus {
    fn intersections(&self, ray: Ray, t_min: f32, t_max: f32) -> Crossings {
        let mut crossings = Crossings::new();

        // Padded so a crossing on the bounds is not clipped
        let pad = Vec3::splat(self.minor * 1e-3);
        let bounds = self.bounds();
        let scan = AABB::new(bounds.min - pad, bounds.max + pad);
        let (lo, _) = match scan.hit_range(ray, t_min, t_max) {
            Some(range) => range,
            None => return crossings,
        };

        let direction = ray.direction.as_dvec3();
        if direction.length_squared() == 0.0 {
            return crossings;
        }

        // Solve from the entry into the bounds to keep the coefficients small
        let start = lo as f64;
        let origin = ray.origin.as_dvec3() + direction * start;
        let coefficients = self.quartic(origin, direction);

        let mut roots = solve_quartic(&coefficients)
            .into_iter()
            .map(|t| polish(&coefficients, t))
            .collect::<Vec<_>>();
        roots.sort_by(|a, b| a.total_cmp(b));

        let mut i = 0;
        while i < roots.len() {
            // A double root touches the surface without passing through it
            if i + 1 < roots.len() && roots[i + 1] - roots[i] < GRAZE {
                i += 2;
                continue;
            }

            let t = (start + roots[i]) as f32;
            if t_min < t && t < t_max {
                let normal = self.normal(ray.point_at_parameter(t));
                crossings.push(Crossing::new(ray, t, normal));
            }
            i += 1;
        }

        crossings
    }

    fn bounds(&self) -> AABB {
        let reach = self.major + self.minor;
        AABB::new(vec3(-reach, -self.minor, -reach), vec3(reach, self.minor, reach))
    }

    fn contains(&self, point: Vec3) -> bool {
        self.implicit(point.as_dvec3()) <= 0.0
    }

    fn classify(&self, region: &AABB) -> Containment {
        let (near, far) = radial_range(region);
        let r2 = self.minor * self.minor;

        let y_near = if region.min.y <= 0.0 && region.max.y >= 0.0 {
            0.0
        } else {
            region.min.y.abs().min(region.max.y.abs())
        };
        let y_far = region.min.y.abs().max(region.max.y.abs());

        let rho_near = if near <= self.major && self.major <= far {
            0.0
        } else {
            (near - self.major).abs().min((far - self.major).abs())
        };
        let rho_far = (near - self.major).abs().max((far - self.major).abs());

        if rho_near * rho_near + y_near * y_near >= r2 {
            Containment::Outside
        } else if rho_far * rho_far + y_far * y_far <= r2 {
            Containment::Inside
        } else {
            Containment::Straddling
        }
    }
}
