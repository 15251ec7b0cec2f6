use super::camera::Camera;
use super::input::InputState;
use super::math::{Ray, Vec3};

/// Below this the ray is treated as parallel to a plane.
const PARALLEL_EPSILON: f64 = 1e-9;

#[derive(Debug)]
pub struct Scene {
    pub camera: Camera,
    pub materials: Vec<Material>,
    pub lights: Vec<Light>,
    pub objects: Vec<SceneObject>,
}

#[derive(Debug)]
pub struct SceneObject {
    pub solid: Solid,
    pub material_index: usize,
}

#[derive(Debug)]
pub enum Solid {
    Sphere { center: Vec3, radius: f64 },
    Plane { normal: Vec3, distance: f64 },
}

/// Material kinds dispatched as a sum type. Shading is independent of
/// light visibility in this pipeline; shadowing is a post-multiplication in
/// the renderer.
#[derive(Debug, Clone, Copy)]
pub enum Material {
    SolidColor {
        color: Vec3,
    },
    Lambert {
        diffuse_reflectance: f64,
        diffuse_color: Vec3,
    },
}

impl Material {
    /// The material installed at index 0: primary rays that miss everything
    /// still shade through it, which makes it the background color.
    pub fn default_background() -> Material {
        Material::SolidColor {
            color: Vec3::new(1.0, 0.0, 1.0),
        }
    }

    /// Unclamped linear color.
    pub fn shade(&self) -> Vec3 {
        match self {
            Material::SolidColor { color } => *color,
            Material::Lambert {
                diffuse_reflectance,
                diffuse_color,
            } => *diffuse_color * *diffuse_reflectance,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Light {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f64,
}

impl Light {
    /// Unnormalized vector from `point` to the light; its magnitude is the
    /// distance to the light.
    pub fn direction_to_light(&self, point: Vec3) -> Vec3 {
        self.position - point
    }
}

/// Result of a closest-hit query. `material_index` and the surface fields
/// are only meaningful when `did_hit` is set; the default record routes a
/// miss to material 0.
#[derive(Debug, Default, Clone, Copy)]
pub struct HitRecord {
    pub did_hit: bool,
    pub origin: Vec3,
    pub normal: Vec3,
    pub material_index: usize,
    pub t: f64,
}

#[derive(Clone, Copy)]
struct HitResult {
    t: f64,
    normal: Vec3,
}

impl Scene {
    pub fn new(camera: Camera) -> Scene {
        Scene {
            camera,
            materials: Vec::new(),
            lights: Vec::new(),
            objects: Vec::new(),
        }
    }

    /// Per-frame state advance: camera input is applied and the
    /// camera-to-world transform is rebuilt, so a following `render` call
    /// only needs read access.
    pub fn update(&mut self, input: &InputState, elapsed: f64) {
        self.camera.update(input, elapsed);
    }

    /// Nearest intersection within the ray's range over a linear scan of
    /// the scene objects.
    pub fn get_closest_hit(&self, ray: &Ray) -> HitRecord {
        let mut closest = HitRecord::default();
        let mut closest_t = f64::INFINITY;
        for object in &self.objects {
            if let Some(result) = collide(&object.solid, ray) {
                if result.t < closest_t {
                    closest_t = result.t;
                    closest = HitRecord {
                        did_hit: true,
                        origin: ray.at(result.t),
                        normal: result.normal,
                        material_index: object.material_index,
                        t: result.t,
                    };
                }
            }
        }
        closest
    }

    /// Boolean any-hit query; early-exits on the first occluder inside the
    /// ray's range.
    pub fn does_hit(&self, ray: &Ray) -> bool {
        self.objects
            .iter()
            .any(|object| collide(&object.solid, ray).is_some())
    }
}

fn collide(solid: &Solid, ray: &Ray) -> Option<HitResult> {
    match solid {
        Solid::Sphere { center, radius } => {
            let oc = ray.origin - *center;
            let a = ray.direction.dot(ray.direction);
            let b = 2.0 * ray.direction.dot(oc);
            let c = oc.dot(oc) - radius * radius;
            let discriminant = b * b - 4.0 * a * c;

            if discriminant < 0.0 {
                return None;
            }

            let sqrt_d = discriminant.sqrt();
            let mut t = (-b - sqrt_d) / (2.0 * a);
            if !ray.contains(t) {
                // near root outside the range, try the far one (the ray may
                // start inside the sphere)
                t = (-b + sqrt_d) / (2.0 * a);
                if !ray.contains(t) {
                    return None;
                }
            }
            let normal = (ray.at(t) - *center).normalize();
            Some(HitResult { t, normal })
        }
        Solid::Plane { normal, distance } => {
            let dv = normal.dot(ray.direction);
            if dv.abs() < PARALLEL_EPSILON {
                return None;
            }
            let center = *normal * *distance;
            let t = (center - ray.origin).dot(*normal) / dv;
            if !ray.contains(t) {
                return None;
            }
            Some(HitResult { t, normal: *normal })
        }
    }
}
