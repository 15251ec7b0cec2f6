use std::cmp::min;
use std::path::Path;

use image::{ImageBuffer, Rgb};
use log::debug;
use rayon::prelude::*;
use thiserror::Error;

use super::core::{HitRecord, Light, Scene};
use super::input::InputEvent;
use super::math::{Ray, Vec3};

/// Bias for shadow rays; the shadow origin is pushed `2 * SHADOW_EPSILON`
/// along the surface normal and the ray starts at `SHADOW_EPSILON`, which
/// keeps the hit surface from occluding itself (shadow acne).
const SHADOW_EPSILON: f64 = 1e-4;

/// Factor applied once per occluding light; multiple occluded lights
/// compound multiplicatively.
const SHADOW_DARKENING: f64 = 0.5;

/// Fixed snapshot filename for the save-framebuffer operation.
const BUFFER_SNAPSHOT_FILENAME: &str = "shadecast_buffer.bmp";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("render target needs non-zero dimensions, got {width}x{height}")]
    ZeroSizedTarget { width: u32, height: u32 },
    #[error("scene exposes no materials; index 0 is required as the shading fallback")]
    NoMaterials,
    #[error("failed to write the framebuffer image")]
    Image(#[from] image::ImageError),
}

/// Which lighting term the renderer visualizes. Shading in this pipeline is
/// fully delegated to `Material::shade`, so the mode is pure state for now;
/// transitions are logged so the cycling stays observable.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LightingMode {
    #[default]
    ObservedArea,
    Radiance,
    Brdf,
    Combined,
}

impl LightingMode {
    pub fn next(self) -> LightingMode {
        match self {
            LightingMode::ObservedArea => LightingMode::Radiance,
            LightingMode::Radiance => LightingMode::Brdf,
            LightingMode::Brdf => LightingMode::Combined,
            LightingMode::Combined => LightingMode::ObservedArea,
        }
    }
}

/// Owns the framebuffer and the render-mode state. Dimensions are fixed at
/// construction; scene data is borrowed read-only for the duration of each
/// render call.
pub struct Renderer {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
    lighting_mode: LightingMode,
    shadows_enabled: bool,
}

impl Renderer {
    pub fn new(width: u32, height: u32) -> Result<Renderer, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::ZeroSizedTarget { width, height });
        }
        Ok(Renderer {
            width,
            height,
            pixels: vec![0; (width * height) as usize],
            lighting_mode: LightingMode::default(),
            shadows_enabled: true,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Packed 0xRRGGBB pixels, linear offset `px + py * width`.
    pub fn framebuffer(&self) -> &[u32] {
        &self.pixels
    }

    pub fn lighting_mode(&self) -> LightingMode {
        self.lighting_mode
    }

    pub fn shadows_enabled(&self) -> bool {
        self.shadows_enabled
    }

    /// Consume one edge-triggered input event. Events fire once per key
    /// press, so holding a key cannot cycle the mode every frame.
    pub fn process_event(&mut self, event: InputEvent) -> Result<(), RenderError> {
        match event {
            InputEvent::CycleLightingMode => {
                self.lighting_mode = self.lighting_mode.next();
                debug!("lighting mode -> {:?}", self.lighting_mode);
            }
            InputEvent::ToggleShadows => {
                self.shadows_enabled = !self.shadows_enabled;
                debug!("shadows enabled -> {}", self.shadows_enabled);
            }
            InputEvent::SaveScreenshot => {
                self.save_buffer_to_image()?;
            }
        }
        Ok(())
    }

    /// Fill the framebuffer with one frame of the given scene.
    ///
    /// Rows are rendered in parallel; every pixel is independent, so the
    /// output is identical to the serial raster order.
    pub fn render(&mut self, scene: &Scene) -> Result<(), RenderError> {
        if scene.materials.is_empty() {
            return Err(RenderError::NoMaterials);
        }

        let width = self.width;
        let height = self.height;
        let tan_fov = (scene.camera.fov_angle.to_radians() / 2.0).tan();
        let aspect_ratio = width as f64 / height as f64;
        let camera_to_world = scene.camera.camera_to_world();
        let camera_origin = scene.camera.origin;
        let shadows_enabled = self.shadows_enabled;

        self.pixels
            .par_chunks_mut(width as usize)
            .enumerate()
            .for_each(|(py, row)| {
                for (px, pixel) in row.iter_mut().enumerate() {
                    let camera_space =
                        pixel_to_camera_space(px as u32, py as u32, width, height, tan_fov, aspect_ratio);
                    let direction = camera_to_world.transform_vector(camera_space).normalize();
                    let view_ray = Ray::new(camera_origin, direction);

                    let closest_hit = scene.get_closest_hit(&view_ray);
                    // a miss still shades material 0, which acts as the
                    // background color
                    let mut final_color =
                        scene.materials[closest_hit.material_index].shade().max_to_one();

                    if closest_hit.did_hit && shadows_enabled {
                        for light in &scene.lights {
                            if light_occluded(scene, &closest_hit, light) {
                                final_color *= SHADOW_DARKENING;
                            }
                        }
                    }

                    *pixel = pack_color(final_color);
                }
            });

        Ok(())
    }

    /// Write the current framebuffer to the fixed snapshot filename.
    /// A failed write is recoverable and reported; it never aborts
    /// rendering.
    pub fn save_buffer_to_image(&self) -> Result<(), RenderError> {
        self.save_to(BUFFER_SNAPSHOT_FILENAME)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), RenderError> {
        let mut buffer: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::new(self.width, self.height);
        for (x, y, pixel) in buffer.enumerate_pixels_mut() {
            let packed = self.pixels[(x + y * self.width) as usize];
            *pixel = Rgb([(packed >> 16) as u8, (packed >> 8) as u8, packed as u8]);
        }
        buffer.save(path)?;
        Ok(())
    }
}

/// Map a pixel center to its unnormalized camera-space ray direction.
/// Image-space (0,0) sits at the top left with Y growing downward; the
/// camera-space Y axis grows upward, hence the flip in `cy`.
fn pixel_to_camera_space(
    px: u32,
    py: u32,
    width: u32,
    height: u32,
    tan_fov: f64,
    aspect_ratio: f64,
) -> Vec3 {
    let cx = ((2.0 * (px as f64 + 0.5) - width as f64) / height as f64) * tan_fov * aspect_ratio;
    let cy = ((height as f64 - 2.0 * (py as f64 + 0.5)) / height as f64) * tan_fov;
    Vec3::x_axis() * cx + Vec3::y_axis() * cy + Vec3::z_axis()
}

/// Shadow protocol: offset the origin along the surface normal, aim at the
/// light, and any-hit test the half-open range up to (not including) the
/// light's distance.
fn light_occluded(scene: &Scene, hit: &HitRecord, light: &Light) -> bool {
    let shadow_origin = hit.origin + hit.normal * (2.0 * SHADOW_EPSILON);
    let to_light = light.direction_to_light(shadow_origin);
    let distance_to_light = to_light.len();
    let shadow_ray = Ray::with_range(
        shadow_origin,
        to_light / distance_to_light,
        SHADOW_EPSILON,
        distance_to_light,
    );
    scene.does_hit(&shadow_ray)
}

fn pack_color(color: Vec3) -> u32 {
    let r = channel_to_byte(color.x);
    let g = channel_to_byte(color.y);
    let b = channel_to_byte(color.z);
    (r << 16) | (g << 8) | b
}

fn channel_to_byte(value: f64) -> u32 {
    min((value * 255.0) as u32, 255)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raytracing::camera::Camera;
    use crate::raytracing::core::{Material, SceneObject, Solid};

    const TOLERANCE: f64 = 1e-9;

    fn empty_scene() -> Scene {
        let mut scene = Scene::new(Camera::new(Vec3::zero(), 90.0));
        scene.materials.push(Material::default_background());
        scene
    }

    fn white_sphere_scene() -> Scene {
        let mut scene = empty_scene();
        scene.materials.push(Material::SolidColor {
            color: Vec3::one(),
        });
        scene.objects.push(SceneObject {
            solid: Solid::Sphere {
                center: Vec3::new(0.0, 0.0, 4.0),
                radius: 1.0,
            },
            material_index: 1,
        });
        scene.lights.push(Light {
            position: Vec3::new(0.0, 5.0, 3.0),
            color: Vec3::one(),
            intensity: 25.0,
        });
        scene
    }

    fn center_pixel(renderer: &Renderer) -> u32 {
        let width = renderer.width();
        let height = renderer.height();
        renderer.framebuffer()[(width / 2 + (height / 2) * width) as usize]
    }

    #[test]
    fn center_pixel_has_no_camera_space_offset() {
        // with an odd raster the middle pixel center maps exactly onto the
        // optical axis, whatever the fov or aspect
        for (width, height, fov) in [(101, 101, 90.0), (641, 481, 45.0), (3, 7, 120.0)] {
            let tan_fov = (f64::to_radians(fov) / 2.0).tan();
            let aspect_ratio = width as f64 / height as f64;
            let dir =
                pixel_to_camera_space(width / 2, height / 2, width, height, tan_fov, aspect_ratio);
            assert!(dir.x.abs() < TOLERANCE);
            assert!(dir.y.abs() < TOLERANCE);
            assert!((dir.z - 1.0).abs() < TOLERANCE);
        }
    }

    #[test]
    fn image_space_y_grows_downward() {
        let dir = pixel_to_camera_space(0, 0, 64, 64, 1.0, 1.0);
        assert!(dir.y > 0.0, "top row must map to positive camera-space y");
        assert!(dir.x < 0.0, "left column must map to negative camera-space x");
    }

    #[test]
    fn zero_sized_target_is_rejected() {
        assert!(matches!(
            Renderer::new(0, 32),
            Err(RenderError::ZeroSizedTarget { .. })
        ));
        assert!(matches!(
            Renderer::new(32, 0),
            Err(RenderError::ZeroSizedTarget { .. })
        ));
    }

    #[test]
    fn rendering_without_materials_is_rejected() {
        let scene = Scene::new(Camera::new(Vec3::zero(), 90.0));
        let mut renderer = Renderer::new(8, 8).unwrap();
        assert!(matches!(
            renderer.render(&scene),
            Err(RenderError::NoMaterials)
        ));
    }

    #[test]
    fn empty_scene_shades_every_pixel_with_material_zero() {
        let scene = empty_scene();
        let mut renderer = Renderer::new(16, 9).unwrap();
        renderer.render(&scene).unwrap();
        // default background is magenta
        assert!(renderer.framebuffer().iter().all(|&p| p == 0xFF00FF));
    }

    #[test]
    fn visible_light_leaves_the_sphere_fully_lit() {
        let scene = white_sphere_scene();
        let mut renderer = Renderer::new(33, 33).unwrap();
        renderer.render(&scene).unwrap();
        assert_eq!(center_pixel(&renderer), 0xFFFFFF);
    }

    #[test]
    fn occluded_light_halves_the_brightness() {
        let mut scene = white_sphere_scene();
        // small sphere between the hit point (0,0,3) and the light above it
        scene.objects.push(SceneObject {
            solid: Solid::Sphere {
                center: Vec3::new(0.0, 2.5, 3.0),
                radius: 0.5,
            },
            material_index: 1,
        });
        let mut renderer = Renderer::new(33, 33).unwrap();
        renderer.render(&scene).unwrap();
        assert_eq!(center_pixel(&renderer), 0x7F7F7F);
    }

    #[test]
    fn two_occluded_lights_compound_multiplicatively() {
        let mut scene = white_sphere_scene();
        scene.lights.push(Light {
            position: Vec3::new(0.0, -5.0, 3.0),
            color: Vec3::one(),
            intensity: 25.0,
        });
        for y in [2.5, -2.5] {
            scene.objects.push(SceneObject {
                solid: Solid::Sphere {
                    center: Vec3::new(0.0, y, 3.0),
                    radius: 0.5,
                },
                material_index: 1,
            });
        }
        let mut renderer = Renderer::new(33, 33).unwrap();
        renderer.render(&scene).unwrap();
        // 255 * 0.25 truncates to 63
        assert_eq!(center_pixel(&renderer), 0x3F3F3F);
    }

    #[test]
    fn disabling_shadows_skips_the_darkening() {
        let mut scene = white_sphere_scene();
        scene.objects.push(SceneObject {
            solid: Solid::Sphere {
                center: Vec3::new(0.0, 2.5, 3.0),
                radius: 0.5,
            },
            material_index: 1,
        });
        let mut renderer = Renderer::new(33, 33).unwrap();
        renderer.process_event(InputEvent::ToggleShadows).unwrap();
        assert!(!renderer.shadows_enabled());
        renderer.render(&scene).unwrap();
        assert_eq!(center_pixel(&renderer), 0xFFFFFF);
    }

    #[test]
    fn render_is_idempotent_without_scene_mutation() {
        let scene = white_sphere_scene();
        let mut renderer = Renderer::new(41, 27).unwrap();
        renderer.render(&scene).unwrap();
        let first = renderer.framebuffer().to_vec();
        renderer.render(&scene).unwrap();
        assert_eq!(first, renderer.framebuffer());
    }

    #[test]
    fn light_exactly_at_shadow_range_is_not_self_occluding() {
        // a lone sphere and a light touching its surface along the normal:
        // the shadow ray's half-open range must not report occlusion
        let mut scene = empty_scene();
        scene.objects.push(SceneObject {
            solid: Solid::Sphere {
                center: Vec3::new(0.0, 0.0, 4.0),
                radius: 1.0,
            },
            material_index: 0,
        });
        let hit = scene.get_closest_hit(&Ray::new(Vec3::zero(), Vec3::z_axis()));
        assert!(hit.did_hit);
        let shadow_origin = hit.origin + hit.normal * (2.0 * SHADOW_EPSILON);
        let light = Light {
            position: shadow_origin + hit.normal * 0.5,
            color: Vec3::one(),
            intensity: 1.0,
        };
        assert!(!light_occluded(&scene, &hit, &light));
    }

    #[test]
    fn lighting_mode_cycles_back_after_four_steps() {
        let mut renderer = Renderer::new(4, 4).unwrap();
        assert_eq!(renderer.lighting_mode(), LightingMode::ObservedArea);
        let expected = [
            LightingMode::Radiance,
            LightingMode::Brdf,
            LightingMode::Combined,
            LightingMode::ObservedArea,
        ];
        for mode in expected {
            renderer.process_event(InputEvent::CycleLightingMode).unwrap();
            assert_eq!(renderer.lighting_mode(), mode);
        }
    }

    #[test]
    fn shadow_toggle_actually_flips_the_flag() {
        let mut renderer = Renderer::new(4, 4).unwrap();
        assert!(renderer.shadows_enabled());
        renderer.process_event(InputEvent::ToggleShadows).unwrap();
        assert!(!renderer.shadows_enabled());
        renderer.process_event(InputEvent::ToggleShadows).unwrap();
        assert!(renderer.shadows_enabled());
    }

    #[test]
    fn moved_camera_sees_the_sphere_through_its_transform() {
        // look straight down at the sphere: the hit moves to its top and the
        // light stays visible there; looking along world up also runs the
        // degenerate-basis fallback through a whole frame
        let mut scene = white_sphere_scene();
        scene.camera = Camera::look_at(Vec3::new(0.0, 4.0, 4.0), Vec3::new(0.0, 0.0, 4.0), 90.0);
        let mut renderer = Renderer::new(33, 33).unwrap();
        renderer.render(&scene).unwrap();
        assert_eq!(center_pixel(&renderer), 0xFFFFFF);
    }
}
