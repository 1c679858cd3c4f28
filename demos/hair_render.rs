use std::{
    f32::consts::PI,
    time::{Duration, Instant},
};

use glam::*;
use image::{ImageBuffer, Rgba};
use obvhs_curves::{
    epilogue::IntersectContext,
    intersector::{intersect, Precalculations},
    leaf::builder::build_leaves,
    ray::{Ray, RayHit},
    scene::{CurveSubtype, Scene},
    test_util::{geometry::hair_patch, sampling::somewhat_boring_display_transform},
    PrettyDuration, Transformable,
};

fn main() {
    // A dense patch of flat hair with a few thick round strands standing in front of it.
    let mut scene = Scene::default();
    let mut hair = hair_patch(24, 24, 4, 0.012, CurveSubtype::Flat, 8);
    hair.transform(&Mat4::from_rotation_y(0.3));
    scene.add(hair);
    let mut tubes = hair_patch(3, 1, 4, 0.04, CurveSubtype::Round, 1);
    tubes.transform(&Mat4::from_scale_rotation_translation(
        vec3(0.8, 1.1, 0.8),
        Quat::from_rotation_z(0.2),
        vec3(0.0, 0.0, 1.3),
    ));
    scene.add(tubes);

    let mut core_build_time = Duration::default();
    let start = Instant::now();
    let leaves = build_leaves(&scene, &scene.primitives(), &mut core_build_time);
    println!(
        "{} leaves built in {} (core {})",
        leaves.len(),
        PrettyDuration(start.elapsed()),
        PrettyDuration(core_build_time)
    );

    // Setup render target and camera
    let width = 640;
    let height = 480;
    let target_size = Vec2::new(width as f32, height as f32);
    let fov = 50.0f32;
    let eye = vec3a(0.0, 0.9, 4.0);
    let look_at = vec3(0.0, 0.5, 0.0);
    let light_dir = vec3a(-0.4, 0.8, 0.6).normalize();

    // Compute camera projection & view matrices
    let aspect_ratio = target_size.x / target_size.y;
    let proj_inv =
        Mat4::perspective_infinite_reverse_rh(fov.to_radians(), aspect_ratio, 0.01).inverse();
    let view_inv = Mat4::look_at_rh(eye.into(), look_at, Vec3::Y).inverse();

    let mut img: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::new(width as u32, height as u32);
    let pixels = img.as_mut();

    let mut lanes_visited = 0u64;
    let render_start = Instant::now();
    pixels.chunks_mut(4).enumerate().for_each(|(i, chunk)| {
        let frag_coord = uvec2((i % width) as u32, (i / width) as u32);
        let mut screen_uv = frag_coord.as_vec2() / target_size;
        screen_uv.y = 1.0 - screen_uv.y;
        let ndc = screen_uv * 2.0 - Vec2::ONE;
        let clip_pos = vec4(ndc.x, ndc.y, 1.0, 1.0);

        let mut vs_pos = proj_inv * clip_pos;
        vs_pos /= vs_pos.w;
        let direction = (Vec3A::from((view_inv * vs_pos).xyz()) - eye).normalize();
        let mut ray = Ray::new(eye, direction, 0.0, f32::MAX);

        // No upper BVH here, every leaf is handed the ray. The leaf slab test still skips most curves.
        let pre = Precalculations::new(&ray);
        let mut hit = RayHit::none();
        let mut context = IntersectContext::new(&scene);
        for leaf in &leaves {
            intersect(&pre, &mut ray, &mut hit, &mut context, leaf);
        }
        lanes_visited += context.stats.lanes_visited as u64;

        let color = if hit.is_hit() {
            let (base, diffuse) = match scene.get(hit.geometry_id).subtype {
                CurveSubtype::Flat => {
                    // Flat hits only carry the facing normal, fake a cylinder across the width.
                    let across = (hit.v * PI).sin();
                    (vec3a(0.45, 0.28, 0.12), 0.25 + 0.75 * across)
                }
                CurveSubtype::Round => {
                    let n = hit.ng.normalize();
                    (vec3a(0.2, 0.35, 0.6), 0.15 + n.dot(light_dir).max(0.0))
                }
            };
            somewhat_boring_display_transform(base * diffuse * 2.0)
        } else {
            vec3a(0.03, 0.03, 0.04)
        };
        let c = (color.clamp(Vec3A::ZERO, Vec3A::ONE) * 255.0).as_uvec3();
        chunk.copy_from_slice(&[c.x as u8, c.y as u8, c.z as u8, 255]);
    });
    println!(
        "rendered in {}, {:.1} lanes visited per ray",
        PrettyDuration(render_start.elapsed()),
        lanes_visited as f64 / (width * height) as f64
    );

    img.save("hair_render.png").expect("Failed to save image");
}
