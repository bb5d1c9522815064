use anyhow::{Context, Result};
use glam::vec2;
use image::Rgba;
use lightmap2d::surface::{BlendMode, Rect};
use lightmap2d::{DrawOutcome, LightSource, LightingConfig, LightingContext, Occluder};

const VIEWPORT: (u32, u32) = (1280, 800);

fn paint_scene(scene: &mut lightmap2d::Surface) {
    let tile = 32;
    for ty in 0..scene.height().div_ceil(tile) {
        for tx in 0..scene.width().div_ceil(tile) {
            let shade = if (tx + ty) % 2 == 0 { 190 } else { 150 };
            scene.fill_rect(
                Rect::new((tx * tile) as i32, (ty * tile) as i32, tile, tile),
                Rgba([shade, shade, shade, 255]),
                BlendMode::Opaque,
            );
        }
    }

    // Translucent floor decal over the checkerboard
    scene.fill_rect(
        Rect::new(scene.width() as i32 / 4, scene.height() as i32 * 2 / 3, scene.width() / 2, tile),
        Rgba([40, 90, 200, 110]),
        BlendMode::Alpha,
    );
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info,lightmap2d=debug"))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => LightingConfig::load(&path).with_context(|| format!("loading config {}", path))?,
        None => LightingConfig {
            internal_width: 640,
            internal_height: 360,
            ..Default::default()
        },
    };

    let mut ctx = LightingContext::new(config)?;
    let (width, height) = ctx.internal_resolution();
    let center = vec2(width as f32 * 0.5, height as f32 * 0.5);

    let lights = vec![
        LightSource::new(center, 140.0, Rgba([255, 220, 160, 255]), 1.0),
        LightSource::new(center + vec2(-200.0, 60.0), 90.0, Rgba([80, 140, 255, 255]), 1.4),
        LightSource::new(center + vec2(210.0, -80.0), 70.0, Rgba([255, 60, 60, 255]), 1.2),
    ];
    let occluders = vec![
        Occluder::rectangle(center + vec2(60.0, 10.0), vec2(12.0, 30.0)),
        Occluder::segment(vec2(-40.0, -20.0), vec2(-10.0, -60.0)).with_position(center),
    ];

    paint_scene(ctx.begin_frame());
    let frame = ctx.end_frame(&lights, &occluders, VIEWPORT)?;
    frame.save_png("frame.png")?;
    println!("✓ Wrote frame.png ({}x{})", frame.width(), frame.height());

    if let Some(lightmap) = ctx.lightmap().lightmap() {
        lightmap.save_png("lightmap.png")?;
        println!("✓ Wrote lightmap.png ({}x{})", lightmap.width(), lightmap.height());
    }

    match ctx.last_outcome() {
        Some(DrawOutcome::Drawn(stats)) => println!("✓ Lightmap: {:?}", stats),
        Some(DrawOutcome::Skipped(reason)) => println!("✗ Lightmap skipped: {}", reason),
        None => {}
    }
    println!("✓ Kernel cache: {:?}", ctx.lightmap().kernel_cache_stats());

    ctx.shutdown();
    Ok(())
}
