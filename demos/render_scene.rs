use std::io::Cursor;

use vgport::{
    ArcStroke, DrawStatus, DrawTarget, EngineConfig, FillDesc, GradientRamp, LineStroke,
    PixelBuffer, Point, Rect, Renderer, Rgba8, Rgba8Premul,
};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cfg = EngineConfig::default().with_env_overrides();
    let mut renderer = Renderer::accelerated(cfg)?;
    let mut dst = PixelBuffer::new_rgba(256, 160)?;
    dst.fill(Rgba8Premul::from_array([16, 16, 24, 255]));

    let statuses = {
        let mut t = DrawTarget::new(&mut dst);
        let ramp = GradientRamp::two_stop(Rgba8::rgb(250, 120, 20), Rgba8::rgb(40, 60, 220));
        [
            renderer.draw_rect(
                &mut t,
                Rect::new(16.0, 16.0, 240.0, 144.0),
                24.0,
                &FillDesc::linear(Point::new(16.0, 0.0), Point::new(240.0, 0.0), ramp),
            ),
            renderer.draw_border(
                &mut t,
                Rect::new(16.0, 16.0, 240.0, 144.0),
                24.0,
                4.0,
                &FillDesc::solid(Rgba8::WHITE),
            ),
            renderer.draw_arc(
                &mut t,
                Point::new(128.0, 80.0),
                48.0,
                &ArcStroke {
                    width: 10.0,
                    start_angle: -1.2,
                    sweep: 4.5,
                    rounded: true,
                },
                &FillDesc::solid(Rgba8::new(255, 255, 255, 200)),
            ),
            renderer.draw_line(
                &mut t,
                Point::new(40.0, 130.0),
                Point::new(216.0, 30.0),
                &LineStroke::new(3.0),
                &FillDesc::solid(Rgba8::rgb(20, 20, 20)),
            ),
        ]
    };
    renderer.finish(&mut dst)?;
    let drawn = statuses.iter().filter(|s| **s == DrawStatus::Drawn).count();
    println!("{drawn}/{} draws issued", statuses.len());

    let img = image::RgbaImage::from_raw(dst.width(), dst.height(), dst.to_packed_vec())
        .ok_or_else(|| anyhow::anyhow!("buffer size mismatch"))?;
    let mut png = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)?;
    let out = std::env::temp_dir().join("vgport_scene.png");
    std::fs::write(&out, &png)?;
    println!("wrote {}", out.display());
    Ok(())
}
