//! Check encoder and font setup.

use shortmaker_common::config::AppConfig;
use shortmaker_render_engine::process::command_exists;
use shortmaker_render_engine::HardwareSupport;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("ShortMaker System Check");
    println!("{}", "=".repeat(50));

    let ffmpeg_ok = command_exists(&config.render.ffmpeg);
    if ffmpeg_ok {
        println!("[OK]   ffmpeg: {}", config.render.ffmpeg);
    } else {
        println!("[FAIL] ffmpeg: '{}' not found on PATH", config.render.ffmpeg);
    }

    if command_exists(&config.render.ffprobe) {
        println!("[OK]   ffprobe: {}", config.render.ffprobe);
    } else {
        println!(
            "[WARN] ffprobe: '{}' not found; batch clips are not checked against the video length",
            config.render.ffprobe
        );
    }

    match HardwareSupport::detect(&config.render) {
        HardwareSupport::Available { device } => {
            println!("[OK]   VAAPI: {} (h264_vaapi)", device.display())
        }
        HardwareSupport::Unavailable { reason } => {
            println!("[WARN] VAAPI: {reason}; clips will encode with libx264")
        }
    }

    match config.render.resolve_font() {
        Some(font) => println!("[OK]   Font: {}", font.display()),
        None => println!("[WARN] Font: none of the candidates exist; using ffmpeg default"),
    }

    match &config.face_detector {
        Some(detector) if command_exists(&detector.program) => {
            println!("[OK]   Face detector: {}", detector.program)
        }
        Some(detector) => println!(
            "[WARN] Face detector: '{}' not found; crops will be centered",
            detector.program
        ),
        None => println!("[INFO] Face detector: not configured; crops will be centered"),
    }

    println!();
    if ffmpeg_ok {
        println!("ShortMaker is ready.");
        Ok(())
    } else {
        anyhow::bail!("ffmpeg is required")
    }
}
