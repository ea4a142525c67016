//! Check external tool availability.

use vidframe_capture_engine::FfmpegEncoderFactory;
use vidframe_common::config::AppConfig;
use vidframe_media_source::command_exists;

pub async fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Vidframe System Check");
    println!("{}", "=".repeat(50));

    let ffmpeg = &config.ffmpeg.ffmpeg;
    let ffprobe = &config.ffmpeg.ffprobe;
    let mut ready = true;

    let mut ffmpeg_found = false;
    for (label, binary) in [("ffmpeg", ffmpeg), ("ffprobe", ffprobe)] {
        let found = command_exists(binary).await;
        if label == "ffmpeg" {
            ffmpeg_found = found;
        }
        if found {
            println!("[OK] {label}: {}", binary.display());
        } else {
            println!("[FAIL] {label}: {} not found", binary.display());
            ready = false;
        }
    }

    if ffmpeg_found {
        match FfmpegEncoderFactory::new(ffmpeg).negotiate().await {
            Ok(codec) => println!(
                "[OK] Capture codec: {} ({})",
                codec.label(),
                codec.mime_type()
            ),
            Err(e) => {
                println!("[FAIL] Capture codec: {e}");
                ready = false;
            }
        }
    }

    println!("[OK] Output directory: {}", config.output_dir.display());

    println!();
    if ready {
        println!("All required tools are available. Vidframe is ready.");
    } else {
        println!("Some required tools are missing. Install ffmpeg and try again.");
    }
    Ok(())
}
