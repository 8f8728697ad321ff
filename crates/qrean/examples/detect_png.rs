use image::ImageReader;
use qrean::{DetectOptions, Image, QreanRuntime, RuntimeConfig, SessionConfig};

#[cfg(feature = "tracing")]
use qrean::core::init_tracing;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "tracing")]
    init_tracing(false);
    #[cfg(not(feature = "tracing"))]
    qrean::core::init_with_level(log::LevelFilter::Info)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [wasm, path, rest @ ..] = args.as_slice() else {
        eprintln!("Usage: detect_png <engine.wasm> <image_path> [digitized.png]");
        return Ok(());
    };

    let img = Image::from(ImageReader::open(path)?.decode()?.to_rgba8());
    let runtime = QreanRuntime::from_file(wasm, RuntimeConfig::default())?;
    let mut session = runtime.session(SessionConfig::default())?;

    let found = session.detect_with(&img, &DetectOptions::default(), |hit| {
        println!("{}: {:?}", hit.symbology, hit.text);
    })?;
    println!("{} symbol(s) detected", found.events.len());
    println!("{}", serde_json::to_string_pretty(&found.events)?);

    if let Some(out) = rest.first() {
        found.digitized.to_rgba_image()?.save(out)?;
    }

    Ok(())
}
