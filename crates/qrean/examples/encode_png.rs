use qrean::{EncodeOptions, QreanRuntime, RuntimeConfig, SessionConfig};

#[cfg(feature = "tracing")]
use qrean::core::init_tracing;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "tracing")]
    init_tracing(false);
    #[cfg(not(feature = "tracing"))]
    qrean::core::init_with_level(log::LevelFilter::Info)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [wasm, text, out, rest @ ..] = args.as_slice() else {
        eprintln!("Usage: encode_png <engine.wasm> <text> <out.png> [options.json]");
        return Ok(());
    };

    // e.g. {"symbology": "mQR", "dataMode": "8BIT", "scale": 4}
    let options: EncodeOptions = match rest.first() {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => EncodeOptions::default(),
    };

    let runtime = QreanRuntime::from_file(wasm, RuntimeConfig::default())?;
    let mut session = runtime.session(SessionConfig::default())?;
    match session.encode(text, &options)? {
        Some(img) => {
            img.to_rgba_image()?.save(out)?;
            println!("wrote {}x{} symbol to {out}", img.width(), img.height());
        }
        None => println!("engine could not encode {text:?} with these options"),
    }

    Ok(())
}
