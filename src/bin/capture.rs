use gds820::{Device, Image, Theme, IMAGE_WIDTH, IMAGE_HEIGHT};

fn main() -> gds820::Result<()> {
    env_logger::init();
    let mut args = std::env::args().skip(1);
    let Some(device_path) = args.next() else {
        eprintln!("usage: gds820-capture <device> [output.png] [theme]");
        std::process::exit(2);
    };
    let output_path = args.next().unwrap_or_else(|| "capture.png".to_owned());
    let theme_name = args.next().unwrap_or_else(|| "device".to_owned());
    let Some(theme) = Theme::find(&theme_name) else {
        eprintln!("no theme named {:?}; themes: {}", theme_name,
            gds820::THEMES.map(|theme| theme.name).join(", "));
        std::process::exit(2);
    };

    let mut device = Device::open(&device_path)?;
    let frame = device.acquire()?;
    let mut image = Image::new();
    gds820::unpack(&frame, theme, &mut image);
    image::save_buffer(&output_path, image.as_bytes(),
            IMAGE_WIDTH as u32, IMAGE_HEIGHT as u32,
            image::ExtendedColorType::Rgb8)
        .expect("failed to write image");
    println!("saved screen capture to {}", output_path);
    Ok(())
}
