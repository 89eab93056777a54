use bullseye_cli::{configure, draw_keypoints, run_detection};
use bullseye_detect::synthetic::{render_bullseye, BullseyeTarget};
use bullseye_detect::DetectorConfig;
use image::GrayImage;
use std::time::Instant;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Bullseye detection demo");
    println!("=======================\n");

    let (rows, columns) = (160usize, 220usize);
    let config = DetectorConfig::reference_preset();

    // Three dark-centred markers and one inverted marker on a gradient,
    // centred between pixels and anti-aliased.
    let mut buffer = vec![0u8; rows * columns];
    for row in 0..rows {
        for column in 0..columns {
            buffer[row * columns + column] = 80 + (column * 60 / columns) as u8;
        }
    }
    for &(row, column, dark_center) in &[(40.0, 40.0, true), (40.3, 150.6, true), (110.5, 60.2, false), (114.8, 179.7, true)] {
        let target = BullseyeTarget {
            dark_center,
            ..BullseyeTarget::for_config(&config.core, row, column)
        };
        render_bullseye(&mut buffer, rows, columns, &target, 4);
    }
    let image = GrayImage::from_raw(columns as u32, rows as u32, buffer).ok_or("buffer size mismatch")?;

    for preset in [DetectorConfig::reference_preset(), DetectorConfig::strict_preset()] {
        println!("{}", preset.summary());
        let detector = configure(preset.clone())?;

        let t0 = Instant::now();
        let report = run_detection(&detector, preset, &image)?;
        println!("  took {:.2?}", t0.elapsed());
        print!("{}", report.to_text());
    }

    let detector = configure(config.clone())?;
    let report = run_detection(&detector, config.clone(), &image)?;
    let dir = std::env::temp_dir();
    draw_keypoints(&image, &report).save(dir.join("bullseye_demo.png"))?;
    config.save_toml(dir.join("bullseye_demo.toml"))?;
    println!("\nOverlay and configuration written to {}", dir.display());

    Ok(())
}
