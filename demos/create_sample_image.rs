use image::{Rgb, RgbImage};

fn main() {
    let mut img = RgbImage::new(800, 600);

    // Soil with a slight gradient
    for y in 0..600 {
        for x in 0..800 {
            let r = 110 + (x * 30 / 800) as u8;
            let g = 75 + (y * 20 / 600) as u8;
            img.put_pixel(x, y, Rgb([r, g, 45]));
        }
    }

    // Five round plants of different sizes, plus a speck too small to count
    let plants = [(120, 140, 40), (400, 120, 30), (650, 180, 45), (220, 420, 35), (560, 450, 25)];
    for (cx, cy, radius) in plants {
        for y in cy - radius..=cy + radius {
            for x in cx - radius..=cx + radius {
                let dx = x as i32 - cx as i32;
                let dy = y as i32 - cy as i32;
                if dx * dx + dy * dy <= (radius * radius) as i32 {
                    img.put_pixel(x, y, Rgb([50, 190, 70]));
                }
            }
        }
    }
    img.put_pixel(700, 520, Rgb([50, 190, 70]));

    img.save("sample_field.png").unwrap();
    println!("Created sample_field.png (800x600, 5 plants)");
}
