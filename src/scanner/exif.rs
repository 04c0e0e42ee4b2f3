use image::DynamicImage;
use std::io::Cursor;

/// EXIF Orientation を読み取る（1〜8、なければNone）
pub fn read_orientation(bytes: &[u8]) -> Option<u32> {
    let exif = exif::Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;

    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
}

/// Orientation に従って画像を正立させる
pub fn apply_orientation(image: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_read_orientation_without_exif() {
        assert_eq!(read_orientation(b"not an image"), None);
    }

    #[test]
    fn test_rotation_swaps_dimensions() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(40, 10));
        let rotated = apply_orientation(image.clone(), 6);
        assert_eq!((rotated.width(), rotated.height()), (10, 40));

        let upright = apply_orientation(image, 1);
        assert_eq!((upright.width(), upright.height()), (40, 10));
    }
}
