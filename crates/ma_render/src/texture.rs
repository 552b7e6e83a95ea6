pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub size: (u32, u32),
}

impl Texture {
    /// Decode an encoded image (PNG) and upload it.
    pub fn from_bytes(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bytes: &[u8],
        label: &str,
    ) -> Result<Self, String> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| format!("Failed to decode texture '{label}': {e}"))?
            .to_rgba8();
        let (width, height) = image.dimensions();
        Ok(Self::from_rgba8(device, queue, &image, width, height, label))
    }

    pub fn from_rgba8(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: &[u8],
        width: u32,
        height: u32,
        label: &str,
    ) -> Self {
        let extent = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            extent,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            size: (width, height),
        }
    }
}

/// RGBA8 pixels of a filled white disc on a transparent square.
/// Tinted by vertex color, it stands in for sprites whose image is missing.
pub fn circle_rgba(diameter: u32) -> Vec<u8> {
    let d = diameter.max(1);
    let radius = d as f32 * 0.5;
    let mut pixels = Vec::with_capacity((d * d * 4) as usize);
    for y in 0..d {
        for x in 0..d {
            let dx = x as f32 + 0.5 - radius;
            let dy = y as f32 + 0.5 - radius;
            // One pixel of soft edge.
            let coverage = (radius - (dx * dx + dy * dy).sqrt()).clamp(0.0, 1.0);
            pixels.extend_from_slice(&[255, 255, 255, (coverage * 255.0) as u8]);
        }
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_has_expected_size_and_shape() {
        let d = 16;
        let pixels = circle_rgba(d);
        assert_eq!(pixels.len(), (d * d * 4) as usize);

        let alpha = |x: u32, y: u32| pixels[((y * d + x) * 4 + 3) as usize];
        assert_eq!(alpha(8, 8), 255, "center is opaque");
        assert_eq!(alpha(0, 0), 0, "corner is transparent");
    }

    #[test]
    fn zero_diameter_still_produces_a_pixel() {
        assert_eq!(circle_rgba(0).len(), 4);
    }
}
