//! Separable Gaussian blur on premultiplied RGBA8.

use vidframe_common::error::{VidframeError, VidframeResult};

/// Kernel radius covering ±3σ.
pub fn kernel_radius(sigma: f32) -> u32 {
    if !sigma.is_finite() || sigma <= 0.0 {
        return 0;
    }
    (sigma * 3.0).ceil() as u32
}

/// Blur a premultiplied RGBA8 buffer. Edges clamp.
pub fn gaussian_blur_premul(
    src: &[u8],
    width: u32,
    height: u32,
    sigma: f32,
) -> VidframeResult<Vec<u8>> {
    let expected_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| VidframeError::render("blur buffer size overflow"))?;
    if src.len() != expected_len {
        return Err(VidframeError::render(
            "blur expects a buffer of width*height*4 bytes",
        ));
    }

    let radius = kernel_radius(sigma);
    if radius == 0 || width == 0 || height == 0 {
        return Ok(src.to_vec());
    }

    let kernel = gaussian_kernel_q16(radius, sigma);
    let mut tmp = vec![0u8; expected_len];
    let mut out = vec![0u8; expected_len];
    horizontal_pass(src, &mut tmp, width, height, &kernel);
    vertical_pass(&tmp, &mut out, width, height, &kernel);
    Ok(out)
}

/// Normalized weights in 16.16 fixed point summing to exactly `1 << 16`.
fn gaussian_kernel_q16(radius: u32, sigma: f32) -> Vec<u32> {
    let r = radius as i32;
    let denom = 2.0 * f64::from(sigma) * f64::from(sigma);
    let weights_f: Vec<f64> = (-r..=r)
        .map(|i| {
            let x = f64::from(i);
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = weights_f.iter().sum();

    let mut weights: Vec<u32> = weights_f
        .iter()
        .map(|w| ((w / sum) * 65536.0).round().clamp(0.0, 65536.0) as u32)
        .collect();
    let acc: i64 = weights.iter().map(|&w| i64::from(w)).sum();
    let mid = weights.len() / 2;
    weights[mid] = (i64::from(weights[mid]) + 65536 - acc).clamp(0, 65536) as u32;
    weights
}

fn horizontal_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    for y in 0..height as i32 {
        let row = (y * w) as usize;
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let sx = (x + ki as i32 - radius).clamp(0, w - 1);
                let idx = (row + sx as usize) * 4;
                for (c, slot) in acc.iter_mut().enumerate() {
                    *slot += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out = (row + x as usize) * 4;
            for (c, value) in acc.iter().enumerate() {
                dst[out + c] = q16_to_u8(*value);
            }
        }
    }
}

fn vertical_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let h = height as i32;
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let sy = (y + ki as i32 - radius).clamp(0, h - 1);
                let idx = ((sy * w + x) as usize) * 4;
                for (c, slot) in acc.iter_mut().enumerate() {
                    *slot += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out = ((y * w + x) as usize) * 4;
            for (c, value) in acc.iter().enumerate() {
                dst[out + c] = q16_to_u8(*value);
            }
        }
    }
}

fn q16_to_u8(acc: u64) -> u8 {
    ((acc + 32768) >> 16).min(255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_sigma_is_identity() {
        let src = vec![1u8, 2, 3, 4, 5, 6, 7, 8];
        assert_eq!(gaussian_blur_premul(&src, 1, 2, 0.0).unwrap(), src);
    }

    #[test]
    fn test_uniform_image_is_unchanged() {
        let src = [0u8, 0, 0, 180].repeat(6 * 5);
        assert_eq!(gaussian_blur_premul(&src, 6, 5, 1.5).unwrap(), src);
    }

    #[test]
    fn test_kernel_sums_to_one() {
        for sigma in [0.5f32, 2.0, 9.0] {
            let kernel = gaussian_kernel_q16(kernel_radius(sigma), sigma);
            assert_eq!(kernel.iter().sum::<u32>(), 1 << 16);
        }
    }

    #[test]
    fn test_edge_is_softened() {
        let (w, h) = (9u32, 1u32);
        let mut src = vec![0u8; (w * h * 4) as usize];
        for px in src.chunks_exact_mut(4).take(4) {
            px.copy_from_slice(&[0, 0, 0, 255]);
        }
        let out = gaussian_blur_premul(&src, w, h, 1.0).unwrap();
        let alpha: Vec<u8> = out.chunks_exact(4).map(|px| px[3]).collect();
        assert!(alpha[3] < 255 && alpha[3] > 128);
        assert!(alpha[4] > 0 && alpha[4] < 128);
        assert_eq!(alpha[0], 255);
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert!(gaussian_blur_premul(&[0u8; 7], 1, 2, 1.0).is_err());
    }
}
