//! Geometric transforms shared by the augmentation engine.
//!
//! Pixel warps and the matching coordinate-space transforms: box corners
//! are carried through the same 3x3 matrix used for pixels, so annotations
//! never drift from the image.

use image::{ImageBuffer, Rgb, RgbImage};
use nalgebra::{Matrix3, Point2, Vector3};

/// Apply a projective warp to an RGB image.
///
/// Output canvas is `out_width` x `out_height`; pixels mapping outside the
/// source are filled with `fill`.
pub fn warp_image(
    img: &RgbImage,
    matrix: &Matrix3<f32>,
    out_width: u32,
    out_height: u32,
    fill: Rgb<u8>,
) -> RgbImage {
    let mut output = ImageBuffer::from_pixel(out_width, out_height, fill);
    let inv_matrix = matrix.try_inverse().unwrap_or_else(Matrix3::identity);

    for y in 0..out_height {
        for x in 0..out_width {
            // Map output pixel (x, y) back to source image
            let dst_point = Vector3::new(x as f32, y as f32, 1.0);
            let src_point_h = inv_matrix * dst_point;

            // Normalize homogeneous coordinates
            let z = src_point_h.z;
            if z.abs() < 1e-6 {
                continue;
            }

            let src_x = src_point_h.x / z;
            let src_y = src_point_h.y / z;

            // Bilinear interpolation
            if let Some(pixel) = bilinear_sample(img, src_x, src_y) {
                output.put_pixel(x, y, pixel);
            }
        }
    }
    output
}

/// Map a single point through a projective matrix.
///
/// Returns `None` for degenerate homogeneous coordinates.
pub fn transform_point(matrix: &Matrix3<f32>, point: Point2<f32>) -> Option<Point2<f32>> {
    let h = matrix * Vector3::new(point.x, point.y, 1.0);
    if h.z.abs() < 1e-6 {
        return None;
    }
    Some(Point2::new(h.x / h.z, h.y / h.z))
}

/// Map an axis-aligned box `[x1, y1, x2, y2]` through a projective matrix.
///
/// All four corners go through the matrix, then the enclosing axis-aligned
/// box is recomputed. Returns `None` when any corner is degenerate.
pub fn transform_bbox(matrix: &Matrix3<f32>, bbox: [f32; 4]) -> Option<[f32; 4]> {
    let [x1, y1, x2, y2] = bbox;
    let corners = [
        Point2::new(x1, y1),
        Point2::new(x2, y1),
        Point2::new(x2, y2),
        Point2::new(x1, y2),
    ];

    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;

    for corner in corners {
        let mapped = transform_point(matrix, corner)?;
        min_x = min_x.min(mapped.x);
        min_y = min_y.min(mapped.y);
        max_x = max_x.max(mapped.x);
        max_y = max_y.max(mapped.y);
    }

    Some([min_x, min_y, max_x, max_y])
}

/// Rotation about an arbitrary center: T(c) * R(angle) * T(-c).
pub fn rotation_about_center(angle_rad: f32, cx: f32, cy: f32) -> Matrix3<f32> {
    let (sin, cos) = angle_rad.sin_cos();
    let rotate = Matrix3::new(cos, -sin, 0.0, sin, cos, 0.0, 0.0, 0.0, 1.0);
    let to_origin = Matrix3::new(1.0, 0.0, -cx, 0.0, 1.0, -cy, 0.0, 0.0, 1.0);
    let from_origin = Matrix3::new(1.0, 0.0, cx, 0.0, 1.0, cy, 0.0, 0.0, 1.0);
    from_origin * rotate * to_origin
}

/// Compute Homography Matrix mapping src_points to dst_points.
/// Uses 4 corresponding points (standard DLT, solved via SVD).
pub fn find_homography(src: [Point2<f32>; 4], dst: [Point2<f32>; 4]) -> Option<Matrix3<f32>> {
    let mut matrix_a = nalgebra::DMatrix::<f32>::zeros(8, 9);

    for i in 0..4 {
        let x = src[i].x;
        let y = src[i].y;
        let u = dst[i].x;
        let v = dst[i].y;

        matrix_a[(i * 2, 0)] = -x;
        matrix_a[(i * 2, 1)] = -y;
        matrix_a[(i * 2, 2)] = -1.0;
        matrix_a[(i * 2, 3)] = 0.0;
        matrix_a[(i * 2, 4)] = 0.0;
        matrix_a[(i * 2, 5)] = 0.0;
        matrix_a[(i * 2, 6)] = x * u;
        matrix_a[(i * 2, 7)] = y * u;
        matrix_a[(i * 2, 8)] = u;

        matrix_a[(i * 2 + 1, 0)] = 0.0;
        matrix_a[(i * 2 + 1, 1)] = 0.0;
        matrix_a[(i * 2 + 1, 2)] = 0.0;
        matrix_a[(i * 2 + 1, 3)] = -x;
        matrix_a[(i * 2 + 1, 4)] = -y;
        matrix_a[(i * 2 + 1, 5)] = -1.0;
        matrix_a[(i * 2 + 1, 6)] = x * v;
        matrix_a[(i * 2 + 1, 7)] = y * v;
        matrix_a[(i * 2 + 1, 8)] = v;
    }

    // Solve using SVD: the solution is the right singular vector with the
    // smallest singular value, i.e. the last row of V^T.
    let svd = matrix_a.svd(false, true);
    if let Some(v_t) = svd.v_t {
        if v_t.nrows() < 9 {
            return None;
        }

        let h_vec = v_t.row(8);

        let h = Matrix3::new(
            h_vec[0], h_vec[1], h_vec[2],
            h_vec[3], h_vec[4], h_vec[5],
            h_vec[6], h_vec[7], h_vec[8],
        );

        // Normalize so h[8] is 1 (if not zero)
        if h[8].abs() > 1e-6 {
            return Some(h / h[8]);
        }
        return Some(h);
    }

    None
}

fn bilinear_sample(img: &RgbImage, x: f32, y: f32) -> Option<Rgb<u8>> {
    let width = img.width() as f32;
    let height = img.height() as f32;

    if x < 0.0 || x >= width - 1.0 || y < 0.0 || y >= height - 1.0 {
        return None; // Caller keeps the fill color
    }

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = x0 + 1;
    let y1 = y0 + 1;

    let dx = x - x0 as f32;
    let dy = y - y0 as f32;

    let p00 = img.get_pixel(x0, y0).0;
    let p10 = img.get_pixel(x1, y0).0;
    let p01 = img.get_pixel(x0, y1).0;
    let p11 = img.get_pixel(x1, y1).0;

    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = p00[c] as f32 * (1.0 - dx) + p10[c] as f32 * dx;
        let bottom = p01[c] as f32 * (1.0 - dx) + p11[c] as f32 * dx;
        out[c] = (top * (1.0 - dy) + bottom * dy).round().clamp(0.0, 255.0) as u8;
    }

    Some(Rgb(out))
}
