//! Exact Euclidean distance transform.
//!
//! Two separable passes of the lower-envelope-of-parabolas algorithm
//! (Felzenszwalb & Huttenlocher): rows first, then columns on a transposed
//! copy so both passes run over contiguous memory.

use common::Buffer2;
use rayon::prelude::*;

use crate::image::Mask;

/// Distance from every pixel to the nearest zero pixel of `mask`.
///
/// Zero pixels get 0. If the mask has no zero pixel, every distance is
/// `f32::INFINITY`.
pub fn distance_transform(mask: &Mask) -> Buffer2<f32> {
    let (width, height) = mask.size();
    if mask.is_empty() {
        return Buffer2::new_default(width, height);
    }

    let mut squared: Buffer2<f64> = mask.map(|&v| if v == 0 { 0.0 } else { f64::INFINITY });
    squared_edt_rows(&mut squared);
    let mut columns = transpose(&squared);
    squared_edt_rows(&mut columns);

    Buffer2::from_fn(width, height, |x, y| columns[(y, x)].sqrt() as f32)
}

fn squared_edt_rows(buffer: &mut Buffer2<f64>) {
    let width = buffer.width();
    buffer.pixels_mut().par_chunks_mut(width).for_each_init(
        || (Vec::with_capacity(width), Vec::new(), Vec::new()),
        |(input, sites, bounds), row| {
            input.clear();
            input.extend_from_slice(row);
            squared_edt_1d(input, row, sites, bounds);
        },
    );
}

fn transpose(src: &Buffer2<f64>) -> Buffer2<f64> {
    Buffer2::from_fn(src.height(), src.width(), |x, y| src[(y, x)])
}

/// Squared distance transform of one line of sampled costs `f`.
///
/// `sites` and `bounds` are scratch: the parabola apexes of the lower envelope
/// and the position where each one starts to dominate.
fn squared_edt_1d(f: &[f64], out: &mut [f64], sites: &mut Vec<usize>, bounds: &mut Vec<f64>) {
    sites.clear();
    bounds.clear();

    for q in 0..f.len() {
        if f[q].is_infinite() {
            continue;
        }
        let apex_q = f[q] + (q * q) as f64;
        loop {
            let Some(&p) = sites.last() else {
                sites.push(q);
                bounds.push(f64::NEG_INFINITY);
                break;
            };
            let apex_p = f[p] + (p * p) as f64;
            let s = (apex_q - apex_p) / (2.0 * (q - p) as f64);
            if s <= bounds[bounds.len() - 1] {
                sites.pop();
                bounds.pop();
            } else {
                sites.push(q);
                bounds.push(s);
                break;
            }
        }
    }

    if sites.is_empty() {
        out.fill(f64::INFINITY);
        return;
    }

    let mut k = 0;
    for (q, value) in out.iter_mut().enumerate() {
        while k + 1 < sites.len() && bounds[k + 1] < q as f64 {
            k += 1;
        }
        let d = q as f64 - sites[k] as f64;
        *value = d * d + f[sites[k]];
    }
}
