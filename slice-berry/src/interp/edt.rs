//! 二维精确欧氏距离变换 (Felzenszwalb & Huttenlocher).
//!
//! 先沿每一列、再沿每一行做一维平方距离变换. 每个维度可以有不同的像素间距.

use ndarray::{Array2, ArrayView2, Axis};

/// "无穷远" 的替代值. 足够大, 又不会在平方运算中溢出为 `inf`.
const FAR: f64 = 1e20;

/// 一维平方距离变换, 即 `f` 的抛物线下包络. `w2` 为像素间距的平方.
///
/// `v`, `z` 是调用者提供的缓冲区, 长度分别至少为 `f.len()` 和 `f.len() + 1`.
fn edt_1d(f: &[f64], w2: f64, d: &mut [f64], v: &mut [usize], z: &mut [f64]) {
    let n = f.len();
    if n == 0 {
        return;
    }
    // 以 q 和 r 为顶点的两条抛物线的交点.
    let intersect = |q: usize, r: usize| {
        let (qf, rf) = (q as f64, r as f64);
        ((f[q] + w2 * qf * qf) - (f[r] + w2 * rf * rf)) / (2.0 * w2 * (qf - rf))
    };

    let mut k = 0;
    v[0] = 0;
    z[0] = f64::NEG_INFINITY;
    z[1] = f64::INFINITY;
    for q in 1..n {
        let mut s = intersect(q, v[k]);
        while s <= z[k] {
            k -= 1;
            s = intersect(q, v[k]);
        }
        k += 1;
        v[k] = q;
        z[k] = s;
        z[k + 1] = f64::INFINITY;
    }

    k = 0;
    for (q, out) in d.iter_mut().enumerate().take(n) {
        while z[k + 1] < q as f64 {
            k += 1;
        }
        let dq = q as f64 - v[k] as f64;
        *out = w2 * dq * dq + f[v[k]];
    }
}

/// 对二维数组的每一条 `axis` 方向的线做一维平方距离变换.
fn transform_lines(grid: &mut Array2<f64>, axis: Axis, spacing: f64) {
    let n = grid.len_of(axis);
    let w2 = spacing * spacing;
    let (mut f, mut d) = (vec![0.0; n], vec![0.0; n]);
    let (mut v, mut z) = (vec![0; n], vec![0.0; n + 1]);
    for mut line in grid.lanes_mut(axis) {
        f.iter_mut().zip(line.iter()).for_each(|(a, b)| *a = *b);
        edt_1d(&f, w2, &mut d, &mut v, &mut z);
        line.iter_mut().zip(d.iter()).for_each(|(a, b)| *a = *b);
    }
}

/// 计算每个像素到最近的 `true` 像素的平方欧氏距离.
///
/// `spacing` 为 (行方向, 列方向) 的像素间距. 没有任何 `true` 像素时, 结果不小于 `1e20`.
pub fn squared_edt(mask: ArrayView2<bool>, spacing: (f64, f64)) -> Array2<f64> {
    let mut grid = mask.map(|&m| if m { 0.0 } else { FAR });
    transform_lines(&mut grid, Axis(0), spacing.0);
    transform_lines(&mut grid, Axis(1), spacing.1);
    grid
}

/// 有符号距离图: `到前景的距离 - 到背景的距离`.
///
/// 前景内部为负, 外部为正, 任何像素都不为 0. 全前景或全背景时,
/// 距离被截断为切片对角线长度.
pub fn signed_distance(mask: ArrayView2<bool>, spacing: (f64, f64)) -> Array2<f64> {
    let (h, w) = mask.dim();
    let cap = ((h as f64 * spacing.0).powi(2) + (w as f64 * spacing.1).powi(2)).sqrt();
    let to_fg = squared_edt(mask, spacing);
    let to_bg = squared_edt(mask.map(|m| !m).view(), spacing);
    let mut sdf = to_fg;
    sdf.zip_mut_with(&to_bg, |a, &b| {
        *a = a.sqrt().min(cap) - b.sqrt().min(cap);
    });
    sdf
}
