#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 为 3D/4D 分割标签体数据提供基于切片统计的标签插值.
//!
//! 该 crate 维护 "每个时间步、每个轴、每个切片、每个标签" 的体素计数,
//! 并以此快速定位某个空切片上下最近的、含有给定标签的两个切片,
//! 然后以基于形状 (shape-based) 的方法插值出空切片上的二维分割.
//!
//! # 注意
//!
//! 1. 所有公开操作都假设在同一个逻辑线程中串行调用 (典型的交互式编辑场景).
//!   因此体数据与插值器的共享关系以 `Rc` / `Weak` / `RefCell` 表达, 它们都不是 `Send`.
//! 2. 唯一可能的并行发生在单次全量扫描内部 (`rayon` feature).
//! 3. 计数被减为负数等不变量被破坏的情形被视为程序错误, 程序会直接 panic.
//!
//! # 开发计划
//!
//! ### 标签统计索引 ✅
//!
//! 扁平数组存储的 `(时间步, 轴, 切片, 标签)` 计数表, 支持全量扫描与单切片增量更新.
//!
//! 实现位于 `slice-berry/src/stats`.
//!
//! ### 边界切片搜索 ✅
//!
//! 给定目标切片, 双向搜索最近的含标签切片.
//!
//! 实现位于 `slice-berry/src/stats/search.rs`.
//!
//! ### 切片插值器 ✅
//!
//! 对外入口. 挂载工作体数据, 接收切片修改, 给出插值建议, 并能将建议写回体数据.
//! 插值器注册表不是全局状态, 而是显式传递的对象.
//!
//! 实现位于 `slice-berry/src/interp`.
//!
//! ### 基于形状的插值 ✅
//!
//! 两侧掩膜的有符号距离图线性混合. 距离图使用精确欧氏距离变换
//! (Felzenszwalb & Huttenlocher).
//!
//! 实现位于 `slice-berry/src/interp/shape.rs`, `slice-berry/src/interp/edt.rs`.
//!
//! ### 参考图像辅助插值 ⌛️
//!
//! 目前参考图像切片会被传递给插值算法, 但默认算法尚未使用它.
//!
//! ### 小功能 ✅
//!
//! 1. nifti 格式标签/扫描体数据加载. ✅
//! 2. 标签切片的 PNG 持久化. ✅
//! 3. LiTS 训练集标签加载器. ✅

/// 二维索引 (行, 列), 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 按轴序 `[axis0, axis1, axis2]` (即 `[w, h, z]`) 排列的体素索引.
pub type Voxel = [usize; 3];

/// 标签值类型. `0` 代表背景.
pub type Label = u16;

/// 空间轴的个数.
pub const AXES: usize = 3;

/// 体数据与切片基础数据结构.
mod data;

pub use data::{
    CuttingPlane, ImgWriteRaw, ImgWriteVis, LabelSet, LabelSlice, LabelSliceMut, LabelVolume,
    OwnedLabelSlice, OwnedScanSlice, ScanSlice, ScanVolume, SharedScan, SharedVolume,
    VolumeGeometry, VolumeId,
};

pub mod consts;

pub mod error;

pub mod stats;

pub mod interp;

pub mod dataset;
pub mod prelude;

/// 获得与 `axis` 正交的两个轴 `(dim0, dim1)`, 满足 `dim0 < dim1`.
///
/// 切片缓冲区的列沿 `dim0` 增长, 行沿 `dim1` 增长. `axis > 2` 时 panic.
#[inline]
pub const fn orthogonal_axes(axis: usize) -> (usize, usize) {
    match axis {
        0 => (1, 2),
        1 => (0, 2),
        2 => (0, 1),
        _ => panic!("轴的取值只能为 0, 1 或 2"),
    }
}
