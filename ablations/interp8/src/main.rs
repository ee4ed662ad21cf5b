//! 留空切片消融实验.
//!
//! 在 LiTS 训练集标签中, 沿 z 轴每隔若干切片擦除肝脏切片, 再用切片插值器补回,
//! 统计 Dice 系数与插值耗时.
//!
//! 环境变量:
//!
//! 1. `$LITS_TRAIN_LABEL_DIR`: 标签目录, 默认为 `$HOME/dataset/train/label`;
//! 2. `$INTERP8_STRIDE`: 相邻两个保留切片之间擦除的切片个数, 默认为 2.

mod profile;
mod result;
mod runner;

fn main() {
    utils::init_logger();
    let result = runner::run();
    result.analyze();
}
