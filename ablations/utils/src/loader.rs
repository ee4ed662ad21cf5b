//! 对 `slice-berry::dataset` 的更一层封装. 提供更直接的数据集加载器.

use slice_berry::dataset::lits_train::{self, LabelLoader};
use std::env;
use std::path::{Path, PathBuf};

/// 获取 LiTS 训练集标签基本路径.
///
/// 1. 若环境变量 `$LITS_TRAIN_LABEL_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/train/label`.
///
/// 两者都无法获得时返回 `None`.
pub fn label_dir_from_env_or_home() -> Option<PathBuf> {
    match env::var("LITS_TRAIN_LABEL_DIR") {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => slice_berry::dataset::home_dataset_dir_with(["train", "label"]),
    }
}

/// 获取 LiTS 训练集中给定索引的标签数据加载器.
pub fn label_loader<I: IntoIterator<Item = u32>, P: AsRef<Path>>(data: I, path: P) -> LabelLoader {
    lits_train::label_loader(data, path)
}

/// 获取 LiTS 训练集全部标签的数据加载器.
pub fn full_label_loader<P: AsRef<Path>>(path: P) -> LabelLoader {
    lits_train::full_label_loader(path)
}
