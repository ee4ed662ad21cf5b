//! LiTS 训练集数据加载器.
//!
//! 提供迭代器风格的数据集获取模式. 标签以 [`LabelVolume`] 加载, 可作为工作体数据;
//! 扫描以 [`ScanVolume`] 加载, 可作为参考图像.

use crate::consts::LITS_TRAINING_SET_LEN;
use crate::error::VolumeError;
use crate::{LabelVolume, ScanVolume};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// 可以从 LiTS 训练集目录中按索引加载的体数据.
pub trait LitsVolume: Sized {
    /// 文件名前缀. 索引为 `idx` 的文件名为 `{PREFIX}-{idx}.nii`.
    const PREFIX: &'static str;

    /// 打开单个 nii 文件.
    fn open_file(path: &Path) -> Result<Self, VolumeError>;
}

impl LitsVolume for LabelVolume {
    const PREFIX: &'static str = "segmentation";

    #[inline]
    fn open_file(path: &Path) -> Result<Self, VolumeError> {
        LabelVolume::open(path)
    }
}

impl LitsVolume for ScanVolume {
    const PREFIX: &'static str = "volume";

    #[inline]
    fn open_file(path: &Path) -> Result<Self, VolumeError> {
        ScanVolume::open(path)
    }
}

/// 按索引依次加载体数据的迭代器.
#[derive(Debug)]
pub struct Loader<T> {
    path: PathBuf,
    data_rev: Vec<u32>,
    _kind: PhantomData<fn() -> T>,
}

/// LiTS 训练集标签加载器.
pub type LabelLoader = Loader<LabelVolume>;

/// LiTS 训练集扫描加载器.
pub type ScanLoader = Loader<ScanVolume>;

impl<T: LitsVolume> Loader<T> {
    /// 从指定索引和路径创建加载器.
    ///
    /// # 注意
    ///
    /// 1. `path` 必须是目录, 否则程序 panic.
    /// 2. `data` 的所有值 `value` 必须在 `path` 下有形如 `{T::PREFIX}-{value}.nii` 的文件,
    ///   否则加载器在迭代时会返回 `Result::Err`.
    pub fn new<I: IntoIterator<Item = u32>, P: AsRef<Path>>(data: I, path: P) -> Self {
        let path = path.as_ref().to_owned();
        assert!(path.is_dir());

        let mut data_rev: Vec<u32> = data.into_iter().collect();
        data_rev.reverse();
        Self {
            path,
            data_rev,
            _kind: PhantomData,
        }
    }

    /// 按索引序迭代 LiTS **训练集** 下的全部文件.
    #[inline]
    pub fn full<P: AsRef<Path>>(path: P) -> Self {
        Self::new(0..LITS_TRAINING_SET_LEN, path)
    }
}

impl<T: LitsVolume> Iterator for Loader<T> {
    type Item = (u32, Result<T, VolumeError>);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.data_rev.pop()?;

        self.path.push(format!("{}-{idx}.nii", T::PREFIX));
        let data = T::open_file(self.path.as_path());
        self.path.pop();

        Some((idx, data))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.data_rev.len(), Some(self.data_rev.len()))
    }
}

impl<T: LitsVolume> ExactSizeIterator for Loader<T> {}

/// 从指定索引和路径创建 LiTS 训练集的标签加载器.
/// 文件名形如 `segmentation-{value}.nii`.
#[inline]
pub fn label_loader<I: IntoIterator<Item = u32>, P: AsRef<Path>>(data: I, path: P) -> LabelLoader {
    Loader::new(data, path)
}

/// 从指定路径创建 LiTS 训练集的标签加载器, 按索引序迭代所有标签.
#[inline]
pub fn full_label_loader<P: AsRef<Path>>(path: P) -> LabelLoader {
    Loader::full(path)
}

/// 从指定索引和路径创建 LiTS 训练集的扫描加载器.
/// 文件名形如 `volume-{value}.nii`.
#[inline]
pub fn scan_loader<I: IntoIterator<Item = u32>, P: AsRef<Path>>(data: I, path: P) -> ScanLoader {
    Loader::new(data, path)
}

#[cfg(test)]
mod tests {
    use super::{full_label_loader, label_loader, scan_loader};
    use crate::consts::LITS_TRAINING_SET_LEN;

    #[test]
    fn test_loader_order_and_missing_files() {
        let dir = std::env::temp_dir();
        let mut loader = label_loader([7, 3, 100_000], &dir);
        assert_eq!(loader.len(), 3);
        let indices: Vec<_> = loader.by_ref().map(|(i, r)| (i, r.is_err())).collect();
        assert_eq!(indices, vec![(7, true), (3, true), (100_000, true)]);
        assert_eq!(loader.len(), 0);

        assert_eq!(full_label_loader(&dir).len(), LITS_TRAINING_SET_LEN as usize);
        assert!(scan_loader([1], &dir).next().unwrap().1.is_err());
    }
}
