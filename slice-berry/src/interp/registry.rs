//! 体数据到插值器的查找表.

use super::{SharedInterpolator, SliceInterpolator};
use crate::VolumeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

type Entry = Weak<RefCell<SliceInterpolator>>;

/// 记录 "哪些插值器挂载了哪个体数据" 的注册表.
///
/// 注册表只持有插值器的 `Weak` 引用, 不影响插值器的生命周期.
/// 插值器在切换工作体数据或被释放时会自动注销.
///
/// 克隆得到的是同一张表的另一个句柄.
#[derive(Clone, Default)]
pub struct InterpolatorRegistry {
    entries: Rc<RefCell<HashMap<VolumeId, Vec<Entry>>>>,
}

impl InterpolatorRegistry {
    /// 创建空的注册表.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 查找挂载了体数据 `id` 的插值器. 有多个时返回最近注册的那个.
    pub fn lookup(&self, id: VolumeId) -> Option<SharedInterpolator> {
        self.entries
            .borrow()
            .get(&id)?
            .iter()
            .rev()
            .find_map(Weak::upgrade)
    }

    /// 挂载了体数据 `id` 的存活插值器个数.
    pub fn count(&self, id: VolumeId) -> usize {
        self.entries
            .borrow()
            .get(&id)
            .map_or(0, |v| v.iter().filter(|w| w.strong_count() > 0).count())
    }

    /// 注册表中是否没有任何条目?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub(super) fn register(&self, id: VolumeId, interpolator: Entry) {
        let mut entries = self.entries.borrow_mut();
        let list = entries.entry(id).or_default();
        list.retain(|w| w.strong_count() > 0 && !w.ptr_eq(&interpolator));
        list.push(interpolator);
    }

    pub(super) fn unregister(&self, id: VolumeId, interpolator: &Entry) {
        let mut entries = self.entries.borrow_mut();
        if let Some(list) = entries.get_mut(&id) {
            list.retain(|w| !w.ptr_eq(interpolator));
            if list.is_empty() {
                entries.remove(&id);
            }
        }
    }
}
