//! 消融实验依赖的通用组件.

use std::io;

pub mod loader;

const SEP: &str = "--------------------------------------------------------";

/// 简单分隔线.
#[inline]
pub fn sep() {
    println!("{SEP}");
}

/// 简单分隔线.
#[inline]
pub fn sep_to<W: io::Write>(mut w: W) -> io::Result<()> {
    writeln!(&mut w, "{SEP}")
}

/// 获得可并行核心数.
#[inline]
pub fn cpus() -> usize {
    num_cpus::get()
}

/// 安装日志后端. 日志级别可以由环境变量 `$RUST_LOG` 覆盖, 默认为 `info`.
///
/// 重复安装时什么都不做.
pub fn init_logger() {
    let _ = simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .env()
        .init();
}
