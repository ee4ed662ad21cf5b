//! 实验结果.

use crate::profile::Profile;
use std::io::{self, Write};

/// 将 `profile` 的结果写进 `w` 中.
fn describe_into<W: Write>(stride: usize, p: &Profile, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    #[inline]
    fn f64_to_display(f: Option<f64>) -> String {
        match f {
            Some(f) => format!("{f:.6}"),
            None => "/".to_string(),
        }
    }

    writeln!(w, "Leave-{stride}-out slice interpolation:")?;
    writeln!(w, "{S4}Cases: {} (skipped {})", p.cases(), p.skipped())?;
    writeln!(w, "{S4}Interpolated slices: {} (no suggestion {})", p.attempted(), p.missing())?;
    writeln!(w, "{S4}Mean slice Dice: {}", f64_to_display(p.mean_dice()))?;
    writeln!(w, "{S4}Global Dice: {}", f64_to_display(p.global_dice()))?;
    writeln!(w, "{S4}Full scan time: {} us", p.scan_time_us())?;
    writeln!(w, "{S4}Interpolation time: {} us", p.interp_time_us())?;
    writeln!(
        w,
        "{S4}Average interpolation time: {} us",
        f64_to_display(p.avg_interp_time_us())
    )?;
    writeln!(w, "{S4}Total machine time: {} us", p.real_time_us())?;
    let t = p.most_time_consuming().map(|d| d.as_micros() as f64);
    write!(w, "{S4}Most time-consuming interpolation costs {} us", f64_to_display(t))?;
    Ok(())
}

/// 消融实验最终结果.
pub struct AblationResult {
    stride: usize,
    profile: Profile,
}

impl AblationResult {
    pub fn new(stride: usize, profile: Profile) -> Self {
        Self { stride, profile }
    }

    /// 分析运行结果.
    pub fn analyze(&self) {
        utils::sep();
        let mut buf = Vec::with_capacity(512);
        match describe_into(self.stride, &self.profile, &mut buf) {
            Ok(()) => println!("{}", String::from_utf8_lossy(&buf)),
            Err(e) => log::error!("无法输出结果: {e}"),
        }
        utils::sep();
    }
}
