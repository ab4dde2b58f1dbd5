//! Cap-and-emit pipeline: call peaks, rank, renumber, cap, clip.
//!
//! One invocation runs the whole chain: MACS2 callpeak -> measure raw
//! output -> rank sort -> normalize -> truncate to the peak cap -> clip to
//! chromosome bounds -> gzipped narrowPeak artifact. Stages run strictly in
//! sequence and hand off through files; every intermediate is deleted on
//! every exit path.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::chrsz::ChromSizes;
use crate::narrowpeak::{write_peaks, PeakError, Result};
use crate::runner::ExternalRunner;

use super::clip::ClipCommand;
use super::normalize::NormalizeCommand;
use super::rank_sort::{sort_mem_mb, RankSortCommand};
use super::subsample::SubsampleCommand;

/// UNIX filenames cap at 255 bytes; prefixes longer than this fall back to
/// a fixed control placeholder.
const MAX_PREFIX_LEN: usize = 200;

/// Call-peak pipeline configuration.
#[derive(Debug, Clone)]
pub struct CallPeakCommand {
    /// Fragment length, passed to MACS2 as --extsize.
    pub fraglen: i64,
    /// Read shift, passed to MACS2 as --shift.
    pub shift: i64,
    /// Effective genome size token or total ("hs", "mm", or a number).
    pub gensz: String,
    /// P-value threshold for MACS2.
    pub pval_thresh: f64,
    /// Keep only the top N peaks by significance.
    pub cap_num_peak: usize,
    /// Subsample the control to this read depth (0 = disabled).
    pub ctl_subsample: u64,
    /// Control TAGALIGN is paired-end.
    pub ctl_paired_end: bool,
    /// Output directory.
    pub out_dir: PathBuf,
}

impl CallPeakCommand {
    /// Run the pipeline for one sample / optional-control pair.
    /// Returns the path of the final gzipped narrowPeak artifact.
    pub fn run(
        &self,
        runner: &dyn ExternalRunner,
        ta: &Path,
        ctl_ta: Option<&Path>,
        chrsz: &ChromSizes,
    ) -> Result<PathBuf> {
        let mut ctl_ta = ctl_ta.map(Path::to_path_buf);
        let mut subsampled_ctl = None;

        if let Some(ctl) = &ctl_ta {
            if self.ctl_subsample > 0 {
                let cmd = SubsampleCommand::new(self.ctl_subsample, self.ctl_paired_end);
                let path = cmd.run(ctl, &self.out_dir)?;
                subsampled_ctl = Some(path.clone());
                ctl_ta = Some(path);
            }
        }

        let basename_prefix = self.basename_prefix(ta, ctl_ta.as_deref());
        let prefix = self.out_dir.join(&basename_prefix);
        let npeak = self.npeak_path(&basename_prefix);

        // Deleted on every exit path, including early failures.
        let mut scratch = ScratchFiles::new(self.out_dir.clone(), format!("{}_", basename_prefix));
        if let Some(path) = subsampled_ctl {
            scratch.add(path);
        }

        runner.run("macs2", &self.macs2_args(ta, ctl_ta.as_deref(), &prefix))?;

        let raw_peaks = PathBuf::from(format!("{}_peaks.narrowPeak", prefix.display()));
        let raw_size = file_size(&raw_peaks).ok_or_else(|| PeakError::EmptyOutput(raw_peaks.clone()))?;
        info!("Peaks file size, bytes: {}", raw_size);
        debug!("Merge-sort buffer hint: {} MiB", sort_mem_mb(raw_size));

        let npeak_tmp = with_suffix(&npeak, ".tmp");
        let npeak_tmp2 = with_suffix(&npeak, ".tmp2");
        scratch.add(npeak_tmp.clone());
        scratch.add(npeak_tmp2.clone());

        let mut sorted = RankSortCommand::new().sort(RankSortCommand::new().load(&raw_peaks)?);
        NormalizeCommand::new().normalize(&mut sorted);
        write_peaks(&npeak_tmp, &sorted)?;

        let capped = &sorted[..sorted.len().min(self.cap_num_peak)];
        write_peaks(&npeak_tmp2, capped)?;
        info!("Capped peaks: {} of {}", capped.len(), sorted.len());

        let kept = ClipCommand::new().run(&npeak_tmp2, chrsz, &npeak)?;
        info!("Clipped peaks written: {}", kept);

        drop(scratch);

        if file_size(&npeak).is_none() {
            return Err(PeakError::EmptyOutput(npeak));
        }
        Ok(npeak)
    }

    /// Artifact base name: sample base, joined with the control base when a
    /// control is used. Over-long combinations use a fixed placeholder.
    pub fn basename_prefix(&self, ta: &Path, ctl_ta: Option<&Path>) -> String {
        let ta_base = strip_ta_ext(&file_name(ta));
        match ctl_ta {
            None => ta_base,
            Some(ctl) => {
                let prefix = format!("{}_x_{}", ta_base, strip_ta_ext(&file_name(ctl)));
                if prefix.len() > MAX_PREFIX_LEN {
                    format!("{}_x_control", ta_base)
                } else {
                    prefix
                }
            }
        }
    }

    /// Final artifact path: `<prefix>.pval<P>.<human-N>.narrowPeak.gz`.
    pub fn npeak_path(&self, basename_prefix: &str) -> PathBuf {
        let mut ryu_buf = ryu::Buffer::new();
        self.out_dir.join(format!(
            "{}.pval{}.{}.narrowPeak.gz",
            basename_prefix,
            ryu_buf.format(self.pval_thresh),
            human_readable_number(self.cap_num_peak as u64)
        ))
    }

    fn macs2_args(&self, ta: &Path, ctl_ta: Option<&Path>, prefix: &Path) -> Vec<String> {
        let mut ryu_buf = ryu::Buffer::new();
        let mut args = vec!["callpeak".to_string(), "-t".to_string(), path_arg(ta)];
        if let Some(ctl) = ctl_ta {
            args.push("-c".to_string());
            args.push(path_arg(ctl));
        }
        args.extend([
            "-f".to_string(),
            "BED".to_string(),
            "-n".to_string(),
            path_arg(prefix),
            "-g".to_string(),
            self.gensz.clone(),
            "-p".to_string(),
            ryu_buf.format(self.pval_thresh).to_string(),
            "--nomodel".to_string(),
            "--shift".to_string(),
            self.shift.to_string(),
            "--extsize".to_string(),
            self.fraglen.to_string(),
            "--keep-dup".to_string(),
            "all".to_string(),
            "-B".to_string(),
            "--SPMR".to_string(),
        ]);
        args
    }
}

/// Strip a TAGALIGN extension from a file name.
pub fn strip_ta_ext(name: &str) -> String {
    for ext in [".tagAlign.gz", ".tagAlign", ".gz"] {
        if let Some(stripped) = name.strip_suffix(ext) {
            return stripped.to_string();
        }
    }
    name.to_string()
}

/// Format a count with metric units: 500000 -> "500K".
pub fn human_readable_number(mut num: u64) -> String {
    for unit in ["", "K", "M", "G", "T", "P"] {
        if num < 1000 {
            return format!("{}{}", num, unit);
        }
        num /= 1000;
    }
    format!("{}E", num)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

fn file_size(path: &Path) -> Option<u64> {
    match fs::metadata(path) {
        Ok(meta) if meta.len() > 0 => Some(meta.len()),
        _ => None,
    }
}

/// Scope guard for pipeline intermediates: named scratch files plus every
/// `<prefix>_*` file the external caller left in the output directory.
/// Deletion is best-effort; missing files are not an error.
struct ScratchFiles {
    files: Vec<PathBuf>,
    dir: PathBuf,
    glob_prefix: String,
}

impl ScratchFiles {
    fn new(dir: PathBuf, glob_prefix: String) -> Self {
        Self {
            files: Vec::new(),
            dir,
            glob_prefix,
        }
    }

    fn add(&mut self, path: PathBuf) {
        self.files.push(path);
    }
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        for path in &self.files {
            let _ = fs::remove_file(path);
        }

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(_) => return,
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(&self.glob_prefix) {
                let _ = fs::remove_file(entry.path());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> CallPeakCommand {
        CallPeakCommand {
            fraglen: 200,
            shift: 0,
            gensz: "hs".to_string(),
            pval_thresh: 0.01,
            cap_num_peak: 500000,
            ctl_subsample: 0,
            ctl_paired_end: false,
            out_dir: PathBuf::from("out"),
        }
    }

    #[test]
    fn test_human_readable_number() {
        assert_eq!(human_readable_number(0), "0");
        assert_eq!(human_readable_number(999), "999");
        assert_eq!(human_readable_number(1000), "1K");
        assert_eq!(human_readable_number(500000), "500K");
        assert_eq!(human_readable_number(2_000_000), "2M");
        assert_eq!(human_readable_number(1_500_000), "1M");
    }

    #[test]
    fn test_strip_ta_ext() {
        assert_eq!(strip_ta_ext("sample.tagAlign.gz"), "sample");
        assert_eq!(strip_ta_ext("sample.tagAlign"), "sample");
        assert_eq!(strip_ta_ext("sample.gz"), "sample");
        assert_eq!(strip_ta_ext("sample"), "sample");
    }

    #[test]
    fn test_basename_prefix_without_control() {
        let cmd = command();
        let prefix = cmd.basename_prefix(Path::new("data/rep1.tagAlign.gz"), None);
        assert_eq!(prefix, "rep1");
    }

    #[test]
    fn test_basename_prefix_with_control() {
        let cmd = command();
        let prefix = cmd.basename_prefix(
            Path::new("rep1.tagAlign.gz"),
            Some(Path::new("input1.tagAlign.gz")),
        );
        assert_eq!(prefix, "rep1_x_input1");
    }

    #[test]
    fn test_basename_prefix_placeholder_when_too_long() {
        let cmd = command();
        let long_ctl = format!("{}.tagAlign.gz", "c".repeat(220));
        let prefix = cmd.basename_prefix(
            Path::new("rep1.tagAlign.gz"),
            Some(Path::new(&long_ctl)),
        );
        assert_eq!(prefix, "rep1_x_control");
    }

    #[test]
    fn test_npeak_path() {
        let cmd = command();
        let npeak = cmd.npeak_path("rep1_x_input1");
        assert_eq!(
            npeak,
            PathBuf::from("out/rep1_x_input1.pval0.01.500K.narrowPeak.gz")
        );
    }

    #[test]
    fn test_macs2_args_include_control_and_shift() {
        let mut cmd = command();
        cmd.shift = 37;
        let args = cmd.macs2_args(
            Path::new("rep1.tagAlign.gz"),
            Some(Path::new("ctl.tagAlign.gz")),
            Path::new("out/rep1_x_ctl"),
        );

        let joined = args.join(" ");
        assert!(joined.starts_with("callpeak -t rep1.tagAlign.gz -c ctl.tagAlign.gz"));
        assert!(joined.contains("-f BED"));
        assert!(joined.contains("-g hs"));
        assert!(joined.contains("-p 0.01"));
        assert!(joined.contains("--shift 37"));
        assert!(joined.contains("--extsize 200"));
        assert!(joined.contains("--keep-dup all"));
        assert!(joined.ends_with("-B --SPMR"));
    }

    #[test]
    fn test_scratch_files_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let tmp = dir.path().join("a.tmp");
        let caller_file = dir.path().join("rep1_peaks.xls");
        let kept = dir.path().join("rep1.final.gz");
        std::fs::write(&tmp, "x").unwrap();
        std::fs::write(&caller_file, "x").unwrap();
        std::fs::write(&kept, "x").unwrap();

        let mut scratch = ScratchFiles::new(dir.path().to_path_buf(), "rep1_".to_string());
        scratch.add(tmp.clone());
        drop(scratch);

        assert!(!tmp.exists());
        assert!(!caller_file.exists());
        assert!(kept.exists());
    }
}
