//! Progress reporting and snapshot writing for the iterative solvers.
//!
//! A [`Monitor`] is attached to a solver and observed once per iteration.
//! It can log the current error through the [`log`] facade and append
//! per-step snapshots of the free matrix entries to plain text files, so a
//! long-running estimation can be inspected while it runs.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use nalgebra::{DMatrix, DVector};

use crate::core::FreePattern;
use crate::derivatives::L2Evaluator;

/// File sink for per-step snapshots.
///
/// Every `interval` steps, one line per tracked quantity is appended:
///
/// * `prec_mat.txt` — step index followed by the free precision entries,
/// * `cov_mat.txt` — step index followed by the free covariance entries,
/// * `errs.txt` — step index, mean error, maximum error,
/// * `cov_mat_targets.txt` — the free target entries, written once at step
///   zero without a step index.
///
/// Entries follow the free-pair order of the pattern. All files are
/// truncated at step zero and appended to afterwards.
#[derive(Debug, Clone)]
pub struct WriteSink {
    dir: PathBuf,
    interval: usize,
}

/// Observer of solver progress.
///
/// The default monitor is silent and writes nothing.
#[derive(Debug, Clone, Default)]
pub struct Monitor {
    log_interval: Option<usize>,
    log_mats: bool,
    write: Option<WriteSink>,
}

impl Monitor {
    /// Creates a silent monitor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs progress at info level every `interval` steps.
    pub fn log_every(mut self, interval: usize) -> Self {
        assert!(interval > 0, "log interval must be positive");
        self.log_interval = Some(interval);
        self
    }

    /// Additionally logs the current precision and covariance matrices at
    /// debug level.
    pub fn log_matrices(mut self, log_mats: bool) -> Self {
        self.log_mats = log_mats;
        self
    }

    /// Appends snapshots to files in `dir` every `interval` steps.
    pub fn write_to(mut self, dir: impl Into<PathBuf>, interval: usize) -> Self {
        assert!(interval > 0, "write interval must be positive");
        self.write = Some(WriteSink {
            dir: dir.into(),
            interval,
        });
        self
    }

    /// Observes one step of a least-squares solver.
    pub fn observe_l2(
        &self,
        step: usize,
        total: usize,
        eval: &L2Evaluator,
        cov_curr: &DMatrix<f64>,
        cov_target: &DMatrix<f64>,
        prec_curr: &DMatrix<f64>,
    ) -> io::Result<()> {
        let lazy_errs = || eval.percent_error(cov_curr, cov_target);

        if let Some(interval) = self.log_interval {
            if step % interval == 0 {
                let (ave, max) = lazy_errs();
                log::info!("[inversion {:08} / {:08}]", step + 1, total);
                log::info!("err - ave: {:.6}% max: {:.6}%", ave, max);
                if self.log_mats {
                    log::debug!("precision: {}", prec_curr);
                    log::debug!("covariance: {}", cov_curr);
                }
            }
        }

        if let Some(sink) = &self.write {
            if step % sink.interval == 0 {
                let pattern = eval.pattern();
                let (ave, max) = lazy_errs();
                sink.write_step(step, "prec_mat.txt", &pattern.free_mat_to_vec(prec_curr))?;
                sink.write_step(step, "cov_mat.txt", &pattern.free_mat_to_vec(cov_curr))?;
                sink.write_step(step, "errs.txt", &DVector::from_vec(vec![ave, max]))?;
                if step == 0 {
                    sink.write_plain("cov_mat_targets.txt", &pattern.free_mat_to_vec(cov_target))?;
                }
            }
        }

        Ok(())
    }

    /// Observes one step of the root-finding solver.
    pub fn observe_newton(
        &self,
        step: usize,
        total: usize,
        pattern: &FreePattern,
        residuals: &DVector<f64>,
        prec_curr: &DMatrix<f64>,
        cov_curr: &DMatrix<f64>,
    ) -> io::Result<()> {
        let max = residuals.amax();
        let mean = residuals.abs().mean();

        if let Some(interval) = self.log_interval {
            if step % interval == 0 {
                log::info!("[inversion {:08} / {:08}]", step + 1, total);
                log::info!("residual - mean abs: {:.6} max abs: {:.6}", mean, max);
                if self.log_mats {
                    log::debug!("precision: {}", prec_curr);
                    log::debug!("covariance: {}", cov_curr);
                }
            }
        }

        if let Some(sink) = &self.write {
            if step % sink.interval == 0 {
                sink.write_step(step, "prec_mat.txt", &pattern.free_mat_to_vec(prec_curr))?;
                sink.write_step(step, "cov_mat.txt", &pattern.free_mat_to_vec(cov_curr))?;
                sink.write_step(step, "errs.txt", &DVector::from_vec(vec![mean, max]))?;
            }
        }

        Ok(())
    }
}

impl WriteSink {
    fn open(&self, name: &str, truncate: bool) -> io::Result<File> {
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(truncate)
            .append(!truncate)
            .open(self.dir.join(name))
    }

    fn write_step(&self, step: usize, name: &str, values: &DVector<f64>) -> io::Result<()> {
        let mut file = self.open(name, step == 0)?;
        write!(file, "{}", step)?;
        for val in values.iter() {
            write!(file, " {:.16e}", val)?;
        }
        writeln!(file)
    }

    fn write_plain(&self, name: &str, values: &DVector<f64>) -> io::Result<()> {
        let mut file = self.open(name, true)?;
        let mut sep = "";
        for val in values.iter() {
            write!(file, "{}{:.16e}", sep, val)?;
            sep = " ";
        }
        writeln!(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testing;

    #[test]
    fn snapshot_files_have_one_line_per_step() {
        let dir = std::env::temp_dir().join("ggm_inversion_monitor_test");
        std::fs::create_dir_all(&dir).unwrap();

        let pattern = testing::three_dim_pattern();
        let eval = L2Evaluator::new(pattern);
        let target = testing::three_dim_target();
        let prec = target.clone().try_inverse().unwrap();

        let monitor = Monitor::new().write_to(&dir, 1);
        for step in 0..3 {
            monitor
                .observe_l2(step, 3, &eval, &target, &target, &prec)
                .unwrap();
        }

        let prec_lines = std::fs::read_to_string(dir.join("prec_mat.txt")).unwrap();
        assert_eq!(prec_lines.lines().count(), 3);
        // Step index plus one value per free entry.
        assert_eq!(
            prec_lines.lines().next().unwrap().split(' ').count(),
            1 + eval.pattern().n_free()
        );

        let target_lines = std::fs::read_to_string(dir.join("cov_mat_targets.txt")).unwrap();
        assert_eq!(target_lines.lines().count(), 1);
        assert_eq!(
            target_lines.lines().next().unwrap().split(' ').count(),
            eval.pattern().n_free()
        );

        let err_lines = std::fs::read_to_string(dir.join("errs.txt")).unwrap();
        assert!(err_lines.lines().all(|l| l.split(' ').count() == 3));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
