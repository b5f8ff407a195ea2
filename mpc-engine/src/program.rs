//! Rendering, compiling, and running the MPC programs a party executes.
//!
//! The compiler and VM are external binaries; like [`crate::proof_verifier`] this
//! module only defines the capability interfaces and the pure logic around them
//! (template rendering, commitment parsing). Subprocess-backed implementations live
//! alongside the traits so a party can swap in a test double without touching call
//! sites.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use mpc_types::api::consumer::QueryComputationStatsResponse;
use mpc_types::proof::{CommitmentHex, EncodingDelta};
use mpc_types::session::PartyId;
use tokio::process::Command;

pub mod templates;

/// A program that has been compiled and is ready to run.
#[derive(Clone, Debug)]
pub struct CompiledProgram {
    /// Path to the compiled bytecode/executable the VM should load.
    pub artifact_path: PathBuf,
}

/// Everything that can go wrong compiling or running an MPC program.
#[derive(Debug, thiserror::Error)]
pub enum ProgramError {
    /// The compiler exited non-zero.
    #[error("program compile failed: {0}")]
    CompileFailed(String),
    /// The VM exited non-zero.
    #[error("mpc vm run failed: {0}")]
    RunFailed(String),
    /// Neither the compiler nor the VM could be invoked, or their I/O failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The VM exited successfully but its stdout carried no commitment register dump.
    #[error("vm stdout did not contain a commitment register dump")]
    NoCommitment,
    /// The VM exited successfully but its stdout carried fewer than the expected
    /// number of query-statistics registers.
    #[error("vm stdout carried only {0} query-statistics registers, expected 5")]
    IncompleteQueryStats(usize),
}

/// Compiles a rendered MPC program source into something [`ProgramRunner`] can run.
#[async_trait]
pub trait ProgramCompiler {
    /// Compiles `source` under `work_dir`, returning the path to the compiled
    /// artifact.
    async fn compile(
        &self,
        source: &str,
        work_dir: &Path,
    ) -> Result<CompiledProgram, ProgramError>;
}

/// Runs a compiled MPC program as one party in an `N`-party execution.
#[async_trait]
pub trait ProgramRunner {
    /// Runs `program` as `party_id`, returning the VM's raw stdout for the caller to
    /// extract a commitment from via [`parse_commitment_hex`].
    async fn run(
        &self,
        program: &CompiledProgram,
        party_id: PartyId,
        work_dir: &Path,
    ) -> Result<String, ProgramError>;
}

/// Compiles programs by invoking an external compiler binary with the rendered source
/// piped to its stdin and the artifact path as its sole argument.
pub struct SubprocessProgramCompiler {
    compiler_path: PathBuf,
}

impl SubprocessProgramCompiler {
    /// Creates a compiler that invokes the binary at `compiler_path`.
    pub fn new(compiler_path: PathBuf) -> Self {
        Self { compiler_path }
    }
}

#[async_trait]
impl ProgramCompiler for SubprocessProgramCompiler {
    async fn compile(
        &self,
        source: &str,
        work_dir: &Path,
    ) -> Result<CompiledProgram, ProgramError> {
        let source_path = work_dir.join("program.mpc");
        tokio::fs::write(&source_path, source).await?;

        let artifact_path = work_dir.join("program.bin");
        let output = Command::new(&self.compiler_path)
            .arg(&source_path)
            .arg("-o")
            .arg(&artifact_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;
        if !output.status.success() {
            return Err(ProgramError::CompileFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(CompiledProgram { artifact_path })
    }
}

/// Runs compiled programs by invoking an external MPC VM binary.
pub struct SubprocessProgramRunner {
    vm_path: PathBuf,
}

impl SubprocessProgramRunner {
    /// Creates a runner that invokes the binary at `vm_path`.
    pub fn new(vm_path: PathBuf) -> Self {
        Self { vm_path }
    }
}

#[async_trait]
impl ProgramRunner for SubprocessProgramRunner {
    async fn run(
        &self,
        program: &CompiledProgram,
        party_id: PartyId,
        work_dir: &Path,
    ) -> Result<String, ProgramError> {
        let output = Command::new(&self.vm_path)
            .arg(party_id.0.to_string())
            .arg(&program.artifact_path)
            .current_dir(work_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;
        if !output.status.success() {
            return Err(ProgramError::RunFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Extracts the commitment hex from a line of the form `Reg[3] = 0xdeadbeef` in the
/// VM's stdout. The last matching line wins, matching the VM's own "final register
/// dump" convention.
pub fn parse_commitment_hex(stdout: &str) -> Result<CommitmentHex, ProgramError> {
    static PATTERN: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    let re = PATTERN.get_or_init(|| {
        regex::Regex::new(r"Reg\[\s*\d+\s*\]\s*=\s*0x([0-9a-fA-F]+)").expect("valid regex")
    });

    re.captures_iter(stdout)
        .last()
        .map(|caps| CommitmentHex(caps[1].to_lowercase()))
        .ok_or(ProgramError::NoCommitment)
}

/// A single 16-byte encoding delta rendered as a `0x`-prefixed hex literal for program
/// template substitution.
pub fn delta_literal(delta: &EncodingDelta) -> String {
    format!("0x{}", hex::encode(delta))
}

/// Extracts the five query-statistics registers the query program reveals, in order:
/// `num_data_providers`, scaled max, scaled mean, scaled median, scaled gini numerator.
///
/// Unlike [`parse_commitment_hex`], order matters here and the *first* five matches are
/// taken (the program emits them in a fixed sequence, then nothing else).
pub fn parse_query_stats(stdout: &str) -> Result<[u64; 5], ProgramError> {
    static PATTERN: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    let re = PATTERN
        .get_or_init(|| regex::Regex::new(r"Reg\[\s*\d+\s*\]\s*=\s*0x([0-9a-fA-F]+)").expect("valid regex"));

    let values: Vec<u64> = re
        .captures_iter(stdout)
        .take(5)
        .map(|caps| u64::from_str_radix(&caps[1], 16).unwrap_or_default())
        .collect();

    values
        .try_into()
        .map_err(|values: Vec<u64>| ProgramError::IncompleteQueryStats(values.len()))
}

/// Descales the raw query registers into the public statistics the consumer API
/// reports.
///
/// `fixed_point_scale` is the program's fixed-point denominator for a contributed
/// value (e.g. a price feed's tick precision); every field but `num_data_providers`
/// is carried through the program as an integer multiple of it.
pub fn query_stats_from_registers(
    registers: [u64; 5],
    fixed_point_scale: u64,
) -> QueryComputationStatsResponse {
    let [num_data_providers, max, mean, median, gini_numerator] = registers;
    let safe_div = |a: f64, b: f64| if b == 0.0 { 0.0 } else { a / b };
    let scale = (10 * fixed_point_scale) as f64;

    QueryComputationStatsResponse {
        num_data_providers,
        max: safe_div(max as f64, scale),
        mean: safe_div(mean as f64, num_data_providers as f64 * scale),
        median: safe_div(median as f64, scale),
        gini_coefficient: safe_div(gini_numerator as f64, num_data_providers as f64 * mean as f64)
            - 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_last_register_dump_line() {
        let stdout = "booting vm\nReg[0] = 0x1234\nReg[1] = 0xabCD\n";
        let commitment = parse_commitment_hex(stdout).unwrap();
        assert_eq!(commitment.0, "abcd");
    }

    #[test]
    fn errors_when_no_register_dump_present() {
        assert!(parse_commitment_hex("nothing here").is_err());
    }

    #[test]
    fn parses_query_stats_in_register_order() {
        let stdout = "Reg[0] = 0x3\nReg[1] = 0xa\nReg[2] = 0x14\nReg[3] = 0x5\nReg[4] = 0x1\n";
        let stats = parse_query_stats(stdout).unwrap();
        assert_eq!(stats, [3, 10, 20, 5, 1]);
    }

    #[test]
    fn errors_when_too_few_query_stat_registers() {
        let stdout = "Reg[0] = 0x3\nReg[1] = 0xa\n";
        assert!(matches!(
            parse_query_stats(stdout),
            Err(ProgramError::IncompleteQueryStats(2))
        ));
    }

    #[test]
    fn descales_query_registers_into_public_stats() {
        let stats = query_stats_from_registers([2, 200, 200, 100, 400], 10);
        assert_eq!(stats.num_data_providers, 2);
        assert!((stats.max - 2.0).abs() < f64::EPSILON);
        assert!((stats.median - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn descaling_with_zero_providers_does_not_divide_by_zero() {
        let stats = query_stats_from_registers([0, 0, 0, 0, 0], 10);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.gini_coefficient, -1.0);
    }
}
