//! A VM that prints a canned register dump (or fails) instead of actually running.

use std::path::Path;

use async_trait::async_trait;
use mpc_engine::program::{CompiledProgram, ProgramError, ProgramRunner};
use mpc_types::session::PartyId;

/// A VM runner that always reports the same outcome, configured up front.
///
/// Giving every party in a test the same [`FakeProgramRunner::fixed`] commitment
/// simulates the parties agreeing, which is what the coordinator's cross-check
/// requires to accept a sharing session. [`FakeProgramRunner::fixed_query_stats`]
/// does the same for the five-register query-statistics dump.
/// [`FakeProgramRunner::failing`] simulates a VM crash, useful for exercising
/// rollback.
pub struct FakeProgramRunner {
    outcome: Result<String, String>,
}

impl FakeProgramRunner {
    /// Builds a runner that always reports `commitment_hex` (without the `0x` prefix)
    /// as its sole register.
    pub fn fixed(commitment_hex: impl Into<String>) -> Self {
        Self {
            outcome: Ok(format!("Reg[0] = 0x{}\n", commitment_hex.into())),
        }
    }

    /// Builds a runner that always reports `registers` in order, as the five
    /// query-statistics registers `parse_query_stats` expects.
    pub fn fixed_query_stats(registers: [u64; 5]) -> Self {
        let dump = registers
            .iter()
            .enumerate()
            .map(|(i, value)| format!("Reg[{i}] = 0x{value:x}\n"))
            .collect();
        Self { outcome: Ok(dump) }
    }

    /// Builds a runner that always fails with `reason`, as if the VM crashed.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            outcome: Err(reason.into()),
        }
    }
}

#[async_trait]
impl ProgramRunner for FakeProgramRunner {
    async fn run(
        &self,
        _program: &CompiledProgram,
        _party_id: PartyId,
        _work_dir: &Path,
    ) -> Result<String, ProgramError> {
        self.outcome
            .clone()
            .map_err(ProgramError::RunFailed)
    }
}
