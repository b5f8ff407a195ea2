//! A compiler that writes the rendered source to disk and calls it done.

use std::path::Path;

use async_trait::async_trait;
use mpc_engine::program::{CompiledProgram, ProgramCompiler, ProgramError};

/// Always "compiles" successfully by writing the source verbatim to `work_dir`.
#[derive(Default)]
pub struct FakeProgramCompiler;

#[async_trait]
impl ProgramCompiler for FakeProgramCompiler {
    async fn compile(
        &self,
        source: &str,
        work_dir: &Path,
    ) -> Result<CompiledProgram, ProgramError> {
        let artifact_path = work_dir.join("program.fake");
        tokio::fs::create_dir_all(work_dir).await?;
        tokio::fs::write(&artifact_path, source).await?;
        Ok(CompiledProgram { artifact_path })
    }
}
