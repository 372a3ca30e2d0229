use colored::Colorize;
use reason_memory_core::error::Result;
use reason_memory_core::reasoning::SolveResult;
use reason_memory_core::tools::types::SolveCodingTaskInput;

use crate::cli::Commands;
use crate::output::Output;

use super::Context;

impl Output for SolveResult {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        let status = if self.success {
            "SUCCESS".green().bold()
        } else {
            "NOT SOLVED".red().bold()
        };
        writeln!(
            writer,
            "{status} score={:.3} iterations={}",
            self.score, self.iterations
        )?;
        writeln!(writer, "\n{}\n", self.output)?;
        writeln!(writer, "judge: {}", self.judge_reasoning)?;
        if !self.memories_extracted.is_empty() {
            writeln!(writer, "extracted {} memories", self.memories_extracted.len())?;
        }
        if let Some(selected) = self.selected_trajectory {
            writeln!(writer, "MaTTS selected trajectory #{selected}")?;
        }
        if let Some(err) = &self.storage_error {
            writeln!(writer, "{} {err}", "storage warning:".yellow().bold())?;
        }
        Ok(())
    }
}

pub async fn run_solve(ctx: &Context, command: &Commands) -> Result<SolveResult> {
    let Commands::Solve {
        task,
        use_memory,
        enable_matts,
        matts_k,
        matts_mode,
        store_result,
    } = command
    else {
        unreachable!("run_solve dispatched with a non-Solve command")
    };
    let input = SolveCodingTaskInput {
        task: task.clone(),
        use_memory: *use_memory,
        enable_matts: *enable_matts,
        matts_k: *matts_k,
        matts_mode: (*matts_mode).into(),
        store_result: *store_result,
    };
    ctx.host.solve_coding_task(input, &ctx.workspace_id).await
}
