use std::collections::BTreeMap;

use colored::Colorize;
use reason_memory_core::error::Result;
use reason_memory_core::oracle::CacheStats;
use reason_memory_core::tools::types::{
    CacheAction, CompressPromptInput, CompressPromptOutput, GetPerformanceMetricsInput,
    ManageCacheInput, ToolMetric,
};
use reason_memory_core::types::Statistics;
use serde::Serialize;

use crate::cli::{CacheCommands, Commands};
use crate::output::Output;

use super::Context;

/// Combined `get_statistics` result: the memory-bank counters plus the
/// oracle cache's hit/miss/bypass counters.
#[derive(Debug, Clone, Serialize)]
pub struct StatsOutput {
    pub statistics: Statistics,
    pub cache: CacheStats,
}

impl Output for StatsOutput {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        let s = &self.statistics;
        writeln!(
            writer,
            "traces={} memories={} success_rate={:.1}%",
            s.trace_count,
            s.memory_count,
            s.success_rate * 100.0
        )?;
        writeln!(
            writer,
            "  success={} failure={} partial={}",
            s.success_count, s.failure_count, s.partial_count
        )?;
        writeln!(
            writer,
            "cache: hits={} misses={} bypassed={} evictions={}",
            self.cache.hits, self.cache.misses, self.cache.bypassed, self.cache.evictions
        )?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct MetricsOutput(pub BTreeMap<String, ToolMetric>);

impl Output for MetricsOutput {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        if self.0.is_empty() {
            writeln!(writer, "no tool calls recorded")?;
            return Ok(());
        }
        for (tool, metric) in &self.0 {
            writeln!(
                writer,
                "{:<24} calls={:<6} mean_latency_ms={:.1}",
                tool.bold(),
                metric.call_count,
                metric.mean_latency_ms()
            )?;
        }
        Ok(())
    }
}

impl Output for CacheStats {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(
            writer,
            "hits={} misses={} bypassed={} evictions={}",
            self.hits, self.misses, self.bypassed, self.evictions
        )?;
        Ok(())
    }
}

impl Output for CompressPromptOutput {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(
            writer,
            "tokens {} -> {}",
            self.tokens_before, self.tokens_after
        )?;
        writeln!(writer, "\n{}", self.compressed)?;
        Ok(())
    }
}

pub async fn run_stats(ctx: &Context) -> Result<StatsOutput> {
    let (statistics, cache) = ctx.host.get_statistics().await?;
    Ok(StatsOutput { statistics, cache })
}

pub fn run_metrics(ctx: &Context, command: &Commands) -> MetricsOutput {
    let Commands::Metrics { reset_after_read } = command else {
        unreachable!("run_metrics dispatched with a non-Metrics command")
    };
    let metrics = ctx.host.get_performance_metrics(GetPerformanceMetricsInput {
        reset_after_read: *reset_after_read,
    });
    MetricsOutput(metrics.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

pub fn run_cache(ctx: &Context, command: &Commands) -> Result<CacheStats> {
    let Commands::Cache { action } = command else {
        unreachable!("run_cache dispatched with a non-Cache command")
    };
    let input = match action {
        CacheCommands::Stats => ManageCacheInput {
            action: CacheAction::Statistics,
            key: None,
        },
        CacheCommands::Clear => ManageCacheInput {
            action: CacheAction::Clear,
            key: None,
        },
        CacheCommands::Invalidate { key } => ManageCacheInput {
            action: CacheAction::Invalidate,
            key: key.clone(),
        },
    };
    ctx.host.manage_cache(input)
}

pub fn run_compress(ctx: &Context, command: &Commands) -> CompressPromptOutput {
    let Commands::Compress {
        prompt,
        max_tokens,
        compression_ratio,
    } = command
    else {
        unreachable!("run_compress dispatched with a non-Compress command")
    };
    ctx.host.compress_prompt(CompressPromptInput {
        prompt: prompt.clone(),
        max_tokens: *max_tokens,
        compression_ratio: *compression_ratio,
    })
}
