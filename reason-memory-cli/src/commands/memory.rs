use colored::Colorize;
use reason_memory_core::error::Result;
use reason_memory_core::tools::types::{
    CaptureKnowledgeInput, CaptureKnowledgeOutput, GetMemoryGenealogyInput, RenderedMemory,
    RetrieveMemoriesInput, SearchKnowledgeInput, SearchWeights,
};
use reason_memory_core::memory::genealogy::GenealogyNode;

use crate::cli::Commands;
use crate::output::Output;

use super::{Context, ListOutput};

impl Output for ListOutput<RenderedMemory> {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        if self.0.is_empty() {
            writeln!(writer, "no memories matched")?;
            return Ok(());
        }
        for memory in &self.0 {
            let marker = if memory.is_error_learning {
                "[error]".red().bold()
            } else {
                "[success]".green().bold()
            };
            writeln!(
                writer,
                "{marker} {} (score {:.3}) — {}\n  {}",
                memory.title.bold(),
                memory.score,
                memory.description,
                memory.id
            )?;
        }
        Ok(())
    }
}

impl Output for ListOutput<GenealogyNode> {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        if self.0.is_empty() {
            writeln!(writer, "no genealogy nodes found")?;
            return Ok(());
        }
        for node in &self.0 {
            writeln!(
                writer,
                "depth {}  stage {}  {}  parent={:?}",
                node.depth, node.evolution_stage, node.id, node.parent_memory_id
            )?;
        }
        Ok(())
    }
}

impl Output for CaptureKnowledgeOutput {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        writeln!(writer, "quality score: {:.3}", self.quality_score)?;
        if self.stored {
            writeln!(writer, "{} memory {:?}", "stored".green().bold(), self.memory_id)?;
        } else {
            writeln!(writer, "{} (below quality threshold)", "not stored".yellow())?;
        }
        Ok(())
    }
}

pub async fn run_retrieve(ctx: &Context, command: &Commands) -> Result<ListOutput<RenderedMemory>> {
    let Commands::Retrieve {
        query,
        n_results,
        domain_filter,
        pattern_tags,
        include_failures,
        min_score,
    } = command
    else {
        unreachable!("run_retrieve dispatched with a non-Retrieve command")
    };
    let input = RetrieveMemoriesInput {
        query: query.clone(),
        n_results: *n_results,
        domain_filter: domain_filter.clone(),
        pattern_tags: pattern_tags.clone(),
        include_failures: *include_failures,
        min_score: *min_score,
    };
    let memories = ctx.host.retrieve_memories(input, &ctx.workspace_id).await?;
    Ok(ListOutput(memories))
}

pub async fn run_capture(ctx: &Context, command: &Commands) -> Result<CaptureKnowledgeOutput> {
    let Commands::Capture {
        question,
        answer,
        force_store,
    } = command
    else {
        unreachable!("run_capture dispatched with a non-Capture command")
    };
    let input = CaptureKnowledgeInput {
        question: question.clone(),
        answer: answer.clone(),
        force_store: *force_store,
    };
    ctx.host.capture_knowledge(input, &ctx.workspace_id).await
}

pub async fn run_search(ctx: &Context, command: &Commands) -> Result<ListOutput<RenderedMemory>> {
    let Commands::Search {
        query,
        semantic_weight,
        quality_weight,
        recency_weight,
        domain_filter,
    } = command
    else {
        unreachable!("run_search dispatched with a non-Search command")
    };
    let input = SearchKnowledgeInput {
        query: query.clone(),
        weights: SearchWeights {
            semantic: *semantic_weight,
            quality: *quality_weight,
            recency: *recency_weight,
        },
        domain_filter: domain_filter.clone(),
        difficulty_filter: None,
    };
    let memories = ctx.host.search_knowledge(input, &ctx.workspace_id).await?;
    Ok(ListOutput(memories))
}

pub async fn run_genealogy(ctx: &Context, command: &Commands) -> Result<ListOutput<GenealogyNode>> {
    let Commands::Genealogy { memory_id, depth } = command else {
        unreachable!("run_genealogy dispatched with a non-Genealogy command")
    };
    let input = GetMemoryGenealogyInput {
        memory_id: *memory_id,
        depth: *depth,
    };
    let nodes = ctx.host.get_memory_genealogy(input, &ctx.workspace_id).await?;
    Ok(ListOutput(nodes))
}
