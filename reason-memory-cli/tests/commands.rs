//! Exercises the subcommand handlers directly against an in-memory storage
//! backend and a scripted LLM client, bypassing the real HTTP oracle and
//! config loader (see `reason_memory_cli::commands::Context`).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reason_memory_cli::cli::{BackupCommands, CacheCommands, Commands, MattsModeArg, WorkspaceCommands};
use reason_memory_cli::commands::Context;
use reason_memory_cli::config::Config;
use reason_memory_core::embeddings::DeterministicEmbedder;
use reason_memory_core::oracle::{CachedOracle, MockLlmClient, ReasoningEffort};
use reason_memory_core::reasoning::ReasoningEngine;
use reason_memory_core::MemoryCore;
use reason_memory_test_utils::InMemoryStorage;

fn test_context(mock: MockLlmClient) -> Context {
    let storage = Arc::new(InMemoryStorage::new());
    let embedder = Arc::new(DeterministicEmbedder::new());
    let memory = MemoryCore::new(storage, embedder);
    let oracle = Arc::new(CachedOracle::new(Box::new(mock), 16, Duration::from_secs(60)));
    let engine = ReasoningEngine::new(
        Arc::clone(&oracle),
        memory.clone(),
        "test-model",
        ReasoningEffort::Low,
    )
    .with_loop_config(1, 0.0, 5);
    Context::new(engine, memory, oracle, "workspace-a".to_string(), Config::default())
}

#[tokio::test]
async fn capture_then_retrieve_round_trips_a_memory() {
    let ctx = test_context(MockLlmClient::new());

    let capture = Commands::Capture {
        question: "How do I retry a flaky HTTP call?".to_string(),
        answer: "```\nfor attempt in 0..3 { if call().is_ok() { break } }\n```\nBack off between attempts."
            .to_string(),
        force_store: false,
    };
    let captured = reason_memory_cli::commands::run_capture(&ctx, &capture)
        .await
        .expect("capture_knowledge should succeed");
    assert!(captured.stored, "a long, code-bearing answer should clear the quality bar");

    let retrieve = Commands::Retrieve {
        query: "retry flaky HTTP call".to_string(),
        n_results: 5,
        domain_filter: None,
        pattern_tags: None,
        include_failures: true,
        min_score: 0.0,
    };
    let found = reason_memory_cli::commands::run_retrieve(&ctx, &retrieve)
        .await
        .expect("retrieve_memories should succeed");
    assert_eq!(found.0.len(), 1);
    assert_eq!(found.0[0].id, captured.memory_id.unwrap());
}

#[tokio::test]
async fn capture_below_quality_bar_is_not_stored_unless_forced() {
    let ctx = test_context(MockLlmClient::new());
    let input = Commands::Capture {
        question: "q".to_string(),
        answer: "short".to_string(),
        force_store: false,
    };
    let result = reason_memory_cli::commands::run_capture(&ctx, &input).await.unwrap();
    assert!(!result.stored);

    let forced = Commands::Capture {
        question: "q".to_string(),
        answer: "short".to_string(),
        force_store: true,
    };
    let result = reason_memory_cli::commands::run_capture(&ctx, &forced).await.unwrap();
    assert!(result.stored);
}

#[tokio::test]
async fn workspace_set_get_clear_round_trips() {
    let ctx = test_context(MockLlmClient::new());
    let tmp = tempfile::tempdir().unwrap();

    let set = Commands::Workspace {
        action: WorkspaceCommands::Set {
            path: tmp.path().to_path_buf(),
        },
    };
    let set_result = reason_memory_cli::commands::run_workspace(&ctx, &set).unwrap();
    assert!(set_result.id.is_some());

    let get = Commands::Workspace {
        action: WorkspaceCommands::Get,
    };
    let get_result = reason_memory_cli::commands::run_workspace(&ctx, &get).unwrap();
    assert_eq!(get_result.id, set_result.id);

    let clear = Commands::Workspace {
        action: WorkspaceCommands::Clear,
    };
    let clear_result = reason_memory_cli::commands::run_workspace(&ctx, &clear).unwrap();
    assert!(clear_result.id.is_none());
}

#[tokio::test]
async fn cache_clear_and_stats_reflect_each_other() {
    let ctx = test_context(MockLlmClient::new());

    let clear = Commands::Cache {
        action: CacheCommands::Clear,
    };
    reason_memory_cli::commands::run_cache(&ctx, &clear).unwrap();

    let stats = Commands::Cache {
        action: CacheCommands::Stats,
    };
    let stats = reason_memory_cli::commands::run_cache(&ctx, &stats).unwrap();
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.misses, 0);
}

#[test]
fn compress_prompt_shrinks_over_budget_input() {
    let ctx = test_context(MockLlmClient::new());
    let long_prompt = "word ".repeat(2000);
    let command = Commands::Compress {
        prompt: long_prompt.clone(),
        max_tokens: 100,
        compression_ratio: 0.5,
    };
    let output = reason_memory_cli::commands::run_compress(&ctx, &command);
    assert!(output.tokens_after <= output.tokens_before);
    assert!(output.compressed.len() < long_prompt.len());
}

#[tokio::test]
async fn backup_create_then_validate_round_trips() {
    let ctx = test_context(MockLlmClient::new());
    let tmp = tempfile::tempdir().unwrap();
    let path: PathBuf = tmp.path().join("snapshot");

    let capture = Commands::Capture {
        question: "what is exponential backoff".to_string(),
        answer: "```\nsleep = base * 2 ** attempt\n```\nCap it and add jitter.".to_string(),
        force_store: false,
    };
    reason_memory_cli::commands::run_capture(&ctx, &capture).await.unwrap();

    let create = Commands::Backup {
        action: BackupCommands::Create {
            path: path.clone(),
            incremental: false,
        },
    };
    let manifest = reason_memory_cli::commands::run_backup(&ctx, &create).await.unwrap();
    assert_eq!(manifest.memory_count, 1);

    let validate = Commands::Backup {
        action: BackupCommands::Validate { path },
    };
    let validated = reason_memory_cli::commands::run_backup(&ctx, &validate).await.unwrap();
    assert_eq!(validated.memory_count, manifest.memory_count);
    assert_eq!(validated.checksum, manifest.checksum);
}

#[tokio::test]
async fn cleanup_confirm_without_a_workspace_id_is_rejected() {
    let ctx = test_context(MockLlmClient::new());
    let command = Commands::Cleanup {
        retention_days: 90,
        workspace_id: None,
        confirm: true,
    };
    let err = reason_memory_cli::commands::run_cleanup(&ctx, &command)
        .await
        .expect_err("--confirm with no target workspace must be rejected");
    assert!(matches!(err, reason_memory_core::Error::ConfirmationRequired(_)));
}

#[tokio::test]
async fn cleanup_scoped_retention_without_confirm_does_not_purge_the_workspace() {
    let ctx = test_context(MockLlmClient::new());
    let capture = Commands::Capture {
        question: "how do I cache expensive calls".to_string(),
        answer: "```\nmemo = {}\ndef f(x): return memo.setdefault(x, compute(x))\n```\nAvoids recompute."
            .to_string(),
        force_store: false,
    };
    reason_memory_cli::commands::run_capture(&ctx, &capture).await.unwrap();

    let command = Commands::Cleanup {
        retention_days: 90,
        workspace_id: Some("workspace-a".to_string()),
        confirm: false,
    };
    let outcome = reason_memory_cli::commands::run_cleanup(&ctx, &command).await.unwrap();
    match outcome {
        reason_memory_core::tools::types::CleanupOutcome::Retention(report) => {
            assert_eq!(report.deleted_traces, 0, "fresh data is within the retention window");
        }
        other => panic!("expected a retention sweep, got {other:?}"),
    }
}

#[tokio::test]
async fn cleanup_confirm_with_workspace_id_purges_it_entirely() {
    let ctx = test_context(MockLlmClient::new());
    let capture = Commands::Capture {
        question: "how do I cache expensive calls".to_string(),
        answer: "```\nmemo = {}\ndef f(x): return memo.setdefault(x, compute(x))\n```\nAvoids recompute."
            .to_string(),
        force_store: false,
    };
    reason_memory_cli::commands::run_capture(&ctx, &capture).await.unwrap();

    let command = Commands::Cleanup {
        retention_days: 90,
        workspace_id: Some("workspace-a".to_string()),
        confirm: true,
    };
    let outcome = reason_memory_cli::commands::run_cleanup(&ctx, &command).await.unwrap();
    match outcome {
        reason_memory_core::tools::types::CleanupOutcome::WorkspaceDeleted(report) => {
            assert_eq!(report.deleted_traces, 1);
        }
        other => panic!("expected a full workspace purge, got {other:?}"),
    }
}

#[tokio::test]
async fn solve_single_trajectory_against_a_scripted_oracle() {
    let mock = MockLlmClient::new();
    mock.push_response("fn add(a: i32, b: i32) -> i32 { a + b }");
    mock.push_response(r#"{"score":0.9,"feedback":"compiles and matches the task"}"#);
    mock.push_response(
        r#"{"verdict":"success","score":0.9,"reasoning":"meets the task","learnings":["keep signatures small"]}"#,
    );
    let ctx = test_context(mock);

    let command = Commands::Solve {
        task: "write an add function in rust".to_string(),
        use_memory: false,
        enable_matts: false,
        matts_k: 3,
        matts_mode: MattsModeArg::Parallel,
        store_result: false,
    };
    let result = reason_memory_cli::commands::run_solve(&ctx, &command).await.unwrap();
    assert!(result.success);
    assert_eq!(result.iterations, 1);
    assert!(result.output.contains("fn add"));
}

#[tokio::test]
async fn matts_parallel_solve_produces_k_generates_and_one_select() {
    let mock = MockLlmClient::new();
    mock.push_response("candidate zero");
    mock.push_response("candidate one");
    mock.push_response("candidate two");
    mock.push_response(r#"{"selected_index":1,"score":0.8,"justification":"most complete"}"#);
    mock.push_response(
        r#"{"verdict":"success","score":0.8,"reasoning":"meets the task","learnings":["prefer the fuller candidate"]}"#,
    );
    let ctx = test_context(mock);

    let command = Commands::Solve {
        task: "write an add function in rust".to_string(),
        use_memory: false,
        enable_matts: true,
        matts_k: 3,
        matts_mode: MattsModeArg::Parallel,
        store_result: false,
    };
    let result = reason_memory_cli::commands::run_solve(&ctx, &command).await.unwrap();

    assert_eq!(result.output, "candidate one");
    assert_eq!(result.selected_trajectory, Some(1));
    let generate_steps = result
        .trajectory
        .iter()
        .filter(|s| matches!(s.action, reason_memory_core::types::StepAction::Generate))
        .count();
    assert_eq!(generate_steps, 3, "each MaTTS-parallel candidate is one GENERATE step");
    let select_steps: Vec<_> = result
        .trajectory
        .iter()
        .filter(|s| matches!(s.action, reason_memory_core::types::StepAction::Select))
        .collect();
    assert_eq!(select_steps.len(), 1);
    assert_eq!(select_steps[0].trajectory_id, Some(1));
}
