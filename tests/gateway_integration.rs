mod common;

use std::sync::Arc;
use std::time::Duration;

use cli_chat_gateway::cli::discovery::{Identity, candidates, check_identity, discover};
use cli_chat_gateway::cli::{CliError, CliStatus};
use cli_chat_gateway::gateway::Gateway;
use cli_chat_gateway::openai::types::{ChatCompletionRequest, OpenAIMessage};
use cli_chat_gateway::stream::{StreamFrame, stream_completion};
use common::{ScriptedLauncher, Step, fail, gateway, ok, test_config};
use futures::StreamExt;

fn math_request() -> ChatCompletionRequest {
    ChatCompletionRequest::new(
        "gpt-4o",
        vec![
            OpenAIMessage::new("system", "You are terse."),
            OpenAIMessage::new("user", "What is 2+2?"),
        ],
    )
}

#[tokio::test]
async fn test_completion_round_trip() {
    let launcher = Arc::new(ScriptedLauncher::logged_in(ok("4\n")));
    let gateway = gateway(Arc::clone(&launcher), Duration::from_secs(60));

    let response = gateway.complete(&math_request()).await.unwrap();

    assert_eq!(response.content(), Some("4"));
    assert_eq!(response.model, "gpt-4o");
    assert_eq!(response.choices[0].finish_reason, "stop");
    assert_eq!(
        response.usage.total_tokens,
        response.usage.prompt_tokens + response.usage.completion_tokens
    );
    assert_eq!(response.usage.completion_tokens, 1);
}

#[tokio::test]
async fn test_completion_arguments() {
    let launcher = Arc::new(ScriptedLauncher::logged_in(ok("4")));
    let gateway = gateway(Arc::clone(&launcher), Duration::from_secs(60));

    gateway.complete(&math_request()).await.unwrap();

    let calls = launcher.completion_calls();
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert_eq!(call[0], "claude");
    assert_eq!(call[1], "--print");
    assert_eq!(call[2], "--model");
    assert_eq!(call[3], "claude-3-5-sonnet-20241022");
    assert_eq!(
        call[4],
        "System: You are terse.\n\nHuman: What is 2+2?\n\nAssistant:"
    );
}

#[tokio::test(start_paused = true)]
async fn test_timeout_kills_child_once() {
    let launcher = Arc::new(ScriptedLauncher::logged_in(Step::Hang));
    let gateway = gateway(Arc::clone(&launcher), Duration::from_secs(60));

    let err = gateway.complete(&math_request()).await.unwrap_err();

    assert!(matches!(err, CliError::InvocationTimeout { timeout } if timeout == Duration::from_secs(60)));
    assert_eq!(err.to_string(), "CLI timed out after 60s");
    assert_eq!(launcher.kills(), 1);
}

#[tokio::test]
async fn test_unauthenticated_stderr() {
    let launcher = Arc::new(ScriptedLauncher::logged_in(fail(
        1,
        "Error: You are not authenticated. Run claude auth login.",
    )));
    let gateway = gateway(launcher, Duration::from_secs(60));

    let err = gateway.complete(&math_request()).await.unwrap_err();
    assert!(matches!(err, CliError::AuthenticationFailure));
}

#[tokio::test]
async fn test_model_and_generic_failures() {
    let launcher = Arc::new(ScriptedLauncher::logged_in(fail(
        1,
        "Model claude-x is not available",
    )));
    let err = gateway(launcher, Duration::from_secs(60))
        .complete(&math_request())
        .await
        .unwrap_err();
    assert!(matches!(err, CliError::ModelFailure(msg) if msg.contains("claude-x")));

    let launcher = Arc::new(ScriptedLauncher::logged_in(fail(2, "boom")));
    let err = gateway(launcher, Duration::from_secs(60))
        .complete(&math_request())
        .await
        .unwrap_err();
    assert!(matches!(err, CliError::GenericExecutionFailure(msg) if msg == "boom"));
}

#[tokio::test]
async fn test_blank_output_is_empty_response() {
    let launcher = Arc::new(ScriptedLauncher::logged_in(ok("  \n")));
    let err = gateway(launcher, Duration::from_secs(60))
        .complete(&math_request())
        .await
        .unwrap_err();
    assert!(matches!(err, CliError::EmptyResponse));
}

#[tokio::test]
async fn test_discovery_falls_through_candidates() {
    let launcher = ScriptedLauncher::new(|program, args| match program {
        "claude" => Step::Missing,
        "claude-code" if args.first().map(String::as_str) == Some("--version") => {
            ok("0.9.1\n")
        }
        _ => Step::Missing,
    });

    let found = discover(&launcher, &candidates(None)).await.unwrap();
    assert_eq!(found.program(), "claude-code");
    assert_eq!(launcher.calls().len(), 2);
}

#[tokio::test]
async fn test_discovery_prefers_configured_command() {
    let launcher = ScriptedLauncher::new(|_, _| ok("1.0.0"));

    let found = discover(&launcher, &candidates(Some("/opt/bin/claude")))
        .await
        .unwrap();
    assert_eq!(found.program(), "/opt/bin/claude");
}

#[tokio::test]
async fn test_discovery_exhausted() {
    let launcher = ScriptedLauncher::new(|program, _| {
        if program == "npx" {
            fail(127, "npm ERR! 404")
        } else {
            Step::Missing
        }
    });

    let err = discover(&launcher, &candidates(None)).await.unwrap_err();
    match err {
        CliError::ExecutableNotFound { tried } => {
            assert!(tried.contains("claude-code"));
            assert!(tried.contains("npx @anthropic-ai/claude-code"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_identity_probe() {
    let launcher = ScriptedLauncher::logged_in(ok("4"));
    let command = cli_chat_gateway::cli::CliCommand::parse("claude").unwrap();
    assert_eq!(
        check_identity(&launcher, &command).await,
        Identity::Authenticated {
            user: "dev@example.com".to_string()
        }
    );

    let launcher = ScriptedLauncher::new(|_, args| {
        if args.first().map(String::as_str) == Some("auth") {
            fail(1, "")
        } else {
            ok("1.0.0")
        }
    });
    assert_eq!(
        check_identity(&launcher, &command).await,
        Identity::Unauthenticated {
            reason: "Authentication failed".to_string()
        }
    );
}

#[tokio::test]
async fn test_initialize_degraded_when_logged_out() {
    let launcher = Arc::new(ScriptedLauncher::new(|program, args| {
        if program != "claude" {
            return Step::Missing;
        }
        match args.first().map(String::as_str) {
            Some("auth") => fail(1, "not logged in"),
            _ => ok("1.0.0"),
        }
    }));
    let dir = tempfile::tempdir().unwrap();

    let gateway = Gateway::initialize(&test_config(&[]), launcher, dir.path())
        .await
        .unwrap();
    assert_eq!(gateway.invoker().command().program(), "claude");
    assert_eq!(gateway.invoker().workdir(), dir.path());

    let report = gateway.health().await;
    assert_eq!(report.status, CliStatus::Degraded);
    assert_eq!(report.authenticated, Some(false));
    assert_eq!(report.version.as_deref(), Some("1.0.0"));
}

#[tokio::test]
async fn test_initialize_fails_without_cli() {
    let launcher = Arc::new(ScriptedLauncher::new(|_, _| Step::Missing));
    let dir = tempfile::tempdir().unwrap();

    let err = Gateway::initialize(&test_config(&[]), launcher, dir.path())
        .await
        .unwrap_err();
    assert!(matches!(err, CliError::ExecutableNotFound { .. }));
}

#[tokio::test]
async fn test_health_reports() {
    let launcher = Arc::new(ScriptedLauncher::logged_in(ok("4")));
    let report = gateway(launcher, Duration::from_secs(60)).health().await;
    assert_eq!(report.status, CliStatus::Healthy);
    assert_eq!(report.user.as_deref(), Some("dev@example.com"));
    assert_eq!(report.command, "claude");

    let launcher = Arc::new(ScriptedLauncher::new(|_, _| fail(1, "")));
    let report = gateway(launcher, Duration::from_secs(60)).health().await;
    assert_eq!(report.status, CliStatus::Unhealthy);
    assert_eq!(report.error.as_deref(), Some("CLI not working"));
}

#[tokio::test]
async fn test_stream_completion_frames() {
    let launcher = Arc::new(ScriptedLauncher::logged_in(ok("two plus two is four")));
    let gateway = Arc::new(gateway(launcher, Duration::from_secs(60)));

    let frames: Vec<StreamFrame> = stream_completion(gateway, math_request()).collect().await;

    let text: String = frames.iter().filter_map(StreamFrame::delta).collect();
    assert_eq!(text, "two plus two is four ");
    assert_eq!(frames.len(), 7);
    assert_eq!(frames[5].finish_reason(), Some("stop"));
    assert_eq!(frames[6], StreamFrame::Done);
}

#[tokio::test]
async fn test_stream_completion_error_frame() {
    let launcher = Arc::new(ScriptedLauncher::logged_in(fail(1, "boom")));
    let gateway = Arc::new(gateway(launcher, Duration::from_secs(60)));

    let frames: Vec<StreamFrame> = stream_completion(gateway, math_request()).collect().await;

    assert_eq!(frames.len(), 1);
    match &frames[0] {
        StreamFrame::Error(body) => {
            assert_eq!(body.error.kind, "server_error");
            assert_eq!(body.error.message, "CLI failed: boom");
        }
        other => panic!("expected error frame, got {other:?}"),
    }
}
