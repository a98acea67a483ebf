//! Hooks around a build's targets.

use buildmatrix_lib::config::Hooks;
use buildmatrix_lib::execute::{self, BuildError, HookPhase, Stage};

use super::common::{GOOD_MAIN, TestProject, host_binary, host_build, project};

#[tokio::test]
async fn pre_and_post_hooks_run() {
  let env = TestProject::new(GOOD_MAIN);
  let pre = env.path("pre");
  let post = env.path("post");
  let mut build = host_build("testing");
  build.hooks = Hooks {
    pre: Some(format!("touch {}", pre.display())),
    post: Some(format!("touch {}", post.display())),
  };

  let ctx = env.context("testing");
  execute::run(&ctx, &project("testing", vec![build]), &env.config())
    .await
    .unwrap();

  assert!(pre.exists());
  assert!(post.exists());
  assert!(env.path(&host_binary("testing")).exists());
}

#[tokio::test]
async fn failing_pre_hook_stops_before_compiling() {
  let env = TestProject::new(GOOD_MAIN);
  let mut build = host_build("hooks");
  build.hooks.pre = Some("exit 1".to_string());

  let ctx = env.context("hooks");
  let report = execute::execute_builds(&ctx, &project("hooks", vec![build]), &env.config()).await;
  assert_eq!(report.builds[0].failed_at, Some(Stage::PreHook));
  assert!(ctx.artifacts().is_empty());
  assert!(!env.path(&host_binary("hooks")).exists());

  let err = report.into_result().unwrap_err();
  assert!(matches!(
    err,
    BuildError::Hook {
      phase: HookPhase::Pre,
      ..
    }
  ));
  assert_eq!(err.to_string(), "pre hook failed: ");
}

#[tokio::test]
async fn failing_post_hook_keeps_artifacts() {
  let env = TestProject::new(GOOD_MAIN);
  let mut build = host_build("hooks");
  build.hooks.post = Some("exit 1".to_string());

  let ctx = env.context("hooks");
  let err = execute::run(&ctx, &project("hooks", vec![build]), &env.config())
    .await
    .unwrap_err();

  assert_eq!(err.to_string(), "post hook failed: ");
  assert_eq!(ctx.artifacts().len(), 1);
  assert!(env.path(&host_binary("hooks")).exists());
}

#[tokio::test]
async fn hook_stderr_is_reported_verbatim() {
  let env = TestProject::new(GOOD_MAIN);
  let mut build = host_build("hooks");
  build.hooks.pre = Some("echo 'generate: missing schema.json' >&2; exit 3".to_string());

  let ctx = env.context("hooks");
  let err = execute::run(&ctx, &project("hooks", vec![build]), &env.config())
    .await
    .unwrap_err();
  assert_eq!(err.to_string(), "pre hook failed: generate: missing schema.json");
}

#[tokio::test]
async fn hooks_see_build_env() {
  let env = TestProject::new(GOOD_MAIN);
  let mut build = host_build("hooks");
  build.env = vec!["RELEASE_CHANNEL=beta".to_string()];
  build.hooks.pre = Some("test \"$RELEASE_CHANNEL\" = beta".to_string());

  let ctx = env.context("hooks");
  execute::run(&ctx, &project("hooks", vec![build]), &env.config())
    .await
    .unwrap();
}
