//! Matrix builds, naming and failure reporting.

use buildmatrix_lib::config::BuildSpec;
use buildmatrix_lib::execute::{self, BuildError, Stage};
use buildmatrix_lib::platform::{Arch, ArmVersion, Os, Target};

use super::common::{GOOD_MAIN, NO_MAIN, TestProject, host_binary, host_build, project};

#[tokio::test]
async fn full_pipe_writes_binary() {
  let env = TestProject::new(GOOD_MAIN);
  let mut build = host_build("testing");
  build.flags = "-v".to_string();
  build.ldflags = "-X main.test=testing".to_string();

  let ctx = env.context("testing");
  execute::run(&ctx, &project("testing", vec![build]), &env.config())
    .await
    .unwrap();

  assert!(env.path(&host_binary("testing")).exists());
  assert_eq!(ctx.artifacts().len(), 1);
}

#[tokio::test]
async fn binary_name_template_sees_project_name() {
  let env = TestProject::new(GOOD_MAIN);
  let build = host_build("binary-{{.Binary}}");

  let ctx = env.context("testing");
  execute::run(&ctx, &project("testing", vec![build]), &env.config())
    .await
    .unwrap();

  assert!(env.path(&host_binary("binary-testing")).exists());
}

#[tokio::test]
async fn arm_builds() {
  let env = TestProject::new(GOOD_MAIN);
  let build = BuildSpec {
    main: ".".to_string(),
    binary: "armtesting_{{.Arch}}{{.Arm}}".to_string(),
    flags: "-v".to_string(),
    ldflags: "-X main.test=armtesting".to_string(),
    goos: vec![Os::Linux],
    goarch: vec![Arch::Arm, Arch::Arm64],
    goarm: vec![ArmVersion::V6],
    ..Default::default()
  };

  let ctx = env.context("armtesting");
  let report = execute::execute_builds(&ctx, &project("armtesting", vec![build]), &env.config()).await;
  assert!(report.is_success());

  let mut targets: Vec<Target> = ctx.artifacts().into_iter().map(|a| a.target).collect();
  targets.sort();
  assert_eq!(
    targets,
    vec![
      Target::with_arm(Os::Linux, Arch::Arm, ArmVersion::V6),
      Target::new(Os::Linux, Arch::Arm64),
    ]
  );
  let arm = std::fs::read_to_string(env.path("armtesting_arm6")).unwrap();
  assert_eq!(arm.trim(), "GOOS=linux GOARCH=arm GOARM=6");
  let arm64 = std::fs::read_to_string(env.path("armtesting_arm64")).unwrap();
  assert_eq!(arm64.trim(), "GOOS=linux GOARCH=arm64 GOARM=");
}

#[tokio::test]
async fn build_failed_keeps_toolchain_diagnostics() {
  let env = TestProject::new(GOOD_MAIN);
  let mut build = host_build("app");
  build.flags = "-flag-that-dont-exists-to-force-failure".to_string();

  let ctx = env.context("app");
  let err = execute::run(&ctx, &project("app", vec![build]), &env.config())
    .await
    .unwrap_err();

  assert!(matches!(err, BuildError::Compile { .. }));
  assert!(
    err
      .to_string()
      .contains("flag provided but not defined: -flag-that-dont-exists-to-force-failure"),
    "{err}"
  );
  assert!(ctx.artifacts().is_empty());
}

#[tokio::test]
async fn invalid_os_arch_pair_builds_nothing() {
  let env = TestProject::new(GOOD_MAIN);
  let build = BuildSpec {
    main: ".".to_string(),
    binary: "app".to_string(),
    flags: "-v".to_string(),
    goos: vec![Os::Windows],
    goarch: vec![Arch::Arm],
    ..Default::default()
  };

  let ctx = env.context("app");
  execute::run(&ctx, &project("app", vec![build]), &env.config())
    .await
    .unwrap();
  assert!(ctx.artifacts().is_empty());
}

#[tokio::test]
async fn invalid_name_template() {
  let env = TestProject::new(GOOD_MAIN);
  let mut build = host_build("namet{{.est}");
  build.flags = "-v".to_string();

  let ctx = env.context("nameeeee");
  let err = execute::run(&ctx, &project("nameeeee", vec![build]), &env.config())
    .await
    .unwrap_err();
  assert_eq!(err.to_string(), r#"template: nameeeee:1: unexpected "}" in operand"#);
  assert!(ctx.artifacts().is_empty());
}

#[tokio::test]
async fn invalid_ldflags() {
  let env = TestProject::new(GOOD_MAIN);
  let mut build = host_build("nametest");
  build.flags = "-v".to_string();
  build.ldflags = "-s -w -X main.version={{.Version}".to_string();

  let ctx = env.context("nametest");
  let err = execute::run(&ctx, &project("nametest", vec![build]), &env.config())
    .await
    .unwrap_err();
  assert_eq!(err.to_string(), r#"template: ldflags:1: unexpected "}" in operand"#);
}

#[tokio::test]
async fn missing_main_function() {
  let env = TestProject::new(NO_MAIN);

  for main in [".", "main.go"] {
    let mut build = host_build("no-main");
    build.main = main.to_string();

    let ctx = env.context("no-main");
    let report = execute::execute_builds(&ctx, &project("no-main", vec![build]), &env.config()).await;
    assert_eq!(report.builds[0].failed_at, Some(Stage::Validating));
    assert_eq!(
      report.into_result().unwrap_err().to_string(),
      "build for no-main does not contain a main function"
    );
  }
}

#[tokio::test]
async fn templates_are_rendered_per_run() {
  let env = TestProject::new(GOOD_MAIN);
  let mut build = host_build("{{.Binary}}-{{.Version}}");
  let config = env.config();

  let ctx = env.context("app").with_version("1.0.0");
  execute::run(&ctx, &project("app", vec![build.clone()]), &config)
    .await
    .unwrap();
  assert!(env.path(&host_binary("app-1.0.0")).exists());

  build.binary = "{{.Binary}}-next".to_string();
  let ctx = env.context("app").with_version("1.0.1");
  execute::run(&ctx, &project("app", vec![build]), &config).await.unwrap();
  assert!(env.path(&host_binary("app-next")).exists());
}

#[tokio::test]
async fn several_failing_builds_are_all_reported() {
  let env = TestProject::new(GOOD_MAIN);
  let mut first = host_build("first");
  first.flags = "-bad-one".to_string();
  let mut second = host_build("second");
  second.flags = "-bad-two".to_string();

  let ctx = env.context("app");
  let err = execute::run(&ctx, &project("app", vec![first, second]), &env.config())
    .await
    .unwrap_err();

  let BuildError::Multiple(errors) = &err else {
    panic!("expected an aggregate error, got {err}");
  };
  assert_eq!(errors.len(), 2);
  let message = err.to_string();
  let lines: Vec<&str> = message.lines().filter(|l| l.starts_with("failed to build")).collect();
  assert_eq!(lines.len(), 2, "{message}");
  assert!(message.contains("-bad-one"));
  assert!(message.contains("-bad-two"));
}

#[tokio::test]
async fn wide_matrix_under_limited_parallelism() {
  let env = TestProject::new(GOOD_MAIN);
  let build = BuildSpec {
    main: ".".to_string(),
    binary: "{{.Binary}}_{{.Os}}_{{.Arch}}{{.Arm}}".to_string(),
    goos: vec![Os::Linux, Os::Freebsd, Os::Windows, Os::Darwin],
    goarch: vec![Arch::Amd64, Arch::X86, Arch::Arm, Arch::Arm64],
    goarm: vec![ArmVersion::V6, ArmVersion::V7],
    ..Default::default()
  };
  let mut config = env.config();
  config.parallelism = 3;

  let ctx = env.context("wide");
  let report = execute::execute_builds(&ctx, &project("wide", vec![build]), &config).await;
  assert!(report.is_success());

  // linux 5, freebsd 5, windows 3, darwin 2
  assert_eq!(report.target_count(), 15);
  assert_eq!(ctx.artifacts().len(), 15);
  assert!(env.path("wide_windows_386.exe").exists());
  assert!(env.path("wide_freebsd_arm7").exists());
}
