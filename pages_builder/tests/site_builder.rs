mod common;

use std::sync::{Arc, Mutex};

use common::{create_site_dir, Fixture, ScriptedRunner, CLONE_COMMAND};
use pages_builder::site_config::PAGES_CONFIG;
use pages_builder::{BuildError, BuildState, SiteBuilder, Step};

fn builder(fixture: &Fixture, runner: &Arc<ScriptedRunner>) -> SiteBuilder {
    SiteBuilder::new(fixture.opts.clone(), fixture.logger(), runner.clone())
}

#[tokio::test]
async fn clones_the_repo_if_the_directory_does_not_exist() {
    let fixture = Fixture::new();
    let runner = ScriptedRunner::new();
    let site = fixture.site_path().to_path_buf();
    let seen_config = Arc::new(Mutex::new(None));

    let seen = seen_config.clone();
    runner
        .then_run(0, move |_| create_site_dir(&site))
        .then_run(0, move |cmd| {
            *seen.lock().unwrap() = std::fs::read_to_string(cmd.cwd.join(PAGES_CONFIG)).ok();
        });

    builder(&fixture, &runner).build().await.unwrap();

    assert_eq!(
        runner.calls(),
        vec![
            CLONE_COMMAND.to_string(),
            fixture.jekyll_build(&fixture.default_destination()),
        ]
    );
    let commands = runner.commands();
    assert_eq!(commands[0].cwd, fixture.opts.repo_dir);
    assert_eq!(commands[1].cwd, fixture.opts.site_path);

    assert_eq!(
        seen_config.lock().unwrap().as_deref(),
        Some("baseurl: /repo_name\nasset_root: /guides-template\n")
    );
    assert!(!fixture.site_file(PAGES_CONFIG).exists());
    assert_eq!(
        fixture.log_lines(),
        vec![
            format!("cloning repo_name into {}", fixture.site_path().display()),
            format!("generating {PAGES_CONFIG}"),
            format!("removing generated {PAGES_CONFIG}"),
        ]
    );
}

#[tokio::test]
async fn reports_an_error_if_the_clone_fails() {
    let fixture = Fixture::new();
    let runner = ScriptedRunner::new();
    runner.then_exit(1);

    let err = builder(&fixture, &runner).build().await.unwrap_err();

    assert!(matches!(err, BuildError::CloneFailed { exit_code: 1, .. }));
    assert_eq!(
        err.to_string(),
        format!("Error: failed to clone repo_name with exit code 1 from command: {CLONE_COMMAND}")
    );
    assert_eq!(runner.calls(), vec![CLONE_COMMAND.to_string()]);
    assert_eq!(
        fixture.log_lines(),
        vec![format!("cloning repo_name into {}", fixture.site_path().display())]
    );
}

#[tokio::test]
async fn syncs_the_repo_if_the_directory_already_exists() {
    let fixture = Fixture::new();
    fixture.create_site();
    let runner = ScriptedRunner::new();

    builder(&fixture, &runner).build().await.unwrap();

    assert_eq!(
        runner.calls(),
        vec![
            "git stash".to_string(),
            "git pull".to_string(),
            fixture.jekyll_build(&fixture.default_destination()),
        ]
    );
    assert!(runner.commands().iter().all(|c| c.cwd == fixture.opts.site_path));
    assert_eq!(
        fixture.log_lines(),
        vec![
            "syncing repo: repo_name".to_string(),
            format!("generating {PAGES_CONFIG}"),
            format!("removing generated {PAGES_CONFIG}"),
        ]
    );
}

#[tokio::test]
async fn pull_failure_is_a_rebuild_failure() {
    let fixture = Fixture::new();
    fixture.create_site();
    let runner = ScriptedRunner::new();
    runner.then_exit(0).then_exit(128);

    let err = builder(&fixture, &runner).build().await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "Error: rebuild failed for repo_name with exit code 128 from command: git pull"
    );
    assert_eq!(runner.calls(), vec!["git stash", "git pull"]);
}

#[tokio::test]
async fn stash_failure_stops_before_pull() {
    let fixture = Fixture::new();
    fixture.create_site();
    let runner = ScriptedRunner::new();
    runner.then_exit(1);

    let err = builder(&fixture, &runner).build().await.unwrap_err();

    assert!(matches!(err, BuildError::RebuildFailed { .. }));
    assert_eq!(runner.calls(), vec!["git stash"]);
}

#[tokio::test]
async fn uses_bundler_if_a_gemfile_is_present() {
    let fixture = Fixture::new();
    fixture.create_site_with("Gemfile", "");
    let runner = ScriptedRunner::new();

    builder(&fixture, &runner).build().await.unwrap();

    assert_eq!(
        runner.calls(),
        vec![
            "git stash".to_string(),
            "git pull".to_string(),
            "bundle install".to_string(),
            format!("bundle exec {}", fixture.jekyll_build(&fixture.default_destination())),
        ]
    );
    assert!(!fixture.site_file(PAGES_CONFIG).exists());
}

#[tokio::test]
async fn fails_if_bundle_install_fails() {
    let fixture = Fixture::new();
    fixture.create_site_with("Gemfile", "");
    let runner = ScriptedRunner::new();
    runner.then_exit(0).then_exit(0).then_exit(1);

    let err = builder(&fixture, &runner).build().await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "Error: rebuild failed for repo_name with exit code 1 from command: bundle install"
    );
    assert_eq!(runner.calls(), vec!["git stash", "git pull", "bundle install"]);
    assert_eq!(fixture.log_lines(), vec!["syncing repo: repo_name"]);
    assert!(!fixture.site_file(PAGES_CONFIG).exists());
}

#[tokio::test]
async fn fails_if_jekyll_build_fails_and_still_removes_generated_config() {
    let fixture = Fixture::new();
    fixture.create_site_with("Gemfile", "");
    let runner = ScriptedRunner::new();
    runner.then_exit(0).then_exit(0).then_exit(0).then_exit(1);

    let err = builder(&fixture, &runner).build().await.unwrap_err();

    let jekyll_build = format!(
        "bundle exec {}",
        fixture.jekyll_build(&fixture.default_destination())
    );
    assert_eq!(
        err.to_string(),
        format!("Error: rebuild failed for repo_name with exit code 1 from command: {jekyll_build}")
    );
    assert_eq!(
        runner.calls(),
        vec![
            "git stash".to_string(),
            "git pull".to_string(),
            "bundle install".to_string(),
            jekyll_build,
        ]
    );
    assert!(!fixture.site_file(PAGES_CONFIG).exists());
    assert_eq!(
        fixture.log_lines(),
        vec![
            "syncing repo: repo_name".to_string(),
            format!("generating {PAGES_CONFIG}"),
            format!("removing generated {PAGES_CONFIG}"),
        ]
    );
}

#[tokio::test]
async fn uses_existing_pages_config_if_present() {
    let fixture = Fixture::new();
    fixture.create_site_with(PAGES_CONFIG, "");
    let runner = ScriptedRunner::new();

    builder(&fixture, &runner).build().await.unwrap();

    assert_eq!(
        runner.calls(),
        vec![
            "git stash".to_string(),
            "git pull".to_string(),
            fixture.jekyll_build(&fixture.default_destination()),
        ]
    );
    assert!(fixture.site_file(PAGES_CONFIG).exists());
    assert_eq!(
        fixture.log_lines(),
        vec![
            "syncing repo: repo_name".to_string(),
            format!("using existing {PAGES_CONFIG}"),
        ]
    );
}

#[tokio::test]
async fn uses_baseurl_from_pages_config_as_destination() {
    let fixture = Fixture::new();
    fixture.create_site_with(PAGES_CONFIG, "baseurl:  /new-destination  ");
    let runner = ScriptedRunner::new();

    builder(&fixture, &runner).build().await.unwrap();

    let destination = fixture.opts.dest_dir.join("new-destination");
    assert_eq!(
        runner.calls().last().unwrap(),
        &fixture.jekyll_build(&destination.display().to_string())
    );
    assert_eq!(
        std::fs::read_to_string(fixture.site_file(PAGES_CONFIG)).unwrap(),
        "baseurl:  /new-destination  "
    );
}

#[tokio::test]
async fn uses_rsync_if_jekyll_config_is_not_present() {
    let fixture = Fixture::new();
    fixture.create_site_with(PAGES_CONFIG, "");
    std::fs::remove_file(fixture.site_file("_config.yml")).unwrap();
    let runner = ScriptedRunner::new();

    builder(&fixture, &runner).build().await.unwrap();

    assert_eq!(
        runner.calls(),
        vec![
            "git stash".to_string(),
            "git pull".to_string(),
            format!(
                "rsync -vaxp --delete --ignore-errors ./ {}",
                fixture.default_destination()
            ),
        ]
    );
    assert_eq!(fixture.log_lines(), vec!["syncing repo: repo_name"]);
}

#[tokio::test]
async fn rsync_failure_is_a_rebuild_failure() {
    let fixture = Fixture::new();
    std::fs::create_dir_all(fixture.site_path()).unwrap();
    let runner = ScriptedRunner::new();
    runner.then_exit(0).then_exit(0).then_exit(23);

    let err = builder(&fixture, &runner).build().await.unwrap_err();

    assert!(matches!(err, BuildError::RebuildFailed { exit_code: 23, .. }));
}

#[tokio::test]
async fn program_that_cannot_start_still_cleans_up() {
    let fixture = Fixture::new();
    fixture.create_site();
    let runner = ScriptedRunner::new();
    runner.then_exit(0).then_exit(0).then_fail_to_start();

    let err = builder(&fixture, &runner).build().await.unwrap_err();

    assert!(matches!(err, BuildError::Spawn { .. }));
    assert!(err.to_string().contains("jekyll build --trace"));
    assert!(!fixture.site_file(PAGES_CONFIG).exists());
}

#[tokio::test]
async fn start_branches_on_working_copy_presence() {
    let fixture = Fixture::new();
    let runner = ScriptedRunner::new();
    let builder = builder(&fixture, &runner);
    let mut state = BuildState::new(&fixture.opts);

    assert_eq!(builder.transition(Step::Start, &mut state).await.unwrap(), Step::CloneRepo);
    fixture.create_site();
    assert_eq!(builder.transition(Step::Start, &mut state).await.unwrap(), Step::SyncRepo);
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn transitions_record_state_in_isolation() {
    let fixture = Fixture::new();
    fixture.create_site_with("Gemfile", "");
    let runner = ScriptedRunner::new();
    let builder = builder(&fixture, &runner);
    let mut state = BuildState::new(&fixture.opts);

    let next = builder.transition(Step::DetectBuildMode, &mut state).await.unwrap();
    assert_eq!(next, Step::CheckDependencyManifest);

    let next = builder.transition(next, &mut state).await.unwrap();
    assert_eq!(next, Step::InstallDependencies);
    assert!(state.uses_bundler);

    let next = builder.transition(Step::ResolveConfig, &mut state).await.unwrap();
    assert_eq!(next, Step::RunGenerator);
    assert!(state.generated_config);
    assert!(fixture.site_file(PAGES_CONFIG).exists());

    builder.finalize(&state).await;
    assert!(!fixture.site_file(PAGES_CONFIG).exists());
}
