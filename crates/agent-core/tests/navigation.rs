use agent_core::{
    navigate_with_fallback, AgentError, AgentLoopConfig, AgentLoopController, DeviceProfile,
    NavigationError, NavigationPolicy, ScriptedLauncher, ScriptedPage, SessionRunner,
    SessionStatus,
};
use decision_oracle::{DecisionOracle, Purpose, ScriptedBackend};
use menuprobe_core_types::{DiagnosticLevel, Persona};
use std::sync::Arc;

fn policy() -> NavigationPolicy {
    NavigationPolicy {
        engines: vec!["chromium".into(), "chrome".into(), "edge".into()],
        attempts_per_engine: 2,
        timeout_ms: 30_000,
        backoff_ms: 200,
    }
}

#[tokio::test(start_paused = true)]
async fn falls_back_to_second_engine() {
    let launcher = ScriptedLauncher::new(|| ScriptedPage::new("<h1>Menu</h1>")).failing("chromium", 5);

    let navigated = navigate_with_fallback(&launcher, &DeviceProfile::iphone(), "https://food.test", &policy())
        .await
        .unwrap();

    assert_eq!(navigated.engine, "chrome");
    assert_eq!(navigated.attempts, 3);
    assert_eq!(launcher.attempts(), vec!["chromium", "chromium", "chrome"]);
}

#[tokio::test(start_paused = true)]
async fn gives_up_after_bounded_attempts() {
    let launcher = ScriptedLauncher::new(|| ScriptedPage::new(""))
        .failing("chromium", 9)
        .failing("chrome", 9);

    let err = navigate_with_fallback(&launcher, &DeviceProfile::iphone(), "https://food.test", &policy())
        .await
        .err()
        .unwrap();

    assert!(matches!(err, NavigationError::Exhausted { attempts: 4, .. }));
    assert!(!launcher.attempts().iter().any(|engine| engine == "edge"));
}

#[tokio::test(start_paused = true)]
async fn runner_records_navigation_and_abandons_on_failure() {
    let oracle = DecisionOracle::single(Arc::new(
        ScriptedBackend::new().repeat(Purpose::Action, r#"{"action":"wait","ms":500}"#),
    ));
    let controller = AgentLoopController::new(AgentLoopConfig::new().step_ceiling(3), oracle);

    let ok = SessionRunner::new(
        Arc::new(ScriptedLauncher::new(|| ScriptedPage::new("<h1>Menu</h1>"))),
        controller.clone(),
        "https://food.test",
    )
    .with_navigation(policy());
    let outcome = ok.run(&Persona::new("U-01")).await.unwrap();
    assert_eq!(outcome.status, SessionStatus::StepCeiling);
    let first = outcome.history.diagnostics().next().unwrap();
    assert_eq!(first.level, DiagnosticLevel::Info);
    assert!(first.message.starts_with("navigated to https://food.test via chromium"));

    let broken = SessionRunner::new(
        Arc::new(
            ScriptedLauncher::new(|| ScriptedPage::new(""))
                .failing("chromium", 9)
                .failing("chrome", 9),
        ),
        controller,
        "https://food.test",
    )
    .with_navigation(policy());
    let err = broken.run(&Persona::new("U-02")).await.err().unwrap();
    assert!(matches!(err, AgentError::Navigation(_)));
}
